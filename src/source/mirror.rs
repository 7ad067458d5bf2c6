use crate::beatmap::{Backend, BeatmapSet, GameMode, IdLookup, RankedStatus};
use crate::download::http_client::HttpClient;
use crate::download::http_errors::HttpErrorInfo;
use crate::download::task::BeatmapDownload;
use crate::error::{Error, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

/// The mirror serialises ids as strings on some endpoints and numbers on others
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawId {
    Number(u64),
    Text(String),
}

impl RawId {
    fn value(&self) -> Option<u64> {
        match self {
            RawId::Number(n) => Some(*n),
            RawId::Text(s) => s.trim().parse().ok(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct MirrorSet {
    id: RawId,
    #[serde(default)]
    artist: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    creator: String,
}

impl MirrorSet {
    fn into_set(self) -> Option<BeatmapSet> {
        let id = self.id.value().filter(|id| *id > 0)?;
        Some(BeatmapSet {
            id,
            backend: Backend::Mirror,
            artist: self.artist,
            title: self.title,
            mapper: self.creator,
            preview_image: format!("https://b.ppy.sh/thumb/{}l.jpg", id),
            preview_audio: format!("https://b.ppy.sh/preview/{}.mp3", id),
            already_have: false,
        })
    }
}

/// A community mirror keyed by official set ids
pub struct MirrorSource {
    http: Arc<HttpClient>,
    base_url: String,
}

impl MirrorSource {
    pub fn new(http: Arc<HttpClient>, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    async fn fetch_sets(&self, url: &str) -> Result<Vec<BeatmapSet>> {
        let (status, body) = self
            .http
            .fetch_text(url)
            .await
            .map_err(|e| Error::backend(Backend::Mirror, e.to_string()))?;
        if !(200..300).contains(&status) {
            return Err(Error::backend(Backend::Mirror, HttpErrorInfo::from_status(status).format()));
        }

        let raw: Vec<MirrorSet> = serde_json::from_str(&body)
            .map_err(|e| Error::backend(Backend::Mirror, format!("unexpected mirror response: {}", e)))?;
        Ok(raw.into_iter().filter_map(MirrorSet::into_set).collect())
    }

    pub async fn search(
        &self,
        query: &str,
        ranked: RankedStatus,
        mode: GameMode,
        id_lookup: Option<IdLookup>,
    ) -> Result<Vec<BeatmapSet>> {
        let mut params = vec![("mod", "json"), ("q", query)];
        if let Some(lookup) = id_lookup.filter(|_| IdLookup::applies_to(query)) {
            params.push(("c", lookup.mirror_code()));
        }
        if let Some(status) = ranked.mirror_code() {
            params.push(("s", status));
        }
        if let Some(mode) = mode.code() {
            params.push(("m", mode));
        }

        let url = url::Url::parse_with_params(&format!("{}/api", self.base_url), &params)
            .map_err(|e| Error::backend(Backend::Mirror, format!("invalid mirror URL: {}", e)))?;
        let sets = self.fetch_sets(url.as_str()).await?;
        tracing::debug!("Mirror search '{}' returned {} set(s)", query, sets.len());
        Ok(sets)
    }

    pub async fn popular(&self) -> Result<Vec<BeatmapSet>> {
        self.fetch_sets(&format!("{}/api/popular?mod=json", self.base_url)).await
    }

    pub async fn resolve_by_id(&self, set_id: u64) -> Result<Option<BeatmapSet>> {
        let id = set_id.to_string();
        let sets = self
            .search(&id, RankedStatus::All, GameMode::All, Some(IdLookup::SetId))
            .await?;
        Ok(sets.into_iter().find(|set| set.id == set_id))
    }

    /// Build a handle for the mirror's download endpoint. No request is made.
    ///
    /// `mirror_override` replaces the configured base URL for this one handle.
    pub fn prepare_download(
        &self,
        set: &BeatmapSet,
        mirror_override: Option<&str>,
        work_dir: &Path,
    ) -> BeatmapDownload {
        let base = mirror_override
            .map(|m| m.trim_end_matches('/'))
            .unwrap_or(&self.base_url);
        let url = format!("{}/d/{}", base, set.id);

        BeatmapDownload::new(
            Arc::new(set.translated_to(Backend::Mirror)),
            Backend::Mirror,
            url,
            HashMap::new(),
            work_dir,
        )
    }
}
