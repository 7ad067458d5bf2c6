use crate::beatmap::{Backend, BeatmapSet, GameMode, RankedStatus};
use crate::download::http_client::HttpClient;
use crate::download::http_errors::HttpErrorInfo;
use crate::download::task::BeatmapDownload;
use crate::error::{Error, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    beatmapsets: Vec<OfficialSet>,
}

#[derive(Debug, Deserialize)]
struct OfficialSet {
    id: u64,
    artist: String,
    title: String,
    creator: String,
    #[serde(default)]
    covers: Covers,
    #[serde(default)]
    preview_url: Option<String>,
    #[serde(default)]
    availability: Availability,
}

#[derive(Debug, Default, Deserialize)]
struct Covers {
    #[serde(default)]
    card: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct Availability {
    #[serde(default)]
    download_disabled: bool,
}

/// Protocol-relative URLs ("//b.ppy.sh/...") come back from the API as-is
fn absolute_url(url: Option<String>) -> String {
    match url {
        Some(url) if url.starts_with("//") => format!("https:{}", url),
        Some(url) => url,
        None => String::new(),
    }
}

impl From<OfficialSet> for BeatmapSet {
    fn from(set: OfficialSet) -> Self {
        Self {
            id: set.id,
            backend: Backend::Official,
            artist: set.artist,
            title: set.title,
            mapper: set.creator,
            preview_image: absolute_url(set.covers.card),
            preview_audio: absolute_url(set.preview_url),
            already_have: false,
        }
    }
}

/// The official osu! beatmap listing
pub struct OfficialSource {
    http: Arc<HttpClient>,
    base_url: String,
    session_cookie: Option<String>,
}

impl OfficialSource {
    pub fn new(http: Arc<HttpClient>, base_url: impl Into<String>, session_cookie: Option<String>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            session_cookie,
        }
    }

    fn api_url(&self, path: &str, params: &[(&str, &str)]) -> Result<String> {
        let base = format!("{}/api/v2/{}", self.base_url, path);
        let url = if params.is_empty() {
            url::Url::parse(&base)
        } else {
            url::Url::parse_with_params(&base, params)
        }
        .map_err(|e| Error::backend(Backend::Official, format!("invalid API URL: {}", e)))?;
        Ok(url.to_string())
    }

    pub async fn search(&self, query: &str, ranked: RankedStatus, mode: GameMode) -> Result<Vec<BeatmapSet>> {
        let Some(status) = ranked.official_code() else {
            return Err(Error::SearchUnsupported {
                backend: Backend::Official,
                reason: format!("ranked status filter {:?} has no official equivalent", ranked),
            });
        };

        let mut params = vec![("q", query), ("s", status)];
        if let Some(mode) = mode.code() {
            params.push(("m", mode));
        }
        let url = self.api_url("beatmapsets/search", &params)?;

        let (status, body) = self
            .http
            .fetch_text(&url)
            .await
            .map_err(|e| Error::backend(Backend::Official, e.to_string()))?;
        if !(200..300).contains(&status) {
            return Err(Error::backend(Backend::Official, HttpErrorInfo::from_status(status).format()));
        }

        let response: SearchResponse = serde_json::from_str(&body)
            .map_err(|e| Error::backend(Backend::Official, format!("unexpected search response: {}", e)))?;
        tracing::debug!("Official search '{}' returned {} set(s)", query, response.beatmapsets.len());

        Ok(response.beatmapsets.into_iter().map(BeatmapSet::from).collect())
    }

    async fn fetch_set(&self, set_id: u64) -> Result<Option<OfficialSet>> {
        let url = self.api_url(&format!("beatmapsets/{}", set_id), &[])?;
        let (status, body) = self
            .http
            .fetch_text(&url)
            .await
            .map_err(|e| Error::backend(Backend::Official, e.to_string()))?;

        match status {
            404 => Ok(None),
            200..=299 => serde_json::from_str(&body).map(Some).map_err(|e| {
                Error::backend(Backend::Official, format!("unexpected beatmap set response: {}", e))
            }),
            other => Err(Error::backend(Backend::Official, HttpErrorInfo::from_status(other).format())),
        }
    }

    pub async fn resolve_by_id(&self, set_id: u64) -> Result<Option<BeatmapSet>> {
        Ok(self.fetch_set(set_id).await?.map(BeatmapSet::from))
    }

    /// Check availability and build a handle for the official download URL.
    ///
    /// Fails with `IllegalDownload` when the set was taken down.
    pub async fn prepare_download(&self, set: &BeatmapSet, work_dir: &Path) -> Result<BeatmapDownload> {
        let info = self.fetch_set(set.id).await?.ok_or(Error::NotFound {
            backend: Backend::Official,
            set_id: set.id,
        })?;

        if info.availability.download_disabled {
            tracing::warn!("Beatmap set {} is download-disabled on the official servers", set.id);
            return Err(Error::IllegalDownload { set_id: set.id });
        }

        let mut headers = HashMap::new();
        if let Some(cookie) = &self.session_cookie {
            headers.insert("Cookie".to_string(), cookie.clone());
        }
        let url = format!("{}/beatmapsets/{}/download", self.base_url, set.id);

        Ok(BeatmapDownload::new(
            Arc::new(set.translated_to(Backend::Official)),
            Backend::Official,
            url,
            headers,
            work_dir,
        ))
    }
}
