//! Beatmap backends and the resolver that picks between them.
//!
//! The active backend is read from the configuration on every call, so a
//! settings change applies to the next search without rebuilding anything.
//! Download preparation follows the backend a set was *found* on, not the one
//! that is active now.

pub mod mirror;
pub mod official;

use crate::app::config::Config;
use crate::beatmap::{Backend, BeatmapSet, GameMode, IdLookup, RankedStatus};
use crate::download::http_client::HttpClient;
use crate::download::task::BeatmapDownload;
use crate::error::Result;
use crate::file::library::LocalLibrary;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::RwLock;

pub use mirror::MirrorSource;
pub use official::OfficialSource;

/// One configured backend
pub enum Source {
    Official(OfficialSource),
    Mirror(MirrorSource),
}

impl Source {
    pub fn from_config(backend: Backend, config: &Config, http: Arc<HttpClient>) -> Self {
        match backend {
            Backend::Official => Source::Official(OfficialSource::new(
                http,
                config.official.base_url.clone(),
                config.official.session_cookie.clone(),
            )),
            Backend::Mirror => Source::Mirror(MirrorSource::new(http, config.mirror.base_url.clone())),
        }
    }

    pub fn backend(&self) -> Backend {
        match self {
            Source::Official(_) => Backend::Official,
            Source::Mirror(_) => Backend::Mirror,
        }
    }

    pub async fn search(
        &self,
        query: &str,
        ranked: RankedStatus,
        mode: GameMode,
        id_lookup: Option<IdLookup>,
    ) -> Result<Vec<BeatmapSet>> {
        match self {
            Source::Official(source) => source.search(query, ranked, mode).await,
            Source::Mirror(source) => source.search(query, ranked, mode, id_lookup).await,
        }
    }

    pub async fn resolve_by_id(&self, set_id: u64) -> Result<Option<BeatmapSet>> {
        match self {
            Source::Official(source) => source.resolve_by_id(set_id).await,
            Source::Mirror(source) => source.resolve_by_id(set_id).await,
        }
    }

    pub async fn prepare_download(
        &self,
        set: &BeatmapSet,
        mirror_override: Option<&str>,
        work_dir: &Path,
    ) -> Result<BeatmapDownload> {
        match self {
            Source::Official(source) => source.prepare_download(set, work_dir).await,
            Source::Mirror(source) => Ok(source.prepare_download(set, mirror_override, work_dir)),
        }
    }
}

/// Search filters as entered by the user
#[derive(Debug, Clone, Copy, Default)]
pub struct SearchFilters {
    pub ranked: RankedStatus,
    pub mode: GameMode,
    pub id_lookup: Option<IdLookup>,
}

#[derive(Clone)]
pub struct SourceResolver {
    config: Arc<RwLock<Config>>,
    http: Arc<HttpClient>,
    library: Option<Arc<LocalLibrary>>,
}

impl SourceResolver {
    pub fn new(config: Arc<RwLock<Config>>, http: Arc<HttpClient>) -> Self {
        Self {
            config,
            http,
            library: None,
        }
    }

    /// Library used to flag sets that are already installed
    pub fn with_library(mut self, library: Arc<LocalLibrary>) -> Self {
        self.library = Some(library);
        self
    }

    /// The backend selected in the settings right now
    pub async fn active_backend(&self) -> Backend {
        self.config.read().await.general.backend
    }

    async fn source(&self, backend: Backend) -> Source {
        let config = self.config.read().await;
        Source::from_config(backend, &config, self.http.clone())
    }

    async fn mirror(&self) -> MirrorSource {
        let config = self.config.read().await;
        MirrorSource::new(self.http.clone(), config.mirror.base_url.clone())
    }

    fn mark_installed(&self, mut sets: Vec<BeatmapSet>) -> Vec<BeatmapSet> {
        if let Some(library) = &self.library {
            for set in &mut sets {
                set.already_have = library.contains(set.id);
            }
        }
        sets
    }

    /// Search the active backend
    pub async fn search(&self, query: &str, filters: SearchFilters) -> Result<Vec<BeatmapSet>> {
        self.search_on(self.active_backend().await, query, filters).await
    }

    /// Search a specific backend regardless of the active one
    pub async fn search_on(
        &self,
        backend: Backend,
        query: &str,
        filters: SearchFilters,
    ) -> Result<Vec<BeatmapSet>> {
        let source = self.source(backend).await;
        tracing::info!(backend = %backend, "Searching for '{}'", query);
        let sets = source
            .search(query, filters.ranked, filters.mode, filters.id_lookup)
            .await?;
        Ok(self.mark_installed(sets))
    }

    /// Popular listing; only the mirror publishes one
    pub async fn popular(&self) -> Result<Vec<BeatmapSet>> {
        let sets = self.mirror().await.popular().await?;
        Ok(self.mark_installed(sets))
    }

    /// Look a set up on the active backend. Ok(None) when it does not exist.
    pub async fn resolve_by_id(&self, set_id: u64) -> Result<Option<BeatmapSet>> {
        let source = self.source(self.active_backend().await).await;
        let set = source.resolve_by_id(set_id).await?;
        Ok(set.map(|set| {
            let mut marked = self.mark_installed(vec![set]);
            marked.remove(0)
        }))
    }

    /// Build a download handle on the backend the set came from
    pub async fn prepare_download(
        &self,
        set: &BeatmapSet,
        mirror_override: Option<&str>,
    ) -> Result<BeatmapDownload> {
        let work_dir = self.config.read().await.work_dir();
        let source = self.source(set.backend).await;
        source.prepare_download(set, mirror_override, &work_dir).await
    }

    /// Build a download handle bound to the mirror, whatever the set's origin.
    ///
    /// Used for the fallback after an official takedown.
    pub async fn prepare_from_mirror(
        &self,
        set: &BeatmapSet,
        mirror_override: Option<&str>,
    ) -> Result<BeatmapDownload> {
        let work_dir = self.config.read().await.work_dir();
        Ok(self.mirror().await.prepare_download(set, mirror_override, &work_dir))
    }
}
