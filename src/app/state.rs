use super::config::Config;
use super::flow::DownloadFlow;
use super::intent::IntentHandler;
use super::prompt::Prompter;
use crate::download::http_client::HttpClient;
use crate::download::DownloadManager;
use crate::file::library::{LibraryIndex, LocalLibrary};
use crate::file::placement::{GameProcess, OsuProcess};
use crate::source::SourceResolver;
use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

/// Shared services for one process
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<RwLock<Config>>,
    pub library: Arc<LocalLibrary>,
    pub resolver: SourceResolver,
    pub manager: DownloadManager,
    pub flow: DownloadFlow,
}

impl AppState {
    pub fn new(config: Config, prompter: Arc<dyn Prompter>) -> Result<Self> {
        let http_client =
            Arc::new(HttpClient::from_config(&config.network).context("Failed to build HTTP client")?);
        let library = Arc::new(LocalLibrary::scanned(config.songs_dir()));
        let game: Arc<dyn GameProcess> = Arc::new(OsuProcess::new(config.game_executable()));
        tracing::info!("Library has {} set(s) in {:?}", library.len(), library.songs_dir());

        Ok(Self::with_parts(config, http_client, library, game, prompter))
    }

    /// Assemble from explicit parts; tests swap in their own game process
    pub fn with_parts(
        config: Config,
        http_client: Arc<HttpClient>,
        library: Arc<LocalLibrary>,
        game: Arc<dyn GameProcess>,
        prompter: Arc<dyn Prompter>,
    ) -> Self {
        let speed_interval = Duration::from_millis(config.download.speed_interval_ms.max(1));
        let config = Arc::new(RwLock::new(config));

        let resolver = SourceResolver::new(config.clone(), http_client.clone()).with_library(library.clone());
        let manager = DownloadManager::new(http_client)
            .with_speed_interval(speed_interval)
            .with_library(library.clone() as Arc<dyn LibraryIndex>);
        let flow = DownloadFlow::new(config.clone(), resolver.clone(), manager.clone(), game, prompter);

        Self {
            config,
            library,
            resolver,
            manager,
            flow,
        }
    }

    /// Deep link handler using the scheme configured right now
    pub async fn intent_handler(&self) -> IntentHandler {
        let scheme = self.config.read().await.general.deep_link_scheme.clone();
        IntentHandler::new(self.resolver.clone(), self.flow.clone(), scheme)
    }
}
