#![allow(dead_code)]

use nexdirect::app::config::Config;
use nexdirect::app::prompt::Prompter;
use nexdirect::app::state::AppState;
use nexdirect::beatmap::{Backend, BeatmapSet};
use nexdirect::download::http_client::HttpClient;
use nexdirect::download::task::BeatmapDownload;
use nexdirect::file::library::LocalLibrary;
use nexdirect::file::placement::GameProcess;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub fn test_set(id: u64, backend: Backend) -> BeatmapSet {
    BeatmapSet {
        id,
        backend,
        artist: "Artist".to_string(),
        title: format!("Title {}", id),
        mapper: "Mapper".to_string(),
        preview_image: String::new(),
        preview_audio: String::new(),
        already_have: false,
    }
}

pub fn http_client() -> Arc<HttpClient> {
    Arc::new(HttpClient::new("nexdirect-tests").unwrap())
}

/// A handle that downloads `{base}/d/{id}` into `work_dir`
pub fn download_handle(id: u64, backend: Backend, base: &str, work_dir: &Path) -> BeatmapDownload {
    BeatmapDownload::new(
        Arc::new(test_set(id, backend)),
        backend,
        format!("{}/d/{}", base, id),
        HashMap::new(),
        work_dir,
    )
}

pub fn mirror_set_json(id: u64) -> Value {
    json!({
        "id": id.to_string(),
        "artist": "Artist",
        "title": format!("Title {}", id),
        "creator": "Mapper"
    })
}

pub fn official_set_json(id: u64, download_disabled: bool) -> Value {
    json!({
        "id": id,
        "artist": "Artist",
        "title": format!("Title {}", id),
        "creator": "Mapper",
        "covers": {"card": format!("https://assets.example/{}/card.jpg", id)},
        "preview_url": format!("//b.example/preview/{}.mp3", id),
        "availability": {"download_disabled": download_disabled}
    })
}

/// Serve `body` at `/d/{id}`, optionally after a delay
pub async fn mount_archive(server: &MockServer, id: u64, body: &[u8], delay: Option<Duration>) {
    let mut response = ResponseTemplate::new(200)
        .set_body_bytes(body.to_vec())
        .append_header("Content-Length", body.len().to_string());
    if let Some(delay) = delay {
        response = response.set_delay(delay);
    }

    Mock::given(method("GET"))
        .and(path(format!("/d/{}", id)))
        .respond_with(response)
        .mount(server)
        .await;
}

/// Serve one archive response that sends `sent` bytes of a declared
/// `declared` and then stalls with the connection held open.
///
/// Returns the base URL; any `/d/{id}` path gets the same response.
pub async fn stalling_server(sent: usize, declared: usize) -> String {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                let mut request = vec![0u8; 4096];
                let _ = socket.read(&mut request).await;

                let head = format!(
                    "HTTP/1.1 200 OK\r\nContent-Type: application/octet-stream\r\nContent-Length: {}\r\n\r\n",
                    declared
                );
                let _ = socket.write_all(head.as_bytes()).await;
                let _ = socket.write_all(&vec![7u8; sent]).await;
                let _ = socket.flush().await;

                tokio::time::sleep(Duration::from_secs(30)).await;
                drop(socket);
            });
        }
    });

    format!("http://{}", addr)
}

/// Directories a test run writes to
pub struct TestDirs {
    pub game: TempDir,
    pub songs: TempDir,
    pub work: TempDir,
}

impl TestDirs {
    pub fn new() -> Self {
        Self {
            game: TempDir::new().unwrap(),
            songs: TempDir::new().unwrap(),
            work: TempDir::new().unwrap(),
        }
    }

    pub fn song_files(&self) -> Vec<std::path::PathBuf> {
        let mut files: Vec<_> = std::fs::read_dir(self.songs.path())
            .unwrap()
            .flatten()
            .map(|e| e.path())
            .collect();
        files.sort();
        files
    }

    pub fn work_files(&self) -> Vec<std::path::PathBuf> {
        std::fs::read_dir(self.work.path())
            .unwrap()
            .flatten()
            .map(|e| e.path())
            .collect()
    }
}

pub fn test_config(backend: Backend, official: &str, mirror: &str, dirs: &TestDirs) -> Config {
    let mut config = Config::default();
    config.general.backend = backend;
    config.general.launch_game = false;
    config.official.base_url = official.to_string();
    config.official.session_cookie = Some("osu_session=test".to_string());
    config.mirror.base_url = mirror.to_string();
    config.paths.game_dir = dirs.game.path().to_path_buf();
    config.paths.songs_dir = Some(dirs.songs.path().to_path_buf());
    config.paths.work_dir = Some(dirs.work.path().to_path_buf());
    config.download.speed_interval_ms = 50;
    config
}

/// Fixed answers, with a log of what was asked
pub struct ScriptedPrompter {
    pub download: bool,
    pub redownload: bool,
    pub fallback: bool,
    pub asked: Mutex<Vec<&'static str>>,
}

impl ScriptedPrompter {
    pub fn answering(download: bool, redownload: bool, fallback: bool) -> Arc<Self> {
        Arc::new(Self {
            download,
            redownload,
            fallback,
            asked: Mutex::new(Vec::new()),
        })
    }

    pub fn asked(&self) -> Vec<&'static str> {
        self.asked.lock().unwrap().clone()
    }
}

impl Prompter for ScriptedPrompter {
    fn confirm_download(&self, _set: &BeatmapSet) -> bool {
        self.asked.lock().unwrap().push("download");
        self.download
    }

    fn confirm_redownload(&self, _set: &BeatmapSet) -> bool {
        self.asked.lock().unwrap().push("redownload");
        self.redownload
    }

    fn confirm_mirror_fallback(&self, _set: &BeatmapSet) -> bool {
        self.asked.lock().unwrap().push("fallback");
        self.fallback
    }
}

/// The game is never running in tests
pub struct NoGame;

impl GameProcess for NoGame {
    fn is_running(&self) -> bool {
        false
    }

    fn launch(&self, _archive: &Path) -> std::io::Result<()> {
        Ok(())
    }
}

pub fn test_state(config: Config, prompter: Arc<ScriptedPrompter>) -> AppState {
    let library = Arc::new(LocalLibrary::scanned(config.songs_dir()));
    AppState::with_parts(config, http_client(), library, Arc::new(NoGame), prompter)
}

/// Poll until `check` holds or a second passes
pub async fn wait_until<F, Fut>(mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    for _ in 0..100 {
        if check().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}
