mod common;

use common::*;
use nexdirect::app::flow::FlowOutcome;
use nexdirect::app::intent::IntentOutcome;
use nexdirect::app::prompt::Prompter;
use nexdirect::app::state::AppState;
use nexdirect::beatmap::{Backend, BeatmapSet};
use nexdirect::file::library::LocalLibrary;
use nexdirect::Error;
use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::Arc;
use std::time::{Duration, Instant};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn link(id: u64) -> Vec<String> {
    vec![format!("nexdirect://{}/", id)]
}

async fn mount_mirror_lookup(server: &MockServer, id: u64, found: bool) {
    let body = if found { json!([mirror_set_json(id)]) } else { json!([]) };
    Mock::given(method("GET"))
        .and(path("/api"))
        .and(query_param("q", id.to_string()))
        .and(query_param("c", "s"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

async fn mount_official_set(server: &MockServer, id: u64, download_disabled: bool) {
    Mock::given(method("GET"))
        .and(path(format!("/api/v2/beatmapsets/{}", id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(official_set_json(id, download_disabled)))
        .mount(server)
        .await;
}

async fn forbid_archive(server: &MockServer, archive_path: String) {
    Mock::given(method("GET"))
        .and(path(archive_path))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_deep_link_to_unknown_set_downloads_nothing() {
    let official = MockServer::start().await;
    let mirror = MockServer::start().await;
    let dirs = TestDirs::new();
    mount_mirror_lookup(&mirror, 1001, false).await;
    forbid_archive(&mirror, "/d/1001".to_string()).await;

    let prompter = ScriptedPrompter::answering(true, true, true);
    let state = test_state(test_config(Backend::Mirror, &official.uri(), &mirror.uri(), &dirs), prompter.clone());

    let outcome = state.intent_handler().await.handle(&link(1001)).await.unwrap();

    assert_eq!(
        outcome,
        IntentOutcome::NotFound {
            backend: Backend::Mirror,
            set_id: 1001
        }
    );
    assert!(prompter.asked().is_empty());
    assert!(dirs.song_files().is_empty());
    assert!(state.manager.is_empty().await);
}

#[tokio::test]
async fn test_deep_link_without_link_is_ignored() {
    let dirs = TestDirs::new();
    let prompter = ScriptedPrompter::answering(true, true, true);
    let state = test_state(
        test_config(Backend::Mirror, "http://127.0.0.1:9", "http://127.0.0.1:9", &dirs),
        prompter,
    );

    let args = vec!["--some-flag".to_string(), "nexdirect://abc/".to_string()];
    let outcome = state.intent_handler().await.handle(&args).await.unwrap();
    assert_eq!(outcome, IntentOutcome::NoLink);
}

#[tokio::test]
async fn test_deep_link_declined_downloads_nothing() {
    let official = MockServer::start().await;
    let mirror = MockServer::start().await;
    let dirs = TestDirs::new();
    mount_mirror_lookup(&mirror, 321, true).await;
    forbid_archive(&mirror, "/d/321".to_string()).await;

    let prompter = ScriptedPrompter::answering(false, true, true);
    let state = test_state(test_config(Backend::Mirror, &official.uri(), &mirror.uri(), &dirs), prompter.clone());

    let outcome = state.intent_handler().await.handle(&link(321)).await.unwrap();
    assert_eq!(outcome, IntentOutcome::Declined);
    assert_eq!(prompter.asked(), vec!["download"]);
}

#[tokio::test]
async fn test_deep_link_confirmed_places_archive_and_reloads_library() {
    let official = MockServer::start().await;
    let mirror = MockServer::start().await;
    let dirs = TestDirs::new();
    mount_mirror_lookup(&mirror, 555, true).await;
    mount_archive(&mirror, 555, b"osz bytes", None).await;

    let prompter = ScriptedPrompter::answering(true, true, true);
    let state = test_state(test_config(Backend::Mirror, &official.uri(), &mirror.uri(), &dirs), prompter);
    assert!(!state.library.contains(555));

    let outcome = state.intent_handler().await.handle(&link(555)).await.unwrap();

    let expected = dirs.songs.path().join("555 Artist - Title 555.osz");
    match outcome {
        IntentOutcome::Download(FlowOutcome::Placed(placed)) => {
            assert_eq!(placed.path, expected);
            assert!(!placed.launched);
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
    assert_eq!(std::fs::read(&expected).unwrap(), b"osz bytes");
    assert!(dirs.work_files().is_empty());
    assert!(state.manager.is_empty().await);
    // The registry drained, so the library was rescanned
    assert!(state.library.contains(555));
}

#[tokio::test]
async fn test_placement_replaces_existing_archive() {
    let official = MockServer::start().await;
    let mirror = MockServer::start().await;
    let dirs = TestDirs::new();
    let existing = dirs.songs.path().join("64 Artist - Title 64.osz");
    std::fs::write(&existing, b"old content").unwrap();
    mount_archive(&mirror, 64, b"new content", None).await;

    let prompter = ScriptedPrompter::answering(true, true, true);
    let state = test_state(test_config(Backend::Mirror, &official.uri(), &mirror.uri(), &dirs), prompter);

    let outcome = state.flow.download_set(&test_set(64, Backend::Mirror)).await.unwrap();

    assert!(matches!(outcome, FlowOutcome::Placed(_)));
    assert_eq!(dirs.song_files(), vec![existing.clone()]);
    assert_eq!(std::fs::read(&existing).unwrap(), b"new content");
}

#[tokio::test]
async fn test_installed_set_skipped_when_redownload_declined() {
    let official = MockServer::start().await;
    let mirror = MockServer::start().await;
    let dirs = TestDirs::new();
    forbid_archive(&mirror, "/d/90".to_string()).await;

    let prompter = ScriptedPrompter::answering(true, false, true);
    let state = test_state(test_config(Backend::Mirror, &official.uri(), &mirror.uri(), &dirs), prompter.clone());

    let mut set = test_set(90, Backend::Mirror);
    set.already_have = true;
    let outcome = state.flow.download_set(&set).await.unwrap();

    assert_eq!(outcome, FlowOutcome::Skipped);
    assert_eq!(prompter.asked(), vec!["redownload"]);
}

/// Answers like a user who takes a while at the terminal
struct SlowPrompter;

impl Prompter for SlowPrompter {
    fn confirm_download(&self, _set: &BeatmapSet) -> bool {
        false
    }

    fn confirm_redownload(&self, _set: &BeatmapSet) -> bool {
        std::thread::sleep(Duration::from_millis(300));
        false
    }

    fn confirm_mirror_fallback(&self, _set: &BeatmapSet) -> bool {
        false
    }
}

#[tokio::test]
async fn test_pending_answer_does_not_block_the_runtime() {
    let official = MockServer::start().await;
    let mirror = MockServer::start().await;
    let dirs = TestDirs::new();

    let config = test_config(Backend::Mirror, &official.uri(), &mirror.uri(), &dirs);
    let library = Arc::new(LocalLibrary::scanned(config.songs_dir()));
    let state = AppState::with_parts(config, http_client(), library, Arc::new(NoGame), Arc::new(SlowPrompter));

    let mut set = test_set(91, Backend::Mirror);
    set.already_have = true;
    let started = Instant::now();
    let (outcome, ticked_after) = tokio::join!(state.flow.download_set(&set), async {
        tokio::time::sleep(Duration::from_millis(20)).await;
        started.elapsed()
    });

    assert_eq!(outcome.unwrap(), FlowOutcome::Skipped);
    // The timer fired while the question was still open
    assert!(ticked_after < Duration::from_millis(250));
}

#[tokio::test]
async fn test_withdrawn_set_falls_back_to_mirror_when_confirmed() {
    let official = MockServer::start().await;
    let mirror = MockServer::start().await;
    let dirs = TestDirs::new();
    mount_official_set(&official, 77, true).await;
    forbid_archive(&official, "/beatmapsets/77/download".to_string()).await;
    mount_archive(&mirror, 77, b"from the mirror", None).await;

    let prompter = ScriptedPrompter::answering(true, true, true);
    let state = test_state(test_config(Backend::Official, &official.uri(), &mirror.uri(), &dirs), prompter.clone());

    let outcome = state.flow.download_set(&test_set(77, Backend::Official)).await.unwrap();

    match outcome {
        FlowOutcome::Placed(placed) => {
            assert_eq!(std::fs::read(&placed.path).unwrap(), b"from the mirror");
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
    assert_eq!(prompter.asked(), vec!["fallback"]);
}

#[tokio::test]
async fn test_withdrawn_set_declined_fallback_downloads_nothing() {
    let official = MockServer::start().await;
    let mirror = MockServer::start().await;
    let dirs = TestDirs::new();
    mount_official_set(&official, 77, true).await;
    forbid_archive(&official, "/beatmapsets/77/download".to_string()).await;
    forbid_archive(&mirror, "/d/77".to_string()).await;

    let prompter = ScriptedPrompter::answering(true, true, false);
    let state = test_state(test_config(Backend::Official, &official.uri(), &mirror.uri(), &dirs), prompter);

    let outcome = state.flow.download_set(&test_set(77, Backend::Official)).await.unwrap();

    assert_eq!(outcome, FlowOutcome::Declined);
    assert!(dirs.song_files().is_empty());
    assert!(dirs.work_files().is_empty());
    assert!(state.manager.is_empty().await);
}

#[tokio::test]
async fn test_official_download_sends_cookie() {
    let official = MockServer::start().await;
    let mirror = MockServer::start().await;
    let dirs = TestDirs::new();
    mount_official_set(&official, 80, false).await;
    Mock::given(method("GET"))
        .and(path("/beatmapsets/80/download"))
        .and(wiremock::matchers::header("Cookie", "osu_session=test"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"official".to_vec()))
        .expect(1)
        .mount(&official)
        .await;

    let prompter = ScriptedPrompter::answering(true, true, true);
    let state = test_state(test_config(Backend::Official, &official.uri(), &mirror.uri(), &dirs), prompter);

    let outcome = state.flow.download_set(&test_set(80, Backend::Official)).await.unwrap();
    assert!(matches!(outcome, FlowOutcome::Placed(_)));
}

#[tokio::test]
async fn test_failed_transfer_leaves_no_artifacts() {
    let official = MockServer::start().await;
    let mirror = MockServer::start().await;
    let dirs = TestDirs::new();
    Mock::given(method("GET"))
        .and(path("/d/13"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mirror)
        .await;

    let prompter = ScriptedPrompter::answering(true, true, true);
    let state = test_state(test_config(Backend::Mirror, &official.uri(), &mirror.uri(), &dirs), prompter);

    let err = state.flow.download_set(&test_set(13, Backend::Mirror)).await.unwrap_err();

    assert!(matches!(err, Error::TransferFailed { .. }));
    assert!(dirs.work_files().is_empty());
    assert!(dirs.song_files().is_empty());
    assert!(state.manager.is_empty().await);
}
