use super::error;
use super::output;
use super::{Commands, ConfigAction};
use crate::app::intent::{parse_set_id, IntentOutcome};
use crate::app::state::AppState;
use crate::beatmap::{Backend, GameMode, IdLookup, RankedStatus};
use crate::download::manager::DownloadEvent;
use crate::file::manager::{FileManager, STALE_TEMP_AGE};
use crate::source::SearchFilters;
use anyhow::Result;
use std::future::Future;
use tokio::sync::broadcast::error::RecvError;

/// Handle a CLI command and return exit code
pub async fn handle_command(command: Commands, state: AppState) -> i32 {
    let result = match command {
        Commands::Search {
            query,
            status,
            mode,
            via,
            json,
        } => handle_search(query, status, mode, via, json, &state).await,
        Commands::Popular { json } => handle_popular(json, &state).await,
        Commands::Download { id, mirror } => handle_download(id, mirror, &state).await,
        Commands::Open { args } => handle_open(args, &state).await,
        Commands::Cleanup => handle_cleanup(&state).await,
        Commands::Config { action } => handle_config(action, &state).await,
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {}", e);
            error::exit_code_for(&e)
        }
    }
}

async fn handle_search(
    query: String,
    ranked: RankedStatus,
    mode: GameMode,
    id_lookup: Option<IdLookup>,
    json: bool,
    state: &AppState,
) -> Result<i32> {
    let filters = SearchFilters {
        ranked,
        mode,
        id_lookup,
    };
    let sets = state.resolver.search(&query, filters).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&sets)?);
    } else {
        println!("{}", output::format_sets(&sets));
    }
    Ok(error::SUCCESS)
}

async fn handle_popular(json: bool, state: &AppState) -> Result<i32> {
    let sets = state.resolver.popular().await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&sets)?);
    } else {
        println!("{}", output::format_sets(&sets));
    }
    Ok(error::SUCCESS)
}

async fn handle_download(id: u64, mirror: Option<String>, state: &AppState) -> Result<i32> {
    let backend = state.resolver.active_backend().await;
    let Some(set) = state.resolver.resolve_by_id(id).await? else {
        eprintln!("Could not find beatmap set {} on {}", id, backend.display_name());
        return Ok(error::NOT_FOUND);
    };

    println!("Downloading {} from {}", set.friendly_name(), set.backend.display_name());
    let outcome = with_progress(state, state.flow.download_set_via(&set, mirror.as_deref())).await?;
    println!("{}", output::format_outcome(&set.friendly_name(), &outcome));
    Ok(error::SUCCESS)
}

async fn handle_open(args: Vec<String>, state: &AppState) -> Result<i32> {
    let handler = state.intent_handler().await;
    let outcome = with_progress(state, handler.handle(&args)).await?;

    match outcome {
        IntentOutcome::NoLink => {
            let scheme = state.config.read().await.general.deep_link_scheme.clone();
            eprintln!("No {}://<id>/ link found in the arguments", scheme);
            Ok(error::INVALID_INPUT)
        }
        IntentOutcome::NotFound { backend, set_id } => {
            eprintln!("Could not find beatmap set {} on {}", set_id, backend.display_name());
            Ok(error::NOT_FOUND)
        }
        IntentOutcome::Declined => Ok(error::SUCCESS),
        IntentOutcome::Download(outcome) => {
            let scheme = state.config.read().await.general.deep_link_scheme.clone();
            let name = parse_set_id(&args, &scheme)
                .map(|id| format!("beatmap set {}", id))
                .unwrap_or_else(|| "beatmap set".to_string());
            println!("{}", output::format_outcome(&name, &outcome));
            Ok(error::SUCCESS)
        }
    }
}

async fn handle_cleanup(state: &AppState) -> Result<i32> {
    let dirs = state.config.read().await.temp_dirs();
    let file_manager = FileManager::new();
    for dir in dirs {
        let removed = file_manager.sweep_stale_temps(&dir, STALE_TEMP_AGE);
        println!("Removed {} leftover temp file(s) from {}", removed, dir.display());
    }
    Ok(error::SUCCESS)
}

async fn handle_config(action: ConfigAction, state: &AppState) -> Result<i32> {
    match action {
        ConfigAction::Show { json } => {
            let config = state.config.read().await;
            if json {
                println!("{}", serde_json::to_string_pretty(&*config)?);
            } else {
                println!("{}", toml::to_string_pretty(&*config)?);
            }
            Ok(error::SUCCESS)
        }
        ConfigAction::Path => {
            println!("{}", crate::util::paths::get_app_config_path()?.display());
            Ok(error::SUCCESS)
        }
        ConfigAction::SetBackend { backend } => {
            let mut config = state.config.write().await;
            config.general.backend = backend;
            config.save()?;
            println!("Backend set to {}", backend_label(backend));
            Ok(error::SUCCESS)
        }
    }
}

fn backend_label(backend: Backend) -> &'static str {
    match backend {
        Backend::Official => "official (osu.ppy.sh)",
        Backend::Mirror => "mirror",
    }
}

/// Run `work` while printing transfer progress to stderr.
///
/// Ctrl+C cancels every running transfer and waits for `work` to wind down.
async fn with_progress<T>(
    state: &AppState,
    work: impl Future<Output = crate::Result<T>>,
) -> crate::Result<T> {
    let monitor = state.manager.spawn_speed_monitor();
    let mut events = state.manager.subscribe();
    let mut speed = state.manager.subscribe_speed();

    let reporter = tokio::spawn(async move {
        let mut current_speed = 0.0;
        loop {
            tokio::select! {
                event = events.recv() => match event {
                    Ok(DownloadEvent::Progress { downloaded, total, .. }) => {
                        eprint!(
                            "\r{}  {}        ",
                            output::format_progress(downloaded, total),
                            output::format_speed(current_speed)
                        );
                    }
                    Ok(_) | Err(RecvError::Lagged(_)) => {}
                    Err(RecvError::Closed) => break,
                },
                sample = speed.recv() => match sample {
                    Some(sample) => current_speed = sample.bytes_per_sec,
                    None => break,
                },
            }
        }
    });

    tokio::pin!(work);
    let result = tokio::select! {
        result = &mut work => result,
        _ = tokio::signal::ctrl_c() => {
            eprintln!("\nCancelling...");
            state.manager.shutdown().await;
            (&mut work).await
        }
    };

    state.manager.shutdown().await;
    reporter.abort();
    let _ = monitor.await;
    eprintln!();
    result
}
