pub mod app;
pub mod beatmap;
pub mod cli;
pub mod download;
pub mod error;
pub mod file;
pub mod source;
pub mod util;

pub use app::{config::Config, state::AppState};
pub use error::{Error, Result};
