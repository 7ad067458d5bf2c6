pub mod config;
pub mod flow;
pub mod intent;
pub mod prompt;
pub mod state;

pub use flow::{DownloadFlow, FlowOutcome};
pub use intent::{IntentHandler, IntentOutcome};
pub use state::AppState;
