use crate::beatmap::{Backend, GameMode, IdLookup, RankedStatus};
use clap::{Parser, Subcommand};

pub mod error;
pub mod handler;
pub mod output;

/// NexDirect - beatmap search and download for osu!
#[derive(Parser, Debug)]
#[command(name = "nexdirect")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Override config directory path
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<std::path::PathBuf>,

    /// Enable verbose logging (TRACE level)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Answer yes to every confirmation
    #[arg(short = 'y', long, global = true)]
    pub yes: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Search the configured backend
    Search {
        /// Search text, or an id with --via
        query: String,

        /// Ranked status (all, ranked, qualified, unranked)
        #[arg(long, default_value = "all")]
        status: RankedStatus,

        /// Game mode (all, osu, taiko, catch, mania)
        #[arg(long, default_value = "all")]
        mode: GameMode,

        /// How the mirror reads a numeric query (set, beatmap, mapper, text)
        #[arg(long)]
        via: Option<IdLookup>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List popular beatmap sets from the mirror
    Popular {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Download a beatmap set by id
    Download {
        /// Beatmap set id
        id: u64,

        /// Mirror base URL to use instead of the configured one
        #[arg(long, value_name = "URL")]
        mirror: Option<String>,
    },

    /// Handle a deep link such as nexdirect://1001/
    Open {
        /// Launch arguments containing the link
        #[arg(trailing_var_arg = true, allow_hyphen_values = true, required = true)]
        args: Vec<String>,
    },

    /// Delete leftover temp files from interrupted downloads
    Cleanup,

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show the whole configuration
    Show {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the settings file location
    Path,

    /// Select the backend used for searches and deep links
    SetBackend {
        /// official or mirror
        backend: Backend,
    },
}
