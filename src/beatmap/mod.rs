pub mod filter;
pub mod set;

pub use filter::{GameMode, IdLookup, RankedStatus};
pub use set::{Backend, BeatmapSet};
