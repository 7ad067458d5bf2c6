pub mod library;
pub mod manager;
pub mod naming;
pub mod placement;

pub use library::{LibraryIndex, LocalLibrary};
pub use manager::FileManager;
pub use placement::{GameProcess, OsuProcess, PlacedFile, Placement};
