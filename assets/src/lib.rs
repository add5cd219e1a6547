//! Asynchronous, priority-ordered loading of externally stored media
//! files (images, sounds, ...) for a real-time presentation system.
//!
//! Media files are discovered on disk per registered [`AssetKind`],
//! their configs merged from class-wide, folder and per-entry
//! defaults, and each resulting [`Asset`] goes through an
//! unloaded → loading → loaded lifecycle. The actual (potentially
//! slow, blocking) load runs on a single dedicated worker thread so
//! the thread driving rendering and event dispatch never blocks; it
//! observes completions by draining a channel on a fixed poll cadence.

use std::fmt;
use std::path::PathBuf;

pub mod asset;
pub mod config;
pub mod kind;
pub mod manager;
pub mod queue;
pub mod registry;
mod scanner;
mod ticker;
mod worker;

pub use crate::asset::{Asset, LoadCallback, LoadState};
pub use crate::config::AssetConfig;
pub use crate::kind::{AssetKind, MediaLoader};
pub use crate::manager::AssetManager;

/// Result of the opaque per-kind load primitive.
pub type LoadResult = std::result::Result<(), Box<dyn std::error::Error + Send + Sync>>;

/// Errors surfaced synchronously to callers of the pipeline.
#[derive(Debug)]
pub enum AssetError {
    /// An asset kind was registered under an attribute name that is
    /// already in use. Fatal at startup.
    DuplicateAttribute(String),
    /// A named file could not be resolved in any of the search roots.
    FileNotFound { file: String, searched: Vec<PathBuf> },
}

impl fmt::Display for AssetError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            AssetError::DuplicateAttribute(attribute) => write!(
                f,
                "asset kind attribute {:?} is already registered",
                attribute
            ),
            AssetError::FileNotFound { file, searched } => write!(
                f,
                "could not locate asset file {:?} (searched {:?})",
                file, searched
            ),
        }
    }
}

impl std::error::Error for AssetError {}

/// An unrecoverable fault raised inside the loader worker while a load
/// primitive was executing. There is only one worker, so a fault stalls
/// all future load completions; the control thread must treat it as
/// fatal.
#[derive(Debug, Clone)]
pub struct LoaderFault {
    /// Name of the asset whose load primitive faulted.
    pub asset: String,
    /// Diagnostic text captured from the error or panic payload.
    pub message: String,
}

impl fmt::Display for LoaderFault {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "loader worker fault while loading {:?}: {}",
            self.asset, self.message
        )
    }
}

impl std::error::Error for LoaderFault {}
