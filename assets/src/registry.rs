//! Registration of asset kinds and creation-id allocation.

use crate::kind::{compute_defaults, AssetKind};
use crate::AssetError;
use log::info;
use parking_lot::RwLock;
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Holds the registered asset kinds sorted by priority descending and
/// hands out the process-wide monotonic creation ids used as load-queue
/// tie-breakers.
pub struct Registry {
    kinds: RwLock<Vec<Arc<AssetKind>>>,
    next_id: AtomicU64,
}

impl Registry {
    pub fn new() -> Self {
        Registry {
            kinds: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(0),
        }
    }

    /// Registers a kind: rejects duplicate attribute names, precomputes
    /// the kind's folder-keyed default configs from the machine config
    /// and re-sorts the registry by priority descending (registration
    /// order is kept for ties).
    pub fn register(&self, mut kind: AssetKind, machine_config: &Value) -> Result<(), AssetError> {
        let mut kinds = self.kinds.write();

        if kinds.iter().any(|k| k.attribute() == kind.attribute()) {
            return Err(AssetError::DuplicateAttribute(kind.attribute().to_string()));
        }

        kind.defaults = compute_defaults(kind.config_section(), machine_config);

        info!(
            "registered asset kind {:?} (folder {:?}, priority {})",
            kind.attribute(),
            kind.path_string(),
            kind.priority()
        );

        kinds.push(Arc::new(kind));
        kinds.sort_by(|a, b| b.priority().cmp(&a.priority()));
        Ok(())
    }

    /// Snapshot of the registered kinds in priority order.
    pub fn kinds(&self) -> Vec<Arc<AssetKind>> {
        self.kinds.read().clone()
    }

    /// Allocates the next creation id. Ids are assigned exactly once,
    /// strictly increasing, never reused.
    pub fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed) + 1
    }
}

impl Default for Registry {
    fn default() -> Self {
        Registry::new()
    }
}
