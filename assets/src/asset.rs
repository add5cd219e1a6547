//! The lifecycle entity for one discovered media file.

use crate::config::AssetConfig;
use crate::kind::AssetKind;
use crate::manager::AssetManager;
use log::trace;
use parking_lot::Mutex;
use std::fmt;
use std::mem;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Weak};

/// Completion callback registered with [`Asset::load`]. Callbacks are
/// deduplicated by identity and fire at most once per load cycle that
/// actually completes.
pub type LoadCallback = Arc<dyn Fn() + Send + Sync>;

/// All possible lifecycle states of an asset. An asset is in exactly
/// one state at any observation point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    /// Not in memory. The initial state.
    Unloaded,
    /// A load request has been submitted and not yet completed.
    Loading,
    /// The load primitive finished and the asset is ready to be used.
    Loaded,
    /// The unload primitive is currently running.
    Unloading,
}

struct Inner {
    state: LoadState,
    priority: i64,
    callbacks: Vec<LoadCallback>,
}

/// One discovered media file: its identity (kind attribute + name),
/// merged config, resolved path and lifecycle state.
pub struct Asset {
    name: String,
    /// Monotonic creation id, used only as a tie-breaker in the load
    /// queue so equal-priority requests dequeue in submission order.
    id: u64,
    kind: Arc<AssetKind>,
    path: PathBuf,
    config: AssetConfig,
    manager: Weak<AssetManager>,
    me: Weak<Asset>,
    inner: Mutex<Inner>,
}

impl Asset {
    pub(crate) fn new(
        name: String,
        kind: Arc<AssetKind>,
        path: PathBuf,
        config: AssetConfig,
        id: u64,
        manager: Weak<AssetManager>,
    ) -> Arc<Asset> {
        let priority = config.priority();
        Arc::new_cyclic(|me| Asset {
            name,
            id,
            kind,
            path,
            config,
            manager,
            me: me.clone(),
            inner: Mutex::new(Inner {
                state: LoadState::Unloaded,
                priority,
                callbacks: Vec::new(),
            }),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn kind(&self) -> &Arc<AssetKind> {
        &self.kind
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn config(&self) -> &AssetConfig {
        &self.config
    }

    pub fn state(&self) -> LoadState {
        self.inner.lock().state
    }

    pub fn is_loaded(&self) -> bool {
        self.state() == LoadState::Loaded
    }

    pub fn priority(&self) -> i64 {
        self.inner.lock().priority
    }

    /// Requests the asset to be loaded on the background worker.
    ///
    /// A priority override updates the stored priority and affects
    /// future queue positions only, never a request already enqueued.
    /// When the asset is already loaded all pending callbacks fire
    /// synchronously before this method returns, without enqueuing
    /// anything. Calling `load` while the asset is unloading has no
    /// defined ordering with the running unload.
    pub fn load(&self, callback: Option<LoadCallback>, priority: Option<i64>) {
        let mut inner = self.inner.lock();

        if let Some(priority) = priority {
            inner.priority = priority;
        }

        if let Some(callback) = callback {
            // set semantics: the same callback registered twice fires once
            if !inner.callbacks.iter().any(|c| Arc::ptr_eq(c, &callback)) {
                inner.callbacks.push(callback);
            }
        }

        if inner.state == LoadState::Loaded {
            let callbacks = mem::take(&mut inner.callbacks);
            drop(inner);
            for callback in callbacks {
                callback();
            }
            return;
        }

        inner.state = LoadState::Loading;
        let priority = inner.priority;
        drop(inner);

        trace!("requesting load of asset {:?}", self.name);
        if let (Some(manager), Some(me)) = (self.manager.upgrade(), self.me.upgrade()) {
            manager.request_load(me, priority);
        }
    }

    /// Unloads the asset synchronously on the calling thread. Unload
    /// never goes through the worker queue: the unload primitive is
    /// assumed cheap and local, unlike a load which may block on slow
    /// I/O or decoding.
    pub fn unload(&self) {
        self.inner.lock().state = LoadState::Unloading;
        self.kind.loader().unload(self);
        self.inner.lock().state = LoadState::Unloaded;
        trace!("unloaded asset {:?}", self.name);
    }

    /// Marks the asset loaded and fires the pending callback set,
    /// consuming it. Called by the manager when it drains a completion.
    pub(crate) fn mark_loaded(&self) {
        let callbacks = {
            let mut inner = self.inner.lock();
            inner.state = LoadState::Loaded;
            mem::take(&mut inner.callbacks)
        };

        for callback in callbacks {
            callback();
        }
    }
}

impl fmt::Debug for Asset {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Asset")
            .field("kind", &self.kind.attribute())
            .field("name", &self.name)
            .field("state", &self.state())
            .finish()
    }
}
