//! The asset manager: discovery, namespaces, batch progress tracking
//! and startup gating.

use crate::asset::Asset;
use crate::config::{AssetConfig, PRELOAD};
use crate::kind::AssetKind;
use crate::queue::{LoadQueue, LoadRequest};
use crate::registry::Registry;
use crate::scanner::create_asset_config_entries;
use crate::ticker::Ticker;
use crate::worker::spawn_loader_thread;
use crate::{AssetError, LoaderFault};
use common::events::EventBus;
use common::notification::{notification, Receiver as GateReceiver};
use crossbeam::channel::{unbounded, Receiver};
use log::{debug, info, trace, warn};
use parking_lot::{Mutex, RwLock};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Weak};
use std::time::Duration;

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(10);

#[derive(Default)]
struct Progress {
    /// Total number of assets that are or will be loaded in the current
    /// batch. Reset to 0 when `loaded` catches up.
    to_load: usize,
    loaded: usize,
}

/// Owns discovery, the load queue, the loader worker and the poll
/// ticker; tracks aggregate load progress and gates application
/// startup on completion of preload-tagged assets.
///
/// The manager is thread-safe behind an `Arc`: the worker thread only
/// ever touches assets handed to it through the queue, and the poll
/// tick may run on the manager's own timer thread.
pub struct AssetManager {
    machine_root: PathBuf,
    machine_config: Value,
    registry: Registry,
    /// Per-kind namespaces of created assets, keyed by kind attribute
    /// and then by asset name.
    namespaces: RwLock<HashMap<String, HashMap<String, Arc<Asset>>>>,
    progress: Mutex<Progress>,
    queue: Arc<LoadQueue>,
    loaded_recv: Receiver<Arc<Asset>>,
    fault_recv: Receiver<LoaderFault>,
    fault: Mutex<Option<LoaderFault>>,
    gate: Mutex<Option<common::notification::Sender>>,
    ticker: Ticker,
    me: Weak<AssetManager>,
}

impl AssetManager {
    /// Creates a manager rooted at the machine folder and starts the
    /// loader worker. `machine_config` is the already-parsed global
    /// configuration; its `assets.<section>` blocks feed the per-kind
    /// default configs.
    pub fn new(machine_root: impl Into<PathBuf>, machine_config: Value) -> Arc<AssetManager> {
        Self::with_poll_interval(machine_root, machine_config, DEFAULT_POLL_INTERVAL)
    }

    pub fn with_poll_interval(
        machine_root: impl Into<PathBuf>,
        machine_config: Value,
        poll_interval: Duration,
    ) -> Arc<AssetManager> {
        let queue = LoadQueue::new();
        let (loaded_send, loaded_recv) = unbounded();
        let (fault_send, fault_recv) = unbounded();

        spawn_loader_thread(queue.clone(), loaded_send, fault_send);

        Arc::new_cyclic(|me| AssetManager {
            machine_root: machine_root.into(),
            machine_config,
            registry: Registry::new(),
            namespaces: RwLock::new(HashMap::new()),
            progress: Mutex::new(Progress::default()),
            queue,
            loaded_recv,
            fault_recv,
            fault: Mutex::new(None),
            gate: Mutex::new(None),
            ticker: Ticker::spawn(me.clone(), poll_interval),
            me: me.clone(),
        })
    }

    /// Registers an asset kind. Fails when the kind's attribute name is
    /// already in use.
    pub fn register(&self, kind: AssetKind) -> Result<(), AssetError> {
        self.registry.register(kind, &self.machine_config)
    }

    /// Walks the asset folders under `root` (the machine root when
    /// omitted) for every registered kind, merges configs and creates
    /// one asset per final config entry into the kind's namespace.
    /// `config` is the machine or mode config; discovered entries are
    /// written back into its per-kind sections. `mode_name` scopes
    /// `mode_start` load triggers.
    pub fn create_assets(
        &self,
        config: &mut Map<String, Value>,
        mode_name: Option<&str>,
        root: Option<&Path>,
    ) {
        let root = root.unwrap_or(&self.machine_root);

        for kind in self.registry.kinds() {
            let section = config
                .entry(kind.config_section().to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            let section = match section.as_object_mut() {
                Some(section) => section,
                None => {
                    warn!(
                        "config section {:?} is not a mapping, skipping",
                        kind.config_section()
                    );
                    continue;
                }
            };

            create_asset_config_entries(&kind, section, mode_name, root);

            let mut namespaces = self.namespaces.write();
            let namespace = namespaces
                .entry(kind.attribute().to_string())
                .or_insert_with(HashMap::new);

            for (name, entry) in section.iter() {
                let asset_config =
                    AssetConfig::from_map(entry.as_object().cloned().unwrap_or_default());
                let path = PathBuf::from(asset_config.file().unwrap_or_default());
                let asset = Asset::new(
                    name.clone(),
                    kind.clone(),
                    path,
                    asset_config,
                    self.registry.next_id(),
                    self.me.clone(),
                );
                namespace.insert(name.clone(), asset);
            }

            debug!(
                "created {} {:?} assets",
                namespace.len(),
                kind.attribute()
            );
        }
    }

    /// Looks up one created asset by kind attribute and name.
    pub fn asset(&self, attribute: &str, name: &str) -> Option<Arc<Asset>> {
        self.namespaces
            .read()
            .get(attribute)
            .and_then(|namespace| namespace.get(name))
            .cloned()
    }

    /// All created assets of one kind.
    pub fn assets(&self, attribute: &str) -> Vec<Arc<Asset>> {
        self.namespaces
            .read()
            .get(attribute)
            .map(|namespace| namespace.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Submits a load request. Called by [`Asset::load`] with the
    /// priority snapshotted at submission time.
    pub(crate) fn request_load(&self, asset: Arc<Asset>, priority: i64) {
        self.progress.lock().to_load += 1;
        self.queue.push(LoadRequest::new(asset, priority));
        self.ticker.activate();
    }

    /// One poll tick: drains the fault channel, then fully drains the
    /// completion channel, marking each completed asset loaded and
    /// firing its callbacks. When the batch drains (`loaded` catches up
    /// with `to_load`) both counters reset to zero, polling stops and
    /// the startup gate, when armed, is released.
    ///
    /// Returns the first worker fault, which the caller must treat as
    /// fatal: the single worker is gone and no further completions will
    /// ever arrive.
    pub fn poll(&self) -> Result<(), LoaderFault> {
        if let Ok(fault) = self.fault_recv.try_recv() {
            *self.fault.lock() = Some(fault.clone());
            self.ticker.deactivate();
            self.release_gate();
            return Err(fault);
        }

        let mut completed = 0usize;
        while let Ok(asset) = self.loaded_recv.try_recv() {
            trace!("completed load of asset {:?}", asset.name());
            asset.mark_loaded();
            completed += 1;
        }

        let mut progress = self.progress.lock();
        progress.loaded += completed;

        if progress.loaded == progress.to_load {
            if progress.to_load > 0 {
                info!("load batch complete ({} assets)", progress.to_load);
            }
            progress.to_load = 0;
            progress.loaded = 0;
            drop(progress);

            self.ticker.deactivate();
            self.release_gate();
        }

        Ok(())
    }

    /// Current `(loaded, to_load)` progress counters of the running
    /// batch; `(0, 0)` when idle.
    pub fn progress(&self) -> (usize, usize) {
        let progress = self.progress.lock();
        (progress.loaded, progress.to_load)
    }

    /// The first recorded worker fault, if any. Hosts that rely on the
    /// built-in poll ticker check this instead of calling `poll`.
    pub fn fault(&self) -> Option<LoaderFault> {
        self.fault.lock().clone()
    }

    /// Loads every asset whose `load` trigger is `preload` and returns
    /// a gate that is signaled once the preload batch fully drains
    /// (immediately when there is nothing outstanding). Application
    /// startup blocks on this gate.
    pub fn preload_assets(&self) -> GateReceiver {
        let (send, recv) = notification();

        let preload = self.collect_by_trigger(PRELOAD);
        info!("preloading {} assets", preload.len());
        for asset in &preload {
            asset.load(None, None);
        }

        *self.gate.lock() = Some(send);

        // everything may already have drained (or nothing was tagged
        // for preload at all)
        if self.progress.lock().to_load == 0 {
            self.release_gate();
        }

        recv
    }

    /// Loads every asset across all kinds whose `load` trigger equals
    /// `key` and returns them, e.g. for unloading when a mode ends.
    pub fn load_by_trigger(&self, key: &str) -> Vec<Arc<Asset>> {
        let assets = self.collect_by_trigger(key);
        for asset in &assets {
            asset.load(None, None);
        }
        assets
    }

    /// Loads the assets tagged to load when `mode` starts.
    pub fn load_mode_assets(&self, mode: &str) -> Vec<Arc<Asset>> {
        self.load_by_trigger(&format!("{}_start", mode))
    }

    /// Unloads a heterogeneous collection of assets, synchronously.
    pub fn unload_assets<I>(&self, assets: I)
    where
        I: IntoIterator<Item = Arc<Asset>>,
    {
        for asset in assets {
            asset.unload();
        }
    }

    /// Subscribes every distinct non-preload load trigger on the given
    /// event bus, so firing the named event batch-loads the assets
    /// tagged with it.
    pub fn attach_events(&self, bus: &dyn EventBus) {
        let mut triggers: Vec<String> = Vec::new();
        {
            let namespaces = self.namespaces.read();
            for namespace in namespaces.values() {
                for asset in namespace.values() {
                    if let Some(trigger) = asset.config().load_trigger() {
                        if trigger != PRELOAD && !triggers.iter().any(|t| t == trigger) {
                            triggers.push(trigger.to_string());
                        }
                    }
                }
            }
        }

        for trigger in triggers {
            let manager = self.me.clone();
            let event = trigger.clone();
            bus.subscribe(
                &trigger,
                Arc::new(move || {
                    if let Some(manager) = manager.upgrade() {
                        manager.load_by_trigger(&event);
                    }
                }),
            );
        }
    }

    /// Resolves a file by checking `root` first and the machine root
    /// second, inserting the kind's path string between root and file
    /// name.
    pub fn locate_asset_file(
        &self,
        file_name: &str,
        path_string: &str,
        root: Option<&Path>,
    ) -> Result<PathBuf, AssetError> {
        let mut searched = Vec::new();

        for root in root.iter().copied().chain(Some(self.machine_root.as_path())) {
            let candidate = root.join(path_string).join(file_name);
            if candidate.is_file() {
                return Ok(candidate);
            }
            searched.push(candidate);
        }

        Err(AssetError::FileNotFound {
            file: file_name.to_string(),
            searched,
        })
    }

    fn collect_by_trigger(&self, key: &str) -> Vec<Arc<Asset>> {
        let mut out = Vec::new();
        let namespaces = self.namespaces.read();

        for kind in self.registry.kinds() {
            if let Some(namespace) = namespaces.get(kind.attribute()) {
                for asset in namespace.values() {
                    if asset.config().load_trigger() == Some(key) {
                        out.push(asset.clone());
                    }
                }
            }
        }

        out
    }

    fn release_gate(&self) {
        if let Some(gate) = self.gate.lock().take() {
            gate.signal();
        }
    }
}

impl Drop for AssetManager {
    fn drop(&mut self) {
        self.queue.close();
        self.ticker.shutdown();
    }
}
