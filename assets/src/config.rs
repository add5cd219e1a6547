//! Merged per-asset configuration.
//!
//! An asset's config is produced by overlaying (in order) the kind's
//! `default` config, the folder-specific config and any entry-specific
//! override block. The merge is key-wise: later sources win on
//! conflict, untouched keys pass through to the consumer.

use serde_json::{Map, Value};
use std::path::Path;

/// Load trigger that causes an asset to load during startup, gating
/// application continuation.
pub const PRELOAD: &str = "preload";

/// Reserved load trigger that discovery rewrites to a mode-qualified
/// token (`"<mode>_start"`).
pub const MODE_START: &str = "mode_start";

/// Fully merged settings mapping for one asset.
#[derive(Debug, Clone, Default)]
pub struct AssetConfig(Map<String, Value>);

impl AssetConfig {
    pub fn from_map(map: Map<String, Value>) -> Self {
        AssetConfig(map)
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Overlays `other` on top of this config. Keys present in `other`
    /// win; keys only present in this config are kept.
    pub fn overlay(&mut self, other: &Map<String, Value>) {
        for (key, value) in other {
            self.0.insert(key.clone(), value.clone());
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// The `load` trigger: `"preload"`, a mode-qualified token or an
    /// arbitrary event name.
    pub fn load_trigger(&self) -> Option<&str> {
        self.0.get("load").and_then(|v| v.as_str())
    }

    pub fn set_load_trigger(&mut self, trigger: &str) {
        self.0
            .insert("load".to_string(), Value::String(trigger.to_string()));
    }

    /// Scheduling priority of the asset, defaulting to 0.
    pub fn priority(&self) -> i64 {
        self.0.get("priority").and_then(|v| v.as_i64()).unwrap_or(0)
    }

    /// The `file` setting: a bare filename override before discovery,
    /// the resolved absolute path afterwards.
    pub fn file(&self) -> Option<&str> {
        self.0.get("file").and_then(|v| v.as_str())
    }

    pub fn set_file(&mut self, path: &Path) {
        self.0.insert(
            "file".to_string(),
            Value::String(path.to_string_lossy().into_owned()),
        );
    }
}

#[cfg(test)]
mod tests {
    use crate::config::AssetConfig;
    use serde_json::json;

    fn config(value: serde_json::Value) -> AssetConfig {
        AssetConfig::from_map(value.as_object().unwrap().clone())
    }

    #[test]
    fn overlay_keeps_base_keys_and_overwrites_conflicts() {
        let mut base = config(json!({"a": 1, "load": "preload"}));
        let over = json!({"a": 9, "b": 2});

        base.overlay(over.as_object().unwrap());

        assert_eq!(base.get("a"), Some(&json!(9)));
        assert_eq!(base.get("b"), Some(&json!(2)));
        assert_eq!(base.load_trigger(), Some("preload"));
    }

    #[test]
    fn priority_defaults_to_zero() {
        assert_eq!(AssetConfig::default().priority(), 0);
        assert_eq!(config(json!({"priority": 150})).priority(), 150);
    }
}
