//! Asset kind descriptors and the opaque load/unload primitive each
//! kind supplies.

use crate::asset::Asset;
use crate::config::AssetConfig;
use crate::LoadResult;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// The synchronous load/unload primitive of one asset kind.
///
/// `load` is invoked from the loader worker thread; it may block on
/// arbitrary I/O or decoding but must not touch any manager-owned
/// shared state. `unload` is always invoked synchronously from the
/// control thread and is assumed cheap.
pub trait MediaLoader: Send + Sync {
    fn load(&self, asset: &Asset) -> LoadResult;

    fn unload(&self, asset: &Asset);
}

/// A registered category of assets (e.g. images) with its own folder,
/// extensions and priority. Immutable after registration.
pub struct AssetKind {
    attribute: String,
    config_section: String,
    path_string: String,
    extensions: Vec<String>,
    priority: i32,
    loader: Arc<dyn MediaLoader>,
    /// Folder-keyed merged default configs: `"default"` plus one entry
    /// per named subfolder with kind-specific overrides. Filled in by
    /// the registry.
    pub(crate) defaults: HashMap<String, AssetConfig>,
}

impl AssetKind {
    /// Creates a new kind descriptor.
    ///
    /// `attribute` names the instance namespace, `config_section` the
    /// block in config files, `path_string` the subfolder under a
    /// search root, `extensions` the accepted file suffixes (with the
    /// leading dot, matched case-sensitively). `priority` controls the
    /// order kinds are discovered and created in when several kinds
    /// interact; higher is first.
    pub fn new(
        attribute: &str,
        config_section: &str,
        path_string: &str,
        extensions: &[&str],
        priority: i32,
        loader: Arc<dyn MediaLoader>,
    ) -> Self {
        AssetKind {
            attribute: attribute.to_string(),
            config_section: config_section.to_string(),
            path_string: path_string.to_string(),
            extensions: extensions.iter().map(|e| e.to_string()).collect(),
            priority,
            loader,
            defaults: HashMap::new(),
        }
    }

    pub fn attribute(&self) -> &str {
        &self.attribute
    }

    pub fn config_section(&self) -> &str {
        &self.config_section
    }

    pub fn path_string(&self) -> &str {
        &self.path_string
    }

    pub fn priority(&self) -> i32 {
        self.priority
    }

    pub fn loader(&self) -> &Arc<dyn MediaLoader> {
        &self.loader
    }

    /// Returns the matched extension when the file name ends with one
    /// of the registered extensions.
    pub fn matched_extension(&self, file_name: &str) -> Option<&str> {
        self.extensions
            .iter()
            .find(|ext| file_name.ends_with(ext.as_str()))
            .map(|ext| ext.as_str())
    }

    /// The merged default config for a containing folder, falling back
    /// to the `"default"` entry when the folder has no specific one.
    pub fn folder_default(&self, folder: &str) -> AssetConfig {
        if folder != self.path_string {
            if let Some(config) = self.defaults.get(folder) {
                return config.clone();
            }
        }
        self.defaults.get("default").cloned().unwrap_or_default()
    }
}

/// Precomputes the folder-keyed default-config map for one kind from
/// the global configuration's `assets.<section>` block. The `default`
/// entry is taken verbatim; every other named entry is a deep copy of
/// `default` with that entry's own keys overlaid.
pub(crate) fn compute_defaults(
    config_section: &str,
    machine_config: &Value,
) -> HashMap<String, AssetConfig> {
    let mut defaults = HashMap::new();

    let section = machine_config
        .get("assets")
        .and_then(|assets| assets.get(config_section))
        .and_then(|section| section.as_object());

    let section = match section {
        Some(section) => section,
        None => {
            defaults.insert("default".to_string(), AssetConfig::default());
            return defaults;
        }
    };

    let base = section
        .get("default")
        .and_then(|v| v.as_object())
        .cloned()
        .unwrap_or_default();
    defaults.insert("default".to_string(), AssetConfig::from_map(base.clone()));

    for (folder, overrides) in section {
        if folder == "default" {
            continue;
        }

        let mut merged = AssetConfig::from_map(base.clone());
        if let Some(overrides) = overrides.as_object() {
            merged.overlay(overrides);
        }
        defaults.insert(folder.clone(), merged);
    }

    defaults
}

#[cfg(test)]
mod tests {
    use crate::kind::{compute_defaults, AssetKind, MediaLoader};
    use crate::{Asset, LoadResult};
    use serde_json::json;
    use std::sync::Arc;

    struct NullLoader;

    impl MediaLoader for NullLoader {
        fn load(&self, _asset: &Asset) -> LoadResult {
            Ok(())
        }

        fn unload(&self, _asset: &Asset) {}
    }

    #[test]
    fn folder_defaults_are_default_plus_overrides() {
        let config = json!({
            "assets": {
                "images": {
                    "default": {"load": "preload", "a": 1},
                    "foo": {"b": 2}
                }
            }
        });

        let defaults = compute_defaults("images", &config);

        let default = &defaults["default"];
        assert_eq!(default.get("a"), Some(&json!(1)));
        assert_eq!(default.load_trigger(), Some("preload"));

        let foo = &defaults["foo"];
        assert_eq!(foo.get("a"), Some(&json!(1)));
        assert_eq!(foo.get("b"), Some(&json!(2)));
        assert_eq!(foo.load_trigger(), Some("preload"));
    }

    #[test]
    fn missing_section_yields_empty_default() {
        let defaults = compute_defaults("sounds", &json!({}));
        assert!(defaults["default"].as_map().is_empty());
    }

    #[test]
    fn extension_match_is_case_sensitive() {
        let kind = AssetKind::new("images", "images", "images", &[".png"], 0, Arc::new(NullLoader));

        assert_eq!(kind.matched_extension("foo.png"), Some(".png"));
        assert_eq!(kind.matched_extension("foo.PNG"), None);
        assert_eq!(kind.matched_extension("foo.jpg"), None);
    }

    #[test]
    fn folder_default_falls_back_to_default_entry() {
        let config = json!({
            "assets": {"images": {"default": {"a": 1}, "foo": {"b": 2}}}
        });
        let mut kind =
            AssetKind::new("images", "images", "images", &[".png"], 0, Arc::new(NullLoader));
        kind.defaults = compute_defaults("images", &config);

        assert_eq!(kind.folder_default("foo").get("b"), Some(&json!(2)));
        assert_eq!(kind.folder_default("other").get("b"), None);
        // the root folder itself never selects a folder default
        assert_eq!(kind.folder_default("images").get("b"), None);
    }
}
