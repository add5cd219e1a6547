//! Walking asset folders on disk and building the merged config entry
//! for every discovered file.

use crate::config::{AssetConfig, MODE_START};
use crate::kind::AssetKind;
use log::{trace, warn};
use serde_json::{Map, Value};
use std::path::Path;
use walkdir::WalkDir;

/// Recursively walks `root/<path_string>` (following symlinks) and
/// creates or updates an entry in `config` for every file matching one
/// of the kind's extensions.
///
/// For each file the working config starts as a copy of the folder
/// default (or `"default"` when the containing folder has no specific
/// one). Existing entries are then scanned for one whose explicit
/// `file` setting equals the file name or whose key equals the
/// lower-cased stem; the first match lends the entry its name and has
/// its settings merged over the working config, later matches are
/// ignored. The resolved absolute path lands in `file`, and a
/// `mode_start` load trigger is rewritten to `"<mode>_start"`.
///
/// Two files resolving to the same name overwrite one another: the
/// last one discovered wins, with a warning but no error.
pub(crate) fn create_asset_config_entries(
    kind: &AssetKind,
    config: &mut Map<String, Value>,
    mode_name: Option<&str>,
    root: &Path,
) {
    let root_path = root.join(kind.path_string());
    trace!(
        "processing {:?} assets from folder {:?}",
        kind.attribute(),
        root_path
    );

    for entry in WalkDir::new(&root_path).follow_links(true) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                trace!("skipping unreadable entry under {:?}: {}", root_path, e);
                continue;
            }
        };

        if !entry.file_type().is_file() {
            continue;
        }

        let file_name = entry.file_name().to_string_lossy().into_owned();
        let ext = match kind.matched_extension(&file_name) {
            Some(ext) => ext,
            None => continue,
        };

        let folder = entry
            .path()
            .parent()
            .and_then(|p| p.file_name())
            .map(|f| f.to_string_lossy().into_owned())
            .unwrap_or_default();
        let stem = file_name[..file_name.len() - ext.len()].to_lowercase();

        let mut built_up = kind.folder_default(&folder);
        let mut name = stem;

        // adopt the name and settings of the first existing entry that
        // either names this file explicitly or matches the stem
        for (key, value) in config.iter() {
            let entry_file = value.get("file").and_then(|f| f.as_str());
            if entry_file == Some(file_name.as_str()) || *key == name {
                name = key.clone();
                if let Some(settings) = value.as_object() {
                    built_up.overlay(settings);
                }
                break;
            }
        }

        let full_path = entry.path().to_path_buf();
        built_up.set_file(&full_path);

        if built_up.load_trigger() == Some(MODE_START) {
            if let Some(mode) = mode_name {
                built_up.set_load_trigger(&format!("{}_start", mode));
            }
        }

        if let Some(previous) = config.insert(name.clone(), Value::Object(built_up.into_map())) {
            let previous_file = previous.get("file").and_then(|f| f.as_str());
            if let Some(previous_file) = previous_file {
                if Path::new(previous_file).is_absolute()
                    && Path::new(previous_file) != full_path.as_path()
                {
                    warn!(
                        "asset name {:?} resolves to both {:?} and {:?}; keeping the latter",
                        name, previous_file, full_path
                    );
                }
            }
        }

        trace!("registered asset entry {:?} -> {:?}", name, full_path);
    }
}

#[cfg(test)]
mod tests {
    use crate::asset::Asset;
    use crate::kind::{compute_defaults, AssetKind, MediaLoader};
    use crate::scanner::create_asset_config_entries;
    use crate::LoadResult;
    use serde_json::{json, Map, Value};
    use std::fs::{create_dir_all, File};
    use std::path::Path;
    use std::sync::Arc;

    struct NullLoader;

    impl MediaLoader for NullLoader {
        fn load(&self, _asset: &Asset) -> LoadResult {
            Ok(())
        }

        fn unload(&self, _asset: &Asset) {}
    }

    fn image_kind(machine_config: &Value) -> AssetKind {
        let mut kind = AssetKind::new(
            "images",
            "images",
            "images",
            &[".png"],
            0,
            Arc::new(NullLoader),
        );
        kind.defaults = compute_defaults("images", machine_config);
        kind
    }

    fn touch(path: &Path) {
        create_dir_all(path.parent().unwrap()).unwrap();
        File::create(path).unwrap();
    }

    #[test]
    fn merges_default_folder_and_entry_settings() {
        let root = tempfile::tempdir().unwrap();
        touch(&root.path().join("images/foo/pic.png"));

        let machine_config = json!({
            "assets": {
                "images": {
                    "default": {"a": 1},
                    "foo": {"b": 2}
                }
            }
        });
        let kind = image_kind(&machine_config);

        let mut config: Map<String, Value> =
            json!({"pic": {"a": 9}}).as_object().unwrap().clone();
        create_asset_config_entries(&kind, &mut config, None, root.path());

        let entry = config["pic"].as_object().unwrap();
        assert_eq!(entry["a"], json!(9));
        assert_eq!(entry["b"], json!(2));
        assert_eq!(
            entry["file"].as_str().unwrap(),
            root.path().join("images/foo/pic.png").to_str().unwrap()
        );
    }

    #[test]
    fn explicit_file_setting_lends_the_entry_name() {
        let root = tempfile::tempdir().unwrap();
        touch(&root.path().join("images/Background01.png"));

        let kind = image_kind(&json!({}));
        let mut config: Map<String, Value> = json!({"menu_bg": {"file": "Background01.png"}})
            .as_object()
            .unwrap()
            .clone();
        create_asset_config_entries(&kind, &mut config, None, root.path());

        assert!(config.contains_key("menu_bg"));
        assert!(!config.contains_key("background01"));
    }

    #[test]
    fn name_collision_keeps_exactly_one_entry() {
        let root = tempfile::tempdir().unwrap();
        let first = root.path().join("images/sub1/x.png");
        let second = root.path().join("images/sub2/x.png");
        touch(&first);
        touch(&second);

        let kind = image_kind(&json!({}));
        let mut config = Map::new();
        create_asset_config_entries(&kind, &mut config, None, root.path());

        // last one discovered wins; accepted behavior, not a contract
        assert_eq!(config.len(), 1);
        let file = config["x"]["file"].as_str().unwrap();
        assert!(file == first.to_str().unwrap() || file == second.to_str().unwrap());
    }

    #[test]
    fn mode_start_trigger_is_rewritten_per_mode() {
        let root = tempfile::tempdir().unwrap();
        touch(&root.path().join("images/splash.png"));

        let machine_config = json!({
            "assets": {"images": {"default": {"load": "mode_start"}}}
        });
        let kind = image_kind(&machine_config);

        let mut config = Map::new();
        create_asset_config_entries(&kind, &mut config, Some("attract"), root.path());

        assert_eq!(config["splash"]["load"], json!("attract_start"));
    }

    #[test]
    fn stems_are_lower_cased_and_extensions_case_sensitive() {
        let root = tempfile::tempdir().unwrap();
        touch(&root.path().join("images/Title.png"));
        touch(&root.path().join("images/skipped.PNG"));

        let kind = image_kind(&json!({}));
        let mut config = Map::new();
        create_asset_config_entries(&kind, &mut config, None, root.path());

        assert!(config.contains_key("title"));
        assert_eq!(config.len(), 1);
    }
}
