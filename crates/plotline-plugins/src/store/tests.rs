//! Unit tests for plugin list persistence.

use std::fs;

use rstest::{fixture, rstest};
use tempfile::TempDir;

use super::*;

#[fixture]
fn dir() -> TempDir {
    TempDir::new().expect("create temp dir")
}

fn store_in(dir: &TempDir) -> RegistryStore {
    RegistryStore::new(dir.path().join("config").join("plugins.json"))
}

#[rstest]
fn missing_file_reads_as_absent(dir: TempDir) {
    assert_eq!(store_in(&dir).load().expect("load"), None);
}

#[rstest]
fn round_trip_preserves_paths_and_symbols(dir: TempDir) {
    let store = store_in(&dir);
    let plugins = vec![
        StoredPlugin::new("/opt/plugins/libtable.so", "plotline_create_plugin"),
        StoredPlugin::new("/home/ana/plugins/libfit spline.so", "make_fit"),
    ];
    store.save(&plugins).expect("save creates parent directories");
    assert_eq!(store.load().expect("load"), Some(plugins));
}

#[rstest]
fn saving_an_empty_list_reads_back_empty(dir: TempDir) {
    let store = store_in(&dir);
    store.save(&[]).expect("save");
    assert_eq!(store.load().expect("load"), Some(Vec::new()));
}

#[rstest]
fn document_uses_libpath_and_symbolname_keys(dir: TempDir) {
    let store = store_in(&dir);
    store
        .save(&[StoredPlugin::new("/opt/libx.so", "make_x")])
        .expect("save");
    let text = fs::read_to_string(store.path()).expect("read document");
    let json: serde_json::Value = serde_json::from_str(&text).expect("valid json");
    assert_eq!(json["version"], 1);
    assert_eq!(json["plugins"][0]["libpath"], "/opt/libx.so");
    assert_eq!(json["plugins"][0]["symbolname"], "make_x");
}

#[rstest]
fn save_leaves_no_staging_file(dir: TempDir) {
    let store = store_in(&dir);
    store
        .save(&[StoredPlugin::new("/opt/liby.so", "make_y")])
        .expect("save");
    let parent = store.path().parent().expect("store has a parent");
    let names: Vec<String> = fs::read_dir(parent)
        .expect("list directory")
        .filter_map(Result::ok)
        .map(|entry| entry.file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec![String::from("plugins.json")]);
}

#[rstest]
#[case::blank("  \n")]
#[case::no_plugins_key("{\"version\": 1}")]
fn empty_documents_read_as_empty_lists(dir: TempDir, #[case] contents: &str) {
    let path = dir.path().join("plugins.json");
    fs::write(&path, contents).expect("write document");
    assert_eq!(RegistryStore::new(path).load().expect("load"), Some(Vec::new()));
}

#[rstest]
fn malformed_document_is_a_format_error(dir: TempDir) {
    let path = dir.path().join("plugins.json");
    fs::write(&path, "<plugins><plugin/></plugins>").expect("write document");
    let error = RegistryStore::new(path).load().expect_err("malformed");
    assert!(matches!(error, PluginError::StoreFormat { .. }));
}

#[rstest]
fn future_version_is_refused(dir: TempDir) {
    let path = dir.path().join("plugins.json");
    fs::write(&path, "{\"version\": 2, \"plugins\": []}").expect("write document");
    let error = RegistryStore::new(path).load().expect_err("unsupported");
    assert!(matches!(
        error,
        PluginError::UnsupportedStoreVersion { version: 2, .. }
    ));
}

#[test]
fn defaults_name_the_bundled_table_plugin() {
    let defaults = default_plugins(Path::new("/opt/plotline/plugins"));
    let [table] = defaults.as_slice() else {
        panic!("expected exactly one default plugin, got {defaults:?}");
    };
    assert_eq!(table.symbol_name(), DEFAULT_SYMBOL_NAME);
    assert!(table.library_path().starts_with("/opt/plotline/plugins"));
    let file_name = table
        .library_path()
        .file_name()
        .and_then(|name| name.to_str())
        .expect("file name");
    assert!(file_name.contains(DEFAULT_PLUGIN_LIBRARY), "file name: {file_name}");
}

#[test]
fn stored_plugin_copies_descriptor_location() {
    let descriptor = PluginDescriptor::new("/opt/libz.so", "make_z");
    let stored = StoredPlugin::from(&descriptor);
    assert_eq!(stored.library_path(), Path::new("/opt/libz.so"));
    assert_eq!(stored.symbol_name(), "make_z");
}
