use std::fs;
use std::path::PathBuf;

use hhsav_core::document::{DocumentStore, StoreError, WriteOptions};
use hhsav_core::parser;
use hhsav_core::path::Path;
use serde_json::{Value, json};

fn workspace_root() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../..")
}

fn fixture_path() -> PathBuf {
    workspace_root().join("tests/fixtures/profile.json")
}

fn load_fixture() -> DocumentStore {
    let text = fs::read_to_string(fixture_path()).expect("failed to read profile fixture");
    let document = parser::parse_document(&text).expect("fixture should parse");
    DocumentStore::new(document)
}

const APPEND: WriteOptions = WriteOptions {
    allow_adjacent_append: true,
};

#[test]
fn fixture_text_is_already_normalized() {
    let text = fs::read_to_string(fixture_path()).expect("failed to read profile fixture");
    let store = load_fixture();
    assert_eq!(store.encode(), text.trim_end());
}

#[test]
fn read_follows_keys_and_indices() {
    let store = load_fixture();
    let value = store
        .read(&Path::parse("Contacts/0/name"))
        .expect("contact name should exist");
    assert_eq!(value, &json!("Alice"));
    assert_eq!(store.read(&Path::root()).expect("root"), store.document());
}

#[test]
fn missing_members_and_indices_are_distinguished() {
    let store = load_fixture();

    let err = store
        .read(&Path::parse("Profile/nickname"))
        .expect_err("key should be missing");
    assert_eq!(
        err,
        StoreError::PathMissing {
            path: Path::parse("Profile/nickname")
        }
    );

    let err = store
        .read(&Path::parse("Contacts/4"))
        .expect_err("index should be out of range");
    assert_eq!(
        err,
        StoreError::IndexOutOfRange {
            path: Path::parse("Contacts"),
            index: 4,
            len: 1
        }
    );
}

#[test]
fn select_refuses_paths_that_do_not_resolve() {
    let mut store = load_fixture();
    store
        .select(Path::parse("AppStore"))
        .expect("AppStore should be selectable");
    assert!(store.select(Path::parse("AppStore/missing")).is_err());
    assert_eq!(store.selection(), &Path::parse("AppStore"));
}

#[test]
fn write_replaces_existing_members_and_elements() {
    let mut store = load_fixture();
    store
        .write(&Path::parse("Profile/name"), json!("Robert"))
        .expect("write should succeed");
    store
        .write(&Path::parse("Contacts/0"), json!({"name": "Eve", "email": "eve@example.com"}))
        .expect("element write should succeed");

    let doc = store.document();
    assert_eq!(doc["Profile"]["name"], json!("Robert"));
    assert_eq!(doc["Contacts"][0]["name"], json!("Eve"));
}

#[test]
fn final_index_one_past_the_end_appends() {
    let mut store = load_fixture();
    store
        .write(&Path::parse("AppStore/purchasedApps/1"), json!("maps"))
        .expect("append should succeed");
    assert_eq!(store.document()["AppStore"]["purchasedApps"], json!(["notes", "maps"]));

    let err = store
        .write(&Path::parse("AppStore/purchasedApps/5"), json!("x"))
        .expect_err("gap should be refused");
    assert!(matches!(err, StoreError::IndexOutOfRange { index: 5, len: 2, .. }));
}

#[test]
fn adjacent_append_creates_intermediate_containers() {
    let mut store = load_fixture();

    let err = store
        .write(&Path::parse("Profile/tags/1/label"), json!("new"))
        .expect_err("plain writes never create containers");
    assert!(matches!(err, StoreError::IndexOutOfRange { index: 1, .. }));

    store
        .write_with(&Path::parse("Profile/tags/1/label"), json!("new"), APPEND)
        .expect("adjacent append should succeed");
    assert_eq!(
        store.document()["Profile"]["tags"],
        json!([{"label": "vip"}, {"label": "new"}])
    );
}

#[test]
fn top_level_sequences_never_grow_implicitly() {
    let mut store = load_fixture();
    let before = store.document().clone();

    let err = store
        .write_with(&Path::parse("Contacts/1/name"), json!("Zed"), APPEND)
        .expect_err("top-level growth should be refused");
    assert_eq!(
        err,
        StoreError::TopLevelGrowthRefused {
            path: Path::parse("Contacts")
        }
    );

    let err = store
        .write_with(&Path::parse("Contacts/1"), json!({"name": "Zed"}), APPEND)
        .expect_err("final-index growth of a root category should be refused");
    assert_eq!(
        err,
        StoreError::TopLevelGrowthRefused {
            path: Path::parse("Contacts")
        }
    );
    assert_eq!(store.document(), &before);

    store
        .write(&Path::parse("Contacts/1"), json!({"name": "Zed"}))
        .expect("plain writes still append at the final index");
    assert_eq!(store.document()["Contacts"].as_array().map(Vec::len), Some(2));
}

#[test]
fn snapshot_restores_document_and_selection() {
    let mut store = load_fixture();
    store
        .select(Path::parse("Profile"))
        .expect("Profile should be selectable");
    let snapshot = store.snapshot();

    store
        .write(&Path::parse("Profile"), json!({"name": "Changed"}))
        .expect("write should succeed");
    store.select(Path::root()).expect("root is always selectable");
    store.restore(snapshot);

    assert_eq!(store.selection(), &Path::parse("Profile"));
    assert_eq!(store.document()["Profile"]["name"], json!("Bob"));
}

#[test]
fn writing_the_root_replaces_the_document() {
    let mut store = load_fixture();
    store
        .write(&Path::root(), json!({"only": true}))
        .expect("root write should succeed");
    assert_eq!(store.into_document(), json!({"only": true}));
}

#[test]
fn gzip_container_roundtrips_to_the_same_text() {
    let text = fs::read_to_string(fixture_path()).expect("failed to read profile fixture");
    let packed = parser::encode_container(&text, true).expect("compression should succeed");
    assert!(parser::is_compressed(&packed));
    assert_eq!(parser::decode_container(&packed).expect("gunzip"), text);

    let plain = parser::encode_container(&text, false).expect("plain encode");
    assert!(!parser::is_compressed(&plain));
    assert_eq!(parser::decode_container(&plain).expect("utf-8"), text);
}

#[test]
fn strict_parser_rejects_duplicate_keys() {
    let err = parser::parse_document("{\n  \"a\": 1,\n  \"a\": 2\n}")
        .expect_err("duplicate key should fail");
    assert!(err.message.contains("duplicate key `a`"));
    assert_eq!(err.line, 3);

    let value: Value = parser::parse_document("[1, 2]").expect("array should parse");
    assert_eq!(value, json!([1, 2]));
}
