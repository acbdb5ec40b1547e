use std::fs;
use std::path::PathBuf;

use hhsav_core::lock_policy::LockRegistry;
use hhsav_core::parser;
use hhsav_core::path::Path;
use serde_json::{Value, json};

fn workspace_root() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../..")
}

fn load_fixture() -> Value {
    let path = workspace_root().join("tests/fixtures/profile.json");
    let text = fs::read_to_string(&path).unwrap_or_else(|e| panic!("failed to read {path:?}: {e}"));
    parser::parse_document(&text).unwrap_or_else(|e| panic!("failed to parse {path:?}: {e}"))
}

#[test]
fn builtin_registry_resolves_roots_by_normalized_name() {
    let registry = LockRegistry::builtin();

    let policy = registry
        .policy_for_root("app_store")
        .expect("AppStore policy should resolve");
    assert_eq!(policy.id, "appstore_progression");
    assert!(registry.is_locked_root(&Path::parse("AppStore")));
    assert!(!registry.is_locked_root(&Path::parse("AppStore/featured")));
    assert!(!registry.is_locked_root(&Path::parse("Profile")));

    assert!(registry.is_locked_field(&Path::parse("AppStore/unlockedMarketItems/0")));
    assert!(!registry.is_locked_field(&Path::parse("AppStore/featured")));
    assert!(!registry.is_locked_field(&Path::parse("Profile/unlockedMarketItems")));
}

#[test]
fn highlight_fields_respect_root_only_policies() {
    let registry = LockRegistry::builtin();

    assert_eq!(
        registry.locked_highlight_fields(&Path::parse("AppStore")),
        vec!["unlockedMarketItems", "purchasedApps"]
    );
    assert_eq!(
        registry.locked_highlight_fields(&Path::parse("AppStore/purchasedApps")),
        vec!["purchasedApps"]
    );
    assert_eq!(
        registry.locked_highlight_fields(&Path::parse("Achievements")),
        vec!["unlocked", "unlockedAt"]
    );
    assert!(
        registry
            .locked_highlight_fields(&Path::parse("Achievements/unlocked"))
            .is_empty()
    );
    assert!(
        registry
            .locked_highlight_fields(&Path::parse("Profile"))
            .is_empty()
    );
}

#[test]
fn category_edit_that_touches_a_locked_key_is_detected() {
    let registry = LockRegistry::builtin();
    let path = Path::parse("AppStore");
    let old = json!({"unlockedMarketItems": ["theme_dark"], "featured": "weather"});
    let new = json!({"unlockedMarketItems": ["theme_dark", "theme_gold"], "featured": "maps"});

    let violation = registry
        .detect_violation(&path, &old, &new)
        .expect("violation expected");
    assert_eq!(violation.path, Path::parse("AppStore/unlockedMarketItems"));
    assert_eq!(violation.field, "unlockedMarketItems");
    assert_eq!(violation.label, "Unlocked Market Items");
    assert_eq!(violation.policy.id, "appstore_progression");
    assert_eq!(
        violation.detail(),
        "Unlocked Market Items is locked under App Store; purchases only change through play."
    );

    let (changed, restored) = registry.restore(&path, &old, &new);
    assert!(changed);
    assert_eq!(
        restored,
        json!({"unlockedMarketItems": ["theme_dark"], "featured": "maps"})
    );
}

#[test]
fn unlocked_members_change_freely() {
    let registry = LockRegistry::builtin();
    let old = json!({"unlockedMarketItems": [], "featured": "weather"});
    let new = json!({"unlockedMarketItems": [], "featured": "maps"});
    assert!(
        registry
            .detect_violation(&Path::parse("AppStore"), &old, &new)
            .is_none()
    );
    assert!(
        registry
            .detect_violation(&Path::parse("Profile"), &json!({"a": 1}), &json!({"a": 2}))
            .is_none()
    );
}

#[test]
fn removing_a_locked_key_counts_as_a_change_and_is_put_back() {
    let registry = LockRegistry::builtin();
    let path = Path::parse("Achievements");
    let old = json!({"unlocked": ["first_login"], "progress": 3});
    let new = json!({"progress": 4});

    let violation = registry
        .detect_violation(&path, &old, &new)
        .expect("violation expected");
    assert_eq!(violation.field, "unlocked");

    let (changed, restored) = registry.restore(&path, &old, &new);
    assert!(changed);
    assert_eq!(restored["unlocked"], json!(["first_login"]));
    assert_eq!(restored["progress"], json!(4));
}

#[test]
fn locked_field_selected_directly_cannot_be_restored() {
    let registry = LockRegistry::builtin();
    let path = Path::parse("AppStore/purchasedApps");
    let old = json!(["notes"]);
    let new = json!(["notes", "maps"]);

    let violation = registry
        .detect_violation(&path, &old, &new)
        .expect("violation expected");
    assert_eq!(violation.path, path);

    let (changed, value) = registry.restore(&path, &old, &new);
    assert!(!changed);
    assert_eq!(value, new);
    assert!(registry.detect_violation(&path, &old, &old).is_none());
}

#[test]
fn whole_document_edits_check_every_category() {
    let registry = LockRegistry::builtin();
    let old = load_fixture();
    let mut new = old.clone();
    new["Profile"]["name"] = json!("Robert");
    new["AppStore"]["purchasedApps"] = json!([]);

    let violation = registry
        .detect_violation(&Path::root(), &old, &new)
        .expect("violation expected");
    assert_eq!(violation.path, Path::parse("AppStore/purchasedApps"));

    let (changed, restored) = registry.restore(&Path::root(), &old, &new);
    assert!(changed);
    assert_eq!(restored["AppStore"]["purchasedApps"], json!(["notes"]));
    assert_eq!(restored["Profile"]["name"], json!("Robert"));
}
