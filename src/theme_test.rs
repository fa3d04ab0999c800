use super::*;

#[test]
fn defaults_to_light_without_file() {
    let dir = tempfile::tempdir().unwrap();
    let store = ThemeStore::new(dir.path().join("prefs.json"));
    assert_eq!(store.init(), Theme::Light);
    assert_eq!(store.theme(), Theme::Light);
}

#[test]
fn persisted_theme_survives_new_store() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("prefs.json");

    let first = ThemeStore::new(&path);
    first.set_theme(Theme::Dark).unwrap();

    let second = ThemeStore::new(&path);
    assert_eq!(second.theme(), Theme::Light);
    assert_eq!(second.init(), Theme::Dark);
}

#[test]
fn unknown_value_reads_as_light() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("prefs.json");
    std::fs::write(&path, r#"{"app-theme":"solarized"}"#).unwrap();
    assert_eq!(ThemeStore::new(&path).init(), Theme::Light);

    std::fs::write(&path, "not json").unwrap();
    assert_eq!(ThemeStore::new(&path).init(), Theme::Light);
}

#[test]
fn set_theme_keeps_other_preferences() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("prefs.json");
    std::fs::write(&path, r#"{"sidebar":"collapsed"}"#).unwrap();

    ThemeStore::new(&path).set_theme(Theme::Dark).unwrap();

    let saved: Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(saved["sidebar"], "collapsed");
    assert_eq!(saved[THEME_KEY], "dark");
}

#[test]
fn toggle_flips_and_notifies() {
    let store = ThemeStore::in_memory();
    let mut rx = store.subscribe();
    assert_eq!(store.toggle().unwrap(), Theme::Dark);
    assert!(rx.has_changed().unwrap());
    assert_eq!(*rx.borrow_and_update(), Theme::Dark);
    assert_eq!(store.toggle().unwrap(), Theme::Light);
}

#[test]
fn parse_is_case_insensitive() {
    assert_eq!(Theme::parse(" Dark "), Some(Theme::Dark));
    assert_eq!(Theme::parse("LIGHT"), Some(Theme::Light));
    assert_eq!(Theme::parse(""), None);
}
