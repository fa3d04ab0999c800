use super::*;
use std::sync::Mutex;

// PORTAL_* variables are process-global; serialize the tests that touch them.
static ENV_LOCK: Mutex<()> = Mutex::new(());

const VARS: &[&str] = &[
    "PORTAL_BASE_URL",
    "PORTAL_USERS_COLLECTION",
    "PORTAL_DEFAULT_ROLE_ID",
    "PORTAL_LOCALE",
    "PORTAL_CREDENTIAL_PATH",
    "PORTAL_PREFERENCES_PATH",
    "PORTAL_REQUEST_TIMEOUT_SECS",
    "PORTAL_CONNECT_TIMEOUT_SECS",
];

/// # Safety
/// Callers hold `ENV_LOCK`.
unsafe fn clear_portal_env() {
    for var in VARS {
        unsafe { std::env::remove_var(var) };
    }
}

#[test]
fn from_env_defaults() {
    let _guard = ENV_LOCK.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
    unsafe { clear_portal_env() };

    let cfg = PortalConfig::from_env().unwrap();
    assert_eq!(cfg.base_url, DEFAULT_BASE_URL);
    assert_eq!(cfg.session, SessionConfig::default());
    assert_eq!(cfg.credential_path, PathBuf::from(DEFAULT_CREDENTIAL_PATH));
    assert_eq!(cfg.preferences_path, PathBuf::from(DEFAULT_PREFERENCES_PATH));
    assert_eq!(cfg.timeouts, ClientTimeouts::default());
}

#[test]
fn from_env_parses_overrides() {
    let _guard = ENV_LOCK.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
    unsafe {
        clear_portal_env();
        std::env::set_var("PORTAL_BASE_URL", "https://pb.example.test/");
        std::env::set_var("PORTAL_USERS_COLLECTION", "staff");
        std::env::set_var("PORTAL_DEFAULT_ROLE_ID", "role123");
        std::env::set_var("PORTAL_LOCALE", "ES");
        std::env::set_var("PORTAL_CREDENTIAL_PATH", "/tmp/portal/auth.json");
        std::env::set_var("PORTAL_REQUEST_TIMEOUT_SECS", "5");
        std::env::set_var("PORTAL_CONNECT_TIMEOUT_SECS", "bogus");
    }

    let cfg = PortalConfig::from_env().unwrap();
    assert_eq!(cfg.base_url, "https://pb.example.test");
    assert_eq!(cfg.session.users_collection, "staff");
    assert_eq!(cfg.session.default_role_id.as_deref(), Some("role123"));
    assert_eq!(cfg.session.locale, Locale::Es);
    assert_eq!(cfg.credential_path, PathBuf::from("/tmp/portal/auth.json"));
    assert_eq!(cfg.timeouts, ClientTimeouts { request_secs: 5, connect_secs: DEFAULT_CONNECT_TIMEOUT_SECS });

    unsafe { clear_portal_env() };
}

#[test]
fn from_env_rejects_unknown_locale() {
    let _guard = ENV_LOCK.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
    unsafe {
        clear_portal_env();
        std::env::set_var("PORTAL_LOCALE", "fr");
    }

    let err = PortalConfig::from_env().unwrap_err().to_string();
    assert!(err.contains("unknown PORTAL_LOCALE"));

    unsafe { clear_portal_env() };
}

#[test]
fn from_env_rejects_blank_users_collection() {
    let _guard = ENV_LOCK.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
    unsafe {
        clear_portal_env();
        std::env::set_var("PORTAL_USERS_COLLECTION", "  ");
    }

    assert!(PortalConfig::from_env().is_err());

    unsafe { clear_portal_env() };
}

#[test]
fn parse_locale_defaults_to_english() {
    assert_eq!(parse_locale(None).unwrap(), Locale::En);
    assert_eq!(parse_locale(Some("es")).unwrap(), Locale::Es);
}

#[test]
fn env_parse_u64_falls_back_on_garbage() {
    assert_eq!(env_parse_u64("__PORTAL_TEST_SURELY_UNSET_7731__", 9), 9);
}
