use std::{
    env, fs,
    path::PathBuf,
    sync::{Mutex, MutexGuard, OnceLock},
};

use tempfile::TempDir;
use vendor_console::config::ConfigLoader;

const KEYS: [&str; 6] = [
    "VENDOR_CONSOLE_PROFILE",
    "VENDOR_CONSOLE_API_BIND_ADDR",
    "VENDOR_CONSOLE_LOG_LEVEL",
    "VENDOR_CONSOLE_AUTH_URL",
    "VENDOR_CONSOLE_AUTH_API_KEY",
    "VENDOR_CONSOLE_RUN_MIGRATIONS",
];

fn env_lock() -> &'static Mutex<()> {
    static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    LOCK.get_or_init(|| Mutex::new(()))
}

fn env_guard() -> MutexGuard<'static, ()> {
    env_lock()
        .lock()
        .unwrap_or_else(|poison| poison.into_inner())
}

fn clear_env() {
    for key in KEYS {
        unsafe {
            env::remove_var(key);
        }
    }
}

fn write_env_file(dir: &TempDir, name: &str, contents: &str) {
    let path = dir.path().join(name);
    fs::write(path, contents).unwrap();
}

#[test]
fn loads_defaults_when_no_env_present() {
    let _guard = env_guard();
    clear_env();

    let temp_dir = TempDir::new().unwrap();
    let loader = ConfigLoader::with_base_dir(PathBuf::from(temp_dir.path()));
    let cfg = loader.load().expect("config loads with defaults");

    assert_eq!(cfg.profile, "local");
    assert_eq!(cfg.api_bind_addr, "0.0.0.0:8080");
    assert_eq!(cfg.log_level, "info");
    assert_eq!(cfg.auth_url, "http://localhost:9999");
    assert!(cfg.auth_api_key.is_none());
    assert!(cfg.run_migrations);
    cfg.bind_addr().expect("default bind addr parses");
    clear_env();
}

#[test]
fn layered_env_files_apply_in_order() {
    let _guard = env_guard();
    clear_env();

    let temp_dir = TempDir::new().unwrap();
    write_env_file(
        &temp_dir,
        ".env",
        "VENDOR_CONSOLE_API_BIND_ADDR=127.0.0.1:3000\n",
    );
    write_env_file(
        &temp_dir,
        ".env.test",
        "VENDOR_CONSOLE_API_BIND_ADDR=192.168.0.10:5000\nVENDOR_CONSOLE_AUTH_URL=http://auth.test/\n",
    );
    write_env_file(
        &temp_dir,
        ".env.test.local",
        "VENDOR_CONSOLE_API_BIND_ADDR=10.0.0.5:6000\n",
    );

    // Select profile via .env.local before profile-specific files load.
    write_env_file(
        &temp_dir,
        ".env.local",
        "VENDOR_CONSOLE_PROFILE=test\nVENDOR_CONSOLE_API_BIND_ADDR=127.0.0.1:4000\n",
    );

    let loader = ConfigLoader::with_base_dir(PathBuf::from(temp_dir.path()));
    let cfg = loader.load().expect("config loads with layered env files");

    assert_eq!(cfg.profile, "test");
    assert_eq!(cfg.api_bind_addr, "10.0.0.5:6000");
    assert_eq!(cfg.auth_url, "http://auth.test");
    clear_env();
}

#[test]
fn os_environment_has_highest_precedence() {
    let _guard = env_guard();
    clear_env();

    let temp_dir = TempDir::new().unwrap();
    write_env_file(
        &temp_dir,
        ".env",
        "VENDOR_CONSOLE_API_BIND_ADDR=127.0.0.1:3000\nVENDOR_CONSOLE_RUN_MIGRATIONS=true\n",
    );

    unsafe {
        env::set_var("VENDOR_CONSOLE_API_BIND_ADDR", "0.0.0.0:9090");
        env::set_var("VENDOR_CONSOLE_RUN_MIGRATIONS", "false");
    }

    let loader = ConfigLoader::with_base_dir(PathBuf::from(temp_dir.path()));
    let cfg = loader.load().expect("config loads with env override");
    assert_eq!(cfg.api_bind_addr, "0.0.0.0:9090");
    assert!(!cfg.run_migrations);

    clear_env();
}

#[test]
fn invalid_bind_addr_returns_error() {
    let _guard = env_guard();
    clear_env();

    unsafe {
        env::set_var("VENDOR_CONSOLE_API_BIND_ADDR", "not-an-addr");
    }
    let temp_dir = TempDir::new().unwrap();
    let loader = ConfigLoader::with_base_dir(PathBuf::from(temp_dir.path()));
    let err = loader.load().expect_err("invalid bind addr should fail");
    assert!(format!("{}", err).contains("invalid api bind address"));

    clear_env();
}

#[test]
fn production_profile_requires_auth_api_key() {
    let _guard = env_guard();
    clear_env();

    let temp_dir = TempDir::new().unwrap();
    write_env_file(&temp_dir, ".env", "VENDOR_CONSOLE_PROFILE=production\n");

    let loader = ConfigLoader::with_base_dir(PathBuf::from(temp_dir.path()));
    let err = loader.load().expect_err("missing api key should fail");
    assert!(format!("{}", err).contains("VENDOR_CONSOLE_AUTH_API_KEY"));

    unsafe {
        env::set_var("VENDOR_CONSOLE_AUTH_API_KEY", "anon-key");
    }
    let cfg = loader.load().expect("api key satisfies production validation");
    assert_eq!(cfg.auth_api_key.as_deref(), Some("anon-key"));

    clear_env();
}

#[test]
fn unparseable_boolean_is_reported_with_key() {
    let _guard = env_guard();
    clear_env();

    unsafe {
        env::set_var("VENDOR_CONSOLE_RUN_MIGRATIONS", "sometimes");
    }
    let temp_dir = TempDir::new().unwrap();
    let loader = ConfigLoader::with_base_dir(PathBuf::from(temp_dir.path()));
    let err = loader.load().expect_err("bad boolean should fail");
    assert!(format!("{}", err).contains("RUN_MIGRATIONS"));

    clear_env();
}
