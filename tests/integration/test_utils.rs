//! Shared test utilities for integration tests
//!
//! Serializes access to process environment variables so config tests running in
//! parallel cannot observe each other's overrides.

use std::sync::Mutex;
use tempfile::TempDir;

/// Global mutex to serialize environment variable access across all tests
static ENV_MUTEX: Mutex<()> = Mutex::new(());

const MANAGED_VARS: &[&str] = &[
    "HOME",
    "XDG_CONFIG_HOME",
    "LIVEQUERY_ENV",
    "LIVEQUERY_ENDPOINT__URL",
    "LIVEQUERY_AUTH__TOKEN_TTL_MS",
];

/// Environment variable state to restore after test
struct EnvState(Vec<(&'static str, Option<String>)>);

impl EnvState {
    fn capture() -> Self {
        Self(
            MANAGED_VARS
                .iter()
                .map(|name| (*name, std::env::var(name).ok()))
                .collect(),
        )
    }

    fn restore(self) {
        for (name, value) in self.0 {
            match value {
                Some(value) => std::env::set_var(name, value),
                None => std::env::remove_var(name),
            }
        }
    }
}

/// Run `f` with an isolated config home and the given variables set.
///
/// - Points XDG_CONFIG_HOME and HOME into `test_dir`
/// - Clears every livequery variable not listed in `vars`
/// - Restores the original environment afterwards
pub fn with_env<F, R>(test_dir: &TempDir, vars: &[(&str, &str)], f: F) -> R
where
    F: FnOnce() -> R,
{
    let _guard = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    let env_state = EnvState::capture();

    let config_home = test_dir.path().join("config-home");
    let home = test_dir.path().join("home");
    std::fs::create_dir_all(&config_home).unwrap();
    std::fs::create_dir_all(&home).unwrap();

    for name in MANAGED_VARS {
        std::env::remove_var(name);
    }
    std::env::set_var("HOME", home.to_str().unwrap());
    std::env::set_var("XDG_CONFIG_HOME", config_home.to_str().unwrap());
    for (name, value) in vars {
        std::env::set_var(name, value);
    }

    let result = f();

    env_state.restore();

    result
}
