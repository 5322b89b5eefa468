//! Configuration types and loading
//!
//! Config precedence: CLI arg > env var > default path. The options
//! surface (experimental flag, scan interval, dark hours) belongs to the
//! polling scheduler outside the login core; the CLI validates the bounds
//! and logs the values so a bad config fails at startup, not at 3am.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use lynkco_flow::PkceRetryPolicy;

/// Root configuration
#[derive(Debug, Deserialize)]
pub struct Config {
    pub storage: StorageConfig,
    #[serde(default)]
    pub options: OptionsConfig,
    #[serde(default)]
    pub login: LoginConfig,
}

/// Durable file locations
#[derive(Debug, Deserialize)]
pub struct StorageConfig {
    /// Token bundle (refresh + CCC token)
    pub credentials_path: PathBuf,
    /// Vehicle entry record
    pub entry_path: PathBuf,
}

/// Scheduler-facing options (consumed outside the login core)
#[derive(Debug, Deserialize)]
pub struct OptionsConfig {
    #[serde(default)]
    pub experimental: bool,
    /// Minutes between vehicle state polls, 60-1440
    #[serde(default = "default_scan_interval")]
    pub scan_interval_minutes: u64,
    /// Hour (0-23) polling goes quiet
    #[serde(default = "default_dark_hours_start")]
    pub dark_hours_start: u8,
    /// Hour (0-23) polling resumes
    #[serde(default = "default_dark_hours_end")]
    pub dark_hours_end: u8,
}

impl Default for OptionsConfig {
    fn default() -> Self {
        Self {
            experimental: false,
            scan_interval_minutes: default_scan_interval(),
            dark_hours_start: default_dark_hours_start(),
            dark_hours_end: default_dark_hours_end(),
        }
    }
}

/// Login flow tuning
#[derive(Debug, Default, Deserialize)]
pub struct LoginConfig {
    #[serde(default)]
    pub pkce_retry: PkceRetrySetting,
}

/// Whether a failed code exchange reuses the PKCE pair on retry.
/// Pair reusability is vendor-specific; regenerating is the safe default.
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PkceRetrySetting {
    #[default]
    Regenerate,
    Reuse,
}

impl PkceRetrySetting {
    pub fn policy(self) -> PkceRetryPolicy {
        match self {
            PkceRetrySetting::Regenerate => PkceRetryPolicy::Regenerate,
            PkceRetrySetting::Reuse => PkceRetryPolicy::Reuse,
        }
    }
}

fn default_scan_interval() -> u64 {
    120
}

fn default_dark_hours_start() -> u8 {
    1
}

fn default_dark_hours_end() -> u8 {
    5
}

impl Config {
    /// Load configuration from a TOML file and validate bounds.
    pub fn load(path: &Path) -> common::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;

        if !(60..=1440).contains(&config.options.scan_interval_minutes) {
            return Err(common::Error::Config(format!(
                "scan_interval_minutes must be 60-1440, got: {}",
                config.options.scan_interval_minutes
            )));
        }

        if config.options.dark_hours_start > 23 {
            return Err(common::Error::Config(format!(
                "dark_hours_start must be 0-23, got: {}",
                config.options.dark_hours_start
            )));
        }

        if config.options.dark_hours_end > 23 {
            return Err(common::Error::Config(format!(
                "dark_hours_end must be 0-23, got: {}",
                config.options.dark_hours_end
            )));
        }

        Ok(config)
    }

    /// Resolve config file path from CLI arg or LYNKCO_LOGIN_CONFIG env var.
    pub fn resolve_path(cli_path: Option<&str>) -> PathBuf {
        if let Some(p) = cli_path {
            return PathBuf::from(p);
        }
        if let Ok(p) = std::env::var("LYNKCO_LOGIN_CONFIG") {
            return PathBuf::from(p);
        }
        PathBuf::from("lynkco-login.toml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Mutex to serialize tests that mutate environment variables, preventing
    /// data races when tests run in parallel.
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    /// SAFETY: Callers must hold ENV_MUTEX to prevent concurrent env mutation.
    unsafe fn set_env(key: &str, val: &str) {
        unsafe { std::env::set_var(key, val) };
    }

    unsafe fn remove_env(key: &str) {
        unsafe { std::env::remove_var(key) };
    }

    fn valid_toml() -> &'static str {
        r#"
[storage]
credentials_path = "/var/lib/lynkco/tokens.json"
entry_path = "/var/lib/lynkco/entry.json"

[options]
experimental = true
scan_interval_minutes = 240
dark_hours_start = 0
dark_hours_end = 6

[login]
pkce_retry = "reuse"
"#
    }

    fn write_config(dir_name: &str, contents: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(dir_name);
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_load_valid_config() {
        let path = write_config("lynkco-login-test-valid", valid_toml());

        let config = Config::load(&path).unwrap();
        assert_eq!(
            config.storage.credentials_path,
            PathBuf::from("/var/lib/lynkco/tokens.json")
        );
        assert!(config.options.experimental);
        assert_eq!(config.options.scan_interval_minutes, 240);
        assert_eq!(config.options.dark_hours_start, 0);
        assert_eq!(config.options.dark_hours_end, 6);
        assert_eq!(config.login.pkce_retry, PkceRetrySetting::Reuse);

        std::fs::remove_dir_all(path.parent().unwrap()).unwrap();
    }

    #[test]
    fn test_defaults_when_sections_omitted() {
        let path = write_config(
            "lynkco-login-test-defaults",
            r#"
[storage]
credentials_path = "tokens.json"
entry_path = "entry.json"
"#,
        );

        let config = Config::load(&path).unwrap();
        assert!(!config.options.experimental);
        assert_eq!(config.options.scan_interval_minutes, 120);
        assert_eq!(config.options.dark_hours_start, 1);
        assert_eq!(config.options.dark_hours_end, 5);
        assert_eq!(config.login.pkce_retry, PkceRetrySetting::Regenerate);
        assert_eq!(
            config.login.pkce_retry.policy(),
            PkceRetryPolicy::Regenerate
        );

        std::fs::remove_dir_all(path.parent().unwrap()).unwrap();
    }

    #[test]
    fn test_load_missing_file() {
        let result = Config::load(Path::new("/nonexistent/path/config.toml"));
        assert!(result.is_err());
    }

    #[test]
    fn test_load_invalid_toml() {
        let path = write_config("lynkco-login-test-invalid", "not valid {{{{ toml");
        let result = Config::load(&path);
        assert!(result.is_err());
        std::fs::remove_dir_all(path.parent().unwrap()).unwrap();
    }

    #[test]
    fn test_scan_interval_below_minimum_rejected() {
        let path = write_config(
            "lynkco-login-test-interval-low",
            r#"
[storage]
credentials_path = "tokens.json"
entry_path = "entry.json"

[options]
scan_interval_minutes = 59
"#,
        );

        let result = Config::load(&path);
        assert!(result.is_err(), "scan_interval_minutes = 59 must be rejected");
        let err = format!("{}", result.unwrap_err());
        assert!(
            err.contains("scan_interval_minutes must be 60-1440"),
            "error message should explain the issue, got: {err}"
        );

        std::fs::remove_dir_all(path.parent().unwrap()).unwrap();
    }

    #[test]
    fn test_scan_interval_above_maximum_rejected() {
        let path = write_config(
            "lynkco-login-test-interval-high",
            r#"
[storage]
credentials_path = "tokens.json"
entry_path = "entry.json"

[options]
scan_interval_minutes = 1441
"#,
        );

        assert!(Config::load(&path).is_err());
        std::fs::remove_dir_all(path.parent().unwrap()).unwrap();
    }

    #[test]
    fn test_dark_hours_out_of_range_rejected() {
        let path = write_config(
            "lynkco-login-test-dark-hours",
            r#"
[storage]
credentials_path = "tokens.json"
entry_path = "entry.json"

[options]
dark_hours_start = 24
"#,
        );

        let result = Config::load(&path);
        assert!(result.is_err(), "dark_hours_start = 24 must be rejected");

        std::fs::remove_dir_all(path.parent().unwrap()).unwrap();
    }

    #[test]
    fn test_unknown_pkce_retry_value_rejected() {
        let path = write_config(
            "lynkco-login-test-pkce-retry",
            r#"
[storage]
credentials_path = "tokens.json"
entry_path = "entry.json"

[login]
pkce_retry = "sometimes"
"#,
        );

        assert!(Config::load(&path).is_err());
        std::fs::remove_dir_all(path.parent().unwrap()).unwrap();
    }

    #[test]
    fn test_resolve_path_cli_arg() {
        let path = Config::resolve_path(Some("/custom/path.toml"));
        assert_eq!(path, PathBuf::from("/custom/path.toml"));
    }

    #[test]
    fn test_resolve_path_env_var() {
        let _lock = ENV_MUTEX.lock().unwrap();
        unsafe { set_env("LYNKCO_LOGIN_CONFIG", "/env/path.toml") };
        let path = Config::resolve_path(None);
        assert_eq!(path, PathBuf::from("/env/path.toml"));
        unsafe { remove_env("LYNKCO_LOGIN_CONFIG") };
    }

    #[test]
    fn test_resolve_path_default() {
        let _lock = ENV_MUTEX.lock().unwrap();
        unsafe { remove_env("LYNKCO_LOGIN_CONFIG") };
        let path = Config::resolve_path(None);
        assert_eq!(path, PathBuf::from("lynkco-login.toml"));
    }

    #[test]
    fn test_resolve_path_cli_overrides_env() {
        let _lock = ENV_MUTEX.lock().unwrap();
        unsafe { set_env("LYNKCO_LOGIN_CONFIG", "/env/should-lose.toml") };
        let path = Config::resolve_path(Some("/cli/wins.toml"));
        assert_eq!(
            path,
            PathBuf::from("/cli/wins.toml"),
            "CLI arg must take precedence over LYNKCO_LOGIN_CONFIG env var"
        );
        unsafe { remove_env("LYNKCO_LOGIN_CONFIG") };
    }
}
