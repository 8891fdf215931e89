use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

/// Dispatcher tick cadence. Due jobs are promoted once per second; a job due
/// at second T fires within [T, T+1) of tick alignment.
pub const TICK_INTERVAL_SECS: u64 = 1;
/// Default capacity of the result broadcast channel. A subscriber that lags
/// more than this many events behind starts losing the oldest ones.
pub const DEFAULT_NOTIFY_CAPACITY: usize = 256;

/// Top-level config (cadence.toml + CADENCE_* env overrides).
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CadenceConfig {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub worker: WorkerConfig,
    #[serde(default)]
    pub notify: NotifyConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

/// Worker execution settings.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct WorkerConfig {
    /// Maximum seconds a command may run before it is killed and reported as
    /// failed. `None` means unlimited — a hung command then stalls the whole
    /// queue, since the worker is strictly serial.
    #[serde(default)]
    pub exec_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifyConfig {
    #[serde(default = "default_notify_capacity")]
    pub capacity: usize,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            capacity: default_notify_capacity(),
        }
    }
}

fn default_notify_capacity() -> usize {
    DEFAULT_NOTIFY_CAPACITY
}

fn default_db_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.cadence/cadence.db", home)
}

fn default_config_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.cadence/cadence.toml", home)
}

impl CadenceConfig {
    /// Load config from a TOML file with CADENCE_* env var overrides.
    ///
    /// Checks in order:
    ///   1. Explicit path argument
    ///   2. ~/.cadence/cadence.toml
    ///
    /// A missing file is not an error — defaults apply.
    pub fn load(config_path: Option<&str>) -> crate::error::Result<Self> {
        let path = config_path
            .map(String::from)
            .unwrap_or_else(default_config_path);

        let config: CadenceConfig = Figment::new()
            .merge(Toml::file(&path))
            .merge(Env::prefixed("CADENCE_").split("_"))
            .extract()
            .map_err(|e| crate::error::CoreError::Config(e.to_string()))?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cfg = CadenceConfig::default();
        assert!(cfg.database.path.ends_with("/.cadence/cadence.db"));
        assert_eq!(cfg.worker.exec_timeout_secs, None);
        assert_eq!(cfg.notify.capacity, DEFAULT_NOTIFY_CAPACITY);
    }

    #[test]
    fn load_missing_file_falls_back_to_defaults() {
        let cfg = CadenceConfig::load(Some("/nonexistent/cadence.toml")).unwrap();
        assert_eq!(cfg.notify.capacity, DEFAULT_NOTIFY_CAPACITY);
    }

    #[test]
    fn toml_overrides() {
        let cfg: CadenceConfig = Figment::new()
            .merge(Toml::string(
                r#"
                [database]
                path = "/tmp/jobs.db"

                [worker]
                exec_timeout_secs = 30

                [notify]
                capacity = 16
                "#,
            ))
            .extract()
            .unwrap();

        assert_eq!(cfg.database.path, "/tmp/jobs.db");
        assert_eq!(cfg.worker.exec_timeout_secs, Some(30));
        assert_eq!(cfg.notify.capacity, 16);
    }
}
