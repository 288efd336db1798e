use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

// Control-bus constants. Senders and the scheduler must agree on these.
pub const DEFAULT_PUSH_PORT: u16 = 8005;
pub const DEFAULT_PULL_PORT: u16 = 8006;
pub const DEFAULT_BUS_HOST: &str = "127.0.0.1";
pub const CONNECT_TIMEOUT_MS: u64 = 5_000;

/// Top-level config (cadence.toml + CADENCE_* env overrides).
///
/// Nested keys are separated by a double underscore in the environment,
/// e.g. `CADENCE_BUS__PUSH_PORT=9005`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CadenceConfig {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub workspace: WorkspaceConfig,
    #[serde(default)]
    pub bus: BusConfig,
    #[serde(default)]
    pub build: BuildConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
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

/// Where cadence keeps its own state and where task authors keep sources.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkspaceConfig {
    /// System root: logs, compiled artifacts and the database live here.
    #[serde(default = "default_root")]
    pub root: String,
    /// One sub-directory per task, named after the task.
    #[serde(default = "default_tasks_dir")]
    pub tasks_dir: String,
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            root: default_root(),
            tasks_dir: default_tasks_dir(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusConfig {
    #[serde(default = "default_bus_host")]
    pub host: String,
    #[serde(default = "default_push_port")]
    pub push_port: u16,
    #[serde(default = "default_pull_port")]
    pub pull_port: u16,
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            host: default_bus_host(),
            push_port: DEFAULT_PUSH_PORT,
            pull_port: DEFAULT_PULL_PORT,
            connect_timeout_ms: CONNECT_TIMEOUT_MS,
        }
    }
}

impl BusConfig {
    /// `host:push_port`, the address command senders dial.
    pub fn push_addr(&self) -> String {
        format!("{}:{}", self.host, self.push_port)
    }

    /// `host:pull_port`, the address the consuming side listens on.
    pub fn pull_addr(&self) -> String {
        format!("{}:{}", self.host, self.pull_port)
    }
}

/// External compiler invocation. `{source}` and `{output}` in `args` are
/// substituted with the task source directory and the artifact path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildConfig {
    #[serde(default = "default_build_program")]
    pub program: String,
    #[serde(default = "default_build_args")]
    pub args: Vec<String>,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            program: default_build_program(),
            args: default_build_args(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `tracing_subscriber::EnvFilter` directive used when RUST_LOG is unset.
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
        }
    }
}

fn home_dir() -> String {
    std::env::var("HOME").unwrap_or_else(|_| ".".to_string())
}
fn default_root() -> String {
    format!("{}/.cadence", home_dir())
}
fn default_tasks_dir() -> String {
    format!("{}/cadence/tasks", home_dir())
}
fn default_db_path() -> String {
    format!("{}/.cadence/db/cadence.db", home_dir())
}
fn default_bus_host() -> String {
    DEFAULT_BUS_HOST.to_string()
}
fn default_push_port() -> u16 {
    DEFAULT_PUSH_PORT
}
fn default_pull_port() -> u16 {
    DEFAULT_PULL_PORT
}
fn default_connect_timeout_ms() -> u64 {
    CONNECT_TIMEOUT_MS
}
fn default_build_program() -> String {
    "rustc".to_string()
}
fn default_build_args() -> Vec<String> {
    ["--edition", "2021", "-O", "-o", "{output}", "{source}/main.rs"]
        .into_iter()
        .map(String::from)
        .collect()
}
fn default_log_filter() -> String {
    "cadence=info".to_string()
}

impl CadenceConfig {
    /// Load config from a TOML file with CADENCE_* env var overrides.
    ///
    /// Checks in order:
    ///   1. Explicit path argument
    ///   2. ~/.cadence/cadence.toml
    ///
    /// A missing file is not an error; every section has defaults.
    pub fn load(config_path: Option<&str>) -> crate::error::Result<Self> {
        let path = config_path
            .map(String::from)
            .unwrap_or_else(default_config_path);

        Figment::new()
            .merge(Toml::file(&path))
            .merge(Env::prefixed("CADENCE_").split("__"))
            .extract()
            .map_err(|e| crate::error::CadenceError::Config(e.to_string()))
    }
}

fn default_config_path() -> String {
    format!("{}/.cadence/cadence.toml", home_dir())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");
        let config = CadenceConfig::load(path.to_str()).unwrap();
        assert_eq!(config.bus.push_port, DEFAULT_PUSH_PORT);
        assert_eq!(config.bus.pull_port, DEFAULT_PULL_PORT);
        assert_eq!(config.build.program, "rustc");
    }

    #[test]
    fn file_values_override_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cadence.toml");
        std::fs::write(
            &path,
            "[bus]\npush_port = 9105\n\n[build]\nprogram = \"cc\"\nargs = [\"{source}\"]\n",
        )
        .unwrap();

        let config = CadenceConfig::load(path.to_str()).unwrap();
        assert_eq!(config.bus.push_port, 9105);
        assert_eq!(config.bus.pull_port, DEFAULT_PULL_PORT);
        assert_eq!(config.bus.push_addr(), "127.0.0.1:9105");
        assert_eq!(config.build.program, "cc");
        assert_eq!(config.build.args, vec!["{source}".to_string()]);
    }

    #[test]
    fn malformed_file_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cadence.toml");
        std::fs::write(&path, "[bus]\npush_port = \"not a port\"\n").unwrap();

        let err = CadenceConfig::load(path.to_str()).unwrap_err();
        assert_eq!(err.code(), "CONFIG_ERROR");
    }
}
