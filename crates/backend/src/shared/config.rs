use once_cell::sync::OnceCell;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

static CONFIG: OnceCell<Config> = OnceCell::new();

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub database: DatabaseConfig,
    #[serde(default)]
    pub server: ServerConfig,
    pub auth: AuthConfig,
    #[serde(default)]
    pub import: ImportConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub path: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    /// Upper bound for a CSV upload body
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
}

/// Settings of the vendor catalog import pipeline
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct ImportConfig {
    /// Hard limit for the catalog commit transaction
    #[serde(default = "default_commit_timeout_secs")]
    pub commit_timeout_secs: u64,
    /// Minimal lock age before an admin may release it
    #[serde(default = "default_stale_lock_after_secs")]
    pub stale_lock_after_secs: u64,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            commit_timeout_secs: default_commit_timeout_secs(),
            stale_lock_after_secs: default_stale_lock_after_secs(),
        }
    }
}

impl ImportConfig {
    pub fn commit_timeout(&self) -> Duration {
        Duration::from_secs(self.commit_timeout_secs)
    }

    pub fn stale_lock_after(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.stale_lock_after_secs as i64)
    }
}

fn default_port() -> u16 {
    3000
}

fn default_max_upload_bytes() -> usize {
    10 * 1024 * 1024
}

fn default_commit_timeout_secs() -> u64 {
    60
}

fn default_stale_lock_after_secs() -> u64 {
    300
}

/// Default configuration embedded in the binary
const DEFAULT_CONFIG: &str = r#"
[database]
path = "target/db/catalog_import.db"

[server]
port = 3000

[auth]
jwt_secret = "change-me-in-config-toml"

[import]
commit_timeout_secs = 60
stale_lock_after_secs = 300
"#;

/// Load configuration from config.toml file
///
/// Search order:
/// 1. Next to the executable (for production)
/// 2. Falls back to embedded default config
pub fn load_config() -> anyhow::Result<Config> {
    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            let config_path = exe_dir.join("config.toml");

            if config_path.exists() {
                tracing::info!("Loading config from: {}", config_path.display());
                let contents = std::fs::read_to_string(&config_path)?;
                let config: Config = toml::from_str(&contents)?;
                return Ok(config);
            } else {
                tracing::warn!("config.toml not found at: {}", config_path.display());
            }
        }
    }

    tracing::info!("Using default embedded configuration");
    let config: Config = toml::from_str(DEFAULT_CONFIG)?;
    Ok(config)
}

/// Store the loaded configuration for handlers and middleware
pub fn install(config: Config) -> anyhow::Result<&'static Config> {
    CONFIG
        .set(config)
        .map_err(|_| anyhow::anyhow!("Configuration is already installed"))?;
    get()
}

pub fn get() -> anyhow::Result<&'static Config> {
    CONFIG
        .get()
        .ok_or_else(|| anyhow::anyhow!("Configuration has not been loaded"))
}

/// Get the database file path from configuration
/// Resolves relative paths relative to the executable directory
pub fn get_database_path(config: &Config) -> anyhow::Result<PathBuf> {
    let db_path = Path::new(&config.database.path);

    if db_path.is_absolute() {
        return Ok(db_path.to_path_buf());
    }

    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            return Ok(exe_dir.join(db_path));
        }
    }

    // Fallback: use relative to current directory
    Ok(PathBuf::from(&config.database.path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_loads() {
        let config: Config = toml::from_str(DEFAULT_CONFIG).unwrap();
        assert_eq!(config.database.path, "target/db/catalog_import.db");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.import.commit_timeout_secs, 60);
        assert_eq!(config.import.commit_timeout(), Duration::from_secs(60));
    }

    #[test]
    fn test_optional_sections_fall_back_to_defaults() {
        let config: Config = toml::from_str(
            r#"
            [database]
            path = "/tmp/app.db"

            [auth]
            jwt_secret = "s"
            "#,
        )
        .unwrap();
        assert_eq!(config.server.max_upload_bytes, 10 * 1024 * 1024);
        assert_eq!(config.import, ImportConfig::default());
        assert_eq!(
            get_database_path(&config).unwrap(),
            PathBuf::from("/tmp/app.db")
        );
    }
}
