use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Component, Path, PathBuf};
use std::time::Duration;

const HOME_ENV: &str = "PIPELINE_RUNNER_HOME";
const DEFAULT_PORT: u16 = 6710;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    /// Transport timeout applied to each step's request.
    pub step_timeout_secs: u64,
    pub recent_runs_limit: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: "sqlite:data/pipeline_runner.db".to_string(),
            host: "127.0.0.1".to_string(),
            port: DEFAULT_PORT,
            step_timeout_secs: 30,
            recent_runs_limit: 20,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let root = install_root()?;
        let mut config = Self::default();

        if let Some(file_config) = Self::from_conf_file(&root)? {
            config.apply_file(file_config);
        }

        if let Ok(db_url) = std::env::var("DATABASE_URL") {
            config.database_url = db_url;
        }

        if let Ok(host) = std::env::var("HOST") {
            config.host = host;
        }

        if let Ok(port) = std::env::var("PORT") {
            config.port = port.parse().unwrap_or(DEFAULT_PORT);
        }

        if let Ok(timeout) = std::env::var("STEP_TIMEOUT_SECS") {
            config.step_timeout_secs = timeout
                .parse()
                .with_context(|| format!("STEP_TIMEOUT_SECS is not a number: {}", timeout))?;
        }

        if let Ok(limit) = std::env::var("RECENT_RUNS_LIMIT") {
            config.recent_runs_limit = limit
                .parse()
                .with_context(|| format!("RECENT_RUNS_LIMIT is not a number: {}", limit))?;
        }

        config.validate()?;
        config.normalize_database_url(&root)?;
        Ok(config)
    }

    pub fn step_timeout(&self) -> Duration {
        Duration::from_secs(self.step_timeout_secs)
    }

    fn from_conf_file(root: &Path) -> Result<Option<FileConfig>> {
        let path = root.join("conf").join("config.json");
        if !path.is_file() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let file_config = serde_json::from_str(&content)
            .with_context(|| format!("Invalid config file {}", path.display()))?;
        Ok(Some(file_config))
    }

    fn apply_file(&mut self, file_config: FileConfig) {
        if let Some(database_url) = file_config.database_url {
            self.database_url = database_url;
        }
        if let Some(host) = file_config.host {
            self.host = host;
        }
        if let Some(port) = file_config.port {
            self.port = port;
        }
        if let Some(timeout) = file_config.step_timeout_secs {
            self.step_timeout_secs = timeout;
        }
        if let Some(limit) = file_config.recent_runs_limit {
            self.recent_runs_limit = limit;
        }
    }

    fn validate(&self) -> Result<()> {
        if self.step_timeout_secs == 0 {
            anyhow::bail!("step_timeout_secs must be greater than zero");
        }
        if self.recent_runs_limit == 0 {
            anyhow::bail!("recent_runs_limit must be greater than zero");
        }
        Ok(())
    }

    /// Anchors a relative SQLite path at `root` and refuses paths that
    /// would escape it.
    fn normalize_database_url(&mut self, root: &Path) -> Result<()> {
        let Some(path_str) = self.database_url.strip_prefix("sqlite:") else {
            return Ok(());
        };
        if path_str.starts_with(":memory:") {
            return Ok(());
        }

        let path = Path::new(path_str);
        if path.is_absolute() {
            if !path.starts_with(root) {
                anyhow::bail!(
                    "SQLite database path must be under install root: {}",
                    root.display()
                );
            }
            return Ok(());
        }

        if path.components().any(|c| matches!(c, Component::ParentDir)) {
            anyhow::bail!("SQLite database path cannot contain '..'");
        }

        self.database_url = format!("sqlite:{}", root.join(path).display());
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct FileConfig {
    database_url: Option<String>,
    host: Option<String>,
    port: Option<u16>,
    step_timeout_secs: Option<u64>,
    recent_runs_limit: Option<u32>,
}

/// `PIPELINE_RUNNER_HOME`, else the executable's directory (its parent when
/// installed under `bin/`).
pub fn install_root() -> Result<PathBuf> {
    if let Ok(home) = std::env::var(HOME_ENV) {
        if home.trim().is_empty() {
            anyhow::bail!("{} is set but empty", HOME_ENV);
        }
        return Ok(PathBuf::from(home));
    }

    let exe_path = std::env::current_exe().context("Failed to locate executable")?;
    let exe_dir = exe_path
        .parent()
        .context("Failed to resolve executable directory")?;

    match exe_dir.file_name().and_then(|name| name.to_str()) {
        Some("bin") => Ok(exe_dir
            .parent()
            .context("Failed to resolve install root from bin")?
            .to_path_buf()),
        _ => Ok(exe_dir.to_path_buf()),
    }
}
