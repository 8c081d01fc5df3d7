use anyhow::{Context, Result};
use dashboard::{DashboardConfig, ResourceRegistry, config::CONFIG_FILE};
use std::path::{Path, PathBuf};

/// Loaded configuration and where it came from
pub struct DashboardContext {
    pub config_path: PathBuf,
    pub config: DashboardConfig,
}

impl DashboardContext {
    /// Load the configuration from `explicit` or, failing that, from the nearest
    /// `dashboard.toml` in the current directory or its ancestors
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let config_path = match explicit {
            Some(path) => path.to_path_buf(),
            None => {
                let current_dir = std::env::current_dir().context("Failed to get current directory")?;
                Self::find_config(&current_dir)?
            }
        };
        let config = DashboardConfig::load(&config_path)
            .with_context(|| format!("Failed to load {}", config_path.display()))?;
        Ok(Self { config_path, config })
    }

    fn find_config(start: &Path) -> Result<PathBuf> {
        let mut current = start.to_path_buf();

        loop {
            let candidate = current.join(CONFIG_FILE);
            if candidate.exists() {
                return Ok(candidate);
            }

            if !current.pop() {
                anyhow::bail!(
                    "Could not find {CONFIG_FILE} in {start:?} or any parent directory. \
                     Pass --config or set DASHBOARD_CONFIG."
                );
            }
        }
    }

    /// Compile-time registered resources followed by the configured ones
    pub fn registry(&self) -> Result<ResourceRegistry> {
        let mut registry = ResourceRegistry::with_registered()?;
        self.config
            .register_resources(&mut registry)
            .with_context(|| format!("Invalid configuration in {}", self.config_path.display()))?;
        Ok(registry)
    }
}
