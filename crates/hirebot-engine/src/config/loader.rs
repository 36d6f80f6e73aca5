use super::schema::HirebotConfig;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

/// Environment variable naming a config file that overrides the search.
pub const CONFIG_ENV: &str = "HIREBOT_CONFIG";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse config file: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("Invalid config: {0}")]
    Invalid(String),
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Loads the first config file found in [`ConfigLoader::search_paths`],
    /// or the built-in defaults when there is none.
    ///
    /// A file named by `HIREBOT_CONFIG` must exist.
    pub async fn load_default() -> Result<HirebotConfig, ConfigError> {
        let env = std::env::var_os(CONFIG_ENV).filter(|p| !p.is_empty());
        let forced = env.is_some();

        for (index, path) in Self::search_paths(env, dirs::home_dir())
            .into_iter()
            .enumerate()
        {
            let required = forced && index == 0;
            if required || tokio::fs::try_exists(&path).await.unwrap_or(false) {
                return Self::load_from(&path).await;
            }
        }

        debug!("No config file found, using defaults");
        Ok(HirebotConfig::default())
    }

    /// Candidate config files in lookup order: the `HIREBOT_CONFIG` override,
    /// `./hirebot.yaml`, then `~/.hirebot/config.yaml`.
    pub fn search_paths(env: Option<OsString>, home: Option<PathBuf>) -> Vec<PathBuf> {
        let mut paths: Vec<PathBuf> = env
            .filter(|p| !p.is_empty())
            .map(PathBuf::from)
            .into_iter()
            .collect();
        paths.push(PathBuf::from("./hirebot.yaml"));
        if let Some(home) = home {
            paths.push(home.join(".hirebot").join("config.yaml"));
        }
        paths
    }

    pub async fn load_from(path: &Path) -> Result<HirebotConfig, ConfigError> {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::Io {
                path: path.to_path_buf(),
                source,
            })?;
        let config = Self::parse(&content)?;
        info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Parses and checks a config document. An empty document is all defaults.
    pub fn parse(content: &str) -> Result<HirebotConfig, ConfigError> {
        let config: HirebotConfig = if content.trim().is_empty() {
            HirebotConfig::default()
        } else {
            serde_yaml::from_str(content)?
        };
        validate(&config)?;
        Ok(config)
    }
}

fn validate(config: &HirebotConfig) -> Result<(), ConfigError> {
    let client = &config.client;
    // Existing tabs are found by the job id in their URL.
    if !client.job_detail_url.contains("{job_id}") {
        return Err(ConfigError::Invalid(
            "client.job_detail_url must contain {job_id}".into(),
        ));
    }
    if client.page_size == 0 {
        return Err(ConfigError::Invalid("client.page_size must be positive".into()));
    }
    if client.search_url.trim().is_empty() {
        return Err(ConfigError::Invalid("client.search_url is empty".into()));
    }
    Ok(())
}
