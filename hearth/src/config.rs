use serde_derive::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("Unable to read configuration file {0}: {1}")]
    FileReadError(PathBuf, #[source] std::io::Error),
    #[error("Configuration file is not valid json: {0}")]
    FileFormatSyntaxError(#[from] serde_json::Error),
}

///
/// Site wide settings, read from a json file at startup.
///
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    pub environment: String,
    pub version: String,
    #[serde(alias = "custom404")]
    pub custom_404: bool,
    #[serde(alias = "handleTrailingSlash")]
    pub handle_trailing_slash: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            environment: String::from("development"),
            version: String::from("Unknown"),
            custom_404: false,
            handle_trailing_slash: false,
        }
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
        let path = path.as_ref();
        let raw = fs::read(path).map_err(|e| ConfigError::FileReadError(path.to_path_buf(), e))?;

        Ok(serde_json::from_slice(&raw)?)
    }

    ///
    /// Like `load`, but a missing or broken file only costs a warning: the
    /// server starts with the defaults.
    ///
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Config {
        match Config::load(&path) {
            Ok(config) => config,
            Err(e) => {
                warn!("{}; using default configuration", e);
                Config::default()
            }
        }
    }
}
