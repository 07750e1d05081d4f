//! Runtime configuration — loaded from ~/.wavescript/config.yaml.

use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::runtime::alias::SampleResolver;
use crate::runtime::scheduler::ActionSpacing;

/// Interpreter settings. Every field is optional in the file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory imported modules are looked up in.
    pub vendor_dir: PathBuf,
    /// Sample file extension, without the dot.
    pub extension: String,
    /// Offset advance after each firing loop action.
    pub spacing: ActionSpacing,
    /// How long in-flight actions get to finish when a run ends.
    pub shutdown_grace_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            vendor_dir: PathBuf::from("vendor"),
            extension: "wav".to_string(),
            spacing: ActionSpacing::Beat,
            shutdown_grace_ms: 250,
        }
    }
}

impl Config {
    pub fn resolver(&self) -> SampleResolver {
        SampleResolver::new(&self.vendor_dir, &self.extension)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_millis(self.shutdown_grace_ms)
    }
}

/// Default path for the config file.
pub fn default_config_path() -> PathBuf {
    let mut path = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
    path.push(".wavescript");
    path.push("config.yaml");
    path
}

/// Load a config from a YAML file. Returns defaults if the file doesn't exist.
pub fn load_config(path: &Path) -> Result<Config, io::Error> {
    if !path.exists() {
        return Ok(Config::default());
    }
    let content = std::fs::read_to_string(path)?;
    serde_yaml::from_str(&content).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}
