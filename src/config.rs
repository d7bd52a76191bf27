//! Configuration for land-registry

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::approval::ApprovalPolicy;
use crate::error::RegistryError;
use crate::session::CouncilCredentials;

/// Default storage directory
pub fn default_storage_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("land-registry")
}

/// Configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Directory holding the registry database
    #[serde(default = "default_storage_dir")]
    pub storage_dir: PathBuf,

    /// Sign-offs needed before a parcel reads as approved
    #[serde(default = "default_required_approvals")]
    pub required_approvals: usize,

    /// Shared council login ID
    #[serde(default = "default_council_id")]
    pub council_id: String,

    /// Shared council password
    #[serde(default = "default_council_password")]
    pub council_password: String,
}

fn default_required_approvals() -> usize {
    1
}

fn default_council_id() -> String {
    CouncilCredentials::default().council_id
}

fn default_council_password() -> String {
    CouncilCredentials::default().password
}

impl Default for Config {
    fn default() -> Self {
        Self {
            storage_dir: default_storage_dir(),
            required_approvals: default_required_approvals(),
            council_id: default_council_id(),
            council_password: default_council_password(),
        }
    }
}

impl Config {
    /// Load config from file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, RegistryError> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| RegistryError::Config(e.to_string()))
    }

    /// Effective config for one run.
    ///
    /// An explicit file wins. Otherwise `config.toml` inside the storage
    /// directory (`storage_dir` if given, else the default) is read when it
    /// exists. `storage_dir` overrides whatever the file says.
    pub fn resolve(explicit: Option<&Path>, storage_dir: Option<PathBuf>) -> Result<Self, RegistryError> {
        let mut config = match explicit {
            Some(path) => Self::load(path)?,
            None => {
                let dir = storage_dir.clone().unwrap_or_else(default_storage_dir);
                let path = dir.join("config.toml");
                if path.exists() {
                    Self::load(&path)?
                } else {
                    Self {
                        storage_dir: dir,
                        ..Self::default()
                    }
                }
            }
        };

        if let Some(dir) = storage_dir {
            config.storage_dir = dir;
        }
        Ok(config)
    }

    /// Save config to file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), RegistryError> {
        let content = toml::to_string_pretty(self).map_err(|e| RegistryError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn approval_policy(&self) -> ApprovalPolicy {
        ApprovalPolicy::quorum(self.required_approvals)
    }

    pub fn credentials(&self) -> CouncilCredentials {
        CouncilCredentials {
            council_id: self.council_id.clone(),
            password: self.council_password.clone(),
        }
    }

    /// Get registry database path
    pub fn db_path(&self) -> PathBuf {
        self.storage_dir.join("registry.sled")
    }

    /// Get config file path
    pub fn config_path(&self) -> PathBuf {
        self.storage_dir.join("config.toml")
    }
}
