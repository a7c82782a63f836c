//! Configuration Management
//!
//! Tunables for the fake. Loaded from `<config_dir>/mockec2/config.json` or
//! an explicit file, falling back to defaults for anything not set.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default number of elastic IPs an account may hold
pub const DEFAULT_ADDRESS_LIMIT: usize = 5;

/// Instance type used when a launch does not name one
pub const DEFAULT_INSTANCE_TYPE: &str = "m1.small";

/// Addressing type used when a launch does not name one
pub const DEFAULT_ADDRESSING_TYPE: &str = "public";

/// What a launch does with a security group name the account does not own
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnknownGroupPolicy {
    /// Launch anyway, without that membership
    #[default]
    Skip,
    /// Fail the launch with `InvalidGroup.NotFound`
    Reject,
}

/// What attaching an already-attached volume does
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DoubleAttachPolicy {
    /// Last writer wins
    #[default]
    Overwrite,
    /// Fail with `VolumeInUse`
    Reject,
}

/// Fake configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Maximum addresses per account
    pub address_limit: usize,
    pub unknown_group_policy: UnknownGroupPolicy,
    pub double_attach_policy: DoubleAttachPolicy,
    pub default_instance_type: String,
    pub default_addressing_type: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            address_limit: DEFAULT_ADDRESS_LIMIT,
            unknown_group_policy: UnknownGroupPolicy::default(),
            double_attach_policy: DoubleAttachPolicy::default(),
            default_instance_type: DEFAULT_INSTANCE_TYPE.to_string(),
            default_addressing_type: DEFAULT_ADDRESSING_TYPE.to_string(),
        }
    }
}

impl Config {
    /// Get the config file path
    fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("mockec2").join("config.json"))
    }

    /// Load configuration from the user config directory
    pub fn load() -> Self {
        let Some(path) = Self::config_path() else {
            return Self::default();
        };

        if !path.exists() {
            return Self::default();
        }

        match Self::load_from(&path) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("Ignoring unreadable config {:?}: {:#}", path, e);
                Self::default()
            },
        }
    }

    /// Load configuration from an explicit file
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {:?}", path))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file {:?}", path))
    }

    /// Save configuration to an explicit file
    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Create parent directory
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;

        Ok(())
    }

    /// Set the address quota
    pub fn with_address_limit(mut self, limit: usize) -> Self {
        self.address_limit = limit;
        self
    }

    pub fn with_unknown_group_policy(mut self, policy: UnknownGroupPolicy) -> Self {
        self.unknown_group_policy = policy;
        self
    }

    pub fn with_double_attach_policy(mut self, policy: DoubleAttachPolicy) -> Self {
        self.double_attach_policy = policy;
        self
    }
}
