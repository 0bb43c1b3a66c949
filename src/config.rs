//! Configuration loading and management
//!
//! Handles parsing of `tasklens.toml` configuration files. Every field has
//! a default, so a missing file or an empty table yields a working config.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoreConfig {
    /// Reminder scheduling configuration
    #[serde(default)]
    pub reminders: ReminderConfig,

    /// Search configuration
    #[serde(default)]
    pub search: SearchConfig,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            reminders: ReminderConfig::default(),
            search: SearchConfig::default(),
        }
    }
}

impl CoreConfig {
    /// Parse configuration from a TOML string.
    pub fn load_from_str(raw: &str) -> Result<Self> {
        Ok(toml::from_str(raw)?)
    }

    /// Load configuration from a file, falling back to defaults when the
    /// file does not exist.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)?;
        Self::load_from_str(&raw)
    }
}

/// Reminder-related configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReminderConfig {
    /// Guaranteed lead time before a deadline, in minutes
    #[serde(default = "default_lead_minutes")]
    pub lead_minutes: u64,
}

fn default_lead_minutes() -> u64 {
    5
}

impl Default for ReminderConfig {
    fn default() -> Self {
        Self {
            lead_minutes: default_lead_minutes(),
        }
    }
}

impl ReminderConfig {
    /// Lead time in epoch milliseconds, as used by the reminder math.
    pub fn lead_ms(&self) -> i64 {
        (self.lead_minutes * 60 * 1000) as i64
    }
}

/// Search-related configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Keystroke debounce window in milliseconds
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
}

fn default_debounce_ms() -> u64 {
    300
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
        }
    }
}

impl SearchConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}
