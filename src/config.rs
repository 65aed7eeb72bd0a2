//! Engine settings
//!
//! Settings live in a TOML file next to the profiles. Every field has a default, so a
//! partial or missing file still yields a usable configuration.
//!
//! ```toml
//! tick_interval_ms = 20
//!
//! [timing]
//! click_length_ms = 50
//! keystroke_length_ms = 30
//!
//! [security]
//! max_actions_per_list = 32
//! ```

use color_eyre::{eyre::eyre, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

pub const APP_DIR: &str = "actionmap";
pub const SETTINGS_FILE: &str = "settings.toml";
pub const PROFILE_DIR: &str = "profiles";

/// Durations used by timed actions and by the dispatcher's hold tracking
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct TimingSettings {
    /// How long a mouse button stays down for a click
    pub click_length_ms: u64,
    /// Pause between the two clicks of a double click
    pub double_click_gap_ms: u64,
    /// How long a key stays down for a keystroke
    pub keystroke_length_ms: u64,
    /// Hold time after which `PressedLong` fires
    pub long_press_ms: u64,
    /// Hold time before the first auto-repeat
    pub repeat_delay_ms: u64,
    pub repeat_interval_ms: u64,
}

impl Default for TimingSettings {
    fn default() -> Self {
        Self {
            click_length_ms: 50,
            double_click_gap_ms: 80,
            keystroke_length_ms: 30,
            long_press_ms: 600,
            repeat_delay_ms: 500,
            repeat_interval_ms: 150,
        }
    }
}

impl TimingSettings {
    pub fn click_length(&self) -> Duration {
        Duration::from_millis(self.click_length_ms)
    }

    pub fn double_click_gap(&self) -> Duration {
        Duration::from_millis(self.double_click_gap_ms)
    }

    pub fn keystroke_length(&self) -> Duration {
        Duration::from_millis(self.keystroke_length_ms)
    }

    pub fn long_press(&self) -> Duration {
        Duration::from_millis(self.long_press_ms)
    }

    pub fn repeat_delay(&self) -> Duration {
        Duration::from_millis(self.repeat_delay_ms)
    }

    pub fn repeat_interval(&self) -> Duration {
        Duration::from_millis(self.repeat_interval_ms)
    }
}

/// Limits enforced by the security validation pass. Not overridable per profile.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct SecuritySettings {
    pub max_actions_per_list: usize,
}

impl Default for SecuritySettings {
    fn default() -> Self {
        Self {
            max_actions_per_list: 32,
        }
    }
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct EngineSettings {
    /// Interval between dispatcher ticks
    pub tick_interval_ms: u64,
    pub timing: TimingSettings,
    pub security: SecuritySettings,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            tick_interval_ms: 20,
            timing: TimingSettings::default(),
            security: SecuritySettings::default(),
        }
    }
}

impl EngineSettings {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms.max(1))
    }

    /// `<config dir>/actionmap`, if the platform has a config dir
    pub fn config_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_DIR))
    }

    pub fn default_path() -> Option<PathBuf> {
        Self::config_dir().map(|dir| dir.join(SETTINGS_FILE))
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| eyre!("Failed to parse engine settings: {}", e))
    }

    /// Loads settings, falling back to defaults if the file does not exist
    pub async fn load(path: &Path) -> Result<Self> {
        if !tokio::fs::try_exists(path)
            .await
            .map_err(|e| eyre!("Failed to check if settings file exists: {}", e))?
        {
            warn!(
                "Settings file {} does not exist, using defaults",
                path.display()
            );
            return Ok(Self::default());
        }

        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| eyre!("Failed to read settings file: {}", e))?;
        let settings = Self::from_toml_str(&content)?;
        info!("Loaded engine settings from {}", path.display());
        Ok(settings)
    }

    pub async fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| eyre!("Failed to create settings directory: {}", e))?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| eyre!("Failed to serialize engine settings: {}", e))?;
        tokio::fs::write(path, content)
            .await
            .map_err(|e| eyre!("Failed to write settings file: {}", e))?;
        info!("Saved engine settings to {}", path.display());
        Ok(())
    }
}
