use crate::domain::joints::JointLimits;
use crate::domain::models::JOINT_COUNT;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogSettings {
    #[serde(default = "default_level")]
    pub level: String, // "trace", "debug", "info", "warn", "error"
    #[serde(default = "default_true")]
    pub console_logging_enabled: bool,
    #[serde(default = "default_false")]
    pub file_logging_enabled: bool,
    #[serde(default = "default_log_dir")]
    pub log_dir: String,
    #[serde(default = "default_prefix")]
    pub file_name_prefix: String,
    #[serde(default = "default_rotation")]
    pub rotation: String, // "daily", "hourly", "minutely", "never"
    #[serde(default = "default_false")]
    pub show_file_line: bool,
    #[serde(default = "default_false")]
    pub show_thread_ids: bool,
    #[serde(default = "default_true")]
    pub show_target: bool,
    #[serde(default = "default_true")]
    pub ansi_colors: bool,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: default_level(),
            console_logging_enabled: true,
            file_logging_enabled: false,
            log_dir: default_log_dir(),
            file_name_prefix: default_prefix(),
            rotation: default_rotation(),
            show_file_line: false,
            show_thread_ids: false,
            show_target: true,
            ansi_colors: true,
        }
    }
}

/// One glove the host should register at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GloveSettings {
    pub identifier: String,
    /// Per-joint minimum angles; falls back to the hand preset when absent.
    #[serde(default)]
    pub min_angles: Option<[f64; JOINT_COUNT]>,
    #[serde(default)]
    pub max_angles: Option<[f64; JOINT_COUNT]>,
}

impl GloveSettings {
    pub fn new(identifier: &str) -> Self {
        Self {
            identifier: identifier.to_string(),
            min_angles: None,
            max_angles: None,
        }
    }

    /// Limits for this glove, each side defaulting to the hand preset.
    pub fn joint_limits(&self) -> JointLimits {
        let hand = JointLimits::hand();
        JointLimits::new(
            self.min_angles.unwrap_or(hand.min_angles),
            self.max_angles.unwrap_or(hand.max_angles),
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationSettings {
    /// Period between synthetic notifications per glove
    #[serde(default = "default_notify_period_ms")]
    pub notify_period_ms: u64,
    /// Seconds to run before shutting down; 0 runs until Ctrl-C
    #[serde(default = "default_run_secs")]
    pub run_secs: u64,
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            notify_period_ms: default_notify_period_ms(),
            run_secs: default_run_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub log_settings: LogSettings,

    #[serde(default = "default_gloves")]
    pub gloves: Vec<GloveSettings>,

    /// Host read cadence
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Silence after which a connected glove is reported as stale
    #[serde(default = "default_stale_after_secs")]
    pub stale_after_secs: f64,

    #[serde(default)]
    pub simulation: SimulationSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_settings: LogSettings::default(),
            gloves: default_gloves(),
            poll_interval_ms: default_poll_interval_ms(),
            stale_after_secs: default_stale_after_secs(),
            simulation: SimulationSettings::default(),
        }
    }
}

fn default_level() -> String {
    "info".to_string()
}
fn default_true() -> bool {
    true
}
fn default_false() -> bool {
    false
}
fn default_log_dir() -> String {
    "logs".to_string()
}
fn default_prefix() -> String {
    "smartglove".to_string()
}
fn default_rotation() -> String {
    "daily".to_string()
}
fn default_gloves() -> Vec<GloveSettings> {
    [
        "{00001001-7374-7265-7563-6873656e7365}",
        "{00601001-7374-7265-7563-6873656e7365}",
        "{00000501-7374-7265-7563-6873656e7365}",
        "{00600501-7374-7265-7563-6873656e7365}",
    ]
    .into_iter()
    .map(GloveSettings::new)
    .collect()
}
fn default_poll_interval_ms() -> u64 {
    16
}
fn default_stale_after_secs() -> f64 {
    1.0
}
fn default_notify_period_ms() -> u64 {
    20
}
fn default_run_secs() -> u64 {
    10
}

pub struct SettingsService {
    settings: Settings,
    settings_path: PathBuf,
}

impl SettingsService {
    pub fn new() -> anyhow::Result<Self> {
        let settings_path = Self::get_settings_path()?;
        Ok(Self::from_path(settings_path))
    }

    /// Load from an explicit file, using defaults if it is missing or unreadable.
    pub fn from_path(settings_path: PathBuf) -> Self {
        let settings = Self::load_from_file(&settings_path).unwrap_or_default();
        Self {
            settings,
            settings_path,
        }
    }

    fn get_settings_path() -> anyhow::Result<PathBuf> {
        let mut path = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;
        path.push("SmartGlove");
        fs::create_dir_all(&path)?;
        path.push("settings.json");
        Ok(path)
    }

    fn load_from_file(path: &Path) -> anyhow::Result<Settings> {
        let contents = fs::read_to_string(path)?;
        let settings = serde_json::from_str(&contents)?;
        Ok(settings)
    }

    pub fn save(&self) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(&self.settings)?;
        fs::write(&self.settings_path, json)?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.settings_path
    }

    pub fn get(&self) -> &Settings {
        &self.settings
    }

    pub fn get_mut(&mut self) -> &mut Settings {
        &mut self.settings
    }
}
