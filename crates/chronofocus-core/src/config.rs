//! TOML-based application configuration.
//!
//! Holds the XP and leveling rules:
//! - Base XP formulas and minimums
//! - Bonus modifier rates
//! - Level curve and title thresholds
//! - Streak multiplier caps
//!
//! Configuration is stored at `~/.config/chronofocus/config.toml`.

use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::storage::data_dir;

/// Base XP amounts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct XpBaseConfig {
    /// Flat fallback when a monster is missing from the catalog at
    /// resolution time.
    #[serde(default = "default_xp_per_session")]
    pub xp_per_session: u64,
    /// Micro-award for showing up (first tick).
    #[serde(default = "default_xp_for_starting")]
    pub xp_for_starting: u64,
    /// Micro-award for reaching the halfway mark.
    #[serde(default = "default_xp_for_halfway")]
    pub xp_for_halfway: u64,
    /// XP granted per point of monster HP.
    #[serde(default = "default_xp_per_hp")]
    pub xp_per_hp: f64,
    /// Floor for any session's base XP.
    #[serde(default = "default_min_xp")]
    pub min_xp: u64,
}

/// Bonus modifier rates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct XpModifiersConfig {
    #[serde(default = "default_no_distractions")]
    pub no_distractions: f64,
    #[serde(default = "default_second_session")]
    pub second_session: f64,
    #[serde(default = "default_min_focus_crit")]
    pub min_focus_crit: f64,
    #[serde(default = "default_max_focus_crit")]
    pub max_focus_crit: f64,
}

/// Power-curve leveling: `xp_required(level) = base_xp * level^exponent`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LevelCurveConfig {
    #[serde(default = "default_level_base_xp")]
    pub base_xp: u64,
    #[serde(default = "default_level_exponent")]
    pub exponent: f64,
}

/// Streak multiplier: `1 + streak_days * per_day`, capped.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreakMultiplierConfig {
    #[serde(default = "default_streak_per_day")]
    pub per_day: f64,
    #[serde(default = "default_streak_max")]
    pub max_multiplier: f64,
}

/// XP and leveling rules.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct XpConfig {
    #[serde(default)]
    pub base: XpBaseConfig,
    #[serde(default)]
    pub modifiers: XpModifiersConfig,
    #[serde(default)]
    pub level_curve: LevelCurveConfig,
    #[serde(default)]
    pub streak_multiplier: StreakMultiplierConfig,
    /// Sparse level -> title thresholds; gaps inherit the previous tier.
    /// Keys are stringified levels so the table round-trips through TOML.
    #[serde(default = "default_titles")]
    pub titles: BTreeMap<String, String>,
    /// Per-monster base XP multipliers, default 1.
    #[serde(default = "default_difficulty_multipliers")]
    pub difficulty_multipliers: HashMap<String, f64>,
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/chronofocus/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub xp: XpConfig,
}

// Default functions
fn default_xp_per_session() -> u64 {
    100
}
fn default_xp_for_starting() -> u64 {
    5
}
fn default_xp_for_halfway() -> u64 {
    10
}
fn default_xp_per_hp() -> f64 {
    0.1
}
fn default_min_xp() -> u64 {
    50
}
fn default_no_distractions() -> f64 {
    0.25
}
fn default_second_session() -> f64 {
    0.10
}
fn default_min_focus_crit() -> f64 {
    1.0
}
fn default_max_focus_crit() -> f64 {
    1.5
}
fn default_level_base_xp() -> u64 {
    100
}
fn default_level_exponent() -> f64 {
    1.5
}
fn default_streak_per_day() -> f64 {
    0.1
}
fn default_streak_max() -> f64 {
    2.0
}
fn default_titles() -> BTreeMap<String, String> {
    [
        (1, "Novice Focuser"),
        (5, "Apprentice of Attention"),
        (10, "Focus Knight"),
        (20, "Time Wizard"),
        (30, "Productivity Legend"),
    ]
    .into_iter()
    .map(|(level, title)| (level.to_string(), title.to_string()))
    .collect()
}
fn default_difficulty_multipliers() -> HashMap<String, f64> {
    // The Tabberwock heals off tab switches, which are hard to avoid.
    HashMap::from([("tabberwock".to_string(), 1.2)])
}

impl Default for XpBaseConfig {
    fn default() -> Self {
        Self {
            xp_per_session: default_xp_per_session(),
            xp_for_starting: default_xp_for_starting(),
            xp_for_halfway: default_xp_for_halfway(),
            xp_per_hp: default_xp_per_hp(),
            min_xp: default_min_xp(),
        }
    }
}

impl Default for XpModifiersConfig {
    fn default() -> Self {
        Self {
            no_distractions: default_no_distractions(),
            second_session: default_second_session(),
            min_focus_crit: default_min_focus_crit(),
            max_focus_crit: default_max_focus_crit(),
        }
    }
}

impl Default for LevelCurveConfig {
    fn default() -> Self {
        Self {
            base_xp: default_level_base_xp(),
            exponent: default_level_exponent(),
        }
    }
}

impl Default for StreakMultiplierConfig {
    fn default() -> Self {
        Self {
            per_day: default_streak_per_day(),
            max_multiplier: default_streak_max(),
        }
    }
}

impl Default for XpConfig {
    fn default() -> Self {
        Self {
            base: XpBaseConfig::default(),
            modifiers: XpModifiersConfig::default(),
            level_curve: LevelCurveConfig::default(),
            streak_multiplier: StreakMultiplierConfig::default(),
            titles: default_titles(),
            difficulty_multipliers: default_difficulty_multipliers(),
        }
    }
}

impl Config {
    /// Path of the configuration file.
    pub fn path() -> Result<PathBuf, ConfigError> {
        let dir = data_dir().map_err(|e| ConfigError::LoadFailed {
            path: PathBuf::from("config.toml"),
            message: e.to_string(),
        })?;
        Ok(dir.join("config.toml"))
    }

    /// Load the configuration, falling back to defaults when the file is
    /// absent. A file that exists but fails to parse is an error.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::path()?;
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(&path).map_err(|e| ConfigError::LoadFailed {
            path: path.clone(),
            message: e.to_string(),
        })?;
        toml::from_str(&raw).map_err(|e| ConfigError::LoadFailed {
            path,
            message: e.to_string(),
        })
    }

    /// Persist the configuration.
    pub fn save(&self) -> Result<(), ConfigError> {
        let path = Self::path()?;
        let raw = toml::to_string_pretty(self).map_err(|e| ConfigError::SaveFailed {
            path: path.clone(),
            message: e.to_string(),
        })?;
        std::fs::write(&path, raw).map_err(|e| ConfigError::SaveFailed {
            path,
            message: e.to_string(),
        })
    }
}
