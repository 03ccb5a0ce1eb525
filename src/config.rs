//! Configuration management
//!
//! Progression constants, speech parameters, and storage policy live in
//! an INI file so caregivers can tune them without rebuilding. The file
//! is created with documented defaults on first load.

use crate::{EngineError, Result};
use ini::Ini;
use log::{debug, info};
use std::path::{Path, PathBuf};

/// Engine configuration
///
/// Backed by `~/.bokstavsresan.cfg`. All getters fall back to the
/// documented default when a key is missing or unparseable.
pub struct Config {
    /// INI configuration storage
    ini: Ini,

    /// Config file path
    path: PathBuf,
}

/// Snapshot of the `[progression]` section handed to the exercise engine
#[derive(Debug, Clone, Copy)]
pub struct ProgressionSettings {
    /// Streak length that earns one star (every Nth consecutive correct)
    pub star_milestone: u32,

    /// Mean mastery score a tier must exceed before advancing
    pub level_up_threshold: f32,

    /// Minimum graded attempts per letter before a tier may advance
    pub min_samples: u32,

    /// Weight of one Explore exposure relative to one graded attempt
    pub explore_weight: f32,
}

impl Default for ProgressionSettings {
    fn default() -> Self {
        Self {
            star_milestone: 5,
            level_up_threshold: 0.8,
            min_samples: 3,
            explore_weight: 0.25,
        }
    }
}

impl Config {
    /// Load configuration from disk or create default
    pub fn load() -> Result<Self> {
        Self::load_from(Self::config_path())
    }

    /// Load configuration from an explicit path
    ///
    /// Used by tests and embedders; `load()` uses the home directory.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        debug!("Loading config from {:?}", path);

        let ini = if path.exists() {
            Ini::load_from_file(&path)
                .map_err(|e| EngineError::Config(format!("Failed to load config: {}", e)))?
        } else {
            info!("Config file not found, creating default");
            let default = Self::default_config();
            default
                .write_to_file(&path)
                .map_err(|e| EngineError::Config(format!("Failed to write config: {}", e)))?;
            default
        };

        Ok(Self { ini, path })
    }

    /// Save configuration to disk
    pub fn save(&self) -> Result<()> {
        debug!("Saving config to {:?}", self.path);
        self.ini
            .write_to_file(&self.path)
            .map_err(|e| EngineError::Config(format!("Failed to save config: {}", e)))
    }

    /// Config file path (~/.bokstavsresan.cfg)
    fn config_path() -> PathBuf {
        let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
        PathBuf::from(home).join(".bokstavsresan.cfg")
    }

    /// Expose the config file path for display
    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    /// Create default configuration
    fn default_config() -> Ini {
        let mut ini = Ini::new();

        ini.with_section(Some("progression"))
            .set("star_milestone", "5")
            .set("level_up_threshold", "0.8")
            .set("min_samples", "3")
            .set("explore_weight", "0.25");

        ini.with_section(Some("storage")).set("persist_retries", "3");

        ini.with_section(Some("speech"))
            .set("rate", "50")
            .set("volume", "80")
            .set("voice", "sv");

        ini
    }

    /// Get a string value from config
    pub fn get_string(&self, section: &str, key: &str, default: &str) -> String {
        self.ini
            .get_from(Some(section), key)
            .unwrap_or(default)
            .to_string()
    }

    /// Get an integer value from config
    pub fn get_int(&self, section: &str, key: &str, default: i32) -> i32 {
        self.ini
            .get_from(Some(section), key)
            .and_then(|v| v.parse().ok())
            .unwrap_or(default)
    }

    /// Get a float value from config
    pub fn get_float(&self, section: &str, key: &str, default: f32) -> f32 {
        self.ini
            .get_from(Some(section), key)
            .and_then(|v| v.parse().ok())
            .unwrap_or(default)
    }

    /// Set a value in config
    pub fn set(&mut self, section: &str, key: &str, value: &str) {
        self.ini.with_section(Some(section)).set(key, value);
    }

    // Engine-specific configuration getters

    /// Streak milestone that earns a star (default 5)
    pub fn star_milestone(&self) -> u32 {
        self.get_int("progression", "star_milestone", 5).max(1) as u32
    }

    /// Mean mastery score required to advance one tier (default 0.8)
    pub fn level_up_threshold(&self) -> f32 {
        self.get_float("progression", "level_up_threshold", 0.8)
            .clamp(0.0, 1.0)
    }

    /// Minimum graded attempts per letter before level-up (default 3)
    pub fn min_samples(&self) -> u32 {
        self.get_int("progression", "min_samples", 3).max(1) as u32
    }

    /// Weight of an Explore exposure toward mastery (default 0.25)
    ///
    /// Explore mode is exposure, not testing, so it counts at reduced
    /// weight. Zero disables its contribution entirely.
    pub fn explore_weight(&self) -> f32 {
        self.get_float("progression", "explore_weight", 0.25)
            .clamp(0.0, 1.0)
    }

    /// Maximum persist attempts before surfacing a warning (default 3)
    pub fn persist_retries(&self) -> u32 {
        self.get_int("storage", "persist_retries", 3).max(1) as u32
    }

    /// Speech rate (0-100, 50 is normal)
    pub fn rate(&self) -> u8 {
        self.get_int("speech", "rate", 50).clamp(0, 100) as u8
    }

    /// Speech volume (0-100)
    pub fn volume(&self) -> u8 {
        self.get_int("speech", "volume", 80).clamp(0, 100) as u8
    }

    /// Voice name for the synthesis backend
    pub fn voice(&self) -> String {
        self.get_string("speech", "voice", "sv")
    }

    /// Snapshot of the progression constants for the exercise engine
    pub fn progression(&self) -> ProgressionSettings {
        ProgressionSettings {
            star_milestone: self.star_milestone(),
            level_up_threshold: self.level_up_threshold(),
            min_samples: self.min_samples(),
            explore_weight: self.explore_weight(),
        }
    }
}
