//! Configuration management

use crate::sanitize::{OverflowPolicy, DEFAULT_MAX_LENGTH};
use crate::speech::BackendKind;
use crate::{KairosError, Result};
use ini::Ini;
use log::{debug, info};
use std::path::{Path, PathBuf};

/// Application configuration for the audio auditor
///
/// Manages persistent settings: which speech backend to use, playback
/// parameters, and the input envelope enforced by the sanitizer.
pub struct Config {
    /// INI configuration storage
    ini: Ini,

    /// Config file path (~/.kairos.cfg)
    path: PathBuf,
}

impl Config {
    /// Load configuration from the default location or create it
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path())
    }

    /// Load configuration from an explicit path
    ///
    /// Writes the default configuration there on first run.
    pub fn load_from(path: &Path) -> Result<Self> {
        debug!("Loading config from {:?}", path);

        let ini = if path.exists() {
            Ini::load_from_file(path)
                .map_err(|e| KairosError::IniParse(format!("Failed to load config: {}", e)))?
        } else {
            info!("Config file not found, creating default");
            let default = Self::default_config();
            default
                .write_to_file(path)
                .map_err(|e| KairosError::IniParse(format!("Failed to write config: {}", e)))?;
            default
        };

        Ok(Self {
            ini,
            path: path.to_path_buf(),
        })
    }

    /// Save configuration to disk
    pub fn save(&self) -> Result<()> {
        debug!("Saving config to {:?}", self.path);
        self.ini
            .write_to_file(&self.path)
            .map_err(|e| KairosError::Config(format!("Failed to save config: {}", e)))
    }

    /// Get config file path (~/.kairos.cfg)
    fn config_path() -> PathBuf {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        home.join(".kairos.cfg")
    }

    /// Expose the config file path for display
    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    /// Create default configuration
    fn default_config() -> Ini {
        let mut ini = Ini::new();

        // The engine ran at unity volume in the original deployment;
        // keep that as the default for audit clarity.
        ini.with_section(Some("speech"))
            .set("backend", "auto")
            .set("rate", "50")
            .set("volume", "100");

        ini.with_section(Some("input"))
            .set("max_length", DEFAULT_MAX_LENGTH.to_string())
            .set("overflow", "reject");

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
    pub fn get_int(&self, section: &str, key: &str, default: i64) -> i64 {
        self.ini
            .get_from(Some(section), key)
            .and_then(|v| v.parse().ok())
            .unwrap_or(default)
    }

    /// Set a value in config
    pub fn set(&mut self, section: &str, key: &str, value: &str) {
        self.ini.with_section(Some(section)).set(key, value);
    }

    // Speech settings

    /// Which speech backend to construct
    ///
    /// Parsed strictly: an unknown name is a configuration error, not a
    /// silent fallback.
    pub fn backend(&self) -> Result<BackendKind> {
        BackendKind::parse(&self.get_string("speech", "backend", "auto"))
    }

    /// Speech rate (0-100)
    pub fn rate(&self) -> u8 {
        self.get_int("speech", "rate", 50).clamp(0, 100) as u8
    }

    /// Speech volume (0-100)
    pub fn volume(&self) -> u8 {
        self.get_int("speech", "volume", 100).clamp(0, 100) as u8
    }

    /// Voice index for the engine, if the user pinned one
    pub fn voice_idx(&self) -> Option<usize> {
        self.get_int("speech", "voice_idx", -1).try_into().ok()
    }

    // Input envelope

    /// Maximum utterance length, in characters
    pub fn max_length(&self) -> usize {
        self.get_int("input", "max_length", DEFAULT_MAX_LENGTH as i64)
            .try_into()
            .unwrap_or(DEFAULT_MAX_LENGTH)
    }

    /// What happens to input longer than `max_length`
    pub fn overflow(&self) -> Result<OverflowPolicy> {
        OverflowPolicy::parse(&self.get_string("input", "overflow", "reject"))
    }
}
