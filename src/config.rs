//! Application constants, data directories and layered intake configuration.
//!
//! Configuration sources (highest priority wins):
//! 1. Environment variables (`MINDEASE_*` prefix, `__` separates sections)
//! 2. Project-level `./mindease.toml`
//! 3. User-level `~/.config/mindease/config.toml`
//! 4. Built-in defaults
//!
//! `MINDEASE_INTAKE__PROGRESSION_THRESHOLD=4` maps to `intake.progression_threshold`.

use std::path::PathBuf;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Application-level constants
pub const APP_NAME: &str = "MindEase";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Fixed key under which the transcript is persisted.
pub const TRANSCRIPT_STORAGE_KEY: &str = "mindease_chat_history";

/// Intake mode sent to `start-session`.
pub const INTAKE_MODE: &str = "chat";

/// Highest intake level.
pub const MAX_LEVEL: u8 = 5;

/// Default tracing filter when `RUST_LOG` is unset.
pub fn default_log_filter() -> String {
    "mindease_lib=info,mindease=info".to_string()
}

/// Get the application data directory.
/// Platform data dir + `MindEase/`, falling back to the working directory.
pub fn app_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_NAME)
}

// ═══════════════════════════════════════════
// Errors
// ═══════════════════════════════════════════

#[derive(Debug, Error)]
pub enum ConfigError {
    /// Figment extraction or merge error.
    #[error("Configuration error: {0}")]
    Figment(#[from] figment::Error),

    /// A configuration field has an invalid value.
    #[error("Invalid configuration value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

// ═══════════════════════════════════════════
// Sections
// ═══════════════════════════════════════════

/// Level at which the assessment trigger becomes available.
///
/// Product variants disagree (4 vs 5), so both are expressible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum ProgressionThreshold {
    Four,
    Five,
}

impl ProgressionThreshold {
    pub fn level(self) -> u8 {
        match self {
            Self::Four => 4,
            Self::Five => 5,
        }
    }
}

impl TryFrom<u8> for ProgressionThreshold {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            4 => Ok(Self::Four),
            5 => Ok(Self::Five),
            other => Err(format!("progression threshold must be 4 or 5, got {other}")),
        }
    }
}

impl From<ProgressionThreshold> for u8 {
    fn from(t: ProgressionThreshold) -> Self {
        t.level()
    }
}

fn default_base_url() -> String {
    "http://localhost:5000".to_string()
}

const fn default_timeout_secs() -> u64 {
    30
}

/// Where the analysis service lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

const fn default_threshold() -> ProgressionThreshold {
    ProgressionThreshold::Five
}

/// Intake behaviour switches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntakeSettings {
    #[serde(default = "default_threshold")]
    pub progression_threshold: ProgressionThreshold,
    /// Keep the transcript across restarts (otherwise cleared on start).
    #[serde(default)]
    pub persist_transcript: bool,
    /// Accept "show my results" as an alternate assessment trigger.
    #[serde(default)]
    pub results_trigger: bool,
}

impl Default for IntakeSettings {
    fn default() -> Self {
        Self {
            progression_threshold: default_threshold(),
            persist_transcript: false,
            results_trigger: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Overrides [`app_data_dir`].
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
}

impl StorageConfig {
    pub fn resolved_data_dir(&self) -> PathBuf {
        self.data_dir.clone().unwrap_or_else(app_data_dir)
    }

    /// SQLite file holding the persisted transcript.
    pub fn transcript_db_path(&self) -> PathBuf {
        self.resolved_data_dir().join("transcript.db")
    }

    /// Where exported reports are written.
    pub fn exports_dir(&self) -> PathBuf {
        self.resolved_data_dir().join("exports")
    }
}

// ═══════════════════════════════════════════
// IntakeConfig
// ═══════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntakeConfig {
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub intake: IntakeSettings,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
}

impl Default for IntakeConfig {
    fn default() -> Self {
        Self {
            backend: BackendConfig::default(),
            intake: IntakeSettings::default(),
            storage: StorageConfig::default(),
            log_filter: default_log_filter(),
        }
    }
}

impl IntakeConfig {
    /// Load configuration from all sources.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_figment(Self::figment())
    }

    /// Extract and validate from an arbitrary provider chain.
    pub fn from_figment(figment: Figment) -> Result<Self, ConfigError> {
        let config: Self = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Build the provider chain. Public so tests and the CLI can layer on top.
    pub fn figment() -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Some(global_path) = Self::global_config_path() {
            if global_path.exists() {
                figment = figment.merge(Toml::file(global_path));
            }
        }

        let local_path = PathBuf::from("mindease.toml");
        if local_path.exists() {
            figment = figment.merge(Toml::file(local_path));
        }

        figment.merge(Env::prefixed("MINDEASE_").split("__"))
    }

    fn global_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("mindease").join("config.toml"))
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let url = self.backend.base_url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ConfigError::InvalidValue {
                field: "backend.base_url".into(),
                reason: format!("expected an http(s) URL, got '{url}'"),
            });
        }
        if self.backend.timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "backend.timeout_secs".into(),
                reason: "must be greater than zero".into(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn defaults_match_fresh_start_variant() {
        let config = IntakeConfig::default();
        assert_eq!(config.backend.base_url, "http://localhost:5000");
        assert_eq!(config.backend.timeout_secs, 30);
        assert_eq!(config.intake.progression_threshold, ProgressionThreshold::Five);
        assert!(!config.intake.persist_transcript);
        assert!(!config.intake.results_trigger);
    }

    #[test]
    fn app_data_dir_ends_with_app_name() {
        assert!(app_data_dir().ends_with("MindEase"));
        assert!(StorageConfig::default()
            .exports_dir()
            .starts_with(app_data_dir()));
    }

    #[test]
    fn storage_override_wins() {
        let storage = StorageConfig {
            data_dir: Some(PathBuf::from("/tmp/mindease-test")),
        };
        assert_eq!(
            storage.transcript_db_path(),
            PathBuf::from("/tmp/mindease-test/transcript.db")
        );
        assert_eq!(
            storage.exports_dir(),
            PathBuf::from("/tmp/mindease-test/exports")
        );
    }

    #[test]
    fn loads_persisting_variant_from_toml() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "config.toml",
                r#"
[intake]
progression_threshold = 4
persist_transcript = true
results_trigger = true

[backend]
base_url = "http://analysis.local:8080"
"#,
            )?;

            let figment = Figment::from(Serialized::defaults(IntakeConfig::default()))
                .merge(Toml::file("config.toml"));
            let config = IntakeConfig::from_figment(figment).expect("valid config");

            assert_eq!(config.intake.progression_threshold, ProgressionThreshold::Four);
            assert!(config.intake.persist_transcript);
            assert!(config.intake.results_trigger);
            assert_eq!(config.backend.base_url, "http://analysis.local:8080");
            assert_eq!(config.backend.timeout_secs, 30);
            Ok(())
        });
    }

    #[test]
    fn env_overrides_nested_fields() {
        Jail::expect_with(|jail| {
            jail.set_env("MINDEASE_INTAKE__PROGRESSION_THRESHOLD", "4");
            jail.set_env("MINDEASE_BACKEND__TIMEOUT_SECS", "5");

            let figment = Figment::from(Serialized::defaults(IntakeConfig::default()))
                .merge(Env::prefixed("MINDEASE_").split("__"));
            let config = IntakeConfig::from_figment(figment).expect("valid config");

            assert_eq!(config.intake.progression_threshold.level(), 4);
            assert_eq!(config.backend.timeout_secs, 5);
            Ok(())
        });
    }

    #[test]
    fn rejects_threshold_outside_variants() {
        Jail::expect_with(|jail| {
            jail.create_file("config.toml", "[intake]\nprogression_threshold = 3\n")?;
            let figment = Figment::from(Serialized::defaults(IntakeConfig::default()))
                .merge(Toml::file("config.toml"));
            assert!(IntakeConfig::from_figment(figment).is_err());
            Ok(())
        });
    }

    #[test]
    fn rejects_non_http_base_url() {
        let figment = Figment::from(Serialized::defaults(IntakeConfig::default()))
            .merge(Serialized::default("backend.base_url", "localhost:5000"));
        let err = IntakeConfig::from_figment(figment).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn threshold_round_trips_as_integer() {
        let json = serde_json::to_string(&ProgressionThreshold::Four).unwrap();
        assert_eq!(json, "4");
        assert!(ProgressionThreshold::try_from(6).is_err());
    }

    #[test]
    fn app_name_is_mindease() {
        assert_eq!(APP_NAME, "MindEase");
    }
}
