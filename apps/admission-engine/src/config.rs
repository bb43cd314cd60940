//! Configuration module for the admission engine.
//!
//! Loads YAML configuration with environment variable interpolation and
//! validates it before anything is wired.
//!
//! # Usage
//!
//! ```rust,ignore
//! use admission_engine::config::{AdmissionConfig, load_config};
//!
//! // Load from default path (config.yaml)
//! let config = load_config(None)?;
//!
//! // Load from custom path
//! let config = load_config(Some("custom/config.yaml"))?;
//!
//! println!("veto threshold: {}", config.dispatch.veto_threshold);
//! ```

use std::path::Path;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::application::services::{DispatchPolicy, QueuePolicy};
use crate::application::use_cases::{AdmissionPolicy, ResumePolicy};
use crate::domain::liquidity::{GeneratorPolicy, LiquidityPolicy};
use crate::infrastructure::broker::PaperConfig;

/// Default configuration file.
pub const DEFAULT_CONFIG_PATH: &str = "config.yaml";

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("Failed to read config file '{path}': {source}")]
    ReadError {
        /// Path to the config file.
        path: String,
        /// The underlying IO error.
        source: std::io::Error,
    },

    /// Failed to parse YAML configuration.
    #[error("Failed to parse config YAML: {0}")]
    ParseError(#[from] serde_yaml_bw::Error),

    /// Configuration validation failed.
    #[error("Config validation failed: {0}")]
    ValidationError(String),
}

/// Root configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdmissionConfig {
    /// Liquidity classification thresholds.
    pub liquidity: LiquidityPolicy,
    /// Liquidity generation bounds.
    pub generator: GeneratorPolicy,
    /// Admission limits.
    pub admission: AdmissionPolicy,
    /// Parking limits.
    pub resume: ResumePolicy,
    /// Dispatch thresholds and recovery.
    pub dispatch: DispatchPolicy,
    /// Order queue sizing.
    pub queue: QueuePolicy,
    /// Channel capacities.
    pub channels: ChannelConfig,
    /// Paper broker seed.
    pub paper: PaperConfig,
    /// Logging configuration.
    pub logging: LoggingConfig,
}

/// Capacities of the internal channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelConfig {
    /// Broker events awaiting the bridge.
    pub broker_events: usize,
    /// Recovery directives awaiting the principal.
    pub directives: usize,
    /// Notifications awaiting delivery.
    pub notifications: usize,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            broker_events: 1024,
            directives: 64,
            notifications: 256,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive; `RUST_LOG` takes precedence.
    pub level: String,
    /// Colored output.
    pub ansi: bool,
    /// Include the event target.
    pub with_target: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            ansi: true,
            with_target: true,
        }
    }
}

/// Load configuration from a YAML file.
///
/// # Arguments
///
/// * `path` - Optional path to the config file. Defaults to "config.yaml".
///
/// # Errors
///
/// Returns a `ConfigError` if the file cannot be read, parsed, or validated.
pub fn load_config(path: Option<&str>) -> Result<AdmissionConfig, ConfigError> {
    let path = path.unwrap_or(DEFAULT_CONFIG_PATH);

    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: path.to_string(),
        source: e,
    })?;

    load_config_from_string(&contents)
}

/// Load configuration, falling back to defaults when the file does not exist.
///
/// Returns the configuration and whether the defaults were used.
///
/// # Errors
///
/// Returns a `ConfigError` if an existing file cannot be read, parsed, or validated.
pub fn load_or_default(path: &str) -> Result<(AdmissionConfig, bool), ConfigError> {
    if !Path::new(path).exists() {
        return Ok((AdmissionConfig::default(), true));
    }
    load_config(Some(path)).map(|config| (config, false))
}

/// Load configuration from a YAML string (useful for testing).
///
/// # Errors
///
/// Returns a `ConfigError` if the YAML cannot be parsed or validated.
pub fn load_config_from_string(yaml: &str) -> Result<AdmissionConfig, ConfigError> {
    let interpolated = interpolate_env_vars(yaml);
    let config: AdmissionConfig = if interpolated.trim().is_empty() {
        AdmissionConfig::default()
    } else {
        serde_yaml_bw::from_str(&interpolated)?
    };
    validate_config(&config)?;
    Ok(config)
}

/// Interpolate environment variables in a string.
///
/// Supports both `${VAR}` and `${VAR:-default}` syntax.
#[allow(clippy::expect_used)] // Regex is compile-time constant; expect() is safe here
fn interpolate_env_vars(input: &str) -> String {
    use std::sync::OnceLock;

    static ENV_VAR_REGEX: OnceLock<regex::Regex> = OnceLock::new();

    let re = ENV_VAR_REGEX.get_or_init(|| {
        regex::Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)(?::-([^}]*))?\}").expect("env var regex is valid")
    });

    re.replace_all(input, |cap: &regex::Captures<'_>| {
        let default_value = cap.get(2).map_or("", |m| m.as_str());
        match cap.get(1).map(|m| std::env::var(m.as_str())) {
            Some(Ok(v)) if !v.is_empty() => v,
            _ => default_value.to_string(),
        }
    })
    .into_owned()
}

fn check_fraction(name: &str, value: Decimal) -> Result<(), ConfigError> {
    if value < Decimal::ZERO || value > Decimal::ONE {
        return Err(ConfigError::ValidationError(format!(
            "{name} must be between 0 and 1, got {value}"
        )));
    }
    Ok(())
}

/// Validate configuration values.
fn validate_config(config: &AdmissionConfig) -> Result<(), ConfigError> {
    let liquidity = &config.liquidity;
    check_fraction("liquidity.min_reserve_margin_fraction", liquidity.min_reserve_margin_fraction)?;
    check_fraction("liquidity.fractions.emergency", liquidity.fractions.emergency)?;
    check_fraction("liquidity.fractions.safe_mode", liquidity.fractions.safe_mode)?;
    check_fraction("liquidity.fractions.recovery", liquidity.fractions.recovery)?;
    check_fraction("liquidity.fractions.high_liquidity", liquidity.fractions.high_liquidity)?;
    if liquidity.safe_mode_ratio <= Decimal::ZERO {
        return Err(ConfigError::ValidationError(
            "liquidity.safe_mode_ratio must be positive".to_string(),
        ));
    }

    check_fraction("generator.max_sell_fraction", config.generator.max_sell_fraction)?;

    if config.admission.fragment_count == 0 {
        return Err(ConfigError::ValidationError(
            "admission.fragment_count must be at least 1".to_string(),
        ));
    }
    if config.admission.max_liquidity_cycles == 0 {
        return Err(ConfigError::ValidationError(
            "admission.max_liquidity_cycles must be at least 1".to_string(),
        ));
    }

    if config.resume.max_parked == 0 {
        return Err(ConfigError::ValidationError(
            "resume.max_parked must be at least 1".to_string(),
        ));
    }
    if config.resume.park_timeout_secs == 0 || config.resume.sweep_interval_secs == 0 {
        return Err(ConfigError::ValidationError(
            "resume.park_timeout_secs and resume.sweep_interval_secs must be positive".to_string(),
        ));
    }
    if config.resume.retry_window_secs == 0 {
        return Err(ConfigError::ValidationError(
            "resume.retry_window_secs must be positive".to_string(),
        ));
    }

    let dispatch = &config.dispatch;
    check_fraction("dispatch.veto_threshold", dispatch.veto_threshold)?;
    if dispatch.step_down_factor <= Decimal::ZERO || dispatch.step_down_factor >= Decimal::ONE {
        return Err(ConfigError::ValidationError(format!(
            "dispatch.step_down_factor must be strictly between 0 and 1, got {}",
            dispatch.step_down_factor
        )));
    }
    if dispatch.max_step_down_attempts == 0 {
        return Err(ConfigError::ValidationError(
            "dispatch.max_step_down_attempts must be at least 1".to_string(),
        ));
    }
    if dispatch.fallback_price_divisor <= Decimal::ZERO {
        return Err(ConfigError::ValidationError(
            "dispatch.fallback_price_divisor must be positive".to_string(),
        ));
    }

    if config.queue.capacity == 0 {
        return Err(ConfigError::ValidationError(
            "queue.capacity must be at least 1".to_string(),
        ));
    }
    if config.queue.poll_timeout_ms == 0 {
        return Err(ConfigError::ValidationError(
            "queue.poll_timeout_ms must be positive".to_string(),
        ));
    }

    let channels = &config.channels;
    if channels.broker_events == 0 || channels.directives == 0 || channels.notifications == 0 {
        return Err(ConfigError::ValidationError(
            "channel capacities must be at least 1".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::io::Write;
    use test_case::test_case;

    #[test]
    fn test_default_config() {
        let config = AdmissionConfig::default();

        assert_eq!(config.liquidity.min_reserve_margin_fraction, dec!(0.10));
        assert_eq!(config.liquidity.fractions.high_liquidity, dec!(0.90));
        assert_eq!(config.generator.max_sell_fraction, dec!(0.25));
        assert_eq!(config.admission.fragment_count, 3);
        assert_eq!(config.admission.max_liquidity_cycles, 3);
        assert_eq!(config.resume.park_timeout_secs, 300);
        assert_eq!(config.dispatch.veto_threshold, dec!(0.90));
        assert_eq!(config.dispatch.margin_error_codes, vec![201]);
        assert_eq!(config.queue.capacity, 256);
        assert_eq!(config.logging.level, "info");
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_empty_yaml_is_default() {
        let config = load_config_from_string("").unwrap();
        assert_eq!(config, AdmissionConfig::default());
    }

    #[test]
    fn test_partial_sections_keep_defaults() {
        let yaml = r#"
dispatch:
  veto_threshold: "0.85"
  margin_error_codes: [201, 203]
admission:
  fragment_count: 4
"#;
        let config = load_config_from_string(yaml).unwrap();

        assert_eq!(config.dispatch.veto_threshold, dec!(0.85));
        assert_eq!(config.dispatch.margin_error_codes, vec![201, 203]);
        assert_eq!(config.dispatch.step_down_factor, dec!(0.60));
        assert_eq!(config.admission.fragment_count, 4);
        assert_eq!(config.admission.max_liquidity_cycles, 3);
    }

    #[test]
    fn test_env_var_default_applies() {
        let yaml = r#"
logging:
  level: "${ADMISSION_ENGINE_TEST_UNSET_LEVEL:-debug}"
"#;
        let config = load_config_from_string(yaml).unwrap();
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_interpolate_without_default_is_empty() {
        assert_eq!(interpolate_env_vars("a${ADMISSION_ENGINE_TEST_UNSET_VAR}b"), "ab");
    }

    #[test_case("liquidity:\n  fractions:\n    emergency: \"1.5\"\n" ; "fraction above one")]
    #[test_case("admission:\n  fragment_count: 0\n" ; "zero fragments")]
    #[test_case("queue:\n  capacity: 0\n" ; "zero queue capacity")]
    #[test_case("dispatch:\n  max_step_down_attempts: 0\n" ; "zero step downs")]
    #[test_case("dispatch:\n  step_down_factor: \"1\"\n" ; "step down factor one")]
    #[test_case("dispatch:\n  step_down_factor: \"0\"\n" ; "step down factor zero")]
    #[test_case("generator:\n  max_sell_fraction: \"-0.1\"\n" ; "negative sell fraction")]
    #[test_case("resume:\n  retry_window_secs: 0\n" ; "zero retry window")]
    fn test_validation_rejects(yaml: &str) {
        assert!(matches!(
            load_config_from_string(yaml),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn test_load_config_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "resume:\n  max_parked: 4").unwrap();

        let path = file.path().to_str().unwrap();
        let config = load_config(Some(path)).unwrap();
        assert_eq!(config.resume.max_parked, 4);

        let (config, defaulted) = load_or_default(path).unwrap();
        assert_eq!(config.resume.max_parked, 4);
        assert!(!defaulted);
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.yaml");

        let (config, defaulted) = load_or_default(path.to_str().unwrap()).unwrap();
        assert!(defaulted);
        assert_eq!(config, AdmissionConfig::default());
        assert!(matches!(
            load_config(path.to_str()),
            Err(ConfigError::ReadError { .. })
        ));
    }

    #[test]
    fn test_example_config_matches_defaults() {
        let config = load_config_from_string(include_str!("../config.example.yaml")).unwrap();

        let defaults = AdmissionConfig::default();
        assert_eq!(config.liquidity, defaults.liquidity);
        assert_eq!(config.dispatch, defaults.dispatch);
        assert_eq!(config.resume, defaults.resume);
        assert_eq!(config.paper.positions.len(), 1);
        assert_eq!(config.paper.quotes.len(), 2);
    }

    #[test]
    fn test_invalid_yaml() {
        assert!(matches!(
            load_config_from_string("dispatch: [not, a, map"),
            Err(ConfigError::ParseError(_))
        ));
    }
}
