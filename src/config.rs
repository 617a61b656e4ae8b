//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files.

use serde::Deserialize;
use serde::de::Error;
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::actuator::{DriveSettings, EnablePolarity, PinInit};
use crate::error::{HandError, Result};
use crate::gamepad::protocol::DEFAULT_SPI_CLOCK_HZ;
use crate::gamepad::LinkSettings;

/// Main configuration structure
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub gamepad: GamepadConfig,
    pub drive: DriveConfig,
    #[serde(default)]
    pub actuators: Vec<ActuatorConfig>,
    pub telemetry: TelemetryConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Controller link configuration
#[derive(Debug, Deserialize, Clone)]
pub struct GamepadConfig {
    /// GPIO driving the attention (chip-select) line
    #[serde(default = "default_attention_pin")]
    pub attention_pin: u8,

    #[serde(default = "default_spi_clock_hz")]
    pub spi_clock_hz: u32,

    #[serde(default)]
    pub rumble: bool,

    #[serde(default)]
    pub pressures: bool,

    #[serde(default = "default_poll_delay_ms")]
    pub poll_delay_ms: u64,

    #[serde(default = "default_reconfigure_after_ms")]
    pub reconfigure_after_ms: u64,

    /// How often the application polls the controller
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// How often `configure()` is retried while no controller answers
    #[serde(default = "default_retry_interval_ms")]
    pub retry_interval_ms: u64,
}

/// Shared step line configuration
#[derive(Debug, Deserialize, Clone)]
pub struct DriveConfig {
    #[serde(default = "default_step_pin")]
    pub step_pin: u8,

    #[serde(default = "default_step_pulse_ms")]
    pub step_pulse_ms: u64,

    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,

    /// Enable inputs are active low
    #[serde(default)]
    pub inverted_enable: bool,

    /// Leave actuator lines alone until registration
    #[serde(default)]
    pub deferred_init: bool,
}

/// One actuator
#[derive(Debug, Deserialize, Clone)]
pub struct ActuatorConfig {
    pub name: String,
    pub enable_pin: u8,
    pub direction_pin: u8,

    #[serde(default = "default_step")]
    pub step: f32,

    /// Target driven to at startup
    #[serde(default)]
    pub home_target: Option<f32>,
}

/// Telemetry configuration
#[derive(Debug, Deserialize, Clone)]
pub struct TelemetryConfig {
    #[serde(default = "default_telemetry_enabled")]
    pub enabled: bool,

    #[serde(default = "default_telemetry_dir")]
    pub log_dir: String,

    #[serde(default = "default_max_records_per_file")]
    pub max_records_per_file: usize,

    #[serde(default = "default_max_files_to_keep")]
    pub max_files_to_keep: usize,

    #[serde(default = "default_log_interval_ms")]
    pub log_interval_ms: u64,

    #[serde(default = "default_log_format")]
    pub format: String,
}

/// Application log configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    /// Also write daily log files here when set
    #[serde(default)]
    pub log_dir: Option<String>,

    #[serde(default = "default_log_file_prefix")]
    pub file_prefix: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_dir: None,
            file_prefix: default_log_file_prefix(),
        }
    }
}

// Default value functions
fn default_attention_pin() -> u8 { 22 }
fn default_spi_clock_hz() -> u32 { DEFAULT_SPI_CLOCK_HZ }
fn default_poll_delay_ms() -> u64 { 10 }
fn default_reconfigure_after_ms() -> u64 { 1500 }
fn default_poll_interval_ms() -> u64 { 20 }
fn default_retry_interval_ms() -> u64 { 1000 }

fn default_step_pin() -> u8 { 18 }
fn default_step_pulse_ms() -> u64 { 10 }
fn default_tick_interval_ms() -> u64 { 20 }

fn default_step() -> f32 { 1.0 }

fn default_telemetry_enabled() -> bool { false }
fn default_telemetry_dir() -> String { "./telemetry".to_string() }
fn default_max_records_per_file() -> usize { 10000 }
fn default_max_files_to_keep() -> usize { 10 }
fn default_log_interval_ms() -> u64 { 100 }
fn default_log_format() -> String { "jsonl".to_string() }

fn default_log_file_prefix() -> String { "hand-drive.log".to_string() }

fn invalid(message: impl std::fmt::Display) -> HandError {
    HandError::Config(toml::de::Error::custom(message))
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration file
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use hand_drive::config::Config;
    ///
    /// let config = Config::load("config/default.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns error if any configuration value is out of valid range
    pub fn validate(&self) -> Result<()> {
        // Controller link timing
        if self.gamepad.poll_delay_ms == 0 || self.gamepad.poll_delay_ms > 1000 {
            return Err(invalid("poll_delay_ms must be between 1 and 1000"));
        }

        if self.gamepad.reconfigure_after_ms <= self.gamepad.poll_delay_ms
            || self.gamepad.reconfigure_after_ms > 60000 {
            return Err(invalid("reconfigure_after_ms must be greater than poll_delay_ms and at most 60000"));
        }

        if self.gamepad.spi_clock_hz < 1_000 || self.gamepad.spi_clock_hz > 1_000_000 {
            return Err(invalid("spi_clock_hz must be between 1000 and 1000000"));
        }

        if self.gamepad.poll_interval_ms == 0 || self.gamepad.poll_interval_ms > 60000 {
            return Err(invalid("poll_interval_ms must be between 1 and 60000"));
        }

        if self.gamepad.retry_interval_ms == 0 || self.gamepad.retry_interval_ms > 60000 {
            return Err(invalid("retry_interval_ms must be between 1 and 60000"));
        }

        // Step pulse timing
        if self.drive.step_pulse_ms == 0 || self.drive.step_pulse_ms > 1000 {
            return Err(invalid("step_pulse_ms must be between 1 and 1000"));
        }

        if self.drive.tick_interval_ms < self.drive.step_pulse_ms {
            return Err(invalid("tick_interval_ms must be at least step_pulse_ms"));
        }

        // Actuators
        let mut names = HashSet::new();
        for actuator in &self.actuators {
            if actuator.name.is_empty() {
                return Err(invalid("actuator name cannot be empty"));
            }
            if !names.insert(actuator.name.as_str()) {
                return Err(invalid(format!("duplicate actuator name '{}'", actuator.name)));
            }
            if !(actuator.step.is_finite() && actuator.step > 0.0) {
                return Err(invalid(format!("actuator '{}' step must be positive and finite", actuator.name)));
            }
            if let Some(target) = actuator.home_target {
                if !target.is_finite() {
                    return Err(invalid(format!("actuator '{}' home_target must be finite", actuator.name)));
                }
            }
        }

        // Every GPIO drives exactly one line
        let mut pins = HashSet::new();
        let lines = [("attention_pin", self.gamepad.attention_pin), ("step_pin", self.drive.step_pin)]
            .into_iter()
            .chain(self.actuators.iter().flat_map(|a| {
                [("enable_pin", a.enable_pin), ("direction_pin", a.direction_pin)]
            }));
        for (line, pin) in lines {
            if !pins.insert(pin) {
                return Err(invalid(format!("{} {} is already assigned to another line", line, pin)));
            }
        }

        // Telemetry
        if self.telemetry.enabled && self.telemetry.log_dir.is_empty() {
            return Err(invalid("telemetry log_dir cannot be empty when enabled"));
        }

        if self.telemetry.log_interval_ms == 0 || self.telemetry.log_interval_ms > 60000 {
            return Err(invalid("log_interval_ms must be between 1 and 60000"));
        }

        if self.telemetry.max_records_per_file == 0 {
            return Err(invalid("max_records_per_file must be greater than 0"));
        }

        if self.telemetry.max_files_to_keep == 0 {
            return Err(invalid("max_files_to_keep must be greater than 0"));
        }

        if self.telemetry.format != "jsonl" {
            return Err(invalid("log format must be 'jsonl' (only supported format)"));
        }

        if let Some(dir) = &self.logging.log_dir {
            if dir.is_empty() {
                return Err(invalid("logging log_dir cannot be empty when set"));
            }
        }

        Ok(())
    }
}

impl From<&GamepadConfig> for LinkSettings {
    fn from(config: &GamepadConfig) -> Self {
        Self {
            rumble: config.rumble,
            pressures: config.pressures,
            poll_delay: Duration::from_millis(config.poll_delay_ms),
            reconfigure_after: Duration::from_millis(config.reconfigure_after_ms),
        }
    }
}

impl From<&DriveConfig> for DriveSettings {
    fn from(config: &DriveConfig) -> Self {
        Self {
            polarity: if config.inverted_enable {
                EnablePolarity::ActiveLow
            } else {
                EnablePolarity::ActiveHigh
            },
            init: if config.deferred_init {
                PinInit::Deferred
            } else {
                PinInit::Immediate
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_valid_config() -> Config {
        Config {
            gamepad: GamepadConfig {
                attention_pin: default_attention_pin(),
                spi_clock_hz: default_spi_clock_hz(),
                rumble: false,
                pressures: false,
                poll_delay_ms: default_poll_delay_ms(),
                reconfigure_after_ms: default_reconfigure_after_ms(),
                poll_interval_ms: default_poll_interval_ms(),
                retry_interval_ms: default_retry_interval_ms(),
            },
            drive: DriveConfig {
                step_pin: default_step_pin(),
                step_pulse_ms: default_step_pulse_ms(),
                tick_interval_ms: default_tick_interval_ms(),
                inverted_enable: false,
                deferred_init: false,
            },
            actuators: vec![
                ActuatorConfig {
                    name: "thumb".to_string(),
                    enable_pin: 5,
                    direction_pin: 6,
                    step: 1.0,
                    home_target: Some(0.0),
                },
                ActuatorConfig {
                    name: "index".to_string(),
                    enable_pin: 13,
                    direction_pin: 19,
                    step: 0.5,
                    home_target: None,
                },
            ],
            telemetry: TelemetryConfig {
                enabled: default_telemetry_enabled(),
                log_dir: default_telemetry_dir(),
                max_records_per_file: default_max_records_per_file(),
                max_files_to_keep: default_max_files_to_keep(),
                log_interval_ms: default_log_interval_ms(),
                format: default_log_format(),
            },
            logging: LoggingConfig::default(),
        }
    }

    #[test]
    fn test_valid_config() {
        assert!(create_valid_config().validate().is_ok());
    }

    #[test]
    fn test_poll_delay_out_of_range() {
        for delay in [0, 1001] {
            let mut config = create_valid_config();
            config.gamepad.poll_delay_ms = delay;
            assert!(config.validate().is_err(), "poll_delay_ms {} should be rejected", delay);
        }
    }

    #[test]
    fn test_reconfigure_threshold_must_exceed_poll_delay() {
        let mut config = create_valid_config();
        config.gamepad.poll_delay_ms = 50;
        config.gamepad.reconfigure_after_ms = 50;
        assert!(config.validate().is_err());

        config.gamepad.reconfigure_after_ms = 51;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_reconfigure_threshold_too_high() {
        let mut config = create_valid_config();
        config.gamepad.reconfigure_after_ms = 60001;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_spi_clock_out_of_range() {
        for hz in [999, 1_000_001] {
            let mut config = create_valid_config();
            config.gamepad.spi_clock_hz = hz;
            assert!(config.validate().is_err(), "spi_clock_hz {} should be rejected", hz);
        }
    }

    #[test]
    fn test_step_pulse_out_of_range() {
        let mut config = create_valid_config();
        config.drive.step_pulse_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_tick_interval_shorter_than_pulse() {
        let mut config = create_valid_config();
        config.drive.step_pulse_ms = 30;
        config.drive.tick_interval_ms = 20;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_actuator_step() {
        for step in [0.0, -1.0, f32::NAN] {
            let mut config = create_valid_config();
            config.actuators[0].step = step;
            assert!(config.validate().is_err(), "step {} should be rejected", step);
        }
    }

    #[test]
    fn test_duplicate_actuator_name() {
        let mut config = create_valid_config();
        config.actuators[1].name = "thumb".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_pin_reused_across_lines() {
        let mut config = create_valid_config();
        config.actuators[1].direction_pin = config.drive.step_pin;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("direction_pin 18"), "got: {}", err);
    }

    #[test]
    fn test_pin_reused_within_actuator() {
        let mut config = create_valid_config();
        config.actuators[0].direction_pin = config.actuators[0].enable_pin;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_telemetry_limits() {
        let mut config = create_valid_config();
        config.telemetry.max_records_per_file = 0;
        assert!(config.validate().is_err());

        let mut config = create_valid_config();
        config.telemetry.max_files_to_keep = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_log_format() {
        let mut config = create_valid_config();
        config.telemetry.format = "csv".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_logging_dir() {
        let mut config = create_valid_config();
        config.logging.log_dir = Some(String::new());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_link_settings_conversion() {
        let mut config = create_valid_config();
        config.gamepad.pressures = true;
        let settings = LinkSettings::from(&config.gamepad);

        assert!(settings.pressures);
        assert!(!settings.rumble);
        assert_eq!(settings.poll_delay, Duration::from_millis(10));
        assert_eq!(settings.reconfigure_after, Duration::from_millis(1500));
    }

    #[test]
    fn test_drive_settings_conversion() {
        let mut config = create_valid_config();
        assert_eq!(DriveSettings::from(&config.drive), DriveSettings::default());

        config.drive.inverted_enable = true;
        config.drive.deferred_init = true;
        let settings = DriveSettings::from(&config.drive);
        assert_eq!(settings.polarity, EnablePolarity::ActiveLow);
        assert_eq!(settings.init, PinInit::Deferred);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
[gamepad]
pressures = true

[drive]
tick_interval_ms = 25

[[actuators]]
name = "thumb"
enable_pin = 5
direction_pin = 6
step = 2.5
home_target = 40.0

[telemetry]
"#
        )
        .unwrap();

        let config = Config::load(file.path()).unwrap();
        assert!(config.gamepad.pressures);
        assert_eq!(config.gamepad.poll_delay_ms, 10);
        assert_eq!(config.drive.tick_interval_ms, 25);
        assert_eq!(config.actuators.len(), 1);
        assert_eq!(config.actuators[0].home_target, Some(40.0));
        assert!(config.logging.log_dir.is_none());
    }

    #[test]
    fn test_load_rejects_invalid_values() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "[gamepad]\npoll_delay_ms = 0\n[drive]\n[telemetry]\n").unwrap();
        assert!(matches!(Config::load(file.path()), Err(HandError::Config(_))));
    }

    #[test]
    fn test_load_missing_file() {
        let result = Config::load("/nonexistent/hand-drive.toml");
        assert!(matches!(result, Err(HandError::Io(_))));
    }

    #[test]
    fn test_default_functions() {
        assert_eq!(default_attention_pin(), 22);
        assert_eq!(default_spi_clock_hz(), 500_000);
        assert_eq!(default_poll_delay_ms(), 10);
        assert_eq!(default_reconfigure_after_ms(), 1500);
        assert_eq!(default_poll_interval_ms(), 20);
        assert_eq!(default_retry_interval_ms(), 1000);
        assert_eq!(default_step_pin(), 18);
        assert_eq!(default_step_pulse_ms(), 10);
        assert_eq!(default_tick_interval_ms(), 20);
        assert_eq!(default_step(), 1.0);
        assert!(!default_telemetry_enabled());
        assert_eq!(default_telemetry_dir(), "./telemetry");
        assert_eq!(default_max_records_per_file(), 10000);
        assert_eq!(default_max_files_to_keep(), 10);
        assert_eq!(default_log_interval_ms(), 100);
        assert_eq!(default_log_format(), "jsonl");
        assert_eq!(default_log_file_prefix(), "hand-drive.log");
    }
}
