use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct FruitcamConfig {
    pub camera: CameraConfig,
    pub classifier: ClassifierConfig,
    pub aggregator: AggregatorConfig,
    pub kitchen: KitchenConfig,
    pub store: StoreConfig,
    pub system: SystemConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct CameraConfig {
    /// Which camera to open
    #[serde(default = "default_camera_position")]
    pub position: CameraPosition,

    /// Session quality preset
    #[serde(default = "default_camera_quality")]
    pub quality: CaptureQuality,

    /// Upper bound on a single device capture call
    #[serde(default = "default_capture_timeout_ms")]
    pub capture_timeout_ms: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ClassifierConfig {
    /// Labels below this confidence are discarded (inclusive boundary)
    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: f32,

    /// Optional bound on one recognition call
    #[serde(default)]
    pub inference_timeout_ms: Option<u64>,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct AggregatorConfig {
    /// Delay between receiving a detection and committing it
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,

    /// Capacity of the aggregator command queue
    #[serde(default = "default_command_capacity")]
    pub command_capacity: usize,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct KitchenConfig {
    /// How long the mix animation flag stays raised after mix()
    #[serde(default = "default_mix_animation_ms")]
    pub mix_animation_ms: u64,

    /// Fruits per recipe when the preference is unanswered
    #[serde(default = "default_max_fruits")]
    pub default_max_fruits: usize,

    /// Show sample recipes when nothing has been liked yet
    #[serde(default = "default_seed_sample_recipes")]
    pub seed_sample_recipes: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct StoreConfig {
    /// Path of the liked-recipe store file
    #[serde(default = "default_store_path")]
    pub path: String,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct SystemConfig {
    /// Event bus capacity
    #[serde(default = "default_event_bus_capacity")]
    pub event_bus_capacity: usize,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct LoggingConfig {
    /// Default level for the fruitcam target when RUST_LOG is unset
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format
    #[serde(default = "default_log_format")]
    pub format: LogFormat,

    /// Directory for a daily rolling log file (console only when unset)
    #[serde(default)]
    pub directory: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CameraPosition {
    Back,
    Front,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CaptureQuality {
    Photo,
    High,
    Medium,
    Low,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Compact,
    Json,
}

impl FruitcamConfig {
    /// Load configuration from default sources (file + environment variables)
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_file("fruitcam.toml")
    }

    /// Load configuration from a specific file path
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path_str = path.as_ref().to_string_lossy();
        debug!("Loading configuration from: {}", path_str);

        let settings = Config::builder()
            .set_default("camera.position", "back")?
            .set_default("camera.quality", "photo")?
            .set_default("camera.capture_timeout_ms", default_capture_timeout_ms())?
            .set_default(
                "classifier.confidence_threshold",
                default_confidence_threshold() as f64,
            )?
            .set_default("aggregator.settle_delay_ms", default_settle_delay_ms())?
            .set_default(
                "aggregator.command_capacity",
                default_command_capacity() as i64,
            )?
            .set_default("kitchen.mix_animation_ms", default_mix_animation_ms())?
            .set_default("kitchen.default_max_fruits", default_max_fruits() as i64)?
            .set_default("kitchen.seed_sample_recipes", default_seed_sample_recipes())?
            .set_default("store.path", default_store_path())?
            .set_default(
                "system.event_bus_capacity",
                default_event_bus_capacity() as i64,
            )?
            .set_default("logging.level", default_log_level())?
            .set_default("logging.format", "pretty")?
            // Add configuration file (optional)
            .add_source(File::with_name(&path_str).required(false))
            // FRUITCAM_KITCHEN__MIX_ANIMATION_MS=0 style overrides
            .add_source(
                Environment::with_prefix("FRUITCAM")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?;

        let config: FruitcamConfig = settings.try_deserialize()?;

        info!("Configuration loaded successfully");
        debug!("Final configuration: {:#?}", config);

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        let threshold = self.classifier.confidence_threshold;
        if !(0.0..=1.0).contains(&threshold) {
            return Err(ConfigError::Message(format!(
                "Classifier confidence_threshold must be within [0, 1], got {}",
                threshold
            )));
        }

        if self.camera.capture_timeout_ms == 0 {
            return Err(ConfigError::Message(
                "Camera capture_timeout_ms must be greater than 0".to_string(),
            ));
        }

        if self.classifier.inference_timeout_ms == Some(0) {
            return Err(ConfigError::Message(
                "Classifier inference_timeout_ms must be greater than 0 when set".to_string(),
            ));
        }

        if self.aggregator.command_capacity == 0 {
            return Err(ConfigError::Message(
                "Aggregator command capacity must be greater than 0".to_string(),
            ));
        }

        if self.kitchen.default_max_fruits == 0 {
            return Err(ConfigError::Message(
                "Kitchen default_max_fruits must be greater than 0".to_string(),
            ));
        }

        if self.store.path.trim().is_empty() {
            return Err(ConfigError::Message(
                "Store path must not be empty".to_string(),
            ));
        }

        if self.system.event_bus_capacity == 0 {
            return Err(ConfigError::Message(
                "Event bus capacity must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Render the configuration as TOML
    pub fn to_toml_string(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}

impl CameraConfig {
    pub fn capture_timeout(&self) -> Duration {
        Duration::from_millis(self.capture_timeout_ms)
    }
}

impl ClassifierConfig {
    pub fn inference_timeout(&self) -> Option<Duration> {
        self.inference_timeout_ms.map(Duration::from_millis)
    }
}

impl AggregatorConfig {
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }
}

impl KitchenConfig {
    pub fn mix_animation(&self) -> Duration {
        Duration::from_millis(self.mix_animation_ms)
    }
}

impl Default for FruitcamConfig {
    fn default() -> Self {
        Self {
            camera: CameraConfig::default(),
            classifier: ClassifierConfig::default(),
            aggregator: AggregatorConfig::default(),
            kitchen: KitchenConfig::default(),
            store: StoreConfig {
                path: default_store_path(),
            },
            system: SystemConfig {
                event_bus_capacity: default_event_bus_capacity(),
            },
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            position: default_camera_position(),
            quality: default_camera_quality(),
            capture_timeout_ms: default_capture_timeout_ms(),
        }
    }
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: default_confidence_threshold(),
            inference_timeout_ms: None,
        }
    }
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            settle_delay_ms: default_settle_delay_ms(),
            command_capacity: default_command_capacity(),
        }
    }
}

impl Default for KitchenConfig {
    fn default() -> Self {
        Self {
            mix_animation_ms: default_mix_animation_ms(),
            default_max_fruits: default_max_fruits(),
            seed_sample_recipes: default_seed_sample_recipes(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            directory: None,
        }
    }
}

// Default value functions
fn default_camera_position() -> CameraPosition {
    CameraPosition::Back
}
fn default_camera_quality() -> CaptureQuality {
    CaptureQuality::Photo
}
fn default_capture_timeout_ms() -> u64 {
    10_000
}

fn default_confidence_threshold() -> f32 {
    0.95
}

fn default_settle_delay_ms() -> u64 {
    1000
}
fn default_command_capacity() -> usize {
    64
}

fn default_mix_animation_ms() -> u64 {
    4000
}
fn default_max_fruits() -> usize {
    3
}
fn default_seed_sample_recipes() -> bool {
    true
}

fn default_store_path() -> String {
    "./fruitcam/recipes.json".to_string()
}

fn default_event_bus_capacity() -> usize {
    100
}

fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_format() -> LogFormat {
    LogFormat::Pretty
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::Builder;

    #[test]
    fn test_default_config() {
        let config = FruitcamConfig::default();

        assert!(config.validate().is_ok());
        assert_eq!(config.classifier.confidence_threshold, 0.95);
        assert_eq!(config.aggregator.settle_delay(), Duration::from_secs(1));
        assert_eq!(config.kitchen.default_max_fruits, 3);
    }

    #[test]
    fn test_load_from_file_overrides_defaults() {
        let mut file = Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "[aggregator]\nsettle_delay_ms = 0\n\n[camera]\nposition = \"front\"\n\n[store]\npath = \"/tmp/liked.json\""
        )
        .unwrap();

        let config = FruitcamConfig::load_from_file(file.path()).unwrap();

        assert_eq!(config.aggregator.settle_delay_ms, 0);
        assert_eq!(config.camera.position, CameraPosition::Front);
        assert_eq!(config.store.path, "/tmp/liked.json");
        // Untouched sections keep their defaults
        assert_eq!(config.classifier.confidence_threshold, 0.95);
        assert_eq!(config.kitchen.mix_animation_ms, 4000);
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let config = FruitcamConfig::load_from_file("/nonexistent/fruitcam.toml").unwrap();
        assert_eq!(config.camera.quality, CaptureQuality::Photo);
        assert_eq!(config.system.event_bus_capacity, 100);
    }

    #[test]
    fn test_config_validation() {
        let mut config = FruitcamConfig::default();

        config.classifier.confidence_threshold = 1.5;
        assert!(config.validate().is_err());

        config.classifier.confidence_threshold = 0.95;
        config.kitchen.default_max_fruits = 0;
        assert!(config.validate().is_err());

        config.kitchen.default_max_fruits = 2;
        config.system.event_bus_capacity = 0;
        assert!(config.validate().is_err());

        config.system.event_bus_capacity = 10;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_toml_round_trip() {
        let config = FruitcamConfig::default();
        let rendered = config.to_toml_string().unwrap();
        assert!(rendered.contains("confidence_threshold"));

        let parsed: FruitcamConfig = toml::from_str(&rendered).unwrap();
        assert_eq!(parsed, config);
    }
}
