mod settings;

use crate::config::settings::PartialSettings;
use config::{Config, ConfigError, Environment, File};

pub use settings::{BridgeSettings, InfluxSettings, MqttSettings, Settings};

/// Path (without extension) of the configuration file read by `load_config`.
pub const DEFAULT_CONFIG_PATH: &str = "config/default";

/// Loads the configuration from the default file and environment variables.
pub fn load_config() -> Result<Settings, ConfigError> {
    load_config_from(DEFAULT_CONFIG_PATH)
}

/// Loads the configuration from `path` (optional) and environment variables,
/// then merges the result over the default values.
///
/// Environment keys use `_` as the section separator, so `MQTT_BROKER` sets
/// `mqtt.broker` and `INFLUX_TOKEN` sets `influx.token`. Multi-word keys such
/// as `mqtt.reconnect_period_secs` can only come from the file.
pub fn load_config_from(path: &str) -> Result<Settings, ConfigError> {
    let builder = Config::builder()
        .add_source(File::with_name(path).required(false))
        .add_source(Environment::default().separator("_"));

    let config = builder.build()?;

    // Try to deserialize what is available
    let partial: PartialSettings = config.try_deserialize()?;

    Ok(Settings::merge(partial))
}

#[cfg(test)]
mod tests;
