use serde::Deserialize;

/// Top-level configuration settings for the bridge.
///
/// Groups the broker subscription, the time-series target and the
/// process-level knobs.
#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub mqtt: MqttSettings,
    pub influx: InfluxSettings,
    pub bridge: BridgeSettings,
}

/// Connection settings for the message broker.
#[derive(Debug, Deserialize, Clone)]
pub struct MqttSettings {
    /// Broker address, `mqtt://host:port` or `tcp://host:port`.
    pub broker: String,
    pub topic: String,
    pub client_id: String,
    /// Fixed delay between reconnect attempts.
    pub reconnect_period_secs: u64,
    pub keep_alive_secs: u64,
    /// Capacity of the event hand-off channel between the broker task and the controller.
    pub channel_capacity: usize,
}

/// Write target in the time-series store.
#[derive(Debug, Deserialize, Clone)]
pub struct InfluxSettings {
    pub url: String,
    pub token: String,
    pub org: String,
    pub bucket: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BridgeSettings {
    pub shutdown_timeout_secs: u64,
    pub log_level: String,
}

/// Partial configuration settings loaded from files or environment.
///
/// Allows partial specification of settings. Missing values can be filled using defaults.
#[derive(Debug, Default, Deserialize)]
pub struct PartialSettings {
    pub mqtt: Option<PartialMqttSettings>,
    pub influx: Option<PartialInfluxSettings>,
    pub bridge: Option<PartialBridgeSettings>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PartialMqttSettings {
    pub broker: Option<String>,
    pub topic: Option<String>,
    pub client_id: Option<String>,
    pub reconnect_period_secs: Option<u64>,
    pub keep_alive_secs: Option<u64>,
    pub channel_capacity: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PartialInfluxSettings {
    pub url: Option<String>,
    pub token: Option<String>,
    pub org: Option<String>,
    pub bucket: Option<String>,
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PartialBridgeSettings {
    pub shutdown_timeout_secs: Option<u64>,
    pub log_level: Option<String>,
}

impl Settings {
    /// Fill every value missing from `partial` with the matching default.
    pub fn merge(partial: PartialSettings) -> Self {
        let default = Settings::default();
        let mqtt = partial.mqtt.unwrap_or_default();
        let influx = partial.influx.unwrap_or_default();
        let bridge = partial.bridge.unwrap_or_default();

        Self {
            mqtt: MqttSettings {
                broker: mqtt.broker.unwrap_or(default.mqtt.broker),
                topic: mqtt.topic.unwrap_or(default.mqtt.topic),
                client_id: mqtt.client_id.unwrap_or(default.mqtt.client_id),
                reconnect_period_secs: mqtt
                    .reconnect_period_secs
                    .unwrap_or(default.mqtt.reconnect_period_secs),
                keep_alive_secs: mqtt.keep_alive_secs.unwrap_or(default.mqtt.keep_alive_secs),
                channel_capacity: mqtt
                    .channel_capacity
                    .unwrap_or(default.mqtt.channel_capacity),
            },
            influx: InfluxSettings {
                url: influx.url.unwrap_or(default.influx.url),
                token: influx.token.unwrap_or(default.influx.token),
                org: influx.org.unwrap_or(default.influx.org),
                bucket: influx.bucket.unwrap_or(default.influx.bucket),
                timeout_secs: influx.timeout_secs.unwrap_or(default.influx.timeout_secs),
            },
            bridge: BridgeSettings {
                shutdown_timeout_secs: bridge
                    .shutdown_timeout_secs
                    .unwrap_or(default.bridge.shutdown_timeout_secs),
                log_level: bridge.log_level.unwrap_or(default.bridge.log_level),
            },
        }
    }
}

/// Provides default values for `Settings`.
///
/// A bridge started with no file and no environment talks to a broker and
/// an InfluxDB instance on localhost.
impl Default for Settings {
    fn default() -> Self {
        Self {
            mqtt: MqttSettings {
                broker: "mqtt://localhost:1883".to_string(),
                topic: "alzette/machine/data".to_string(),
                client_id: format!("bridge-{}", chrono::Utc::now().timestamp_millis()),
                reconnect_period_secs: 5,
                keep_alive_secs: 30,
                channel_capacity: 64,
            },
            influx: InfluxSettings {
                url: "http://localhost:8086".to_string(),
                token: "YOUR_INFLUXDB_TOKEN_HERE".to_string(),
                org: "lycee".to_string(),
                bucket: "sensors".to_string(),
                timeout_secs: 10,
            },
            bridge: BridgeSettings {
                shutdown_timeout_secs: 5,
                log_level: "info".to_string(),
            },
        }
    }
}
