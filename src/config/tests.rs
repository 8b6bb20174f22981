use super::settings::Settings;
use super::{load_config, load_config_from};
use serial_test::serial;
use std::env;
use std::fs;
use tempfile::TempDir;

const BRIDGE_ENV: [(&str, Option<&str>); 6] = [
    ("MQTT_BROKER", None),
    ("MQTT_TOPIC", None),
    ("INFLUX_URL", None),
    ("INFLUX_TOKEN", None),
    ("INFLUX_ORG", None),
    ("INFLUX_BUCKET", None),
];

#[test]
fn test_default_settings() {
    let settings = Settings::default();
    assert_eq!(settings.mqtt.broker, "mqtt://localhost:1883");
    assert_eq!(settings.mqtt.topic, "alzette/machine/data");
    assert!(settings.mqtt.client_id.starts_with("bridge-"));
    assert_eq!(settings.mqtt.reconnect_period_secs, 5);
    assert_eq!(settings.influx.url, "http://localhost:8086");
    assert_eq!(settings.influx.org, "lycee");
    assert_eq!(settings.influx.bucket, "sensors");
    assert_eq!(settings.bridge.shutdown_timeout_secs, 5);
    assert_eq!(settings.bridge.log_level, "info");
}

#[test]
#[serial]
fn test_missing_file_and_env_yield_defaults() {
    temp_env::with_vars(BRIDGE_ENV, || {
        let cfg = load_config_from("does/not/exist").expect("load_config failed");
        assert_eq!(cfg.mqtt.broker, "mqtt://localhost:1883");
        assert_eq!(cfg.influx.token, "YOUR_INFLUXDB_TOKEN_HERE");
        assert_eq!(cfg.mqtt.channel_capacity, 64);
    });
}

#[test]
#[serial]
fn test_environment_overrides_defaults() {
    temp_env::with_vars(
        [
            ("MQTT_BROKER", Some("mqtt://broker.local:1884")),
            ("MQTT_TOPIC", Some("plant/line1/data")),
            ("INFLUX_URL", Some("http://influx.local:8086")),
            ("INFLUX_TOKEN", Some("secret")),
            ("INFLUX_ORG", Some("plant")),
            ("INFLUX_BUCKET", Some("telemetry")),
        ],
        || {
            let cfg = load_config_from("does/not/exist").expect("load_config failed");
            assert_eq!(cfg.mqtt.broker, "mqtt://broker.local:1884");
            assert_eq!(cfg.mqtt.topic, "plant/line1/data");
            assert_eq!(cfg.influx.url, "http://influx.local:8086");
            assert_eq!(cfg.influx.token, "secret");
            assert_eq!(cfg.influx.org, "plant");
            assert_eq!(cfg.influx.bucket, "telemetry");
            // untouched keys keep their defaults
            assert_eq!(cfg.influx.timeout_secs, 10);
        },
    );
}

#[test]
#[serial]
fn test_load_config_from_file_overrides_defaults() {
    // load_config reads config/default.toml relative to the working directory
    let tmp = TempDir::new().expect("create tempdir");
    let orig = env::current_dir().expect("current_dir");
    env::set_current_dir(tmp.path()).expect("set current dir");

    fs::create_dir_all("config").expect("create config dir");
    let toml = r#"
        [mqtt]
        topic = "factory/press/data"
        client_id = "bridge-press"
        reconnect_period_secs = 2

        [influx]
        bucket = "press"
        timeout_secs = 3

        [bridge]
        shutdown_timeout_secs = 9
        log_level = "debug"
    "#;
    fs::write("config/default.toml", toml).expect("write config file");

    let result = temp_env::with_vars(BRIDGE_ENV, load_config);

    env::set_current_dir(orig).expect("restore cwd");

    let cfg = result.expect("load_config failed");
    assert_eq!(cfg.mqtt.topic, "factory/press/data");
    assert_eq!(cfg.mqtt.client_id, "bridge-press");
    assert_eq!(cfg.mqtt.reconnect_period_secs, 2);
    assert_eq!(cfg.mqtt.broker, "mqtt://localhost:1883");
    assert_eq!(cfg.influx.bucket, "press");
    assert_eq!(cfg.influx.timeout_secs, 3);
    assert_eq!(cfg.bridge.shutdown_timeout_secs, 9);
    assert_eq!(cfg.bridge.log_level, "debug");
}

#[test]
#[serial]
fn test_environment_wins_over_file() {
    let tmp = TempDir::new().expect("create tempdir");
    let path = tmp.path().join("bridge.toml");
    fs::write(&path, "[influx]\norg = \"from-file\"\n").expect("write config file");
    let stem = tmp.path().join("bridge");
    let stem = stem.to_str().expect("utf-8 path");

    temp_env::with_vars([("INFLUX_ORG", Some("from-env"))], || {
        let cfg = load_config_from(stem).expect("load_config failed");
        assert_eq!(cfg.influx.org, "from-env");
    });
}
