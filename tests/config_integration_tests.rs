// Configuration system integration tests

use std::fs;
use std::path::PathBuf;
use vision_edge_gateway::config::{load_config, load_config_with_env, ConfigLoader, TransportConfig};
use vision_edge_gateway::{CloudTransport, TransportFactory};

#[test]
fn test_load_default_config() {
    let config_path = PathBuf::from("config/default.yaml");

    let result = load_config(&config_path);
    assert!(result.is_ok(), "Failed to load default config: {:?}", result.err());

    let config = result.unwrap();

    assert_eq!(config.server.stream_queue, 32);
    assert_eq!(config.bus.subscriber_buffer, 64);
    assert_eq!(config.clouds.publish_timeout_seconds, 10);
    assert_eq!(config.logging.level, "info");

    let names: Vec<_> = config.clouds.backends.iter().map(|b| b.name.as_str()).collect();
    assert_eq!(names, vec!["AWS", "GCP"]);

    match &config.clouds.backends[0].transport {
        TransportConfig::IotData { iot_data } => assert_eq!(iot_data.qos, 1),
        other => panic!("expected iot_data backend, got {}", other.kind()),
    }

    let gcp = config.clouds.backends[1].transport.as_mqtt().unwrap();
    assert_eq!(gcp.host, "mqtt.googleapis.com");
    assert_eq!(gcp.port, 8883);
    assert_eq!(gcp.token.algorithm, "RS256");
    assert_eq!(gcp.token.ttl_seconds, 86400);
    assert_eq!(gcp.token.refresh_margin_seconds, 3600);
}

#[test]
fn test_config_with_env_vars() {
    let temp_config = r#"
server:
  listen_addr: 127.0.0.1:${CFG_TEST_PORT:-6000}

clouds:
  backends:
    - name: ${CFG_TEST_CLOUD:-AWS}
      iot_data:
        region: ${CFG_TEST_REGION:-eu-west-1}
        endpoint: https://example-ats.iot.eu-west-1.amazonaws.com
"#;

    let dir = tempfile::tempdir().unwrap();
    let temp_path = dir.path().join("gateway.yaml");
    fs::write(&temp_path, temp_config).expect("Failed to write temp config");

    std::env::set_var("CFG_TEST_PORT", "7000");
    std::env::remove_var("CFG_TEST_CLOUD");
    std::env::remove_var("CFG_TEST_REGION");

    let result = load_config(&temp_path);
    assert!(result.is_ok(), "Failed to load config with env vars: {:?}", result.err());

    let config = result.unwrap();
    assert_eq!(config.server.listen_addr, "127.0.0.1:7000");
    assert_eq!(config.clouds.backends[0].name, "AWS");
    match &config.clouds.backends[0].transport {
        TransportConfig::IotData { iot_data } => assert_eq!(iot_data.region, "eu-west-1"),
        other => panic!("expected iot_data backend, got {}", other.kind()),
    }

    std::env::remove_var("CFG_TEST_PORT");
}

#[test]
fn test_log_level_override() {
    let dir = tempfile::tempdir().unwrap();
    let temp_path = dir.path().join("gateway.yaml");
    fs::write(&temp_path, "logging:\n  level: info\n").unwrap();

    std::env::set_var("GATEWAY_LOG_LEVEL", "trace");
    let config = load_config_with_env(&temp_path).unwrap();
    std::env::remove_var("GATEWAY_LOG_LEVEL");

    assert_eq!(config.logging.level, "trace");
}

#[test]
fn test_empty_config_uses_defaults() {
    let config = ConfigLoader::parse("{}").unwrap();

    assert_eq!(config.server.listen_addr, "0.0.0.0:50051");
    assert!(config.clouds.backends.is_empty());
    assert_eq!(config.logging.format, "text");
}

#[test]
fn test_missing_config_file() {
    let result = load_config("/nonexistent/gateway.yaml");
    assert!(result.is_err());
}

#[test]
fn test_backend_without_transport_is_rejected() {
    let yaml = r#"
clouds:
  backends:
    - name: AZURE
"#;
    assert!(ConfigLoader::parse(yaml).is_err());
}

#[test]
fn test_unknown_log_format_is_rejected() {
    let yaml = "logging:\n  format: xml\n";
    let err = ConfigLoader::parse(yaml).unwrap_err();
    assert!(err.to_string().contains("log format"));
}

#[test]
fn test_unknown_token_algorithm_is_rejected() {
    let yaml = r#"
clouds:
  backends:
    - name: GCP
      mqtt:
        host: mqtt.googleapis.com
        client_id: projects/p/locations/r/registries/g/devices/d
        trust_root_path: roots.pem
        token:
          audience: p
          private_key_path: key.pem
          algorithm: HS256
"#;
    let err = ConfigLoader::parse(yaml).unwrap_err();
    assert!(err.to_string().contains("HS256"));
}

#[test]
fn test_mqtt_backend_from_fixtures() {
    let yaml = r#"
clouds:
  backends:
    - name: GCP
      mqtt:
        host: localhost
        client_id: projects/p/locations/r/registries/g/devices/d
        trust_root_path: tests/fixtures/roots.pem
        token:
          audience: p
          private_key_path: tests/fixtures/ec_private.pem
          algorithm: ES256
"#;
    let config = ConfigLoader::parse(yaml).unwrap();
    let backend = &config.clouds.backends[0];

    let transport = TransportFactory::create(backend).unwrap();
    assert_eq!(transport.name(), "GCP");
    assert_eq!(transport.backend_type(), "mqtt");
}
