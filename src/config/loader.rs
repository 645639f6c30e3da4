// Configuration loader with environment variable substitution

use super::types::*;
use anyhow::{bail, Context, Result};
use regex::Regex;
use std::collections::HashSet;
use std::path::Path;

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from file with environment variable substitution
    pub fn load<P: AsRef<Path>>(path: P) -> Result<GatewayConfig> {
        let content = std::fs::read_to_string(path.as_ref())
            .context("Failed to read config file")?;

        Self::parse(&content)
    }

    /// Parse and validate YAML text
    pub fn parse(content: &str) -> Result<GatewayConfig> {
        let content = Self::substitute_env_vars(content)?;

        let config: GatewayConfig = serde_yaml::from_str(&content)
            .context("Failed to parse YAML configuration")?;

        Self::validate(&config)?;

        Ok(config)
    }

    /// Substitute ${VAR} and ${VAR:-default} patterns with environment variables
    ///
    /// Examples:
    /// - ${HOME} -> /home/user
    /// - ${GCP_PROJECT:-visionedgeiot} -> visionedgeiot (if GCP_PROJECT not set)
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = Regex::new(r"\$\{([^}:]+)(?::-([^}]+))?\}")
            .context("Invalid substitution pattern")?;

        let substituted = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            let default_value = caps.get(2).map(|m| m.as_str());

            match std::env::var(var_name) {
                Ok(value) => value,
                Err(_) => match default_value {
                    Some(default) => default.to_string(),
                    // Keep original if no default and var not found
                    None => format!("${{{}}}", var_name),
                },
            }
        });

        Ok(substituted.to_string())
    }

    /// Validate configuration
    fn validate(config: &GatewayConfig) -> Result<()> {
        if config.server.listen_addr.parse::<std::net::SocketAddr>().is_err() {
            bail!(
                "server.listen_addr '{}' is not a socket address",
                config.server.listen_addr
            );
        }

        if config.server.stream_queue == 0 {
            bail!("server.stream_queue must be > 0");
        }

        if config.bus.subscriber_buffer == 0 {
            bail!("bus.subscriber_buffer must be > 0");
        }

        if config.clouds.publish_timeout_seconds == 0 {
            bail!("clouds.publish_timeout_seconds must be > 0");
        }

        let mut names = HashSet::new();
        for backend in &config.clouds.backends {
            if backend.name.is_empty() {
                bail!("clouds.backends[].name cannot be empty");
            }
            if !names.insert(backend.name.as_str()) {
                bail!("Duplicate cloud backend name: '{}'", backend.name);
            }
            if let Some(mqtt) = backend.transport.as_mqtt() {
                Self::validate_mqtt(&backend.name, mqtt)?;
            }
        }

        match config.logging.format.as_str() {
            "text" | "json" => {}
            unknown => bail!("Unknown log format: '{}'. Supported: text, json", unknown),
        }

        Ok(())
    }

    fn validate_mqtt(name: &str, mqtt: &MqttConfig) -> Result<()> {
        if mqtt.client_id.is_empty() {
            bail!("backend '{}': mqtt.client_id cannot be empty", name);
        }

        if mqtt.keep_alive_seconds < 5 {
            bail!("backend '{}': mqtt.keep_alive_seconds must be >= 5", name);
        }

        if mqtt.connect_timeout_seconds == 0 {
            bail!("backend '{}': mqtt.connect_timeout_seconds must be > 0", name);
        }

        let token = &mqtt.token;
        match token.algorithm.as_str() {
            "RS256" | "ES256" => {}
            unknown => bail!(
                "backend '{}': unknown token algorithm '{}'. Supported: RS256, ES256",
                name,
                unknown
            ),
        }

        if token.ttl_seconds == 0 {
            bail!("backend '{}': token.ttl_seconds must be > 0", name);
        }

        if token.refresh_margin_seconds >= token.ttl_seconds {
            bail!(
                "backend '{}': token.refresh_margin_seconds must be less than ttl_seconds",
                name
            );
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("GATEWAY_TEST_VAR", "test_value");

        let input = "host: ${GATEWAY_TEST_VAR}";
        let output = ConfigLoader::substitute_env_vars(input).unwrap();
        assert_eq!(output, "host: test_value");

        std::env::remove_var("GATEWAY_TEST_VAR");
    }

    #[test]
    fn test_env_var_with_default() {
        std::env::remove_var("GATEWAY_TEST_VAR2");

        let input = "audience: ${GATEWAY_TEST_VAR2:-visionedgeiot}";
        let output = ConfigLoader::substitute_env_vars(input).unwrap();
        assert_eq!(output, "audience: visionedgeiot");
    }

    #[test]
    fn test_validation_zero_subscriber_buffer() {
        let mut config = GatewayConfig::default();
        config.bus.subscriber_buffer = 0;

        let result = ConfigLoader::validate(&config);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("subscriber_buffer"));
    }

    #[test]
    fn test_validation_bad_listen_addr() {
        let mut config = GatewayConfig::default();
        config.server.listen_addr = "not-an-addr".to_string();

        let result = ConfigLoader::validate(&config);
        assert!(result.unwrap_err().to_string().contains("listen_addr"));
    }

    #[test]
    fn test_validation_refresh_margin_exceeds_ttl() {
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
          ttl_seconds: 600
          refresh_margin_seconds: 600
"#;
        let result = ConfigLoader::parse(yaml);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("refresh_margin_seconds"));
    }

    #[test]
    fn test_validation_duplicate_backend_names() {
        let yaml = r#"
clouds:
  backends:
    - name: AWS
      iot_data:
        region: us-east-1
        endpoint: https://example-ats.iot.us-east-1.amazonaws.com
    - name: AWS
      iot_data:
        region: us-west-2
        endpoint: https://example-ats.iot.us-west-2.amazonaws.com
"#;
        let result = ConfigLoader::parse(yaml);
        assert!(result.unwrap_err().to_string().contains("Duplicate"));
    }
}
