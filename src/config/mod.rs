use serde::Deserialize;
use std::{fs, path::Path};

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    /// Address the broker's TCP listener binds to.
    pub bind_addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:3000".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DeliveryConfig {
    /// How long one round waits for a subscriber's ack before marking it
    /// unreachable and moving on.
    pub ack_timeout_ms: u64,
    /// Consecutive unreachable rounds before a subscriber is pruned.
    pub max_strikes: u32,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            ack_timeout_ms: 5_000,
            max_strikes: 3,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub delivery: DeliveryConfig,
}

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, anyhow::Error> {
    let raw: String = fs::read_to_string(path)?;
    let config: Config = toml::from_str(&raw)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_config_parses() {
        let config: Config = toml::from_str(
            r#"
            [server]
            bind_addr = "0.0.0.0:4000"

            [delivery]
            ack_timeout_ms = 250
            max_strikes = 1
            "#,
        )
        .unwrap();
        assert_eq!(config.server.bind_addr, "0.0.0.0:4000");
        assert_eq!(config.delivery.ack_timeout_ms, 250);
        assert_eq!(config.delivery.max_strikes, 1);
    }

    #[test]
    fn missing_sections_fall_back_to_defaults() {
        let config: Config = toml::from_str("[server]\nbind_addr = \"127.0.0.1:9999\"\n").unwrap();
        assert_eq!(config.server.bind_addr, "127.0.0.1:9999");
        assert_eq!(config.delivery.ack_timeout_ms, 5_000);
        assert_eq!(config.delivery.max_strikes, 3);
    }

    #[test]
    fn empty_config_is_all_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.server.bind_addr, "127.0.0.1:3000");
    }
}
