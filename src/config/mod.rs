//! Configuration loading, validation and generation
//!
//! All checks run before any monitor loop is spawned; a config that loads is
//! safe to run.

pub mod types;

use std::path::Path;
use std::time::Duration;

pub use types::{
    Config, Health, Network, Notifiers, TelegramConfig, Validator, WebhookConfig,
};

use crate::monitor::MonitorTarget;

impl Config {
    /// Read, parse and validate a JSON config file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::NotFound(path.display().to_string()));
        }

        let data = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&data)?;
        config.validate()?;
        Ok(config)
    }

    /// Check every invariant the monitor relies on
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.networks.is_empty() {
            return invalid("no networks configured");
        }

        for network in &self.networks {
            let name = network.display_name();
            if network.chain_id.is_empty() {
                return invalid("chain_id missing for a network");
            }
            if network.back_check == 0 {
                return invalid(format!("back_check must be positive for {name}"));
            }
            if network.alert_threshold == 0 || network.alert_threshold > network.back_check {
                return invalid(format!(
                    "alert_threshold must be between 1 and back_check for {name}"
                ));
            }
            if network.interval.is_zero() {
                return invalid(format!("interval must be positive for {name}"));
            }
            if network.validators.is_empty() {
                return invalid(format!("no validators configured for {name}"));
            }
            for validator in &network.validators {
                if validator.moniker.is_empty() {
                    return invalid(format!("validator moniker missing on {name}"));
                }
                if validator.address.is_empty() {
                    return invalid(format!(
                        "address missing for {} on {name}",
                        validator.moniker
                    ));
                }
            }
            for rpc in &network.rpcs {
                if !is_http_url(rpc) {
                    return invalid(format!("rpc \"{rpc}\" invalid for {name}"));
                }
            }
        }

        if let Some(telegram) = &self.notifiers.telegram {
            if telegram.key.is_empty() {
                return invalid("telegram key missing");
            }
            if telegram.chat_id.is_empty() {
                return invalid("telegram chat_id missing");
            }
        }
        if let Some(webhook) = &self.notifiers.webhook {
            if !is_http_url(&webhook.url) {
                return invalid(format!("webhook url \"{}\" invalid", webhook.url));
            }
        }
        if !self.notifiers.has_channel() {
            return invalid("telegram or webhook notifier must be configured");
        }

        if let Some(health) = &self.health {
            if !health.nodes.is_empty() && health.interval.is_zero() {
                return invalid("health interval must be positive when nodes are set");
            }
            for node in &health.nodes {
                if !is_http_url(node) {
                    return invalid(format!("health node \"{node}\" invalid"));
                }
            }
        }

        Ok(())
    }

    /// Write a sample config, refusing to overwrite an existing file
    pub fn generate(path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        if path.exists() {
            return Err(ConfigError::AlreadyExists(path.display().to_string()));
        }

        let json = serde_json::to_string_pretty(&Self::sample())?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Every validator paired with its network
    pub fn targets(&self) -> Vec<MonitorTarget> {
        self.networks
            .iter()
            .flat_map(|network| {
                network
                    .validators
                    .iter()
                    .map(move |validator| MonitorTarget::new(network.clone(), validator.clone()))
            })
            .collect()
    }

    fn sample() -> Self {
        Self {
            networks: vec![Network {
                name: "Cosmos Hub".to_string(),
                chain_id: "cosmoshub-4".to_string(),
                rpcs: vec![
                    "https://rpc1.example.com".to_string(),
                    "https://rpc2.example.com".to_string(),
                ],
                back_check: 10,
                alert_threshold: 5,
                interval: Duration::from_secs(15 * 60),
                stall_time: Duration::from_secs(30 * 60),
                rpc_alert: true,
                reverse: false,
                validators: vec![Validator {
                    moniker: "my-validator".to_string(),
                    address: "AAAABBBBCCCCDDDD0000111122223333".to_string(),
                }],
            }],
            notifiers: Notifiers {
                telegram: Some(TelegramConfig {
                    key: "api_key".to_string(),
                    chat_id: "chat_id".to_string(),
                }),
                webhook: Some(WebhookConfig {
                    url: "https://discord.com/api/webhooks/id/token".to_string(),
                    username: "signwatch".to_string(),
                }),
                ..Notifiers::default()
            },
            health: Some(Health {
                port: Some(8080),
                token: None,
                interval: Duration::from_secs(60 * 60),
                nodes: vec!["http://192.168.1.1:8080".to_string()],
            }),
        }
    }
}

fn invalid<T>(message: impl Into<String>) -> Result<T, ConfigError> {
    Err(ConfigError::Invalid(message.into()))
}

fn is_http_url(raw: &str) -> bool {
    match reqwest::Url::parse(raw) {
        Ok(url) => matches!(url.scheme(), "http" | "https") && url.has_host(),
        Err(_) => false,
    }
}

/// Configuration errors, all fatal at startup
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config file {0} does not exist, use --init to generate one")]
    NotFound(String),

    #[error("config file already exists at {0}")]
    AlreadyExists(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("check config - {0}")]
    Invalid(String),
}
