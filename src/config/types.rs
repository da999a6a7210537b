//! Configuration types

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Top-level configuration file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Monitored networks, each with its own validators
    pub networks: Vec<Network>,
    /// Outbound notification channels
    pub notifiers: Notifiers,
    /// Optional health endpoint and peer polling
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub health: Option<Health>,
}

/// Chain identity and polling policy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Network {
    /// Display name, defaults to the chain ID in messages
    #[serde(default)]
    pub name: String,
    /// Chain ID every RPC endpoint must report
    pub chain_id: String,
    /// RPC endpoints, tried in random order
    pub rpcs: Vec<String>,
    /// Number of trailing blocks to inspect
    pub back_check: u32,
    /// Maximum tolerated misses in the window
    pub alert_threshold: u32,
    /// Time between checks
    #[serde(with = "duration_serde")]
    pub interval: Duration,
    /// Maximum age of the latest block, zero disables the check
    #[serde(default, with = "duration_serde")]
    pub stall_time: Duration,
    /// Raise an alert when no RPC endpoint is usable
    #[serde(default)]
    pub rpc_alert: bool,
    /// Alert when signatures are present instead of missing
    #[serde(default)]
    pub reverse: bool,
    /// Validators watched on this network
    pub validators: Vec<Validator>,
}

impl Network {
    /// Name used in rendered messages
    pub fn display_name(&self) -> &str {
        if self.name.is_empty() {
            &self.chain_id
        } else {
            &self.name
        }
    }
}

/// Validator watched for signatures
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Validator {
    pub moniker: String,
    /// Hex signer address as reported in commit signatures
    pub address: String,
}

/// Notification channel settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notifiers {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub telegram: Option<TelegramConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub webhook: Option<WebhookConfig>,
    /// Minimum time before an identical message is delivered again
    #[serde(default = "default_repeat_interval", with = "duration_serde")]
    pub repeat_interval: Duration,
}

impl Notifiers {
    /// Whether at least one channel is configured
    pub fn has_channel(&self) -> bool {
        self.telegram.is_some() || self.webhook.is_some()
    }
}

impl Default for Notifiers {
    fn default() -> Self {
        Self {
            telegram: None,
            webhook: None,
            repeat_interval: default_repeat_interval(),
        }
    }
}

fn default_repeat_interval() -> Duration {
    Duration::from_secs(15 * 60)
}

/// Telegram bot channel
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    /// Bot API key
    pub key: String,
    #[serde(default)]
    pub chat_id: String,
}

/// Webhook channel posting `{username, content}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookConfig {
    pub url: String,
    #[serde(default = "default_username")]
    pub username: String,
}

fn default_username() -> String {
    "signwatch".to_string()
}

/// Health endpoint and peer polling settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Health {
    /// Port for the local `/health` endpoint, disabled when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    /// Shared secret expected in the `x-signwatch-token` header
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    /// Time between peer health polls
    #[serde(default = "default_health_interval", with = "duration_serde")]
    pub interval: Duration,
    /// Peer monitors whose `/health` endpoints are polled
    #[serde(default)]
    pub nodes: Vec<String>,
}

fn default_health_interval() -> Duration {
    Duration::from_secs(60 * 60)
}

/// Human-readable duration strings such as `"15m"` or `"1h 30m"`
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&humantime::format_duration(*duration).to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        if raw.trim() == "0" {
            return Ok(Duration::ZERO);
        }
        humantime::parse_duration(raw.trim()).map_err(serde::de::Error::custom)
    }
}
