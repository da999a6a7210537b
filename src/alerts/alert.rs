//! Alert values produced by the monitor

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// What an alert reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    /// Nothing to deliver, logged locally
    None,
    Cleared,
    RpcError,
    Missed,
    Stalled,
    Signed,
    Health,
    Unknown,
}

impl AlertKind {
    /// Whether alerts of this kind go out to notification channels
    pub fn is_deliverable(self) -> bool {
        self != AlertKind::None
    }
}

impl fmt::Display for AlertKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AlertKind::None => "none",
            AlertKind::Cleared => "cleared",
            AlertKind::RpcError => "rpc_error",
            AlertKind::Missed => "missed",
            AlertKind::Stalled => "stalled",
            AlertKind::Signed => "signed",
            AlertKind::Health => "health",
            AlertKind::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

/// Immutable alert with its rendered message
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Alert {
    pub kind: AlertKind,
    pub message: String,
    /// Monitor target the alert is about, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
}

impl Alert {
    pub fn new(kind: AlertKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            target: None,
        }
    }

    /// Attribute the alert to a monitor target
    pub fn for_target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    /// Whether the alert ends an alarm rather than raising or repeating one
    pub fn is_resolution(&self) -> bool {
        self.kind == AlertKind::Cleared
    }

    /// Informational message, never delivered
    pub fn none(message: impl Into<String>) -> Self {
        Self::new(AlertKind::None, message)
    }

    pub fn missed(missed: u32, window: u32, moniker: &str, network: &str) -> Self {
        Self::new(
            AlertKind::Missed,
            format!("❌ missed {missed} of last {window} blocks for {moniker} on {network}"),
        )
    }

    pub fn cleared(signed: u32, window: u32, moniker: &str, network: &str) -> Self {
        Self::new(
            AlertKind::Cleared,
            format!(
                "😮‍💨 alert resolved, found {signed} of {window} signed blocks for {moniker} on {network}"
            ),
        )
    }

    pub fn signed(signed: u32, window: u32, moniker: &str, network: &str) -> Self {
        Self::new(
            AlertKind::Signed,
            format!("✅ found {signed} of {window} signed blocks for {moniker} on {network}"),
        )
    }

    /// No endpoint of the network could be used
    pub fn no_rpc(network: &str) -> Self {
        Self::new(
            AlertKind::RpcError,
            format!("📡 no rpcs available for {network}"),
        )
    }

    /// The selected endpoint failed too often during a back-check
    pub fn rpc_down(url: &str, network: &str) -> Self {
        Self::new(
            AlertKind::RpcError,
            format!("📡 rpc {url} is down or malfunctioning for {network}"),
        )
    }

    pub fn stalled(block_time: DateTime<Utc>, network: &str) -> Self {
        Self::new(
            AlertKind::Stalled,
            format!(
                "⏰ warning - last block found for {network} was {}",
                block_time.to_rfc2822()
            ),
        )
    }

    pub fn healthy(address: &str, next_check: Duration) -> Self {
        Self::new(
            AlertKind::Health,
            format!(
                "🤝 signwatch at {address} healthy, next check at {}",
                next_check_at(next_check)
            ),
        )
    }

    pub fn unhealthy(address: &str, next_check: Duration) -> Self {
        Self::new(
            AlertKind::Health,
            format!(
                "🤢 signwatch at {address} unhealthy, next check at {}",
                next_check_at(next_check)
            ),
        )
    }

    pub fn unknown(message: impl Into<String>) -> Self {
        Self::new(AlertKind::Unknown, message)
    }
}

impl fmt::Display for Alert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.kind, self.message)
    }
}

fn next_check_at(interval: Duration) -> String {
    let next = chrono::Duration::from_std(interval)
        .ok()
        .and_then(|d| Utc::now().checked_add_signed(d))
        .unwrap_or_else(Utc::now);
    next.to_rfc3339_opts(chrono::SecondsFormat::Secs, true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missed_message() {
        let alert = Alert::missed(7, 10, "VALIDATOR", "cosmoshub-4");
        assert_eq!(alert.kind, AlertKind::Missed);
        assert!(alert.message.contains("missed 7 of last 10 blocks for VALIDATOR"));
    }

    #[test]
    fn test_only_none_is_silent() {
        assert!(!AlertKind::None.is_deliverable());
        assert!(AlertKind::Cleared.is_deliverable());
        assert!(AlertKind::Health.is_deliverable());
        assert!(AlertKind::Unknown.is_deliverable());
    }

    #[test]
    fn test_for_target() {
        let alert = Alert::cleared(10, 10, "val", "chain-1").for_target("val@chain-1");
        assert_eq!(alert.target.as_deref(), Some("val@chain-1"));
        assert!(alert.is_resolution());
        assert!(!Alert::no_rpc("chain-1").is_resolution());
        assert!(Alert::no_rpc("chain-1").target.is_none());
    }

    #[test]
    fn test_stalled_message_is_stable() {
        let time = DateTime::parse_from_rfc3339("2024-05-01T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(Alert::stalled(time, "osmosis-1"), Alert::stalled(time, "osmosis-1"));
    }
}
