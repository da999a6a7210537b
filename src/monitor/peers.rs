//! Polling of peer monitors' health endpoints

use std::time::Duration;

use tokio::time::sleep;

use crate::alerts::{Alert, AlertSink};
use crate::api::TOKEN_HEADER;
use crate::config::Health;

/// Per-request timeout for peer health checks
const PEER_TIMEOUT: Duration = Duration::from_secs(5);

/// Periodically checks other monitors and reports their health
pub struct PeerChecker {
    http_client: reqwest::Client,
    nodes: Vec<String>,
    token: Option<String>,
    interval: Duration,
}

impl PeerChecker {
    pub fn new(config: &Health) -> Result<Self, reqwest::Error> {
        let http_client = reqwest::Client::builder().timeout(PEER_TIMEOUT).build()?;
        Ok(Self {
            http_client,
            nodes: config.nodes.clone(),
            token: config.token.clone(),
            interval: config.interval,
        })
    }

    /// Check one peer's `/health`
    pub async fn check_peer(&self, node: &str) -> Alert {
        let url = format!("{}/health", node.trim_end_matches('/'));
        let mut request = self.http_client.get(&url);
        if let Some(token) = &self.token {
            request = request.header(TOKEN_HEADER, token);
        }

        match request.send().await {
            Ok(response) if response.status().is_success() => Alert::healthy(node, self.interval),
            Ok(response) => {
                tracing::warn!(node = %node, status = %response.status(), "Peer health check failed");
                Alert::unhealthy(node, self.interval)
            }
            Err(e) => {
                tracing::warn!(node = %node, error = %e, "Peer health check failed");
                Alert::unhealthy(node, self.interval)
            }
        }
    }

    /// Check all peers concurrently
    pub async fn check_all(&self) -> Vec<Alert> {
        let futures: Vec<_> = self.nodes.iter().map(|node| self.check_peer(node)).collect();
        futures::future::join_all(futures).await
    }

    /// Report every interval until the alert channel closes
    pub async fn run(self, sink: AlertSink) {
        tracing::info!(
            peers = self.nodes.len(),
            "Peer health checks every {}",
            humantime::format_duration(self.interval)
        );

        loop {
            for alert in self.check_all().await {
                if sink.send(alert).is_err() {
                    return;
                }
            }
            sleep(self.interval).await;
        }
    }
}
