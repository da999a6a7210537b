//! Notification channels and HTTP delivery

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;

use super::alert::Alert;
use crate::config::Notifiers;

/// Per-request timeout for notification posts
pub const DELIVERY_TIMEOUT: Duration = Duration::from_secs(10);

const TELEGRAM_API: &str = "https://api.telegram.org";

/// Kind of outbound channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelKind {
    Telegram,
    Webhook,
}

impl std::fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChannelKind::Telegram => f.write_str("telegram"),
            ChannelKind::Webhook => f.write_str("webhook"),
        }
    }
}

/// A configured destination
#[derive(Debug, Clone)]
pub enum Channel {
    Telegram { endpoint: String, chat_id: String },
    Webhook { url: String, username: String },
}

impl Channel {
    /// Build the channel list from config, telegram first
    pub fn from_config(config: &Notifiers) -> Vec<Channel> {
        let mut channels = Vec::new();
        if let Some(telegram) = &config.telegram {
            channels.push(Channel::Telegram {
                endpoint: format!("{}/bot{}/sendMessage", TELEGRAM_API, telegram.key),
                chat_id: telegram.chat_id.clone(),
            });
        }
        if let Some(webhook) = &config.webhook {
            channels.push(Channel::Webhook {
                url: webhook.url.clone(),
                username: webhook.username.clone(),
            });
        }
        channels
    }

    /// Render an alert for this channel
    pub fn notification(&self, alert: &Alert) -> Notification {
        match self {
            Channel::Telegram { endpoint, chat_id } => Notification {
                channel: ChannelKind::Telegram,
                destination: endpoint.clone(),
                payload: serde_json::json!({
                    "chat_id": chat_id,
                    "text": alert.message,
                }),
            },
            Channel::Webhook { url, username } => Notification {
                channel: ChannelKind::Webhook,
                destination: url.clone(),
                payload: serde_json::json!({
                    "username": username,
                    "content": alert.message,
                }),
            },
        }
    }
}

/// One alert rendered for one channel
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub channel: ChannelKind,
    /// URL the payload is posted to; may embed a bot key, never log it
    pub destination: String,
    pub payload: serde_json::Value,
}

/// Delivers a single notification attempt
#[async_trait]
pub trait Deliver: Send + Sync {
    async fn deliver(&self, notification: &Notification) -> Result<(), NotifierError>;
}

/// HTTP notifier posting JSON payloads
#[derive(Debug, Clone)]
pub struct Notifier {
    client: reqwest::Client,
}

impl Notifier {
    pub fn new() -> Result<Self, NotifierError> {
        let client = reqwest::Client::builder()
            .timeout(DELIVERY_TIMEOUT)
            .build()
            .map_err(|e| NotifierError::Transport(e.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Deliver for Notifier {
    async fn deliver(&self, notification: &Notification) -> Result<(), NotifierError> {
        let response = self
            .client
            .post(&notification.destination)
            .json(&notification.payload)
            .send()
            .await
            .map_err(|e| NotifierError::Transport(e.without_url().to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(NotifierError::Status(status.as_u16()));
        }

        tracing::debug!(channel = %notification.channel, "Notification sent");
        Ok(())
    }
}

/// Delivery errors
#[derive(Debug, thiserror::Error)]
pub enum NotifierError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Channel returned status {0}")]
    Status(u16),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{TelegramConfig, WebhookConfig};
    use axum::{http::StatusCode, routing::post, Json, Router};
    use std::sync::Arc;
    use tokio::net::TcpListener;

    fn notifiers() -> Notifiers {
        Notifiers {
            telegram: Some(TelegramConfig {
                key: "123:abc".to_string(),
                chat_id: "-100".to_string(),
            }),
            webhook: Some(WebhookConfig {
                url: "https://hooks.example.com/x".to_string(),
                username: "watcher".to_string(),
            }),
            ..Notifiers::default()
        }
    }

    #[test]
    fn test_payload_shapes() {
        let alert = Alert::no_rpc("osmosis-1");
        let channels = Channel::from_config(&notifiers());
        assert_eq!(channels.len(), 2);

        let telegram = channels[0].notification(&alert);
        assert_eq!(telegram.channel, ChannelKind::Telegram);
        assert_eq!(
            telegram.destination,
            "https://api.telegram.org/bot123:abc/sendMessage"
        );
        assert_eq!(telegram.payload["chat_id"], "-100");
        assert_eq!(telegram.payload["text"], alert.message);

        let webhook = channels[1].notification(&alert);
        assert_eq!(webhook.destination, "https://hooks.example.com/x");
        assert_eq!(webhook.payload["username"], "watcher");
        assert_eq!(webhook.payload["content"], alert.message);
    }

    #[test]
    fn test_single_channel() {
        let mut config = notifiers();
        config.telegram = None;
        let channels = Channel::from_config(&config);
        assert_eq!(channels.len(), 1);
        let notification = channels[0].notification(&Alert::no_rpc("osmosis-1"));
        assert_eq!(notification.channel, ChannelKind::Webhook);
    }

    #[tokio::test]
    async fn test_deliver_status_handling() {
        let received = Arc::new(parking_lot::Mutex::new(Vec::<serde_json::Value>::new()));
        let sink = Arc::clone(&received);
        let app = Router::new()
            .route(
                "/ok",
                post(move |Json(body): Json<serde_json::Value>| {
                    let sink = Arc::clone(&sink);
                    async move {
                        sink.lock().push(body);
                        StatusCode::NO_CONTENT
                    }
                }),
            )
            .route("/fail", post(|| async { StatusCode::TOO_MANY_REQUESTS }));
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let notifier = Notifier::new().unwrap();
        let ok = Notification {
            channel: ChannelKind::Webhook,
            destination: format!("http://{}/ok", addr),
            payload: serde_json::json!({"username": "u", "content": "c"}),
        };
        notifier.deliver(&ok).await.unwrap();
        assert_eq!(received.lock()[0]["content"], "c");

        let fail = Notification {
            destination: format!("http://{}/fail", addr),
            ..ok
        };
        assert!(matches!(
            notifier.deliver(&fail).await,
            Err(NotifierError::Status(429))
        ));
    }
}
