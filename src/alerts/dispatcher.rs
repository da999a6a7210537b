//! Alert dispatcher
//!
//! Drains the shared alert channel, drops repeats of a message inside the
//! repeat window and fans each remaining alert out to every configured
//! channel. Every notification is delivered in its own task with exponential
//! backoff, so one slow channel never holds up the others or the next alert.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{sleep, Instant};

use super::alert::Alert;
use super::notifier::{Channel, Deliver, Notification};
use super::AlertStream;
use crate::config::Notifiers;

/// Delivery attempts per notification
pub const MAX_ATTEMPTS: u32 = 5;

/// Delay after the first failed attempt, doubled after each further failure
pub const INITIAL_BACKOFF: Duration = Duration::from_secs(1);

/// Retry policy for a single notification
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_backoff: Duration,
}

impl RetryPolicy {
    /// Delay before the attempt following `failed_attempt` (zero based)
    pub fn backoff(&self, failed_attempt: u32) -> Duration {
        self.initial_backoff
            .saturating_mul(2u32.saturating_pow(failed_attempt))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: MAX_ATTEMPTS,
            initial_backoff: INITIAL_BACKOFF,
        }
    }
}

/// Suppresses identical messages inside a time window
///
/// A target flipping between raised and resolved forgets that target's
/// recorded messages, so alarm transitions are never swallowed.
#[derive(Debug)]
pub struct RepeatFilter {
    window: Duration,
    last_sent: HashMap<String, Sent>,
    raised: HashMap<String, bool>,
}

#[derive(Debug)]
struct Sent {
    target: Option<String>,
    at: Instant,
}

impl RepeatFilter {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last_sent: HashMap::new(),
            raised: HashMap::new(),
        }
    }

    /// Returns true and records the message if it was not admitted within the window
    pub fn admit(&mut self, alert: &Alert, now: Instant) -> bool {
        let window = self.window;
        self.last_sent
            .retain(|_, sent| now.saturating_duration_since(sent.at) < window);

        if let Some(target) = &alert.target {
            let raised = !alert.is_resolution();
            let previous = self.raised.insert(target.clone(), raised);
            if previous.is_some_and(|was_raised| was_raised != raised) {
                self.last_sent
                    .retain(|_, sent| sent.target.as_deref() != Some(target.as_str()));
            }
        }

        if self.last_sent.contains_key(&alert.message) {
            return false;
        }
        self.last_sent.insert(
            alert.message.clone(),
            Sent {
                target: alert.target.clone(),
                at: now,
            },
        );
        true
    }

    /// Forget `message` if it is still the entry admitted at `at`
    pub fn release(&mut self, message: &str, at: Instant) {
        if self
            .last_sent
            .get(message)
            .is_some_and(|sent| sent.at == at)
        {
            self.last_sent.remove(message);
        }
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.last_sent.len()
    }
}

/// Delivery outcome shared by the tasks of one alert
struct Pending {
    remaining: AtomicUsize,
    delivered: AtomicBool,
}

/// Consumer of the shared alert channel
pub struct Dispatcher {
    channels: Vec<Channel>,
    deliverer: Arc<dyn Deliver>,
    retry: RetryPolicy,
    repeats: Arc<Mutex<RepeatFilter>>,
}

impl Dispatcher {
    pub fn new(config: &Notifiers, deliverer: Arc<dyn Deliver>) -> Self {
        Self {
            channels: Channel::from_config(config),
            deliverer,
            retry: RetryPolicy::default(),
            repeats: Arc::new(Mutex::new(RepeatFilter::new(config.repeat_interval))),
        }
    }

    /// Set the retry policy
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Run until every alert sender is dropped
    pub async fn run(mut self, mut stream: AlertStream) {
        tracing::info!(channels = self.channels.len(), "Alert dispatcher started");

        while let Some(alert) = stream.recv().await {
            self.dispatch(alert);
        }

        tracing::info!("Alert channel closed, dispatcher stopping");
    }

    /// Handle one alert, returning the spawned delivery tasks
    ///
    /// If no channel accepts the alert, it is released from the repeat
    /// filter so the next identical alert is tried again.
    pub fn dispatch(&mut self, alert: Alert) -> Vec<JoinHandle<bool>> {
        if !alert.kind.is_deliverable() {
            tracing::info!("{}", alert.message);
            return Vec::new();
        }

        let admitted_at = Instant::now();
        if !self.repeats.lock().admit(&alert, admitted_at) {
            tracing::info!(kind = %alert.kind, "Repeat alert suppressed: {}", alert.message);
            return Vec::new();
        }

        tracing::info!(kind = %alert.kind, "Dispatching alert: {}", alert.message);

        let pending = Arc::new(Pending {
            remaining: AtomicUsize::new(self.channels.len()),
            delivered: AtomicBool::new(false),
        });
        self.channels
            .iter()
            .map(|channel| {
                let notification = channel.notification(&alert);
                let deliverer = Arc::clone(&self.deliverer);
                let repeats = Arc::clone(&self.repeats);
                let pending = Arc::clone(&pending);
                let message = alert.message.clone();
                let retry = self.retry;
                tokio::spawn(async move {
                    let delivered =
                        deliver_with_retry(deliverer.as_ref(), &notification, retry).await;
                    if delivered {
                        pending.delivered.store(true, Ordering::SeqCst);
                    }
                    if pending.remaining.fetch_sub(1, Ordering::SeqCst) == 1
                        && !pending.delivered.load(Ordering::SeqCst)
                    {
                        tracing::warn!("No channel accepted alert, allowing a resend: {}", message);
                        repeats.lock().release(&message, admitted_at);
                    }
                    delivered
                })
            })
            .collect()
    }
}

/// Attempt delivery until success or the policy is exhausted
pub async fn deliver_with_retry(
    deliverer: &dyn Deliver,
    notification: &Notification,
    retry: RetryPolicy,
) -> bool {
    for attempt in 0..retry.max_attempts {
        match deliverer.deliver(notification).await {
            Ok(()) => {
                tracing::info!(
                    channel = %notification.channel,
                    attempt = attempt + 1,
                    "Alert delivered"
                );
                return true;
            }
            Err(e) if attempt + 1 < retry.max_attempts => {
                let delay = retry.backoff(attempt);
                tracing::warn!(
                    channel = %notification.channel,
                    error = %e,
                    "Delivery failed, retrying in {:?}",
                    delay
                );
                sleep(delay).await;
            }
            Err(e) => {
                tracing::error!(
                    channel = %notification.channel,
                    error = %e,
                    attempts = retry.max_attempts,
                    "Delivery failed, dropping notification"
                );
            }
        }
    }
    false
}
