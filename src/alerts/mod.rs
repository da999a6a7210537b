//! Alerts and their delivery
//!
//! Monitor loops push [`Alert`]s onto one shared unbounded channel; a single
//! [`Dispatcher`] drains it and delivers to the configured channels.

pub mod alert;
pub mod dispatcher;
pub mod notifier;

use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};

pub use alert::{Alert, AlertKind};
pub use dispatcher::{Dispatcher, RepeatFilter, RetryPolicy};
pub use notifier::{Channel, ChannelKind, Deliver, Notification, Notifier, NotifierError};

/// Sending half of the shared alert channel
pub type AlertSink = UnboundedSender<Alert>;

/// Receiving half of the shared alert channel
pub type AlertStream = UnboundedReceiver<Alert>;
