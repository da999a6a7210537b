//! Signwatch: validator liveness watchdog
//!
//! Polls CometBFT RPC endpoints, checks whether each configured validator
//! signed the recent blocks, and alerts through chat and webhook channels
//! when signing degrades, the chain stalls, or RPC nodes become unusable.
//!
//! # Features
//!
//! - **Endpoint failover**: random selection without replacement across RPCs
//! - **Back-checks**: trailing window of blocks, tolerant of partial RPC failures
//! - **Hysteresis**: one alert on entering an alarm, one on clearing it
//! - **Reverse mode**: alert when a node that should stay silent signs
//! - **Stall detection**: alert when the latest block gets too old
//! - **Delivery**: per-channel retries with exponential backoff, repeat suppression
//! - **Health endpoint**: `/health` for this monitor, polling of peer monitors
//!
//! # Example
//!
//! ```no_run
//! use signwatch::config::Config;
//! use signwatch::monitor::run_monitor;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::load("config.json")?;
//! run_monitor(config).await?;
//! # Ok(())
//! # }
//! ```

pub mod alerts;
pub mod api;
pub mod config;
pub mod monitor;
pub mod rpc;

// Re-export commonly used types
pub use alerts::{Alert, AlertKind};
pub use config::{Config, ConfigError};
pub use monitor::{run_monitor, MonitorTarget};
