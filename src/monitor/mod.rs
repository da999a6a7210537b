//! Validator liveness monitoring
//!
//! One poll loop per [`MonitorTarget`]: select an endpoint, check for a
//! stalled chain, back-check the validator's signatures, and hand the
//! resulting alerts to the dispatcher.

pub mod backcheck;
pub mod peers;
pub mod selector;
pub mod state;
pub mod supervisor;

#[cfg(test)]
pub(crate) mod testing;

pub use backcheck::{back_check, BackCheck};
pub use peers::PeerChecker;
pub use selector::{select, SelectError, Selection};
pub use state::AlertState;
pub use supervisor::{run_monitor, Supervisor, TargetMonitor};

use crate::config::{Network, Validator};

/// One validator on one network
#[derive(Debug, Clone)]
pub struct MonitorTarget {
    pub network: Network,
    pub validator: Validator,
}

impl MonitorTarget {
    pub fn new(network: Network, validator: Validator) -> Self {
        Self { network, validator }
    }

    /// Name used in logs and the health endpoint
    pub fn name(&self) -> String {
        format!("{}@{}", self.validator.moniker, self.network.chain_id)
    }
}
