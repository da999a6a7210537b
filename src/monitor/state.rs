//! Per-target alert state machine
//!
//! `alerted` is the hysteresis bit: it separates entering an alarm from
//! staying in one. It only changes inside the methods below, each of which
//! maps its explicit inputs plus the current bit to exactly one outcome.

use std::time::Duration;

use chrono::{DateTime, Utc};

use super::backcheck::BackCheck;
use super::selector::SelectError;
use super::MonitorTarget;
use crate::alerts::Alert;

/// Alarm state owned by one target's poll loop
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AlertState {
    alerted: bool,
}

impl AlertState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_alerted(&self) -> bool {
        self.alerted
    }

    /// No endpoint could be selected this cycle
    pub fn on_endpoint_failure(&mut self, target: &MonitorTarget, error: &SelectError) -> Alert {
        self.endpoint_failure(target, error).for_target(target.name())
    }

    fn endpoint_failure(&mut self, target: &MonitorTarget, error: &SelectError) -> Alert {
        let network = target.network.display_name();
        if !target.network.rpc_alert {
            return Alert::none(format!("rpc check failed on {network}: {error}"));
        }
        if self.alerted {
            return Alert::none(format!("repeat alert suppressed - no rpc on {network}"));
        }
        self.alerted = true;
        Alert::no_rpc(network)
    }

    /// Raise a stall alert if the latest block is older than the network allows
    pub fn on_stall_check(
        &mut self,
        target: &MonitorTarget,
        latest_time: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Option<Alert> {
        let stall_time = target.network.stall_time;
        if stall_time.is_zero() {
            return None;
        }

        let age = (now - latest_time).to_std().unwrap_or(Duration::ZERO);
        if age <= stall_time {
            return None;
        }

        self.alerted = true;
        Some(Alert::stalled(latest_time, target.network.display_name()).for_target(target.name()))
    }

    /// Decide the outcome of a back-check pass against `url`
    pub fn on_back_check(&mut self, target: &MonitorTarget, url: &str, result: &BackCheck) -> Alert {
        self.back_check(target, url, result).for_target(target.name())
    }

    fn back_check(&mut self, target: &MonitorTarget, url: &str, result: &BackCheck) -> Alert {
        let network = &target.network;
        let name = network.display_name();
        let moniker = &target.validator.moniker;
        let BackCheck {
            signed,
            rpc_errors,
            effective_window,
        } = *result;

        let exhausted = rpc_errors > effective_window || effective_window == 0;
        if exhausted && network.rpc_alert {
            if self.alerted {
                return Alert::none(format!("repeat alert suppressed - rpc down on {name}"));
            }
            self.alerted = true;
            return Alert::rpc_down(url, name);
        }
        if effective_window == 0 {
            return Alert::none(format!(
                "no blocks could be fetched on {name} for {moniker}, state unchanged"
            ));
        }

        if network.reverse {
            return if signed > 1 {
                Alert::signed(signed, effective_window, moniker, name)
            } else {
                Alert::none(format!(
                    "found {signed} of {effective_window} signed on {name} for {moniker}"
                ))
            };
        }

        if result.missed() > network.alert_threshold {
            self.alerted = true;
            Alert::missed(result.missed(), effective_window, moniker, name)
        } else if self.alerted {
            self.alerted = false;
            Alert::cleared(signed, effective_window, moniker, name)
        } else {
            Alert::none(format!(
                "found {signed} of {effective_window} signed on {name} for {moniker}"
            ))
        }
    }
}
