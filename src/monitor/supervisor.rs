//! Poll loop supervision and process wiring

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio::time::sleep;

use super::backcheck::back_check;
use super::peers::PeerChecker;
use super::selector::select;
use super::state::AlertState;
use super::MonitorTarget;
use crate::alerts::{Alert, AlertSink, Dispatcher, Notifier};
use crate::api::{run_server, HealthState};
use crate::config::Config;
use crate::rpc::{ChainRpc, RpcClient};

/// Re-check interval while a target is alarmed
pub const ALERTED_INTERVAL: Duration = Duration::from_secs(2 * 60);

/// Pause before restarting a loop that panicked
const RESTART_DELAY: Duration = Duration::from_secs(5);

/// Poll loop for a single target, owning its alert state
pub struct TargetMonitor {
    target: MonitorTarget,
    rpc: Arc<dyn ChainRpc>,
    health: HealthState,
    state: AlertState,
}

impl TargetMonitor {
    pub fn new(target: MonitorTarget, rpc: Arc<dyn ChainRpc>, health: HealthState) -> Self {
        Self {
            target,
            rpc,
            health,
            state: AlertState::new(),
        }
    }

    pub fn is_alerted(&self) -> bool {
        self.state.is_alerted()
    }

    /// Run one check cycle, returning the alerts it produced in order
    pub async fn check(&mut self) -> Vec<Alert> {
        let network = &self.target.network;

        let selection = match select(self.rpc.as_ref(), &network.chain_id, &network.rpcs).await {
            Ok(selection) => selection,
            Err(e) => return vec![self.state.on_endpoint_failure(&self.target, &e)],
        };

        tracing::debug!(
            chain_id = %network.chain_id,
            url = %selection.url,
            height = selection.latest.height,
            block_time = %selection.latest.time,
            "Selected endpoint"
        );

        let mut alerts = Vec::with_capacity(2);
        if let Some(alert) =
            self.state
                .on_stall_check(&self.target, selection.latest.time, chrono::Utc::now())
        {
            alerts.push(alert);
        }

        let result = back_check(
            self.rpc.as_ref(),
            &selection.url,
            &self.target.validator.address,
            selection.latest.height,
            network.back_check,
        )
        .await;
        alerts.push(
            self.state
                .on_back_check(&self.target, &selection.url, &result),
        );

        alerts
    }

    /// Sleep before the next cycle, shortened while alarmed
    pub fn next_interval(&self) -> Duration {
        let interval = self.target.network.interval;
        if self.state.is_alerted() {
            interval.min(ALERTED_INTERVAL)
        } else {
            interval
        }
    }

    /// Loop until the alert channel closes
    pub async fn run(mut self, sink: AlertSink) {
        let name = self.target.name();
        tracing::info!(monitor = %name, "Monitor started");
        if sink
            .send(Alert::none(format!("monitoring {}", name)))
            .is_err()
        {
            return;
        }

        loop {
            for alert in self.check().await {
                if sink.send(alert).is_err() {
                    tracing::info!(monitor = %name, "Alert channel closed, monitor stopping");
                    return;
                }
            }
            self.health.record(&name, self.state.is_alerted());

            sleep(self.next_interval()).await;
        }
    }
}

/// Owns every poll loop and restarts loops that panic
pub struct Supervisor {
    targets: Vec<MonitorTarget>,
    rpc: Arc<dyn ChainRpc>,
    sink: AlertSink,
    health: HealthState,
}

impl Supervisor {
    pub fn new(
        targets: Vec<MonitorTarget>,
        rpc: Arc<dyn ChainRpc>,
        sink: AlertSink,
        health: HealthState,
    ) -> Self {
        Self {
            targets,
            rpc,
            sink,
            health,
        }
    }

    /// Run all loops; returns once every loop has stopped
    pub async fn run(self) {
        let mut loops = JoinSet::new();
        for target in self.targets {
            loops.spawn(supervise(
                target,
                Arc::clone(&self.rpc),
                self.sink.clone(),
                self.health.clone(),
            ));
        }
        drop(self.sink);

        while let Some(result) = loops.join_next().await {
            if let Err(e) = result {
                tracing::error!(error = %e, "Supervisor task failed");
            }
        }
    }
}

async fn supervise(
    target: MonitorTarget,
    rpc: Arc<dyn ChainRpc>,
    sink: AlertSink,
    health: HealthState,
) {
    loop {
        let monitor = TargetMonitor::new(target.clone(), Arc::clone(&rpc), health.clone());
        match tokio::spawn(monitor.run(sink.clone())).await {
            Ok(()) => return,
            Err(e) if e.is_panic() => {
                tracing::error!(monitor = %target.name(), "Monitor panicked, restarting");
                let alert = Alert::unknown(format!(
                    "⚠️ monitor for {} stopped unexpectedly, restarting",
                    target.name()
                ));
                if sink.send(alert).is_err() {
                    return;
                }
                sleep(RESTART_DELAY).await;
            }
            Err(_) => return,
        }
    }
}

/// Start the dispatcher, health subsystem and every poll loop
pub async fn run_monitor(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let rpc: Arc<dyn ChainRpc> = Arc::new(RpcClient::new()?);
    let notifier = Arc::new(Notifier::new()?);
    let (sink, stream) = mpsc::unbounded_channel();
    let health = HealthState::new();

    let dispatcher = Dispatcher::new(&config.notifiers, notifier);
    let dispatcher_handle = tokio::spawn(dispatcher.run(stream));

    let mut background = JoinSet::new();
    if let Some(health_config) = &config.health {
        if let Some(port) = health_config.port {
            let state = health.clone();
            let token = health_config.token.clone();
            background.spawn(async move {
                if let Err(e) = run_server(port, state, token).await {
                    tracing::error!(error = %e, "Health server stopped");
                }
            });
        }
        if !health_config.nodes.is_empty() {
            let peers = PeerChecker::new(health_config)?;
            background.spawn(peers.run(sink.clone()));
        }
    }

    let targets = config.targets();
    tracing::info!(targets = targets.len(), "Starting monitors");
    for target in &targets {
        tracing::info!(
            "  {} every {} ({} blocks, threshold {})",
            target.name(),
            humantime::format_duration(target.network.interval),
            target.network.back_check,
            target.network.alert_threshold
        );
    }

    let supervisor = Supervisor::new(targets, rpc, sink, health);

    tokio::select! {
        _ = supervisor.run() => {
            tracing::warn!("All monitors stopped");
        }
        result = tokio::signal::ctrl_c() => {
            result?;
            tracing::info!("Shutdown signal received");
        }
    }

    background.abort_all();
    dispatcher_handle.abort();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alerts::AlertKind;
    use crate::config::{Network, Validator};
    use crate::monitor::testing::ScriptedRpc;
    use crate::rpc::{BlockSample, RpcError};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, Ordering};

    const ADDR: &str = "VALADDR";

    fn target(stall_time: Duration) -> MonitorTarget {
        MonitorTarget::new(
            Network {
                name: String::new(),
                chain_id: "chain-1".to_string(),
                rpcs: vec!["http://rpc0".to_string(), "http://rpc1".to_string()],
                back_check: 10,
                alert_threshold: 5,
                interval: Duration::from_secs(15 * 60),
                stall_time,
                rpc_alert: true,
                reverse: false,
                validators: vec![],
            },
            Validator {
                moniker: "val".to_string(),
                address: ADDR.to_string(),
            },
        )
    }

    fn monitor(rpc: ScriptedRpc, stall_time: Duration) -> TargetMonitor {
        TargetMonitor::new(target(stall_time), Arc::new(rpc), HealthState::new())
    }

    fn kinds(alerts: &[Alert]) -> Vec<AlertKind> {
        alerts.iter().map(|a| a.kind).collect()
    }

    #[tokio::test]
    async fn test_healthy_cycle() {
        let rpc = ScriptedRpc::new("chain-1", 100).signing(ADDR, 1..=100);
        let mut monitor = monitor(rpc, Duration::ZERO);

        let alerts = monitor.check().await;
        assert_eq!(kinds(&alerts), vec![AlertKind::None]);
        assert_eq!(monitor.next_interval(), Duration::from_secs(15 * 60));
    }

    #[tokio::test]
    async fn test_miss_then_recover() {
        let rpc = ScriptedRpc::new("chain-1", 100).signing(ADDR, 98..=100);
        let mut monitor = monitor(rpc, Duration::ZERO);

        let alerts = monitor.check().await;
        assert_eq!(kinds(&alerts), vec![AlertKind::Missed]);
        assert!(monitor.is_alerted());
        assert_eq!(monitor.next_interval(), ALERTED_INTERVAL);

        monitor.rpc = Arc::new(ScriptedRpc::new("chain-1", 110).signing(ADDR, 1..=110));
        let alerts = monitor.check().await;
        assert_eq!(kinds(&alerts), vec![AlertKind::Cleared]);
        assert!(!monitor.is_alerted());
    }

    #[tokio::test]
    async fn test_stall_alongside_back_check() {
        let old = chrono::Utc::now() - chrono::Duration::minutes(45);
        let rpc = ScriptedRpc::new("chain-1", 100)
            .signing(ADDR, 98..=100)
            .with_head_time(old);
        let mut monitor = monitor(rpc, Duration::from_secs(30 * 60));

        let alerts = monitor.check().await;
        assert_eq!(kinds(&alerts), vec![AlertKind::Stalled, AlertKind::Missed]);
    }

    #[tokio::test]
    async fn test_stall_with_signed_window() {
        let old = chrono::Utc::now() - chrono::Duration::minutes(45);
        let rpc = ScriptedRpc::new("chain-1", 100)
            .signing(ADDR, 1..=100)
            .with_head_time(old);
        let mut monitor = monitor(rpc, Duration::from_secs(30 * 60));

        let alerts = monitor.check().await;
        assert_eq!(kinds(&alerts), vec![AlertKind::Stalled, AlertKind::Cleared]);
        assert!(!monitor.is_alerted());
        assert_eq!(monitor.next_interval(), monitor.target.network.interval);
    }

    #[tokio::test]
    async fn test_no_endpoints_alerts_once() {
        let rpc = ScriptedRpc::new("chain-1", 100)
            .with_down("http://rpc0")
            .with_down("http://rpc1");
        let mut monitor = monitor(rpc, Duration::ZERO);

        assert_eq!(kinds(&monitor.check().await), vec![AlertKind::RpcError]);
        assert_eq!(kinds(&monitor.check().await), vec![AlertKind::None]);
    }

    #[tokio::test]
    async fn test_short_interval_never_lengthened() {
        let rpc = ScriptedRpc::new("chain-1", 100);
        let mut monitor = monitor(rpc, Duration::ZERO);
        monitor.target.network.interval = Duration::from_secs(30);

        monitor.check().await;
        assert!(monitor.is_alerted());
        assert_eq!(monitor.next_interval(), Duration::from_secs(30));
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_publishes_alerts_and_health() {
        let rpc = ScriptedRpc::new("chain-1", 100).signing(ADDR, 1..=100);
        let health = HealthState::new();
        let monitor = TargetMonitor::new(target(Duration::ZERO), Arc::new(rpc), health.clone());
        let (sink, mut stream) = mpsc::unbounded_channel();

        let handle = tokio::spawn(monitor.run(sink));

        let started = stream.recv().await.unwrap();
        assert!(started.message.contains("val@chain-1"));
        let first = stream.recv().await.unwrap();
        assert_eq!(first.kind, AlertKind::None);
        assert!(first.message.contains("found 10 of 10"));

        let second = stream.recv().await.unwrap();
        assert_eq!(second.kind, AlertKind::None);
        assert!(health.is_healthy());

        drop(stream);
        handle.await.unwrap();
    }

    /// Panics on its first call, then behaves like the wrapped chain
    struct PanicOnce {
        inner: ScriptedRpc,
        panicked: AtomicBool,
    }

    #[async_trait]
    impl ChainRpc for PanicOnce {
        async fn latest_block(&self, url: &str) -> Result<BlockSample, RpcError> {
            if !self.panicked.swap(true, Ordering::SeqCst) {
                panic!("scripted failure");
            }
            self.inner.latest_block(url).await
        }

        async fn block_at(&self, url: &str, height: u64) -> Result<BlockSample, RpcError> {
            self.inner.block_at(url, height).await
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_supervisor_restarts_panicked_loop() {
        let rpc = PanicOnce {
            inner: ScriptedRpc::new("chain-1", 100).signing(ADDR, 1..=100),
            panicked: AtomicBool::new(false),
        };
        let (sink, mut stream) = mpsc::unbounded_channel();
        let supervisor = Supervisor::new(
            vec![target(Duration::ZERO)],
            Arc::new(rpc),
            sink,
            HealthState::new(),
        );
        let handle = tokio::spawn(supervisor.run());

        let mut seen = Vec::new();
        for _ in 0..4 {
            seen.push(stream.recv().await.unwrap().kind);
        }
        assert_eq!(
            seen,
            vec![
                AlertKind::None,
                AlertKind::Unknown,
                AlertKind::None,
                AlertKind::None
            ]
        );

        drop(stream);
        handle.await.unwrap();
    }
}
