//! The engine facade: wires the registry, aggregator, health evaluator,
//! rule engine, and delivery manager together and drives the tick loop.

use std::sync::Arc;
use std::sync::Mutex as StdMutex;
use std::time::Duration;

use tokio::sync::{broadcast, mpsc, watch, Mutex};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use linkmon_core::alert::Alert;
use linkmon_core::config::alerting::ChannelConfig;
use linkmon_core::config::EngineConfig;
use linkmon_core::events::TransportEvent;
use linkmon_core::metrics::ServiceMetricsSnapshot;
use linkmon_core::EngineResult;

use crate::alert::{RuleContext, RuleEngine};
use crate::connection::{ConnectionRegistry, ConnectionSummary};
use crate::health::{HealthEvaluator, HealthReport};
use crate::metrics::{MetricsAggregator, TelemetryExporter};
use crate::notify::{AlertSender, DeliveryManager};

/// Owns every engine component and runs the periodic aggregation tick.
///
/// Hosts construct one, wrap it in an [`Arc`], call [`start`](Self::start),
/// and feed it transport events via [`handle_event`](Self::handle_event).
/// Everything else (snapshots, health, alert history, Prometheus text)
/// is read through the accessors.
pub struct MonitorEngine {
    config: EngineConfig,
    registry: Arc<ConnectionRegistry>,
    aggregator: Arc<MetricsAggregator>,
    health: HealthEvaluator,
    rules: Mutex<RuleEngine>,
    delivery: Arc<DeliveryManager>,
    exporter: Arc<TelemetryExporter>,
    snapshot_tx: watch::Sender<Option<Arc<ServiceMetricsSnapshot>>>,
    shutdown_tx: broadcast::Sender<()>,
    // Taken once by the first start(); present only between new() and start().
    anomaly_rx: StdMutex<Option<mpsc::Receiver<Alert>>>,
}

impl std::fmt::Debug for MonitorEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MonitorEngine")
            .field("tick_interval_seconds", &self.config.telemetry.tick_interval_seconds)
            .finish()
    }
}

impl MonitorEngine {
    /// Builds the engine and its delivery channels from configuration.
    pub fn new(config: EngineConfig) -> EngineResult<Self> {
        let delivery = Arc::new(DeliveryManager::from_config(&config.alerting)?);
        Self::assemble(config, delivery)
    }

    /// Builds the engine around caller-supplied senders instead of the
    /// configured channel transports.
    pub fn with_senders(
        config: EngineConfig,
        channels: Vec<(ChannelConfig, Arc<dyn AlertSender>)>,
    ) -> EngineResult<Self> {
        let send_timeout = Duration::from_secs(config.alerting.send_timeout_seconds);
        let delivery = Arc::new(DeliveryManager::with_channels(send_timeout, channels)?);
        Self::assemble(config, delivery)
    }

    fn assemble(config: EngineConfig, delivery: Arc<DeliveryManager>) -> EngineResult<Self> {
        let (anomaly_tx, anomaly_rx) = mpsc::channel(config.telemetry.anomaly_queue_size.max(1));
        let registry = Arc::new(ConnectionRegistry::new(&config.telemetry, anomaly_tx));
        let aggregator = Arc::new(MetricsAggregator::new(&config.telemetry, Arc::clone(&registry)));
        let health = HealthEvaluator::new(config.health.clone());
        let rules = Mutex::new(RuleEngine::from_config(&config.alerting.rules)?);
        let exporter = Arc::new(TelemetryExporter::new()?);
        let (snapshot_tx, _) = watch::channel(None);
        let (shutdown_tx, _) = broadcast::channel(1);
        Ok(Self {
            config,
            registry,
            aggregator,
            health,
            rules,
            delivery,
            exporter,
            snapshot_tx,
            shutdown_tx,
            anomaly_rx: StdMutex::new(Some(anomaly_rx)),
        })
    }

    /// Spawns the aggregation tick loop and the anomaly alert pump.
    ///
    /// Calling this more than once is a logged no-op.
    pub fn start(self: &Arc<Self>) {
        let anomaly_rx = self
            .anomaly_rx
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        let Some(mut anomaly_rx) = anomaly_rx else {
            warn!("engine already started, ignoring duplicate start");
            return;
        };

        let engine = Arc::clone(self);
        let mut shutdown = self.shutdown_tx.subscribe();
        tokio::spawn(async move {
            let period =
                Duration::from_secs(engine.config.telemetry.tick_interval_seconds.max(1));
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        engine.run_tick().await;
                    }
                    _ = shutdown.recv() => {
                        info!("telemetry tick loop stopping");
                        break;
                    }
                }
            }
        });

        let engine = Arc::clone(self);
        let mut shutdown = self.shutdown_tx.subscribe();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    alert = anomaly_rx.recv() => {
                        match alert {
                            Some(alert) => {
                                engine.delivery.dispatch(&alert).await;
                            }
                            None => break,
                        }
                    }
                    _ = shutdown.recv() => {
                        info!("anomaly alert pump stopping");
                        break;
                    }
                }
            }
        });

        info!(
            tick_interval_seconds = self.config.telemetry.tick_interval_seconds,
            "engine started"
        );
    }

    /// Runs one aggregation tick: snapshot, export, health, rules, dispatch.
    ///
    /// The tick loop calls this on its cadence; tests call it directly.
    pub async fn run_tick(&self) -> Arc<ServiceMetricsSnapshot> {
        let snapshot = self.aggregator.aggregate();
        self.exporter.observe(&snapshot);
        let health = self.health.evaluate(&snapshot);

        let alerts = {
            let mut rules = self.rules.lock().await;
            let ctx = RuleContext {
                snapshot: &snapshot,
                health: &health,
            };
            rules.evaluate(&ctx, snapshot.timestamp)
        };
        for alert in &alerts {
            info!(
                alert_type = %alert.alert_type,
                severity = %alert.severity,
                message = %alert.message,
                "alert raised"
            );
            self.delivery.dispatch(alert).await;
        }

        self.snapshot_tx.send_replace(Some(Arc::clone(&snapshot)));
        debug!(
            active = snapshot.active_connections,
            verdict = %health.verdict,
            alerts = alerts.len(),
            "telemetry tick complete"
        );
        snapshot
    }

    /// Maps one transport event onto the registry.
    ///
    /// Only `Opened` can fail (duplicate id); every other event on an
    /// unknown connection is ignored by the registry.
    pub fn handle_event(&self, event: TransportEvent) -> EngineResult<()> {
        match event {
            TransportEvent::Opened {
                id,
                user_id,
                endpoint,
            } => self.registry.track(id, user_id, endpoint),
            TransportEvent::StatusChanged { id, status } => {
                self.registry.set_status(&id, status);
                Ok(())
            }
            TransportEvent::Message {
                id,
                direction,
                size_bytes,
                latency_ms,
            } => {
                self.registry.record_message(&id, direction, size_bytes, latency_ms);
                Ok(())
            }
            TransportEvent::Error {
                id,
                message,
                error_kind,
            } => {
                self.registry.record_error(&id, &message, &error_kind);
                Ok(())
            }
            TransportEvent::Reconnected { id } => {
                self.registry.record_reconnect(&id);
                Ok(())
            }
            TransportEvent::Closed { id } => {
                self.registry.remove(&id);
                Ok(())
            }
        }
    }

    /// Signals the tick loop and anomaly pump to stop. Idempotent; does not
    /// wait for in-flight sends.
    pub fn shutdown(&self) {
        info!("engine shutdown requested");
        let _ = self.shutdown_tx.send(());
    }

    /// The snapshot produced by the most recent tick, if any yet.
    pub fn latest_snapshot(&self) -> Option<Arc<ServiceMetricsSnapshot>> {
        self.snapshot_tx.borrow().clone()
    }

    /// A watch subscription that yields each new snapshot as ticks complete.
    pub fn subscribe_snapshots(&self) -> watch::Receiver<Option<Arc<ServiceMetricsSnapshot>>> {
        self.snapshot_tx.subscribe()
    }

    /// The most recent `limit` retained snapshots, oldest first.
    pub fn snapshot_history(&self, limit: usize) -> Vec<Arc<ServiceMetricsSnapshot>> {
        self.aggregator.history().recent(limit)
    }

    /// Health verdict for the most recent snapshot, if any yet.
    pub fn health_report(&self) -> Option<HealthReport> {
        self.latest_snapshot()
            .map(|snapshot| self.health.evaluate(&snapshot))
    }

    /// Point-in-time summaries of every tracked connection.
    pub fn connections(&self) -> Vec<ConnectionSummary> {
        self.registry.snapshot_all()
    }

    pub fn registry(&self) -> &ConnectionRegistry {
        &self.registry
    }

    pub fn delivery(&self) -> &DeliveryManager {
        &self.delivery
    }

    pub fn exporter(&self) -> &TelemetryExporter {
        &self.exporter
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn uptime(&self) -> Duration {
        self.aggregator.uptime()
    }
}
