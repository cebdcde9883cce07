//! Synthetic traffic generator.
//!
//! Keeps a pool of fake connections open against the engine and drives
//! message, error, and disconnect events through the normal
//! [`MonitorEngine::handle_event`] path. Used for demos and for checking
//! channel wiring without a real transport attached.

use std::sync::Arc;
use std::time::Duration;

use rand::RngExt;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};

use linkmon_core::config::simulator::SimulatorConfig;
use linkmon_core::events::TransportEvent;
use linkmon_core::types::{ConnectionId, ConnectionStatus, MessageDirection};
use linkmon_engine::MonitorEngine;

const ENDPOINTS: [&str; 3] = ["/ws/feed", "/ws/chat", "/ws/presence"];

struct SimState {
    next_id: u64,
    open: Vec<ConnectionId>,
}

/// Spawns the simulator loop; abort the handle to stop it.
pub fn spawn(engine: Arc<MonitorEngine>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let config = engine.config().simulator.clone();
        let mut ticker = interval(Duration::from_millis(config.message_interval_ms.max(10)));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut state = SimState {
            next_id: 0,
            open: Vec::new(),
        };
        loop {
            ticker.tick().await;
            run_batch(&engine, &config, &mut state);
        }
    })
}

// Synchronous so the thread-local rng never lives across an await point.
fn run_batch(engine: &MonitorEngine, config: &SimulatorConfig, state: &mut SimState) {
    let mut rng = rand::rng();
    let jitter = config.latency_jitter_ms.max(0.0);
    let error_p = config.error_probability.clamp(0.0, 1.0);
    let disconnect_p = config.disconnect_probability.clamp(0.0, 1.0);

    // Top the pool back up to the configured size.
    while state.open.len() < config.connections {
        let id = ConnectionId::new(format!("sim-{}", state.next_id));
        let user_id = format!("user-{}", state.next_id % 7);
        let endpoint = ENDPOINTS[rng.random_range(0..ENDPOINTS.len())];
        state.next_id += 1;

        let opened = engine.handle_event(TransportEvent::Opened {
            id: id.clone(),
            user_id: Some(user_id),
            endpoint: endpoint.to_string(),
        });
        if opened.is_ok() {
            let _ = engine.handle_event(TransportEvent::StatusChanged {
                id: id.clone(),
                status: ConnectionStatus::Connected,
            });
            state.open.push(id);
        }
    }

    let mut dropped = Vec::new();
    for id in &state.open {
        let latency =
            (config.latency_mean_ms + rng.random_range(-jitter..=jitter)).max(1.0);
        let direction = if rng.random_bool(0.5) {
            MessageDirection::Sent
        } else {
            MessageDirection::Received
        };
        let _ = engine.handle_event(TransportEvent::Message {
            id: id.clone(),
            direction,
            size_bytes: rng.random_range(64..=4096),
            latency_ms: Some(latency),
        });

        if rng.random_bool(error_p) {
            let _ = engine.handle_event(TransportEvent::Error {
                id: id.clone(),
                message: "synthetic transport error".to_string(),
                error_kind: "simulated".to_string(),
            });
        }
        if rng.random_bool(disconnect_p) {
            dropped.push(id.clone());
        }
    }

    for id in dropped {
        let _ = engine.handle_event(TransportEvent::StatusChanged {
            id: id.clone(),
            status: ConnectionStatus::Disconnected,
        });
        let _ = engine.handle_event(TransportEvent::Closed { id: id.clone() });
        state.open.retain(|open| open != &id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use linkmon_core::config::EngineConfig;

    #[tokio::test]
    async fn test_batch_fills_pool_and_records_traffic() {
        let engine = MonitorEngine::new(EngineConfig::default()).expect("engine");
        let config = SimulatorConfig {
            enabled: true,
            connections: 5,
            message_interval_ms: 50,
            error_probability: 0.0,
            disconnect_probability: 0.0,
            latency_mean_ms: 80.0,
            latency_jitter_ms: 0.0,
        };
        let mut state = SimState {
            next_id: 0,
            open: Vec::new(),
        };

        run_batch(&engine, &config, &mut state);
        assert_eq!(state.open.len(), 5);
        assert_eq!(engine.registry().active_connections(), 5);

        let snapshot = engine.run_tick().await;
        assert_eq!(snapshot.active_connections, 5);
        assert!(snapshot.avg_latency_ms > 0.0);
    }
}
