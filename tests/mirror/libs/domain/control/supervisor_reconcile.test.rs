// [tests/mirror/libs/domain/control/supervisor_reconcile.test.rs]
/*!
 * =================================================================
 * APARATO: CERTIFICADOR DEL SUPERVISOR (V2.3 - CONVERGENCE PROOF)
 * CLASIFICACIÓN: TRINITY EVIDENCE // ESTRATO L2-MIRROR
 * RESPONSABILIDAD: SNAPSHOT INICIAL, DELTAS Y CANCELACIÓN EN UN TICK
 * =================================================================
 */

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use ployz_core_overlay::{management_ip_from_key, PeerSpec, WgKeyPair};
use ployz_domain_control::{
    shutdown_channel, ControlError, FreshnessTracker, MachineDirectory, PeerApplier, Supervisor,
};
use ployz_domain_models::{HeartbeatRow, MachineRow};
use ployz_infra_broker::{BrokerError, ChangeFeed, RowChange, RowChangeKind, Topic, TopicSource, TopicStream};

// --- FORJA DE FILAS ---

fn forge_machine(endpoint: &str) -> MachineRow {
    let pair = WgKeyPair::generate();
    MachineRow {
        id: pair.public_key.to_base64(),
        public_key: pair.public_key.to_base64(),
        subnet: "10.210.8.0/24".to_string(),
        management_ip: management_ip_from_key(&pair.public_key).to_string(),
        endpoint: Some(endpoint.to_string()),
        updated_at: "2026-03-01T00:00:00.000000000Z".to_string(),
        version: 1,
    }
}

// --- FUENTES GUIONIZADAS ---

struct ScriptedMachineSource {
    snapshot: Vec<MachineRow>,
    late_change: MachineRow,
    _keepalive: tokio::sync::mpsc::Sender<()>,
    parked: tokio::sync::Mutex<Option<tokio::sync::mpsc::Receiver<()>>>,
}

#[async_trait]
impl TopicSource for ScriptedMachineSource {
    type Row = MachineRow;

    async fn open(&self) -> Result<TopicStream<MachineRow>, BrokerError> {
        Ok(TopicStream {
            snapshot: self.snapshot.clone(),
            subscription_id: "machines".to_string(),
            last_change_id: 1,
            feed: Box::new(OneShotFeed {
                pending: Some(self.late_change.clone()),
                parked: self.parked.lock().await.take(),
            }),
        })
    }

    async fn resume(
        &self,
        _subscription_id: &str,
        _from_change: i64,
    ) -> Result<TopicStream<MachineRow>, BrokerError> {
        self.open().await
    }
}

struct OneShotFeed {
    pending: Option<MachineRow>,
    parked: Option<tokio::sync::mpsc::Receiver<()>>,
}

#[async_trait]
impl ChangeFeed<MachineRow> for OneShotFeed {
    async fn next(&mut self) -> Result<Option<RowChange<MachineRow>>, BrokerError> {
        if let Some(row) = self.pending.take() {
            return Ok(Some(RowChange { kind: RowChangeKind::Added, row, change_id: 2 }));
        }
        if let Some(receiver) = self.parked.as_mut() {
            let _ = receiver.recv().await;
        }
        Ok(None)
    }
}

struct ScriptedHeartbeatSource {
    snapshot: Vec<HeartbeatRow>,
    _keepalive: tokio::sync::mpsc::Sender<()>,
    parked: tokio::sync::Mutex<Option<tokio::sync::mpsc::Receiver<()>>>,
}

#[async_trait]
impl TopicSource for ScriptedHeartbeatSource {
    type Row = HeartbeatRow;

    async fn open(&self) -> Result<TopicStream<HeartbeatRow>, BrokerError> {
        Ok(TopicStream {
            snapshot: self.snapshot.clone(),
            subscription_id: "heartbeats".to_string(),
            last_change_id: 1,
            feed: Box::new(ParkedHeartbeatFeed { parked: self.parked.lock().await.take() }),
        })
    }

    async fn resume(
        &self,
        _subscription_id: &str,
        _from_change: i64,
    ) -> Result<TopicStream<HeartbeatRow>, BrokerError> {
        self.open().await
    }
}

struct ParkedHeartbeatFeed {
    parked: Option<tokio::sync::mpsc::Receiver<()>>,
}

#[async_trait]
impl ChangeFeed<HeartbeatRow> for ParkedHeartbeatFeed {
    async fn next(&mut self) -> Result<Option<RowChange<HeartbeatRow>>, BrokerError> {
        if let Some(receiver) = self.parked.as_mut() {
            let _ = receiver.recv().await;
        }
        Ok(None)
    }
}

// --- CAPACIDADES GRABADORAS ---

struct StaticDirectory {
    machines: Vec<MachineRow>,
}

#[async_trait]
impl MachineDirectory for StaticDirectory {
    async fn ensure_tables(&self) -> Result<(), ControlError> {
        Ok(())
    }

    async fn list_machines(&self) -> Result<Vec<MachineRow>, ControlError> {
        Ok(self.machines.clone())
    }
}

#[derive(Default)]
struct RecordingApplier {
    applied_counts: Mutex<Vec<usize>>,
}

#[async_trait]
impl PeerApplier for RecordingApplier {
    async fn apply_peers(&self, peers: &[PeerSpec]) -> Result<(), ControlError> {
        self.applied_counts.lock().unwrap().push(peers.len());
        Ok(())
    }
}

async fn wait_until(description: &str, mut condition: impl FnMut() -> bool) {
    for _ in 0..200 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
    panic!("L2_CONVERGENCE_TIMEOUT: {description}");
}

#[cfg(test)]
mod tests {
    use super::*;

    /**
     * CERTIFICACIÓN: El snapshot inicial se aplica excluyendo la
     * identidad propia, el delta 'Added' re-proyecta el conjunto, la
     * frescura registra el latido del snapshot y la cancelación sella
     * el bucle dentro de un tick.
     */
    #[tokio::test]
    async fn certify_supervisor_convergence_cycle() {
        println!("\n🕸️  [PROVING_GROUNDS]: Driving the supervisor convergence cycle...");

        let self_machine = forge_machine("203.0.113.1:51820");
        let remote_one = forge_machine("203.0.113.2:51820");
        let remote_two = forge_machine("203.0.113.3:51820");

        let (machine_keepalive, machine_parked) = tokio::sync::mpsc::channel(1);
        let machine_source = Arc::new(ScriptedMachineSource {
            snapshot: vec![self_machine.clone(), remote_one.clone()],
            late_change: remote_two.clone(),
            _keepalive: machine_keepalive,
            parked: tokio::sync::Mutex::new(Some(machine_parked)),
        });

        let (heartbeat_keepalive, heartbeat_parked) = tokio::sync::mpsc::channel(1);
        let heartbeat_source = Arc::new(ScriptedHeartbeatSource {
            snapshot: vec![HeartbeatRow {
                node_id: remote_one.id.clone(),
                seq: 1,
                updated_at: "2026-03-01T00:00:01.000000000Z".to_string(),
            }],
            _keepalive: heartbeat_keepalive,
            parked: tokio::sync::Mutex::new(Some(heartbeat_parked)),
        });

        let applier = Arc::new(RecordingApplier::default());
        let freshness = FreshnessTracker::default();
        let (shutdown_handle, shutdown_signal) = shutdown_channel();

        let supervisor = Supervisor::new(
            Arc::new(StaticDirectory {
                machines: vec![self_machine.clone(), remote_one.clone(), remote_two.clone()],
            }),
            Topic::new("MACHINES_TEST", Arc::clone(&machine_source)),
            Topic::new("HEARTBEATS_TEST", Arc::clone(&heartbeat_source)),
            Arc::clone(&applier) as Arc<dyn PeerApplier>,
            self_machine.id.clone(),
            freshness.clone(),
            shutdown_signal,
        );

        let supervisor_task = tokio::spawn(supervisor.run());

        // 1. Snapshot inicial: un par remoto (la identidad propia se excluye).
        wait_until("initial snapshot reconciliation", || {
            applier.applied_counts.lock().unwrap().first() == Some(&1)
        })
        .await;

        // 2. Delta 'Added': el conjunto crece a dos pares.
        wait_until("delta reconciliation", || {
            applier.applied_counts.lock().unwrap().contains(&2)
        })
        .await;

        // 3. Frescura sembrada desde el snapshot de latidos.
        wait_until("heartbeat freshness", || {
            freshness.snapshot().contains_key(&remote_one.id)
        })
        .await;

        // 4. Cancelación observada dentro de un tick.
        shutdown_handle.shutdown();
        let verdict = tokio::time::timeout(Duration::from_secs(2), supervisor_task)
            .await
            .expect("supervisor must observe cancellation within one tick")
            .expect("supervisor task must not panic");
        assert!(verdict.is_ok(), "supervisor must seal cleanly: {verdict:?}");

        println!("   ✅ [SUCCESS]: Convergence cycle certified.");
    }
}
