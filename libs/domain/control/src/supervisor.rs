// [libs/domain/control/src/supervisor.rs]
/*!
 * =================================================================
 * APARATO: MESH SUPERVISOR LOOP (V6.4 - CONVERGENCE ENGINE)
 * CLASIFICACIÓN: DOMAIN ORCHESTRATOR (ESTRATO L2)
 * RESPONSABILIDAD: SINCRONÍA CONTINUA REGISTRO → WIREGUARD LOCAL
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. FOUR-WAY SELECT: Ticker de sincronía completa (30 s), canal de
 *    cambios de máquinas, canal de latidos y cancelación; ninguna rama
 *    bloquea a las demás.
 * 2. EVENTUAL CONVERGENCE: Dentro de un canal el orden upstream se
 *    respeta; entre reanudaciones la garantía es convergencia, y el
 *    'Resync' dispara la relectura completa del mundo.
 * 3. INJECTED APPLY: El paso de aplicación de pares llega como valor
 *    ('PeerApplier'); el Supervisor jamás conoce al Controller.
 * =================================================================
 */

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, instrument, warn};

use ployz_core_overlay::{build_peer_specs, PeerSpec};
use ployz_domain_models::config::DEFAULT_WG_PORT;
use ployz_domain_models::{ChangeEvent, HeartbeatRow, MachineRow, Peer};
use ployz_infra_broker::{Topic, TopicSource};

use crate::capabilities::{MachineDirectory, PeerApplier};
use crate::errors::ControlError;
use crate::pinger::{PingTarget, PingTracker};
use crate::shutdown::ShutdownSignal;

/// Período del ticker de sincronía completa.
const FULL_SYNC_PERIOD: Duration = Duration::from_secs(30);

/// Última vitalidad observada de un nodo remoto.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeFreshness {
    pub seq: i64,
    pub updated_at: String,
}

/// Rastreador compartido de frescura de latidos por nodo.
#[derive(Debug, Clone, Default)]
pub struct FreshnessTracker {
    inner: Arc<Mutex<HashMap<String, NodeFreshness>>>,
}

impl FreshnessTracker {
    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, NodeFreshness>> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Registra (o refresca) la vitalidad de un nodo.
    pub fn record(&self, row: &HeartbeatRow) {
        self.lock().insert(
            row.node_id.clone(),
            NodeFreshness { seq: row.seq, updated_at: row.updated_at.clone() },
        );
    }

    /// Olvida un nodo que abandonó la malla.
    pub fn forget(&self, node_id: &str) {
        self.lock().remove(node_id);
    }

    /// Copia instantánea de la tabla de vitalidad.
    #[must_use]
    pub fn snapshot(&self) -> HashMap<String, NodeFreshness> {
        self.lock().clone()
    }
}

/// Bucle de reconciliación de la malla para una red de este host.
pub struct Supervisor<MS, HS>
where
    MS: TopicSource<Row = MachineRow>,
    HS: TopicSource<Row = HeartbeatRow>,
{
    directory: Arc<dyn MachineDirectory>,
    machines_topic: Topic<MS>,
    heartbeats_topic: Topic<HS>,
    peer_applier: Arc<dyn PeerApplier>,
    /// Identidad propia (clave pública WireGuard); jamás se proyecta como par.
    self_node_id: String,
    freshness: FreshnessTracker,
    /// Sonda RTT opcional; recibe el conjunto de destinos tras cada reconciliación.
    ping_tracker: Option<PingTracker>,
    shutdown: ShutdownSignal,
}

impl<MS, HS> Supervisor<MS, HS>
where
    MS: TopicSource<Row = MachineRow>,
    HS: TopicSource<Row = HeartbeatRow>,
{
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        directory: Arc<dyn MachineDirectory>,
        machines_topic: Topic<MS>,
        heartbeats_topic: Topic<HS>,
        peer_applier: Arc<dyn PeerApplier>,
        self_node_id: String,
        freshness: FreshnessTracker,
        shutdown: ShutdownSignal,
    ) -> Self {
        Self {
            directory,
            machines_topic,
            heartbeats_topic,
            peer_applier,
            self_node_id,
            freshness,
            ping_tracker: None,
            shutdown,
        }
    }

    /// Acopla la sonda RTT opcional al ciclo de reconciliación.
    #[must_use]
    pub fn with_ping_tracker(mut self, ping_tracker: PingTracker) -> Self {
        self.ping_tracker = Some(ping_tracker);
        self
    }

    /**
     * Ejecuta el bucle de convergencia hasta la cancelación.
     *
     * Arranque: garantiza tablas, se suscribe vía Broker y aplica el
     * snapshot completo en una primera reconciliación. Después, select
     * permanente sobre las cuatro fuentes de trabajo.
     *
     * # Errors:
     * - Los fallos del arranque (tablas, suscripción, primera
     *   reconciliación) se propagan; dentro del bucle los fallos
     *   transitorios se registran y el bucle continúa.
     */
    #[instrument(skip(self), fields(node = %self.self_node_id))]
    pub async fn run(mut self) -> Result<(), ControlError> {
        // 1. PREPARACIÓN DE TABLAS REPLICADAS
        self.directory.ensure_tables().await?;

        // 2. SUSCRIPCIONES VÍA BROKER
        let (machine_snapshot, mut machine_changes) = self.machines_topic.subscribe().await?;
        let (heartbeat_snapshot, mut heartbeat_changes) = self.heartbeats_topic.subscribe().await?;

        for heartbeat in &heartbeat_snapshot {
            self.freshness.record(heartbeat);
        }

        // 3. PRIMERA RECONCILIACIÓN SOBRE EL SNAPSHOT COMPLETO
        let mut machine_view: Vec<MachineRow> = machine_snapshot;
        self.reconcile_peers(&machine_view).await?;
        info!(
            "🕸️  [SUPERVISOR_ONLINE]: Converged on {} machines at startup.",
            machine_view.len()
        );

        // 4. BUCLE PERMANENTE DE CONVERGENCIA
        let mut full_sync_ticker =
            interval_at(Instant::now() + FULL_SYNC_PERIOD, FULL_SYNC_PERIOD);
        full_sync_ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = full_sync_ticker.tick() => {
                    self.full_sync(&mut machine_view).await;
                }

                machine_event = machine_changes.recv() => {
                    match machine_event {
                        Some(ChangeEvent::Added(row)) | Some(ChangeEvent::Updated(row)) => {
                            upsert_view(&mut machine_view, row);
                            self.reconcile_or_warn(&machine_view).await;
                        }
                        Some(ChangeEvent::Deleted(row)) => {
                            machine_view.retain(|known| known.id != row.id);
                            self.reconcile_or_warn(&machine_view).await;
                        }
                        Some(ChangeEvent::Resync) => {
                            debug!("🔄 [SUPERVISOR]: Machine stream resynced; refreshing world.");
                            self.full_sync(&mut machine_view).await;
                        }
                        None => {
                            return Err(ControlError::Transient(
                                "machines topic closed under the supervisor".to_string(),
                            ));
                        }
                    }
                }

                heartbeat_event = heartbeat_changes.recv() => {
                    match heartbeat_event {
                        Some(ChangeEvent::Added(row)) | Some(ChangeEvent::Updated(row)) => {
                            self.freshness.record(&row);
                        }
                        Some(ChangeEvent::Deleted(row)) => {
                            self.freshness.forget(&row.node_id);
                        }
                        // El Resync de latidos no exige acción: la tabla
                        // converge con los próximos latidos.
                        Some(ChangeEvent::Resync) => {}
                        None => {
                            return Err(ControlError::Transient(
                                "heartbeats topic closed under the supervisor".to_string(),
                            ));
                        }
                    }
                }

                _ = self.shutdown.cancelled() => {
                    info!("🛑 [SUPERVISOR_OFFLINE]: Cancellation observed; loop sealed.");
                    return Ok(());
                }
            }
        }
    }

    async fn full_sync(&self, machine_view: &mut Vec<MachineRow>) {
        match self.directory.list_machines().await {
            Ok(fresh_rows) => {
                *machine_view = fresh_rows;
                self.reconcile_or_warn(machine_view).await;
            }
            Err(list_fault) => {
                warn!("⚠️  [FULL_SYNC_FAULT]: Machine listing failed: {}", list_fault);
            }
        }
    }

    async fn reconcile_or_warn(&self, machine_view: &[MachineRow]) {
        if let Err(reconcile_fault) = self.reconcile_peers(machine_view).await {
            warn!("⚠️  [RECONCILE_FAULT]: Peer application failed: {}", reconcile_fault);
        }
    }

    async fn reconcile_peers(&self, machine_view: &[MachineRow]) -> Result<(), ControlError> {
        let remote_peers: Vec<Peer> = machine_view
            .iter()
            .filter(|row| row.id != self.self_node_id)
            .map(MachineRow::to_peer)
            .collect();

        let peer_specs = build_peer_specs(&remote_peers)?;
        self.peer_applier.apply_peers(&peer_specs).await?;

        if let Some(ping_tracker) = &self.ping_tracker {
            ping_tracker.update_targets(ping_targets_from(&peer_specs));
        }

        debug!("🕸️  [RECONCILED]: {} peers projected onto the interface.", peer_specs.len());
        Ok(())
    }
}

/// Destinos de sonda RTT: IPv6 de gestión de cada par con el puerto que
/// el par anuncia (o el puerto WireGuard por omisión).
fn ping_targets_from(peer_specs: &[PeerSpec]) -> Vec<PingTarget> {
    peer_specs
        .iter()
        .filter_map(|spec| {
            let management_address = spec.allowed_prefixes.first()?.addr();
            let probe_port = spec.endpoint.map(|endpoint| endpoint.port()).unwrap_or(DEFAULT_WG_PORT);
            Some(PingTarget {
                node_id: spec.public_key.to_base64(),
                address: SocketAddr::new(management_address, probe_port),
            })
        })
        .collect()
}

fn upsert_view(machine_view: &mut Vec<MachineRow>, row: MachineRow) {
    match machine_view.iter_mut().find(|known| known.id == row.id) {
        Some(known) => *known = row,
        None => machine_view.push(row),
    }
}
