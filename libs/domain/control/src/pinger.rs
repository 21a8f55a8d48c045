// [libs/domain/control/src/pinger.rs]
/*!
 * =================================================================
 * APARATO: OVERLAY PING TRACKER (V6.0 - RTT OBSERVER)
 * CLASIFICACIÓN: DOMAIN ORCHESTRATOR (ESTRATO L2 - OPCIONAL)
 * RESPONSABILIDAD: SONDA TCP PERIÓDICA HACIA CADA PAR DE LA MALLA
 * =================================================================
 */

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::net::TcpStream;
use tokio::time::{interval, timeout, Instant, MissedTickBehavior};
use tracing::{debug, info, instrument};

use crate::shutdown::ShutdownSignal;

/// Cadencia de las sondas RTT.
const PING_PERIOD: Duration = Duration::from_secs(1);
/// Paciencia máxima por conexión individual.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(1);

/// Destino de sonda de un par conocido.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PingTarget {
    pub node_id: String,
    pub address: SocketAddr,
}

/// Última medición RTT conocida por nodo.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PingVerdict {
    Reachable(Duration),
    Unreachable,
}

/// Sonda periódica de alcanzabilidad por overlay.
#[derive(Clone, Default)]
pub struct PingTracker {
    targets: Arc<Mutex<Vec<PingTarget>>>,
    verdicts: Arc<Mutex<HashMap<String, PingVerdict>>>,
}

impl PingTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reemplaza el conjunto de destinos (tras cada reconciliación).
    pub fn update_targets(&self, fresh_targets: Vec<PingTarget>) {
        *lock_ignoring_poison(&self.targets) = fresh_targets;
    }

    /// Copia instantánea de los veredictos RTT.
    #[must_use]
    pub fn snapshot(&self) -> HashMap<String, PingVerdict> {
        lock_ignoring_poison(&self.verdicts).clone()
    }

    /// Bucle de sondas hasta la cancelación.
    #[instrument(skip(self, shutdown))]
    pub async fn run(self, mut shutdown: ShutdownSignal) {
        let mut probe_ticker = interval(PING_PERIOD);
        probe_ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        info!("📶 [PING_TRACKER]: Overlay reachability probes operational.");

        loop {
            tokio::select! {
                _ = probe_ticker.tick() => {
                    let current_targets = lock_ignoring_poison(&self.targets).clone();
                    for target in current_targets {
                        let verdict = probe_target(&target).await;
                        debug!("📶 [PING]: {} -> {:?}", target.node_id, verdict);
                        lock_ignoring_poison(&self.verdicts).insert(target.node_id, verdict);
                    }
                }

                _ = shutdown.cancelled() => {
                    info!("🛑 [PING_TRACKER]: Cancellation observed; probes sealed.");
                    return;
                }
            }
        }
    }
}

async fn probe_target(target: &PingTarget) -> PingVerdict {
    let probe_started = Instant::now();
    match timeout(CONNECT_TIMEOUT, TcpStream::connect(target.address)).await {
        Ok(Ok(_stream)) => PingVerdict::Reachable(probe_started.elapsed()),
        Ok(Err(_)) | Err(_) => PingVerdict::Unreachable,
    }
}

fn lock_ignoring_poison<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
