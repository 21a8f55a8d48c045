// [libs/domain/control/src/heartbeat.rs]
/*!
 * =================================================================
 * APARATO: HEARTBEAT WRITER DAEMON (V6.1 - VITALITY PULSE)
 * CLASIFICACIÓN: DOMAIN ORCHESTRATOR (ESTRATO L2)
 * RESPONSABILIDAD: PUBLICACIÓN PERIÓDICA DEL LATIDO PROPIO
 *
 * Contrato: cadencia de 1 s; diez fallos consecutivos emiten UNA sola
 * advertencia y el daemon continúa; la cancelación se observa dentro
 * de un tick.
 * =================================================================
 */

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, instrument, warn};

use ployz_infra_registry::HeartbeatRepo;

use crate::capabilities::Clock;
use crate::shutdown::ShutdownSignal;

/// Cadencia nominal del latido.
const HEARTBEAT_PERIOD: Duration = Duration::from_secs(1);
/// Fallos consecutivos que disparan la única advertencia.
const FAILURE_WARNING_THRESHOLD: u32 = 10;

/// Escritor del latido propio hacia el registro replicado.
pub struct HeartbeatWriter {
    heartbeat_repo: HeartbeatRepo,
    self_node_id: String,
    clock: Arc<dyn Clock>,
    shutdown: ShutdownSignal,
}

impl HeartbeatWriter {
    #[must_use]
    pub fn new(
        heartbeat_repo: HeartbeatRepo,
        self_node_id: String,
        clock: Arc<dyn Clock>,
        shutdown: ShutdownSignal,
    ) -> Self {
        Self { heartbeat_repo, self_node_id, clock, shutdown }
    }

    /// Bucle de vitalidad hasta la cancelación. Jamás termina por fallos
    /// de escritura: el registro puede estar reconvergiendo.
    #[instrument(skip(self), fields(node = %self.self_node_id))]
    pub async fn run(mut self) {
        let mut pulse_ticker = interval(HEARTBEAT_PERIOD);
        pulse_ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let mut consecutive_failures: u32 = 0;
        info!("💓 [HEARTBEAT_WRITER]: Vitality pulse operational.");

        loop {
            tokio::select! {
                _ = pulse_ticker.tick() => {
                    match self.heartbeat_repo.bump_heartbeat(&self.self_node_id, self.clock.now()).await {
                        Ok(()) => {
                            consecutive_failures = 0;
                        }
                        Err(bump_fault) => {
                            consecutive_failures += 1;
                            if consecutive_failures == FAILURE_WARNING_THRESHOLD {
                                warn!(
                                    "⚠️  [HEARTBEAT_DEGRADED]: {} consecutive bump failures; last: {}",
                                    consecutive_failures, bump_fault
                                );
                            } else {
                                debug!("💔 [HEARTBEAT_MISS]: Bump failed: {}", bump_fault);
                            }
                        }
                    }
                }

                _ = self.shutdown.cancelled() => {
                    info!("🛑 [HEARTBEAT_WRITER]: Cancellation observed; pulse sealed.");
                    return;
                }
            }
        }
    }
}
