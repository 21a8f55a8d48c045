// [libs/domain/control/src/ntp.rs]
/*!
 * =================================================================
 * APARATO: WALL-CLOCK DRIFT CHECKER (V6.0 - SNTP PROBE)
 * CLASIFICACIÓN: DOMAIN ORCHESTRATOR (ESTRATO L2 - OPCIONAL)
 * RESPONSABILIDAD: SONDA PERIÓDICA DE DERIVA DEL RELOJ DEL HOST
 *
 * Un reloj derivado envenena los 'updated_at' del registro y el juicio
 * de frescura de latidos; la sonda SNTP (RFC 4330, modo cliente) mide
 * la deriva sin tocar el reloj del host.
 * =================================================================
 */

use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use tokio::net::UdpSocket;
use tokio::time::{interval, timeout, MissedTickBehavior};
use tracing::{debug, info, instrument, warn};

use crate::shutdown::ShutdownSignal;

/// Cadencia de la sonda de deriva.
const DRIFT_PROBE_PERIOD: Duration = Duration::from_secs(600);
/// Paciencia máxima de la respuesta SNTP.
const SNTP_RESPONSE_TIMEOUT: Duration = Duration::from_secs(2);
/// Deriva a partir de la cual se advierte al operador.
const DRIFT_WARNING_THRESHOLD_MS: i64 = 500;
/// Desplazamiento entre la época NTP (1900) y la época Unix (1970).
const NTP_UNIX_EPOCH_OFFSET_SECONDS: u64 = 2_208_988_800;

/// Sonda periódica de deriva del reloj contra un servidor NTP.
#[derive(Clone)]
pub struct DriftChecker {
    ntp_server: String,
    last_drift_milliseconds: Arc<Mutex<Option<i64>>>,
}

impl DriftChecker {
    /// `ntp_server` en forma `host:puerto` (p. ej. `pool.ntp.org:123`).
    #[must_use]
    pub fn new(ntp_server: impl Into<String>) -> Self {
        Self {
            ntp_server: ntp_server.into(),
            last_drift_milliseconds: Arc::new(Mutex::new(None)),
        }
    }

    /// Última deriva medida en milisegundos (servidor - host).
    #[must_use]
    pub fn last_drift_milliseconds(&self) -> Option<i64> {
        match self.last_drift_milliseconds.lock() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    /// Bucle de sondas hasta la cancelación.
    #[instrument(skip(self, shutdown), fields(server = %self.ntp_server))]
    pub async fn run(self, mut shutdown: ShutdownSignal) {
        let mut drift_ticker = interval(DRIFT_PROBE_PERIOD);
        drift_ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        info!("🕰️  [DRIFT_CHECKER]: Wall-clock drift probes operational.");

        loop {
            tokio::select! {
                _ = drift_ticker.tick() => {
                    match probe_sntp(&self.ntp_server).await {
                        Ok(server_time) => {
                            let drift_ms = (server_time - Utc::now()).num_milliseconds();
                            if let Ok(mut guard) = self.last_drift_milliseconds.lock() {
                                *guard = Some(drift_ms);
                            }
                            if drift_ms.abs() > DRIFT_WARNING_THRESHOLD_MS {
                                warn!("⏰ [CLOCK_DRIFT]: Host clock drifts {} ms from {}.", drift_ms, self.ntp_server);
                            } else {
                                debug!("🕰️  [CLOCK_OK]: Drift {} ms.", drift_ms);
                            }
                        }
                        Err(probe_fault) => {
                            debug!("🕰️  [DRIFT_PROBE_MISS]: {}", probe_fault);
                        }
                    }
                }

                _ = shutdown.cancelled() => {
                    info!("🛑 [DRIFT_CHECKER]: Cancellation observed; probes sealed.");
                    return;
                }
            }
        }
    }
}

/// Sonda SNTP mínima: petición de 48 bytes en modo cliente (versión 3)
/// y lectura del Transmit Timestamp de la respuesta.
async fn probe_sntp(server: &str) -> Result<DateTime<Utc>, String> {
    let socket = UdpSocket::bind("0.0.0.0:0")
        .await
        .map_err(|io_fault| format!("socket bind failed: {io_fault}"))?;
    socket
        .connect(server)
        .await
        .map_err(|io_fault| format!("connect to {server} failed: {io_fault}"))?;

    // LI = 0, VN = 3, Mode = 3 (cliente).
    let mut request_packet = [0u8; 48];
    request_packet[0] = 0x1b;
    socket
        .send(&request_packet)
        .await
        .map_err(|io_fault| format!("send failed: {io_fault}"))?;

    let mut response_packet = [0u8; 48];
    let received_bytes = timeout(SNTP_RESPONSE_TIMEOUT, socket.recv(&mut response_packet))
        .await
        .map_err(|_| format!("no response from {server} within {SNTP_RESPONSE_TIMEOUT:?}"))?
        .map_err(|io_fault| format!("recv failed: {io_fault}"))?;

    if received_bytes < 48 {
        return Err(format!("short SNTP response: {received_bytes} bytes"));
    }

    decode_transmit_timestamp(&response_packet)
}

fn decode_transmit_timestamp(packet: &[u8; 48]) -> Result<DateTime<Utc>, String> {
    // Transmit Timestamp: bytes 40..48 (32 bits de segundos + 32 de fracción).
    let ntp_seconds = u32::from_be_bytes([packet[40], packet[41], packet[42], packet[43]]) as u64;
    let ntp_fraction = u32::from_be_bytes([packet[44], packet[45], packet[46], packet[47]]) as u64;

    if ntp_seconds < NTP_UNIX_EPOCH_OFFSET_SECONDS {
        return Err("SNTP timestamp predates the Unix epoch".to_string());
    }

    let unix_seconds = (ntp_seconds - NTP_UNIX_EPOCH_OFFSET_SECONDS) as i64;
    let nanoseconds = ((ntp_fraction * 1_000_000_000) >> 32) as u32;

    Utc.timestamp_opt(unix_seconds, nanoseconds)
        .single()
        .ok_or_else(|| "SNTP timestamp outside the representable range".to_string())
}
