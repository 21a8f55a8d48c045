// [libs/domain/control/src/shutdown.rs]
/*!
 * =================================================================
 * APARATO: COOPERATIVE SHUTDOWN CHANNEL (V6.0 - ONE TICK BOUND)
 * CLASIFICACIÓN: DOMAIN CONTRACT (ESTRATO L2)
 * RESPONSABILIDAD: SEÑAL DE CANCELACIÓN OBSERVABLE EN CADA SELECT
 *
 * Contrato: toda espera larga del plano de control incluye la señal en
 * su select; el supervisor y el escritor de latidos la observan dentro
 * de un tick.
 * =================================================================
 */

use tokio::sync::watch;

/// Emisor de la señal de apagado del proceso.
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    sender: watch::Sender<bool>,
}

impl ShutdownHandle {
    /// Dispara el apagado; despierta todos los selects suscritos.
    pub fn shutdown(&self) {
        let _ = self.sender.send(true);
    }
}

/// Receptor clonable de la señal de apagado.
#[derive(Debug, Clone)]
pub struct ShutdownSignal {
    receiver: watch::Receiver<bool>,
}

impl ShutdownSignal {
    /// Se completa cuando el apagado fue solicitado (o el emisor murió).
    pub async fn cancelled(&mut self) {
        while !*self.receiver.borrow() {
            if self.receiver.changed().await.is_err() {
                return;
            }
        }
    }

    /// Consulta no bloqueante.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        *self.receiver.borrow()
    }
}

/// Crea el par emisor/receptor de apagado cooperativo.
#[must_use]
pub fn shutdown_channel() -> (ShutdownHandle, ShutdownSignal) {
    let (sender, receiver) = watch::channel(false);
    (ShutdownHandle { sender }, ShutdownSignal { receiver })
}
