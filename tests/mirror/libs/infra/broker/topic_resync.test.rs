// [tests/mirror/libs/infra/broker/topic_resync.test.rs]
/*!
 * =================================================================
 * APARATO: CERTIFICADOR DE RESYNC DEL DIFUSOR (V2.3 - SEVERED UPLINK)
 * CLASIFICACIÓN: TRINITY EVIDENCE // ESTRATO L3-MIRROR
 * RESPONSABILIDAD: AUDITORÍA DEL PROTOCOLO DE RE-ESTABLECIMIENTO
 *
 * # Mathematical Proof (Reconvergence Contract):
 * Tras un corte del upstream el suscriptor recibe exactamente una
 * señal 'Resync' dentro de la ventana de reanudación; el snapshot
 * releído después contiene un superconjunto de las filas previas.
 * =================================================================
 */

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use ployz_domain_models::ChangeEvent;
use ployz_infra_broker::{
    BrokerError, ChangeFeed, RowChange, RowChangeKind, Topic, TopicSource, TopicStream,
};
use ployz_infra_registry::RegistryError;

/// Fuente guionizada: la primera apertura entrega un flujo que se corta
/// tras un cambio; la reanudación siempre falla; la reapertura entrega
/// un flujo estable con snapshot fresco.
struct ScriptedSource {
    open_count: AtomicUsize,
    resume_count: AtomicUsize,
    // Mantiene vivo el canal del flujo estable para que jamás cierre.
    _keepalive: tokio::sync::mpsc::Sender<()>,
    parked_receiver: tokio::sync::Mutex<Option<tokio::sync::mpsc::Receiver<()>>>,
}

impl ScriptedSource {
    fn new() -> Self {
        let (keepalive, parked) = tokio::sync::mpsc::channel(1);
        Self {
            open_count: AtomicUsize::new(0),
            resume_count: AtomicUsize::new(0),
            _keepalive: keepalive,
            parked_receiver: tokio::sync::Mutex::new(Some(parked)),
        }
    }

    fn snapshot_rows() -> Vec<String> {
        vec!["machine-a".to_string(), "machine-b".to_string(), "machine-c".to_string()]
    }
}

#[async_trait]
impl TopicSource for ScriptedSource {
    type Row = String;

    async fn open(&self) -> Result<TopicStream<String>, BrokerError> {
        let open_index = self.open_count.fetch_add(1, Ordering::SeqCst);
        if open_index == 0 {
            Ok(TopicStream {
                snapshot: ScriptedSource::snapshot_rows(),
                subscription_id: "sub-primera".to_string(),
                last_change_id: 10,
                feed: Box::new(SeveringFeed { change_emitted: false }),
            })
        } else {
            let parked = self.parked_receiver.lock().await.take();
            Ok(TopicStream {
                snapshot: ScriptedSource::snapshot_rows(),
                subscription_id: "sub-segunda".to_string(),
                last_change_id: 20,
                feed: Box::new(SilentFeed { parked }),
            })
        }
    }

    async fn resume(
        &self,
        _subscription_id: &str,
        _from_change: i64,
    ) -> Result<TopicStream<String>, BrokerError> {
        self.resume_count.fetch_add(1, Ordering::SeqCst);
        Err(BrokerError::Upstream(RegistryError::StreamClosed))
    }
}

/// Entrega un cambio y después simula el corte físico del enlace.
struct SeveringFeed {
    change_emitted: bool,
}

#[async_trait]
impl ChangeFeed<String> for SeveringFeed {
    async fn next(&mut self) -> Result<Option<RowChange<String>>, BrokerError> {
        if !self.change_emitted {
            self.change_emitted = true;
            return Ok(Some(RowChange {
                kind: RowChangeKind::Added,
                row: "machine-d".to_string(),
                change_id: 11,
            }));
        }
        Err(BrokerError::Upstream(RegistryError::StreamClosed))
    }
}

/// Flujo estable que jamás entrega ni cierra.
struct SilentFeed {
    parked: Option<tokio::sync::mpsc::Receiver<()>>,
}

#[async_trait]
impl ChangeFeed<String> for SilentFeed {
    async fn next(&mut self) -> Result<Option<RowChange<String>>, BrokerError> {
        if let Some(receiver) = self.parked.as_mut() {
            // El emisor vive dentro de la fuente: esta espera no termina.
            let _ = receiver.recv().await;
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /**
     * CERTIFICACIÓN (escenario del protocolo): snapshot de tres filas,
     * corte del upstream, señal 'Resync' dentro de la ventana, y la
     * reanudación se intenta antes que la reapertura.
     */
    #[tokio::test(start_paused = true)]
    async fn certify_resync_after_severed_upstream() {
        println!("\n🧪 [PROVING_GROUNDS]: Severing the upstream subscription...");

        let scripted_source = Arc::new(ScriptedSource::new());
        let topic = Topic::new("MACHINES_TEST", Arc::clone(&scripted_source));

        let (snapshot, mut changes) = topic.subscribe().await.expect("subscription must open");
        assert_eq!(snapshot.len(), 3, "L3_SNAPSHOT_DRIFT: expected three machines");

        // 1. El cambio previo al corte llega en orden.
        let first_event = changes.recv().await.expect("change before the cut");
        assert_eq!(first_event, ChangeEvent::Added("machine-d".to_string()));

        // 2. Tras el corte, la señal de reconvergencia es obligatoria.
        let second_event = changes.recv().await.expect("resync after the cut");
        assert!(second_event.is_resync(), "L3_RESYNC_MISSING: got {second_event:?}");

        // 3. El protocolo intentó reanudar antes de reabrir.
        assert!(scripted_source.resume_count.load(Ordering::SeqCst) >= 1);
        assert_eq!(scripted_source.open_count.load(Ordering::SeqCst), 2);

        // 4. Relectura post-resync: superconjunto de las filas previas.
        let (reread_snapshot, _second_subscriber) =
            topic.subscribe().await.expect("second subscription");
        for known_row in &snapshot {
            assert!(
                reread_snapshot.contains(known_row),
                "L3_WORLD_SHRUNK: {known_row} vanished after resync"
            );
        }

        println!("   ✅ [SUCCESS]: Resync contract certified end to end.");
    }
}
