// [libs/infra/broker/src/topic.rs]
/*!
 * =================================================================
 * APARATO: TOPIC FAN-OUT ENGINE (V5.5 - RESYNC AUTHORITY)
 * CLASIFICACIÓN: INFRASTRUCTURE LAYER (ESTRATO L3)
 * RESPONSABILIDAD: UNA SUSCRIPCIÓN UPSTREAM, N CONSUMIDORES LOCALES
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. NON-BLOCKING FAN-OUT: El despacho usa 'try_send'; un consumidor
 *    lento pierde el evento solo para sí mismo y el upstream jamás se
 *    bloquea.
 * 2. REPLAY WINDOW: Los últimos 256 cambios desde el refresco del
 *    snapshot se re-entregan a cada suscriptor nuevo.
 * 3. RESYNC DISCIPLINE: Tras re-establecer el upstream se emite un
 *    'Resync'; el consumidor debe releer el mundo y fusionar.
 * 4. LIFECYCLE BY REFCOUNT: El upstream arranca con el primer
 *    suscriptor y se libera cuando el conjunto se vacía; los buffers
 *    se sueltan en ese mismo instante.
 *
 * # Mathematical Proof (Bounded Memory):
 * Con C consumidores, la memoria del tópico está acotada por
 * 256 + 128·C eventos; ni el replay ni los canales crecen sin límite
 * ante consumidores muertos o lentos.
 * =================================================================
 */

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, error, warn};

use ployz_domain_models::ChangeEvent;

use crate::errors::BrokerError;
use crate::source::{RowChangeKind, TopicSource, TopicStream};

/// Capacidad del canal acotado de cada suscriptor.
pub const SUBSCRIBER_CHANNEL_CAPACITY: usize = 128;
/// Capacidad del buffer de replay por tópico.
pub const REPLAY_BUFFER_CAPACITY: usize = 256;
/// Primer retardo de reanudación tras un corte.
const RESUBSCRIBE_BASE_BACKOFF: Duration = Duration::from_secs(1);
/// Techo del retardo exponencial de reanudación.
const RESUBSCRIBE_BACKOFF_CAP: Duration = Duration::from_secs(15);
/// Presupuesto de intentos antes de clausurar el tópico.
const RESUBSCRIBE_MAX_ATTEMPTS: u32 = 20;

/// Difusor de un tópico del registro hacia consumidores locales.
pub struct Topic<S: TopicSource> {
    inner: Arc<TopicInner<S>>,
}

impl<S: TopicSource> Clone for Topic<S> {
    fn clone(&self) -> Self {
        Self { inner: Arc::clone(&self.inner) }
    }
}

struct TopicInner<S: TopicSource> {
    source: S,
    /// Rótulo del tópico para el rastro de telemetría.
    topic_label: &'static str,
    /// Serializa la apertura del upstream entre primeros suscriptores.
    setup_lock: tokio::sync::Mutex<()>,
    core: Mutex<TopicCore<S::Row>>,
}

struct TopicCore<R> {
    subscribers: Vec<mpsc::Sender<ChangeEvent<R>>>,
    replay: VecDeque<ChangeEvent<R>>,
    snapshot: Vec<R>,
    upstream_running: bool,
    closed: bool,
}

impl<S: TopicSource> Topic<S> {
    /// Construye el tópico en reposo; el upstream arranca con el primer suscriptor.
    #[must_use]
    pub fn new(topic_label: &'static str, source: S) -> Self {
        Self {
            inner: Arc::new(TopicInner {
                source,
                topic_label,
                setup_lock: tokio::sync::Mutex::new(()),
                core: Mutex::new(TopicCore {
                    subscribers: Vec::new(),
                    replay: VecDeque::new(),
                    snapshot: Vec::new(),
                    upstream_running: false,
                    closed: false,
                }),
            }),
        }
    }

    /**
     * Alta de un consumidor: devuelve el snapshot vigente y el canal de
     * cambios. El snapshot es lógicamente anterior al primer cambio que
     * el canal entregará; los cambios del buffer de replay se pre-cargan
     * en el canal del recién llegado.
     *
     * # Errors:
     * - `BrokerError::TopicClosed`: presupuesto de reanudación agotado.
     * - `BrokerError::Upstream`: la apertura inicial del flujo falló.
     */
    pub async fn subscribe(
        &self,
    ) -> Result<(Vec<S::Row>, mpsc::Receiver<ChangeEvent<S::Row>>), BrokerError> {
        let _setup_guard = self.inner.setup_lock.lock().await;

        if self.inner.lock_core().closed {
            return Err(BrokerError::TopicClosed);
        }

        let needs_upstream = !self.inner.lock_core().upstream_running;
        let fresh_stream = if needs_upstream {
            Some(self.inner.source.open().await?)
        } else {
            None
        };

        // El alta del suscriptor precede al lector del upstream: el
        // primer despacho jamás encuentra el conjunto vacío.
        let (change_sender, change_receiver) = mpsc::channel(SUBSCRIBER_CHANNEL_CAPACITY);
        let snapshot = {
            let mut core = self.inner.lock_core();
            if let Some(stream) = &fresh_stream {
                core.snapshot = stream.snapshot.clone();
                core.replay.clear();
                core.upstream_running = true;
            }
            for replayed_event in core.replay.iter() {
                // El recién llegado con replay desbordante pierde eventos
                // individualmente; el snapshot ya los contiene o el
                // full-sync los recupera.
                let _ = change_sender.try_send(replayed_event.clone());
            }
            core.subscribers.push(change_sender);
            core.snapshot.clone()
        };

        if let Some(stream) = fresh_stream {
            debug!(
                "📡 [TOPIC_{}]: Upstream established with {} snapshot rows.",
                self.inner.topic_label,
                stream.snapshot.len()
            );
            tokio::spawn(run_upstream(Arc::clone(&self.inner), stream));
        }

        Ok((snapshot, change_receiver))
    }
}

impl<S: TopicSource> TopicInner<S> {
    fn lock_core(&self) -> MutexGuard<'_, TopicCore<S::Row>> {
        match self.core.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Despacho no bloqueante; devuelve si queda algún suscriptor vivo.
    fn dispatch(&self, event: ChangeEvent<S::Row>) -> bool {
        let mut core = self.lock_core();
        if core.closed {
            return false;
        }

        if core.replay.len() == REPLAY_BUFFER_CAPACITY {
            core.replay.pop_front();
        }
        core.replay.push_back(event.clone());

        let topic_label = self.topic_label;
        core.subscribers.retain(|subscriber| {
            match subscriber.try_send(event.clone()) {
                Ok(()) => true,
                Err(mpsc::error::TrySendError::Full(_)) => {
                    // Consumidor lento: pierde este evento, conserva el canal.
                    warn!("⚠️  [TOPIC_{}]: Slow consumer; change dropped for it.", topic_label);
                    true
                }
                Err(mpsc::error::TrySendError::Closed(_)) => false,
            }
        });

        !core.subscribers.is_empty()
    }

    /// Suelta el upstream y los buffers cuando el último consumidor se fue.
    fn release_upstream(&self) {
        let mut core = self.lock_core();
        core.upstream_running = false;
        core.snapshot = Vec::new();
        core.replay = VecDeque::new();
        debug!("💤 [TOPIC_{}]: Last subscriber gone; upstream released.", self.topic_label);
    }

    /// Clausura terminal: los canales de todos los consumidores se cierran.
    fn close_topic(&self) {
        let mut core = self.lock_core();
        core.closed = true;
        core.upstream_running = false;
        core.subscribers = Vec::new();
        core.snapshot = Vec::new();
        core.replay = VecDeque::new();
        error!("💀 [TOPIC_{}]: Resubscription budget exhausted; topic closed.", self.topic_label);
    }

    fn has_subscribers(&self) -> bool {
        let mut core = self.lock_core();
        core.subscribers.retain(|subscriber| !subscriber.is_closed());
        !core.subscribers.is_empty()
    }
}

/// Resultado del protocolo de re-establecimiento del upstream.
enum Reestablish<R> {
    /// Flujo restaurado; 'true' si fue reapertura con snapshot fresco.
    Restored(TopicStream<R>, bool),
    /// Todos los consumidores se fueron durante la espera.
    Dormant,
    /// Presupuesto de intentos agotado.
    Exhausted,
}

async fn run_upstream<S: TopicSource>(inner: Arc<TopicInner<S>>, mut stream: TopicStream<S::Row>) {
    let mut subscription_id = stream.subscription_id.clone();
    let mut last_change_id = stream.last_change_id;

    loop {
        match stream.feed.next().await {
            Ok(Some(change)) => {
                last_change_id = change.change_id;
                let event = match change.kind {
                    RowChangeKind::Added => ChangeEvent::Added(change.row),
                    RowChangeKind::Updated => ChangeEvent::Updated(change.row),
                    RowChangeKind::Deleted => ChangeEvent::Deleted(change.row),
                };
                if !inner.dispatch(event) {
                    inner.release_upstream();
                    return;
                }
            }
            Ok(None) | Err(_) => {
                warn!(
                    "📴 [TOPIC_{}]: Upstream severed at change {}; resubscribing...",
                    inner.topic_label, last_change_id
                );
                match reestablish(&inner, &subscription_id, last_change_id).await {
                    Reestablish::Restored(new_stream, fresh_snapshot) => {
                        subscription_id = new_stream.subscription_id.clone();
                        if fresh_snapshot {
                            let mut core = inner.lock_core();
                            core.snapshot = new_stream.snapshot.clone();
                            core.replay.clear();
                            last_change_id = new_stream.last_change_id;
                        }
                        // La señal de reconvergencia es obligatoria: pudo
                        // haberse perdido cualquier cantidad de cambios.
                        if !inner.dispatch(ChangeEvent::Resync) {
                            inner.release_upstream();
                            return;
                        }
                        stream = new_stream;
                    }
                    Reestablish::Dormant => {
                        inner.release_upstream();
                        return;
                    }
                    Reestablish::Exhausted => {
                        inner.close_topic();
                        return;
                    }
                }
            }
        }
    }
}

async fn reestablish<S: TopicSource>(
    inner: &Arc<TopicInner<S>>,
    subscription_id: &str,
    from_change: i64,
) -> Reestablish<S::Row> {
    let mut backoff = RESUBSCRIBE_BASE_BACKOFF;

    for attempt in 1..=RESUBSCRIBE_MAX_ATTEMPTS {
        if !inner.has_subscribers() {
            return Reestablish::Dormant;
        }

        tokio::time::sleep(backoff).await;
        backoff = next_backoff(backoff);

        match inner.source.resume(subscription_id, from_change).await {
            Ok(stream) => return Reestablish::Restored(stream, false),
            Err(resume_fault) => {
                debug!(
                    "🔁 [TOPIC_{}]: Resume attempt {}/{} failed: {}",
                    inner.topic_label, attempt, RESUBSCRIBE_MAX_ATTEMPTS, resume_fault
                );
            }
        }

        // Plan de reserva: reapertura completa con snapshot fresco.
        match inner.source.open().await {
            Ok(stream) => return Reestablish::Restored(stream, true),
            Err(open_fault) => {
                warn!(
                    "🔁 [TOPIC_{}]: Reopen attempt {}/{} failed: {}",
                    inner.topic_label, attempt, RESUBSCRIBE_MAX_ATTEMPTS, open_fault
                );
            }
        }
    }

    Reestablish::Exhausted
}

/// Retardo exponencial con techo de 15 s.
fn next_backoff(current: Duration) -> Duration {
    std::cmp::min(current * 2, RESUBSCRIBE_BACKOFF_CAP)
}
