// [libs/infra/broker/src/source.rs]
/*!
 * =================================================================
 * APARATO: TOPIC SOURCE CONTRACT (V5.2 - PARAMETRIC UPSTREAM)
 * CLASIFICACIÓN: INFRASTRUCTURE LAYER (ESTRATO L3)
 * RESPONSABILIDAD: CONTRATO DEL FLUJO UPSTREAM Y FUENTE GENÉRICA
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. UNA MAQUINARIA, N TÓPICOS: La fuente genérica parametriza la
 *    consulta y el decodificador de fila; el transporte queda en una
 *    sola fuente de verdad y los tópicos permanecen tipados.
 * 2. RESUME FIRST: La reanudación por 'change_id' es el camino nominal
 *    tras un corte; la reapertura con snapshot es el plan de reserva.
 * =================================================================
 */

use async_trait::async_trait;
use serde_json::Value;

use ployz_infra_registry::events::{ChangeKind, QueryEvent};
use ployz_infra_registry::{CorrosionClient, RegistryError, SubscriptionStream};

use crate::errors::BrokerError;

/// Clase de mutación ya etiquetada para el consumidor del tópico.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowChangeKind {
    Added,
    Updated,
    Deleted,
}

/// Cambio de fila decodificado, con su punto de reanudación.
#[derive(Debug, Clone)]
pub struct RowChange<R> {
    pub kind: RowChangeKind,
    pub row: R,
    pub change_id: i64,
}

/// Flujo establecido de un tópico: snapshot inicial más alimentador vivo.
pub struct TopicStream<R> {
    /// Filas del snapshot (vacío al reanudar un flujo previo).
    pub snapshot: Vec<R>,
    /// Identificador opaco del flujo para reanudaciones.
    pub subscription_id: String,
    /// Último 'change_id' conocido al cierre del snapshot.
    pub last_change_id: i64,
    /// Alimentador de cambios posterior al snapshot.
    pub feed: Box<dyn ChangeFeed<R>>,
}

/// Lector pull del flujo de cambios de un tópico.
#[async_trait]
pub trait ChangeFeed<R>: Send {
    /// Siguiente cambio; `None` cuando el servidor cierra el flujo.
    async fn next(&mut self) -> Result<Option<RowChange<R>>, BrokerError>;
}

/// Capacidad de apertura y reanudación del flujo upstream de un tópico.
#[async_trait]
pub trait TopicSource: Send + Sync + 'static {
    /// Fila tipada del tópico.
    type Row: Clone + Send + Sync + 'static;

    /// Abre un flujo nuevo con snapshot completo.
    async fn open(&self) -> Result<TopicStream<Self::Row>, BrokerError>;

    /// Reanuda un flujo previo desde un 'change_id' conocido.
    async fn resume(
        &self,
        subscription_id: &str,
        from_change: i64,
    ) -> Result<TopicStream<Self::Row>, BrokerError>;
}

#[async_trait]
impl<T> TopicSource for std::sync::Arc<T>
where
    T: TopicSource,
{
    type Row = T::Row;

    async fn open(&self) -> Result<TopicStream<Self::Row>, BrokerError> {
        T::open(self).await
    }

    async fn resume(
        &self,
        subscription_id: &str,
        from_change: i64,
    ) -> Result<TopicStream<Self::Row>, BrokerError> {
        T::resume(self, subscription_id, from_change).await
    }
}

/// Decodificador de fila inyectado por el repositorio dueño del tópico.
pub type RowDecoder<R> = fn(&[Value]) -> Result<R, RegistryError>;

/**
 * Fuente genérica sobre el registro replicado: consulta canónica del
 * tópico más decodificador de fila.
 */
pub struct RegistryTopicSource<R> {
    registry_client: CorrosionClient,
    topic_query: &'static str,
    decode_row: RowDecoder<R>,
}

impl<R> RegistryTopicSource<R> {
    #[must_use]
    pub fn new(
        registry_client: CorrosionClient,
        topic_query: &'static str,
        decode_row: RowDecoder<R>,
    ) -> Self {
        Self { registry_client, topic_query, decode_row }
    }
}

#[async_trait]
impl<R: Clone + Send + Sync + 'static> TopicSource for RegistryTopicSource<R> {
    type Row = R;

    async fn open(&self) -> Result<TopicStream<R>, BrokerError> {
        let mut stream = self.registry_client.subscribe(self.topic_query, vec![]).await?;

        // Fase de snapshot: filas hasta el fin de consulta.
        let mut snapshot = Vec::new();
        let mut last_change_id = 0;
        loop {
            match stream.next_event().await? {
                Some(QueryEvent::Columns(_)) => {}
                Some(QueryEvent::Row { cells, .. }) => {
                    snapshot.push((self.decode_row)(&cells).map_err(BrokerError::Upstream)?);
                }
                Some(QueryEvent::EndOfQuery { change_id }) => {
                    last_change_id = change_id.unwrap_or(0);
                    break;
                }
                Some(QueryEvent::Error(fault)) => {
                    return Err(BrokerError::Upstream(RegistryError::Statement(fault)));
                }
                Some(QueryEvent::Change { .. }) | None => {
                    return Err(BrokerError::Upstream(RegistryError::StreamClosed));
                }
            }
        }

        Ok(TopicStream {
            snapshot,
            subscription_id: stream.id().to_string(),
            last_change_id,
            feed: Box::new(RegistryChangeFeed { stream, decode_row: self.decode_row }),
        })
    }

    async fn resume(
        &self,
        subscription_id: &str,
        from_change: i64,
    ) -> Result<TopicStream<R>, BrokerError> {
        let stream = self
            .registry_client
            .resubscribe(subscription_id, from_change)
            .await?;

        Ok(TopicStream {
            snapshot: Vec::new(),
            subscription_id: subscription_id.to_string(),
            last_change_id: from_change,
            feed: Box::new(RegistryChangeFeed { stream, decode_row: self.decode_row }),
        })
    }
}

struct RegistryChangeFeed<R> {
    stream: SubscriptionStream,
    decode_row: RowDecoder<R>,
}

#[async_trait]
impl<R: Clone + Send + Sync + 'static> ChangeFeed<R> for RegistryChangeFeed<R> {
    async fn next(&mut self) -> Result<Option<RowChange<R>>, BrokerError> {
        loop {
            match self.stream.next_event().await? {
                Some(QueryEvent::Change { kind, cells, change_id, .. }) => {
                    let row = (self.decode_row)(&cells).map_err(BrokerError::Upstream)?;
                    let kind = match kind {
                        ChangeKind::Insert => RowChangeKind::Added,
                        ChangeKind::Update => RowChangeKind::Updated,
                        ChangeKind::Delete => RowChangeKind::Deleted,
                    };
                    return Ok(Some(RowChange { kind, row, change_id }));
                }
                Some(QueryEvent::Error(fault)) => {
                    return Err(BrokerError::Upstream(RegistryError::Statement(fault)));
                }
                // Tramas de snapshot rezagadas tras una reanudación: se ignoran.
                Some(_) => {}
                None => return Ok(None),
            }
        }
    }
}
