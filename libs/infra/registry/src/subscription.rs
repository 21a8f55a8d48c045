// [libs/infra/registry/src/subscription.rs]
/*!
 * =================================================================
 * APARATO: SUBSCRIPTION STREAM TUNNEL (V6.3 - RESUME AUTHORITY)
 * CLASIFICACIÓN: INFRASTRUCTURE ADAPTER (ESTRATO L3)
 * RESPONSABILIDAD: FLUJO VIVO DE EVENTOS CON REANUDACIÓN POR CHANGE_ID
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. SINGLE READER: El flujo tiene un único dueño; la propiedad migra
 *    del suscriptor hacia el lector del Broker sin clones.
 * 2. FRAME DISCIPLINE: El framing NDJSON se reconstituye byte a byte
 *    sobre el flujo de cuerpos de reqwest; media línea jamás se emite.
 * 3. RESUME BY ID: 'resubscribe' reabre el mismo flujo desde un
 *    'change_id' conocido; el servidor puede repetir cambios >= a él.
 * =================================================================
 */

use futures_util::stream::BoxStream;
use futures_util::StreamExt;
use tracing::{debug, instrument};

use crate::client::{CorrosionClient, Statement};
use crate::errors::RegistryError;
use crate::events::{parse_event_line, QueryEvent};

/// Cabecera de respuesta que transporta el identificador del flujo.
const SUBSCRIPTION_ID_HEADER: &str = "corro-query-id";

/// Flujo vivo de eventos de una suscripción del registro.
pub struct SubscriptionStream {
    subscription_id: String,
    body_stream: BoxStream<'static, reqwest::Result<bytes::Bytes>>,
    line_buffer: Vec<u8>,
    exhausted: bool,
}

impl SubscriptionStream {
    /// Identificador opaco del flujo, para reanudaciones posteriores.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.subscription_id
    }

    /**
     * Siguiente evento del flujo; `None` cuando el servidor lo cierra.
     *
     * # Errors:
     * - `RegistryError::Transport`: corte del enlace físico.
     * - `RegistryError::Decode`: trama fuera del contrato.
     */
    pub async fn next_event(&mut self) -> Result<Option<QueryEvent>, RegistryError> {
        loop {
            if let Some(line) = self.take_buffered_line() {
                if line.trim().is_empty() {
                    continue;
                }
                return parse_event_line(&line).map(Some);
            }

            if self.exhausted {
                return Ok(None);
            }

            match self.body_stream.next().await {
                Some(Ok(chunk)) => self.line_buffer.extend_from_slice(&chunk),
                Some(Err(transport_fault)) => return Err(RegistryError::Transport(transport_fault)),
                None => {
                    self.exhausted = true;
                    // El residuo sin salto de línea final se descarta: una
                    // trama JSON truncada no es recuperable.
                    self.line_buffer.clear();
                }
            }
        }
    }

    fn take_buffered_line(&mut self) -> Option<String> {
        let newline_position = self.line_buffer.iter().position(|byte| *byte == b'\n')?;
        let mut line_bytes: Vec<u8> = self.line_buffer.drain(..=newline_position).collect();
        line_bytes.pop();
        Some(String::from_utf8_lossy(&line_bytes).into_owned())
    }
}

impl CorrosionClient {
    /**
     * Abre una suscripción de larga vida sobre la consulta dada.
     *
     * El flujo entrega: un evento de columnas, cero o más filas de
     * snapshot, un fin de consulta con 'change_id' y después cambios.
     *
     * # Errors:
     * - `RegistryError::MissingSubscriptionId`: respuesta sin cabecera.
     * - `RegistryError::Rejected` / `Transport`.
     */
    #[instrument(skip(self, params))]
    pub async fn subscribe(
        &self,
        query: &str,
        params: Vec<serde_json::Value>,
    ) -> Result<SubscriptionStream, RegistryError> {
        let builder = self
            .request_builder(reqwest::Method::POST, "/v1/subscriptions")
            .json(&Statement::new(query, params));
        let response = self.send_raw(builder).await?;

        let subscription_id = response
            .headers()
            .get(SUBSCRIPTION_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string)
            .ok_or(RegistryError::MissingSubscriptionId)?;

        debug!("📡 [SUBSCRIPTION_OPEN]: Stream [{}] established.", subscription_id);

        Ok(SubscriptionStream {
            subscription_id,
            body_stream: response.bytes_stream().boxed(),
            line_buffer: Vec::new(),
            exhausted: false,
        })
    }

    /**
     * Reanuda un flujo previamente abierto desde un 'change_id' conocido.
     * El servidor puede entregar cualquier cantidad de cambios >= a él.
     *
     * # Errors:
     * - `RegistryError::Rejected` / `Transport`.
     */
    #[instrument(skip(self))]
    pub async fn resubscribe(
        &self,
        subscription_id: &str,
        from_change: i64,
    ) -> Result<SubscriptionStream, RegistryError> {
        let path = format!("/v1/subscriptions/{subscription_id}?from={from_change}");
        let builder = self.request_builder(reqwest::Method::GET, &path);
        let response = self.send_raw(builder).await?;

        debug!(
            "📡 [SUBSCRIPTION_RESUME]: Stream [{}] resumed from change {}.",
            subscription_id, from_change
        );

        Ok(SubscriptionStream {
            subscription_id: subscription_id.to_string(),
            body_stream: response.bytes_stream().boxed(),
            line_buffer: Vec::new(),
            exhausted: false,
        })
    }
}
