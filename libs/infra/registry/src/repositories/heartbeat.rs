// [libs/infra/registry/src/repositories/heartbeat.rs]
/*!
 * =================================================================
 * APARATO: NODE HEARTBEAT REPOSITORY (V6.1 - VITALITY LEDGER)
 * CLASIFICACIÓN: INFRASTRUCTURE ADAPTER (ESTRATO L3)
 * RESPONSABILIDAD: SECUENCIA MONÓTONA DE LATIDOS POR NODO
 * =================================================================
 */

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{json, Value};
use tracing::instrument;

use ployz_domain_models::HeartbeatRow;

use crate::client::{CorrosionClient, Statement};
use crate::decode::{cell_i64_or, cell_text};
use crate::errors::RegistryError;
use crate::schema::HEARTBEATS_DDL;

/// Consulta canónica de latidos (snapshot y suscripción).
pub const HEARTBEATS_SELECT: &str = "SELECT node_id, seq, updated_at FROM heartbeats";

/// Upsert del latido: la primera escritura sella seq = 1; cada una
/// posterior incrementa la secuencia y refresca el reloj.
const BUMP_HEARTBEAT_SQL: &str = "INSERT INTO heartbeats (node_id, seq, updated_at) VALUES (?, 1, ?) \
     ON CONFLICT (node_id) DO UPDATE SET \
     seq = heartbeats.seq + 1, updated_at = excluded.updated_at";

/// Decodifica una fila de latido desde las celdas del alambre.
pub fn decode_heartbeat_row(cells: &[Value]) -> Result<HeartbeatRow, RegistryError> {
    Ok(HeartbeatRow {
        node_id: cell_text(cells, 0),
        seq: cell_i64_or(cells, 1, 1),
        updated_at: cell_text(cells, 2),
    })
}

/// Vista tipada de la tabla 'heartbeats' del registro replicado.
#[derive(Debug, Clone)]
pub struct HeartbeatRepo {
    registry_client: CorrosionClient,
}

impl HeartbeatRepo {
    #[must_use]
    pub fn new(registry_client: CorrosionClient) -> Self {
        Self { registry_client }
    }

    /// Cliente subyacente, para abrir suscripciones del mismo tópico.
    #[must_use]
    pub fn client(&self) -> &CorrosionClient {
        &self.registry_client
    }

    /// Aplica el DDL aditivo de la tabla.
    pub async fn ensure_table(&self) -> Result<(), RegistryError> {
        self.registry_client.apply_migrations(&[HEARTBEATS_DDL]).await
    }

    /**
     * Publica un latido del nodo: la primera escritura sella seq = 1 y
     * cada una posterior incrementa la secuencia y refresca el reloj.
     *
     * # Errors:
     * - `RegistryError::Statement` / `Transport`.
     */
    #[instrument(skip(self, instant))]
    pub async fn bump_heartbeat(
        &self,
        node_id: &str,
        instant: DateTime<Utc>,
    ) -> Result<(), RegistryError> {
        self.registry_client
            .exec(&[Statement::new(
                BUMP_HEARTBEAT_SQL,
                vec![
                    json!(node_id),
                    json!(instant.to_rfc3339_opts(SecondsFormat::Nanos, true)),
                ],
            )])
            .await
    }

    /// Abre el flujo vivo del tópico de latidos (snapshot + cambios).
    pub async fn subscribe_heartbeats(
        &self,
    ) -> Result<crate::subscription::SubscriptionStream, RegistryError> {
        self.registry_client.subscribe(HEARTBEATS_SELECT, vec![]).await
    }

    /// Lista completa de latidos.
    pub async fn list_heartbeats(&self) -> Result<Vec<HeartbeatRow>, RegistryError> {
        let rows = self.registry_client.query(HEARTBEATS_SELECT, vec![]).await?;
        rows.iter().map(|cells| decode_heartbeat_row(cells)).collect()
    }
}
