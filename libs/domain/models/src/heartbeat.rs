// [libs/domain/models/src/heartbeat.rs]

use serde::{Deserialize, Serialize};

/// Latido replicado de un nodo de la malla. Una fila por nodo.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeartbeatRow {
    /// Identidad del nodo (su clave pública WireGuard).
    pub node_id: String,
    /// Secuencia monótona; arranca en 1 y crece en cada latido.
    pub seq: i64,
    /// RFC3339 del último latido observado.
    pub updated_at: String,
}
