// [libs/infra/registry/src/repositories/container.rs]
/*!
 * =================================================================
 * APARATO: CONTAINER LEDGER REPOSITORY (V6.0 - APP STRATUM)
 * CLASIFICACIÓN: INFRASTRUCTURE ADAPTER (ESTRATO L3-APP)
 * RESPONSABILIDAD: CONTENEDORES MATERIALIZADOS POR MÁQUINA
 * =================================================================
 */

use chrono::{SecondsFormat, Utc};
use serde_json::{json, Value};
use tracing::instrument;

use ployz_domain_models::ContainerRow;

use crate::client::{CorrosionClient, Statement};
use crate::decode::{cell_i64_or, cell_opt_text, cell_text};
use crate::errors::RegistryError;
use crate::schema::CONTAINERS_DDL;

const CONTAINERS_SELECT: &str =
    "SELECT id, deployment_id, machine_id, name, image, labels, state, owner, owner_heartbeat, \
     version, updated_at FROM containers";

fn decode_container_row(cells: &[Value]) -> Result<ContainerRow, RegistryError> {
    let labels_wire = cell_text(cells, 5);
    let labels = if labels_wire.is_empty() {
        Vec::new()
    } else {
        serde_json::from_str(&labels_wire)
            .map_err(|fault| RegistryError::Decode(format!("container labels list: {fault}")))?
    };

    Ok(ContainerRow {
        id: cell_text(cells, 0),
        deployment_id: cell_text(cells, 1),
        machine_id: cell_text(cells, 2),
        name: cell_text(cells, 3),
        image: cell_text(cells, 4),
        labels,
        state: cell_text(cells, 6),
        owner: cell_opt_text(cells, 7),
        owner_heartbeat: cell_opt_text(cells, 8),
        version: cell_i64_or(cells, 9, 1),
        updated_at: cell_text(cells, 10),
    })
}

/// Vista tipada de la tabla 'containers' del registro replicado.
#[derive(Debug, Clone)]
pub struct ContainerRepo {
    registry_client: CorrosionClient,
}

impl ContainerRepo {
    #[must_use]
    pub fn new(registry_client: CorrosionClient) -> Self {
        Self { registry_client }
    }

    /// Aplica el DDL aditivo de la tabla.
    pub async fn ensure_table(&self) -> Result<(), RegistryError> {
        self.registry_client.apply_migrations(&[CONTAINERS_DDL]).await
    }

    /**
     * Upsert del contenedor con incremento de versión en cada escritura
     * efectiva y guardia opcional sobre la versión esperada.
     *
     * # Errors:
     * - `RegistryError::Conflict`: guardia de versión perdida.
     */
    #[instrument(skip(self, row), fields(container = %row.id))]
    pub async fn upsert_container(
        &self,
        row: &ContainerRow,
        expected_version: i64,
    ) -> Result<i64, RegistryError> {
        let stored = self.find_container(&row.id).await?;
        let now = Utc::now().to_rfc3339_opts(SecondsFormat::Nanos, true);

        if let Some(existing) = &stored {
            if expected_version != 0 && existing.version != expected_version {
                return Err(RegistryError::Conflict {
                    id: row.id.clone(),
                    expected: expected_version,
                    stored: existing.version,
                });
            }
        } else if expected_version != 0 {
            return Err(RegistryError::Conflict {
                id: row.id.clone(),
                expected: expected_version,
                stored: 0,
            });
        }

        let labels_wire = serde_json::to_string(&row.labels)
            .map_err(|fault| RegistryError::Decode(fault.to_string()))?;

        match stored {
            Some(existing) => {
                self.registry_client
                    .exec(&[Statement::new(
                        "UPDATE containers SET deployment_id = ?, machine_id = ?, name = ?, \
                         image = ?, labels = ?, state = ?, updated_at = ?, version = version + 1 \
                         WHERE id = ? AND version = ?",
                        vec![
                            json!(row.deployment_id),
                            json!(row.machine_id),
                            json!(row.name),
                            json!(row.image),
                            json!(labels_wire),
                            json!(row.state),
                            json!(now),
                            json!(row.id),
                            json!(existing.version),
                        ],
                    )])
                    .await?;
                Ok(existing.version + 1)
            }
            None => {
                self.registry_client
                    .exec(&[Statement::new(
                        "INSERT INTO containers (id, deployment_id, machine_id, name, image, \
                         labels, state, owner, owner_heartbeat, version, updated_at) \
                         VALUES (?, ?, ?, ?, ?, ?, ?, '', '', 1, ?) ON CONFLICT (id) DO NOTHING",
                        vec![
                            json!(row.id),
                            json!(row.deployment_id),
                            json!(row.machine_id),
                            json!(row.name),
                            json!(row.image),
                            json!(labels_wire),
                            json!(row.state),
                            json!(now),
                        ],
                    )])
                    .await?;
                Ok(1)
            }
        }
    }

    /// Lista los contenedores asignados a una máquina.
    pub async fn list_by_machine(&self, machine_id: &str) -> Result<Vec<ContainerRow>, RegistryError> {
        let rows = self
            .registry_client
            .query(
                &format!("{CONTAINERS_SELECT} WHERE machine_id = ?"),
                vec![json!(machine_id)],
            )
            .await?;
        rows.iter().map(|cells| decode_container_row(cells)).collect()
    }

    /// Busca un contenedor por identidad.
    pub async fn find_container(&self, container_id: &str) -> Result<Option<ContainerRow>, RegistryError> {
        let rows = self
            .registry_client
            .query(
                &format!("{CONTAINERS_SELECT} WHERE id = ?"),
                vec![json!(container_id)],
            )
            .await?;
        rows.first().map(|cells| decode_container_row(cells)).transpose()
    }

    /// Elimina el contenedor indicado.
    pub async fn delete_container(&self, container_id: &str) -> Result<(), RegistryError> {
        self.registry_client
            .exec(&[Statement::new(
                "DELETE FROM containers WHERE id = ?",
                vec![json!(container_id)],
            )])
            .await
    }
}
