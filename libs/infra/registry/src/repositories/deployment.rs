// [libs/infra/registry/src/repositories/deployment.rs]
/*!
 * =================================================================
 * APARATO: DEPLOYMENT LEDGER REPOSITORY (V6.0 - APP STRATUM)
 * CLASIFICACIÓN: INFRASTRUCTURE ADAPTER (ESTRATO L3-APP)
 * RESPONSABILIDAD: DESPLIEGUES LÓGICOS CON CANDADO COOPERATIVO
 *
 * Superficie de capacidad de la capa de aplicación: versión que crece
 * en cada escritura efectiva, candado de propietario renovado por latido
 * y listas (etiquetas, máquinas) serializadas como JSON en texto.
 * =================================================================
 */

use chrono::{DateTime, Duration, SecondsFormat, Utc};
use serde_json::{json, Value};
use tracing::instrument;

use ployz_domain_models::DeploymentRow;

use crate::client::{CorrosionClient, Statement};
use crate::decode::{cell_i64_or, cell_opt_text, cell_text};
use crate::errors::RegistryError;
use crate::schema::DEPLOYMENTS_DDL;

/// Ventana tras la cual el candado de un propietario sin latido caduca.
const OWNER_LEASE_SECONDS: i64 = 30;

fn decode_deployment_row(cells: &[Value]) -> Result<DeploymentRow, RegistryError> {
    let labels_wire = cell_text(cells, 3);
    let machines_wire = cell_text(cells, 4);
    Ok(DeploymentRow {
        id: cell_text(cells, 0),
        name: cell_text(cells, 1),
        image: cell_text(cells, 2),
        labels: decode_json_list("labels", &labels_wire)?,
        machine_ids: decode_json_list("machine_ids", &machines_wire)?,
        owner: cell_opt_text(cells, 5),
        owner_heartbeat: cell_opt_text(cells, 6),
        version: cell_i64_or(cells, 7, 1),
        updated_at: cell_text(cells, 8),
    })
}

fn decode_json_list(field: &str, wire: &str) -> Result<Vec<String>, RegistryError> {
    if wire.is_empty() {
        return Ok(Vec::new());
    }
    serde_json::from_str(wire)
        .map_err(|fault| RegistryError::Decode(format!("deployment {field} list: {fault}")))
}

/// Vista tipada de la tabla 'deployments' del registro replicado.
#[derive(Debug, Clone)]
pub struct DeploymentRepo {
    registry_client: CorrosionClient,
}

impl DeploymentRepo {
    #[must_use]
    pub fn new(registry_client: CorrosionClient) -> Self {
        Self { registry_client }
    }

    /// Aplica el DDL aditivo de la tabla.
    pub async fn ensure_table(&self) -> Result<(), RegistryError> {
        self.registry_client.apply_migrations(&[DEPLOYMENTS_DDL]).await
    }

    /**
     * Upsert del despliegue con incremento de versión en cada escritura
     * efectiva; la guardia de versión sigue el mismo contrato que el
     * repositorio de máquinas.
     *
     * # Errors:
     * - `RegistryError::Conflict`: guardia de versión perdida.
     */
    #[instrument(skip(self, row), fields(deployment = %row.id))]
    pub async fn upsert_deployment(
        &self,
        row: &DeploymentRow,
        expected_version: i64,
    ) -> Result<i64, RegistryError> {
        let stored = self.find_deployment(&row.id).await?;
        let now = Utc::now().to_rfc3339_opts(SecondsFormat::Nanos, true);

        match &stored {
            Some(existing) if expected_version != 0 && existing.version != expected_version => {
                return Err(RegistryError::Conflict {
                    id: row.id.clone(),
                    expected: expected_version,
                    stored: existing.version,
                });
            }
            None if expected_version != 0 => {
                return Err(RegistryError::Conflict {
                    id: row.id.clone(),
                    expected: expected_version,
                    stored: 0,
                });
            }
            _ => {}
        }

        let labels_wire = serde_json::to_string(&row.labels)
            .map_err(|fault| RegistryError::Decode(fault.to_string()))?;
        let machines_wire = serde_json::to_string(&row.machine_ids)
            .map_err(|fault| RegistryError::Decode(fault.to_string()))?;

        match stored {
            Some(existing) => {
                self.registry_client
                    .exec(&[Statement::new(
                        "UPDATE deployments SET name = ?, image = ?, labels = ?, machine_ids = ?, \
                         updated_at = ?, version = version + 1 WHERE id = ? AND version = ?",
                        vec![
                            json!(row.name),
                            json!(row.image),
                            json!(labels_wire),
                            json!(machines_wire),
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
                        "INSERT INTO deployments (id, name, image, labels, machine_ids, owner, \
                         owner_heartbeat, version, updated_at) VALUES (?, ?, ?, ?, ?, '', '', 1, ?) \
                         ON CONFLICT (id) DO NOTHING",
                        vec![
                            json!(row.id),
                            json!(row.name),
                            json!(row.image),
                            json!(labels_wire),
                            json!(machines_wire),
                            json!(now),
                        ],
                    )])
                    .await?;
                Ok(1)
            }
        }
    }

    /**
     * Reclama el candado cooperativo del despliegue: procede si está
     * libre, si ya es nuestro, o si el latido del dueño anterior caducó.
     * Devuelve 'true' si el candado quedó a nombre del reclamante.
     */
    #[instrument(skip(self, now))]
    pub async fn claim_deployment(
        &self,
        deployment_id: &str,
        claimer: &str,
        now: DateTime<Utc>,
    ) -> Result<bool, RegistryError> {
        let stale_cutoff = (now - Duration::seconds(OWNER_LEASE_SECONDS))
            .to_rfc3339_opts(SecondsFormat::Nanos, true);
        let now_wire = now.to_rfc3339_opts(SecondsFormat::Nanos, true);

        self.registry_client
            .exec(&[Statement::new(
                "UPDATE deployments SET owner = ?, owner_heartbeat = ? \
                 WHERE id = ? AND (owner = '' OR owner = ? OR owner_heartbeat < ?)",
                vec![
                    json!(claimer),
                    json!(now_wire),
                    json!(deployment_id),
                    json!(claimer),
                    json!(stale_cutoff),
                ],
            )])
            .await?;

        let stored = self.find_deployment(deployment_id).await?;
        Ok(stored.is_some_and(|row| row.owner.as_deref() == Some(claimer)))
    }

    /// Renueva el latido del candado ya poseído.
    pub async fn bump_owner_heartbeat(
        &self,
        deployment_id: &str,
        owner: &str,
        now: DateTime<Utc>,
    ) -> Result<(), RegistryError> {
        self.registry_client
            .exec(&[Statement::new(
                "UPDATE deployments SET owner_heartbeat = ? WHERE id = ? AND owner = ?",
                vec![
                    json!(now.to_rfc3339_opts(SecondsFormat::Nanos, true)),
                    json!(deployment_id),
                    json!(owner),
                ],
            )])
            .await
    }

    /// Lista completa de despliegues.
    pub async fn list_deployments(&self) -> Result<Vec<DeploymentRow>, RegistryError> {
        let rows = self
            .registry_client
            .query(
                "SELECT id, name, image, labels, machine_ids, owner, owner_heartbeat, version, \
                 updated_at FROM deployments",
                vec![],
            )
            .await?;
        rows.iter().map(|cells| decode_deployment_row(cells)).collect()
    }

    /// Busca un despliegue por identidad.
    pub async fn find_deployment(
        &self,
        deployment_id: &str,
    ) -> Result<Option<DeploymentRow>, RegistryError> {
        let rows = self
            .registry_client
            .query(
                "SELECT id, name, image, labels, machine_ids, owner, owner_heartbeat, version, \
                 updated_at FROM deployments WHERE id = ?",
                vec![json!(deployment_id)],
            )
            .await?;
        rows.first().map(|cells| decode_deployment_row(cells)).transpose()
    }

    /// Elimina el despliegue indicado.
    pub async fn delete_deployment(&self, deployment_id: &str) -> Result<(), RegistryError> {
        self.registry_client
            .exec(&[Statement::new(
                "DELETE FROM deployments WHERE id = ?",
                vec![json!(deployment_id)],
            )])
            .await
    }
}
