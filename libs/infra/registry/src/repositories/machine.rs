// [libs/infra/registry/src/repositories/machine.rs]
/*!
 * =================================================================
 * APARATO: MACHINE MEMBERSHIP REPOSITORY (V6.5 - CAS AUTHORITY)
 * CLASIFICACIÓN: INFRASTRUCTURE ADAPTER (ESTRATO L3)
 * RESPONSABILIDAD: PERTENENCIA DE LA MALLA CON CONCURRENCIA OPTIMISTA
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. CAS DETERMINISTA: El túnel de transacciones no reporta filas
 *    afectadas, así que el UPDATE con guardia de versión se confirma
 *    con una relectura; de N escritores concurrentes gana exactamente
 *    uno y el resto observa 'Conflict'.
 * 2. DERIVED IDENTITY: Toda escritura recalcula 'management_ip' desde
 *    la clave pública; una fila violada se corrige al persistir.
 * 3. NOOP SHIELD: Columnas de valor idénticas cortocircuitan la
 *    escritura sin consumir versión.
 * =================================================================
 */

use serde_json::{json, Value};
use tracing::{debug, instrument};

use ployz_core_overlay::{management_ip_from_key, WgKey};
use ployz_domain_models::MachineRow;

use crate::client::{CorrosionClient, Statement};
use crate::decode::{cell_i64_or, cell_opt_text, cell_text};
use crate::errors::RegistryError;
use crate::schema::MACHINES_DDL;

/// Consulta canónica de filas de máquina (snapshot y suscripción).
pub const MACHINES_SELECT: &str =
    "SELECT id, public_key, subnet, management_ip, endpoint, updated_at, version FROM machines";

/// Decisión pura del upsert frente al estado almacenado.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpsertPlan {
    /// Columnas de valor idénticas; no se escribe ni se consume versión.
    Noop { version: i64 },
    /// Fila ausente; se inserta con versión 1.
    Insert,
    /// Fila presente; UPDATE con guardia sobre la versión almacenada.
    Update { guard_version: i64 },
}

/**
 * Decide el plan de escritura del upsert sin tocar el registro.
 *
 * Orden del contrato: igualdad de columnas de valor primero (no-op),
 * después la guardia de versión esperada, después la escritura.
 *
 * # Errors:
 * - `RegistryError::Conflict`: versión esperada no nula que difiere de
 *   la almacenada (0 si la fila no existe).
 */
pub fn plan_upsert(
    stored: Option<&MachineRow>,
    incoming: &MachineRow,
    expected_version: i64,
) -> Result<UpsertPlan, RegistryError> {
    match stored {
        Some(stored_row) if stored_row.value_columns_equal(incoming) => Ok(UpsertPlan::Noop {
            version: stored_row.version,
        }),
        Some(stored_row) => {
            if expected_version != 0 && stored_row.version != expected_version {
                return Err(RegistryError::Conflict {
                    id: incoming.id.clone(),
                    expected: expected_version,
                    stored: stored_row.version,
                });
            }
            Ok(UpsertPlan::Update { guard_version: stored_row.version })
        }
        None => {
            if expected_version != 0 {
                return Err(RegistryError::Conflict {
                    id: incoming.id.clone(),
                    expected: expected_version,
                    stored: 0,
                });
            }
            Ok(UpsertPlan::Insert)
        }
    }
}

/// Decodifica una fila de máquina desde las celdas del alambre.
pub fn decode_machine_row(cells: &[Value]) -> Result<MachineRow, RegistryError> {
    Ok(MachineRow {
        id: cell_text(cells, 0),
        public_key: cell_text(cells, 1),
        subnet: cell_text(cells, 2),
        management_ip: cell_text(cells, 3),
        endpoint: cell_opt_text(cells, 4),
        updated_at: cell_text(cells, 5),
        // Filas legadas sin columna de versión degradan a 1.
        version: cell_i64_or(cells, 6, 1),
    })
}

/// Vista tipada de la tabla 'machines' del registro replicado.
#[derive(Debug, Clone)]
pub struct MachineRepo {
    registry_client: CorrosionClient,
}

impl MachineRepo {
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
        self.registry_client.apply_migrations(&[MACHINES_DDL]).await
    }

    /**
     * Upsert con concurrencia optimista sobre 'version'.
     *
     * Devuelve la versión finalmente almacenada. Corrige la identidad
     * derivada ('id' = clave pública, 'management_ip' = derivación) antes
     * de escribir.
     *
     * # Errors:
     * - `RegistryError::Conflict`: otra escritura ganó la carrera.
     * - `RegistryError::Decode`: clave pública que no parsea.
     */
    #[instrument(skip(self, row), fields(machine = %row.public_key))]
    pub async fn upsert_machine(
        &self,
        row: &MachineRow,
        expected_version: i64,
    ) -> Result<i64, RegistryError> {
        let corrected = correct_derived_identity(row)?;
        let stored = self.find_machine(&corrected.id).await?;

        match plan_upsert(stored.as_ref(), &corrected, expected_version)? {
            UpsertPlan::Noop { version } => {
                debug!("💤 [MACHINE_UPSERT]: Value columns unchanged; version {} kept.", version);
                Ok(version)
            }
            UpsertPlan::Insert => self.execute_insert(&corrected, expected_version).await,
            UpsertPlan::Update { guard_version } => {
                self.execute_guarded_update(&corrected, guard_version, expected_version).await
            }
        }
    }

    /// Elimina la fila de la máquina indicada.
    #[instrument(skip(self))]
    pub async fn delete_machine(&self, machine_id: &str) -> Result<(), RegistryError> {
        self.registry_client
            .exec(&[Statement::new(
                "DELETE FROM machines WHERE id = ?",
                vec![json!(machine_id)],
            )])
            .await
    }

    /**
     * Expulsa filas fantasma que reclaman el mismo punto de contacto:
     * una máquina re-aprovisionada conserva su endpoint pero estrena
     * clave, y la fila vieja debe abandonar la malla.
     */
    #[instrument(skip(self))]
    pub async fn delete_by_endpoint_except_id(
        &self,
        endpoint: &str,
        keep_machine_id: &str,
    ) -> Result<(), RegistryError> {
        self.registry_client
            .exec(&[Statement::new(
                "DELETE FROM machines WHERE endpoint = ? AND id != ?",
                vec![json!(endpoint), json!(keep_machine_id)],
            )])
            .await
    }

    /// Lista completa de filas de máquina.
    pub async fn list_machine_rows(&self) -> Result<Vec<MachineRow>, RegistryError> {
        let rows = self.registry_client.query(MACHINES_SELECT, vec![]).await?;
        rows.iter().map(|cells| decode_machine_row(cells)).collect()
    }

    /// Abre el flujo vivo del tópico de máquinas (snapshot + cambios).
    pub async fn subscribe_machines(
        &self,
    ) -> Result<crate::subscription::SubscriptionStream, RegistryError> {
        self.registry_client.subscribe(MACHINES_SELECT, vec![]).await
    }

    /// Busca una fila por identidad.
    pub async fn find_machine(&self, machine_id: &str) -> Result<Option<MachineRow>, RegistryError> {
        let rows = self
            .registry_client
            .query(
                "SELECT id, public_key, subnet, management_ip, endpoint, updated_at, version \
                 FROM machines WHERE id = ?",
                vec![json!(machine_id)],
            )
            .await?;

        rows.first().map(|cells| decode_machine_row(cells)).transpose()
    }

    async fn execute_insert(
        &self,
        row: &MachineRow,
        expected_version: i64,
    ) -> Result<i64, RegistryError> {
        self.registry_client
            .exec(&[Statement::new(
                "INSERT INTO machines (id, public_key, subnet, management_ip, endpoint, updated_at, version) \
                 VALUES (?, ?, ?, ?, ?, ?, 1) ON CONFLICT (id) DO NOTHING",
                vec![
                    json!(row.id),
                    json!(row.public_key),
                    json!(row.subnet),
                    json!(row.management_ip),
                    json!(row.endpoint.clone().unwrap_or_default()),
                    json!(row.updated_at),
                ],
            )])
            .await?;

        self.confirm_write(row, expected_version).await
    }

    async fn execute_guarded_update(
        &self,
        row: &MachineRow,
        guard_version: i64,
        expected_version: i64,
    ) -> Result<i64, RegistryError> {
        self.registry_client
            .exec(&[Statement::new(
                "UPDATE machines SET public_key = ?, subnet = ?, management_ip = ?, endpoint = ?, \
                 updated_at = ?, version = version + 1 WHERE id = ? AND version = ?",
                vec![
                    json!(row.public_key),
                    json!(row.subnet),
                    json!(row.management_ip),
                    json!(row.endpoint.clone().unwrap_or_default()),
                    json!(row.updated_at),
                    json!(row.id),
                    json!(guard_version),
                ],
            )])
            .await?;

        self.confirm_write(row, expected_version).await
    }

    /**
     * Relectura de confirmación del CAS: la escritura es nuestra si y
     * solo si las columnas de valor almacenadas coinciden con lo enviado.
     */
    async fn confirm_write(
        &self,
        row: &MachineRow,
        expected_version: i64,
    ) -> Result<i64, RegistryError> {
        let stored = self.find_machine(&row.id).await?.ok_or_else(|| {
            RegistryError::Conflict { id: row.id.clone(), expected: expected_version, stored: 0 }
        })?;

        if stored.value_columns_equal(row) {
            Ok(stored.version)
        } else {
            Err(RegistryError::Conflict {
                id: row.id.clone(),
                expected: expected_version,
                stored: stored.version,
            })
        }
    }
}

fn correct_derived_identity(row: &MachineRow) -> Result<MachineRow, RegistryError> {
    let public_key = WgKey::parse(&row.public_key)
        .map_err(|fault| RegistryError::Decode(fault.to_string()))?;

    let mut corrected = row.clone();
    corrected.id = row.public_key.clone();
    corrected.management_ip = management_ip_from_key(&public_key).to_string();
    Ok(corrected)
}
