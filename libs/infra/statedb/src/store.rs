// [libs/infra/statedb/src/store.rs]
/*!
 * =================================================================
 * APARATO: NETWORK STATE LEDGER (V5.4 - MACHINE DB)
 * CLASIFICACIÓN: INFRASTRUCTURE ADAPTER (ESTRATO L3)
 * RESPONSABILIDAD: PERSISTENCIA LOCAL DE LA IDENTIDAD POR RED
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. ONE ROW PER NETWORK: 'network_state' vive en
 *    `<data_root>/../machine.db`, compartido por todas las redes del
 *    host; clave primaria 'network'.
 * 2. WAL DISCIPLINE: journal_mode=WAL y busy_timeout=5000 en cada
 *    apertura; escritores concurrentes esperan en vez de colapsar.
 * 3. MIGRATION ON LOAD: Una IPv6 de gestión con prefijo legado se
 *    corrige al cargar, antes de tocar a ningún consumidor.
 * =================================================================
 */

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use ipnet::Ipv4Net;
use libsql::{params, Builder, Connection, Database};
use tracing::{debug, info, instrument};

use ployz_core_overlay::migrate_legacy_management_addr;
use ployz_domain_control::{ControlError, StateStore};
use ployz_domain_models::{Phase, State};

use crate::errors::StateDbError;

/// DDL idempotente de la tabla de identidad por red.
const NETWORK_STATE_DDL: &str = r#"
    CREATE TABLE IF NOT EXISTS network_state (
        network TEXT PRIMARY KEY NOT NULL,
        network_cidr TEXT NOT NULL,
        subnet TEXT NOT NULL,
        management_ip TEXT NOT NULL,
        advertise_endpoint TEXT NOT NULL DEFAULT '',
        wg_interface TEXT NOT NULL,
        wg_port INTEGER NOT NULL,
        wg_private_key TEXT NOT NULL,
        wg_public_key TEXT NOT NULL,
        host_private_key TEXT NOT NULL,
        host_public_key TEXT NOT NULL,
        docker_network TEXT NOT NULL,
        corrosion_container TEXT NOT NULL,
        corrosion_image TEXT NOT NULL,
        corrosion_member_id INTEGER NOT NULL,
        corrosion_api_token TEXT NOT NULL,
        corrosion_bootstrap TEXT NOT NULL DEFAULT '[]',
        last_peer_count INTEGER NOT NULL DEFAULT 0,
        phase TEXT NOT NULL,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )
"#;

const STATE_COLUMNS: &str =
    "network, network_cidr, subnet, management_ip, advertise_endpoint, wg_interface, wg_port, \
     wg_private_key, wg_public_key, host_private_key, host_public_key, docker_network, \
     corrosion_container, corrosion_image, corrosion_member_id, corrosion_api_token, \
     corrosion_bootstrap, last_peer_count, phase, created_at, updated_at";

/// Ledger local del State por red sobre libSQL.
#[derive(Clone)]
pub struct StateDb {
    database: Arc<Database>,
    state_path: PathBuf,
}

impl StateDb {
    /**
     * Abre (o crea) el ledger `<data_root>/../machine.db`, aplica los
     * pragmas del contrato y el DDL idempotente.
     *
     * # Errors:
     * - `StateDbError::ConnectionError`: directorio o fichero inaccesible.
     */
    #[instrument]
    pub async fn open(data_root: &Path) -> Result<Self, StateDbError> {
        let state_path = machine_db_path(data_root);

        if let Some(ledger_parent) = state_path.parent() {
            tokio::fs::create_dir_all(ledger_parent).await.map_err(|io_fault| {
                StateDbError::ConnectionError(format!(
                    "cannot claim {}: {io_fault}",
                    ledger_parent.display()
                ))
            })?;
        }

        let ledger_location = state_path.to_string_lossy().into_owned();
        let database = Builder::new_local(ledger_location)
            .build()
            .await
            .map_err(|driver_fault| StateDbError::ConnectionError(driver_fault.to_string()))?;

        let connection = database
            .connect()
            .map_err(|driver_fault| StateDbError::ConnectionError(driver_fault.to_string()))?;

        // Pragmas del contrato: WAL + espera ante cerrojos concurrentes.
        connection.query("PRAGMA journal_mode=WAL", ()).await?;
        connection.query("PRAGMA busy_timeout=5000", ()).await?;
        connection.execute(NETWORK_STATE_DDL, ()).await?;

        info!("🗄️  [STATE_LEDGER]: machine.db ready at {}.", state_path.display());
        Ok(Self { database: Arc::new(database), state_path })
    }

    fn connection(&self) -> Result<Connection, StateDbError> {
        self.database
            .connect()
            .map_err(|driver_fault| StateDbError::ConnectionError(driver_fault.to_string()))
    }

    async fn load_row(&self, network: &str) -> Result<Option<State>, StateDbError> {
        let connection = self.connection()?;
        let mut rows = connection
            .query(
                &format!("SELECT {STATE_COLUMNS} FROM network_state WHERE network = ? LIMIT 1"),
                params![network],
            )
            .await?;

        match rows.next().await? {
            Some(row) => Ok(Some(decode_state_row(&row)?)),
            None => Ok(None),
        }
    }

    async fn save_row(&self, state: &State) -> Result<(), StateDbError> {
        let connection = self.connection()?;
        let bootstrap_wire = serde_json::to_string(&state.corrosion_bootstrap)
            .map_err(|fault| StateDbError::MappingError(fault.to_string()))?;

        connection
            .execute(
                &format!(
                    "INSERT INTO network_state ({STATE_COLUMNS}) \
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, \
                     ?16, ?17, ?18, ?19, ?20, ?21) \
                     ON CONFLICT (network) DO UPDATE SET \
                     network_cidr = excluded.network_cidr, subnet = excluded.subnet, \
                     management_ip = excluded.management_ip, \
                     advertise_endpoint = excluded.advertise_endpoint, \
                     wg_interface = excluded.wg_interface, wg_port = excluded.wg_port, \
                     wg_private_key = excluded.wg_private_key, \
                     wg_public_key = excluded.wg_public_key, \
                     host_private_key = excluded.host_private_key, \
                     host_public_key = excluded.host_public_key, \
                     docker_network = excluded.docker_network, \
                     corrosion_container = excluded.corrosion_container, \
                     corrosion_image = excluded.corrosion_image, \
                     corrosion_member_id = excluded.corrosion_member_id, \
                     corrosion_api_token = excluded.corrosion_api_token, \
                     corrosion_bootstrap = excluded.corrosion_bootstrap, \
                     last_peer_count = excluded.last_peer_count, \
                     phase = excluded.phase, updated_at = excluded.updated_at"
                ),
                params![
                    state.network.clone(),
                    state.network_cidr.to_string(),
                    state.subnet.to_string(),
                    state.management_ip.to_string(),
                    state.advertise_endpoint.clone().unwrap_or_default(),
                    state.wg_interface.clone(),
                    i64::from(state.wg_port),
                    state.wg_private_key.clone(),
                    state.wg_public_key.clone(),
                    state.host_private_key.clone(),
                    state.host_public_key.clone(),
                    state.docker_network.clone(),
                    state.corrosion_container.clone(),
                    state.corrosion_image.clone(),
                    state.corrosion_member_id,
                    state.corrosion_api_token.clone(),
                    bootstrap_wire,
                    state.last_peer_count,
                    state.phase.as_str(),
                    state.created_at.to_rfc3339_opts(SecondsFormat::Nanos, true),
                    state.updated_at.to_rfc3339_opts(SecondsFormat::Nanos, true),
                ],
            )
            .await?;

        debug!("💾 [STATE_SAVED]: Network '{}' phase '{}'.", state.network, state.phase);
        Ok(())
    }

    async fn delete_row(&self, network: &str) -> Result<(), StateDbError> {
        let connection = self.connection()?;
        connection
            .execute("DELETE FROM network_state WHERE network = ?", params![network])
            .await?;
        Ok(())
    }

    async fn list_rows(&self) -> Result<Vec<State>, StateDbError> {
        let connection = self.connection()?;
        let mut rows = connection
            .query(&format!("SELECT {STATE_COLUMNS} FROM network_state ORDER BY network"), ())
            .await?;

        let mut states = Vec::new();
        while let Some(row) = rows.next().await? {
            states.push(decode_state_row(&row)?);
        }
        Ok(states)
    }
}

#[async_trait]
impl StateStore for StateDb {
    async fn load(&self, network: &str) -> Result<Option<State>, ControlError> {
        Ok(self.load_row(network).await?)
    }

    async fn save(&self, state: &State) -> Result<(), ControlError> {
        Ok(self.save_row(state).await?)
    }

    async fn delete(&self, network: &str) -> Result<(), ControlError> {
        Ok(self.delete_row(network).await?)
    }

    async fn list(&self) -> Result<Vec<State>, ControlError> {
        Ok(self.list_rows().await?)
    }

    fn state_path(&self) -> PathBuf {
        self.state_path.clone()
    }
}

/// El ledger vive un nivel por encima de la raíz de datos de la red.
#[must_use]
pub fn machine_db_path(data_root: &Path) -> PathBuf {
    data_root
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| data_root.to_path_buf())
        .join("machine.db")
}

fn decode_state_row(row: &libsql::Row) -> Result<State, StateDbError> {
    let network: String = row.get(0)?;
    let network_cidr: String = row.get(1)?;
    let subnet: String = row.get(2)?;
    let management_ip: String = row.get(3)?;
    let advertise_endpoint: String = row.get(4)?;
    let wg_interface: String = row.get(5)?;
    let wg_port: i64 = row.get(6)?;
    let bootstrap_wire: String = row.get(16)?;
    let phase_label: String = row.get(18)?;
    let created_at: String = row.get(19)?;
    let updated_at: String = row.get(20)?;

    let management_parsed: std::net::Ipv6Addr = management_ip
        .parse()
        .map_err(|_| StateDbError::MappingError(format!("management_ip '{management_ip}'")))?;

    Ok(State {
        network_cidr: parse_net(&network_cidr, "network_cidr")?,
        subnet: parse_net(&subnet, "subnet")?,
        // Corrección del prefijo legado al cargar.
        management_ip: migrate_legacy_management_addr(management_parsed),
        advertise_endpoint: if advertise_endpoint.is_empty() {
            None
        } else {
            Some(advertise_endpoint)
        },
        wg_interface,
        wg_port: u16::try_from(wg_port)
            .map_err(|_| StateDbError::MappingError(format!("wg_port '{wg_port}'")))?,
        wg_private_key: row.get(7)?,
        wg_public_key: row.get(8)?,
        host_private_key: row.get(9)?,
        host_public_key: row.get(10)?,
        docker_network: row.get(11)?,
        corrosion_container: row.get(12)?,
        corrosion_image: row.get(13)?,
        corrosion_member_id: row.get(14)?,
        corrosion_api_token: row.get(15)?,
        corrosion_bootstrap: serde_json::from_str(&bootstrap_wire)
            .map_err(|fault| StateDbError::MappingError(format!("corrosion_bootstrap: {fault}")))?,
        last_peer_count: row.get(17)?,
        phase: Phase::parse(&phase_label)
            .map_err(|fault| StateDbError::MappingError(fault.to_string()))?,
        created_at: parse_instant(&created_at, "created_at")?,
        updated_at: parse_instant(&updated_at, "updated_at")?,
        network,
    })
}

fn parse_net(wire: &str, field: &str) -> Result<Ipv4Net, StateDbError> {
    wire.parse()
        .map_err(|_| StateDbError::MappingError(format!("{field} '{wire}'")))
}

fn parse_instant(wire: &str, field: &str) -> Result<DateTime<Utc>, StateDbError> {
    DateTime::parse_from_rfc3339(wire)
        .map(|instant| instant.with_timezone(&Utc))
        .map_err(|_| StateDbError::MappingError(format!("{field} '{wire}'")))
}
