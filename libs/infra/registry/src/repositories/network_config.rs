// [libs/infra/registry/src/repositories/network_config.rs]
/*!
 * =================================================================
 * APARATO: NETWORK CONFIG REPOSITORY (V6.2 - CIDR SEAL)
 * CLASIFICACIÓN: INFRASTRUCTURE ADAPTER (ESTRATO L3)
 * RESPONSABILIDAD: SELLADO ATÓMICO DE AJUSTES REPLICADOS POR RED
 *
 * # Mathematical Proof (First Writer Wins):
 * El INSERT con 'ON CONFLICT DO NOTHING' seguido de relectura convierte
 * la carrera de N agentes que arrancan a la vez en una elección
 * determinista: el primer escritor sella el CIDR y el resto adopta (o
 * rechaza con conflicto explícito) el valor sellado.
 * =================================================================
 */

use chrono::{SecondsFormat, Utc};
use ipnet::Ipv4Net;
use serde_json::json;
use tracing::{debug, instrument};

use crate::client::{CorrosionClient, Statement};
use crate::decode::cell_text;
use crate::errors::RegistryError;
use crate::schema::NETWORK_CONFIG_DDL;

/// Clave del CIDR de la red dentro del almacén de ajustes.
const CIDR_KEY: &str = "cidr";

/// Vista tipada de la tabla 'network_config' del registro replicado.
#[derive(Debug, Clone)]
pub struct NetworkConfigRepo {
    registry_client: CorrosionClient,
}

impl NetworkConfigRepo {
    #[must_use]
    pub fn new(registry_client: CorrosionClient) -> Self {
        Self { registry_client }
    }

    /// Aplica el DDL aditivo de la tabla.
    pub async fn ensure_table(&self) -> Result<(), RegistryError> {
        self.registry_client.apply_migrations(&[NETWORK_CONFIG_DDL]).await
    }

    /**
     * Garantiza el CIDR sellado de la red.
     *
     * - Si ya existe un valor: lo devuelve, y rechaza con conflicto si
     *   'requested' discrepa de él.
     * - Si no existe: elige `requested || fallback || default_cidr` y lo
     *   sella de forma atómica (el primer escritor gana).
     *
     * # Errors:
     * - `RegistryError::CidrMismatch`: petición contra valor sellado.
     * - `RegistryError::Decode`: valor sellado que no parsea.
     */
    #[instrument(skip(self))]
    pub async fn ensure_network_cidr(
        &self,
        network: &str,
        requested: Option<Ipv4Net>,
        fallback: Option<Ipv4Net>,
        default_cidr: Ipv4Net,
    ) -> Result<Ipv4Net, RegistryError> {
        if let Some(sealed) = self.read_cidr(network).await? {
            return reconcile_sealed(network, sealed, requested);
        }

        let chosen = requested.or(fallback).unwrap_or(default_cidr);
        self.registry_client
            .exec(&[Statement::new(
                "INSERT INTO network_config (network, key, value, updated_at) VALUES (?, ?, ?, ?) \
                 ON CONFLICT (network, key) DO NOTHING",
                vec![
                    json!(network),
                    json!(CIDR_KEY),
                    json!(chosen.to_string()),
                    json!(Utc::now().to_rfc3339_opts(SecondsFormat::Nanos, true)),
                ],
            )])
            .await?;

        // Relectura: si otro agente ganó la carrera, su valor es ley.
        let sealed = self.read_cidr(network).await?.ok_or_else(|| {
            RegistryError::Decode(format!("network '{network}' cidr vanished after seal"))
        })?;

        debug!("🔏 [NETWORK_CONFIG]: CIDR {} sealed for network '{}'.", sealed, network);
        reconcile_sealed(network, sealed, requested)
    }

    async fn read_cidr(&self, network: &str) -> Result<Option<Ipv4Net>, RegistryError> {
        let rows = self
            .registry_client
            .query(
                "SELECT value FROM network_config WHERE network = ? AND key = ?",
                vec![json!(network), json!(CIDR_KEY)],
            )
            .await?;

        let Some(cells) = rows.first() else {
            return Ok(None);
        };

        let wire = cell_text(cells, 0);
        let parsed = wire.parse::<Ipv4Net>().map_err(|_| {
            RegistryError::Decode(format!("sealed cidr for '{network}' is malformed: {wire}"))
        })?;
        Ok(Some(parsed))
    }
}

fn reconcile_sealed(
    network: &str,
    sealed: Ipv4Net,
    requested: Option<Ipv4Net>,
) -> Result<Ipv4Net, RegistryError> {
    match requested {
        Some(asked) if asked != sealed => Err(RegistryError::CidrMismatch {
            network: network.to_string(),
            stored: sealed.to_string(),
            requested: asked.to_string(),
        }),
        _ => Ok(sealed),
    }
}
