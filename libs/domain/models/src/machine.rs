// [libs/domain/models/src/machine.rs]

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/**
 * Fila del registro replicado que describe una máquina de la malla.
 *
 * Los campos de red viajan como texto tal y como los serializa el
 * registro; el estrato de proyección ('build_peer_specs') es el único
 * autorizado a convertirlos en tipos de red estrictos.
 */
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MachineRow {
    /// Identidad de la máquina; por contrato es igual a 'public_key'.
    pub id: String,
    pub public_key: String,
    /// Subred IPv4 asignada (`10.210.7.0/24`).
    pub subnet: String,
    /// IPv6 de gestión derivada de 'public_key'.
    pub management_ip: String,
    /// Punto de contacto WireGuard anunciado (`host:puerto`), opcional.
    pub endpoint: Option<String>,
    /// RFC3339 con nanosegundos, asignado por el escritor.
    pub updated_at: String,
    /// Contador monótono de versión; arranca en 1.
    pub version: i64,
}

impl MachineRow {
    /// Proyección no persistida hacia la entrada WireGuard de esta máquina.
    #[must_use]
    pub fn to_peer(&self) -> Peer {
        Peer {
            public_key: self.public_key.clone(),
            endpoint: self.endpoint.clone(),
            management_ip: self.management_ip.clone(),
            subnet: self.subnet.clone(),
        }
    }

    /// Compara únicamente las columnas de valor (ignora versión y reloj).
    #[must_use]
    pub fn value_columns_equal(&self, other: &MachineRow) -> bool {
        self.id == other.id
            && self.public_key == other.public_key
            && self.subnet == other.subnet
            && self.management_ip == other.management_ip
            && self.endpoint == other.endpoint
    }

    /// Marca temporal RFC3339 con nanosegundos para la columna 'updated_at'.
    #[must_use]
    pub fn format_updated_at(instant: DateTime<Utc>) -> String {
        instant.to_rfc3339_opts(SecondsFormat::Nanos, true)
    }
}

/// Proyección derivada de una 'MachineRow' remota, entrada del estrato WireGuard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Peer {
    pub public_key: String,
    pub endpoint: Option<String>,
    pub management_ip: String,
    pub subnet: String,
}
