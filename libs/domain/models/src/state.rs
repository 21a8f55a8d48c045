// [libs/domain/models/src/state.rs]

use std::net::Ipv6Addr;

use chrono::{DateTime, Utc};
use ipnet::Ipv4Net;
use serde::{Deserialize, Serialize};

use crate::errors::ModelError;
use crate::phase::Phase;

/**
 * Identidad persistida de una red sobre este host y su última condición
 * de runtime conocida. Una fila por red en la tabla 'network_state'.
 *
 * Invariantes custodiadas por el Controller:
 * - 'management_ip' se deriva siempre de 'wg_public_key'.
 * - 'subnet' pertenece siempre a 'network_cidr'.
 * - 'phase' solo muta a través de `transition`.
 */
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct State {
    pub network: String,
    pub network_cidr: Ipv4Net,
    pub subnet: Ipv4Net,
    pub management_ip: Ipv6Addr,
    pub advertise_endpoint: Option<String>,
    pub wg_interface: String,
    pub wg_port: u16,
    /// Clave privada WireGuard de la interfaz de malla (base64).
    pub wg_private_key: String,
    pub wg_public_key: String,
    /// Par de claves del host para el canal de ayuda privilegiado (base64).
    pub host_private_key: String,
    pub host_public_key: String,
    pub docker_network: String,
    pub corrosion_container: String,
    pub corrosion_image: String,
    pub corrosion_member_id: i64,
    pub corrosion_api_token: String,
    pub corrosion_bootstrap: Vec<String>,
    /// Pares aplicados en la última reconciliación efectiva.
    pub last_peer_count: i64,
    pub phase: Phase,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl State {
    /**
     * Aplica una transición de fase consultando la tabla legal.
     *
     * Ante una transición ilegal la fase actual queda intacta y el error
     * señala ambos extremos para el triaje del operador.
     *
     * # Errors:
     * - `ModelError::IllegalPhaseTransition`.
     */
    pub fn transition(&mut self, destination: Phase) -> Result<(), ModelError> {
        if !self.phase.can_transition(destination) {
            return Err(ModelError::IllegalPhaseTransition {
                from: self.phase.to_string(),
                to: destination.to_string(),
            });
        }
        self.phase = destination;
        Ok(())
    }
}
