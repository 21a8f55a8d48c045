// [libs/domain/models/src/errors.rs]
//! =================================================================
//! APARATO: DOMAIN MODEL ERROR CATALOG (V4.1 - SOBERANO)
//! RESPONSABILIDAD: CATALOGACIÓN SEMÁNTICA DE FALLOS DE VALIDACIÓN
//! =================================================================

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ModelError {
    /// Transición de fase fuera de la tabla legal de la máquina de estados.
    #[error("[L2_PHASE_FAULT]: ILLEGAL_TRANSITION -> {from} => {to}")]
    IllegalPhaseTransition { from: String, to: String },

    /// El identificador de red viola el contrato nominal ([a-z0-9-], <= 32).
    #[error("[L2_CONFIG_FAULT]: INVALID_NETWORK_IDENTIFIER -> {0}")]
    InvalidNetworkIdentifier(String),

    /// El nombre de interfaz WireGuard viola el contrato (prefijo 'plz-', <= 15).
    #[error("[L2_CONFIG_FAULT]: INVALID_INTERFACE_NAME -> {0}")]
    InvalidInterfaceName(String),

    /// La subred solicitada no pertenece al CIDR de la red.
    #[error("[L2_CONFIG_FAULT]: SUBNET_OUTSIDE_CIDR -> {subnet} not within {cidr}")]
    SubnetOutsideCidr { subnet: String, cidr: String },

    /// Una fase persistida no pertenece al alfabeto conocido.
    #[error("[L2_PHASE_FAULT]: UNKNOWN_PHASE_LABEL -> {0}")]
    UnknownPhaseLabel(String),
}
