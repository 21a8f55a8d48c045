// [libs/core/overlay/src/errors.rs]
//! =================================================================
//! APARATO: OVERLAY ERROR CATALOG (V5.0 - SOBERANO)
//! RESPONSABILIDAD: CATALOGACIÓN SEMÁNTICA DE FALLOS DE GEOMETRÍA
//! =================================================================

use thiserror::Error;

/// Catálogo de fallos del estrato matemático de la malla.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OverlayError {
    /// Clave WireGuard que no decodifica a 32 bytes base64.
    #[error("[L1_OVERLAY_FAULT]: MALFORMED_WIREGUARD_KEY -> {0}")]
    MalformedKey(String),

    /// Prefijo o dirección de red que no parsea.
    #[error("[L1_OVERLAY_FAULT]: MALFORMED_PREFIX -> {field}: {value}")]
    MalformedPrefix {
        /// Columna de la fila que transportaba el valor ilegal.
        field: &'static str,
        /// Valor de alambre rechazado.
        value: String,
    },

    /// Punto de contacto que no parsea como `ip:puerto`.
    #[error("[L1_OVERLAY_FAULT]: MALFORMED_ENDPOINT -> {0}")]
    MalformedEndpoint(String),

    /// El CIDR de la red no admite subredes /24.
    #[error("[L1_OVERLAY_FAULT]: CIDR_TOO_NARROW -> {0}")]
    CidrTooNarrow(String),

    /// El CIDR de la red está agotado; no quedan /24 libres.
    #[error("[L1_OVERLAY_FAULT]: CIDR_EXHAUSTED -> {0}")]
    CidrExhausted(String),

    /// Dos redes del mismo host reclaman rangos que se solapan.
    #[error(
        "[L1_OVERLAY_FAULT]: CIDR_OVERLAP -> network '{candidate_network}' ({candidate_cidr}) \
         overlaps network '{existing_network}' ({existing_cidr})"
    )]
    CidrOverlap {
        /// Red que intenta arrancar.
        candidate_network: String,
        /// Rango solicitado por la red candidata.
        candidate_cidr: String,
        /// Red ya presente en el host.
        existing_network: String,
        /// Rango ya reclamado.
        existing_cidr: String,
    },
}
