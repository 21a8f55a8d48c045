// [libs/infra/registry/src/errors.rs]
/*!
 * =================================================================
 * APARATO: REGISTRY ERROR CATALOG (V6.0 - SOBERANO)
 * CLASIFICACIÓN: INFRASTRUCTURE CORE (ESTRATO L3)
 * RESPONSABILIDAD: CATALOGACIÓN SEMÁNTICA DE FALLOS DEL REGISTRO
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. TRIAGE PROGRAMÁTICO: 'Conflict' es el único variante retryable por
 *    contrato; el resto exige decisión del llamador.
 * 2. PANOPTICON COMPLIANCE: Mensajes con prefijo de estrato para el
 *    renderizado cromático en el HUD del operador.
 * =================================================================
 */

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RegistryError {
    /// Error de enlace físico o de red con el nodo Corrosion local.
    #[error("[L3_REGISTRY_NET_FAULT]: REGISTRY_UPLINK_SEVERED -> {0}")]
    Transport(#[from] reqwest::Error),

    /// El registro rechazó la petición HTTP con un estado no exitoso.
    #[error("[L3_REGISTRY_FAULT]: REQUEST_REJECTED -> status {status}: {body}")]
    Rejected { status: u16, body: String },

    /// Una sentencia individual dentro de la transacción reportó error.
    #[error("[L3_REGISTRY_FAULT]: STATEMENT_REJECTED -> {0}")]
    Statement(String),

    /// Trama de evento o celda que no decodifica al contrato esperado.
    #[error("[L3_REGISTRY_DECODE_FAULT]: EVENT_CORRUPTION -> {0}")]
    Decode(String),

    /// La respuesta de suscripción llegó sin el identificador de flujo.
    #[error("[L3_REGISTRY_FAULT]: SUBSCRIPTION_ID_MISSING")]
    MissingSubscriptionId,

    /// El flujo de suscripción terminó del lado del servidor.
    #[error("[L3_REGISTRY_FAULT]: SUBSCRIPTION_STREAM_CLOSED")]
    StreamClosed,

    /// Concurrencia optimista: otra escritura ganó la carrera de versión.
    #[error(
        "[L3_REGISTRY_CONFLICT]: VERSION_CAS_REJECTED -> row '{id}' expected v{expected}, stored v{stored}"
    )]
    Conflict { id: String, expected: i64, stored: i64 },

    /// El CIDR pedido contradice el ya sellado para la red en el registro.
    #[error(
        "[L3_REGISTRY_CONFLICT]: NETWORK_CIDR_MISMATCH -> network '{network}' stored {stored}, requested {requested}"
    )]
    CidrMismatch { network: String, stored: String, requested: String },

    /// El registro no respondió dentro de la ventana de preparación.
    #[error("[L3_REGISTRY_FAULT]: REGISTRY_NOT_READY -> {0}")]
    NotReady(String),
}
