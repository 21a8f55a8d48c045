// [libs/domain/control/src/errors.rs]
/*!
 * =================================================================
 * APARATO: CONTROL PLANE ERROR TAXONOMY (V6.0 - TRIAGE MASTER)
 * CLASIFICACIÓN: DOMAIN CONTRACT (ESTRATO L2)
 * RESPONSABILIDAD: TAXONOMÍA ÚNICA DE FALLOS DE LAS OPERACIONES
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. CINCO CLASES: Validation (estado intacto), Conflict (reintentable
 *    tras relectura), NotInitialized, Transient (I/O acotado) y Fatal
 *    (con pista de operador).
 * 2. SINGLE RECORDER: Solo la máquina de fases registra el fallo
 *    terminal escribiendo 'Failed' en el State; esta taxonomía viaja
 *    hacia el llamador sin desenrollado de excepciones.
 * =================================================================
 */

use thiserror::Error;

use ployz_core_overlay::OverlayError;
use ployz_domain_models::ModelError;
use ployz_infra_broker::BrokerError;
use ployz_infra_registry::RegistryError;

#[derive(Error, Debug)]
pub enum ControlError {
    /// Configuración malformada, CIDR solapado o transición ilegal.
    /// El State queda intacto.
    #[error("[L2_CONTROL_VALIDATION]: {0}")]
    Validation(String),

    /// Concurrencia optimista perdida; reintentable tras relectura.
    #[error("[L2_CONTROL_CONFLICT]: {0}")]
    Conflict(String),

    /// La operación requiere un State persistido que no existe.
    #[error("[L2_CONTROL_FAULT]: NETWORK_NOT_INITIALIZED -> {network}")]
    NotInitialized { network: String },

    /// Fallo de I/O acotado (HTTP, socket, subproceso).
    #[error("[L2_CONTROL_TRANSIENT]: {0}")]
    Transient(String),

    /// Fallo de plataforma irrecuperable, con pista para el operador.
    #[error("[L2_CONTROL_FATAL]: {message}{}", hint.as_deref().map(|h| format!(" (hint: {h})")).unwrap_or_default())]
    Fatal { message: String, hint: Option<String> },
}

impl ControlError {
    /// Fallo fatal con pista de operador.
    #[must_use]
    pub fn fatal(message: impl Into<String>, hint: impl Into<String>) -> Self {
        ControlError::Fatal { message: message.into(), hint: Some(hint.into()) }
    }
}

impl From<ModelError> for ControlError {
    fn from(fault: ModelError) -> Self {
        ControlError::Validation(fault.to_string())
    }
}

impl From<OverlayError> for ControlError {
    fn from(fault: OverlayError) -> Self {
        match fault {
            OverlayError::CidrOverlap { .. } => ControlError::Validation(fault.to_string()),
            other => ControlError::Validation(other.to_string()),
        }
    }
}

impl From<RegistryError> for ControlError {
    fn from(fault: RegistryError) -> Self {
        match fault {
            RegistryError::Conflict { .. } | RegistryError::CidrMismatch { .. } => {
                ControlError::Conflict(fault.to_string())
            }
            RegistryError::NotReady(_) => ControlError::fatal(
                fault.to_string(),
                "verify the corrosion container is healthy and its data directory writable",
            ),
            other => ControlError::Transient(other.to_string()),
        }
    }
}

impl From<BrokerError> for ControlError {
    fn from(fault: BrokerError) -> Self {
        match fault {
            BrokerError::Upstream(registry_fault) => ControlError::from(registry_fault),
            BrokerError::TopicClosed => ControlError::Transient(fault.to_string()),
        }
    }
}
