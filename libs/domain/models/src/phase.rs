// [libs/domain/models/src/phase.rs]
/*!
 * =================================================================
 * APARATO: NETWORK RUNTIME PHASE MACHINE (V7.0 - LIFECYCLE MASTER)
 * CLASIFICACIÓN: DOMAIN CONTRACT (ESTRATO L2)
 * RESPONSABILIDAD: GOBERNANZA DEL CICLO DE VIDA DE LA RED EN UN HOST
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. TABLA LEGAL EXPLÍCITA: Cada transición permitida está codificada
 *    en un match exhaustivo; lo no listado es rechazado sin mutación.
 * 2. NOMINAL PARITY: Los rótulos persistidos en 'network_state' son
 *    estables y minúsculos para sobrevivir migraciones del ledger.
 * =================================================================
 */

use serde::{Deserialize, Serialize};

use crate::errors::ModelError;

/// Fase del ciclo de vida de una red sobre un host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Unconfigured,
    Stopped,
    Starting,
    Running,
    Stopping,
    Purged,
    Failed,
}

impl Phase {
    /**
     * Consulta la tabla legal de transiciones.
     *
     * Una auto-transición (misma fase) se considera ilegal: el llamador
     * no debe re-aplicar un estado que ya posee.
     */
    #[must_use]
    pub fn can_transition(self, destination: Phase) -> bool {
        use Phase::*;
        matches!(
            (self, destination),
            (Unconfigured, Starting)
                | (Unconfigured, Purged)
                | (Stopped, Starting)
                | (Stopped, Purged)
                | (Starting, Running)
                | (Starting, Stopping)
                | (Starting, Failed)
                | (Running, Stopping)
                | (Running, Failed)
                | (Stopping, Stopped)
                | (Stopping, Purged)
                | (Stopping, Failed)
                | (Purged, Starting)
                | (Failed, Starting)
                | (Failed, Stopping)
                | (Failed, Purged)
        )
    }

    /// Rótulo estable para la persistencia en el ledger local.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Unconfigured => "unconfigured",
            Phase::Stopped => "stopped",
            Phase::Starting => "starting",
            Phase::Running => "running",
            Phase::Stopping => "stopping",
            Phase::Purged => "purged",
            Phase::Failed => "failed",
        }
    }

    /**
     * Reconstruye la fase desde un rótulo persistido.
     *
     * # Errors:
     * - `ModelError::UnknownPhaseLabel`: Si el ledger contiene un rótulo
     *   fuera del alfabeto conocido (deriva de esquema).
     */
    pub fn parse(label: &str) -> Result<Self, ModelError> {
        match label {
            "unconfigured" => Ok(Phase::Unconfigured),
            "stopped" => Ok(Phase::Stopped),
            "starting" => Ok(Phase::Starting),
            "running" => Ok(Phase::Running),
            "stopping" => Ok(Phase::Stopping),
            "purged" => Ok(Phase::Purged),
            "failed" => Ok(Phase::Failed),
            other => Err(ModelError::UnknownPhaseLabel(other.to_string())),
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.as_str())
    }
}
