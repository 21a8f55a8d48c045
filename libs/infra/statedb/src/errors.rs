// [libs/infra/statedb/src/errors.rs]
//! =================================================================
//! APARATO: LOCAL LEDGER ERROR CATALOG (V5.0 - SOBERANO)
//! RESPONSABILIDAD: CATALOGACIÓN SEMÁNTICA DE FALLOS DE PERSISTENCIA
//! =================================================================

use thiserror::Error;

use ployz_domain_control::ControlError;

#[derive(Error, Debug)]
pub enum StateDbError {
    /// El fichero 'machine.db' o su directorio no admite apertura.
    #[error("[L3_STATEDB_FAULT]: LEDGER_UNREACHABLE -> {0}")]
    ConnectionError(String),

    /// Error de sintaxis o ejecución devuelto por el motor libSQL.
    #[error("[L3_STATEDB_FAULT]: SQL_QUERY_REJECTED -> {0}")]
    QueryError(#[from] libsql::Error),

    /// Fila persistida que no mapea al contrato del dominio.
    #[error("[L3_STATEDB_FAULT]: DATA_MAPPING_VIOLATION -> {0}")]
    MappingError(String),
}

impl From<StateDbError> for ControlError {
    fn from(fault: StateDbError) -> Self {
        match fault {
            StateDbError::ConnectionError(detail) => ControlError::fatal(
                format!("local state ledger unavailable: {detail}"),
                "run 'ployz configure' or fix ownership of the data root",
            ),
            StateDbError::QueryError(sql_fault) => {
                ControlError::Transient(format!("local state ledger query failed: {sql_fault}"))
            }
            StateDbError::MappingError(detail) => ControlError::Fatal {
                message: format!("local state ledger is corrupted: {detail}"),
                hint: None,
            },
        }
    }
}
