// [libs/infra/statedb/src/lib.rs]

//! # APARATO: LOCAL STATE LEDGER ROOT (V5.0 - MACHINE DB)
//! CLASIFICACIÓN: INFRASTRUCTURE LAYER (ESTRATO L3)
//! RESPONSABILIDAD: PERSISTENCIA LOCAL DE LA IDENTIDAD POR RED DEL HOST

/// Catálogo semántico de fallos de persistencia local.
pub mod errors;

/// Ledger 'network_state' sobre libSQL (machine.db).
pub mod store;

pub use errors::StateDbError;
pub use store::{machine_db_path, StateDb};
