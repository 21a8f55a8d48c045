// [libs/infra/broker/src/errors.rs]
//! =================================================================
//! APARATO: BROKER ERROR CATALOG (V5.0 - SOBERANO)
//! RESPONSABILIDAD: CATALOGACIÓN SEMÁNTICA DE FALLOS DE DIFUSIÓN
//! =================================================================

use thiserror::Error;

use ployz_infra_registry::RegistryError;

#[derive(Error, Debug)]
pub enum BrokerError {
    /// Fallo del flujo upstream (apertura, reanudación o lectura).
    #[error("[L3_BROKER_FAULT]: UPSTREAM_STREAM_FAULT -> {0}")]
    Upstream(#[from] RegistryError),

    /// El tópico agotó su presupuesto de reanudación y quedó clausurado.
    #[error("[L3_BROKER_FAULT]: TOPIC_CLOSED")]
    TopicClosed,
}
