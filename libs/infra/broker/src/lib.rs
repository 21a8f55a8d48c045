// [libs/infra/broker/src/lib.rs]

//! # APARATO: SUBSCRIPTION BROKER ROOT (V5.0 - FAN-OUT MASTER)
//! CLASIFICACIÓN: INFRASTRUCTURE LAYER (ESTRATO L3)
//! RESPONSABILIDAD: DIFUSIÓN LOCAL DE UNA SUSCRIPCIÓN UPSTREAM POR TÓPICO
//!
//! ## Visión Holística 2026
//! De muchos consumidores concurrentes a un único flujo upstream por
//! tópico, con buffer de replay, canales acotados por consumidor y la
//! señal 'Resync' como único contrato de reconvergencia tras un corte.

/// Catálogo semántico de fallos de difusión.
pub mod errors;

/// Contrato del flujo upstream y fuente genérica sobre el registro.
pub mod source;

/// Maquinaria de fan-out por tópico.
pub mod topic;

pub use errors::BrokerError;
pub use source::{ChangeFeed, RegistryTopicSource, RowChange, RowChangeKind, TopicSource, TopicStream};
pub use topic::{Topic, REPLAY_BUFFER_CAPACITY, SUBSCRIBER_CHANNEL_CAPACITY};

use ployz_domain_models::{HeartbeatRow, MachineRow};
use ployz_infra_registry::repositories::heartbeat::{decode_heartbeat_row, HEARTBEATS_SELECT};
use ployz_infra_registry::repositories::machine::{decode_machine_row, MACHINES_SELECT};
use ployz_infra_registry::CorrosionClient;

/// Tópico de filas de máquina sobre el registro replicado.
#[must_use]
pub fn machines_topic(registry_client: CorrosionClient) -> Topic<RegistryTopicSource<MachineRow>> {
    Topic::new(
        "MACHINES",
        RegistryTopicSource::new(registry_client, MACHINES_SELECT, decode_machine_row),
    )
}

/// Tópico de latidos sobre el registro replicado.
#[must_use]
pub fn heartbeats_topic(
    registry_client: CorrosionClient,
) -> Topic<RegistryTopicSource<HeartbeatRow>> {
    Topic::new(
        "HEARTBEATS",
        RegistryTopicSource::new(registry_client, HEARTBEATS_SELECT, decode_heartbeat_row),
    )
}
