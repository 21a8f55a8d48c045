// [libs/infra/registry/src/lib.rs]

//! # APARATO: REGISTRY UPLINK ROOT (V6.0 - CORROSION ADAPTER)
//! CLASIFICACIÓN: INFRASTRUCTURE LAYER (ESTRATO L3)
//! RESPONSABILIDAD: TRANSPORTE Y VISTAS TIPADAS DEL REGISTRO REPLICADO
//!
//! ## Visión Holística 2026
//! Única puerta de entrada al registro replicado de la malla: el
//! transporte HTTP+JSON (transacciones, consultas, suscripciones con
//! reanudación) y los repositorios tipados que gobiernan sus tablas.

/// Cliente HTTP del nodo Corrosion local (exec / query / migraciones).
pub mod client;

/// Decodificación tolerante de celdas JSON hacia tipos del dominio.
pub mod decode;

/// Catálogo semántico de fallos del registro.
pub mod errors;

/// Parser de tramas NDJSON (columns / row / eoq / change / error).
pub mod events;

/// Vistas tipadas sobre las tablas replicadas.
pub mod repositories;

/// DDL aditivo de las tablas de la malla.
pub mod schema;

/// Flujo vivo de suscripción con reanudación por 'change_id'.
pub mod subscription;

pub use client::{CorrosionClient, Statement};
pub use errors::RegistryError;
pub use events::{ChangeKind, QueryEvent};
pub use repositories::{ContainerRepo, DeploymentRepo, HeartbeatRepo, MachineRepo, NetworkConfigRepo};
pub use subscription::SubscriptionStream;
