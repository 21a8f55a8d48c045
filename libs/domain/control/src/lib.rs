// [libs/domain/control/src/lib.rs]

//! # APARATO: CONTROL PLANE ROOT (V6.0 - LIFECYCLE MASTER)
//! CLASIFICACIÓN: DOMAIN LAYER (ESTRATO L2)
//! RESPONSABILIDAD: CICLO DE VIDA Y CONVERGENCIA DE LA MALLA EN UN HOST
//!
//! ## Visión Holística 2026
//! El Controller gobierna la máquina de fases (arranque, parada, purga)
//! y el Supervisor mantiene la configuración WireGuard local convergida
//! con la vista replicada del registro; las capacidades de plataforma
//! entran como contratos estrechos inyectados por el shell.

/// Contratos de capacidades consumidas (plataforma, motor, registro local).
pub mod capabilities;

/// Controller: Start / Stop / Status / Reconcile sobre la máquina de fases.
pub mod controller;

/// Taxonomía única de fallos del plano de control.
pub mod errors;

/// Escritor periódico del latido propio.
pub mod heartbeat;

/// Sonda opcional de deriva del reloj (SNTP).
pub mod ntp;

/// Sonda opcional de alcanzabilidad RTT por overlay.
pub mod pinger;

/// Superficie opaca del registro para Controller y Supervisor.
pub mod registry_gateway;

/// Señal de apagado cooperativo observable en cada select.
pub mod shutdown;

/// Bucle de reconciliación continua registro → WireGuard.
pub mod supervisor;

pub use capabilities::{
    Clock, ContainerInfo, ContainerRuntime, ContainerSpec, CorrosionRuntime, InfraStatus,
    MachineDirectory, PeerApplier, PlatformOps, RegistryGateway, StateStore, StatusProber,
    SystemClock,
};
pub use controller::{NetworkController, NetworkStatus};
pub use errors::ControlError;
pub use heartbeat::HeartbeatWriter;
pub use ntp::DriftChecker;
pub use pinger::{PingTarget, PingTracker, PingVerdict};
pub use registry_gateway::{CorrosionDirectory, CorrosionGateway};
pub use shutdown::{shutdown_channel, ShutdownHandle, ShutdownSignal};
pub use supervisor::{FreshnessTracker, NodeFreshness, Supervisor};
