// [libs/infra/registry/src/repositories/mod.rs]
/*!
 * =================================================================
 * APARATO: REPOSITORY ACCESS MATRIX (V6.0 - TOPOLOGY MASTER)
 * CLASIFICACIÓN: INFRASTRUCTURE LAYER (ESTRATO L3)
 * RESPONSABILIDAD: ORQUESTACIÓN DE VISTAS TIPADAS SOBRE EL REGISTRO
 *
 * # Mathematical Proof (Modular Encapsulation):
 * El barrel actúa como interfaz galvánica: los sub-módulos permanecen
 * aislados y solo las estructuras de autoridad (Repositories) son
 * expuestas, reduciendo el acoplamiento con el transporte.
 * =================================================================
 */

// --- ESTRATO 1: PERTENENCIA DE LA MALLA (CRITICAL CORE) ---

/// Filas de máquina con concurrencia optimista por versión.
pub mod machine;
/// Latidos por nodo con secuencia monótona.
pub mod heartbeat;
/// Ajustes replicados por red (sellado de CIDR).
pub mod network_config;

// --- ESTRATO 2: CAPA DE APLICACIÓN (DEPLOYMENTS) ---

/// Despliegues lógicos con candado cooperativo de propietario.
pub mod deployment;
/// Contenedores materializados por máquina.
pub mod container;

// --- RE-EXPORTACIONES SOBERANAS (NOMINAL ACCESS API) ---

pub use container::ContainerRepo;
pub use deployment::DeploymentRepo;
pub use heartbeat::HeartbeatRepo;
pub use machine::{plan_upsert, MachineRepo, UpsertPlan};
pub use network_config::NetworkConfigRepo;
