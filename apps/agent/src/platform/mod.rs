// [apps/agent/src/platform/mod.rs]
/*!
 * =================================================================
 * APARATO: PLATFORM ADAPTER MATRIX (V6.0 - NARROW SHELL)
 * CLASIFICACIÓN: APPLICATION ADAPTERS (ESTRATO L4)
 * RESPONSABILIDAD: IMPLEMENTACIONES FINAS DE LOS CONTRATOS DE PLATAFORMA
 *
 * Los contratos viven en el plano de control; estos adaptadores los
 * satisfacen delegando en el utillaje del host (wg, ip, docker) vía
 * subprocesos. Son colaboradores reemplazables, no parte del núcleo.
 * =================================================================
 */

/// Ejecución vigilada de utillaje del host.
pub mod command;

/// Runtime del registro Corrosion sobre el motor de contenedores.
pub mod corrosion;

/// Adaptador del motor de contenedores (CLI de Docker).
pub mod docker;

/// Sondas de estado de la infraestructura local.
pub mod prober;

/// Operaciones WireGuard / rutas / red de contenedores.
pub mod wireguard;

pub use corrosion::DockerCorrosion;
pub use docker::DockerEngine;
pub use prober::InfraProber;
pub use wireguard::ShellPlatform;
