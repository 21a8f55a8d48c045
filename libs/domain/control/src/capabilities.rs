// [libs/domain/control/src/capabilities.rs]
/*!
 * =================================================================
 * APARATO: PLATFORM CAPABILITY CONTRACTS (V6.1 - NARROW SEAMS)
 * CLASIFICACIÓN: DOMAIN CONTRACT (ESTRATO L2)
 * RESPONSABILIDAD: CONTRATOS CONSUMIDOS POR EL PLANO DE CONTROL
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. INTERFACES, NO IMPLEMENTACIONES: El núcleo consume estas
 *    capacidades como colaboradores externos de contrato estrecho; las
 *    implementaciones viven en el shell de la aplicación.
 * 2. OWNERSHIP, NO GLOBALS: El estado singleton de plataforma (sesión
 *    WireGuard activa, descriptor TUN aprovisionado) vive por propiedad
 *    dentro del valor 'PlatformOps' del proceso, jamás en un módulo.
 * 3. CYCLE BREAKER: 'PeerApplier' viaja como valor del Controller al
 *    Supervisor en construcción, rompiendo la referencia circular.
 * =================================================================
 */

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ipnet::Ipv4Net;

use ployz_core_overlay::PeerSpec;
use ployz_domain_models::{CorrosionSettings, MachineRow, ResolvedConfig, State};

use crate::errors::ControlError;

/// Tres sondas independientes del estado de la infraestructura local.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct InfraStatus {
    pub wireguard_interface_present: bool,
    pub container_network_present: bool,
    pub registry_running: bool,
}

/// Condición de un contenedor según el motor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerInfo {
    pub name: String,
    pub running: bool,
}

/// Receta de creación de un contenedor de infraestructura.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerSpec {
    pub name: String,
    pub image: String,
    /// Red de contenedores a la que unirse; `None` usa la red del host.
    pub network: Option<String>,
    /// Montajes `(origen_host, destino_contenedor)`.
    pub volumes: Vec<(PathBuf, PathBuf)>,
    pub env: Vec<(String, String)>,
}

/// Operaciones privilegiadas de plataforma (WireGuard, rutas, red Docker).
#[async_trait]
pub trait PlatformOps: Send + Sync {
    /// Preparación del host (módulos, permisos, binarios).
    async fn prepare(&self, resolved: &ResolvedConfig) -> Result<(), ControlError>;

    /// Levanta la interfaz con direcciones y rutas; la lista de pares
    /// vacía trae la interfaz sin vecinos.
    async fn configure_wireguard(&self, state: &State, peers: &[PeerSpec]) -> Result<(), ControlError>;

    /// Garantiza la red de contenedores de la malla (no-op en macOS).
    async fn ensure_docker_network(&self, state: &State) -> Result<(), ControlError>;

    async fn cleanup_docker_network(&self, state: &State) -> Result<(), ControlError>;

    async fn cleanup_wireguard(&self, state: &State) -> Result<(), ControlError>;

    async fn after_start(&self, state: &State) -> Result<(), ControlError>;

    async fn after_stop(&self, state: &State) -> Result<(), ControlError>;

    /// Proyecta el conjunto completo de pares sobre la interfaz viva.
    async fn apply_peer_config(&self, state: &State, peers: &[PeerSpec]) -> Result<(), ControlError>;
}

/// Adaptador opaco del motor de contenedores.
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    async fn inspect_container(&self, name: &str) -> Result<Option<ContainerInfo>, ControlError>;
    async fn create_container(&self, spec: &ContainerSpec) -> Result<(), ControlError>;
    async fn start_container(&self, name: &str) -> Result<(), ControlError>;
    async fn stop_container(&self, name: &str) -> Result<(), ControlError>;
    async fn remove_container(&self, name: &str) -> Result<(), ControlError>;
    async fn container_logs(&self, name: &str, tail_lines: usize) -> Result<String, ControlError>;
    async fn pull_image(&self, image: &str) -> Result<(), ControlError>;
    async fn network_exists(&self, name: &str) -> Result<bool, ControlError>;
    async fn create_network(&self, name: &str, subnet: Ipv4Net) -> Result<(), ControlError>;
    async fn remove_network(&self, name: &str) -> Result<(), ControlError>;
    /// Espera a que el daemon del motor conteste, dentro de la ventana.
    async fn wait_ready(&self, window: Duration) -> Result<(), ControlError>;
}

/// Runtime del registro replicado local (contenedor Corrosion).
#[async_trait]
pub trait CorrosionRuntime: Send + Sync {
    /// Escribe el fichero de configuración renderizado por el Controller.
    async fn write_config(&self, settings: &CorrosionSettings, contents: &str) -> Result<(), ControlError>;
    async fn start(&self, state: &State, settings: &CorrosionSettings) -> Result<(), ControlError>;
    async fn stop(&self, settings: &CorrosionSettings) -> Result<(), ControlError>;
}

/// Sondas de estado de la infraestructura local.
#[async_trait]
pub trait StatusProber: Send + Sync {
    async fn probe_infra(&self, state: &State) -> Result<InfraStatus, ControlError>;
}

/// Almacén local del State por red (tabla 'network_state').
#[async_trait]
pub trait StateStore: Send + Sync {
    async fn load(&self, network: &str) -> Result<Option<State>, ControlError>;
    async fn save(&self, state: &State) -> Result<(), ControlError>;
    async fn delete(&self, network: &str) -> Result<(), ControlError>;
    async fn list(&self) -> Result<Vec<State>, ControlError>;
    /// Ruta física del ledger local (`<data_root>/../machine.db`).
    fn state_path(&self) -> PathBuf;
}

/// Reloj inyectable para operaciones deterministas en pruebas.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Reloj del sistema.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Paso de aplicación de pares, inyectado del Controller al Supervisor.
#[async_trait]
pub trait PeerApplier: Send + Sync {
    async fn apply_peers(&self, peers: &[PeerSpec]) -> Result<(), ControlError>;
}

/// Superficie opaca del registro replicado que consume el Controller.
#[async_trait]
pub trait RegistryGateway: Send + Sync {
    /// Espera acotada a que el registro local conteste consultas.
    async fn wait_ready(&self, resolved: &ResolvedConfig, state: &State) -> Result<(), ControlError>;

    /// Sella (o verifica) el CIDR de la red en el almacén replicado.
    async fn seal_network_cidr(
        &self,
        resolved: &ResolvedConfig,
        state: &State,
    ) -> Result<(), ControlError>;

    /// Anuncia esta máquina y expulsa filas fantasma del mismo endpoint.
    async fn advertise_machine(
        &self,
        resolved: &ResolvedConfig,
        state: &State,
        now: DateTime<Utc>,
    ) -> Result<(), ControlError>;

    /// Vista completa de las máquinas de la malla.
    async fn list_machines(
        &self,
        resolved: &ResolvedConfig,
        state: &State,
    ) -> Result<Vec<MachineRow>, ControlError>;
}

/// Directorio de máquinas que consume el Supervisor (tablas + listado).
#[async_trait]
pub trait MachineDirectory: Send + Sync {
    /// Garantiza las tablas replicadas del tópico (máquinas y latidos).
    async fn ensure_tables(&self) -> Result<(), ControlError>;

    /// Listado completo para la sincronía periódica.
    async fn list_machines(&self) -> Result<Vec<MachineRow>, ControlError>;
}
