// [libs/domain/control/src/controller.rs]
/*!
 * =================================================================
 * APARATO: NETWORK CONTROLLER (V6.6 - PHASE MACHINE MASTER)
 * CLASIFICACIÓN: DOMAIN ORCHESTRATOR (ESTRATO L2)
 * RESPONSABILIDAD: ARRANQUE, PARADA, ESTADO Y RECONCILIACIÓN DE LA RED
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. SINGLE RECORDER: Toda falla en vuelo se registra escribiendo
 *    'Failed' en el State; el error original viaja intacto al llamador.
 * 2. CRITICAL SECTION: Un Mutex serializa Start/Stop; el State solo
 *    muta dentro de esa sección.
 * 3. IDEMPOTENT START: Sobre una red ya en 'Running', Start reconcilia
 *    la intención contra la identidad persistida y devuelve la misma
 *    configuración resuelta sin tocar la plataforma.
 * 4. PRECONDITIONS FIRST: Solapamiento CIDR y conflictos de identidad
 *    se rechazan antes de cualquier efecto; el State queda intacto.
 * =================================================================
 */

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use ipnet::Ipv4Net;
use tracing::{error, info, instrument, warn};

use ployz_core_overlay::{
    allocate_subnet, build_peer_specs, ensure_no_overlap, management_ip_from_key, mint_api_token,
    mint_member_id, PeerSpec, WgKeyPair,
};
use ployz_domain_models::{
    default_network_cidr, Config, CorrosionSettings, MachineRow, Peer, Phase, ResolvedConfig, State,
};

use crate::capabilities::{
    Clock, ContainerRuntime, CorrosionRuntime, InfraStatus, PeerApplier, PlatformOps,
    RegistryGateway, StateStore, StatusProber,
};
use crate::errors::ControlError;

/// Ventana de espera del socket del daemon de contenedores.
const CONTAINER_WAIT_READY_WINDOW: Duration = Duration::from_secs(15);

/// Reporte de condición de la red para el operador.
#[derive(Debug, Clone, Default)]
pub struct NetworkStatus {
    pub configured: bool,
    /// Cierto si y solo si la fase persistida es 'Running'.
    pub running: bool,
    pub phase: Option<Phase>,
    pub infra: Option<InfraStatus>,
    pub subnet: Option<Ipv4Net>,
    pub management_ip: Option<std::net::Ipv6Addr>,
    pub last_peer_count: i64,
}

/// Orquestador del ciclo de vida de una red sobre este host.
pub struct NetworkController {
    state_store: Arc<dyn StateStore>,
    platform: Arc<dyn PlatformOps>,
    corrosion: Arc<dyn CorrosionRuntime>,
    container_runtime: Arc<dyn ContainerRuntime>,
    prober: Arc<dyn StatusProber>,
    registry: Arc<dyn RegistryGateway>,
    clock: Arc<dyn Clock>,
    /// Sección crítica de Start/Stop/Reconcile sobre el State.
    critical_section: tokio::sync::Mutex<()>,
}

impl NetworkController {
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        state_store: Arc<dyn StateStore>,
        platform: Arc<dyn PlatformOps>,
        corrosion: Arc<dyn CorrosionRuntime>,
        container_runtime: Arc<dyn ContainerRuntime>,
        prober: Arc<dyn StatusProber>,
        registry: Arc<dyn RegistryGateway>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            state_store,
            platform,
            corrosion,
            container_runtime,
            prober,
            registry,
            clock,
            critical_section: tokio::sync::Mutex::new(()),
        }
    }

    /**
     * Arranca la red sobre este host y devuelve la configuración resuelta.
     *
     * Secuencia: normalización, génesis o carga del State, guardia de
     * solapamiento, reconciliación intención↔identidad, y la secuencia
     * vigilada de plataforma + registro. Cualquier falla en vuelo deja
     * la fase en 'Failed' para que un Stop posterior pueda limpiar.
     *
     * # Errors:
     * - `ControlError::Validation`: intención malformada o CIDR solapado.
     * - `ControlError::Conflict`: identidad persistida contradicha.
     * - `ControlError::Fatal` / `Transient`: fallas de plataforma.
     */
    #[instrument(skip(self, config))]
    pub async fn start(&self, config: &Config) -> Result<ResolvedConfig, ControlError> {
        let _critical_guard = self.critical_section.lock().await;

        // 1. RESOLUCIÓN DE LA INTENCIÓN
        let mut resolved = config.normalize()?;
        info!("🚀 [NETWORK_START]: Ignition requested for network '{}'.", resolved.network);

        // 2. CARGA O GÉNESIS DEL STATE
        let existing_state = self.state_store.load(&resolved.network).await?;

        if let Some(state) = &existing_state {
            if state.phase == Phase::Running {
                reconcile_config_with_state(&mut resolved, state)?;
                info!(
                    "💤 [NETWORK_START]: Network '{}' already running; reconciled intent only.",
                    resolved.network
                );
                return Ok(resolved);
            }
        }

        // 3. GUARDIA DE SOLAPAMIENTO ENTRE REDES DEL HOST
        let sibling_states = self.state_store.list().await?;
        let sibling_cidrs: Vec<(String, Ipv4Net)> = sibling_states
            .iter()
            .map(|sibling| (sibling.network.clone(), sibling.network_cidr))
            .collect();

        let requested_cidr = resolved.network_cidr.unwrap_or_else(default_network_cidr);
        ensure_no_overlap(&resolved.network, requested_cidr, &sibling_cidrs)?;

        let mut state = match existing_state {
            Some(state) => state,
            None => self.forge_state(&resolved, &sibling_states).await?,
        };

        // 4. RECONCILIACIÓN INTENCIÓN ↔ IDENTIDAD PERSISTIDA
        reconcile_config_with_state(&mut resolved, &state)?;

        // 5. TRANSICIÓN A 'Starting' Y SECUENCIA VIGILADA
        state.transition(Phase::Starting)?;
        state.updated_at = self.clock.now();
        self.state_store.save(&state).await?;

        match self.run_start_sequence(&resolved, &state).await {
            Ok(()) => {
                state.transition(Phase::Running)?;
                state.updated_at = self.clock.now();
                self.state_store.save(&state).await?;
                self.platform.after_start(&state).await?;
                info!("✅ [NETWORK_ONLINE]: Network '{}' running.", state.network);
                Ok(resolved)
            }
            Err(flight_fault) => {
                self.record_failure(&mut state).await;
                Err(flight_fault)
            }
        }
    }

    /**
     * Detiene la red; con 'purge' elimina además el State y la raíz de
     * datos. Sin State persistido, la parada es un éxito vacío.
     *
     * # Errors:
     * - `ControlError::Transient` / `Fatal`: fallas de limpieza; la fase
     *   queda en 'Failed' para reintentos.
     */
    #[instrument(skip(self, config))]
    pub async fn stop(&self, config: &Config, purge: bool) -> Result<(), ControlError> {
        let _critical_guard = self.critical_section.lock().await;

        let resolved = config.normalize()?;
        let Some(mut state) = self.state_store.load(&resolved.network).await? else {
            info!("💤 [NETWORK_STOP]: No persisted state for '{}'; nothing to stop.", resolved.network);
            return Ok(());
        };

        if state.phase != Phase::Stopped {
            // Una parada interrumpida deja la fase en 'Stopping'; la
            // reentrada continúa la limpieza sin re-transicionar.
            if state.phase != Phase::Stopping {
                state.transition(Phase::Stopping)?;
                state.updated_at = self.clock.now();
                self.state_store.save(&state).await?;
            }

            if let Err(cleanup_fault) = self.run_stop_sequence(&resolved, &state).await {
                self.record_failure(&mut state).await;
                return Err(cleanup_fault);
            }
        }

        if purge {
            state.transition(Phase::Purged)?;
            self.state_store.delete(&state.network).await?;
            purge_data_root(&resolved).await?;
            info!("🔥 [NETWORK_PURGED]: Network '{}' state and data removed.", state.network);
        } else if state.phase == Phase::Stopping {
            state.transition(Phase::Stopped)?;
            state.updated_at = self.clock.now();
            self.state_store.save(&state).await?;
            info!("🛑 [NETWORK_STOPPED]: Network '{}' stopped.", state.network);
        }

        Ok(())
    }

    /**
     * Reporta la condición de la red: fase persistida más las tres
     * sondas independientes de infraestructura.
     */
    #[instrument(skip(self, config))]
    pub async fn status(&self, config: &Config) -> Result<NetworkStatus, ControlError> {
        let resolved = config.normalize()?;
        let Some(state) = self.state_store.load(&resolved.network).await? else {
            return Ok(NetworkStatus::default());
        };

        let infra = self.prober.probe_infra(&state).await?;

        Ok(NetworkStatus {
            configured: true,
            running: state.phase == Phase::Running,
            phase: Some(state.phase),
            infra: Some(infra),
            subnet: Some(state.subnet),
            management_ip: Some(state.management_ip),
            last_peer_count: state.last_peer_count,
        })
    }

    /**
     * Proyecta la vista vigente del registro sobre la interfaz WireGuard
     * y persiste el conteo de pares aplicados. Idempotente.
     *
     * # Errors:
     * - `ControlError::NotInitialized`: red sin State persistido.
     * - `ControlError::Validation`: fila de máquina malformada (la
     *   proyección aborta completa; nada se aplica).
     */
    #[instrument(skip(self, config))]
    pub async fn reconcile(&self, config: &Config) -> Result<usize, ControlError> {
        let _critical_guard = self.critical_section.lock().await;

        let resolved = config.normalize()?;
        let mut state = self
            .state_store
            .load(&resolved.network)
            .await?
            .ok_or_else(|| ControlError::NotInitialized { network: resolved.network.clone() })?;

        let machine_rows = self.registry.list_machines(&resolved, &state).await?;

        let applied = self.apply_rows_as_peers(&mut state, &machine_rows).await?;
        Ok(applied)
    }

    /// Paso de aplicación de pares, inyectable en el Supervisor.
    #[must_use]
    pub fn peer_applier(self: &Arc<Self>, network: &str) -> Arc<dyn PeerApplier> {
        Arc::new(ControllerPeerApplier {
            controller: Arc::clone(self),
            network: network.to_string(),
        })
    }

    // --- ESTRATO DE SECUENCIAS INTERNAS ---

    async fn run_start_sequence(
        &self,
        resolved: &ResolvedConfig,
        state: &State,
    ) -> Result<(), ControlError> {
        // 4. PREPARACIÓN DE PLATAFORMA
        self.platform.prepare(resolved).await?;
        self.container_runtime.wait_ready(CONTAINER_WAIT_READY_WINDOW).await?;

        // 5. INTERFAZ ARRIBA SIN VECINOS
        self.platform.configure_wireguard(state, &[]).await?;

        // 6. REGISTRO REPLICADO
        ensure_writable_data_dir(&resolved.corrosion.data_dir).await?;
        let corrosion_config = render_corrosion_config(state, &resolved.corrosion);
        self.corrosion.write_config(&resolved.corrosion, &corrosion_config).await?;
        self.corrosion.start(state, &resolved.corrosion).await?;

        self.registry.wait_ready(resolved, state).await?;

        // 6b. SELLADO DEL CIDR Y ANUNCIO DE LA MÁQUINA
        self.registry.seal_network_cidr(resolved, state).await?;
        self.registry.advertise_machine(resolved, state, self.clock.now()).await?;

        // 7. RED DE CONTENEDORES DE LA MALLA
        self.platform.ensure_docker_network(state).await?;

        Ok(())
    }

    async fn run_stop_sequence(
        &self,
        resolved: &ResolvedConfig,
        state: &State,
    ) -> Result<(), ControlError> {
        self.platform.cleanup_docker_network(state).await?;
        self.corrosion.stop(&resolved.corrosion).await?;
        self.platform.cleanup_wireguard(state).await?;
        self.platform.after_stop(state).await?;
        Ok(())
    }

    async fn forge_state(
        &self,
        resolved: &ResolvedConfig,
        sibling_states: &[State],
    ) -> Result<State, ControlError> {
        let network_cidr = resolved.network_cidr.unwrap_or_else(default_network_cidr);

        let taken_subnets: Vec<Ipv4Net> = sibling_states
            .iter()
            .filter(|sibling| sibling.network != resolved.network)
            .map(|sibling| sibling.subnet)
            .collect();

        let subnet = match resolved.subnet {
            Some(requested) if network_cidr.contains(&requested) => requested,
            Some(requested) => {
                return Err(ControlError::Validation(format!(
                    "subnet {requested} outside network cidr {network_cidr}"
                )));
            }
            None => allocate_subnet(network_cidr, &taken_subnets)?,
        };

        let wg_pair = WgKeyPair::generate();
        let host_pair = WgKeyPair::generate();
        let management_ip = management_ip_from_key(&wg_pair.public_key);
        let now = self.clock.now();

        let state = State {
            network: resolved.network.clone(),
            network_cidr,
            subnet,
            management_ip,
            advertise_endpoint: resolved.advertise_endpoint.clone(),
            wg_interface: resolved.wg_interface.clone(),
            wg_port: resolved.wg_port,
            wg_private_key: wg_pair.private_key.to_base64(),
            wg_public_key: wg_pair.public_key.to_base64(),
            host_private_key: host_pair.private_key.to_base64(),
            host_public_key: host_pair.public_key.to_base64(),
            docker_network: resolved.docker_network.clone(),
            corrosion_container: resolved.corrosion.container_name.clone(),
            corrosion_image: resolved.corrosion.image.clone(),
            corrosion_member_id: resolved.corrosion.member_id.unwrap_or_else(mint_member_id),
            corrosion_api_token: resolved
                .corrosion
                .api_token
                .clone()
                .unwrap_or_else(mint_api_token),
            corrosion_bootstrap: resolved.corrosion.bootstrap.clone(),
            last_peer_count: 0,
            phase: Phase::Stopped,
            created_at: now,
            updated_at: now,
        };

        self.state_store.save(&state).await?;
        info!(
            "🧬 [STATE_FORGED]: Network '{}' minted (subnet {}, management {}).",
            state.network, state.subnet, state.management_ip
        );
        Ok(state)
    }

    async fn apply_rows_as_peers(
        &self,
        state: &mut State,
        machine_rows: &[MachineRow],
    ) -> Result<usize, ControlError> {
        let remote_peers: Vec<Peer> = machine_rows
            .iter()
            .filter(|row| row.id != state.wg_public_key)
            .map(MachineRow::to_peer)
            .collect();

        let peer_specs = build_peer_specs(&remote_peers)?;
        self.platform.apply_peer_config(state, &peer_specs).await?;

        state.last_peer_count = peer_specs.len() as i64;
        state.updated_at = self.clock.now();
        self.state_store.save(state).await?;

        Ok(peer_specs.len())
    }

    /// La falla terminal se registra una única vez, aquí.
    async fn record_failure(&self, state: &mut State) {
        if !state.phase.can_transition(Phase::Failed) {
            return;
        }
        if state.transition(Phase::Failed).is_ok() {
            state.updated_at = self.clock.now();
            if let Err(persist_fault) = self.state_store.save(state).await {
                error!(
                    "❌ [PHASE_RECORD_FAULT]: Could not persist Failed phase for '{}': {}",
                    state.network, persist_fault
                );
            }
        }
    }

}

struct ControllerPeerApplier {
    controller: Arc<NetworkController>,
    network: String,
}

#[async_trait]
impl PeerApplier for ControllerPeerApplier {
    async fn apply_peers(&self, peers: &[PeerSpec]) -> Result<(), ControlError> {
        let mut state = self
            .controller
            .state_store
            .load(&self.network)
            .await?
            .ok_or_else(|| ControlError::NotInitialized { network: self.network.clone() })?;

        self.controller.platform.apply_peer_config(&state, peers).await?;

        state.last_peer_count = peers.len() as i64;
        state.updated_at = self.controller.clock.now();
        self.controller.state_store.save(&state).await?;
        Ok(())
    }
}

/// Reconciliación intención ↔ identidad: lo conocido por ambos lados
/// debe coincidir; lo conocido por un solo lado se copia al otro.
fn reconcile_config_with_state(
    resolved: &mut ResolvedConfig,
    state: &State,
) -> Result<(), ControlError> {
    match resolved.network_cidr {
        Some(asked) if asked != state.network_cidr => {
            return Err(ControlError::Conflict(format!(
                "network '{}': cidr {} contradicts persisted {}",
                state.network, asked, state.network_cidr
            )));
        }
        _ => resolved.network_cidr = Some(state.network_cidr),
    }

    match resolved.subnet {
        Some(asked) if asked != state.subnet => {
            return Err(ControlError::Conflict(format!(
                "network '{}': subnet {} contradicts persisted {}",
                state.network, asked, state.subnet
            )));
        }
        _ => resolved.subnet = Some(state.subnet),
    }

    match resolved.corrosion.member_id {
        Some(asked) if asked != state.corrosion_member_id => {
            return Err(ControlError::Conflict(format!(
                "network '{}': corrosion member id {} contradicts persisted {}",
                state.network, asked, state.corrosion_member_id
            )));
        }
        _ => resolved.corrosion.member_id = Some(state.corrosion_member_id),
    }

    match &resolved.corrosion.api_token {
        Some(asked) if *asked != state.corrosion_api_token => {
            return Err(ControlError::Conflict(format!(
                "network '{}': corrosion api token contradicts persisted one",
                state.network
            )));
        }
        _ => resolved.corrosion.api_token = Some(state.corrosion_api_token.clone()),
    }

    resolved.management = Some(state.management_ip);
    if resolved.advertise_endpoint.is_none() {
        resolved.advertise_endpoint = state.advertise_endpoint.clone();
    }
    if resolved.corrosion.bootstrap.is_empty() {
        resolved.corrosion.bootstrap = state.corrosion_bootstrap.clone();
    }

    Ok(())
}

/// Renderiza la configuración TOML del nodo Corrosion de esta red.
fn render_corrosion_config(state: &State, settings: &CorrosionSettings) -> String {
    let bootstrap_list = settings
        .bootstrap
        .iter()
        .map(|address| format!("\"{address}\""))
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "[db]\n\
         path = \"{db_path}\"\n\
         \n\
         [gossip]\n\
         addr = \"{gossip_addr}\"\n\
         external_addr = \"[{management_ip}]:{gossip_port}\"\n\
         bootstrap = [{bootstrap_list}]\n\
         plaintext = true\n\
         \n\
         [api]\n\
         addr = \"{api_addr}\"\n\
         authorization = \"Bearer {api_token}\"\n\
         \n\
         [admin]\n\
         path = \"{admin_path}\"\n\
         \n\
         [node]\n\
         actor_id = {member_id}\n",
        db_path = settings.data_dir.join("store.db").display(),
        gossip_addr = settings.gossip_addr,
        management_ip = state.management_ip,
        gossip_port = settings.gossip_addr.rsplit(':').next().unwrap_or("51002"),
        bootstrap_list = bootstrap_list,
        api_addr = settings.api_addr,
        api_token = state.corrosion_api_token,
        admin_path = settings.admin_socket.display(),
        member_id = state.corrosion_member_id,
    )
}

/// La raíz de datos del registro debe existir y admitir escritura antes
/// de arrancar el contenedor; un fallo aquí merece pista de operador.
async fn ensure_writable_data_dir(data_dir: &Path) -> Result<(), ControlError> {
    tokio::fs::create_dir_all(data_dir).await.map_err(|io_fault| {
        ControlError::fatal(
            format!("corrosion data directory {} is not writable: {io_fault}", data_dir.display()),
            "run 'ployz configure' or fix ownership of the data root",
        )
    })?;

    let probe_path = data_dir.join(".write-probe");
    tokio::fs::write(&probe_path, b"probe").await.map_err(|io_fault| {
        ControlError::fatal(
            format!("corrosion data directory {} is not writable: {io_fault}", data_dir.display()),
            "run 'ployz configure' or fix ownership of the data root",
        )
    })?;
    let _ = tokio::fs::remove_file(&probe_path).await;
    Ok(())
}

async fn purge_data_root(resolved: &ResolvedConfig) -> Result<(), ControlError> {
    match tokio::fs::remove_dir_all(&resolved.data_root).await {
        Ok(()) => Ok(()),
        Err(io_fault) if io_fault.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(io_fault) => {
            warn!(
                "⚠️  [PURGE_RESIDUE]: Data root {} not fully removed: {}",
                resolved.data_root.display(),
                io_fault
            );
            Err(ControlError::Transient(format!(
                "data root {} not removed: {io_fault}",
                resolved.data_root.display()
            )))
        }
    }
}
