// [apps/agent/src/kernel.rs]
/*!
 * =================================================================
 * APARATO: AGENT SOVEREIGN KERNEL (V6.3 - COMPOSITION ROOT)
 * CLASIFICACIÓN: COMPOSITION ROOT (ESTRATO L1-APP)
 * RESPONSABILIDAD: SINAPSIS ENTRE LEDGER, REGISTRO Y PLANO DE CONTROL
 *
 * VISION HIPER-HOLÍSTICA:
 * Actúa como la placa base donde se conectan los adaptadores de
 * plataforma con el Controller y el Supervisor. El modo 'supervise'
 * arranca la red y mantiene los daemons de convergencia y vitalidad
 * hasta la señal de terminación del host.
 * =================================================================
 */

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{info, warn};

use ployz_domain_control::{
    shutdown_channel, Clock, ContainerRuntime, CorrosionDirectory, CorrosionGateway, DriftChecker,
    FreshnessTracker, HeartbeatWriter, NetworkController, PingTracker, StateStore, Supervisor,
    SystemClock,
};
use ployz_domain_models::Config;
use ployz_infra_broker::{heartbeats_topic, machines_topic};
use ployz_infra_registry::{CorrosionClient, HeartbeatRepo, MachineRepo};
use ployz_infra_statedb::StateDb;

use crate::platform::{DockerCorrosion, DockerEngine, InfraProber, ShellPlatform};

/// Placa base del agente: ledger local + adaptadores + plano de control.
pub struct AgentKernel {
    domain_config: Config,
    controller: Arc<NetworkController>,
    state_db: Arc<StateDb>,
}

impl AgentKernel {
    /**
     * Ignición del kernel: abre el ledger local y cablea los
     * adaptadores de plataforma en el Controller.
     */
    pub async fn ignite(domain_config: Config) -> Result<Self> {
        let resolved = domain_config.normalize().context("configuration rejected")?;

        let state_db = Arc::new(
            StateDb::open(&resolved.data_root)
                .await
                .context("local state ledger ignition failed")?,
        );

        let container_engine = Arc::new(DockerEngine::new());
        let platform = Arc::new(ShellPlatform::new(Arc::clone(&container_engine)));
        let corrosion = Arc::new(DockerCorrosion::new(Arc::clone(&container_engine)));
        let prober = Arc::new(InfraProber::new(Arc::clone(&container_engine)));
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);

        let controller = Arc::new(NetworkController::new(
            Arc::clone(&state_db) as Arc<dyn StateStore>,
            platform,
            corrosion,
            container_engine as Arc<dyn ContainerRuntime>,
            prober,
            Arc::new(CorrosionGateway),
            clock,
        ));

        Ok(Self { domain_config, controller, state_db })
    }

    /// Arranque único de la red (sin bucle de supervisión).
    pub async fn start(&self) -> Result<()> {
        let resolved = self.controller.start(&self.domain_config).await?;
        info!(
            "✅ [AGENT_START]: Network '{}' running (management {}).",
            resolved.network,
            resolved
                .management
                .map(|address| address.to_string())
                .unwrap_or_else(|| "unresolved".to_string())
        );
        Ok(())
    }

    /// Parada de la red; con 'purge' elimina estado y datos.
    pub async fn stop(&self, purge: bool) -> Result<()> {
        self.controller.stop(&self.domain_config, purge).await?;
        Ok(())
    }

    /// Reporte de condición para el operador.
    pub async fn status(&self) -> Result<()> {
        let verdict = self.controller.status(&self.domain_config).await?;

        if !verdict.configured {
            println!("configured: false");
            return Ok(());
        }

        println!("configured: true");
        println!("running: {}", verdict.running);
        if let Some(phase) = verdict.phase {
            println!("phase: {phase}");
        }
        if let Some(subnet) = verdict.subnet {
            println!("subnet: {subnet}");
        }
        if let Some(management_ip) = verdict.management_ip {
            println!("management: {management_ip}");
        }
        if let Some(infra) = verdict.infra {
            println!("wireguard interface: {}", infra.wireguard_interface_present);
            println!("container network: {}", infra.container_network_present);
            println!("registry: {}", infra.registry_running);
        }
        println!("peers applied: {}", verdict.last_peer_count);
        Ok(())
    }

    /// Reconciliación puntual registro → WireGuard.
    pub async fn reconcile(&self) -> Result<()> {
        let applied_peers = self.controller.reconcile(&self.domain_config).await?;
        println!("peers applied: {applied_peers}");
        Ok(())
    }

    /**
     * Modo daemon: arranca la red y mantiene la convergencia continua
     * (Supervisor + escritor de latidos) hasta la señal del host.
     */
    pub async fn supervise(&self) -> Result<()> {
        let resolved = self.controller.start(&self.domain_config).await?;

        let state = (Arc::clone(&self.state_db) as Arc<dyn StateStore>)
            .load(&resolved.network)
            .await?
            .context("state vanished after start")?;

        // 1. ENLACE AL REGISTRO LOCAL
        let registry = CorrosionClient::new(
            &resolved.corrosion.api_addr,
            Some(state.corrosion_api_token.clone()),
        )?;
        let machine_repo = MachineRepo::new(registry.clone());
        let heartbeat_repo = HeartbeatRepo::new(registry.clone());

        // 2. SEÑAL DE TERMINACIÓN ORDENADA
        let (shutdown_handle, shutdown_signal) = shutdown_channel();
        let termination_handle = shutdown_handle.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("⚠️  [SIGNAL]: Termination requested by host; sealing daemons...");
                termination_handle.shutdown();
            }
        });

        // 3. DAEMON DE VITALIDAD (LATIDO PROPIO)
        let heartbeat_writer = HeartbeatWriter::new(
            heartbeat_repo.clone(),
            state.wg_public_key.clone(),
            Arc::new(SystemClock),
            shutdown_signal.clone(),
        );
        tokio::spawn(heartbeat_writer.run());

        // 4. SONDAS OPCIONALES (RTT Y DERIVA DE RELOJ)
        let ping_tracker = PingTracker::new();
        tokio::spawn(ping_tracker.clone().run(shutdown_signal.clone()));

        let drift_checker = DriftChecker::new("pool.ntp.org:123");
        tokio::spawn(drift_checker.run(shutdown_signal.clone()));

        // 5. BUCLE DE CONVERGENCIA
        let supervisor = Supervisor::new(
            Arc::new(CorrosionDirectory::new(machine_repo, heartbeat_repo)),
            machines_topic(registry.clone()),
            heartbeats_topic(registry),
            self.controller.peer_applier(&resolved.network),
            state.wg_public_key.clone(),
            FreshnessTracker::default(),
            shutdown_signal,
        )
        .with_ping_tracker(ping_tracker);

        supervisor.run().await?;
        info!("🛑 [AGENT_SUPERVISE]: Daemons sealed; agent exiting.");
        Ok(())
    }
}
