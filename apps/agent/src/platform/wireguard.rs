// [apps/agent/src/platform/wireguard.rs]
/*!
 * =================================================================
 * APARATO: WIREGUARD SHELL PLATFORM (V6.3 - IFACE AUTHORITY)
 * CLASIFICACIÓN: APPLICATION ADAPTER (ESTRATO L4)
 * RESPONSABILIDAD: CONTRATO 'PlatformOps' SOBRE wg / ip / docker
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. FULL-SET SYNC: 'apply_peer_config' proyecta el conjunto completo:
 *    pares ausentes del conjunto deseado se retiran de la interfaz.
 * 2. OWNED SESSION: El estado de plataforma vive en este valor, no en
 *    variables de módulo; el proceso posee su sesión.
 * 3. IDEMPOTENT BRING-UP: 'ip ... replace' y la tolerancia a "ya
 *    existe" hacen el arranque repetible.
 * =================================================================
 */

use std::collections::HashSet;
use std::net::Ipv4Addr;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use ployz_core_overlay::PeerSpec;
use ployz_domain_control::{ContainerRuntime, ControlError, PlatformOps};
use ployz_domain_models::{ResolvedConfig, State};

use super::command::{run_tool, run_tool_tolerating};
use super::docker::DockerEngine;

/// Longitud de prefijo de la red de gestión IPv6.
const MANAGEMENT_PREFIX_LEN: u8 = 48;

/// Implementación de 'PlatformOps' sobre el utillaje del host Linux.
pub struct ShellPlatform {
    container_engine: Arc<DockerEngine>,
}

impl ShellPlatform {
    #[must_use]
    pub fn new(container_engine: Arc<DockerEngine>) -> Self {
        Self { container_engine }
    }

    async fn sync_peer_set(&self, state: &State, peers: &[PeerSpec]) -> Result<(), ControlError> {
        let interface = state.wg_interface.as_str();

        let desired_keys: HashSet<String> =
            peers.iter().map(|spec| spec.public_key.to_base64()).collect();

        // Retirada de pares que ya no pertenecen al conjunto deseado.
        let present = run_tool("wg", &["show", interface, "peers"]).await?;
        for stale_key in present.lines().map(str::trim).filter(|line| !line.is_empty()) {
            if !desired_keys.contains(stale_key) {
                run_tool("wg", &["set", interface, "peer", stale_key, "remove"]).await?;
            }
        }

        // Proyección del conjunto deseado.
        for spec in peers {
            let public_key = spec.public_key.to_base64();
            let allowed_ips = spec
                .allowed_prefixes
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(",");

            let mut arguments =
                vec!["set", interface, "peer", &public_key, "allowed-ips", &allowed_ips];
            let endpoint_wire;
            if let Some(endpoint) = spec.endpoint {
                endpoint_wire = endpoint.to_string();
                arguments.push("endpoint");
                arguments.push(&endpoint_wire);
            }
            run_tool("wg", &arguments).await?;
        }

        debug!("🕸️  [WG_SYNC]: {} peers projected on {}.", peers.len(), interface);
        Ok(())
    }
}

#[async_trait]
impl PlatformOps for ShellPlatform {
    async fn prepare(&self, resolved: &ResolvedConfig) -> Result<(), ControlError> {
        // Verificación de utillaje; el fallo lleva pista de instalación.
        run_tool("wg", &["--version"]).await?;
        run_tool("ip", &["-V"]).await?;
        info!("🔧 [PLATFORM_READY]: Host tooling present for '{}'.", resolved.network);
        Ok(())
    }

    async fn configure_wireguard(&self, state: &State, peers: &[PeerSpec]) -> Result<(), ControlError> {
        let interface = state.wg_interface.as_str();

        run_tool_tolerating(
            "ip",
            &["link", "add", interface, "type", "wireguard"],
            &["File exists"],
        )
        .await?;

        // La clave privada viaja por fichero efímero, jamás por argv.
        let key_path = std::env::temp_dir().join(format!("{interface}.key"));
        tokio::fs::write(&key_path, &state.wg_private_key)
            .await
            .map_err(|io_fault| ControlError::Transient(format!("private key spill: {io_fault}")))?;
        let key_path_wire = key_path.display().to_string();

        let listen_port = state.wg_port.to_string();
        let configure_verdict = run_tool(
            "wg",
            &["set", interface, "listen-port", &listen_port, "private-key", &key_path_wire],
        )
        .await;
        let _ = tokio::fs::remove_file(&key_path).await;
        configure_verdict?;

        // Direcciones: gateway IPv4 de la subred propia y gestión IPv6.
        let gateway_v4 = first_host_of(state);
        run_tool(
            "ip",
            &[
                "address",
                "replace",
                &format!("{gateway_v4}/{}", state.network_cidr.prefix_len()),
                "dev",
                interface,
            ],
        )
        .await?;
        run_tool(
            "ip",
            &[
                "-6",
                "address",
                "replace",
                &format!("{}/{MANAGEMENT_PREFIX_LEN}", state.management_ip),
                "dev",
                interface,
            ],
        )
        .await?;
        run_tool("ip", &["link", "set", interface, "up"]).await?;

        info!("🔐 [WG_UP]: Interface {} up ({} initial peers).", interface, peers.len());
        self.sync_peer_set(state, peers).await
    }

    async fn ensure_docker_network(&self, state: &State) -> Result<(), ControlError> {
        if cfg!(target_os = "macos") {
            debug!("🍎 [DOCKER_NETWORK]: macOS host; container network is a no-op.");
            return Ok(());
        }
        if !self.container_engine.network_exists(&state.docker_network).await? {
            self.container_engine
                .create_network(&state.docker_network, state.subnet)
                .await?;
            info!("🐳 [DOCKER_NETWORK]: Network '{}' materialized.", state.docker_network);
        }
        Ok(())
    }

    async fn cleanup_docker_network(&self, state: &State) -> Result<(), ControlError> {
        self.container_engine.remove_network(&state.docker_network).await
    }

    async fn cleanup_wireguard(&self, state: &State) -> Result<(), ControlError> {
        run_tool_tolerating(
            "ip",
            &["link", "del", state.wg_interface.as_str()],
            &["Cannot find device"],
        )
        .await
    }

    async fn after_start(&self, state: &State) -> Result<(), ControlError> {
        debug!("🏁 [AFTER_START]: Network '{}' hooks complete.", state.network);
        Ok(())
    }

    async fn after_stop(&self, state: &State) -> Result<(), ControlError> {
        debug!("🏁 [AFTER_STOP]: Network '{}' hooks complete.", state.network);
        Ok(())
    }

    async fn apply_peer_config(&self, state: &State, peers: &[PeerSpec]) -> Result<(), ControlError> {
        self.sync_peer_set(state, peers).await
    }
}

/// Primera dirección de host de la subred propia (gateway del overlay).
fn first_host_of(state: &State) -> Ipv4Addr {
    Ipv4Addr::from(u32::from(state.subnet.network()) + 1)
}
