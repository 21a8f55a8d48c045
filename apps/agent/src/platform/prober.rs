// [apps/agent/src/platform/prober.rs]
/*!
 * =================================================================
 * APARATO: INFRA STATUS PROBER (V6.0 - THREE LIGHTS)
 * CLASIFICACIÓN: APPLICATION ADAPTER (ESTRATO L4)
 * RESPONSABILIDAD: TRES SONDAS INDEPENDIENTES DEL ESTADO LOCAL
 * =================================================================
 */

use std::sync::Arc;

use async_trait::async_trait;

use ployz_domain_control::{ContainerRuntime, ControlError, InfraStatus, StatusProber};
use ployz_domain_models::State;

use super::command::run_tool;
use super::docker::DockerEngine;

/// Sondas de infraestructura sobre wg / ip / docker.
pub struct InfraProber {
    container_engine: Arc<DockerEngine>,
}

impl InfraProber {
    #[must_use]
    pub fn new(container_engine: Arc<DockerEngine>) -> Self {
        Self { container_engine }
    }
}

#[async_trait]
impl StatusProber for InfraProber {
    async fn probe_infra(&self, state: &State) -> Result<InfraStatus, ControlError> {
        // Las tres sondas son independientes: una caída no enmascara a las otras.
        let wireguard_interface_present =
            run_tool("ip", &["link", "show", state.wg_interface.as_str()]).await.is_ok();

        let container_network_present = self
            .container_engine
            .network_exists(&state.docker_network)
            .await
            .unwrap_or(false);

        let registry_running = self
            .container_engine
            .inspect_container(&state.corrosion_container)
            .await
            .ok()
            .flatten()
            .is_some_and(|info| info.running);

        Ok(InfraStatus {
            wireguard_interface_present,
            container_network_present,
            registry_running,
        })
    }
}
