// [apps/agent/src/platform/corrosion.rs]
/*!
 * =================================================================
 * APARATO: CORROSION CONTAINER RUNTIME (V6.1 - REGISTRY HOST)
 * CLASIFICACIÓN: APPLICATION ADAPTER (ESTRATO L4)
 * RESPONSABILIDAD: CONTRATO 'CorrosionRuntime' SOBRE EL MOTOR DOCKER
 * =================================================================
 */

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use ployz_domain_control::{ContainerRuntime, ContainerSpec, ControlError, CorrosionRuntime};
use ployz_domain_models::{CorrosionSettings, State};

use super::docker::DockerEngine;

/// Raíz de datos de Corrosion dentro del contenedor.
const CONTAINER_DATA_DIR: &str = "/var/lib/corrosion";

/// Runtime del nodo Corrosion local como contenedor en red de host.
pub struct DockerCorrosion {
    container_engine: Arc<DockerEngine>,
}

impl DockerCorrosion {
    #[must_use]
    pub fn new(container_engine: Arc<DockerEngine>) -> Self {
        Self { container_engine }
    }
}

#[async_trait]
impl CorrosionRuntime for DockerCorrosion {
    async fn write_config(
        &self,
        settings: &CorrosionSettings,
        contents: &str,
    ) -> Result<(), ControlError> {
        tokio::fs::create_dir_all(&settings.data_dir).await.map_err(|io_fault| {
            ControlError::fatal(
                format!("corrosion data dir {} not claimable: {io_fault}", settings.data_dir.display()),
                "run 'ployz configure' or fix ownership of the data root",
            )
        })?;

        let config_path = settings.data_dir.join("config.toml");
        tokio::fs::write(&config_path, contents).await.map_err(|io_fault| {
            ControlError::fatal(
                format!("corrosion config {} not writable: {io_fault}", config_path.display()),
                "run 'ployz configure' or fix ownership of the data root",
            )
        })?;

        debug!("📜 [CORROSION_CONFIG]: Rendered at {}.", config_path.display());
        Ok(())
    }

    async fn start(&self, state: &State, settings: &CorrosionSettings) -> Result<(), ControlError> {
        if self.container_engine.inspect_container(&settings.container_name).await?.is_none() {
            self.container_engine.pull_image(&settings.image).await?;
            self.container_engine
                .create_container(&ContainerSpec {
                    name: settings.container_name.clone(),
                    image: settings.image.clone(),
                    // Red de host: gossip y API escuchan en el propio nodo.
                    network: None,
                    volumes: vec![(settings.data_dir.clone(), PathBuf::from(CONTAINER_DATA_DIR))],
                    env: vec![],
                })
                .await?;
        }

        self.container_engine.start_container(&settings.container_name).await?;
        info!(
            "🛰️  [CORROSION_UP]: Registry member {} listening for network '{}'.",
            state.corrosion_member_id, state.network
        );
        Ok(())
    }

    async fn stop(&self, settings: &CorrosionSettings) -> Result<(), ControlError> {
        self.container_engine.stop_container(&settings.container_name).await?;
        info!("🛑 [CORROSION_DOWN]: Container '{}' stopped.", settings.container_name);
        Ok(())
    }
}
