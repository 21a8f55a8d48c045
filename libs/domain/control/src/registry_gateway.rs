// [libs/domain/control/src/registry_gateway.rs]
/*!
 * =================================================================
 * APARATO: CORROSION REGISTRY GATEWAY (V6.1 - OPAQUE SURFACE)
 * CLASIFICACIÓN: DOMAIN ADAPTER (ESTRATO L2/L3)
 * RESPONSABILIDAD: SUPERFICIE OPACA DEL REGISTRO PARA EL PLANO DE CONTROL
 *
 * El Controller y el Supervisor consumen el registro a través de los
 * contratos 'RegistryGateway' y 'MachineDirectory'; esta pieza los
 * satisface sobre el cliente Corrosion y sus repositorios tipados.
 * =================================================================
 */

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use ployz_domain_models::{default_network_cidr, MachineRow, ResolvedConfig, State};
use ployz_infra_registry::{CorrosionClient, HeartbeatRepo, MachineRepo, NetworkConfigRepo};

use crate::capabilities::{MachineDirectory, RegistryGateway};
use crate::errors::ControlError;

/// Ventana total de espera de preparación del registro.
const REGISTRY_READY_WINDOW: Duration = Duration::from_secs(30);

/// Implementación del gateway sobre el nodo Corrosion local.
#[derive(Debug, Clone, Copy, Default)]
pub struct CorrosionGateway;

impl CorrosionGateway {
    fn client(resolved: &ResolvedConfig, state: &State) -> Result<CorrosionClient, ControlError> {
        CorrosionClient::new(
            &resolved.corrosion.api_addr,
            Some(state.corrosion_api_token.clone()),
        )
        .map_err(ControlError::from)
    }
}

#[async_trait]
impl RegistryGateway for CorrosionGateway {
    async fn wait_ready(&self, resolved: &ResolvedConfig, state: &State) -> Result<(), ControlError> {
        let client = Self::client(resolved, state)?;
        client.wait_ready(REGISTRY_READY_WINDOW).await?;
        Ok(())
    }

    async fn seal_network_cidr(
        &self,
        resolved: &ResolvedConfig,
        state: &State,
    ) -> Result<(), ControlError> {
        let config_repo = NetworkConfigRepo::new(Self::client(resolved, state)?);
        config_repo.ensure_table().await?;
        config_repo
            .ensure_network_cidr(
                &state.network,
                Some(state.network_cidr),
                None,
                default_network_cidr(),
            )
            .await?;
        Ok(())
    }

    async fn advertise_machine(
        &self,
        resolved: &ResolvedConfig,
        state: &State,
        now: DateTime<Utc>,
    ) -> Result<(), ControlError> {
        let machine_repo = MachineRepo::new(Self::client(resolved, state)?);
        machine_repo.ensure_table().await?;

        let own_row = MachineRow {
            id: state.wg_public_key.clone(),
            public_key: state.wg_public_key.clone(),
            subnet: state.subnet.to_string(),
            management_ip: state.management_ip.to_string(),
            endpoint: state.advertise_endpoint.clone(),
            updated_at: MachineRow::format_updated_at(now),
            version: 0,
        };
        machine_repo.upsert_machine(&own_row, 0).await?;

        if let Some(advertised_endpoint) = &state.advertise_endpoint {
            machine_repo
                .delete_by_endpoint_except_id(advertised_endpoint, &own_row.id)
                .await?;
        }
        Ok(())
    }

    async fn list_machines(
        &self,
        resolved: &ResolvedConfig,
        state: &State,
    ) -> Result<Vec<MachineRow>, ControlError> {
        let machine_repo = MachineRepo::new(Self::client(resolved, state)?);
        Ok(machine_repo.list_machine_rows().await?)
    }
}

/// Directorio de máquinas del Supervisor sobre los repositorios tipados.
#[derive(Debug, Clone)]
pub struct CorrosionDirectory {
    machine_repo: MachineRepo,
    heartbeat_repo: HeartbeatRepo,
}

impl CorrosionDirectory {
    #[must_use]
    pub fn new(machine_repo: MachineRepo, heartbeat_repo: HeartbeatRepo) -> Self {
        Self { machine_repo, heartbeat_repo }
    }
}

#[async_trait]
impl MachineDirectory for CorrosionDirectory {
    async fn ensure_tables(&self) -> Result<(), ControlError> {
        self.machine_repo.ensure_table().await?;
        self.heartbeat_repo.ensure_table().await?;
        Ok(())
    }

    async fn list_machines(&self) -> Result<Vec<MachineRow>, ControlError> {
        Ok(self.machine_repo.list_machine_rows().await?)
    }
}
