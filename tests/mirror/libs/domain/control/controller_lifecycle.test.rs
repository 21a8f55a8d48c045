// [tests/mirror/libs/domain/control/controller_lifecycle.test.rs]
/*!
 * =================================================================
 * APARATO: CERTIFICADOR DEL CICLO DE VIDA (V2.4 - PHASE AUTHORITY)
 * CLASIFICACIÓN: TRINITY EVIDENCE // ESTRATO L2-MIRROR
 * RESPONSABILIDAD: AUDITORÍA DE START / STOP / PURGE / FAILED
 *
 * # Mathematical Proof (Lifecycle Determinism):
 * Con capacidades de plataforma grabadoras (sin efectos reales), el
 * Controller debe acuñar identidad reproducible, respetar la tabla de
 * fases y registrar 'Failed' exactamente una vez ante fallas en vuelo.
 * =================================================================
 */

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ipnet::Ipv4Net;

use ployz_core_overlay::{PeerSpec, WgKey};
use ployz_domain_control::{
    Clock, ContainerInfo, ContainerRuntime, ContainerSpec, ControlError, CorrosionRuntime,
    InfraStatus, NetworkController, PlatformOps, RegistryGateway, StateStore, StatusProber,
    SystemClock,
};
use ployz_domain_models::{
    Config, CorrosionSettings, MachineRow, Phase, ResolvedConfig, State,
};

// --- CAPACIDADES GRABADORAS (PROVING DOUBLES) ---

#[derive(Default)]
struct MemoryStateStore {
    rows: Mutex<HashMap<String, State>>,
}

#[async_trait]
impl StateStore for MemoryStateStore {
    async fn load(&self, network: &str) -> Result<Option<State>, ControlError> {
        Ok(self.rows.lock().unwrap().get(network).cloned())
    }

    async fn save(&self, state: &State) -> Result<(), ControlError> {
        self.rows.lock().unwrap().insert(state.network.clone(), state.clone());
        Ok(())
    }

    async fn delete(&self, network: &str) -> Result<(), ControlError> {
        self.rows.lock().unwrap().remove(network);
        Ok(())
    }

    async fn list(&self) -> Result<Vec<State>, ControlError> {
        Ok(self.rows.lock().unwrap().values().cloned().collect())
    }

    fn state_path(&self) -> PathBuf {
        PathBuf::from("memory://machine.db")
    }
}

#[derive(Default)]
struct RecordingPlatform {
    calls: Mutex<Vec<String>>,
    fail_prepare: AtomicBool,
}

impl RecordingPlatform {
    fn record(&self, call: &str) {
        self.calls.lock().unwrap().push(call.to_string());
    }

    fn call_log(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl PlatformOps for RecordingPlatform {
    async fn prepare(&self, _resolved: &ResolvedConfig) -> Result<(), ControlError> {
        self.record("prepare");
        if self.fail_prepare.load(Ordering::SeqCst) {
            return Err(ControlError::fatal("platform sabotage", "none"));
        }
        Ok(())
    }

    async fn configure_wireguard(
        &self,
        _state: &State,
        peers: &[PeerSpec],
    ) -> Result<(), ControlError> {
        self.record(&format!("configure_wireguard:{}", peers.len()));
        Ok(())
    }

    async fn ensure_docker_network(&self, _state: &State) -> Result<(), ControlError> {
        self.record("ensure_docker_network");
        Ok(())
    }

    async fn cleanup_docker_network(&self, _state: &State) -> Result<(), ControlError> {
        self.record("cleanup_docker_network");
        Ok(())
    }

    async fn cleanup_wireguard(&self, _state: &State) -> Result<(), ControlError> {
        self.record("cleanup_wireguard");
        Ok(())
    }

    async fn after_start(&self, _state: &State) -> Result<(), ControlError> {
        self.record("after_start");
        Ok(())
    }

    async fn after_stop(&self, _state: &State) -> Result<(), ControlError> {
        self.record("after_stop");
        Ok(())
    }

    async fn apply_peer_config(&self, _state: &State, peers: &[PeerSpec]) -> Result<(), ControlError> {
        self.record(&format!("apply_peer_config:{}", peers.len()));
        Ok(())
    }
}

#[derive(Default)]
struct RecordingCorrosion {
    calls: Mutex<Vec<String>>,
}

#[async_trait]
impl CorrosionRuntime for RecordingCorrosion {
    async fn write_config(
        &self,
        _settings: &CorrosionSettings,
        contents: &str,
    ) -> Result<(), ControlError> {
        assert!(contents.contains("[gossip]"), "config must carry the gossip stratum");
        self.calls.lock().unwrap().push("write_config".to_string());
        Ok(())
    }

    async fn start(&self, _state: &State, _settings: &CorrosionSettings) -> Result<(), ControlError> {
        self.calls.lock().unwrap().push("start".to_string());
        Ok(())
    }

    async fn stop(&self, _settings: &CorrosionSettings) -> Result<(), ControlError> {
        self.calls.lock().unwrap().push("stop".to_string());
        Ok(())
    }
}

#[derive(Default)]
struct SilentContainers;

#[async_trait]
impl ContainerRuntime for SilentContainers {
    async fn inspect_container(&self, _name: &str) -> Result<Option<ContainerInfo>, ControlError> {
        Ok(None)
    }
    async fn create_container(&self, _spec: &ContainerSpec) -> Result<(), ControlError> {
        Ok(())
    }
    async fn start_container(&self, _name: &str) -> Result<(), ControlError> {
        Ok(())
    }
    async fn stop_container(&self, _name: &str) -> Result<(), ControlError> {
        Ok(())
    }
    async fn remove_container(&self, _name: &str) -> Result<(), ControlError> {
        Ok(())
    }
    async fn container_logs(&self, _name: &str, _tail: usize) -> Result<String, ControlError> {
        Ok(String::new())
    }
    async fn pull_image(&self, _image: &str) -> Result<(), ControlError> {
        Ok(())
    }
    async fn network_exists(&self, _name: &str) -> Result<bool, ControlError> {
        Ok(false)
    }
    async fn create_network(&self, _name: &str, _subnet: Ipv4Net) -> Result<(), ControlError> {
        Ok(())
    }
    async fn remove_network(&self, _name: &str) -> Result<(), ControlError> {
        Ok(())
    }
    async fn wait_ready(&self, _window: Duration) -> Result<(), ControlError> {
        Ok(())
    }
}

struct AllGreenProber;

#[async_trait]
impl StatusProber for AllGreenProber {
    async fn probe_infra(&self, _state: &State) -> Result<InfraStatus, ControlError> {
        Ok(InfraStatus {
            wireguard_interface_present: true,
            container_network_present: true,
            registry_running: true,
        })
    }
}

#[derive(Default)]
struct FakeGateway {
    machines: Mutex<Vec<MachineRow>>,
}

#[async_trait]
impl RegistryGateway for FakeGateway {
    async fn wait_ready(&self, _resolved: &ResolvedConfig, _state: &State) -> Result<(), ControlError> {
        Ok(())
    }
    async fn seal_network_cidr(
        &self,
        _resolved: &ResolvedConfig,
        _state: &State,
    ) -> Result<(), ControlError> {
        Ok(())
    }
    async fn advertise_machine(
        &self,
        _resolved: &ResolvedConfig,
        _state: &State,
        _now: DateTime<Utc>,
    ) -> Result<(), ControlError> {
        Ok(())
    }
    async fn list_machines(
        &self,
        _resolved: &ResolvedConfig,
        _state: &State,
    ) -> Result<Vec<MachineRow>, ControlError> {
        Ok(self.machines.lock().unwrap().clone())
    }
}

struct ProvingRig {
    controller: Arc<NetworkController>,
    state_store: Arc<MemoryStateStore>,
    platform: Arc<RecordingPlatform>,
    corrosion: Arc<RecordingCorrosion>,
    workspace: tempfile::TempDir,
}

fn forge_rig() -> ProvingRig {
    let state_store = Arc::new(MemoryStateStore::default());
    let platform = Arc::new(RecordingPlatform::default());
    let corrosion = Arc::new(RecordingCorrosion::default());

    let controller = Arc::new(NetworkController::new(
        Arc::clone(&state_store) as Arc<dyn StateStore>,
        Arc::clone(&platform) as Arc<dyn PlatformOps>,
        Arc::clone(&corrosion) as Arc<dyn CorrosionRuntime>,
        Arc::new(SilentContainers) as Arc<dyn ContainerRuntime>,
        Arc::new(AllGreenProber),
        Arc::new(FakeGateway::default()),
        Arc::new(SystemClock) as Arc<dyn Clock>,
    ));

    ProvingRig {
        controller,
        state_store,
        platform,
        corrosion,
        workspace: tempfile::tempdir().expect("tempdir"),
    }
}

fn intent(rig: &ProvingRig, network: &str, cidr: &str) -> Config {
    Config {
        network: Some(network.to_string()),
        data_root: Some(rig.workspace.path().join(network)),
        network_cidr: Some(cidr.parse().unwrap()),
        ..Config::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /**
     * CERTIFICACIÓN (arranque en frío): State acuñado con fase Running,
     * subred 10.210.0.0/24, claves Curve25519 de 32 bytes, gestión en
     * el prefijo moderno, member id no nulo y token de 64 hex.
     */
    #[tokio::test]
    async fn certify_fresh_start_mints_identity() {
        println!("\n🧪 [PROVING_GROUNDS]: Cold-start identity minting...");

        let rig = forge_rig();
        let config = intent(&rig, "default", "10.210.0.0/16");

        let resolved = rig.controller.start(&config).await.expect("fresh start");
        assert_eq!(resolved.subnet, Some("10.210.0.0/24".parse().unwrap()));

        let state = rig
            .state_store
            .load("default")
            .await
            .unwrap()
            .expect("state must exist");
        assert_eq!(state.phase, Phase::Running);
        assert_eq!(state.subnet.to_string(), "10.210.0.0/24");
        assert_eq!(&state.management_ip.octets()[..6], &[0xfd, 0x8c, 0x88, 0xad, 0x7f, 0x06]);
        assert_eq!(WgKey::parse(&state.wg_private_key).unwrap().as_bytes().len(), 32);
        assert_eq!(WgKey::parse(&state.wg_public_key).unwrap().as_bytes().len(), 32);
        assert!(state.corrosion_member_id > 0, "member id must be non-zero");
        assert_eq!(state.corrosion_api_token.len(), 64);
        assert!(state.corrosion_api_token.chars().all(|c| c.is_ascii_hexdigit()));

        // Orden de la secuencia de plataforma.
        let platform_log = rig.platform.call_log();
        let position = |call: &str| {
            platform_log
                .iter()
                .position(|entry| entry.starts_with(call))
                .unwrap_or_else(|| panic!("missing platform call {call}: {platform_log:?}"))
        };
        assert!(position("prepare") < position("configure_wireguard:0"));
        assert!(position("configure_wireguard:0") < position("ensure_docker_network"));
        assert!(position("ensure_docker_network") < position("after_start"));
        assert_eq!(rig.corrosion.calls.lock().unwrap().as_slice(), ["write_config", "start"]);

        println!("   ✅ [SUCCESS]: Identity and sequence certified.");
    }

    /**
     * CERTIFICACIÓN (idempotencia): el segundo Start no re-ejecuta la
     * plataforma y devuelve la misma configuración resuelta.
     */
    #[tokio::test]
    async fn certify_double_start_is_idempotent() {
        let rig = forge_rig();
        let config = intent(&rig, "default", "10.210.0.0/16");

        let first_resolution = rig.controller.start(&config).await.expect("first start");
        let calls_after_first = rig.platform.call_log().len();

        let second_resolution = rig.controller.start(&config).await.expect("second start");
        assert_eq!(first_resolution, second_resolution, "L2_RESOLUTION_DRIFT");
        assert_eq!(
            rig.platform.call_log().len(),
            calls_after_first,
            "L2_IDEMPOTENCE_VIOLATION: platform touched on running network"
        );
    }

    /**
     * CERTIFICACIÓN (escenario del protocolo): net-a con 10.210.0.0/16
     * y net-b con 10.210.1.0/24 en el mismo host — el segundo arranque
     * colapsa con un veredicto que nombra ambas redes.
     */
    #[tokio::test]
    async fn certify_cidr_overlap_between_host_networks() {
        let rig = forge_rig();
        rig.controller
            .start(&intent(&rig, "net-a", "10.210.0.0/16"))
            .await
            .expect("net-a start");

        let verdict = rig.controller.start(&intent(&rig, "net-b", "10.210.1.0/24")).await;
        let fault_text = verdict.expect_err("overlap must be rejected").to_string();
        assert!(fault_text.contains("net-a"), "missing net-a in: {fault_text}");
        assert!(fault_text.contains("net-b"), "missing net-b in: {fault_text}");

        // Precondición fallida: el State de net-b jamás se materializa.
        assert!(rig.state_store.load("net-b").await.unwrap().is_none());
    }

    /**
     * CERTIFICACIÓN (escenario del protocolo): Stop con purge — fila
     * eliminada, raíz de datos retirada y Status reporta no configurada.
     */
    #[tokio::test]
    async fn certify_stop_with_purge_is_terminal() {
        let rig = forge_rig();
        let config = intent(&rig, "default", "10.210.0.0/16");
        rig.controller.start(&config).await.expect("start");

        // Residuo dentro de la raíz de datos que la purga debe llevarse.
        let data_root = rig.workspace.path().join("default");
        tokio::fs::create_dir_all(&data_root).await.unwrap();
        tokio::fs::write(data_root.join("residue.bin"), b"x").await.unwrap();

        rig.controller.stop(&config, true).await.expect("stop with purge");

        assert!(rig.state_store.load("default").await.unwrap().is_none());
        assert!(!data_root.exists(), "data root must be removed on purge");

        let status = rig.controller.status(&config).await.expect("status");
        assert!(!status.configured);
        assert!(!status.running);

        // Secuencia de limpieza completa antes de la purga.
        let platform_log = rig.platform.call_log();
        assert!(platform_log.iter().any(|c| c == "cleanup_docker_network"));
        assert!(platform_log.iter().any(|c| c == "cleanup_wireguard"));
        assert!(platform_log.iter().any(|c| c == "after_stop"));
    }

    /**
     * CERTIFICACIÓN (falla en vuelo): la máquina de fases registra
     * 'Failed' y un Start posterior puede recuperar la red.
     */
    #[tokio::test]
    async fn certify_inflight_failure_records_failed_phase() {
        let rig = forge_rig();
        let config = intent(&rig, "default", "10.210.0.0/16");

        rig.platform.fail_prepare.store(true, Ordering::SeqCst);
        let verdict = rig.controller.start(&config).await;
        assert!(verdict.is_err(), "sabotaged start must fail");

        let wounded = rig.state_store.load("default").await.unwrap().expect("state persisted");
        assert_eq!(wounded.phase, Phase::Failed, "L2_PHASE_MISS: failure not recorded");

        // Recuperación: Failed => Starting => Running.
        rig.platform.fail_prepare.store(false, Ordering::SeqCst);
        rig.controller.start(&config).await.expect("recovery start");
        let healed = rig.state_store.load("default").await.unwrap().unwrap();
        assert_eq!(healed.phase, Phase::Running);
    }
}
