// [tests/mirror/libs/infra/statedb/state_persistence.test.rs]
/*!
 * =================================================================
 * APARATO: CERTIFICADOR DEL LEDGER LOCAL (V2.2 - MACHINE DB)
 * CLASIFICACIÓN: TRINITY EVIDENCE // ESTRATO L3-MIRROR
 * RESPONSABILIDAD: AUDITORÍA DEL CICLO LOAD/SAVE/DELETE/LIST
 * =================================================================
 */

use std::path::Path;

use ployz_core_overlay::{management_ip_from_key, WgKeyPair};
use ployz_domain_control::StateStore;
use ployz_domain_models::{Phase, State};
use ployz_infra_statedb::{machine_db_path, StateDb};

fn forged_state(network: &str, subnet: &str) -> State {
    let wg_pair = WgKeyPair::generate();
    let host_pair = WgKeyPair::generate();
    State {
        network: network.to_string(),
        network_cidr: "10.210.0.0/16".parse().unwrap(),
        subnet: subnet.parse().unwrap(),
        management_ip: management_ip_from_key(&wg_pair.public_key),
        advertise_endpoint: Some("203.0.113.30:51820".to_string()),
        wg_interface: format!("plz-{network}"),
        wg_port: 51820,
        wg_private_key: wg_pair.private_key.to_base64(),
        wg_public_key: wg_pair.public_key.to_base64(),
        host_private_key: host_pair.private_key.to_base64(),
        host_public_key: host_pair.public_key.to_base64(),
        docker_network: format!("ployz-{network}"),
        corrosion_container: format!("ployz-corrosion-{network}"),
        corrosion_image: "ghcr.io/ployz/corrosion:latest".to_string(),
        corrosion_member_id: 4242,
        corrosion_api_token: "ab".repeat(32),
        corrosion_bootstrap: vec!["203.0.113.31:51002".to_string()],
        last_peer_count: 2,
        phase: Phase::Stopped,
        created_at: chrono::Utc::now(),
        updated_at: chrono::Utc::now(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /**
     * CERTIFICACIÓN: Roundtrip completo del State — lo guardado es lo
     * cargado, bit a bit en los campos de identidad.
     */
    #[tokio::test]
    async fn certify_state_roundtrip() {
        println!("\n🗄️  [PROVING_GROUNDS]: Auditing the machine.db roundtrip...");

        let workspace = tempfile::tempdir().expect("tempdir");
        let data_root = workspace.path().join("default");
        let ledger = StateDb::open(&data_root).await.expect("ledger must open");

        // El ledger vive un nivel por encima de la raíz de datos.
        assert_eq!(ledger.state_path(), workspace.path().join("machine.db"));
        assert_eq!(machine_db_path(Path::new("/var/lib/ployz/default")).to_string_lossy(), "/var/lib/ployz/machine.db");

        let forged = forged_state("default", "10.210.0.0/24");
        ledger.save(&forged).await.expect("save");

        let recovered = ledger.load("default").await.expect("load").expect("row present");
        assert_eq!(recovered.network, forged.network);
        assert_eq!(recovered.subnet, forged.subnet);
        assert_eq!(recovered.management_ip, forged.management_ip);
        assert_eq!(recovered.wg_private_key, forged.wg_private_key);
        assert_eq!(recovered.wg_public_key, forged.wg_public_key);
        assert_eq!(recovered.corrosion_member_id, forged.corrosion_member_id);
        assert_eq!(recovered.corrosion_api_token, forged.corrosion_api_token);
        assert_eq!(recovered.corrosion_bootstrap, forged.corrosion_bootstrap);
        assert_eq!(recovered.last_peer_count, forged.last_peer_count);
        assert_eq!(recovered.phase, Phase::Stopped);

        println!("   ✅ [SUCCESS]: Identity survived the ledger roundtrip.");
    }

    /**
     * CERTIFICACIÓN: Una fila por red (I1) — el save repetido muta la
     * fila existente en vez de duplicarla; list enumera todas las redes.
     */
    #[tokio::test]
    async fn certify_single_row_per_network() {
        let workspace = tempfile::tempdir().expect("tempdir");
        let ledger = StateDb::open(&workspace.path().join("net-a")).await.expect("open");

        let mut first = forged_state("net-a", "10.210.0.0/24");
        ledger.save(&first).await.expect("save one");

        first.transition(Phase::Starting).expect("legal transition");
        first.last_peer_count = 7;
        ledger.save(&first).await.expect("save mutation");

        let second = forged_state("net-b", "10.210.1.0/24");
        ledger.save(&second).await.expect("save sibling");

        let all_states = ledger.list().await.expect("list");
        assert_eq!(all_states.len(), 2, "L3_LEDGER_DUPLICATION");
        let recovered_a = all_states.iter().find(|s| s.network == "net-a").unwrap();
        assert_eq!(recovered_a.phase, Phase::Starting);
        assert_eq!(recovered_a.last_peer_count, 7);
    }

    /**
     * CERTIFICACIÓN: Migración al cargar — una IPv6 de gestión con el
     * prefijo legado fdcc::/16 se corrige al prefijo moderno (I2).
     */
    #[tokio::test]
    async fn certify_legacy_management_corrected_on_load() {
        let workspace = tempfile::tempdir().expect("tempdir");
        let ledger = StateDb::open(&workspace.path().join("legada")).await.expect("open");

        let mut legacy = forged_state("legada", "10.210.2.0/24");
        legacy.management_ip = "fdcc:1111:2222:0102:0304:0506:0708:090a".parse().unwrap();
        ledger.save(&legacy).await.expect("save legacy");

        let recovered = ledger.load("legada").await.expect("load").expect("present");
        assert_eq!(
            recovered.management_ip,
            "fd8c:88ad:7f06:0102:0304:0506:0708:090a".parse::<std::net::Ipv6Addr>().unwrap(),
            "L3_MIGRATION_MISS: legacy prefix must be rewritten on load"
        );
    }

    /**
     * CERTIFICACIÓN: Delete es terminal y el load posterior devuelve
     * ausencia limpia.
     */
    #[tokio::test]
    async fn certify_delete_is_terminal() {
        let workspace = tempfile::tempdir().expect("tempdir");
        let ledger = StateDb::open(&workspace.path().join("efimera")).await.expect("open");

        ledger.save(&forged_state("efimera", "10.210.3.0/24")).await.expect("save");
        ledger.delete("efimera").await.expect("delete");
        assert!(ledger.load("efimera").await.expect("load").is_none());
    }
}
