// [tests/mirror/libs/domain/models/phase_machine.test.rs]
/*!
 * =================================================================
 * APARATO: CERTIFICADOR DE LA MÁQUINA DE FASES (V2.1 - LIFECYCLE)
 * CLASIFICACIÓN: TRINITY EVIDENCE // ESTRATO L2-MIRROR
 * RESPONSABILIDAD: AUDITORÍA DE LA TABLA LEGAL DE TRANSICIONES
 *
 * # Mathematical Proof (Closed Transition Set):
 * El test enumera el producto cartesiano completo de fases (7x7) y
 * certifica que exactamente las 16 aristas de la tabla legal mutan el
 * State; cualquier otra arista deja la fase intacta.
 * =================================================================
 */

use ployz_domain_models::{Phase, State};

fn forged_state(phase: Phase) -> State {
    State {
        network: "default".to_string(),
        network_cidr: "10.210.0.0/16".parse().unwrap(),
        subnet: "10.210.0.0/24".parse().unwrap(),
        management_ip: "fd8c:88ad:7f06::1".parse().unwrap(),
        advertise_endpoint: None,
        wg_interface: "plz-default".to_string(),
        wg_port: 51820,
        wg_private_key: "priv".to_string(),
        wg_public_key: "pub".to_string(),
        host_private_key: "hp".to_string(),
        host_public_key: "hq".to_string(),
        docker_network: "ployz-default".to_string(),
        corrosion_container: "ployz-corrosion-default".to_string(),
        corrosion_image: "ghcr.io/ployz/corrosion:latest".to_string(),
        corrosion_member_id: 11,
        corrosion_api_token: "cafe".repeat(16),
        corrosion_bootstrap: vec![],
        last_peer_count: 0,
        phase,
        created_at: chrono::Utc::now(),
        updated_at: chrono::Utc::now(),
    }
}

const ALL_PHASES: [Phase; 7] = [
    Phase::Unconfigured,
    Phase::Stopped,
    Phase::Starting,
    Phase::Running,
    Phase::Stopping,
    Phase::Purged,
    Phase::Failed,
];

#[cfg(test)]
mod tests {
    use super::*;

    /**
     * CERTIFICACIÓN: El conjunto de transiciones es exactamente el de
     * la tabla legal del ciclo de vida; ni una arista más.
     */
    #[test]
    fn certify_transition_set_is_closed() {
        println!("\n🧪 [PROVING_GROUNDS]: Auditing the 7x7 phase transition lattice...");

        use Phase::*;
        let legal_edges = [
            (Unconfigured, Starting),
            (Unconfigured, Purged),
            (Stopped, Starting),
            (Stopped, Purged),
            (Starting, Running),
            (Starting, Stopping),
            (Starting, Failed),
            (Running, Stopping),
            (Running, Failed),
            (Stopping, Stopped),
            (Stopping, Purged),
            (Stopping, Failed),
            (Purged, Starting),
            (Failed, Starting),
            (Failed, Stopping),
            (Failed, Purged),
        ];

        let mut certified_edges = 0;
        for origin in ALL_PHASES {
            for destination in ALL_PHASES {
                let expected_legal = legal_edges.contains(&(origin, destination));
                assert_eq!(
                    origin.can_transition(destination),
                    expected_legal,
                    "L2_PHASE_DRIFT: edge {origin} => {destination}"
                );
                if expected_legal {
                    certified_edges += 1;
                }
            }
        }
        assert_eq!(certified_edges, 16, "L2_PHASE_DRIFT: legal edge count changed");

        println!("   ✅ [SUCCESS]: 16 legal edges certified; 33 illegal edges rejected.");
    }

    /**
     * CERTIFICACIÓN: Una transición ilegal jamás muta la fase persistida.
     */
    #[test]
    fn certify_illegal_transition_leaves_state_untouched() {
        for origin in ALL_PHASES {
            for destination in ALL_PHASES {
                let mut state = forged_state(origin);
                let verdict = state.transition(destination);

                if origin.can_transition(destination) {
                    assert!(verdict.is_ok());
                    assert_eq!(state.phase, destination);
                } else {
                    assert!(verdict.is_err(), "edge {origin} => {destination} must fail");
                    assert_eq!(
                        state.phase, origin,
                        "L2_PHASE_CORRUPTION: illegal edge {origin} => {destination} mutated state"
                    );
                }
            }
        }
    }
}
