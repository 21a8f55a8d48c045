// [tests/mirror/libs/core/overlay/ipam_allocation.test.rs]
/*!
 * =================================================================
 * APARATO: CERTIFICADOR DE ASIGNACIÓN IPAM (V2.0 - FIRST FIT)
 * CLASIFICACIÓN: TRINITY EVIDENCE // ESTRATO L1-MIRROR
 * RESPONSABILIDAD: AUDITORÍA DE SUBREDES Y SOLAPAMIENTO ENTRE REDES
 * =================================================================
 */

use ipnet::Ipv4Net;

use ployz_core_overlay::{allocate_subnet, build_peer_specs, ensure_no_overlap, OverlayError};
use ployz_core_overlay::{management_ip_from_key, WgKeyPair};
use ployz_domain_models::Peer;

fn net(wire: &str) -> Ipv4Net {
    wire.parse().unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;

    /**
     * CERTIFICACIÓN: First-fit determinista — dos agentes con la misma
     * vista eligen la misma /24 libre.
     */
    #[test]
    fn certify_first_fit_is_deterministic() {
        println!("\n🧪 [PROVING_GROUNDS]: Auditing first-fit subnet allocation...");

        let cidr = net("10.210.0.0/16");
        let taken = vec![net("10.210.0.0/24"), net("10.210.1.0/24"), net("10.210.3.0/24")];

        let first_choice = allocate_subnet(cidr, &taken).unwrap();
        let second_choice = allocate_subnet(cidr, &taken).unwrap();

        assert_eq!(first_choice, net("10.210.2.0/24"), "L1_IPAM_DRIFT: gap must be reused");
        assert_eq!(first_choice, second_choice);
        println!("   ✅ [SUCCESS]: Deterministic slot {} chosen twice.", first_choice);
    }

    /**
     * CERTIFICACIÓN: El veredicto de solapamiento nombra ambas redes
     * para el triaje del operador (escenario net-a / net-b).
     */
    #[test]
    fn certify_overlap_verdict_names_both_networks() {
        let host_networks = vec![("net-a".to_string(), net("10.210.0.0/16"))];

        let verdict = ensure_no_overlap("net-b", net("10.210.1.0/24"), &host_networks);
        let fault_text = verdict.expect_err("overlap must be rejected").to_string();

        assert!(fault_text.contains("net-a"), "missing existing network: {fault_text}");
        assert!(fault_text.contains("net-b"), "missing candidate network: {fault_text}");
    }

    /**
     * CERTIFICACIÓN: La proyección de pares es estricta — una fila
     * malformada aborta la reconciliación completa.
     */
    #[test]
    fn certify_projection_strictness() {
        let forge_peer = || {
            let pair = WgKeyPair::generate();
            Peer {
                management_ip: management_ip_from_key(&pair.public_key).to_string(),
                public_key: pair.public_key.to_base64(),
                endpoint: Some("203.0.113.7:51820".to_string()),
                subnet: "10.210.5.0/24".to_string(),
            }
        };

        let healthy = vec![forge_peer(), forge_peer()];
        assert_eq!(build_peer_specs(&healthy).unwrap().len(), 2);

        let mut poisoned = healthy;
        poisoned[1].public_key = "clave-rota".to_string();
        assert!(matches!(
            build_peer_specs(&poisoned),
            Err(OverlayError::MalformedKey(_))
        ));
    }
}
