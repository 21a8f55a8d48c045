// [tests/mirror/libs/domain/models/config_normalization.test.rs]
/*!
 * =================================================================
 * APARATO: CERTIFICADOR DE NORMALIZACIÓN (V2.0 - INTENT RESOLVER)
 * CLASIFICACIÓN: TRINITY EVIDENCE // ESTRATO L2-MIRROR
 * RESPONSABILIDAD: AUDITORÍA DE LA RESOLUCIÓN DE INTENCIÓN
 * =================================================================
 */

use std::path::PathBuf;

use ployz_domain_models::{Config, ModelError};

#[cfg(test)]
mod tests {
    use super::*;

    /**
     * CERTIFICACIÓN: La intención vacía resuelve a la identidad canónica
     * de la red 'default' con derivaciones reproducibles.
     */
    #[test]
    fn certify_empty_intent_resolves_to_canonical_defaults() {
        println!("\n🧪 [PROVING_GROUNDS]: Resolving empty operator intent...");

        let resolved = Config::default().normalize().expect("empty intent must resolve");

        assert_eq!(resolved.network, "default");
        assert_eq!(resolved.wg_interface, "plz-default");
        assert_eq!(resolved.wg_port, 51820);
        assert_eq!(resolved.docker_network, "ployz-default");
        assert_eq!(resolved.data_root, PathBuf::from("/var/lib/ployz/default"));
        assert_eq!(resolved.corrosion.container_name, "ployz-corrosion-default");
        assert_eq!(
            resolved.corrosion.data_dir,
            PathBuf::from("/var/lib/ployz/default/corrosion")
        );
        assert_eq!(
            resolved.corrosion.admin_socket,
            PathBuf::from("/var/lib/ployz/default/corrosion/admin.sock")
        );
        // Identidad del registro: aún sin acuñar en la fase de intención.
        assert!(resolved.corrosion.member_id.is_none());
        assert!(resolved.corrosion.api_token.is_none());
        assert!(resolved.management.is_none());

        println!("   ✅ [SUCCESS]: Canonical derivations certified.");
    }

    /**
     * CERTIFICACIÓN: Resolución determinista — normalizar dos veces la
     * misma intención produce configuraciones idénticas.
     */
    #[test]
    fn certify_normalization_is_deterministic() {
        let intent = Config {
            network: Some("produccion".to_string()),
            network_cidr: Some("10.210.0.0/16".parse().unwrap()),
            advertise_endpoint: Some("203.0.113.40:51820".to_string()),
            corrosion_bootstrap: vec!["203.0.113.41:51002".to_string()],
            ..Config::default()
        };

        let first_pass = intent.normalize().unwrap();
        let second_pass = intent.normalize().unwrap();
        assert_eq!(first_pass, second_pass, "L2_RESOLUTION_DRIFT");
        assert_eq!(first_pass.wg_interface, "plz-produccion");
    }

    /**
     * CERTIFICACIÓN: El alfabeto del identificador y la geometría de la
     * subred se rechazan antes de cualquier efecto.
     */
    #[test]
    fn certify_validation_rejects_illegal_intent() {
        let illegal_identifier = Config {
            network: Some("Red_Mayuscula".to_string()),
            ..Config::default()
        };
        assert!(matches!(
            illegal_identifier.normalize(),
            Err(ModelError::InvalidNetworkIdentifier(_))
        ));

        let foreign_subnet = Config {
            network_cidr: Some("10.210.0.0/16".parse().unwrap()),
            subnet: Some("192.168.1.0/24".parse().unwrap()),
            ..Config::default()
        };
        assert!(matches!(
            foreign_subnet.normalize(),
            Err(ModelError::SubnetOutsideCidr { .. })
        ));

        let oversized_interface = Config {
            wg_interface: Some("plz-interfaz-demasiado-larga".to_string()),
            ..Config::default()
        };
        assert!(matches!(
            oversized_interface.normalize(),
            Err(ModelError::InvalidInterfaceName(_))
        ));
    }
}
