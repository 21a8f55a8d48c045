// [tests/mirror/libs/core/overlay/management_derivation.test.rs]
/*!
 * =================================================================
 * APARATO: CERTIFICADOR DE DERIVACIÓN DE GESTIÓN (V2.2 - VECTOR FIJO)
 * CLASIFICACIÓN: TRINITY EVIDENCE // ESTRATO L1-MIRROR
 * RESPONSABILIDAD: PARIDAD BIT-PERFECTA DEL MAPEO CLAVE → IPv6
 *
 * # Mathematical Proof (Protocol Vector):
 * Cualquier implementación del protocolo debe reproducir el vector
 * fd8c:88ad:7f06:0102:0304:0506:0708:090a para la clave cuyos diez
 * primeros bytes son 0x01..0x0a; el test lo congela para siempre.
 * =================================================================
 */

use std::net::Ipv6Addr;

use ployz_core_overlay::{
    management_ip_from_key, migrate_legacy_management_addr, WgKey, WgKeyPair,
};

#[cfg(test)]
mod tests {
    use super::*;

    /**
     * CERTIFICACIÓN: Vector fijo del protocolo.
     */
    #[test]
    fn certify_protocol_derivation_vector() {
        println!("\n🧪 [PROVING_GROUNDS]: Freezing the management derivation vector...");

        let mut raw_key = [0u8; 32];
        for (index, byte) in raw_key.iter_mut().take(10).enumerate() {
            *byte = (index + 1) as u8;
        }
        let public_key = WgKey::from_bytes(raw_key);

        let derived = management_ip_from_key(&public_key);
        let frozen_vector: Ipv6Addr = "fd8c:88ad:7f06:0102:0304:0506:0708:090a".parse().unwrap();

        assert_eq!(derived, frozen_vector, "L1_VECTOR_DRIFT: derivation changed");
        println!("   ✅ [SUCCESS]: Vector parity confirmed: {}", derived);
    }

    /**
     * CERTIFICACIÓN: La derivación cae siempre dentro del prefijo de
     * gestión moderno y es estable entre invocaciones.
     */
    #[test]
    fn certify_derivation_lands_in_management_prefix() {
        for _ in 0..32 {
            let pair = WgKeyPair::generate();
            let derived = management_ip_from_key(&pair.public_key);
            assert_eq!(
                &derived.octets()[..6],
                &[0xfd, 0x8c, 0x88, 0xad, 0x7f, 0x06],
                "L1_PREFIX_ESCAPE: {derived}"
            );
            assert_eq!(derived, management_ip_from_key(&pair.public_key));
        }
    }

    /**
     * CERTIFICACIÓN: Migración del prefijo legado — no-op sobre
     * direcciones modernas, reescritura con identidad preservada sobre
     * direcciones fdcc::/16.
     */
    #[test]
    fn certify_legacy_migration_roundtrip() {
        // No-op sobre una dirección ya moderna.
        let pair = WgKeyPair::generate();
        let modern = management_ip_from_key(&pair.public_key);
        assert_eq!(migrate_legacy_management_addr(modern), modern);

        // Reescritura del prefijo legado preservando los 10 bytes bajos.
        let legacy: Ipv6Addr = "fdcc:9999:aaaa:0102:0304:0506:0708:090a".parse().unwrap();
        let migrated = migrate_legacy_management_addr(legacy);
        assert_eq!(
            migrated,
            "fd8c:88ad:7f06:0102:0304:0506:0708:090a".parse::<Ipv6Addr>().unwrap()
        );
        assert_eq!(migrated.octets()[6..], legacy.octets()[6..]);

        // Idempotencia: migrar dos veces es migrar una.
        assert_eq!(migrate_legacy_management_addr(migrated), migrated);
    }
}
