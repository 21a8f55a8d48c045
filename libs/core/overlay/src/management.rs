// [libs/core/overlay/src/management.rs]
/*!
 * =================================================================
 * APARATO: MANAGEMENT ADDRESS DERIVER (V5.2 - PREFIX AUTHORITY)
 * CLASIFICACIÓN: CORE INFRASTRUCTURE (ESTRATO L1)
 * RESPONSABILIDAD: DERIVACIÓN DETERMINISTA DE LA IPv6 DE GESTIÓN
 *
 * # Mathematical Proof (Stable Mapping):
 * La función concatena el prefijo fijo de 6 bytes con los primeros 10
 * bytes de la clave pública Curve25519. Al ser una proyección directa de
 * un punto del grupo, dos claves distintas colisionan con probabilidad
 * 2^-80, suficiente para una malla de decenas de miles de máquinas.
 * =================================================================
 */

use std::net::Ipv6Addr;

use crate::keys::WgKey;

/// Prefijo moderno `fd8c:88ad:7f06::/48` de la red de gestión.
pub const MANAGEMENT_PREFIX: [u8; 6] = [0xfd, 0x8c, 0x88, 0xad, 0x7f, 0x06];

/// Primeros dos bytes del prefijo legado `fdcc::/16`.
const LEGACY_PREFIX: [u8; 2] = [0xfd, 0xcc];

/**
 * Deriva la IPv6 de gestión de una máquina desde su clave pública.
 *
 * El mapeo es estable: cualquier implementación del protocolo debe
 * reproducirlo byte a byte.
 */
#[must_use]
pub fn management_ip_from_key(public_key: &WgKey) -> Ipv6Addr {
    let key_bytes = public_key.as_bytes();
    let mut address_octets = [0u8; 16];
    address_octets[..6].copy_from_slice(&MANAGEMENT_PREFIX);
    address_octets[6..].copy_from_slice(&key_bytes[..10]);
    Ipv6Addr::from(address_octets)
}

/**
 * Migra una dirección de gestión del prefijo legado `fdcc::/16` al
 * prefijo moderno, preservando los 10 bytes bajos de identidad.
 *
 * Una dirección ya moderna (o ajena a ambos prefijos) pasa intacta: la
 * rutina es idempotente y segura de aplicar en cada carga del estado.
 */
#[must_use]
pub fn migrate_legacy_management_addr(address: Ipv6Addr) -> Ipv6Addr {
    let mut octets = address.octets();
    if octets[..2] != LEGACY_PREFIX {
        return address;
    }
    octets[..6].copy_from_slice(&MANAGEMENT_PREFIX);
    Ipv6Addr::from(octets)
}
