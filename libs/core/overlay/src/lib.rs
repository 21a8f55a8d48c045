// [libs/core/overlay/src/lib.rs]

#![deny(missing_docs)]

//! # APARATO: OVERLAY MATH ROOT (V5.1 - MESH GEOMETRY)
//! CLASIFICACIÓN: CORE INFRASTRUCTURE (ESTRATO L1)
//! RESPONSABILIDAD: MATEMÁTICA PURA DE LA MALLA WIREGUARD
//!
//! ## Visión Holística 2026
//! Autoridad única de las derivaciones deterministas de la malla: toda
//! dirección de gestión, subred asignada y proyección de par WireGuard
//! nace en este estrato y es reproducible bit a bit por cualquier
//! implementación del protocolo.
//!
//! ## Características de Élite
//! 1. **Zero I/O:** Ningún módulo toca disco, red ni reloj.
//! 2. **Strict Projection:** Una fila malformada aborta la proyección
//!    completa; jamás se descarta en silencio.
//! 3. **Nominal Symmetry:** Tipos de clave y prefijo compartidos entre
//!    el Controller y el Supervisor.

/// Definiciones de errores semánticos para el triaje programático de fallos.
pub mod errors;

/// Acuñación de identidad del miembro Corrosion (member id, API token).
pub mod identity;

/// Asignación determinista de subredes dentro del CIDR de la red.
pub mod ipam;

/// Par de claves Curve25519 y su forma de alambre base64.
pub mod keys;

/// Derivación de la IPv6 de gestión y migración del prefijo legado.
pub mod management;

/// Proyección estricta de filas de máquina hacia especificaciones de par.
pub mod peers;

pub use crate::errors::OverlayError;
pub use crate::identity::{mint_api_token, mint_member_id};
pub use crate::ipam::{allocate_subnet, ensure_no_overlap};
pub use crate::keys::{WgKey, WgKeyPair};
pub use crate::management::{
    management_ip_from_key, migrate_legacy_management_addr, MANAGEMENT_PREFIX,
};
pub use crate::peers::{build_peer_specs, single_ip, PeerSpec};
