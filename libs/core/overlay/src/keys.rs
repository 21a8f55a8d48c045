// [libs/core/overlay/src/keys.rs]
/*!
 * =================================================================
 * APARATO: WIREGUARD KEY FORGE (V5.1 - CURVE AUTHORITY)
 * CLASIFICACIÓN: CORE INFRASTRUCTURE (ESTRATO L1)
 * RESPONSABILIDAD: GENERACIÓN Y FORMA DE ALAMBRE DE CLAVES CURVE25519
 * =================================================================
 */

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use rand::rngs::OsRng;
use x25519_dalek::{PublicKey, StaticSecret};

use crate::errors::OverlayError;

/// Clave WireGuard de 32 bytes; en el alambre viaja como base64 estándar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WgKey([u8; 32]);

impl WgKey {
    /// Construye la clave desde sus 32 bytes crudos.
    #[must_use]
    pub fn from_bytes(raw: [u8; 32]) -> Self {
        Self(raw)
    }

    /**
     * Decodifica la forma de alambre base64 de una clave.
     *
     * # Errors:
     * - `OverlayError::MalformedKey`: base64 ilegal o longitud distinta
     *   de 32 bytes.
     */
    pub fn parse(wire: &str) -> Result<Self, OverlayError> {
        let decoded = STANDARD
            .decode(wire.trim())
            .map_err(|_| OverlayError::MalformedKey(wire.to_string()))?;
        let raw: [u8; 32] = decoded
            .try_into()
            .map_err(|_| OverlayError::MalformedKey(wire.to_string()))?;
        Ok(Self(raw))
    }

    /// Bytes crudos de la clave.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Forma de alambre base64 estándar.
    #[must_use]
    pub fn to_base64(&self) -> String {
        STANDARD.encode(self.0)
    }
}

impl std::fmt::Display for WgKey {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(&self.to_base64())
    }
}

/// Par de claves Curve25519 listo para la interfaz de malla.
#[derive(Debug, Clone)]
pub struct WgKeyPair {
    /// Clave privada de la interfaz; jamás abandona el host.
    pub private_key: WgKey,
    /// Clave pública; identidad de la máquina en el registro.
    pub public_key: WgKey,
}

impl WgKeyPair {
    /// Forja un par nuevo con entropía del sistema operativo.
    #[must_use]
    pub fn generate() -> Self {
        let secret = StaticSecret::random_from_rng(OsRng);
        let public = PublicKey::from(&secret);
        Self {
            private_key: WgKey::from_bytes(secret.to_bytes()),
            public_key: WgKey::from_bytes(public.to_bytes()),
        }
    }

    /**
     * Reconstruye el par desde una clave privada persistida, rederivando
     * la pública para detectar corrupción del ledger local.
     *
     * # Errors:
     * - `OverlayError::MalformedKey`.
     */
    pub fn from_private_wire(wire: &str) -> Result<Self, OverlayError> {
        let private_key = WgKey::parse(wire)?;
        let secret = StaticSecret::from(*private_key.as_bytes());
        let public = PublicKey::from(&secret);
        Ok(Self {
            private_key,
            public_key: WgKey::from_bytes(public.to_bytes()),
        })
    }
}
