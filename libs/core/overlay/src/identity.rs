// [libs/core/overlay/src/identity.rs]
/*!
 * =================================================================
 * APARATO: CORROSION IDENTITY MINT (V5.0 - ENTROPY AUTHORITY)
 * CLASIFICACIÓN: CORE INFRASTRUCTURE (ESTRATO L1)
 * RESPONSABILIDAD: ACUÑACIÓN DE IDENTIDAD DEL MIEMBRO DEL REGISTRO
 * =================================================================
 */

use rand::RngCore;

/// Longitud en bytes del token de API del registro (256 bits).
const API_TOKEN_BYTES: usize = 32;

/**
 * Acuña el identificador de miembro Corrosion: 63 bits aleatorios,
 * estrictamente positivo y jamás cero.
 */
#[must_use]
pub fn mint_member_id() -> i64 {
    let mut rng = rand::thread_rng();
    loop {
        let candidate = (rng.next_u64() >> 1) as i64;
        if candidate != 0 {
            return candidate;
        }
    }
}

/// Acuña un token de API de 256 bits codificado como 64 caracteres hex.
#[must_use]
pub fn mint_api_token() -> String {
    let mut raw_token = [0u8; API_TOKEN_BYTES];
    rand::thread_rng().fill_bytes(&mut raw_token);
    hex::encode(raw_token)
}
