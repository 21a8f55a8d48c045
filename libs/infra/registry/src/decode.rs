// [libs/infra/registry/src/decode.rs]
/*!
 * =================================================================
 * APARATO: TOLERANT CELL DECODER (V6.2 - SCHEMA DRIFT SHIELD)
 * CLASIFICACIÓN: INFRASTRUCTURE CORE (ESTRATO L3)
 * RESPONSABILIDAD: TRANSFORMACIÓN DE CELDAS JSON A TIPOS DEL DOMINIO
 *
 * Tolerancias del contrato de alambre:
 * - Texto: string directa; null degrada a cadena vacía.
 * - Enteros: número primero, luego flotante truncado, luego string
 *   en base 10 (filas escritas por versiones antiguas del agente).
 * - Columnas finales ausentes (filas legadas sin 'version') degradan
 *   al valor por omisión del contrato.
 * =================================================================
 */

use serde_json::Value;

use crate::errors::RegistryError;

/// Texto de la celda; null o celda ausente degradan a cadena vacía.
#[must_use]
pub fn cell_text(cells: &[Value], index: usize) -> String {
    match cells.get(index) {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(text)) => text.clone(),
        Some(other) => other.to_string(),
    }
}

/// Texto opcional: la cadena vacía (y el null de alambre) degradan a None.
#[must_use]
pub fn cell_opt_text(cells: &[Value], index: usize) -> Option<String> {
    let text = cell_text(cells, index);
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

/**
 * Entero de la celda con la cascada de tolerancia del contrato.
 *
 * # Errors:
 * - `RegistryError::Decode`: la celda existe pero no admite ninguna de
 *   las tres codificaciones numéricas.
 */
pub fn cell_i64(cells: &[Value], index: usize) -> Result<i64, RegistryError> {
    let cell = cells
        .get(index)
        .ok_or_else(|| RegistryError::Decode(format!("missing cell at index {index}")))?;

    if let Some(number) = cell.as_i64() {
        return Ok(number);
    }
    if let Some(float) = cell.as_f64() {
        return Ok(float.trunc() as i64);
    }
    if let Some(text) = cell.as_str() {
        if let Ok(parsed) = text.parse::<i64>() {
            return Ok(parsed);
        }
    }

    Err(RegistryError::Decode(format!(
        "cell at index {index} is not numeric: {cell}"
    )))
}

/// Entero con valor por omisión para columnas finales ausentes (filas legadas).
#[must_use]
pub fn cell_i64_or(cells: &[Value], index: usize, default: i64) -> i64 {
    if cells.len() <= index {
        return default;
    }
    cell_i64(cells, index).unwrap_or(default)
}
