// [libs/infra/registry/src/events.rs]
/*!
 * =================================================================
 * APARATO: WIRE EVENT PARSER (V6.1 - FRAME AUTHORITY)
 * CLASIFICACIÓN: INFRASTRUCTURE CORE (ESTRATO L3)
 * RESPONSABILIDAD: DECODIFICACIÓN DE TRAMAS NDJSON DEL REGISTRO
 *
 * Contrato de alambre: cada línea es un objeto JSON de una sola llave:
 *   {"columns": [..]} | {"row": [row_id, [cells]]} |
 *   {"eoq": {"time": t, "change_id": n?}} |
 *   {"change": [tipo, row_id, [cells], change_id]} | {"error": {..}}
 * =================================================================
 */

use serde_json::Value;

use crate::errors::RegistryError;

/// Clase de mutación transportada por un evento de cambio.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

impl ChangeKind {
    fn parse(label: &str) -> Result<Self, RegistryError> {
        match label {
            "insert" => Ok(ChangeKind::Insert),
            "update" => Ok(ChangeKind::Update),
            "delete" => Ok(ChangeKind::Delete),
            other => Err(RegistryError::Decode(format!("unknown change type '{other}'"))),
        }
    }
}

/// Evento de una consulta o suscripción del registro.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryEvent {
    /// Cabecera con los nombres de columna del resultado.
    Columns(Vec<String>),
    /// Fila del snapshot inicial.
    Row { row_id: i64, cells: Vec<Value> },
    /// Fin del snapshot; 'change_id' marca el punto de reanudación.
    EndOfQuery { change_id: Option<i64> },
    /// Mutación posterior al snapshot.
    Change { kind: ChangeKind, row_id: i64, cells: Vec<Value>, change_id: i64 },
    /// Error en banda emitido por el servidor.
    Error(String),
}

/**
 * Decodifica una línea NDJSON del registro a su evento tipado.
 *
 * # Errors:
 * - `RegistryError::Decode`: JSON ilegal o trama fuera del contrato.
 */
pub fn parse_event_line(line: &str) -> Result<QueryEvent, RegistryError> {
    let frame: Value = serde_json::from_str(line)
        .map_err(|fault| RegistryError::Decode(format!("illegal JSON frame: {fault}")))?;

    let object = frame
        .as_object()
        .ok_or_else(|| RegistryError::Decode("frame is not a JSON object".to_string()))?;

    if let Some(columns) = object.get("columns") {
        let names = columns
            .as_array()
            .ok_or_else(|| RegistryError::Decode("columns frame is not an array".to_string()))?
            .iter()
            .map(|cell| cell.as_str().unwrap_or_default().to_string())
            .collect();
        return Ok(QueryEvent::Columns(names));
    }

    if let Some(row) = object.get("row") {
        let (row_id, cells) = parse_row_tuple(row)?;
        return Ok(QueryEvent::Row { row_id, cells });
    }

    if let Some(end) = object.get("eoq") {
        let change_id = end.get("change_id").and_then(Value::as_i64);
        return Ok(QueryEvent::EndOfQuery { change_id });
    }

    if let Some(change) = object.get("change") {
        return parse_change_tuple(change);
    }

    if let Some(error) = object.get("error") {
        return Ok(QueryEvent::Error(error.to_string()));
    }

    Err(RegistryError::Decode(format!("unrecognized frame: {line}")))
}

fn parse_row_tuple(row: &Value) -> Result<(i64, Vec<Value>), RegistryError> {
    let tuple = row
        .as_array()
        .filter(|items| items.len() == 2)
        .ok_or_else(|| RegistryError::Decode("row frame is not [row_id, cells]".to_string()))?;

    let row_id = tuple[0]
        .as_i64()
        .ok_or_else(|| RegistryError::Decode("row_id is not an integer".to_string()))?;
    let cells = tuple[1]
        .as_array()
        .cloned()
        .ok_or_else(|| RegistryError::Decode("row cells are not an array".to_string()))?;

    Ok((row_id, cells))
}

fn parse_change_tuple(change: &Value) -> Result<QueryEvent, RegistryError> {
    let tuple = change
        .as_array()
        .filter(|items| items.len() == 4)
        .ok_or_else(|| {
            RegistryError::Decode("change frame is not [type, row_id, cells, change_id]".to_string())
        })?;

    let kind_label = tuple[0]
        .as_str()
        .ok_or_else(|| RegistryError::Decode("change type is not a string".to_string()))?;
    let row_id = tuple[1]
        .as_i64()
        .ok_or_else(|| RegistryError::Decode("change row_id is not an integer".to_string()))?;
    let cells = tuple[2]
        .as_array()
        .cloned()
        .ok_or_else(|| RegistryError::Decode("change cells are not an array".to_string()))?;
    let change_id = tuple[3]
        .as_i64()
        .ok_or_else(|| RegistryError::Decode("change_id is not an integer".to_string()))?;

    Ok(QueryEvent::Change {
        kind: ChangeKind::parse(kind_label)?,
        row_id,
        cells,
        change_id,
    })
}
