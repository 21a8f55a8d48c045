// [tests/mirror/libs/infra/registry/event_decoding.test.rs]
/*!
 * =================================================================
 * APARATO: CERTIFICADOR DE DECODIFICACIÓN DE ALAMBRE (V2.1 - DRIFT SHIELD)
 * CLASIFICACIÓN: TRINITY EVIDENCE // ESTRATO L3-MIRROR
 * RESPONSABILIDAD: TOLERANCIAS DE CELDAS Y TRAMAS DEL REGISTRO
 *
 * # Mathematical Proof (Schema Drift Tolerance):
 * Filas escritas por agentes antiguos (sin columna 'version', con
 * números como strings, con nulls) deben decodificar sin pérdida; el
 * test congela la cascada de tolerancia del contrato.
 * =================================================================
 */

use serde_json::json;

use ployz_infra_registry::events::parse_event_line;
use ployz_infra_registry::repositories::machine::decode_machine_row;
use ployz_infra_registry::QueryEvent;

#[cfg(test)]
mod tests {
    use super::*;

    /**
     * CERTIFICACIÓN: Fila legada sin 'version' final decodifica con
     * version = 1 y endpoint null degrada a ausencia.
     */
    #[test]
    fn certify_legacy_machine_row_decoding() {
        println!("\n🧪 [PROVING_GROUNDS]: Decoding a legacy machine row...");

        let legacy_cells = vec![
            json!("clave-publica"),
            json!("clave-publica"),
            json!("10.210.4.0/24"),
            json!("fd8c:88ad:7f06::4"),
            serde_json::Value::Null,
            json!("2026-03-01T00:00:00.000000000Z"),
            // Sin columna 'version': agente anterior al contrato v2.
        ];

        let row = decode_machine_row(&legacy_cells).expect("legacy row must decode");
        assert_eq!(row.version, 1, "L3_DECODE_DRIFT: missing version must default to 1");
        assert_eq!(row.endpoint, None, "L3_DECODE_DRIFT: null endpoint must degrade to None");
        assert_eq!(row.subnet, "10.210.4.0/24");

        println!("   ✅ [SUCCESS]: Legacy row tolerances certified.");
    }

    /**
     * CERTIFICACIÓN: Cascada numérica — entero nativo, flotante
     * truncado y string base 10 producen la misma versión.
     */
    #[test]
    fn certify_numeric_version_cascade() {
        for version_cell in [json!(7), json!(7.9), json!("7")] {
            let cells = vec![
                json!("id"),
                json!("pk"),
                json!("10.210.4.0/24"),
                json!("fd8c:88ad:7f06::4"),
                json!(""),
                json!("2026-03-01T00:00:00Z"),
                version_cell.clone(),
            ];
            let row = decode_machine_row(&cells).unwrap();
            assert_eq!(row.version, 7, "L3_DECODE_DRIFT: cell {version_cell} must yield 7");
        }
    }

    /**
     * CERTIFICACIÓN: Alfabeto completo de tramas de suscripción en el
     * orden del contrato: columns, rows, eoq, changes.
     */
    #[test]
    fn certify_subscription_frame_sequence() {
        let wire_frames = [
            r#"{"columns":["id","public_key","subnet","management_ip","endpoint","updated_at","version"]}"#,
            r#"{"row":[1,["a","a","10.210.1.0/24","fd8c:88ad:7f06::1","","t",1]]}"#,
            r#"{"eoq":{"time":0.002,"change_id":17}}"#,
            r#"{"change":["insert",2,["b","b","10.210.2.0/24","fd8c:88ad:7f06::2","","t",1],18]}"#,
            r#"{"change":["delete",2,["b","b","10.210.2.0/24","fd8c:88ad:7f06::2","","t",1],19]}"#,
        ];

        let mut decoded = Vec::new();
        for frame in wire_frames {
            decoded.push(parse_event_line(frame).expect("frame must decode"));
        }

        assert!(matches!(decoded[0], QueryEvent::Columns(ref names) if names.len() == 7));
        assert!(matches!(decoded[1], QueryEvent::Row { row_id: 1, .. }));
        assert!(matches!(decoded[2], QueryEvent::EndOfQuery { change_id: Some(17) }));
        assert!(matches!(decoded[3], QueryEvent::Change { change_id: 18, .. }));
        assert!(matches!(decoded[4], QueryEvent::Change { change_id: 19, .. }));
    }
}
