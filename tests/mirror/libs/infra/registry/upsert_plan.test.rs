// [tests/mirror/libs/infra/registry/upsert_plan.test.rs]
/*!
 * =================================================================
 * APARATO: CERTIFICADOR DEL CAS DE VERSIÓN (V2.2 - RACE ARBITER)
 * CLASIFICACIÓN: TRINITY EVIDENCE // ESTRATO L3-MIRROR
 * RESPONSABILIDAD: AUDITORÍA DEL PLAN DE UPSERT CON CONCURRENCIA OPTIMISTA
 *
 * # Mathematical Proof (Deterministic Arbitration):
 * De N escritores que leyeron la versión v, exactamente uno observa su
 * UPDATE confirmado a v+1; el resto ve 'Conflict' al contrastar su
 * expectativa contra la versión ya avanzada.
 * =================================================================
 */

use ployz_core_overlay::{management_ip_from_key, WgKeyPair};
use ployz_domain_models::MachineRow;
use ployz_infra_registry::repositories::{plan_upsert, UpsertPlan};
use ployz_infra_registry::RegistryError;

fn forged_row(version: i64, endpoint: &str) -> MachineRow {
    let pair = WgKeyPair::generate();
    MachineRow {
        id: pair.public_key.to_base64(),
        public_key: pair.public_key.to_base64(),
        subnet: "10.210.6.0/24".to_string(),
        management_ip: management_ip_from_key(&pair.public_key).to_string(),
        endpoint: Some(endpoint.to_string()),
        updated_at: "2026-03-01T00:00:00.000000000Z".to_string(),
        version,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /**
     * CERTIFICACIÓN (escenario del protocolo): fila en v3 actualizada
     * con expectativa 3 → UPDATE con guardia 3 (la versión final será 4);
     * el escritor rezagado con expectativa 3 contra v4 → Conflict y la
     * fila permanece intacta.
     */
    #[test]
    fn certify_version_cas_race_arbitration() {
        println!("\n🧪 [PROVING_GROUNDS]: Arbitrating the v3 endpoint-change race...");

        let stored_v3 = forged_row(3, "203.0.113.9:51820");

        // Primer escritor: cambia el endpoint con la expectativa correcta.
        let mut first_writer_row = stored_v3.clone();
        first_writer_row.endpoint = Some("203.0.113.77:51820".to_string());
        let plan = plan_upsert(Some(&stored_v3), &first_writer_row, 3).unwrap();
        assert_eq!(plan, UpsertPlan::Update { guard_version: 3 });

        // Tras el commit del primero, la fila vive en v4.
        let mut stored_v4 = first_writer_row.clone();
        stored_v4.version = 4;

        // Escritor rezagado: misma expectativa 3 contra la fila avanzada.
        let mut late_writer_row = stored_v3.clone();
        late_writer_row.endpoint = Some("203.0.113.88:51820".to_string());
        let verdict = plan_upsert(Some(&stored_v4), &late_writer_row, 3);

        match verdict {
            Err(RegistryError::Conflict { expected, stored, .. }) => {
                assert_eq!(expected, 3);
                assert_eq!(stored, 4);
            }
            other => panic!("L3_CAS_VIOLATION: late writer must conflict, got {other:?}"),
        }

        println!("   ✅ [SUCCESS]: Exactly one writer wins; the loser sees Conflict.");
    }

    /**
     * CERTIFICACIÓN: Columnas de valor idénticas cortocircuitan en
     * no-op sin consumir versión, incluso con expectativa discrepante.
     */
    #[test]
    fn certify_equality_short_circuits_before_guard() {
        let stored = forged_row(9, "203.0.113.9:51820");
        let mut incoming = stored.clone();
        incoming.version = 0;
        incoming.updated_at = "2026-04-01T00:00:00.000000000Z".to_string();

        let plan = plan_upsert(Some(&stored), &incoming, 2).unwrap();
        assert_eq!(plan, UpsertPlan::Noop { version: 9 });
    }

    /**
     * CERTIFICACIÓN: Expectativa cero desactiva la guardia (escritura
     * de primer anuncio) y fila ausente con expectativa no nula es
     * conflicto contra versión almacenada 0.
     */
    #[test]
    fn certify_zero_expectation_and_absent_row_semantics() {
        let stored = forged_row(5, "203.0.113.9:51820");
        let mut incoming = stored.clone();
        incoming.subnet = "10.210.7.0/24".to_string();
        assert_eq!(
            plan_upsert(Some(&stored), &incoming, 0).unwrap(),
            UpsertPlan::Update { guard_version: 5 }
        );

        let fresh = forged_row(0, "203.0.113.9:51820");
        assert_eq!(plan_upsert(None, &fresh, 0).unwrap(), UpsertPlan::Insert);
        assert!(matches!(
            plan_upsert(None, &fresh, 2),
            Err(RegistryError::Conflict { stored: 0, .. })
        ));
    }
}
