// [libs/core/overlay/src/ipam.rs]
/*!
 * =================================================================
 * APARATO: SUBNET ALLOCATION ENGINE (V5.3 - FIRST FIT)
 * CLASIFICACIÓN: CORE INFRASTRUCTURE (ESTRATO L1)
 * RESPONSABILIDAD: ASIGNACIÓN DETERMINISTA DE /24 DENTRO DEL CIDR
 *
 * # Mathematical Proof (First Fit Determinism):
 * El recorrido de candidatos es el orden natural de las subredes /24 del
 * CIDR; dos hosts con la misma vista del registro eligen por tanto la
 * misma subred libre, y el conflicto residual lo resuelve el CAS de
 * versión del repositorio de máquinas.
 * =================================================================
 */

use ipnet::Ipv4Net;

use crate::errors::OverlayError;

/// Longitud de prefijo de las subredes asignadas a cada máquina.
const MACHINE_SUBNET_PREFIX: u8 = 24;

/**
 * Elige la primera subred /24 del CIDR que no solape ninguna ya tomada.
 *
 * # Errors:
 * - `OverlayError::CidrTooNarrow`: El CIDR es más estrecho que /24.
 * - `OverlayError::CidrExhausted`: Todas las /24 están reclamadas.
 */
pub fn allocate_subnet(network_cidr: Ipv4Net, taken: &[Ipv4Net]) -> Result<Ipv4Net, OverlayError> {
    let candidates = network_cidr
        .subnets(MACHINE_SUBNET_PREFIX)
        .map_err(|_| OverlayError::CidrTooNarrow(network_cidr.to_string()))?;

    for candidate in candidates {
        let is_free = taken
            .iter()
            .all(|claimed| !claimed.contains(&candidate.network()) && !candidate.contains(&claimed.network()));
        if is_free {
            return Ok(candidate);
        }
    }

    Err(OverlayError::CidrExhausted(network_cidr.to_string()))
}

/**
 * Rechaza el arranque de una red cuyo CIDR solape otra red del host.
 *
 * El error resultante nombra ambas redes para que el operador pueda
 * decidir cuál de las dos reconfigurar.
 *
 * # Errors:
 * - `OverlayError::CidrOverlap`.
 */
pub fn ensure_no_overlap(
    candidate_network: &str,
    candidate_cidr: Ipv4Net,
    existing: &[(String, Ipv4Net)],
) -> Result<(), OverlayError> {
    for (existing_network, existing_cidr) in existing {
        if existing_network == candidate_network {
            continue;
        }
        let overlaps = existing_cidr.contains(&candidate_cidr.network())
            || candidate_cidr.contains(&existing_cidr.network());
        if overlaps {
            return Err(OverlayError::CidrOverlap {
                candidate_network: candidate_network.to_string(),
                candidate_cidr: candidate_cidr.to_string(),
                existing_network: existing_network.clone(),
                existing_cidr: existing_cidr.to_string(),
            });
        }
    }
    Ok(())
}
