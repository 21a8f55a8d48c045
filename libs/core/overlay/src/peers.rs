// [libs/core/overlay/src/peers.rs]
/*!
 * =================================================================
 * APARATO: PEER PROJECTION ENGINE (V5.4 - STRICT PARSER)
 * CLASIFICACIÓN: CORE INFRASTRUCTURE (ESTRATO L1)
 * RESPONSABILIDAD: PROYECCIÓN DE FILAS DE MÁQUINA A PARES WIREGUARD
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. STRICT MODE: El primer error de parseo aborta la reconciliación
 *    completa; una fila corrupta jamás se descarta en silencio.
 * 2. PREFIX SET: Los prefijos permitidos de cada par son exactamente
 *    {gestión/128, subred}; nada más entra a la tabla de rutas.
 * =================================================================
 */

use std::net::{IpAddr, SocketAddr};

use ipnet::{IpNet, Ipv4Net, Ipv6Net};

use ployz_domain_models::Peer;

use crate::errors::OverlayError;
use crate::keys::WgKey;

/// Entrada estrictamente tipada del estrato WireGuard para un par remoto.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerSpec {
    /// Clave pública parseada del par.
    pub public_key: WgKey,
    /// Punto de contacto `ip:puerto`, si el par lo anuncia.
    pub endpoint: Option<SocketAddr>,
    /// Prefijos enrutados hacia el par: {gestión/128, subred}.
    pub allowed_prefixes: Vec<IpNet>,
}

/// Prefijo de host (/32 o /128) para una dirección individual.
#[must_use]
pub fn single_ip(address: IpAddr) -> IpNet {
    match address {
        IpAddr::V4(v4) => IpNet::V4(Ipv4Net::new(v4, 32).expect("/32 siempre es legal")),
        IpAddr::V6(v6) => IpNet::V6(Ipv6Net::new(v6, 128).expect("/128 siempre es legal")),
    }
}

/**
 * Proyecta las filas de máquina remotas a especificaciones de par.
 *
 * # Errors:
 * - `OverlayError::MalformedKey` / `MalformedPrefix` / `MalformedEndpoint`:
 *   la primera fila ilegal aborta la proyección completa y el fallo se
 *   propaga al llamador de la reconciliación.
 */
pub fn build_peer_specs(peers: &[Peer]) -> Result<Vec<PeerSpec>, OverlayError> {
    peers.iter().map(build_single_spec).collect()
}

fn build_single_spec(peer: &Peer) -> Result<PeerSpec, OverlayError> {
    let public_key = WgKey::parse(&peer.public_key)?;

    let management_address: IpAddr =
        peer.management_ip
            .parse()
            .map_err(|_| OverlayError::MalformedPrefix {
                field: "management_ip",
                value: peer.management_ip.clone(),
            })?;

    let subnet: Ipv4Net = peer
        .subnet
        .parse()
        .map_err(|_| OverlayError::MalformedPrefix {
            field: "subnet",
            value: peer.subnet.clone(),
        })?;

    let endpoint = match &peer.endpoint {
        Some(wire) if !wire.is_empty() => Some(
            wire.parse::<SocketAddr>()
                .map_err(|_| OverlayError::MalformedEndpoint(wire.clone()))?,
        ),
        _ => None,
    };

    Ok(PeerSpec {
        public_key,
        endpoint,
        allowed_prefixes: vec![single_ip(management_address), IpNet::V4(subnet)],
    })
}
