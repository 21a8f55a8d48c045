// [libs/domain/models/src/config.rs]
/*!
 * =================================================================
 * APARATO: NETWORK CONFIG NORMALIZER (V9.3 - INTENT RESOLVER)
 * CLASIFICACIÓN: DOMAIN CONTRACT (ESTRATO L2)
 * RESPONSABILIDAD: RESOLUCIÓN DETERMINISTA DE LA INTENCIÓN DEL OPERADOR
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. PURE RESOLUTION: La normalización no toca disco ni red; produce
 *    una 'ResolvedConfig' inmutable que el Controller trata como ley.
 * 2. DERIVACIÓN NOMINAL: Interfaz, contenedores y rutas de Corrosion se
 *    derivan del identificador de red con reglas reproducibles.
 * 3. VALIDATION FIRST: Identificadores y subredes se validan antes de
 *    cualquier efecto sobre el host.
 * =================================================================
 */

use std::net::Ipv6Addr;
use std::path::PathBuf;

use ipnet::Ipv4Net;
use serde::{Deserialize, Serialize};

use crate::errors::ModelError;

/// Identificador de red por omisión.
pub const DEFAULT_NETWORK: &str = "default";
/// CIDR IPv4 por omisión para la malla de contenedores.
pub const DEFAULT_NETWORK_CIDR: &str = "10.210.0.0/16";
/// Raíz de datos por omisión (se le anexa el identificador de red).
pub const DEFAULT_DATA_ROOT: &str = "/var/lib/ployz";
/// Puerto UDP de WireGuard por omisión.
pub const DEFAULT_WG_PORT: u16 = 51820;
/// Prefijo obligatorio de la interfaz WireGuard.
pub const WG_INTERFACE_PREFIX: &str = "plz-";
/// Longitud máxima de un nombre de interfaz de red en Linux.
pub const WG_INTERFACE_MAX_LEN: usize = 15;
/// Imagen por omisión del contenedor del registro replicado.
pub const DEFAULT_CORROSION_IMAGE: &str = "ghcr.io/ployz/corrosion:latest";
/// Dirección local de la API HTTP de Corrosion.
pub const DEFAULT_CORROSION_API_ADDR: &str = "127.0.0.1:51001";
/// Dirección de escucha del gossip SWIM de Corrosion.
pub const DEFAULT_CORROSION_GOSSIP_ADDR: &str = "0.0.0.0:51002";
/// Imagen por omisión del ayudante privilegiado.
pub const DEFAULT_HELPER_IMAGE: &str = "ghcr.io/ployz/helper:latest";
/// Nombre por omisión del contenedor ayudante.
pub const DEFAULT_HELPER_NAME: &str = "ployz-helper";

/// CIDR por omisión ya parseado.
#[must_use]
pub fn default_network_cidr() -> Ipv4Net {
    DEFAULT_NETWORK_CIDR.parse().expect("DEFAULT_NETWORK_CIDR es un literal legal")
}

/**
 * Intención cruda del operador para una red sobre un host.
 * Todos los campos son opcionales; la normalización rellena lo ausente.
 */
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    pub network: Option<String>,
    pub data_root: Option<PathBuf>,
    pub network_cidr: Option<Ipv4Net>,
    pub subnet: Option<Ipv4Net>,
    /// Punto de contacto anunciado al resto de la malla (`host:puerto`).
    pub advertise_endpoint: Option<String>,
    pub wg_interface: Option<String>,
    pub wg_port: Option<u16>,
    pub corrosion_container: Option<String>,
    pub corrosion_image: Option<String>,
    pub corrosion_data_dir: Option<PathBuf>,
    pub corrosion_admin_socket: Option<PathBuf>,
    pub corrosion_api_addr: Option<String>,
    pub corrosion_gossip_addr: Option<String>,
    pub corrosion_member_id: Option<i64>,
    pub corrosion_api_token: Option<String>,
    /// Direcciones `host:puerto` de miembros ya existentes del registro.
    pub corrosion_bootstrap: Vec<String>,
    pub helper_image: Option<String>,
    pub helper_name: Option<String>,
}

/// Parámetros resueltos del runtime de Corrosion para esta red.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorrosionSettings {
    pub container_name: String,
    pub image: String,
    pub data_dir: PathBuf,
    pub admin_socket: PathBuf,
    pub api_addr: String,
    pub gossip_addr: String,
    pub member_id: Option<i64>,
    pub api_token: Option<String>,
    pub bootstrap: Vec<String>,
}

/**
 * Configuración resuelta e inmutable de una red sobre un host.
 *
 * El Controller la produce una vez por operación y la trata como ley:
 * los huecos restantes ('subnet', 'management') se completan durante la
 * reconciliación contra el 'State' persistido, nunca por mutación externa.
 */
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedConfig {
    pub network: String,
    pub data_root: PathBuf,
    pub network_cidr: Option<Ipv4Net>,
    pub subnet: Option<Ipv4Net>,
    /// IPv6 de gestión, derivada de la clave pública WireGuard del host.
    pub management: Option<Ipv6Addr>,
    pub advertise_endpoint: Option<String>,
    pub wg_interface: String,
    pub wg_port: u16,
    /// Nombre de la red Docker que aloja los contenedores de la malla.
    pub docker_network: String,
    pub corrosion: CorrosionSettings,
    pub helper_image: String,
    pub helper_name: String,
}

impl Config {
    /**
     * Normaliza la intención del operador hacia una 'ResolvedConfig'.
     *
     * # Errors:
     * - `ModelError::InvalidNetworkIdentifier`: Identificador fuera del
     *   alfabeto `[a-z0-9-]` o de longitud ilegal.
     * - `ModelError::InvalidInterfaceName`: Interfaz sin prefijo `plz-`
     *   o que excede los 15 caracteres del kernel.
     * - `ModelError::SubnetOutsideCidr`: Subred solicitada fuera del CIDR.
     */
    pub fn normalize(&self) -> Result<ResolvedConfig, ModelError> {
        // 1. IDENTIDAD DE RED
        let network = self
            .network
            .clone()
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| DEFAULT_NETWORK.to_string());
        validate_network_identifier(&network)?;

        // 2. RAÍZ DE DATOS (por red)
        let data_root = self
            .data_root
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_ROOT).join(&network));

        // 3. INTERFAZ WIREGUARD
        let wg_interface = match &self.wg_interface {
            Some(name) => {
                validate_interface_name(name)?;
                name.clone()
            }
            None => derive_interface_name(&network),
        };

        // 4. COHERENCIA CIDR / SUBRED (solo si ambos lados son conocidos)
        if let (Some(subnet), Some(cidr)) = (self.subnet, self.network_cidr) {
            if !cidr.contains(&subnet) {
                return Err(ModelError::SubnetOutsideCidr {
                    subnet: subnet.to_string(),
                    cidr: cidr.to_string(),
                });
            }
        }

        // 5. RUNTIME DE CORROSION
        let corrosion_data_dir = self
            .corrosion_data_dir
            .clone()
            .unwrap_or_else(|| data_root.join("corrosion"));
        let corrosion = CorrosionSettings {
            container_name: self
                .corrosion_container
                .clone()
                .unwrap_or_else(|| format!("ployz-corrosion-{network}")),
            image: self
                .corrosion_image
                .clone()
                .unwrap_or_else(|| DEFAULT_CORROSION_IMAGE.to_string()),
            admin_socket: self
                .corrosion_admin_socket
                .clone()
                .unwrap_or_else(|| corrosion_data_dir.join("admin.sock")),
            data_dir: corrosion_data_dir,
            api_addr: self
                .corrosion_api_addr
                .clone()
                .unwrap_or_else(|| DEFAULT_CORROSION_API_ADDR.to_string()),
            gossip_addr: self
                .corrosion_gossip_addr
                .clone()
                .unwrap_or_else(|| DEFAULT_CORROSION_GOSSIP_ADDR.to_string()),
            member_id: self.corrosion_member_id,
            api_token: self.corrosion_api_token.clone(),
            bootstrap: self.corrosion_bootstrap.clone(),
        };

        Ok(ResolvedConfig {
            docker_network: format!("ployz-{network}"),
            network,
            data_root,
            network_cidr: self.network_cidr,
            subnet: self.subnet,
            management: None,
            advertise_endpoint: self.advertise_endpoint.clone(),
            wg_interface,
            wg_port: self.wg_port.unwrap_or(DEFAULT_WG_PORT),
            corrosion,
            helper_image: self
                .helper_image
                .clone()
                .unwrap_or_else(|| DEFAULT_HELPER_IMAGE.to_string()),
            helper_name: self
                .helper_name
                .clone()
                .unwrap_or_else(|| DEFAULT_HELPER_NAME.to_string()),
        })
    }
}

/// Deriva el nombre de interfaz `plz-<red>` truncado al límite del kernel.
fn derive_interface_name(network: &str) -> String {
    let mut name = format!("{WG_INTERFACE_PREFIX}{network}");
    name.truncate(WG_INTERFACE_MAX_LEN);
    name
}

fn validate_network_identifier(network: &str) -> Result<(), ModelError> {
    let alphabet_legal = network
        .chars()
        .all(|ch| ch.is_ascii_lowercase() || ch.is_ascii_digit() || ch == '-');
    if network.is_empty() || network.len() > 32 || !alphabet_legal {
        return Err(ModelError::InvalidNetworkIdentifier(network.to_string()));
    }
    Ok(())
}

fn validate_interface_name(name: &str) -> Result<(), ModelError> {
    if !name.starts_with(WG_INTERFACE_PREFIX) || name.len() > WG_INTERFACE_MAX_LEN {
        return Err(ModelError::InvalidInterfaceName(name.to_string()));
    }
    Ok(())
}
