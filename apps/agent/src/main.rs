// [apps/agent/src/main.rs]
/*!
 * =================================================================
 * APARATO: PLOYZ AGENT SHELL (V6.2 - MESH NODE)
 * CLASIFICACIÓN: APPLICATION SHELL (ENTRY POINT)
 * RESPONSABILIDAD: BOOTSTRAP DE ENTORNO E IGNICIÓN DEL KERNEL
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. ARCHITECTURAL PURITY: El shell solo traduce directivas CLI a la
 *    intención del dominio ('Config') y delega en el kernel; ninguna
 *    semántica de malla vive aquí.
 * 2. ZERO ABBREVIATIONS: Nomenclatura nominal absoluta en directivas,
 *    señales y rutas.
 * 3. ERROR TRIAGE: Los fallos de ignición salen con la taxonomía del
 *    plano de control intacta para el triaje del operador.
 * =================================================================
 */

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use dotenvy::dotenv;
use ipnet::Ipv4Net;
use tracing::info;

use ployz_domain_models::Config;
use ployz_shared_atalaya::init_tracing;

mod kernel;
mod platform;

use kernel::AgentKernel;

/**
 * Directivas de mando del agente de malla.
 * Configuración inyectada vía CLI o variables de entorno.
 */
#[derive(Parser, Debug)]
#[command(
    name = "ployz-agent",
    version,
    about = "Ployz mesh agent // per-host network control plane"
)]
struct AgentDirectives {
    /// Identificador de la red de malla a gobernar.
    #[arg(long, env = "PLOYZ_NETWORK", default_value = "default")]
    network: String,

    /// Raíz de datos de la red (por omisión /var/lib/ployz/<red>).
    #[arg(long, env = "PLOYZ_DATA_ROOT")]
    data_root: Option<PathBuf>,

    /// CIDR IPv4 de la malla (se sella en el registro al primer arranque).
    #[arg(long, env = "PLOYZ_NETWORK_CIDR")]
    network_cidr: Option<Ipv4Net>,

    /// Punto de contacto WireGuard anunciado (`host:puerto`).
    #[arg(long, env = "PLOYZ_ADVERTISE_ENDPOINT")]
    advertise_endpoint: Option<String>,

    /// Miembros existentes del registro para el bootstrap (`host:puerto`).
    #[arg(long, env = "PLOYZ_BOOTSTRAP", value_delimiter = ',')]
    bootstrap: Vec<String>,

    #[command(subcommand)]
    command: AgentCommand,
}

#[derive(Subcommand, Debug)]
enum AgentCommand {
    /// Arranca la red sobre este host.
    Start,
    /// Detiene la red; '--purge' elimina estado y datos.
    Stop {
        #[arg(long)]
        purge: bool,
    },
    /// Reporta fase persistida y sondas de infraestructura.
    Status,
    /// Proyecta la vista vigente del registro sobre WireGuard.
    Reconcile,
    /// Arranca la red y entra en el bucle de supervisión continua.
    Supervise,
}

impl AgentDirectives {
    fn to_domain_config(&self) -> Config {
        Config {
            network: Some(self.network.clone()),
            data_root: self.data_root.clone(),
            network_cidr: self.network_cidr,
            advertise_endpoint: self.advertise_endpoint.clone(),
            corrosion_bootstrap: self.bootstrap.clone(),
            ..Config::default()
        }
    }
}

/**
 * Punto de ignición del binario del agente.
 *
 * # Errors:
 * Propaga la taxonomía del plano de control; el código de salida no
 * cero señala al operador que consulte el rastro de Atalaya.
 */
#[tokio::main]
async fn main() -> Result<()> {
    // 1. CARGA DE ENTORNO
    dotenv().ok();

    // 2. OBSERVABILIDAD (ATALAYA)
    init_tracing("ployz_agent");

    // 3. PARSEO DE DIRECTIVAS
    let directives = AgentDirectives::parse();
    let domain_config = directives.to_domain_config();
    info!("💠 [AGENT_SHELL]: Ignition for network '{}'.", directives.network);

    // 4. COMPOSICIÓN DEL KERNEL E IGNICIÓN DEL MANDO
    let agent_kernel = AgentKernel::ignite(domain_config).await?;

    match directives.command {
        AgentCommand::Start => agent_kernel.start().await,
        AgentCommand::Stop { purge } => agent_kernel.stop(purge).await,
        AgentCommand::Status => agent_kernel.status().await,
        AgentCommand::Reconcile => agent_kernel.reconcile().await,
        AgentCommand::Supervise => agent_kernel.supervise().await,
    }
}
