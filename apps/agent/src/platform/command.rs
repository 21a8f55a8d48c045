// [apps/agent/src/platform/command.rs]
//! =================================================================
//! APARATO: HOST TOOL RUNNER (V6.0 - GUARDED EXEC)
//! RESPONSABILIDAD: EJECUCIÓN VIGILADA DE UTILLAJE DEL HOST
//! =================================================================

use tokio::process::Command;
use tracing::debug;

use ployz_domain_control::ControlError;

/**
 * Ejecuta una herramienta del host y devuelve su stdout.
 *
 * # Errors:
 * - `ControlError::Fatal`: binario ausente o no ejecutable (con pista).
 * - `ControlError::Transient`: salida no exitosa, con stderr embebido.
 */
pub async fn run_tool(program: &str, arguments: &[&str]) -> Result<String, ControlError> {
    debug!("🔧 [TOOL_EXEC]: {} {}", program, arguments.join(" "));

    let output = Command::new(program)
        .args(arguments)
        .output()
        .await
        .map_err(|spawn_fault| {
            ControlError::fatal(
                format!("tool '{program}' is not runnable: {spawn_fault}"),
                "install wireguard-tools, iproute2 and docker, then run 'ployz configure'",
            )
        })?;

    if output.status.success() {
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    } else {
        Err(ControlError::Transient(format!(
            "'{program} {}' exited {}: {}",
            arguments.join(" "),
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        )))
    }
}

/**
 * Variante tolerante: los fallos cuyo stderr contenga alguno de los
 * fragmentos dados se tratan como éxito (operaciones idempotentes del
 * estilo "ya existe" / "no existe").
 */
pub async fn run_tool_tolerating(
    program: &str,
    arguments: &[&str],
    tolerated_fragments: &[&str],
) -> Result<(), ControlError> {
    match run_tool(program, arguments).await {
        Ok(_) => Ok(()),
        Err(ControlError::Transient(detail))
            if tolerated_fragments.iter().any(|fragment| detail.contains(fragment)) =>
        {
            debug!("🔧 [TOOL_TOLERATED]: {}", detail);
            Ok(())
        }
        Err(other_fault) => Err(other_fault),
    }
}
