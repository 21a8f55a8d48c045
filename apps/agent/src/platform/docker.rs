// [apps/agent/src/platform/docker.rs]
/*!
 * =================================================================
 * APARATO: DOCKER ENGINE ADAPTER (V6.1 - CLI BRIDGE)
 * CLASIFICACIÓN: APPLICATION ADAPTER (ESTRATO L4)
 * RESPONSABILIDAD: CONTRATO 'ContainerRuntime' SOBRE LA CLI DE DOCKER
 * =================================================================
 */

use std::time::Duration;

use async_trait::async_trait;
use ipnet::Ipv4Net;
use tracing::debug;

use ployz_domain_control::{ContainerInfo, ContainerRuntime, ContainerSpec, ControlError};

use super::command::{run_tool, run_tool_tolerating};

/// Cadencia de la sonda del daemon en 'wait_ready'.
const DAEMON_PROBE_INTERVAL: Duration = Duration::from_millis(500);

/// Adaptador del motor de contenedores del host.
#[derive(Debug, Clone, Default)]
pub struct DockerEngine;

impl DockerEngine {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ContainerRuntime for DockerEngine {
    async fn inspect_container(&self, name: &str) -> Result<Option<ContainerInfo>, ControlError> {
        match run_tool("docker", &["inspect", "--format", "{{.State.Running}}", name]).await {
            Ok(stdout) => Ok(Some(ContainerInfo {
                name: name.to_string(),
                running: stdout.trim() == "true",
            })),
            Err(ControlError::Transient(detail)) if detail.contains("No such") => Ok(None),
            Err(other_fault) => Err(other_fault),
        }
    }

    async fn create_container(&self, spec: &ContainerSpec) -> Result<(), ControlError> {
        let mut arguments: Vec<String> =
            vec!["create".into(), "--name".into(), spec.name.clone(), "--restart".into(), "unless-stopped".into()];

        match &spec.network {
            Some(network_name) => {
                arguments.push("--network".into());
                arguments.push(network_name.clone());
            }
            None => {
                arguments.push("--network".into());
                arguments.push("host".into());
            }
        }

        for (host_path, container_path) in &spec.volumes {
            arguments.push("-v".into());
            arguments.push(format!("{}:{}", host_path.display(), container_path.display()));
        }
        for (key, value) in &spec.env {
            arguments.push("-e".into());
            arguments.push(format!("{key}={value}"));
        }
        arguments.push(spec.image.clone());

        let argument_refs: Vec<&str> = arguments.iter().map(String::as_str).collect();
        run_tool("docker", &argument_refs).await.map(|_| ())
    }

    async fn start_container(&self, name: &str) -> Result<(), ControlError> {
        run_tool("docker", &["start", name]).await.map(|_| ())
    }

    async fn stop_container(&self, name: &str) -> Result<(), ControlError> {
        run_tool_tolerating("docker", &["stop", name], &["No such"]).await
    }

    async fn remove_container(&self, name: &str) -> Result<(), ControlError> {
        run_tool_tolerating("docker", &["rm", "-f", name], &["No such"]).await
    }

    async fn container_logs(&self, name: &str, tail_lines: usize) -> Result<String, ControlError> {
        run_tool("docker", &["logs", "--tail", &tail_lines.to_string(), name]).await
    }

    async fn pull_image(&self, image: &str) -> Result<(), ControlError> {
        run_tool("docker", &["pull", image]).await.map(|_| ())
    }

    async fn network_exists(&self, name: &str) -> Result<bool, ControlError> {
        match run_tool("docker", &["network", "inspect", name]).await {
            Ok(_) => Ok(true),
            Err(ControlError::Transient(detail)) if detail.contains("No such") => Ok(false),
            Err(ControlError::Transient(detail)) if detail.contains("not found") => Ok(false),
            Err(other_fault) => Err(other_fault),
        }
    }

    async fn create_network(&self, name: &str, subnet: Ipv4Net) -> Result<(), ControlError> {
        run_tool(
            "docker",
            &["network", "create", "--driver", "bridge", "--subnet", &subnet.to_string(), name],
        )
        .await
        .map(|_| ())
    }

    async fn remove_network(&self, name: &str) -> Result<(), ControlError> {
        run_tool_tolerating("docker", &["network", "rm", name], &["No such", "not found"]).await
    }

    async fn wait_ready(&self, window: Duration) -> Result<(), ControlError> {
        let deadline = tokio::time::Instant::now() + window;
        let mut last_fault = String::from("no probe attempted");

        while tokio::time::Instant::now() < deadline {
            match run_tool("docker", &["info", "--format", "{{.ServerVersion}}"]).await {
                Ok(version) => {
                    debug!("🐳 [DOCKER_READY]: Daemon {} answering.", version.trim());
                    return Ok(());
                }
                Err(probe_fault) => last_fault = probe_fault.to_string(),
            }
            tokio::time::sleep(DAEMON_PROBE_INTERVAL).await;
        }

        Err(ControlError::fatal(
            format!("container daemon silent within {window:?}: {last_fault}"),
            "is the docker daemon running?",
        ))
    }
}
