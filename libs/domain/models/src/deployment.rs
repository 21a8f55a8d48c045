// [libs/domain/models/src/deployment.rs]

use serde::{Deserialize, Serialize};

/**
 * Fila de la capa de aplicación que describe un despliegue lógico.
 *
 * Las listas de etiquetas y máquinas viajan serializadas como JSON en una
 * columna de texto; las columnas 'owner' y 'owner_heartbeat' implementan
 * el mutex cooperativo entre agentes que reconcilian el mismo despliegue.
 */
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentRow {
    pub id: String,
    pub name: String,
    pub image: String,
    /// Etiquetas `clave=valor` serializadas como lista JSON.
    pub labels: Vec<String>,
    /// Identidades de máquina objetivo serializadas como lista JSON.
    pub machine_ids: Vec<String>,
    /// Agente que posee el candado cooperativo, si alguno.
    pub owner: Option<String>,
    /// Último latido del poseedor del candado (RFC3339).
    pub owner_heartbeat: Option<String>,
    pub version: i64,
    pub updated_at: String,
}

/// Fila de la capa de aplicación que describe un contenedor materializado.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerRow {
    pub id: String,
    pub deployment_id: String,
    pub machine_id: String,
    pub name: String,
    pub image: String,
    pub labels: Vec<String>,
    /// Estado reportado por el motor de contenedores (`running`, `exited`, ...).
    pub state: String,
    pub owner: Option<String>,
    pub owner_heartbeat: Option<String>,
    pub version: i64,
    pub updated_at: String,
}
