// [libs/infra/registry/src/schema.rs]
/**
 * =================================================================
 * APARATO: REPLICATED SCHEMA AUTHORITY (V6.0 - ADDITIVE ONLY)
 * CLASIFICACIÓN: INFRASTRUCTURE LAYER (ESTRATO L3)
 * RESPONSABILIDAD: GOBERNANZA ESTRUCTURAL DEL REGISTRO REPLICADO
 *
 * VISION HIPER-HOLÍSTICA:
 * 1. IDEMPOTENCIA: Todo DDL es 'IF NOT EXISTS'; aplicar dos veces es
 *    legal y gratuito.
 * 2. ADDITIVE ONLY: El túnel de migraciones de Corrosion solo admite
 *    evolución aditiva; jamás se reescribe una columna existente.
 * =================================================================
 */

/// Tabla de pertenencia de máquinas a la malla.
pub const MACHINES_DDL: &str = r#"
    CREATE TABLE IF NOT EXISTS machines (
        id TEXT PRIMARY KEY NOT NULL,
        public_key TEXT NOT NULL DEFAULT '',
        subnet TEXT NOT NULL DEFAULT '',
        management_ip TEXT NOT NULL DEFAULT '',
        endpoint TEXT NOT NULL DEFAULT '',
        updated_at TEXT NOT NULL DEFAULT '',
        version INTEGER NOT NULL DEFAULT 1
    )
"#;

/// Tabla de latidos; una fila por nodo.
pub const HEARTBEATS_DDL: &str = r#"
    CREATE TABLE IF NOT EXISTS heartbeats (
        node_id TEXT PRIMARY KEY NOT NULL,
        seq INTEGER NOT NULL DEFAULT 1,
        updated_at TEXT NOT NULL DEFAULT ''
    )
"#;

/// Ajustes replicados por red (clave/valor).
pub const NETWORK_CONFIG_DDL: &str = r#"
    CREATE TABLE IF NOT EXISTS network_config (
        network TEXT NOT NULL DEFAULT '',
        key TEXT NOT NULL DEFAULT '',
        value TEXT NOT NULL DEFAULT '',
        updated_at TEXT NOT NULL DEFAULT '',
        PRIMARY KEY (network, key)
    )
"#;

/// Despliegues lógicos de la capa de aplicación.
pub const DEPLOYMENTS_DDL: &str = r#"
    CREATE TABLE IF NOT EXISTS deployments (
        id TEXT PRIMARY KEY NOT NULL,
        name TEXT NOT NULL DEFAULT '',
        image TEXT NOT NULL DEFAULT '',
        labels TEXT NOT NULL DEFAULT '[]',
        machine_ids TEXT NOT NULL DEFAULT '[]',
        owner TEXT NOT NULL DEFAULT '',
        owner_heartbeat TEXT NOT NULL DEFAULT '',
        version INTEGER NOT NULL DEFAULT 1,
        updated_at TEXT NOT NULL DEFAULT ''
    )
"#;

/// Contenedores materializados de la capa de aplicación.
pub const CONTAINERS_DDL: &str = r#"
    CREATE TABLE IF NOT EXISTS containers (
        id TEXT PRIMARY KEY NOT NULL,
        deployment_id TEXT NOT NULL DEFAULT '',
        machine_id TEXT NOT NULL DEFAULT '',
        name TEXT NOT NULL DEFAULT '',
        image TEXT NOT NULL DEFAULT '',
        labels TEXT NOT NULL DEFAULT '[]',
        state TEXT NOT NULL DEFAULT '',
        owner TEXT NOT NULL DEFAULT '',
        owner_heartbeat TEXT NOT NULL DEFAULT '',
        version INTEGER NOT NULL DEFAULT 1,
        updated_at TEXT NOT NULL DEFAULT ''
    )
"#;
