// [libs/infra/registry/src/client.rs]
/*!
 * =================================================================
 * APARATO: CORROSION UPLINK CLIENT (V6.4 - GOLD MASTER)
 * CLASIFICACIÓN: INFRASTRUCTURE ADAPTER (ESTRATO L3)
 * RESPONSABILIDAD: TRANSACCIONES, CONSULTAS Y SONDAS DE PREPARACIÓN
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. NARROW CONTRACT: El cliente solo conoce las cuatro superficies del
 *    registro (transactions, queries, subscriptions, migrations); la
 *    semántica de tablas vive en los repositorios.
 * 2. BOUNDED PATIENCE: Cada llamada corta lleva su timeout; la sonda de
 *    preparación reintenta con cadencia fija dentro de una ventana dura.
 * 3. TOKEN DISCIPLINE: El Bearer se inyecta de forma central y jamás se
 *    registra en el rastro de telemetría.
 * =================================================================
 */

use std::time::Duration;

use reqwest::StatusCode;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, instrument, warn};

use crate::errors::RegistryError;
use crate::events::{parse_event_line, QueryEvent};

/// Timeout de las llamadas cortas (transacciones, consultas).
const CALL_TIMEOUT: Duration = Duration::from_secs(10);
/// Timeout de la petición HTTP de la sonda de preparación.
const READINESS_REQUEST_TIMEOUT: Duration = Duration::from_secs(2);
/// Cadencia entre sondas de preparación.
const READINESS_PROBE_INTERVAL: Duration = Duration::from_millis(500);

/// Sentencia parametrizada para el túnel de transacciones.
#[derive(Debug, Clone, Serialize)]
pub struct Statement {
    pub query: String,
    pub params: Vec<Value>,
}

impl Statement {
    /// Sentencia con parámetros posicionales.
    #[must_use]
    pub fn new(query: impl Into<String>, params: Vec<Value>) -> Self {
        Self { query: query.into(), params }
    }
}

/**
 * Cliente táctico hacia el nodo Corrosion local.
 *
 * Clonarlo es barato: comparte el pool de conexiones de reqwest.
 */
#[derive(Debug, Clone)]
pub struct CorrosionClient {
    http_client: reqwest::Client,
    base_url: String,
    api_token: Option<String>,
}

impl CorrosionClient {
    /**
     * Construye el enlace hacia `http://<api_addr>`.
     *
     * # Errors:
     * - `RegistryError::Transport`: si el motor HTTP no inicializa.
     */
    pub fn new(api_addr: &str, api_token: Option<String>) -> Result<Self, RegistryError> {
        let http_client = reqwest::Client::builder()
            .build()
            .map_err(RegistryError::Transport)?;

        Ok(Self {
            http_client,
            base_url: format!("http://{api_addr}"),
            api_token,
        })
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let mut builder = self
            .http_client
            .request(method, format!("{}{path}", self.base_url));
        if let Some(token) = &self.api_token {
            builder = builder.bearer_auth(token);
        }
        builder
    }

    /**
     * Ejecuta una ráfaga de sentencias de escritura de forma atómica.
     *
     * Éxito si y solo si ninguna sentencia contenida reporta error.
     *
     * # Errors:
     * - `RegistryError::Rejected` / `Statement` / `Transport`.
     */
    #[instrument(skip(self, statements), fields(count = statements.len()))]
    pub async fn exec(&self, statements: &[Statement]) -> Result<(), RegistryError> {
        let response = self
            .request(reqwest::Method::POST, "/v1/transactions")
            .timeout(CALL_TIMEOUT)
            .json(statements)
            .send()
            .await?;

        let body = Self::read_success_body(response).await?;
        let verdict: Value = serde_json::from_str(&body)
            .map_err(|fault| RegistryError::Decode(format!("transaction verdict: {fault}")))?;

        if let Some(results) = verdict.get("results").and_then(Value::as_array) {
            for statement_result in results {
                if let Some(statement_fault) = statement_result.get("error") {
                    return Err(RegistryError::Statement(statement_fault.to_string()));
                }
            }
        }

        Ok(())
    }

    /**
     * Consulta de lectura; devuelve los vectores de celdas de cada fila.
     * La decodificación de celdas es responsabilidad del llamador.
     *
     * # Errors:
     * - `RegistryError::Rejected` / `Statement` / `Decode` / `Transport`.
     */
    #[instrument(skip(self, params))]
    pub async fn query(&self, query: &str, params: Vec<Value>) -> Result<Vec<Vec<Value>>, RegistryError> {
        let response = self
            .request(reqwest::Method::POST, "/v1/queries")
            .timeout(CALL_TIMEOUT)
            .json(&Statement::new(query, params))
            .send()
            .await?;

        let body = Self::read_success_body(response).await?;

        let mut rows = Vec::new();
        for line in body.lines().filter(|line| !line.trim().is_empty()) {
            match parse_event_line(line)? {
                QueryEvent::Row { cells, .. } => rows.push(cells),
                QueryEvent::Error(fault) => return Err(RegistryError::Statement(fault)),
                QueryEvent::EndOfQuery { .. } => break,
                QueryEvent::Columns(_) | QueryEvent::Change { .. } => {}
            }
        }

        Ok(rows)
    }

    /**
     * Aplica el esquema de forma aditiva (POST /v1/migrations).
     *
     * # Errors:
     * - `RegistryError::Rejected` / `Transport`.
     */
    #[instrument(skip(self, ddl_statements), fields(count = ddl_statements.len()))]
    pub async fn apply_migrations(&self, ddl_statements: &[&str]) -> Result<(), RegistryError> {
        let response = self
            .request(reqwest::Method::POST, "/v1/migrations")
            .timeout(CALL_TIMEOUT)
            .json(&ddl_statements)
            .send()
            .await?;

        Self::read_success_body(response).await.map(|_| ())
    }

    /**
     * Espera a que el registro conteste consultas dentro de una ventana
     * dura. Sonda cada 500 ms con timeout HTTP corto de 2 s.
     *
     * # Errors:
     * - `RegistryError::NotReady`: la ventana expiró sin respuesta sana.
     */
    #[instrument(skip(self))]
    pub async fn wait_ready(&self, overall_window: Duration) -> Result<(), RegistryError> {
        let deadline = tokio::time::Instant::now() + overall_window;
        let mut last_fault = String::from("no probe attempted");

        while tokio::time::Instant::now() < deadline {
            let probe = self
                .request(reqwest::Method::POST, "/v1/queries")
                .timeout(READINESS_REQUEST_TIMEOUT)
                .json(&Statement::new("SELECT 1", vec![]))
                .send()
                .await;

            match probe {
                Ok(response) if response.status().is_success() => {
                    debug!("🛰️  [REGISTRY_READY]: Local registry answering queries.");
                    return Ok(());
                }
                Ok(response) => {
                    last_fault = format!("status {}", response.status());
                }
                Err(transport_fault) => {
                    last_fault = transport_fault.to_string();
                }
            }

            tokio::time::sleep(READINESS_PROBE_INTERVAL).await;
        }

        warn!("⚠️  [REGISTRY_NOT_READY]: Window exhausted: {}", last_fault);
        Err(RegistryError::NotReady(last_fault))
    }

    pub(crate) async fn send_raw(
        &self,
        builder: reqwest::RequestBuilder,
    ) -> Result<reqwest::Response, RegistryError> {
        let response = builder.send().await?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(RegistryError::Rejected { status, body });
        }
        Ok(response)
    }

    pub(crate) fn request_builder(
        &self,
        method: reqwest::Method,
        path: &str,
    ) -> reqwest::RequestBuilder {
        self.request(method, path)
    }

    async fn read_success_body(response: reqwest::Response) -> Result<String, RegistryError> {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if status == StatusCode::OK {
            Ok(body)
        } else {
            Err(RegistryError::Rejected { status: status.as_u16(), body })
        }
    }
}
