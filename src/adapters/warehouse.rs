use crate::config::WarehouseSettings;
use crate::core::Warehouse;
use crate::utils::error::{EtlError, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Serialize)]
struct ExecuteStatementRequest<'a> {
    sql: &'a str,
    database: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    workgroup: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct ExecuteStatementResponse {
    id: String,
}

/// Submits statements to an HTTP SQL-execution endpoint.
pub struct HttpWarehouse {
    client: Client,
    endpoint: String,
    database: String,
    workgroup: Option<String>,
    token: Option<String>,
}

impl HttpWarehouse {
    pub fn new(endpoint: String, database: String) -> Self {
        Self {
            client: Client::new(),
            endpoint,
            database,
            workgroup: None,
            token: None,
        }
    }

    pub fn with_workgroup(mut self, workgroup: Option<String>) -> Self {
        self.workgroup = workgroup;
        self
    }

    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self> {
        self.client = Client::builder().timeout(timeout).build()?;
        Ok(self)
    }

    pub fn from_settings(settings: &WarehouseSettings) -> Result<Self> {
        let warehouse = Self::new(settings.endpoint.clone(), settings.database.clone())
            .with_workgroup(settings.workgroup.clone())
            .with_token(settings.token.clone());

        match settings.timeout_seconds {
            Some(secs) => warehouse.with_timeout(Duration::from_secs(secs)),
            None => Ok(warehouse),
        }
    }
}

impl Warehouse for HttpWarehouse {
    async fn execute(&self, sql: &str) -> Result<String> {
        let body = ExecuteStatementRequest {
            sql,
            database: &self.database,
            workgroup: self.workgroup.as_deref(),
        };

        let mut request = self.client.post(&self.endpoint).json(&body);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        tracing::debug!("Submitting statement to {}", self.endpoint);
        let response = request.send().await?;
        let status = response.status();

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(EtlError::WarehouseError {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: ExecuteStatementResponse = response.json().await?;
        Ok(parsed.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    #[tokio::test]
    async fn test_execute_posts_statement() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/statements")
                .header("authorization", "Bearer secret")
                .json_body(serde_json::json!({
                    "sql": "COPY t FROM 's3://b/k'",
                    "database": "analytics",
                    "workgroup": "etl"
                }));
            then.status(200).json_body(serde_json::json!({"id": "stmt-1"}));
        });

        let warehouse = HttpWarehouse::new(server.url("/statements"), "analytics".to_string())
            .with_workgroup(Some("etl".to_string()))
            .with_token(Some("secret".to_string()));

        let id = warehouse.execute("COPY t FROM 's3://b/k'").await.unwrap();

        mock.assert();
        assert_eq!(id, "stmt-1");
    }

    #[tokio::test]
    async fn test_execute_maps_http_failure() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/statements");
            then.status(400).body("syntax error at or near COPY");
        });

        let warehouse = HttpWarehouse::new(server.url("/statements"), "analytics".to_string());
        let err = warehouse.execute("COPY").await.unwrap_err();

        match err {
            EtlError::WarehouseError { status, message } => {
                assert_eq!(status, 400);
                assert!(message.contains("syntax error"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
