use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, Method, RequestBuilder, Url};
use serde_json::Value;
use thiserror::Error;

use super::filters::Filters;

#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("remote returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("malformed response body: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("unexpected response: {0}")]
    Unexpected(String),

    #[error("no {table} row with id {id}")]
    NoMatch { table: String, id: i64 },
}

/// Thin REST client for a PostgREST-style backend.
///
/// Every request carries the static API key both as `apikey` and as a bearer
/// credential, and asks for the affected rows back in the response body.
#[derive(Debug, Clone)]
pub struct RemoteClient {
    http: Client,
    base_url: String,
    api_key: String,
}

impl RemoteClient {
    pub fn new(http: Client, base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Build a request against `/{table}` with the auth headers attached.
    fn request(
        &self,
        method: Method,
        table: &str,
        params: &[(String, String)],
    ) -> Result<RequestBuilder, RemoteError> {
        let mut url = Url::parse(&format!("{}/{}", self.base_url, table))
            .map_err(|e| RemoteError::Unexpected(format!("invalid URL: {e}")))?;
        if !params.is_empty() {
            url.query_pairs_mut()
                .extend_pairs(params.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        }

        let req = self
            .http
            .request(method, url)
            .header("apikey", &self.api_key)
            .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
            .header(CONTENT_TYPE, "application/json")
            .header("Prefer", "return=representation");

        Ok(req)
    }

    /// Send a request; an empty body is a valid `None`.
    async fn send(&self, req: RequestBuilder) -> Result<Option<Value>, RemoteError> {
        let resp = req.send().await?;
        let status = resp.status();
        let body = resp.text().await?;

        if !status.is_success() {
            let message = error_message(&body)
                .unwrap_or_else(|| format!("request failed with HTTP {}", status.as_u16()));
            return Err(RemoteError::Status {
                status: status.as_u16(),
                message,
            });
        }

        if body.trim().is_empty() {
            return Ok(None);
        }
        Ok(Some(serde_json::from_str(&body)?))
    }

    /// List rows newest-first, filtered by equality on each field.
    pub async fn list(&self, table: &str, filters: &Filters) -> Result<Vec<Value>, RemoteError> {
        let mut params = vec![("select".to_string(), "*".to_string())];
        params.extend(filters.query_pairs());
        params.push(("order".to_string(), "created_at.desc".to_string()));

        let body = self.send(self.request(Method::GET, table, &params)?).await?;
        match body {
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(Value::Array(rows)) => Ok(rows),
            Some(other) => Err(RemoteError::Unexpected(format!(
                "expected an array of rows from {table}, got {}",
                kind_of(&other)
            ))),
        }
    }

    /// Fetch a single row by id.
    pub async fn get_by_id(&self, table: &str, id: i64) -> Result<Option<Value>, RemoteError> {
        let params = [
            ("select".to_string(), "*".to_string()),
            ("id".to_string(), format!("eq.{id}")),
        ];
        let body = self.send(self.request(Method::GET, table, &params)?).await?;
        Ok(first_row(body))
    }

    /// Insert a row and return it as stored by the backend.
    pub async fn create(&self, table: &str, record: &Value) -> Result<Value, RemoteError> {
        let body = self
            .send(self.request(Method::POST, table, &[])?.json(record))
            .await?;
        first_row(body).ok_or_else(|| {
            RemoteError::Unexpected(format!("backend returned no row for new {table} record"))
        })
    }

    /// Patch a row by id. `None` when the backend echoes nothing back; an
    /// empty array means the filter matched no row.
    pub async fn update(
        &self,
        table: &str,
        id: i64,
        partial: &Value,
    ) -> Result<Option<Value>, RemoteError> {
        let params = [("id".to_string(), format!("eq.{id}"))];
        let body = self
            .send(self.request(Method::PATCH, table, &params)?.json(partial))
            .await?;
        updated_row(table, id, body)
    }

    pub async fn delete(&self, table: &str, id: i64) -> Result<(), RemoteError> {
        let params = [("id".to_string(), format!("eq.{id}"))];
        self.send(self.request(Method::DELETE, table, &params)?).await?;
        Ok(())
    }

    /// Delete every row matching `filters`. Refuses an empty filter set so a
    /// sentinel value can never wipe a whole table.
    pub async fn delete_matching(&self, table: &str, filters: &Filters) -> Result<(), RemoteError> {
        if filters.is_empty() {
            return Err(RemoteError::Unexpected(format!(
                "refusing unfiltered delete on {table}"
            )));
        }
        self.send(self.request(Method::DELETE, table, &filters.query_pairs())?)
            .await?;
        Ok(())
    }
}

/// Mutations come back as a one-element array; point reads as an array too.
fn first_row(body: Option<Value>) -> Option<Value> {
    match body? {
        Value::Array(rows) => rows.into_iter().next(),
        Value::Null => None,
        row => Some(row),
    }
}

fn updated_row(table: &str, id: i64, body: Option<Value>) -> Result<Option<Value>, RemoteError> {
    match body {
        Some(Value::Array(rows)) if rows.is_empty() => Err(RemoteError::NoMatch {
            table: table.to_string(),
            id,
        }),
        body => Ok(first_row(body)),
    }
}

/// Pull a human readable message out of an error body, if it has one.
fn error_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    ["message", "error_description", "error", "msg", "hint"]
        .iter()
        .find_map(|key| value.get(*key).and_then(Value::as_str))
        .filter(|m| !m.trim().is_empty())
        .map(str::to_string)
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
