//! REST implementation of [`RemoteStore`] for a PostgREST-style API.
//!
//! Each resource maps to one table under `/rest/v1/`. Rows are decoded by
//! column name, so the wire shape follows [`ResourceKind`]'s column table
//! rather than the Rust field names.

use crate::config::RemoteConfig;
use ::async_trait::async_trait;
use coursekeep_core::{
    FetchOrder, NewRecord, Record, RecordId, RecordKey, RemoteError, Resource, ResourceKind,
    Timestamp, UserId, UNIQUE_VIOLATION_CODE,
};
use coursekeep_store::RemoteStore;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::marker::PhantomData;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum RestClientError {
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Invalid header value for {header}: {reason}")]
    InvalidHeader { header: &'static str, reason: String },
}

/// Error body returned by the API on failure.
#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    code: Option<String>,
    message: Option<String>,
    details: Option<String>,
}

/// Remote store for resource `R` reached over HTTP.
pub struct RestRemoteStore<R: Resource> {
    client: reqwest::Client,
    base_url: String,
    headers: HeaderMap,
    _resource: PhantomData<fn() -> R>,
}

impl<R: Resource> Clone for RestRemoteStore<R> {
    fn clone(&self) -> Self {
        Self {
            client: self.client.clone(),
            base_url: self.base_url.clone(),
            headers: self.headers.clone(),
            _resource: PhantomData,
        }
    }
}

impl<R: Resource> std::fmt::Debug for RestRemoteStore<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestRemoteStore")
            .field("table", &R::KIND.table())
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl<R: Resource> RestRemoteStore<R> {
    pub fn new(config: &RemoteConfig) -> Result<Self, RestClientError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()?;
        Self::with_client(client, config)
    }

    /// Share an existing client (and its connection pool) across resources.
    pub fn with_client(
        client: reqwest::Client,
        config: &RemoteConfig,
    ) -> Result<Self, RestClientError> {
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            headers: build_auth_headers(&config.api_key, &config.api_key)?,
            _resource: PhantomData,
        })
    }

    /// Authenticate requests as the signed-in user instead of the anon key.
    pub fn with_access_token(mut self, token: &str) -> Result<Self, RestClientError> {
        let value = header_value("authorization", &format!("Bearer {token}"))?;
        self.headers.insert(reqwest::header::AUTHORIZATION, value);
        Ok(self)
    }

    fn table_url(&self) -> String {
        format!("{}/rest/v1/{}", self.base_url, R::KIND.table())
    }

    async fn read_rows(response: reqwest::Response) -> Result<Vec<Value>, RemoteError> {
        let status = response.status();
        let text = response.text().await.map_err(transport_error)?;
        if !status.is_success() {
            return Err(classify_error_body(status, &text));
        }
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }
        serde_json::from_str::<Vec<Value>>(&text)
            .map_err(|e| RemoteError::other(format!("Invalid response body: {e}")))
    }
}

#[async_trait]
impl<R: Resource> RemoteStore<R> for RestRemoteStore<R> {
    async fn select(&self, owner: UserId) -> Result<Vec<Record<R>>, RemoteError> {
        let query = select_query(R::KIND, R::ORDER, owner);
        let response = self
            .client
            .get(self.table_url())
            .headers(self.headers.clone())
            .query(&query)
            .send()
            .await
            .map_err(transport_error)?;

        let rows = Self::read_rows(response).await?;
        rows.iter().map(decode_row::<R>).collect()
    }

    async fn insert(&self, record: &NewRecord<R>) -> Result<Record<R>, RemoteError> {
        let body = encode_new_record(record)?;
        let response = self
            .client
            .post(self.table_url())
            .headers(self.headers.clone())
            .header("prefer", "return=representation")
            .json(&body)
            .send()
            .await
            .map_err(transport_error)?;

        let rows = Self::read_rows(response).await?;
        match rows.first() {
            Some(row) => decode_row::<R>(row),
            None => Err(RemoteError::other("Insert returned no representation")),
        }
    }

    async fn delete(&self, owner: UserId, key: &RecordKey<R>) -> Result<u64, RemoteError> {
        let query = delete_query(R::KIND, owner, key);
        let response = self
            .client
            .delete(self.table_url())
            .headers(self.headers.clone())
            .header("prefer", "return=representation")
            .query(&query)
            .send()
            .await
            .map_err(transport_error)?;

        let rows = Self::read_rows(response).await?;
        Ok(rows.len() as u64)
    }
}

// ============================================================================
// QUERY BUILDING
// ============================================================================

fn select_query(kind: ResourceKind, order: FetchOrder, owner: UserId) -> Vec<(String, String)> {
    let mut query = vec![
        ("select".to_string(), "*".to_string()),
        (kind.owner_column().to_string(), format!("eq.{owner}")),
    ];
    if order == FetchOrder::CreatedAtDesc {
        query.push(("order".to_string(), format!("{}.desc", kind.created_column())));
    }
    query
}

fn delete_query<R: Resource>(
    kind: ResourceKind,
    owner: UserId,
    key: &RecordKey<R>,
) -> Vec<(String, String)> {
    let mut query = vec![
        (kind.owner_column().to_string(), format!("eq.{owner}")),
        (kind.key_column().to_string(), format!("eq.{}", key.resource_key)),
    ];
    if let (Some(column), Some(sub)) = (kind.sub_key_column(), key.secondary_key) {
        query.push((column.to_string(), format!("eq.{sub}")));
    }
    query
}

// ============================================================================
// ROW CODEC
// ============================================================================

fn encode_new_record<R: Resource>(record: &NewRecord<R>) -> Result<Value, RemoteError> {
    let kind = R::KIND;
    let mut row = Map::new();
    row.insert(kind.owner_column().to_string(), to_json(&record.owner_user_id)?);
    row.insert(kind.key_column().to_string(), to_json(&record.resource_key)?);
    if let (Some(column), Some(sub)) = (kind.sub_key_column(), record.secondary_key) {
        row.insert(column.to_string(), to_json(&sub)?);
    }
    Ok(Value::Object(row))
}

/// Decode one API row into a record using the resource's column names.
pub(crate) fn decode_row<R: Resource>(row: &Value) -> Result<Record<R>, RemoteError> {
    let kind = R::KIND;
    let secondary_key = match kind.sub_key_column() {
        Some(column) => Some(field::<R::SubKey>(row, column)?),
        None => None,
    };
    Ok(Record {
        id: field::<RecordId>(row, "id")?,
        owner_user_id: field::<UserId>(row, kind.owner_column())?,
        resource_key: field::<R::Key>(row, kind.key_column())?,
        secondary_key,
        created_at: field::<Timestamp>(row, kind.created_column())?,
    })
}

fn field<T: DeserializeOwned>(row: &Value, column: &str) -> Result<T, RemoteError> {
    let value = row
        .get(column)
        .ok_or_else(|| RemoteError::other(format!("Response row is missing column {column}")))?;
    serde_json::from_value(value.clone())
        .map_err(|e| RemoteError::other(format!("Invalid value in column {column}: {e}")))
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<Value, RemoteError> {
    serde_json::to_value(value).map_err(|e| RemoteError::other(format!("Encode failed: {e}")))
}

// ============================================================================
// ERROR CLASSIFICATION
// ============================================================================

/// Classify a failed response. A stable error code wins; a bare 409 is
/// treated as a uniqueness violation.
pub(crate) fn classify_error_body(status: StatusCode, body: &str) -> RemoteError {
    let parsed = serde_json::from_str::<ApiErrorBody>(body).ok();
    let (code, message) = match parsed {
        Some(err) => {
            let message = match (err.message, err.details) {
                (Some(m), Some(d)) => format!("{m} ({d})"),
                (Some(m), None) => m,
                (None, Some(d)) => d,
                (None, None) => format!("HTTP {}", status.as_u16()),
            };
            (err.code, message)
        }
        None => (None, format!("HTTP {}: {}", status.as_u16(), body.trim())),
    };

    match code {
        Some(code) => RemoteError::classify(Some(&code), message),
        None if status == StatusCode::CONFLICT => {
            RemoteError::classify(Some(UNIQUE_VIOLATION_CODE), message)
        }
        None => RemoteError::other(message),
    }
}

fn transport_error(err: reqwest::Error) -> RemoteError {
    if err.is_timeout() {
        RemoteError::other(format!("Request timed out: {err}"))
    } else {
        RemoteError::other(format!("Transport error: {err}"))
    }
}

fn build_auth_headers(api_key: &str, bearer: &str) -> Result<HeaderMap, RestClientError> {
    let mut headers = HeaderMap::new();
    headers.insert(HeaderName::from_static("apikey"), header_value("apikey", api_key)?);
    headers.insert(
        reqwest::header::AUTHORIZATION,
        header_value("authorization", &format!("Bearer {bearer}"))?,
    );
    Ok(headers)
}

fn header_value(header: &'static str, value: &str) -> Result<HeaderValue, RestClientError> {
    HeaderValue::from_str(value).map_err(|e| RestClientError::InvalidHeader {
        header,
        reason: e.to_string(),
    })
}
