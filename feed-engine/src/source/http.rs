//! HTTP sources for the filtered-list and sponsor endpoints.

use async_trait::async_trait;
use feed_core::{FilterQuery, Id, Record, SecondaryEntity};
use reqwest::{header, Client, Response};
use serde_json::Value;
use std::time::Duration;

use super::traits::{EntitySource, ListSource};
use crate::config::FeedConfig;
use crate::error::{EntityFailure, FeedError, PartialEntityError, Result};

fn build_client(timeout: Option<Duration>) -> Result<Client> {
    let mut headers = header::HeaderMap::new();
    headers.insert(
        header::ACCEPT,
        header::HeaderValue::from_static("application/json"),
    );

    let mut builder = Client::builder().default_headers(headers);
    if let Some(timeout) = timeout {
        builder = builder.timeout(timeout);
    }

    builder
        .build()
        .map_err(|e| FeedError::Config(format!("Failed to build HTTP client: {}", e)))
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Parse a list response body. Anything but an array of records is a
/// protocol error.
pub fn parse_record_array(body: &str) -> Result<Vec<Record>> {
    let value: Value = serde_json::from_str(body)
        .map_err(|e| FeedError::Protocol(format!("invalid JSON: {}", e)))?;

    let items = match value {
        Value::Array(items) => items,
        other => {
            return Err(FeedError::Protocol(format!(
                "expected JSON array, got {}",
                json_kind(&other)
            )))
        }
    };

    items
        .into_iter()
        .enumerate()
        .map(|(i, item)| {
            serde_json::from_value::<Record>(item)
                .map_err(|e| FeedError::Protocol(format!("record {}: {}", i, e)))
        })
        .collect()
}

// ==================== List endpoint ====================

/// Filtered-list endpoint over HTTP.
///
/// `GET {list_url}?{canonical query}`; the body must be a JSON array.
pub struct HttpListSource {
    client: Client,
    list_url: String,
}

impl HttpListSource {
    pub fn new(list_url: impl Into<String>, timeout: Option<Duration>) -> Result<Self> {
        Ok(Self {
            client: build_client(timeout)?,
            list_url: list_url.into(),
        })
    }

    pub fn from_config(config: &FeedConfig) -> Result<Self> {
        Self::new(config.list_url.clone(), config.request_timeout())
    }

    pub fn list_url(&self) -> &str {
        &self.list_url
    }
}

#[async_trait]
impl ListSource for HttpListSource {
    async fn fetch_filtered(&self, query: &FilterQuery) -> Result<Vec<Record>> {
        let url = query.apply_to(&self.list_url);
        tracing::debug!(%url, "Fetching filtered list");

        let response = self.client.get(&url).send().await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(FeedError::Server { status, message });
        }

        let body = response.text().await?;
        parse_record_array(&body)
    }
}

// ==================== Sponsor endpoint ====================

/// Sponsor lookup over HTTP.
///
/// Single fetch is `GET {entity_url}/{id}`. When a batch URL is configured,
/// `GET {batch_url}?ids=a,b,c` answers a JSON array of sponsors.
pub struct HttpEntitySource {
    client: Client,
    entity_url: String,
    batch_url: Option<String>,
}

impl HttpEntitySource {
    pub fn new(entity_url: impl Into<String>, timeout: Option<Duration>) -> Result<Self> {
        Ok(Self {
            client: build_client(timeout)?,
            entity_url: entity_url.into(),
            batch_url: None,
        })
    }

    pub fn with_batch_url(mut self, url: impl Into<String>) -> Self {
        self.batch_url = Some(url.into());
        self
    }

    pub fn from_config(config: &FeedConfig) -> Result<Self> {
        let source = Self::new(config.entity_url.clone(), config.request_timeout())?;
        Ok(match &config.entity_batch_url {
            Some(url) => source.with_batch_url(url.clone()),
            None => source,
        })
    }

    fn entity_url_for(&self, id: &Id) -> String {
        format!(
            "{}/{}",
            self.entity_url.trim_end_matches('/'),
            urlencoding::encode(id.as_str())
        )
    }

    async fn read_success_body(response: Response) -> std::result::Result<String, EntityFailure> {
        if !response.status().is_success() {
            return Err(EntityFailure::Status(response.status().as_u16()));
        }
        response
            .text()
            .await
            .map_err(|e| EntityFailure::Network(e.to_string()))
    }
}

#[async_trait]
impl EntitySource for HttpEntitySource {
    async fn fetch_entity(&self, id: &Id) -> std::result::Result<SecondaryEntity, PartialEntityError> {
        let fail = |reason| PartialEntityError::new(id.clone(), reason);

        let response = self
            .client
            .get(self.entity_url_for(id))
            .send()
            .await
            .map_err(|e| fail(EntityFailure::Network(e.to_string())))?;

        let body = Self::read_success_body(response).await.map_err(fail)?;

        serde_json::from_str::<SecondaryEntity>(&body)
            .map_err(|e| fail(EntityFailure::Malformed(e.to_string())))
    }

    fn supports_batch(&self) -> bool {
        self.batch_url.is_some()
    }

    async fn fetch_batch(&self, ids: &[Id]) -> std::result::Result<Vec<SecondaryEntity>, EntityFailure> {
        let Some(batch_url) = &self.batch_url else {
            return Err(EntityFailure::Unsupported);
        };

        let joined = ids
            .iter()
            .map(|id| urlencoding::encode(id.as_str()).into_owned())
            .collect::<Vec<_>>()
            .join(",");
        let separator = if batch_url.contains('?') { '&' } else { '?' };
        let url = format!("{}{}ids={}", batch_url, separator, joined);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| EntityFailure::Network(e.to_string()))?;

        let body = Self::read_success_body(response).await?;

        let value: Value =
            serde_json::from_str(&body).map_err(|e| EntityFailure::Malformed(e.to_string()))?;
        let items = match value {
            Value::Array(items) => items,
            other => {
                return Err(EntityFailure::Malformed(format!(
                    "expected JSON array, got {}",
                    json_kind(&other)
                )))
            }
        };

        // A bad element only costs that sponsor
        Ok(items
            .into_iter()
            .filter_map(|item| match serde_json::from_value::<SecondaryEntity>(item) {
                Ok(entity) => Some(entity),
                Err(e) => {
                    tracing::warn!(error = %e, "Skipping malformed sponsor in batch response");
                    None
                }
            })
            .collect())
    }
}
