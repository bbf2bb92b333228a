//! Feed configuration
//!
//! A small constant set supplied once at construction.

use crate::error::{FeedError, Result};
use feed_core::FieldMapping;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    /// Filtered-list endpoint (query string is appended)
    pub list_url: String,
    /// Sponsor endpoint; a single sponsor is `{entity_url}/{id}`
    pub entity_url: String,
    /// Optional batch endpoint taking `?ids=a,b,c` and answering an array
    pub entity_batch_url: Option<String>,
    /// Fixed row height estimate in pixels
    pub item_height: f64,
    /// Extra rows rendered above and below the viewport
    pub overscan: usize,
    /// Minimum spacing between scroll recomputations
    pub throttle_interval_ms: u64,
    /// Record field holding the sponsor id array
    pub sponsor_field: String,
    /// Record field holding the media reference
    pub media_field: String,
    /// Per-request timeout; `None` lets a stalled fetch keep the cycle loading
    pub request_timeout_ms: Option<u64>,
}

impl Default for FeedConfig {
    fn default() -> Self {
        let fields = FieldMapping::default();
        Self {
            list_url: "http://localhost:8080/api/videos".to_string(),
            entity_url: "http://localhost:8080/api/sponsors".to_string(),
            entity_batch_url: None,
            item_height: 450.0,
            overscan: 5,
            throttle_interval_ms: 100,
            sponsor_field: fields.sponsor_field,
            media_field: fields.media_field,
            request_timeout_ms: None,
        }
    }
}

impl FeedConfig {
    /// Load from JSON; missing keys take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| FeedError::Config(e.to_string()))
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| FeedError::Config(e.to_string()))
    }

    pub fn with_endpoints(mut self, list_url: impl Into<String>, entity_url: impl Into<String>) -> Self {
        self.list_url = list_url.into();
        self.entity_url = entity_url.into();
        self
    }

    pub fn with_batch_endpoint(mut self, url: impl Into<String>) -> Self {
        self.entity_batch_url = Some(url.into());
        self
    }

    pub fn with_item_height(mut self, px: f64) -> Self {
        self.item_height = px;
        self
    }

    pub fn with_overscan(mut self, rows: usize) -> Self {
        self.overscan = rows;
        self
    }

    pub fn with_throttle_interval_ms(mut self, ms: u64) -> Self {
        self.throttle_interval_ms = ms;
        self
    }

    pub fn with_request_timeout_ms(mut self, ms: u64) -> Self {
        self.request_timeout_ms = Some(ms);
        self
    }

    pub fn throttle_interval(&self) -> Duration {
        Duration::from_millis(self.throttle_interval_ms)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_ms.map(Duration::from_millis)
    }

    pub fn field_mapping(&self) -> FieldMapping {
        FieldMapping {
            media_field: self.media_field.clone(),
            sponsor_field: self.sponsor_field.clone(),
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.list_url.trim().is_empty() {
            return Err(FeedError::Config("list_url must not be empty".into()));
        }
        if self.entity_url.trim().is_empty() {
            return Err(FeedError::Config("entity_url must not be empty".into()));
        }
        if matches!(&self.entity_batch_url, Some(url) if url.trim().is_empty()) {
            return Err(FeedError::Config("entity_batch_url must not be empty when set".into()));
        }
        if !self.item_height.is_finite() || self.item_height <= 0.0 {
            return Err(FeedError::Config(format!(
                "item_height must be positive, got {}",
                self.item_height
            )));
        }
        if self.throttle_interval_ms == 0 {
            return Err(FeedError::Config("throttle_interval_ms must be greater than zero".into()));
        }
        if self.sponsor_field.is_empty() {
            return Err(FeedError::Config("sponsor_field must not be empty".into()));
        }
        Ok(())
    }
}
