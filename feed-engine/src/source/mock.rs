//! Mock sources for testing.
//!
//! Scripted responses, per-request delays and call logs, so tests can
//! assert exactly which network calls were issued and in what order
//! responses arrive.

use async_trait::async_trait;
use feed_core::{FilterQuery, Id, Record, SecondaryEntity};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use super::traits::{EntitySource, ListSource};
use crate::error::{EntityFailure, PartialEntityError, Result};

#[derive(Debug, Clone)]
struct ScriptedList {
    result: Result<Vec<Record>>,
    delay: Duration,
}

impl Default for ScriptedList {
    fn default() -> Self {
        Self {
            result: Ok(Vec::new()),
            delay: Duration::ZERO,
        }
    }
}

/// Mock list source keyed by canonical query string.
///
/// Unscripted queries answer with the default response (an empty list
/// unless overridden).
#[derive(Default)]
pub struct MockListSource {
    scripted: HashMap<String, ScriptedList>,
    fallback: ScriptedList,
    calls: Mutex<Vec<String>>,
}

impl MockListSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `query` with `records`.
    pub fn with_response(mut self, query: &FilterQuery, records: Vec<Record>) -> Self {
        self.scripted.entry(query.as_query_string()).or_default().result = Ok(records);
        self
    }

    /// Answer `query` with an error.
    pub fn with_error(mut self, query: &FilterQuery, error: crate::error::FeedError) -> Self {
        self.scripted.entry(query.as_query_string()).or_default().result = Err(error);
        self
    }

    /// Delay the answer to `query`.
    pub fn with_delay(mut self, query: &FilterQuery, delay: Duration) -> Self {
        self.scripted.entry(query.as_query_string()).or_default().delay = delay;
        self
    }

    /// Answer for queries that were not scripted.
    pub fn with_default_response(mut self, records: Vec<Record>) -> Self {
        self.fallback.result = Ok(records);
        self
    }

    /// Query strings received, in call order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().map(|c| c.len()).unwrap_or_default()
    }
}

#[async_trait]
impl ListSource for MockListSource {
    async fn fetch_filtered(&self, query: &FilterQuery) -> Result<Vec<Record>> {
        let key = query.as_query_string();
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(key.clone());
        }

        let scripted = self.scripted.get(&key).unwrap_or(&self.fallback).clone();
        if !scripted.delay.is_zero() {
            tokio::time::sleep(scripted.delay).await;
        }
        scripted.result
    }
}

/// Mock sponsor source.
///
/// Known ids resolve, ids marked failing return their failure, everything
/// else answers 404.
#[derive(Default)]
pub struct MockEntitySource {
    entities: HashMap<Id, SecondaryEntity>,
    failures: HashMap<Id, EntityFailure>,
    delays: HashMap<Id, Duration>,
    batch: bool,
    batch_failure: Option<EntityFailure>,
    requests: Mutex<Vec<Id>>,
    batch_requests: Mutex<Vec<Vec<Id>>>,
}

impl MockEntitySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entity(mut self, entity: SecondaryEntity) -> Self {
        self.entities.insert(entity.id.clone(), entity);
        self
    }

    pub fn with_failure(mut self, id: impl Into<Id>, failure: EntityFailure) -> Self {
        self.failures.insert(id.into(), failure);
        self
    }

    pub fn with_delay(mut self, id: impl Into<Id>, delay: Duration) -> Self {
        self.delays.insert(id.into(), delay);
        self
    }

    /// Advertise a batch endpoint.
    pub fn with_batch(mut self) -> Self {
        self.batch = true;
        self
    }

    /// Advertise a batch endpoint whose requests all fail.
    pub fn with_failing_batch(mut self, failure: EntityFailure) -> Self {
        self.batch = true;
        self.batch_failure = Some(failure);
        self
    }

    /// Ids requested through single fetches, in call order.
    pub fn requested_ids(&self) -> Vec<Id> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }

    /// Id lists requested through batch fetches.
    pub fn batch_requests(&self) -> Vec<Vec<Id>> {
        self.batch_requests.lock().map(|r| r.clone()).unwrap_or_default()
    }

    /// Total network calls, single and batch.
    pub fn call_count(&self) -> usize {
        self.requested_ids().len() + self.batch_requests().len()
    }

    pub fn reset_calls(&self) {
        if let Ok(mut requests) = self.requests.lock() {
            requests.clear();
        }
        if let Ok(mut batches) = self.batch_requests.lock() {
            batches.clear();
        }
    }

    fn resolve(&self, id: &Id) -> std::result::Result<SecondaryEntity, EntityFailure> {
        if let Some(failure) = self.failures.get(id) {
            return Err(failure.clone());
        }
        self.entities.get(id).cloned().ok_or(EntityFailure::Status(404))
    }
}

#[async_trait]
impl EntitySource for MockEntitySource {
    async fn fetch_entity(&self, id: &Id) -> std::result::Result<SecondaryEntity, PartialEntityError> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(id.clone());
        }

        if let Some(delay) = self.delays.get(id) {
            tokio::time::sleep(*delay).await;
        }

        self.resolve(id)
            .map_err(|reason| PartialEntityError::new(id.clone(), reason))
    }

    fn supports_batch(&self) -> bool {
        self.batch
    }

    async fn fetch_batch(&self, ids: &[Id]) -> std::result::Result<Vec<SecondaryEntity>, EntityFailure> {
        if !self.batch {
            return Err(EntityFailure::Unsupported);
        }
        if let Ok(mut batches) = self.batch_requests.lock() {
            batches.push(ids.to_vec());
        }
        if let Some(failure) = &self.batch_failure {
            return Err(failure.clone());
        }

        Ok(ids.iter().filter_map(|id| self.resolve(id).ok()).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use feed_core::{build_query, FilterSelection};

    #[test]
    fn test_mock_list_scripted_and_default() {
        let mut selection = FilterSelection::new();
        selection.select("topics", "1").unwrap();
        let query = build_query(&selection);

        let source = MockListSource::new()
            .with_response(&query, vec![Record::new("a")])
            .with_default_response(vec![Record::new("z")]);

        let scripted = tokio_test::block_on(source.fetch_filtered(&query)).unwrap();
        let fallback = tokio_test::block_on(source.fetch_filtered(&FilterQuery::default())).unwrap();

        assert_eq!(scripted[0].id, Id::from("a"));
        assert_eq!(fallback[0].id, Id::from("z"));
        assert_eq!(source.calls(), vec!["topics=1".to_string(), String::new()]);
    }

    #[tokio::test]
    async fn test_mock_entity_unknown_is_404() {
        let source = MockEntitySource::new().with_entity(SecondaryEntity::new("a", "Acme"));

        assert!(source.fetch_entity(&Id::from("a")).await.is_ok());
        let err = source.fetch_entity(&Id::from("b")).await.unwrap_err();
        assert_eq!(err.reason, EntityFailure::Status(404));
        assert_eq!(source.call_count(), 2);

        source.reset_calls();
        assert_eq!(source.call_count(), 0);
    }
}
