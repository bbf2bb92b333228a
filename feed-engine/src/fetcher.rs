//! Remote filtered-list fetcher with stale-result suppression
//!
//! Every fetch is stamped with a generation from a monotonic counter. Any
//! number of fetches may be in flight; a result is committed only if its
//! generation is still the latest one issued at commit time. Superseded
//! requests are never aborted, their results are just ignored.
//!
//! Failures are terminal for their cycle. There is no retry.

use feed_core::{FilterQuery, Record};
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

use crate::error::{FeedError, Result};
use crate::source::ListSource;

/// Tag identifying one fetch cycle. Strictly increasing, starting at 1.
pub type Generation = u64;

/// A fetch result together with the generation that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct Tagged<T> {
    pub generation: Generation,
    pub value: T,
}

pub struct RemoteFilteredListFetcher {
    source: Arc<dyn ListSource>,
    latest: AtomicU64,
}

impl RemoteFilteredListFetcher {
    pub fn new(source: Arc<dyn ListSource>) -> Self {
        Self {
            source,
            latest: AtomicU64::new(0),
        }
    }

    /// Issue a new generation, superseding every earlier one.
    pub fn begin(&self) -> Generation {
        self.latest.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Latest generation issued so far (0 before the first fetch).
    pub fn latest(&self) -> Generation {
        self.latest.load(Ordering::SeqCst)
    }

    /// Whether a result of `generation` may be committed right now.
    pub fn is_current(&self, generation: Generation) -> bool {
        generation == self.latest()
    }

    /// Run `query` for an already issued `generation`.
    pub async fn fetch(
        &self,
        generation: Generation,
        query: &FilterQuery,
    ) -> Tagged<Result<Vec<Record>>> {
        debug!(generation, %query, "List fetch started");
        let value = self
            .source
            .fetch_filtered(query)
            .await
            .and_then(ensure_unique_ids);
        Tagged { generation, value }
    }

    /// `begin` + `fetch` in one call.
    pub async fn fetch_filtered(&self, query: &FilterQuery) -> Tagged<Result<Vec<Record>>> {
        let generation = self.begin();
        self.fetch(generation, query).await
    }

    /// Hand back the value if its generation is still current, otherwise
    /// drop it.
    pub fn commit<T>(&self, tagged: Tagged<T>) -> Option<T> {
        if self.is_current(tagged.generation) {
            Some(tagged.value)
        } else {
            debug!(
                generation = tagged.generation,
                latest = self.latest(),
                "Discarding superseded list result"
            );
            None
        }
    }
}

/// Ids must be unique within one result; server order is kept as is.
fn ensure_unique_ids(records: Vec<Record>) -> Result<Vec<Record>> {
    let mut seen = HashSet::with_capacity(records.len());
    for record in &records {
        if !seen.insert(&record.id) {
            return Err(FeedError::Protocol(format!(
                "duplicate record id {} in list response",
                record.id
            )));
        }
    }
    Ok(records)
}
