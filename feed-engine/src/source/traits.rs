//! Core traits for remote data sources.
//!
//! The feed talks to two endpoints: the filtered list and the sponsor
//! lookup. Both sit behind traits so the fetcher and the cache can be driven
//! by HTTP in production and by scripted mocks in tests.

use async_trait::async_trait;
use feed_core::{FilterQuery, Id, Record, SecondaryEntity};

use crate::error::{EntityFailure, PartialEntityError, Result};

/// Source of the server-filtered, server-ordered record list.
#[async_trait]
pub trait ListSource: Send + Sync {
    /// Run `query` and return the records in server order.
    ///
    /// Fails with `Network`, `Server` or `Protocol`.
    async fn fetch_filtered(&self, query: &FilterQuery) -> Result<Vec<Record>>;
}

/// Source of sponsor entities, fetched by id.
#[async_trait]
pub trait EntitySource: Send + Sync {
    /// Fetch one sponsor.
    async fn fetch_entity(&self, id: &Id) -> std::result::Result<SecondaryEntity, PartialEntityError>;

    /// Whether `fetch_batch` is backed by a real batch endpoint.
    fn supports_batch(&self) -> bool {
        false
    }

    /// Fetch several sponsors in one request. Ids missing from the answer
    /// are simply unresolved.
    async fn fetch_batch(&self, _ids: &[Id]) -> std::result::Result<Vec<SecondaryEntity>, EntityFailure> {
        Err(EntityFailure::Unsupported)
    }
}
