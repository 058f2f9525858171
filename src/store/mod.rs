//! Persistence gateway: idempotent upserts keyed by a filter document.
//!
//! Writes never abort the run. [`Gateway`] logs a failed upsert, counts it
//! and lets the caller carry on with the next step.

use serde_json::Value;
use std::{
    future::Future,
    sync::atomic::{AtomicUsize, Ordering},
};
use thiserror::Error;
use tracing::{debug, error};

pub mod collections;
mod mongo;

pub use mongo::MongoStore;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

pub trait DocumentStore {
    /// Set every top-level field of `document` on the single document
    /// matching `filter`, inserting it (filter fields included) if absent.
    fn upsert(
        &self,
        collection: &str,
        filter: &Value,
        document: &Value,
    ) -> impl Future<Output = Result<(), PersistenceError>> + Send;
}

#[derive(Debug, Error)]
#[error("failed to upsert into {collection}: {cause}")]
pub struct PersistenceError {
    pub collection: String,
    #[source]
    pub cause: BoxError,
}

impl PersistenceError {
    #[must_use]
    pub fn new(collection: &str, cause: impl Into<BoxError>) -> Self {
        Self {
            collection: collection.to_string(),
            cause: cause.into(),
        }
    }
}

pub struct Gateway<S> {
    store: S,
    failed_writes: AtomicUsize,
}

impl<S: DocumentStore> Gateway<S> {
    #[must_use]
    pub const fn new(store: S) -> Self {
        Self {
            store,
            failed_writes: AtomicUsize::new(0),
        }
    }

    /// Returns `true` when the write went through.
    pub async fn upsert(&self, collection: &str, filter: &Value, document: &Value) -> bool {
        match self.store.upsert(collection, filter, document).await {
            Ok(()) => {
                debug!(collection, %filter, "upserted");
                true
            }
            Err(e) => {
                self.failed_writes.fetch_add(1, Ordering::Relaxed);
                error!(collection, %filter, error = %e, "upsert failed, continuing");
                false
            }
        }
    }

    #[must_use]
    pub fn failed_writes(&self) -> usize {
        self.failed_writes.load(Ordering::Relaxed)
    }

    #[must_use]
    pub const fn store(&self) -> &S {
        &self.store
    }

    #[must_use]
    pub fn into_inner(self) -> S {
        self.store
    }
}
