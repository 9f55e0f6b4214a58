//! Cache consistency layer: named read-cache regions and the invalidation
//! policy applied on every mutation.
//!
//! The policy is eager and coarse for aggregate views (summaries, search
//! results are cleared wholesale) and precise for single-entity views
//! (detail and payload entries are evicted by key). Correctness over
//! hit-rate.

use crate::models::{InterfaceException, InterfaceType};
use parking_lot::RwLock;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// One named cache region holding opaque serialized view entries.
#[derive(Debug)]
pub struct CacheRegion {
    name: &'static str,
    entries: RwLock<HashMap<String, Value>>,
}

impl CacheRegion {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.entries.read().get(key).cloned()
    }

    pub fn put(&self, key: impl Into<String>, value: Value) {
        self.entries.write().insert(key.into(), value);
    }

    /// Evict a single entry
    pub fn remove(&self, key: &str) {
        if self.entries.write().remove(key).is_some() {
            debug!(region = self.name, key = %key, "Evicted cache entry");
        }
    }

    /// Evict every entry in the region
    pub fn clear(&self) {
        let mut entries = self.entries.write();
        if !entries.is_empty() {
            debug!(region = self.name, evicted = entries.len(), "Cleared cache region");
            entries.clear();
        }
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

/// The derived read caches kept consistent by the invalidation service.
#[derive(Debug)]
pub struct ExceptionCaches {
    /// Single-exception detail views, keyed by transaction id
    pub details: CacheRegion,
    /// Retrieved original payloads, keyed by transaction id + interface type
    pub payloads: CacheRegion,
    /// Aggregate summary statistics
    pub summaries: CacheRegion,
    /// Search result pages
    pub search_results: CacheRegion,
    /// Related-exception views, keyed by customer id
    pub related_by_customer: CacheRegion,
}

impl ExceptionCaches {
    pub fn new() -> Self {
        Self {
            details: CacheRegion::new("exception-details"),
            payloads: CacheRegion::new("exception-payloads"),
            summaries: CacheRegion::new("exception-summaries"),
            search_results: CacheRegion::new("exception-search-results"),
            related_by_customer: CacheRegion::new("related-exceptions"),
        }
    }

    /// Cache key for a payload entry.
    pub fn payload_key(transaction_id: &str, interface_type: InterfaceType) -> String {
        format!("{transaction_id}:{interface_type}")
    }
}

impl Default for ExceptionCaches {
    fn default() -> Self {
        Self::new()
    }
}

/// Applies the mutation → invalidation mapping synchronously with each
/// mutating operation.
#[derive(Debug, Clone)]
pub struct CacheInvalidationService {
    caches: Arc<ExceptionCaches>,
}

impl CacheInvalidationService {
    pub fn new(caches: Arc<ExceptionCaches>) -> Self {
        Self { caches }
    }

    pub fn caches(&self) -> &ExceptionCaches {
        &self.caches
    }

    /// Invalidation on exception creation: aggregate views plus the
    /// customer's related-exceptions view.
    pub fn on_exception_created(&self, exception: &InterfaceException) {
        debug!(
            transaction_id = %exception.transaction_id,
            "Invalidating caches on exception creation"
        );
        self.caches.summaries.clear();
        self.caches.search_results.clear();
        self.evict_customer_entry(exception);
    }

    /// Invalidation on a status change: the exception's detail entry plus
    /// aggregate views and the customer's related-exceptions view.
    pub fn on_status_change(&self, exception: &InterfaceException) {
        debug!(
            transaction_id = %exception.transaction_id,
            status = %exception.status,
            "Invalidating caches on status change"
        );
        self.caches.details.remove(&exception.transaction_id);
        self.caches.summaries.clear();
        self.caches.search_results.clear();
        self.evict_customer_entry(exception);
    }

    /// Invalidation on retry initiation or completion: detail and payload
    /// entries plus summaries and the customer's related-exceptions view.
    pub fn on_retry_activity(&self, exception: &InterfaceException) {
        debug!(
            transaction_id = %exception.transaction_id,
            "Invalidating caches on retry activity"
        );
        self.caches.details.remove(&exception.transaction_id);
        self.caches.payloads.remove(&ExceptionCaches::payload_key(
            &exception.transaction_id,
            exception.interface_type,
        ));
        self.caches.summaries.clear();
        self.evict_customer_entry(exception);
    }

    fn evict_customer_entry(&self, exception: &InterfaceException) {
        if let Some(customer_id) = &exception.customer_id {
            self.caches.related_by_customer.remove(customer_id);
        }
    }
}
