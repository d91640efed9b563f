//! Query cache owned by the request loop. Entries are whole collections,
//! invalidated by key after mutations and refetched on the next read.

use crate::api::{ApiClient, ApiError};
use crate::model::ResultRecord;
use crate::resources::Resource;
use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum QueryKey {
    Results,
    Resource(Resource),
}

impl QueryKey {
    pub fn label(&self) -> String {
        match self {
            QueryKey::Results => "results".to_string(),
            QueryKey::Resource(r) => format!("resources.{}", r.name()),
        }
    }
}

#[derive(Debug, Clone)]
enum Cached {
    Results(Vec<ResultRecord>),
    Values(Vec<Value>),
}

#[derive(Debug, Clone)]
struct Entry {
    data: Cached,
    fetched_at: DateTime<Utc>,
    /// Monotonic fetch number; lets callers tell a refetch from a cache hit.
    seq: u64,
}

#[derive(Debug, Default)]
pub struct QueryStore {
    entries: HashMap<QueryKey, Entry>,
    fetches: u64,
}

impl QueryStore {
    pub fn new() -> Self {
        QueryStore::default()
    }

    /// Result records, from cache or a fresh `GET /results/`.
    pub fn results(&mut self, api: &mut ApiClient) -> Result<Vec<ResultRecord>, ApiError> {
        if let Some(Entry {
            data: Cached::Results(records),
            ..
        }) = self.entries.get(&QueryKey::Results)
        {
            return Ok(records.clone());
        }
        let records = api.list_results()?;
        self.put(QueryKey::Results, Cached::Results(records.clone()));
        Ok(records)
    }

    pub fn values(&mut self, api: &mut ApiClient, resource: Resource) -> Result<Vec<Value>, ApiError> {
        let key = QueryKey::Resource(resource);
        if let Some(Entry {
            data: Cached::Values(items),
            ..
        }) = self.entries.get(&key)
        {
            return Ok(items.clone());
        }
        let items = api.list_values(resource.path())?;
        self.put(key, Cached::Values(items.clone()));
        Ok(items)
    }

    fn put(&mut self, key: QueryKey, data: Cached) {
        self.fetches += 1;
        tracing::debug!(key = %key.label(), seq = self.fetches, "cache filled");
        self.entries.insert(
            key,
            Entry {
                data,
                fetched_at: Utc::now(),
                seq: self.fetches,
            },
        );
    }

    pub fn invalidate(&mut self, key: QueryKey) -> bool {
        let removed = self.entries.remove(&key).is_some();
        if removed {
            tracing::debug!(key = %key.label(), "cache invalidated");
        }
        removed
    }

    pub fn seq(&self, key: QueryKey) -> Option<u64> {
        self.entries.get(&key).map(|e| e.seq)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn snapshot(&self) -> Value {
        let mut keys: Vec<&QueryKey> = self.entries.keys().collect();
        keys.sort();
        let entries: Vec<Value> = keys
            .into_iter()
            .filter_map(|k| self.entries.get(k).map(|e| (k, e)))
            .map(|(k, e)| {
                let len = match &e.data {
                    Cached::Results(r) => r.len(),
                    Cached::Values(v) => v.len(),
                };
                json!({
                    "key": k.label(),
                    "seq": e.seq,
                    "len": len,
                    "fetchedAt": e.fetched_at.to_rfc3339(),
                })
            })
            .collect();
        json!({ "entries": entries, "fetches": self.fetches })
    }
}
