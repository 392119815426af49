use crate::engine::{EngineQuery, SearchEngine};
use crate::search::{IndexSettings, SearchError, SearchResult};
use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Searches kept for inspection before the oldest are discarded
pub const DEFAULT_SEARCH_LOG_CAPACITY: usize = 1024;

#[derive(Debug, Clone, Default)]
struct MemoryIndex {
    primary_key: String,
    settings: Option<IndexSettings>,
    settings_updates: usize,
    documents: Vec<Value>,
    /// Serialized primary key -> position in `documents`
    positions: HashMap<String, usize>,
}

impl MemoryIndex {
    fn upsert(&mut self, id: String, document: Value) {
        match self.positions.get(&id) {
            Some(&pos) => self.documents[pos] = document,
            None => {
                self.positions.insert(id, self.documents.len());
                self.documents.push(document);
            }
        }
    }
}

#[derive(Debug)]
struct SearchLog {
    capacity: usize,
    entries: VecDeque<(String, EngineQuery)>,
}

impl SearchLog {
    fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: VecDeque::with_capacity(capacity.min(DEFAULT_SEARCH_LOG_CAPACITY)),
        }
    }

    fn record(&mut self, index_uid: &str, query: &EngineQuery) {
        if self.capacity == 0 {
            return;
        }
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back((index_uid.to_string(), query.clone()));
    }
}

/// In-memory engine (for local runs and testing)
///
/// Holds documents and settings but does no matching or ranking: a search
/// returns the requested page of stored documents in insertion order.
/// The most recent searches are kept in a bounded log.
#[derive(Clone)]
pub struct InMemoryEngine {
    indexes: Arc<DashMap<String, MemoryIndex>>,
    searches: Arc<Mutex<SearchLog>>,
    unavailable: Arc<AtomicBool>,
}

impl Default for InMemoryEngine {
    fn default() -> Self {
        Self::with_search_log_capacity(DEFAULT_SEARCH_LOG_CAPACITY)
    }
}

impl InMemoryEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep at most `capacity` searches; `0` disables recording
    pub fn with_search_log_capacity(capacity: usize) -> Self {
        Self {
            indexes: Arc::new(DashMap::new()),
            searches: Arc::new(Mutex::new(SearchLog::new(capacity))),
            unavailable: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Make every subsequent call fail as if the engine were unreachable
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Settings last applied to an index
    pub fn settings(&self, index_uid: &str) -> Option<IndexSettings> {
        self.indexes.get(index_uid).and_then(|i| i.settings.clone())
    }

    /// How many times settings were pushed to an index
    pub fn settings_updates(&self, index_uid: &str) -> usize {
        self.indexes
            .get(index_uid)
            .map(|i| i.settings_updates)
            .unwrap_or(0)
    }

    pub fn document_count(&self, index_uid: &str) -> usize {
        self.indexes
            .get(index_uid)
            .map(|i| i.documents.len())
            .unwrap_or(0)
    }

    pub fn index_uids(&self) -> Vec<String> {
        let mut uids: Vec<String> = self.indexes.iter().map(|e| e.key().clone()).collect();
        uids.sort();
        uids
    }

    /// Most recent searches received, oldest first
    pub fn recorded_searches(&self) -> Vec<(String, EngineQuery)> {
        self.searches.lock().entries.iter().cloned().collect()
    }

    fn ensure_available(&self) -> SearchResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            Err(SearchError::EngineUnavailable(
                "in-memory engine is marked unavailable".to_string(),
            ))
        } else {
            Ok(())
        }
    }

    fn missing(index_uid: &str) -> SearchError {
        SearchError::IndexNotFound(format!("Index `{}` not found.", index_uid))
    }
}

#[async_trait]
impl SearchEngine for InMemoryEngine {
    fn backend_name(&self) -> &'static str {
        "in_memory"
    }

    async fn create_or_get_index(&self, index_uid: &str, primary_key: &str) -> SearchResult<()> {
        self.ensure_available()?;

        self.indexes
            .entry(index_uid.to_string())
            .or_insert_with(|| {
                tracing::debug!(index_uid, primary_key, "Index created");
                MemoryIndex {
                    primary_key: primary_key.to_string(),
                    ..Default::default()
                }
            });
        Ok(())
    }

    async fn update_settings(&self, index_uid: &str, settings: &IndexSettings) -> SearchResult<()> {
        self.ensure_available()?;

        let mut index = self
            .indexes
            .get_mut(index_uid)
            .ok_or_else(|| Self::missing(index_uid))?;
        index.settings = Some(settings.clone());
        index.settings_updates += 1;
        Ok(())
    }

    async fn add_documents(
        &self,
        index_uid: &str,
        primary_key: &str,
        documents: &[Value],
    ) -> SearchResult<()> {
        self.ensure_available()?;

        let mut index = self
            .indexes
            .get_mut(index_uid)
            .ok_or_else(|| Self::missing(index_uid))?;

        if index.primary_key.is_empty() {
            index.primary_key = primary_key.to_string();
        }
        let key = index.primary_key.clone();

        // The whole batch is rejected before anything is written
        let ids = documents
            .iter()
            .map(|document| {
                document
                    .get(&key)
                    .map(Value::to_string)
                    .ok_or_else(|| SearchError::EngineRejected {
                        code: "missing_document_id".to_string(),
                        message: format!("document is missing primary key `{}`", key),
                    })
            })
            .collect::<SearchResult<Vec<String>>>()?;

        for (id, document) in ids.into_iter().zip(documents) {
            index.upsert(id, document.clone());
        }
        Ok(())
    }

    async fn search(&self, index_uid: &str, query: &EngineQuery) -> SearchResult<Value> {
        self.ensure_available()?;
        self.searches.lock().record(index_uid, query);

        let index = self
            .indexes
            .get(index_uid)
            .ok_or_else(|| Self::missing(index_uid))?;

        let cap = index
            .settings
            .as_ref()
            .map(|s| s.pagination.max_total_hits)
            .unwrap_or(usize::MAX);
        let reachable = index.documents.len().min(cap);

        let hits: Vec<Value> = index.documents[..reachable]
            .iter()
            .skip(query.offset)
            .take(query.limit)
            .cloned()
            .collect();

        Ok(json!({
            "hits": hits,
            "query": query.q,
            "processingTimeMs": 0,
            "limit": query.limit,
            "offset": query.offset,
            "estimatedTotalHits": reachable,
        }))
    }

    async fn health(&self) -> SearchResult<()> {
        self.ensure_available()
    }
}
