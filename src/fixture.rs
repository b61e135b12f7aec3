// Offline backend serving canned registry pages from a JSON fixture
use crate::backend::{BackendError, RawResultPage, SearchBackend};
use crate::normalize::normalize_text;
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tracing::debug;

/// On-disk fixture layout. Queries are matched after normalization; a query
/// with no page gets an empty page.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FixtureFile {
    #[serde(default)]
    pub pages: HashMap<String, RawResultPage>,
    /// Queries that fail as if the network dropped
    #[serde(default)]
    pub failures: Vec<String>,
    /// Latency applied to every query
    #[serde(default)]
    pub delay_ms: u64,
    /// Per-query latency overriding `delay_ms`
    #[serde(default)]
    pub delays_ms: HashMap<String, u64>,
}

pub struct FixtureBackend {
    pages: HashMap<String, RawResultPage>,
    failures: HashSet<String>,
    delay: Duration,
    delays: HashMap<String, Duration>,
    refuse_connect: bool,
    calls: AtomicUsize,
    queries: Mutex<Vec<String>>,
}

#[allow(dead_code)]
impl FixtureBackend {
    pub fn new() -> Self {
        Self::from_fixture(FixtureFile::default())
    }

    pub fn from_fixture(fixture: FixtureFile) -> Self {
        Self {
            pages: fixture
                .pages
                .into_iter()
                .map(|(q, page)| (normalize_text(&q), page))
                .collect(),
            failures: fixture.failures.iter().map(|q| normalize_text(q)).collect(),
            delay: Duration::from_millis(fixture.delay_ms),
            delays: fixture
                .delays_ms
                .into_iter()
                .map(|(q, ms)| (normalize_text(&q), Duration::from_millis(ms)))
                .collect(),
            refuse_connect: false,
            calls: AtomicUsize::new(0),
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read fixture {}", path.display()))?;
        let fixture: FixtureFile = serde_json::from_str(&content)
            .with_context(|| format!("Invalid fixture {}", path.display()))?;
        debug!(
            "Loaded fixture {} with {} pages",
            path.display(),
            fixture.pages.len()
        );
        Ok(Self::from_fixture(fixture))
    }

    pub fn with_page(mut self, query: &str, page: RawResultPage) -> Self {
        self.pages.insert(normalize_text(query), page);
        self
    }

    pub fn with_failure(mut self, query: &str) -> Self {
        self.failures.insert(normalize_text(query));
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_query_delay(mut self, query: &str, delay: Duration) -> Self {
        self.delays.insert(normalize_text(query), delay);
        self
    }

    pub fn refusing_connections(mut self) -> Self {
        self.refuse_connect = true;
        self
    }

    /// Number of `search` calls served so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Queries in the order they were received
    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().map(|q| q.clone()).unwrap_or_default()
    }
}

impl Default for FixtureBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SearchBackend for FixtureBackend {
    async fn connect(&self) -> Result<(), BackendError> {
        if self.refuse_connect {
            return Err(BackendError::Connect {
                url: "fixture".to_string(),
                message: "connection refused".to_string(),
            });
        }
        Ok(())
    }

    async fn search(&self, query: &str) -> Result<RawResultPage, BackendError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut queries) = self.queries.lock() {
            queries.push(query.to_string());
        }

        let key = normalize_text(query);
        let delay = self.delays.get(&key).copied().unwrap_or(self.delay);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        if self.failures.contains(&key) {
            return Err(BackendError::Request {
                query: query.to_string(),
                message: "connection reset".to_string(),
            });
        }

        Ok(self.pages.get(&key).cloned().unwrap_or_default())
    }
}
