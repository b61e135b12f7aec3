// Batch coordinator: runs term lookups under a concurrency bound and streams
// results back in completion order
use crate::backend::{BackendError, SearchBackend};
use crate::cache::ResultCache;
use crate::classifier::{classify, ClassificationResult};
use crate::normalize::normalize_text;
use futures::stream::{FuturesUnordered, StreamExt};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::{mpsc, Semaphore};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

pub const TERM_DELIMITER: char = ';';

#[derive(Error, Debug)]
pub enum BatchError {
    #[error("No search terms provided")]
    EmptyInput,
    #[error("Could not establish registry session: {0}")]
    Session(#[source] BackendError),
}

/// Events produced by a batch run. Every `Result` is followed by a `Progress`;
/// `Finished` is always last and sent exactly once per successful run.
#[derive(Debug, Clone)]
pub enum BatchEvent {
    Result {
        term: String,
        result: Arc<ClassificationResult>,
    },
    Progress(u8),
    Finished {
        elapsed: Duration,
    },
}

/// Split a raw batch on `;`, trimming and dropping blank segments
pub fn parse_terms(input: &str) -> Vec<String> {
    input
        .split(TERM_DELIMITER)
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

struct BatchProgress {
    total: usize,
    completed: AtomicUsize,
}

impl BatchProgress {
    fn new(total: usize) -> Self {
        Self {
            total,
            completed: AtomicUsize::new(0),
        }
    }

    /// Count one finished term and return the overall percentage
    fn record(&self) -> u8 {
        let done = self.completed.fetch_add(1, Ordering::SeqCst) + 1;
        ((done * 100) / self.total.max(1)).min(100) as u8
    }
}

pub struct BatchCoordinator {
    backend: Arc<dyn SearchBackend>,
    cache: Arc<ResultCache>,
    concurrency_limit: usize,
    cancel: CancellationToken,
}

impl BatchCoordinator {
    pub fn new(
        backend: Arc<dyn SearchBackend>,
        cache: Arc<ResultCache>,
        concurrency_limit: usize,
    ) -> Self {
        Self {
            backend,
            cache,
            concurrency_limit: concurrency_limit.max(1),
            cancel: CancellationToken::new(),
        }
    }

    #[allow(dead_code)]
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Handle that cancels this coordinator's batches
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Run a `;`-delimited batch
    pub async fn run_batch(
        &self,
        input: &str,
        events: &mpsc::UnboundedSender<BatchEvent>,
    ) -> Result<Duration, BatchError> {
        self.run_terms(parse_terms(input), events).await
    }

    pub async fn run_terms(
        &self,
        terms: Vec<String>,
        events: &mpsc::UnboundedSender<BatchEvent>,
    ) -> Result<Duration, BatchError> {
        if terms.is_empty() {
            return Err(BatchError::EmptyInput);
        }

        let start = Instant::now();
        self.backend.connect().await.map_err(BatchError::Session)?;
        info!(
            "Checking {} terms with up to {} concurrent lookups",
            terms.len(),
            self.concurrency_limit
        );

        let progress = BatchProgress::new(terms.len());
        let semaphore = Arc::new(Semaphore::new(self.concurrency_limit));
        let mut pending = FuturesUnordered::new();

        for term in terms {
            let backend = self.backend.clone();
            let cache = self.cache.clone();
            let semaphore = semaphore.clone();
            let cancel = self.cancel.clone();
            let task_term = term.clone();

            let handle = tokio::spawn(async move {
                lookup(&task_term, backend.as_ref(), &cache, &semaphore, &cancel).await
            });
            pending.push(async move {
                match handle.await {
                    Ok(result) => (term, result),
                    Err(e) => {
                        let message = format!("lookup task failed: {}", e);
                        let result = Arc::new(ClassificationResult::failed(&term, &message));
                        (term, result)
                    }
                }
            });
        }

        while let Some((term, result)) = pending.next().await {
            let percent = progress.record();
            let _ = events.send(BatchEvent::Result { term, result });
            let _ = events.send(BatchEvent::Progress(percent));
        }

        let elapsed = start.elapsed();
        let stats = self.cache.stats();
        info!(
            "Batch finished in {:.2}s ({} cached results, {:.0}% cache hit rate)",
            elapsed.as_secs_f64(),
            stats.entries,
            stats.hit_rate()
        );
        let _ = events.send(BatchEvent::Finished { elapsed });
        Ok(elapsed)
    }
}

/// One term's path through cache, admission and classification
async fn lookup(
    term: &str,
    backend: &dyn SearchBackend,
    cache: &ResultCache,
    semaphore: &Semaphore,
    cancel: &CancellationToken,
) -> Arc<ClassificationResult> {
    if cancel.is_cancelled() {
        return Arc::new(ClassificationResult::cancelled(term));
    }

    let key = normalize_text(term);
    if let Some(hit) = cache.get(&key) {
        debug!("Cache hit for '{}'", term);
        return hit;
    }

    let _permit = tokio::select! {
        permit = semaphore.acquire() => match permit {
            Ok(permit) => permit,
            Err(_) => return Arc::new(ClassificationResult::cancelled(term)),
        },
        _ = cancel.cancelled() => return Arc::new(ClassificationResult::cancelled(term)),
    };

    let result = Arc::new(classify(term, backend, cancel).await);
    if result.category.is_conclusive() {
        cache.put(&key, result.clone());
    }
    result
}
