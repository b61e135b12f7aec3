// Term classification: turns registry pages into a match category
use crate::backend::{BackendError, RawResultPage, SearchBackend, SummaryKind};
use crate::normalize::{
    contains_description, is_exact_description, normalize_text, notes_mark_deleted,
    prefix_in_description,
};
use crate::prefix::{find_longest_prefix, PrefixOutcome};
use serde::Serialize;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

pub const NOT_FOUND: &str = "Not found";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchCategory {
    FullMatch,
    DeletedDescription,
    /// Longest prefix found as a word subsequence of a larger description
    TemplateMatch,
    /// Term found inside a larger description directly
    EmbeddedDescription,
    PartialMatch,
    NoMatch,
    Cancelled,
    Error,
}

impl MatchCategory {
    pub fn label(&self) -> &'static str {
        match self {
            MatchCategory::FullMatch => "Full match found",
            MatchCategory::DeletedDescription => "Deleted description found",
            MatchCategory::TemplateMatch | MatchCategory::EmbeddedDescription => {
                "Apart of a larger description"
            }
            MatchCategory::PartialMatch => "Partial match found",
            MatchCategory::NoMatch => "No match found",
            MatchCategory::Cancelled => "Cancelled",
            MatchCategory::Error => "Error",
        }
    }

    /// Whether the outcome reflects the registry and can be reused
    pub fn is_conclusive(&self) -> bool {
        !matches!(self, MatchCategory::Cancelled | MatchCategory::Error)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassificationResult {
    pub term: String,
    pub category: MatchCategory,
    pub record_id: Option<String>,
    pub matched_description: Option<String>,
    pub matched_prefix: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ClassificationResult {
    pub fn new(term: &str, category: MatchCategory) -> Self {
        Self {
            term: term.to_string(),
            category,
            record_id: None,
            matched_description: None,
            matched_prefix: None,
            error: None,
        }
    }

    pub fn cancelled(term: &str) -> Self {
        Self::new(term, MatchCategory::Cancelled)
    }

    pub fn failed(term: &str, message: &str) -> Self {
        let mut result = Self::new(term, MatchCategory::Error);
        result.error = Some(message.to_string());
        result
    }

    fn with_record_id(mut self, id: Option<&str>) -> Self {
        self.record_id = id.map(|s| s.trim().to_string());
        self
    }

    fn with_description(mut self, description: Option<&str>) -> Self {
        self.matched_description = description.map(|s| s.trim().to_string());
        self
    }

    fn with_prefix(mut self, prefix: &str) -> Self {
        self.matched_prefix = Some(prefix.to_string());
        self
    }

    pub fn record_id_or_default(&self) -> &str {
        self.record_id.as_deref().unwrap_or(NOT_FOUND)
    }

    /// One-line human summary
    pub fn summary(&self) -> String {
        let id = self.record_id_or_default();
        match self.category {
            MatchCategory::FullMatch | MatchCategory::DeletedDescription => {
                format!("{} (Term ID: {})", self.category.label(), id)
            }
            MatchCategory::TemplateMatch | MatchCategory::EmbeddedDescription => format!(
                "{} (Example - {} - Term ID: {})",
                self.category.label(),
                self.matched_description
                    .as_deref()
                    .unwrap_or("Description not found"),
                id
            ),
            MatchCategory::PartialMatch => format!(
                "Full match not found, but partial match found: '{}' (Term ID: {})",
                self.matched_prefix.as_deref().unwrap_or_default(),
                id
            ),
            MatchCategory::NoMatch | MatchCategory::Cancelled => self.category.label().to_string(),
            MatchCategory::Error => format!(
                "Error: {}",
                self.error.as_deref().unwrap_or("unknown failure")
            ),
        }
    }
}

#[derive(Error, Debug)]
enum ClassifyError {
    #[error("cancelled")]
    Cancelled,
    #[error(transparent)]
    Backend(#[from] BackendError),
}

/// Outcome suggested by the first page, before the rows are inspected
enum Tentative {
    Full,
    Embedded,
    Partial(String),
}

/// Classify one term against the registry.
///
/// Backend failures become an `Error` result for this term only; cancellation
/// observed at a query boundary becomes `Cancelled`.
pub async fn classify(
    term: &str,
    backend: &dyn SearchBackend,
    cancel: &CancellationToken,
) -> ClassificationResult {
    match try_classify(term, backend, cancel).await {
        Ok(result) => {
            debug!("'{}' classified as {:?}", term, result.category);
            result
        }
        Err(ClassifyError::Cancelled) => ClassificationResult::cancelled(term),
        Err(ClassifyError::Backend(e)) => {
            warn!("Lookup for '{}' failed: {}", term, e);
            ClassificationResult::failed(term, &e.to_string())
        }
    }
}

async fn checked_search(
    backend: &dyn SearchBackend,
    query: &str,
    cancel: &CancellationToken,
) -> Result<RawResultPage, ClassifyError> {
    if cancel.is_cancelled() {
        return Err(ClassifyError::Cancelled);
    }
    Ok(backend.search(query).await?)
}

async fn try_classify(
    term: &str,
    backend: &dyn SearchBackend,
    cancel: &CancellationToken,
) -> Result<ClassificationResult, ClassifyError> {
    let normalized_term = normalize_text(term);
    let page = checked_search(backend, term, cancel).await?;

    let (tentative, page) = match page.summary_kind() {
        SummaryKind::Echo {
            displayed_term: Some(shown),
        } if normalize_text(&shown) == normalized_term => (Tentative::Full, page),
        SummaryKind::Echo { .. } | SummaryKind::Listing => (Tentative::Embedded, page),
        SummaryKind::Empty => {
            let prefix = match find_longest_prefix(term, backend, cancel).await? {
                PrefixOutcome::Found(prefix) => prefix,
                PrefixOutcome::NoPrefix => {
                    return Ok(ClassificationResult::new(term, MatchCategory::NoMatch))
                }
                PrefixOutcome::Cancelled => return Err(ClassifyError::Cancelled),
            };

            let prefix_page = checked_search(backend, &prefix, cancel).await?;
            if let Some(row) = prefix_page
                .rows
                .iter()
                .find(|row| prefix_in_description(&prefix, &row.description))
            {
                return Ok(ClassificationResult::new(term, MatchCategory::TemplateMatch)
                    .with_description(Some(&row.description))
                    .with_record_id(row.record_id.as_deref())
                    .with_prefix(&prefix));
            }
            (Tentative::Partial(prefix), prefix_page)
        }
    };

    Ok(confirm(term, &normalized_term, tentative, &page))
}

/// Refine a tentative outcome against the description rows of `page`.
/// Rows are scanned in page order and the first qualifying row wins; on each
/// row exact equality is tested before containment.
fn confirm(
    term: &str,
    normalized_term: &str,
    tentative: Tentative,
    page: &RawResultPage,
) -> ClassificationResult {
    let record_id = page.first_record_id();

    for row in &page.rows {
        let exact = is_exact_description(normalized_term, &row.description);
        if !exact && !contains_description(normalized_term, &row.description) {
            continue;
        }

        let category = if notes_mark_deleted(row.notes.as_deref()) {
            MatchCategory::DeletedDescription
        } else if exact {
            MatchCategory::FullMatch
        } else {
            MatchCategory::EmbeddedDescription
        };
        return ClassificationResult::new(term, category)
            .with_record_id(record_id)
            .with_description(Some(&row.description));
    }

    match tentative {
        Tentative::Partial(prefix) => {
            // Unreachable from try_classify: these rows were already scanned for a template
            if let Some(row) = page
                .rows
                .iter()
                .find(|row| prefix_in_description(&prefix, &row.description))
            {
                return ClassificationResult::new(term, MatchCategory::EmbeddedDescription)
                    .with_record_id(record_id)
                    .with_description(Some(&row.description));
            }
            ClassificationResult::new(term, MatchCategory::PartialMatch)
                .with_record_id(record_id)
                .with_prefix(&prefix)
        }
        // Results exist but no row confirms the term; report the first row as
        // the containing description.
        Tentative::Full | Tentative::Embedded => {
            ClassificationResult::new(term, MatchCategory::EmbeddedDescription)
                .with_record_id(record_id)
                .with_description(page.rows.first().map(|r| r.description.as_str()))
        }
    }
}
