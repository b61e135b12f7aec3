// Registry backend boundary: the page snapshot every query returns and the
// trait the classifier talks to
use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

lazy_static! {
    static ref ECHO_BANNER: Regex =
        Regex::new(r#"Displaying search results for:\s*"(.+?)""#).unwrap();
}

const ECHO_PREFIX: &str = "Displaying search results for:";
const LISTING_MARKER: &str = "Displaying";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    #[error("Could not reach registry at {url}: {message}")]
    Connect { url: String, message: String },
    #[error("Query '{query}' failed: {message}")]
    Request { query: String, message: String },
    #[error("Query '{query}' timed out")]
    Timeout { query: String },
    #[error("Registry returned HTTP {status} for '{query}'")]
    Status { query: String, status: u16 },
    #[error("Could not decode registry page for '{query}': {message}")]
    Decode { query: String, message: String },
}

/// One row of the registry's description table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DescriptionRow {
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, alias = "recordID", skip_serializing_if = "Option::is_none")]
    pub record_id: Option<String>,
}

#[allow(dead_code)]
impl DescriptionRow {
    pub fn new(description: &str) -> Self {
        Self {
            description: description.to_string(),
            notes: None,
            record_id: None,
        }
    }

    pub fn with_notes(mut self, notes: &str) -> Self {
        self.notes = Some(notes.to_string());
        self
    }

    pub fn with_record_id(mut self, id: &str) -> Self {
        self.record_id = Some(id.to_string());
        self
    }
}

/// What the results banner says about a query
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SummaryKind {
    /// "Displaying search results for: ..." with the registry's own rendering
    /// of the term, when one is quoted
    Echo { displayed_term: Option<String> },
    /// Results exist but the banner does not echo a term
    Listing,
    /// No results
    Empty,
}

/// Snapshot of a registry results page
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawResultPage {
    #[serde(default)]
    pub summary: String,
    #[serde(default, alias = "descriptionRows")]
    pub rows: Vec<DescriptionRow>,
}

impl RawResultPage {
    #[allow(dead_code)]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Page whose banner echoes `term` back
    #[allow(dead_code)]
    pub fn echo(term: &str, rows: Vec<DescriptionRow>) -> Self {
        Self {
            summary: format!("{} \"{}\"", ECHO_PREFIX, term),
            rows,
        }
    }

    /// Page with results under a generic banner
    #[allow(dead_code)]
    pub fn listing(rows: Vec<DescriptionRow>) -> Self {
        Self {
            summary: format!("{} 1 - {} of {}", LISTING_MARKER, rows.len(), rows.len()),
            rows,
        }
    }

    pub fn summary_kind(&self) -> SummaryKind {
        let summary = self.summary.trim();
        if summary.contains(ECHO_PREFIX) {
            let displayed_term = ECHO_BANNER
                .captures(summary)
                .and_then(|c| c.get(1))
                .map(|m| m.as_str().trim().to_string());
            SummaryKind::Echo { displayed_term }
        } else if summary.contains(LISTING_MARKER) {
            SummaryKind::Listing
        } else {
            SummaryKind::Empty
        }
    }

    pub fn has_results(&self) -> bool {
        self.summary_kind() != SummaryKind::Empty
    }

    /// Record ID of the first row that links to a record
    pub fn first_record_id(&self) -> Option<&str> {
        self.rows.iter().find_map(|r| r.record_id.as_deref())
    }
}

/// Query interface of the remote registry.
///
/// Implementations must tolerate many concurrent `search` calls; each call is
/// an independent query with no shared page state.
#[async_trait]
pub trait SearchBackend: Send + Sync {
    /// Establish the session a batch runs on. Failure aborts the whole batch.
    async fn connect(&self) -> Result<(), BackendError> {
        Ok(())
    }

    async fn search(&self, query: &str) -> Result<RawResultPage, BackendError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_kind_echo() {
        let page = RawResultPage::echo("Running Shoes", vec![]);
        assert_eq!(
            page.summary_kind(),
            SummaryKind::Echo {
                displayed_term: Some("Running Shoes".to_string())
            }
        );
        assert!(page.has_results());
    }

    #[test]
    fn test_summary_kind_echo_without_quote() {
        let page = RawResultPage {
            summary: "Displaying search results for: shoes (12)".to_string(),
            rows: vec![],
        };
        assert_eq!(page.summary_kind(), SummaryKind::Echo { displayed_term: None });
    }

    #[test]
    fn test_summary_kind_listing_and_empty() {
        let listing = RawResultPage::listing(vec![DescriptionRow::new("shoes")]);
        assert_eq!(listing.summary_kind(), SummaryKind::Listing);

        assert_eq!(RawResultPage::empty().summary_kind(), SummaryKind::Empty);
        let no_hits = RawResultPage {
            summary: "No results".to_string(),
            rows: vec![],
        };
        assert!(!no_hits.has_results());
    }

    #[test]
    fn test_first_record_id() {
        let page = RawResultPage::listing(vec![
            DescriptionRow::new("a"),
            DescriptionRow::new("b").with_record_id("025-100"),
            DescriptionRow::new("c").with_record_id("025-200"),
        ]);
        assert_eq!(page.first_record_id(), Some("025-100"));
        assert_eq!(RawResultPage::empty().first_record_id(), None);
    }

    #[test]
    fn test_page_deserializes_registry_field_names() {
        let json = r#"{
            "summary": "Displaying 1 - 1 of 1",
            "descriptionRows": [
                {"description": "Shoes", "notes": "Deleted 2020", "recordID": "025-1"}
            ]
        }"#;
        let page: RawResultPage = serde_json::from_str(json).unwrap();
        assert_eq!(page.rows.len(), 1);
        assert_eq!(page.rows[0].record_id.as_deref(), Some("025-1"));
        assert_eq!(page.rows[0].notes.as_deref(), Some("Deleted 2020"));
    }
}
