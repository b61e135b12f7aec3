// Groups finished results into the reporting buckets
use crate::classifier::{ClassificationResult, MatchCategory};
use std::sync::Arc;

pub type TermResult = (String, Arc<ClassificationResult>);

#[derive(Debug, Default, Clone)]
pub struct ResultBuckets {
    pub no_match: Vec<TermResult>,
    pub partial: Vec<TermResult>,
    /// Embedded and template matches; both mean "part of a larger description"
    pub embedded: Vec<TermResult>,
    pub deleted: Vec<TermResult>,
    pub full: Vec<TermResult>,
    /// Cancelled or failed terms, kept out of the buckets
    pub unresolved: usize,
}

impl ResultBuckets {
    pub fn new() -> Self {
        Self::default()
    }

    /// Partition results, preserving their order within each bucket
    pub fn from_results<I>(results: I) -> Self
    where
        I: IntoIterator<Item = TermResult>,
    {
        let mut buckets = Self::new();
        for item in results {
            buckets.push(item);
        }
        buckets
    }

    pub fn push(&mut self, (term, result): TermResult) {
        let bucket = match result.category {
            MatchCategory::NoMatch => &mut self.no_match,
            MatchCategory::PartialMatch => &mut self.partial,
            MatchCategory::EmbeddedDescription | MatchCategory::TemplateMatch => {
                &mut self.embedded
            }
            MatchCategory::DeletedDescription => &mut self.deleted,
            MatchCategory::FullMatch => &mut self.full,
            MatchCategory::Cancelled | MatchCategory::Error => {
                self.unresolved += 1;
                return;
            }
        };
        bucket.push((term, result));
    }

    /// Buckets in report order with their headings
    pub fn sections(&self) -> [(&'static str, &[TermResult]); 5] {
        [
            ("Not in the Registry", self.no_match.as_slice()),
            ("Partial Results", self.partial.as_slice()),
            ("Apart of a Larger Description", self.embedded.as_slice()),
            ("Deleted Descriptions", self.deleted.as_slice()),
            ("Full Match Found", self.full.as_slice()),
        ]
    }

    pub fn resolved(&self) -> usize {
        self.sections().iter().map(|(_, items)| items.len()).sum()
    }
}
