// Longest-prefix search used when a term has no results of its own
use crate::backend::{BackendError, SearchBackend};
use tokio_util::sync::CancellationToken;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrefixOutcome {
    Found(String),
    /// Even the first word has no results
    NoPrefix,
    Cancelled,
}

/// Binary search over word counts `[1, n]` for the longest leading run of
/// words that still returns results.
///
/// Assumes results are monotone in prefix length: if `k` words return nothing,
/// no longer prefix returns anything. That is not checked, so a registry that
/// stems or fuzzes queries can make this settle on a shorter prefix than the
/// best one.
///
/// A query that was already sent when `cancel` fires still counts; the search
/// only reports `Cancelled` when it sees the token before issuing a query.
pub async fn find_longest_prefix(
    term: &str,
    backend: &dyn SearchBackend,
    cancel: &CancellationToken,
) -> Result<PrefixOutcome, BackendError> {
    let words: Vec<&str> = term.split_whitespace().collect();
    let (mut lo, mut hi) = (1usize, words.len());
    let mut best = None;

    while lo <= hi {
        if cancel.is_cancelled() {
            debug!("Prefix search for '{}' cancelled", term);
            return Ok(PrefixOutcome::Cancelled);
        }

        let mid = lo + (hi - lo) / 2;
        let prefix = words[..mid].join(" ");
        let page = backend.search(&prefix).await?;

        if page.has_results() {
            debug!("Prefix '{}' has results", prefix);
            best = Some(prefix);
            lo = mid + 1;
        } else {
            hi = mid - 1;
        }
    }

    Ok(best.map_or(PrefixOutcome::NoPrefix, PrefixOutcome::Found))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{DescriptionRow, RawResultPage};
    use crate::fixture::FixtureBackend;

    /// Backend where every prefix of up to `k` words has results
    fn monotone_backend(term: &str, k: usize) -> FixtureBackend {
        let words: Vec<&str> = term.split_whitespace().collect();
        (1..=k).fold(FixtureBackend::new(), |backend, len| {
            let prefix = words[..len].join(" ");
            let row = DescriptionRow::new(&prefix);
            backend.with_page(&prefix, RawResultPage::listing(vec![row]))
        })
    }

    #[tokio::test]
    async fn test_finds_longest_prefix_in_log_queries() {
        let term = "one two three four five six seven eight";
        for k in 1..=8 {
            let backend = monotone_backend(term, k);
            let prefix = find_longest_prefix(term, &backend, &CancellationToken::new())
                .await
                .unwrap();

            let expected = term.split_whitespace().take(k).collect::<Vec<_>>().join(" ");
            assert_eq!(prefix, PrefixOutcome::Found(expected), "k = {}", k);
            // floor(log2(8)) + 1
            assert!(backend.calls() <= 4, "k = {} took {} queries", k, backend.calls());
        }
    }

    #[tokio::test]
    async fn test_no_prefix_when_first_word_misses() {
        let backend = FixtureBackend::new();
        let prefix = find_longest_prefix("zzz nonexistent term", &backend, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(prefix, PrefixOutcome::NoPrefix);
        assert!(backend.queries().contains(&"zzz".to_string()));
    }

    #[tokio::test]
    async fn test_cancelled_search_issues_no_queries() {
        let backend = monotone_backend("red running shoes", 2);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let prefix = find_longest_prefix("red running shoes", &backend, &cancel)
            .await
            .unwrap();
        assert_eq!(prefix, PrefixOutcome::Cancelled);
        assert_eq!(backend.calls(), 0);
    }

    #[tokio::test]
    async fn test_backend_failure_propagates() {
        let backend = FixtureBackend::new().with_failure("red running");
        let result =
            find_longest_prefix("red running shoes", &backend, &CancellationToken::new()).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_empty_term_has_no_prefix() {
        let backend = FixtureBackend::new();
        let prefix = find_longest_prefix("   ", &backend, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(prefix, PrefixOutcome::NoPrefix);
        assert_eq!(backend.calls(), 0);
    }
}
