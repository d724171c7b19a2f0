//! Parallel scoring fan-out over a catalog snapshot.

use std::sync::{Arc, LazyLock};

use rayon::prelude::*;
use tokio_util::sync::CancellationToken;

use crate::catalog::{Catalog, LaunchAction};

use super::error::QueryError;
use super::scorer::Scorer;

/// One ranked hit. Ordered by score (descending), then title, then
/// identity, so a fixed snapshot and query always produce the same list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankedResult {
    pub title: String,
    pub subtitle: String,
    pub icon_path: String,
    pub score: i32,
    pub match_positions: Vec<usize>,
    pub launch: LaunchAction,
    pub unique_identifier: String,
}

/// The shared empty result list, returned for queries with no matches and
/// reused by the cache so empty entries carry no weight.
pub fn empty_results() -> Arc<Vec<RankedResult>> {
    static EMPTY: LazyLock<Arc<Vec<RankedResult>>> = LazyLock::new(|| Arc::new(Vec::new()));
    Arc::clone(&EMPTY)
}

/// Presentation switches read from settings at call time.
#[derive(Debug, Clone, Copy, Default)]
pub struct QueryOptions {
    pub enable_description: bool,
    pub hide_apps_path: bool,
}

/// Scores snapshots against queries through the injected [`Scorer`].
pub struct QueryEngine {
    scorer: Arc<dyn Scorer>,
}

impl QueryEngine {
    pub fn new(scorer: Arc<dyn Scorer>) -> Self {
        Self { scorer }
    }

    /// Score every enabled entry of `snapshot` against `query` in parallel.
    ///
    /// Cancellation fails the whole call; a partial list never escapes.
    /// Entries the scorer rejects, and scores of zero or less, are dropped.
    pub fn run(
        &self,
        snapshot: &Catalog,
        query: &str,
        options: QueryOptions,
        cancel: &CancellationToken,
    ) -> Result<Arc<Vec<RankedResult>>, QueryError> {
        if cancel.is_cancelled() {
            return Err(QueryError::Cancelled);
        }

        let mut hits: Vec<RankedResult> = snapshot
            .entries
            .par_iter()
            .filter(|entry| entry.enabled)
            .filter_map(|entry| {
                if cancel.is_cancelled() {
                    return None;
                }
                let (title, matched) =
                    entry.score_against(query, self.scorer.as_ref(), options.enable_description)?;
                if matched.score <= 0 {
                    return None;
                }

                let subtitle = if options.hide_apps_path {
                    String::new()
                } else {
                    entry
                        .resolved_launch_path
                        .clone()
                        .unwrap_or_else(|| entry.full_path.clone())
                };

                Some(RankedResult {
                    title,
                    subtitle,
                    icon_path: entry.icon_path.clone(),
                    score: matched.score,
                    match_positions: matched.positions,
                    launch: entry.launch_action(),
                    unique_identifier: entry.unique_identifier(),
                })
            })
            .collect();

        // A cancellation that raced the fan-out must not surface whatever
        // subset happened to finish.
        if cancel.is_cancelled() {
            return Err(QueryError::Cancelled);
        }

        if hits.is_empty() {
            return Ok(empty_results());
        }

        hits.sort_unstable_by(|a, b| {
            b.score
                .cmp(&a.score)
                .then_with(|| a.title.cmp(&b.title))
                .then_with(|| a.unique_identifier.cmp(&b.unique_identifier))
        });
        Ok(Arc::new(hits))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ProgramEntry;
    use crate::query::scorer::{ScoreMatch, SubsequenceScorer};
    use std::path::PathBuf;

    fn snapshot(names: &[&str]) -> Catalog {
        Catalog::new(
            names
                .iter()
                .map(|name| {
                    let mut entry =
                        ProgramEntry::from_path(&PathBuf::from(format!("/apps/{name}.exe")));
                    entry.display_name = name.to_string();
                    entry
                })
                .collect(),
        )
    }

    fn engine() -> QueryEngine {
        QueryEngine::new(Arc::new(SubsequenceScorer))
    }

    #[test]
    fn test_disabled_entries_are_skipped() {
        let mut catalog = snapshot(&["firefox", "fireplace"]);
        catalog.entries[1].enabled = false;

        let results = engine()
            .run(&catalog, "fire", QueryOptions::default(), &CancellationToken::new())
            .unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].title, "firefox");
    }

    #[test]
    fn test_repeated_runs_are_deterministic() {
        let catalog = snapshot(&["firefox", "file manager", "fig", "profiler"]);
        let engine = engine();

        let first = engine
            .run(&catalog, "fi", QueryOptions::default(), &CancellationToken::new())
            .unwrap();
        let second = engine
            .run(&catalog, "fi", QueryOptions::default(), &CancellationToken::new())
            .unwrap();

        assert_eq!(*first, *second);
        // Sorted by score descending.
        for pair in first.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }
    }

    #[test]
    fn test_cancelled_before_start_fails() {
        let catalog = snapshot(&["firefox"]);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = engine().run(&catalog, "fire", QueryOptions::default(), &cancel);
        assert_eq!(result.unwrap_err(), QueryError::Cancelled);
    }

    #[test]
    fn test_no_matches_returns_shared_empty_list() {
        let catalog = snapshot(&["firefox"]);

        let results = engine()
            .run(&catalog, "zzzz", QueryOptions::default(), &CancellationToken::new())
            .unwrap();

        assert!(results.is_empty());
        assert!(Arc::ptr_eq(&results, &empty_results()));
    }

    #[test]
    fn test_hide_apps_path_empties_subtitles() {
        let catalog = snapshot(&["firefox"]);
        let options = QueryOptions {
            enable_description: false,
            hide_apps_path: true,
        };

        let results = engine()
            .run(&catalog, "fire", options, &CancellationToken::new())
            .unwrap();
        assert_eq!(results[0].subtitle, "");

        let shown = engine()
            .run(&catalog, "fire", QueryOptions::default(), &CancellationToken::new())
            .unwrap();
        assert_eq!(shown[0].subtitle, "/apps/firefox.exe");
    }

    #[test]
    fn test_scores_at_or_below_zero_are_dropped() {
        struct ZeroScorer;
        impl Scorer for ZeroScorer {
            fn score(&self, _query: &str, _label: &str) -> Option<ScoreMatch> {
                Some(ScoreMatch {
                    score: 0,
                    positions: Vec::new(),
                })
            }
        }

        let catalog = snapshot(&["firefox"]);
        let engine = QueryEngine::new(Arc::new(ZeroScorer));
        let results = engine
            .run(&catalog, "fire", QueryOptions::default(), &CancellationToken::new())
            .unwrap();
        assert!(results.is_empty());
    }
}
