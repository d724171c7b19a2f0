//! Fuzzy-match seam.
//!
//! Ranking quality is owned by the embedding host; the engine treats any
//! [`Scorer`] as opaque.

/// A successful match: a score plus the matched character positions within
/// the scored label, for highlighting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoreMatch {
    pub score: i32,
    pub positions: Vec<usize>,
}

/// Maps a query and a label to a score with highlight positions.
/// `None` signals a non-match and is never ranked.
pub trait Scorer: Send + Sync {
    fn score(&self, query: &str, label: &str) -> Option<ScoreMatch>;
}

/// Case-insensitive subsequence scorer used by the CLI when the host does
/// not supply one. Tighter and earlier matches in shorter labels rank
/// higher.
#[derive(Debug, Default)]
pub struct SubsequenceScorer;

impl Scorer for SubsequenceScorer {
    fn score(&self, query: &str, label: &str) -> Option<ScoreMatch> {
        if query.is_empty() {
            return None;
        }

        let label_chars: Vec<char> = label.chars().collect();
        let mut positions = Vec::new();
        let mut start = 0usize;

        for query_char in query.chars() {
            let query_char = query_char.to_lowercase().next()?;
            let found = label_chars[start.min(label_chars.len())..]
                .iter()
                .position(|c| c.to_lowercase().next() == Some(query_char))?;
            positions.push(start + found);
            start += found + 1;
        }

        let first = positions.first().copied().unwrap_or(0);
        let last = positions.last().copied().unwrap_or(0);
        let spread = (last - first) as i32;
        let slack = (label_chars.len() as i32 - positions.len() as i32) / 4;
        let score = 100 - spread - first as i32 - slack;

        Some(ScoreMatch {
            score: score.max(1),
            positions,
        })
    }
}
