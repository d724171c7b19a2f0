//! The query path: scorer seam, ranked-result cache and the scoring engine.

pub mod cache;
pub mod engine;
pub mod error;
pub mod scorer;

pub use cache::QueryCache;
pub use engine::{QueryEngine, QueryOptions, RankedResult, empty_results};
pub use error::QueryError;
pub use scorer::{ScoreMatch, Scorer, SubsequenceScorer};
