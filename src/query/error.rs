use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum QueryError {
    /// The caller cancelled mid-fan-out; no partial list is surfaced.
    #[error("query was cancelled")]
    Cancelled,
}
