use thiserror::Error;

use crate::results::Field;

/// Errors raised by the selection and aggregation pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AnalysisError {
    #[error("cannot summarize an empty result table")]
    EmptyInput,
    #[error("unknown field `{0}` (expected CacheSize, LineSize, Associativity or Policy)")]
    UnknownField(String),
    #[error("constraint `{0}` is not of the form Field=value")]
    InvalidConstraint(String),
    #[error("value `{value}` is not valid for {field}")]
    InvalidValue { field: Field, value: String },
}

/// Errors raised while building a simulated cache configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("unknown associativity `{0}` (expected direct, fully or <N>way)")]
    UnknownAssociativity(String),
    #[error("unknown replacement policy `{0}` (expected lru or fifo)")]
    UnknownPolicy(String),
    #[error("invalid cache geometry: {0}")]
    InvalidGeometry(String),
}
