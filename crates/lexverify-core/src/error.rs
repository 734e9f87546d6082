use std::path::PathBuf;

use thiserror::Error;

/// A rule set that cannot be interpreted.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("rule set version is empty")]
    EmptyVersion,

    #[error("rule set has no checks")]
    EmptyBattery,

    #[error("check listed twice: {0}")]
    DuplicateCheck(String),

    #[error("check {0} must have a positive finite weight")]
    InvalidWeight(String),

    #[error("principle listed twice: {0}")]
    DuplicatePrinciple(String),

    #[error("precedence rule names unlisted principle: {0}")]
    UnknownPrecedencePrinciple(String),

    #[error("precedence rule ranks {0} over itself")]
    SelfPrecedence(String),

    #[error("sub-score maxima sum to {0}, expected 100")]
    MaximaTotal(u32),

    #[error("invalid confidence bands: {0}")]
    Bands(String),

    #[error("invalid assessment thresholds: {0}")]
    Assessment(String),

    #[error("traversal depth must be at least 1")]
    ZeroDepth,

    #[error("rule set file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("rule set JSON: {0}")]
    Json(#[from] serde_json::Error),
}
