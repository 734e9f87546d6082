use lexverify_core::ConfigError;
use thiserror::Error;

/// Conditions that abort a run before any verdict exists.
///
/// Everything else (dangling references, indeterminate checks, ambiguous
/// interpretations) is reported inside the verdict instead.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("malformed provision {provision}: missing required field '{field}'")]
    MalformedProvision {
        provision: String,
        field: &'static str,
    },

    #[error("rule set {version} names unknown check: {id}")]
    UnknownCheck { version: String, id: String },

    #[error("rule set {version} names unknown principle: {id}")]
    UnknownPrinciple { version: String, id: String },

    #[error("invalid rule set: {0}")]
    Config(#[from] ConfigError),
}
