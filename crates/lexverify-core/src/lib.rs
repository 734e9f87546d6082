//! Core types for statutory-interpretation verification: provisions,
//! findings, verdicts, and the versioned rule set the engine interprets.

mod error;
pub mod finding;
pub mod provision;
pub mod ruleset;
pub mod sort_key;
pub mod verdict;

pub use error::ConfigError;
pub use finding::{Finding, FindingKind, Outcome};
pub use provision::{Claim, Deadline, DurationUnit, PrecedentRecord, Provision, ProvisionKind};
pub use ruleset::{
    AssessmentThresholds, CheckEntry, ConfidenceBand, IndeterminatePolicy, RuleSet, ScoreMaxima, TextSupportWeights,
    TimelinePenalties,
};
pub use sort_key::provision_sort_key;
pub use verdict::{
    Ambiguity, CandidateRole, ComponentAssessment, ComponentStatus, ConfidenceLevel,
    InterpretationCandidate, PrincipleAssessment, Recommendation, ScoreBreakdown, Stance,
    SubScore, Verdict,
};
