//! Findings: the outcome of one structural, logic, or timeline check.

use serde::{Deserialize, Serialize};

/// Tri-state result of a check. Indeterminate is never folded into either
/// of the other two.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Satisfied,
    Violated,
    Indeterminate,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Satisfied => "satisfied",
            Self::Violated => "violated",
            Self::Indeterminate => "indeterminate",
        }
    }
}

/// Which component produced a finding and what it is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FindingKind {
    /// A cross-reference to an identifier outside the corpus.
    DanglingReference,
    /// One entry of the logic battery.
    LogicCheck,
    /// Two provisions disagree on the duration of the same obligation.
    DeadlineConflict,
    /// Two provisions disagree but one explicitly overrides the other.
    DeadlineOverride,
    /// An event is due before an obligation it must follow.
    SequencingConflict,
    /// The claimed obligation is implied by the timeline but never scheduled.
    ImplicitObligation,
    /// No timeline problem was detected.
    TimelineConsistency,
}

impl FindingKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DanglingReference => "dangling_reference",
            Self::LogicCheck => "logic_check",
            Self::DeadlineConflict => "deadline_conflict",
            Self::DeadlineOverride => "deadline_override",
            Self::SequencingConflict => "sequencing_conflict",
            Self::ImplicitObligation => "implicit_obligation",
            Self::TimelineConsistency => "timeline_consistency",
        }
    }
}

/// Immutable record of one check result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    /// Stable check identifier, e.g. `prohibition_intact`.
    pub check: String,
    pub kind: FindingKind,
    pub outcome: Outcome,
    pub rationale: String,
    /// Provision, clause, or edge citations backing the rationale.
    pub citations: Vec<String>,
}

impl Finding {
    pub fn new(
        check: impl Into<String>,
        kind: FindingKind,
        outcome: Outcome,
        rationale: impl Into<String>,
    ) -> Self {
        Self {
            check: check.into(),
            kind,
            outcome,
            rationale: rationale.into(),
            citations: Vec::new(),
        }
    }

    pub fn with_citations<I, S>(mut self, citations: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.citations.extend(citations.into_iter().map(Into::into));
        self
    }

    pub fn is_violated(&self) -> bool {
        self.outcome == Outcome::Violated
    }
}
