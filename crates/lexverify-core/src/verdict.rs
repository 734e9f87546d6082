//! The verdict: the sole artifact handed to report rendering.

use serde::{Deserialize, Serialize};

use crate::finding::Finding;
use crate::provision::Claim;

/// One weighted component of the total score.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubScore {
    pub score: u32,
    pub max: u32,
    /// False when the source had no data and contributed 0 by default.
    pub available: bool,
}

impl SubScore {
    /// Clamp into `[0, max]`.
    pub fn new(score: u32, max: u32, available: bool) -> Self {
        Self {
            score: score.min(max),
            max,
            available,
        }
    }

    pub fn unavailable(max: u32) -> Self {
        Self {
            score: 0,
            max,
            available: false,
        }
    }

    /// Share of the maximum, rounded to a whole percent. 0 when `max` is 0.
    pub fn percent(&self) -> u32 {
        if self.max == 0 {
            return 0;
        }
        let (score, max) = (u64::from(self.score), u64::from(self.max));
        ((score * 100 + max / 2) / max) as u32
    }
}

/// Qualitative reading of one component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentStatus {
    Strong,
    Moderate,
    Weak,
}

impl ComponentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Strong => "strong",
            Self::Moderate => "moderate",
            Self::Weak => "weak",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentAssessment {
    pub component: String,
    pub score: u32,
    pub max: u32,
    pub percent: u32,
    pub status: ComponentStatus,
}

/// How far the verdict can be relied on. Lowered by unresolved ambiguities,
/// independently of the score category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceLevel {
    High,
    Moderate,
    Low,
}

impl ConfidenceLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Moderate => "moderate",
            Self::Low => "low",
        }
    }
}

/// Advice on what to do with the interpretation next.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recommendation {
    pub summary: String,
    /// Concrete next steps, verdict-specific ones first.
    pub steps: Vec<String>,
}

/// The four sub-scores, named after the evidence they weigh.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub text: SubScore,
    pub logic: SubScore,
    pub timeline: SubScore,
    pub precedent: SubScore,
}

impl ScoreBreakdown {
    pub fn total(&self) -> u32 {
        self.text.score + self.logic.score + self.timeline.score + self.precedent.score
    }

    pub fn max_total(&self) -> u32 {
        self.text.max + self.logic.max + self.timeline.max + self.precedent.max
    }

    /// `(name, sub-score)` in fixed display order.
    pub fn entries(&self) -> [(&'static str, &SubScore); 4] {
        [
            ("text", &self.text),
            ("logic", &self.logic),
            ("timeline", &self.timeline),
            ("precedent", &self.precedent),
        ]
    }
}

/// How a principle bears on a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stance {
    Supports,
    Contradicts,
    Neutral,
}

impl Stance {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Supports => "supports",
            Self::Contradicts => "contradicts",
            Self::Neutral => "neutral",
        }
    }
}

/// A principle's stance on the primary candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrincipleAssessment {
    pub principle: String,
    pub stance: Stance,
    pub rationale: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateRole {
    Primary,
    Alternative,
}

/// A structured reading of the law, with the evidence for and against it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterpretationCandidate {
    pub role: CandidateRole,
    pub claim: Claim,
    /// Principle that proposed this reading; `None` for the primary.
    pub proposed_by: Option<String>,
    pub rationale: String,
    pub supporting_principles: Vec<String>,
    pub contradicting_principles: Vec<String>,
    /// Check ids of findings that back this reading.
    pub supporting_findings: Vec<String>,
    /// Check ids of findings that cut against this reading.
    pub conflicting_findings: Vec<String>,
}

/// Two principles pulling in opposite directions.
///
/// `prevailing` is set only when the rule set carries an explicit
/// precedence rule for the pair. Otherwise the ambiguity is unresolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ambiguity {
    pub principles: [String; 2],
    pub description: String,
    pub prevailing: Option<String>,
}

impl Ambiguity {
    pub fn is_resolved(&self) -> bool {
        self.prevailing.is_some()
    }
}

/// Final structured result of one analysis run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
    pub ruleset_version: String,
    pub claim: Claim,
    pub scores: ScoreBreakdown,
    pub total: u32,
    pub max_total: u32,
    pub confidence: String,
    pub confidence_level: ConfidenceLevel,
    /// One entry per sub-score, in display order.
    pub breakdown: Vec<ComponentAssessment>,
    pub recommendation: Recommendation,
    /// Dangling references, then logic findings, then timeline findings.
    pub findings: Vec<Finding>,
    pub principles: Vec<PrincipleAssessment>,
    /// Primary first.
    pub candidates: Vec<InterpretationCandidate>,
    pub ambiguities: Vec<Ambiguity>,
}

impl Verdict {
    pub fn primary(&self) -> Option<&InterpretationCandidate> {
        self.candidates
            .iter()
            .find(|c| c.role == CandidateRole::Primary)
    }

    pub fn alternatives(&self) -> impl Iterator<Item = &InterpretationCandidate> {
        self.candidates
            .iter()
            .filter(|c| c.role == CandidateRole::Alternative)
    }

    pub fn unresolved_ambiguities(&self) -> impl Iterator<Item = &Ambiguity> {
        self.ambiguities.iter().filter(|a| !a.is_resolved())
    }
}
