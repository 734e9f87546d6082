//! Aggregation of the four sub-scores into a verdict.

use std::collections::BTreeSet;

use lexverify_core::{
    Ambiguity, AssessmentThresholds, CandidateRole, Claim, ComponentAssessment, ComponentStatus,
    ConfidenceBand, ConfidenceLevel, Finding, InterpretationCandidate, Outcome, PrecedentRecord,
    Recommendation, RuleSet, ScoreBreakdown, ScoreMaxima, SubScore, TextSupportWeights, Verdict,
};
use tracing::{debug, info};

use crate::graph::ReferenceGraph;
use crate::reasoning::ReasoningReport;
use crate::text::mentions;

/// Category label for a total score.
///
/// Bands are scanned in descending order of their lower bound; the first
/// band whose bound the total reaches wins. A validated rule set always ends
/// with a band starting at 0, so every total maps to exactly one label.
pub fn confidence_category(bands: &[ConfidenceBand], total: u32) -> &str {
    bands
        .iter()
        .find(|b| total >= b.min)
        .or(bands.last())
        .map_or("", |b| b.label.as_str())
}

/// Strong, moderate or weak, by share of the component's maximum.
pub fn component_status(percent: u32, t: &AssessmentThresholds) -> ComponentStatus {
    if percent >= t.strong_component {
        ComponentStatus::Strong
    } else if percent >= t.moderate_component {
        ComponentStatus::Moderate
    } else {
        ComponentStatus::Weak
    }
}

/// Reliance level for a total. Any unresolved ambiguity costs one level and
/// rules out `High`.
pub fn confidence_level(total: u32, unresolved: usize, t: &AssessmentThresholds) -> ConfidenceLevel {
    let level = if total >= t.high_confidence {
        ConfidenceLevel::High
    } else if total >= t.moderate_confidence {
        ConfidenceLevel::Moderate
    } else {
        ConfidenceLevel::Low
    };
    if unresolved == 0 {
        return level;
    }
    match level {
        ConfidenceLevel::High => ConfidenceLevel::Moderate,
        ConfidenceLevel::Moderate | ConfidenceLevel::Low => ConfidenceLevel::Low,
    }
}

fn breakdown(scores: &ScoreBreakdown, t: &AssessmentThresholds) -> Vec<ComponentAssessment> {
    scores
        .entries()
        .into_iter()
        .map(|(name, s)| ComponentAssessment {
            component: name.to_string(),
            score: s.score,
            max: s.max,
            percent: s.percent(),
            status: component_status(s.percent(), t),
        })
        .collect()
}

const CONFIRM_STEPS: &[&str] = &[
    "Research case law on comparable facts",
    "Obtain a specialist opinion",
    "Review how the provisions are applied in practice",
];
const CONTEST_STEPS: &[&str] = &[
    "Research case law thoroughly",
    "Analyse the purpose of the modifying provisions",
    "Examine the alternative readings",
    "Prepare for counter-argument from the opposing provisions",
];
const RETHINK_STEPS: &[&str] = &[
    "Reconsider the legal strategy",
    "Examine alternative legal bases",
    "Concentrate on the stronger arguments",
];

/// Advice keyed to the total, preceded by steps drawn from this verdict's
/// own gaps: violated checks, missing precedent, alternatives, and
/// unresolved ambiguities.
fn recommend(
    total: u32,
    t: &AssessmentThresholds,
    scores: &ScoreBreakdown,
    findings: &[Finding],
    candidates: &[InterpretationCandidate],
    ambiguities: &[Ambiguity],
) -> Recommendation {
    let mut steps = Vec::new();

    let mut violated: Vec<&str> = Vec::new();
    for f in findings.iter().filter(|f| f.outcome == Outcome::Violated) {
        if !violated.contains(&f.check.as_str()) {
            violated.push(&f.check);
        }
    }
    if !violated.is_empty() {
        steps.push(format!("Answer the failed checks: {}", violated.join(", ")));
    }
    if !scores.precedent.available {
        steps.push("Supply precedent records; the precedent component scored 0 without data".to_string());
    }
    for c in candidates.iter().filter(|c| c.role == CandidateRole::Alternative) {
        let by = c.proposed_by.as_deref().unwrap_or("reasoning");
        steps.push(format!(
            "Weigh the alternative reading from {by}: {} requires {}",
            c.claim.subject, c.claim.obligation
        ));
    }
    for a in ambiguities.iter().filter(|a| !a.is_resolved()) {
        steps.push(format!(
            "Resolve the tension between {} and {}, or add a precedence rule",
            a.principles[0], a.principles[1]
        ));
    }

    let (summary, general) = if total >= t.high_confidence {
        (
            "The interpretation has a sound basis but should be confirmed before it is relied on.",
            CONFIRM_STEPS,
        )
    } else if total >= t.moderate_confidence {
        ("The interpretation is contestable.", CONTEST_STEPS)
    } else {
        (
            "The interpretation has significant weaknesses and is likely to be rejected.",
            RETHINK_STEPS,
        )
    };
    steps.extend(general.iter().map(|s| s.to_string()));

    Recommendation {
        summary: summary.to_string(),
        steps,
    }
}

pub struct FactChecker {
    version: String,
    maxima: ScoreMaxima,
    bands: Vec<ConfidenceBand>,
    assessment: AssessmentThresholds,
    weights: TextSupportWeights,
    depth: usize,
}

impl FactChecker {
    pub fn from_ruleset(ruleset: &RuleSet) -> Self {
        Self {
            version: ruleset.version.clone(),
            maxima: ruleset.maxima,
            bands: ruleset.confidence_bands.clone(),
            assessment: ruleset.assessment,
            weights: ruleset.text_support,
            depth: ruleset.traversal_depth,
        }
    }

    /// Weighted count of clauses near the subject that state the claim
    /// verbatim.
    ///
    /// A clause stating the obligation earns `obligation_clause` points,
    /// multiplied when it belongs to the subject itself. A clause stating any
    /// condition earns `condition_clause` points. Each clause is counted at
    /// most once per category.
    pub fn text_support(&self, graph: &ReferenceGraph<'_>, claim: &Claim) -> SubScore {
        let Some(subject) = graph.index_of(&claim.subject) else {
            return SubScore::unavailable(self.maxima.text);
        };
        let w = self.weights;

        let mut obligation_clauses = BTreeSet::new();
        let mut condition_clauses = BTreeSet::new();
        let mut points = 0u32;
        for n in graph.neighbourhood(subject, self.depth) {
            let p = graph.node(n);
            for (c, text) in p.clauses() {
                if mentions(text, &claim.obligation) && obligation_clauses.insert(p.cite(c)) {
                    points = points.saturating_add(if n == subject {
                        w.obligation_clause.saturating_mul(w.subject_multiplier)
                    } else {
                        w.obligation_clause
                    });
                }
                if claim.conditions.iter().any(|cond| mentions(text, cond))
                    && condition_clauses.insert(p.cite(c))
                {
                    points = points.saturating_add(w.condition_clause);
                }
            }
        }
        debug!(
            obligation_clauses = obligation_clauses.len(),
            condition_clauses = condition_clauses.len(),
            points,
            "text support"
        );
        SubScore::new(points, self.maxima.text, true)
    }

    /// Supporting weight minus opposing weight, rounded and clamped.
    ///
    /// Absent or empty precedent data scores 0 and is marked unavailable.
    pub fn precedent_score(&self, records: Option<&[PrecedentRecord]>) -> SubScore {
        let max = self.maxima.precedent;
        let Some(records) = records.filter(|r| !r.is_empty()) else {
            return SubScore::unavailable(max);
        };
        let net: f64 = records
            .iter()
            .filter(|r| r.weight.is_finite())
            .map(|r| {
                let w = r.weight.max(0.0);
                if r.supports { w } else { -w }
            })
            .sum();
        let score = net.round().clamp(0.0, f64::from(max)) as u32;
        debug!(records = records.len(), net, score, "precedent");
        SubScore::new(score, max, true)
    }

    /// Build the verdict. Unavailable sources contribute 0 and stay visible.
    pub fn verdict(
        &self,
        claim: &Claim,
        scores: ScoreBreakdown,
        findings: Vec<Finding>,
        reasoning: ReasoningReport,
    ) -> Verdict {
        let total = scores.total();
        let max_total = scores.max_total();
        let confidence = confidence_category(&self.bands, total).to_string();
        let unresolved = reasoning.ambiguities.iter().filter(|a| !a.is_resolved()).count();
        let confidence_level = confidence_level(total, unresolved, &self.assessment);
        let recommendation = recommend(
            total,
            &self.assessment,
            &scores,
            &findings,
            &reasoning.candidates,
            &reasoning.ambiguities,
        );
        info!(
            total,
            max_total,
            confidence = %confidence,
            level = confidence_level.as_str(),
            "verdict"
        );

        Verdict {
            ruleset_version: self.version.clone(),
            claim: claim.clone(),
            breakdown: breakdown(&scores, &self.assessment),
            scores,
            total,
            max_total,
            confidence,
            confidence_level,
            recommendation,
            findings,
            principles: reasoning.assessments,
            candidates: reasoning.candidates,
            ambiguities: reasoning.ambiguities,
        }
    }
}
