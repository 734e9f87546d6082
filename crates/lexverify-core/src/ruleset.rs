//! Versioned, declarative rule-set configuration.
//!
//! The check battery, principle ordering, precedence rules, score maxima,
//! and confidence thresholds are data. The engine interprets a `RuleSet`
//! handed to it at construction; several versions can coexist.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// One entry of the logic battery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckEntry {
    pub id: String,
    #[serde(default = "default_weight")]
    pub weight: f64,
}

fn default_weight() -> f64 {
    1.0
}

/// Maximum of each sub-score. Must sum to 100.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreMaxima {
    pub text: u32,
    pub logic: u32,
    pub timeline: u32,
    pub precedent: u32,
}

impl ScoreMaxima {
    pub fn total(&self) -> u32 {
        self.text + self.logic + self.timeline + self.precedent
    }
}

/// Lower bound (inclusive) of a confidence category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfidenceBand {
    pub min: u32,
    pub label: String,
}

/// How indeterminate logic findings count toward the logic sub-score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndeterminatePolicy {
    /// Counts as half a satisfied check.
    HalfCredit,
    /// Counts as a failed check.
    NoCredit,
    /// Removed from both numerator and denominator.
    Exclude,
}

/// Point deductions applied by the timeline analyzer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelinePenalties {
    pub direct_conflict: u32,
    pub sequencing_conflict: u32,
}

/// Weights for the verbatim text-support count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextSupportWeights {
    /// Per clause stating the claimed obligation.
    pub obligation_clause: u32,
    /// Multiplier when that clause belongs to the claim's subject.
    pub subject_multiplier: u32,
    /// Per clause stating one of the claimed conditions.
    pub condition_clause: u32,
}

/// Cut-offs for the qualitative reading of a verdict.
///
/// Component cut-offs are percentages of that component's maximum; the
/// confidence cut-offs apply to the total.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssessmentThresholds {
    pub strong_component: u32,
    pub moderate_component: u32,
    pub high_confidence: u32,
    pub moderate_confidence: u32,
}

impl Default for AssessmentThresholds {
    fn default() -> Self {
        Self {
            strong_component: 75,
            moderate_component: 50,
            high_confidence: 70,
            moderate_confidence: 50,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleSet {
    pub version: String,
    pub checks: Vec<CheckEntry>,
    /// Principle ids in evaluation order.
    pub principles: Vec<String>,
    /// `[winner, loser]` tie-breaking rules between principles.
    #[serde(default)]
    pub precedence: Vec<[String; 2]>,
    pub maxima: ScoreMaxima,
    /// Descending by `min`; the last band must start at 0.
    pub confidence_bands: Vec<ConfidenceBand>,
    pub indeterminate_policy: IndeterminatePolicy,
    pub timeline: TimelinePenalties,
    pub text_support: TextSupportWeights,
    /// Depth bound for every graph traversal.
    pub traversal_depth: usize,
    #[serde(default)]
    pub assessment: AssessmentThresholds,
}

impl Default for RuleSet {
    fn default() -> Self {
        let checks = [
            "prohibition_intact",
            "amendment_consistency",
            "modification_authority",
            "obligation_located",
            "trigger_implies_obligation",
            "subject_conflict_free",
        ];
        let principles = [
            "no_modification_without_authority",
            "specific_overrides_general",
            "silence_is_not_permission",
            "plain_meaning",
        ];
        Self {
            version: "v1".to_string(),
            checks: checks
                .iter()
                .map(|id| CheckEntry {
                    id: id.to_string(),
                    weight: 1.0,
                })
                .collect(),
            principles: principles.iter().map(|p| p.to_string()).collect(),
            precedence: Vec::new(),
            maxima: ScoreMaxima {
                text: 40,
                logic: 30,
                timeline: 20,
                precedent: 10,
            },
            confidence_bands: vec![
                band(80, "Strongly Supported"),
                band(60, "Partially Supported"),
                band(40, "Weakly Supported"),
                band(0, "Not Supported"),
            ],
            indeterminate_policy: IndeterminatePolicy::HalfCredit,
            timeline: TimelinePenalties {
                direct_conflict: 4,
                sequencing_conflict: 2,
            },
            text_support: TextSupportWeights {
                obligation_clause: 10,
                subject_multiplier: 2,
                condition_clause: 5,
            },
            traversal_depth: 8,
            assessment: AssessmentThresholds::default(),
        }
    }
}

fn band(min: u32, label: &str) -> ConfidenceBand {
    ConfidenceBand {
        min,
        label: label.to_string(),
    }
}

impl RuleSet {
    /// Parse and validate a rule set from JSON.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let ruleset: Self = serde_json::from_str(json)?;
        ruleset.validate()?;
        tracing::debug!(version = %ruleset.version, checks = ruleset.checks.len(), "loaded rule set");
        Ok(ruleset)
    }

    /// Read, parse, and validate a rule set file.
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    pub fn to_json_pretty(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Structural validation. Does not know which check or principle ids the
    /// engine implements; that is checked when an engine is built.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.version.trim().is_empty() {
            return Err(ConfigError::EmptyVersion);
        }
        if self.checks.is_empty() {
            return Err(ConfigError::EmptyBattery);
        }

        let mut seen = HashSet::new();
        for entry in &self.checks {
            if !seen.insert(entry.id.as_str()) {
                return Err(ConfigError::DuplicateCheck(entry.id.clone()));
            }
            if !entry.weight.is_finite() || entry.weight <= 0.0 {
                return Err(ConfigError::InvalidWeight(entry.id.clone()));
            }
        }

        let mut principles = HashSet::new();
        for p in &self.principles {
            if !principles.insert(p.as_str()) {
                return Err(ConfigError::DuplicatePrinciple(p.clone()));
            }
        }
        for [winner, loser] in &self.precedence {
            for p in [winner, loser] {
                if !principles.contains(p.as_str()) {
                    return Err(ConfigError::UnknownPrecedencePrinciple(p.clone()));
                }
            }
            if winner == loser {
                return Err(ConfigError::SelfPrecedence(winner.clone()));
            }
        }

        let max_total = self.maxima.total();
        if max_total != 100 {
            return Err(ConfigError::MaximaTotal(max_total));
        }

        self.validate_bands(max_total)?;
        self.validate_assessment(max_total)?;

        if self.traversal_depth == 0 {
            return Err(ConfigError::ZeroDepth);
        }
        Ok(())
    }

    /// The bands must partition `[0, max_total]`: strictly descending lower
    /// bounds, ending at exactly 0.
    fn validate_bands(&self, max_total: u32) -> Result<(), ConfigError> {
        let bands = &self.confidence_bands;
        let Some(last) = bands.last() else {
            return Err(ConfigError::Bands("no confidence bands".into()));
        };
        if last.min != 0 {
            return Err(ConfigError::Bands(format!(
                "lowest band '{}' starts at {}, not 0",
                last.label, last.min
            )));
        }
        for pair in bands.windows(2) {
            if pair[0].min <= pair[1].min {
                return Err(ConfigError::Bands(format!(
                    "band '{}' ({}) must start above '{}' ({})",
                    pair[0].label, pair[0].min, pair[1].label, pair[1].min
                )));
            }
        }
        if let Some(b) = bands.iter().find(|b| b.min > max_total) {
            return Err(ConfigError::Bands(format!(
                "band '{}' starts above the maximum total {max_total}",
                b.label
            )));
        }
        if let Some(b) = bands.iter().find(|b| b.label.trim().is_empty()) {
            return Err(ConfigError::Bands(format!("band at {} has no label", b.min)));
        }
        Ok(())
    }

    fn validate_assessment(&self, max_total: u32) -> Result<(), ConfigError> {
        let a = self.assessment;
        if a.moderate_component > a.strong_component || a.strong_component > 100 {
            return Err(ConfigError::Assessment(format!(
                "component cut-offs {} / {} must rise to at most 100",
                a.moderate_component, a.strong_component
            )));
        }
        if a.moderate_confidence > a.high_confidence || a.high_confidence > max_total {
            return Err(ConfigError::Assessment(format!(
                "confidence cut-offs {} / {} must rise to at most {max_total}",
                a.moderate_confidence, a.high_confidence
            )));
        }
        Ok(())
    }

    /// Whether an explicit rule ranks `a` above `b`.
    pub fn prevails(&self, a: &str, b: &str) -> bool {
        self.precedence
            .iter()
            .any(|[winner, loser]| winner == a && loser == b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_valid() {
        RuleSet::default().validate().unwrap();
    }

    #[test]
    fn shipped_v1_table_matches_default() {
        let shipped = include_str!("../../../rulesets/v1.json");
        let parsed = RuleSet::from_json_str(shipped).unwrap();
        assert_eq!(parsed, RuleSet::default());
    }

    #[test]
    fn json_round_trip() {
        let rs = RuleSet::default();
        let json = rs.to_json_pretty().unwrap();
        assert_eq!(RuleSet::from_json_str(&json).unwrap(), rs);
    }

    #[test]
    fn rejects_duplicate_check() {
        let mut rs = RuleSet::default();
        rs.checks.push(rs.checks[0].clone());
        assert!(matches!(rs.validate(), Err(ConfigError::DuplicateCheck(_))));
    }

    #[test]
    fn rejects_zero_weight() {
        let mut rs = RuleSet::default();
        rs.checks[1].weight = 0.0;
        assert!(matches!(rs.validate(), Err(ConfigError::InvalidWeight(_))));
    }

    #[test]
    fn rejects_gap_at_zero() {
        let mut rs = RuleSet::default();
        rs.confidence_bands.last_mut().unwrap().min = 10;
        assert!(matches!(rs.validate(), Err(ConfigError::Bands(_))));
    }

    #[test]
    fn rejects_unordered_bands() {
        let mut rs = RuleSet::default();
        rs.confidence_bands.swap(0, 1);
        assert!(matches!(rs.validate(), Err(ConfigError::Bands(_))));
    }

    #[test]
    fn rejects_maxima_not_summing_to_100() {
        let mut rs = RuleSet::default();
        rs.maxima.precedent = 20;
        assert!(matches!(rs.validate(), Err(ConfigError::MaximaTotal(110))));
    }

    #[test]
    fn assessment_cut_offs_must_ascend() {
        let mut rs = RuleSet::default();
        rs.assessment.moderate_component = 80;
        assert!(matches!(rs.validate(), Err(ConfigError::Assessment(_))));

        let mut rs = RuleSet::default();
        rs.assessment.high_confidence = 120;
        assert!(matches!(rs.validate(), Err(ConfigError::Assessment(_))));
    }

    #[test]
    fn assessment_defaults_when_omitted() {
        let mut value = serde_json::to_value(RuleSet::default()).unwrap();
        value.as_object_mut().unwrap().remove("assessment");
        let rs: RuleSet = serde_json::from_value(value).unwrap();
        assert_eq!(rs.assessment, AssessmentThresholds::default());
    }

    #[test]
    fn precedence_must_name_known_principles() {
        let mut rs = RuleSet::default();
        rs.precedence
            .push(["plain_meaning".into(), "purposive".into()]);
        assert!(matches!(
            rs.validate(),
            Err(ConfigError::UnknownPrecedencePrinciple(_))
        ));
    }

    #[test]
    fn prevails_is_directional() {
        let mut rs = RuleSet::default();
        rs.precedence.push([
            "specific_overrides_general".into(),
            "plain_meaning".into(),
        ]);
        rs.validate().unwrap();
        assert!(rs.prevails("specific_overrides_general", "plain_meaning"));
        assert!(!rs.prevails("plain_meaning", "specific_overrides_general"));
    }

    #[test]
    fn policy_serialises_snake_case() {
        let json = serde_json::to_string(&IndeterminatePolicy::HalfCredit).unwrap();
        assert_eq!(json, "\"half_credit\"");
    }
}
