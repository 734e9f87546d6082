//! Interpretive reasoning over the findings of the logic and timeline stages.
//!
//! Principles run in rule-set order. Each takes a stance on the primary
//! candidate and may propose a materially different reading. When two
//! principles disagree the conflict is reported as an ambiguity; it is
//! resolved only by an explicit precedence rule in the rule set.

use lexverify_core::{
    Ambiguity, CandidateRole, Claim, Finding, FindingKind, InterpretationCandidate, Outcome,
    PrincipleAssessment, Provision, ProvisionKind, RuleSet, Stance,
};
use tracing::{debug, info, warn};

use crate::EngineError;
use crate::graph::{NodeIndex, ReferenceGraph};
use crate::logic::ENABLING_RELATIONS;
use crate::text::{mentions, same_label};

/// Read-only inputs shared by every principle.
pub struct PrincipleContext<'g, 'a> {
    pub graph: &'g ReferenceGraph<'a>,
    pub claim: &'g Claim,
    /// Logic findings followed by timeline findings.
    pub findings: &'g [Finding],
    pub depth: usize,
}

impl PrincipleContext<'_, '_> {
    fn subject(&self) -> Option<NodeIndex> {
        self.graph.index_of(&self.claim.subject)
    }

    fn scope(&self, subject: NodeIndex) -> Vec<NodeIndex> {
        self.graph.neighbourhood(subject, self.depth)
    }

    fn outcome_of(&self, check: &str) -> Option<Outcome> {
        self.findings
            .iter()
            .find(|f| f.check == check)
            .map(|f| f.outcome)
    }

    fn has_kind(&self, kind: FindingKind) -> bool {
        self.findings.iter().any(|f| f.kind == kind)
    }

    fn states_obligation(&self, node: NodeIndex) -> bool {
        states(self.graph.node(node), &self.claim.obligation)
    }

    fn relocated(&self, subject: &str) -> Claim {
        Claim {
            subject: subject.to_string(),
            ..self.claim.clone()
        }
    }
}

/// Whether a provision states `obligation`, in clause text or as a
/// scheduled deadline.
fn states(p: &Provision, obligation: &str) -> bool {
    p.clauses().any(|(_, text)| mentions(text, obligation))
        || p.deadlines.iter().any(|d| same_label(&d.obligation, obligation))
}

/// What one principle concluded.
pub struct PrincipleOutcome {
    pub stance: Stance,
    pub rationale: String,
    /// A materially different reading, when the principle suggests one.
    pub alternative: Option<(Claim, String)>,
    /// Check ids the principle relied on.
    pub evidence: Vec<&'static str>,
}

impl PrincipleOutcome {
    fn neutral(rationale: impl Into<String>) -> Self {
        Self {
            stance: Stance::Neutral,
            rationale: rationale.into(),
            alternative: None,
            evidence: Vec::new(),
        }
    }

    fn supports(rationale: impl Into<String>) -> Self {
        Self {
            stance: Stance::Supports,
            ..Self::neutral(rationale)
        }
    }

    fn contradicts(rationale: impl Into<String>) -> Self {
        Self {
            stance: Stance::Contradicts,
            ..Self::neutral(rationale)
        }
    }

    fn proposing(mut self, claim: Claim, rationale: impl Into<String>) -> Self {
        self.alternative = Some((claim, rationale.into()));
        self
    }

    fn citing(mut self, evidence: &[&'static str]) -> Self {
        self.evidence.extend_from_slice(evidence);
        self
    }
}

pub type PrincipleFn = fn(&PrincipleContext<'_, '_>) -> PrincipleOutcome;

pub struct RegisteredPrinciple {
    pub id: &'static str,
    pub description: &'static str,
    pub apply: PrincipleFn,
}

pub const REGISTRY: &[RegisteredPrinciple] = &[
    RegisteredPrinciple {
        id: "no_modification_without_authority",
        description: "A modification binds only if enabled and not barred by a restriction",
        apply: no_modification_without_authority,
    },
    RegisteredPrinciple {
        id: "specific_overrides_general",
        description: "A regulation modifying an article governs where both speak",
        apply: specific_overrides_general,
    },
    RegisteredPrinciple {
        id: "silence_is_not_permission",
        description: "An obligation or its trigger must be stated, not inferred",
        apply: silence_is_not_permission,
    },
    RegisteredPrinciple {
        id: "plain_meaning",
        description: "The subject's own words carry the claimed obligation",
        apply: plain_meaning,
    },
];

pub fn lookup(id: &str) -> Option<&'static RegisteredPrinciple> {
    REGISTRY.iter().find(|p| p.id == id)
}

#[derive(Debug, Clone)]
pub struct ReasoningReport {
    /// In principle order.
    pub assessments: Vec<PrincipleAssessment>,
    /// Primary first, then alternatives in the order proposed.
    pub candidates: Vec<InterpretationCandidate>,
    pub ambiguities: Vec<Ambiguity>,
}

pub struct ReasoningEngine {
    principles: Vec<&'static RegisteredPrinciple>,
    ruleset: RuleSet,
}

impl ReasoningEngine {
    pub fn from_ruleset(ruleset: &RuleSet) -> Result<Self, EngineError> {
        let principles = ruleset
            .principles
            .iter()
            .map(|id| {
                lookup(id).ok_or_else(|| EngineError::UnknownPrinciple {
                    version: ruleset.version.clone(),
                    id: id.clone(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            principles,
            ruleset: ruleset.clone(),
        })
    }

    pub fn reason(
        &self,
        graph: &ReferenceGraph<'_>,
        claim: &Claim,
        findings: &[Finding],
    ) -> ReasoningReport {
        let ctx = PrincipleContext {
            graph,
            claim,
            findings,
            depth: self.ruleset.traversal_depth,
        };

        let outcomes: Vec<(&'static str, PrincipleOutcome)> = self
            .principles
            .iter()
            .map(|p| {
                let outcome = (p.apply)(&ctx);
                debug!(principle = p.id, stance = outcome.stance.as_str(), "principle");
                (p.id, outcome)
            })
            .collect();

        let ids_with = |stance: Stance| -> Vec<String> {
            outcomes
                .iter()
                .filter(|(_, o)| o.stance == stance)
                .map(|(id, _)| id.to_string())
                .collect()
        };

        let mut candidates = vec![InterpretationCandidate {
            role: CandidateRole::Primary,
            claim: claim.clone(),
            proposed_by: None,
            rationale: "interpretation under test".to_string(),
            supporting_principles: ids_with(Stance::Supports),
            contradicting_principles: ids_with(Stance::Contradicts),
            supporting_findings: checks_with(findings, Outcome::Satisfied),
            conflicting_findings: checks_with(findings, Outcome::Violated),
        }];

        for (id, outcome) in &outcomes {
            let Some((alt, rationale)) = &outcome.alternative else {
                continue;
            };
            if alt == claim {
                continue;
            }
            if let Some(existing) = candidates.iter_mut().find(|c| &c.claim == alt) {
                existing.supporting_principles.push(id.to_string());
                continue;
            }
            candidates.push(InterpretationCandidate {
                role: CandidateRole::Alternative,
                claim: alt.clone(),
                proposed_by: Some(id.to_string()),
                rationale: rationale.clone(),
                supporting_principles: vec![id.to_string()],
                contradicting_principles: Vec::new(),
                supporting_findings: outcome.evidence.iter().map(|e| e.to_string()).collect(),
                conflicting_findings: Vec::new(),
            });
        }

        let ambiguities = self.ambiguities(&outcomes);

        let assessments = outcomes
            .into_iter()
            .map(|(id, o)| PrincipleAssessment {
                principle: id.to_string(),
                stance: o.stance,
                rationale: o.rationale,
            })
            .collect::<Vec<_>>();

        info!(
            principles = assessments.len(),
            alternatives = candidates.len() - 1,
            ambiguities = ambiguities.len(),
            "reasoning complete"
        );

        ReasoningReport {
            assessments,
            candidates,
            ambiguities,
        }
    }

    /// One entry per pair of principles that disagree, in principle order.
    fn ambiguities(&self, outcomes: &[(&'static str, PrincipleOutcome)]) -> Vec<Ambiguity> {
        let mut out = Vec::new();
        for (i, (a, oa)) in outcomes.iter().enumerate() {
            for (b, ob) in &outcomes[i + 1..] {
                let (pro, con) = match (oa.stance, ob.stance) {
                    (Stance::Supports, Stance::Contradicts) => (a, b),
                    (Stance::Contradicts, Stance::Supports) => (b, a),
                    _ => continue,
                };
                let prevailing = if self.ruleset.prevails(a, b) {
                    Some(a.to_string())
                } else if self.ruleset.prevails(b, a) {
                    Some(b.to_string())
                } else {
                    warn!(principles = %format!("{a}, {b}"), "ambiguous interpretation");
                    None
                };
                out.push(Ambiguity {
                    principles: [a.to_string(), b.to_string()],
                    description: format!("{pro} supports the claim but {con} contradicts it"),
                    prevailing,
                });
            }
        }
        out
    }
}

/// Distinct check ids with the given outcome, in finding order.
fn checks_with(findings: &[Finding], outcome: Outcome) -> Vec<String> {
    let mut ids: Vec<String> = Vec::new();
    for f in findings.iter().filter(|f| f.outcome == outcome) {
        if !ids.contains(&f.check) {
            ids.push(f.check.clone());
        }
    }
    ids
}

// ── Principles ──

fn no_modification_without_authority(ctx: &PrincipleContext<'_, '_>) -> PrincipleOutcome {
    let Some(subject) = ctx.subject() else {
        return PrincipleOutcome::neutral("subject not in corpus");
    };
    let g = ctx.graph;
    let scope = ctx.scope(subject);

    let modifications: Vec<_> = g
        .edges()
        .iter()
        .filter(|e| e.kind.is_modifying() && scope.contains(&e.source) && scope.contains(&e.target))
        .collect();
    if modifications.is_empty() {
        return PrincipleOutcome::neutral("no modification bears on the subject");
    }

    // An invalid modification either lacks an enabling article or lands on a
    // restricted clause.
    let invalid = modifications.iter().find(|e| {
        let target = g.node(e.target);
        let barred = match &e.target_clause {
            Some(c) => target.restrictions.contains(c),
            None => !target.restrictions.is_empty(),
        };
        let enabled = g.kind_of(e.source) == ProvisionKind::Article
            || g.edges_into(e.source).any(|i| {
                ENABLING_RELATIONS.contains(&i.kind) && g.kind_of(i.source) == ProvisionKind::Article
            });
        barred || !enabled
    });

    match invalid {
        Some(edge) => {
            let (source, target) = (g.node(edge.source), g.node(edge.target));
            if ctx.states_obligation(edge.source) {
                PrincipleOutcome::contradicts(format!(
                    "the claim rests on {}, which modifies {} without authority",
                    source.id, target.id
                ))
                .proposing(
                    ctx.relocated(&target.id),
                    format!("{} read without the modification made by {}", target.id, source.id),
                )
                .citing(&["prohibition_intact", "modification_authority"])
            } else {
                PrincipleOutcome::supports(format!(
                    "the claim does not rely on the unauthorised modification of {} by {}",
                    target.id, source.id
                ))
                .citing(&["prohibition_intact", "modification_authority"])
            }
        }
        None => {
            let sources: Vec<&str> = modifications
                .iter()
                .filter(|e| ctx.states_obligation(e.source))
                .map(|e| g.node(e.source).id.as_str())
                .collect();
            if sources.is_empty() {
                PrincipleOutcome::neutral("every modification is authorised and none states the obligation")
            } else {
                PrincipleOutcome::supports(format!(
                    "the obligation rests on an authorised modification by {}",
                    sources.join(", ")
                ))
                .citing(&["modification_authority"])
            }
        }
    }
}

fn specific_overrides_general(ctx: &PrincipleContext<'_, '_>) -> PrincipleOutcome {
    let Some(subject) = ctx.subject() else {
        return PrincipleOutcome::neutral("subject not in corpus");
    };
    let g = ctx.graph;
    let scope = ctx.scope(subject);

    let overrides: Vec<(NodeIndex, NodeIndex)> = g
        .edges()
        .iter()
        .filter(|e| {
            e.kind.is_modifying()
                && g.kind_of(e.source) == ProvisionKind::Regulation
                && g.kind_of(e.target) == ProvisionKind::Article
                && scope.contains(&e.source)
                && scope.contains(&e.target)
                && ctx.states_obligation(e.source)
        })
        .map(|e| (e.source, e.target))
        .collect();

    if overrides.is_empty() {
        return PrincipleOutcome::neutral("no specific provision speaks to the obligation");
    }
    let evidence: &[&'static str] = if ctx.has_kind(FindingKind::DeadlineOverride) {
        &["deadline_override"]
    } else {
        &[]
    };

    if let Some(&(_, general)) = overrides.iter().find(|(s, _)| *s == subject) {
        return PrincipleOutcome::supports(format!(
            "{} is the specific provision and governs {}",
            ctx.claim.subject,
            g.node(general).id
        ))
        .citing(evidence);
    }
    if let Some(&(specific, _)) = overrides.iter().find(|(_, t)| *t == subject) {
        let specific = &g.node(specific).id;
        return PrincipleOutcome::contradicts(format!(
            "{specific} modifies {} and governs '{}'",
            ctx.claim.subject, ctx.claim.obligation
        ))
        .proposing(
            ctx.relocated(specific),
            format!("'{}' as governed by {specific}", ctx.claim.obligation),
        )
        .citing(evidence);
    }
    PrincipleOutcome::neutral("the specific provision does not bear on the subject directly")
}

fn silence_is_not_permission(ctx: &PrincipleContext<'_, '_>) -> PrincipleOutcome {
    let Some(subject) = ctx.subject() else {
        return PrincipleOutcome::neutral("subject not in corpus");
    };
    let claim = ctx.claim;
    let stated = ctx.scope(subject).into_iter().any(|n| ctx.states_obligation(n));

    if !stated || ctx.has_kind(FindingKind::ImplicitObligation) {
        let denial = Claim {
            obligation: format!("no express obligation to {}", claim.obligation),
            ..claim.clone()
        };
        return PrincipleOutcome::contradicts(format!(
            "no provision expressly imposes '{}'",
            claim.obligation
        ))
        .proposing(denial, "the law is silent, so the obligation does not arise")
        .citing(&["obligation_located", "implicit_obligation"]);
    }

    if ctx.outcome_of("trigger_implies_obligation") == Some(Outcome::Violated) {
        let unconditional = Claim {
            conditions: Vec::new(),
            ..claim.clone()
        };
        return PrincipleOutcome::contradicts(
            "the conditions are not expressly tied to the obligation",
        )
        .proposing(unconditional, "the obligation stands on its own terms, not on the asserted conditions")
        .citing(&["trigger_implies_obligation"]);
    }

    PrincipleOutcome::supports(format!("'{}' is expressly stated", claim.obligation))
        .citing(&["obligation_located"])
}

fn plain_meaning(ctx: &PrincipleContext<'_, '_>) -> PrincipleOutcome {
    let Some(subject) = ctx.subject() else {
        return PrincipleOutcome::neutral("subject not in corpus");
    };
    if ctx.states_obligation(subject) {
        return PrincipleOutcome::supports(format!(
            "{} states '{}' in terms",
            ctx.claim.subject, ctx.claim.obligation
        ));
    }
    let elsewhere = ctx
        .scope(subject)
        .into_iter()
        .any(|n| n != subject && ctx.states_obligation(n));
    if elsewhere {
        PrincipleOutcome::neutral("the obligation is stated only in a linked provision")
    } else {
        PrincipleOutcome::contradicts(format!(
            "the words of {} do not carry '{}'",
            ctx.claim.subject, ctx.claim.obligation
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::*;
    use crate::logic::LogicValidator;
    use crate::timeline::TimelineAnalyzer;

    fn reason_with(ruleset: &RuleSet, provisions: &[Provision], claim: &Claim) -> ReasoningReport {
        let graph = ReferenceGraph::build(provisions).unwrap();
        let mut findings = LogicValidator::from_ruleset(ruleset)
            .unwrap()
            .validate(&graph, claim)
            .findings;
        findings.extend(TimelineAnalyzer::from_ruleset(ruleset).analyze(&graph, claim).findings);
        ReasoningEngine::from_ruleset(ruleset)
            .unwrap()
            .reason(&graph, claim, &findings)
    }

    fn reason(provisions: &[Provision], claim: &Claim) -> ReasoningReport {
        reason_with(&RuleSet::default(), provisions, claim)
    }

    fn stance(report: &ReasoningReport, principle: &str) -> Stance {
        report
            .assessments
            .iter()
            .find(|a| a.principle == principle)
            .map(|a| a.stance)
            .unwrap()
    }

    fn dividend_claim() -> Claim {
        claim("Article 58", "declare first dividend", &["first meeting of creditors"])
    }

    #[test]
    fn general_provision_is_contradicted_by_specific_override() {
        let report = reason(&bankruptcy_corpus(), &dividend_claim());
        assert_eq!(stance(&report, "specific_overrides_general"), Stance::Contradicts);
        assert_eq!(stance(&report, "no_modification_without_authority"), Stance::Supports);
        assert_eq!(stance(&report, "silence_is_not_permission"), Stance::Supports);
        assert_eq!(stance(&report, "plain_meaning"), Stance::Supports);

        let alt: Vec<_> = report.candidates.iter().skip(1).collect();
        assert_eq!(alt.len(), 1);
        assert_eq!(alt[0].role, CandidateRole::Alternative);
        assert_eq!(alt[0].claim.subject, "Regulation 143");
        assert_eq!(alt[0].proposed_by.as_deref(), Some("specific_overrides_general"));
        assert_eq!(alt[0].supporting_findings, vec!["deadline_override".to_string()]);
    }

    #[test]
    fn primary_candidate_comes_first_with_its_evidence() {
        let report = reason(&bankruptcy_corpus(), &dividend_claim());
        let primary = &report.candidates[0];
        assert_eq!(primary.role, CandidateRole::Primary);
        assert_eq!(primary.claim, dividend_claim());
        assert_eq!(primary.contradicting_principles, vec!["specific_overrides_general".to_string()]);
        assert!(primary.supporting_findings.contains(&"deadline_override".to_string()));
    }

    #[test]
    fn disagreement_without_precedence_is_flagged_unresolved() {
        let report = reason(&bankruptcy_corpus(), &dividend_claim());
        assert_eq!(report.ambiguities.len(), 3);
        assert!(report.ambiguities.iter().all(|a| !a.is_resolved()));
        assert!(
            report
                .ambiguities
                .iter()
                .any(|a| a.principles == ["specific_overrides_general".to_string(), "plain_meaning".to_string()])
        );
    }

    #[test]
    fn precedence_rule_records_prevailing_principle() {
        let mut rs = RuleSet::default();
        rs.precedence
            .push(["specific_overrides_general".into(), "plain_meaning".into()]);
        let report = reason_with(&rs, &bankruptcy_corpus(), &dividend_claim());
        let resolved: Vec<_> = report.ambiguities.iter().filter(|a| a.is_resolved()).collect();
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].prevailing.as_deref(), Some("specific_overrides_general"));
        assert_eq!(report.ambiguities.len(), 3);
    }

    #[test]
    fn claim_resting_on_barred_modification_is_contradicted() {
        let c = claim("Regulation 20", "summary cases", &[]);
        let report = reason(&prohibition_corpus(), &c);
        assert_eq!(stance(&report, "no_modification_without_authority"), Stance::Contradicts);
        let alt = report
            .candidates
            .iter()
            .find(|c| c.proposed_by.as_deref() == Some("no_modification_without_authority"))
            .unwrap();
        assert_eq!(alt.claim.subject, "Article 10");
    }

    #[test]
    fn unlinked_condition_proposes_unconditional_reading() {
        let c = claim("Regulation 143", "single dividend", &["first meeting of creditors"]);
        let report = reason(&bankruptcy_corpus(), &c);
        assert_eq!(stance(&report, "silence_is_not_permission"), Stance::Contradicts);
        let alt = report
            .candidates
            .iter()
            .find(|c| c.proposed_by.as_deref() == Some("silence_is_not_permission"))
            .unwrap();
        assert!(alt.claim.conditions.is_empty());
    }

    #[test]
    fn unknown_subject_is_neutral_throughout() {
        let report = reason(&bankruptcy_corpus(), &claim("Article 999", "anything", &[]));
        assert!(report.assessments.iter().all(|a| a.stance == Stance::Neutral));
        assert_eq!(report.candidates.len(), 1);
        assert!(report.ambiguities.is_empty());
    }

    #[test]
    fn only_proposing_principles_add_candidates() {
        // Silence and plain meaning both object; only silence offers a reading.
        let report = reason(&bankruptcy_corpus(), &claim("Article 16", "grant discharge", &[]));
        let alternatives: Vec<_> = report.candidates.iter().skip(1).collect();
        assert_eq!(alternatives.len(), 1);
        let mut claims: Vec<_> = report.candidates.iter().map(|c| &c.claim).collect();
        claims.dedup();
        assert_eq!(claims.len(), report.candidates.len());
    }

    #[test]
    fn unknown_principle_is_rejected() {
        let mut rs = RuleSet::default();
        rs.principles.push("lex_posterior".into());
        assert!(matches!(
            ReasoningEngine::from_ruleset(&rs),
            Err(EngineError::UnknownPrinciple { .. })
        ));
    }
}
