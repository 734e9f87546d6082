//! The end-to-end run: graph, then logic and timeline side by side, then
//! reasoning and aggregation.

use std::thread;

use lexverify_core::{
    Claim, Finding, FindingKind, Outcome, PrecedentRecord, Provision, RuleSet, ScoreBreakdown,
    SubScore, Verdict,
};
use tracing::{info, warn};

use crate::EngineError;
use crate::fact_check::FactChecker;
use crate::graph::ReferenceGraph;
use crate::logic::LogicValidator;
use crate::reasoning::ReasoningEngine;
use crate::timeline::TimelineAnalyzer;

/// A verification engine bound to one rule-set version.
pub struct Engine {
    ruleset: RuleSet,
    logic: LogicValidator,
    timeline: TimelineAnalyzer,
    reasoning: ReasoningEngine,
    facts: FactChecker,
}

impl Engine {
    /// Validate the rule set and resolve its checks and principles.
    pub fn new(ruleset: RuleSet) -> Result<Self, EngineError> {
        ruleset.validate()?;
        let logic = LogicValidator::from_ruleset(&ruleset)?;
        let reasoning = ReasoningEngine::from_ruleset(&ruleset)?;
        info!(
            version = %ruleset.version,
            checks = ruleset.checks.len(),
            principles = ruleset.principles.len(),
            "engine ready"
        );
        Ok(Self {
            timeline: TimelineAnalyzer::from_ruleset(&ruleset),
            facts: FactChecker::from_ruleset(&ruleset),
            logic,
            reasoning,
            ruleset,
        })
    }

    pub fn ruleset(&self) -> &RuleSet {
        &self.ruleset
    }

    pub fn evaluate(
        &self,
        provisions: &[Provision],
        claim: &Claim,
        precedents: Option<&[PrecedentRecord]>,
    ) -> Result<Verdict, EngineError> {
        self.evaluate_with_text(provisions, claim, precedents, None)
    }

    /// As [`Engine::evaluate`], with an externally computed text-support
    /// score in place of the built-in clause count.
    pub fn evaluate_with_text(
        &self,
        provisions: &[Provision],
        claim: &Claim,
        precedents: Option<&[PrecedentRecord]>,
        text_score: Option<u32>,
    ) -> Result<Verdict, EngineError> {
        info!(
            provisions = provisions.len(),
            subject = %claim.subject,
            "evaluating claim"
        );
        let graph = ReferenceGraph::build(provisions)?;

        let mut findings: Vec<Finding> = graph.dangling_references().to_vec();
        if graph.index_of(&claim.subject).is_none() {
            warn!(subject = %claim.subject, "claim subject not in corpus");
            findings.push(
                Finding::new(
                    "dangling_reference",
                    FindingKind::DanglingReference,
                    Outcome::Indeterminate,
                    format!("claim subject {} is not in the corpus", claim.subject),
                )
                .with_citations([claim.subject.clone()]),
            );
        }

        let (logic, timeline) = thread::scope(|s| {
            let timeline = s.spawn(|| self.timeline.analyze(&graph, claim));
            let logic = self.logic.validate(&graph, claim);
            (logic, timeline.join())
        });
        let timeline = match timeline {
            Ok(report) => report,
            Err(panic) => std::panic::resume_unwind(panic),
        };

        let mut stage_findings = logic.findings;
        stage_findings.extend(timeline.findings);
        let reasoning = self.reasoning.reason(&graph, claim, &stage_findings);
        findings.extend(stage_findings);

        let text = match text_score {
            Some(score) => SubScore::new(score, self.ruleset.maxima.text, true),
            None => self.facts.text_support(&graph, claim),
        };
        let scores = ScoreBreakdown {
            text,
            logic: logic.score,
            timeline: timeline.score,
            precedent: self.facts.precedent_score(precedents),
        };

        Ok(self.facts.verdict(claim, scores, findings, reasoning))
    }
}
