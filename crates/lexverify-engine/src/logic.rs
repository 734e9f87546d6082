//! Logic validator: a registry of independent, named consistency checks.
//!
//! Each check is a pure function of the reference graph and the claim under
//! test and yields exactly one finding. Checks never consult each other's
//! results; a fact two checks need is derived by both. The rule set picks
//! which registered checks run and how much each weighs.

use std::collections::BTreeMap;

use lexverify_core::{
    Claim, Finding, FindingKind, IndeterminatePolicy, Outcome, ProvisionKind, RuleSet, SubScore,
};
use tracing::{debug, info};

use crate::EngineError;
use crate::graph::{NodeIndex, ReferenceGraph, RelationKind};
use crate::text::{mentions, same_label};

/// Read-only inputs shared by every check.
pub struct CheckContext<'g, 'a> {
    pub graph: &'g ReferenceGraph<'a>,
    pub claim: &'g Claim,
    pub depth: usize,
}

impl CheckContext<'_, '_> {
    fn subject(&self) -> Option<NodeIndex> {
        self.graph.index_of(&self.claim.subject)
    }

    /// Subject plus its undirected neighbourhood; empty when the subject is
    /// not in the corpus.
    fn scope(&self) -> Vec<NodeIndex> {
        match self.subject() {
            Some(s) => self.graph.neighbourhood(s, self.depth),
            None => Vec::new(),
        }
    }

    fn finding(&self, id: &str, outcome: Outcome, rationale: impl Into<String>) -> Finding {
        Finding::new(id, FindingKind::LogicCheck, outcome, rationale)
    }

    fn unknown_subject(&self, id: &str) -> Finding {
        self.finding(
            id,
            Outcome::Indeterminate,
            format!("subject {} is not in the corpus", self.claim.subject),
        )
    }
}

pub type CheckFn = fn(&CheckContext<'_, '_>) -> Finding;

/// A check known to the engine under a stable identifier.
pub struct RegisteredCheck {
    pub id: &'static str,
    pub description: &'static str,
    pub run: CheckFn,
}

/// Every check the engine can run. Rule sets select from this table.
pub const REGISTRY: &[RegisteredCheck] = &[
    RegisteredCheck {
        id: "prohibition_intact",
        description: "Restricted clauses near the subject exist and are not modified",
        run: prohibition_intact,
    },
    RegisteredCheck {
        id: "amendment_consistency",
        description: "Unrelated provisions do not modify the same clause",
        run: amendment_consistency,
    },
    RegisteredCheck {
        id: "modification_authority",
        description: "Regulations modifying articles are enabled by an article",
        run: modification_authority,
    },
    RegisteredCheck {
        id: "obligation_located",
        description: "The claimed obligation is stated verbatim near the subject",
        run: obligation_located,
    },
    RegisteredCheck {
        id: "trigger_implies_obligation",
        description: "Each claimed condition is expressly tied to the obligation",
        run: trigger_implies_obligation,
    },
    RegisteredCheck {
        id: "subject_conflict_free",
        description: "No provision declares itself in conflict with the subject",
        run: subject_conflict_free,
    },
];

pub fn lookup(id: &str) -> Option<&'static RegisteredCheck> {
    REGISTRY.iter().find(|c| c.id == id)
}

/// Findings from one validator run plus the logic sub-score.
#[derive(Debug, Clone)]
pub struct LogicReport {
    /// In registration order.
    pub findings: Vec<Finding>,
    pub score: SubScore,
}

/// The configured battery.
pub struct LogicValidator {
    battery: Vec<(&'static RegisteredCheck, f64)>,
    policy: IndeterminatePolicy,
    max: u32,
    depth: usize,
}

impl LogicValidator {
    /// Resolve the rule set's check ids against the registry.
    pub fn from_ruleset(ruleset: &RuleSet) -> Result<Self, EngineError> {
        let battery = ruleset
            .checks
            .iter()
            .map(|entry| {
                lookup(&entry.id)
                    .map(|check| (check, entry.weight))
                    .ok_or_else(|| EngineError::UnknownCheck {
                        version: ruleset.version.clone(),
                        id: entry.id.clone(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            battery,
            policy: ruleset.indeterminate_policy,
            max: ruleset.maxima.logic,
            depth: ruleset.traversal_depth,
        })
    }

    pub fn check_ids(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.battery.iter().map(|(c, _)| c.id)
    }

    pub fn validate(&self, graph: &ReferenceGraph<'_>, claim: &Claim) -> LogicReport {
        let ctx = CheckContext {
            graph,
            claim,
            depth: self.depth,
        };

        let mut findings = Vec::with_capacity(self.battery.len());
        let mut weighted = Vec::with_capacity(self.battery.len());
        for (check, weight) in &self.battery {
            let finding = (check.run)(&ctx);
            debug!(check = check.id, outcome = finding.outcome.as_str(), "logic check");
            weighted.push((finding.outcome, *weight));
            findings.push(finding);
        }

        let score = weighted_score(&weighted, self.policy, self.max);
        info!(checks = findings.len(), score, max = self.max, "logic validation complete");

        LogicReport {
            findings,
            score: SubScore::new(score, self.max, true),
        }
    }
}

/// `round(max × Σ wᵢ·creditᵢ / Σ wᵢ)`, with indeterminate credit per policy.
///
/// Returns 0 when nothing is left to score.
pub fn weighted_score(results: &[(Outcome, f64)], policy: IndeterminatePolicy, max: u32) -> u32 {
    let mut earned = 0.0;
    let mut possible = 0.0;
    for &(outcome, weight) in results {
        let credit = match (outcome, policy) {
            (Outcome::Satisfied, _) => Some(1.0),
            (Outcome::Violated, _) => Some(0.0),
            (Outcome::Indeterminate, IndeterminatePolicy::HalfCredit) => Some(0.5),
            (Outcome::Indeterminate, IndeterminatePolicy::NoCredit) => Some(0.0),
            (Outcome::Indeterminate, IndeterminatePolicy::Exclude) => None,
        };
        if let Some(credit) = credit {
            earned += credit * weight;
            possible += weight;
        }
    }
    if possible <= 0.0 {
        return 0;
    }
    let score = (f64::from(max) * earned / possible).round();
    (score.max(0.0) as u32).min(max)
}

// ── Checks ──

fn prohibition_intact(ctx: &CheckContext<'_, '_>) -> Finding {
    const ID: &str = "prohibition_intact";
    if ctx.subject().is_none() {
        return ctx.unknown_subject(ID);
    }
    let g = ctx.graph;

    let mut located = Vec::new();
    let mut missing = Vec::new();
    for n in ctx.scope() {
        let p = g.node(n);
        for clause in &p.restrictions {
            match p.clause(clause) {
                Some(_) => located.push((n, clause.as_str())),
                None => missing.push(p.cite(clause)),
            }
        }
    }

    if located.is_empty() {
        let rationale = if missing.is_empty() {
            "no prohibition clause is declared near the subject".to_string()
        } else {
            format!("restricted clause text not found: {}", missing.join(", "))
        };
        return ctx
            .finding(ID, Outcome::Indeterminate, rationale)
            .with_citations(missing);
    }

    let mut citations = Vec::new();
    let mut breaches = Vec::new();
    for &(n, clause) in &located {
        let restricted = g.node(n);
        for edge in g.edges_into(n) {
            let hits_clause = edge.target_clause.as_deref().is_none_or(|c| c == clause);
            if edge.kind.is_modifying() && hits_clause {
                let source = g.node(edge.source);
                breaches.push(format!(
                    "{} {} {}",
                    source.cite(&edge.clause),
                    edge.kind,
                    restricted.cite(clause)
                ));
                citations.push(restricted.cite(clause));
                citations.push(source.cite(&edge.clause));
            }
        }
    }
    citations.dedup();

    if !breaches.is_empty() {
        return ctx
            .finding(
                ID,
                Outcome::Violated,
                format!("restricted clause modified: {}", breaches.join("; ")),
            )
            .with_citations(citations);
    }

    let cited: Vec<String> = located.iter().map(|&(n, c)| g.node(n).cite(c)).collect();
    if !missing.is_empty() {
        return ctx
            .finding(
                ID,
                Outcome::Indeterminate,
                format!(
                    "{} intact, but restricted clause text not found: {}",
                    cited.join(", "),
                    missing.join(", ")
                ),
            )
            .with_citations(cited.into_iter().chain(missing));
    }

    ctx.finding(
        ID,
        Outcome::Satisfied,
        format!("no modifying edge reaches {}", cited.join(", ")),
    )
    .with_citations(cited)
}

fn amendment_consistency(ctx: &CheckContext<'_, '_>) -> Finding {
    const ID: &str = "amendment_consistency";
    let g = ctx.graph;

    // (target, target clause) → modifying edges, in edge order.
    let mut by_clause: BTreeMap<(NodeIndex, Option<&str>), Vec<usize>> = BTreeMap::new();
    for (i, edge) in g.edges().iter().enumerate() {
        if edge.kind.is_modifying() {
            by_clause
                .entry((edge.target, edge.target_clause.as_deref()))
                .or_default()
                .push(i);
        }
    }

    let any_relation = [
        RelationKind::References,
        RelationKind::Amends,
        RelationKind::Extends,
        RelationKind::ConflictsWith,
    ];
    let mut clashes = Vec::new();
    let mut citations = Vec::new();
    for edge_ids in by_clause.values() {
        for (i, &a) in edge_ids.iter().enumerate() {
            for &b in &edge_ids[i + 1..] {
                let (ea, eb) = (&g.edges()[a], &g.edges()[b]);
                if ea.source == eb.source || g.linked(ea.source, eb.source, &any_relation) {
                    continue;
                }
                clashes.push(format!(
                    "{} and {} both modify the same clause without reference to each other",
                    g.node(ea.source).id,
                    g.node(eb.source).id
                ));
                citations.push(g.describe_edge(ea));
                citations.push(g.describe_edge(eb));
            }
        }
    }

    if clashes.is_empty() {
        ctx.finding(
            ID,
            Outcome::Satisfied,
            format!("{} modified clause(s), none modified by unrelated provisions", by_clause.len()),
        )
    } else {
        ctx.finding(ID, Outcome::Violated, clashes.join("; "))
            .with_citations(citations)
    }
}

/// Relations through which an article can empower a regulation.
pub(crate) const ENABLING_RELATIONS: [RelationKind; 2] = [RelationKind::References, RelationKind::Extends];

fn modification_authority(ctx: &CheckContext<'_, '_>) -> Finding {
    const ID: &str = "modification_authority";
    let g = ctx.graph;

    let mut unauthorised = Vec::new();
    let mut authorised = Vec::new();
    for edge in g.edges() {
        let source = g.node(edge.source);
        let target = g.node(edge.target);
        if !edge.kind.is_modifying()
            || source.kind != ProvisionKind::Regulation
            || target.kind != ProvisionKind::Article
        {
            continue;
        }
        let enablers: Vec<&str> = g
            .edges_into(edge.source)
            .filter(|e| ENABLING_RELATIONS.contains(&e.kind))
            .filter(|e| g.node(e.source).kind == ProvisionKind::Article)
            .map(|e| g.node(e.source).id.as_str())
            .collect();
        if enablers.is_empty() {
            unauthorised.push(g.describe_edge(edge));
        } else {
            authorised.push(format!("{} (enabled by {})", g.describe_edge(edge), enablers.join(", ")));
        }
    }

    if !unauthorised.is_empty() {
        return ctx
            .finding(
                ID,
                Outcome::Violated,
                format!(
                    "no article refers to the regulation making: {}",
                    unauthorised.join("; ")
                ),
            )
            .with_citations(unauthorised);
    }
    if authorised.is_empty() {
        return ctx.finding(ID, Outcome::Satisfied, "no regulation modifies an article");
    }
    ctx.finding(
        ID,
        Outcome::Satisfied,
        format!("every regulatory modification has an enabling article: {}", authorised.join("; ")),
    )
    .with_citations(authorised)
}

fn obligation_located(ctx: &CheckContext<'_, '_>) -> Finding {
    const ID: &str = "obligation_located";
    let Some(subject) = ctx.subject() else {
        return ctx.unknown_subject(ID);
    };
    let g = ctx.graph;
    let obligation = &ctx.claim.obligation;

    let hits: Vec<(NodeIndex, String)> = ctx
        .scope()
        .into_iter()
        .flat_map(|n| {
            let p = g.node(n);
            p.clauses()
                .filter(|(_, text)| mentions(text, obligation))
                .map(move |(c, _)| (n, p.cite(c)))
        })
        .collect();

    if hits.is_empty() {
        return ctx.finding(
            ID,
            Outcome::Indeterminate,
            format!("'{obligation}' is not stated verbatim in or near {}", ctx.claim.subject),
        );
    }

    let in_subject = hits.iter().any(|(n, _)| *n == subject);
    let rationale = if in_subject {
        format!("'{obligation}' is stated in the subject provision")
    } else {
        format!("'{obligation}' is stated in a provision linked to the subject")
    };
    ctx.finding(ID, Outcome::Satisfied, rationale)
        .with_citations(hits.into_iter().map(|(_, cite)| cite))
}

fn trigger_implies_obligation(ctx: &CheckContext<'_, '_>) -> Finding {
    const ID: &str = "trigger_implies_obligation";
    if ctx.subject().is_none() {
        return ctx.unknown_subject(ID);
    }
    let claim = ctx.claim;
    if claim.conditions.is_empty() {
        return ctx.finding(ID, Outcome::Indeterminate, "no trigger condition asserted");
    }
    let g = ctx.graph;
    let scope = ctx.scope();

    let mut unlocated = Vec::new();
    let mut unlinked = Vec::new();
    let mut citations = Vec::new();

    for condition in &claim.conditions {
        let mut located = false;
        let mut linked = false;
        for &n in &scope {
            let p = g.node(n);
            for (c, text) in p.clauses() {
                if mentions(text, condition) {
                    located = true;
                    citations.push(p.cite(c));
                    if mentions(text, &claim.obligation) {
                        linked = true;
                    }
                }
            }
            for d in &p.deadlines {
                if mentions(&d.trigger, condition) {
                    located = true;
                    if same_label(&d.obligation, &claim.obligation) {
                        linked = true;
                        citations.push(format!("{}: {} within {} {}", p.id, d.obligation, d.duration, d.unit));
                    }
                }
            }
        }
        if !located {
            unlocated.push(condition.as_str());
        } else if !linked {
            unlinked.push(condition.as_str());
        }
    }
    citations.dedup();

    if !unlocated.is_empty() {
        return ctx
            .finding(
                ID,
                Outcome::Indeterminate,
                format!("condition not stated verbatim: {}", unlocated.join(", ")),
            )
            .with_citations(citations);
    }
    if !unlinked.is_empty() {
        return ctx
            .finding(
                ID,
                Outcome::Violated,
                format!(
                    "no provision ties '{}' to: {}",
                    claim.obligation,
                    unlinked.join(", ")
                ),
            )
            .with_citations(citations);
    }
    ctx.finding(
        ID,
        Outcome::Satisfied,
        format!("every condition is expressly tied to '{}'", claim.obligation),
    )
    .with_citations(citations)
}

fn subject_conflict_free(ctx: &CheckContext<'_, '_>) -> Finding {
    const ID: &str = "subject_conflict_free";
    let Some(subject) = ctx.subject() else {
        return ctx.unknown_subject(ID);
    };
    let g = ctx.graph;
    let conflicts: Vec<String> = g
        .edges()
        .iter()
        .filter(|e| e.kind == RelationKind::ConflictsWith && (e.source == subject || e.target == subject))
        .map(|e| g.describe_edge(e))
        .collect();

    if conflicts.is_empty() {
        ctx.finding(
            ID,
            Outcome::Satisfied,
            format!("no provision conflicts with {}", ctx.claim.subject),
        )
    } else {
        ctx.finding(
            ID,
            Outcome::Violated,
            format!("{} conflicting relation(s) touch {}", conflicts.len(), ctx.claim.subject),
        )
        .with_citations(conflicts)
    }
}
