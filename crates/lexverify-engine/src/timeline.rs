//! Timeline analysis over extracted deadlines.
//!
//! Every deadline becomes an event whose offset is resolved, in days, back
//! along its trigger chain: a deadline triggered by another obligation is
//! due that obligation's offset plus its own duration. Events that share a
//! root trigger are totally ordered by that offset.

use std::collections::{BTreeMap, HashSet};

use lexverify_core::{
    Claim, Deadline, Finding, FindingKind, Outcome, RuleSet, SubScore, TimelinePenalties,
    provision_sort_key,
};
use tracing::{debug, info, warn};

use crate::graph::{NodeIndex, ReferenceGraph, RelationKind};
use crate::text::{mentions, normalize, same_label};

const MODIFYING: [RelationKind; 2] = [RelationKind::Amends, RelationKind::Extends];

/// One scheduled obligation on the shared timeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimelineEvent {
    pub provision: String,
    /// The obligation that falls due.
    pub label: String,
    /// Trigger at the head of this event's chain.
    pub root: String,
    /// Days after `root`.
    pub offset_days: u64,
    /// Position in (root, offset, provision, label) order.
    pub rank: usize,
}

#[derive(Debug, Clone)]
pub struct TimelineReport {
    /// In rank order.
    pub events: Vec<TimelineEvent>,
    pub findings: Vec<Finding>,
    pub direct_conflicts: usize,
    pub sequencing_conflicts: usize,
    pub score: SubScore,
}

/// A deadline together with the graph node asserting it.
struct Scheduled<'a> {
    node: NodeIndex,
    deadline: &'a Deadline,
    root: &'a str,
    offset: u64,
}

pub struct TimelineAnalyzer {
    penalties: TimelinePenalties,
    max: u32,
    depth: usize,
}

impl TimelineAnalyzer {
    pub fn from_ruleset(ruleset: &RuleSet) -> Self {
        Self {
            penalties: ruleset.timeline,
            max: ruleset.maxima.timeline,
            depth: ruleset.traversal_depth,
        }
    }

    pub fn analyze(&self, graph: &ReferenceGraph<'_>, claim: &Claim) -> TimelineReport {
        let scheduled = self.schedule(graph);
        let events = rank_events(graph, &scheduled);
        for e in &events {
            debug!(
                rank = e.rank,
                provision = %e.provision,
                label = %e.label,
                root = %e.root,
                offset_days = e.offset_days,
                "timeline event"
            );
        }

        let mut findings = Vec::new();
        let direct_conflicts = direct_conflicts(graph, &scheduled, &mut findings);
        let sequencing_conflicts = sequencing_conflicts(graph, &scheduled, &mut findings);
        let implicit = implicit_obligation(&events, claim);
        let implicit_found = implicit.is_some();
        findings.extend(implicit);

        if direct_conflicts == 0 && sequencing_conflicts == 0 && !implicit_found {
            findings.push(
                Finding::new(
                    FindingKind::TimelineConsistency.as_str(),
                    FindingKind::TimelineConsistency,
                    Outcome::Satisfied,
                    format!("{} deadline(s) on the timeline, none in conflict", events.len()),
                )
                .with_citations(events.iter().map(describe_event)),
            );
        }

        let count = |n: usize| u32::try_from(n).unwrap_or(u32::MAX);
        let penalty = self
            .penalties
            .direct_conflict
            .saturating_mul(count(direct_conflicts))
            .saturating_add(
                self.penalties
                    .sequencing_conflict
                    .saturating_mul(count(sequencing_conflicts)),
            );
        let score = self.max.saturating_sub(penalty);
        info!(
            events = events.len(),
            direct_conflicts,
            sequencing_conflicts,
            score,
            max = self.max,
            "timeline analysis complete"
        );

        TimelineReport {
            events,
            findings,
            direct_conflicts,
            sequencing_conflicts,
            score: SubScore::new(score, self.max, true),
        }
    }

    /// Collect every deadline in graph order and resolve its absolute offset.
    fn schedule<'a>(&self, graph: &ReferenceGraph<'a>) -> Vec<Scheduled<'a>> {
        let raw: Vec<(NodeIndex, &'a Deadline)> = graph
            .nodes()
            .flat_map(|(n, p)| p.deadlines.iter().map(move |d| (n, d)))
            .collect();

        (0..raw.len())
            .map(|i| {
                let (root, offset) = self.resolve(graph, &raw, i);
                Scheduled {
                    node: raw[i].0,
                    deadline: raw[i].1,
                    root,
                    offset,
                }
            })
            .collect()
    }

    /// Walk up the trigger chain from `start`: while the trigger names some
    /// other deadline's obligation, add that deadline's duration.
    fn resolve<'a>(
        &self,
        graph: &ReferenceGraph<'_>,
        raw: &[(NodeIndex, &'a Deadline)],
        start: usize,
    ) -> (&'a str, u64) {
        let mut offset = raw[start].1.days();
        let mut trigger = raw[start].1.trigger.as_str();
        let mut visited = HashSet::from([start]);

        for _ in 0..self.depth {
            let Some(parent) = governing_deadline(graph, raw, trigger) else {
                break;
            };
            if !visited.insert(parent) {
                warn!(trigger, "circular trigger chain");
                break;
            }
            offset += raw[parent].1.days();
            trigger = raw[parent].1.trigger.as_str();
        }
        (trigger, offset)
    }
}

/// The deadline that schedules `obligation`. When several provisions do, the
/// one not amended or extended by another of them governs; failing that, the
/// first in graph order.
fn governing_deadline(
    graph: &ReferenceGraph<'_>,
    raw: &[(NodeIndex, &Deadline)],
    obligation: &str,
) -> Option<usize> {
    let candidates: Vec<usize> = (0..raw.len())
        .filter(|&i| same_label(&raw[i].1.obligation, obligation))
        .collect();
    let overridden = |i: usize| {
        candidates
            .iter()
            .any(|&j| raw[j].0 != raw[i].0 && graph.has_relation(raw[j].0, raw[i].0, &MODIFYING))
    };
    candidates
        .iter()
        .copied()
        .find(|&i| !overridden(i))
        .or_else(|| candidates.first().copied())
}

fn rank_events(graph: &ReferenceGraph<'_>, scheduled: &[Scheduled<'_>]) -> Vec<TimelineEvent> {
    let mut keyed: Vec<((String, u64, String, String), TimelineEvent)> = scheduled
        .iter()
        .map(|s| {
            let provision = &graph.node(s.node).id;
            let key = (
                normalize(s.root),
                s.offset,
                provision_sort_key(provision),
                normalize(&s.deadline.obligation),
            );
            let event = TimelineEvent {
                provision: provision.clone(),
                label: s.deadline.obligation.clone(),
                root: s.root.to_string(),
                offset_days: s.offset,
                rank: 0,
            };
            (key, event)
        })
        .collect();
    keyed.sort_by(|a, b| a.0.cmp(&b.0));
    keyed
        .into_iter()
        .enumerate()
        .map(|(rank, (_, mut event))| {
            event.rank = rank;
            event
        })
        .collect()
}

fn cite_deadline(graph: &ReferenceGraph<'_>, s: &Scheduled<'_>) -> String {
    let p = graph.node(s.node);
    let at = match &s.deadline.clause {
        Some(c) => p.cite(c),
        None => p.id.clone(),
    };
    format!(
        "{at}: {} within {} {} of {}",
        s.deadline.obligation, s.deadline.duration, s.deadline.unit, s.deadline.trigger
    )
}

fn describe_event(e: &TimelineEvent) -> String {
    format!("{}: {} at day {} after {}", e.provision, e.label, e.offset_days, e.root)
}

/// Pairs of provisions that assert different durations for the same
/// (trigger, obligation). Returns the number left unresolved.
fn direct_conflicts(
    graph: &ReferenceGraph<'_>,
    scheduled: &[Scheduled<'_>],
    findings: &mut Vec<Finding>,
) -> usize {
    let mut by_obligation: BTreeMap<(String, String), Vec<usize>> = BTreeMap::new();
    for (i, s) in scheduled.iter().enumerate() {
        by_obligation
            .entry((normalize(&s.deadline.trigger), normalize(&s.deadline.obligation)))
            .or_default()
            .push(i);
    }

    let mut unresolved = 0;
    for ids in by_obligation.values() {
        let mut seen_pairs = HashSet::new();
        for (k, &i) in ids.iter().enumerate() {
            for &j in &ids[k + 1..] {
                let (a, b) = (&scheduled[i], &scheduled[j]);
                if a.node == b.node || a.deadline.days() == b.deadline.days() {
                    continue;
                }
                if !seen_pairs.insert((a.node.min(b.node), a.node.max(b.node))) {
                    continue;
                }
                let (pa, pb) = (graph.node(a.node), graph.node(b.node));
                let citations = [cite_deadline(graph, a), cite_deadline(graph, b)];

                if graph.linked(a.node, b.node, &MODIFYING) {
                    let (winner, loser) = if graph.has_relation(b.node, a.node, &MODIFYING) {
                        (pb, pa)
                    } else {
                        (pa, pb)
                    };
                    debug!(winner = %winner.id, loser = %loser.id, "deadline override");
                    findings.push(
                        Finding::new(
                            FindingKind::DeadlineOverride.as_str(),
                            FindingKind::DeadlineOverride,
                            Outcome::Satisfied,
                            format!(
                                "{} overrides {} for '{}' ({} vs {} days)",
                                winner.id,
                                loser.id,
                                a.deadline.obligation,
                                a.deadline.days(),
                                b.deadline.days()
                            ),
                        )
                        .with_citations(citations),
                    );
                } else {
                    unresolved += 1;
                    warn!(a = %pa.id, b = %pb.id, obligation = %a.deadline.obligation, "deadline conflict");
                    findings.push(
                        Finding::new(
                            FindingKind::DeadlineConflict.as_str(),
                            FindingKind::DeadlineConflict,
                            Outcome::Violated,
                            format!(
                                "{} allows {} days and {} allows {} days for '{}', with no override between them",
                                pa.id,
                                a.deadline.days(),
                                pb.id,
                                b.deadline.days(),
                                a.deadline.obligation
                            ),
                        )
                        .with_citations(citations),
                    );
                }
            }
        }
    }
    unresolved
}

/// Events due before an obligation they must follow, where that obligation's
/// deadline has been pushed out by an amending or extending provision.
fn sequencing_conflicts(
    graph: &ReferenceGraph<'_>,
    scheduled: &[Scheduled<'_>],
    findings: &mut Vec<Finding>,
) -> usize {
    let mut count = 0;
    for event in scheduled {
        let Some(prerequisite) = event.deadline.not_before.as_deref() else {
            continue;
        };
        for prior in scheduled {
            if !same_label(&prior.deadline.obligation, prerequisite)
                || !same_label(prior.root, event.root)
                || event.offset >= prior.offset
            {
                continue;
            }
            let overrides_another = scheduled.iter().any(|other| {
                other.node != prior.node
                    && same_label(&other.deadline.obligation, prerequisite)
                    && graph.has_relation(prior.node, other.node, &MODIFYING)
            });
            if !overrides_another {
                continue;
            }
            count += 1;
            warn!(
                provision = %graph.node(event.node).id,
                obligation = %event.deadline.obligation,
                prerequisite,
                "sequencing conflict"
            );
            findings.push(
                Finding::new(
                    FindingKind::SequencingConflict.as_str(),
                    FindingKind::SequencingConflict,
                    Outcome::Violated,
                    format!(
                        "'{}' falls due at day {} but must follow '{}', now due at day {}",
                        event.deadline.obligation, event.offset, prerequisite, prior.offset
                    ),
                )
                .with_citations([cite_deadline(graph, event), cite_deadline(graph, prior)]),
            );
        }
    }
    count
}

/// The claim's conditions are all scheduled, but its obligation is not.
fn implicit_obligation(events: &[TimelineEvent], claim: &Claim) -> Option<Finding> {
    if claim.conditions.is_empty() {
        return None;
    }
    let mut matched = Vec::new();
    for condition in &claim.conditions {
        let hits: Vec<&TimelineEvent> = events
            .iter()
            .filter(|e| mentions(&e.label, condition))
            .collect();
        if hits.is_empty() {
            return None;
        }
        matched.extend(hits);
    }
    if events.iter().any(|e| same_label(&e.label, &claim.obligation)) {
        return None;
    }
    matched.dedup_by_key(|e| e.rank);

    Some(
        Finding::new(
            FindingKind::ImplicitObligation.as_str(),
            FindingKind::ImplicitObligation,
            Outcome::Indeterminate,
            format!(
                "the timeline reaches {} but no provision schedules '{}'",
                claim.conditions.join(", "),
                claim.obligation
            ),
        )
        .with_citations(matched.into_iter().map(describe_event)),
    )
}
