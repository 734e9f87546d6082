//! Terminal output: verdict summary card and reference-graph listing.

use lexverify_core::{Outcome, Verdict};
use lexverify_engine::{NodeIndex, ReferenceGraph};

const MAX_CITATIONS: usize = 3;

// ── Verdict ──

/// Print the headline numbers and every non-satisfied finding.
pub fn print_summary(v: &Verdict) {
    println!("=== {} ({} confidence) ===", v.confidence, v.confidence_level.as_str());
    println!("{}: {}", v.claim.subject, v.claim.obligation);
    println!();

    println!("Score");
    for ((name, s), row) in v.scores.entries().into_iter().zip(&v.breakdown) {
        let note = if s.available { "" } else { "  (no data)" };
        println!(
            "  {:<26} {:>3} / {:<3} {:<8}{note}",
            name,
            s.score,
            s.max,
            row.status.as_str()
        );
    }
    println!("  {:<26} {:>3} / {:<3}", "total", v.total, v.max_total);
    println!();

    let open: Vec<_> = v
        .findings
        .iter()
        .filter(|f| f.outcome != Outcome::Satisfied)
        .collect();
    if !open.is_empty() {
        println!("Findings");
        for f in open {
            println!("  {:<26} {:<13} {}", f.check, f.outcome.as_str(), f.rationale);
            for c in f.citations.iter().take(MAX_CITATIONS) {
                println!("  {:<26} {:<13}   {c}", "", "");
            }
            if f.citations.len() > MAX_CITATIONS {
                println!(
                    "  {:<26} {:<13}   ... and {} more",
                    "",
                    "",
                    f.citations.len() - MAX_CITATIONS
                );
            }
        }
        println!();
    }

    println!("Principles");
    for p in &v.principles {
        println!("  {:<34} {}", p.principle, p.stance.as_str());
    }
    println!();

    println!("Recommendation");
    println!("  {}", v.recommendation.summary);
    for (i, step) in v.recommendation.steps.iter().enumerate() {
        println!("  {}. {step}", i + 1);
    }
    println!();

    let alternatives = v.alternatives().count();
    let unresolved = v.unresolved_ambiguities().count();
    println!(
        "{alternatives} alternative reading(s), {unresolved} unresolved ambiguit{}",
        if unresolved == 1 { "y" } else { "ies" }
    );
}

// ── Graph ──

pub fn print_graph(graph: &ReferenceGraph<'_>) {
    println!("Provisions ({})", graph.len());
    for (_, p) in graph.nodes() {
        let clauses = p.clauses().count();
        let restricted = if p.restrictions.is_empty() {
            String::new()
        } else {
            format!(
                "  restricted: {}",
                p.restrictions.iter().cloned().collect::<Vec<_>>().join(", ")
            )
        };
        println!(
            "  {:<26} {:<10} {clauses} clause(s), {} deadline(s){restricted}",
            p.id,
            p.kind.as_str(),
            p.deadlines.len()
        );
    }
    println!();

    println!("Edges ({})", graph.edges().len());
    for e in graph.edges() {
        println!("  {}", graph.describe_edge(e));
    }
    println!();

    let dangling = graph.dangling_references();
    if !dangling.is_empty() {
        println!("Dangling references ({})", dangling.len());
        for f in dangling {
            println!("  {}", f.rationale);
        }
    }
}

/// Direct neighbours of one provision, then its outgoing chain.
pub fn print_dependencies(graph: &ReferenceGraph<'_>, idx: NodeIndex, depth: usize) {
    let deps = graph.dependencies(idx);
    println!("{}", graph.node(idx).id);
    print_ids(graph, "Depends on", &deps.depends_on);
    print_ids(graph, "Depended on by", &deps.depended_by);
    print_ids(graph, "Reaches", &graph.reachable(idx, depth));
}

fn print_ids(graph: &ReferenceGraph<'_>, label: &str, ids: &[NodeIndex]) {
    if ids.is_empty() {
        println!("  {label:<26} none");
        return;
    }
    for (i, &n) in ids.iter().enumerate() {
        let head = if i == 0 { label } else { "" };
        println!("  {head:<26} {}", graph.node(n).id);
    }
}
