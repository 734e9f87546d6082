//! Cross-reference graph over the provision corpus.
//!
//! Nodes are an arena of borrowed provisions addressed by index; edges are
//! typed by a relation inferred from fixed keyword tables. Amendment chains
//! may be circular, so every traversal carries a visited set and a depth
//! bound.

use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;
use std::sync::LazyLock;

use lexverify_core::{Finding, FindingKind, Outcome, Provision, ProvisionKind};
use regex::Regex;
use tracing::{debug, info, warn};

use crate::EngineError;

pub type NodeIndex = usize;

/// Closed set of relations between provisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RelationKind {
    References,
    Amends,
    Extends,
    ConflictsWith,
}

impl RelationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::References => "references",
            Self::Amends => "amends",
            Self::Extends => "extends",
            Self::ConflictsWith => "conflicts-with",
        }
    }

    /// Amends and extends both alter the target's operation.
    pub fn is_modifying(&self) -> bool {
        matches!(self, Self::Amends | Self::Extends)
    }
}

impl fmt::Display for RelationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Relation keyword tables ──

const AMENDS_MARKERS: &[&str] = &["amend", "modif", "substitut", "replac", "vary", "varies"];
const EXTENDS_MARKERS: &[&str] = &["extend", "supplement", "in addition to"];
const CONFLICTS_MARKERS: &[&str] = &[
    "notwithstanding",
    "inconsistent with",
    "contrary to",
    "conflicts with",
];
const NEGATION_MARKERS: &[&str] = &[
    "may not",
    "shall not",
    "must not",
    "cannot",
    "not permit",
    "nothing in",
];

/// `No regulation may ...`, `no provision of this Part may ...`.
static NO_MAY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\bno\b[^.;]*\bmay\b").expect("negation pattern is valid")
});

/// Classify the relation a clause establishes with the provisions it cites.
///
/// A negated clause (`may not be modified`) forbids rather than performs a
/// modification, so it can neither amend nor extend. Otherwise tables are
/// consulted in order: amends, extends, conflicts-with; a clause matching
/// none merely references its target.
pub fn classify_relation(clause: &str) -> RelationKind {
    let lower = clause.to_lowercase();
    let has = |markers: &[&str]| markers.iter().any(|m| lower.contains(m));
    let negated = has(NEGATION_MARKERS) || NO_MAY_RE.is_match(&lower);
    if !negated && has(AMENDS_MARKERS) {
        RelationKind::Amends
    } else if !negated && has(EXTENDS_MARKERS) {
        RelationKind::Extends
    } else if has(CONFLICTS_MARKERS) {
        RelationKind::ConflictsWith
    } else {
        RelationKind::References
    }
}

static REFERENCE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?i:(article|regulation))s?\s+(\d+[A-Z]*)(?:\s*\(\s*([0-9A-Za-z]+)\s*\))?")
        .expect("reference pattern is valid")
});

/// A provision identifier cited in clause text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CitedReference {
    /// Canonical identifier, e.g. `Article 58`.
    pub id: String,
    /// Clause within the target, e.g. `2` in `Article 58(2)`.
    pub clause: Option<String>,
}

/// Extract every provision identifier cited in `text`, in order of appearance.
pub fn cited_references(text: &str) -> Vec<CitedReference> {
    REFERENCE_RE
        .captures_iter(text)
        .map(|caps| {
            let kind = if caps[1].eq_ignore_ascii_case("article") {
                "Article"
            } else {
                "Regulation"
            };
            CitedReference {
                id: format!("{kind} {}", &caps[2]),
                clause: caps.get(3).map(|m| m.as_str().to_string()),
            }
        })
        .collect()
}

/// A directed, typed relation between two provisions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceEdge {
    pub source: NodeIndex,
    pub target: NodeIndex,
    pub kind: RelationKind,
    /// Subsection of the source that establishes the relation.
    pub clause: String,
    /// Subsection of the target named by the citation, if any.
    pub target_clause: Option<String>,
}

/// Direct neighbours of one provision, each listed once in edge order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dependencies {
    /// Provisions this one cites.
    pub depends_on: Vec<NodeIndex>,
    /// Provisions citing this one.
    pub depended_by: Vec<NodeIndex>,
}

/// Provisions plus the typed edges between them. Read-only once built.
#[derive(Debug)]
pub struct ReferenceGraph<'a> {
    nodes: Vec<&'a Provision>,
    index: HashMap<&'a str, NodeIndex>,
    edges: Vec<ReferenceEdge>,
    dangling: Vec<Finding>,
}

impl<'a> ReferenceGraph<'a> {
    /// Build the graph from provision content.
    ///
    /// Fails only when a provision lacks a required structural field.
    /// Citations of unknown identifiers become `DanglingReference` findings.
    pub fn build(provisions: &'a [Provision]) -> Result<Self, EngineError> {
        for p in provisions {
            check_structure(p)?;
        }

        let mut nodes = Vec::with_capacity(provisions.len());
        let mut index = HashMap::with_capacity(provisions.len());
        for p in provisions {
            if index.contains_key(p.id.as_str()) {
                warn!(provision = %p.id, "duplicate provision id ignored");
                continue;
            }
            index.insert(p.id.as_str(), nodes.len());
            nodes.push(p);
        }

        let mut edges: Vec<ReferenceEdge> = Vec::new();
        let mut seen_edges: HashSet<(NodeIndex, NodeIndex, RelationKind, Option<String>)> =
            HashSet::new();
        let mut dangling = Vec::new();
        let mut seen_dangling: HashSet<(NodeIndex, String)> = HashSet::new();

        for (source, provision) in nodes.iter().enumerate() {
            for (clause_id, clause) in provision.clauses() {
                let cited = cited_references(clause);
                if cited.is_empty() {
                    continue;
                }
                let kind = classify_relation(clause);

                for reference in cited {
                    let Some(&target) = index.get(reference.id.as_str()) else {
                        if seen_dangling.insert((source, reference.id.clone())) {
                            warn!(
                                provision = %provision.id,
                                reference = %reference.id,
                                "dangling reference"
                            );
                            dangling.push(dangling_finding(provision, clause_id, &reference.id));
                        }
                        continue;
                    };
                    if target == source {
                        continue;
                    }
                    if !seen_edges.insert((source, target, kind, reference.clause.clone())) {
                        continue;
                    }
                    debug!(
                        source = %provision.id,
                        target = %reference.id,
                        kind = %kind,
                        clause = clause_id,
                        "edge"
                    );
                    edges.push(ReferenceEdge {
                        source,
                        target,
                        kind,
                        clause: clause_id.to_string(),
                        target_clause: reference.clause,
                    });
                }
            }
        }

        info!(
            provisions = nodes.len(),
            edges = edges.len(),
            dangling = dangling.len(),
            "built reference graph"
        );

        Ok(Self {
            nodes,
            index,
            edges,
            dangling,
        })
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, idx: NodeIndex) -> &'a Provision {
        self.nodes[idx]
    }

    pub fn nodes(&self) -> impl Iterator<Item = (NodeIndex, &'a Provision)> + '_ {
        self.nodes.iter().copied().enumerate()
    }

    pub fn index_of(&self, id: &str) -> Option<NodeIndex> {
        self.index.get(id).copied()
    }

    pub fn get(&self, id: &str) -> Option<&'a Provision> {
        self.index_of(id).map(|i| self.nodes[i])
    }

    pub fn edges(&self) -> &[ReferenceEdge] {
        &self.edges
    }

    pub fn edges_from(&self, idx: NodeIndex) -> impl Iterator<Item = &ReferenceEdge> {
        self.edges.iter().filter(move |e| e.source == idx)
    }

    pub fn edges_into(&self, idx: NodeIndex) -> impl Iterator<Item = &ReferenceEdge> {
        self.edges.iter().filter(move |e| e.target == idx)
    }

    pub fn dependencies(&self, idx: NodeIndex) -> Dependencies {
        let mut deps = Dependencies::default();
        for e in &self.edges {
            if e.source == idx && !deps.depends_on.contains(&e.target) {
                deps.depends_on.push(e.target);
            }
            if e.target == idx && !deps.depended_by.contains(&e.source) {
                deps.depended_by.push(e.source);
            }
        }
        deps
    }

    /// Findings for citations of identifiers outside the corpus.
    pub fn dangling_references(&self) -> &[Finding] {
        &self.dangling
    }

    /// Whether `source` has an edge of one of `kinds` to `target`.
    pub fn has_relation(&self, source: NodeIndex, target: NodeIndex, kinds: &[RelationKind]) -> bool {
        self.edges
            .iter()
            .any(|e| e.source == source && e.target == target && kinds.contains(&e.kind))
    }

    /// Whether an edge of one of `kinds` joins `a` and `b` in either direction.
    pub fn linked(&self, a: NodeIndex, b: NodeIndex, kinds: &[RelationKind]) -> bool {
        self.has_relation(a, b, kinds) || self.has_relation(b, a, kinds)
    }

    /// Nodes reachable from `from` along outgoing edges within `max_depth` hops,
    /// in breadth-first order. `from` itself is listed last, and only when a
    /// cycle leads back to it.
    pub fn reachable(&self, from: NodeIndex, max_depth: usize) -> Vec<NodeIndex> {
        let (order, cyclic) = self.bfs(from, max_depth, false);
        let mut out: Vec<NodeIndex> = order.into_iter().skip(1).collect();
        if cyclic {
            out.push(from);
        }
        out
    }

    /// `from` plus every node within `max_depth` hops ignoring edge direction.
    pub fn neighbourhood(&self, from: NodeIndex, max_depth: usize) -> Vec<NodeIndex> {
        self.bfs(from, max_depth, true).0
    }

    /// Breadth-first visit order starting at `from`, and whether a directed
    /// walk returned to `from`.
    fn bfs(&self, from: NodeIndex, max_depth: usize, undirected: bool) -> (Vec<NodeIndex>, bool) {
        let mut visited = HashSet::from([from]);
        let mut order = vec![from];
        let mut queue = VecDeque::from([(from, 0usize)]);
        let mut cyclic = false;

        while let Some((node, depth)) = queue.pop_front() {
            if depth >= max_depth {
                continue;
            }
            for edge in &self.edges {
                let next = if edge.source == node {
                    edge.target
                } else if undirected && edge.target == node {
                    edge.source
                } else {
                    continue;
                };
                if next == from && !undirected {
                    cyclic = true;
                }
                if visited.insert(next) {
                    order.push(next);
                    queue.push_back((next, depth + 1));
                }
            }
        }

        (order, cyclic)
    }

    /// Human-readable edge citation: `Regulation 143(i) -> Article 58(2) [amends]`.
    pub fn describe_edge(&self, edge: &ReferenceEdge) -> String {
        let source = self.nodes[edge.source];
        let target = self.nodes[edge.target];
        let target_cite = match &edge.target_clause {
            Some(c) => target.cite(c),
            None => target.id.clone(),
        };
        format!(
            "{} -> {} [{}]",
            source.cite(&edge.clause),
            target_cite,
            edge.kind
        )
    }

    /// Kind of a node, for specificity comparisons.
    pub fn kind_of(&self, idx: NodeIndex) -> ProvisionKind {
        self.nodes[idx].kind
    }
}

fn check_structure(p: &Provision) -> Result<(), EngineError> {
    let missing = if p.id.trim().is_empty() {
        Some("id")
    } else if p.text.is_none() {
        Some("text")
    } else if p.subsections.is_none() {
        Some("subsections")
    } else {
        None
    };
    match missing {
        Some(field) => Err(EngineError::MalformedProvision {
            provision: if p.id.trim().is_empty() {
                "<unnamed>".to_string()
            } else {
                p.id.clone()
            },
            field,
        }),
        None => Ok(()),
    }
}

fn dangling_finding(provision: &Provision, clause: &str, reference: &str) -> Finding {
    Finding::new(
        "dangling_reference",
        FindingKind::DanglingReference,
        Outcome::Indeterminate,
        format!(
            "{} cites {reference}, which is not in the corpus",
            provision.cite(clause)
        ),
    )
    .with_citations([provision.cite(clause), reference.to_string()])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::provision;

    #[test]
    fn classifies_relation_keywords() {
        assert_eq!(classify_relation("This Regulation modifies Article 58(2)"), RelationKind::Amends);
        assert_eq!(classify_relation("The period in Article 58 is extended"), RelationKind::Extends);
        assert_eq!(
            classify_relation("Notwithstanding Article 28, the receiver may"),
            RelationKind::ConflictsWith
        );
        assert_eq!(classify_relation("Subject to Article 16"), RelationKind::References);
    }

    #[test]
    fn negated_modification_only_references() {
        for clause in [
            "Article 27(1) may not be modified by any regulation",
            "This Part does not permit modification of Article 16",
            "No regulation made under this Act may amend Article 58",
            "Nothing in Regulation 143 extends Article 28",
        ] {
            assert_eq!(classify_relation(clause), RelationKind::References, "{clause}");
        }
        assert_eq!(
            classify_relation("Notwithstanding Article 28, the receiver shall not pay"),
            RelationKind::ConflictsWith
        );
    }

    #[test]
    fn prohibition_clause_is_not_an_amending_edge() {
        let ps = vec![
            provision("Article 27", &[("1", "x")]),
            provision("Article 30", &[("1", "Article 27(1) may not be modified by any regulation")]),
        ];
        let g = ReferenceGraph::build(&ps).unwrap();
        assert_eq!(g.edges().len(), 1);
        assert_eq!(g.edges()[0].kind, RelationKind::References);
    }

    #[test]
    fn extracts_cited_identifiers_with_clauses() {
        let refs = cited_references("as set out in Article 58(2) and regulation 143");
        assert_eq!(
            refs,
            vec![
                CitedReference { id: "Article 58".into(), clause: Some("2".into()) },
                CitedReference { id: "Regulation 143".into(), clause: None },
            ]
        );
    }

    #[test]
    fn mutual_references_terminate_with_one_edge_each() {
        let ps = vec![
            provision("Article 1", &[("1", "Subject to Article 2")]),
            provision("Article 2", &[("1", "As provided in Article 1")]),
        ];
        let g = ReferenceGraph::build(&ps).unwrap();
        assert_eq!(g.edges().len(), 2);
        assert!(g.has_relation(0, 1, &[RelationKind::References]));
        assert!(g.has_relation(1, 0, &[RelationKind::References]));
        assert_eq!(g.reachable(0, 8), vec![1, 0]);
    }

    #[test]
    fn dangling_reference_is_a_finding_not_an_edge() {
        let ps = vec![provision("Article 1", &[("1", "See Article 99 and Article 99(2)")])];
        let g = ReferenceGraph::build(&ps).unwrap();
        assert!(g.edges().is_empty());
        assert_eq!(g.dangling_references().len(), 1);
        let f = &g.dangling_references()[0];
        assert_eq!(f.kind, FindingKind::DanglingReference);
        assert_eq!(f.outcome, Outcome::Indeterminate);
        assert!(f.citations.contains(&"Article 99".to_string()));
    }

    #[test]
    fn self_references_are_skipped() {
        let ps = vec![provision("Article 5", &[("1", "Subsection (2) of Article 5 applies")])];
        let g = ReferenceGraph::build(&ps).unwrap();
        assert!(g.edges().is_empty());
        assert!(g.dangling_references().is_empty());
    }

    #[test]
    fn each_amended_clause_keeps_its_own_edge() {
        let ps = vec![
            provision(
                "Regulation 1",
                &[
                    ("a", "This modifies Article 1(2)"),
                    ("b", "This also amends Article 1(3)"),
                    ("c", "Read with Article 1"),
                    ("d", "Article 1(2) is further varied"),
                ],
            ),
            provision("Article 1", &[("1", "x")]),
        ];
        let g = ReferenceGraph::build(&ps).unwrap();
        assert_eq!(g.edges().len(), 3);
        let amends: Vec<(&str, Option<&str>)> = g
            .edges()
            .iter()
            .filter(|e| e.kind == RelationKind::Amends)
            .map(|e| (e.clause.as_str(), e.target_clause.as_deref()))
            .collect();
        assert_eq!(amends, vec![("a", Some("2")), ("b", Some("3"))]);
    }

    #[test]
    fn missing_subsections_is_malformed() {
        let mut p = provision("Article 7", &[]);
        p.subsections = None;
        let err = ReferenceGraph::build(std::slice::from_ref(&p)).unwrap_err();
        match err {
            EngineError::MalformedProvision { provision, field } => {
                assert_eq!(provision, "Article 7");
                assert_eq!(field, "subsections");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn missing_text_is_malformed() {
        let mut p = provision("Article 8", &[("1", "x")]);
        p.text = None;
        let err = ReferenceGraph::build(std::slice::from_ref(&p)).unwrap_err();
        assert!(err.to_string().contains("'text'"));
    }

    #[test]
    fn rebuild_is_identical() {
        let ps = vec![
            provision("Article 1", &[("1", "Article 2 and Article 3 apply"), ("2", "Article 9")]),
            provision("Article 2", &[("1", "This extends Article 3")]),
            provision("Article 3", &[("1", "Notwithstanding Article 1")]),
        ];
        let a = ReferenceGraph::build(&ps).unwrap();
        let b = ReferenceGraph::build(&ps).unwrap();
        assert_eq!(a.edges(), b.edges());
        assert_eq!(a.dangling_references(), b.dangling_references());
    }

    #[test]
    fn amendment_cycle_traversal_is_bounded() {
        let ps = vec![
            provision("Regulation 1", &[("1", "amends Regulation 2")]),
            provision("Regulation 2", &[("1", "amends Regulation 3")]),
            provision("Regulation 3", &[("1", "amends Regulation 1")]),
        ];
        let g = ReferenceGraph::build(&ps).unwrap();
        assert_eq!(g.reachable(0, 1), vec![1]);
        assert_eq!(g.reachable(0, 10), vec![1, 2, 0]);
        assert_eq!(g.neighbourhood(1, 1), vec![1, 0, 2]);
    }

    #[test]
    fn dependencies_list_each_neighbour_once() {
        let ps = vec![
            provision("Article 103", &[("1", "Regulations under Regulation 143 apply")]),
            provision(
                "Regulation 143",
                &[("i", "The period in Article 58(2) is extended"), ("ii", "Article 58 also applies")],
            ),
            provision("Article 58", &[("2", "four months")]),
        ];
        let g = ReferenceGraph::build(&ps).unwrap();
        let deps = g.dependencies(1);
        assert_eq!(deps.depends_on, vec![2]);
        assert_eq!(deps.depended_by, vec![0]);
        assert_eq!(g.dependencies(2).depended_by, vec![1]);
        assert!(g.dependencies(2).depends_on.is_empty());
    }

    #[test]
    fn describes_edges_with_clauses() {
        let ps = vec![
            provision("Regulation 143", &[("i", "The period in Article 58(2) is extended")]),
            provision("Article 58", &[("2", "four months")]),
        ];
        let g = ReferenceGraph::build(&ps).unwrap();
        assert_eq!(
            g.describe_edge(&g.edges()[0]),
            "Regulation 143(i) -> Article 58(2) [extends]"
        );
    }
}
