//! Provision records and the caller-supplied claim under test.
//!
//! Provisions are immutable once loaded. Everything downstream borrows them.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

/// Whether a provision is a primary-law article or a subordinate regulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProvisionKind {
    Article,
    Regulation,
}

impl ProvisionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Article => "article",
            Self::Regulation => "regulation",
        }
    }
}

/// A single statutory article or regulation, structured into clauses.
///
/// `text` and `subsections` are the required structural fields. They are
/// optional here so that a record missing one can still be loaded and then
/// rejected by the graph builder with a precise error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Provision {
    /// Identifier such as `Article 103` or `Regulation 143`.
    pub id: String,
    pub kind: ProvisionKind,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub text: Option<String>,
    /// Subsection id (e.g. `2`, `i`) → clause text.
    #[serde(default)]
    pub subsections: Option<BTreeMap<String, String>>,
    #[serde(default)]
    pub deadlines: Vec<Deadline>,
    /// Subsection ids marked "may not be modified".
    #[serde(default)]
    pub restrictions: BTreeSet<String>,
}

impl Provision {
    /// Clause text for a subsection, if the provision has subsections at all.
    pub fn clause(&self, id: &str) -> Option<&str> {
        self.subsections
            .as_ref()
            .and_then(|s| s.get(id))
            .map(String::as_str)
    }

    /// Iterate `(subsection id, clause text)` in subsection order.
    pub fn clauses(&self) -> impl Iterator<Item = (&str, &str)> {
        self.subsections
            .iter()
            .flat_map(|s| s.iter().map(|(k, v)| (k.as_str(), v.as_str())))
    }

    /// Citation form of one clause: `Article 103(2)`.
    pub fn cite(&self, clause: &str) -> String {
        format!("{}({})", self.id, clause)
    }
}

/// Calendar unit of a deadline duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DurationUnit {
    Days,
    Weeks,
    Months,
    Years,
}

impl DurationUnit {
    /// Fixed calendar convention: 7-day week, 30-day month, 365-day year.
    pub fn days(&self) -> u64 {
        match self {
            Self::Days => 1,
            Self::Weeks => 7,
            Self::Months => 30,
            Self::Years => 365,
        }
    }
}

impl fmt::Display for DurationUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Days => "days",
            Self::Weeks => "weeks",
            Self::Months => "months",
            Self::Years => "years",
        };
        f.write_str(s)
    }
}

/// A deadline extracted from a provision: `obligation` is due `duration`
/// units after `trigger`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deadline {
    pub trigger: String,
    pub obligation: String,
    pub duration: u32,
    pub unit: DurationUnit,
    /// Subsection asserting the deadline.
    #[serde(default)]
    pub clause: Option<String>,
    /// Obligation that must be completed before this one.
    #[serde(default)]
    pub not_before: Option<String>,
}

impl Deadline {
    pub fn days(&self) -> u64 {
        u64::from(self.duration) * self.unit.days()
    }
}

/// The interpretation under test, as supplied by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Claim {
    /// Provision the claim is about.
    pub subject: String,
    /// Asserted obligation text.
    pub obligation: String,
    /// Asserted trigger conditions.
    #[serde(default)]
    pub conditions: Vec<String>,
}

/// A case-law record bearing on the claim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrecedentRecord {
    pub citation: String,
    /// Whether the decision supports the claim.
    pub supports: bool,
    #[serde(default = "default_precedent_weight")]
    pub weight: f64,
}

fn default_precedent_weight() -> f64 {
    1.0
}
