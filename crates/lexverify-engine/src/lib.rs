//! Verification engine: builds the cross-reference graph over a provision
//! corpus, runs the logic battery and timeline analysis, applies the
//! interpretive principles, and aggregates everything into a [`Verdict`].
//!
//! [`Verdict`]: lexverify_core::Verdict

mod error;
pub mod fact_check;
pub mod graph;
pub mod logic;
pub mod pipeline;
pub mod reasoning;
mod text;
pub mod timeline;

#[cfg(test)]
mod fixtures;

pub use error::EngineError;
pub use fact_check::{FactChecker, component_status, confidence_category, confidence_level};
pub use graph::{Dependencies, NodeIndex, ReferenceEdge, ReferenceGraph, RelationKind, classify_relation};
pub use logic::{LogicReport, LogicValidator};
pub use pipeline::Engine;
pub use reasoning::{ReasoningEngine, ReasoningReport};
pub use timeline::{TimelineAnalyzer, TimelineEvent, TimelineReport};
