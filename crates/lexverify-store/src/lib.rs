//! Provision store: loads provisions, claims and precedent records from JSON
//! files and hands the engine plain values.

mod error;
mod json;

pub use error::StoreError;
pub use json::JsonStore;
