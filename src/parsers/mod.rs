//! Scanner report parsers.
//!
//! `schema` holds the versioned column tables for each report layout;
//! `blackduck` streams a CSV report into typed `Issue` records.

pub mod blackduck;
pub mod schema;

pub use blackduck::BlackDuckCsvParser;
pub use schema::{Schema, SchemaVariant};
