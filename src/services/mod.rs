//! Import services: value coercion, identity, classification, scan
//! description and the ingestion pipeline tying them together.

pub mod classifier;
pub mod coercion;
pub mod fingerprint;
pub mod ingestion;
pub mod scan;
