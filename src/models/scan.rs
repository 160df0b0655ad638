//! Scan-level description used by the host to register and deduplicate uploads.

use chrono::NaiveDateTime;
use serde::Serialize;

pub const SCAN_LABEL: &str = "Black Duck Hub Vulnerability Import";

#[derive(Debug, Clone, Serialize)]
pub struct ScanInfo {
    /// MD5 of the whole uploaded report.
    pub guid: String,
    /// Scan timestamp from the first data row, if present and parseable.
    pub scan_date: Option<NaiveDateTime>,
    pub label: String,
    pub engine_type: String,
}
