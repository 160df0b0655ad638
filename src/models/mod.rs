//! Domain records: parsed issues, emitted vulnerabilities, and scan descriptions.

pub mod issue;
pub mod scan;
pub mod vulnerability;
