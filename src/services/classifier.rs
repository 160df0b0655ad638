//! Maps parsed issues onto vulnerability records.
//!
//! Assigns identity, priority and scores, and echoes every field the active
//! schema maps into the attribute table. Date cells are converted here, not
//! at parse time.

use crate::models::issue::{FieldKind, Issue, IssueField};
use crate::models::vulnerability::{AttributeValue, Priority, Vulnerability, VulnerabilityBuilder};
use crate::parsers::schema::Schema;
use crate::services::coercion::{self, DateConvention};
use crate::services::fingerprint::IdentityPolicy;

/// Upper bound of the CVSS-style scores carried by the report.
const MAX_SCORE: f64 = 10.0;

/// Severity label -> priority table.
///
/// Labels are matched exactly. A missing or unrecognized label, including
/// a differently cased one, is always `Critical`.
#[derive(Debug, Clone)]
pub struct SeverityPolicy {
    table: Vec<(String, Priority)>,
}

impl Default for SeverityPolicy {
    fn default() -> Self {
        Self::with_table([
            ("HIGH", Priority::High),
            ("MEDIUM", Priority::Medium),
            ("LOW", Priority::Low),
        ])
    }
}

impl SeverityPolicy {
    pub fn with_table<'a>(entries: impl IntoIterator<Item = (&'a str, Priority)>) -> Self {
        Self {
            table: entries
                .into_iter()
                .map(|(label, priority)| (label.to_string(), priority))
                .collect(),
        }
    }

    pub fn classify(&self, severity: Option<&str>) -> Priority {
        let Some(label) = severity else {
            return Priority::Critical;
        };
        self.table
            .iter()
            .find(|(known, _)| known == label)
            .map(|(_, priority)| *priority)
            .unwrap_or(Priority::Critical)
    }
}

/// Turns issues of one schema into vulnerability records.
#[derive(Debug, Clone)]
pub struct Classifier {
    schema: Schema,
    date_convention: DateConvention,
    identity_policy: IdentityPolicy,
    severity_policy: SeverityPolicy,
}

impl Classifier {
    pub fn new(
        schema: Schema,
        date_convention: DateConvention,
        identity_policy: IdentityPolicy,
        severity_policy: SeverityPolicy,
    ) -> Self {
        Self {
            schema,
            date_convention,
            identity_policy,
            severity_policy,
        }
    }

    /// Build the vulnerability record for one issue.
    pub fn classify(&self, issue: &Issue) -> Vulnerability {
        let instance_id = issue.identity(&self.identity_policy);
        tracing::debug!(instance_id, "Building vulnerability");

        let mut builder = VulnerabilityBuilder::start(instance_id)
            .file_name(issue.file_name())
            .priority(self.severity_policy.classify(issue.severity.as_deref()))
            .confidence(score(IssueField::BaseScore, issue.base_score))
            .impact(score(IssueField::Impact, issue.impact))
            .severity(score(IssueField::Exploitability, issue.exploitability));

        for column in self.schema.columns() {
            builder = builder.attribute(column.field, self.attribute_value(issue, column.field));
        }

        builder.complete()
    }

    fn attribute_value(&self, issue: &Issue, field: IssueField) -> AttributeValue {
        match field.kind() {
            FieldKind::Text => AttributeValue::Text(issue.text(field).map(str::to_string)),
            FieldKind::Decimal => AttributeValue::Decimal(issue.decimal(field)),
            FieldKind::Date => {
                AttributeValue::Date(coercion::parse_date(issue.text(field), self.date_convention))
            }
            FieldKind::Timestamp => AttributeValue::Date(coercion::parse_date(
                issue.text(field),
                DateConvention::QuotedTimestamp,
            )),
        }
    }
}

/// Numeric score for the record: absent is zero, out-of-range is clamped.
fn score(field: IssueField, value: Option<f64>) -> f32 {
    let Some(value) = value else {
        return 0.0;
    };
    if !value.is_finite() {
        tracing::warn!(?field, value, "Score is not a finite number; using 0");
        return 0.0;
    }
    if !(0.0..=MAX_SCORE).contains(&value) {
        tracing::warn!(?field, value, "Score outside 0-10; clamping");
    }
    value.clamp(0.0, MAX_SCORE) as f32
}
