//! Vulnerability record handed to the host platform for each classified issue.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::models::issue::IssueField;

/// Analyzer type reported for every imported issue.
pub const ANALYZER_TYPE: &str = "pentest";

/// Category reported for every imported issue.
pub const ISSUE_CATEGORY: &str = "3rd Party Component";

pub const ENGINE_TYPE: &str = "BLACKDUCK_ENGINE_TYPE";

pub const HIGH_LIKELIHOOD: f32 = 5.0;

pub const HIGH_ACCURACY: f32 = 5.0;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Priority {
    Critical,
    High,
    Medium,
    Low,
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Critical => write!(f, "Critical"),
            Self::High => write!(f, "High"),
            Self::Medium => write!(f, "Medium"),
            Self::Low => write!(f, "Low"),
        }
    }
}

/// Typed, nullable attribute value.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum AttributeValue {
    Text(Option<String>),
    Decimal(Option<f64>),
    Date(Option<NaiveDate>),
}

/// Fully populated vulnerability record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vulnerability {
    pub instance_id: String,
    pub analyzer: String,
    pub category: String,
    pub sub_category: String,
    pub file_name: String,
    pub engine_type: String,
    pub priority: Priority,
    pub confidence: f32,
    pub likelihood: f32,
    pub accuracy: f32,
    pub impact: f32,
    pub severity: f32,
    pub attributes: BTreeMap<IssueField, AttributeValue>,
}

impl Vulnerability {
    pub fn attribute(&self, key: IssueField) -> Option<&AttributeValue> {
        self.attributes.get(&key)
    }
}

/// Builder started per issue and consumed by [`VulnerabilityBuilder::complete`].
///
/// Standard attributes start at the values shared by every imported issue;
/// priority starts at `Critical`.
#[derive(Debug)]
pub struct VulnerabilityBuilder {
    record: Vulnerability,
}

impl VulnerabilityBuilder {
    pub fn start(instance_id: impl Into<String>) -> Self {
        Self {
            record: Vulnerability {
                instance_id: instance_id.into(),
                analyzer: ANALYZER_TYPE.to_string(),
                category: ISSUE_CATEGORY.to_string(),
                sub_category: String::new(),
                file_name: String::new(),
                engine_type: ENGINE_TYPE.to_string(),
                priority: Priority::Critical,
                confidence: 0.0,
                likelihood: HIGH_LIKELIHOOD,
                accuracy: HIGH_ACCURACY,
                impact: 0.0,
                severity: 0.0,
                attributes: BTreeMap::new(),
            },
        }
    }

    pub fn file_name(mut self, file_name: impl Into<String>) -> Self {
        self.record.file_name = file_name.into();
        self
    }

    pub fn priority(mut self, priority: Priority) -> Self {
        self.record.priority = priority;
        self
    }

    pub fn confidence(mut self, confidence: f32) -> Self {
        self.record.confidence = confidence;
        self
    }

    pub fn impact(mut self, impact: f32) -> Self {
        self.record.impact = impact;
        self
    }

    pub fn severity(mut self, severity: f32) -> Self {
        self.record.severity = severity;
        self
    }

    pub fn attribute(mut self, key: IssueField, value: AttributeValue) -> Self {
        self.record.attributes.insert(key, value);
        self
    }

    /// Finalize the record. The builder is consumed.
    pub fn complete(self) -> Vulnerability {
        self.record
    }
}
