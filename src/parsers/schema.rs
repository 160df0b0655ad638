//! Versioned column tables for the Black Duck Hub CSV report layouts.
//!
//! Each layout is a declarative column -> field table. Tables are checked
//! when loaded; header rows are bound to fields by column name once per
//! parse.

use std::collections::HashSet;
use std::str::FromStr;

use csv::StringRecord;
use serde::{Deserialize, Serialize};

use crate::errors::ImportError;
use crate::models::issue::{FieldKind, Issue, IssueField};
use crate::services::coercion::{self, DateConvention};
use crate::services::fingerprint::IdentityPolicy;

/// One report column and the issue field it fills.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    pub name: &'static str,
    pub field: IssueField,
}

const fn col(name: &'static str, field: IssueField) -> Column {
    Column { name, field }
}

use IssueField as F;

const SECURITY_V1: &[Column] = &[
    col("Project id", F::ProjectId),
    col("Version id", F::VersionId),
    col("Channel version id", F::ChannelVersionId),
    col("Project name", F::ProjectName),
    col("Version", F::ProjectVersion),
    col("Channel version origin", F::ChannelVersionOrigin),
    col("Channel version origin id", F::ChannelVersionOriginId),
    col("Channel version origin name", F::ChannelVersionOriginName),
    col("Vulnerability id", F::VulnerabilityId),
    col("Description", F::Description),
    col("Published on", F::PublishedOn),
    col("Updated on", F::UpdatedOn),
    col("Base Score", F::BaseScore),
    col("Exploitability", F::Exploitability),
    col("Impact", F::Impact),
    col("Vulnerability source", F::VulnerabilitySource),
    col("Remediation status", F::RemediationStatus),
    col("Remediation target date", F::RemediationTargetDate),
    col("Remediation actual date", F::RemediationActualDate),
    col("Remediation comment", F::RemediationComment),
    col("URL", F::Url),
];

const SECURITY_V2: &[Column] = &[
    col("Project name", F::ProjectName),
    col("Project version", F::ProjectVersion),
    col("Project id", F::ProjectId),
    col("Version id", F::VersionId),
    col("Channel version id", F::ChannelVersionId),
    col("Component name", F::ComponentName),
    col("Version", F::ComponentVersion),
    col("Channel version origin", F::ChannelVersionOrigin),
    col("Channel version origin id", F::ChannelVersionOriginId),
    col("Channel version origin name", F::ChannelVersionOriginName),
    col("Vulnerability id", F::VulnerabilityId),
    col("Description", F::Description),
    col("Published on", F::PublishedOn),
    col("Updated on", F::UpdatedOn),
    col("Base Score", F::BaseScore),
    col("Exploitability", F::Exploitability),
    col("Impact", F::Impact),
    col("Vulnerability source", F::VulnerabilitySource),
    col("Hub Vulnerability URL", F::HubVulnerabilityUrl),
    col("Remediation status", F::RemediationStatus),
    col("Remediation target date", F::RemediationTargetDate),
    col("Remediation actual date", F::RemediationActualDate),
    col("Remediation comment", F::RemediationComment),
    col("URL", F::Url),
    col("Severity", F::Severity),
    col("Scan date", F::ScanDate),
    col("Upgrade version", F::UpgradeVersion),
    col("Upgrade released on", F::UpgradeReleasedOn),
    col("Latest version", F::LatestVersion),
    col("Latest released on", F::LatestReleasedOn),
];

const OPERATIONAL_V1: &[Column] = &[
    col("Project name", F::ProjectName),
    col("Project version", F::ProjectVersion),
    col("Component name", F::ComponentName),
    col("Component Version", F::ComponentVersion),
    col("Component id", F::ComponentId),
    col("Component Version id", F::ComponentVersionId),
    col("Released On", F::ReleasedOn),
    col("Newer Released Count", F::NewerReleasedCount),
    col("Trending", F::Trending),
    col("Commit Count Last 12 Month", F::CommitCountLast12Month),
    col("Contributor Count Last 12 Month", F::ContributorCountLast12Month),
    col("URL", F::Url),
    col("Severity", F::Severity),
    col("Scan date", F::ScanDate),
    col("Upgrade version", F::UpgradeVersion),
    col("Upgrade released on", F::UpgradeReleasedOn),
    col("Latest version", F::LatestVersion),
    col("Latest released on", F::LatestReleasedOn),
];

/// Report layout observed across Hub releases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchemaVariant {
    /// Legacy 21-column security risk report.
    SecurityV1,
    /// 30-column security risk report with component, severity, scan date
    /// and upgrade guidance columns.
    SecurityV2,
    /// 18-column operational risk report.
    OperationalV1,
}

impl SchemaVariant {
    pub const ALL: [SchemaVariant; 3] = [Self::SecurityV1, Self::SecurityV2, Self::OperationalV1];

    /// Header count a report of this layout must carry.
    pub fn expected_columns(self) -> usize {
        match self {
            Self::SecurityV1 => 21,
            Self::SecurityV2 => 30,
            Self::OperationalV1 => 18,
        }
    }

    fn columns(self) -> &'static [Column] {
        match self {
            Self::SecurityV1 => SECURITY_V1,
            Self::SecurityV2 => SECURITY_V2,
            Self::OperationalV1 => OPERATIONAL_V1,
        }
    }

    pub fn default_date_convention(self) -> DateConvention {
        match self {
            Self::SecurityV1 => DateConvention::SlashInferred,
            Self::SecurityV2 | Self::OperationalV1 => DateConvention::Iso,
        }
    }

    pub fn default_identity_policy(self) -> IdentityPolicy {
        match self {
            Self::SecurityV1 => IdentityPolicy::ProjectVulnBased,
            Self::SecurityV2 => IdentityPolicy::ComponentBased,
            Self::OperationalV1 => IdentityPolicy::ComponentVersion,
        }
    }

    fn name(self) -> &'static str {
        match self {
            Self::SecurityV1 => "security_v1",
            Self::SecurityV2 => "security_v2",
            Self::OperationalV1 => "operational_v1",
        }
    }
}

impl std::fmt::Display for SchemaVariant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SchemaVariant {
    type Err = ImportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|variant| variant.name() == wanted)
            .ok_or_else(|| {
                ImportError::Config(format!(
                    "unknown schema '{wanted}' (expected security_v1, security_v2 or operational_v1)"
                ))
            })
    }
}

/// A loaded, checked column table.
#[derive(Debug, Clone, Copy)]
pub struct Schema {
    variant: SchemaVariant,
    expected_columns: usize,
    columns: &'static [Column],
}

impl Schema {
    /// Load the table for `variant`, failing if it drifted from its declared shape.
    pub fn load(variant: SchemaVariant) -> Result<Self, ImportError> {
        Self::from_table(variant, variant.expected_columns(), variant.columns())
    }

    pub(crate) fn from_table(
        variant: SchemaVariant,
        expected_columns: usize,
        columns: &'static [Column],
    ) -> Result<Self, ImportError> {
        if columns.len() != expected_columns {
            return Err(ImportError::Config(format!(
                "schema {variant} declares {expected_columns} columns but maps {}",
                columns.len()
            )));
        }
        let mut names = HashSet::new();
        let mut fields = HashSet::new();
        for column in columns {
            if !names.insert(column.name.to_lowercase()) {
                return Err(ImportError::Config(format!(
                    "schema {variant} lists column '{}' twice",
                    column.name
                )));
            }
            if !fields.insert(column.field) {
                return Err(ImportError::Config(format!(
                    "schema {variant} maps field {:?} twice",
                    column.field
                )));
            }
        }
        Ok(Self {
            variant,
            expected_columns,
            columns,
        })
    }

    pub fn variant(&self) -> SchemaVariant {
        self.variant
    }

    pub fn expected_columns(&self) -> usize {
        self.expected_columns
    }

    pub fn columns(&self) -> &'static [Column] {
        self.columns
    }

    pub fn maps(&self, field: IssueField) -> bool {
        self.column_for(field).is_some()
    }

    pub fn column_for(&self, field: IssueField) -> Option<&'static Column> {
        self.columns.iter().find(|c| c.field == field)
    }

    /// Check a parsed header row against the declared column count.
    pub fn validate_headers(&self, headers: &StringRecord) -> Result<(), ImportError> {
        if headers.is_empty() {
            tracing::error!(schema = %self.variant, "Empty headers");
            return Err(ImportError::InvalidCsv);
        }
        if headers.len() != self.expected_columns {
            tracing::error!(
                schema = %self.variant,
                header_count = headers.len(),
                expected = self.expected_columns,
                "Header count mismatch"
            );
            return Err(ImportError::InvalidCsv);
        }
        Ok(())
    }

    /// Resolve header positions for every mapped column.
    pub fn bind(&self, headers: &StringRecord) -> HeaderBinding {
        let mut slots = Vec::with_capacity(self.columns.len());
        for column in self.columns {
            match headers
                .iter()
                .position(|h| h.trim().eq_ignore_ascii_case(column.name))
            {
                Some(index) => slots.push((index, column.field)),
                None => tracing::warn!(
                    schema = %self.variant,
                    column = column.name,
                    "Report is missing a mapped column; field will be empty"
                ),
            }
        }
        HeaderBinding { slots }
    }
}

/// Header positions resolved for one parse.
#[derive(Debug, Clone)]
pub struct HeaderBinding {
    slots: Vec<(usize, IssueField)>,
}

impl HeaderBinding {
    pub fn bound_fields(&self) -> usize {
        self.slots.len()
    }

    /// Build an issue from one data row. Short rows leave trailing fields empty.
    pub fn issue_from(&self, record: &StringRecord) -> Issue {
        let mut issue = Issue::default();
        for &(index, field) in &self.slots {
            let Some(cell) = record.get(index).map(str::trim).filter(|c| !c.is_empty()) else {
                continue;
            };
            match field.kind() {
                FieldKind::Decimal => issue.set_decimal(field, coercion::parse_decimal(cell)),
                FieldKind::Text | FieldKind::Date | FieldKind::Timestamp => {
                    issue.set_text(field, Some(cell.to_string()))
                }
            }
        }
        issue
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header_record(schema: &Schema) -> StringRecord {
        StringRecord::from(schema.columns().iter().map(|c| c.name).collect::<Vec<_>>())
    }

    #[test]
    fn all_variants_load() {
        for variant in SchemaVariant::ALL {
            let schema = Schema::load(variant).unwrap();
            assert_eq!(schema.columns().len(), variant.expected_columns());
        }
    }

    #[test]
    fn drifted_table_is_rejected() {
        let result = Schema::from_table(SchemaVariant::SecurityV1, 22, SECURITY_V1);
        assert!(matches!(result, Err(ImportError::Config(_))));
    }

    #[test]
    fn duplicate_field_mapping_is_rejected() {
        const DUPLICATE: &[Column] = &[
            col("Project name", F::ProjectName),
            col("Project title", F::ProjectName),
        ];
        let result = Schema::from_table(SchemaVariant::SecurityV1, 2, DUPLICATE);
        assert!(matches!(result, Err(ImportError::Config(msg)) if msg.contains("twice")));
    }

    #[test]
    fn version_column_binds_per_layout() {
        let v1 = Schema::load(SchemaVariant::SecurityV1).unwrap();
        let v2 = Schema::load(SchemaVariant::SecurityV2).unwrap();
        assert_eq!(v1.column_for(F::ProjectVersion).unwrap().name, "Version");
        assert_eq!(v2.column_for(F::ComponentVersion).unwrap().name, "Version");
        assert_eq!(v2.column_for(F::ProjectVersion).unwrap().name, "Project version");
    }

    #[test]
    fn scan_date_column_presence() {
        assert!(!Schema::load(SchemaVariant::SecurityV1).unwrap().maps(F::ScanDate));
        assert!(Schema::load(SchemaVariant::SecurityV2).unwrap().maps(F::ScanDate));
        assert!(Schema::load(SchemaVariant::OperationalV1).unwrap().maps(F::ScanDate));
    }

    #[test]
    fn header_count_validation() {
        let schema = Schema::load(SchemaVariant::SecurityV1).unwrap();
        assert!(schema.validate_headers(&header_record(&schema)).is_ok());
        assert!(matches!(
            schema.validate_headers(&StringRecord::from(vec!["junk"])),
            Err(ImportError::InvalidCsv)
        ));
        assert!(matches!(
            schema.validate_headers(&StringRecord::new()),
            Err(ImportError::InvalidCsv)
        ));
    }

    #[test]
    fn binding_follows_header_order() {
        let schema = Schema::load(SchemaVariant::SecurityV1).unwrap();
        let mut names: Vec<&str> = schema.columns().iter().map(|c| c.name).collect();
        names.reverse();
        let binding = schema.bind(&StringRecord::from(names.clone()));
        assert_eq!(binding.bound_fields(), 21);

        let mut cells = vec![""; 21];
        cells[names.iter().position(|n| *n == "Project name").unwrap()] = "dpkg";
        cells[names.iter().position(|n| *n == "Base Score").unwrap()] = "5.1";
        let issue = binding.issue_from(&StringRecord::from(cells));
        assert_eq!(issue.project_name.as_deref(), Some("dpkg"));
        assert_eq!(issue.base_score, Some(5.1));
        assert_eq!(issue.impact, None);
    }

    #[test]
    fn binding_tolerates_short_rows_and_missing_columns() {
        let schema = Schema::load(SchemaVariant::SecurityV1).unwrap();
        let mut names: Vec<&str> = schema.columns().iter().map(|c| c.name).collect();
        names[20] = "Link";
        let binding = schema.bind(&StringRecord::from(names));
        assert_eq!(binding.bound_fields(), 20);

        let issue = binding.issue_from(&StringRecord::from(vec!["p-1", "v-1"]));
        assert_eq!(issue.project_id.as_deref(), Some("p-1"));
        assert_eq!(issue.version_id.as_deref(), Some("v-1"));
        assert_eq!(issue.url, None);
    }

    #[test]
    fn schema_variant_from_str() {
        assert_eq!(
            "security_v2".parse::<SchemaVariant>().unwrap(),
            SchemaVariant::SecurityV2
        );
        assert_eq!(
            " Operational_V1 ".parse::<SchemaVariant>().unwrap(),
            SchemaVariant::OperationalV1
        );
        assert!("license".parse::<SchemaVariant>().is_err());
        assert_eq!(SchemaVariant::SecurityV1.to_string(), "security_v1");
    }
}
