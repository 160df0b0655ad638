//! Parsed report row and the catalogue of fields a report column can bind to.

use std::cell::OnceCell;

use serde::{Deserialize, Serialize};

use crate::services::fingerprint::{self, IdentityPolicy};

// -- Field catalogue --

/// Canonical issue attribute a report column binds to.
///
/// Serialized names double as the stable attribute keys of emitted
/// vulnerability records.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IssueField {
    ProjectId,
    ProjectName,
    ProjectVersion,
    VersionId,
    ChannelVersionId,
    ComponentId,
    ComponentName,
    ComponentVersion,
    ComponentVersionId,
    ChannelVersionOrigin,
    ChannelVersionOriginId,
    ChannelVersionOriginName,
    VulnerabilityId,
    Description,
    PublishedOn,
    UpdatedOn,
    BaseScore,
    Exploitability,
    Impact,
    VulnerabilitySource,
    HubVulnerabilityUrl,
    RemediationStatus,
    RemediationTargetDate,
    RemediationActualDate,
    RemediationComment,
    Url,
    Severity,
    ScanDate,
    ReleasedOn,
    NewerReleasedCount,
    Trending,
    #[serde(rename = "COMMIT_COUNT_LAST_12_MONTH")]
    CommitCountLast12Month,
    #[serde(rename = "CONTRIBUTOR_COUNT_LAST_12_MONTH")]
    ContributorCountLast12Month,
    UpgradeVersion,
    UpgradeReleasedOn,
    LatestVersion,
    LatestReleasedOn,
}

/// How a field's raw cell is typed once it leaves the parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Decimal,
    /// Calendar date, kept as text until emission.
    Date,
    /// Scan timestamp, kept as text until emission.
    Timestamp,
}

impl IssueField {
    pub fn kind(self) -> FieldKind {
        match self {
            Self::BaseScore | Self::Exploitability | Self::Impact => FieldKind::Decimal,
            Self::PublishedOn
            | Self::UpdatedOn
            | Self::RemediationTargetDate
            | Self::RemediationActualDate
            | Self::ReleasedOn
            | Self::UpgradeReleasedOn
            | Self::LatestReleasedOn => FieldKind::Date,
            Self::ScanDate => FieldKind::Timestamp,
            _ => FieldKind::Text,
        }
    }
}

// -- Issue --

/// One report row, typed.
///
/// Scores are coerced at parse time; dates stay as the raw cell text and
/// are only converted when the issue is classified.
///
/// The cached identity is private to this crate, so callers outside it
/// start from `Issue::default()` and assign the public fields.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Issue {
    pub project_id: Option<String>,
    pub project_name: Option<String>,
    pub project_version: Option<String>,
    pub version_id: Option<String>,
    pub channel_version_id: Option<String>,
    pub component_id: Option<String>,
    pub component_name: Option<String>,
    pub component_version: Option<String>,
    pub component_version_id: Option<String>,
    pub channel_version_origin: Option<String>,
    pub channel_version_origin_id: Option<String>,
    pub channel_version_origin_name: Option<String>,
    pub vulnerability_id: Option<String>,
    pub description: Option<String>,
    pub published_on: Option<String>,
    pub updated_on: Option<String>,
    pub base_score: Option<f64>,
    pub exploitability: Option<f64>,
    pub impact: Option<f64>,
    pub vulnerability_source: Option<String>,
    pub hub_vulnerability_url: Option<String>,
    pub remediation_status: Option<String>,
    pub remediation_target_date: Option<String>,
    pub remediation_actual_date: Option<String>,
    pub remediation_comment: Option<String>,
    pub url: Option<String>,
    pub severity: Option<String>,
    pub scan_date: Option<String>,
    pub released_on: Option<String>,
    pub newer_released_count: Option<String>,
    pub trending: Option<String>,
    pub commit_count_last_12_month: Option<String>,
    pub contributor_count_last_12_month: Option<String>,
    pub upgrade_version: Option<String>,
    pub upgrade_released_on: Option<String>,
    pub latest_version: Option<String>,
    pub latest_released_on: Option<String>,
    #[serde(skip)]
    pub(crate) identity: OnceCell<String>,
}

impl Issue {
    /// Raw text of a non-decimal field.
    pub fn text(&self, field: IssueField) -> Option<&str> {
        self.text_slot(field).and_then(|slot| slot.as_deref())
    }

    /// Coerced value of a decimal field.
    pub fn decimal(&self, field: IssueField) -> Option<f64> {
        match field {
            IssueField::BaseScore => self.base_score,
            IssueField::Exploitability => self.exploitability,
            IssueField::Impact => self.impact,
            _ => None,
        }
    }

    pub fn set_text(&mut self, field: IssueField, value: Option<String>) {
        if let Some(slot) = self.text_slot_mut(field) {
            *slot = value;
        }
    }

    pub fn set_decimal(&mut self, field: IssueField, value: Option<f64>) {
        match field {
            IssueField::BaseScore => self.base_score = value,
            IssueField::Exploitability => self.exploitability = value,
            IssueField::Impact => self.impact = value,
            _ => {}
        }
    }

    /// Stable identity under `policy`, derived on first call and cached.
    ///
    /// An issue is classified under a single policy; later calls return the
    /// cached value regardless of the policy passed.
    pub fn identity(&self, policy: &IdentityPolicy) -> &str {
        self.identity
            .get_or_init(|| fingerprint::derive_identity(self, policy))
    }

    /// Location label: `component:version` when a component is present,
    /// `project:version` otherwise.
    pub fn file_name(&self) -> String {
        match &self.component_name {
            Some(component) => format!(
                "{component}:{}",
                self.component_version.as_deref().unwrap_or_default()
            ),
            None => format!(
                "{}:{}",
                self.project_name.as_deref().unwrap_or_default(),
                self.project_version.as_deref().unwrap_or_default()
            ),
        }
    }

    fn text_slot(&self, field: IssueField) -> Option<&Option<String>> {
        use IssueField as F;
        let slot = match field {
            F::ProjectId => &self.project_id,
            F::ProjectName => &self.project_name,
            F::ProjectVersion => &self.project_version,
            F::VersionId => &self.version_id,
            F::ChannelVersionId => &self.channel_version_id,
            F::ComponentId => &self.component_id,
            F::ComponentName => &self.component_name,
            F::ComponentVersion => &self.component_version,
            F::ComponentVersionId => &self.component_version_id,
            F::ChannelVersionOrigin => &self.channel_version_origin,
            F::ChannelVersionOriginId => &self.channel_version_origin_id,
            F::ChannelVersionOriginName => &self.channel_version_origin_name,
            F::VulnerabilityId => &self.vulnerability_id,
            F::Description => &self.description,
            F::PublishedOn => &self.published_on,
            F::UpdatedOn => &self.updated_on,
            F::VulnerabilitySource => &self.vulnerability_source,
            F::HubVulnerabilityUrl => &self.hub_vulnerability_url,
            F::RemediationStatus => &self.remediation_status,
            F::RemediationTargetDate => &self.remediation_target_date,
            F::RemediationActualDate => &self.remediation_actual_date,
            F::RemediationComment => &self.remediation_comment,
            F::Url => &self.url,
            F::Severity => &self.severity,
            F::ScanDate => &self.scan_date,
            F::ReleasedOn => &self.released_on,
            F::NewerReleasedCount => &self.newer_released_count,
            F::Trending => &self.trending,
            F::CommitCountLast12Month => &self.commit_count_last_12_month,
            F::ContributorCountLast12Month => &self.contributor_count_last_12_month,
            F::UpgradeVersion => &self.upgrade_version,
            F::UpgradeReleasedOn => &self.upgrade_released_on,
            F::LatestVersion => &self.latest_version,
            F::LatestReleasedOn => &self.latest_released_on,
            F::BaseScore | F::Exploitability | F::Impact => return None,
        };
        Some(slot)
    }

    fn text_slot_mut(&mut self, field: IssueField) -> Option<&mut Option<String>> {
        use IssueField as F;
        let slot = match field {
            F::ProjectId => &mut self.project_id,
            F::ProjectName => &mut self.project_name,
            F::ProjectVersion => &mut self.project_version,
            F::VersionId => &mut self.version_id,
            F::ChannelVersionId => &mut self.channel_version_id,
            F::ComponentId => &mut self.component_id,
            F::ComponentName => &mut self.component_name,
            F::ComponentVersion => &mut self.component_version,
            F::ComponentVersionId => &mut self.component_version_id,
            F::ChannelVersionOrigin => &mut self.channel_version_origin,
            F::ChannelVersionOriginId => &mut self.channel_version_origin_id,
            F::ChannelVersionOriginName => &mut self.channel_version_origin_name,
            F::VulnerabilityId => &mut self.vulnerability_id,
            F::Description => &mut self.description,
            F::PublishedOn => &mut self.published_on,
            F::UpdatedOn => &mut self.updated_on,
            F::VulnerabilitySource => &mut self.vulnerability_source,
            F::HubVulnerabilityUrl => &mut self.hub_vulnerability_url,
            F::RemediationStatus => &mut self.remediation_status,
            F::RemediationTargetDate => &mut self.remediation_target_date,
            F::RemediationActualDate => &mut self.remediation_actual_date,
            F::RemediationComment => &mut self.remediation_comment,
            F::Url => &mut self.url,
            F::Severity => &mut self.severity,
            F::ScanDate => &mut self.scan_date,
            F::ReleasedOn => &mut self.released_on,
            F::NewerReleasedCount => &mut self.newer_released_count,
            F::Trending => &mut self.trending,
            F::CommitCountLast12Month => &mut self.commit_count_last_12_month,
            F::ContributorCountLast12Month => &mut self.contributor_count_last_12_month,
            F::UpgradeVersion => &mut self.upgrade_version,
            F::UpgradeReleasedOn => &mut self.upgrade_released_on,
            F::LatestVersion => &mut self.latest_version,
            F::LatestReleasedOn => &mut self.latest_released_on,
            F::BaseScore | F::Exploitability | F::Impact => return None,
        };
        Some(slot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issue_field_serializes_as_attribute_key() {
        let json = serde_json::to_string(&IssueField::ChannelVersionOriginId).unwrap();
        assert_eq!(json, "\"CHANNEL_VERSION_ORIGIN_ID\"");
        let json = serde_json::to_string(&IssueField::CommitCountLast12Month).unwrap();
        assert_eq!(json, "\"COMMIT_COUNT_LAST_12_MONTH\"");
    }

    #[test]
    fn field_kinds() {
        assert_eq!(IssueField::BaseScore.kind(), FieldKind::Decimal);
        assert_eq!(IssueField::PublishedOn.kind(), FieldKind::Date);
        assert_eq!(IssueField::ScanDate.kind(), FieldKind::Timestamp);
        assert_eq!(IssueField::Severity.kind(), FieldKind::Text);
    }

    #[test]
    fn text_and_decimal_slots_are_disjoint() {
        let mut issue = Issue::default();
        issue.set_text(IssueField::BaseScore, Some("5.1".to_string()));
        issue.set_decimal(IssueField::Description, Some(1.0));
        assert_eq!(issue.base_score, None);
        assert_eq!(issue.description, None);

        issue.set_text(IssueField::VulnerabilityId, Some("CVE-2006-0300".to_string()));
        issue.set_decimal(IssueField::Impact, Some(6.4));
        assert_eq!(issue.text(IssueField::VulnerabilityId), Some("CVE-2006-0300"));
        assert_eq!(issue.decimal(IssueField::Impact), Some(6.4));
        assert_eq!(issue.text(IssueField::Impact), None);
    }

    #[test]
    fn file_name_prefers_component() {
        let issue = Issue {
            project_name: Some("dpkg".to_string()),
            project_version: Some("1.17.26".to_string()),
            ..Default::default()
        };
        assert_eq!(issue.file_name(), "dpkg:1.17.26");

        let issue = Issue {
            project_name: Some("portal".to_string()),
            component_name: Some("openssl".to_string()),
            component_version: Some("1.0.1e".to_string()),
            ..Default::default()
        };
        assert_eq!(issue.file_name(), "openssl:1.0.1e");
    }

    #[test]
    fn identity_is_cached_after_first_derivation() {
        let issue = Issue {
            project_name: Some("dpkg".to_string()),
            vulnerability_id: Some("CVE-2006-0300".to_string()),
            ..Default::default()
        };
        let first = issue.identity(&IdentityPolicy::ProjectVulnBased).to_string();
        let second = issue.identity(&IdentityPolicy::ComponentVersion).to_string();
        assert_eq!(first, second);
        assert_eq!(first, "121c18ed-25c7-33ea-bc14-17f03e5aaa29");
    }

    #[test]
    fn identity_skipped_in_serialization() {
        let issue = Issue::default();
        let _ = issue.identity(&IdentityPolicy::ProjectVulnBased);
        let json = serde_json::to_value(&issue).unwrap();
        assert!(json.get("identity").is_none());
        assert!(json["project_name"].is_null());
    }
}
