use std::env;

use crate::errors::ImportError;
use crate::parsers::schema::SchemaVariant;
use crate::services::classifier::SeverityPolicy;
use crate::services::coercion::DateConvention;
use crate::services::fingerprint::IdentityPolicy;

pub const SCHEMA_VAR: &str = "SCA_IMPORT_SCHEMA";
pub const DATE_CONVENTION_VAR: &str = "SCA_IMPORT_DATE_CONVENTION";
pub const IDENTITY_POLICY_VAR: &str = "SCA_IMPORT_IDENTITY_POLICY";
pub const ENTRY_NAME_VAR: &str = "SCA_IMPORT_ENTRY_NAME";

/// Import configuration. Unset values fall back to the schema's defaults.
#[derive(Debug, Clone)]
pub struct ImportConfig {
    pub schema: SchemaVariant,
    pub date_convention: DateConvention,
    pub identity_policy: IdentityPolicy,
    pub severity_policy: SeverityPolicy,
}

impl ImportConfig {
    pub fn for_schema(schema: SchemaVariant) -> Self {
        Self {
            schema,
            date_convention: schema.default_date_convention(),
            identity_policy: schema.default_identity_policy(),
            severity_policy: SeverityPolicy::default(),
        }
    }

    pub fn from_env() -> Result<Self, ImportError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from a key lookup; blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ImportError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        Self::resolve(
            get(SCHEMA_VAR).as_deref(),
            get(DATE_CONVENTION_VAR).as_deref(),
            get(IDENTITY_POLICY_VAR).as_deref(),
            get(ENTRY_NAME_VAR),
        )
    }

    /// Resolve explicit settings against the schema defaults.
    ///
    /// The schema defaults to `security_v2`. An entry name on its own
    /// selects the host-seeded identity policy.
    pub fn resolve(
        schema: Option<&str>,
        date_convention: Option<&str>,
        identity_policy: Option<&str>,
        entry_name: Option<String>,
    ) -> Result<Self, ImportError> {
        let schema = schema
            .map(str::parse::<SchemaVariant>)
            .transpose()?
            .unwrap_or(SchemaVariant::SecurityV2);
        let mut config = Self::for_schema(schema);

        if let Some(convention) = date_convention {
            config.date_convention = convention.parse()?;
        }

        config.identity_policy = match (identity_policy, entry_name) {
            (Some(name), entry_name) => IdentityPolicy::from_name(name, entry_name)?,
            (None, Some(entry_name)) => IdentityPolicy::HostSeeded { entry_name },
            (None, None) => config.identity_policy,
        };
        config.identity_policy.validate()?;

        tracing::debug!(
            schema = %config.schema,
            date_convention = %config.date_convention,
            identity_policy = ?config.identity_policy,
            "Resolved import configuration"
        );
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| vars.get(key).cloned()
    }

    #[test]
    fn defaults_follow_schema() {
        let config = ImportConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.schema, SchemaVariant::SecurityV2);
        assert_eq!(config.date_convention, DateConvention::Iso);
        assert_eq!(config.identity_policy, IdentityPolicy::ComponentBased);

        let config = ImportConfig::from_lookup(lookup(&[(SCHEMA_VAR, "security_v1")])).unwrap();
        assert_eq!(config.date_convention, DateConvention::SlashInferred);
        assert_eq!(config.identity_policy, IdentityPolicy::ProjectVulnBased);
    }

    #[test]
    fn explicit_values_override_defaults() {
        let config = ImportConfig::from_lookup(lookup(&[
            (SCHEMA_VAR, "operational_v1"),
            (DATE_CONVENTION_VAR, "slash_inferred"),
            (IDENTITY_POLICY_VAR, "component"),
        ]))
        .unwrap();
        assert_eq!(config.schema, SchemaVariant::OperationalV1);
        assert_eq!(config.date_convention, DateConvention::SlashInferred);
        assert_eq!(config.identity_policy, IdentityPolicy::ComponentBased);
    }

    #[test]
    fn entry_name_selects_host_seeded_identity() {
        let config =
            ImportConfig::from_lookup(lookup(&[(ENTRY_NAME_VAR, "hub-export.csv")])).unwrap();
        assert_eq!(
            config.identity_policy,
            IdentityPolicy::HostSeeded {
                entry_name: "hub-export.csv".to_string()
            }
        );
    }

    #[test]
    fn blank_values_are_unset() {
        let config = ImportConfig::from_lookup(lookup(&[(SCHEMA_VAR, "  "), (ENTRY_NAME_VAR, "")]))
            .unwrap();
        assert_eq!(config.schema, SchemaVariant::SecurityV2);
        assert_eq!(config.identity_policy, IdentityPolicy::ComponentBased);
    }

    #[test]
    fn invalid_values_are_config_errors() {
        assert!(matches!(
            ImportConfig::from_lookup(lookup(&[(SCHEMA_VAR, "license_v1")])),
            Err(ImportError::Config(_))
        ));
        assert!(matches!(
            ImportConfig::from_lookup(lookup(&[(DATE_CONVENTION_VAR, "dd.MM.yyyy")])),
            Err(ImportError::Config(_))
        ));
    }

    #[test]
    fn host_seeded_without_entry_name_is_invalid_argument() {
        let result = ImportConfig::resolve(None, None, Some("host_seeded"), None);
        assert!(matches!(result, Err(ImportError::InvalidArgument(_))));
    }
}
