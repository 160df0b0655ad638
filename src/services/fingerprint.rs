//! Identity computation for deduplication of issues and uploaded reports.
//!
//! Issue identities are content-addressed: a pure function of a stable
//! subset of the issue's own fields, never of row position or source file.
//! Report identity is the MD5 of the full byte stream.

use std::io::Read;

use md5::{Digest, Md5};
use serde::{Deserialize, Serialize};

use crate::errors::ImportError;
use crate::models::issue::Issue;
use crate::services::coercion::clean_name;

/// Rendering of an absent identity input.
const ABSENT: &str = "null";

/// Which issue fields feed the identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum IdentityPolicy {
    /// component name, version, channel-version-origin id, vulnerability id.
    ComponentBased,
    /// component id, component version id.
    ///
    /// Ignores the vulnerability id: two vulnerabilities on the same
    /// component version collapse into one identity.
    ComponentVersion,
    /// project name, vulnerability id.
    ProjectVulnBased,
    /// Host-supplied entry name, spaces removed, joined to the
    /// vulnerability id. Not hashed.
    HostSeeded { entry_name: String },
}

impl IdentityPolicy {
    /// Resolve a policy by its configuration name.
    pub fn from_name(name: &str, entry_name: Option<String>) -> Result<Self, ImportError> {
        match name.trim().to_lowercase().as_str() {
            "component" | "component_based" => Ok(Self::ComponentBased),
            "component_version" => Ok(Self::ComponentVersion),
            "project_vulnerability" | "project_vuln_based" => Ok(Self::ProjectVulnBased),
            "host_seeded" => {
                let entry_name = entry_name.ok_or_else(|| {
                    ImportError::InvalidArgument(
                        "host_seeded identity requires an entry name".to_string(),
                    )
                })?;
                Ok(Self::HostSeeded { entry_name })
            }
            other => Err(ImportError::Config(format!(
                "unknown identity policy '{other}' (expected component, component_version, project_vulnerability or host_seeded)"
            ))),
        }
    }

    /// Reject misconfigured policies before any input is read.
    pub fn validate(&self) -> Result<(), ImportError> {
        match self {
            Self::HostSeeded { entry_name } if entry_name.trim().is_empty() => Err(
                ImportError::InvalidArgument("entry name cannot be empty".to_string()),
            ),
            _ => Ok(()),
        }
    }
}

/// Derive the identity of an issue under `policy`.
pub fn derive_identity(issue: &Issue, policy: &IdentityPolicy) -> String {
    let vulnerability_id = issue.vulnerability_id.as_deref();
    let identity = match policy {
        IdentityPolicy::ComponentBased => name_uuid(&[
            clean_name(issue.component_name.as_deref()).as_deref(),
            clean_name(issue.component_version.as_deref()).as_deref(),
            clean_name(issue.channel_version_origin_id.as_deref()).as_deref(),
            vulnerability_id,
        ]),
        IdentityPolicy::ComponentVersion => name_uuid(&[
            clean_name(issue.component_id.as_deref()).as_deref(),
            clean_name(issue.component_version_id.as_deref()).as_deref(),
        ]),
        IdentityPolicy::ProjectVulnBased => name_uuid(&[
            clean_name(issue.project_name.as_deref()).as_deref(),
            vulnerability_id,
        ]),
        IdentityPolicy::HostSeeded { entry_name } => format!(
            "{}:{}",
            clean_name(Some(entry_name.as_str())).unwrap_or_default(),
            vulnerability_id.unwrap_or(ABSENT)
        ),
    };
    tracing::debug!(identity = %identity, ?policy, "Derived issue identity");
    identity
}

/// Name-based (version 3) UUID of the `:`-joined parts.
fn name_uuid(parts: &[Option<&str>]) -> String {
    let name = parts
        .iter()
        .map(|part| part.unwrap_or(ABSENT))
        .collect::<Vec<_>>()
        .join(":");
    let mut hash = [0u8; 16];
    hash.copy_from_slice(&Md5::digest(name.as_bytes()));
    uuid::Builder::from_md5_bytes(hash).into_uuid().to_string()
}

/// MD5 of an entire byte stream, hex-encoded. Consumes the reader.
pub fn digest<R: Read>(mut reader: R) -> Result<String, ImportError> {
    let mut hasher = Md5::new();
    std::io::copy(&mut reader, &mut hasher)?;
    Ok(hex::encode(hasher.finalize()))
}

/// Reader that hashes every byte passing through it.
pub struct HashingReader<R> {
    inner: R,
    hasher: Md5,
}

impl<R: Read> HashingReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            hasher: Md5::new(),
        }
    }

    /// Drain whatever remains of the stream and return the hex digest.
    pub fn finish(mut self) -> Result<String, ImportError> {
        std::io::copy(&mut self.inner, &mut self.hasher)?;
        Ok(hex::encode(self.hasher.finalize()))
    }
}

impl<R: Read> Read for HashingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.hasher.update(&buf[..n]);
        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn issue(project: &str, vuln: &str) -> Issue {
        Issue {
            project_name: Some(project.to_string()),
            vulnerability_id: Some(vuln.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn project_vuln_identity_matches_legacy_uuid() {
        let id = derive_identity(&issue("dpkg", "CVE-2006-0300"), &IdentityPolicy::ProjectVulnBased);
        assert_eq!(id, "121c18ed-25c7-33ea-bc14-17f03e5aaa29");
    }

    #[test]
    fn project_name_spaces_are_ignored() {
        let a = derive_identity(&issue("Apache Commons", "CVE-2015-1"), &IdentityPolicy::ProjectVulnBased);
        let b = derive_identity(&issue("ApacheCommons", "CVE-2015-1"), &IdentityPolicy::ProjectVulnBased);
        assert_eq!(a, b);
        assert_eq!(a, "0b69002c-b342-36f7-b6c1-f468e263d954");
    }

    #[test]
    fn component_identity_uses_four_inputs() {
        let heartbleed = Issue {
            component_name: Some("openssl".to_string()),
            component_version: Some("1.0.1e".to_string()),
            channel_version_origin_id: Some("123 45".to_string()),
            vulnerability_id: Some("CVE-2014-0160".to_string()),
            ..Default::default()
        };
        let id = derive_identity(&heartbleed, &IdentityPolicy::ComponentBased);
        assert_eq!(id, "d36c2e9a-cc56-357f-815d-8ce276c75aa5");

        let other = Issue {
            vulnerability_id: Some("CVE-2014-0224".to_string()),
            ..heartbleed.clone()
        };
        assert_ne!(id, derive_identity(&other, &IdentityPolicy::ComponentBased));
    }

    #[test]
    fn component_version_identity_ignores_vulnerability() {
        let a = Issue {
            component_id: Some("comp-1".to_string()),
            component_version_id: Some("cv-1".to_string()),
            vulnerability_id: Some("CVE-1".to_string()),
            ..Default::default()
        };
        let b = Issue {
            vulnerability_id: Some("CVE-2".to_string()),
            ..a.clone()
        };
        let id = derive_identity(&a, &IdentityPolicy::ComponentVersion);
        assert_eq!(id, derive_identity(&b, &IdentityPolicy::ComponentVersion));
        assert_eq!(id, "1ff6dd36-b45b-327e-855b-fe7f215819f9");
    }

    #[test]
    fn absent_inputs_render_as_null() {
        let orphan = Issue {
            vulnerability_id: Some("CVE-2006-0300".to_string()),
            ..Default::default()
        };
        let id = derive_identity(&orphan, &IdentityPolicy::ProjectVulnBased);
        assert_eq!(id, "b956d231-ca2b-3c80-80b2-ce0db4664fa9");
    }

    #[test]
    fn host_seeded_identity_is_unhashed() {
        let policy = IdentityPolicy::HostSeeded {
            entry_name: "report.csv".to_string(),
        };
        let id = derive_identity(&issue("dpkg", "CVE-2006-0300"), &policy);
        assert_eq!(id, "report.csv:CVE-2006-0300");
    }

    #[test]
    fn host_seeded_identity_strips_entry_name_spaces() {
        let policy = IdentityPolicy::HostSeeded {
            entry_name: "hub export.csv".to_string(),
        };
        let id = derive_identity(&issue("dpkg", "CVE-1"), &policy);
        assert_eq!(id, "hubexport.csv:CVE-1");
    }

    #[test]
    fn hashed_identities_are_uuid_shaped() {
        let id = derive_identity(&issue("dpkg", "CVE-1"), &IdentityPolicy::ProjectVulnBased);
        assert_eq!(id.len(), 36);
        assert_eq!(id.as_bytes()[14], b'3');
    }

    #[test]
    fn policy_from_name() {
        assert_eq!(
            IdentityPolicy::from_name("component", None).unwrap(),
            IdentityPolicy::ComponentBased
        );
        assert_eq!(
            IdentityPolicy::from_name("project_vulnerability", None).unwrap(),
            IdentityPolicy::ProjectVulnBased
        );
        assert!(matches!(
            IdentityPolicy::from_name("host_seeded", None),
            Err(ImportError::InvalidArgument(_))
        ));
        assert!(matches!(
            IdentityPolicy::from_name("row_number", None),
            Err(ImportError::Config(_))
        ));
    }

    #[test]
    fn empty_entry_name_is_rejected() {
        let policy = IdentityPolicy::HostSeeded {
            entry_name: " ".to_string(),
        };
        assert!(matches!(policy.validate(), Err(ImportError::InvalidArgument(_))));
        assert!(IdentityPolicy::ComponentBased.validate().is_ok());
    }

    #[test]
    fn digest_is_stable() {
        let first = digest(&b"hello world"[..]).unwrap();
        let second = digest(&b"hello world"[..]).unwrap();
        assert_eq!(first, second);
        assert_eq!(first, "5eb63bbbe01eeed093cb22bb8f5acdc3");
        assert_eq!(digest(&b""[..]).unwrap(), "d41d8cd98f00b204e9800998ecf8427e");
    }

    #[test]
    fn hashing_reader_covers_consumed_and_remaining_bytes() {
        let mut reader = HashingReader::new(&b"hello world"[..]);
        let mut head = [0u8; 5];
        reader.read_exact(&mut head).unwrap();
        assert_eq!(&head, b"hello");
        assert_eq!(reader.finish().unwrap(), "5eb63bbbe01eeed093cb22bb8f5acdc3");
    }
}
