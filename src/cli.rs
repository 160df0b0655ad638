use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::config::{
    ImportConfig, DATE_CONVENTION_VAR, ENTRY_NAME_VAR, IDENTITY_POLICY_VAR, SCHEMA_VAR,
};
use crate::errors::ImportError;

#[derive(Parser, Debug)]
#[command(name = "sca-import")]
#[command(about = "Black Duck Hub CSV report importer", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(flatten)]
    pub import: ImportArgs,

    #[command(subcommand)]
    pub command: Commands,
}

/// Settings shared by every subcommand. Flags win over the environment.
#[derive(Args, Debug, Clone, Default)]
pub struct ImportArgs {
    /// Report layout (security_v1, security_v2, operational_v1)
    #[arg(long, global = true, env = SCHEMA_VAR)]
    pub schema: Option<String>,

    /// Date layout of date columns (iso, quoted_timestamp, slash_inferred)
    #[arg(long = "date-convention", global = true, env = DATE_CONVENTION_VAR)]
    pub date_convention: Option<String>,

    /// Identity policy (component, component_version, project_vulnerability, host_seeded)
    #[arg(long = "identity", global = true, env = IDENTITY_POLICY_VAR)]
    pub identity: Option<String>,

    /// Entry name for host-seeded identities
    #[arg(long = "entry-name", global = true, env = ENTRY_NAME_VAR)]
    pub entry_name: Option<String>,
}

impl ImportArgs {
    pub fn to_config(&self) -> Result<ImportConfig, ImportError> {
        ImportConfig::resolve(
            self.schema.as_deref(),
            self.date_convention.as_deref(),
            self.identity.as_deref(),
            self.entry_name.clone(),
        )
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Classify every row and stream vulnerability records as JSON lines
    Issues {
        /// Report to import
        file: PathBuf,
    },
    /// Print the parsed rows as a JSON array without classifying them
    Rows {
        /// Report to parse
        file: PathBuf,
    },
    /// Print the scan description (content guid, scan date, label)
    Scan {
        /// Report to describe
        file: PathBuf,
    },
    /// Print the MD5 digest of a file
    Digest {
        /// File to hash
        file: PathBuf,
    },
}
