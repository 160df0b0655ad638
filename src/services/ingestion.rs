//! Import pipeline: parse a report, classify each issue, hand records to a sink.
//!
//! Issues are classified and delivered one at a time as rows are read; the
//! report is never held in memory. Row order is preserved.

use std::collections::BTreeMap;
use std::io::{Read, Write};

use serde::Serialize;

use crate::config::ImportConfig;
use crate::errors::ImportError;
use crate::models::issue::Issue;
use crate::models::scan::ScanInfo;
use crate::models::vulnerability::{Priority, Vulnerability};
use crate::parsers::blackduck::BlackDuckCsvParser;
use crate::parsers::schema::{Schema, SchemaVariant};
use crate::services::classifier::Classifier;
use crate::services::scan;

/// Sink receiving each vulnerability record as it is produced.
pub trait VulnerabilityHandler {
    fn handle(&mut self, vulnerability: Vulnerability) -> anyhow::Result<()>;
}

impl VulnerabilityHandler for Vec<Vulnerability> {
    fn handle(&mut self, vulnerability: Vulnerability) -> anyhow::Result<()> {
        self.push(vulnerability);
        Ok(())
    }
}

/// Writes one JSON object per line.
pub struct JsonLinesHandler<W> {
    writer: W,
}

impl<W: Write> JsonLinesHandler<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> VulnerabilityHandler for JsonLinesHandler<W> {
    fn handle(&mut self, vulnerability: Vulnerability) -> anyhow::Result<()> {
        serde_json::to_writer(&mut self.writer, &vulnerability)?;
        self.writer.write_all(b"\n")?;
        Ok(())
    }
}

/// Outcome of one import.
#[derive(Debug, Clone, Serialize)]
pub struct ImportSummary {
    pub schema: SchemaVariant,
    pub total_rows: usize,
    pub by_priority: BTreeMap<Priority, usize>,
}

impl ImportSummary {
    fn new(schema: SchemaVariant) -> Self {
        Self {
            schema,
            total_rows: 0,
            by_priority: BTreeMap::new(),
        }
    }

    fn record(&mut self, priority: Priority) {
        self.total_rows += 1;
        *self.by_priority.entry(priority).or_default() += 1;
    }
}

/// A configured import. Holds no per-report state, so one importer can
/// serve many reports, including concurrently from several threads.
#[derive(Debug, Clone)]
pub struct Importer {
    parser: BlackDuckCsvParser,
    classifier: Classifier,
}

impl Importer {
    /// Check the configuration and load its schema. Fails before any input
    /// is read.
    pub fn from_config(config: &ImportConfig) -> Result<Self, ImportError> {
        config.identity_policy.validate()?;
        let schema = Schema::load(config.schema)?;
        Ok(Self {
            parser: BlackDuckCsvParser::new(schema),
            classifier: Classifier::new(
                schema,
                config.date_convention,
                config.identity_policy.clone(),
                config.severity_policy.clone(),
            ),
        })
    }

    pub fn schema(&self) -> &Schema {
        self.parser.schema()
    }

    /// Stream every issue of `reader` through the classifier into `handler`.
    ///
    /// A handler error stops the import; no further rows are read.
    pub fn import<R, H>(&self, reader: R, handler: &mut H) -> Result<ImportSummary, ImportError>
    where
        R: Read,
        H: VulnerabilityHandler + ?Sized,
    {
        let mut summary = ImportSummary::new(self.schema().variant());
        self.parser.parse_issues(reader, |issue| {
            let vulnerability = self.classifier.classify(&issue);
            let priority = vulnerability.priority;
            handler.handle(vulnerability).map_err(|e| {
                tracing::error!(error = %e, row = summary.total_rows + 1, "Vulnerability handler failed");
                ImportError::Handler(e)
            })?;
            summary.record(priority);
            Ok(())
        })?;

        tracing::info!(
            schema = %summary.schema,
            total_rows = summary.total_rows,
            "Import complete"
        );
        Ok(summary)
    }

    /// Parse the whole report into memory without classifying it.
    pub fn collect<R: Read>(&self, reader: R) -> Result<Vec<Issue>, ImportError> {
        self.parser.collect_issues(reader)
    }

    pub fn describe_scan<R: Read>(&self, reader: R) -> Result<ScanInfo, ImportError> {
        scan::describe_scan(reader, self.schema())
    }
}

/// One-shot import of `reader` under `config`.
pub fn import_issues<R, H>(
    reader: R,
    config: &ImportConfig,
    handler: &mut H,
) -> Result<ImportSummary, ImportError>
where
    R: Read,
    H: VulnerabilityHandler + ?Sized,
{
    Importer::from_config(config)?.import(reader, handler)
}
