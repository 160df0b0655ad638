//! Black Duck Hub CSV report parser.
//!
//! Streams a UTF-8 CSV report row by row. The first row is the header; it
//! is validated against the active schema when the first data row arrives,
//! so an empty report yields no issues and no error.

use std::io::Read;

use csv::StringRecord;

use crate::errors::ImportError;
use crate::models::issue::Issue;
use crate::parsers::schema::Schema;

/// Parser for one report layout.
#[derive(Debug, Clone, Copy)]
pub struct BlackDuckCsvParser {
    schema: Schema,
}

impl BlackDuckCsvParser {
    pub fn new(schema: Schema) -> Self {
        Self { schema }
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Deliver each issue to `on_issue` as it is parsed.
    ///
    /// The reader is owned for the duration of the call and dropped on
    /// every exit path. An error from `on_issue` stops parsing and is
    /// returned unchanged. Returns the number of issues delivered.
    pub fn parse_issues<R, F>(&self, reader: R, mut on_issue: F) -> Result<usize, ImportError>
    where
        R: Read,
        F: FnMut(Issue) -> Result<(), ImportError>,
    {
        tracing::info!(schema = %self.schema.variant(), "Parsing issues from Black Duck report");
        let mut csv_reader = csv_reader(reader);
        let mut record = StringRecord::new();

        if !csv_reader.read_record(&mut record)? {
            tracing::debug!("Report has no data rows");
            return Ok(0);
        }

        let headers = csv_reader.headers()?;
        self.schema.validate_headers(headers)?;
        let binding = self.schema.bind(headers);
        tracing::debug!(
            bound = binding.bound_fields(),
            declared = self.schema.columns().len(),
            "Bound report header"
        );

        let mut rows = 0usize;
        loop {
            on_issue(binding.issue_from(&record))?;
            rows += 1;
            if !csv_reader.read_record(&mut record)? {
                break;
            }
        }

        tracing::info!(rows, "Finished parsing Black Duck report");
        Ok(rows)
    }

    /// Parse the whole report into memory, in row order.
    ///
    /// Fails without returning any rows if the header is invalid.
    pub fn collect_issues<R: Read>(&self, reader: R) -> Result<Vec<Issue>, ImportError> {
        let mut issues = Vec::new();
        self.parse_issues(reader, |issue| {
            issues.push(issue);
            Ok(())
        })?;
        Ok(issues)
    }
}

/// Comma separated, double-quote escaped, header row first. Short and long
/// rows are tolerated; cells are trimmed.
pub(crate) fn csv_reader<R: Read>(reader: R) -> csv::Reader<R> {
    csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader)
}
