//! Scan description: content hash plus the scan timestamp of the first row.

use std::io::Read;

use csv::StringRecord;

use crate::errors::ImportError;
use crate::models::issue::IssueField;
use crate::models::scan::{ScanInfo, SCAN_LABEL};
use crate::models::vulnerability::ENGINE_TYPE;
use crate::parsers::blackduck::csv_reader;
use crate::parsers::schema::Schema;
use crate::services::coercion::{self, DateConvention};
use crate::services::fingerprint::HashingReader;

/// Describe an uploaded report in a single pass over `reader`.
///
/// The guid is the MD5 of every byte of the stream, so it always equals
/// [`digest`](crate::services::fingerprint::digest) of the same bytes.
/// Fails with `Config` before any I/O when the schema has no scan date
/// column.
pub fn describe_scan<R: Read>(reader: R, schema: &Schema) -> Result<ScanInfo, ImportError> {
    if !schema.maps(IssueField::ScanDate) {
        return Err(ImportError::Config(format!(
            "schema {} has no scan date column",
            schema.variant()
        )));
    }

    let mut csv_reader = csv_reader(HashingReader::new(reader));
    let mut record = StringRecord::new();

    let scan_date = if csv_reader.read_record(&mut record)? {
        let headers = csv_reader.headers()?;
        schema.validate_headers(headers)?;
        let first = schema.bind(headers).issue_from(&record);
        coercion::parse_timestamp(first.scan_date.as_deref(), DateConvention::QuotedTimestamp)
    } else {
        tracing::debug!("Report has no data rows; scan date unknown");
        None
    };

    let guid = csv_reader.into_inner().finish()?;
    tracing::info!(%guid, ?scan_date, schema = %schema.variant(), "Described scan");

    Ok(ScanInfo {
        guid,
        scan_date,
        label: SCAN_LABEL.to_string(),
        engine_type: ENGINE_TYPE.to_string(),
    })
}
