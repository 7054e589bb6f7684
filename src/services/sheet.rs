//! Route spreadsheet client and parser.
//!
//! The sheet is fetched as a CSV export and parsed in two phases: header rows
//! (first cell `Route name`) define the field names for the data rows that
//! follow, until a blank row closes the section. A sheet may stack several
//! header/data blocks separated by blank rows.

use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;

use crate::errors::FetchError;
use crate::models::RouteRecord;
use crate::services::catalog::{RouteSource, SourceError};
use crate::services::wind::WindDirection;

pub const DEFAULT_ROUTE_SHEET_URL: &str =
    "https://docs.google.com/spreadsheets/d/1Pzd0-8KqRsZZgdXCJQJ8Nq1TAmz-TEGusOZKlgG7RDk/export?format=csv";
const SOURCE_NAME: &str = "route sheet";

/// First-cell marker of a header row.
pub const HEADER_MARKER: &str = "Route name";
pub const COL_NAME: &str = "Route name";
pub const COL_DISTANCE: &str = "Distance (mi)";
pub const COL_WIND: &str = "Ideal Wind Direction";
pub const COL_LINK: &str = "Ride with GPS link";
pub const COL_NOTES: &str = "Notes";

/// Errors raised while turning sheet rows into route records.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("CSV decoding error: {0}")]
    Csv(#[from] csv::Error),
    /// A data row is narrower than its section's header.
    #[error("Row {row} has {found} cells but the header defines {expected} fields")]
    ShortRow {
        row: usize,
        expected: usize,
        found: usize,
    },
}

/// Fetches the CSV export of the route spreadsheet.
#[derive(Debug, Clone)]
pub struct SheetClient {
    client: reqwest::Client,
    url: String,
    min_distance_miles: f64,
}

impl SheetClient {
    /// Build a client whose requests are bounded by `timeout`.
    pub fn new(url: &str, min_distance_miles: f64, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: url.to_string(),
            min_distance_miles,
        })
    }

    /// Download the raw CSV export.
    pub async fn fetch_csv(&self) -> Result<String, FetchError> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| FetchError::transport(SOURCE_NAME, e))?;

        if !response.status().is_success() {
            return Err(FetchError::Status {
                source_name: SOURCE_NAME,
                status: response.status().as_u16(),
            });
        }

        response
            .text()
            .await
            .map_err(|e| FetchError::transport(SOURCE_NAME, e))
    }
}

#[async_trait]
impl RouteSource for SheetClient {
    async fn fetch_routes(&self) -> Result<Vec<RouteRecord>, SourceError> {
        let csv_text = self.fetch_csv().await?;
        let routes = parse_catalog(&csv_text, self.min_distance_miles)?;
        tracing::debug!(
            "Parsed {} routes from {} bytes of sheet CSV",
            routes.len(),
            csv_text.len()
        );
        Ok(routes)
    }
}

/// Decode CSV text into rows of trimmed cells.
///
/// Empty lines come back as blank rows so they still close a data section.
pub fn read_rows(csv_text: &str) -> Result<Vec<Vec<String>>, ParseError> {
    let csv_text = mark_empty_lines(csv_text);
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(csv_text.as_bytes());

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(record.iter().map(|cell| cell.trim().to_string()).collect());
    }
    Ok(rows)
}

/// Rewrite each empty line outside a quoted cell as a lone `,`.
///
/// The CSV reader skips empty lines entirely; a lone comma decodes to an
/// all-blank row instead. Quote parity decides whether a line break sits
/// inside a quoted cell (an escaped `""` leaves parity unchanged).
fn mark_empty_lines(csv_text: &str) -> String {
    let mut marked = String::with_capacity(csv_text.len());
    let mut in_quotes = false;
    for line in csv_text.split_inclusive('\n') {
        let content = line.trim_end_matches(|c: char| c == '\r' || c == '\n');
        if content.is_empty() && !in_quotes {
            marked.push(',');
        }
        marked.push_str(line);
        if content.matches('"').count() % 2 == 1 {
            in_quotes = !in_quotes;
        }
    }
    marked
}

/// Phase two: walk the rows and build named-field records per data section.
///
/// Returns one map per data row, keyed by header name; empty cells are omitted.
pub fn rows_to_records(rows: &[Vec<String>]) -> Result<Vec<HashMap<String, String>>, ParseError> {
    let mut in_data_section = false;
    let mut headers: Vec<String> = Vec::new();
    let mut records = Vec::new();

    for (index, row) in rows.iter().enumerate() {
        if row.iter().all(|cell| cell.is_empty()) {
            in_data_section = false;
            continue;
        }

        if row.first().map(String::as_str) == Some(HEADER_MARKER) {
            in_data_section = true;
            headers = row.iter().filter(|cell| !cell.is_empty()).cloned().collect();
            continue;
        }

        if !in_data_section || headers.is_empty() {
            continue;
        }

        if row.len() < headers.len() {
            return Err(ParseError::ShortRow {
                row: index + 1,
                expected: headers.len(),
                found: row.len(),
            });
        }

        let record = headers
            .iter()
            .zip(row.iter())
            .filter(|(_, value)| !value.is_empty())
            .map(|(field, value)| (field.clone(), value.clone()))
            .collect();
        records.push(record);
    }

    Ok(records)
}

/// Build a route from a named-field record.
///
/// Returns `None` unless the distance is numeric, finite, non-negative and at
/// least `min_distance_miles`. Unknown wind labels are kept as `None`.
pub fn record_to_route(
    record: &HashMap<String, String>,
    min_distance_miles: f64,
) -> Option<RouteRecord> {
    let distance_miles = record
        .get(COL_DISTANCE)
        .and_then(|v| v.parse::<f64>().ok())
        .filter(|d| d.is_finite() && *d >= 0.0 && *d >= min_distance_miles)?;

    let ideal_wind_direction = record.get(COL_WIND).and_then(|label| {
        label
            .parse::<WindDirection>()
            .map_err(|e| tracing::debug!("{}", e))
            .ok()
    });

    Some(RouteRecord {
        name: record.get(COL_NAME).cloned().unwrap_or_default(),
        distance_miles,
        ideal_wind_direction,
        link: record.get(COL_LINK).cloned(),
        notes: record.get(COL_NOTES).cloned(),
    })
}

/// Parse the sheet's CSV export into the route catalog, in sheet order.
pub fn parse_catalog(csv_text: &str, min_distance_miles: f64) -> Result<Vec<RouteRecord>, ParseError> {
    let rows = read_rows(csv_text)?;
    let records = rows_to_records(&rows)?;
    Ok(records
        .iter()
        .filter_map(|record| record_to_route(record, min_distance_miles))
        .collect())
}
