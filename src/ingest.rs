// src/ingest.rs - Tabular input boundary: CSV rows into the working record array

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use log::{debug, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{BTreeSet, HashMap};
use std::path::Path;

use crate::models::PersonRecord;
use crate::normalize;

pub const REQUIRED_COLUMNS: [&str; 8] = [
    "id",
    "name",
    "language",
    "gender",
    "birth_year",
    "death_year",
    "occupation",
    "citizenship",
];
pub const BIRTH_DATE_COLUMN: &str = "birth_date";
pub const EXTERNAL_IDS_COLUMN: &str = "external_ids";

static IDENTIFIER_PAIR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\(\s*([^,()]+?)\s*,\s*([^()]+?)\s*\)$").unwrap());

/// The loaded table: original headers and rows (echoed verbatim into the
/// augmented output) plus the derived record array the engine works on.
/// Row i corresponds to record index i.
#[derive(Debug)]
pub struct RecordTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
    pub records: Vec<PersonRecord>,
}

/// Load the record set from a CSV file. Missing required columns are the
/// one fatal ingestion error, reported before any clustering begins;
/// everything row-level (bad year, bad date, malformed identifier list)
/// recovers locally.
pub fn load_records(path: &Path) -> Result<RecordTable> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("Failed to open input file {}", path.display()))?;

    let headers: Vec<String> = reader
        .headers()
        .context("Failed to read CSV headers")?
        .iter()
        .map(str::to_string)
        .collect();
    let column: HashMap<&str, usize> = headers
        .iter()
        .enumerate()
        .map(|(i, h)| (h.as_str(), i))
        .collect();

    let missing: Vec<&str> = REQUIRED_COLUMNS
        .iter()
        .filter(|c| !column.contains_key(**c))
        .copied()
        .collect();
    if !missing.is_empty() {
        bail!(
            "Input file {} is missing required column(s): {}",
            path.display(),
            missing.join(", ")
        );
    }

    let field = |row: &csv::StringRecord, name: &str| -> String {
        column
            .get(name)
            .and_then(|&i| row.get(i))
            .unwrap_or("")
            .trim()
            .to_string()
    };

    let mut rows = Vec::new();
    let mut records = Vec::new();
    for (line, row) in reader.records().enumerate() {
        let row = row.with_context(|| format!("Failed to read CSV row {}", line + 2))?;

        let id = field(&row, "id");
        let name = field(&row, "name");
        let language = field(&row, "language");

        let mut record = PersonRecord::new(id, name, language);
        record.gender = non_missing(field(&row, "gender"));
        record.birth_year = parse_year(&field(&row, "birth_year"), line, "birth_year");
        record.death_year = parse_year(&field(&row, "death_year"), line, "death_year");
        record.occupation = non_missing(field(&row, "occupation"));
        record.citizenship = non_missing(field(&row, "citizenship"));
        if column.contains_key(BIRTH_DATE_COLUMN) {
            record.exact_birth_date = parse_birth_date(&field(&row, BIRTH_DATE_COLUMN), line);
        }
        if column.contains_key(EXTERNAL_IDS_COLUMN) {
            record.external_identifiers =
                parse_external_identifiers(&field(&row, EXTERNAL_IDS_COLUMN));
        }

        rows.push(row.iter().map(str::to_string).collect());
        records.push(record);
    }

    debug!(
        "Loaded {} records from {} ({} columns)",
        records.len(),
        path.display(),
        headers.len()
    );
    Ok(RecordTable {
        headers,
        rows,
        records,
    })
}

fn non_missing(value: String) -> Option<String> {
    if normalize::is_missing(&value) {
        None
    } else {
        Some(value)
    }
}

fn parse_year(raw: &str, line: usize, column: &str) -> Option<i32> {
    if normalize::is_missing(raw) {
        return None;
    }
    match raw.parse::<i32>() {
        Ok(year) => Some(year),
        Err(_) => {
            warn!("Row {}: unparseable {} {:?}, treating as missing", line + 2, column, raw);
            None
        }
    }
}

/// Placeholder dates (year-only or January 1st defaults from upstream
/// harvesting) carry no day-level evidence and are dropped, exactly like
/// the upstream birth-date index did.
fn parse_birth_date(raw: &str, line: usize) -> Option<NaiveDate> {
    if normalize::is_missing(raw) {
        return None;
    }
    if raw.ends_with("00-00") || raw.ends_with("01-01") {
        return None;
    }
    match NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        Ok(date) => Some(date),
        Err(_) => {
            warn!(
                "Row {}: unparseable birth_date {:?}, treating as missing",
                line + 2,
                raw
            );
            None
        }
    }
}

/// Parse an encoded identifier list: `(source,code)` entries separated by
/// `|`. A malformed entry spoils nothing but itself; a fully malformed
/// string degrades to the empty set with a warning, never an abort.
pub fn parse_external_identifiers(raw: &str) -> BTreeSet<(String, String)> {
    let mut identifiers = BTreeSet::new();
    if raw.trim().is_empty() {
        return identifiers;
    }
    let mut malformed = 0usize;
    for entry in raw.split('|') {
        let entry = entry.trim();
        if entry.is_empty() {
            continue;
        }
        match IDENTIFIER_PAIR_RE.captures(entry) {
            Some(caps) => {
                identifiers.insert((caps[1].to_string(), caps[2].to_string()));
            }
            None => malformed += 1,
        }
    }
    if malformed > 0 {
        warn!(
            "Ignored {} malformed external identifier entr(ies) in {:?}",
            malformed, raw
        );
    }
    identifiers
}
