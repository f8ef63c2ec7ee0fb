// src/models/core.rs - The immutable input unit of one resolution run

use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeSet;

use crate::normalize;

/// One biographical record harvested from one language edition.
///
/// Records are referenced by their dense index into the working record
/// array for the duration of a run; the index, never `id`, is the unit of
/// clustering — `id` collisions across editions are exactly what is being
/// resolved. The engine never mutates a loaded record.
#[derive(Debug, Clone, Serialize)]
pub struct PersonRecord {
    /// Opaque external identifier. Not unique across language editions.
    pub id: String,
    /// Raw name string as harvested.
    pub name: String,
    /// Cached comparison form of the name (transliterated + squeezed).
    pub normalized_name: String,
    /// Source edition tag, e.g. "en", "de".
    pub language: String,
    pub gender: Option<String>,
    pub birth_year: Option<i32>,
    pub death_year: Option<i32>,
    /// Precise birth date where the edition carries one.
    pub exact_birth_date: Option<NaiveDate>,
    pub occupation: Option<String>,
    pub citizenship: Option<String>,
    /// (source, code) pairs, e.g. ("viaf", "64013650").
    pub external_identifiers: BTreeSet<(String, String)>,
}

impl PersonRecord {
    pub fn new(id: impl Into<String>, name: impl Into<String>, language: impl Into<String>) -> Self {
        let name = name.into();
        let normalized_name = normalize::comparison_form(&name);
        Self {
            id: id.into(),
            name,
            normalized_name,
            language: language.into(),
            gender: None,
            birth_year: None,
            death_year: None,
            exact_birth_date: None,
            occupation: None,
            citizenship: None,
            external_identifiers: BTreeSet::new(),
        }
    }

    /// Gender with the shared missing-value predicate applied.
    pub fn gender_value(&self) -> Option<&str> {
        self.gender
            .as_deref()
            .filter(|g| !normalize::is_missing(g))
    }

    pub fn occupation_value(&self) -> Option<&str> {
        self.occupation
            .as_deref()
            .filter(|o| !normalize::is_missing(o))
    }

    pub fn citizenship_value(&self) -> Option<&str> {
        self.citizenship
            .as_deref()
            .filter(|c| !normalize::is_missing(c))
    }
}
