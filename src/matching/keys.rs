// src/matching/keys.rs - Blocking key functions, one per configured method

use std::collections::BTreeSet;

use crate::models::PersonRecord;
use crate::normalize::{self, phonetic};

/// Raw name, trimmed. The strictest possible block key.
pub fn exact_name(records: &[PersonRecord], index: usize) -> Option<String> {
    let name = records[index].name.trim();
    if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}

pub fn case_fold(records: &[PersonRecord], index: usize) -> Option<String> {
    let key = normalize::case_fold_trim(&records[index].name);
    if key.is_empty() {
        None
    } else {
        Some(key)
    }
}

pub fn transliterated(records: &[PersonRecord], index: usize) -> Option<String> {
    let key = normalize::transliterate(&records[index].name);
    if key.is_empty() {
        None
    } else {
        Some(key)
    }
}

/// Sorted unique tokens of the comparison form. Token order and repeats
/// stop mattering, which is what catches "Smith, John" vs "John Smith".
pub fn fingerprint(records: &[PersonRecord], index: usize) -> Option<String> {
    let tokens: BTreeSet<&str> = records[index]
        .normalized_name
        .split_whitespace()
        .collect();
    if tokens.is_empty() {
        return None;
    }
    Some(tokens.into_iter().collect::<Vec<_>>().join(" "))
}

/// Initials-abbreviated comparison form, e.g. "j. m. smith".
pub fn initials(records: &[PersonRecord], index: usize) -> Option<String> {
    let base = &records[index].normalized_name;
    if base.is_empty() {
        return None;
    }
    Some(normalize::initials(base))
}

/// Kölner Phonetik codes combined with birth/death years, exactly the
/// original pipeline's phonetic grouper: a record without a birth year is
/// unblockable here (the year is what keeps phonetic recall honest).
pub fn cologne(records: &[PersonRecord], index: usize) -> Option<String> {
    let record = &records[index];
    let birth = record.birth_year?;
    let code = phonetic::cologne_code(&record.name)?;
    let death = record
        .death_year
        .map(|d| d.to_string())
        .unwrap_or_else(|| "-".to_string());
    Some(format!("{}:{}:{}", birth, death, code))
}

/// Sort key for the sorted-neighborhood pass: (birth year, death year,
/// skeleton code). Years first so the window slides within a cohort.
pub fn skeleton_sort_key(records: &[PersonRecord], index: usize) -> Option<(i32, i32, String)> {
    let record = &records[index];
    let skeleton = phonetic::skeleton_key(&record.name)?;
    Some((
        record.birth_year.unwrap_or(0),
        record.death_year.unwrap_or(0),
        skeleton,
    ))
}

/// Zig-zag variant: the skeleton component character-reversed, recovering
/// neighbors that agree in suffix but diverge in prefix.
pub fn skeleton_sort_key_reversed(
    records: &[PersonRecord],
    index: usize,
) -> Option<(i32, i32, String)> {
    skeleton_sort_key(records, index)
        .map(|(b, d, skeleton)| (b, d, skeleton.chars().rev().collect()))
}

/// Set-valued key: every external identifier as "source:code".
pub fn external_id_keys(records: &[PersonRecord], index: usize) -> Vec<String> {
    records[index]
        .external_identifiers
        .iter()
        .map(|(source, code)| format!("{}:{}", source, code))
        .collect()
}
