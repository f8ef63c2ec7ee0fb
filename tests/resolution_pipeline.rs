//! End-to-end resolution tests over the full matching pipeline.

use std::sync::Arc;

use dedupe_lib::clustering::merge_accepted_clusters;
use dedupe_lib::config::MatchingConfig;
use dedupe_lib::matching::manager::run_matching_pipeline;
use dedupe_lib::matching::resolver::resolve;
use dedupe_lib::models::{MatchMethodType, PersonRecord};

fn person(
    id: &str,
    name: &str,
    language: &str,
    gender: Option<&str>,
    birth: Option<i32>,
) -> PersonRecord {
    let mut record = PersonRecord::new(id, name, language);
    record.gender = gender.map(str::to_string);
    record.birth_year = birth;
    record
}

async fn run_full(
    records: Vec<PersonRecord>,
    config: MatchingConfig,
) -> (Vec<Vec<usize>>, dedupe_lib::matching::AcceptedRegistry) {
    let records = Arc::new(records);
    let results = run_matching_pipeline(Arc::clone(&records), Arc::new(config.clone()))
        .await
        .unwrap();
    let registry = resolve(&results);
    let classes = merge_accepted_clusters(&records, &registry, &config).unwrap();
    (classes.into_iter().map(|c| c.members).collect(), registry)
}

#[tokio::test]
async fn spelling_variant_groups_but_gender_conflict_never_does() {
    let records = vec![
        person("1", "Jon Smith", "en", Some("M"), Some(1900)),
        person("2", "John Smith", "de", Some("M"), Some(1900)),
        person("3", "Jane Smith", "fr", Some("F"), Some(1900)),
    ];
    // Radius 1: one edit links Jon/John while Jane stays two edits away.
    let mut config = MatchingConfig::default();
    config.snm_radius = 1;
    let (classes, _) = run_full(records, config).await;

    assert!(classes.contains(&vec![0, 1]), "classes: {:?}", classes);
    // Jane must not be merged with anyone, by any method: every candidate
    // block that sweeps her in dies on the gender conflict.
    assert!(classes.iter().all(|c| !c.contains(&2)));
}

#[tokio::test]
async fn resolver_is_idempotent() {
    let records = vec![
        person("1", "Jon Smith", "en", Some("M"), Some(1900)),
        person("2", "John Smith", "de", Some("M"), Some(1900)),
        person("3", "Johann Meyer", "de", Some("M"), Some(1870)),
        person("4", "Johann Maier", "sv", Some("M"), Some(1870)),
        person("5", "Ada Lovelace", "en", Some("F"), Some(1815)),
    ];
    let (first, _) = run_full(records.clone(), MatchingConfig::default()).await;
    let (second, _) = run_full(records, MatchingConfig::default()).await;
    assert_eq!(first, second);
}

#[tokio::test]
async fn identical_proposals_resolve_to_the_higher_priority_method() {
    // "Jon Smith" twice, byte-identical: exact_name, case_fold,
    // transliterated and fingerprint all propose the same {0, 1}. The
    // registry must hold exactly one entry, attributed to exact_name.
    let records = vec![
        person("1", "Jon Smith", "en", Some("M"), Some(1900)),
        person("2", "Jon Smith", "de", Some("M"), Some(1900)),
    ];
    let (_, registry) = run_full(records, MatchingConfig::default()).await;
    let entries: Vec<_> = registry.iter().collect();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].members, vec![0, 1]);
    assert_eq!(entries[0].method, MatchMethodType::ExactName);
}

#[tokio::test]
async fn empty_name_is_unblockable_but_survives_as_singleton() {
    let records = vec![
        person("1", "   ", "en", Some("M"), Some(1900)),
        person("2", "Jon Smith", "en", Some("M"), Some(1900)),
        person("3", "Jon Smith", "de", Some("M"), Some(1900)),
    ];
    let count = records.len();
    let (classes, registry) = run_full(records, MatchingConfig::default()).await;

    // The empty-named record never entered any block.
    assert!(registry.iter().all(|c| !c.members.contains(&0)));
    assert!(classes.iter().all(|c| !c.contains(&0)));
    // It still exists in the partition as an implicit singleton: every
    // index outside the classes is untouched, not lost.
    let touched: Vec<usize> = classes.iter().flatten().copied().collect();
    assert!(touched.iter().all(|&i| i < count));
    assert!(!touched.contains(&0));
}

#[tokio::test]
async fn shared_external_identifier_beats_name_divergence() {
    let mut a = person("1", "Lev Tolstoy", "en", Some("M"), Some(1828));
    a.external_identifiers
        .insert(("viaf".to_string(), "96987389".to_string()));
    let mut b = person("2", "Léon Tolstoï", "fr", Some("M"), Some(1828));
    b.external_identifiers
        .insert(("viaf".to_string(), "96987389".to_string()));
    let records = vec![a, b];
    let (classes, registry) = run_full(records, MatchingConfig::default()).await;

    assert!(classes.contains(&vec![0, 1]));
    let entry = registry.iter().find(|c| c.members == vec![0, 1]).unwrap();
    assert_eq!(entry.method, MatchMethodType::ExternalId);
}

#[tokio::test]
async fn transliteration_variants_group_across_editions() {
    let records = vec![
        person("1", "Antonín Dvořák", "cs", Some("M"), Some(1841)),
        person("2", "Antonin Dvorak", "en", Some("M"), Some(1841)),
        person("3", "Bedřich Smetana", "cs", Some("M"), Some(1824)),
    ];
    let (classes, registry) = run_full(records, MatchingConfig::default()).await;

    assert!(classes.contains(&vec![0, 1]));
    let entry = registry.iter().find(|c| c.members == vec![0, 1]).unwrap();
    assert_eq!(entry.method, MatchMethodType::Transliterated);
}

#[tokio::test]
async fn conflicting_exact_birth_dates_block_acceptance() {
    use chrono::NaiveDate;
    let mut a = person("1", "Jon Smith", "en", Some("M"), Some(1900));
    a.exact_birth_date = NaiveDate::from_ymd_opt(1900, 3, 1);
    let mut b = person("2", "Jon Smith", "de", Some("M"), Some(1900));
    b.exact_birth_date = NaiveDate::from_ymd_opt(1900, 7, 20);
    let (classes, _) = run_full(vec![a, b], MatchingConfig::default()).await;
    assert!(classes.is_empty());
}
