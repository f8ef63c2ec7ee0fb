// src/matching/confidence.rs - Attribute-agreement scoring for candidate clusters

use crate::models::{ClusterConfidence, PersonRecord};

const HARD_WEIGHT: f64 = 1.0;
const SOFT_WEIGHT: f64 = 0.5;
/// Soft attributes stop participating above this many distinct values;
/// a person legitimately holds several occupations.
const SOFT_MULTIPLICITY_LIMIT: usize = 2;
/// Floor for zero-evidence clusters in boosted mode, so they surface for
/// manual review instead of vanishing at 0.0.
pub const MIN_BOOSTED_CONFIDENCE: f64 = 0.05;

/// How one attribute behaves across a candidate cluster.
struct AttributeAgreement {
    /// Distinct non-missing values.
    distinct: usize,
    /// Members carrying a non-missing value.
    present: usize,
}

fn assess<F>(members: &[usize], value_fn: F) -> AttributeAgreement
where
    F: Fn(usize) -> Option<String>,
{
    let mut values: Vec<String> = Vec::new();
    let mut present = 0usize;
    for &index in members {
        if let Some(value) = value_fn(index) {
            present += 1;
            if !values.contains(&value) {
                values.push(value);
            }
        }
    }
    AttributeAgreement {
        distinct: values.len(),
        present,
    }
}

/// Score one candidate cluster by attribute agreement.
///
/// Hard attributes (gender, birth year, death year, exact birth date)
/// reject the cluster outright on any disagreement. Otherwise each hard
/// attribute contributes its full weight scaled by coverage — the fraction
/// of members actually carrying the value — so a cluster where most
/// members corroborate a signal outranks one that merely avoids conflict.
/// Occupation and citizenship are soft signals at half weight, counted
/// only while their multiplicity stays small. The result is normalized by
/// the maximum attainable sum into [0, 1].
pub fn score_cluster(
    records: &[PersonRecord],
    members: &[usize],
    boosted: bool,
) -> ClusterConfidence {
    debug_assert!(members.len() >= 2, "scoring needs at least a pair");
    let size = members.len() as f64;

    let hard = [
        assess(members, |i| records[i].gender_value().map(str::to_string)),
        assess(members, |i| records[i].birth_year.map(|y| y.to_string())),
        assess(members, |i| records[i].death_year.map(|y| y.to_string())),
        assess(members, |i| {
            records[i].exact_birth_date.map(|d| d.to_string())
        }),
    ];
    if hard.iter().any(|a| a.distinct > 1) {
        return ClusterConfidence::Conflict;
    }

    let mut attained = 0.0;
    let mut attainable = 0.0;
    for agreement in &hard {
        attainable += HARD_WEIGHT;
        attained += HARD_WEIGHT * agreement.present as f64 / size;
    }

    let soft = [
        assess(members, |i| {
            records[i].occupation_value().map(str::to_string)
        }),
        assess(members, |i| {
            records[i].citizenship_value().map(str::to_string)
        }),
    ];
    for agreement in &soft {
        if agreement.distinct > SOFT_MULTIPLICITY_LIMIT {
            continue;
        }
        attainable += SOFT_WEIGHT;
        if agreement.distinct == 1 {
            attained += SOFT_WEIGHT * agreement.present as f64 / size;
        }
    }

    let score = attained / attainable;
    if score == 0.0 && boosted {
        return ClusterConfidence::Score(MIN_BOOSTED_CONFIDENCE);
    }
    ClusterConfidence::Score(score)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn member(name: &str) -> PersonRecord {
        PersonRecord::new("Q1", name, "en")
    }

    fn cluster_of(records: &[PersonRecord]) -> Vec<usize> {
        (0..records.len()).collect()
    }

    #[test]
    fn test_gender_conflict_rejects() {
        let mut a = member("Jon Smith");
        a.gender = Some("M".into());
        let mut b = member("Jane Smith");
        b.gender = Some("F".into());
        let records = vec![a, b];
        assert_eq!(
            score_cluster(&records, &cluster_of(&records), false),
            ClusterConfidence::Conflict
        );
    }

    #[test]
    fn test_birth_year_conflict_rejects() {
        let mut a = member("Jon Smith");
        a.birth_year = Some(1900);
        let mut b = member("Jon Smith");
        b.birth_year = Some(1902);
        let records = vec![a, b];
        assert_eq!(
            score_cluster(&records, &cluster_of(&records), false),
            ClusterConfidence::Conflict
        );
    }

    #[test]
    fn test_exact_birth_date_conflict_rejects() {
        let mut a = member("Jon Smith");
        a.exact_birth_date = NaiveDate::from_ymd_opt(1900, 3, 1);
        let mut b = member("Jon Smith");
        b.exact_birth_date = NaiveDate::from_ymd_opt(1900, 3, 2);
        let records = vec![a, b];
        assert_eq!(
            score_cluster(&records, &cluster_of(&records), false),
            ClusterConfidence::Conflict
        );
    }

    #[test]
    fn test_agreement_with_coverage() {
        let mut a = member("Jon Smith");
        a.gender = Some("M".into());
        a.birth_year = Some(1900);
        let mut b = member("John Smith");
        b.gender = Some("M".into());
        b.birth_year = Some(1900);
        let records = vec![a, b];
        // gender 1.0 + birth 1.0 over 4 hard + 2 * 0.5 soft = 2.0 / 5.0.
        let score = score_cluster(&records, &cluster_of(&records), false);
        assert_eq!(score, ClusterConfidence::Score(0.4));
    }

    #[test]
    fn test_missing_placeholder_is_not_a_value() {
        let mut a = member("Jon Smith");
        a.gender = Some("M".into());
        let mut b = member("John Smith");
        b.gender = Some("unknown".into());
        let records = vec![a, b];
        // "unknown" must not conflict with "M"; coverage is 1 of 2.
        let score = score_cluster(&records, &cluster_of(&records), false);
        assert_eq!(score, ClusterConfidence::Score(0.5 / 5.0));
    }

    #[test]
    fn test_partial_coverage_scores_lower_than_full() {
        let mut a = member("Jon Smith");
        a.birth_year = Some(1900);
        let b = member("John Smith");
        let records_partial = vec![a.clone(), b];
        let mut c = member("John Smith");
        c.birth_year = Some(1900);
        let records_full = vec![a, c];
        let partial = score_cluster(&records_partial, &[0, 1], false)
            .value()
            .unwrap();
        let full = score_cluster(&records_full, &[0, 1], false).value().unwrap();
        assert!(full > partial);
    }

    #[test]
    fn test_multi_valued_occupation_is_not_penalized() {
        let occupations = ["writer", "politician", "painter"];
        let mut with_many: Vec<PersonRecord> = occupations
            .iter()
            .map(|o| {
                let mut r = member("Jon Smith");
                r.occupation = Some(o.to_string());
                r.birth_year = Some(1900);
                r
            })
            .collect();
        let baseline: Vec<PersonRecord> = (0..3)
            .map(|_| {
                let mut r = member("Jon Smith");
                r.birth_year = Some(1900);
                r
            })
            .collect();
        let many = score_cluster(&with_many, &[0, 1, 2], false).value().unwrap();
        let base = score_cluster(&baseline, &[0, 1, 2], false).value().unwrap();
        // Three distinct occupations drop the attribute from the
        // denominator entirely; the score must not fall below the
        // no-occupation baseline.
        assert!(many >= base);
        // Exactly two distinct values stays in the denominator uncredited.
        with_many[2].occupation = Some("writer".to_string());
        let two = score_cluster(&with_many, &[0, 1, 2], false).value().unwrap();
        assert!(two < many);
    }

    #[test]
    fn test_zero_evidence_scores_zero_not_rejected() {
        let records = vec![member("Jon Smith"), member("John Smith")];
        let score = score_cluster(&records, &cluster_of(&records), false);
        assert_eq!(score, ClusterConfidence::Score(0.0));
    }

    #[test]
    fn test_boosted_floors_zero_evidence() {
        let records = vec![member("Jon Smith"), member("John Smith")];
        let score = score_cluster(&records, &cluster_of(&records), true);
        assert_eq!(score, ClusterConfidence::Score(MIN_BOOSTED_CONFIDENCE));
    }

    #[test]
    fn test_full_agreement_full_coverage_is_one() {
        let make = || {
            let mut r = member("Jon Smith");
            r.gender = Some("M".into());
            r.birth_year = Some(1900);
            r.death_year = Some(1960);
            r.exact_birth_date = NaiveDate::from_ymd_opt(1900, 3, 1);
            r.occupation = Some("writer".into());
            r.citizenship = Some("GB".into());
            r
        };
        let records = vec![make(), make()];
        let score = score_cluster(&records, &cluster_of(&records), false);
        assert_eq!(score, ClusterConfidence::Score(1.0));
    }
}
