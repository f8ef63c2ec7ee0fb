// src/matching/manager.rs - Concurrent execution of the configured methods

use anyhow::{Context, Result};
use futures::future::join_all;
use log::{info, warn};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;

use crate::config::MatchingConfig;
use crate::matching::resolver::run_method;
use crate::models::{MatchMethodStats, MethodMatchResult, PersonRecord};

/// Run every enabled method over the shared record array.
///
/// Each method is a CPU-bound blocking task reading the `Arc`'d records
/// and producing only its private result; a semaphore bounds how many run
/// at once. Completion order is whatever the scheduler gives us — the
/// returned vector is re-ordered to the configuration's priority order so
/// the downstream first-accepted-wins fold stays deterministic.
pub async fn run_matching_pipeline(
    records: Arc<Vec<PersonRecord>>,
    config: Arc<MatchingConfig>,
) -> Result<Vec<MethodMatchResult>> {
    let start = Instant::now();
    let enabled: Vec<usize> = config
        .methods
        .iter()
        .enumerate()
        .filter(|(_, row)| row.enabled)
        .map(|(slot, _)| slot)
        .collect();
    info!(
        "Launching {} matching method(s) over {} records",
        enabled.len(),
        records.len()
    );

    let semaphore = Arc::new(Semaphore::new(config.max_concurrent_methods));
    let mut tasks: Vec<JoinHandle<Result<MethodMatchResult>>> = Vec::new();
    for slot in enabled {
        let records = Arc::clone(&records);
        let config = Arc::clone(&config);
        let semaphore = Arc::clone(&semaphore);
        tasks.push(tokio::spawn(async move {
            let _permit = semaphore
                .acquire_owned()
                .await
                .context("Failed to acquire method slot")?;
            let handle = tokio::task::spawn_blocking(move || {
                let row = &config.methods[slot];
                let started = Instant::now();
                let result = run_method(&records, row, &config);
                info!(
                    "{} finished in {:.2?}: {} groups",
                    row.method,
                    started.elapsed(),
                    result.accepted.len()
                );
                result
            });
            handle.await.context("Matching task panicked")
        }));
    }

    let mut results = Vec::new();
    for join_result in join_all(tasks).await {
        match join_result {
            Ok(Ok(result)) => results.push(result),
            Ok(Err(e)) => warn!("Matching method failed and was skipped: {:?}", e),
            Err(e) => warn!("Matching task failed to join: {:?}", e),
        }
    }

    // Completion order is nondeterministic; the registry fold depends on
    // priority order, so order results by the configuration table.
    let priority = |result: &MethodMatchResult| {
        config
            .methods
            .iter()
            .position(|row| row.method == result.method)
            .unwrap_or(usize::MAX)
    };
    results.sort_by_key(priority);

    info!(
        "Matching pipeline completed in {:.2?}: {} method results",
        start.elapsed(),
        results.len()
    );
    Ok(results)
}

/// One-line-per-method summary, logged at the end of a run.
pub fn log_method_summary(stats: &[MatchMethodStats]) {
    info!("===== METHOD SUMMARY =====");
    for s in stats {
        info!(
            "  {}: {} groups, {} records, avg confidence {:.3}, avg size {:.1} ({} scored, {} conflicts, {} below threshold)",
            s.method,
            s.groups_created,
            s.records_matched,
            s.avg_confidence,
            s.avg_group_size,
            s.candidates_scored,
            s.rejected_conflict,
            s.rejected_below_threshold
        );
    }
    info!("==========================");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MatchMethodType;

    fn fixture() -> Vec<PersonRecord> {
        let mut a = PersonRecord::new("1", "Jon Smith", "en");
        a.gender = Some("M".into());
        a.birth_year = Some(1900);
        let mut b = PersonRecord::new("2", "Jon Smith", "fr");
        b.gender = Some("M".into());
        b.birth_year = Some(1900);
        let mut c = PersonRecord::new("3", "Ada Lovelace", "en");
        c.gender = Some("F".into());
        c.birth_year = Some(1815);
        vec![a, b, c]
    }

    #[tokio::test]
    async fn test_results_come_back_in_priority_order() {
        let records = Arc::new(fixture());
        let config = Arc::new(MatchingConfig::default());
        let results = run_matching_pipeline(records, Arc::clone(&config))
            .await
            .unwrap();
        let expected: Vec<MatchMethodType> = config
            .methods
            .iter()
            .filter(|m| m.enabled)
            .map(|m| m.method)
            .collect();
        let got: Vec<MatchMethodType> = results.iter().map(|r| r.method).collect();
        assert_eq!(got, expected);
    }

    #[tokio::test]
    async fn test_identical_names_match_across_editions() {
        let records = Arc::new(fixture());
        let config = Arc::new(MatchingConfig::default());
        let results = run_matching_pipeline(records, config).await.unwrap();
        let exact = results
            .iter()
            .find(|r| r.method == MatchMethodType::ExactName)
            .unwrap();
        assert_eq!(exact.accepted.len(), 1);
        assert_eq!(exact.accepted[0].members, vec![0, 1]);
    }
}
