// src/export.rs - Augmented table and adjudication pair list

use anyhow::{Context, Result};
use log::info;
use serde_json::json;
use std::collections::HashMap;
use std::path::Path;

use crate::clustering::EquivalenceClass;
use crate::config::MatchingConfig;
use crate::ingest::RecordTable;
use crate::matching::resolver::AcceptedRegistry;
use crate::models::MethodMatchResult;

/// Write the input table back out with, per configured method, an integer
/// cluster id column and a confidence column, plus a final `valid_cluster`
/// column naming the accepted method for the record's registry cluster
/// (empty if the record was never merged).
pub fn write_augmented_table(
    path: &Path,
    table: &RecordTable,
    results: &[MethodMatchResult],
    registry: &AcceptedRegistry,
    config: &MatchingConfig,
) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create output file {}", path.display()))?;

    let methods: Vec<_> = config.enabled_methods().map(|m| m.method).collect();

    let mut headers = table.headers.clone();
    for method in &methods {
        headers.push(method.as_str().to_string());
        headers.push(format!("{}_confidence", method));
    }
    headers.push("valid_cluster".to_string());
    writer.write_record(&headers).context("Failed to write headers")?;

    // Per method: record index -> (cluster id, confidence), numbering that
    // method's accepted clusters in emission order.
    let mut assignments: HashMap<_, HashMap<usize, (usize, f64)>> = HashMap::new();
    for result in results {
        let per_record = assignments.entry(result.method).or_default();
        for (cluster_id, cluster) in result.accepted.iter().enumerate() {
            for &member in &cluster.members {
                per_record.entry(member).or_insert((cluster_id, cluster.confidence));
            }
        }
    }
    let primary = registry.primary_cluster_of(table.records.len());

    for (index, row) in table.rows.iter().enumerate() {
        let mut out = row.clone();
        // Rows may be ragged; pad to the header width before appending.
        out.resize(table.headers.len(), String::new());
        for method in &methods {
            match assignments.get(method).and_then(|a| a.get(&index)) {
                Some((cluster_id, confidence)) => {
                    out.push(cluster_id.to_string());
                    out.push(format!("{:.4}", confidence));
                }
                None => {
                    out.push(String::new());
                    out.push(String::new());
                }
            }
        }
        let valid = primary[index]
            .map(|slot| registry.get(slot).method.as_str().to_string())
            .unwrap_or_default();
        out.push(valid);
        writer
            .write_record(&out)
            .with_context(|| format!("Failed to write output row {}", index + 2))?;
    }
    writer.flush().context("Failed to flush output file")?;
    info!(
        "Wrote augmented table ({} rows) to {}",
        table.rows.len(),
        path.display()
    );
    Ok(())
}

/// Write the final partition as an id-pair table for downstream manual
/// adjudication: one row per within-cluster pair of every registry
/// cluster, tagged with the contributing method and its confidence.
pub fn write_pair_list(
    path: &Path,
    table: &RecordTable,
    registry: &AcceptedRegistry,
) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create pair file {}", path.display()))?;
    writer
        .write_record(["id_a", "id_b", "contributing_method", "confidence"])
        .context("Failed to write pair headers")?;

    let mut pairs = 0usize;
    for cluster in registry.iter() {
        for (slot, &a) in cluster.members.iter().enumerate() {
            for &b in &cluster.members[slot + 1..] {
                let confidence = format!("{:.4}", cluster.confidence);
                writer
                    .write_record([
                        table.records[a].id.as_str(),
                        table.records[b].id.as_str(),
                        cluster.method.as_str(),
                        confidence.as_str(),
                    ])
                    .context("Failed to write pair row")?;
                pairs += 1;
            }
        }
    }
    writer.flush().context("Failed to flush pair file")?;
    info!("Wrote {} adjudication pairs to {}", pairs, path.display());
    Ok(())
}

/// Write the equivalence classes as a JSON audit report: per class its
/// members (as record ids), contributing methods, best confidence, the
/// re-scored whole-class coherence, and the audit flags. This is the
/// artifact a reviewer reads when chasing cross-method chains.
pub fn write_class_report(
    path: &Path,
    table: &RecordTable,
    classes: &[EquivalenceClass],
) -> Result<()> {
    let payload: Vec<serde_json::Value> = classes
        .iter()
        .map(|class| {
            json!({
                "class_id": class.class_id,
                "size": class.members.len(),
                "record_ids": class
                    .members
                    .iter()
                    .map(|&m| format!("{}:{}", table.records[m].id, table.records[m].language))
                    .collect::<Vec<_>>(),
                "contributing_methods": class.contributing_methods,
                "best_confidence": class.best_confidence,
                "coherence": class.coherence,
                "cross_method": class.cross_method,
            })
        })
        .collect();
    let file = std::fs::File::create(path)
        .with_context(|| format!("Failed to create class report {}", path.display()))?;
    serde_json::to_writer_pretty(file, &payload).context("Failed to write class report")?;
    info!("Wrote {} class report entries to {}", classes.len(), path.display());
    Ok(())
}
