// src/main.rs - The dedupe batch driver

use anyhow::{Context, Result};
use clap::Parser;
use dedupe_lib::clustering::merge_accepted_clusters;
use dedupe_lib::config::MatchingConfig;
use dedupe_lib::export::{write_augmented_table, write_class_report, write_pair_list};
use dedupe_lib::ingest::load_records;
use dedupe_lib::matching::manager::{log_method_summary, run_matching_pipeline};
use dedupe_lib::matching::resolver::resolve;
use dedupe_lib::utils::env::load_env;
use indicatif::{ProgressBar, ProgressStyle};
use log::info;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

#[derive(Parser)]
#[command(author, version, about = "Deduplicate cross-edition biographical records", long_about = None)]
struct DedupeArgs {
    /// Input CSV with the harvested record set
    #[arg(long)]
    input: PathBuf,

    /// Augmented output table
    #[arg(long, default_value = "clustered.csv")]
    output: PathBuf,

    /// Adjudication pair list
    #[arg(long)]
    pairs_output: Option<PathBuf>,

    /// JSON audit report of the final equivalence classes
    #[arg(long)]
    classes_output: Option<PathBuf>,

    /// Floor zero-evidence clusters at a minimal score for review
    #[arg(long)]
    boosted: bool,

    /// Discard blocks larger than this
    #[arg(long)]
    max_block_size: Option<usize>,

    /// Sorted-neighborhood window size
    #[arg(long)]
    window: Option<usize>,

    /// Sorted-neighborhood distance radius
    #[arg(long)]
    radius: Option<usize>,

    /// Disable progress output
    #[arg(long)]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    load_env();
    let args = DedupeArgs::parse();

    let run_id = Uuid::new_v4().to_string();
    info!("Starting person deduplication run {}", run_id);

    let mut config = MatchingConfig::from_env();
    if args.boosted {
        config.boosted = true;
    }
    if let Some(size) = args.max_block_size {
        config.max_block_size = size;
    }
    if let Some(window) = args.window {
        config.snm_window = window;
    }
    if let Some(radius) = args.radius {
        config.snm_radius = radius;
    }
    config.validate().context("Invalid matching configuration")?;
    config.log_config();

    let main_pb = if args.quiet {
        None
    } else {
        let pb = ProgressBar::new(4);
        pb.set_style(
            ProgressStyle::default_bar()
                .template(
                    "{spinner:.green} [{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}",
                )
                .unwrap()
                .progress_chars("█▉▊▋▌▍▎▏  "),
        );
        pb.set_message("Loading records...");
        Some(pb)
    };

    let mut phase_times: HashMap<&str, std::time::Duration> = HashMap::new();
    let run_start = Instant::now();

    // Phase 1: ingestion.
    let phase_start = Instant::now();
    let table = load_records(&args.input)?;
    info!(
        "Loaded {} records from {}",
        table.records.len(),
        args.input.display()
    );
    phase_times.insert("ingest", phase_start.elapsed());
    if let Some(pb) = &main_pb {
        pb.inc(1);
        pb.set_message("Matching...");
    }

    // Phase 2: concurrent per-method blocking, matching, and scoring.
    let phase_start = Instant::now();
    let records = Arc::new(table.records.clone());
    let config_arc = Arc::new(config.clone());
    let results = run_matching_pipeline(Arc::clone(&records), config_arc).await?;
    phase_times.insert("matching", phase_start.elapsed());
    if let Some(pb) = &main_pb {
        pb.inc(1);
        pb.set_message("Resolving clusters...");
    }

    // Phase 3: priority-ordered resolution and equivalence merging.
    let phase_start = Instant::now();
    let registry = resolve(&results);
    let classes = merge_accepted_clusters(&table.records, &registry, &config)?;
    phase_times.insert("resolution", phase_start.elapsed());
    if let Some(pb) = &main_pb {
        pb.inc(1);
        pb.set_message("Writing output...");
    }

    // Phase 4: output artifacts.
    let phase_start = Instant::now();
    write_augmented_table(&args.output, &table, &results, &registry, &config)?;
    if let Some(pairs_path) = &args.pairs_output {
        write_pair_list(pairs_path, &table, &registry)?;
    }
    if let Some(classes_path) = &args.classes_output {
        write_class_report(classes_path, &table, &classes)?;
    }
    phase_times.insert("export", phase_start.elapsed());
    if let Some(pb) = &main_pb {
        pb.inc(1);
        pb.finish_with_message(format!(
            "Done: {} equivalence classes from {} accepted clusters",
            classes.len(),
            registry.len()
        ));
    }

    let stats: Vec<_> = results.iter().map(|r| r.stats.clone()).collect();
    log_method_summary(&stats);
    let merged_records: usize = classes.iter().map(|c| c.members.len()).sum();
    let cross_method = classes.iter().filter(|c| c.cross_method).count();
    info!(
        "Run {} complete in {:.2?}: {} records, {} accepted clusters, {} equivalence classes ({} records merged, {} cross-method)",
        run_id,
        run_start.elapsed(),
        table.records.len(),
        registry.len(),
        classes.len(),
        merged_records,
        cross_method
    );
    for (phase, duration) in &phase_times {
        info!("  phase {}: {:.2?}", phase, duration);
    }

    Ok(())
}
