// src/config.rs - Declarative per-method configuration for one resolution run

use anyhow::{ensure, Result};
use log::{debug, info};
use std::env;

use crate::models::MatchMethodType;

// Default acceptance thresholds. Near-exact methods run loose (the block
// key itself is strong evidence), aggressive normalization and phonetic
// methods run strict because their recall comes with coincidental
// collisions.
const DEFAULT_THRESHOLD_EXTERNAL_ID: f64 = 0.0;
const DEFAULT_THRESHOLD_EXACT_NAME: f64 = 0.05;
const DEFAULT_THRESHOLD_CASE_FOLD: f64 = 0.10;
const DEFAULT_THRESHOLD_TRANSLITERATED: f64 = 0.15;
const DEFAULT_THRESHOLD_FINGERPRINT: f64 = 0.25;
const DEFAULT_THRESHOLD_INITIALS: f64 = 0.45;
const DEFAULT_THRESHOLD_COLOGNE: f64 = 0.40;
const DEFAULT_THRESHOLD_SKELETON_SNM: f64 = 0.35;

const DEFAULT_MAX_BLOCK_SIZE: usize = 25;
const DEFAULT_SNM_WINDOW: usize = 50;
const DEFAULT_SNM_RADIUS: usize = 2;

/// One row of the method table.
#[derive(Debug, Clone)]
pub struct MethodConfig {
    pub method: MatchMethodType,
    pub threshold: f64,
    pub enabled: bool,
}

/// Configuration for a full resolution run. The `methods` table is in
/// priority order: the most precise evidence first, increasingly
/// aggressive methods after. The resolver's first-accepted-wins registry
/// depends on this ordering.
#[derive(Debug, Clone)]
pub struct MatchingConfig {
    pub methods: Vec<MethodConfig>,
    /// Floor zero-evidence clusters at a minimal non-zero score so they
    /// surface for manual review.
    pub boosted: bool,
    /// Subtracted from every method threshold. Replaces the original
    /// system's hidden on-threshold bonus with an explicit knob.
    pub threshold_slack: f64,
    /// Blocks larger than this are discarded as degenerate.
    pub max_block_size: usize,
    pub snm_window: usize,
    pub snm_radius: usize,
    /// Add a second, character-reversed sort pass to the SNM method.
    pub snm_zigzag: bool,
    /// Upper bound on concurrently executing method tasks.
    pub max_concurrent_methods: usize,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        let methods = vec![
            method_row(MatchMethodType::ExternalId, DEFAULT_THRESHOLD_EXTERNAL_ID),
            method_row(MatchMethodType::ExactName, DEFAULT_THRESHOLD_EXACT_NAME),
            method_row(MatchMethodType::CaseFold, DEFAULT_THRESHOLD_CASE_FOLD),
            method_row(MatchMethodType::Transliterated, DEFAULT_THRESHOLD_TRANSLITERATED),
            method_row(MatchMethodType::Fingerprint, DEFAULT_THRESHOLD_FINGERPRINT),
            method_row(MatchMethodType::Initials, DEFAULT_THRESHOLD_INITIALS),
            method_row(MatchMethodType::Cologne, DEFAULT_THRESHOLD_COLOGNE),
            method_row(MatchMethodType::SkeletonSnm, DEFAULT_THRESHOLD_SKELETON_SNM),
        ];
        Self {
            methods,
            boosted: false,
            threshold_slack: 0.0,
            max_block_size: DEFAULT_MAX_BLOCK_SIZE,
            snm_window: DEFAULT_SNM_WINDOW,
            snm_radius: DEFAULT_SNM_RADIUS,
            snm_zigzag: true,
            max_concurrent_methods: num_cpus::get().max(2),
        }
    }
}

fn method_row(method: MatchMethodType, threshold: f64) -> MethodConfig {
    MethodConfig {
        method,
        threshold,
        enabled: true,
    }
}

impl MatchingConfig {
    /// Default table with environment overrides applied. Every knob reads
    /// `DEDUPE_*`; per-method thresholds read
    /// `DEDUPE_THRESHOLD_<METHOD>` (e.g. `DEDUPE_THRESHOLD_COLOGNE`).
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(v) = parse_env::<bool>("DEDUPE_BOOSTED") {
            config.boosted = v;
        }
        if let Some(v) = parse_env::<f64>("DEDUPE_THRESHOLD_SLACK") {
            config.threshold_slack = v;
        }
        if let Some(v) = parse_env::<usize>("DEDUPE_MAX_BLOCK_SIZE") {
            config.max_block_size = v;
        }
        if let Some(v) = parse_env::<usize>("DEDUPE_SNM_WINDOW") {
            config.snm_window = v;
        }
        if let Some(v) = parse_env::<usize>("DEDUPE_SNM_RADIUS") {
            config.snm_radius = v;
        }
        if let Some(v) = parse_env::<bool>("DEDUPE_SNM_ZIGZAG") {
            config.snm_zigzag = v;
        }
        if let Some(v) = parse_env::<usize>("DEDUPE_MAX_CONCURRENT_METHODS") {
            config.max_concurrent_methods = v.max(1);
        }
        for row in &mut config.methods {
            let threshold_var = format!("DEDUPE_THRESHOLD_{}", row.method.as_str().to_uppercase());
            if let Some(v) = parse_env::<f64>(&threshold_var) {
                row.threshold = v;
            }
            let enabled_var = format!("DEDUPE_ENABLE_{}", row.method.as_str().to_uppercase());
            if let Some(v) = parse_env::<bool>(&enabled_var) {
                row.enabled = v;
            }
        }

        debug!("Matching config after env overrides: {:?}", config);
        config
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(!self.methods.is_empty(), "method table must not be empty");
        ensure!(self.snm_window >= 2, "SNM window must be at least 2");
        ensure!(self.max_block_size >= 2, "max block size must be at least 2");
        ensure!(
            self.threshold_slack >= 0.0 && self.threshold_slack < 1.0,
            "threshold slack must be in [0, 1)"
        );
        for row in &self.methods {
            ensure!(
                (0.0..=1.0).contains(&row.threshold),
                "threshold for {} must be in [0, 1]",
                row.method
            );
        }
        Ok(())
    }

    /// Threshold after slack, clamped at zero.
    pub fn effective_threshold(&self, row: &MethodConfig) -> f64 {
        (row.threshold - self.threshold_slack).max(0.0)
    }

    pub fn enabled_methods(&self) -> impl Iterator<Item = &MethodConfig> {
        self.methods.iter().filter(|m| m.enabled)
    }

    pub fn log_config(&self) {
        info!(
            "Matching configuration: {} methods, boosted={}, slack={:.2}, max_block_size={}, snm window={} radius={} zigzag={}",
            self.methods.iter().filter(|m| m.enabled).count(),
            self.boosted,
            self.threshold_slack,
            self.max_block_size,
            self.snm_window,
            self.snm_radius,
            self.snm_zigzag
        );
        for row in &self.methods {
            info!(
                "  {} threshold={:.2}{}",
                row.method,
                row.threshold,
                if row.enabled { "" } else { " (disabled)" }
            );
        }
    }
}

fn parse_env<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.parse::<T>().ok())
}
