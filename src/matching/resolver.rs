// src/matching/resolver.rs - Method dispatch and the accepted-cluster registry

use log::debug;
use std::collections::HashMap;
use strsim::levenshtein;

use crate::config::{MatchingConfig, MethodConfig};
use crate::matching::confidence::score_cluster;
use crate::matching::key_collision::{block_by_key, block_by_key_set};
use crate::matching::sorted_neighborhood::{sorted_neighborhood, SnmParams};
use crate::matching::keys;
use crate::models::{
    MatchMethodStats, MatchMethodType, MethodMatchResult, PersonRecord, ScoredCluster,
};

/// Run one configured method over the record array: block, score every
/// candidate, keep what clears the method's effective threshold.
///
/// Reads the shared record array only and writes nothing but its own
/// result, so any number of these may run concurrently.
pub fn run_method(
    records: &[PersonRecord],
    row: &MethodConfig,
    config: &MatchingConfig,
) -> MethodMatchResult {
    let candidates = generate_candidates(records, row.method, config);
    let threshold = config.effective_threshold(row);

    let mut accepted = Vec::new();
    let mut rejected_conflict = 0usize;
    let candidates_scored = candidates.len();
    for mut members in candidates {
        members.sort_unstable();
        members.dedup();
        let confidence = score_cluster(records, &members, config.boosted);
        if confidence.is_conflict() {
            rejected_conflict += 1;
            continue;
        }
        if confidence.meets(threshold) {
            accepted.push(ScoredCluster {
                members,
                confidence: confidence.value().expect("non-conflict score"),
            });
        }
    }

    debug!(
        "{}: {} candidates, {} accepted, {} attribute conflicts",
        row.method,
        candidates_scored,
        accepted.len(),
        rejected_conflict
    );

    let stats = MatchMethodStats::from_accepted(
        row.method,
        &accepted,
        candidates_scored,
        rejected_conflict,
    );
    MethodMatchResult {
        method: row.method,
        accepted,
        stats,
    }
}

fn generate_candidates(
    records: &[PersonRecord],
    method: MatchMethodType,
    config: &MatchingConfig,
) -> Vec<Vec<usize>> {
    let count = records.len();
    match method {
        MatchMethodType::ExternalId => block_by_key_set(
            count,
            |i| keys::external_id_keys(records, i),
            config.max_block_size,
        ),
        MatchMethodType::ExactName => block_by_key(count, |i| keys::exact_name(records, i)),
        MatchMethodType::CaseFold => block_by_key(count, |i| keys::case_fold(records, i)),
        MatchMethodType::Transliterated => {
            block_by_key(count, |i| keys::transliterated(records, i))
        }
        MatchMethodType::Fingerprint => block_by_key(count, |i| keys::fingerprint(records, i)),
        MatchMethodType::Initials => block_by_key(count, |i| keys::initials(records, i)),
        MatchMethodType::Cologne => block_by_key(count, |i| keys::cologne(records, i)),
        MatchMethodType::SkeletonSnm => {
            let params = SnmParams {
                window: config.snm_window,
                radius: config.snm_radius,
            };
            let distance =
                |a: usize, b: usize| levenshtein(&records[a].normalized_name, &records[b].normalized_name);
            let forward = |i: usize| keys::skeleton_sort_key(records, i);
            if config.snm_zigzag {
                let reversed = |i: usize| keys::skeleton_sort_key_reversed(records, i);
                type SortKeyFn<'a> = Box<dyn Fn(usize) -> Option<(i32, i32, String)> + 'a>;
                let passes: [SortKeyFn<'_>; 2] = [Box::new(forward), Box::new(reversed)];
                sorted_neighborhood(count, &passes, distance, params)
            } else {
                sorted_neighborhood(count, std::slice::from_ref(&forward), distance, params)
            }
        }
    }
}

/// An entry in the accepted registry: the winning method and confidence
/// for one canonical index-set.
#[derive(Debug, Clone)]
pub struct AcceptedCluster {
    pub members: Vec<usize>,
    pub method: MatchMethodType,
    pub confidence: f64,
}

/// The canonical accepted-cluster registry. Keyed by the sorted tuple of
/// member indices; the first insertion wins and later identical proposals
/// are silently absorbed, so iteration order is priority order as long as
/// results are folded in priority order.
#[derive(Debug, Default)]
pub struct AcceptedRegistry {
    clusters: Vec<AcceptedCluster>,
    index_of: HashMap<Vec<usize>, usize>,
}

impl AcceptedRegistry {
    /// Insert unless the identical index-set is already registered.
    /// Returns whether the cluster was newly inserted.
    pub fn insert(&mut self, cluster: AcceptedCluster) -> bool {
        debug_assert!(
            cluster.members.windows(2).all(|w| w[0] < w[1]),
            "registry keys must be sorted and duplicate-free"
        );
        if self.index_of.contains_key(&cluster.members) {
            return false;
        }
        self.index_of
            .insert(cluster.members.clone(), self.clusters.len());
        self.clusters.push(cluster);
        true
    }

    pub fn iter(&self) -> impl Iterator<Item = &AcceptedCluster> {
        self.clusters.iter()
    }

    pub fn len(&self) -> usize {
        self.clusters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clusters.is_empty()
    }

    /// For each record index, the registry cluster it belongs to —
    /// the first (highest-priority) one if it appears in several.
    pub fn primary_cluster_of(&self, count: usize) -> Vec<Option<usize>> {
        let mut assignment = vec![None; count];
        for (slot, cluster) in self.clusters.iter().enumerate() {
            for &member in &cluster.members {
                if assignment[member].is_none() {
                    assignment[member] = Some(slot);
                }
            }
        }
        assignment
    }

    pub fn get(&self, slot: usize) -> &AcceptedCluster {
        &self.clusters[slot]
    }
}

/// Fold per-method results, already ordered by method priority, into the
/// registry. Completion order of the concurrent method tasks is
/// irrelevant; only this fold order decides ties.
pub fn resolve(results: &[MethodMatchResult]) -> AcceptedRegistry {
    let mut registry = AcceptedRegistry::default();
    let mut absorbed = 0usize;
    for result in results {
        for cluster in &result.accepted {
            let inserted = registry.insert(AcceptedCluster {
                members: cluster.members.clone(),
                method: result.method,
                confidence: cluster.confidence,
            });
            if !inserted {
                absorbed += 1;
            }
        }
    }
    debug!(
        "Registry resolved: {} clusters, {} duplicate proposals absorbed",
        registry.len(),
        absorbed
    );
    registry
}
