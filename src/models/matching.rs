// src/models/matching.rs - Method identities, scores, and per-method results

use serde::Serialize;
use std::fmt;

/// Every configured blocking/matching method, in no particular order here;
/// priority lives in the configuration table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMethodType {
    /// Shared external identifier (set-valued key).
    ExternalId,
    /// Raw name, trimmed.
    ExactName,
    /// Lowercased, trimmed name.
    CaseFold,
    /// Transliterated name.
    Transliterated,
    /// Sorted unique tokens of the transliterated, squeezed name.
    Fingerprint,
    /// Forename tokens abbreviated to initials.
    Initials,
    /// Kölner Phonetik codes combined with birth/death years.
    Cologne,
    /// Sorted-neighborhood pass over the skeleton sort key.
    SkeletonSnm,
}

impl MatchMethodType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchMethodType::ExternalId => "external_id",
            MatchMethodType::ExactName => "exact_name",
            MatchMethodType::CaseFold => "case_fold",
            MatchMethodType::Transliterated => "transliterated",
            MatchMethodType::Fingerprint => "fingerprint",
            MatchMethodType::Initials => "initials",
            MatchMethodType::Cologne => "cologne",
            MatchMethodType::SkeletonSnm => "skeleton_snm",
        }
    }
}

impl fmt::Display for MatchMethodType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of scoring one candidate cluster: either the hard-attribute
/// rejection sentinel, or a normalized score in [0, 1]. The sentinel is
/// deliberately distinct from a zero score — "contradictory evidence" and
/// "no evidence either way" must never be conflated.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ClusterConfidence {
    /// Hard attributes disagree; the cluster can never be accepted.
    Conflict,
    Score(f64),
}

impl ClusterConfidence {
    pub fn is_conflict(&self) -> bool {
        matches!(self, ClusterConfidence::Conflict)
    }

    pub fn value(&self) -> Option<f64> {
        match self {
            ClusterConfidence::Conflict => None,
            ClusterConfidence::Score(s) => Some(*s),
        }
    }

    /// Whether this outcome clears an acceptance threshold. A conflict
    /// never does, whatever the threshold.
    pub fn meets(&self, threshold: f64) -> bool {
        match self {
            ClusterConfidence::Conflict => false,
            ClusterConfidence::Score(s) => *s >= threshold,
        }
    }
}

/// A candidate cluster that cleared its method's threshold. Members are
/// sorted and duplicate-free, which makes them directly usable as the
/// registry key.
#[derive(Debug, Clone, Serialize)]
pub struct ScoredCluster {
    pub members: Vec<usize>,
    pub confidence: f64,
}

/// Everything one method produced in one run.
#[derive(Debug, Clone)]
pub struct MethodMatchResult {
    pub method: MatchMethodType,
    /// Accepted clusters, in block-emission order.
    pub accepted: Vec<ScoredCluster>,
    pub stats: MatchMethodStats,
}

/// Per-method summary statistics, reported at the end of the run.
#[derive(Debug, Clone)]
pub struct MatchMethodStats {
    pub method: MatchMethodType,
    pub candidates_scored: usize,
    pub rejected_conflict: usize,
    pub rejected_below_threshold: usize,
    pub groups_created: usize,
    pub records_matched: usize,
    pub avg_confidence: f64,
    pub avg_group_size: f64,
}

impl MatchMethodStats {
    pub fn from_accepted(
        method: MatchMethodType,
        accepted: &[ScoredCluster],
        candidates_scored: usize,
        rejected_conflict: usize,
    ) -> Self {
        let groups_created = accepted.len();
        let records_matched: usize = accepted.iter().map(|c| c.members.len()).sum();
        let avg_confidence = if groups_created > 0 {
            accepted.iter().map(|c| c.confidence).sum::<f64>() / groups_created as f64
        } else {
            0.0
        };
        let avg_group_size = if groups_created > 0 {
            records_matched as f64 / groups_created as f64
        } else {
            0.0
        };
        Self {
            method,
            candidates_scored,
            rejected_conflict,
            rejected_below_threshold: candidates_scored
                .saturating_sub(rejected_conflict)
                .saturating_sub(groups_created),
            groups_created,
            records_matched,
            avg_confidence,
            avg_group_size,
        }
    }
}
