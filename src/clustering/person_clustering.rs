// src/clustering/person_clustering.rs - Accepted clusters into final equivalence classes

use anyhow::Result;
use log::{debug, info, warn};
use petgraph::graph::{NodeIndex, UnGraph};
use serde::Serialize;
use std::collections::HashMap;

use crate::config::MatchingConfig;
use crate::matching::confidence::score_cluster;
use crate::matching::resolver::AcceptedRegistry;
use crate::models::{ClusterConfidence, MatchMethodType, PersonRecord};

// Classes at or above this size get flagged for manual audit; transitive
// chains of weak pairwise evidence are the main false-positive source.
const LARGE_CLASS_THRESHOLD: usize = 10;

/// Node payload: the record index the node stands for.
#[derive(Debug, Clone)]
struct RecordNode {
    index: usize,
}

/// Edge payload aggregating every accepted cluster that linked two records.
#[derive(Debug, Clone, Serialize)]
pub struct EdgeDetails {
    /// (method, confidence) per contributing accepted cluster.
    pub contributing_methods: Vec<(MatchMethodType, f64)>,
}

/// One final equivalence class: a maximal set of record indices
/// transitively connected through accepted clusters.
#[derive(Debug, Clone, Serialize)]
pub struct EquivalenceClass {
    pub class_id: usize,
    /// Member record indices, ascending.
    pub members: Vec<usize>,
    /// Methods that contributed at least one merged cluster, in registry
    /// (priority) order, deduplicated.
    pub contributing_methods: Vec<MatchMethodType>,
    /// Best confidence among the contributing clusters.
    pub best_confidence: f64,
    /// The whole class re-scored as if it were a single candidate
    /// cluster. Cross-method chains can join records no single method
    /// ever compared; this makes the damage visible without vetoing the
    /// merge.
    pub coherence: Option<f64>,
    /// Whether the class was stitched together by more than one method.
    pub cross_method: bool,
}

/// Build the equivalence partition from the accepted registry.
///
/// An undirected graph gets one node per touched record and, per accepted
/// cluster, a star of edges from its first member — the connected
/// components are identical to the clique construction at a fraction of
/// the edges. Untouched records stay out of the graph; they are implicit
/// singletons of the final partition.
pub fn merge_accepted_clusters(
    records: &[PersonRecord],
    registry: &AcceptedRegistry,
    config: &MatchingConfig,
) -> Result<Vec<EquivalenceClass>> {
    let mut graph: UnGraph<RecordNode, EdgeDetails> = UnGraph::new_undirected();
    let mut node_of: HashMap<usize, NodeIndex> = HashMap::new();
    let mut edge_aggregation: HashMap<(NodeIndex, NodeIndex), EdgeDetails> = HashMap::new();

    for cluster in registry.iter() {
        let (&hub, rest) = cluster
            .members
            .split_first()
            .expect("registry clusters have at least two members");
        let hub_node = *node_of
            .entry(hub)
            .or_insert_with(|| graph.add_node(RecordNode { index: hub }));
        for &member in rest {
            let member_node = *node_of
                .entry(member)
                .or_insert_with(|| graph.add_node(RecordNode { index: member }));
            let edge_key = if hub_node < member_node {
                (hub_node, member_node)
            } else {
                (member_node, hub_node)
            };
            edge_aggregation
                .entry(edge_key)
                .and_modify(|details| {
                    details
                        .contributing_methods
                        .push((cluster.method, cluster.confidence));
                })
                .or_insert_with(|| EdgeDetails {
                    contributing_methods: vec![(cluster.method, cluster.confidence)],
                });
        }
    }
    for ((a, b), details) in edge_aggregation {
        graph.add_edge(a, b, details);
    }
    debug!(
        "Equivalence graph: {} nodes, {} edges",
        graph.node_count(),
        graph.edge_count()
    );

    // Manual DFS so each component comes back as its node set.
    let mut visited = vec![false; graph.node_count()];
    let mut components: Vec<Vec<NodeIndex>> = Vec::new();
    for start in graph.node_indices() {
        if visited[start.index()] {
            continue;
        }
        let mut component = Vec::new();
        let mut stack = vec![start];
        while let Some(current) = stack.pop() {
            if visited[current.index()] {
                continue;
            }
            visited[current.index()] = true;
            component.push(current);
            for neighbor in graph.neighbors(current) {
                if !visited[neighbor.index()] {
                    stack.push(neighbor);
                }
            }
        }
        components.push(component);
    }

    let mut classes = Vec::with_capacity(components.len());
    let mut cross_method_count = 0usize;
    let mut large_count = 0usize;
    for (class_id, component) in components.into_iter().enumerate() {
        let mut members: Vec<usize> = component.iter().map(|n| graph[*n].index).collect();
        members.sort_unstable();

        let mut contributing_methods: Vec<MatchMethodType> = Vec::new();
        let mut best_confidence: f64 = 0.0;
        for cluster in registry.iter() {
            if cluster.members.iter().all(|m| members.binary_search(m).is_ok()) {
                if !contributing_methods.contains(&cluster.method) {
                    contributing_methods.push(cluster.method);
                }
                best_confidence = best_confidence.max(cluster.confidence);
            }
        }

        let coherence = match score_cluster(records, &members, config.boosted) {
            ClusterConfidence::Conflict => None,
            ClusterConfidence::Score(s) => Some(s),
        };
        let cross_method = contributing_methods.len() > 1;
        if cross_method {
            cross_method_count += 1;
        }
        if members.len() >= LARGE_CLASS_THRESHOLD {
            large_count += 1;
            warn!(
                "Large equivalence class ({} members) from methods {:?}; review before trusting",
                members.len(),
                contributing_methods
            );
        }
        if coherence.is_none() {
            warn!(
                "Equivalence class of {} members has a hard attribute conflict after cross-method merging (methods {:?})",
                members.len(),
                contributing_methods
            );
        }

        classes.push(EquivalenceClass {
            class_id,
            members,
            contributing_methods,
            best_confidence,
            coherence,
            cross_method,
        });
    }

    info!(
        "Merged {} accepted clusters into {} equivalence classes ({} cross-method, {} large)",
        registry.len(),
        classes.len(),
        cross_method_count,
        large_count
    );
    Ok(classes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matching::resolver::AcceptedCluster;

    fn records_named(names: &[&str]) -> Vec<PersonRecord> {
        names
            .iter()
            .enumerate()
            .map(|(i, n)| PersonRecord::new(format!("Q{}", i), *n, "en"))
            .collect()
    }

    fn registry_of(entries: &[(Vec<usize>, MatchMethodType, f64)]) -> AcceptedRegistry {
        let mut registry = AcceptedRegistry::default();
        for (members, method, confidence) in entries {
            registry.insert(AcceptedCluster {
                members: members.clone(),
                method: *method,
                confidence: *confidence,
            });
        }
        registry
    }

    #[test]
    fn test_overlapping_clusters_merge_transitively() {
        let records = records_named(&["a", "b", "c", "d", "e"]);
        let registry = registry_of(&[
            (vec![0, 1], MatchMethodType::ExactName, 0.5),
            (vec![1, 2], MatchMethodType::Cologne, 0.4),
            (vec![3, 4], MatchMethodType::Fingerprint, 0.6),
        ]);
        let classes =
            merge_accepted_clusters(&records, &registry, &MatchingConfig::default()).unwrap();
        assert_eq!(classes.len(), 2);
        let chained = classes.iter().find(|c| c.members == vec![0, 1, 2]).unwrap();
        assert!(chained.cross_method);
        assert_eq!(
            chained.contributing_methods,
            vec![MatchMethodType::ExactName, MatchMethodType::Cologne]
        );
        assert!((chained.best_confidence - 0.5).abs() < 1e-12);
        let pair = classes.iter().find(|c| c.members == vec![3, 4]).unwrap();
        assert!(!pair.cross_method);
    }

    #[test]
    fn test_untouched_records_stay_out() {
        let records = records_named(&["a", "b", "c"]);
        let registry = registry_of(&[(vec![0, 1], MatchMethodType::ExactName, 0.5)]);
        let classes =
            merge_accepted_clusters(&records, &registry, &MatchingConfig::default()).unwrap();
        assert_eq!(classes.len(), 1);
        assert!(classes[0].members.iter().all(|&m| m != 2));
    }

    #[test]
    fn test_coherence_flags_conflicting_chain() {
        // Two clusters chain a male and a female record together; each
        // pairwise cluster was fine, the merged class is not.
        let mut records = records_named(&["a", "b", "c"]);
        records[0].gender = Some("M".into());
        records[2].gender = Some("F".into());
        let registry = registry_of(&[
            (vec![0, 1], MatchMethodType::ExactName, 0.5),
            (vec![1, 2], MatchMethodType::Cologne, 0.4),
        ]);
        let classes =
            merge_accepted_clusters(&records, &registry, &MatchingConfig::default()).unwrap();
        assert_eq!(classes.len(), 1);
        assert_eq!(classes[0].coherence, None);
    }
}
