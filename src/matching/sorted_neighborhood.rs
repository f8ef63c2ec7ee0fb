// src/matching/sorted_neighborhood.rs - Windowed matching over sorted comparison keys

use crate::utils::UnionFind;

/// Tunables for one sorted-neighborhood run. The window trades recall for
/// cost: true duplicates only escape a window when the sort key is
/// degenerate for them.
#[derive(Debug, Clone, Copy)]
pub struct SnmParams {
    pub window: usize,
    pub radius: usize,
}

/// Sorted-neighborhood matching over `count` record indices.
///
/// For every sort-key function (pass two for zig-zag comparison — the key
/// and its character-reversed form — to recover pairs that agree in suffix
/// but diverge in prefix), the index list is stable-sorted by that key;
/// equal keys keep their input order, and every pair inside the window is
/// still distance-checked, so ties never hide a comparison. Pairs whose
/// distance is within the radius are merged transitively; the union-find
/// components of size >= 2 are the candidate clusters.
///
/// An index whose key function yields the sentinel sits out that pass.
/// `distance_fn` must be symmetric and a metric for the radius check to be
/// sound; that is the caller's contract and is not verified here.
pub fn sorted_neighborhood<K, KF, D>(
    count: usize,
    sort_key_fns: &[KF],
    distance_fn: D,
    params: SnmParams,
) -> Vec<Vec<usize>>
where
    K: Ord,
    KF: Fn(usize) -> Option<K>,
    D: Fn(usize, usize) -> usize,
{
    let mut uf = UnionFind::new(count);

    for key_fn in sort_key_fns {
        let mut keyed: Vec<(K, usize)> = (0..count)
            .filter_map(|index| key_fn(index).map(|key| (key, index)))
            .collect();
        // Stable sort on the key alone preserves input order within ties.
        keyed.sort_by(|a, b| a.0.cmp(&b.0));

        for start in 0..keyed.len() {
            let end = (start + params.window).min(keyed.len());
            for other in start + 1..end {
                let a = keyed[start].1;
                let b = keyed[other].1;
                if distance_fn(a, b) <= params.radius {
                    uf.union(a, b);
                }
            }
        }
    }

    uf.groups().into_iter().filter(|g| g.len() >= 2).collect()
}
