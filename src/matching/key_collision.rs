// src/matching/key_collision.rs - Candidate blocks from exact key equality

use log::warn;
use std::collections::hash_map::Entry;
use std::collections::HashMap;

use crate::utils::UnionFind;

/// Group indices sharing a non-null key. Indices whose key function yields
/// the "no key" sentinel never collide with anything. Blocks of size 1 are
/// suppressed (no duplicate possible); output order is the insertion order
/// of the first-seen key, so the result is deterministic given
/// deterministic input order.
pub fn block_by_key<F>(count: usize, key_fn: F) -> Vec<Vec<usize>>
where
    F: Fn(usize) -> Option<String>,
{
    let mut first_seen: Vec<String> = Vec::new();
    let mut buckets: HashMap<String, Vec<usize>> = HashMap::new();
    for index in 0..count {
        let Some(key) = key_fn(index) else { continue };
        match buckets.entry(key) {
            Entry::Occupied(mut e) => e.get_mut().push(index),
            Entry::Vacant(e) => {
                first_seen.push(e.key().clone());
                e.insert(vec![index]);
            }
        }
    }
    first_seen
        .into_iter()
        .filter_map(|key| {
            let block = buckets.remove(&key)?;
            (block.len() >= 2).then_some(block)
        })
        .collect()
}

/// Set-valued variant: two records land in the same block if their key
/// sets intersect, merged transitively via union-find. Blocks larger than
/// `max_block_size` are discarded defensively — a near-universal key (an
/// identifier source that tags everything, say) would otherwise swallow
/// the record set into one useless block.
pub fn block_by_key_set<F>(count: usize, keys_fn: F, max_block_size: usize) -> Vec<Vec<usize>>
where
    F: Fn(usize) -> Vec<String>,
{
    let mut owner: HashMap<String, usize> = HashMap::new();
    let mut uf = UnionFind::new(count);
    for index in 0..count {
        for key in keys_fn(index) {
            match owner.entry(key) {
                Entry::Occupied(e) => {
                    uf.union(*e.get(), index);
                }
                Entry::Vacant(e) => {
                    e.insert(index);
                }
            }
        }
    }

    let mut blocks = Vec::new();
    let mut discarded = 0usize;
    for group in uf.groups() {
        if group.len() < 2 {
            continue;
        }
        if group.len() > max_block_size {
            discarded += 1;
            continue;
        }
        blocks.push(group);
    }
    if discarded > 0 {
        warn!(
            "Discarded {} degenerate block(s) above {} members",
            discarded, max_block_size
        );
    }
    blocks
}
