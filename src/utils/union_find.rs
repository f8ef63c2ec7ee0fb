// src/utils/union_find.rs - Disjoint sets over dense record indices

/// Union-find with path compression and union by size. This is the arena
/// structure behind both the sorted-neighborhood matcher and set-valued
/// key blocking: transitive merges over dense indices, no allocation per
/// merge.
#[derive(Debug)]
pub struct UnionFind {
    parent: Vec<usize>,
    size: Vec<usize>,
}

impl UnionFind {
    pub fn new(count: usize) -> Self {
        Self {
            parent: (0..count).collect(),
            size: vec![1; count],
        }
    }

    pub fn find(&mut self, mut x: usize) -> usize {
        while self.parent[x] != x {
            // Path halving: point every other node at its grandparent.
            self.parent[x] = self.parent[self.parent[x]];
            x = self.parent[x];
        }
        x
    }

    /// Merge the sets containing `a` and `b`. Returns false if they were
    /// already in the same set.
    pub fn union(&mut self, a: usize, b: usize) -> bool {
        let mut ra = self.find(a);
        let mut rb = self.find(b);
        if ra == rb {
            return false;
        }
        if self.size[ra] < self.size[rb] {
            std::mem::swap(&mut ra, &mut rb);
        }
        self.parent[rb] = ra;
        self.size[ra] += self.size[rb];
        true
    }

    /// Every set as a vector of member indices, members in ascending index
    /// order, sets ordered by their smallest member. Deterministic given
    /// deterministic unions.
    pub fn groups(&mut self) -> Vec<Vec<usize>> {
        let count = self.parent.len();
        let mut root_slot = vec![usize::MAX; count];
        let mut groups: Vec<Vec<usize>> = Vec::new();
        for i in 0..count {
            let root = self.find(i);
            if root_slot[root] == usize::MAX {
                root_slot[root] = groups.len();
                groups.push(Vec::new());
            }
            groups[root_slot[root]].push(i);
        }
        groups
    }
}
