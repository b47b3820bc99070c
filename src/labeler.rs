//! Connected component labeling using union-find.
//!
//! Two-pass raster scan over (z, y, x). Connectivity is axis-adjacent only:
//! 6-connected in 3D, which reduces to 4-connected on a planar grid.
//! Label numbers follow scan order and carry no meaning beyond identity.

use ndarray::{Array3, ArrayView3};

/// Dense label array. 0 is background, components are `1..=num_labels`.
#[derive(Debug, Clone)]
pub struct LabelGrid {
    labels: Array3<u32>,
    num_labels: usize,
}

impl LabelGrid {
    pub fn from_mask(mask: ArrayView3<'_, bool>) -> Self {
        let (depth, height, width) = mask.dim();
        let mut labels = Array3::<u32>::zeros(mask.raw_dim());
        let mut uf = UnionFind::new();

        for z in 0..depth {
            for y in 0..height {
                for x in 0..width {
                    if !mask[[z, y, x]] {
                        continue;
                    }

                    let mut assigned = None;
                    for neighbour in previous_neighbours(z, y, x) {
                        let label = labels[neighbour];
                        if label == 0 {
                            continue;
                        }
                        match assigned {
                            None => assigned = Some(label),
                            Some(current) if current != label => uf.union(current, label),
                            _ => {}
                        }
                    }
                    labels[[z, y, x]] = assigned.unwrap_or_else(|| uf.make_set());
                }
            }
        }

        let remap = uf.compact();
        let num_labels = remap.iter().copied().max().unwrap_or(0) as usize;
        labels.par_mapv_inplace(|label| remap[label as usize]);

        Self { labels, num_labels }
    }

    /// An all-background grid.
    pub fn empty(dim: (usize, usize, usize)) -> Self {
        Self {
            labels: Array3::zeros(dim),
            num_labels: 0,
        }
    }

    /// Number of connected components (excluding background).
    #[inline]
    pub fn num_labels(&self) -> usize {
        self.num_labels
    }

    #[inline]
    pub fn dim(&self) -> (usize, usize, usize) {
        self.labels.dim()
    }

    pub fn labels(&self) -> ArrayView3<'_, u32> {
        self.labels.view()
    }
}

/// Already-visited axis neighbours in raster order.
#[inline]
fn previous_neighbours(z: usize, y: usize, x: usize) -> impl Iterator<Item = [usize; 3]> {
    let back = (z > 0).then(|| [z - 1, y, x]);
    let up = (y > 0).then(|| [z, y - 1, x]);
    let left = (x > 0).then(|| [z, y, x - 1]);
    back.into_iter().chain(up).chain(left)
}

/// Disjoint sets over provisional labels. Slot 0 is the background.
#[derive(Debug)]
struct UnionFind {
    parent: Vec<u32>,
    rank: Vec<u8>,
}

impl UnionFind {
    fn new() -> Self {
        Self {
            parent: vec![0],
            rank: vec![0],
        }
    }

    fn make_set(&mut self) -> u32 {
        let label = self.parent.len() as u32;
        self.parent.push(label);
        self.rank.push(0);
        label
    }

    /// Find root with iterative path compression (two-pass).
    fn find(&mut self, label: u32) -> u32 {
        let mut root = label;
        while self.parent[root as usize] != root {
            root = self.parent[root as usize];
        }

        let mut current = label;
        while current != root {
            let next = self.parent[current as usize];
            self.parent[current as usize] = root;
            current = next;
        }
        root
    }

    /// Union by rank.
    fn union(&mut self, a: u32, b: u32) {
        let root_a = self.find(a);
        let root_b = self.find(b);
        if root_a == root_b {
            return;
        }
        let (rank_a, rank_b) = (self.rank[root_a as usize], self.rank[root_b as usize]);
        if rank_a < rank_b {
            self.parent[root_a as usize] = root_b;
        } else {
            self.parent[root_b as usize] = root_a;
            if rank_a == rank_b {
                self.rank[root_a as usize] += 1;
            }
        }
    }

    /// Map every provisional label to a dense final label `1..=k`, numbered
    /// in order of first appearance of each root. Index 0 maps to 0.
    fn compact(&mut self) -> Vec<u32> {
        let len = self.parent.len();
        let mut root_label = vec![0u32; len];
        let mut remap = vec![0u32; len];
        let mut next = 0;

        for label in 1..len as u32 {
            let root = self.find(label) as usize;
            if root_label[root] == 0 {
                next += 1;
                root_label[root] = next;
            }
            remap[label as usize] = root_label[root];
        }
        remap
    }
}
