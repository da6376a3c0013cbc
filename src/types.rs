//! Core data types shared by every build stage and the query engine.
//!
//! See `SPEC_FULL.md` §3 for the invariants these types must uphold.

/// Number of bit-parallel roots (`spec.md` §3, §4.2).
pub const R: usize = 4;
/// Sentinel distance meaning "unreachable" in 8-bit distance fields.
pub const MAXD: u8 = 120;
/// Upper bound on concurrent BP root-BFS workers.
pub const MAX_BP_THREADS: usize = 8;
/// Safety cap on a single core-label Dijkstra distance (`core_label`
/// module). Never reached on any graph this engine is meant for; it exists
/// so a pathological or adversarial edge-weight blow-up from repeated
/// contraction reports a [`crate::error::CoreTreeError::BudgetExceeded`]
/// instead of the labeling loop spinning forever.
pub const MAX_CORE_DIST: u32 = 1_000_000;
/// Sentinel marking a rule-1/rule-2 representative id range, mirrors the
/// original `MAXN` encoding trick for the remap table.
pub const MAXN: i64 = 1_000_000_000;

/// A finite or infinite distance, as returned by [`crate::query::CoreTreeIndex::distance`].
///
/// Kept as a thin wrapper over `u32` (rather than a bare sentinel) so call
/// sites can't accidentally compare an `INF` against an arithmetic sum
/// without noticing: `Distance::INF` is opaque, not `u32::MAX` plus slack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Distance(pub(crate) u32);

impl Distance {
    /// Unreachable.
    pub const INF: Distance = Distance(u32::MAX);

    /// Build a finite distance.
    pub fn finite(d: u32) -> Self {
        Distance(d)
    }

    /// `true` if this distance represents reachability.
    pub fn is_finite(self) -> bool {
        self.0 != u32::MAX
    }

    /// Unwrap to a plain integer, or `None` if unreachable.
    pub fn get(self) -> Option<u32> {
        self.is_finite().then_some(self.0)
    }
}

impl std::fmt::Display for Distance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_finite() {
            write!(f, "{}", self.0)
        } else {
            write!(f, "INF")
        }
    }
}

/// A dense, 0-indexed, undirected simple graph in CSR form.
///
/// `adj[offset(v)..offset(v) + deg(v) as usize]` is `v`'s neighbor list.
/// Vertex ids are dense and, per `spec.md` §3, ranked so that id 0 has the
/// highest importance (smaller id = more important / denser).
#[derive(Debug, Clone, Default)]
pub struct Graph {
    deg: Vec<u32>,
    offset: Vec<u64>,
    adj: Vec<u32>,
}

impl Graph {
    /// Build a CSR graph from per-vertex neighbor lists.
    ///
    /// Each inner list is sorted and deduplicated; self-loops are the
    /// caller's responsibility to exclude beforehand.
    pub fn from_adjacency(mut lists: Vec<Vec<u32>>) -> Self {
        for list in &mut lists {
            list.sort_unstable();
            list.dedup();
        }
        let deg: Vec<u32> = lists.iter().map(|l| l.len() as u32).collect();
        let mut offset = Vec::with_capacity(deg.len() + 1);
        let mut acc = 0u64;
        for &d in &deg {
            offset.push(acc);
            acc += d as u64;
        }
        offset.push(acc);
        let mut adj = Vec::with_capacity(acc as usize);
        for list in lists {
            adj.extend(list);
        }
        Graph { deg, offset, adj }
    }

    /// Rebuild from raw CSR parts (used when loading `graph-dis.bin`).
    pub fn from_csr_parts(deg: Vec<u32>, adj: Vec<u32>) -> Self {
        let mut offset = Vec::with_capacity(deg.len() + 1);
        let mut acc = 0u64;
        for &d in &deg {
            offset.push(acc);
            acc += d as u64;
        }
        offset.push(acc);
        Graph { deg, offset, adj }
    }

    /// Number of vertices.
    pub fn n(&self) -> usize {
        self.deg.len()
    }

    /// Total directed degree (`2 * undirected edge count`).
    pub fn m(&self) -> u64 {
        *self.offset.last().unwrap_or(&0)
    }

    /// Degree of vertex `v`.
    pub fn degree(&self, v: u32) -> u32 {
        self.deg[v as usize]
    }

    /// Neighbor slice of vertex `v`, in ascending id order.
    pub fn neighbors(&self, v: u32) -> &[u32] {
        let start = self.offset[v as usize] as usize;
        let end = self.offset[v as usize + 1] as usize;
        &self.adj[start..end]
    }

    /// Raw degree array, for serialization.
    pub fn deg_slice(&self) -> &[u32] {
        &self.deg
    }

    /// Raw concatenated adjacency array, for serialization.
    pub fn adj_slice(&self) -> &[u32] {
        &self.adj
    }
}

/// How an original vertex id maps onto the renumbered, deduplicated id space
/// (`spec.md` §3's remap table `nid`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemapEntry {
    /// A kept vertex, with its dense renumbered id.
    Kept(u32),
    /// Equivalent to `Kept` vertex `.0` by closed-neighborhood (rule 1):
    /// true twins are always mutually adjacent, so distance between the
    /// two is 1.
    Rule1(u32),
    /// Equivalent to `Kept` vertex `.0` by open-neighborhood (rule 2):
    /// these twins share a neighbor set but aren't adjacent to each other,
    /// so distance between the two is 2 (or INF if the representative has
    /// no neighbors at all).
    Rule2(u32),
}

/// Bit-parallel distance sketch for one vertex (`spec.md` §3, §4.2).
#[derive(Debug, Clone, Copy)]
pub struct BpLabel {
    /// Distance to each of the `R` roots (`MAXD` = unreachable).
    pub d: [u8; R],
    /// `s[i][0]`/`s[i][1]`: same-distance / one-closer seed bitmasks for root `i`.
    pub s: [[u64; 2]; R],
}

impl Default for BpLabel {
    fn default() -> Self {
        BpLabel {
            d: [MAXD; R],
            s: [[0u64; 2]; R],
        }
    }
}

/// One node of the peeled-vertex forest (`spec.md` §3's "Tree node").
///
/// Only a parent link is stored, never back-pointers to children — the tree
/// is built and walked in reverse peel order, so no recursive child-walk is
/// needed (`spec.md` §9's "cyclic references" design note).
#[derive(Debug, Clone, Default)]
pub struct TreeNode {
    /// This node's vertex id.
    pub id: u32,
    /// Parent in the forest, if any.
    pub parent: Option<u32>,
    /// Root of this node's tree.
    pub root: u32,
    /// Path length from the root to this node, inclusive (`h` in spec.md).
    pub depth: u32,
    /// Size of the tree root's anchor (core-neighbor) set.
    pub rsize: u32,
    /// Neighbors at removal time: core neighbors first, then ascending rank.
    pub nbr: Vec<u32>,
    /// Edge weights parallel to `nbr`, in the reduced graph.
    pub cost: Vec<i32>,
    /// Ancestor ids from just above the root down to `self` (length `depth - rsize`).
    pub anc: Vec<u32>,
    /// Distances to `{root anchors} ++ {ancestors}` (length `depth`).
    pub dis: Vec<u8>,
}
