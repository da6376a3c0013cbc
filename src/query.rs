//! Top-level distance oracle (`spec.md` §4.5).
//!
//! Combines the three label layers: a bit-parallel lower bound/estimate, a
//! tree-term fallback for two peeled vertices in the same tree, and a
//! core/tree-hub 2-hop combine for everything else. Resolves rule-1/rule-2
//! equivalence before touching any of them.

use std::path::{Path, PathBuf};

use crate::bp::{load_bp_bin, lower_bound_by_bp, query_by_bp};
use crate::core_label::{core_query, load_core_label_bin, CoreLabel};
use crate::error::Result;
use crate::ingest::load_graph_bin;
use crate::tree::{load_tree_bin, tree_distance};
use crate::types::{BpLabel, Distance, Graph, RemapEntry, TreeNode};

/// Read-only handle over every artifact needed to answer distance queries.
///
/// Missing or truncated optional layers (bp/tree/core) degrade query
/// quality but never fail `load` — only `graph-dis.bin` is mandatory, since
/// every other layer is an accelerant over the remap table it defines.
pub struct CoreTreeIndex {
    graph: Graph,
    n_original: usize,
    remap: Vec<RemapEntry>,
    bp: Option<Vec<BpLabel>>,
    tree_nodes: Option<Vec<Option<TreeNode>>>,
    core_labels: Option<Vec<CoreLabel>>,
}

/// Resolve a remap entry to `(representative id, equivalence offset)`.
///
/// Offset `0` means `v` is its own representative. Offset `1` is rule-1
/// (closed-neighborhood) equivalence — true twins, always adjacent to their
/// representative, so distance 1. Offset `2` is rule-2 (open-neighborhood)
/// equivalence — twins that share a neighbor set but are *not* adjacent to
/// each other, so distance 2 (or unreachable if the representative itself
/// has no neighbors at all).
fn resolve(v: u32, remap: &[RemapEntry]) -> (u32, u32) {
    match remap[v as usize] {
        RemapEntry::Kept(id) => (id, 0),
        RemapEntry::Rule1(id) => (id, 1),
        RemapEntry::Rule2(id) => (id, 2),
    }
}

impl CoreTreeIndex {
    /// Load all artifacts for a peel width `w` from `dir`
    /// (`graph-dis.bin`, `label-bp.bin`, `label-tree-{w}.bin`,
    /// `label-core-{w}.bin`).
    pub fn load(dir: impl AsRef<Path>, peel_width: u32) -> Result<Self> {
        let dir = dir.as_ref();
        let loaded = load_graph_bin(dir.join("graph-dis.bin"))?;

        let bp = load_bp_bin(dir.join("label-bp.bin")).ok();
        let tree_nodes = load_tree_bin(bin_name(dir, "label-tree", peel_width)).ok();
        let core_labels = load_core_label_bin(bin_name(dir, "label-core", peel_width)).ok();

        Ok(CoreTreeIndex {
            graph: loaded.graph,
            n_original: loaded.n_original,
            remap: loaded.remap,
            bp,
            tree_nodes,
            core_labels,
        })
    }

    fn entry_points(&self, v: u32) -> Vec<(u32, u32)> {
        let Some(nodes) = &self.tree_nodes else {
            return Vec::new();
        };
        match &nodes[v as usize] {
            None => vec![(v, 0)],
            Some(node) => {
                let root_node = nodes[node.root as usize]
                    .as_ref()
                    .expect("root is always a tree node");
                (0..node.rsize as usize)
                    .map(|i| (root_node.nbr[i], node.dis[i] as u32))
                    .collect()
            }
        }
    }

    fn query_dense(&self, u: u32, v: u32) -> Option<u32> {
        if u == v {
            return Some(0);
        }
        let mut best: Option<u32> = None;
        let consider = |d: u32, best: &mut Option<u32>| {
            *best = Some(best.map_or(d, |b| b.min(d)));
        };

        let mut bp_lower_bound = 0;
        if let Some(bp) = &self.bp {
            bp_lower_bound = lower_bound_by_bp(&bp[u as usize], &bp[v as usize]);
            if let Some(est) = query_by_bp(&bp[u as usize], &bp[v as usize]) {
                consider(est, &mut best);
                if best == Some(bp_lower_bound) {
                    return best; // can't beat the lower bound; stop early
                }
            }
        }

        if let Some(nodes) = &self.tree_nodes {
            if let (Some(un), Some(vn)) = (nodes[u as usize].as_ref(), nodes[v as usize].as_ref())
            {
                if let Some(d) = tree_distance(un, vn) {
                    consider(d, &mut best);
                }
            }
        }

        if let Some(core_labels) = &self.core_labels {
            let u_points = self.entry_points(u);
            let v_points = self.entry_points(v);
            for &(au, du) in &u_points {
                for &(av, dv) in &v_points {
                    if au == av {
                        consider(du + dv, &mut best);
                    } else if let Some(h) = core_query(&core_labels[au as usize], &core_labels[av as usize]) {
                        consider(du + h + dv, &mut best);
                    }
                }
            }
        }

        best
    }

    /// Exact shortest-path distance between two *original* vertex ids.
    ///
    /// Always returns; out-of-range or unreachable pairs saturate to
    /// [`Distance::INF`] rather than erroring (`spec.md` §7).
    pub fn distance(&self, u: u32, v: u32) -> Distance {
        if u as usize >= self.n_original || v as usize >= self.n_original {
            return Distance::INF;
        }
        if u == v {
            return Distance::finite(0);
        }
        let (du, eu) = resolve(u, &self.remap);
        let (dv, ev) = resolve(v, &self.remap);

        if du == dv {
            // Open-equivalence (offset 2) twins share a neighbor set but
            // aren't adjacent to each other, so the class is unreachable
            // from within itself whenever the representative has no
            // neighbors at all; closed-equivalence (offset 1) twins are
            // true twins, always mutually adjacent, distance 1.
            return if eu == 2 || ev == 2 {
                if du as usize >= self.graph.n() || self.graph.degree(du) == 0 {
                    Distance::INF
                } else {
                    Distance::finite(2)
                }
            } else {
                Distance::finite(1)
            };
        }
        if du as usize >= self.graph.n() || dv as usize >= self.graph.n() {
            return Distance::INF;
        }
        match self.query_dense(du, dv) {
            Some(d) => Distance::finite(d + eu + ev),
            None => Distance::INF,
        }
    }
}

fn bin_name(dir: &Path, stem: &str, w: u32) -> PathBuf {
    dir.join(format!("{stem}-{w}.bin"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bp::{construct_bp, write_bp_bin};
    use crate::config::{BuildConfig, IngestConfig};
    use crate::core_label::{compute_core_label, write_core_label_bin};
    use crate::ingest::{ingest, write_graph_bin};
    use crate::reduce::reduce;
    use crate::tree::{build_tree, write_tree_bin};

    fn build_index(text: &str, peel_width: u32, dir: &Path) -> CoreTreeIndex {
        let ingested = ingest(text, &IngestConfig::default()).unwrap();
        write_graph_bin(dir.join("graph-dis.bin"), &ingested).unwrap();

        let bp = construct_bp(&ingested.graph, 4);
        write_bp_bin(dir.join("label-bp.bin"), &bp).unwrap();

        let config = BuildConfig::new(peel_width);
        let reduced = reduce(&ingested.graph, &config);
        let tree_nodes = build_tree(ingested.graph.n(), &reduced);
        write_tree_bin(bin_name(dir, "label-tree", peel_width), &tree_nodes).unwrap();

        let core_labels = compute_core_label(
            ingested.graph.n(),
            &reduced.core_vertices,
            &reduced.core_adj,
            &bp,
        )
        .unwrap();
        write_core_label_bin(bin_name(dir, "label-core", peel_width), &core_labels).unwrap();

        CoreTreeIndex::load(dir, peel_width).unwrap()
    }

    fn path_text(n: usize) -> String {
        (0..n - 1)
            .map(|v| format!("{} {}\n", v, v + 1))
            .collect()
    }

    #[test]
    fn exact_distance_on_a_path_with_a_large_core() {
        let dir = std::env::temp_dir().join(format!("core_tree_query_test_path_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let index = build_index(&path_text(12), 0, &dir);
        for u in 0..12u32 {
            for v in 0..12u32 {
                let expected = (u as i32 - v as i32).unsigned_abs();
                assert_eq!(index.distance(u, v).get(), Some(expected), "{u},{v}");
            }
        }
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn exact_distance_on_a_path_with_full_peeling() {
        let dir = std::env::temp_dir().join(format!("core_tree_query_test_peel_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let index = build_index(&path_text(10), 100, &dir);
        for u in 0..10u32 {
            for v in 0..10u32 {
                let expected = (u as i32 - v as i32).unsigned_abs();
                assert_eq!(index.distance(u, v).get(), Some(expected), "{u},{v}");
            }
        }
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn twin_vertices_resolve_through_remap() {
        let dir = std::env::temp_dir().join(format!("core_tree_query_test_twin_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        // 0 and 1 are rule-2 twins, both adjacent to {2,3} only.
        let index = build_index("0 2\n0 3\n1 2\n1 3\n", 0, &dir);
        assert_eq!(index.distance(0, 1).get(), Some(2));
        assert_eq!(index.distance(0, 2).get(), Some(1));
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn isolated_open_twins_are_unreachable() {
        let dir = std::env::temp_dir().join(format!("core_tree_query_test_isolated_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        // 0 and 1 never appear in an edge, so both have an empty (and thus
        // equal) open neighborhood: rule-2 twins of each other, but with no
        // path between them at all since neither has any neighbor.
        let index = build_index("2 3\n", 0, &dir);
        assert!(!index.distance(0, 1).is_finite());
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn rule1_twins_resolve_through_remap() {
        let dir = std::env::temp_dir().join(format!("core_tree_query_test_rule1_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        // 0 and 1 share a closed neighborhood {0,1,2,3} and are directly
        // adjacent (edge "0 1"): true twins are always adjacent, distance 1.
        let index = build_index("0 1\n0 2\n0 3\n1 2\n1 3\n", 0, &dir);
        assert_eq!(index.distance(0, 1).get(), Some(1));
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn out_of_range_vertex_is_unreachable() {
        let dir = std::env::temp_dir().join(format!("core_tree_query_test_oob_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let index = build_index("0 1\n1 2\n", 0, &dir);
        assert!(!index.distance(0, 999).is_finite());
        std::fs::remove_dir_all(&dir).ok();
    }
}
