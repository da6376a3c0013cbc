//! 2-hop pruned landmark labeling over the residual core (`spec.md` §4.4).
//!
//! Each core vertex is used once as a Dijkstra source, in ascending id
//! order (id 0 is the most important vertex by construction, see
//! `spec.md` §3). A candidate label entry `(s, d)` for vertex `v` is
//! dropped whenever the bit-parallel sketch or an already-built label pair
//! can already certify a path of length `<= d` — the standard PLL
//! correctness argument: what's pruned is always recoverable through some
//! earlier, still-present landmark.
//!
//! Landmark rounds are sequential by nature (each depends on every label
//! built by an earlier round), so unlike `bp.rs` this module doesn't fan
//! out over rayon; the parallelism budget here goes into label lookups at
//! query time instead.

use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use fixedbitset::FixedBitSet;

use crate::bp::query_by_bp;
use crate::error::{CoreTreeError, Result};
use crate::io::*;
use crate::types::{BpLabel, MAX_CORE_DIST};

/// One core vertex's label: `(landmark id, distance)` pairs, sorted
/// ascending by landmark id so two labels can be combined by a linear
/// merge join.
pub type CoreLabel = Vec<(u32, u32)>;

fn merge_has_at_most(a: &CoreLabel, b: &CoreLabel, bound: u32) -> bool {
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        match a[i].0.cmp(&b[j].0) {
            std::cmp::Ordering::Less => i += 1,
            std::cmp::Ordering::Greater => j += 1,
            std::cmp::Ordering::Equal => {
                if a[i].1 + b[j].1 <= bound {
                    return true;
                }
                i += 1;
                j += 1;
            }
        }
    }
    false
}

/// Combine two core labels into a shortest-path estimate, or `None` if they
/// share no landmark (`spec.md` §4.5's core/tree-hub 2-hop combine).
pub fn core_query(a: &CoreLabel, b: &CoreLabel) -> Option<u32> {
    let (mut i, mut j) = (0, 0);
    let mut best: Option<u32> = None;
    while i < a.len() && j < b.len() {
        match a[i].0.cmp(&b[j].0) {
            std::cmp::Ordering::Less => i += 1,
            std::cmp::Ordering::Greater => j += 1,
            std::cmp::Ordering::Equal => {
                let sum = a[i].1 + b[j].1;
                best = Some(best.map_or(sum, |b| b.min(sum)));
                i += 1;
                j += 1;
            }
        }
    }
    best
}

/// Build one label per core vertex; non-core vertices get an empty label.
///
/// Errors with [`CoreTreeError::BudgetExceeded`] if a shortest-path distance
/// would exceed [`MAX_CORE_DIST`] — a defensive cap, never hit on any
/// reasonable input, that stops a pathological edge-weight blow-up from
/// spinning the Dijkstra sweep forever.
pub fn compute_core_label(
    n: usize,
    core_vertices: &[u32],
    core_adj: &[Vec<(u32, i32)>],
    bp: &[BpLabel],
) -> Result<Vec<CoreLabel>> {
    let mut labels: Vec<CoreLabel> = vec![Vec::new(); n];

    for &s in core_vertices {
        let mut dist = vec![u32::MAX; n];
        let mut visited = FixedBitSet::with_capacity(n);
        dist[s as usize] = 0;
        let mut heap = BinaryHeap::new();
        heap.push(Reverse((0u32, s)));

        while let Some(Reverse((d, v))) = heap.pop() {
            if visited[v as usize] {
                continue;
            }
            if d > dist[v as usize] {
                continue;
            }
            if d > MAX_CORE_DIST {
                return Err(CoreTreeError::BudgetExceeded(d));
            }
            visited.set(v as usize, true);

            if v == s {
                labels[s as usize].push((s, 0));
            } else {
                if let Some(est) = query_by_bp(&bp[s as usize], &bp[v as usize]) {
                    if est <= d {
                        continue;
                    }
                }
                if merge_has_at_most(&labels[s as usize], &labels[v as usize], d) {
                    continue;
                }
                labels[v as usize].push((s, d));
            }

            for &(u, w) in &core_adj[v as usize] {
                let nd = d + w as u32;
                if nd < dist[u as usize] {
                    dist[u as usize] = nd;
                    heap.push(Reverse((nd, u)));
                }
            }
        }
    }

    Ok(labels)
}

/// Write `label-core-W.bin`.
pub fn write_core_label_bin(path: impl AsRef<Path>, labels: &[CoreLabel]) -> Result<()> {
    let path = path.as_ref();
    let file = std::fs::File::create(path).map_err(|e| CoreTreeError::Fatal {
        path: path.display().to_string(),
        source: e,
    })?;
    let mut w = BufWriter::new(file);
    write_u32(&mut w, labels.len() as u32).unwrap();
    for label in labels {
        write_u32(&mut w, label.len() as u32).unwrap();
        for &(id, d) in label {
            write_u32(&mut w, id).unwrap();
            write_u32(&mut w, d).unwrap();
        }
    }
    w.flush().map_err(|e| CoreTreeError::Fatal {
        path: path.display().to_string(),
        source: e,
    })?;
    Ok(())
}

/// Read `label-core-W.bin`.
pub fn load_core_label_bin(path: impl AsRef<Path>) -> Result<Vec<CoreLabel>> {
    let path = path.as_ref();
    let file = std::fs::File::open(path).map_err(|e| CoreTreeError::UnreadableArtifact {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;
    let mut r = BufReader::new(file);
    let bad = |e: std::io::Error| CoreTreeError::UnreadableArtifact {
        path: path.display().to_string(),
        reason: e.to_string(),
    };
    let n = read_u32(&mut r).map_err(bad)? as usize;
    let mut labels = Vec::with_capacity(n);
    for _ in 0..n {
        let len = read_u32(&mut r).map_err(bad)? as usize;
        let mut label = Vec::with_capacity(len);
        for _ in 0..len {
            let id = read_u32(&mut r).map_err(bad)?;
            let d = read_u32(&mut r).map_err(bad)?;
            label.push((id, d));
        }
        labels.push(label);
    }
    Ok(labels)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bp::construct_bp;
    use crate::types::Graph;

    fn clique(n: usize) -> (Vec<u32>, Vec<Vec<(u32, i32)>>, Graph) {
        let lists: Vec<Vec<u32>> = (0..n)
            .map(|v| (0..n as u32).filter(|&u| u != v as u32).collect())
            .collect();
        let graph = Graph::from_adjacency(lists.clone());
        let adj: Vec<Vec<(u32, i32)>> = lists
            .into_iter()
            .map(|l| l.into_iter().map(|u| (u, 1)).collect())
            .collect();
        ((0..n as u32).collect(), adj, graph)
    }

    #[test]
    fn labels_recover_exact_distances_on_a_clique() {
        let (core_vertices, core_adj, graph) = clique(8);
        let bp = construct_bp(&graph, 4);
        let labels = compute_core_label(graph.n(), &core_vertices, &core_adj, &bp).unwrap();
        for u in 0..8u32 {
            for v in 0..8u32 {
                let expected = if u == v { 0 } else { 1 };
                let got = core_query(&labels[u as usize], &labels[v as usize]).unwrap();
                assert_eq!(got, expected);
            }
        }
    }

    #[test]
    fn round_trips_through_binary_file() {
        let (core_vertices, core_adj, graph) = clique(4);
        let bp = construct_bp(&graph, 4);
        let labels = compute_core_label(graph.n(), &core_vertices, &core_adj, &bp).unwrap();
        let dir = std::env::temp_dir().join(format!("core_tree_label_test_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("label-core-0.bin");
        write_core_label_bin(&path, &labels).unwrap();
        let loaded = load_core_label_bin(&path).unwrap();
        assert_eq!(loaded.len(), labels.len());
        std::fs::remove_dir_all(&dir).ok();
    }
}
