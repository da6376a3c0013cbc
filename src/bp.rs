//! Bit-parallel BFS distance sketch (`spec.md` §4.2).
//!
//! Builds `R` BFS trees from high-degree roots. Each root claims up to 63 of
//! its neighbors as "seeds", one per bit of a `u64`; as the BFS frontier
//! advances, seed bits are propagated to descendants and same-layer
//! siblings so that two labels can, in many cases, recover an exact
//! shortest-path distance through the root in O(1), and can always recover
//! an admissible lower bound via `|d_u - d_v|` (the triangle inequality).

use rayon::prelude::*;
use std::collections::VecDeque;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use crate::error::{CoreTreeError, Result};
use crate::io::*;
use crate::types::{BpLabel, Graph, MAXD, MAX_BP_THREADS, R};

const MAX_SEEDS: usize = 63;

struct RootResult {
    dist: Vec<u8>,
    seed: Vec<[u64; 2]>,
}

fn bfs_from_root(graph: &Graph, root: u32, seeds: &[u32]) -> RootResult {
    let n = graph.n();
    let mut dist = vec![MAXD; n];
    let mut seed = vec![[0u64; 2]; n];

    dist[root as usize] = 0;
    let mut queue = VecDeque::new();
    queue.push_back(root);

    for (bit, &w) in seeds.iter().enumerate() {
        dist[w as usize] = 1;
        seed[w as usize][0] |= 1u64 << bit;
        queue.push_back(w);
    }

    while let Some(v) = queue.pop_front() {
        let dv = dist[v as usize];
        let sv = seed[v as usize];
        for &u in graph.neighbors(v) {
            let du = dist[u as usize];
            if du == MAXD {
                dist[u as usize] = dv + 1;
                seed[u as usize][0] |= sv[0] | sv[1];
                queue.push_back(u);
            } else if du == dv {
                // Same-layer sibling edge: v's one-closer ancestors become
                // same-layer-reachable seeds for u.
                seed[u as usize][1] |= sv[0];
            }
        }
    }

    // Finalize: a seed that's already a direct ancestor (bit set in S[0])
    // doesn't need the weaker same-layer relation recorded too.
    for s in seed.iter_mut() {
        s[1] &= !s[0];
    }

    RootResult { dist, seed }
}

/// Pick `R` roots and each root's seed-neighbors in one pass (`spec.md`
/// §4.2 steps 1-2): the next unclaimed vertex in rank order becomes a root,
/// then up to 63 of its unclaimed neighbors (in adjacency order) become its
/// seeds. Everything picked — root or seed — is claimed immediately so a
/// later root can never reuse it, keeping every root's seed set disjoint
/// from every other root's.
fn pick_roots_and_seeds(graph: &Graph) -> Vec<(u32, Vec<u32>)> {
    let n = graph.n();
    let mut used = vec![false; n];
    let mut roots = Vec::with_capacity(R);
    for _ in 0..R {
        let Some(root) = (0..n as u32).find(|&v| !used[v as usize] && graph.degree(v) > 0) else {
            break;
        };
        used[root as usize] = true;
        let mut seeds = Vec::new();
        for &w in graph.neighbors(root) {
            if seeds.len() >= MAX_SEEDS {
                break;
            }
            if !used[w as usize] {
                used[w as usize] = true;
                seeds.push(w);
            }
        }
        roots.push((root, seeds));
    }
    roots
}

/// Build the bit-parallel label array for every vertex in `graph`.
///
/// Root BFS trees are independent read-only traversals, so they run
/// concurrently across a rayon pool bounded by `min(n_threads, R,
/// MAX_BP_THREADS)` (`spec.md` §5, §6) — there are never more than `R` roots,
/// so a wider pool than that would just sit idle.
pub fn construct_bp(graph: &Graph, n_threads: usize) -> Vec<BpLabel> {
    let n = graph.n();
    let roots = pick_roots_and_seeds(graph);
    let mut labels = vec![BpLabel::default(); n];

    let bounded = n_threads.min(R).min(MAX_BP_THREADS).max(1);
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(bounded)
        .build()
        .expect("bounded worker count always yields a valid thread pool");
    let results: Vec<RootResult> = pool.install(|| {
        roots
            .par_iter()
            .map(|(r, seeds)| bfs_from_root(graph, *r, seeds))
            .collect()
    });

    for (i, res) in results.into_iter().enumerate() {
        for v in 0..n {
            labels[v].d[i] = res.dist[v];
            labels[v].s[i] = res.seed[v];
        }
    }
    labels
}

/// Admissible lower bound on `dist(u, v)` from the BP sketch alone
/// (`spec.md` §4.5's `prune_by_bp`). Never overestimates; safe to use to
/// cut off further, more expensive combination once a matching upper bound
/// has already been found.
pub fn lower_bound_by_bp(u: &BpLabel, v: &BpLabel) -> u32 {
    (0..R)
        .filter(|&i| u.d[i] != MAXD && v.d[i] != MAXD)
        .map(|i| (u.d[i] as i32 - v.d[i] as i32).unsigned_abs())
        .max()
        .unwrap_or(0)
}

/// A route-valid upper bound candidate through one of the `R` roots, or
/// `None` if neither root reaches both `u` and `v` (`spec.md` §4.5's
/// `query_by_bp`).
///
/// A shared bit in `S[0]` only proves both endpoints have that seed as a
/// BFS-tree ancestor, not that one is an ancestor of the other, so the
/// walk through the seed has length `d_u + d_v - 2`, never `|d_u - d_v|`.
pub fn query_by_bp(u: &BpLabel, v: &BpLabel) -> Option<u32> {
    (0..R)
        .filter(|&i| u.d[i] != MAXD && v.d[i] != MAXD)
        .map(|i| {
            let du = u.d[i] as u32;
            let dv = v.d[i] as u32;
            let td = du + dv;
            if (u.s[i][0] & v.s[i][0]) != 0 {
                td - 2
            } else if (u.s[i][0] & v.s[i][1]) != 0 || (u.s[i][1] & v.s[i][0]) != 0 {
                td - 1
            } else {
                td
            }
        })
        .min()
}

/// Write `label-bp.bin`.
pub fn write_bp_bin(path: impl AsRef<Path>, labels: &[BpLabel]) -> Result<()> {
    let path = path.as_ref();
    let file = std::fs::File::create(path).map_err(|e| CoreTreeError::Fatal {
        path: path.display().to_string(),
        source: e,
    })?;
    let mut w = BufWriter::new(file);
    write_u32(&mut w, labels.len() as u32).unwrap();
    for label in labels {
        write_u8_slice(&mut w, &label.d).unwrap();
        for i in 0..R {
            write_u64(&mut w, label.s[i][0]).unwrap();
            write_u64(&mut w, label.s[i][1]).unwrap();
        }
    }
    w.flush().map_err(|e| CoreTreeError::Fatal {
        path: path.display().to_string(),
        source: e,
    })?;
    Ok(())
}

/// Read `label-bp.bin`.
pub fn load_bp_bin(path: impl AsRef<Path>) -> Result<Vec<BpLabel>> {
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
        let d_vec = read_u8_vec(&mut r, R).map_err(bad)?;
        let mut d = [0u8; R];
        d.copy_from_slice(&d_vec);
        let mut s = [[0u64; 2]; R];
        for i in 0..R {
            s[i][0] = read_u64(&mut r).map_err(bad)?;
            s[i][1] = read_u64(&mut r).map_err(bad)?;
        }
        labels.push(BpLabel { d, s });
    }
    Ok(labels)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path_graph(n: usize) -> Graph {
        let lists: Vec<Vec<u32>> = (0..n)
            .map(|v| {
                let mut l = Vec::new();
                if v > 0 {
                    l.push(v as u32 - 1);
                }
                if v + 1 < n {
                    l.push(v as u32 + 1);
                }
                l
            })
            .collect();
        Graph::from_adjacency(lists)
    }

    #[test]
    fn lower_bound_never_exceeds_true_distance_on_a_path() {
        let g = path_graph(20);
        let labels = construct_bp(&g, 4);
        for u in 0..20u32 {
            for v in 0..20u32 {
                let true_dist = (u as i32 - v as i32).unsigned_abs();
                let lb = lower_bound_by_bp(&labels[u as usize], &labels[v as usize]);
                assert!(lb <= true_dist, "lb {lb} > true {true_dist} for {u},{v}");
            }
        }
    }

    #[test]
    fn query_by_bp_is_a_route_valid_upper_bound() {
        let g = path_graph(20);
        let labels = construct_bp(&g, 4);
        for u in 0..20u32 {
            for v in 0..20u32 {
                let true_dist = (u as i32 - v as i32).unsigned_abs();
                if let Some(est) = query_by_bp(&labels[u as usize], &labels[v as usize]) {
                    assert!(est >= true_dist);
                }
            }
        }
    }

    #[test]
    fn root_self_distance_is_zero() {
        let g = path_graph(10);
        let labels = construct_bp(&g, 4);
        let roots = pick_roots_and_seeds(&g);
        for (r, _) in roots {
            assert!(labels[r as usize].d.contains(&0));
        }
    }
}
