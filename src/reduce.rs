//! Degree-peeling tree/core decomposition (`spec.md` §4.3).
//!
//! Repeatedly removes vertices whose current degree is below `peel_width`,
//! recording each removed vertex's neighbors and contracting its incident
//! edges into shortcut edges between those neighbors (weighted by path
//! length). What's left once no vertex has degree below `peel_width` is the
//! "core"; everything peeled becomes the tree layer built later in
//! `tree.rs`.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use fixedbitset::FixedBitSet;

use crate::config::BuildConfig;
use crate::types::Graph;

/// Output of the peeling loop: enough to build both the tree forest
/// (`tree.rs`) and the residual core labels (`core_label.rs`).
pub struct ReduceOutput {
    /// Peeled vertices in removal order (earliest first).
    pub peel_order: Vec<u32>,
    /// Neighbors of each peeled vertex *at the moment it was removed*,
    /// indexed by vertex id. Empty for vertices that were never peeled.
    pub removed_nbr: Vec<Vec<u32>>,
    /// Edge weights parallel to `removed_nbr`.
    pub removed_cost: Vec<Vec<i32>>,
    /// Vertices that survived peeling, ascending.
    pub core_vertices: Vec<u32>,
    /// Weighted adjacency of the residual core, indexed by vertex id (empty
    /// for peeled vertices).
    pub core_adj: Vec<Vec<(u32, i32)>>,
}

fn relax_edge(working: &mut [Vec<(u32, i32)>], a: u32, b: u32, w: i32) {
    if a == b {
        return;
    }
    if let Some(entry) = working[a as usize].iter_mut().find(|(x, _)| *x == b) {
        if w < entry.1 {
            entry.1 = w;
        }
    } else {
        working[a as usize].push((b, w));
    }
}

/// Run the peeling loop to completion.
pub fn reduce(graph: &Graph, config: &BuildConfig) -> ReduceOutput {
    let n = graph.n();
    let mut working: Vec<Vec<(u32, i32)>> = (0..n as u32)
        .map(|v| graph.neighbors(v).iter().map(|&u| (u, 1i32)).collect())
        .collect();
    let mut peeled = FixedBitSet::with_capacity(n);
    let mut degree: Vec<u32> = working.iter().map(|l| l.len() as u32).collect();

    let mut heap: BinaryHeap<Reverse<(u32, u32)>> = (0..n as u32)
        .map(|v| Reverse((degree[v as usize], v)))
        .collect();

    let mut peel_order = Vec::new();
    let mut removed_nbr = vec![Vec::new(); n];
    let mut removed_cost = vec![Vec::new(); n];

    while let Some(Reverse((d, v))) = heap.pop() {
        if peeled[v as usize] || degree[v as usize] != d {
            continue; // stale lazy-deleted entry
        }
        if d >= config.peel_width {
            break; // every remaining vertex has degree >= peel_width: done
        }

        let nbrs = std::mem::take(&mut working[v as usize]);
        removed_nbr[v as usize] = nbrs.iter().map(|&(u, _)| u).collect();
        removed_cost[v as usize] = nbrs.iter().map(|&(_, w)| w).collect();
        peel_order.push(v);
        peeled.set(v as usize, true);

        for &(u, _) in &nbrs {
            working[u as usize].retain(|&(x, _)| x != v);
        }
        for i in 0..nbrs.len() {
            for j in (i + 1)..nbrs.len() {
                let (a, wa) = nbrs[i];
                let (b, wb) = nbrs[j];
                let w = wa + wb;
                relax_edge(&mut working, a, b, w);
                relax_edge(&mut working, b, a, w);
            }
        }
        for &(u, _) in &nbrs {
            degree[u as usize] = working[u as usize].len() as u32;
            heap.push(Reverse((degree[u as usize], u)));
        }
    }

    let core_vertices: Vec<u32> = (0..n as u32).filter(|&v| !peeled[v as usize]).collect();
    let core_adj: Vec<Vec<(u32, i32)>> = (0..n)
        .map(|v| if !peeled[v] { working[v].clone() } else { Vec::new() })
        .collect();

    ReduceOutput {
        peel_order,
        removed_nbr,
        removed_cost,
        core_vertices,
        core_adj,
    }
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
    fn high_peel_width_empties_the_core() {
        let g = path_graph(10);
        let config = BuildConfig::new(100);
        let out = reduce(&g, &config);
        assert!(out.core_vertices.is_empty());
        assert_eq!(out.peel_order.len(), 10);
    }

    #[test]
    fn zero_peel_width_peels_nothing() {
        let g = path_graph(10);
        let config = BuildConfig::new(0);
        let out = reduce(&g, &config);
        assert_eq!(out.core_vertices.len(), 10);
        assert!(out.peel_order.is_empty());
    }

    /// Two K4s (0-3 and 5-8) joined by a single bridge vertex 4.
    fn bridged_cliques() -> Graph {
        let lists: Vec<Vec<u32>> = vec![
            vec![1, 2, 3, 4],
            vec![0, 2, 3],
            vec![0, 1, 3],
            vec![0, 1, 2],
            vec![0, 5],
            vec![4, 6, 7, 8],
            vec![5, 7, 8],
            vec![5, 6, 8],
            vec![5, 6, 7],
        ];
        Graph::from_adjacency(lists)
    }

    #[test]
    fn peeling_a_degree_two_vertex_contracts_its_edge() {
        // Vertex 4 is the lone bridge between two K4s, degree 2. With
        // peel_width=3 it's the only vertex ever below threshold: peeling it
        // contracts its two incident edges into a weight-2 shortcut between
        // the K4s, which brings both sides straight back to degree >= 3 and
        // stops the loop.
        let g = bridged_cliques();
        let config = BuildConfig::new(3);
        let out = reduce(&g, &config);
        assert_eq!(out.peel_order, vec![4]);
        assert_eq!(out.core_vertices, vec![0, 1, 2, 3, 5, 6, 7, 8]);
        assert_eq!(out.core_adj[0], vec![(1, 1), (2, 1), (3, 1), (5, 2)]);
        assert_eq!(out.core_adj[5], vec![(6, 1), (7, 1), (8, 1), (0, 2)]);
    }
}
