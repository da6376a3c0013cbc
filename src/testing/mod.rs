//! Synthetic graph generators and a brute-force reference oracle, used by
//! this crate's own integration tests (`spec.md` §8's testable scenarios).

use rand::Rng;
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::collections::VecDeque;

use crate::types::Graph;

/// A connected random graph: a random spanning tree plus extra random
/// edges up to `m` total, seeded for reproducibility.
pub fn random_graph(n: usize, m: usize, seed: u64) -> Graph {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut lists = vec![Vec::new(); n];

    for i in 1..n {
        let j = rng.random_range(0..i);
        lists[i].push(j as u32);
        lists[j].push(i as u32);
    }
    let extra = m.saturating_sub(n.saturating_sub(1));
    for _ in 0..extra {
        let s = rng.random_range(0..n);
        let t = rng.random_range(0..n);
        if s != t {
            lists[s].push(t as u32);
            lists[t].push(s as u32);
        }
    }
    Graph::from_adjacency(lists)
}

/// A `rows x cols` grid graph (4-neighbor lattice).
pub fn grid_graph(rows: usize, cols: usize) -> Graph {
    let id = |r: usize, c: usize| (r * cols + c) as u32;
    let mut lists = vec![Vec::new(); rows * cols];
    for r in 0..rows {
        for c in 0..cols {
            if c + 1 < cols {
                lists[id(r, c) as usize].push(id(r, c + 1));
                lists[id(r, c + 1) as usize].push(id(r, c));
            }
            if r + 1 < rows {
                lists[id(r, c) as usize].push(id(r + 1, c));
                lists[id(r + 1, c) as usize].push(id(r, c));
            }
        }
    }
    Graph::from_adjacency(lists)
}

/// A simple path `0 - 1 - ... - n-1`.
pub fn path_graph(n: usize) -> Graph {
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

/// A cycle `0 - 1 - ... - n-1 - 0`.
pub fn cycle_graph(n: usize) -> Graph {
    let lists: Vec<Vec<u32>> = (0..n)
        .map(|v| {
            vec![
                (v + n - 1) as u32 % n as u32,
                (v + 1) as u32 % n as u32,
            ]
        })
        .collect();
    Graph::from_adjacency(lists)
}

/// A star with `n - 1` leaves around hub `0`.
pub fn star_graph(n: usize) -> Graph {
    let mut lists = vec![Vec::new(); n];
    for v in 1..n {
        lists[0].push(v as u32);
        lists[v].push(0);
    }
    Graph::from_adjacency(lists)
}

/// A complete graph on `n` vertices.
pub fn clique_graph(n: usize) -> Graph {
    let lists: Vec<Vec<u32>> = (0..n)
        .map(|v| (0..n as u32).filter(|&u| u != v as u32).collect())
        .collect();
    Graph::from_adjacency(lists)
}

/// Plain BFS shortest-path distance, used as the ground truth reference in
/// tests. `None` when `v` is unreachable from `u`.
pub fn bfs_distance(graph: &Graph, u: u32, v: u32) -> Option<u32> {
    let mut dist = vec![u32::MAX; graph.n()];
    dist[u as usize] = 0;
    let mut queue = VecDeque::new();
    queue.push_back(u);
    while let Some(x) = queue.pop_front() {
        if x == v {
            return Some(dist[x as usize]);
        }
        for &next in graph.neighbors(x) {
            if dist[next as usize] == u32::MAX {
                dist[next as usize] = dist[x as usize] + 1;
                queue.push_back(next);
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn random_graph_is_connected() {
        let g = random_graph(30, 60, 7);
        for v in 1..30u32 {
            assert!(bfs_distance(&g, 0, v).is_some());
        }
    }

    #[test]
    fn grid_graph_has_expected_corner_distance() {
        let g = grid_graph(4, 5);
        assert_eq!(bfs_distance(&g, 0, 19), Some(3 + 4));
    }
}
