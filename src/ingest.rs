//! Text-to-binary graph ingester (`spec.md` §4.1).
//!
//! Reads a whitespace-separated edge list, drops self-loops and negative
//! ids, detects rule-1/rule-2 equivalence classes, renumbers vertices by
//! descending degree (ties by original id), and writes `graph-dis.bin`.

use hashbrown::HashMap;
use log::info;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use crate::config::IngestConfig;
use crate::error::{CoreTreeError, Result};
use crate::io::*;
use crate::types::{Graph, MAXN, RemapEntry};

/// The renumbered graph plus the table needed to resolve original vertex
/// ids back through rule-1/rule-2 equivalence (`spec.md` §3's remap table).
pub struct IngestedGraph {
    /// The dense, renumbered, deduplicated graph.
    pub graph: Graph,
    /// Indexed by *original* vertex id.
    pub remap: Vec<RemapEntry>,
}

fn parse_line(line: &str, expected_fields: usize) -> Option<(i64, i64)> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return None;
    }
    let first_char = trimmed.chars().next()?;
    if !first_char.is_ascii_digit() && first_char != '-' {
        return None;
    }
    let fields: Vec<&str> = trimmed.split_whitespace().collect();
    if fields.len() < expected_fields {
        return None;
    }
    let a: i64 = fields[0].parse().ok()?;
    let b: i64 = fields[1].parse().ok()?;
    Some((a, b))
}

fn detect_field_count(lines: &[String]) -> usize {
    let mut min_cnt = usize::MAX;
    let mut checked = 0;
    for line in lines {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let first_char = match trimmed.chars().next() {
            Some(c) => c,
            None => continue,
        };
        if !first_char.is_ascii_digit() {
            continue;
        }
        let fields = trimmed.split_whitespace().count();
        if fields < 2 {
            continue;
        }
        min_cnt = min_cnt.min(fields);
        checked += 1;
        if checked == 10 {
            break;
        }
    }
    if min_cnt == usize::MAX { 2 } else { min_cnt }
}

/// Parse a `graph.txt`-formatted string into raw (pre-dedup) edges.
///
/// Returns `(n_raw, edges)` where `n_raw` is one past the maximum vertex id
/// seen. Malformed lines are skipped and logged, never fatal unless no
/// usable edge is found at all.
pub fn parse_edge_list(text: &str) -> Result<(u32, Vec<(u32, u32)>)> {
    let lines: Vec<String> = text.lines().map(|l| l.to_string()).collect();
    let expected = detect_field_count(&lines);

    let mut n_raw: i64 = 0;
    let mut edges = Vec::new();
    let mut skipped = 0usize;

    for line in &lines {
        match parse_line(line, expected) {
            Some((a, b)) if a >= 0 && b >= 0 && a != b => {
                n_raw = n_raw.max(a + 1).max(b + 1);
                edges.push((a as u32, b as u32));
            }
            Some(_) => skipped += 1,
            None => {
                if !line.trim().is_empty() {
                    skipped += 1;
                }
            }
        }
    }

    if skipped > 0 {
        log::warn!("ingest: skipped {skipped} malformed/self-loop/negative lines");
    }
    if edges.is_empty() {
        return Err(CoreTreeError::MalformedInput(
            "no usable edges in input".to_string(),
        ));
    }
    Ok((n_raw as u32, edges))
}

fn build_raw_adjacency(n: u32, edges: &[(u32, u32)]) -> Vec<Vec<u32>> {
    let mut adj = vec![Vec::new(); n as usize];
    for &(a, b) in edges {
        adj[a as usize].push(b);
        adj[b as usize].push(a);
    }
    for list in &mut adj {
        list.sort_unstable();
        list.dedup();
    }
    adj
}

/// Closed-neighborhood signature `N(v) ∪ {v}`, sorted.
fn closed_signature(v: u32, adj: &[u32]) -> Vec<u32> {
    let mut sig = adj.to_vec();
    sig.push(v);
    sig.sort_unstable();
    sig.dedup();
    sig
}

/// Compute rule-1 (closed neighborhood) and rule-2 (open neighborhood)
/// representatives. Processing in ascending vertex order means the first
/// vertex to exhibit a given signature becomes its representative, which is
/// automatically the smallest original id in the class.
fn compute_equivalence(adj: &[Vec<u32>]) -> (Vec<u32>, Vec<u32>) {
    let n = adj.len();
    let mut f1 = vec![0u32; n];
    let mut f2 = vec![0u32; n];

    let mut closed_map: HashMap<Vec<u32>, u32> = HashMap::new();
    for v in 0..n {
        let sig = closed_signature(v as u32, &adj[v]);
        let rep = *closed_map.entry(sig).or_insert(v as u32);
        f1[v] = rep;
    }

    let mut open_map: HashMap<&[u32], u32> = HashMap::new();
    for v in 0..n {
        let rep = *open_map.entry(adj[v].as_slice()).or_insert(v as u32);
        f2[v] = rep;
    }

    (f1, f2)
}

/// Run the full text-to-binary pipeline in memory and return the result
/// without touching the filesystem (used by `ingest_file`/`ingest_str` and
/// directly by tests).
pub fn ingest(text: &str, config: &IngestConfig) -> Result<IngestedGraph> {
    let (n_raw, edges) = parse_edge_list(text)?;
    let n = n_raw as usize;
    let adj = build_raw_adjacency(n_raw, &edges);

    let (f1, f2) = if config.merge_equivalent {
        compute_equivalence(&adj)
    } else {
        ((0..n as u32).collect(), (0..n as u32).collect())
    };

    let kept = |v: usize| f1[v] == v as u32 && f2[v] == v as u32;

    // Filter adjacency down to kept-only neighbors; equivalence guarantees
    // this loses no reachability information (see ingest module docs).
    let filtered: Vec<Vec<u32>> = (0..n)
        .map(|v| {
            if kept(v) {
                adj[v]
                    .iter()
                    .copied()
                    .filter(|&u| kept(u as usize))
                    .collect()
            } else {
                Vec::new()
            }
        })
        .collect();

    let degree: Vec<u32> = filtered.iter().map(|l| l.len() as u32).collect();

    // Descending degree, ties by ascending original id (spec.md §4.1).
    // Packed into one ascending radix-sortable key: high bits carry the
    // inverted degree, low bits the original id as the tiebreak.
    let mut order: Vec<u32> = (0..n_raw).collect();
    radsort::sort_by_key(&mut order, |&v| {
        ((u32::MAX - degree[v as usize]) as u64) << 32 | v as u64
    });

    let mut new_id = vec![0u32; n];
    for (new, &old) in order.iter().enumerate() {
        new_id[old as usize] = new as u32;
    }

    let mut remap = vec![RemapEntry::Kept(0); n];
    for v in 0..n {
        remap[v] = if kept(v) {
            RemapEntry::Kept(new_id[v])
        } else if f2[v] != v as u32 {
            RemapEntry::Rule2(new_id[f2[v] as usize])
        } else {
            RemapEntry::Rule1(new_id[f1[v] as usize])
        };
    }

    let mut lists = vec![Vec::new(); n];
    for v in 0..n {
        if kept(v) {
            let mut mapped: Vec<u32> = filtered[v].iter().map(|&u| new_id[u as usize]).collect();
            mapped.sort_unstable();
            lists[new_id[v] as usize] = mapped;
        }
    }

    let graph = Graph::from_adjacency(lists);
    info!(
        "ingest: n_raw={n_raw} kept={} m={} ",
        (0..n).filter(|&v| kept(v)).count(),
        graph.m()
    );
    Ok(IngestedGraph { graph, remap })
}

/// Ingest from a file path.
pub fn ingest_file(path: impl AsRef<Path>, config: &IngestConfig) -> Result<IngestedGraph> {
    let text = std::fs::read_to_string(path.as_ref()).map_err(|e| CoreTreeError::Fatal {
        path: path.as_ref().display().to_string(),
        source: e,
    })?;
    ingest(&text, config)
}

/// Encode a [`RemapEntry`] into the on-disk `i32` sentinel format.
fn encode_remap(entry: RemapEntry) -> i32 {
    match entry {
        RemapEntry::Kept(id) => id as i32,
        RemapEntry::Rule1(id) => -(id as i64) as i32 - 1,
        RemapEntry::Rule2(id) => (id as i64 + MAXN) as i32,
    }
}

/// Decode the on-disk `i32` sentinel format into a [`RemapEntry`].
pub fn decode_remap(raw: i32) -> RemapEntry {
    let raw = raw as i64;
    if raw < 0 {
        RemapEntry::Rule1((-raw - 1) as u32)
    } else if raw >= MAXN {
        RemapEntry::Rule2((raw - MAXN) as u32)
    } else {
        RemapEntry::Kept(raw as u32)
    }
}

/// Write `graph-dis.bin` (`spec.md` §4.1 / §6 layout).
pub fn write_graph_bin(path: impl AsRef<Path>, ingested: &IngestedGraph) -> Result<()> {
    let path = path.as_ref();
    let file = std::fs::File::create(path).map_err(|e| CoreTreeError::Fatal {
        path: path.display().to_string(),
        source: e,
    })?;
    let mut w = BufWriter::new(file);
    let g = &ingested.graph;
    write_i32(&mut w, g.n() as i32).unwrap();
    write_i64(&mut w, g.m() as i64).unwrap();
    write_u32_slice(&mut w, g.deg_slice()).unwrap();
    write_u32_slice(&mut w, g.adj_slice()).unwrap();
    let nid: Vec<i32> = ingested.remap.iter().map(|&e| encode_remap(e)).collect();
    write_i32_slice(&mut w, &nid).unwrap();
    w.flush().map_err(|e| CoreTreeError::Fatal {
        path: path.display().to_string(),
        source: e,
    })?;
    info!("ingest: wrote {}", path.display());
    Ok(())
}

/// Loaded `graph-dis.bin` contents (`spec.md` §4.1).
pub struct LoadedGraph {
    /// Active graph, trimmed of the trailing zero-degree suffix (`spec.md`
    /// §4.1's `load_graph`: "`nown`" trimming rule).
    pub graph: Graph,
    /// Original vertex count before trimming (bounds for remap lookups).
    pub n_original: usize,
    /// Remap table, indexed by original vertex id.
    pub remap: Vec<RemapEntry>,
}

/// Read `graph-dis.bin`.
pub fn load_graph_bin(path: impl AsRef<Path>) -> Result<LoadedGraph> {
    let path = path.as_ref();
    let file = std::fs::File::open(path).map_err(|e| CoreTreeError::UnreadableArtifact {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;
    let mut r = BufReader::new(file);
    let n = read_i32(&mut r).map_err(bad(path))? as usize;
    let m = read_i64(&mut r).map_err(bad(path))? as usize;
    let deg = read_u32_vec(&mut r, n).map_err(bad(path))?;
    let adj = read_u32_vec(&mut r, m).map_err(bad(path))?;
    let nid_raw = read_i32_vec(&mut r, n).map_err(bad(path))?;

    let mut nown = n;
    while nown > 0 && deg[nown - 1] == 0 {
        nown -= 1;
    }
    let active_n = nown.max(2).min(n);
    let active_m: usize = deg[..active_n].iter().map(|&d| d as usize).sum();

    let graph = Graph::from_csr_parts(deg[..active_n].to_vec(), adj[..active_m].to_vec());
    let remap = nid_raw.into_iter().map(decode_remap).collect();

    Ok(LoadedGraph {
        graph,
        n_original: n,
        remap,
    })
}

fn bad(path: &Path) -> impl Fn(std::io::Error) -> CoreTreeError + '_ {
    move |e| CoreTreeError::UnreadableArtifact {
        path: path.display().to_string(),
        reason: e.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_simple_edge_list() {
        let (n, edges) = parse_edge_list("0 1\n1 2\n2 3\n3 4\n").unwrap();
        assert_eq!(n, 5);
        assert_eq!(edges.len(), 4);
    }

    #[test]
    fn drops_self_loops_and_negatives() {
        let (n, edges) = parse_edge_list("0 1\n2 2\n-1 3\n1 2\n").unwrap();
        assert_eq!(n, 3);
        assert_eq!(edges, vec![(0, 1), (1, 2)]);
    }

    #[test]
    fn skips_non_numeric_lines() {
        let (_, edges) = parse_edge_list("# comment\n0 1\nfoo bar\n1 2\n").unwrap();
        assert_eq!(edges.len(), 2);
    }

    #[test]
    fn errors_on_no_usable_edges() {
        let err = parse_edge_list("# just a comment\n").unwrap_err();
        assert!(matches!(err, CoreTreeError::MalformedInput(_)));
    }

    #[test]
    fn rule2_twins_are_detected() {
        // Scenario (f) from spec.md §8: 0 and 1 both adjacent to {2,3} only.
        // Vertex 4 hangs off 2 so {2,3} aren't themselves twins.
        let text = "0 2\n0 3\n1 2\n1 3\n2 4\n";
        let ingested = ingest(text, &IngestConfig::default()).unwrap();
        assert!(matches!(ingested.remap[1], RemapEntry::Rule2(_)));
        let collapsed = ingested
            .remap
            .iter()
            .filter(|r| matches!(r, RemapEntry::Rule2(_)))
            .count();
        assert_eq!(collapsed, 1);
    }

    #[test]
    fn rule1_twins_share_a_closed_neighborhood() {
        // 0 and 1 are adjacent to each other and to {2,3}: N[0] = N[1] =
        // {0,1,2,3}, the closed-neighborhood equivalence from spec.md §4.1.
        let text = "0 1\n0 2\n0 3\n1 2\n1 3\n";
        let ingested = ingest(text, &IngestConfig::default()).unwrap();
        let rule1_count = ingested
            .remap
            .iter()
            .filter(|r| matches!(r, RemapEntry::Rule1(_)))
            .count();
        assert_eq!(rule1_count, 1);
    }

    #[test]
    fn round_trips_through_binary_file() {
        let ingested = ingest("0 1\n1 2\n2 3\n3 4\n", &IngestConfig::default()).unwrap();
        let dir = std::env::temp_dir().join(format!("core_tree_test_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("graph-dis.bin");
        write_graph_bin(&path, &ingested).unwrap();
        let loaded = load_graph_bin(&path).unwrap();
        assert_eq!(loaded.graph.n(), ingested.graph.n());
        assert_eq!(loaded.graph.m(), ingested.graph.m());
        std::fs::remove_dir_all(&dir).ok();
    }
}
