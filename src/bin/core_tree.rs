//! Command-line driver for the core-tree distance oracle (`spec.md` §6).
//!
//! Dispatches on `argv[1]` by hand rather than through a CLI-argument
//! crate: the command set and per-command positional arguments are fixed
//! by `SPEC_FULL.md` §6 and unlikely to grow, so the indirection wouldn't
//! earn its keep.

use std::path::PathBuf;
use std::process::ExitCode;

use core_tree::bp::{construct_bp, write_bp_bin};
use core_tree::config::{BuildConfig, IngestConfig};
use core_tree::core_label::{compute_core_label, write_core_label_bin};
use core_tree::ingest::{ingest_file, write_graph_bin};
use core_tree::query::CoreTreeIndex;
use core_tree::reduce::reduce;
use core_tree::tree::{build_tree, write_tree_bin};

fn usage() -> ! {
    eprintln!(
        "usage: core-tree <command> [args]\n\
         commands:\n\
         \u{20}\u{20}txt-to-bin <graph.txt> <dir>\n\
         \u{20}\u{20}decompose_bp <dir>\n\
         \u{20}\u{20}decompose_tree <dir> <peel_width>\n\
         \u{20}\u{20}decompose_core <dir> <peel_width>\n\
         \u{20}\u{20}decompose_bt <dir> <peel_width>\n\
         \u{20}\u{20}query-dis <dir> <peel_width> <u> <v>\n\
         \u{20}\u{20}query-batch <dir> <peel_width> <pairs.txt>"
    );
    std::process::exit(2);
}

fn main() -> ExitCode {
    env_logger::init();
    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 {
        usage();
    }
    let result = match args[1].as_str() {
        "txt-to-bin" => cmd_txt_to_bin(&args[2..]),
        "decompose_bp" => cmd_decompose_bp(&args[2..]),
        "decompose_tree" => cmd_decompose_tree(&args[2..]),
        "decompose_core" => cmd_decompose_core(&args[2..]),
        "decompose_bt" => cmd_decompose_bt(&args[2..]),
        "query-dis" => cmd_query_dis(&args[2..]),
        "query-batch" => cmd_query_batch(&args[2..]),
        _ => usage(),
    };
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn cmd_txt_to_bin(args: &[String]) -> core_tree::Result<()> {
    let [graph_txt, dir] = args else { usage() };
    let dir = PathBuf::from(dir);
    std::fs::create_dir_all(&dir).map_err(|e| core_tree::CoreTreeError::Fatal {
        path: dir.display().to_string(),
        source: e,
    })?;
    let ingested = ingest_file(graph_txt, &IngestConfig::default())?;
    write_graph_bin(dir.join("graph-dis.bin"), &ingested)?;
    log::info!(
        "txt-to-bin: n={} m={}",
        ingested.graph.n(),
        ingested.graph.m()
    );
    Ok(())
}

fn cmd_decompose_bp(args: &[String]) -> core_tree::Result<()> {
    let [dir] = args else { usage() };
    let dir = PathBuf::from(dir);
    let loaded = core_tree::ingest::load_graph_bin(dir.join("graph-dis.bin"))?;
    let n_threads = BuildConfig::new(0).n_threads;
    let bp = construct_bp(&loaded.graph, n_threads);
    write_bp_bin(dir.join("label-bp.bin"), &bp)?;
    log::info!("decompose_bp: wrote {} bp labels", bp.len());
    Ok(())
}

fn cmd_decompose_tree(args: &[String]) -> core_tree::Result<()> {
    let [dir, w] = args else { usage() };
    let w: u32 = w.parse().unwrap_or_else(|_| usage());
    let dir = PathBuf::from(dir);
    let loaded = core_tree::ingest::load_graph_bin(dir.join("graph-dis.bin"))?;
    let config = BuildConfig::new(w);
    let reduced = reduce(&loaded.graph, &config);
    let nodes = build_tree(loaded.graph.n(), &reduced);
    write_tree_bin(dir.join(format!("label-tree-{w}.bin")), &nodes)?;
    log::info!("decompose_tree: peeled {} vertices", reduced.peel_order.len());
    Ok(())
}

fn cmd_decompose_core(args: &[String]) -> core_tree::Result<()> {
    let [dir, w] = args else { usage() };
    let w: u32 = w.parse().unwrap_or_else(|_| usage());
    let dir = PathBuf::from(dir);
    let loaded = core_tree::ingest::load_graph_bin(dir.join("graph-dis.bin"))?;
    let bp = core_tree::bp::load_bp_bin(dir.join("label-bp.bin")).unwrap_or_default();
    let config = BuildConfig::new(w);
    let reduced = reduce(&loaded.graph, &config);
    let labels = compute_core_label(loaded.graph.n(), &reduced.core_vertices, &reduced.core_adj, &bp)?;
    write_core_label_bin(dir.join(format!("label-core-{w}.bin")), &labels)?;
    log::info!("decompose_core: {} core vertices", reduced.core_vertices.len());
    Ok(())
}

fn cmd_decompose_bt(args: &[String]) -> core_tree::Result<()> {
    let [dir, w] = args else { usage() };
    cmd_decompose_tree(&[dir.clone(), w.clone()])?;
    cmd_decompose_core(&[dir.clone(), w.clone()])
}

fn cmd_query_dis(args: &[String]) -> core_tree::Result<()> {
    let [dir, w, u, v] = args else { usage() };
    let w: u32 = w.parse().unwrap_or_else(|_| usage());
    let u: u32 = u.parse().unwrap_or_else(|_| usage());
    let v: u32 = v.parse().unwrap_or_else(|_| usage());
    let index = CoreTreeIndex::load(dir, w)?;
    println!("{}", index.distance(u, v));
    Ok(())
}

fn cmd_query_batch(args: &[String]) -> core_tree::Result<()> {
    let [dir, w, pairs_path] = args else { usage() };
    let w: u32 = w.parse().unwrap_or_else(|_| usage());
    let index = CoreTreeIndex::load(dir, w)?;
    let text = std::fs::read_to_string(pairs_path).map_err(|e| core_tree::CoreTreeError::Fatal {
        path: pairs_path.clone(),
        source: e,
    })?;
    for line in text.lines() {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < 2 {
            continue;
        }
        let (Ok(u), Ok(v)) = (fields[0].parse::<u32>(), fields[1].parse::<u32>()) else {
            continue;
        };
        println!("{}", index.distance(u, v));
    }
    Ok(())
}
