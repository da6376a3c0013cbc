//! Build-time configuration, replacing the original tool's positional
//! `argv` parameters with named fields (`SPEC_FULL.md` §5).

/// Vertex ranking strategy used before renumbering (`spec.md` §4.1).
///
/// The original tool also declared `RANK_LOCAL_STATIC` and
/// `RANK_HOP_BETWEENNESS`, but both were empty stubs in the source; only
/// descending-degree ranking was ever implemented, so that's the only
/// variant carried forward here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RankMethod {
    /// Descending degree, ties broken by original id.
    #[default]
    Static,
}

/// Parameters for the ingester (`txt-to-bin`).
#[derive(Debug, Clone)]
pub struct IngestConfig {
    /// Ranking strategy.
    pub rank_method: RankMethod,
    /// Merge rule-1/rule-2 equivalence classes before renumbering.
    pub merge_equivalent: bool,
}

impl Default for IngestConfig {
    fn default() -> Self {
        IngestConfig {
            rank_method: RankMethod::default(),
            merge_equivalent: true,
        }
    }
}

/// Parameters shared by the reducer, tree builder, and core labeler.
#[derive(Debug, Clone, Copy)]
pub struct BuildConfig {
    /// Peeling width threshold `W`: vertices with reduced degree `< W` are
    /// peeled into the tree layer; the rest form the core.
    pub peel_width: u32,
    /// Worker count for data-parallel build loops.
    pub n_threads: usize,
}

impl BuildConfig {
    /// A `BuildConfig` with the given peel width and one worker per core.
    pub fn new(peel_width: u32) -> Self {
        BuildConfig {
            peel_width,
            n_threads: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
        }
    }

    /// Override the thread count.
    pub fn with_threads(mut self, n_threads: usize) -> Self {
        self.n_threads = n_threads.max(1);
        self
    }
}
