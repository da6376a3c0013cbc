#![warn(missing_docs)]

//! # core_tree
//!
//! An exact shortest-path distance oracle for large, unweighted, undirected
//! graphs. Builds a three-layer index — a bit-parallel BFS sketch, a
//! degree-peeled tree decomposition, and 2-hop pruned landmark labels over
//! the residual core — and answers point-to-point distance queries against
//! it in roughly constant time.
//!
//! See `DESIGN.md` for how each layer is grounded and `SPEC_FULL.md` for
//! the full design.

pub mod bp;
pub mod config;
pub mod core_label;
pub mod error;
pub mod ingest;
pub mod io;
pub mod query;
pub mod reduce;
pub mod testing;
pub mod tree;
pub mod types;

pub use error::{CoreTreeError, Result};
pub use query::CoreTreeIndex;
pub use types::{BpLabel, Distance, Graph, RemapEntry, TreeNode};
