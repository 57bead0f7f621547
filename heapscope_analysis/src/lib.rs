//! # Heapscope Analysis
//!
//! Dominator-tree and retained-size analysis over frozen heap snapshots.
//!
//! Given the object-reference graph of a managed-runtime heap dump, the
//! engine computes for every reachable object its *immediate dominator*
//! and the *retained size* and *retained count* of its dominator subtree:
//! the memory that would be freed if that object became unreachable.
//!
//! The engine is a five-stage pipeline:
//!
//! 1. **Enumerate**: walk the heap once, compressing raw addresses into a
//!    dense index range ([`ObjectTable`])
//! 2. **Build graph**: materialize forward and reverse adjacency, with an
//!    optional chunked worker fan-out ([`RefGraph`])
//! 3. **Traverse**: iterative preorder DFS from the root set
//!    ([`DfsForest`])
//! 4. **Dominators**: Lengauer-Tarjan over the spanning forest with an
//!    implicit synthetic super-root
//! 5. **Aggregate**: bottom-up retained totals over the dominator forest
//!    ([`Retention`])
//!
//! [`HeapDominatorAnalyzer`] drives all five stages over any
//! [`heapscope_core::HeapSnapshot`] and returns a [`DominatorAnalysis`]
//! exposing a columnar bulk extract, a top-K retainer enumeration, and
//! point queries.

#![deny(unsafe_op_in_unsafe_fn)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod analyzer;
pub mod dfs;
pub mod dominators;
pub mod object_table;
pub mod ref_graph;
pub mod retained;

#[cfg(test)]
mod dominators_tests;

pub use analyzer::{
    AnalysisConfig, AnalysisStats, ColumnarExtract, DominatorAnalysis, HeapDominatorAnalyzer,
    Retainer, RetainerRecord,
};
pub use dfs::DfsForest;
pub use dominators::immediate_dominators;
pub use object_table::ObjectTable;
pub use ref_graph::{AdjacencyList, GraphBuildConfig, RefGraph};
pub use retained::Retention;
