//! The five-stage analysis pipeline and its result surface.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │  HeapDominatorAnalyzer::run                                      │
//! │                                                                  │
//! │  snapshot ──► 1 enumerate ──► 2 build graph ──► 3 traverse       │
//! │                   │                │  succ dropped after DFS     │
//! │                   │                ▼                             │
//! │               ObjectTable     4 dominators (pred only)           │
//! │                   │                │  pred dropped after solve   │
//! │                   │                ▼                             │
//! │                   └──────────► 5 aggregate ──► DominatorAnalysis │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Stage boundaries are total barriers: each stage function consumes the
//! previous stage's output, so an out-of-order pipeline cannot be
//! expressed, and results exist only inside the returned
//! [`DominatorAnalysis`]. A [`ProgressSink`] hears each phase before its
//! stage runs and [`AnalysisPhase::Complete`] after assembly.

use std::time::{Duration, Instant};

use heapscope_core::{
    AnalysisPhase, HeapScopeError, HeapScopeResult, HeapSnapshot, NoopProgressSink, ObjectIndex,
    ProgressSink,
};

use crate::dfs::DfsForest;
use crate::dominators::immediate_dominators;
use crate::object_table::ObjectTable;
use crate::ref_graph::{GraphBuildConfig, RefGraph};
use crate::retained::Retention;

static NOOP_SINK: NoopProgressSink = NoopProgressSink;

// =============================================================================
// Configuration and statistics
// =============================================================================

/// Configuration for a full analysis run.
#[derive(Debug, Clone, Default)]
pub struct AnalysisConfig {
    /// Graph-builder settings (stage 2 is the only parallel stage).
    pub graph: GraphBuildConfig,
}

/// Counts and per-stage timings for a completed run.
#[derive(Debug, Clone)]
pub struct AnalysisStats {
    /// Enumerated objects, `N`.
    pub object_count: usize,
    /// Resolved reference edges, `E`.
    pub edge_count: u64,
    /// Deduplicated, resolvable roots.
    pub root_count: usize,
    /// Nodes reached from the root set, `R`.
    pub reachable_count: usize,
    /// Stage 1 wall time.
    pub enumerate_time: Duration,
    /// Stage 2 wall time.
    pub build_graph_time: Duration,
    /// Stage 3 wall time.
    pub traverse_time: Duration,
    /// Stage 4 wall time.
    pub dominators_time: Duration,
    /// Stage 5 wall time, including output assembly.
    pub aggregate_time: Duration,
    /// End-to-end wall time.
    pub total_time: Duration,
}

// =============================================================================
// Analyzer
// =============================================================================

/// Drives the pipeline over a borrowed snapshot.
pub struct HeapDominatorAnalyzer<'a, S: HeapSnapshot> {
    snapshot: &'a S,
    config: AnalysisConfig,
    progress: &'a dyn ProgressSink,
}

impl<'a, S: HeapSnapshot> HeapDominatorAnalyzer<'a, S> {
    /// Create an analyzer with default configuration and no progress sink.
    pub fn new(snapshot: &'a S) -> Self {
        Self {
            snapshot,
            config: AnalysisConfig::default(),
            progress: &NOOP_SINK,
        }
    }

    /// Replace the configuration.
    #[must_use]
    pub fn with_config(mut self, config: AnalysisConfig) -> Self {
        self.config = config;
        self
    }

    /// Attach a progress sink.
    #[must_use]
    pub fn with_progress(mut self, progress: &'a dyn ProgressSink) -> Self {
        self.progress = progress;
        self
    }

    /// Run all five stages and assemble the result.
    pub fn run(self) -> HeapScopeResult<DominatorAnalysis> {
        let run_start = Instant::now();

        self.progress.phase_started(AnalysisPhase::Enumerate);
        let stage_start = Instant::now();
        let table = ObjectTable::enumerate(self.snapshot)?;
        let enumerate_time = stage_start.elapsed();

        self.progress.phase_started(AnalysisPhase::BuildGraph);
        let stage_start = Instant::now();
        let graph = RefGraph::build(self.snapshot, &table, &self.config.graph)?;
        let edge_count = graph.edge_count();
        let build_graph_time = stage_start.elapsed();

        self.progress.phase_started(AnalysisPhase::Traverse);
        let stage_start = Instant::now();
        let (succ, pred) = graph.into_parts();
        let forest = DfsForest::explore(&table, &succ);
        drop(succ); // the solver needs only the reverse view
        let traverse_time = stage_start.elapsed();

        self.progress.phase_started(AnalysisPhase::Dominators);
        let stage_start = Instant::now();
        let idom = immediate_dominators(&table, &forest, &pred);
        drop(pred);
        let dominators_time = stage_start.elapsed();

        self.progress.phase_started(AnalysisPhase::Aggregate);
        let stage_start = Instant::now();
        let retention = Retention::aggregate(&table, &forest, &idom);
        let aggregate_time = stage_start.elapsed();

        let stats = AnalysisStats {
            object_count: table.len(),
            edge_count,
            root_count: table.roots().len(),
            reachable_count: forest.reachable_count(),
            enumerate_time,
            build_graph_time,
            traverse_time,
            dominators_time,
            aggregate_time,
            total_time: run_start.elapsed(),
        };

        let analysis = DominatorAnalysis::assemble(table, forest, idom, retention, stats)?;
        self.progress.phase_started(AnalysisPhase::Complete);
        Ok(analysis)
    }
}

// =============================================================================
// Results
// =============================================================================

/// Columnar bulk extract over reachable nodes.
///
/// All four arrays have equal length and are positionally aligned, in
/// enumeration-index order. A dominator of `0` encodes "no dominator"
/// (roots and nodes dominated by no single reachable node); the sentinel
/// is safe because address zero is never a valid object.
#[derive(Debug, Clone, Default)]
pub struct ColumnarExtract {
    /// Raw object addresses.
    pub object_addresses: Vec<u64>,
    /// Immediate dominator addresses, `0` for none.
    pub immediate_dominators: Vec<u64>,
    /// Retained bytes per object.
    pub dominated_sizes: Vec<u64>,
    /// Retained object counts per object.
    pub dominated_counts: Vec<i32>,
}

/// One entry of the top-K enumeration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetainerRecord {
    /// Raw object address.
    pub object_address: u64,
    /// Immediate dominator address, `0` for none.
    pub immediate_dominator: u64,
    /// Retained bytes.
    pub dominated_size: u64,
    /// Retained object count.
    pub dominated_count: u64,
    /// The object's own size.
    pub object_size: u64,
    /// Advisory type name from the secondary collaborator lookup.
    pub type_name: Option<String>,
}

/// Point-query view of one reachable object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Retainer {
    /// Retained bytes.
    pub dominated_size: u64,
    /// Retained object count.
    pub dominated_count: u64,
    /// The object's own size.
    pub object_size: u64,
    /// Immediate dominator address, if the object has one.
    pub immediate_dominator: Option<u64>,
}

/// Completed analysis of one snapshot.
///
/// Owns every index-space array; the snapshot itself is released when
/// [`HeapDominatorAnalyzer::run`] returns.
#[derive(Debug)]
pub struct DominatorAnalysis {
    table: ObjectTable,
    forest: DfsForest,
    idom: Vec<ObjectIndex>,
    retention: Retention,
    stats: AnalysisStats,
}

impl DominatorAnalysis {
    /// Validate cross-array consistency and take ownership of the arrays.
    fn assemble(
        table: ObjectTable,
        forest: DfsForest,
        idom: Vec<ObjectIndex>,
        retention: Retention,
        stats: AnalysisStats,
    ) -> HeapScopeResult<Self> {
        for d in 0..forest.reachable_count() as u32 {
            let node = forest.vertex(d);
            if forest.dfnum(node) != d {
                return Err(HeapScopeError::invariant(format!(
                    "dfs numbering is not a bijection at dfs index {d}"
                )));
            }
            let dom = idom[node.index()];
            if dom.is_valid() && !forest.is_reachable(dom) {
                return Err(HeapScopeError::invariant(format!(
                    "dominator of {:#x} is unreachable",
                    table.address_of(node)
                )));
            }
        }
        Ok(Self {
            table,
            forest,
            idom,
            retention,
            stats,
        })
    }

    /// Enumerated object count, `N`.
    #[inline]
    pub fn object_count(&self) -> usize {
        self.table.len()
    }

    /// Reachable object count, `R`.
    #[inline]
    pub fn reachable_count(&self) -> usize {
        self.forest.reachable_count()
    }

    /// Counts and timings for the run.
    #[inline]
    pub fn stats(&self) -> &AnalysisStats {
        &self.stats
    }

    /// Whether the object at `address` was reached from the root set.
    pub fn is_reachable(&self, address: u64) -> bool {
        self.table
            .index_of(address)
            .is_some_and(|idx| self.forest.is_reachable(idx))
    }

    /// Bulk extract over reachable nodes, in enumeration-index order.
    pub fn columnar(&self) -> ColumnarExtract {
        let reachable = self.forest.reachable_count();
        let mut extract = ColumnarExtract {
            object_addresses: Vec::with_capacity(reachable),
            immediate_dominators: Vec::with_capacity(reachable),
            dominated_sizes: Vec::with_capacity(reachable),
            dominated_counts: Vec::with_capacity(reachable),
        };
        for i in 0..self.table.len() {
            let node = ObjectIndex::from_usize(i);
            if !self.forest.is_reachable(node) {
                continue;
            }
            extract.object_addresses.push(self.table.address_of(node));
            let dom = self.idom[i];
            extract
                .immediate_dominators
                .push(if dom.is_valid() { self.table.address_of(dom) } else { 0 });
            extract.dominated_sizes.push(self.retention.size_of(node));
            extract
                .dominated_counts
                .push(self.retention.count_of(node) as i32);
        }
        extract
    }

    /// The `k` reachable objects retaining the most memory, descending by
    /// retained size; ties break by ascending address so reruns enumerate
    /// identically. Type names resolve through the snapshot's advisory
    /// lookup.
    pub fn top_retainers<S: HeapSnapshot>(&self, k: usize, snapshot: &S) -> Vec<RetainerRecord> {
        if k == 0 {
            return Vec::new();
        }
        let mut order: Vec<ObjectIndex> = (0..self.table.len())
            .map(ObjectIndex::from_usize)
            .filter(|&node| self.forest.is_reachable(node))
            .collect();

        let by_retained = |a: &ObjectIndex, b: &ObjectIndex| {
            self.retention
                .size_of(*b)
                .cmp(&self.retention.size_of(*a))
                .then_with(|| self.table.address_of(*a).cmp(&self.table.address_of(*b)))
        };
        if k < order.len() {
            order.select_nth_unstable_by(k, by_retained);
            order.truncate(k);
        }
        order.sort_unstable_by(by_retained);

        order
            .into_iter()
            .map(|node| {
                let address = self.table.address_of(node);
                let dom = self.idom[node.index()];
                RetainerRecord {
                    object_address: address,
                    immediate_dominator: if dom.is_valid() {
                        self.table.address_of(dom)
                    } else {
                        0
                    },
                    dominated_size: self.retention.size_of(node),
                    dominated_count: self.retention.count_of(node),
                    object_size: self.table.size_of(node),
                    type_name: snapshot.type_name(address),
                }
            })
            .collect()
    }

    /// Retention totals for the object at `address`, or `None` if the
    /// address is unknown or the object unreachable.
    pub fn retained_of(&self, address: u64) -> Option<Retainer> {
        let node = self.table.index_of(address)?;
        if !self.forest.is_reachable(node) {
            return None;
        }
        let dom = self.idom[node.index()];
        Some(Retainer {
            dominated_size: self.retention.size_of(node),
            dominated_count: self.retention.count_of(node),
            object_size: self.table.size_of(node),
            immediate_dominator: dom.is_valid().then(|| self.table.address_of(dom)),
        })
    }
}
