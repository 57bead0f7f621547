//! Stage 2: reference-graph construction.
//!
//! For every enumerated object the builder asks the snapshot for outbound
//! reference targets, maps them through the address table, and materializes
//! two adjacency structures: `succ[i]` (forward) and `pred[i]` (reverse).
//! Null (zero) and unresolved targets are dropped; self-loops and parallel
//! edges are preserved, since the dominator algorithm is insensitive to
//! multiplicity.
//!
//! # Parallelism
//!
//! Per-source extraction is embarrassingly parallel. When configured with
//! worker threads, the index range is split into fixed chunks that workers
//! steal from a global [`Injector`]; each chunk produces an ordered shard
//! of successor lists. Shards are merged serially in ascending chunk order
//! and `pred` is derived from the merged `succ` in one pass, so the final
//! lists are deterministic given a deterministic enumeration regardless of
//! scheduling.

use crossbeam_deque::{Injector, Steal};
use heapscope_core::{HeapScopeError, HeapScopeResult, HeapSnapshot, ObjectIndex};
use smallvec::SmallVec;

use crate::object_table::ObjectTable;

/// Per-node edge list. Most heap objects hold only a few references, so
/// short lists stay inline.
pub type AdjacencyList = SmallVec<[ObjectIndex; 4]>;

// =============================================================================
// Configuration
// =============================================================================

/// Configuration for the graph builder.
#[derive(Debug, Clone)]
pub struct GraphBuildConfig {
    /// Number of extraction worker threads (0 = single-threaded build).
    pub worker_threads: usize,
    /// Source indices per work chunk. Must be non-zero.
    pub chunk_size: usize,
}

impl Default for GraphBuildConfig {
    fn default() -> Self {
        Self {
            worker_threads: 0,
            chunk_size: 4096,
        }
    }
}

// =============================================================================
// RefGraph
// =============================================================================

/// Forward and reverse adjacency over the dense index range.
#[derive(Debug)]
pub struct RefGraph {
    /// `succ[i]`: indices directly referenced by object `i`.
    succ: Vec<AdjacencyList>,
    /// `pred[i]`: indices holding a reference to object `i`.
    pred: Vec<AdjacencyList>,
    /// Total resolved edges.
    edge_count: u64,
}

impl RefGraph {
    /// Build both adjacency views for every object in `table`.
    ///
    /// Collaborator failures abort the build; the first error observed is
    /// propagated.
    pub fn build<S: HeapSnapshot>(
        snapshot: &S,
        table: &ObjectTable,
        config: &GraphBuildConfig,
    ) -> HeapScopeResult<Self> {
        if config.chunk_size == 0 {
            return Err(HeapScopeError::precondition(
                "graph builder chunk size must be non-zero",
            ));
        }

        let n = table.len();
        let succ = if config.worker_threads == 0 || n <= config.chunk_size {
            Self::extract_serial(snapshot, table)?
        } else {
            Self::extract_parallel(snapshot, table, config)?
        };

        // Reverse view is derived from the merged forward view in a single
        // serial pass, keeping the two symmetric by construction.
        let mut pred = vec![AdjacencyList::new(); n];
        let mut edge_count = 0u64;
        for (i, targets) in succ.iter().enumerate() {
            edge_count += targets.len() as u64;
            let from = ObjectIndex::from_usize(i);
            for &target in targets {
                pred[target.index()].push(from);
            }
        }

        Ok(Self {
            succ,
            pred,
            edge_count,
        })
    }

    /// Resolve one object's outbound references into an adjacency list.
    fn extract_targets<S: HeapSnapshot>(
        snapshot: &S,
        table: &ObjectTable,
        source: ObjectIndex,
        scratch: &mut Vec<u64>,
    ) -> HeapScopeResult<AdjacencyList> {
        snapshot.references(table.address_of(source), scratch)?;
        let mut targets = AdjacencyList::new();
        for &addr in scratch.iter() {
            if addr == 0 {
                continue;
            }
            if let Some(target) = table.index_of(addr) {
                targets.push(target);
            }
        }
        Ok(targets)
    }

    fn extract_serial<S: HeapSnapshot>(
        snapshot: &S,
        table: &ObjectTable,
    ) -> HeapScopeResult<Vec<AdjacencyList>> {
        let n = table.len();
        let mut succ = Vec::with_capacity(n);
        let mut scratch = Vec::new();
        for i in 0..n {
            succ.push(Self::extract_targets(
                snapshot,
                table,
                ObjectIndex::from_usize(i),
                &mut scratch,
            )?);
        }
        Ok(succ)
    }

    /// Chunked fan-out: workers steal index ranges from a global queue and
    /// return `(chunk, shard)` pairs; the merge below restores index order.
    fn extract_parallel<S: HeapSnapshot>(
        snapshot: &S,
        table: &ObjectTable,
        config: &GraphBuildConfig,
    ) -> HeapScopeResult<Vec<AdjacencyList>> {
        let n = table.len();
        let chunk_size = config.chunk_size;
        let chunk_count = n.div_ceil(chunk_size);

        let queue = Injector::new();
        for chunk in 0..chunk_count {
            queue.push(chunk);
        }

        type Shard = (usize, Vec<AdjacencyList>);
        let shards: Vec<Shard> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..config.worker_threads)
                .map(|_| {
                    scope.spawn(|| -> HeapScopeResult<Vec<Shard>> {
                        let mut out = Vec::new();
                        let mut scratch = Vec::new();
                        loop {
                            let chunk = match queue.steal() {
                                Steal::Success(chunk) => chunk,
                                Steal::Empty => break,
                                Steal::Retry => continue,
                            };
                            let start = chunk * chunk_size;
                            let end = (start + chunk_size).min(n);
                            let mut shard = Vec::with_capacity(end - start);
                            for i in start..end {
                                shard.push(Self::extract_targets(
                                    snapshot,
                                    table,
                                    ObjectIndex::from_usize(i),
                                    &mut scratch,
                                )?);
                            }
                            out.push((chunk, shard));
                        }
                        Ok(out)
                    })
                })
                .collect();

            let mut collected = Vec::with_capacity(chunk_count);
            for handle in handles {
                let worker_shards = handle
                    .join()
                    .map_err(|_| HeapScopeError::invariant("graph builder worker panicked"))??;
                collected.extend(worker_shards);
            }
            Ok::<_, HeapScopeError>(collected)
        })?;

        let mut slots: Vec<Option<Vec<AdjacencyList>>> = Vec::new();
        slots.resize_with(chunk_count, || None);
        for (chunk, shard) in shards {
            slots[chunk] = Some(shard);
        }

        let mut succ = Vec::with_capacity(n);
        for slot in slots {
            let shard =
                slot.ok_or_else(|| HeapScopeError::invariant("graph builder dropped a chunk"))?;
            succ.extend(shard);
        }
        Ok(succ)
    }

    /// Number of nodes.
    #[inline]
    pub fn len(&self) -> usize {
        self.succ.len()
    }

    /// Whether the graph has no nodes.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.succ.is_empty()
    }

    /// Total resolved edges.
    #[inline]
    pub fn edge_count(&self) -> u64 {
        self.edge_count
    }

    /// Forward edges of `node`.
    #[inline]
    pub fn successors(&self, node: ObjectIndex) -> &[ObjectIndex] {
        &self.succ[node.index()]
    }

    /// Reverse edges of `node`.
    #[inline]
    pub fn predecessors(&self, node: ObjectIndex) -> &[ObjectIndex] {
        &self.pred[node.index()]
    }

    /// Split the graph into its forward and reverse views, so the pipeline
    /// can drop each as soon as its last consumer finishes.
    pub fn into_parts(self) -> (Vec<AdjacencyList>, Vec<AdjacencyList>) {
        (self.succ, self.pred)
    }
}
