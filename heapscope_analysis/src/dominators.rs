//! Stage 4: immediate dominators via Lengauer-Tarjan.
//!
//! Runs the classical Lengauer-Tarjan algorithm with path compression over
//! the DFS spanning forest, consuming the reverse adjacency built in stage
//! 2. Output is a node-space `idom` array where the sentinel marks "no
//! dominator": unreachable nodes, every root, and any object dominated by
//! no single reachable node.
//!
//! # Multi-root formulation
//!
//! A heap snapshot has many entry points, and the DFS forest alone leaves
//! the dominator of a node shared between trees dependent on root
//! enumeration order. The solver instead works over an implicit synthetic
//! super-root: solver space is `[0, R]`, index 0 is a virtual node that is
//! the DFS parent of every tree root and a graph predecessor of every
//! member of the root set, and a real node with DFS number `d` occupies
//! solver index `d + 1`. A node whose computed dominator is the virtual
//! root has no single real dominator and reports the sentinel. The virtual
//! node is never materialized in the adjacency arrays.

use heapscope_core::ObjectIndex;

use crate::dfs::{DfsForest, NO_PARENT, UNREACHED};
use crate::object_table::ObjectTable;
use crate::ref_graph::AdjacencyList;

/// Sentinel for an empty `ancestor` / `idom` slot in solver space.
const NONE: u32 = u32::MAX;

// =============================================================================
// Link-eval forest
// =============================================================================

/// The `link`/`eval` forest with path compression.
///
/// `semi` and `label` live in solver space. Compression is iterative: real
/// dumps produce ancestor chains far deeper than the native call stack.
struct LinkEvalForest {
    semi: Vec<u32>,
    label: Vec<u32>,
    ancestor: Vec<u32>,
    compress_stack: Vec<u32>,
}

impl LinkEvalForest {
    fn new(len: usize) -> Self {
        Self {
            semi: (0..len as u32).collect(),
            label: (0..len as u32).collect(),
            ancestor: vec![NONE; len],
            compress_stack: Vec::new(),
        }
    }

    /// Attach `child` below `parent` in the forest.
    #[inline]
    fn link(&mut self, parent: u32, child: u32) {
        self.ancestor[child as usize] = parent;
    }

    /// Return the vertex with minimal semidominator on the path from `v`
    /// to its forest root, compressing the path as a side effect.
    fn eval(&mut self, v: u32) -> u32 {
        if self.ancestor[v as usize] == NONE {
            return v;
        }
        self.compress(v);
        self.label[v as usize]
    }

    /// Iterative path compression. Walks up to the node directly below the
    /// forest root, then folds labels back down in root-to-leaf order.
    fn compress(&mut self, v: u32) {
        debug_assert!(self.compress_stack.is_empty());
        let mut x = v;
        while self.ancestor[self.ancestor[x as usize] as usize] != NONE {
            self.compress_stack.push(x);
            x = self.ancestor[x as usize];
        }
        while let Some(y) = self.compress_stack.pop() {
            let above = self.ancestor[y as usize] as usize;
            if self.semi[self.label[above] as usize] < self.semi[self.label[y as usize] as usize] {
                self.label[y as usize] = self.label[above];
            }
            self.ancestor[y as usize] = self.ancestor[above];
        }
    }
}

// =============================================================================
// Solver
// =============================================================================

/// Compute the immediate dominator of every reachable node.
///
/// Returns a node-space array: `ObjectIndex::INVALID` for unreachable
/// nodes, for roots, and for nodes dominated only by the virtual root.
/// Working arrays are sized to `R + 1` and freed on return.
pub fn immediate_dominators(
    table: &ObjectTable,
    forest: &DfsForest,
    pred: &[AdjacencyList],
) -> Vec<ObjectIndex> {
    let n = pred.len();
    let reachable = forest.reachable_count() as u32;
    let mut idom = vec![ObjectIndex::INVALID; n];
    if reachable == 0 {
        return idom;
    }

    let mut is_root = vec![false; n];
    for &root in table.roots() {
        is_root[root.index()] = true;
    }

    // Solver space: virtual root at 0, DFS number d at d + 1.
    let len = reachable as usize + 1;
    let mut state = LinkEvalForest::new(len);
    let mut parent = vec![0u32; len];
    for d in 0..reachable {
        let p = forest.parent(d);
        parent[(d + 1) as usize] = if p == NO_PARENT { 0 } else { p + 1 };
    }
    let mut bucket: Vec<Vec<u32>> = vec![Vec::new(); len];
    let mut idom_s = vec![NONE; len];

    for w in (1..=reachable).rev() {
        let node = forest.vertex(w - 1);

        // Semidominator of w over its graph predecessors.
        for &p in &pred[node.index()] {
            let pd = forest.dfnum(p);
            if pd == UNREACHED {
                continue;
            }
            let u = state.eval(pd + 1);
            if state.semi[u as usize] < state.semi[w as usize] {
                state.semi[w as usize] = state.semi[u as usize];
            }
        }
        // The virtual root is a predecessor of every member of the root
        // set, reachable or not through other roots' trees.
        if is_root[node.index()] {
            state.semi[w as usize] = 0;
        }

        bucket[state.semi[w as usize] as usize].push(w);

        // Link under the DFS-tree parent and drain its bucket.
        let z = parent[w as usize];
        state.link(z, w);
        for v in std::mem::take(&mut bucket[z as usize]) {
            let u = state.eval(v);
            idom_s[v as usize] = if state.semi[u as usize] < state.semi[v as usize] {
                u
            } else {
                z
            };
        }
    }

    // Fix-up: rewrite deferred entries through already-final dominators.
    for w in 1..=reachable {
        if idom_s[w as usize] != state.semi[w as usize] {
            idom_s[w as usize] = idom_s[idom_s[w as usize] as usize];
        }
    }

    // Map back to node space. The virtual root becomes the sentinel.
    for w in 1..=reachable {
        let d = idom_s[w as usize];
        debug_assert_ne!(d, NONE, "bucket drain missed dfs index {w}");
        if d == 0 || d == NONE {
            continue;
        }
        idom[forest.vertex(w - 1).index()] = forest.vertex(d - 1);
    }
    // Roots never report a dominator.
    for &root in table.roots() {
        if forest.is_reachable(root) {
            idom[root.index()] = ObjectIndex::INVALID;
        }
    }

    idom
}
