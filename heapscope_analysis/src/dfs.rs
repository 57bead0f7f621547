//! Stage 3: depth-first traversal of the reference graph.
//!
//! Assigns a preorder DFS number to every node reachable from the root
//! set and records each node's DFS-tree parent. Roots are visited in
//! enumeration order, producing a spanning forest with one tree per root
//! that was not already reached through an earlier root.
//!
//! The traversal keeps an explicit frame stack with a saved child cursor
//! per frame. Reference chains in real dumps routinely exceed the native
//! call stack; pathological depths in the tens of millions must complete.

use heapscope_core::ObjectIndex;

use crate::object_table::ObjectTable;
use crate::ref_graph::AdjacencyList;

/// DFS number for nodes never reached from any root.
pub const UNREACHED: u32 = u32::MAX;

/// Parent marker for the DFS root of each spanning tree.
pub const NO_PARENT: u32 = u32::MAX;

/// One suspended traversal position.
struct DfsFrame {
    node: ObjectIndex,
    next_child: usize,
}

/// Spanning forest produced by the traversal.
///
/// `dfnum` lives in node space; `vertex` and `parent` live in DFS-number
/// space and are trimmed to the reachable count `R`.
#[derive(Debug)]
pub struct DfsForest {
    /// Node space: DFS number, or [`UNREACHED`].
    dfnum: Vec<u32>,
    /// DFS space: inverse of `dfnum`.
    vertex: Vec<ObjectIndex>,
    /// DFS space: DFS number of the tree parent, or [`NO_PARENT`].
    parent: Vec<u32>,
}

impl DfsForest {
    /// Traverse `succ` from every root in enumeration order.
    pub fn explore(table: &ObjectTable, succ: &[AdjacencyList]) -> Self {
        let n = succ.len();
        let mut dfnum = vec![UNREACHED; n];
        let mut vertex = Vec::new();
        let mut parent = Vec::new();
        let mut stack: Vec<DfsFrame> = Vec::new();

        for &root in table.roots() {
            if dfnum[root.index()] != UNREACHED {
                continue;
            }
            dfnum[root.index()] = vertex.len() as u32;
            vertex.push(root);
            parent.push(NO_PARENT);
            stack.push(DfsFrame {
                node: root,
                next_child: 0,
            });

            'walk: while let Some(frame) = stack.last_mut() {
                let children = &succ[frame.node.index()];
                while frame.next_child < children.len() {
                    let target = children[frame.next_child];
                    frame.next_child += 1;
                    if dfnum[target.index()] == UNREACHED {
                        dfnum[target.index()] = vertex.len() as u32;
                        parent.push(dfnum[frame.node.index()]);
                        vertex.push(target);
                        stack.push(DfsFrame {
                            node: target,
                            next_child: 0,
                        });
                        continue 'walk;
                    }
                }
                stack.pop();
            }
        }

        Self {
            dfnum,
            vertex,
            parent,
        }
    }

    /// Count of reachable nodes, `R`.
    #[inline]
    pub fn reachable_count(&self) -> usize {
        self.vertex.len()
    }

    /// DFS number of `node`, or [`UNREACHED`].
    #[inline]
    pub fn dfnum(&self, node: ObjectIndex) -> u32 {
        self.dfnum[node.index()]
    }

    /// Whether `node` was reached from some root.
    #[inline]
    pub fn is_reachable(&self, node: ObjectIndex) -> bool {
        self.dfnum[node.index()] != UNREACHED
    }

    /// Node holding DFS number `d`.
    #[inline]
    pub fn vertex(&self, d: u32) -> ObjectIndex {
        self.vertex[d as usize]
    }

    /// DFS number of the tree parent of DFS number `d`, or [`NO_PARENT`].
    #[inline]
    pub fn parent(&self, d: u32) -> u32 {
        self.parent[d as usize]
    }
}
