//! Tests for the Lengauer-Tarjan solver.

use heapscope_core::{InMemoryHeap, ObjectIndex};

use crate::dfs::DfsForest;
use crate::dominators::immediate_dominators;
use crate::object_table::ObjectTable;
use crate::ref_graph::{GraphBuildConfig, RefGraph};

/// Run stages 1-4 and return the table plus node-space idom array.
fn solve(heap: &InMemoryHeap) -> (ObjectTable, Vec<ObjectIndex>) {
    let table = ObjectTable::enumerate(heap).unwrap();
    let graph = RefGraph::build(heap, &table, &GraphBuildConfig::default()).unwrap();
    let (succ, pred) = graph.into_parts();
    let forest = DfsForest::explore(&table, &succ);
    let idom = immediate_dominators(&table, &forest, &pred);
    (table, idom)
}

fn idom_addr(table: &ObjectTable, idom: &[ObjectIndex], addr: u64) -> Option<u64> {
    let idx = table.index_of(addr).unwrap();
    let dom = idom[idx.index()];
    dom.is_valid().then(|| table.address_of(dom))
}

// =============================================================================
// Straight-line and branching shapes
// =============================================================================

#[test]
fn test_linear_chain() {
    let mut heap = InMemoryHeap::new();
    heap.add_object(0x100, 10)
        .add_object(0x200, 20)
        .add_object(0x300, 30)
        .add_object(0x400, 40)
        .add_reference(0x100, 0x200)
        .add_reference(0x200, 0x300)
        .add_reference(0x300, 0x400)
        .add_root(0x100);

    let (table, idom) = solve(&heap);
    assert_eq!(idom_addr(&table, &idom, 0x100), None);
    assert_eq!(idom_addr(&table, &idom, 0x200), Some(0x100));
    assert_eq!(idom_addr(&table, &idom, 0x300), Some(0x200));
    assert_eq!(idom_addr(&table, &idom, 0x400), Some(0x300));
}

#[test]
fn test_diamond_join_dominated_by_fork() {
    // A → {B, C} → D: neither branch dominates the join.
    let mut heap = InMemoryHeap::new();
    heap.add_object(0xa, 10)
        .add_object(0xb, 20)
        .add_object(0xc, 30)
        .add_object(0xd, 40)
        .add_reference(0xa, 0xb)
        .add_reference(0xa, 0xc)
        .add_reference(0xb, 0xd)
        .add_reference(0xc, 0xd)
        .add_root(0xa);

    let (table, idom) = solve(&heap);
    assert_eq!(idom_addr(&table, &idom, 0xb), Some(0xa));
    assert_eq!(idom_addr(&table, &idom, 0xc), Some(0xa));
    assert_eq!(idom_addr(&table, &idom, 0xd), Some(0xa));
}

#[test]
fn test_nested_forks() {
    //        A
    //       / \
    //      B   C
    //      |   |
    //      D   E
    //       \ / \
    //        F   G
    let mut heap = InMemoryHeap::new();
    for (addr, size) in [(0xa, 1), (0xb, 1), (0xc, 1), (0xd, 1), (0xe, 1), (0xf, 1), (0x10, 1)] {
        heap.add_object(addr, size);
    }
    heap.add_reference(0xa, 0xb)
        .add_reference(0xa, 0xc)
        .add_reference(0xb, 0xd)
        .add_reference(0xc, 0xe)
        .add_reference(0xd, 0xf)
        .add_reference(0xe, 0xf)
        .add_reference(0xe, 0x10)
        .add_root(0xa);

    let (table, idom) = solve(&heap);
    assert_eq!(idom_addr(&table, &idom, 0xd), Some(0xb));
    assert_eq!(idom_addr(&table, &idom, 0xe), Some(0xc));
    // F is reachable through both branches; only A dominates it.
    assert_eq!(idom_addr(&table, &idom, 0xf), Some(0xa));
    // G has a single path, through E.
    assert_eq!(idom_addr(&table, &idom, 0x10), Some(0xe));
}

// =============================================================================
// Cycles and self-references
// =============================================================================

#[test]
fn test_cycle_entered_once() {
    // A → B → C → B: the back edge does not disturb B's dominance of C.
    let mut heap = InMemoryHeap::new();
    heap.add_object(0xa, 10)
        .add_object(0xb, 20)
        .add_object(0xc, 30)
        .add_reference(0xa, 0xb)
        .add_reference(0xb, 0xc)
        .add_reference(0xc, 0xb)
        .add_root(0xa);

    let (table, idom) = solve(&heap);
    assert_eq!(idom_addr(&table, &idom, 0xb), Some(0xa));
    assert_eq!(idom_addr(&table, &idom, 0xc), Some(0xb));
}

#[test]
fn test_self_looping_root() {
    let mut heap = InMemoryHeap::new();
    heap.add_object(0xa, 10).add_reference(0xa, 0xa).add_root(0xa);

    let (table, idom) = solve(&heap);
    assert_eq!(idom_addr(&table, &idom, 0xa), None);
}

#[test]
fn test_two_node_cycle_of_roots() {
    // Both members of the cycle are roots; neither dominates the other.
    let mut heap = InMemoryHeap::new();
    heap.add_object(0xa, 1)
        .add_object(0xb, 1)
        .add_reference(0xa, 0xb)
        .add_reference(0xb, 0xa)
        .add_root(0xa)
        .add_root(0xb);

    let (table, idom) = solve(&heap);
    assert_eq!(idom_addr(&table, &idom, 0xa), None);
    assert_eq!(idom_addr(&table, &idom, 0xb), None);
}

// =============================================================================
// Multi-root semantics
// =============================================================================

#[test]
fn test_descendant_shared_by_two_roots_has_no_dominator() {
    // R1 → X ← R2: X is reachable from either root alone, so no single
    // reachable node dominates it.
    let mut heap = InMemoryHeap::new();
    heap.add_object(0x1, 10)
        .add_object(0x2, 20)
        .add_object(0x3, 30)
        .add_reference(0x1, 0x3)
        .add_reference(0x2, 0x3)
        .add_root(0x1)
        .add_root(0x2);

    let (table, idom) = solve(&heap);
    assert_eq!(idom_addr(&table, &idom, 0x1), None);
    assert_eq!(idom_addr(&table, &idom, 0x2), None);
    assert_eq!(idom_addr(&table, &idom, 0x3), None);
}

#[test]
fn test_shared_descendant_result_is_independent_of_root_order() {
    let build = |roots: [u64; 2]| {
        let mut heap = InMemoryHeap::new();
        heap.add_object(0x1, 10)
            .add_object(0x2, 20)
            .add_object(0x3, 30)
            .add_reference(0x1, 0x3)
            .add_reference(0x2, 0x3)
            .add_root(roots[0])
            .add_root(roots[1]);
        let (table, idom) = solve(&heap);
        idom_addr(&table, &idom, 0x3)
    };
    assert_eq!(build([0x1, 0x2]), None);
    assert_eq!(build([0x2, 0x1]), None);
}

#[test]
fn test_root_inside_another_tree_keeps_no_dominator() {
    // A → B with both rooted: B would be dominated by A in a single-root
    // graph, but as a root it is live from outside the heap.
    let mut heap = InMemoryHeap::new();
    heap.add_object(0xa, 1)
        .add_object(0xb, 1)
        .add_object(0xc, 1)
        .add_reference(0xa, 0xb)
        .add_reference(0xb, 0xc)
        .add_root(0xa)
        .add_root(0xb);

    let (table, idom) = solve(&heap);
    assert_eq!(idom_addr(&table, &idom, 0xa), None);
    assert_eq!(idom_addr(&table, &idom, 0xb), None);
    // C is still singly dominated by B.
    assert_eq!(idom_addr(&table, &idom, 0xc), Some(0xb));
}

#[test]
fn test_disjoint_trees_solve_independently() {
    let mut heap = InMemoryHeap::new();
    heap.add_object(0x1, 1)
        .add_object(0x2, 1)
        .add_object(0x10, 1)
        .add_object(0x20, 1)
        .add_reference(0x1, 0x2)
        .add_reference(0x10, 0x20)
        .add_root(0x1)
        .add_root(0x10);

    let (table, idom) = solve(&heap);
    assert_eq!(idom_addr(&table, &idom, 0x2), Some(0x1));
    assert_eq!(idom_addr(&table, &idom, 0x20), Some(0x10));
}

// =============================================================================
// Unreachable nodes and boundaries
// =============================================================================

#[test]
fn test_unreachable_island_keeps_sentinel() {
    let mut heap = InMemoryHeap::new();
    heap.add_object(0xa, 10)
        .add_object(0xb, 20)
        .add_object(0xc, 30)
        .add_reference(0xa, 0xb)
        .add_root(0xa);

    let (table, idom) = solve(&heap);
    let c = table.index_of(0xc).unwrap();
    assert!(!idom[c.index()].is_valid());
    assert_eq!(idom_addr(&table, &idom, 0xb), Some(0xa));
}

#[test]
fn test_empty_heap_and_zero_roots() {
    let heap = InMemoryHeap::new();
    let (_table, idom) = solve(&heap);
    assert!(idom.is_empty());

    let mut rootless = InMemoryHeap::new();
    rootless.add_object(0xa, 1).add_object(0xb, 1).add_reference(0xa, 0xb);
    let (_table, idom) = solve(&rootless);
    assert!(idom.iter().all(|d| !d.is_valid()));
}

// =============================================================================
// Structural property
// =============================================================================

#[test]
fn test_idom_chains_reach_a_forest_root() {
    // Dense mesh: every idom chain must stay inside the reachable set and
    // terminate at a node with no dominator.
    let mut heap = InMemoryHeap::new();
    let addr = |k: u64| 0x1000 + k * 0x10;
    let n = 64u64;
    for k in 0..n {
        heap.add_object(addr(k), k + 1);
    }
    for k in 0..n {
        heap.add_reference(addr(k), addr((k * 7 + 3) % n));
        heap.add_reference(addr(k), addr((k / 2) % n));
    }
    heap.add_root(addr(0));
    heap.add_root(addr(41));

    let (table, idom) = solve(&heap);
    for k in 0..n {
        let mut cursor = table.index_of(addr(k)).unwrap();
        let mut hops = 0;
        while idom[cursor.index()].is_valid() {
            cursor = idom[cursor.index()];
            hops += 1;
            assert!(hops <= n, "idom chain cycles at {:#x}", addr(k));
        }
    }
}
