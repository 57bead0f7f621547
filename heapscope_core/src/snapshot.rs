//! The heap-walker collaborator interface.
//!
//! The engine never reads a dump file itself. It consumes a frozen
//! snapshot through [`HeapSnapshot`], a read-only contract with three
//! capabilities:
//!
//! - walk every typed object once, yielding `(address, size)` pairs
//! - walk the root set (duplicates permitted)
//! - extract the outbound reference targets of a single object
//!
//! Walks use callbacks so a collaborator failure in mid-walk surfaces as
//! the walk's own `Err` and propagates fatally; the engine offers no retry.
//! [`InMemoryHeap`] is a scripted implementation for tests and benchmarks.

use crate::error::HeapScopeResult;
use rustc_hash::FxHashMap;

/// One enumerated heap object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeapObject {
    /// Raw object address. Never zero for a real object.
    pub address: u64,
    /// Object size in bytes. Zero-sized objects are legal.
    pub size: u64,
}

/// Read-only access to a frozen heap snapshot.
///
/// Implementations must be [`Sync`]: the graph builder may extract
/// references from multiple worker threads concurrently.
pub trait HeapSnapshot: Sync {
    /// Walk every typed object exactly once.
    ///
    /// Addresses must be unique across the walk. Objects without a
    /// resolvable type are expected to be skipped by the walker, not
    /// reported with a placeholder.
    fn for_each_object(&self, visit: &mut dyn FnMut(HeapObject)) -> HeapScopeResult<()>;

    /// Walk the root object addresses.
    ///
    /// Duplicates are permitted, as are addresses that do not resolve to
    /// any enumerated object (the engine drops both silently).
    fn for_each_root(&self, visit: &mut dyn FnMut(u64)) -> HeapScopeResult<()>;

    /// Collect the outbound reference targets of the object at `address`
    /// into `out`, clearing it first.
    ///
    /// A target of zero means "null"; targets that do not resolve to an
    /// enumerated object are permitted. `out` is caller-owned scratch so
    /// worker threads can reuse the allocation.
    fn references(&self, address: u64, out: &mut Vec<u64>) -> HeapScopeResult<()>;

    /// Advisory type name for the object at `address`.
    ///
    /// Consulted only when assembling human-facing output; `None` is
    /// always acceptable.
    fn type_name(&self, _address: u64) -> Option<String> {
        None
    }
}

// =============================================================================
// InMemoryHeap
// =============================================================================

/// A scripted in-memory snapshot.
///
/// Useful for tests and benchmarks: build the object graph by hand, then
/// hand it to the engine as a [`HeapSnapshot`].
#[derive(Debug, Default)]
pub struct InMemoryHeap {
    objects: Vec<HeapObject>,
    references: FxHashMap<u64, Vec<u64>>,
    roots: Vec<u64>,
    type_names: FxHashMap<u64, String>,
}

impl InMemoryHeap {
    /// Create an empty heap.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an object. Objects are enumerated in insertion order.
    pub fn add_object(&mut self, address: u64, size: u64) -> &mut Self {
        self.objects.push(HeapObject { address, size });
        self
    }

    /// Add a reference edge `from → to`.
    pub fn add_reference(&mut self, from: u64, to: u64) -> &mut Self {
        self.references.entry(from).or_default().push(to);
        self
    }

    /// Add a root address. Duplicates are kept as-is.
    pub fn add_root(&mut self, address: u64) -> &mut Self {
        self.roots.push(address);
        self
    }

    /// Attach an advisory type name to an object.
    pub fn set_type_name(&mut self, address: u64, name: impl Into<String>) -> &mut Self {
        self.type_names.insert(address, name.into());
        self
    }

    /// Number of scripted objects.
    #[inline]
    pub fn object_count(&self) -> usize {
        self.objects.len()
    }
}

impl HeapSnapshot for InMemoryHeap {
    fn for_each_object(&self, visit: &mut dyn FnMut(HeapObject)) -> HeapScopeResult<()> {
        for &obj in &self.objects {
            visit(obj);
        }
        Ok(())
    }

    fn for_each_root(&self, visit: &mut dyn FnMut(u64)) -> HeapScopeResult<()> {
        for &addr in &self.roots {
            visit(addr);
        }
        Ok(())
    }

    fn references(&self, address: u64, out: &mut Vec<u64>) -> HeapScopeResult<()> {
        out.clear();
        if let Some(targets) = self.references.get(&address) {
            out.extend_from_slice(targets);
        }
        Ok(())
    }

    fn type_name(&self, address: u64) -> Option<String> {
        self.type_names.get(&address).cloned()
    }
}
