//! Stage 1: heap enumeration and address compression.
//!
//! Walks the snapshot once, assigning each object a dense index in
//! `[0, N)` in enumeration order. The resulting table owns the
//! address→index map, the inverse address array, the per-index size array,
//! and the deduplicated root index set.

use heapscope_core::{HeapScopeError, HeapScopeResult, HeapSnapshot, ObjectIndex};
use rustc_hash::{FxHashMap, FxHashSet};
use std::collections::hash_map::Entry;

/// Compressed object table produced by enumeration.
///
/// All arrays are sized once here and never resized; later stages index
/// into them read-only.
#[derive(Debug)]
pub struct ObjectTable {
    /// Raw address → dense index. Keys are unique by construction.
    addr_to_idx: FxHashMap<u64, ObjectIndex>,
    /// Dense index → raw address. Inverse of `addr_to_idx`.
    idx_to_addr: Vec<u64>,
    /// Dense index → object size in bytes.
    sizes: Vec<u64>,
    /// Root indices: deduplicated, resolvable, in first-seen order.
    roots: Vec<ObjectIndex>,
}

impl ObjectTable {
    /// Walk the snapshot and build the table.
    ///
    /// Fails with a [`HeapScopeError::Snapshot`] error if the walker
    /// reports a duplicate address, if the heap exceeds the dense index
    /// range, or if the walk itself fails. Roots that do not resolve to an
    /// enumerated object are silently dropped; duplicate roots collapse to
    /// their first occurrence. Zero-sized objects are retained.
    pub fn enumerate<S: HeapSnapshot>(snapshot: &S) -> HeapScopeResult<Self> {
        let mut addr_to_idx = FxHashMap::default();
        let mut idx_to_addr = Vec::new();
        let mut sizes = Vec::new();
        let mut walk_error = None;

        snapshot.for_each_object(&mut |obj| {
            if walk_error.is_some() {
                return;
            }
            if idx_to_addr.len() >= u32::MAX as usize {
                walk_error = Some(HeapScopeError::snapshot(
                    "heap exceeds the dense index range (u32::MAX objects)",
                ));
                return;
            }
            match addr_to_idx.entry(obj.address) {
                Entry::Occupied(_) => {
                    walk_error = Some(HeapScopeError::snapshot(format!(
                        "duplicate object address {:#x}",
                        obj.address
                    )));
                }
                Entry::Vacant(slot) => {
                    slot.insert(ObjectIndex::from_usize(idx_to_addr.len()));
                    idx_to_addr.push(obj.address);
                    sizes.push(obj.size);
                }
            }
        })?;
        if let Some(err) = walk_error {
            return Err(err);
        }

        let mut seen = FxHashSet::default();
        let mut roots = Vec::new();
        snapshot.for_each_root(&mut |addr| {
            if !seen.insert(addr) {
                return;
            }
            // Roots may point into regions the walker could not enumerate.
            if let Some(&idx) = addr_to_idx.get(&addr) {
                roots.push(idx);
            }
        })?;

        Ok(Self {
            addr_to_idx,
            idx_to_addr,
            sizes,
            roots,
        })
    }

    /// Number of enumerated objects.
    #[inline]
    pub fn len(&self) -> usize {
        self.idx_to_addr.len()
    }

    /// Whether the heap held no enumerable objects.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.idx_to_addr.is_empty()
    }

    /// Raw address of the object at `idx`.
    #[inline]
    pub fn address_of(&self, idx: ObjectIndex) -> u64 {
        self.idx_to_addr[idx.index()]
    }

    /// Size in bytes of the object at `idx`.
    #[inline]
    pub fn size_of(&self, idx: ObjectIndex) -> u64 {
        self.sizes[idx.index()]
    }

    /// Resolve a raw address to its dense index, if enumerated.
    #[inline]
    pub fn index_of(&self, address: u64) -> Option<ObjectIndex> {
        self.addr_to_idx.get(&address).copied()
    }

    /// Deduplicated root indices in first-seen order.
    #[inline]
    pub fn roots(&self) -> &[ObjectIndex] {
        &self.roots
    }

    /// Per-index sizes, parallel to the index range.
    #[inline]
    pub fn sizes(&self) -> &[u64] {
        &self.sizes
    }
}
