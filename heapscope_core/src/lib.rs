//! # Heapscope Core
//!
//! Core types, traits, and primitives for the Heapscope heap analyzer.
//!
//! This crate provides the foundational building blocks shared across all
//! Heapscope components:
//!
//! - **Snapshot Interface**: The read-only collaborator contract through
//!   which an engine consumes a frozen heap dump
//! - **Object Indexing**: Dense index handles for compressed address spaces
//! - **Progress Reporting**: Push-only phase notifications for long analyses
//! - **Error Handling**: Result types and error definitions

#![deny(unsafe_op_in_unsafe_fn)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod index;
pub mod progress;
pub mod snapshot;

pub use error::{HeapScopeError, HeapScopeResult};
pub use index::ObjectIndex;
pub use progress::{AnalysisPhase, CollectingProgressSink, NoopProgressSink, ProgressSink};
pub use snapshot::{HeapObject, HeapSnapshot, InMemoryHeap};

/// Heapscope version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
