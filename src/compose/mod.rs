//! Compose manifest generation
//!
//! This module expands a validated capacity plan into numbered service
//! instances and renders them as a compose-compatible manifest.

pub mod allocator;
pub mod compiler;
pub mod emitter;

pub use allocator::{instance_name, Instance, InstanceAllocator};
pub use compiler::{write_manifest, CompileSummary, GroupRange, ManifestCompiler};
pub use emitter::{Manifest, ManifestEmitter};
