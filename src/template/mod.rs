//! Shared service templates
//!
//! Each group references one template by name. Templates are resolved from
//! the template source document and written once into the manifest, where
//! every instance of the group merges them by reference.

pub mod registry;

pub use registry::{TemplateRegistry, TemplateSet};
