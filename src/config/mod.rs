//! Input model and compiler settings

pub mod group;
pub mod settings;

pub use group::{template_name, Group, GroupSpec};
pub use settings::CompilerConfig;
