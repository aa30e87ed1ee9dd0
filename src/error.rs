//! Error types for vmcompose

use thiserror::Error;

/// Result type for vmcompose operations
pub type Result<T> = std::result::Result<T, VmComposeError>;

/// vmcompose error types
#[derive(Error, Debug)]
pub enum VmComposeError {
    #[error("Parse error in {source_name}: {message}")]
    Parse {
        source_name: String,
        message: String,
    },

    #[error("Template '{name}' not found (referenced by group '{group}')")]
    TemplateNotFound { name: String, group: String },

    #[error("No containers enabled: enable at least one group with a count above zero")]
    EmptyPlan,

    #[error("Requested {requested} containers, but the network supports at most {capacity}")]
    CapacityExceeded { requested: u64, capacity: u32 },

    #[error("Pre-flight check '{check}' failed: {message}")]
    Preflight { check: String, message: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl VmComposeError {
    /// Build a parse error for a named input document
    pub fn parse(source_name: impl Into<String>, message: impl std::fmt::Display) -> Self {
        Self::Parse {
            source_name: source_name.into(),
            message: message.to_string(),
        }
    }
}
