//! vmcompose - compile VM fleet groups into a compose manifest
//!
//! Groups declare how many instances of a kind of machine to run. vmcompose
//! expands every enabled group into individually numbered services, gives
//! each one a fixed address on two /24 networks, and writes a compose file
//! where the services share their group's template by reference:
//!
//! - Group specification loading
//! - Shared template resolution
//! - Capacity planning against the network layout
//! - Instance allocation and manifest emission
//! - Pre-flight checks for the command-line tool

pub mod compose;
pub mod config;
pub mod error;
pub mod network;
pub mod preflight;
pub mod template;

pub use compose::{CompileSummary, ManifestCompiler};
pub use config::CompilerConfig;
pub use error::{Result, VmComposeError};
