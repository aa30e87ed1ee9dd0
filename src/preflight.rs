//! Pre-flight checks run before compiling
//!
//! These guard the environment rather than the inputs' content: the input
//! files must exist and the container tool the manifest is meant for should
//! be installed.

use crate::error::{Result, VmComposeError};
use std::path::{Path, PathBuf};

/// A single environment check
pub trait Preflight {
    /// Short name used in error messages
    fn name(&self) -> &str;

    /// Run the check
    fn check(&self) -> Result<()>;
}

/// Input files must exist and be regular files
pub struct FilesPresent {
    paths: Vec<PathBuf>,
}

impl FilesPresent {
    /// Check the given paths
    pub fn new(paths: Vec<PathBuf>) -> Self {
        Self { paths }
    }
}

impl Preflight for FilesPresent {
    fn name(&self) -> &str {
        "input files"
    }

    fn check(&self) -> Result<()> {
        let missing: Vec<String> = self
            .paths
            .iter()
            .filter(|p| !p.is_file())
            .map(|p| p.display().to_string())
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(VmComposeError::Preflight {
                check: self.name().to_string(),
                message: format!("missing {}", missing.join(", ")),
            })
        }
    }
}

/// An executable must be reachable through `PATH`
pub struct ToolAvailable {
    tool: String,
    search_path: Option<std::ffi::OsString>,
}

impl ToolAvailable {
    /// Look `tool` up in the process `PATH`
    pub fn new(tool: &str) -> Self {
        Self {
            tool: tool.to_string(),
            search_path: std::env::var_os("PATH"),
        }
    }

    /// Look `tool` up in an explicit search path
    pub fn with_search_path(tool: &str, search_path: impl Into<std::ffi::OsString>) -> Self {
        Self {
            tool: tool.to_string(),
            search_path: Some(search_path.into()),
        }
    }

    /// Full path of the tool, if found
    pub fn locate(&self) -> Option<PathBuf> {
        let search_path = self.search_path.as_ref()?;
        std::env::split_paths(search_path)
            .map(|dir| dir.join(&self.tool))
            .find(|candidate| is_executable(candidate))
    }
}

impl Preflight for ToolAvailable {
    fn name(&self) -> &str {
        &self.tool
    }

    fn check(&self) -> Result<()> {
        match self.locate() {
            Some(path) => {
                tracing::debug!("Found {} at {}", self.tool, path.display());
                Ok(())
            }
            None => Err(VmComposeError::Preflight {
                check: self.tool.clone(),
                message: format!("'{}' is not installed or not on PATH", self.tool),
            }),
        }
    }
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

/// Run checks in order, stopping at the first failure
pub fn run_all(checks: &[&dyn Preflight]) -> Result<()> {
    for check in checks {
        check.check()?;
        tracing::debug!("Pre-flight check passed: {}", check.name());
    }
    Ok(())
}
