//! Compiler settings

use crate::error::{Result, VmComposeError};
use crate::network::{NetworkLayout, SubnetConfig};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Default group specification file
pub const DEFAULT_GROUP_FILE: &str = "groups.yaml";

/// Default template source file
pub const DEFAULT_TEMPLATE_FILE: &str = "templates.yaml";

/// Default manifest output file
pub const DEFAULT_OUTPUT_FILE: &str = "docker-compose.yml";

/// Top-level manifest key holding the shared templates
pub const DEFAULT_TEMPLATE_SECTION: &str = "x-templates";

/// Paths, networks and environment values for one compilation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompilerConfig {
    /// Group specification document
    pub group_file: PathBuf,
    /// Template source document
    pub template_file: PathBuf,
    /// Manifest output path
    pub output: PathBuf,
    /// Top-level key of the template section
    pub template_section: String,
    /// Networks instances are attached to
    pub networks: NetworkLayout,
    /// Environment values passed to every instance verbatim
    pub environment: BTreeMap<String, String>,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            group_file: PathBuf::from(DEFAULT_GROUP_FILE),
            template_file: PathBuf::from(DEFAULT_TEMPLATE_FILE),
            output: PathBuf::from(DEFAULT_OUTPUT_FILE),
            template_section: DEFAULT_TEMPLATE_SECTION.to_string(),
            networks: NetworkLayout::default(),
            environment: BTreeMap::new(),
        }
    }
}

impl CompilerConfig {
    /// Default layout rooted at `dir`
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            group_file: dir.join(DEFAULT_GROUP_FILE),
            template_file: dir.join(DEFAULT_TEMPLATE_FILE),
            output: dir.join(DEFAULT_OUTPUT_FILE),
            ..Self::default()
        }
    }

    /// Set group specification path
    pub fn group_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.group_file = path.into();
        self
    }

    /// Set template source path
    pub fn template_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.template_file = path.into();
        self
    }

    /// Set manifest output path
    pub fn output(mut self, path: impl Into<PathBuf>) -> Self {
        self.output = path.into();
        self
    }

    /// Set primary network
    pub fn primary_network(mut self, subnet: SubnetConfig) -> Self {
        self.networks.primary = subnet;
        self
    }

    /// Set secondary network
    pub fn secondary_network(mut self, subnet: SubnetConfig) -> Self {
        self.networks.secondary = subnet;
        self
    }

    /// Add an environment value
    pub fn env(mut self, key: &str, value: &str) -> Self {
        self.environment.insert(key.to_string(), value.to_string());
        self
    }

    /// Check settings before any input is read
    pub fn validate(&self) -> Result<()> {
        self.networks.validate()?;

        if matches!(self.template_section.as_str(), "" | "services" | "networks") {
            return Err(VmComposeError::InvalidConfig(format!(
                "Template section key '{}' is not usable",
                self.template_section
            )));
        }

        if let Some(key) = self.environment.keys().find(|k| k.is_empty() || k.contains('=')) {
            return Err(VmComposeError::InvalidConfig(format!(
                "Invalid environment variable name '{}'",
                key
            )));
        }

        Ok(())
    }
}

/// Split a `KEY=VALUE` pair
pub fn parse_env_pair(pair: &str) -> Result<(String, String)> {
    match pair.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(VmComposeError::InvalidConfig(format!(
            "Expected KEY=VALUE, got '{}'",
            pair
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_paths() {
        let config = CompilerConfig::default();
        assert_eq!(config.group_file, PathBuf::from("groups.yaml"));
        assert_eq!(config.template_file, PathBuf::from("templates.yaml"));
        assert_eq!(config.output, PathBuf::from("docker-compose.yml"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_in_dir() {
        let config = CompilerConfig::in_dir(Path::new("/srv/lab"));
        assert_eq!(config.group_file, PathBuf::from("/srv/lab/groups.yaml"));
        assert_eq!(config.output, PathBuf::from("/srv/lab/docker-compose.yml"));
    }

    #[test]
    fn test_parse_env_pair() {
        assert_eq!(
            parse_env_pair("HOST_NUMBER=7").unwrap(),
            ("HOST_NUMBER".to_string(), "7".to_string())
        );
        assert_eq!(
            parse_env_pair("EMPTY=").unwrap(),
            ("EMPTY".to_string(), String::new())
        );
        assert!(parse_env_pair("=7").is_err());
        assert!(parse_env_pair("NOVALUE").is_err());
    }

    #[test]
    fn test_reserved_template_section() {
        let mut config = CompilerConfig::default();
        config.template_section = "services".to_string();
        assert!(config.validate().is_err());
    }
}
