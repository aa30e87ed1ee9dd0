//! Template registry for resolving shared service configuration blocks

use crate::config::template_name;
use crate::error::{Result, VmComposeError};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;

const TEMPLATE_SOURCE: &str = "template source";

/// Named configuration blocks loaded from the template source document
///
/// Every block must be a mapping of service settings. A block written as a
/// YAML string is kept verbatim, a structured one is rendered back to YAML
/// text. Names are lower-cased on load.
#[derive(Debug, Clone, Default)]
pub struct TemplateRegistry {
    templates: BTreeMap<String, String>,
}

impl TemplateRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Load templates from the document at `path`
    pub fn parse_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::parse_str(&content)
    }

    /// Load templates from a YAML document
    pub fn parse_str(content: &str) -> Result<Self> {
        let doc: serde_yaml::Value = serde_yaml::from_str(content)
            .map_err(|e| VmComposeError::parse(TEMPLATE_SOURCE, format!("invalid YAML: {}", e)))?;

        let mapping = match doc {
            serde_yaml::Value::Null => return Ok(Self::default()),
            serde_yaml::Value::Mapping(mapping) => mapping,
            _ => {
                return Err(VmComposeError::parse(
                    TEMPLATE_SOURCE,
                    "document must be a mapping of template names",
                ))
            }
        };

        let mut registry = Self::new();
        for (key, value) in mapping {
            let name = key.as_str().ok_or_else(|| {
                VmComposeError::parse(TEMPLATE_SOURCE, "template names must be strings")
            })?;

            let block = block_text(name, value)?;

            let normalized = template_name(name);
            if registry.templates.contains_key(&normalized) {
                return Err(VmComposeError::parse(
                    TEMPLATE_SOURCE,
                    format!("duplicate template definition: {}", normalized),
                ));
            }
            registry.templates.insert(normalized, block);
        }

        tracing::debug!("Loaded {} templates", registry.templates.len());
        Ok(registry)
    }

    /// Register a template block
    pub fn insert(&mut self, name: &str, block: &str) {
        self.templates.insert(template_name(name), block.to_string());
    }

    /// Resolve a template block by name
    pub fn get(&self, name: &str) -> Option<&str> {
        self.templates.get(name).map(String::as_str)
    }

    /// Resolve a template block for `group`, failing when it is not defined
    pub fn resolve(&self, name: &str, group: &str) -> Result<&str> {
        self.get(name)
            .ok_or_else(|| VmComposeError::TemplateNotFound {
                name: name.to_string(),
                group: group.to_string(),
            })
    }

    /// Number of templates
    pub fn len(&self) -> usize {
        self.templates.len()
    }

    /// Whether the registry is empty
    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

/// Text of a template block; services merge it, so it must be a mapping
///
/// Empty, null and comment-only blocks become the empty string, which the
/// emitter writes as `{}`.
fn block_text(name: &str, value: serde_yaml::Value) -> Result<String> {
    let not_mapping = || {
        VmComposeError::parse(
            TEMPLATE_SOURCE,
            format!("template '{}' must be a mapping of service settings", name),
        )
    };

    match value {
        serde_yaml::Value::Null => Ok(String::new()),
        serde_yaml::Value::String(text) => {
            let parsed: serde_yaml::Value = serde_yaml::from_str(&text).map_err(|e| {
                VmComposeError::parse(TEMPLATE_SOURCE, format!("template '{}': {}", name, e))
            })?;
            match parsed {
                serde_yaml::Value::Null => Ok(String::new()),
                serde_yaml::Value::Mapping(m) if m.is_empty() => Ok(String::new()),
                serde_yaml::Value::Mapping(_) => Ok(text),
                _ => Err(not_mapping()),
            }
        }
        serde_yaml::Value::Mapping(m) if m.is_empty() => Ok(String::new()),
        value @ serde_yaml::Value::Mapping(_) => serde_yaml::to_string(&value).map_err(|e| {
            VmComposeError::parse(TEMPLATE_SOURCE, format!("template '{}': {}", name, e))
        }),
        _ => Err(not_mapping()),
    }
}

/// Insertion-ordered set of template names
#[derive(Debug, Clone, Default)]
pub struct TemplateSet {
    seen: HashSet<String>,
    order: Vec<String>,
}

impl TemplateSet {
    /// Create an empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a name; returns false when it was already present
    pub fn insert(&mut self, name: &str) -> bool {
        if self.seen.contains(name) {
            return false;
        }
        self.seen.insert(name.to_string());
        self.order.push(name.to_string());
        true
    }

    /// Whether `name` has been added
    pub fn contains(&self, name: &str) -> bool {
        self.seen.contains(name)
    }

    /// Names in first-insertion order
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    /// Number of distinct names
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Whether the set is empty
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
