//! Group specification model
//!
//! The group document is a YAML mapping from group name to its definition:
//!
//! ```yaml
//! AGENT_A:
//!   enable: true
//!   count: 2
//!   volumes:
//!     - ./shared:/shared
//!   ports:
//!     vm-1:
//!       - "8080:80"
//! ```

use crate::error::{Result, VmComposeError};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

const GROUP_SOURCE: &str = "group specification";

/// A boolean that may also be written as text ("true", "yes", "1", ...)
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum FlagValue {
    Bool(bool),
    Int(i64),
    Text(String),
}

impl FlagValue {
    fn into_bool(self) -> Option<bool> {
        match self {
            FlagValue::Bool(b) => Some(b),
            FlagValue::Int(0) => Some(false),
            FlagValue::Int(1) => Some(true),
            FlagValue::Int(_) => None,
            FlagValue::Text(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "yes" | "on" | "1" => Some(true),
                "false" | "no" | "off" | "0" | "" => Some(false),
                _ => None,
            },
        }
    }
}

/// A count written either as a number or as numeric text
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum CountValue {
    Number(i64),
    Text(String),
}

impl CountValue {
    fn into_count(self) -> Option<u32> {
        match self {
            CountValue::Number(n) => u32::try_from(n).ok(),
            CountValue::Text(s) => s.trim().parse().ok(),
        }
    }
}

/// Scalar list entry; bare numbers such as `- 80` are kept as their text
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum ScalarValue {
    Text(String),
    Int(i64),
}

impl From<ScalarValue> for String {
    fn from(value: ScalarValue) -> Self {
        match value {
            ScalarValue::Text(s) => s,
            ScalarValue::Int(n) => n.to_string(),
        }
    }
}

/// Group definition as written in the document
#[derive(Debug, Clone, Default, Deserialize)]
struct GroupDefinition {
    #[serde(default)]
    enable: Option<FlagValue>,
    #[serde(default)]
    count: Option<CountValue>,
    #[serde(default)]
    template: Option<String>,
    #[serde(default)]
    volumes: Option<Vec<ScalarValue>>,
    #[serde(default)]
    ports: Option<BTreeMap<String, Option<Vec<ScalarValue>>>>,
}

/// A named class of instances sharing a template, volumes and port overrides
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group {
    /// Group name (key in the document)
    pub name: String,
    /// Whether the group contributes instances
    pub enabled: bool,
    /// Number of instances requested
    pub count: u32,
    /// Template name, always lower-case
    pub template: String,
    /// Volume mounts copied to every instance
    pub volumes: Vec<String>,
    /// Port publications keyed by instance name
    pub ports: BTreeMap<String, Vec<String>>,
}

impl Group {
    /// Create an enabled group with the derived template name
    pub fn new(name: &str, count: u32) -> Self {
        Self {
            name: name.to_string(),
            enabled: true,
            count,
            template: template_name(name),
            volumes: Vec::new(),
            ports: BTreeMap::new(),
        }
    }

    /// Set enabled flag
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Override the template name
    pub fn template(mut self, template: &str) -> Self {
        self.template = template_name(template);
        self
    }

    /// Add a volume mount
    pub fn volume(mut self, volume: &str) -> Self {
        self.volumes.push(volume.to_string());
        self
    }

    /// Add a port publication for one instance
    pub fn port(mut self, instance: &str, port: &str) -> Self {
        self.ports
            .entry(instance.to_string())
            .or_default()
            .push(port.to_string());
        self
    }

    /// Ports published by the named instance; empty when none are declared
    pub fn ports_for(&self, instance_name: &str) -> &[String] {
        self.ports
            .get(instance_name)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Number of instances this group contributes to a plan
    pub fn planned_count(&self) -> u32 {
        if self.enabled {
            self.count
        } else {
            0
        }
    }

    fn from_definition(name: &str, def: GroupDefinition) -> Result<Self> {
        let enabled = match def.enable {
            Some(flag) => flag.into_bool().ok_or_else(|| {
                VmComposeError::parse(
                    GROUP_SOURCE,
                    format!("group '{}': 'enable' must be a boolean", name),
                )
            })?,
            None => false,
        };

        let count = match def.count {
            Some(count) => count.into_count().ok_or_else(|| {
                VmComposeError::parse(
                    GROUP_SOURCE,
                    format!("group '{}': 'count' must be a non-negative integer", name),
                )
            })?,
            None => 0,
        };

        let template = template_name(def.template.as_deref().unwrap_or(name));

        let volumes = def
            .volumes
            .unwrap_or_default()
            .into_iter()
            .map(String::from)
            .collect();

        let ports = def
            .ports
            .unwrap_or_default()
            .into_iter()
            .map(|(instance, list)| {
                let list: Vec<String> =
                    list.unwrap_or_default().into_iter().map(String::from).collect();
                (instance, list)
            })
            .collect();

        Ok(Self {
            name: name.to_string(),
            enabled,
            count,
            template,
            volumes,
            ports,
        })
    }
}

/// Normalize a group or template name into a template key
pub fn template_name(name: &str) -> String {
    name.trim().to_lowercase()
}

/// All groups of a specification, in declaration order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupSpec {
    groups: Vec<Group>,
}

impl GroupSpec {
    /// Build a specification from groups already in order
    pub fn new(groups: Vec<Group>) -> Self {
        Self { groups }
    }

    /// Parse the group document at `path`
    pub fn parse_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::parse_str(&content)
    }

    /// Parse a group document
    pub fn parse_str(content: &str) -> Result<Self> {
        let doc: serde_yaml::Value = serde_yaml::from_str(content)
            .map_err(|e| VmComposeError::parse(GROUP_SOURCE, format!("invalid YAML: {}", e)))?;

        let mapping = match doc {
            serde_yaml::Value::Null => return Ok(Self::default()),
            serde_yaml::Value::Mapping(mapping) => mapping,
            _ => {
                return Err(VmComposeError::parse(
                    GROUP_SOURCE,
                    "document must be a mapping of group names",
                ))
            }
        };

        let mut groups = Vec::with_capacity(mapping.len());
        for (key, value) in mapping {
            let name = match key {
                serde_yaml::Value::String(s) => s,
                other => {
                    return Err(VmComposeError::parse(
                        GROUP_SOURCE,
                        format!("group name must be a string, got {:?}", other),
                    ))
                }
            };

            let def = match value {
                serde_yaml::Value::Null => GroupDefinition::default(),
                value @ serde_yaml::Value::Mapping(_) => serde_yaml::from_value(value)
                    .map_err(|e| {
                        VmComposeError::parse(GROUP_SOURCE, format!("group '{}': {}", name, e))
                    })?,
                _ => {
                    return Err(VmComposeError::parse(
                        GROUP_SOURCE,
                        format!("group '{}' must be a mapping", name),
                    ))
                }
            };

            groups.push(Group::from_definition(&name, def)?);
        }

        tracing::debug!("Loaded {} groups", groups.len());
        Ok(Self { groups })
    }

    /// Groups in declaration order
    pub fn groups(&self) -> &[Group] {
        &self.groups
    }

    /// Number of groups declared
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    /// Whether no groups are declared
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub(crate) fn into_groups(self) -> Vec<Group> {
        self.groups
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_groups_in_order() {
        let yaml = r#"
ZETA:
  enable: true
  count: 1
AGENT_A:
  enable: true
  count: 2
  volumes:
    - ./shared:/shared
  ports:
    vm-2:
      - "8080:80"
      - "5353:53/udp"
"#;

        let spec = GroupSpec::parse_str(yaml).unwrap();
        let names: Vec<&str> = spec.groups().iter().map(|g| g.name.as_str()).collect();
        assert_eq!(names, vec!["ZETA", "AGENT_A"]);

        let agent = &spec.groups()[1];
        assert!(agent.enabled);
        assert_eq!(agent.count, 2);
        assert_eq!(agent.template, "agent_a");
        assert_eq!(agent.volumes, vec!["./shared:/shared"]);
        assert_eq!(agent.ports_for("vm-2"), ["8080:80", "5353:53/udp"]);
        assert!(agent.ports_for("vm-1").is_empty());
    }

    #[test]
    fn test_enable_defaults_to_false() {
        let spec = GroupSpec::parse_str("web:\n  count: 3\n").unwrap();
        let web = &spec.groups()[0];
        assert!(!web.enabled);
        assert_eq!(web.planned_count(), 0);
    }

    #[test]
    fn test_textual_flags_and_counts() {
        let yaml = r#"
a:
  enable: "true"
  count: "4"
b:
  enable: "no"
  count: 2
"#;
        let spec = GroupSpec::parse_str(yaml).unwrap();
        assert!(spec.groups()[0].enabled);
        assert_eq!(spec.groups()[0].count, 4);
        assert!(!spec.groups()[1].enabled);
    }

    #[test]
    fn test_invalid_flag_rejected() {
        let err = GroupSpec::parse_str("a:\n  enable: maybe\n").unwrap_err();
        assert!(matches!(err, VmComposeError::Parse { .. }));
    }

    #[test]
    fn test_negative_count_rejected() {
        let err = GroupSpec::parse_str("a:\n  enable: true\n  count: -1\n").unwrap_err();
        assert!(matches!(err, VmComposeError::Parse { .. }));
    }

    #[test]
    fn test_malformed_yaml_rejected() {
        let err = GroupSpec::parse_str("a: [unclosed\n").unwrap_err();
        assert!(matches!(err, VmComposeError::Parse { .. }));
    }

    #[test]
    fn test_non_mapping_document_rejected() {
        let err = GroupSpec::parse_str("- a\n- b\n").unwrap_err();
        assert!(matches!(err, VmComposeError::Parse { .. }));
    }

    #[test]
    fn test_empty_document_has_no_groups() {
        assert!(GroupSpec::parse_str("").unwrap().is_empty());
    }

    #[test]
    fn test_template_override_is_normalized() {
        let yaml = "web:\n  enable: true\n  count: 1\n  template: Shared_Base\n";
        let spec = GroupSpec::parse_str(yaml).unwrap();
        assert_eq!(spec.groups()[0].template, "shared_base");
    }
}
