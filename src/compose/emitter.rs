//! Manifest emission
//!
//! The manifest is rendered into memory in three phases: the template
//! section, one service per instance, then the two network definitions.
//! Services merge their group's template through a YAML alias instead of
//! repeating its content.

use super::allocator::Instance;
use crate::config::CompilerConfig;
use crate::error::{Result, VmComposeError};
use crate::network::{CapacityPlan, SubnetConfig};
use crate::template::{TemplateRegistry, TemplateSet};
use std::fmt::Display;

const HEADER: &str = "# Generated by vmcompose. Edits are overwritten on the next run.";

/// A fully rendered manifest
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Manifest {
    /// Document text
    pub text: String,
    /// Templates written, in emission order
    pub templates: Vec<String>,
    /// Number of services written
    pub services: usize,
}

/// Line buffer with two-space indentation
#[derive(Default)]
struct Document {
    text: String,
}

impl Document {
    fn line(&mut self, depth: usize, content: impl Display) {
        for _ in 0..depth {
            self.text.push_str("  ");
        }
        self.text.push_str(&content.to_string());
        self.text.push('\n');
    }

    fn blank(&mut self) {
        self.text.push('\n');
    }

    /// Copy a multi-line block, indenting every non-empty line
    fn block(&mut self, depth: usize, block: &str) {
        for line in block.trim_end().lines() {
            if line.trim().is_empty() {
                self.blank();
            } else {
                self.line(depth, line);
            }
        }
    }
}

/// Quote a scalar as a YAML double-quoted string
fn quoted(value: &str) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| format!("\"{}\"", value))
}

/// Emit a mapping key plainly when it is safe to, otherwise quoted
fn key(name: &str) -> String {
    let plain = name
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
        && !is_reserved_word(name);

    if plain {
        name.to_string()
    } else {
        quoted(name)
    }
}

/// Plain scalars YAML reads as null or a boolean rather than a string
fn is_reserved_word(name: &str) -> bool {
    ["null", "true", "false"]
        .iter()
        .any(|word| name.eq_ignore_ascii_case(word))
}

/// Whether a template name can be used as a YAML anchor as-is
pub fn is_valid_anchor(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
}

/// Manifest emitter
pub struct ManifestEmitter<'a> {
    registry: &'a TemplateRegistry,
    config: &'a CompilerConfig,
}

impl<'a> ManifestEmitter<'a> {
    /// Create an emitter resolving templates from `registry`
    pub fn new(registry: &'a TemplateRegistry, config: &'a CompilerConfig) -> Self {
        Self { registry, config }
    }

    /// Resolve every template referenced by an enabled group, in first-use order
    ///
    /// Fails before anything is rendered when a template is missing or its
    /// name cannot serve as an anchor.
    pub fn resolve_templates(&self, plan: &'a CapacityPlan) -> Result<Vec<(&'a str, &'a str)>> {
        let registry = self.registry;
        let mut seen = TemplateSet::new();
        let mut resolved = Vec::new();

        for group in plan.enabled_groups() {
            if !seen.insert(&group.template) {
                continue;
            }

            if !is_valid_anchor(&group.template) {
                return Err(VmComposeError::InvalidConfig(format!(
                    "Template name '{}' of group '{}' may only contain letters, digits, '_', '-' and '.'",
                    group.template, group.name
                )));
            }

            let block = registry.resolve(&group.template, &group.name)?;
            resolved.push((group.template.as_str(), block));
        }

        Ok(resolved)
    }

    /// Render the manifest for `instances` allocated from `plan`
    pub fn emit(&self, plan: &'a CapacityPlan, instances: &[Instance<'_>]) -> Result<Manifest> {
        let templates = self.resolve_templates(plan)?;
        let mut doc = Document::default();

        doc.line(0, HEADER);
        self.write_templates(&mut doc, &templates);
        doc.blank();
        self.write_services(&mut doc, instances);
        doc.blank();
        self.write_networks(&mut doc);

        tracing::info!(
            "Rendered manifest with {} templates and {} services",
            templates.len(),
            instances.len()
        );

        Ok(Manifest {
            text: doc.text,
            templates: templates.iter().map(|(name, _)| name.to_string()).collect(),
            services: instances.len(),
        })
    }

    fn write_templates(&self, doc: &mut Document, templates: &[(&str, &str)]) {
        doc.line(0, format!("{}:", key(&self.config.template_section)));

        for (name, block) in templates {
            if block.trim().is_empty() {
                doc.line(1, format!("{}: &{} {{}}", key(name), name));
            } else {
                doc.line(1, format!("{}: &{}", key(name), name));
                doc.block(2, block);
            }
        }
    }

    fn write_services(&self, doc: &mut Document, instances: &[Instance<'_>]) {
        let networks = &self.config.networks;

        doc.line(0, "services:");
        for instance in instances {
            doc.line(1, format!("{}:", instance.name));
            doc.line(2, format!("<<: *{}", instance.template));
            doc.line(2, format!("container_name: {}", instance.name));
            doc.line(2, format!("hostname: {}", instance.name));
            doc.line(2, "privileged: true");

            doc.line(2, "networks:");
            for (subnet, address) in [
                (&networks.primary, instance.primary_ip),
                (&networks.secondary, instance.secondary_ip),
            ] {
                doc.line(3, format!("{}:", key(&subnet.name)));
                doc.line(4, format!("ipv4_address: {}", address));
            }

            if !instance.ports.is_empty() {
                doc.line(2, "ports:");
                for port in instance.ports {
                    doc.line(3, format!("- {}", quoted(port)));
                }
            }

            if !instance.volumes.is_empty() {
                doc.line(2, "volumes:");
                for volume in instance.volumes {
                    doc.line(3, format!("- {}", quoted(volume)));
                }
            }

            if !self.config.environment.is_empty() {
                doc.line(2, "environment:");
                for (name, value) in &self.config.environment {
                    doc.line(3, format!("{}: {}", key(name), quoted(value)));
                }
            }
        }
    }

    fn write_networks(&self, doc: &mut Document) {
        doc.line(0, "networks:");
        for subnet in self.config.networks.subnets() {
            write_network(doc, subnet);
        }
    }
}

fn write_network(doc: &mut Document, subnet: &SubnetConfig) {
    doc.line(1, format!("{}:", key(&subnet.name)));
    doc.line(2, format!("driver: {}", key(&subnet.driver)));
    doc.line(2, "ipam:");
    doc.line(3, "config:");
    doc.line(4, format!("- subnet: {}", subnet.cidr()));
    doc.line(5, format!("gateway: {}", subnet.gateway()));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compose::allocator::InstanceAllocator;
    use crate::config::{Group, GroupSpec};
    use crate::network::CapacityPlanner;

    fn registry() -> TemplateRegistry {
        let mut registry = TemplateRegistry::new();
        registry.insert("agent_a", "image: agent-a:latest\nrestart: always\n");
        registry.insert("agent_b", "image: agent-b:latest\n");
        registry
    }

    fn render(groups: Vec<Group>, config: &CompilerConfig) -> Result<Manifest> {
        let plan = CapacityPlanner::plan(GroupSpec::new(groups))?;
        let registry = registry();
        let instances = InstanceAllocator::new(&plan, &config.networks).allocate();
        ManifestEmitter::new(&registry, config).emit(&plan, &instances)
    }

    #[test]
    fn test_sections_in_order() {
        let config = CompilerConfig::default();
        let manifest = render(vec![Group::new("AGENT_A", 1)], &config).unwrap();

        let text = &manifest.text;
        let templates = text.find("\nx-templates:\n").unwrap();
        let services = text.find("\nservices:\n").unwrap();
        let networks = text.find("\nnetworks:\n").unwrap();
        assert!(templates < services && services < networks);
    }

    #[test]
    fn test_service_block() {
        let config = CompilerConfig::default();
        let manifest = render(
            vec![Group::new("AGENT_A", 1)
                .volume("./logs:/var/log")
                .port("vm-1", "2222:22")],
            &config,
        )
        .unwrap();

        let expected = "\
services:
  vm-1:
    <<: *agent_a
    container_name: vm-1
    hostname: vm-1
    privileged: true
    networks:
      vm_net_primary:
        ipv4_address: 172.20.30.1
      vm_net_secondary:
        ipv4_address: 172.20.40.1
    ports:
      - \"2222:22\"
    volumes:
      - \"./logs:/var/log\"
";
        assert!(manifest.text.contains(expected), "{}", manifest.text);
    }

    #[test]
    fn test_template_block_indented_once() {
        let config = CompilerConfig::default();
        let manifest = render(
            vec![
                Group::new("AGENT_A", 1),
                Group::new("agent_a_extra", 2).template("agent_a"),
                Group::new("AGENT_B", 1),
            ],
            &config,
        )
        .unwrap();

        assert_eq!(manifest.templates, vec!["agent_a", "agent_b"]);
        assert_eq!(manifest.text.matches("agent_a: &agent_a").count(), 1);
        assert!(manifest
            .text
            .contains("  agent_a: &agent_a\n    image: agent-a:latest\n    restart: always\n"));
        assert_eq!(manifest.text.matches("<<: *agent_a").count(), 3);
    }

    #[test]
    fn test_enabled_zero_count_group_still_needs_template() {
        let config = CompilerConfig::default();
        let err = render(vec![Group::new("AGENT_A", 1), Group::new("missing", 0)], &config)
            .unwrap_err();
        assert!(matches!(err, VmComposeError::TemplateNotFound { .. }));
    }

    #[test]
    fn test_no_optional_blocks_without_values() {
        let config = CompilerConfig::default();
        let manifest = render(vec![Group::new("AGENT_B", 2)], &config).unwrap();
        assert!(!manifest.text.contains("ports:"));
        assert!(!manifest.text.contains("volumes:"));
        assert!(!manifest.text.contains("environment:"));
    }

    #[test]
    fn test_environment_block() {
        let config = CompilerConfig::default()
            .env("HOST_NUMBER", "12")
            .env("LAB", "west \"wing\"");
        let manifest = render(vec![Group::new("AGENT_B", 1)], &config).unwrap();
        assert!(manifest.text.contains(
            "    environment:\n      HOST_NUMBER: \"12\"\n      LAB: \"west \\\"wing\\\"\"\n"
        ));
    }

    #[test]
    fn test_network_definitions() {
        let config = CompilerConfig::default();
        let manifest = render(vec![Group::new("AGENT_B", 1)], &config).unwrap();
        let expected = "\
networks:
  vm_net_primary:
    driver: bridge
    ipam:
      config:
        - subnet: 172.20.30.0/24
          gateway: 172.20.30.254
  vm_net_secondary:
    driver: bridge
    ipam:
      config:
        - subnet: 172.20.40.0/24
          gateway: 172.20.40.254
";
        assert!(manifest.text.ends_with(expected), "{}", manifest.text);
    }

    #[test]
    fn test_anchor_validation() {
        assert!(is_valid_anchor("agent_a"));
        assert!(is_valid_anchor("db-1.2"));
        assert!(!is_valid_anchor("has space"));
        assert!(!is_valid_anchor("star*"));
        assert!(!is_valid_anchor(""));
    }

    #[test]
    fn test_key_quoting() {
        assert_eq!(key("vm_net"), "vm_net");
        assert_eq!(key("1net"), "\"1net\"");
        assert_eq!(key("a b"), "\"a b\"");
        assert_eq!(key("null"), "\"null\"");
        assert_eq!(key("TRUE"), "\"TRUE\"");
        assert_eq!(key("False"), "\"False\"");
        assert_eq!(key("nullable"), "nullable");
    }
}
