//! Instance allocation
//!
//! Enabled groups are flattened in declaration order into one sequence of
//! `(group, ordinal)` pairs. An instance's global index is its 1-based
//! position in that sequence, and both of its addresses use the index as
//! host number.

use crate::config::Group;
use crate::network::{CapacityPlan, NetworkLayout, MAX_HOST};
use std::collections::HashSet;
use std::net::Ipv4Addr;

/// Service name of the instance with `index`
pub fn instance_name(index: u8) -> String {
    format!("vm-{}", index)
}

/// One concretely numbered service expanded from a group
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instance<'a> {
    /// Global index, starting at 1
    pub index: u8,
    /// Position within the owning group, starting at 1
    pub ordinal: u32,
    /// Service, container and host name
    pub name: String,
    /// Address on the primary network
    pub primary_ip: Ipv4Addr,
    /// Address on the secondary network
    pub secondary_ip: Ipv4Addr,
    /// Owning group
    pub group: &'a str,
    /// Template merged into the service
    pub template: &'a str,
    /// Published ports
    pub ports: &'a [String],
    /// Volume mounts
    pub volumes: &'a [String],
}

/// Assigns identity and addresses to every planned instance
pub struct InstanceAllocator<'a> {
    plan: &'a CapacityPlan,
    networks: &'a NetworkLayout,
}

impl<'a> InstanceAllocator<'a> {
    /// Create an allocator over a validated plan
    pub fn new(plan: &'a CapacityPlan, networks: &'a NetworkLayout) -> Self {
        Self { plan, networks }
    }

    /// Instances in increasing index order
    pub fn instances(&self) -> impl Iterator<Item = Instance<'a>> + 'a {
        let plan = self.plan;
        let networks = self.networks;

        // The plan guarantees at most MAX_HOST instances, so the zip never truncates.
        plan.active_groups()
            .flat_map(|group| (1..=group.count).map(move |ordinal| (group, ordinal)))
            .zip(1..=MAX_HOST)
            .map(move |((group, ordinal), index)| Self::instance(networks, group, ordinal, index))
    }

    /// Allocate all instances, warning about port entries no instance uses
    pub fn allocate(&self) -> Vec<Instance<'a>> {
        let instances: Vec<Instance<'a>> = self.instances().collect();

        for group in self.plan.active_groups() {
            let names: HashSet<&str> = instances
                .iter()
                .filter(|i| i.group == group.name)
                .map(|i| i.name.as_str())
                .collect();

            for key in group.ports.keys().filter(|k| !names.contains(k.as_str())) {
                tracing::warn!(
                    "Group {} publishes ports for {}, which is not one of its instances",
                    group.name,
                    key
                );
            }
        }

        instances
    }

    fn instance(networks: &NetworkLayout, group: &'a Group, ordinal: u32, index: u8) -> Instance<'a> {
        let name = instance_name(index);
        let ports = group.ports_for(&name);

        tracing::debug!(
            "Allocated {} (group {}, #{}) with {} ports",
            name,
            group.name,
            ordinal,
            ports.len()
        );

        Instance {
            index,
            ordinal,
            primary_ip: networks.primary.host(index),
            secondary_ip: networks.secondary.host(index),
            group: &group.name,
            template: &group.template,
            ports,
            volumes: &group.volumes,
            name,
        }
    }
}
