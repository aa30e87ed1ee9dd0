//! Capacity planning against the /24 host range

use super::config::MAX_HOST;
use crate::config::{Group, GroupSpec};
use crate::error::{Result, VmComposeError};

/// Maximum number of instances the network layout can address
pub const CAPACITY: u32 = MAX_HOST as u32;

/// A validated plan: the group snapshot plus its instance total
///
/// Only [`CapacityPlanner::plan`] creates one, so anything consuming a plan
/// sees exactly the groups that passed the capacity check.
#[derive(Debug, Clone)]
pub struct CapacityPlan {
    groups: Vec<Group>,
    total: u32,
}

impl CapacityPlan {
    /// Total instances across enabled groups, between 1 and [`CAPACITY`]
    pub fn total(&self) -> u32 {
        self.total
    }

    /// All groups in declaration order
    pub fn groups(&self) -> &[Group] {
        &self.groups
    }

    /// Enabled groups in declaration order, including those with a zero count
    pub fn enabled_groups(&self) -> impl Iterator<Item = &Group> {
        self.groups.iter().filter(|g| g.enabled)
    }

    /// Groups contributing at least one instance, in declaration order
    pub fn active_groups(&self) -> impl Iterator<Item = &Group> {
        self.groups.iter().filter(|g| g.planned_count() > 0)
    }
}

/// Capacity planner
pub struct CapacityPlanner;

impl CapacityPlanner {
    /// Sum of counts over enabled groups
    pub fn total(groups: &[Group]) -> u64 {
        groups.iter().map(|g| u64::from(g.planned_count())).sum()
    }

    /// Validate the specification and take ownership of it as a plan
    pub fn plan(spec: GroupSpec) -> Result<CapacityPlan> {
        let groups = spec.into_groups();
        let requested = Self::total(&groups);

        if requested == 0 {
            return Err(VmComposeError::EmptyPlan);
        }

        if requested > u64::from(CAPACITY) {
            return Err(VmComposeError::CapacityExceeded {
                requested,
                capacity: CAPACITY,
            });
        }

        for group in groups.iter().filter(|g| !g.enabled && g.count > 0) {
            tracing::debug!(
                "Skipping disabled group {} ({} instances)",
                group.name,
                group.count
            );
        }

        tracing::info!(
            "Planned {} instances across {} enabled groups",
            requested,
            groups.iter().filter(|g| g.planned_count() > 0).count()
        );

        Ok(CapacityPlan {
            groups,
            total: requested as u32,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_total_ignores_disabled_groups() {
        let spec = GroupSpec::new(vec![
            Group::new("a", 2),
            Group::new("b", 5).enabled(false),
            Group::new("c", 0),
        ]);

        let plan = CapacityPlanner::plan(spec).unwrap();
        assert_eq!(plan.total(), 2);
        assert_eq!(plan.groups().len(), 3);
        assert_eq!(plan.active_groups().count(), 1);
    }

    #[test]
    fn test_empty_plan() {
        let spec = GroupSpec::new(vec![Group::new("a", 3).enabled(false), Group::new("b", 0)]);
        assert!(matches!(
            CapacityPlanner::plan(spec),
            Err(VmComposeError::EmptyPlan)
        ));

        assert!(matches!(
            CapacityPlanner::plan(GroupSpec::default()),
            Err(VmComposeError::EmptyPlan)
        ));
    }

    #[test]
    fn test_capacity_boundary() {
        let spec = GroupSpec::new(vec![Group::new("a", 200), Group::new("b", 53)]);
        assert_eq!(CapacityPlanner::plan(spec).unwrap().total(), 253);

        let spec = GroupSpec::new(vec![Group::new("a", 254)]);
        match CapacityPlanner::plan(spec) {
            Err(VmComposeError::CapacityExceeded { requested, capacity }) => {
                assert_eq!(requested, 254);
                assert_eq!(capacity, 253);
            }
            other => panic!("expected capacity error, got {:?}", other),
        }
    }

    #[test]
    fn test_large_counts_do_not_overflow() {
        let spec = GroupSpec::new(vec![Group::new("a", u32::MAX), Group::new("b", u32::MAX)]);
        assert!(matches!(
            CapacityPlanner::plan(spec),
            Err(VmComposeError::CapacityExceeded { .. })
        ));
    }
}
