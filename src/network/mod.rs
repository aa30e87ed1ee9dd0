//! Network layout and capacity planning
//!
//! Every instance is attached to two /24 networks and takes the host number
//! equal to its index on both, so the layout bounds how many instances a
//! plan may request.

pub mod config;
pub mod planner;

pub use config::{NetworkLayout, SubnetConfig, GATEWAY_HOST, MAX_HOST};
pub use planner::{CapacityPlan, CapacityPlanner, CAPACITY};
