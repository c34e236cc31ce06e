//! Higher-level constructs built on the core tree.
//!
//! Each constructor takes the tree and a parent scope explicitly and returns
//! a cheap, clonable handle. Values that depend on later construction (subnet
//! selections, container definitions, listener actions) are registered as
//! tokens and only computed during synthesis.

pub mod builder;
pub mod ecs;
pub mod elb;
pub mod output;
pub mod subnet_group;
pub mod vpc;

pub use builder::build_tree;
pub use ecs::{Cluster, FargateService, FargateTaskDefinition};
pub use elb::{NetworkListener, NetworkLoadBalancer};
pub use output::add_output;
pub use subnet_group::ClusterSubnetGroup;
pub use vpc::{SelectedSubnets, SubnetSelection, Vpc};
