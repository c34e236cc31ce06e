//! Redshift cluster subnet group, managed or imported.

use std::rc::Rc;

use super::vpc::{SelectedSubnets, SubnetSelection, Vpc};
use crate::core::schema::ResourceKind;
use crate::core::tree::{CfnResource, ConstructKind, ConstructTree, NodeId};
use crate::core::types::{RemovalPolicy, Value};
use crate::core::SynthError;

/// Options for a managed subnet group.
#[derive(Debug, Clone)]
pub struct ClusterSubnetGroupProps {
    pub description: String,
    pub vpc: Vpc,
    /// Defaults to the private subnets of `vpc`.
    pub vpc_subnets: Option<SubnetSelection>,
    /// Defaults to `Retain`.
    pub removal_policy: Option<RemovalPolicy>,
}

/// Attributes of a subnet group defined outside this tree.
#[derive(Debug, Clone)]
pub struct ClusterSubnetGroupAttributes {
    pub cluster_subnet_group_name: String,
    pub selected_subnets: Rc<SelectedSubnets>,
}

/// Handle to a cluster subnet group.
#[derive(Debug, Clone)]
pub struct ClusterSubnetGroup {
    name: Value,
    resource: Option<NodeId>,
    selected_subnets: Option<Rc<SelectedSubnets>>,
}

impl ClusterSubnetGroup {
    /// Declare a managed subnet group under `scope`.
    pub fn new(
        tree: &mut ConstructTree,
        scope: NodeId,
        id: &str,
        props: ClusterSubnetGroupProps,
    ) -> Result<Self, SynthError> {
        let selection = props.vpc_subnets.unwrap_or_default();
        let node = tree.create(scope, id, ConstructKind::Scope)?;
        let selected = props.vpc.select_subnets(&selection).map_err(|e| match e {
            SynthError::InvalidProps { message, .. } => {
                SynthError::invalid(tree.path(node), message)
            }
            other => other,
        })?;

        let subnet_ids = props.vpc.subnet_ids_token(tree, selection);
        let resource = tree.create(
            node,
            "Default",
            ConstructKind::Resource(
                CfnResource::new(ResourceKind::RedshiftClusterSubnetGroup)
                    .prop("Description", props.description.as_str())
                    .prop("SubnetIds", subnet_ids)
                    .removal_policy(props.removal_policy.unwrap_or(RemovalPolicy::Retain)),
            ),
        )?;

        Ok(Self {
            name: Value::NodeRef(resource),
            resource: Some(resource),
            selected_subnets: Some(selected),
        })
    }

    /// Reference a subnet group by name only.
    pub fn from_name(name: &str) -> Self {
        Self {
            name: Value::from(name),
            resource: None,
            selected_subnets: None,
        }
    }

    /// Reference a subnet group with a known subnet selection. The selection
    /// is held as given.
    pub fn from_attributes(attrs: ClusterSubnetGroupAttributes) -> Self {
        Self {
            name: Value::String(attrs.cluster_subnet_group_name),
            resource: None,
            selected_subnets: Some(attrs.selected_subnets),
        }
    }

    /// Name of the group: a `Ref` for managed groups, the literal for imports.
    pub fn cluster_subnet_group_name(&self) -> &Value {
        &self.name
    }

    /// The `AWS::Redshift::ClusterSubnetGroup` node, if managed here.
    pub fn resource(&self) -> Option<NodeId> {
        self.resource
    }

    pub fn is_imported(&self) -> bool {
        self.resource.is_none()
    }

    pub fn selected_subnets(&self) -> Option<&Rc<SelectedSubnets>> {
        self.selected_subnets.as_ref()
    }
}
