//! Resource synthesis: one construct in, one record out.
//!
//! Properties are resolved, `Null`s dropped, and the rest emitted in the
//! resource type's schema order. Required properties that are absent (or that
//! resolve to `Null`) fail with `MissingRequiredProperty`.

use indexmap::IndexMap;

use super::error::SynthError;
use super::resolver::Resolver;
use super::tree::{CfnOutput, CfnResource, ConstructKind, ConstructTree, NodeId};
use super::types::{OutputExport, OutputRecord, RecordMetadata, ResourceRecord, Value};

/// Synthesize a node. `None` for nodes that produce no resource.
pub fn synthesize(tree: &ConstructTree, node: NodeId) -> Result<Option<ResourceRecord>, SynthError> {
    match &tree.node(node).kind {
        ConstructKind::Resource(resource) => synthesize_resource(tree, node, resource).map(Some),
        _ => Ok(None),
    }
}

/// Synthesize an output node into `(name, record)`.
pub fn synthesize_output(
    tree: &ConstructTree,
    node: NodeId,
) -> Result<Option<(String, OutputRecord)>, SynthError> {
    match &tree.node(node).kind {
        ConstructKind::Output(output) => {
            synthesize_output_record(tree, node, output).map(|r| Some((tree.logical_id(node), r)))
        }
        _ => Ok(None),
    }
}

fn synthesize_resource(
    tree: &ConstructTree,
    node: NodeId,
    resource: &CfnResource,
) -> Result<ResourceRecord, SynthError> {
    let path = tree.path(node);
    let mut resolver = Resolver::new(tree);

    let mut resolved: IndexMap<String, Value> = IndexMap::new();
    for (name, value) in &resource.properties {
        let value = resolver.resolve(value)?;
        if !value.is_null() {
            resolved.insert(name.clone(), value);
        }
    }

    let properties = match resource.kind.schema() {
        Some(schema) => {
            let mut ordered = IndexMap::with_capacity(resolved.len());
            for spec in schema {
                match resolved.shift_remove(spec.name) {
                    Some(value) => {
                        ordered.insert(spec.name.to_string(), value);
                    }
                    None if spec.required => {
                        return Err(SynthError::MissingRequiredProperty {
                            path: path.to_string(),
                            property: spec.name.to_string(),
                        });
                    }
                    None => {}
                }
            }
            if let Some(name) = resolved.keys().next() {
                return Err(SynthError::UnrecognizedOption {
                    path: path.to_string(),
                    option: name.clone(),
                });
            }
            ordered
        }
        None => resolved,
    };

    let mut depends_on: Vec<String> = resource
        .depends_on
        .iter()
        .map(|dep| tree.logical_id(*dep))
        .collect();
    depends_on.sort();
    depends_on.dedup();

    Ok(ResourceRecord {
        logical_id: tree.logical_id(node),
        resource_type: resource.kind.type_tag().to_string(),
        properties,
        depends_on,
        update_replace_policy: resource.removal_policy,
        deletion_policy: resource.removal_policy,
        metadata: RecordMetadata {
            path: path.to_string(),
        },
    })
}

fn synthesize_output_record(
    tree: &ConstructTree,
    node: NodeId,
    output: &CfnOutput,
) -> Result<OutputRecord, SynthError> {
    let value = Resolver::new(tree).resolve(&output.value)?;
    if value.is_null() {
        return Err(SynthError::MissingRequiredProperty {
            path: tree.path(node).to_string(),
            property: "Value".to_string(),
        });
    }
    Ok(OutputRecord {
        description: output.description.clone(),
        value,
        export: output
            .export_name
            .as_ref()
            .map(|name| OutputExport { name: name.clone() }),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::schema::ResourceKind;
    use crate::core::types::RemovalPolicy;

    fn group(tree: &mut ConstructTree, resource: CfnResource) -> NodeId {
        let root = tree.root();
        tree.create(root, "Group", ConstructKind::Resource(resource))
            .unwrap()
    }

    #[test]
    fn test_synth_orders_by_schema() {
        let mut tree = ConstructTree::new("Stack");
        let node = group(
            &mut tree,
            CfnResource::new(ResourceKind::RedshiftClusterSubnetGroup)
                .prop("SubnetIds", Value::List(vec![Value::from("a")]))
                .prop("Description", "MyGroup"),
        );
        let record = synthesize(&tree, node).unwrap().unwrap();
        let keys: Vec<_> = record.properties.keys().cloned().collect();
        assert_eq!(keys, vec!["Description", "SubnetIds"]);
        assert_eq!(record.resource_type, "AWS::Redshift::ClusterSubnetGroup");
        assert_eq!(record.logical_id, "Group");
        assert_eq!(record.path(), "Stack/Group");
    }

    #[test]
    fn test_synth_missing_required() {
        let mut tree = ConstructTree::new("Stack");
        let node = group(
            &mut tree,
            CfnResource::new(ResourceKind::RedshiftClusterSubnetGroup).prop("Description", "x"),
        );
        assert_eq!(
            synthesize(&tree, node).unwrap_err(),
            SynthError::MissingRequiredProperty {
                path: "Stack/Group".to_string(),
                property: "SubnetIds".to_string()
            }
        );
    }

    #[test]
    fn test_synth_required_resolving_to_null_is_missing() {
        let mut tree = ConstructTree::new("Stack");
        let empty = tree.defer("SubnetIds", || Ok(Value::Null));
        let node = group(
            &mut tree,
            CfnResource::new(ResourceKind::RedshiftClusterSubnetGroup)
                .prop("Description", "x")
                .prop("SubnetIds", empty),
        );
        assert!(matches!(
            synthesize(&tree, node),
            Err(SynthError::MissingRequiredProperty { ref property, .. }) if property == "SubnetIds"
        ));
    }

    #[test]
    fn test_synth_drops_nulls_and_resolves_refs() {
        let mut tree = ConstructTree::new("Stack");
        let other = tree
            .create(
                tree.root(),
                "Cluster",
                ConstructKind::Resource(CfnResource::new(ResourceKind::EcsCluster)),
            )
            .unwrap();
        let root = tree.root();
        let svc = tree
            .create(
                root,
                "Service",
                ConstructKind::Resource(
                    CfnResource::new(ResourceKind::EcsService)
                        .prop("TaskDefinition", "arn:task")
                        .prop("Cluster", Value::NodeRef(other))
                        .prop("DesiredCount", Value::Null),
                ),
            )
            .unwrap();
        tree.add_dependency(svc, other).unwrap();
        let record = synthesize(&tree, svc).unwrap().unwrap();
        assert_eq!(record.properties["Cluster"], Value::Ref("Cluster".into()));
        assert!(!record.properties.contains_key("DesiredCount"));
        assert_eq!(record.depends_on, vec!["Cluster"]);
    }

    #[test]
    fn test_synth_removal_policy() {
        let mut tree = ConstructTree::new("Stack");
        let node = group(
            &mut tree,
            CfnResource::new(ResourceKind::EcsCluster).removal_policy(RemovalPolicy::Retain),
        );
        let record = synthesize(&tree, node).unwrap().unwrap();
        assert_eq!(record.deletion_policy, Some(RemovalPolicy::Retain));
        assert_eq!(record.update_replace_policy, Some(RemovalPolicy::Retain));
    }

    #[test]
    fn test_synth_custom_type_keeps_insertion_order() {
        let mut tree = ConstructTree::new("Stack");
        let node = group(
            &mut tree,
            CfnResource::new(ResourceKind::Custom("AWS::SNS::Topic".into()))
                .prop("Zeta", 1i64)
                .prop("Alpha", 2i64),
        );
        let record = synthesize(&tree, node).unwrap().unwrap();
        let keys: Vec<_> = record.properties.keys().cloned().collect();
        assert_eq!(keys, vec!["Zeta", "Alpha"]);
    }

    #[test]
    fn test_synth_non_resource_is_none() {
        let mut tree = ConstructTree::new("Stack");
        let scope = tree.create(tree.root(), "Scope", ConstructKind::Scope).unwrap();
        assert!(synthesize(&tree, scope).unwrap().is_none());
        assert!(synthesize_output(&tree, scope).unwrap().is_none());
    }

    #[test]
    fn test_synth_is_deterministic() {
        let mut tree = ConstructTree::new("Stack");
        let node = group(
            &mut tree,
            CfnResource::new(ResourceKind::RedshiftClusterSubnetGroup)
                .prop("Description", "d")
                .prop("SubnetIds", Value::List(vec![Value::from("s")])),
        );
        let a = serde_json::to_string(&synthesize(&tree, node).unwrap()).unwrap();
        let b = serde_json::to_string(&synthesize(&tree, node).unwrap()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_synth_output() {
        let mut tree = ConstructTree::new("Stack");
        let node = tree
            .create(
                tree.root(),
                "LoadBalancerDNS",
                ConstructKind::Output(CfnOutput {
                    value: Value::from("lb.example.com"),
                    description: Some("dns".into()),
                    export_name: Some("LbDns".into()),
                }),
            )
            .unwrap();
        let (name, record) = synthesize_output(&tree, node).unwrap().unwrap();
        assert_eq!(name, "LoadBalancerDNS");
        assert_eq!(record.value, Value::from("lb.example.com"));
        assert_eq!(record.export.unwrap().name, "LbDns");
    }

    #[test]
    fn test_synth_output_requires_value() {
        let mut tree = ConstructTree::new("Stack");
        let node = tree
            .create(
                tree.root(),
                "Empty",
                ConstructKind::Output(CfnOutput {
                    value: Value::Null,
                    description: None,
                    export_name: None,
                }),
            )
            .unwrap();
        assert!(matches!(
            synthesize_output(&tree, node),
            Err(SynthError::MissingRequiredProperty { .. })
        ));
    }
}
