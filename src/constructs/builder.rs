//! Build a construct tree from a stack manifest.
//!
//! Constructs are created in manifest order under the stack root. Each
//! built handle is kept by id so later entries can point at it; inside raw
//! resource properties and outputs, `{"Ref": id}` and `{"Fn::GetAtt": [id, attr]}`
//! naming a construct are rewritten to reference its primary resource.

use indexmap::IndexMap;

use super::ecs::{
    Cluster, ClusterProps, ContainerDefinitionOptions, CpuUtilizationScalingProps, EcsTarget,
    FargateService, FargateServiceProps, FargateTaskDefinition, FargateTaskDefinitionProps,
    ScalingCapacity,
};
use super::elb::{NetworkListener, NetworkListenerProps, NetworkLoadBalancer, NetworkLoadBalancerProps};
use super::output::{add_output, OutputProps};
use super::subnet_group::{ClusterSubnetGroup, ClusterSubnetGroupProps};
use super::vpc::{Vpc, VpcProps};
use crate::core::manifest::{
    ConstructSpec, LoadBalancerSpec, OutputSpec, RawResourceSpec, ServiceSpec, StackManifest,
    TaskDefinitionSpec, VpcSpec,
};
use crate::core::parser::validate_manifest;
use crate::core::schema::ResourceKind;
use crate::core::tree::{CfnResource, ConstructKind, ConstructTree, NodeId};
use crate::core::types::Value;
use crate::core::SynthError;

/// Id of the target-tracking policy created for `auto_scaling.cpu_target_percent`.
const CPU_SCALING_ID: &str = "CpuScaling";

/// A construct built from one manifest entry.
#[derive(Debug, Clone)]
enum Built {
    Vpc(Vpc),
    SubnetGroup(ClusterSubnetGroup),
    Cluster(Cluster),
    TaskDefinition(FargateTaskDefinition),
    Service(FargateService),
    LoadBalancer(NetworkLoadBalancer, IndexMap<String, NetworkListener>),
    Resource(NodeId),
    Output,
}

impl Built {
    /// The resource a `Ref` to this construct resolves to.
    fn primary(&self) -> Option<NodeId> {
        match self {
            Self::Vpc(v) => Some(v.resource()),
            Self::SubnetGroup(g) => g.resource(),
            Self::Cluster(c) => Some(c.resource()),
            Self::TaskDefinition(t) => Some(t.resource()),
            Self::Service(s) => Some(s.resource()),
            Self::LoadBalancer(lb, _) => Some(lb.resource()),
            Self::Resource(node) => Some(*node),
            Self::Output => None,
        }
    }
}

struct Registry {
    stack: String,
    built: IndexMap<String, Built>,
}

impl Registry {
    fn get(&self, id: &str) -> Result<&Built, SynthError> {
        self.built
            .get(id)
            .ok_or_else(|| SynthError::Manifest(format!("construct '{}' is not defined", id)))
    }

    fn wrong_kind(&self, id: &str, expected: &str) -> SynthError {
        SynthError::Manifest(format!("construct '{}/{}' is not a {}", self.stack, id, expected))
    }

    fn vpc(&self, id: &str) -> Result<Vpc, SynthError> {
        match self.get(id)? {
            Built::Vpc(v) => Ok(v.clone()),
            _ => Err(self.wrong_kind(id, "vpc")),
        }
    }

    fn cluster(&self, id: &str) -> Result<Cluster, SynthError> {
        match self.get(id)? {
            Built::Cluster(c) => Ok(c.clone()),
            _ => Err(self.wrong_kind(id, "ecs_cluster")),
        }
    }

    fn task_definition(&self, id: &str) -> Result<FargateTaskDefinition, SynthError> {
        match self.get(id)? {
            Built::TaskDefinition(t) => Ok(t.clone()),
            _ => Err(self.wrong_kind(id, "fargate_task_definition")),
        }
    }

    fn listener(&self, lb: &str, listener: &str) -> Result<NetworkListener, SynthError> {
        match self.get(lb)? {
            Built::LoadBalancer(_, listeners) => listeners.get(listener).cloned().ok_or_else(|| {
                SynthError::Manifest(format!(
                    "load balancer '{}/{}' has no listener '{}'",
                    self.stack, lb, listener
                ))
            }),
            _ => Err(self.wrong_kind(lb, "network_load_balancer")),
        }
    }

    fn primary(&self, id: &str, referrer: &str) -> Result<NodeId, SynthError> {
        self.get(id)?.primary().ok_or_else(|| {
            SynthError::invalid(referrer, format!("construct '{}' cannot be referenced", id))
        })
    }

    /// Rewrite `Ref`/`GetAtt` naming a manifest construct into node references.
    fn remap(&self, value: Value, referrer: &str) -> Result<Value, SynthError> {
        Ok(match value {
            Value::Ref(id) if self.built.contains_key(&id) => {
                Value::NodeRef(self.primary(&id, referrer)?)
            }
            Value::GetAtt(id, attr) if self.built.contains_key(&id) => {
                Value::NodeAtt(self.primary(&id, referrer)?, attr)
            }
            Value::List(items) => Value::List(
                items
                    .into_iter()
                    .map(|v| self.remap(v, referrer))
                    .collect::<Result<_, _>>()?,
            ),
            Value::Map(entries) => Value::Map(
                entries
                    .into_iter()
                    .map(|(k, v)| Ok((k, self.remap(v, referrer)?)))
                    .collect::<Result<_, SynthError>>()?,
            ),
            Value::Intrinsic(name, args) => {
                Value::Intrinsic(name, Box::new(self.remap(*args, referrer)?))
            }
            other => other,
        })
    }
}

/// Validate `manifest` and build its construct tree.
pub fn build_tree(manifest: &StackManifest) -> Result<ConstructTree, SynthError> {
    let errors = validate_manifest(manifest);
    if !errors.is_empty() {
        let messages: Vec<String> = errors.iter().map(ToString::to_string).collect();
        return Err(SynthError::Manifest(messages.join("; ")));
    }

    let mut tree = ConstructTree::new(&manifest.stack);
    let mut registry = Registry {
        stack: manifest.stack.clone(),
        built: IndexMap::new(),
    };
    for (id, spec) in &manifest.constructs {
        let built = build_one(&mut tree, &registry, id, spec)?;
        tracing::debug!(construct = %id, kind = spec.kind(), "built construct");
        registry.built.insert(id.clone(), built);
    }
    tracing::info!(
        stack = %manifest.stack,
        constructs = manifest.constructs.len(),
        nodes = tree.len(),
        "construct tree built"
    );
    Ok(tree)
}

fn build_one(
    tree: &mut ConstructTree,
    registry: &Registry,
    id: &str,
    spec: &ConstructSpec,
) -> Result<Built, SynthError> {
    let root = tree.root();
    match spec {
        ConstructSpec::Vpc(s) => Vpc::new(tree, root, id, vpc_props(s)).map(Built::Vpc),
        ConstructSpec::ClusterSubnetGroup(s) => ClusterSubnetGroup::new(
            tree,
            root,
            id,
            ClusterSubnetGroupProps {
                description: s.description.clone(),
                vpc: registry.vpc(&s.vpc)?,
                vpc_subnets: s.vpc_subnets.clone(),
                removal_policy: s.removal_policy,
            },
        )
        .map(Built::SubnetGroup),
        ConstructSpec::EcsCluster(s) => Cluster::new(
            tree,
            root,
            id,
            ClusterProps {
                vpc: registry.vpc(&s.vpc)?,
                cluster_name: s.cluster_name.clone(),
            },
        )
        .map(Built::Cluster),
        ConstructSpec::FargateTaskDefinition(s) => {
            build_task_definition(tree, id, s).map(Built::TaskDefinition)
        }
        ConstructSpec::NetworkLoadBalancer(s) => build_load_balancer(tree, registry, id, s),
        ConstructSpec::FargateService(s) => {
            build_service(tree, registry, id, s).map(Built::Service)
        }
        ConstructSpec::Resource(s) => build_resource(tree, registry, id, s).map(Built::Resource),
        ConstructSpec::Output(s) => build_output(tree, registry, id, s).map(|_| Built::Output),
    }
}

fn vpc_props(spec: &VpcSpec) -> VpcProps {
    let defaults = VpcProps::default();
    VpcProps {
        cidr: spec.cidr.clone().unwrap_or(defaults.cidr),
        max_azs: spec.max_azs.unwrap_or(defaults.max_azs),
        nat_gateways: spec.nat_gateways,
        subnet_configuration: spec
            .subnet_configuration
            .clone()
            .unwrap_or(defaults.subnet_configuration),
    }
}

fn build_task_definition(
    tree: &mut ConstructTree,
    id: &str,
    spec: &TaskDefinitionSpec,
) -> Result<FargateTaskDefinition, SynthError> {
    let root = tree.root();
    let defaults = FargateTaskDefinitionProps::default();
    let task = FargateTaskDefinition::new(
        tree,
        root,
        id,
        FargateTaskDefinitionProps {
            cpu: spec.cpu.unwrap_or(defaults.cpu),
            memory_limit_mib: spec.memory_limit_mib.unwrap_or(defaults.memory_limit_mib),
            family: spec.family.clone(),
        },
    )?;
    for (name, container) in &spec.containers {
        task.add_container(
            name,
            ContainerDefinitionOptions {
                image: container.image.clone(),
                memory_limit_mib: container.memory_limit_mib,
                essential: container.essential,
                environment: container.environment.clone(),
                port_mappings: container.port_mappings.clone(),
            },
        )?;
    }
    Ok(task)
}

fn build_load_balancer(
    tree: &mut ConstructTree,
    registry: &Registry,
    id: &str,
    spec: &LoadBalancerSpec,
) -> Result<Built, SynthError> {
    let root = tree.root();
    let lb = NetworkLoadBalancer::new(
        tree,
        root,
        id,
        NetworkLoadBalancerProps {
            vpc: registry.vpc(&spec.vpc)?,
            internet_facing: spec.internet_facing,
            vpc_subnets: None,
        },
    )?;
    let mut listeners = IndexMap::new();
    for (name, listener) in &spec.listeners {
        let handle = lb.add_listener(
            tree,
            name,
            NetworkListenerProps {
                port: listener.port,
                protocol: listener.protocol,
            },
        )?;
        listeners.insert(name.clone(), handle);
    }
    Ok(Built::LoadBalancer(lb, listeners))
}

fn build_service(
    tree: &mut ConstructTree,
    registry: &Registry,
    id: &str,
    spec: &ServiceSpec,
) -> Result<FargateService, SynthError> {
    let root = tree.root();
    let mut props = FargateServiceProps::new(
        registry.cluster(&spec.cluster)?,
        registry.task_definition(&spec.task_definition)?,
    );
    props.desired_count = spec.desired_count;
    props.assign_public_ip = spec.assign_public_ip;
    props.vpc_subnets = spec.vpc_subnets.clone();
    if let Some(min) = spec.min_healthy_percent {
        props.min_healthy_percent = min;
    }
    if let Some(max) = spec.max_healthy_percent {
        props.max_healthy_percent = max;
    }
    let service = FargateService::new(tree, root, id, props)?;

    if let Some(scaling) = &spec.auto_scaling {
        let count = service.auto_scale_task_count(
            tree,
            ScalingCapacity {
                min_capacity: scaling.min_capacity,
                max_capacity: scaling.max_capacity,
            },
        )?;
        if let Some(percent) = scaling.cpu_target_percent {
            count.scale_on_cpu_utilization(
                tree,
                CPU_SCALING_ID,
                CpuUtilizationScalingProps {
                    target_utilization_percent: percent,
                    scale_in_cooldown_sec: scaling.scale_in_cooldown_sec,
                    scale_out_cooldown_sec: scaling.scale_out_cooldown_sec,
                },
            )?;
        }
    }

    let targets = spec
        .load_balancer_targets
        .iter()
        .map(|t| {
            Ok(EcsTarget {
                container_name: t.container_name.clone(),
                container_port: t.container_port,
                new_target_group_id: t.target_group_id.clone(),
                listener: registry.listener(&t.load_balancer, &t.listener)?,
                port: t.port,
            })
        })
        .collect::<Result<Vec<_>, SynthError>>()?;
    if !targets.is_empty() {
        service.register_load_balancer_targets(tree, &targets)?;
    }
    Ok(service)
}

fn build_resource(
    tree: &mut ConstructTree,
    registry: &Registry,
    id: &str,
    spec: &RawResourceSpec,
) -> Result<NodeId, SynthError> {
    let root = tree.root();
    let path = format!("{}/{}", tree.path(root), id);
    let mut resource = CfnResource::new(ResourceKind::from_type_tag(&spec.resource_type));
    for (name, value) in &spec.properties {
        let value = registry.remap(Value::from(value.clone()), &path)?;
        resource.properties.insert(name.clone(), value);
    }
    resource.removal_policy = spec.removal_policy;
    let node = tree.create(root, id, ConstructKind::Resource(resource))?;
    for dependency in &spec.depends_on {
        let target = registry.primary(dependency, &path)?;
        tree.add_dependency(node, target)?;
    }
    Ok(node)
}

fn build_output(
    tree: &mut ConstructTree,
    registry: &Registry,
    id: &str,
    spec: &OutputSpec,
) -> Result<NodeId, SynthError> {
    let root = tree.root();
    let path = format!("{}/{}", tree.path(root), id);
    let value = registry.remap(Value::from(spec.value.clone()), &path)?;
    add_output(
        tree,
        root,
        id,
        OutputProps {
            value,
            description: spec.description.clone(),
            export_name: spec.export_name.clone(),
        },
    )
}
