//! ECS on Fargate: cluster, task definition, containers, service,
//! task-count autoscaling and load balancer registration.

use std::cell::RefCell;
use std::rc::Rc;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::elb::{AddNetworkTargetsProps, NetworkListener, TargetGroup, TargetType};
use super::vpc::{SubnetSelection, Vpc};
use crate::core::logical_id;
use crate::core::schema::ResourceKind;
use crate::core::tree::{CfnResource, ConstructKind, ConstructTree, NodeId};
use crate::core::types::{SubnetType, Value};
use crate::core::SynthError;

/// Valid Fargate memory sizes (MiB) per CPU unit setting.
fn fargate_memory_options(cpu: u32) -> Option<Vec<u32>> {
    let range = |lo: u32, hi: u32| (lo..=hi).step_by(1024).collect::<Vec<_>>();
    match cpu {
        256 => Some(vec![512, 1024, 2048]),
        512 => Some(range(1024, 4096)),
        1024 => Some(range(2048, 8192)),
        2048 => Some(range(4096, 16384)),
        4096 => Some(range(8192, 30720)),
        _ => None,
    }
}

// ============================================================================
// Cluster
// ============================================================================

#[derive(Debug, Clone)]
pub struct ClusterProps {
    pub vpc: Vpc,
    pub cluster_name: Option<String>,
}

/// Handle to an ECS cluster.
#[derive(Debug, Clone)]
pub struct Cluster {
    node: NodeId,
    resource: NodeId,
    vpc: Vpc,
}

impl Cluster {
    pub fn new(
        tree: &mut ConstructTree,
        scope: NodeId,
        id: &str,
        props: ClusterProps,
    ) -> Result<Self, SynthError> {
        let node = tree.create(scope, id, ConstructKind::Scope)?;
        let resource = tree.create(
            node,
            "Resource",
            ConstructKind::Resource(
                CfnResource::new(ResourceKind::EcsCluster).prop("ClusterName", props.cluster_name),
            ),
        )?;
        Ok(Self {
            node,
            resource,
            vpc: props.vpc,
        })
    }

    pub fn node(&self) -> NodeId {
        self.node
    }

    pub fn resource(&self) -> NodeId {
        self.resource
    }

    pub fn vpc(&self) -> &Vpc {
        &self.vpc
    }

    /// `Ref` of the cluster (its name).
    pub fn cluster_name(&self) -> Value {
        Value::NodeRef(self.resource)
    }
}

// ============================================================================
// Task definition and containers
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FargateTaskDefinitionProps {
    pub cpu: u32,
    pub memory_limit_mib: u32,
    pub family: Option<String>,
}

impl Default for FargateTaskDefinitionProps {
    fn default() -> Self {
        Self {
            cpu: 256,
            memory_limit_mib: 512,
            family: None,
        }
    }
}

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum PortProtocol {
    #[default]
    Tcp,
    Udp,
}

impl PortProtocol {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Tcp => "tcp",
            Self::Udp => "udp",
        }
    }
}

/// A container port exposed by a task. Under `awsvpc` the host port always
/// equals the container port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct PortMapping {
    pub container_port: u16,
    #[serde(default)]
    pub host_port: Option<u16>,
    #[serde(default)]
    pub protocol: PortProtocol,
}

impl PortMapping {
    pub fn tcp(container_port: u16) -> Self {
        Self {
            container_port,
            host_port: None,
            protocol: PortProtocol::Tcp,
        }
    }

    fn to_value(self) -> Value {
        Value::map([
            ("ContainerPort", Value::from(self.container_port)),
            ("HostPort", Value::from(self.container_port)),
            ("Protocol", Value::from(self.protocol.as_str())),
        ])
    }
}

/// Options of one container.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContainerDefinitionOptions {
    pub image: String,
    pub memory_limit_mib: Option<u32>,
    pub essential: Option<bool>,
    pub environment: IndexMap<String, String>,
    pub port_mappings: Vec<PortMapping>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct ContainerSpec {
    name: String,
    options: ContainerDefinitionOptions,
}

impl ContainerSpec {
    fn to_value(&self) -> Value {
        let mut entries: Vec<(&str, Value)> = Vec::new();
        if !self.options.environment.is_empty() {
            entries.push((
                "Environment",
                Value::List(
                    self.options
                        .environment
                        .iter()
                        .map(|(k, v)| {
                            Value::map([("Name", Value::from(k.as_str())), ("Value", Value::from(v.as_str()))])
                        })
                        .collect(),
                ),
            ));
        }
        entries.push(("Essential", Value::from(self.options.essential.unwrap_or(true))));
        entries.push(("Image", Value::from(self.options.image.as_str())));
        entries.push(("Memory", Value::from(self.options.memory_limit_mib)));
        entries.push(("Name", Value::from(self.name.as_str())));
        if !self.options.port_mappings.is_empty() {
            entries.push((
                "PortMappings",
                Value::List(
                    self.options
                        .port_mappings
                        .iter()
                        .map(|m| m.to_value())
                        .collect(),
                ),
            ));
        }
        Value::Map(
            entries
                .into_iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
        )
    }
}

#[derive(Debug)]
struct TaskDefinitionInner {
    node: NodeId,
    resource: NodeId,
    task_role: NodeId,
    path: String,
    containers: RefCell<Vec<ContainerSpec>>,
}

/// Handle to a Fargate task definition. Containers are collected until
/// synthesis.
#[derive(Debug, Clone)]
pub struct FargateTaskDefinition {
    inner: Rc<TaskDefinitionInner>,
}

impl FargateTaskDefinition {
    pub fn new(
        tree: &mut ConstructTree,
        scope: NodeId,
        id: &str,
        props: FargateTaskDefinitionProps,
    ) -> Result<Self, SynthError> {
        let path = format!("{}/{}", tree.path(scope), id);
        let memory = fargate_memory_options(props.cpu).ok_or_else(|| {
            SynthError::invalid(
                &path,
                format!("invalid Fargate cpu {}: expected 256, 512, 1024, 2048 or 4096", props.cpu),
            )
        })?;
        if !memory.contains(&props.memory_limit_mib) {
            return Err(SynthError::invalid(
                &path,
                format!(
                    "memory {} MiB is not valid with cpu {}",
                    props.memory_limit_mib, props.cpu
                ),
            ));
        }

        let node = tree.create(scope, id, ConstructKind::Scope)?;
        let role_scope = tree.create(node, "TaskRole", ConstructKind::Scope)?;
        let task_role = tree.create(
            role_scope,
            "Resource",
            ConstructKind::Resource(
                CfnResource::new(ResourceKind::IamRole)
                    .prop("AssumeRolePolicyDocument", assume_role_policy("ecs-tasks.amazonaws.com")),
            ),
        )?;

        let containers: RefCell<Vec<ContainerSpec>> = RefCell::default();
        let family = props.family.unwrap_or_else(|| {
            let relative = path.split_once('/').map(|(_, r)| r).unwrap_or(path.as_str());
            format!("{}{}", tree.stack_name(), logical_id::from_path(relative))
        });

        let resource = tree.create(
            node,
            "Resource",
            ConstructKind::Resource(
                CfnResource::new(ResourceKind::EcsTaskDefinition)
                    .prop("Cpu", props.cpu.to_string())
                    .prop("Family", family)
                    .prop("Memory", props.memory_limit_mib.to_string())
                    .prop("NetworkMode", "awsvpc")
                    .prop("RequiresCompatibilities", Value::List(vec![Value::from("FARGATE")]))
                    .prop("TaskRoleArn", Value::NodeAtt(task_role, "Arn".to_string())),
            ),
        )?;

        let task = Self {
            inner: Rc::new(TaskDefinitionInner {
                node,
                resource,
                task_role,
                path: tree.path(resource).to_string(),
                containers,
            }),
        };

        let handle = task.clone();
        let definitions = tree.defer("ContainerDefinitions", move || {
            let containers = handle.inner.containers.borrow();
            if containers.is_empty() {
                return Err(SynthError::MissingRequiredProperty {
                    path: handle.inner.path.clone(),
                    property: "ContainerDefinitions".to_string(),
                });
            }
            Ok(Value::List(containers.iter().map(ContainerSpec::to_value).collect()))
        });
        tree.set_property(resource, "ContainerDefinitions", definitions)?;
        Ok(task)
    }

    pub fn node(&self) -> NodeId {
        self.inner.node
    }

    pub fn resource(&self) -> NodeId {
        self.inner.resource
    }

    pub fn task_role(&self) -> NodeId {
        self.inner.task_role
    }

    pub fn task_definition_arn(&self) -> Value {
        Value::NodeRef(self.inner.resource)
    }

    /// Add a container. Names are unique within the task definition.
    pub fn add_container(
        &self,
        name: &str,
        options: ContainerDefinitionOptions,
    ) -> Result<ContainerDefinition, SynthError> {
        let mut containers = self.inner.containers.borrow_mut();
        if name.is_empty() {
            return Err(SynthError::invalid(&self.inner.path, "container name must not be empty"));
        }
        if options.image.is_empty() {
            return Err(SynthError::MissingRequiredProperty {
                path: format!("{}/{}", self.inner.path, name),
                property: "Image".to_string(),
            });
        }
        if containers.iter().any(|c| c.name == name) {
            return Err(SynthError::invalid(
                &self.inner.path,
                format!("container '{}' is already defined", name),
            ));
        }
        for mapping in &options.port_mappings {
            self.check_mapping(name, mapping)?;
        }
        containers.push(ContainerSpec {
            name: name.to_string(),
            options,
        });
        Ok(ContainerDefinition {
            task: self.clone(),
            name: name.to_string(),
        })
    }

    pub fn container_names(&self) -> Vec<String> {
        self.inner
            .containers
            .borrow()
            .iter()
            .map(|c| c.name.clone())
            .collect()
    }

    /// Port mappings of a container, if it exists.
    pub fn port_mappings(&self, container: &str) -> Option<Vec<PortMapping>> {
        self.inner
            .containers
            .borrow()
            .iter()
            .find(|c| c.name == container)
            .map(|c| c.options.port_mappings.clone())
    }

    fn check_mapping(&self, container: &str, mapping: &PortMapping) -> Result<(), SynthError> {
        if mapping.container_port == 0 {
            return Err(SynthError::invalid(
                &self.inner.path,
                format!("container '{}': port 0 is not a valid container port", container),
            ));
        }
        match mapping.host_port {
            Some(host) if host != mapping.container_port => Err(SynthError::invalid(
                &self.inner.path,
                format!(
                    "container '{}': host port {} must equal container port {} in awsvpc mode",
                    container, host, mapping.container_port
                ),
            )),
            _ => Ok(()),
        }
    }
}

/// Handle to one container of a task definition.
#[derive(Debug, Clone)]
pub struct ContainerDefinition {
    task: FargateTaskDefinition,
    name: String,
}

impl ContainerDefinition {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn add_port_mappings(&self, mappings: &[PortMapping]) -> Result<(), SynthError> {
        for mapping in mappings {
            self.task.check_mapping(&self.name, mapping)?;
        }
        let mut containers = self.task.inner.containers.borrow_mut();
        let spec = containers
            .iter_mut()
            .find(|c| c.name == self.name)
            .ok_or_else(|| {
                SynthError::invalid(&self.task.inner.path, format!("no container named '{}'", self.name))
            })?;
        spec.options.port_mappings.extend_from_slice(mappings);
        Ok(())
    }
}

// ============================================================================
// Service
// ============================================================================

#[derive(Debug, Clone)]
pub struct FargateServiceProps {
    pub cluster: Cluster,
    pub task_definition: FargateTaskDefinition,
    pub desired_count: Option<u32>,
    pub assign_public_ip: bool,
    /// Defaults to public subnets with a public IP, private otherwise.
    pub vpc_subnets: Option<SubnetSelection>,
    pub min_healthy_percent: u32,
    pub max_healthy_percent: u32,
}

impl FargateServiceProps {
    pub fn new(cluster: Cluster, task_definition: FargateTaskDefinition) -> Self {
        Self {
            cluster,
            task_definition,
            desired_count: None,
            assign_public_ip: false,
            vpc_subnets: None,
            min_healthy_percent: 50,
            max_healthy_percent: 200,
        }
    }
}

#[derive(Debug)]
struct ServiceInner {
    node: NodeId,
    resource: NodeId,
    security_group: NodeId,
    cluster: Cluster,
    task_definition: FargateTaskDefinition,
    load_balancers: RefCell<Vec<Value>>,
}

/// Handle to a Fargate service.
#[derive(Debug, Clone)]
pub struct FargateService {
    inner: Rc<ServiceInner>,
}

impl FargateService {
    pub fn new(
        tree: &mut ConstructTree,
        scope: NodeId,
        id: &str,
        props: FargateServiceProps,
    ) -> Result<Self, SynthError> {
        let path = format!("{}/{}", tree.path(scope), id);
        if props.min_healthy_percent > props.max_healthy_percent {
            return Err(SynthError::invalid(
                &path,
                "min_healthy_percent must not exceed max_healthy_percent",
            ));
        }
        let vpc = props.cluster.vpc().clone();
        let selection = props.vpc_subnets.clone().unwrap_or_else(|| {
            SubnetSelection::of_type(if props.assign_public_ip {
                SubnetType::Public
            } else {
                SubnetType::Private
            })
        });
        vpc.select_subnets(&selection)
            .map_err(|e| SynthError::invalid(&path, e.to_string()))?;

        let node = tree.create(scope, id, ConstructKind::Scope)?;
        let sg_scope = tree.create(node, "SecurityGroup", ConstructKind::Scope)?;
        let security_group = tree.create(
            sg_scope,
            "Resource",
            ConstructKind::Resource(
                CfnResource::new(ResourceKind::Ec2SecurityGroup)
                    .prop("GroupDescription", format!("{}/SecurityGroup", path))
                    .prop(
                        "SecurityGroupEgress",
                        Value::List(vec![Value::map([
                            ("CidrIp", Value::from("0.0.0.0/0")),
                            ("Description", Value::from("Allow all outbound traffic by default")),
                            ("IpProtocol", Value::from("-1")),
                        ])]),
                    )
                    .prop("VpcId", vpc.vpc_id()),
            ),
        )?;

        let subnets = vpc.subnet_ids_token(tree, selection);
        let load_balancers: RefCell<Vec<Value>> = RefCell::default();
        let resource = tree.create(
            node,
            "Service",
            ConstructKind::Resource(
                CfnResource::new(ResourceKind::EcsService)
                    .prop("Cluster", props.cluster.cluster_name())
                    .prop(
                        "DeploymentConfiguration",
                        Value::map([
                            ("MaximumPercent", Value::from(props.max_healthy_percent)),
                            ("MinimumHealthyPercent", Value::from(props.min_healthy_percent)),
                        ]),
                    )
                    .prop("DesiredCount", props.desired_count)
                    .prop("EnableECSManagedTags", false)
                    .prop("LaunchType", "FARGATE")
                    .prop(
                        "NetworkConfiguration",
                        Value::map([(
                            "AwsvpcConfiguration",
                            Value::map([
                                (
                                    "AssignPublicIp",
                                    Value::from(if props.assign_public_ip { "ENABLED" } else { "DISABLED" }),
                                ),
                                (
                                    "SecurityGroups",
                                    Value::List(vec![Value::NodeAtt(security_group, "GroupId".into())]),
                                ),
                                ("Subnets", subnets),
                            ]),
                        )]),
                    )
                    .prop("TaskDefinition", props.task_definition.task_definition_arn()),
            ),
        )?;

        let service = Self {
            inner: Rc::new(ServiceInner {
                node,
                resource,
                security_group,
                cluster: props.cluster,
                task_definition: props.task_definition,
                load_balancers,
            }),
        };

        let handle = service.clone();
        let lbs = tree.defer("LoadBalancers", move || {
            let lbs = handle.inner.load_balancers.borrow();
            Ok(if lbs.is_empty() {
                Value::Null
            } else {
                Value::List(lbs.clone())
            })
        });
        tree.set_property(resource, "LoadBalancers", lbs)?;
        Ok(service)
    }

    pub fn node(&self) -> NodeId {
        self.inner.node
    }

    /// The `AWS::ECS::Service` node.
    pub fn resource(&self) -> NodeId {
        self.inner.resource
    }

    pub fn security_group(&self) -> NodeId {
        self.inner.security_group
    }

    pub fn task_definition(&self) -> &FargateTaskDefinition {
        &self.inner.task_definition
    }

    /// Scalable target on the service's desired count.
    pub fn auto_scale_task_count(
        &self,
        tree: &mut ConstructTree,
        props: ScalingCapacity,
    ) -> Result<ScalableTaskCount, SynthError> {
        let path = format!("{}/TaskCount", tree.path(self.inner.node));
        if props.max_capacity == 0 {
            return Err(SynthError::invalid(&path, "max_capacity must be at least 1"));
        }
        if props.min_capacity > props.max_capacity {
            return Err(SynthError::invalid(
                &path,
                format!(
                    "min_capacity {} exceeds max_capacity {}",
                    props.min_capacity, props.max_capacity
                ),
            ));
        }

        let node = tree.create(self.inner.node, "TaskCount", ConstructKind::Scope)?;
        let resource_id = Value::join(
            "",
            vec![
                Value::from("service/"),
                self.inner.cluster.cluster_name(),
                Value::from("/"),
                Value::NodeAtt(self.inner.resource, "Name".into()),
            ],
        );
        let role_arn = Value::join(
            "",
            vec![
                Value::from("arn:"),
                Value::pseudo("AWS::Partition"),
                Value::from(":iam::"),
                Value::pseudo("AWS::AccountId"),
                Value::from(
                    ":role/aws-service-role/ecs.application-autoscaling.amazonaws.com/AWSServiceRoleForApplicationAutoScaling_ECSService",
                ),
            ],
        );
        let target = tree.create(
            node,
            "Target",
            ConstructKind::Resource(
                CfnResource::new(ResourceKind::ScalableTarget)
                    .prop("MaxCapacity", props.max_capacity)
                    .prop("MinCapacity", props.min_capacity)
                    .prop("ResourceId", resource_id)
                    .prop("RoleARN", role_arn)
                    .prop("ScalableDimension", "ecs:service:DesiredCount")
                    .prop("ServiceNamespace", "ecs"),
            ),
        )?;
        Ok(ScalableTaskCount { node, target })
    }

    /// Put a container port behind a new target group on a network listener.
    pub fn register_load_balancer_targets(
        &self,
        tree: &mut ConstructTree,
        targets: &[EcsTarget],
    ) -> Result<Vec<TargetGroup>, SynthError> {
        let service_path = tree.path(self.inner.resource).to_string();
        let mut groups = Vec::with_capacity(targets.len());
        for target in targets {
            let mappings = self
                .inner
                .task_definition
                .port_mappings(&target.container_name)
                .ok_or_else(|| {
                    SynthError::invalid(
                        &service_path,
                        format!("no container named '{}' in the task definition", target.container_name),
                    )
                })?;
            let mapping = mappings
                .iter()
                .find(|m| m.container_port == target.container_port)
                .ok_or_else(|| {
                    SynthError::invalid(
                        &service_path,
                        format!(
                            "container '{}' has no port mapping for port {}",
                            target.container_name, target.container_port
                        ),
                    )
                })?;

            let group = target.listener.add_targets(
                tree,
                &target.new_target_group_id,
                AddNetworkTargetsProps {
                    port: target.port,
                    protocol: None,
                    target_type: TargetType::Ip,
                },
            )?;
            self.inner.load_balancers.borrow_mut().push(Value::map([
                ("ContainerName", Value::from(target.container_name.as_str())),
                ("ContainerPort", Value::from(mapping.container_port)),
                ("TargetGroupArn", group.target_group_arn()),
            ]));
            tree.add_dependency(self.inner.resource, target.listener.resource())?;
            tracing::debug!(
                service = %service_path,
                container = %target.container_name,
                port = target.container_port,
                "registered load balancer target"
            );
            groups.push(group);
        }
        Ok(groups)
    }
}

/// One container port to register behind a listener.
#[derive(Debug, Clone)]
pub struct EcsTarget {
    pub container_name: String,
    pub container_port: u16,
    pub new_target_group_id: String,
    pub listener: NetworkListener,
    /// Target group port; defaults to the listener port.
    pub port: Option<u16>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScalingCapacity {
    pub min_capacity: u32,
    pub max_capacity: u32,
}

/// Options of a CPU target-tracking policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CpuUtilizationScalingProps {
    pub target_utilization_percent: u32,
    pub scale_in_cooldown_sec: Option<u32>,
    pub scale_out_cooldown_sec: Option<u32>,
}

/// Handle to a service's scalable task count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScalableTaskCount {
    node: NodeId,
    target: NodeId,
}

impl ScalableTaskCount {
    pub fn node(&self) -> NodeId {
        self.node
    }

    /// The `ScalableTarget` node.
    pub fn target(&self) -> NodeId {
        self.target
    }

    /// Track average CPU utilization of the service.
    pub fn scale_on_cpu_utilization(
        &self,
        tree: &mut ConstructTree,
        id: &str,
        props: CpuUtilizationScalingProps,
    ) -> Result<NodeId, SynthError> {
        if props.target_utilization_percent == 0 || props.target_utilization_percent > 100 {
            return Err(SynthError::invalid(
                format!("{}/{}", tree.path(self.node), id),
                format!(
                    "target_utilization_percent must be between 1 and 100, got {}",
                    props.target_utilization_percent
                ),
            ));
        }
        let mut config = vec![
            (
                "PredefinedMetricSpecification",
                Value::map([(
                    "PredefinedMetricType",
                    Value::from("ECSServiceAverageCPUUtilization"),
                )]),
            ),
            ("ScaleInCooldown", Value::from(props.scale_in_cooldown_sec)),
            ("ScaleOutCooldown", Value::from(props.scale_out_cooldown_sec)),
            ("TargetValue", Value::from(props.target_utilization_percent)),
        ];
        config.retain(|(_, v)| !v.is_null());

        let policy = tree.create(
            self.node,
            id,
            ConstructKind::Resource(
                CfnResource::new(ResourceKind::ScalingPolicy)
                    .prop("PolicyType", "TargetTrackingScaling")
                    .prop("ScalingTargetId", Value::NodeRef(self.target))
                    .prop("TargetTrackingScalingPolicyConfiguration", Value::map(config)),
            ),
        )?;
        let name = tree.logical_id(policy);
        tree.set_property(policy, "PolicyName", name)?;
        Ok(policy)
    }
}

/// Trust policy letting a service principal assume a role.
fn assume_role_policy(principal: &str) -> Value {
    Value::map([
        (
            "Statement",
            Value::List(vec![Value::map([
                ("Action", Value::from("sts:AssumeRole")),
                ("Effect", Value::from("Allow")),
                ("Principal", Value::map([("Service", Value::from(principal))])),
            ])]),
        ),
        ("Version", Value::from("2012-10-17")),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constructs::elb::{NetworkListenerProps, NetworkLoadBalancer, NetworkLoadBalancerProps};
    use crate::constructs::vpc::VpcProps;
    use crate::core::assembler::assemble;

    struct Fixture {
        tree: ConstructTree,
        cluster: Cluster,
        task: FargateTaskDefinition,
    }

    fn fixture() -> Fixture {
        let mut tree = ConstructTree::new("Stack");
        let root = tree.root();
        let vpc = Vpc::new(&mut tree, root, "VPC", VpcProps::default()).unwrap();
        let cluster = Cluster::new(
            &mut tree,
            root,
            "Cluster",
            ClusterProps {
                vpc,
                cluster_name: None,
            },
        )
        .unwrap();
        let task = FargateTaskDefinition::new(
            &mut tree,
            root,
            "TaskDef",
            FargateTaskDefinitionProps::default(),
        )
        .unwrap();
        Fixture {
            tree,
            cluster,
            task,
        }
    }

    fn web_container(task: &FargateTaskDefinition) -> ContainerDefinition {
        task.add_container(
            "web",
            ContainerDefinitionOptions {
                image: "amazon/amazon-ecs-sample".to_string(),
                ..ContainerDefinitionOptions::default()
            },
        )
        .unwrap()
    }

    #[test]
    fn test_ecs_fargate_memory_validation() {
        let mut tree = ConstructTree::new("Stack");
        let root = tree.root();
        let err = FargateTaskDefinition::new(
            &mut tree,
            root,
            "TaskDef",
            FargateTaskDefinitionProps {
                cpu: 256,
                memory_limit_mib: 4096,
                family: None,
            },
        )
        .unwrap_err();
        assert!(err.to_string().contains("not valid with cpu 256"));
        assert!(FargateTaskDefinition::new(
            &mut tree,
            root,
            "Odd",
            FargateTaskDefinitionProps {
                cpu: 300,
                ..FargateTaskDefinitionProps::default()
            },
        )
        .is_err());
        // Nothing was attached
        assert!(tree.children(root).is_empty());
        assert_eq!(fargate_memory_options(1024).unwrap().len(), 7);
    }

    #[test]
    fn test_ecs_task_definition_without_containers_fails() {
        let f = fixture();
        assert!(matches!(
            assemble(&f.tree),
            Err(SynthError::MissingRequiredProperty { ref property, .. }) if property == "ContainerDefinitions"
        ));
    }

    #[test]
    fn test_ecs_task_definition_record() {
        let f = fixture();
        let web = web_container(&f.task);
        web.add_port_mappings(&[PortMapping::tcp(80)]).unwrap();
        let template = assemble(&f.tree).unwrap();
        let record = &template.resources[&f.tree.logical_id(f.task.resource())];
        assert_eq!(record.properties["Cpu"], Value::from("256"));
        assert_eq!(record.properties["Memory"], Value::from("512"));
        assert_eq!(record.properties["NetworkMode"], Value::from("awsvpc"));
        assert_eq!(record.properties["Family"], Value::from("StackTaskDef"));
        assert_eq!(
            record.properties["ContainerDefinitions"],
            Value::List(vec![Value::map([
                ("Essential", Value::Bool(true)),
                ("Image", Value::from("amazon/amazon-ecs-sample")),
                ("Name", Value::from("web")),
                (
                    "PortMappings",
                    Value::List(vec![Value::map([
                        ("ContainerPort", Value::Int(80)),
                        ("HostPort", Value::Int(80)),
                        ("Protocol", Value::from("tcp")),
                    ])]),
                ),
            ])])
        );
        assert_eq!(
            record.properties["TaskRoleArn"],
            Value::GetAtt(f.tree.logical_id(f.task.task_role()), "Arn".into())
        );
    }

    #[test]
    fn test_ecs_container_validation() {
        let f = fixture();
        web_container(&f.task);
        let dup = f.task.add_container(
            "web",
            ContainerDefinitionOptions {
                image: "x".into(),
                ..ContainerDefinitionOptions::default()
            },
        );
        assert!(dup.is_err());
        let no_image = f.task.add_container("sidecar", ContainerDefinitionOptions::default());
        assert!(matches!(
            no_image,
            Err(SynthError::MissingRequiredProperty { ref property, .. }) if property == "Image"
        ));
        let web = ContainerDefinition {
            task: f.task.clone(),
            name: "web".into(),
        };
        let bad = PortMapping {
            container_port: 80,
            host_port: Some(8080),
            protocol: PortProtocol::Tcp,
        };
        assert!(web.add_port_mappings(&[bad]).is_err());
        assert_eq!(f.task.port_mappings("web"), Some(vec![]));
    }

    #[test]
    fn test_ecs_service_network_configuration() {
        let mut f = fixture();
        web_container(&f.task);
        let root = f.tree.root();
        let service = FargateService::new(
            &mut f.tree,
            root,
            "Service",
            FargateServiceProps::new(f.cluster.clone(), f.task.clone()),
        )
        .unwrap();
        let template = assemble(&f.tree).unwrap();
        let record = &template.resources[&f.tree.logical_id(service.resource())];
        assert_eq!(record.resource_type, "AWS::ECS::Service");
        assert!(!record.properties.contains_key("LoadBalancers"));
        assert!(!record.properties.contains_key("DesiredCount"));

        let network = record.properties["NetworkConfiguration"].to_json().unwrap();
        let config = &network["AwsvpcConfiguration"];
        assert_eq!(config["AssignPublicIp"], "DISABLED");
        let private: Vec<_> = f
            .cluster
            .vpc()
            .private_subnets()
            .iter()
            .map(|s| serde_json::json!({"Ref": f.tree.logical_id(s.subnet)}))
            .collect();
        assert_eq!(config["Subnets"], serde_json::Value::Array(private));
        assert_eq!(
            config["SecurityGroups"][0]["Fn::GetAtt"][1],
            "GroupId"
        );
    }

    #[test]
    fn test_ecs_auto_scaling() {
        let mut f = fixture();
        web_container(&f.task);
        let root = f.tree.root();
        let service = FargateService::new(
            &mut f.tree,
            root,
            "Service",
            FargateServiceProps::new(f.cluster.clone(), f.task.clone()),
        )
        .unwrap();
        let scaling = service
            .auto_scale_task_count(
                &mut f.tree,
                ScalingCapacity {
                    min_capacity: 1,
                    max_capacity: 20,
                },
            )
            .unwrap();
        let policy = scaling
            .scale_on_cpu_utilization(
                &mut f.tree,
                "CpuScaling",
                CpuUtilizationScalingProps {
                    target_utilization_percent: 10,
                    scale_in_cooldown_sec: Some(60),
                    scale_out_cooldown_sec: Some(60),
                },
            )
            .unwrap();

        let template = assemble(&f.tree).unwrap();
        let target = &template.resources[&f.tree.logical_id(scaling.target())];
        assert_eq!(target.properties["MaxCapacity"], Value::Int(20));
        assert_eq!(target.properties["MinCapacity"], Value::Int(1));
        assert_eq!(
            target.properties["ScalableDimension"],
            Value::from("ecs:service:DesiredCount")
        );

        let policy_id = f.tree.logical_id(policy);
        let record = &template.resources[&policy_id];
        assert_eq!(record.properties["PolicyName"], Value::String(policy_id.clone()));
        let config = record.properties["TargetTrackingScalingPolicyConfiguration"]
            .to_json()
            .unwrap();
        assert_eq!(config["TargetValue"], 10);
        assert_eq!(config["ScaleInCooldown"], 60);

        // A second scalable target on the same service is a duplicate path
        assert!(matches!(
            service.auto_scale_task_count(
                &mut f.tree,
                ScalingCapacity {
                    min_capacity: 1,
                    max_capacity: 2
                }
            ),
            Err(SynthError::DuplicatePath { .. })
        ));
    }

    #[test]
    fn test_ecs_scaling_validation() {
        let mut f = fixture();
        web_container(&f.task);
        let root = f.tree.root();
        let service = FargateService::new(
            &mut f.tree,
            root,
            "Service",
            FargateServiceProps::new(f.cluster.clone(), f.task.clone()),
        )
        .unwrap();
        assert!(service
            .auto_scale_task_count(
                &mut f.tree,
                ScalingCapacity {
                    min_capacity: 5,
                    max_capacity: 2
                }
            )
            .is_err());
        let scaling = service
            .auto_scale_task_count(
                &mut f.tree,
                ScalingCapacity {
                    min_capacity: 1,
                    max_capacity: 2,
                },
            )
            .unwrap();
        assert!(scaling
            .scale_on_cpu_utilization(
                &mut f.tree,
                "Cpu",
                CpuUtilizationScalingProps {
                    target_utilization_percent: 0,
                    scale_in_cooldown_sec: None,
                    scale_out_cooldown_sec: None,
                },
            )
            .is_err());
    }

    #[test]
    fn test_ecs_register_load_balancer_targets() {
        let mut f = fixture();
        let web = web_container(&f.task);
        web.add_port_mappings(&[PortMapping::tcp(80)]).unwrap();
        let root = f.tree.root();
        let service = FargateService::new(
            &mut f.tree,
            root,
            "Service",
            FargateServiceProps::new(f.cluster.clone(), f.task.clone()),
        )
        .unwrap();
        let lb = NetworkLoadBalancer::new(
            &mut f.tree,
            root,
            "LB",
            NetworkLoadBalancerProps {
                vpc: f.cluster.vpc().clone(),
                internet_facing: true,
                vpc_subnets: None,
            },
        )
        .unwrap();
        let listener = lb
            .add_listener(&mut f.tree, "PublicListener", NetworkListenerProps::default())
            .unwrap();

        let missing_port = service.register_load_balancer_targets(
            &mut f.tree,
            &[EcsTarget {
                container_name: "web".into(),
                container_port: 8080,
                new_target_group_id: "ECS".into(),
                listener: listener.clone(),
                port: None,
            }],
        );
        assert!(missing_port.is_err());
        let missing_container = service.register_load_balancer_targets(
            &mut f.tree,
            &[EcsTarget {
                container_name: "api".into(),
                container_port: 80,
                new_target_group_id: "ECS".into(),
                listener: listener.clone(),
                port: None,
            }],
        );
        assert!(missing_container.is_err());

        let groups = service
            .register_load_balancer_targets(
                &mut f.tree,
                &[EcsTarget {
                    container_name: "web".into(),
                    container_port: 80,
                    new_target_group_id: "ECS".into(),
                    listener: listener.clone(),
                    port: None,
                }],
            )
            .unwrap();

        let template = assemble(&f.tree).unwrap();
        let record = &template.resources[&f.tree.logical_id(service.resource())];
        assert_eq!(
            record.properties["LoadBalancers"],
            Value::List(vec![Value::map([
                ("ContainerName", Value::from("web")),
                ("ContainerPort", Value::Int(80)),
                ("TargetGroupArn", Value::Ref(f.tree.logical_id(groups[0].resource()))),
            ])])
        );
        assert_eq!(
            record.depends_on,
            vec![f.tree.logical_id(listener.resource())]
        );
    }
}
