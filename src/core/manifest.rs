//! Stack manifest types (`stack.yaml`).
//!
//! Constructs are keyed by id and declared in dependency order; fields that
//! point at other constructs (`vpc`, `cluster`, `load_balancer`...) hold the
//! referenced construct's id.

use indexmap::IndexMap;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::types::RemovalPolicy;
use crate::constructs::ecs::PortMapping;
use crate::constructs::elb::NetworkProtocol;
use crate::constructs::vpc::{SubnetConfiguration, SubnetSelection};

/// Root of `stack.yaml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct StackManifest {
    pub version: String,
    pub stack: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub constructs: IndexMap<String, ConstructSpec>,
}

/// One construct declaration, discriminated by `type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ConstructSpec {
    Vpc(VpcSpec),
    ClusterSubnetGroup(SubnetGroupSpec),
    EcsCluster(EcsClusterSpec),
    FargateTaskDefinition(TaskDefinitionSpec),
    FargateService(ServiceSpec),
    NetworkLoadBalancer(LoadBalancerSpec),
    Resource(RawResourceSpec),
    Output(OutputSpec),
}

impl ConstructSpec {
    /// The `type` tag of this entry.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Vpc(_) => "vpc",
            Self::ClusterSubnetGroup(_) => "cluster_subnet_group",
            Self::EcsCluster(_) => "ecs_cluster",
            Self::FargateTaskDefinition(_) => "fargate_task_definition",
            Self::FargateService(_) => "fargate_service",
            Self::NetworkLoadBalancer(_) => "network_load_balancer",
            Self::Resource(_) => "resource",
            Self::Output(_) => "output",
        }
    }

    /// Keys accepted for a `type` tag, `type` included.
    pub fn accepted_keys(kind: &str) -> Option<&'static [&'static str]> {
        let keys: &'static [&'static str] = match kind {
            "vpc" => &["type", "cidr", "max_azs", "nat_gateways", "subnet_configuration"],
            "cluster_subnet_group" => &["type", "description", "vpc", "vpc_subnets", "removal_policy"],
            "ecs_cluster" => &["type", "vpc", "cluster_name"],
            "fargate_task_definition" => &["type", "cpu", "memory_limit_mib", "family", "containers"],
            "fargate_service" => &[
                "type",
                "cluster",
                "task_definition",
                "desired_count",
                "assign_public_ip",
                "vpc_subnets",
                "min_healthy_percent",
                "max_healthy_percent",
                "auto_scaling",
                "load_balancer_targets",
            ],
            "network_load_balancer" => &["type", "vpc", "internet_facing", "listeners"],
            "resource" => &["type", "resource_type", "properties", "depends_on", "removal_policy"],
            "output" => &["type", "value", "description", "export_name"],
            _ => return None,
        };
        Some(keys)
    }

    /// Ids of other constructs this entry points at, with the field name.
    pub fn references(&self) -> Vec<(&'static str, &str)> {
        match self {
            Self::Vpc(_) | Self::Output(_) => Vec::new(),
            Self::ClusterSubnetGroup(s) => vec![("vpc", s.vpc.as_str())],
            Self::EcsCluster(s) => vec![("vpc", s.vpc.as_str())],
            Self::FargateTaskDefinition(_) => Vec::new(),
            Self::FargateService(s) => {
                let mut refs = vec![
                    ("cluster", s.cluster.as_str()),
                    ("task_definition", s.task_definition.as_str()),
                ];
                refs.extend(
                    s.load_balancer_targets
                        .iter()
                        .map(|t| ("load_balancer", t.load_balancer.as_str())),
                );
                refs
            }
            Self::NetworkLoadBalancer(s) => vec![("vpc", s.vpc.as_str())],
            Self::Resource(s) => s.depends_on.iter().map(|d| ("depends_on", d.as_str())).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct VpcSpec {
    #[serde(default)]
    pub cidr: Option<String>,
    #[serde(default)]
    pub max_azs: Option<usize>,
    #[serde(default)]
    pub nat_gateways: Option<usize>,
    #[serde(default)]
    pub subnet_configuration: Option<Vec<SubnetConfiguration>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct SubnetGroupSpec {
    pub description: String,
    pub vpc: String,
    #[serde(default)]
    pub vpc_subnets: Option<SubnetSelection>,
    #[serde(default)]
    pub removal_policy: Option<RemovalPolicy>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct EcsClusterSpec {
    pub vpc: String,
    #[serde(default)]
    pub cluster_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct TaskDefinitionSpec {
    #[serde(default)]
    pub cpu: Option<u32>,
    #[serde(default)]
    pub memory_limit_mib: Option<u32>,
    #[serde(default)]
    pub family: Option<String>,
    #[serde(default)]
    pub containers: IndexMap<String, ContainerSpec>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct ContainerSpec {
    pub image: String,
    #[serde(default)]
    pub memory_limit_mib: Option<u32>,
    #[serde(default)]
    pub essential: Option<bool>,
    #[serde(default)]
    pub environment: IndexMap<String, String>,
    #[serde(default)]
    pub port_mappings: Vec<PortMapping>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ServiceSpec {
    pub cluster: String,
    pub task_definition: String,
    #[serde(default)]
    pub desired_count: Option<u32>,
    #[serde(default)]
    pub assign_public_ip: bool,
    #[serde(default)]
    pub vpc_subnets: Option<SubnetSelection>,
    #[serde(default)]
    pub min_healthy_percent: Option<u32>,
    #[serde(default)]
    pub max_healthy_percent: Option<u32>,
    #[serde(default)]
    pub auto_scaling: Option<AutoScalingSpec>,
    #[serde(default)]
    pub load_balancer_targets: Vec<LoadBalancerTargetSpec>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct AutoScalingSpec {
    #[serde(default = "default_min_capacity")]
    pub min_capacity: u32,
    pub max_capacity: u32,
    #[serde(default)]
    pub cpu_target_percent: Option<u32>,
    #[serde(default)]
    pub scale_in_cooldown_sec: Option<u32>,
    #[serde(default)]
    pub scale_out_cooldown_sec: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct LoadBalancerTargetSpec {
    pub container_name: String,
    pub container_port: u16,
    pub load_balancer: String,
    pub listener: String,
    #[serde(default = "default_target_group_id")]
    pub target_group_id: String,
    #[serde(default)]
    pub port: Option<u16>,
}

fn default_min_capacity() -> u32 {
    1
}

fn default_target_group_id() -> String {
    "ECS".to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct LoadBalancerSpec {
    pub vpc: String,
    #[serde(default)]
    pub internet_facing: bool,
    #[serde(default)]
    pub listeners: IndexMap<String, ListenerSpec>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct ListenerSpec {
    #[serde(default = "default_listener_port")]
    pub port: u16,
    #[serde(default)]
    pub protocol: NetworkProtocol,
}

fn default_listener_port() -> u16 {
    80
}

/// Escape hatch: a raw resource of any type. `{"Ref": id}` and
/// `{"Fn::GetAtt": [id, attr]}` may name other constructs by id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RawResourceSpec {
    pub resource_type: String,
    #[serde(default)]
    pub properties: IndexMap<String, serde_json::Value>,
    #[serde(default)]
    pub depends_on: Vec<String>,
    #[serde(default)]
    pub removal_policy: Option<RemovalPolicy>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct OutputSpec {
    pub value: serde_json::Value,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub export_name: Option<String>,
}

/// Manifest written by `synthform init`: a load-balanced Fargate service.
pub const EXAMPLE_MANIFEST: &str = r#"version: "1.0"
stack: WebService
description: Fargate service behind a network load balancer
constructs:
  VPC:
    type: vpc
    max_azs: 2
  Cluster:
    type: ecs_cluster
    vpc: VPC
  TaskDef:
    type: fargate_task_definition
    cpu: 256
    memory_limit_mib: 512
    containers:
      web:
        image: nginx:latest
        memory_limit_mib: 256
        port_mappings:
          - container_port: 80
  LB:
    type: network_load_balancer
    vpc: VPC
    internet_facing: true
    listeners:
      PublicListener:
        port: 80
  Service:
    type: fargate_service
    cluster: Cluster
    task_definition: TaskDef
    desired_count: 2
    auto_scaling:
      min_capacity: 2
      max_capacity: 10
      cpu_target_percent: 50
    load_balancer_targets:
      - container_name: web
        container_port: 80
        load_balancer: LB
        listener: PublicListener
  SubnetGroup:
    type: cluster_subnet_group
    description: Subnets for the analytics cluster
    vpc: VPC
  LoadBalancerDNS:
    type: output
    value:
      Fn::GetAtt: [LB, DNSName]
    description: Public DNS name of the load balancer
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manifest_example_parses() {
        let manifest: StackManifest = serde_yaml_ng::from_str(EXAMPLE_MANIFEST).unwrap();
        assert_eq!(manifest.stack, "WebService");
        let kinds: Vec<&str> = manifest.constructs.values().map(ConstructSpec::kind).collect();
        assert_eq!(
            kinds,
            [
                "vpc",
                "ecs_cluster",
                "fargate_task_definition",
                "network_load_balancer",
                "fargate_service",
                "cluster_subnet_group",
                "output"
            ]
        );
    }

    #[test]
    fn test_manifest_references() {
        let manifest: StackManifest = serde_yaml_ng::from_str(EXAMPLE_MANIFEST).unwrap();
        assert_eq!(
            manifest.constructs["Service"].references(),
            vec![("cluster", "Cluster"), ("task_definition", "TaskDef"), ("load_balancer", "LB")]
        );
        assert!(manifest.constructs["VPC"].references().is_empty());
    }

    #[test]
    fn test_manifest_accepted_keys() {
        for kind in ["vpc", "cluster_subnet_group", "fargate_service", "output"] {
            assert!(ConstructSpec::accepted_keys(kind).unwrap().contains(&"type"));
        }
        assert!(ConstructSpec::accepted_keys("bucket").is_none());
    }

    #[test]
    fn test_manifest_schema_names_constructs() {
        let schema = schemars::schema_for!(StackManifest);
        let json = serde_json::to_string(&schema).unwrap();
        assert!(json.contains("cluster_subnet_group"));
        assert!(json.contains("load_balancer_targets"));
    }
}
