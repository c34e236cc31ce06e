//! Resource types and their property schemas.
//!
//! The set of modeled resource types is closed. Each knows its type tag and
//! the ordered list of properties it accepts; the order is the order
//! properties appear in the synthesized record. `Custom` is the escape hatch
//! for types outside the catalog and accepts any property in insertion order.

use std::fmt;

/// One property a resource type accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PropertySpec {
    pub name: &'static str,
    pub required: bool,
}

const fn req(name: &'static str) -> PropertySpec {
    PropertySpec {
        name,
        required: true,
    }
}

const fn opt(name: &'static str) -> PropertySpec {
    PropertySpec {
        name,
        required: false,
    }
}

/// Resource type of a resource construct.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Ec2Vpc,
    Ec2Subnet,
    Ec2RouteTable,
    Ec2SubnetRouteTableAssociation,
    Ec2Route,
    Ec2Eip,
    Ec2NatGateway,
    Ec2InternetGateway,
    Ec2VpcGatewayAttachment,
    Ec2SecurityGroup,
    RedshiftClusterSubnetGroup,
    EcsCluster,
    EcsTaskDefinition,
    EcsService,
    IamRole,
    ScalableTarget,
    ScalingPolicy,
    LoadBalancer,
    Listener,
    TargetGroup,
    Custom(String),
}

const CATALOG: &[ResourceKind] = &[
    ResourceKind::Ec2Vpc,
    ResourceKind::Ec2Subnet,
    ResourceKind::Ec2RouteTable,
    ResourceKind::Ec2SubnetRouteTableAssociation,
    ResourceKind::Ec2Route,
    ResourceKind::Ec2Eip,
    ResourceKind::Ec2NatGateway,
    ResourceKind::Ec2InternetGateway,
    ResourceKind::Ec2VpcGatewayAttachment,
    ResourceKind::Ec2SecurityGroup,
    ResourceKind::RedshiftClusterSubnetGroup,
    ResourceKind::EcsCluster,
    ResourceKind::EcsTaskDefinition,
    ResourceKind::EcsService,
    ResourceKind::IamRole,
    ResourceKind::ScalableTarget,
    ResourceKind::ScalingPolicy,
    ResourceKind::LoadBalancer,
    ResourceKind::Listener,
    ResourceKind::TargetGroup,
];

impl ResourceKind {
    /// Type tag written to the `Type` field of the record.
    pub fn type_tag(&self) -> &str {
        match self {
            Self::Ec2Vpc => "AWS::EC2::VPC",
            Self::Ec2Subnet => "AWS::EC2::Subnet",
            Self::Ec2RouteTable => "AWS::EC2::RouteTable",
            Self::Ec2SubnetRouteTableAssociation => "AWS::EC2::SubnetRouteTableAssociation",
            Self::Ec2Route => "AWS::EC2::Route",
            Self::Ec2Eip => "AWS::EC2::EIP",
            Self::Ec2NatGateway => "AWS::EC2::NatGateway",
            Self::Ec2InternetGateway => "AWS::EC2::InternetGateway",
            Self::Ec2VpcGatewayAttachment => "AWS::EC2::VPCGatewayAttachment",
            Self::Ec2SecurityGroup => "AWS::EC2::SecurityGroup",
            Self::RedshiftClusterSubnetGroup => "AWS::Redshift::ClusterSubnetGroup",
            Self::EcsCluster => "AWS::ECS::Cluster",
            Self::EcsTaskDefinition => "AWS::ECS::TaskDefinition",
            Self::EcsService => "AWS::ECS::Service",
            Self::IamRole => "AWS::IAM::Role",
            Self::ScalableTarget => "AWS::ApplicationAutoScaling::ScalableTarget",
            Self::ScalingPolicy => "AWS::ApplicationAutoScaling::ScalingPolicy",
            Self::LoadBalancer => "AWS::ElasticLoadBalancingV2::LoadBalancer",
            Self::Listener => "AWS::ElasticLoadBalancingV2::Listener",
            Self::TargetGroup => "AWS::ElasticLoadBalancingV2::TargetGroup",
            Self::Custom(tag) => tag,
        }
    }

    /// Map a type tag back to a catalog entry, or `Custom`.
    pub fn from_type_tag(tag: &str) -> Self {
        CATALOG
            .iter()
            .find(|k| k.type_tag() == tag)
            .cloned()
            .unwrap_or_else(|| Self::Custom(tag.to_string()))
    }

    /// Accepted properties in output order. `None` means schemaless.
    pub fn schema(&self) -> Option<&'static [PropertySpec]> {
        let props: &'static [PropertySpec] = match self {
            Self::Ec2Vpc => const { &[
                req("CidrBlock"),
                opt("EnableDnsHostnames"),
                opt("EnableDnsSupport"),
                opt("InstanceTenancy"),
                opt("Tags"),
            ] },
            Self::Ec2Subnet => const { &[
                req("VpcId"),
                opt("AvailabilityZone"),
                req("CidrBlock"),
                opt("MapPublicIpOnLaunch"),
                opt("Tags"),
            ] },
            Self::Ec2RouteTable => const { &[req("VpcId"), opt("Tags")] },
            Self::Ec2SubnetRouteTableAssociation => const { &[req("RouteTableId"), req("SubnetId")] },
            Self::Ec2Route => const { &[
                req("RouteTableId"),
                opt("DestinationCidrBlock"),
                opt("GatewayId"),
                opt("NatGatewayId"),
            ] },
            Self::Ec2Eip => const { &[opt("Domain"), opt("Tags")] },
            Self::Ec2NatGateway => const { &[req("SubnetId"), opt("AllocationId"), opt("Tags")] },
            Self::Ec2InternetGateway => const { &[opt("Tags")] },
            Self::Ec2VpcGatewayAttachment => const { &[req("VpcId"), opt("InternetGatewayId")] },
            Self::Ec2SecurityGroup => const { &[
                req("GroupDescription"),
                opt("SecurityGroupEgress"),
                opt("SecurityGroupIngress"),
                opt("VpcId"),
            ] },
            Self::RedshiftClusterSubnetGroup => {
                const { &[req("Description"), req("SubnetIds"), opt("Tags")] }
            }
            Self::EcsCluster => const { &[opt("ClusterName")] },
            Self::EcsTaskDefinition => const { &[
                opt("ContainerDefinitions"),
                opt("Cpu"),
                opt("ExecutionRoleArn"),
                opt("Family"),
                opt("Memory"),
                opt("NetworkMode"),
                opt("RequiresCompatibilities"),
                opt("TaskRoleArn"),
            ] },
            Self::EcsService => const { &[
                opt("Cluster"),
                opt("DeploymentConfiguration"),
                opt("DesiredCount"),
                opt("EnableECSManagedTags"),
                opt("LaunchType"),
                opt("LoadBalancers"),
                opt("NetworkConfiguration"),
                req("TaskDefinition"),
            ] },
            Self::IamRole => const { &[
                req("AssumeRolePolicyDocument"),
                opt("ManagedPolicyArns"),
                opt("Policies"),
            ] },
            Self::ScalableTarget => const { &[
                req("MaxCapacity"),
                req("MinCapacity"),
                req("ResourceId"),
                opt("RoleARN"),
                req("ScalableDimension"),
                req("ServiceNamespace"),
            ] },
            Self::ScalingPolicy => const { &[
                req("PolicyName"),
                opt("PolicyType"),
                opt("ScalingTargetId"),
                opt("TargetTrackingScalingPolicyConfiguration"),
            ] },
            Self::LoadBalancer => const { &[
                opt("LoadBalancerAttributes"),
                opt("Scheme"),
                opt("Subnets"),
                opt("Type"),
            ] },
            Self::Listener => const { &[
                req("DefaultActions"),
                req("LoadBalancerArn"),
                opt("Port"),
                opt("Protocol"),
            ] },
            Self::TargetGroup => const { &[
                opt("Port"),
                opt("Protocol"),
                opt("TargetType"),
                opt("VpcId"),
            ] },
            Self::Custom(_) => return None,
        };
        Some(props)
    }

    /// Whether this type accepts a property name.
    pub fn accepts(&self, property: &str) -> bool {
        match self.schema() {
            Some(props) => props.iter().any(|p| p.name == property),
            None => true,
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.type_tag())
    }
}
