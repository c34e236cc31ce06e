//! VPC with a public/private/isolated subnet layout, plus subnet selection.
//!
//! The VPC lays out one subnet per configured group and availability zone,
//! in configuration order. That declaration order is the order every subnet
//! selection reports.

use std::net::Ipv4Addr;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::core::schema::ResourceKind;
use crate::core::tree::{CfnResource, ConstructKind, ConstructTree, NodeId};
use crate::core::types::{SubnetType, Value};
use crate::core::SynthError;

/// Availability zones usable without knowing the target region.
const ENV_AGNOSTIC_AZS: usize = 2;
const MIN_VPC_PREFIX: u8 = 16;
const MAX_SUBNET_PREFIX: u8 = 28;

/// One subnet group, repeated in every availability zone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct SubnetConfiguration {
    pub name: String,
    pub subnet_type: SubnetType,
    #[serde(default)]
    pub cidr_mask: Option<u8>,
}

impl SubnetConfiguration {
    pub fn new(name: &str, subnet_type: SubnetType) -> Self {
        Self {
            name: name.to_string(),
            subnet_type,
            cidr_mask: None,
        }
    }
}

/// VPC options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VpcProps {
    pub cidr: String,
    pub max_azs: usize,
    /// NAT gateways to create; defaults to one per availability zone.
    pub nat_gateways: Option<usize>,
    pub subnet_configuration: Vec<SubnetConfiguration>,
}

impl Default for VpcProps {
    fn default() -> Self {
        Self {
            cidr: "10.0.0.0/16".to_string(),
            max_azs: 2,
            nat_gateways: None,
            subnet_configuration: vec![
                SubnetConfiguration::new("Public", SubnetType::Public),
                SubnetConfiguration::new("Private", SubnetType::Private),
            ],
        }
    }
}

/// Which subnets to pick. Defaults to the private subnets.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct SubnetSelection {
    #[serde(default)]
    pub subnet_type: Option<SubnetType>,
    #[serde(default)]
    pub subnet_group_name: Option<String>,
}

impl SubnetSelection {
    pub fn of_type(subnet_type: SubnetType) -> Self {
        Self {
            subnet_type: Some(subnet_type),
            subnet_group_name: None,
        }
    }

    pub fn group(name: &str) -> Self {
        Self {
            subnet_type: None,
            subnet_group_name: Some(name.to_string()),
        }
    }
}

/// Result of a subnet selection, in VPC declaration order.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectedSubnets {
    pub subnet_type: SubnetType,
    pub subnet_ids: Vec<Value>,
    pub availability_zones: Vec<Value>,
}

/// A subnet laid out by the VPC.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubnetInfo {
    pub group: String,
    pub subnet_type: SubnetType,
    pub az_index: usize,
    pub cidr: String,
    pub scope: NodeId,
    pub subnet: NodeId,
    pub route_table: NodeId,
}

#[derive(Debug)]
struct VpcInner {
    node: NodeId,
    resource: NodeId,
    path: String,
    cidr: String,
    az_count: usize,
    subnets: Vec<SubnetInfo>,
}

/// Handle to a VPC construct. Cheap to clone.
#[derive(Debug, Clone)]
pub struct Vpc {
    inner: Rc<VpcInner>,
}

impl Vpc {
    pub fn new(
        tree: &mut ConstructTree,
        scope: NodeId,
        id: &str,
        props: VpcProps,
    ) -> Result<Self, SynthError> {
        let node = tree.create(scope, id, ConstructKind::Scope)?;
        let path = tree.path(node).to_string();

        let (base, prefix) = parse_cidr(&props.cidr).map_err(|m| SynthError::invalid(&path, m))?;
        if props.max_azs == 0 {
            return Err(SynthError::invalid(&path, "max_azs must be at least 1"));
        }
        if props.subnet_configuration.is_empty() {
            return Err(SynthError::invalid(&path, "subnet_configuration must not be empty"));
        }
        let az_count = props.max_azs.min(ENV_AGNOSTIC_AZS);
        let has = |t: SubnetType| props.subnet_configuration.iter().any(|c| c.subnet_type == t);
        let nat_count = props
            .nat_gateways
            .unwrap_or(az_count)
            .min(az_count);
        if has(SubnetType::Private) && (!has(SubnetType::Public) || nat_count == 0) {
            return Err(SynthError::invalid(
                &path,
                "private subnets need public subnets and at least one NAT gateway",
            ));
        }

        let resource = tree.create(
            node,
            "Resource",
            ConstructKind::Resource(
                CfnResource::new(ResourceKind::Ec2Vpc)
                    .prop("CidrBlock", props.cidr.as_str())
                    .prop("EnableDnsHostnames", true)
                    .prop("EnableDnsSupport", true)
                    .prop("InstanceTenancy", "default")
                    .prop("Tags", name_tags(&path)),
            ),
        )?;

        let cidrs = allocate_cidrs(base, prefix, &props.subnet_configuration, az_count)
            .map_err(|m| SynthError::invalid(&path, m))?;

        let mut subnets = Vec::new();
        let mut cidr_iter = cidrs.into_iter();
        for config in &props.subnet_configuration {
            for az_index in 0..az_count {
                let cidr = cidr_iter
                    .next()
                    .ok_or_else(|| SynthError::invalid(&path, "subnet allocation mismatch"))?;
                subnets.push(add_subnet(tree, node, resource, config, az_index, cidr)?);
            }
        }

        if has(SubnetType::Public) {
            let igw = tree.create(
                node,
                "IGW",
                ConstructKind::Resource(
                    CfnResource::new(ResourceKind::Ec2InternetGateway).prop("Tags", name_tags(&path)),
                ),
            )?;
            let attachment = tree.create(
                node,
                "VPCGW",
                ConstructKind::Resource(
                    CfnResource::new(ResourceKind::Ec2VpcGatewayAttachment)
                        .prop("VpcId", Value::NodeRef(resource))
                        .prop("InternetGatewayId", Value::NodeRef(igw)),
                ),
            )?;

            let mut nat_gateways: Vec<(usize, NodeId)> = Vec::new();
            for subnet in subnets.iter().filter(|s| s.subnet_type == SubnetType::Public) {
                let route = tree.create(
                    subnet.scope,
                    "DefaultRoute",
                    ConstructKind::Resource(
                        CfnResource::new(ResourceKind::Ec2Route)
                            .prop("RouteTableId", Value::NodeRef(subnet.route_table))
                            .prop("DestinationCidrBlock", "0.0.0.0/0")
                            .prop("GatewayId", Value::NodeRef(igw)),
                    ),
                )?;
                tree.add_dependency(route, attachment)?;

                let needs_nat = nat_gateways.len() < nat_count
                    && !nat_gateways.iter().any(|(az, _)| *az == subnet.az_index);
                if needs_nat {
                    let scope_path = tree.path(subnet.scope).to_string();
                    let eip = tree.create(
                        subnet.scope,
                        "EIP",
                        ConstructKind::Resource(
                            CfnResource::new(ResourceKind::Ec2Eip)
                                .prop("Domain", "vpc")
                                .prop("Tags", name_tags(&scope_path)),
                        ),
                    )?;
                    let nat = tree.create(
                        subnet.scope,
                        "NATGateway",
                        ConstructKind::Resource(
                            CfnResource::new(ResourceKind::Ec2NatGateway)
                                .prop("SubnetId", Value::NodeRef(subnet.subnet))
                                .prop("AllocationId", Value::NodeAtt(eip, "AllocationId".into()))
                                .prop("Tags", name_tags(&scope_path)),
                        ),
                    )?;
                    tree.add_dependency(nat, route)?;
                    nat_gateways.push((subnet.az_index, nat));
                }
            }

            for subnet in subnets.iter().filter(|s| s.subnet_type == SubnetType::Private) {
                let nat = nat_gateways
                    .iter()
                    .find(|(az, _)| *az == subnet.az_index)
                    .or_else(|| nat_gateways.first())
                    .map(|(_, nat)| *nat)
                    .ok_or_else(|| SynthError::invalid(&path, "no NAT gateway for private subnet"))?;
                tree.create(
                    subnet.scope,
                    "DefaultRoute",
                    ConstructKind::Resource(
                        CfnResource::new(ResourceKind::Ec2Route)
                            .prop("RouteTableId", Value::NodeRef(subnet.route_table))
                            .prop("DestinationCidrBlock", "0.0.0.0/0")
                            .prop("NatGatewayId", Value::NodeRef(nat)),
                    ),
                )?;
            }
        }

        tracing::debug!(path = %path, subnets = subnets.len(), "vpc laid out");
        Ok(Self {
            inner: Rc::new(VpcInner {
                node,
                resource,
                path,
                cidr: props.cidr,
                az_count,
                subnets,
            }),
        })
    }

    pub fn node(&self) -> NodeId {
        self.inner.node
    }

    /// The `AWS::EC2::VPC` resource node.
    pub fn resource(&self) -> NodeId {
        self.inner.resource
    }

    /// `Ref` of the VPC resource.
    pub fn vpc_id(&self) -> Value {
        Value::NodeRef(self.inner.resource)
    }

    pub fn cidr(&self) -> &str {
        &self.inner.cidr
    }

    pub fn az_count(&self) -> usize {
        self.inner.az_count
    }

    /// All subnets in declaration order.
    pub fn subnets(&self) -> &[SubnetInfo] {
        &self.inner.subnets
    }

    pub fn subnets_of_type(&self, subnet_type: SubnetType) -> Vec<&SubnetInfo> {
        self.inner
            .subnets
            .iter()
            .filter(|s| s.subnet_type == subnet_type)
            .collect()
    }

    pub fn public_subnets(&self) -> Vec<&SubnetInfo> {
        self.subnets_of_type(SubnetType::Public)
    }

    pub fn private_subnets(&self) -> Vec<&SubnetInfo> {
        self.subnets_of_type(SubnetType::Private)
    }

    pub fn isolated_subnets(&self) -> Vec<&SubnetInfo> {
        self.subnets_of_type(SubnetType::Isolated)
    }

    /// Pick subnets. No type and no group name selects the private subnets.
    pub fn select_subnets(
        &self,
        selection: &SubnetSelection,
    ) -> Result<Rc<SelectedSubnets>, SynthError> {
        let chosen: Vec<&SubnetInfo> = match (&selection.subnet_type, &selection.subnet_group_name) {
            (Some(_), Some(_)) => {
                return Err(SynthError::invalid(
                    &self.inner.path,
                    "only one of subnet_type and subnet_group_name may be given",
                ))
            }
            (None, Some(name)) => self
                .inner
                .subnets
                .iter()
                .filter(|s| &s.group == name)
                .collect(),
            (subnet_type, None) => {
                self.subnets_of_type(subnet_type.unwrap_or(SubnetType::Private))
            }
        };

        let first = chosen.first().ok_or_else(|| {
            let wanted = match (&selection.subnet_type, &selection.subnet_group_name) {
                (_, Some(name)) => format!("'{}'", name),
                (t, None) => format!("'{}'", t.unwrap_or(SubnetType::Private)),
            };
            SynthError::invalid(
                &self.inner.path,
                format!("there are no {} subnet groups in this VPC", wanted),
            )
        })?;

        Ok(Rc::new(SelectedSubnets {
            subnet_type: first.subnet_type,
            subnet_ids: chosen.iter().map(|s| Value::NodeRef(s.subnet)).collect(),
            availability_zones: chosen
                .iter()
                .map(|s| Value::availability_zone(s.az_index))
                .collect(),
        }))
    }

    /// Deferred list of subnet IDs, selected when the template is synthesized.
    pub fn subnet_ids_token(&self, tree: &mut ConstructTree, selection: SubnetSelection) -> Value {
        let vpc = self.clone();
        tree.defer("SubnetIds", move || {
            let selected = vpc.select_subnets(&selection)?;
            Ok(Value::List(selected.subnet_ids.clone()))
        })
    }
}

fn add_subnet(
    tree: &mut ConstructTree,
    vpc_node: NodeId,
    vpc_resource: NodeId,
    config: &SubnetConfiguration,
    az_index: usize,
    cidr: String,
) -> Result<SubnetInfo, SynthError> {
    let scope = tree.create(
        vpc_node,
        &format!("{}Subnet{}", config.name, az_index + 1),
        ConstructKind::Scope,
    )?;
    let scope_path = tree.path(scope).to_string();
    let tags = Value::List(vec![
        Value::map([("Key", Value::from("Name")), ("Value", Value::from(scope_path.as_str()))]),
        Value::map([
            ("Key", Value::from("synthform:subnet-name")),
            ("Value", Value::from(config.name.as_str())),
        ]),
        Value::map([
            ("Key", Value::from("synthform:subnet-type")),
            ("Value", Value::from(config.subnet_type.to_string())),
        ]),
    ]);

    let subnet = tree.create(
        scope,
        "Subnet",
        ConstructKind::Resource(
            CfnResource::new(ResourceKind::Ec2Subnet)
                .prop("VpcId", Value::NodeRef(vpc_resource))
                .prop("AvailabilityZone", Value::availability_zone(az_index))
                .prop("CidrBlock", cidr.as_str())
                .prop("MapPublicIpOnLaunch", config.subnet_type == SubnetType::Public)
                .prop("Tags", tags),
        ),
    )?;
    let route_table = tree.create(
        scope,
        "RouteTable",
        ConstructKind::Resource(
            CfnResource::new(ResourceKind::Ec2RouteTable)
                .prop("VpcId", Value::NodeRef(vpc_resource))
                .prop("Tags", name_tags(&scope_path)),
        ),
    )?;
    tree.create(
        scope,
        "RouteTableAssociation",
        ConstructKind::Resource(
            CfnResource::new(ResourceKind::Ec2SubnetRouteTableAssociation)
                .prop("RouteTableId", Value::NodeRef(route_table))
                .prop("SubnetId", Value::NodeRef(subnet)),
        ),
    )?;

    Ok(SubnetInfo {
        group: config.name.clone(),
        subnet_type: config.subnet_type,
        az_index,
        cidr,
        scope,
        subnet,
        route_table,
    })
}

/// `[{Key: Name, Value: path}]`
pub(crate) fn name_tags(path: &str) -> Value {
    Value::List(vec![Value::map([
        ("Key", Value::from("Name")),
        ("Value", Value::from(path)),
    ])])
}

fn parse_cidr(cidr: &str) -> Result<(u32, u8), String> {
    let (addr, prefix) = cidr
        .split_once('/')
        .ok_or_else(|| format!("invalid CIDR '{}'", cidr))?;
    let addr: Ipv4Addr = addr
        .parse()
        .map_err(|e| format!("invalid CIDR '{}': {}", cidr, e))?;
    let prefix: u8 = prefix
        .parse()
        .map_err(|e| format!("invalid CIDR '{}': {}", cidr, e))?;
    if !(MIN_VPC_PREFIX..=MAX_SUBNET_PREFIX).contains(&prefix) {
        return Err(format!(
            "VPC prefix must be between /{} and /{}, got /{}",
            MIN_VPC_PREFIX, MAX_SUBNET_PREFIX, prefix
        ));
    }
    let base = u32::from(addr);
    let host_mask = (1u32 << (32 - prefix)) - 1;
    if base & host_mask != 0 {
        return Err(format!("CIDR '{}' has host bits set", cidr));
    }
    Ok((base, prefix))
}

/// Carve subnet blocks in configuration order. Groups without a mask share
/// the space left after the masked groups, split into equal power-of-two blocks.
fn allocate_cidrs(
    base: u32,
    prefix: u8,
    configs: &[SubnetConfiguration],
    az_count: usize,
) -> Result<Vec<String>, String> {
    let size: u64 = 1u64 << (32 - prefix);

    let mut reserved: u64 = 0;
    let mut unmasked = 0usize;
    for config in configs {
        match config.cidr_mask {
            Some(mask) => {
                if !(prefix..=MAX_SUBNET_PREFIX).contains(&mask) {
                    return Err(format!(
                        "cidr_mask /{} of group '{}' must be between /{} and /{}",
                        mask, config.name, prefix, MAX_SUBNET_PREFIX
                    ));
                }
                reserved += (1u64 << (32 - mask)) * az_count as u64;
            }
            None => unmasked += az_count,
        }
    }
    if reserved > size {
        return Err("subnet masks do not fit in the VPC CIDR".to_string());
    }

    let remaining_mask = if unmasked > 0 {
        let per_subnet = (size - reserved) / unmasked as u64;
        if per_subnet == 0 {
            return Err("not enough address space for the subnets".to_string());
        }
        let bits = 63 - per_subnet.leading_zeros() as u8;
        let mask = 32 - bits;
        if mask > MAX_SUBNET_PREFIX {
            return Err(format!("subnets would be smaller than /{}", MAX_SUBNET_PREFIX));
        }
        mask
    } else {
        MAX_SUBNET_PREFIX
    };

    let mut next: u64 = 0;
    let mut out = Vec::with_capacity(configs.len() * az_count);
    for config in configs {
        let mask = config.cidr_mask.unwrap_or(remaining_mask);
        let block = 1u64 << (32 - mask);
        for _ in 0..az_count {
            let start = next.div_ceil(block) * block;
            if start + block > size {
                return Err("subnets do not fit in the VPC CIDR".to_string());
            }
            let addr = Ipv4Addr::from(base + start as u32);
            out.push(format!("{}/{}", addr, mask));
            next = start + block;
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::assembler::assemble;
    use crate::core::resolver::resolve;

    fn default_vpc(tree: &mut ConstructTree) -> Vpc {
        let root = tree.root();
        Vpc::new(tree, root, "VPC", VpcProps::default()).unwrap()
    }

    #[test]
    fn test_vpc_default_layout() {
        let mut tree = ConstructTree::new("Stack");
        let vpc = default_vpc(&mut tree);
        assert_eq!(vpc.az_count(), 2);
        let names: Vec<_> = vpc
            .subnets()
            .iter()
            .map(|s| tree.node(s.scope).id.clone())
            .collect();
        assert_eq!(
            names,
            vec!["PublicSubnet1", "PublicSubnet2", "PrivateSubnet1", "PrivateSubnet2"]
        );
        let cidrs: Vec<_> = vpc.subnets().iter().map(|s| s.cidr.as_str()).collect();
        assert_eq!(
            cidrs,
            vec!["10.0.0.0/18", "10.0.64.0/18", "10.0.128.0/18", "10.0.192.0/18"]
        );
    }

    #[test]
    fn test_vpc_template_resources() {
        let mut tree = ConstructTree::new("Stack");
        default_vpc(&mut tree);
        let template = assemble(&tree).unwrap();
        let count = |t: &str| template.resources_of_type(t).count();
        assert_eq!(count("AWS::EC2::VPC"), 1);
        assert_eq!(count("AWS::EC2::Subnet"), 4);
        assert_eq!(count("AWS::EC2::RouteTable"), 4);
        assert_eq!(count("AWS::EC2::Route"), 4);
        assert_eq!(count("AWS::EC2::NatGateway"), 2);
        assert_eq!(count("AWS::EC2::InternetGateway"), 1);
        assert!(template
            .logical_id_for_path("Stack/VPC/PrivateSubnet1/Subnet")
            .unwrap()
            .starts_with("VPCPrivateSubnet1Subnet"));
    }

    #[test]
    fn test_vpc_single_nat_gateway() {
        let mut tree = ConstructTree::new("Stack");
        let root = tree.root();
        Vpc::new(
            &mut tree,
            root,
            "VPC",
            VpcProps {
                nat_gateways: Some(1),
                ..VpcProps::default()
            },
        )
        .unwrap();
        let template = assemble(&tree).unwrap();
        assert_eq!(template.resources_of_type("AWS::EC2::NatGateway").count(), 1);
        let nat = template
            .logical_id_for_path("Stack/VPC/PublicSubnet1/NATGateway")
            .unwrap()
            .to_string();
        for path in ["PrivateSubnet1", "PrivateSubnet2"] {
            let route_id = template
                .logical_id_for_path(&format!("Stack/VPC/{}/DefaultRoute", path))
                .unwrap();
            assert_eq!(
                template.resources[route_id].properties["NatGatewayId"],
                Value::Ref(nat.clone())
            );
        }
    }

    #[test]
    fn test_vpc_select_defaults_to_private_in_order() {
        let mut tree = ConstructTree::new("Stack");
        let vpc = default_vpc(&mut tree);
        let selected = vpc.select_subnets(&SubnetSelection::default()).unwrap();
        assert_eq!(selected.subnet_type, SubnetType::Private);
        let expected: Vec<_> = vpc
            .private_subnets()
            .iter()
            .map(|s| Value::NodeRef(s.subnet))
            .collect();
        assert_eq!(selected.subnet_ids, expected);
        assert_eq!(
            resolve(&tree, &selected.subnet_ids[0]).unwrap(),
            Value::Ref(tree.logical_id(vpc.private_subnets()[0].subnet))
        );
    }

    #[test]
    fn test_vpc_select_public() {
        let mut tree = ConstructTree::new("Stack");
        let vpc = default_vpc(&mut tree);
        let selected = vpc
            .select_subnets(&SubnetSelection::of_type(SubnetType::Public))
            .unwrap();
        let expected: Vec<_> = vpc
            .public_subnets()
            .iter()
            .map(|s| Value::NodeRef(s.subnet))
            .collect();
        assert_eq!(selected.subnet_ids, expected);
        assert_eq!(selected.availability_zones.len(), 2);
    }

    #[test]
    fn test_vpc_select_by_group_name() {
        let mut tree = ConstructTree::new("Stack");
        let vpc = default_vpc(&mut tree);
        let selected = vpc.select_subnets(&SubnetSelection::group("Public")).unwrap();
        assert_eq!(selected.subnet_type, SubnetType::Public);
        assert!(vpc.select_subnets(&SubnetSelection::group("Nope")).is_err());
    }

    #[test]
    fn test_vpc_select_missing_type() {
        let mut tree = ConstructTree::new("Stack");
        let vpc = default_vpc(&mut tree);
        let err = vpc
            .select_subnets(&SubnetSelection::of_type(SubnetType::Isolated))
            .unwrap_err();
        assert!(err.to_string().contains("no 'Isolated' subnet groups"));
    }

    #[test]
    fn test_vpc_isolated_only() {
        let mut tree = ConstructTree::new("Stack");
        let root = tree.root();
        let vpc = Vpc::new(
            &mut tree,
            root,
            "VPC",
            VpcProps {
                subnet_configuration: vec![SubnetConfiguration::new("Data", SubnetType::Isolated)],
                ..VpcProps::default()
            },
        )
        .unwrap();
        assert_eq!(vpc.isolated_subnets().len(), 2);
        let template = assemble(&tree).unwrap();
        assert_eq!(template.resources_of_type("AWS::EC2::InternetGateway").count(), 0);
        assert_eq!(template.resources_of_type("AWS::EC2::Route").count(), 0);
    }

    #[test]
    fn test_vpc_private_without_public_rejected() {
        let mut tree = ConstructTree::new("Stack");
        let root = tree.root();
        let err = Vpc::new(
            &mut tree,
            root,
            "VPC",
            VpcProps {
                subnet_configuration: vec![SubnetConfiguration::new("App", SubnetType::Private)],
                ..VpcProps::default()
            },
        )
        .unwrap_err();
        assert!(matches!(err, SynthError::InvalidProps { .. }));
    }

    #[test]
    fn test_vpc_cidr_masks() {
        let configs = vec![
            SubnetConfiguration {
                name: "Ingress".into(),
                subnet_type: SubnetType::Public,
                cidr_mask: Some(24),
            },
            SubnetConfiguration::new("App", SubnetType::Private),
        ];
        let (base, prefix) = parse_cidr("10.0.0.0/16").unwrap();
        let cidrs = allocate_cidrs(base, prefix, &configs, 2).unwrap();
        assert_eq!(cidrs[0], "10.0.0.0/24");
        assert_eq!(cidrs[1], "10.0.1.0/24");
        // Remaining 65024 addresses over 2 subnets -> /18 blocks, aligned
        assert_eq!(cidrs[2], "10.0.64.0/18");
        assert_eq!(cidrs[3], "10.0.128.0/18");
    }

    #[test]
    fn test_vpc_bad_cidrs() {
        assert!(parse_cidr("10.0.0.0").is_err());
        assert!(parse_cidr("10.0.0.0/8").is_err());
        assert!(parse_cidr("10.0.0.1/16").is_err());
        assert!(parse_cidr("300.0.0.0/16").is_err());
    }
}
