//! Network load balancer, listeners and target groups.

use std::cell::RefCell;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use super::vpc::{SubnetSelection, Vpc};
use crate::core::schema::ResourceKind;
use crate::core::tree::{CfnResource, ConstructKind, ConstructTree, NodeId};
use crate::core::types::{SubnetType, Value};
use crate::core::SynthError;

/// Listener / target group protocol.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum NetworkProtocol {
    #[default]
    Tcp,
    Udp,
    TcpUdp,
    Tls,
}

impl NetworkProtocol {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Tcp => "TCP",
            Self::Udp => "UDP",
            Self::TcpUdp => "TCP_UDP",
            Self::Tls => "TLS",
        }
    }
}

/// How targets are addressed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TargetType {
    #[default]
    Instance,
    Ip,
}

impl TargetType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Instance => "instance",
            Self::Ip => "ip",
        }
    }
}

#[derive(Debug, Clone)]
pub struct NetworkLoadBalancerProps {
    pub vpc: Vpc,
    pub internet_facing: bool,
    /// Defaults to public subnets when internet-facing, private otherwise.
    pub vpc_subnets: Option<SubnetSelection>,
}

#[derive(Debug)]
struct LoadBalancerInner {
    resource: NodeId,
    vpc: Vpc,
}

/// Handle to a network load balancer.
#[derive(Debug, Clone)]
pub struct NetworkLoadBalancer {
    node: NodeId,
    inner: Rc<LoadBalancerInner>,
}

impl NetworkLoadBalancer {
    pub fn new(
        tree: &mut ConstructTree,
        scope: NodeId,
        id: &str,
        props: NetworkLoadBalancerProps,
    ) -> Result<Self, SynthError> {
        let node = tree.create(scope, id, ConstructKind::Scope)?;
        let selection = props.vpc_subnets.unwrap_or_else(|| {
            SubnetSelection::of_type(if props.internet_facing {
                SubnetType::Public
            } else {
                SubnetType::Private
            })
        });
        props.vpc.select_subnets(&selection)?;
        let subnets = props.vpc.subnet_ids_token(tree, selection);

        let scheme = if props.internet_facing {
            "internet-facing"
        } else {
            "internal"
        };
        let resource = tree.create(
            node,
            "Resource",
            ConstructKind::Resource(
                CfnResource::new(ResourceKind::LoadBalancer)
                    .prop(
                        "LoadBalancerAttributes",
                        Value::List(vec![Value::map([
                            ("Key", Value::from("deletion_protection.enabled")),
                            ("Value", Value::from("false")),
                        ])]),
                    )
                    .prop("Scheme", scheme)
                    .prop("Subnets", subnets)
                    .prop("Type", "network"),
            ),
        )?;

        // Internet-facing balancers wait for the public routes to exist.
        if props.internet_facing {
            let routes: Vec<NodeId> = props
                .vpc
                .public_subnets()
                .iter()
                .flat_map(|s| tree.children(s.scope).to_vec())
                .filter(|c| tree.node(*c).id == "DefaultRoute")
                .collect();
            for route in routes {
                tree.add_dependency(resource, route)?;
            }
        }

        Ok(Self {
            node,
            inner: Rc::new(LoadBalancerInner {
                resource,
                vpc: props.vpc,
            }),
        })
    }

    pub fn node(&self) -> NodeId {
        self.node
    }

    pub fn resource(&self) -> NodeId {
        self.inner.resource
    }

    pub fn vpc(&self) -> &Vpc {
        &self.inner.vpc
    }

    /// `Ref` of the load balancer (its ARN).
    pub fn load_balancer_arn(&self) -> Value {
        Value::NodeRef(self.inner.resource)
    }

    /// `Fn::GetAtt [lb, DNSName]`
    pub fn load_balancer_dns_name(&self) -> Value {
        Value::NodeAtt(self.inner.resource, "DNSName".to_string())
    }

    /// Add a listener. Its default action forwards to the target groups added
    /// through [`NetworkListener::add_targets`].
    pub fn add_listener(
        &self,
        tree: &mut ConstructTree,
        id: &str,
        props: NetworkListenerProps,
    ) -> Result<NetworkListener, SynthError> {
        if props.port == 0 {
            return Err(SynthError::invalid(
                format!("{}/{}", tree.path(self.node), id),
                "listener port must be between 1 and 65535",
            ));
        }
        let node = tree.create(self.node, id, ConstructKind::Scope)?;
        let target_groups: Rc<RefCell<Vec<NodeId>>> = Rc::default();

        let resource_path = format!("{}/Resource", tree.path(node));
        let groups = Rc::clone(&target_groups);
        let actions = tree.defer("DefaultActions", move || {
            let groups = groups.borrow();
            match groups.as_slice() {
                [] => Err(SynthError::MissingRequiredProperty {
                    path: resource_path.clone(),
                    property: "DefaultActions".to_string(),
                }),
                [single] => Ok(Value::List(vec![Value::map([
                    ("TargetGroupArn", Value::NodeRef(*single)),
                    ("Type", Value::from("forward")),
                ])])),
                many => Ok(Value::List(vec![Value::map([
                    (
                        "ForwardConfig",
                        Value::map([(
                            "TargetGroups",
                            Value::List(
                                many.iter()
                                    .map(|g| {
                                        Value::map([
                                            ("TargetGroupArn", Value::NodeRef(*g)),
                                            ("Weight", Value::Int(1)),
                                        ])
                                    })
                                    .collect(),
                            ),
                        )]),
                    ),
                    ("Type", Value::from("forward")),
                ])])),
            }
        });

        let resource = tree.create(
            node,
            "Resource",
            ConstructKind::Resource(
                CfnResource::new(ResourceKind::Listener)
                    .prop("DefaultActions", actions)
                    .prop("LoadBalancerArn", self.load_balancer_arn())
                    .prop("Port", props.port)
                    .prop("Protocol", props.protocol.as_str()),
            ),
        )?;

        Ok(NetworkListener {
            inner: Rc::new(ListenerInner {
                node,
                resource,
                port: props.port,
                protocol: props.protocol,
                vpc: self.inner.vpc.clone(),
                target_groups,
            }),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetworkListenerProps {
    pub port: u16,
    pub protocol: NetworkProtocol,
}

impl Default for NetworkListenerProps {
    fn default() -> Self {
        Self {
            port: 80,
            protocol: NetworkProtocol::Tcp,
        }
    }
}

/// Options for a target group created on a listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddNetworkTargetsProps {
    /// Defaults to the listener port.
    pub port: Option<u16>,
    /// Defaults to the listener protocol.
    pub protocol: Option<NetworkProtocol>,
    pub target_type: TargetType,
}

impl Default for AddNetworkTargetsProps {
    fn default() -> Self {
        Self {
            port: None,
            protocol: None,
            target_type: TargetType::Instance,
        }
    }
}

#[derive(Debug)]
struct ListenerInner {
    node: NodeId,
    resource: NodeId,
    port: u16,
    protocol: NetworkProtocol,
    vpc: Vpc,
    target_groups: Rc<RefCell<Vec<NodeId>>>,
}

/// Handle to a network listener.
#[derive(Debug, Clone)]
pub struct NetworkListener {
    inner: Rc<ListenerInner>,
}

impl NetworkListener {
    pub fn node(&self) -> NodeId {
        self.inner.node
    }

    /// The `AWS::ElasticLoadBalancingV2::Listener` node.
    pub fn resource(&self) -> NodeId {
        self.inner.resource
    }

    pub fn port(&self) -> u16 {
        self.inner.port
    }

    pub fn target_groups(&self) -> Vec<NodeId> {
        self.inner.target_groups.borrow().clone()
    }

    /// Create a target group `<id>Group` under the listener and forward to it.
    pub fn add_targets(
        &self,
        tree: &mut ConstructTree,
        id: &str,
        props: AddNetworkTargetsProps,
    ) -> Result<TargetGroup, SynthError> {
        let node = tree.create(self.inner.node, &format!("{}Group", id), ConstructKind::Scope)?;
        let resource = tree.create(
            node,
            "Resource",
            ConstructKind::Resource(
                CfnResource::new(ResourceKind::TargetGroup)
                    .prop("Port", props.port.unwrap_or(self.inner.port))
                    .prop("Protocol", props.protocol.unwrap_or(self.inner.protocol).as_str())
                    .prop("TargetType", props.target_type.as_str())
                    .prop("VpcId", self.inner.vpc.vpc_id()),
            ),
        )?;
        self.inner.target_groups.borrow_mut().push(resource);
        tracing::debug!(path = tree.path(resource), "target group added");
        Ok(TargetGroup { node, resource })
    }
}

/// Handle to a target group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TargetGroup {
    node: NodeId,
    resource: NodeId,
}

impl TargetGroup {
    pub fn node(&self) -> NodeId {
        self.node
    }

    pub fn resource(&self) -> NodeId {
        self.resource
    }

    pub fn target_group_arn(&self) -> Value {
        Value::NodeRef(self.resource)
    }
}
