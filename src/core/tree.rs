//! Construct tree: an arena of typed nodes with ordered children.
//!
//! The tree owns every node; parents hold child indices and children hold a
//! parent index as a back-reference only. A node's path is fixed when it is
//! created and never changes. Mutation needs `&mut ConstructTree`, so once
//! synthesis borrows the tree the build phase is over.

use indexmap::IndexMap;

use super::error::SynthError;
use super::logical_id;
use super::schema::ResourceKind;
use super::token::TokenRegistry;
use super::types::{RemovalPolicy, Value};

/// Index of a node in its tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// A resource declaration: type, raw properties and record-level options.
#[derive(Debug, Clone, PartialEq)]
pub struct CfnResource {
    pub kind: ResourceKind,
    pub properties: IndexMap<String, Value>,
    pub removal_policy: Option<RemovalPolicy>,
    pub depends_on: Vec<NodeId>,
}

impl CfnResource {
    pub fn new(kind: ResourceKind) -> Self {
        Self {
            kind,
            properties: IndexMap::new(),
            removal_policy: None,
            depends_on: Vec::new(),
        }
    }

    /// Builder-style property setter. Names are checked when the node is created.
    pub fn prop(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.properties.insert(name.to_string(), value.into());
        self
    }

    pub fn removal_policy(mut self, policy: RemovalPolicy) -> Self {
        self.removal_policy = Some(policy);
        self
    }
}

/// A stack output declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct CfnOutput {
    pub value: Value,
    pub description: Option<String>,
    pub export_name: Option<String>,
}

/// What a node is.
#[derive(Debug, Clone, PartialEq)]
pub enum ConstructKind {
    /// The root of a tree.
    Stack,
    /// A grouping node that synthesizes nothing itself.
    Scope,
    Resource(CfnResource),
    Output(CfnOutput),
}

impl ConstructKind {
    pub fn label(&self) -> &str {
        match self {
            Self::Stack => "stack",
            Self::Scope => "scope",
            Self::Resource(r) => r.kind.type_tag(),
            Self::Output(_) => "output",
        }
    }
}

/// One node.
#[derive(Debug, Clone)]
pub struct Node {
    pub id: String,
    pub path: String,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    pub kind: ConstructKind,
}

/// The whole tree plus the tokens registered while building it.
#[derive(Debug)]
pub struct ConstructTree {
    nodes: Vec<Node>,
    tokens: TokenRegistry,
}

impl ConstructTree {
    /// Start a fresh tree rooted at a stack.
    pub fn new(stack_name: &str) -> Self {
        Self {
            nodes: vec![Node {
                id: stack_name.to_string(),
                path: stack_name.to_string(),
                parent: None,
                children: Vec::new(),
                kind: ConstructKind::Stack,
            }],
            tokens: TokenRegistry::new(),
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn stack_name(&self) -> &str {
        &self.nodes[0].id
    }

    /// Create a node under `parent` and append it to the parent's children.
    pub fn create(
        &mut self,
        parent: NodeId,
        id: &str,
        kind: ConstructKind,
    ) -> Result<NodeId, SynthError> {
        validate_id(id)?;
        let parent_node = self.node(parent);
        if parent_node
            .children
            .iter()
            .any(|c| self.nodes[c.0].id == id)
        {
            return Err(SynthError::DuplicatePath {
                parent: parent_node.path.clone(),
                id: id.to_string(),
            });
        }
        let path = format!("{}/{}", parent_node.path, id);

        if let ConstructKind::Resource(ref resource) = kind {
            for name in resource.properties.keys() {
                check_option(&resource.kind, name, &path)?;
            }
        }

        let node_id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            id: id.to_string(),
            path,
            parent: Some(parent),
            children: Vec::new(),
            kind,
        });
        self.nodes[parent.0].children.push(node_id);
        Ok(node_id)
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    pub fn path(&self, id: NodeId) -> &str {
        &self.nodes[id.0].path
    }

    /// Ordered children.
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    /// Find a node by full path (`Stack/VPC/PublicSubnet1`) or by path
    /// relative to the stack (`VPC/PublicSubnet1`).
    pub fn find(&self, path: &str) -> Option<NodeId> {
        let full = if path == self.stack_name() || path.starts_with(&format!("{}/", self.stack_name())) {
            path.to_string()
        } else {
            format!("{}/{}", self.stack_name(), path)
        };
        self.nodes.iter().position(|n| n.path == full).map(NodeId)
    }

    /// Every node, parent before children, children in insertion order.
    pub fn walk(&self) -> Vec<NodeId> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![self.root()];
        while let Some(current) = stack.pop() {
            order.push(current);
            for child in self.children(current).iter().rev() {
                stack.push(*child);
            }
        }
        order
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Logical ID derived from the node's path below the stack.
    pub fn logical_id(&self, id: NodeId) -> String {
        let path = self.path(id);
        let relative = path
            .strip_prefix(self.stack_name())
            .unwrap_or(path)
            .trim_start_matches('/');
        logical_id::from_path(relative)
    }

    /// Set (or replace) one property of a resource node.
    pub fn set_property(
        &mut self,
        id: NodeId,
        name: &str,
        value: impl Into<Value>,
    ) -> Result<(), SynthError> {
        let path = self.path(id).to_string();
        let resource = self.resource_mut(id)?;
        check_option(&resource.kind, name, &path)?;
        resource.properties.insert(name.to_string(), value.into());
        Ok(())
    }

    /// Record that `from` must be deployed after `to`.
    pub fn add_dependency(&mut self, from: NodeId, to: NodeId) -> Result<(), SynthError> {
        let resource = self.resource_mut(from)?;
        if !resource.depends_on.contains(&to) {
            resource.depends_on.push(to);
        }
        Ok(())
    }

    pub fn resource(&self, id: NodeId) -> Option<&CfnResource> {
        match &self.node(id).kind {
            ConstructKind::Resource(r) => Some(r),
            _ => None,
        }
    }

    fn resource_mut(&mut self, id: NodeId) -> Result<&mut CfnResource, SynthError> {
        let node = &mut self.nodes[id.0];
        match &mut node.kind {
            ConstructKind::Resource(r) => Ok(r),
            _ => Err(SynthError::invalid(
                node.path.clone(),
                "construct is not a resource",
            )),
        }
    }

    /// Register a deferred value.
    pub fn defer<F>(&mut self, hint: &str, producer: F) -> Value
    where
        F: Fn() -> Result<Value, SynthError> + 'static,
    {
        self.tokens.defer(Some(hint), producer)
    }

    pub fn tokens(&self) -> &TokenRegistry {
        &self.tokens
    }

    /// Indented rendering of the tree, one node per line.
    pub fn render(&self) -> String {
        let mut out = String::new();
        self.render_node(self.root(), 0, &mut out);
        out
    }

    fn render_node(&self, id: NodeId, depth: usize, out: &mut String) {
        let node = self.node(id);
        out.push_str(&format!("{}{} ({})\n", "  ".repeat(depth), node.id, node.kind.label()));
        for child in &node.children {
            self.render_node(*child, depth + 1, out);
        }
    }
}

fn validate_id(id: &str) -> Result<(), SynthError> {
    let reason = if id.is_empty() {
        "must not be empty"
    } else if id.contains('/') {
        "must not contain '/'"
    } else {
        return Ok(());
    };
    Err(SynthError::InvalidConstructId {
        id: id.to_string(),
        reason: reason.to_string(),
    })
}

fn check_option(kind: &ResourceKind, name: &str, path: &str) -> Result<(), SynthError> {
    if kind.accepts(name) {
        Ok(())
    } else {
        Err(SynthError::UnrecognizedOption {
            path: path.to_string(),
            option: name.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tree_create_paths() {
        let mut tree = ConstructTree::new("Stack");
        let vpc = tree.create(tree.root(), "VPC", ConstructKind::Scope).unwrap();
        let subnet = tree.create(vpc, "PublicSubnet1", ConstructKind::Scope).unwrap();
        assert_eq!(tree.path(subnet), "Stack/VPC/PublicSubnet1");
        assert_eq!(tree.node(subnet).parent, Some(vpc));
        assert_eq!(tree.find("VPC/PublicSubnet1"), Some(subnet));
        assert_eq!(tree.find("Stack/VPC"), Some(vpc));
        assert_eq!(tree.find("Stack"), Some(tree.root()));
        assert!(tree.find("Nope").is_none());
    }

    #[test]
    fn test_tree_duplicate_sibling() {
        let mut tree = ConstructTree::new("Stack");
        tree.create(tree.root(), "VPC", ConstructKind::Scope).unwrap();
        let err = tree
            .create(tree.root(), "VPC", ConstructKind::Scope)
            .unwrap_err();
        assert_eq!(
            err,
            SynthError::DuplicatePath {
                parent: "Stack".to_string(),
                id: "VPC".to_string()
            }
        );
    }

    #[test]
    fn test_tree_same_id_under_different_parents() {
        let mut tree = ConstructTree::new("Stack");
        let a = tree.create(tree.root(), "A", ConstructKind::Scope).unwrap();
        let b = tree.create(tree.root(), "B", ConstructKind::Scope).unwrap();
        tree.create(a, "Resource", ConstructKind::Scope).unwrap();
        tree.create(b, "Resource", ConstructKind::Scope).unwrap();
        assert_eq!(tree.len(), 5);
    }

    #[test]
    fn test_tree_invalid_ids() {
        let mut tree = ConstructTree::new("Stack");
        assert!(matches!(
            tree.create(tree.root(), "", ConstructKind::Scope),
            Err(SynthError::InvalidConstructId { .. })
        ));
        assert!(matches!(
            tree.create(tree.root(), "a/b", ConstructKind::Scope),
            Err(SynthError::InvalidConstructId { .. })
        ));
    }

    #[test]
    fn test_tree_children_preserve_insertion_order() {
        let mut tree = ConstructTree::new("Stack");
        let ids: Vec<_> = ["Zeta", "Alpha", "Mid"]
            .iter()
            .map(|id| tree.create(tree.root(), id, ConstructKind::Scope).unwrap())
            .collect();
        assert_eq!(tree.children(tree.root()), ids.as_slice());
    }

    #[test]
    fn test_tree_walk_parent_first() {
        let mut tree = ConstructTree::new("Stack");
        let a = tree.create(tree.root(), "A", ConstructKind::Scope).unwrap();
        let a1 = tree.create(a, "A1", ConstructKind::Scope).unwrap();
        let b = tree.create(tree.root(), "B", ConstructKind::Scope).unwrap();
        let a2 = tree.create(a, "A2", ConstructKind::Scope).unwrap();
        assert_eq!(tree.walk(), vec![tree.root(), a, a1, a2, b]);
    }

    #[test]
    fn test_tree_rejects_unrecognized_property() {
        let mut tree = ConstructTree::new("Stack");
        let resource = CfnResource::new(ResourceKind::RedshiftClusterSubnetGroup)
            .prop("Description", "x")
            .prop("Colour", "blue");
        let err = tree
            .create(tree.root(), "Group", ConstructKind::Resource(resource))
            .unwrap_err();
        assert_eq!(
            err,
            SynthError::UnrecognizedOption {
                path: "Stack/Group".to_string(),
                option: "Colour".to_string()
            }
        );
        // Nothing was attached
        assert!(tree.children(tree.root()).is_empty());
    }

    #[test]
    fn test_tree_set_property_checks_schema() {
        let mut tree = ConstructTree::new("Stack");
        let node = tree
            .create(
                tree.root(),
                "Group",
                ConstructKind::Resource(CfnResource::new(ResourceKind::RedshiftClusterSubnetGroup)),
            )
            .unwrap();
        tree.set_property(node, "Description", "MyGroup").unwrap();
        assert!(tree.set_property(node, "Bogus", 1i64).is_err());
        assert_eq!(
            tree.resource(node).unwrap().properties["Description"],
            Value::from("MyGroup")
        );

        let scope = tree.create(tree.root(), "Scope", ConstructKind::Scope).unwrap();
        assert!(tree.set_property(scope, "Description", "x").is_err());
    }

    #[test]
    fn test_tree_add_dependency_dedups() {
        let mut tree = ConstructTree::new("Stack");
        let kind = || ConstructKind::Resource(CfnResource::new(ResourceKind::EcsCluster));
        let a = tree.create(tree.root(), "A", kind()).unwrap();
        let b = tree.create(tree.root(), "B", kind()).unwrap();
        tree.add_dependency(a, b).unwrap();
        tree.add_dependency(a, b).unwrap();
        assert_eq!(tree.resource(a).unwrap().depends_on, vec![b]);
    }

    #[test]
    fn test_tree_logical_id_relative_to_stack() {
        let mut tree = ConstructTree::new("Stack");
        let vpc = tree.create(tree.root(), "VPC", ConstructKind::Scope).unwrap();
        let res = tree.create(vpc, "Resource", ConstructKind::Scope).unwrap();
        assert_eq!(tree.logical_id(vpc), "VPC");
        assert_eq!(tree.logical_id(res), logical_id::allocate(&["VPC", "Resource"]));
    }

    #[test]
    fn test_tree_render() {
        let mut tree = ConstructTree::new("Stack");
        let vpc = tree.create(tree.root(), "VPC", ConstructKind::Scope).unwrap();
        tree.create(
            vpc,
            "Resource",
            ConstructKind::Resource(CfnResource::new(ResourceKind::Ec2Vpc)),
        )
        .unwrap();
        assert_eq!(
            tree.render(),
            "Stack (stack)\n  VPC (scope)\n    Resource (AWS::EC2::VPC)\n"
        );
    }
}
