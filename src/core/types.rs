//! Value model, resource records and the template document.
//!
//! Values are the currency of the whole pipeline: constructs hold them
//! unresolved (with `Token`, `NodeRef` and `NodeAtt` placeholders), the
//! resolver rewrites them into concrete values and `Ref`/`Fn::GetAtt`
//! placeholders, and the assembled template only ever contains the latter.

use indexmap::IndexMap;
use serde::ser::{Error as _, SerializeMap, SerializeSeq};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

use super::token::TokenId;
use super::tree::NodeId;

/// Metadata key carrying the construct path of a synthesized record.
pub const PATH_METADATA_KEY: &str = "synthform:path";

// ============================================================================
// Values
// ============================================================================

/// A (possibly unresolved) template value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    /// Any JSON number outside `i64`: floats and large unsigned integers.
    Number(serde_json::Number),
    String(String),
    List(Vec<Value>),
    Map(IndexMap<String, Value>),

    /// `{"Ref": logical-id}`
    Ref(String),

    /// `{"Fn::GetAtt": [logical-id, attribute]}`
    GetAtt(String, String),

    /// Any other intrinsic: `{"Fn::Join": [...]}`, `{"Fn::Select": [...]}`...
    Intrinsic(String, Box<Value>),

    /// Reference to another construct, resolved to `Ref` of its logical ID.
    NodeRef(NodeId),

    /// Attribute of another construct, resolved to `Fn::GetAtt`.
    NodeAtt(NodeId, String),

    /// Deferred value registered on the tree.
    Token(TokenId),
}

impl Value {
    /// Reference to a pseudo parameter such as `AWS::AccountId`.
    pub fn pseudo(name: &str) -> Self {
        Self::Ref(name.to_string())
    }

    /// `Fn::Join` with the given delimiter.
    pub fn join(delimiter: &str, parts: Vec<Value>) -> Self {
        Self::Intrinsic(
            "Fn::Join".to_string(),
            Box::new(Value::List(vec![
                Value::String(delimiter.to_string()),
                Value::List(parts),
            ])),
        )
    }

    /// The n-th availability zone: `Fn::Select [index, Fn::GetAZs ""]`.
    pub fn availability_zone(index: usize) -> Self {
        Self::Intrinsic(
            "Fn::Select".to_string(),
            Box::new(Value::List(vec![
                Value::Int(index as i64),
                Value::Intrinsic(
                    "Fn::GetAZs".to_string(),
                    Box::new(Value::String(String::new())),
                ),
            ])),
        )
    }

    /// Build an ordered map value from key/value pairs.
    pub fn map<K: Into<String>>(entries: impl IntoIterator<Item = (K, Value)>) -> Self {
        Self::Map(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// True once no token or node placeholder remains anywhere inside.
    pub fn is_resolved(&self) -> bool {
        match self {
            Self::Token(_) | Self::NodeRef(_) | Self::NodeAtt(..) => false,
            Self::List(items) => items.iter().all(Value::is_resolved),
            Self::Map(entries) => entries.values().all(Value::is_resolved),
            Self::Intrinsic(_, args) => args.is_resolved(),
            _ => true,
        }
    }

    /// Collect every logical ID this value points at (`Ref` and `GetAtt`).
    pub fn references<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Self::Ref(id) | Self::GetAtt(id, _) => out.push(id),
            Self::List(items) => items.iter().for_each(|v| v.references(out)),
            Self::Map(entries) => entries.values().for_each(|v| v.references(out)),
            Self::Intrinsic(_, args) => args.references(out),
            _ => {}
        }
    }

    /// Render as JSON. Fails on unresolved placeholders.
    pub fn to_json(&self) -> Result<serde_json::Value, super::SynthError> {
        serde_json::to_value(self).map_err(|e| super::SynthError::Serialize(e.to_string()))
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Null => serializer.serialize_unit(),
            Self::Bool(b) => serializer.serialize_bool(*b),
            Self::Int(n) => serializer.serialize_i64(*n),
            Self::Number(n) => n.serialize(serializer),
            Self::String(s) => serializer.serialize_str(s),
            Self::List(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Self::Map(entries) => {
                let mut map = serializer.serialize_map(Some(entries.len()))?;
                for (k, v) in entries {
                    map.serialize_entry(k, v)?;
                }
                map.end()
            }
            Self::Ref(id) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("Ref", id)?;
                map.end()
            }
            Self::GetAtt(id, attr) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("Fn::GetAtt", &[id, attr])?;
                map.end()
            }
            Self::Intrinsic(name, args) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry(name, args)?;
                map.end()
            }
            Self::NodeRef(_) | Self::NodeAtt(..) | Self::Token(_) => Err(S::Error::custom(
                format!("cannot serialize unresolved value {}", self),
            )),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Bool(b) => write!(f, "{}", b),
            Self::Int(n) => write!(f, "{}", n),
            Self::Number(n) => write!(f, "{}", n),
            Self::String(s) => write!(f, "{:?}", s),
            Self::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            Self::Map(entries) => {
                write!(f, "{{")?;
                for (i, (k, v)) in entries.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", k, v)?;
                }
                write!(f, "}}")
            }
            Self::Ref(id) => write!(f, "{{Ref: {}}}", id),
            Self::GetAtt(id, attr) => write!(f, "{{Fn::GetAtt: [{}, {}]}}", id, attr),
            Self::Intrinsic(name, args) => write!(f, "{{{}: {}}}", name, args),
            Self::NodeRef(node) => write!(f, "${{node:{}}}", node.index()),
            Self::NodeAtt(node, attr) => write!(f, "${{node:{}.{}}}", node.index(), attr),
            Self::Token(token) => write!(f, "${{token:{}}}", token.index()),
        }
    }
}

/// Convert JSON into a value, recognizing intrinsic shapes.
///
/// A single-key object `{"Ref": x}` becomes [`Value::Ref`],
/// `{"Fn::GetAtt": [a, b]}` becomes [`Value::GetAtt`], and any other
/// single-key object whose key starts with `Fn::` becomes an intrinsic.
impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Self::Int(i),
                None => Self::Number(n),
            },
            serde_json::Value::String(s) => Self::String(s),
            serde_json::Value::Array(items) => {
                Self::List(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(obj) => {
                if obj.len() == 1 {
                    if let Some((key, inner)) = obj.iter().next() {
                        if let Some(intrinsic) = intrinsic_from_json(key, inner) {
                            return intrinsic;
                        }
                    }
                }
                Self::Map(obj.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
        }
    }
}

fn intrinsic_from_json(key: &str, inner: &serde_json::Value) -> Option<Value> {
    match (key, inner) {
        ("Ref", serde_json::Value::String(id)) => Some(Value::Ref(id.clone())),
        ("Fn::GetAtt", serde_json::Value::Array(parts)) if parts.len() == 2 => {
            match (&parts[0], &parts[1]) {
                (serde_json::Value::String(id), serde_json::Value::String(attr)) => {
                    Some(Value::GetAtt(id.clone(), attr.clone()))
                }
                _ => None,
            }
        }
        (name, args) if name.starts_with("Fn::") => Some(Value::Intrinsic(
            name.to_string(),
            Box::new(Value::from(args.clone())),
        )),
        _ => None,
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Self::Int(n)
    }
}

impl From<u32> for Value {
    fn from(n: u32) -> Self {
        Self::Int(i64::from(n))
    }
}

impl From<u16> for Value {
    fn from(n: u16) -> Self {
        Self::Int(i64::from(n))
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Self::List(items)
    }
}

// ============================================================================
// Enumerations shared by constructs
// ============================================================================

/// Kind of subnet inside a VPC.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, schemars::JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum SubnetType {
    Public,
    Private,
    Isolated,
}

impl fmt::Display for SubnetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Public => write!(f, "Public"),
            Self::Private => write!(f, "Private"),
            Self::Isolated => write!(f, "Isolated"),
        }
    }
}

/// What happens to a resource when it leaves the template.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema,
)]
pub enum RemovalPolicy {
    #[serde(alias = "retain")]
    Retain,
    #[serde(alias = "delete")]
    Delete,
    #[serde(alias = "snapshot")]
    Snapshot,
}

impl fmt::Display for RemovalPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Retain => write!(f, "Retain"),
            Self::Delete => write!(f, "Delete"),
            Self::Snapshot => write!(f, "Snapshot"),
        }
    }
}

// ============================================================================
// Template document
// ============================================================================

/// Construct metadata attached to every record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordMetadata {
    #[serde(rename = "synthform:path")]
    pub path: String,
}

/// One synthesized resource.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResourceRecord {
    #[serde(skip)]
    pub logical_id: String,

    #[serde(rename = "Type")]
    pub resource_type: String,

    #[serde(rename = "Properties", skip_serializing_if = "IndexMap::is_empty")]
    pub properties: IndexMap<String, Value>,

    #[serde(rename = "DependsOn", skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<String>,

    #[serde(rename = "UpdateReplacePolicy", skip_serializing_if = "Option::is_none")]
    pub update_replace_policy: Option<RemovalPolicy>,

    #[serde(rename = "DeletionPolicy", skip_serializing_if = "Option::is_none")]
    pub deletion_policy: Option<RemovalPolicy>,

    #[serde(rename = "Metadata")]
    pub metadata: RecordMetadata,
}

impl ResourceRecord {
    /// Construct path that produced this record.
    pub fn path(&self) -> &str {
        &self.metadata.path
    }

    /// The whole record as a value, shaped like its serialized form.
    pub fn to_value(&self) -> Value {
        let mut entries = IndexMap::new();
        entries.insert("Type".to_string(), Value::String(self.resource_type.clone()));
        if !self.properties.is_empty() {
            entries.insert("Properties".to_string(), Value::Map(self.properties.clone()));
        }
        if !self.depends_on.is_empty() {
            entries.insert(
                "DependsOn".to_string(),
                Value::List(self.depends_on.iter().cloned().map(Value::String).collect()),
            );
        }
        if let Some(policy) = self.update_replace_policy {
            entries.insert("UpdateReplacePolicy".to_string(), Value::String(policy.to_string()));
        }
        if let Some(policy) = self.deletion_policy {
            entries.insert("DeletionPolicy".to_string(), Value::String(policy.to_string()));
        }
        Value::Map(entries)
    }
}

/// One stack output.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutputRecord {
    #[serde(rename = "Description", skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(rename = "Value")]
    pub value: Value,

    #[serde(rename = "Export", skip_serializing_if = "Option::is_none")]
    pub export: Option<OutputExport>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutputExport {
    #[serde(rename = "Name")]
    pub name: String,
}

/// The assembled document: logical ID → record, plus outputs.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Template {
    #[serde(rename = "Resources")]
    pub resources: IndexMap<String, ResourceRecord>,

    #[serde(rename = "Outputs", skip_serializing_if = "IndexMap::is_empty")]
    pub outputs: IndexMap<String, OutputRecord>,
}

impl Template {
    /// Pretty JSON, stable across runs.
    pub fn to_json_string(&self) -> Result<String, super::SynthError> {
        serde_json::to_string_pretty(self).map_err(|e| super::SynthError::Serialize(e.to_string()))
    }

    pub fn to_yaml_string(&self) -> Result<String, super::SynthError> {
        serde_yaml_ng::to_string(self).map_err(|e| super::SynthError::Serialize(e.to_string()))
    }

    /// Load a previously written JSON template.
    pub fn from_json_str(json: &str) -> Result<Self, super::SynthError> {
        let doc: serde_json::Value = serde_json::from_str(json)
            .map_err(|e| super::SynthError::Manifest(format!("template parse error: {}", e)))?;
        let mut template = Template::default();

        if let Some(resources) = doc.get("Resources").and_then(|r| r.as_object()) {
            for (logical_id, body) in resources {
                template
                    .resources
                    .insert(logical_id.clone(), record_from_json(logical_id, body)?);
            }
        }
        if let Some(outputs) = doc.get("Outputs").and_then(|o| o.as_object()) {
            for (name, body) in outputs {
                let value = body.get("Value").cloned().unwrap_or(serde_json::Value::Null);
                template.outputs.insert(
                    name.clone(),
                    OutputRecord {
                        description: body
                            .get("Description")
                            .and_then(|d| d.as_str())
                            .map(str::to_string),
                        value: Value::from(value),
                        export: body
                            .pointer("/Export/Name")
                            .and_then(|n| n.as_str())
                            .map(|n| OutputExport { name: n.to_string() }),
                    },
                );
            }
        }
        Ok(template)
    }

    /// Records of one resource type, in document order.
    pub fn resources_of_type<'a>(
        &'a self,
        resource_type: &'a str,
    ) -> impl Iterator<Item = &'a ResourceRecord> + 'a {
        self.resources
            .values()
            .filter(move |r| r.resource_type == resource_type)
    }

    /// Logical ID of the record synthesized from a construct path.
    pub fn logical_id_for_path(&self, path: &str) -> Option<&str> {
        self.resources
            .values()
            .find(|r| r.path() == path)
            .map(|r| r.logical_id.as_str())
    }
}

fn record_from_json(
    logical_id: &str,
    body: &serde_json::Value,
) -> Result<ResourceRecord, super::SynthError> {
    let resource_type = body
        .get("Type")
        .and_then(|t| t.as_str())
        .ok_or_else(|| {
            super::SynthError::Manifest(format!("resource '{}' has no Type", logical_id))
        })?;
    let properties = match body.get("Properties") {
        Some(serde_json::Value::Object(props)) => props
            .iter()
            .map(|(k, v)| (k.clone(), Value::from(v.clone())))
            .collect(),
        _ => IndexMap::new(),
    };
    let depends_on = match body.get("DependsOn") {
        Some(serde_json::Value::String(s)) => vec![s.clone()],
        Some(serde_json::Value::Array(items)) => items
            .iter()
            .filter_map(|i| i.as_str().map(str::to_string))
            .collect(),
        _ => Vec::new(),
    };
    let policy = |key: &str| {
        body.get(key)
            .and_then(|p| serde_json::from_value::<RemovalPolicy>(p.clone()).ok())
    };
    Ok(ResourceRecord {
        logical_id: logical_id.to_string(),
        resource_type: resource_type.to_string(),
        properties,
        depends_on,
        update_replace_policy: policy("UpdateReplacePolicy"),
        deletion_policy: policy("DeletionPolicy"),
        metadata: RecordMetadata {
            path: body
                .get("Metadata")
                .and_then(|m| m.get(PATH_METADATA_KEY))
                .and_then(|p| p.as_str())
                .unwrap_or_default()
                .to_string(),
        },
    })
}

// ============================================================================
// Tests
// ============================================================================
