//! Stack manifest parsing and validation.
//!
//! Parses `stack.yaml` and validates structural constraints:
//! - Version must be "1.0"
//! - Unknown keys on the root or on a construct are rejected
//! - Construct references must name an earlier construct of the right type
//! - Listener references must exist on the referenced load balancer

use std::path::Path;

use indexmap::IndexMap;

use super::error::SynthError;
use super::manifest::{ConstructSpec, StackManifest};

const ROOT_KEYS: &[&str] = &["version", "stack", "description", "constructs"];

/// Validation error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

/// Parse a stack manifest file from disk.
pub fn parse_manifest_file(path: &Path) -> Result<StackManifest, SynthError> {
    let content = std::fs::read_to_string(path).map_err(|e| SynthError::io(path, e))?;
    parse_manifest(&content)
}

/// Parse a stack manifest from a string.
pub fn parse_manifest(yaml: &str) -> Result<StackManifest, SynthError> {
    let raw: serde_yaml_ng::Value = serde_yaml_ng::from_str(yaml)
        .map_err(|e| SynthError::Manifest(format!("YAML parse error: {}", e)))?;
    check_keys(&raw)?;
    serde_yaml_ng::from_value(raw).map_err(|e| SynthError::Manifest(e.to_string()))
}

/// Reject keys the manifest format does not know, naming the construct path.
fn check_keys(raw: &serde_yaml_ng::Value) -> Result<(), SynthError> {
    let root = raw
        .as_mapping()
        .ok_or_else(|| SynthError::Manifest("manifest must be a mapping".to_string()))?;
    let stack = root
        .get("stack")
        .and_then(|s| s.as_str())
        .unwrap_or("<stack>");

    for key in root.keys() {
        let key = key_str(key)?;
        if !ROOT_KEYS.contains(&key) {
            return Err(SynthError::UnrecognizedOption {
                path: stack.to_string(),
                option: key.to_string(),
            });
        }
    }

    let Some(constructs) = root.get("constructs").and_then(|c| c.as_mapping()) else {
        return Ok(());
    };
    for (id, body) in constructs {
        let id = key_str(id)?;
        let path = format!("{}/{}", stack, id);
        let entry = body
            .as_mapping()
            .ok_or_else(|| SynthError::Manifest(format!("{}: construct must be a mapping", path)))?;
        let kind = entry
            .get("type")
            .and_then(|t| t.as_str())
            .ok_or_else(|| SynthError::MissingRequiredProperty {
                path: path.clone(),
                property: "type".to_string(),
            })?;
        let accepted = ConstructSpec::accepted_keys(kind).ok_or_else(|| {
            SynthError::Manifest(format!("{}: unknown construct type '{}'", path, kind))
        })?;
        for key in entry.keys() {
            let key = key_str(key)?;
            if !accepted.contains(&key) {
                return Err(SynthError::UnrecognizedOption {
                    path,
                    option: key.to_string(),
                });
            }
        }
    }
    Ok(())
}

fn key_str(key: &serde_yaml_ng::Value) -> Result<&str, SynthError> {
    key.as_str()
        .ok_or_else(|| SynthError::Manifest(format!("non-string key {:?}", key)))
}

/// Validate a parsed manifest. Returns a list of errors (empty = valid).
pub fn validate_manifest(manifest: &StackManifest) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    let mut push = |message: String| errors.push(ValidationError { message });

    if manifest.version != "1.0" {
        push(format!("version must be \"1.0\", got \"{}\"", manifest.version));
    }
    if manifest.stack.is_empty() || manifest.stack.contains('/') {
        push(format!(
            "stack name '{}' must be non-empty and must not contain '/'",
            manifest.stack
        ));
    }

    let positions: IndexMap<&str, (usize, &ConstructSpec)> = manifest
        .constructs
        .iter()
        .enumerate()
        .map(|(i, (id, spec))| (id.as_str(), (i, spec)))
        .collect();

    for (index, (id, spec)) in manifest.constructs.iter().enumerate() {
        if id.is_empty() || id.contains('/') {
            push(format!("construct id '{}' must be non-empty and must not contain '/'", id));
        }

        for (field, target) in spec.references() {
            match positions.get(target) {
                None => push(format!(
                    "construct '{}' {} references unknown construct '{}'",
                    id, field, target
                )),
                Some((_, _)) if target == id => {
                    push(format!("construct '{}' references itself", id))
                }
                Some((pos, _)) if *pos > index => push(format!(
                    "construct '{}' references '{}', which is declared after it",
                    id, target
                )),
                Some((_, target_spec)) => {
                    if let Some(expected) = expected_kind(field) {
                        if target_spec.kind() != expected {
                            push(format!(
                                "construct '{}' {} must name a {}, '{}' is a {}",
                                id,
                                field,
                                expected,
                                target,
                                target_spec.kind()
                            ));
                        }
                    }
                }
            }
        }

        if let ConstructSpec::FargateService(service) = spec {
            for target in &service.load_balancer_targets {
                let listener_known = match positions.get(target.load_balancer.as_str()) {
                    Some((_, ConstructSpec::NetworkLoadBalancer(lb))) => {
                        lb.listeners.contains_key(&target.listener)
                    }
                    _ => continue,
                };
                if !listener_known {
                    push(format!(
                        "construct '{}' targets unknown listener '{}' on '{}'",
                        id, target.listener, target.load_balancer
                    ));
                }
            }
        }
    }

    errors
}

fn expected_kind(field: &str) -> Option<&'static str> {
    match field {
        "vpc" => Some("vpc"),
        "cluster" => Some("ecs_cluster"),
        "task_definition" => Some("fargate_task_definition"),
        "load_balancer" => Some("network_load_balancer"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID: &str = r#"
version: "1.0"
stack: Demo
constructs:
  VPC:
    type: vpc
  Group:
    type: cluster_subnet_group
    description: MyGroup
    vpc: VPC
    vpc_subnets:
      subnet_type: public
"#;

    #[test]
    fn test_parser_parse_valid() {
        let manifest = parse_manifest(VALID).unwrap();
        assert_eq!(manifest.stack, "Demo");
        assert_eq!(manifest.constructs.len(), 2);
        assert_eq!(manifest.constructs["Group"].kind(), "cluster_subnet_group");
        let errors = validate_manifest(&manifest);
        assert!(errors.is_empty(), "unexpected errors: {:?}", errors);
    }

    #[test]
    fn test_parser_bad_version() {
        let manifest = parse_manifest("version: \"2.0\"\nstack: Demo\n").unwrap();
        let errors = validate_manifest(&manifest);
        assert!(errors.iter().any(|e| e.message.contains("version")));
    }

    #[test]
    fn test_parser_unknown_construct_option() {
        let yaml = r#"
version: "1.0"
stack: Demo
constructs:
  Group:
    type: cluster_subnet_group
    description: MyGroup
    vpc: VPC
    colour: blue
"#;
        assert_eq!(
            parse_manifest(yaml).unwrap_err(),
            SynthError::UnrecognizedOption {
                path: "Demo/Group".to_string(),
                option: "colour".to_string()
            }
        );
    }

    #[test]
    fn test_parser_unknown_root_option() {
        let err = parse_manifest("version: \"1.0\"\nstack: Demo\nregion: x\n").unwrap_err();
        assert!(matches!(err, SynthError::UnrecognizedOption { ref option, .. } if option == "region"));
    }

    #[test]
    fn test_parser_missing_type() {
        let yaml = "version: \"1.0\"\nstack: Demo\nconstructs:\n  VPC:\n    cidr: 10.0.0.0/16\n";
        assert!(matches!(
            parse_manifest(yaml),
            Err(SynthError::MissingRequiredProperty { ref property, .. }) if property == "type"
        ));
    }

    #[test]
    fn test_parser_unknown_type() {
        let yaml = "version: \"1.0\"\nstack: Demo\nconstructs:\n  Q:\n    type: queue\n";
        let err = parse_manifest(yaml).unwrap_err();
        assert!(err.to_string().contains("unknown construct type 'queue'"));
    }

    #[test]
    fn test_parser_unknown_reference() {
        let yaml = r#"
version: "1.0"
stack: Demo
constructs:
  Group:
    type: cluster_subnet_group
    description: MyGroup
    vpc: Ghost
"#;
        let errors = validate_manifest(&parse_manifest(yaml).unwrap());
        assert!(errors.iter().any(|e| e.message.contains("unknown construct 'Ghost'")));
    }

    #[test]
    fn test_parser_forward_and_wrong_kind_references() {
        let yaml = r#"
version: "1.0"
stack: Demo
constructs:
  Cluster:
    type: ecs_cluster
    vpc: VPC
  VPC:
    type: vpc
  Other:
    type: ecs_cluster
    vpc: Cluster
"#;
        let errors = validate_manifest(&parse_manifest(yaml).unwrap());
        assert!(errors.iter().any(|e| e.message.contains("declared after")));
        assert!(errors.iter().any(|e| e.message.contains("must name a vpc")));
    }

    #[test]
    fn test_parser_unknown_listener() {
        let yaml = r#"
version: "1.0"
stack: Demo
constructs:
  VPC:
    type: vpc
  Cluster:
    type: ecs_cluster
    vpc: VPC
  TaskDef:
    type: fargate_task_definition
  LB:
    type: network_load_balancer
    vpc: VPC
    listeners:
      Public: {}
  Service:
    type: fargate_service
    cluster: Cluster
    task_definition: TaskDef
    load_balancer_targets:
      - container_name: web
        container_port: 80
        load_balancer: LB
        listener: Private
"#;
        let errors = validate_manifest(&parse_manifest(yaml).unwrap());
        assert_eq!(errors.len(), 1, "{:?}", errors);
        assert!(errors[0].message.contains("unknown listener 'Private'"));
    }

    #[test]
    fn test_parser_nested_unknown_field() {
        let yaml = r#"
version: "1.0"
stack: Demo
constructs:
  TaskDef:
    type: fargate_task_definition
    containers:
      web:
        image: nginx
        ports: [80]
"#;
        assert!(matches!(parse_manifest(yaml), Err(SynthError::Manifest(_))));
    }

    #[test]
    fn test_parser_parse_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stack.yaml");
        std::fs::write(&path, VALID).unwrap();
        let manifest = parse_manifest_file(&path).unwrap();
        assert_eq!(manifest.stack, "Demo");

        let missing = parse_manifest_file(&dir.path().join("nope.yaml")).unwrap_err();
        assert!(matches!(missing, SynthError::Io { .. }));
    }

    #[test]
    fn test_parser_parse_invalid_yaml() {
        assert!(parse_manifest("not: [valid: yaml: {{").is_err());
    }
}
