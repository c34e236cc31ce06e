//! Assertions over an assembled template.

use indexmap::IndexMap;

use super::matcher::mismatches;
use crate::core::assembler::assemble;
use crate::core::tree::ConstructTree;
use crate::core::types::{ResourceRecord, Template, Value};
use crate::core::SynthError;

/// Check that some record of `resource_type` has properties matching
/// `expected`. On failure the error describes the nearest record.
pub fn has_resource_properties(
    template: &Template,
    resource_type: &str,
    expected: &Value,
) -> Result<(), SynthError> {
    best_match(template, resource_type, expected, |r| Value::Map(r.properties.clone()))
}

/// Same as [`has_resource_properties`] but against the whole record
/// (`Properties`, `DependsOn`, `DeletionPolicy`, `UpdateReplacePolicy`).
pub fn has_resource(
    template: &Template,
    resource_type: &str,
    expected: &Value,
) -> Result<(), SynthError> {
    best_match(template, resource_type, expected, ResourceRecord::to_value)
}

fn best_match(
    template: &Template,
    resource_type: &str,
    expected: &Value,
    shape: impl Fn(&ResourceRecord) -> Value,
) -> Result<(), SynthError> {
    let mut nearest: Option<(&ResourceRecord, Vec<String>)> = None;
    for record in template.resources_of_type(resource_type) {
        let found = mismatches(template, expected, &shape(record));
        if found.is_empty() {
            return Ok(());
        }
        if nearest.as_ref().map_or(true, |(_, best)| found.len() < best.len()) {
            nearest = Some((record, found));
        }
    }

    match nearest {
        None => Err(SynthError::AssertionMismatch(format!(
            "template has no resources of type {}",
            resource_type
        ))),
        Some((record, found)) => Err(SynthError::AssertionMismatch(format!(
            "no {} resource matches; nearest is {} ({}) with {} mismatch(es):\n  {}",
            resource_type,
            record.logical_id,
            record.path(),
            found.len(),
            found.join("\n  ")
        ))),
    }
}

/// Assertion helper owning an assembled template. Expected fragments are
/// written as JSON; `{"Ref": ..}` and `{"Fn::GetAtt": [..]}` may name a
/// logical ID, a full construct path, or the path below the stack.
#[derive(Debug, Clone)]
pub struct TemplateAssert {
    template: Template,
}

impl TemplateAssert {
    /// Assemble `tree` and wrap the result.
    pub fn from_tree(tree: &ConstructTree) -> Result<Self, SynthError> {
        assemble(tree).map(Self::from_template)
    }

    pub fn from_template(template: Template) -> Self {
        Self { template }
    }

    pub fn template(&self) -> &Template {
        &self.template
    }

    pub fn has_resource_properties(
        &self,
        resource_type: &str,
        expected: serde_json::Value,
    ) -> Result<(), SynthError> {
        has_resource_properties(&self.template, resource_type, &Value::from(expected))
    }

    pub fn has_resource(
        &self,
        resource_type: &str,
        expected: serde_json::Value,
    ) -> Result<(), SynthError> {
        has_resource(&self.template, resource_type, &Value::from(expected))
    }

    pub fn resource_count_is(&self, resource_type: &str, count: usize) -> Result<(), SynthError> {
        let actual = self.template.resources_of_type(resource_type).count();
        if actual == count {
            Ok(())
        } else {
            Err(SynthError::AssertionMismatch(format!(
                "expected {} resource(s) of type {}, found {}",
                count, resource_type, actual
            )))
        }
    }

    /// Records of `resource_type` whose properties match `expected`, keyed by
    /// logical ID.
    pub fn find_resources<'a>(
        &'a self,
        resource_type: &'a str,
        expected: serde_json::Value,
    ) -> IndexMap<&'a str, &'a ResourceRecord> {
        let expected = Value::from(expected);
        self.template
            .resources_of_type(resource_type)
            .filter(|r| {
                mismatches(&self.template, &expected, &Value::Map(r.properties.clone())).is_empty()
            })
            .map(|r| (r.logical_id.as_str(), r))
            .collect()
    }

    /// Check an output matches `expected` (`Value`, `Description`, `Export`).
    pub fn has_output(&self, name: &str, expected: serde_json::Value) -> Result<(), SynthError> {
        let output = self.template.outputs.get(name).ok_or_else(|| {
            SynthError::AssertionMismatch(format!("template has no output named {}", name))
        })?;
        let mut actual = IndexMap::new();
        if let Some(description) = &output.description {
            actual.insert("Description".to_string(), Value::from(description.as_str()));
        }
        actual.insert("Value".to_string(), output.value.clone());
        if let Some(export) = &output.export {
            actual.insert(
                "Export".to_string(),
                Value::map([("Name", Value::from(export.name.as_str()))]),
            );
        }
        let found = mismatches(&self.template, &Value::from(expected), &Value::Map(actual));
        if found.is_empty() {
            Ok(())
        } else {
            Err(SynthError::AssertionMismatch(format!(
                "output {} does not match:\n  {}",
                name,
                found.join("\n  ")
            )))
        }
    }
}
