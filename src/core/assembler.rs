//! Template assembly.
//!
//! Walks the tree parent-first (children in insertion order), synthesizes
//! every resource and output exactly once, then checks that each `Ref`,
//! `Fn::GetAtt` and `DependsOn` target names a record of the same document.
//! Pseudo parameters (`AWS::*`) are exempt. Any failure discards the whole
//! document.

use super::error::SynthError;
use super::synth;
use super::tree::ConstructTree;
use super::types::{ResourceRecord, Template};
use indexmap::IndexMap;

const PSEUDO_PREFIX: &str = "AWS::";

/// Assemble the template of a tree.
pub fn assemble(tree: &ConstructTree) -> Result<Template, SynthError> {
    let mut template = Template::default();
    let mut output_paths: IndexMap<String, String> = IndexMap::new();

    for node in tree.walk() {
        if let Some(record) = synth::synthesize(tree, node)? {
            tracing::debug!(path = record.path(), logical_id = %record.logical_id, "synthesized");
            if let Some(existing) = template.resources.get(&record.logical_id) {
                return Err(SynthError::LogicalIdCollision {
                    logical_id: record.logical_id.clone(),
                    first: existing.path().to_string(),
                    second: record.path().to_string(),
                });
            }
            template.resources.insert(record.logical_id.clone(), record);
        } else if let Some((name, output)) = synth::synthesize_output(tree, node)? {
            let path = tree.path(node).to_string();
            if let Some(first) = output_paths.get(&name) {
                return Err(SynthError::LogicalIdCollision {
                    logical_id: name,
                    first: first.clone(),
                    second: path,
                });
            }
            output_paths.insert(name.clone(), path);
            template.outputs.insert(name, output);
        }
    }

    check_references(&template)?;
    tracing::info!(
        stack = tree.stack_name(),
        resources = template.resources.len(),
        outputs = template.outputs.len(),
        "template assembled"
    );
    Ok(template)
}

/// Referential integrity over an assembled document.
pub fn check_references(template: &Template) -> Result<(), SynthError> {
    for record in template.resources.values() {
        check_record(template, record)?;
    }
    for (name, output) in &template.outputs {
        let mut refs = Vec::new();
        output.value.references(&mut refs);
        for target in refs {
            ensure_present(template, name, target)?;
        }
    }
    Ok(())
}

fn check_record(template: &Template, record: &ResourceRecord) -> Result<(), SynthError> {
    let mut refs = Vec::new();
    for value in record.properties.values() {
        value.references(&mut refs);
    }
    refs.extend(record.depends_on.iter().map(String::as_str));
    for target in refs {
        ensure_present(template, record.path(), target)?;
    }
    Ok(())
}

fn ensure_present(template: &Template, referrer: &str, target: &str) -> Result<(), SynthError> {
    if target.starts_with(PSEUDO_PREFIX) || template.resources.contains_key(target) {
        return Ok(());
    }
    Err(SynthError::DanglingReference {
        referrer: referrer.to_string(),
        target: target.to_string(),
    })
}
