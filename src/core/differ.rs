//! Template diff: compare a previously synthesized document with a new one.
//!
//! Records are matched by logical ID and compared by the BLAKE3 digest of
//! their serialized form. New-document records come first in document order,
//! followed by removals in old-document order.

use std::fmt;

use super::error::SynthError;
use super::hasher;
use super::types::{OutputRecord, ResourceRecord, Template};

/// What happens to one record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeAction {
    Add,
    Update,
    Remove,
    NoOp,
}

impl fmt::Display for ChangeAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Add => write!(f, "+"),
            Self::Update => write!(f, "~"),
            Self::Remove => write!(f, "-"),
            Self::NoOp => write!(f, " "),
        }
    }
}

/// Which part of the document a change belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    Resources,
    Outputs,
}

/// One line of the diff.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateChange {
    pub section: Section,
    pub logical_id: String,
    /// Resource type; `None` for outputs.
    pub resource_type: Option<String>,
    pub action: ChangeAction,
}

impl fmt::Display for TemplateChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.resource_type {
            Some(t) => write!(f, "{} {} ({})", self.action, self.logical_id, t),
            None => write!(f, "{} Outputs.{}", self.action, self.logical_id),
        }
    }
}

/// Full diff with per-action counts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemplateDiff {
    pub changes: Vec<TemplateChange>,
    pub to_add: u32,
    pub to_update: u32,
    pub to_remove: u32,
    pub unchanged: u32,
}

impl TemplateDiff {
    pub fn is_empty(&self) -> bool {
        self.to_add == 0 && self.to_update == 0 && self.to_remove == 0
    }

    fn push(&mut self, change: TemplateChange) {
        match change.action {
            ChangeAction::Add => self.to_add += 1,
            ChangeAction::Update => self.to_update += 1,
            ChangeAction::Remove => self.to_remove += 1,
            ChangeAction::NoOp => self.unchanged += 1,
        }
        self.changes.push(change);
    }
}

/// Digest of a resource record's serialized form.
pub fn hash_record(record: &ResourceRecord) -> Result<String, SynthError> {
    let json = serde_json::to_string(record).map_err(|e| SynthError::Serialize(e.to_string()))?;
    Ok(hasher::composite_hash(&[&record.resource_type, &json]))
}

fn hash_output(output: &OutputRecord) -> Result<String, SynthError> {
    let json = serde_json::to_string(output).map_err(|e| SynthError::Serialize(e.to_string()))?;
    Ok(hasher::hash_string(&json))
}

/// Diff two documents.
pub fn diff(old: &Template, new: &Template) -> Result<TemplateDiff, SynthError> {
    let mut result = TemplateDiff::default();

    for (logical_id, record) in &new.resources {
        let action = match old.resources.get(logical_id) {
            None => ChangeAction::Add,
            Some(prev) if prev.resource_type != record.resource_type => ChangeAction::Update,
            Some(prev) if hash_record(prev)? == hash_record(record)? => ChangeAction::NoOp,
            Some(_) => ChangeAction::Update,
        };
        result.push(TemplateChange {
            section: Section::Resources,
            logical_id: logical_id.clone(),
            resource_type: Some(record.resource_type.clone()),
            action,
        });
    }
    for (logical_id, record) in &old.resources {
        if !new.resources.contains_key(logical_id) {
            result.push(TemplateChange {
                section: Section::Resources,
                logical_id: logical_id.clone(),
                resource_type: Some(record.resource_type.clone()),
                action: ChangeAction::Remove,
            });
        }
    }

    for (name, output) in &new.outputs {
        let action = match old.outputs.get(name) {
            None => ChangeAction::Add,
            Some(prev) if hash_output(prev)? == hash_output(output)? => ChangeAction::NoOp,
            Some(_) => ChangeAction::Update,
        };
        result.push(TemplateChange {
            section: Section::Outputs,
            logical_id: name.clone(),
            resource_type: None,
            action,
        });
    }
    for name in old.outputs.keys() {
        if !new.outputs.contains_key(name) {
            result.push(TemplateChange {
                section: Section::Outputs,
                logical_id: name.clone(),
                resource_type: None,
                action: ChangeAction::Remove,
            });
        }
    }

    tracing::debug!(
        add = result.to_add,
        update = result.to_update,
        remove = result.to_remove,
        "template diff computed"
    );
    Ok(result)
}
