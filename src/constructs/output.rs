//! Stack outputs.

use crate::core::tree::{CfnOutput, ConstructKind, ConstructTree, NodeId};
use crate::core::types::Value;
use crate::core::SynthError;

#[derive(Debug, Clone, PartialEq)]
pub struct OutputProps {
    pub value: Value,
    pub description: Option<String>,
    pub export_name: Option<String>,
}

impl OutputProps {
    pub fn new(value: Value) -> Self {
        Self {
            value,
            description: None,
            export_name: None,
        }
    }
}

/// Declare an output. Its name in the template is the logical ID of `id`.
pub fn add_output(
    tree: &mut ConstructTree,
    scope: NodeId,
    id: &str,
    props: OutputProps,
) -> Result<NodeId, SynthError> {
    if props.export_name.as_deref() == Some("") {
        return Err(SynthError::invalid(
            format!("{}/{}", tree.path(scope), id),
            "export name must not be empty",
        ));
    }
    tree.create(
        scope,
        id,
        ConstructKind::Output(CfnOutput {
            value: props.value,
            description: props.description,
            export_name: props.export_name,
        }),
    )
}
