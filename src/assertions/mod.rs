//! Structural assertions over synthesized templates.

pub mod matcher;
pub mod template;

pub use template::{has_resource, has_resource_properties, TemplateAssert};
