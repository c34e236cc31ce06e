//! Token and reference resolution.
//!
//! Rewrites a value into its template form: tokens are invoked and their
//! results resolved again (a token may yield another token), lists and maps
//! are resolved element-wise, and construct references become `Ref` /
//! `Fn::GetAtt` placeholders carrying the target's logical ID. A
//! visiting-set guard turns self-dependent tokens into a `CyclicReference`.

use super::error::SynthError;
use super::token::TokenId;
use super::tree::ConstructTree;
use super::types::Value;
use std::collections::HashSet;

/// Resolves values against one tree.
pub struct Resolver<'a> {
    tree: &'a ConstructTree,
    visiting: HashSet<TokenId>,
}

impl<'a> Resolver<'a> {
    pub fn new(tree: &'a ConstructTree) -> Self {
        Self {
            tree,
            visiting: HashSet::new(),
        }
    }

    /// Resolve a value completely.
    pub fn resolve(&mut self, value: &Value) -> Result<Value, SynthError> {
        match value {
            Value::Token(id) => self.resolve_token(*id),
            Value::NodeRef(node) => Ok(Value::Ref(self.tree.logical_id(*node))),
            Value::NodeAtt(node, attr) => {
                Ok(Value::GetAtt(self.tree.logical_id(*node), attr.clone()))
            }
            Value::List(items) => items
                .iter()
                .map(|item| self.resolve(item))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::List),
            Value::Map(entries) => {
                let mut resolved = indexmap::IndexMap::with_capacity(entries.len());
                for (k, v) in entries {
                    resolved.insert(k.clone(), self.resolve(v)?);
                }
                Ok(Value::Map(resolved))
            }
            Value::Intrinsic(name, args) => {
                Ok(Value::Intrinsic(name.clone(), Box::new(self.resolve(args)?)))
            }
            other => Ok(other.clone()),
        }
    }

    fn resolve_token(&mut self, id: TokenId) -> Result<Value, SynthError> {
        let token = self.tree.tokens().get(id).ok_or_else(|| {
            SynthError::invalid(
                self.tree.stack_name(),
                format!("token {} is not registered on this tree", id.index()),
            )
        })?;
        if !self.visiting.insert(id) {
            return Err(SynthError::CyclicReference {
                token: id.index(),
                hint: token.hint().map(str::to_string),
            });
        }
        tracing::trace!(token = id.index(), hint = ?token.hint(), "resolving token");
        let produced = token.produce();
        let result = produced.and_then(|v| self.resolve(&v));
        self.visiting.remove(&id);
        result
    }
}

/// Resolve a single value against a tree.
pub fn resolve(tree: &ConstructTree, value: &Value) -> Result<Value, SynthError> {
    Resolver::new(tree).resolve(value)
}
