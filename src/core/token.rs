//! Deferred values.
//!
//! A token is a zero-argument closure registered on the tree during the
//! build phase and invoked only when the resolver reaches it. Values refer to
//! tokens by [`TokenId`], so a token's closure can hand back another token.

use super::error::SynthError;
use super::types::Value;
use std::fmt;

/// Index of a registered token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TokenId(usize);

impl TokenId {
    pub fn new(index: usize) -> Self {
        Self(index)
    }

    pub fn index(self) -> usize {
        self.0
    }
}

type Producer = Box<dyn Fn() -> Result<Value, SynthError>>;

/// A registered deferred computation.
pub struct Token {
    hint: Option<String>,
    producer: Producer,
}

impl Token {
    pub fn hint(&self) -> Option<&str> {
        self.hint.as_deref()
    }

    /// Invoke the closure. Resolution of the result is the resolver's job.
    pub fn produce(&self) -> Result<Value, SynthError> {
        (self.producer)()
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Token").field("hint", &self.hint).finish_non_exhaustive()
    }
}

/// Owner of every token of one construct tree.
#[derive(Debug, Default)]
pub struct TokenRegistry {
    tokens: Vec<Token>,
}

impl TokenRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a deferred computation without invoking it.
    pub fn defer<F>(&mut self, hint: Option<&str>, producer: F) -> Value
    where
        F: Fn() -> Result<Value, SynthError> + 'static,
    {
        let id = self.next_id();
        self.tokens.push(Token {
            hint: hint.map(str::to_string),
            producer: Box::new(producer),
        });
        Value::Token(id)
    }

    /// Id the next [`defer`](Self::defer) call will hand out.
    pub fn next_id(&self) -> TokenId {
        TokenId(self.tokens.len())
    }

    pub fn get(&self, id: TokenId) -> Option<&Token> {
        self.tokens.get(id.0)
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}
