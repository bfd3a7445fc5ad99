//! Token records and the per-collection token set

use crate::reference::Reference;
use crate::types::{TokenKind, TokenValue};
use serde::{Serialize, Serializer};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;

/// Stable token identifier derived from the collection and qualified name
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct TokenId(String);

impl TokenId {
    pub fn derive(collection: &str, qualified_name: &str) -> Self {
        let digest = md5::compute(format!("{}/{}", collection, qualified_name));
        Self(format!("{:x}", digest)[..16].to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TokenContent {
    Literal(TokenValue),
    Alias { kind: TokenKind, reference: Reference },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub id: TokenId,
    pub path: Vec<String>,
    pub qualified_name: String,
    pub raw_value: Value,
    pub description: Option<String>,
    content: TokenContent,
    resolved_value: Option<TokenValue>,
    alias_to: Option<TokenId>,
}

impl Token {
    pub fn literal(id: TokenId, path: Vec<String>, qualified_name: String, raw_value: Value, value: TokenValue) -> Self {
        Self::with_content(id, path, qualified_name, raw_value, TokenContent::Literal(value))
    }

    pub fn alias(
        id: TokenId,
        path: Vec<String>,
        qualified_name: String,
        raw_value: Value,
        kind: TokenKind,
        reference: Reference,
    ) -> Self {
        Self::with_content(id, path, qualified_name, raw_value, TokenContent::Alias { kind, reference })
    }

    fn with_content(id: TokenId, path: Vec<String>, qualified_name: String, raw_value: Value, content: TokenContent) -> Self {
        Self {
            id,
            path,
            qualified_name,
            raw_value,
            description: None,
            content,
            resolved_value: None,
            alias_to: None,
        }
    }

    pub fn with_description(mut self, description: Option<String>) -> Self {
        self.description = description;
        self
    }

    /// Declared kind for aliases, value kind for literals
    pub fn kind(&self) -> TokenKind {
        match &self.content {
            TokenContent::Literal(value) => value.kind(),
            TokenContent::Alias { kind, .. } => *kind,
        }
    }

    pub fn content(&self) -> &TokenContent {
        &self.content
    }

    /// Canonical literal value; `None` for aliases
    pub fn value(&self) -> Option<&TokenValue> {
        match &self.content {
            TokenContent::Literal(value) => Some(value),
            TokenContent::Alias { .. } => None,
        }
    }

    pub fn reference(&self) -> Option<&Reference> {
        match &self.content {
            TokenContent::Alias { reference, .. } => Some(reference),
            TokenContent::Literal(_) => None,
        }
    }

    pub fn is_alias(&self) -> bool {
        matches!(self.content, TokenContent::Alias { .. })
    }

    pub fn resolved_value(&self) -> Option<&TokenValue> {
        self.resolved_value.as_ref()
    }

    pub fn alias_to(&self) -> Option<&TokenId> {
        self.alias_to.as_ref()
    }

    /// The value consumers should use: the literal, or the resolved alias target
    pub fn effective_value(&self) -> Option<&TokenValue> {
        self.value().or(self.resolved_value.as_ref())
    }

    /// An alias declared without a kind takes the kind of its resolved value
    pub(crate) fn adopt_resolved_kind(&mut self) {
        if let (TokenContent::Alias { kind, .. }, Some(value)) = (&mut self.content, &self.resolved_value) {
            if *kind == TokenKind::Other {
                *kind = value.kind();
            }
        }
    }

    pub(crate) fn clear_resolution(&mut self) {
        self.resolved_value = None;
        self.alias_to = None;
    }

    pub(crate) fn set_resolution(&mut self, value: TokenValue, target: TokenId) {
        debug_assert!(
            self.resolved_value.is_none(),
            "token '{}' resolved twice in one pass",
            self.qualified_name
        );
        self.resolved_value = Some(value);
        self.alias_to = Some(target);
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TokenRecord<'a> {
    id: &'a TokenId,
    path: &'a [String],
    qualified_name: &'a str,
    kind: TokenKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    value: Option<&'a TokenValue>,
    raw_value: &'a Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    resolved_value: Option<&'a TokenValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    alias_to: Option<&'a TokenId>,
}

impl Serialize for Token {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        TokenRecord {
            id: &self.id,
            path: &self.path,
            qualified_name: &self.qualified_name,
            kind: self.kind(),
            value: self.value(),
            raw_value: &self.raw_value,
            description: self.description.as_deref(),
            resolved_value: self.resolved_value.as_ref(),
            alias_to: self.alias_to.as_ref(),
        }
        .serialize(serializer)
    }
}

/// All tokens of one collection, in document order
#[derive(Debug, Clone, Default, Serialize)]
pub struct TokenSet {
    pub collection: String,
    tokens: Vec<Token>,
    #[serde(skip)]
    by_name: HashMap<String, usize>,
}

impl TokenSet {
    pub fn new(collection: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            ..Self::default()
        }
    }

    /// Insert or replace a token by qualified name
    pub fn insert(&mut self, token: Token) {
        match self.by_name.get(&token.qualified_name) {
            Some(&position) => self.tokens[position] = token,
            None => {
                self.by_name.insert(token.qualified_name.clone(), self.tokens.len());
                self.tokens.push(token);
            }
        }
    }

    pub fn get(&self, qualified_name: &str) -> Option<&Token> {
        self.by_name.get(qualified_name).map(|&i| &self.tokens[i])
    }

    pub fn get_by_id(&self, id: &TokenId) -> Option<&Token> {
        self.tokens.iter().find(|t| &t.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Token> {
        self.tokens.iter()
    }

    pub fn into_tokens(self) -> Vec<Token> {
        self.tokens
    }

    pub(crate) fn tokens_mut(&mut self) -> &mut [Token] {
        &mut self.tokens
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}
