//! Alias resolution over the token graph
//!
//! Each token moves `Unresolved -> Resolving -> Resolved | Failed` within one
//! pass. Meeting a `Resolving` token again means a cycle; every token on the
//! cycle fails with the full path. A failed target fails its dependents.

use crate::error::TokenError;
use crate::index::TokenIndex;
use crate::token::{TokenContent, TokenId, TokenSet};
use crate::types::TokenValue;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionState {
    Unresolved,
    Resolving,
    Resolved,
    Failed,
}

/// Outcome of one resolution pass
#[derive(Debug, Clone, Default)]
pub struct ResolutionReport {
    /// Token ids in the order they were finalized; targets precede dependents
    pub order: Vec<TokenId>,
    pub resolved_aliases: usize,
    pub failures: Vec<(TokenId, TokenError)>,
    pub warnings: Vec<(TokenId, TokenError)>,
}

impl ResolutionReport {
    pub fn failure_for(&self, id: &TokenId) -> Option<&TokenError> {
        self.failures.iter().find(|(fid, _)| fid == id).map(|(_, err)| err)
    }
}

/// Resolver for a single pass over one collection. Owns the index it looks
/// references up in; callers must not run two passes over one set concurrently.
pub struct ReferenceResolver {
    index: TokenIndex,
    seeded: HashMap<TokenId, TokenError>,
    states: HashMap<TokenId, ResolutionState>,
    values: HashMap<TokenId, TokenValue>,
    targets: HashMap<TokenId, TokenId>,
    failures: HashMap<TokenId, TokenError>,
    order: Vec<TokenId>,
}

impl ReferenceResolver {
    pub fn new(index: TokenIndex) -> Self {
        Self {
            index,
            seeded: HashMap::new(),
            states: HashMap::new(),
            values: HashMap::new(),
            targets: HashMap::new(),
            failures: HashMap::new(),
            order: Vec::new(),
        }
    }

    /// Build an index over every token in `set`, keyed by qualified name
    pub fn for_set(set: &TokenSet) -> Self {
        let mut index = TokenIndex::new();
        index.add_prefix(&set.collection);
        for token in set.iter() {
            index.insert(token.qualified_name.clone(), token.id.clone());
        }
        Self::new(index)
    }

    pub fn index(&self) -> &TokenIndex {
        &self.index
    }

    pub fn state(&self, id: &TokenId) -> ResolutionState {
        self.states.get(id).copied().unwrap_or(ResolutionState::Unresolved)
    }

    /// Mark a token as failed before the pass, e.g. a literal that did not
    /// parse. Aliases pointing at it fail instead of resolving.
    pub fn seed_failure(&mut self, id: TokenId, error: TokenError) {
        self.seeded.insert(id, error);
    }

    /// Resolve every alias in `set`, writing `resolved_value` and `alias_to`
    pub fn resolve_all(&mut self, set: &mut TokenSet) -> ResolutionReport {
        self.reset();

        let positions: HashMap<TokenId, usize> = set
            .iter()
            .enumerate()
            .map(|(i, t)| (t.id.clone(), i))
            .collect();

        {
            let tokens = set.tokens_mut();
            for token in tokens.iter_mut() {
                token.clear_resolution();
            }
        }

        let ids: Vec<TokenId> = set.iter().map(|t| t.id.clone()).collect();
        for id in &ids {
            if self.state(id) == ResolutionState::Unresolved {
                let mut stack = Vec::new();
                // Failures are recorded in `self.failures`
                let _ = self.resolve_token(set, &positions, id, &mut stack);
            }
        }

        let mut report = ResolutionReport {
            order: self.order.clone(),
            ..ResolutionReport::default()
        };

        let tokens = set.tokens_mut();
        for token in tokens.iter_mut() {
            if !token.is_alias() {
                continue;
            }
            if let Some(err) = self.failures.get(&token.id) {
                report.failures.push((token.id.clone(), err.clone()));
                continue;
            }
            let (Some(value), Some(target)) = (self.values.get(&token.id), self.targets.get(&token.id)) else {
                continue;
            };

            let declared = token.kind();
            if !declared.is_compatible_with(value.kind()) {
                let warning = TokenError::mismatch(&token.qualified_name, declared, value.kind());
                log::warn!("{}", warning);
                report.warnings.push((token.id.clone(), warning));
            }

            token.set_resolution(value.clone(), target.clone());
            report.resolved_aliases += 1;
        }

        log::debug!(
            "Resolution pass finished: {} aliases resolved, {} failed",
            report.resolved_aliases,
            report.failures.len()
        );
        report
    }

    /// Clear per-pass state; seeded failures start the pass as `Failed`
    fn reset(&mut self) {
        self.values.clear();
        self.targets.clear();
        self.order.clear();
        self.states.clear();
        self.failures.clear();
        for (id, error) in &self.seeded {
            self.states.insert(id.clone(), ResolutionState::Failed);
            self.failures.insert(id.clone(), error.clone());
        }
    }

    fn fail(&mut self, id: &TokenId, error: TokenError) {
        if self.state(id) != ResolutionState::Failed {
            self.order.push(id.clone());
        }
        self.states.insert(id.clone(), ResolutionState::Failed);
        self.failures.insert(id.clone(), error);
    }

    fn resolve_token(
        &mut self,
        set: &TokenSet,
        positions: &HashMap<TokenId, usize>,
        id: &TokenId,
        stack: &mut Vec<TokenId>,
    ) -> Result<TokenValue, TokenError> {
        match self.state(id) {
            ResolutionState::Resolved => {
                if let Some(value) = self.values.get(id) {
                    return Ok(value.clone());
                }
            }
            ResolutionState::Failed => {
                return Err(self
                    .failures
                    .get(id)
                    .cloned()
                    .unwrap_or_else(|| TokenError::unresolved(id.to_string())));
            }
            ResolutionState::Resolving => {
                let start = stack.iter().position(|s| s == id).unwrap_or(0);
                let name_of = |tid: &TokenId| {
                    positions
                        .get(tid)
                        .and_then(|&i| set.iter().nth(i))
                        .map(|t| t.qualified_name.clone())
                        .unwrap_or_else(|| tid.to_string())
                };
                let mut cycle: Vec<String> = stack[start..].iter().map(name_of).collect();
                cycle.push(name_of(id));

                let error = TokenError::CircularReference { cycle };
                log::warn!("{}", error);
                let members: Vec<TokenId> = stack[start..].to_vec();
                for member in &members {
                    self.fail(member, error.clone());
                }
                return Err(error);
            }
            ResolutionState::Unresolved => {}
        }

        let token = match positions.get(id).and_then(|&i| set.iter().nth(i)) {
            Some(token) => token,
            None => return Err(TokenError::unresolved(id.to_string())),
        };

        let reference = match token.content() {
            TokenContent::Literal(value) => {
                self.states.insert(id.clone(), ResolutionState::Resolved);
                self.values.insert(id.clone(), value.clone());
                self.order.push(id.clone());
                return Ok(value.clone());
            }
            TokenContent::Alias { reference, .. } => reference.clone(),
        };

        self.states.insert(id.clone(), ResolutionState::Resolving);
        stack.push(id.clone());

        let outcome = match self.index.lookup_excluding(&reference.path, Some(id)) {
            None => {
                log::warn!(
                    "Token '{}' references {} which does not exist",
                    token.qualified_name,
                    reference.raw
                );
                Err(TokenError::unresolved(reference.path.clone()))
            }
            Some(hit) => {
                log::debug!(
                    "'{}' -> '{}' via {} lookup",
                    token.qualified_name,
                    hit.key,
                    hit.tier
                );
                self.resolve_token(set, positions, &hit.id, stack)
                    .map(|value| (value, hit.id.clone()))
                    .map_err(|cause| TokenError::DependencyFailed {
                        reference: reference.path.clone(),
                        cause: Box::new(cause),
                    })
            }
        };

        stack.pop();

        // A cycle through this token has already failed it with the cycle path
        if self.state(id) == ResolutionState::Failed {
            return Err(self
                .failures
                .get(id)
                .cloned()
                .unwrap_or_else(|| TokenError::unresolved(reference.path.clone())));
        }

        match outcome {
            Ok((value, target)) => {
                self.states.insert(id.clone(), ResolutionState::Resolved);
                self.values.insert(id.clone(), value.clone());
                self.targets.insert(id.clone(), target);
                self.order.push(id.clone());
                Ok(value)
            }
            Err(error) => {
                self.fail(id, error.clone());
                Err(error)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::parse_color_str;
    use crate::reference::Reference;
    use crate::token::Token;
    use crate::types::{Color, Dimension, TokenKind};
    use serde_json::json;

    const COLLECTION: &str = "test";

    fn path_of(name: &str) -> Vec<String> {
        name.split(['.', '/']).map(String::from).collect()
    }

    fn literal(name: &str, value: TokenValue) -> Token {
        Token::literal(TokenId::derive(COLLECTION, name), path_of(name), name.to_string(), json!(null), value)
    }

    fn alias(name: &str, kind: TokenKind, target: &str) -> Token {
        let raw = format!("{{{}}}", target);
        Token::alias(
            TokenId::derive(COLLECTION, name),
            path_of(name),
            name.to_string(),
            json!(raw),
            kind,
            Reference { raw, path: target.to_string() },
        )
    }

    fn set_of(tokens: Vec<Token>) -> TokenSet {
        let mut set = TokenSet::new(COLLECTION);
        for token in tokens {
            set.insert(token);
        }
        set
    }

    fn id(name: &str) -> TokenId {
        TokenId::derive(COLLECTION, name)
    }

    #[test]
    fn test_semantic_alias_matches_primitive() {
        let gray = parse_color_str("#111111").unwrap();
        let mut set = set_of(vec![
            literal("primitive.color.gray.900", TokenValue::Color(gray)),
            alias("semantic.color.text", TokenKind::Color, "primitive.color.gray.900"),
        ]);

        let report = ReferenceResolver::for_set(&set).resolve_all(&mut set);

        assert!(report.failures.is_empty());
        let text = set.get("semantic.color.text").unwrap();
        assert_eq!(text.resolved_value(), Some(&TokenValue::Color(parse_color_str("#111111").unwrap())));
        assert_eq!(text.alias_to(), Some(&id("primitive.color.gray.900")));
        assert_eq!(text.kind(), TokenKind::Color);
    }

    #[test]
    fn test_transitive_chain_resolves_in_dependency_order() {
        let mut set = set_of(vec![
            alias("c", TokenKind::Spacing, "b"),
            alias("b", TokenKind::Spacing, "a"),
            literal("a", TokenValue::Spacing(Dimension::px(4.0))),
        ]);

        let report = ReferenceResolver::for_set(&set).resolve_all(&mut set);

        assert_eq!(report.resolved_aliases, 2);
        assert_eq!(report.order, vec![id("a"), id("b"), id("c")]);
        let c = set.get("c").unwrap();
        assert_eq!(c.resolved_value(), Some(&TokenValue::Spacing(Dimension::px(4.0))));
        // alias_to is the direct target
        assert_eq!(c.alias_to(), Some(&id("b")));
    }

    #[test]
    fn test_three_node_cycle_fails_every_member() {
        let mut set = set_of(vec![
            alias("a", TokenKind::Color, "b"),
            alias("b", TokenKind::Color, "c"),
            alias("c", TokenKind::Color, "a"),
        ]);

        let report = ReferenceResolver::for_set(&set).resolve_all(&mut set);

        assert_eq!(report.failures.len(), 3);
        for name in ["a", "b", "c"] {
            match report.failure_for(&id(name)) {
                Some(TokenError::CircularReference { cycle }) => {
                    assert_eq!(cycle, &vec!["a", "b", "c", "a"]);
                }
                other => panic!("expected cycle failure for {}, got {:?}", name, other),
            }
            assert!(set.get(name).unwrap().resolved_value().is_none());
        }
    }

    #[test]
    fn test_dependent_of_cycle_fails_with_dependency_error() {
        let mut set = set_of(vec![
            alias("entry", TokenKind::Color, "a"),
            alias("a", TokenKind::Color, "b"),
            alias("b", TokenKind::Color, "a"),
        ]);

        let report = ReferenceResolver::for_set(&set).resolve_all(&mut set);

        let entry = report.failure_for(&id("entry")).unwrap();
        assert!(matches!(entry, TokenError::DependencyFailed { .. }));
        assert!(matches!(entry.root_cause(), TokenError::CircularReference { .. }));
        assert!(matches!(
            report.failure_for(&id("a")),
            Some(TokenError::CircularReference { .. })
        ));
    }

    #[test]
    fn test_self_reference_is_a_cycle() {
        let mut set = set_of(vec![alias("loop", TokenKind::Number, "loop")]);
        let report = ReferenceResolver::for_set(&set).resolve_all(&mut set);
        match report.failure_for(&id("loop")) {
            Some(TokenError::CircularReference { cycle }) => assert_eq!(cycle, &vec!["loop", "loop"]),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_missing_target_propagates() {
        let mut set = set_of(vec![
            alias("button.bg", TokenKind::Color, "color.brand"),
            alias("link.color", TokenKind::Color, "button.bg"),
        ]);

        let report = ReferenceResolver::for_set(&set).resolve_all(&mut set);

        assert_eq!(
            report.failure_for(&id("button.bg")),
            Some(&TokenError::unresolved("color.brand"))
        );
        let link = report.failure_for(&id("link.color")).unwrap();
        assert_eq!(link.root_cause(), &TokenError::unresolved("color.brand"));
        assert!(set.get("link.color").unwrap().resolved_value().is_none());
    }

    #[test]
    fn test_seeded_failure_blocks_dependents() {
        let mut set = set_of(vec![alias("surface", TokenKind::Color, "broken")]);
        let mut resolver = ReferenceResolver::for_set(&set);
        resolver.seed_failure(id("broken"), TokenError::unsupported("color", "{\"foo\":1}"));
        resolver.index.insert("broken", id("broken"));

        let report = resolver.resolve_all(&mut set);
        let err = report.failure_for(&id("surface")).unwrap();
        assert!(matches!(err.root_cause(), TokenError::UnsupportedFormat { .. }));
    }

    #[test]
    fn test_kind_mismatch_is_a_warning() {
        let mut set = set_of(vec![
            literal("color.red", TokenValue::Color(Color::new(1.0, 0.0, 0.0, 1.0))),
            alias("space.weird", TokenKind::Spacing, "color.red"),
        ]);

        let report = ReferenceResolver::for_set(&set).resolve_all(&mut set);

        assert!(report.failures.is_empty());
        assert_eq!(report.warnings.len(), 1);
        assert!(matches!(report.warnings[0].1, TokenError::KindValueMismatch { .. }));
        let weird = set.get("space.weird").unwrap();
        assert_eq!(weird.kind(), TokenKind::Spacing);
        assert!(weird.resolved_value().is_some());
    }

    #[test]
    fn test_second_pass_is_identical() {
        let mut set = set_of(vec![
            literal("a", TokenValue::Number(2.0)),
            alias("b", TokenKind::Number, "a"),
        ]);
        let mut resolver = ReferenceResolver::for_set(&set);
        let first = resolver.resolve_all(&mut set);
        let snapshot = set.get("b").unwrap().clone();
        let second = resolver.resolve_all(&mut set);

        assert_eq!(first.order, second.order);
        assert_eq!(set.get("b").unwrap(), &snapshot);
    }
}
