//! Conversion orchestrator
//!
//! Drives one import: raw leaves are classified as alias or literal, literals
//! are parsed by their declared or detected kind, every token is indexed, and
//! one resolver pass fills in alias values. A failing token is skipped and
//! reported; it never aborts the batch.

use crate::color::parse_color;
use crate::detect::resolve_kind;
use crate::dimension::parse_dimension;
use crate::error::{Diagnostic, Result, Severity, TokenError};
use crate::index::TokenIndex;
use crate::reference::{is_alias_candidate, parse_reference};
use crate::resolver::ReferenceResolver;
use crate::scalar::{parse_boolean, parse_cubic_bezier, parse_duration, parse_number, parse_string};
use crate::shadow::parse_shadow;
use crate::source::{collect_leaves, prepare_tree, RawToken};
use crate::token::{Token, TokenId, TokenSet};
use crate::types::{Parsed, TokenKind, TokenValue};
use crate::typography::{parse_font_family, parse_font_weight, parse_letter_spacing, parse_line_height, parse_typography};
use crate::{ConverterOptions, ImportStats};
use serde::Serialize;
use serde_json::Value;
use std::collections::{HashMap, HashSet};

/// Parse a raw value as the given kind
pub fn parse_value(kind: TokenKind, raw: &Value, base_font_size: f64) -> Result<Parsed<TokenValue>> {
    let value = match kind {
        TokenKind::Color => TokenValue::Color(parse_color(raw)?),
        TokenKind::Dimension => TokenValue::Dimension(parse_dimension(raw)?),
        TokenKind::FontSize => TokenValue::FontSize(parse_dimension(raw)?),
        TokenKind::Spacing => TokenValue::Spacing(parse_dimension(raw)?),
        TokenKind::FontWeight => TokenValue::FontWeight(parse_font_weight(raw)?),
        TokenKind::FontFamily => TokenValue::FontFamily(parse_font_family(raw)?),
        TokenKind::LineHeight => TokenValue::LineHeight(parse_line_height(raw, base_font_size)?),
        TokenKind::LetterSpacing => TokenValue::LetterSpacing(parse_letter_spacing(raw, base_font_size)?),
        TokenKind::Shadow => return Ok(parse_shadow(raw)?.map(TokenValue::Shadow)),
        TokenKind::Typography => return Ok(parse_typography(raw, base_font_size)?.map(TokenValue::Typography)),
        TokenKind::Duration => TokenValue::Duration(parse_duration(raw)?),
        TokenKind::CubicBezier => TokenValue::CubicBezier(parse_cubic_bezier(raw)?),
        TokenKind::Number => TokenValue::Number(parse_number(raw)?),
        TokenKind::String => TokenValue::String(parse_string(raw)?),
        TokenKind::Boolean => TokenValue::Boolean(parse_boolean(raw)?),
        TokenKind::Other => TokenValue::Other(raw.clone()),
    };
    Ok(Parsed::clean(value))
}

/// Result of one import
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportReport {
    pub collection: String,
    pub stats: ImportStats,
    pub tokens: TokenSet,
    pub diagnostics: Vec<Diagnostic>,
    /// Qualified names in the order the resolver finalized them
    pub resolution_order: Vec<String>,
}

impl ImportReport {
    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| d.severity == Severity::Error)
    }

    pub fn has_errors(&self) -> bool {
        self.errors().next().is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Origin {
    Created,
    Updated,
}

pub struct TokenConverter {
    options: ConverterOptions,
    previous: Option<TokenSet>,
}

impl TokenConverter {
    pub fn new(options: ConverterOptions) -> Self {
        Self { options, previous: None }
    }

    /// Seed the import with an earlier result. Tokens with the same name and a
    /// compatible kind are updated in place and keep their id.
    pub fn with_previous(mut self, previous: TokenSet) -> Self {
        self.previous = Some(previous);
        self
    }

    pub fn options(&self) -> &ConverterOptions {
        &self.options
    }

    /// Convert a raw token tree
    pub fn convert(&self, root: Value) -> Result<ImportReport> {
        let tree = prepare_tree(root, &self.options.collection)?;
        let leaves = collect_leaves(&tree);
        log::info!(
            "Converting {} raw tokens into collection '{}'",
            leaves.len(),
            self.options.collection
        );
        Ok(self.convert_leaves(leaves))
    }

    fn new_index(&self) -> TokenIndex {
        let mut index = TokenIndex::with_prefixes(self.options.collection_prefixes.iter().cloned());
        index.add_prefix(&self.options.collection);
        index
    }

    pub fn convert_leaves(&self, leaves: Vec<RawToken>) -> ImportReport {
        let collection = self.options.collection.clone();
        let mut set = self.previous.clone().unwrap_or_else(|| TokenSet::new(collection.clone()));
        set.collection = collection.clone();

        let mut stats = ImportStats::default();
        let mut diagnostics = Vec::new();
        let mut batch: Vec<(TokenId, String, Origin)> = Vec::new();
        let mut failed_literals: Vec<(TokenId, String, TokenError)> = Vec::new();
        // Earlier versions of updated tokens, put back if the update fails to resolve
        let mut replaced: HashMap<TokenId, Token> = HashMap::new();

        for leaf in leaves {
            let qualified_name = leaf.qualified_name(&self.options.name_separator);
            let existing = self.previous.as_ref().and_then(|p| p.get(&qualified_name));
            let id = existing
                .map(|t| t.id.clone())
                .unwrap_or_else(|| TokenId::derive(&collection, &qualified_name));

            let token = match self.build_token(&leaf, id.clone(), &qualified_name, &mut diagnostics) {
                Ok(token) => token,
                Err(err) => {
                    log::warn!("Skipping token '{}': {}", qualified_name, err);
                    diagnostics.push(Diagnostic::error(&qualified_name, &err));
                    stats.skipped += 1;
                    // A previous version stays in place and keeps serving references
                    if existing.is_none() {
                        failed_literals.push((id, qualified_name, err));
                    }
                    continue;
                }
            };

            if let Some(existing) = existing {
                let (old, new) = (existing.kind(), token.kind());
                if !old.is_compatible_with(new) {
                    let err = TokenError::mismatch(&qualified_name, old, new);
                    log::warn!("Skipping token '{}': {}", qualified_name, err);
                    diagnostics.push(Diagnostic::error(&qualified_name, &err));
                    stats.skipped += 1;
                    continue;
                }
            }

            let origin = if existing.is_some() { Origin::Updated } else { Origin::Created };
            if self.options.debug_mode {
                log::debug!("{:?} token '{}' ({})", origin, qualified_name, token.kind());
            }
            if let Some(existing) = existing {
                replaced.insert(id.clone(), existing.clone());
            }
            batch.push((id, qualified_name, origin));
            set.insert(token);
        }

        let mut index = self.new_index();
        for token in set.iter() {
            index.insert(token.qualified_name.clone(), token.id.clone());
        }
        for (id, name, _) in &failed_literals {
            index.insert(name.clone(), id.clone());
        }

        let mut resolver = ReferenceResolver::new(index);
        for (id, _, err) in failed_literals {
            resolver.seed_failure(id, err);
        }
        let resolution = resolver.resolve_all(&mut set);
        stats.aliases_resolved = resolution.resolved_aliases;

        let name_of: HashMap<&TokenId, &str> = set.iter().map(|t| (&t.id, t.qualified_name.as_str())).collect();
        let failed_ids: HashSet<TokenId> = resolution.failures.iter().map(|(id, _)| id.clone()).collect();

        for (id, err) in &resolution.failures {
            let name = name_of.get(id).copied().unwrap_or(id.as_str());
            log::warn!("Alias '{}' failed to resolve: {}", name, err);
            diagnostics.push(Diagnostic::error(name, err));
        }
        for (id, warning) in &resolution.warnings {
            let name = name_of.get(id).copied().unwrap_or(id.as_str());
            diagnostics.push(Diagnostic::warning(name, warning));
        }

        for (id, _, origin) in &batch {
            if failed_ids.contains(id) {
                stats.skipped += 1;
            } else {
                match origin {
                    Origin::Created => stats.created += 1,
                    Origin::Updated => stats.updated += 1,
                }
            }
        }
        // Earlier tokens outside this batch that no longer resolve
        let batch_ids: HashSet<&TokenId> = batch.iter().map(|(id, _, _)| id).collect();
        stats.skipped += failed_ids
            .iter()
            .filter(|id| !batch_ids.contains(id) && set.get_by_id(id).is_some())
            .count();

        let resolution_order = resolution
            .order
            .iter()
            .filter_map(|id| name_of.get(id).map(|name| name.to_string()))
            .collect();

        let mut tokens = TokenSet::new(collection.clone());
        for mut token in set.into_tokens() {
            if failed_ids.contains(&token.id) {
                match replaced.remove(&token.id) {
                    Some(earlier) => token = earlier,
                    None => continue,
                }
            }
            token.adopt_resolved_kind();
            tokens.insert(token);
        }

        stats.warnings = diagnostics.iter().filter(|d| d.severity == Severity::Warning).count();
        log::info!(
            "Import finished: {} created, {} updated, {} skipped, {} aliases resolved",
            stats.created,
            stats.updated,
            stats.skipped,
            stats.aliases_resolved
        );

        ImportReport {
            collection,
            stats,
            tokens,
            diagnostics,
            resolution_order,
        }
    }

    fn build_token(
        &self,
        leaf: &RawToken,
        id: TokenId,
        qualified_name: &str,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Result<Token> {
        if let Some(reference) = parse_reference(&leaf.value) {
            if reference.has_surrounding_text() {
                let warning = TokenError::invalid(
                    "reference",
                    &reference.raw,
                    format!("text around {{{}}} is ignored", reference.path),
                );
                log::warn!("Token '{}': {}", qualified_name, warning);
                diagnostics.push(Diagnostic::warning(qualified_name, &warning));
            }
            let kind = leaf
                .declared_type
                .as_deref()
                .map(TokenKind::from_name)
                .unwrap_or(TokenKind::Other);
            let token = Token::alias(
                id,
                leaf.path.clone(),
                qualified_name.to_string(),
                leaf.value.clone(),
                kind,
                reference,
            );
            return Ok(token.with_description(leaf.description.clone()));
        }
        if is_alias_candidate(&leaf.value) {
            return Err(TokenError::invalid(
                "reference",
                &leaf.value,
                "malformed reference: no balanced braces",
            ));
        }

        let kind = resolve_kind(leaf.declared_type.as_deref(), &leaf.value);
        let parsed = parse_value(kind, &leaf.value, self.options.base_font_size)?;
        for warning in &parsed.warnings {
            log::warn!("Token '{}': {}", qualified_name, warning);
            diagnostics.push(Diagnostic::warning(qualified_name, warning));
        }

        let token = Token::literal(
            id,
            leaf.path.clone(),
            qualified_name.to_string(),
            leaf.value.clone(),
            parsed.value,
        );
        Ok(token.with_description(leaf.description.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::parse_color_str;
    use crate::types::Dimension;
    use serde_json::json;

    fn options() -> ConverterOptions {
        ConverterOptions {
            collection: "core".to_string(),
            ..ConverterOptions::default()
        }
    }

    fn convert(root: Value) -> ImportReport {
        TokenConverter::new(options()).convert(root).unwrap()
    }

    #[test]
    fn test_semantic_alias_resolves_to_primitive() {
        let report = convert(json!({
            "primitive": { "color": { "gray": { "900": { "$value": "#111111", "$type": "color" } } } },
            "semantic": { "color": { "text": { "$value": "{primitive.color.gray.900}", "$type": "color" } } }
        }));

        let text = report.tokens.get("semantic/color/text").unwrap();
        let expected = TokenValue::Color(parse_color_str("#111111").unwrap());
        assert_eq!(text.resolved_value(), Some(&expected));
        assert_eq!(text.alias_to(), Some(&TokenId::derive("core", "primitive/color/gray/900")));
        assert_eq!(report.stats.created, 2);
        assert_eq!(report.stats.aliases_resolved, 1);
        assert_eq!(
            report.resolution_order,
            vec!["primitive/color/gray/900", "semantic/color/text"]
        );
    }

    #[test]
    fn test_unsupported_color_skips_and_continues() {
        let report = convert(json!({
            "color": {
                "broken": { "$value": { "foo": 1 }, "$type": "color" },
                "ok": { "$value": "#00ff00" }
            }
        }));

        assert_eq!(report.stats.skipped, 1);
        assert_eq!(report.stats.created, 1);
        assert!(report.tokens.get("color/broken").is_none());
        assert!(report.tokens.get("color/ok").is_some());

        let error = report.errors().next().unwrap();
        assert_eq!(error.token, "color/broken");
        assert_eq!(error.category, "unsupported-format");
    }

    #[test]
    fn test_alias_to_failed_literal_is_skipped() {
        let report = convert(json!({
            "space": {
                "base": { "$value": "12qq", "$type": "dimension" },
                "double": { "$value": "{space.base}", "$type": "dimension" }
            }
        }));
        assert_eq!(report.stats.skipped, 2);
        assert!(report.tokens.is_empty());
        let categories: Vec<_> = report.errors().map(|d| d.category).collect();
        assert_eq!(categories, vec!["invalid-value", "dependency-failed"]);
    }

    #[test]
    fn test_cycle_skips_every_member() {
        let report = convert(json!({
            "a": { "$value": "{b}" },
            "b": { "$value": "{c}" },
            "c": { "$value": "{a}" },
            "d": { "$value": 1 }
        }));
        assert_eq!(report.stats.skipped, 3);
        assert_eq!(report.stats.created, 1);
        assert!(report.errors().all(|d| d.category == "circular-reference"));
    }

    #[test]
    fn test_untyped_alias_adopts_target_kind() {
        let report = convert(json!({
            "space": { "sm": { "$value": "4px" } },
            "gap": { "$value": "{space.sm}", "$description": "grid gap" }
        }));
        let gap = report.tokens.get("gap").unwrap();
        assert_eq!(gap.kind(), TokenKind::Dimension);
        assert_eq!(gap.description.as_deref(), Some("grid gap"));
        assert_eq!(gap.effective_value(), Some(&TokenValue::Dimension(Dimension::px(4.0))));
    }

    #[test]
    fn test_composite_warnings_are_reported() {
        let report = convert(json!({
            "heading": {
                "$type": "typography",
                "$value": { "fontFamily": "Inter", "fontWeight": "chonky" }
            }
        }));
        assert_eq!(report.stats.created, 1);
        assert_eq!(report.stats.warnings, 1);
        assert!(!report.has_errors());
    }

    #[test]
    fn test_reference_with_surrounding_text_warns() {
        let report = convert(json!({
            "space": { "base": { "$value": 8 } },
            "wide": { "$value": "calc({space.base} * 2)", "$type": "number" }
        }));
        assert_eq!(report.stats.warnings, 1);
        assert_eq!(
            report.tokens.get("wide").and_then(|t| t.resolved_value()),
            Some(&TokenValue::Number(8.0))
        );
    }

    #[test]
    fn test_incremental_import_updates_and_skips() {
        let first = convert(json!({
            "color": { "brand": { "$value": "#ff0000" } },
            "radius": { "$value": "4px" }
        }));
        let brand_id = first.tokens.get("color/brand").unwrap().id.clone();

        let second = TokenConverter::new(options())
            .with_previous(first.tokens)
            .convert(json!({
                "color": { "brand": { "$value": "#0000ff" }, "accent": { "$value": "{color.brand}" } },
                "radius": { "$value": "#000000" }
            }))
            .unwrap();

        assert_eq!(second.stats.updated, 1);
        assert_eq!(second.stats.created, 1);
        assert_eq!(second.stats.skipped, 1);

        let brand = second.tokens.get("color/brand").unwrap();
        assert_eq!(brand.id, brand_id);
        assert_eq!(brand.value().and_then(|v| v.as_color()).map(|c| c.to_hex()), Some("#0000ff".to_string()));
        // The mismatched update leaves the earlier token untouched
        assert_eq!(second.tokens.get("radius").unwrap().kind(), TokenKind::Dimension);
        assert_eq!(second.errors().next().map(|d| d.category), Some("kind-value-mismatch"));
    }

    #[test]
    fn test_compatible_kind_counts_as_update() {
        let first = convert(json!({ "gap": { "$value": "4px" } }));
        let gap_id = first.tokens.get("gap").unwrap().id.clone();
        assert_eq!(first.tokens.get("gap").unwrap().kind(), TokenKind::Dimension);

        let second = TokenConverter::new(options())
            .with_previous(first.tokens)
            .convert(json!({ "gap": { "$value": "8px", "$type": "spacing" } }))
            .unwrap();

        assert_eq!(second.stats.updated, 1);
        assert_eq!(second.stats.skipped, 0);
        assert!(!second.has_errors());
        let gap = second.tokens.get("gap").unwrap();
        assert_eq!(gap.id, gap_id);
        assert_eq!(gap.kind(), TokenKind::Spacing);
        assert_eq!(gap.value(), Some(&TokenValue::Spacing(Dimension::px(8.0))));
    }

    #[test]
    fn test_failed_alias_update_keeps_earlier_token() {
        let first = convert(json!({ "gap": { "$value": "4px" } }));

        let second = TokenConverter::new(options())
            .with_previous(first.tokens)
            .convert(json!({ "gap": { "$value": "{missing.thing}" } }))
            .unwrap();

        assert_eq!(second.stats.skipped, 1);
        assert_eq!(second.stats.updated, 0);
        assert_eq!(second.errors().next().map(|d| d.category), Some("unresolved-reference"));
        let gap = second.tokens.get("gap").unwrap();
        assert!(!gap.is_alias());
        assert_eq!(gap.value(), Some(&TokenValue::Dimension(Dimension::px(4.0))));
    }

    #[test]
    fn test_earlier_token_that_stops_resolving_is_counted() {
        let reference = parse_reference(&json!("{missing}")).unwrap();
        let mut previous = TokenSet::new("core");
        previous.insert(Token::alias(
            TokenId::derive("core", "stale"),
            vec!["stale".to_string()],
            "stale".to_string(),
            json!("{missing}"),
            TokenKind::Other,
            reference,
        ));

        let report = TokenConverter::new(options())
            .with_previous(previous)
            .convert(json!({ "fresh": { "$value": 2 } }))
            .unwrap();

        assert_eq!(report.stats.created, 1);
        assert_eq!(report.stats.skipped, 1);
        assert!(report.tokens.get("stale").is_none());
        assert_eq!(report.errors().next().map(|d| d.token.as_str()), Some("stale"));
    }

    #[test]
    fn test_unbalanced_braces_are_malformed_reference() {
        let report = convert(json!({
            "weird": { "$value": "} not {" },
            "fine": { "$value": "#ffffff" }
        }));

        assert_eq!(report.stats.skipped, 1);
        assert_eq!(report.stats.created, 1);
        assert!(report.tokens.get("weird").is_none());
        let error = report.errors().next().unwrap();
        assert_eq!(error.category, "invalid-value");
        assert!(error.message.contains("malformed reference"));
    }

    #[test]
    fn test_parse_value_by_kind() {
        let parsed = parse_value(TokenKind::FontWeight, &json!("bold"), 16.0).unwrap();
        assert_eq!(parsed.value.kind(), TokenKind::FontWeight);

        let other = parse_value(TokenKind::Other, &json!({ "stops": [] }), 16.0).unwrap();
        assert_eq!(other.value, TokenValue::Other(json!({ "stops": [] })));

        assert!(parse_value(TokenKind::Spacing, &json!("4px 8px"), 16.0).is_err());
    }

    #[test]
    fn test_conversion_is_deterministic() {
        let root = json!({
            "color": { "a": { "$value": "hsl(200, 50%, 40%)" }, "b": { "$value": "{color.a}" } },
            "shadow": { "$type": "shadow", "card": { "$value": { "x": 0, "y": 2, "blur": 4, "color": "#0003" } } }
        });
        let first = serde_json::to_string(&convert(root.clone()).tokens).unwrap();
        let second = serde_json::to_string(&convert(root).tokens).unwrap();
        assert_eq!(first, second);
    }
}
