//! Token index: qualified name to token id with tiered lookup
//!
//! Lookup tiers, first hit wins:
//! 1. exact match on the reference with any collection prefix stripped
//! 2. the same with separators normalized (`.` to `/` and back), then the
//!    unstripped reference normalized
//! 3. fuzzy: first key in insertion order that ends with or contains the
//!    stripped reference
//!
//! Tier 3 scans every key, so callers should insert keys in the form their
//! references use.

use crate::token::TokenId;
use crate::types::DEFAULT_COLLECTION_PREFIXES;
use indexmap::IndexMap;
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LookupTier {
    Exact,
    Normalized,
    Fuzzy,
}

impl fmt::Display for LookupTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Exact => "exact",
            Self::Normalized => "normalized",
            Self::Fuzzy => "fuzzy",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LookupHit {
    pub id: TokenId,
    pub key: String,
    pub tier: LookupTier,
}

/// Everything a lookup considered, for diagnostics
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LookupExplanation {
    pub reference: String,
    pub stripped: String,
    pub hit: Option<LookupHit>,
    pub fuzzy_candidates: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct TokenIndex {
    entries: IndexMap<String, TokenId>,
    prefixes: Vec<String>,
}

impl TokenIndex {
    pub fn new() -> Self {
        Self::with_prefixes(DEFAULT_COLLECTION_PREFIXES.iter().map(|p| p.to_string()))
    }

    pub fn with_prefixes(prefixes: impl IntoIterator<Item = String>) -> Self {
        Self {
            entries: IndexMap::new(),
            prefixes: prefixes.into_iter().map(|p| p.to_ascii_lowercase()).collect(),
        }
    }

    /// Add another collection name whose prefix is stripped from references
    pub fn add_prefix(&mut self, prefix: &str) {
        let prefix = prefix.to_ascii_lowercase();
        if !prefix.is_empty() && !self.prefixes.contains(&prefix) {
            self.prefixes.push(prefix);
        }
    }

    /// Insert a key. An existing key keeps its position and gets the new id.
    pub fn insert(&mut self, key: impl Into<String>, id: TokenId) -> Option<TokenId> {
        let key = key.into();
        let previous = self.entries.insert(key.clone(), id);
        if previous.is_some() {
            log::warn!("Token index key '{}' registered twice; keeping the later token", key);
        }
        previous
    }

    pub fn get(&self, key: &str) -> Option<&TokenId> {
        self.entries.get(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.entries.keys()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Strip one leading collection prefix (`primitive.`, `semantic/`, ...)
    pub fn strip_prefix<'a>(&self, reference: &'a str) -> &'a str {
        let lower = reference.to_ascii_lowercase();
        for prefix in &self.prefixes {
            if lower.len() > prefix.len()
                && lower.starts_with(prefix.as_str())
                && matches!(lower.as_bytes()[prefix.len()], b'.' | b'/')
            {
                return &reference[prefix.len() + 1..];
            }
        }
        reference
    }

    pub fn lookup(&self, reference: &str) -> Option<LookupHit> {
        self.lookup_excluding(reference, None)
    }

    /// Lookup that never returns `exclude` from the fuzzy tier, so a token
    /// cannot fuzzily match itself
    pub fn lookup_excluding(&self, reference: &str, exclude: Option<&TokenId>) -> Option<LookupHit> {
        let hit = self.explain_excluding(reference, exclude).hit;
        if hit.is_none() {
            log::warn!("Reference {{{}}} not found in any lookup tier", reference);
        }
        hit
    }

    pub fn explain(&self, reference: &str) -> LookupExplanation {
        self.explain_excluding(reference, None)
    }

    fn explain_excluding(&self, reference: &str, exclude: Option<&TokenId>) -> LookupExplanation {
        let reference = reference.trim();
        let stripped = self.strip_prefix(reference);
        let mut explanation = LookupExplanation {
            reference: reference.to_string(),
            stripped: stripped.to_string(),
            hit: None,
            fuzzy_candidates: Vec::new(),
        };

        // Tier 1
        for candidate in [stripped, reference] {
            if let Some(hit) = self.exact(candidate, LookupTier::Exact) {
                explanation.hit = Some(hit);
                return explanation;
            }
        }

        // Tier 2
        let slashed = stripped.replace('.', "/");
        let dotted = stripped.replace('/', ".");
        let full_slashed = reference.replace('.', "/");
        let full_dotted = reference.replace('/', ".");
        for candidate in [&slashed, &dotted, &full_slashed, &full_dotted] {
            if let Some(hit) = self.exact(candidate, LookupTier::Normalized) {
                explanation.hit = Some(hit);
                return explanation;
            }
        }

        // Tier 3
        if stripped.is_empty() {
            return explanation;
        }
        let needles = [stripped, slashed.as_str(), dotted.as_str()];
        explanation.fuzzy_candidates = self
            .entries
            .iter()
            .filter(|(_, id)| Some(*id) != exclude)
            .filter(|(key, _)| needles.iter().any(|n| key.ends_with(n) || key.contains(n)))
            .map(|(key, _)| key.clone())
            .collect();

        if explanation.fuzzy_candidates.len() > 1 {
            log::warn!(
                "Reference {{{}}} is ambiguous; candidates {:?}, using '{}'",
                reference,
                explanation.fuzzy_candidates,
                explanation.fuzzy_candidates[0]
            );
        }

        explanation.hit = explanation.fuzzy_candidates.first().and_then(|key| {
            self.entries.get(key).map(|id| LookupHit {
                id: id.clone(),
                key: key.clone(),
                tier: LookupTier::Fuzzy,
            })
        });
        explanation
    }

    fn exact(&self, key: &str, tier: LookupTier) -> Option<LookupHit> {
        self.entries.get(key).map(|id| LookupHit {
            id: id.clone(),
            key: key.to_string(),
            tier,
        })
    }
}

impl Default for TokenIndex {
    fn default() -> Self {
        Self::new()
    }
}
