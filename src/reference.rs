//! Alias reference notation: `{dotted.path}` or `{slash/path}`

use serde::Serialize;
use serde_json::Value;

/// A reference extracted from a raw token value
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Reference {
    /// The complete raw string the reference was found in
    pub raw: String,
    /// The path between the first balanced pair of braces, trimmed
    pub path: String,
}

impl Reference {
    /// Whether the raw string held anything besides the reference itself
    pub fn has_surrounding_text(&self) -> bool {
        match self.raw.trim().strip_prefix('{').and_then(|s| s.strip_suffix('}')) {
            Some(inner) => inner.trim() != self.path,
            None => true,
        }
    }

    /// Path segments, accepting both `.` and `/` separators
    pub fn segments(&self) -> Vec<&str> {
        self.path
            .split(|c| c == '.' || c == '/')
            .filter(|s| !s.is_empty())
            .collect()
    }
}

/// A string is an alias candidate when it contains both braces
pub fn is_alias_candidate(raw: &Value) -> bool {
    raw.as_str()
        .map(|s| s.contains('{') && s.contains('}'))
        .unwrap_or(false)
}

/// Content of the first balanced `{...}` span
pub fn extract_reference_path(input: &str) -> Option<&str> {
    let start = input.find('{')?;
    let mut depth = 0usize;

    for (offset, ch) in input[start..].char_indices() {
        match ch {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    let inner = input[start + 1..start + offset].trim();
                    return if inner.is_empty() { None } else { Some(inner) };
                }
            }
            _ => {}
        }
    }
    None
}

/// Parse a raw value as a reference, if it is one
pub fn parse_reference(raw: &Value) -> Option<Reference> {
    if !is_alias_candidate(raw) {
        return None;
    }
    let raw_str = raw.as_str()?;
    extract_reference_path(raw_str).map(|path| Reference {
        raw: raw_str.to_string(),
        path: path.to_string(),
    })
}
