//! Placeholder resolution.
//!
//! Property values may embed `${...}` references to other properties. The
//! resolver delegates substitution to a [`PlaceholderResolver`] collaborator,
//! which recurses back into property resolution through the narrow
//! [`PropertyLookup`] surface; the grammar here is deliberately minimal
//! (`${name}` and `${name:default}`), anything richer is a custom
//! implementation's concern.

use crate::error::{ConfigError, Result};

/// Read-only lookup surface a placeholder resolver uses to recurse back into
/// property resolution.
pub trait PropertyLookup {
    /// The string value of `name`, with placeholders inside it already
    /// resolved.
    fn string_value(&self, name: &str) -> Result<Option<String>>;
}

/// Resolves `${...}` references embedded in property values.
pub trait PlaceholderResolver: Send + Sync {
    /// The marker that opens a placeholder (also gates random-expression
    /// detection at ingestion time).
    fn prefix(&self) -> &str;

    /// Resolve every placeholder in `value`, failing if a reference has no
    /// value and no default.
    fn resolve_required_placeholders(
        &self,
        value: &str,
        properties: &dyn PropertyLookup,
    ) -> Result<String>;

    /// Release any resources held by this resolver.
    fn close(&self) {}
}

/// The default `${name}` / `${name:default}` resolver.
///
/// Defaults may themselves contain placeholders and are resolved recursively.
/// An unterminated placeholder is passed through verbatim.
#[derive(Debug, Clone)]
pub struct DefaultPlaceholderResolver {
    prefix: String,
    suffix: String,
}

impl DefaultPlaceholderResolver {
    /// The default placeholder opening marker.
    pub const PREFIX: &'static str = "${";
    /// The default placeholder closing marker.
    pub const SUFFIX: &'static str = "}";

    /// Create a resolver using the default `${` / `}` markers.
    pub fn new() -> Self {
        Self {
            prefix: Self::PREFIX.to_string(),
            suffix: Self::SUFFIX.to_string(),
        }
    }

    fn resolve_expression(
        &self,
        expression: &str,
        original: &str,
        properties: &dyn PropertyLookup,
    ) -> Result<String> {
        let (name, default) = match expression.split_once(':') {
            Some((name, default)) => (name, Some(default)),
            None => (expression, None),
        };
        if let Some(resolved) = properties.string_value(name)? {
            return Ok(resolved);
        }
        if let Some(default) = default {
            if default.contains(&self.prefix) {
                return self.resolve_required_placeholders(default, properties);
            }
            return Ok(default.to_string());
        }
        Err(ConfigError::UnresolvedPlaceholder {
            placeholder: name.to_string(),
            value: original.to_string(),
        })
    }
}

impl Default for DefaultPlaceholderResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl PlaceholderResolver for DefaultPlaceholderResolver {
    fn prefix(&self) -> &str {
        &self.prefix
    }

    fn resolve_required_placeholders(
        &self,
        value: &str,
        properties: &dyn PropertyLookup,
    ) -> Result<String> {
        let mut out = String::with_capacity(value.len());
        let mut rest = value;
        while let Some(start) = rest.find(&self.prefix) {
            out.push_str(&rest[..start]);
            let after = &rest[start + self.prefix.len()..];
            let Some(end) = find_closing(after, &self.prefix, &self.suffix) else {
                out.push_str(&rest[start..]);
                return Ok(out);
            };
            let expression = &after[..end];
            out.push_str(&self.resolve_expression(expression, value, properties)?);
            rest = &after[end + self.suffix.len()..];
        }
        out.push_str(rest);
        Ok(out)
    }
}

/// Position of the suffix matching an already-consumed prefix, accounting for
/// nested placeholders.
fn find_closing(s: &str, prefix: &str, suffix: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut position = 0;
    while position < s.len() {
        if s[position..].starts_with(prefix) {
            depth += 1;
            position += prefix.len();
        } else if s[position..].starts_with(suffix) {
            if depth == 0 {
                return Some(position);
            }
            depth -= 1;
            position += suffix.len();
        } else {
            position += s[position..].chars().next().map_or(1, char::len_utf8);
        }
    }
    None
}
