//! Key normalization helpers.
//!
//! Pure functions mapping raw property keys between the naming conventions
//! the resolver reconciles: dotted, hyphenated, camelCase, and
//! environment-variable upper-snake-case.

/// Convert a camelCase or underscore-separated key into hyphen/dot-segmented
/// canonical form.
///
/// Underscores become hyphens, and a hyphen is inserted before an uppercase
/// letter that follows a lowercase letter or digit. With `lower_case` the
/// result is lowercased.
///
/// # Examples
///
/// ```rust
/// use layered_config::core::hyphenate;
///
/// assert_eq!(hyphenate("maxConnections", true), "max-connections");
/// assert_eq!(hyphenate("server.maxRetries", true), "server.max-retries");
/// assert_eq!(hyphenate("FOO_BAR", true), "foo-bar");
/// ```
pub fn hyphenate(name: &str, lower_case: bool) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    let mut prev: Option<char> = None;
    for c in name.chars() {
        let c = if c == '_' { '-' } else { c };
        if c.is_ascii_uppercase() {
            if let Some(p) = prev {
                if p != '-' && p != '.' && !p.is_ascii_uppercase() {
                    out.push('-');
                }
            }
            out.push(if lower_case { c.to_ascii_lowercase() } else { c });
        } else {
            out.push(c);
        }
        prev = Some(c);
    }
    out
}

/// The key convention applied when reformatting sub-map keys or dumping the
/// full catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyFormat {
    /// Keys exactly as stored.
    Raw,
    /// Lower-case hyphen-segmented keys (`max-connections`).
    Hyphenated,
    /// Hyphen segments folded into camelCase (`maxConnections`).
    CamelCase,
    /// Upper-case underscore-separated keys (`MAX_CONNECTIONS`).
    UpperUnderscore,
}

impl KeyFormat {
    /// Reformat `name` according to this convention.
    pub fn format(&self, name: &str) -> String {
        match self {
            KeyFormat::Raw => name.to_string(),
            KeyFormat::Hyphenated => hyphenate(name, true),
            KeyFormat::CamelCase => camel_case(name),
            KeyFormat::UpperUnderscore => {
                name.replace(['.', '-'], "_").to_ascii_uppercase()
            }
        }
    }
}

fn camel_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut upper_next = false;
    for c in name.chars() {
        if c == '-' {
            upper_next = true;
        } else if c == '.' {
            upper_next = false;
            out.push(c);
        } else if upper_next {
            upper_next = false;
            out.extend(c.to_uppercase());
        } else {
            out.push(c);
        }
    }
    out
}
