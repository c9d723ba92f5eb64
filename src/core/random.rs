//! Random value expressions.
//!
//! Ingestion replaces `${random.<kind>}`, `${random.<kind>(N)}`, and
//! `${random.<kind>[L,U]}` expressions inside string values with generated
//! content. Unbounded numeric draws come from the OS entropy source; bounded
//! and ranged draws use a plain PRNG.
//!
//! `[L,U]` ranges are half-open. A single `(N)` bound scales a plain draw by
//! N for `long` and `float`; for `int` a non-negative N yields the fixed
//! value 1 and only a negative N draws, in `(-|N|, 0]`.

use crate::error::{ConfigError, Result};
use crate::sources::PropertyConvention;
use rand::rngs::OsRng;
use rand::{Rng, RngCore};
use regex::Regex;
use std::net::TcpListener;
use std::sync::{Arc, LazyLock};
use uuid::Uuid;

static RANDOM_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\$\{\s?random\.(?P<kind>\S+?)(?P<bound>\(-?\d+(?:\.\d+)?\)|\[-?\d+(?:\.\d+)?,\s?-?\d+(?:\.\d+)?\])?\}",
    )
    .expect("random expression pattern is valid")
});

/// Allocates ephemeral TCP ports for `${random.port}`.
pub trait PortScanner: Send + Sync {
    /// Find an available TCP port on the local machine.
    fn find_available_tcp_port(&self) -> Result<u16>;
}

/// Port scanner that asks the OS for an ephemeral port by binding port 0 on
/// the loopback interface.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalPortScanner;

impl PortScanner for LocalPortScanner {
    fn find_available_tcp_port(&self) -> Result<u16> {
        let listener = TcpListener::bind(("127.0.0.1", 0))?;
        Ok(listener.local_addr()?.port())
    }
}

/// Detects and replaces `${random.*}` expressions at ingestion time.
pub(crate) struct RandomValueExpander {
    port_scanner: Arc<dyn PortScanner>,
}

impl RandomValueExpander {
    pub(crate) fn new(port_scanner: Arc<dyn PortScanner>) -> Self {
        Self { port_scanner }
    }

    /// Replace every random expression in `input`, returning `None` when the
    /// input holds no expression.
    ///
    /// Skipped entirely for environment-variable sources and for strings that
    /// do not contain the placeholder prefix.
    pub(crate) fn expand(
        &self,
        convention: PropertyConvention,
        property: &str,
        input: &str,
        placeholder_prefix: &str,
    ) -> Result<Option<String>> {
        if convention == PropertyConvention::EnvironmentVariable
            || !input.contains(placeholder_prefix)
        {
            return Ok(None);
        }
        let mut out = String::new();
        let mut last = 0usize;
        for captures in RANDOM_PATTERN.captures_iter(input) {
            let Some(whole) = captures.get(0) else { continue };
            let kind = captures
                .name("kind")
                .map(|m| m.as_str())
                .unwrap_or_default()
                .trim()
                .to_ascii_lowercase();
            let bound = captures.name("bound").map(|m| {
                let text = m.as_str();
                text[1..text.len() - 1].to_string()
            });
            let replacement =
                self.random_value(&kind, bound.as_deref(), whole.as_str(), property)?;
            out.push_str(&input[last..whole.start()]);
            out.push_str(&replacement);
            last = whole.end();
        }
        if last == 0 {
            return Ok(None);
        }
        out.push_str(&input[last..]);
        Ok(Some(out))
    }

    fn random_value(
        &self,
        kind: &str,
        bound: Option<&str>,
        expression: &str,
        property: &str,
    ) -> Result<String> {
        match kind {
            "port" => Ok(self.port_scanner.find_available_tcp_port()?.to_string()),
            "int" | "integer" => Ok(match bound {
                None => (OsRng.next_u32() as i32).to_string(),
                Some(range) => next_integer_in_range(range, property)?.to_string(),
            }),
            "long" => Ok(match bound {
                None => (OsRng.next_u64() as i64).to_string(),
                Some(range) => next_long_in_range(range, property)?.to_string(),
            }),
            "float" => Ok(match bound {
                None => unit_float().to_string(),
                Some(range) => next_float_in_range(range, property)?.to_string(),
            }),
            "shortuuid" => Ok(Uuid::new_v4().to_string()[25..35].to_string()),
            "uuid" => Ok(Uuid::new_v4().to_string()),
            "uuid2" => Ok(Uuid::new_v4().simple().to_string()),
            _ => Err(ConfigError::InvalidRandomExpression {
                expression: expression.to_string(),
                property: property.to_string(),
            }),
        }
    }
}

/// Uniform draw in [0, 1) from the OS entropy source, 24 bits of precision.
fn unit_float() -> f32 {
    (OsRng.next_u32() >> 8) as f32 * (1.0 / (1u32 << 24) as f32)
}

fn next_integer_in_range(range: &str, property: &str) -> Result<i32> {
    let invalid = || ConfigError::InvalidRandomRange {
        range: range.to_string(),
        kind: "Integer",
        property: property.to_string(),
    };
    let mut tokens = range.split(',');
    let lower: i32 = tokens.next().unwrap_or_default().parse().map_err(|_| invalid())?;
    let Some(upper) = tokens.next() else {
        // a single non-negative bound collapses to the fixed value 1; only
        // negative bounds draw, in (-|N|, 0]
        if lower >= 0 {
            return Ok(1);
        }
        return Ok(-(OsRng.gen_range(0..i64::from(lower).abs()) as i32));
    };
    let upper: i32 = upper.parse().map_err(|_| invalid())?;
    Ok((f64::from(lower) + fastrand::f64() * (f64::from(upper) - f64::from(lower))) as i32)
}

fn next_long_in_range(range: &str, property: &str) -> Result<i64> {
    let invalid = || ConfigError::InvalidRandomRange {
        range: range.to_string(),
        kind: "Long",
        property: property.to_string(),
    };
    let mut tokens = range.split(',');
    let lower: i64 = tokens.next().unwrap_or_default().parse().map_err(|_| invalid())?;
    let Some(upper) = tokens.next() else {
        return Ok((fastrand::f64() * lower as f64) as i64);
    };
    let upper: i64 = upper.parse().map_err(|_| invalid())?;
    Ok((lower as f64 + fastrand::f64() * (upper as f64 - lower as f64)) as i64)
}

fn next_float_in_range(range: &str, property: &str) -> Result<f32> {
    let invalid = || ConfigError::InvalidRandomRange {
        range: range.to_string(),
        kind: "Float",
        property: property.to_string(),
    };
    let mut tokens = range.split(',');
    let lower: f32 = tokens.next().unwrap_or_default().parse().map_err(|_| invalid())?;
    let Some(upper) = tokens.next() else {
        return Ok(fastrand::f32() * lower);
    };
    let upper: f32 = upper.parse().map_err(|_| invalid())?;
    Ok(lower + fastrand::f32() * (upper - lower))
}
