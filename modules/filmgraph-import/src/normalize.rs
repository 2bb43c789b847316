//! Field normalizer: raw document in, canonical film or skip out.
//!
//! Source documents are dirty. Every coercion here degrades to "field
//! absent" instead of failing, so one malformed field never costs an
//! otherwise usable record. Only a missing identifier or title skips the
//! record.

use std::fmt;

use serde_json::Value;

use filmgraph_common::{CanonicalFilmRecord, FieldMap, RawRecord};

/// Why a raw record produced no canonical record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SkipReason {
    MissingRequiredField(&'static str),
}

impl SkipReason {
    /// Stable reason code used in summaries.
    pub fn as_str(&self) -> &'static str {
        match self {
            SkipReason::MissingRequiredField(_) => "missing_required_field",
        }
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::MissingRequiredField(field) => write!(f, "{} ({field})", self.as_str()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Normalized {
    Record(CanonicalFilmRecord),
    Skip(SkipReason),
}

pub struct Normalizer {
    fields: FieldMap,
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new(FieldMap::default())
    }
}

impl Normalizer {
    pub fn new(fields: FieldMap) -> Self {
        Self { fields }
    }

    pub fn normalize(&self, raw: &RawRecord) -> Normalized {
        let f = &self.fields;

        let Some(source_id) = lookup(raw, &f.source_id).and_then(parse_identifier) else {
            return Normalized::Skip(SkipReason::MissingRequiredField("source_id"));
        };
        let Some(title) = lookup(raw, &f.title).and_then(parse_text) else {
            return Normalized::Skip(SkipReason::MissingRequiredField("title"));
        };

        let directors = lookup(raw, &f.directors).map(parse_list).unwrap_or_default();
        let primary_director = directors.first().cloned();

        Normalized::Record(CanonicalFilmRecord {
            source_id,
            title,
            year: lookup(raw, &f.year).and_then(parse_integer),
            vote_count: lookup(raw, &f.vote_count).and_then(parse_integer),
            rating_class: lookup(raw, &f.rating_class).and_then(parse_text),
            directors,
            primary_director,
            actors: lookup(raw, &f.actors).map(parse_list).unwrap_or_default(),
            genres: lookup(raw, &f.genres).map(parse_list).unwrap_or_default(),
            revenue: lookup(raw, &f.revenue).and_then(parse_revenue),
        })
    }
}

/// First present, non-null value among `keys`.
fn lookup<'a>(raw: &'a RawRecord, keys: &[String]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|k| raw.get(k))
        .find(|v| !v.is_null())
}

/// Unwrap Extended JSON number wrappers (`{"$numberLong": "42"}` and
/// friends) into their textual payload.
fn extjson_number(value: &Value) -> Option<&str> {
    let obj = value.as_object()?;
    if obj.len() != 1 {
        return None;
    }
    ["$numberInt", "$numberLong", "$numberDouble", "$numberDecimal"]
        .iter()
        .find_map(|k| obj.get(*k))
        .and_then(Value::as_str)
}

/// String, number, or `{"$oid": ...}` identifier.
pub fn parse_identifier(value: &Value) -> Option<String> {
    match value {
        Value::Object(obj) => obj
            .get("$oid")
            .and_then(Value::as_str)
            .or_else(|| extjson_number(value))
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string),
        other => parse_text(other),
    }
}

/// Trimmed non-empty string, or a number rendered as text.
pub fn parse_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim()).filter(|s| !s.is_empty()).map(str::to_string),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Integer from an integer, an integral float, or a numeric string.
pub fn parse_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().and_then(integral)),
        Value::String(s) => parse_integer_str(s),
        other => extjson_number(other).and_then(parse_integer_str),
    }
}

fn parse_integer_str(s: &str) -> Option<i64> {
    let s = s.trim();
    s.parse::<i64>()
        .ok()
        .or_else(|| s.parse::<f64>().ok().and_then(integral))
}

fn integral(f: f64) -> Option<i64> {
    if f.is_finite() && f.fract() == 0.0 && f.abs() < i64::MAX as f64 {
        Some(f as i64)
    } else {
        None
    }
}

/// List of trimmed non-empty strings. Lists are taken element by element,
/// strings are split on commas, anything else is empty.
pub fn parse_list(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
        Value::String(s) => s
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    }
}

/// Monetary amount. Numbers are taken as is; strings lose currency symbols,
/// thousands separators and whitespace, and a trailing `M`/`K` scales by a
/// million/thousand.
pub fn parse_revenue(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64().filter(|f| f.is_finite()),
        Value::String(s) => parse_revenue_str(s),
        other => extjson_number(other).and_then(parse_revenue_str),
    }
}

pub fn parse_revenue_str(s: &str) -> Option<f64> {
    let cleaned: String = s
        .chars()
        .filter(|c| !c.is_whitespace() && !matches!(c, '$' | '€' | '£' | '¥' | ','))
        .collect();

    let (number, factor) = if let Some(n) = cleaned.strip_suffix(&['M', 'm'][..]) {
        (n, 1_000_000.0)
    } else if let Some(n) = cleaned.strip_suffix(&['K', 'k'][..]) {
        (n, 1_000.0)
    } else {
        (cleaned.as_str(), 1.0)
    };

    if number.is_empty() {
        return None;
    }
    let amount = number.parse::<f64>().ok()? * factor;
    amount.is_finite().then_some(amount)
}
