//! Query matcher over physical-key layouts.

use crate::error::{ModelError, ModelResult};
use crate::model::classifier::AttributeType;
use crate::model::document::{Document, Layout, LayoutSource};
use crate::model::key::is_internal_key;
use crate::schema::hierarchy::{Hierarchy, ResolvedAttribute};
use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

/// Query operator key for regular expression tests.
pub const REGEX_OPERATOR: &str = "$regex";
/// Flags for [`REGEX_OPERATOR`]: any of `i`, `m`, `s`, `x`.
pub const REGEX_OPTIONS: &str = "$options";

const MAX_CACHED_REGEXES: usize = 128;

/// Compiled `$regex` queries keyed by `(pattern, options)`.
static REGEX_CACHE: Lazy<Mutex<HashMap<(String, String), Regex>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

/// Result of matching one value against one query value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValueMatch {
    pub matched: bool,
    /// Index of the array element that satisfied an existential match.
    pub element: Option<usize>,
}

impl ValueMatch {
    const MISS: Self = Self {
        matched: false,
        element: None,
    };
    const HIT: Self = Self {
        matched: true,
        element: None,
    };

    fn from_bool(matched: bool) -> Self {
        if matched {
            Self::HIT
        } else {
            Self::MISS
        }
    }

    fn at(index: usize) -> Self {
        Self {
            matched: true,
            element: Some(index),
        }
    }
}

/// Returns whether documents of `doc`'s class (and mixins) are in scope
/// for a query against `class`.
///
/// A CLASS scope accepts any document whose class extends it. A MIXIN scope
/// accepts documents of a compatible class that have the mixin, or a mixin
/// derived from it, applied.
pub fn class_accepts(hierarchy: &Hierarchy, class: &str, doc: &Document) -> bool {
    if !hierarchy.is_mixin(class) {
        return hierarchy.is_subtype(doc.class(), class);
    }
    let Ok(base) = hierarchy.resolve_concrete_class(class) else {
        return false;
    };
    hierarchy.is_subtype(doc.class(), base)
        && doc
            .mixins()
            .into_iter()
            .any(|mixin| hierarchy.is_subtype(mixin, class))
}

/// Matches a whole document: class scope first, then every query key with
/// positional array comparison.
pub fn match_query(
    hierarchy: &Hierarchy,
    class: &str,
    doc: &Document,
    query: &Map<String, Value>,
) -> ModelResult<bool> {
    if !class_accepts(hierarchy, class, doc) {
        return Ok(false);
    }
    match_object(hierarchy, class, doc, query, true)
}

/// Matches a layout (or a view over one) against a query object.
///
/// A query value of `null` is the unset sentinel and counts as matched
/// without inspecting the document. Any other value requires the resolved
/// physical key to be present.
pub fn match_object<L: LayoutSource + ?Sized>(
    hierarchy: &Hierarchy,
    class: &str,
    value: &L,
    query: &Map<String, Value>,
    full_match: bool,
) -> ModelResult<bool> {
    match_layout(hierarchy, class, value.layout(), query, full_match)
}

fn match_layout(
    hierarchy: &Hierarchy,
    class: &str,
    layout: &Layout,
    query: &Map<String, Value>,
    full_match: bool,
) -> ModelResult<bool> {
    for (key, query_value) in query {
        if query_value.is_null() {
            continue;
        }

        if is_internal_key(key) {
            let matched = match layout.get(key) {
                Some(doc_value) => {
                    match_value(hierarchy, None, doc_value, query_value, full_match)?.matched
                }
                None => false,
            };
            if !matched {
                return Ok(false);
            }
            continue;
        }

        let resolved = hierarchy.resolve_key(class, key)?;
        let Some(doc_value) = layout.get(&resolved.wire_key()) else {
            return Ok(false);
        };

        let matched = if matches!(resolved.attribute.ty, AttributeType::BagOf { .. }) {
            match_bag(hierarchy, &resolved, doc_value, query_value, full_match)?
        } else {
            match_value(
                hierarchy,
                resolved.element_class(),
                doc_value,
                query_value,
                full_match,
            )?
            .matched
        };
        if !matched {
            return Ok(false);
        }
    }
    Ok(true)
}

fn match_bag(
    hierarchy: &Hierarchy,
    resolved: &ResolvedAttribute,
    doc_value: &Value,
    query_value: &Value,
    full_match: bool,
) -> ModelResult<bool> {
    let (Value::Object(bag), Value::Object(patterns)) = (doc_value, query_value) else {
        return Ok(values_equal(doc_value, query_value));
    };
    for (bag_key, pattern) in patterns {
        if pattern.is_null() {
            continue;
        }
        let Some(entry) = bag.get(bag_key) else {
            return Ok(false);
        };
        if !match_value(
            hierarchy,
            resolved.element_class(),
            entry,
            pattern,
            full_match,
        )?
        .matched
        {
            return Ok(false);
        }
    }
    Ok(true)
}

/// Matches one document value against one query value.
///
/// - Primitive document value: `$regex` test or exact equality.
/// - Array vs. array query: positional comparison. With `full_match` the
///   lengths must agree and every position must match; without it the scan
///   never fails.
/// - Array vs. non-array query: succeeds on the first matching element and
///   reports its index.
/// - Embedded object: recurses into [`match_object`] typed by the object's
///   own `_class` tag when it extends `element_class`, else by
///   `element_class`. Keys that class does not declare do not match.
pub fn match_value(
    hierarchy: &Hierarchy,
    element_class: Option<&str>,
    doc_value: &Value,
    query_value: &Value,
    full_match: bool,
) -> ModelResult<ValueMatch> {
    match doc_value {
        Value::Array(items) => {
            if let Value::Array(patterns) = query_value {
                if full_match && items.len() != patterns.len() {
                    return Ok(ValueMatch::MISS);
                }
                for (index, pattern) in patterns.iter().enumerate() {
                    let matched = match items.get(index) {
                        Some(item) => {
                            match_value(hierarchy, element_class, item, pattern, full_match)?
                                .matched
                        }
                        None => false,
                    };
                    if full_match && !matched {
                        return Ok(ValueMatch::MISS);
                    }
                }
                return Ok(ValueMatch::HIT);
            }

            for (index, item) in items.iter().enumerate() {
                if match_value(hierarchy, element_class, item, query_value, full_match)?.matched {
                    return Ok(ValueMatch::at(index));
                }
            }
            Ok(ValueMatch::MISS)
        }
        Value::Object(layout) => match query_value {
            Value::Object(query) if !is_regex_operator(query) => {
                match hierarchy.embedded_class(element_class, layout) {
                    // Keys undeclared on the element's own class are a miss.
                    Some(class) => match match_layout(hierarchy, class, layout, query, full_match) {
                        Ok(matched) => Ok(ValueMatch::from_bool(matched)),
                        Err(ModelError::AttributeNotFound { .. }) => Ok(ValueMatch::MISS),
                        Err(err) => Err(err),
                    },
                    None => Ok(ValueMatch::from_bool(values_equal(doc_value, query_value))),
                }
            }
            _ => Ok(ValueMatch::from_bool(values_equal(doc_value, query_value))),
        },
        primitive => match query_value {
            Value::Object(query) if is_regex_operator(query) => {
                let regex = compile_regex(query)?;
                Ok(ValueMatch::from_bool(
                    primitive.as_str().is_some_and(|text| regex.is_match(text)),
                ))
            }
            _ => Ok(ValueMatch::from_bool(values_equal(primitive, query_value))),
        },
    }
}

fn is_regex_operator(query: &Map<String, Value>) -> bool {
    matches!(query.get(REGEX_OPERATOR), Some(Value::String(_)))
}

fn compile_regex(query: &Map<String, Value>) -> ModelResult<Regex> {
    let pattern = query
        .get(REGEX_OPERATOR)
        .and_then(Value::as_str)
        .unwrap_or_default();
    let options = query
        .get(REGEX_OPTIONS)
        .and_then(Value::as_str)
        .unwrap_or_default();

    let key = (pattern.to_string(), options.to_string());
    let mut cache = REGEX_CACHE.lock().unwrap_or_else(PoisonError::into_inner);
    if let Some(regex) = cache.get(&key) {
        return Ok(regex.clone());
    }

    let regex = build_regex(pattern, options)?;
    if cache.len() >= MAX_CACHED_REGEXES {
        cache.clear();
    }
    cache.insert(key, regex.clone());
    Ok(regex)
}

fn build_regex(pattern: &str, options: &str) -> ModelResult<Regex> {
    let mut builder = RegexBuilder::new(pattern);
    for flag in options.chars() {
        match flag {
            'i' => builder.case_insensitive(true),
            'm' => builder.multi_line(true),
            's' => builder.dot_matches_new_line(true),
            'x' => builder.ignore_whitespace(true),
            other => {
                return Err(ModelError::InvalidRegex {
                    pattern: pattern.to_string(),
                    message: format!("unsupported option `{other}`"),
                })
            }
        };
    }
    builder.build().map_err(|err| ModelError::InvalidRegex {
        pattern: pattern.to_string(),
        message: err.to_string(),
    })
}

/// Structural equality with numeric comparison across integer/float forms.
pub fn values_equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => match (a.as_f64(), b.as_f64()) {
            (Some(a), Some(b)) => a == b,
            _ => a == b,
        },
        (Value::Array(a), Value::Array(b)) => {
            a.len() == b.len() && a.iter().zip(b).all(|(x, y)| values_equal(x, y))
        }
        (Value::Object(a), Value::Object(b)) => {
            a.len() == b.len()
                && a
                    .iter()
                    .all(|(key, x)| b.get(key).is_some_and(|y| values_equal(x, y)))
        }
        _ => left == right,
    }
}

#[cfg(test)]
mod tests {
    use super::{compile_regex, values_equal, REGEX_CACHE};
    use crate::error::ModelError;
    use serde_json::json;

    #[test]
    fn numbers_compare_across_representations() {
        assert!(values_equal(&json!(31), &json!(31.0)));
        assert!(!values_equal(&json!(31), &json!(33)));
        assert!(values_equal(&json!({"a": [1, 2]}), &json!({"a": [1.0, 2]})));
    }

    #[test]
    fn regex_options_are_applied() {
        let query = json!({"$regex": "^ABC", "$options": "i"});
        let regex = compile_regex(query.as_object().unwrap()).unwrap();
        assert!(regex.is_match("abcdef"));
    }

    #[test]
    fn compiled_regexes_are_reused() {
        let query = json!({"$regex": "^reuse-[0-9]+$", "$options": "m"});
        let first = compile_regex(query.as_object().unwrap()).unwrap();
        let second = compile_regex(query.as_object().unwrap()).unwrap();

        assert_eq!(first.as_str(), second.as_str());
        assert!(second.is_match("reuse-42"));
        let cache = REGEX_CACHE.lock().unwrap();
        assert!(cache.contains_key(&("^reuse-[0-9]+$".to_string(), "m".to_string())));
    }

    #[test]
    fn unknown_regex_option_is_rejected() {
        let query = json!({"$regex": "a", "$options": "q"});
        let err = compile_regex(query.as_object().unwrap()).unwrap_err();
        assert!(matches!(err, ModelError::InvalidRegex { .. }));
    }
}
