//! Field values.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::id::Identifier;

/// A nested mapping. Keys iterate in byte order.
pub type Dict = BTreeMap<String, Value>;

/// A field value.
///
/// Arrays hold both reference lists and string lists; the field schema of
/// the owning kind decides which element types are allowed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Value {
    String(String),
    Integer(i64),
    Bool(bool),
    Ref(Identifier),
    Array(Vec<Value>),
    Dict(Dict),
}

impl Value {
    pub fn string(text: impl Into<String>) -> Self {
        Value::String(text.into())
    }

    pub fn ref_list<'a>(ids: impl IntoIterator<Item = &'a Identifier>) -> Self {
        Value::Array(ids.into_iter().cloned().map(Value::Ref).collect())
    }

    pub fn string_list<S: Into<String>>(items: impl IntoIterator<Item = S>) -> Self {
        Value::Array(items.into_iter().map(|s| Value::String(s.into())).collect())
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_ref_id(&self) -> Option<&Identifier> {
        match self {
            Value::Ref(id) => Some(id),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_array_mut(&mut self) -> Option<&mut Vec<Value>> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_dict(&self) -> Option<&Dict> {
        match self {
            Value::Dict(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_dict_mut(&mut self) -> Option<&mut Dict> {
        match self {
            Value::Dict(d) => Some(d),
            _ => None,
        }
    }

    /// Append every identifier referenced by this value, depth first.
    pub fn collect_refs<'a>(&'a self, out: &mut Vec<&'a Identifier>) {
        match self {
            Value::Ref(id) => out.push(id),
            Value::Array(items) => items.iter().for_each(|v| v.collect_refs(out)),
            Value::Dict(d) => d.values().for_each(|v| v.collect_refs(out)),
            Value::String(_) | Value::Integer(_) | Value::Bool(_) => {}
        }
    }

    /// Text form used inside build settings and other loosely-typed dicts.
    pub fn display_text(&self) -> Option<String> {
        match self {
            Value::String(s) => Some(s.clone()),
            Value::Integer(i) => Some(i.to_string()),
            Value::Bool(true) => Some("YES".to_string()),
            Value::Bool(false) => Some("NO".to_string()),
            Value::Ref(id) => Some(id.to_string()),
            Value::Array(_) | Value::Dict(_) => None,
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<Identifier> for Value {
    fn from(id: Identifier) -> Self {
        Value::Ref(id)
    }
}

impl From<Dict> for Value {
    fn from(d: Dict) -> Self {
        Value::Dict(d)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collect_refs_walks_nested_values() {
        let a = Identifier::from_u128(1);
        let b = Identifier::from_u128(2);
        let mut inner = Dict::new();
        inner.insert("ProjectRef".into(), Value::Ref(b.clone()));
        let value = Value::Array(vec![
            Value::Ref(a.clone()),
            Value::string("x"),
            Value::Dict(inner),
        ]);

        let mut refs = Vec::new();
        value.collect_refs(&mut refs);
        assert_eq!(refs, vec![&a, &b]);
    }

    #[test]
    fn display_text_uses_build_setting_spelling() {
        assert_eq!(Value::Bool(true).display_text().as_deref(), Some("YES"));
        assert_eq!(Value::Integer(46).display_text().as_deref(), Some("46"));
        assert_eq!(Value::Array(vec![]).display_text(), None);
    }
}
