//! Property-list values.

use indexmap::IndexMap;

/// An ordered dictionary; keys keep the order they were read or inserted in.
pub type PlistDict = IndexMap<String, PlistValue>;

/// One value of a flat property-list document.
#[derive(Debug, Clone, PartialEq)]
pub enum PlistValue {
    String(String),
    Bool(bool),
    Integer(i64),
    Real(f64),
    /// ISO 8601 text, kept as written.
    Date(String),
    Array(Vec<PlistValue>),
    Dict(PlistDict),
}

impl PlistValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            PlistValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            PlistValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            PlistValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[PlistValue]> {
        match self {
            PlistValue::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_array_mut(&mut self) -> Option<&mut Vec<PlistValue>> {
        match self {
            PlistValue::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_dict(&self) -> Option<&PlistDict> {
        match self {
            PlistValue::Dict(dict) => Some(dict),
            _ => None,
        }
    }

    pub fn as_dict_mut(&mut self) -> Option<&mut PlistDict> {
        match self {
            PlistValue::Dict(dict) => Some(dict),
            _ => None,
        }
    }

    /// Append `item` to an array value unless an equal element exists.
    ///
    /// Returns whether the array changed; non-arrays are left alone.
    pub fn push_unique(&mut self, item: impl Into<PlistValue>) -> bool {
        let item = item.into();
        match self {
            PlistValue::Array(items) if !items.contains(&item) => {
                items.push(item);
                true
            }
            _ => false,
        }
    }

    /// XML element name of this value.
    pub fn element_name(&self) -> &'static str {
        match self {
            PlistValue::String(_) => "string",
            PlistValue::Bool(true) => "true",
            PlistValue::Bool(false) => "false",
            PlistValue::Integer(_) => "integer",
            PlistValue::Real(_) => "real",
            PlistValue::Date(_) => "date",
            PlistValue::Array(_) => "array",
            PlistValue::Dict(_) => "dict",
        }
    }
}

impl From<&str> for PlistValue {
    fn from(s: &str) -> Self {
        PlistValue::String(s.to_string())
    }
}

impl From<String> for PlistValue {
    fn from(s: String) -> Self {
        PlistValue::String(s)
    }
}

impl From<bool> for PlistValue {
    fn from(b: bool) -> Self {
        PlistValue::Bool(b)
    }
}

impl From<i64> for PlistValue {
    fn from(i: i64) -> Self {
        PlistValue::Integer(i)
    }
}

impl From<f64> for PlistValue {
    fn from(r: f64) -> Self {
        PlistValue::Real(r)
    }
}

impl From<PlistDict> for PlistValue {
    fn from(d: PlistDict) -> Self {
        PlistValue::Dict(d)
    }
}

impl<T: Into<PlistValue>> From<Vec<T>> for PlistValue {
    fn from(items: Vec<T>) -> Self {
        PlistValue::Array(items.into_iter().map(Into::into).collect())
    }
}
