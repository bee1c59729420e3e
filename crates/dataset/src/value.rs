//! Attribute values and variables.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{DatasetError, DatasetResult};

/// A global or variable attribute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttrValue {
    Int(i64),
    Float(f64),
    Ints(Vec<i64>),
    Floats(Vec<f64>),
    Text(String),
}

impl AttrValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            AttrValue::Int(v) => Some(*v as f64),
            AttrValue::Float(v) => Some(*v),
            AttrValue::Ints(v) if v.len() == 1 => Some(v[0] as f64),
            AttrValue::Floats(v) if v.len() == 1 => Some(v[0]),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            AttrValue::Int(v) => Some(*v),
            AttrValue::Float(v) if v.fract() == 0.0 => Some(*v as i64),
            AttrValue::Ints(v) if v.len() == 1 => Some(v[0]),
            _ => None,
        }
    }

    pub fn as_f64_vec(&self) -> Option<Vec<f64>> {
        match self {
            AttrValue::Int(v) => Some(vec![*v as f64]),
            AttrValue::Float(v) => Some(vec![*v]),
            AttrValue::Ints(v) => Some(v.iter().map(|&x| x as f64).collect()),
            AttrValue::Floats(v) => Some(v.clone()),
            AttrValue::Text(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttrValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl From<i64> for AttrValue {
    fn from(v: i64) -> Self {
        AttrValue::Int(v)
    }
}

impl From<i32> for AttrValue {
    fn from(v: i32) -> Self {
        AttrValue::Int(v as i64)
    }
}

impl From<f64> for AttrValue {
    fn from(v: f64) -> Self {
        AttrValue::Float(v)
    }
}

impl From<Vec<f64>> for AttrValue {
    fn from(v: Vec<f64>) -> Self {
        AttrValue::Floats(v)
    }
}

impl From<&str> for AttrValue {
    fn from(v: &str) -> Self {
        AttrValue::Text(v.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(v: String) -> Self {
        AttrValue::Text(v)
    }
}

/// An n-dimensional variable stored flat in row-major order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variable {
    pub dims: Vec<String>,
    pub shape: Vec<usize>,
    #[serde(default)]
    pub attrs: BTreeMap<String, AttrValue>,
    pub data: Vec<f64>,
}

impl Variable {
    /// Create a variable, checking that `data` fills `shape`.
    pub fn new(
        name: &str,
        dims: &[&str],
        shape: &[usize],
        data: Vec<f64>,
    ) -> DatasetResult<Self> {
        let expected: usize = shape.iter().product();
        if dims.len() != shape.len() || data.len() != expected {
            return Err(DatasetError::ShapeMismatch {
                name: name.to_string(),
                shape: shape.to_vec(),
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            dims: dims.iter().map(|d| d.to_string()).collect(),
            shape: shape.to_vec(),
            attrs: BTreeMap::new(),
            data,
        })
    }

    /// Attach an attribute (builder style).
    pub fn with_attr(mut self, name: &str, value: impl Into<AttrValue>) -> Self {
        self.attrs.insert(name.to_string(), value.into());
        self
    }

    pub fn attr(&self, name: &str) -> Option<&AttrValue> {
        self.attrs.get(name)
    }

    /// Trimmed `units` attribute.
    pub fn units(&self) -> Option<&str> {
        self.attr("units").and_then(AttrValue::as_str).map(str::trim)
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn values(&self) -> &[f64] {
        &self.data
    }

    /// Number of values in one slice along the leading dimension.
    pub fn frame_len(&self) -> usize {
        self.shape.iter().skip(1).product()
    }

    /// Number of slices along the leading dimension.
    pub fn frames(&self) -> usize {
        self.shape.first().copied().unwrap_or(1)
    }

    /// The `index`-th slice along the leading dimension.
    pub fn frame(&self, index: usize) -> Option<&[f64]> {
        if self.shape.is_empty() || index >= self.frames() {
            return None;
        }
        let n = self.frame_len();
        Some(&self.data[index * n..(index + 1) * n])
    }

    /// Value at a full multi-index.
    pub fn get(&self, index: &[usize]) -> Option<f64> {
        if index.len() != self.shape.len() {
            return None;
        }
        let mut flat = 0usize;
        for (&i, &n) in index.iter().zip(&self.shape) {
            if i >= n {
                return None;
            }
            flat = flat * n + i;
        }
        self.data.get(flat).copied()
    }
}
