//! In-memory dataset.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{AttrValue, Dataset, DatasetError, DatasetResult, Variable};

/// A dataset held entirely in memory.
///
/// Maps are ordered so that serialised files and variable listings are
/// deterministic.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MemoryDataset {
    #[serde(skip)]
    source: String,
    #[serde(default)]
    pub dimensions: BTreeMap<String, usize>,
    #[serde(default)]
    pub attributes: BTreeMap<String, AttrValue>,
    #[serde(default)]
    pub variables: BTreeMap<String, Variable>,
}

impl MemoryDataset {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            ..Default::default()
        }
    }

    pub fn set_source(&mut self, source: impl Into<String>) {
        self.source = source.into();
    }

    pub fn with_attribute(mut self, name: &str, value: impl Into<AttrValue>) -> Self {
        self.set_attribute(name, value);
        self
    }

    pub fn set_attribute(&mut self, name: &str, value: impl Into<AttrValue>) {
        self.attributes.insert(name.to_string(), value.into());
    }

    /// Add a variable, registering its dimensions.
    ///
    /// Fails if a dimension is already known with a different length.
    pub fn insert_variable(&mut self, name: &str, variable: Variable) -> DatasetResult<()> {
        for (dim, &len) in variable.dims.iter().zip(&variable.shape) {
            match self.dimensions.get(dim) {
                Some(&known) if known != len => {
                    return Err(DatasetError::ShapeMismatch {
                        name: name.to_string(),
                        shape: variable.shape.clone(),
                        expected: known,
                        actual: len,
                    });
                }
                Some(_) => {}
                None => {
                    self.dimensions.insert(dim.clone(), len);
                }
            }
        }
        self.variables.insert(name.to_string(), variable);
        Ok(())
    }

    /// Builder form of [`insert_variable`](Self::insert_variable).
    pub fn with_variable(mut self, name: &str, variable: Variable) -> DatasetResult<Self> {
        self.insert_variable(name, variable)?;
        Ok(self)
    }
}

impl Dataset for MemoryDataset {
    fn source(&self) -> &str {
        &self.source
    }

    fn dimension(&self, name: &str) -> Option<usize> {
        self.dimensions.get(name).copied()
    }

    fn attribute(&self, name: &str) -> Option<&AttrValue> {
        self.attributes.get(name)
    }

    fn variable(&self, name: &str) -> Option<&Variable> {
        self.variables.get(name)
    }

    fn variable_names(&self) -> Vec<&str> {
        self.variables.keys().map(String::as_str).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> MemoryDataset {
        MemoryDataset::new("sample")
            .with_attribute("XCELL", 12000.0)
            .with_attribute("VGLVLS", vec![1.0, 0.9, 0.8])
            .with_variable(
                "HT",
                Variable::new("HT", &["ROW", "COL"], &[2, 2], vec![1.0, 2.0, 3.0, 4.0]).unwrap(),
            )
            .unwrap()
    }

    #[test]
    fn test_dimensions_registered() {
        let ds = sample();
        assert_eq!(ds.dimension("ROW"), Some(2));
        assert!(ds.require_dimension("LAY").is_err());
    }

    #[test]
    fn test_conflicting_dimension_rejected() {
        let mut ds = sample();
        let v = Variable::new("X", &["ROW"], &[3], vec![0.0; 3]).unwrap();
        assert!(matches!(
            ds.insert_variable("X", v),
            Err(DatasetError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_attribute_helpers() {
        let ds = sample();
        assert_eq!(ds.attr_f64("XCELL").unwrap(), 12000.0);
        assert_eq!(ds.attr_f64_vec("VGLVLS").unwrap().len(), 3);
        assert!(matches!(
            ds.attr_f64("MISSING"),
            Err(DatasetError::MissingAttribute { .. })
        ));
    }

    #[test]
    fn test_require_variable_names_source() {
        let ds = sample();
        let err = ds.require_variable("PSFC").unwrap_err();
        assert!(err.to_string().contains("sample"));
        assert_eq!(ds.variable_names(), vec!["HT"]);
    }
}
