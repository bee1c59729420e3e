//! Per-species 4D emission fields.
//!
//! Fields live in an [`EmissionsAccumulator`] while sources are added and
//! become an immutable [`EmissionsField`] after [`finalize`]. A species is
//! declared (zero-filled) before anything is added to it; contributions are
//! always summed, never assigned.
//!
//! [`finalize`]: EmissionsAccumulator::finalize

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use speciation::SpeciesClass;
use tracing::{debug, warn};

use crate::{EmissionsError, Result};

/// Dimensions of every field: `[time, layer, row, col]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldShape {
    pub times: usize,
    pub layers: usize,
    pub rows: usize,
    pub cols: usize,
}

impl FieldShape {
    pub fn new(times: usize, layers: usize, rows: usize, cols: usize) -> Self {
        Self {
            times,
            layers,
            rows,
            cols,
        }
    }

    /// Values in one horizontal slice.
    pub fn frame_len(&self) -> usize {
        self.rows * self.cols
    }

    /// Values in one time step.
    pub fn volume_len(&self) -> usize {
        self.layers * self.frame_len()
    }

    pub fn len(&self) -> usize {
        self.times * self.volume_len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn dims(&self) -> [usize; 4] {
        [self.times, self.layers, self.rows, self.cols]
    }

    fn frame_offset(&self, time: usize, layer: usize) -> usize {
        (time * self.layers + layer) * self.frame_len()
    }
}

/// Values and class of one species.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeciesField {
    pub class: SpeciesClass,
    pub values: Vec<f64>,
}

/// Mutable set of species fields sharing one shape.
#[derive(Debug, Clone)]
pub struct EmissionsAccumulator {
    shape: FieldShape,
    fields: BTreeMap<String, SpeciesField>,
}

impl EmissionsAccumulator {
    pub fn new(shape: FieldShape) -> Self {
        Self {
            shape,
            fields: BTreeMap::new(),
        }
    }

    /// Accumulator with every listed species zero-filled.
    pub fn with_species<I, S>(shape: FieldShape, species: I) -> Self
    where
        I: IntoIterator<Item = (S, SpeciesClass)>,
        S: Into<String>,
    {
        let mut acc = Self::new(shape);
        for (name, class) in species {
            acc.declare(name, class);
        }
        acc
    }

    pub fn shape(&self) -> FieldShape {
        self.shape
    }

    /// Zero-fill `name` unless it already exists. Returns whether a new
    /// field was created.
    pub fn declare(&mut self, name: impl Into<String>, class: SpeciesClass) -> bool {
        let name = name.into();
        if self.fields.contains_key(&name) {
            return false;
        }
        let values = vec![0.0; self.shape.len()];
        self.fields.insert(name, SpeciesField { class, values });
        true
    }

    /// Placeholder species that no source provides. An existing field is
    /// kept as is.
    pub fn zero_fill(&mut self, name: &str, class: SpeciesClass) {
        if !self.declare(name, class) {
            warn!(
                species = %name,
                "Species listed for zero-fill is already present; keeping existing values"
            );
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    pub fn class_of(&self, name: &str) -> Option<SpeciesClass> {
        self.fields.get(name).map(|f| f.class)
    }

    pub fn species(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn values(&self, name: &str) -> Option<&[f64]> {
        self.fields.get(name).map(|f| f.values.as_slice())
    }

    fn values_mut(&mut self, name: &str) -> Result<&mut Vec<f64>> {
        self.fields
            .get_mut(name)
            .map(|f| &mut f.values)
            .ok_or_else(|| EmissionsError::UnknownSpecies(name.to_string()))
    }

    /// Add `scale * frame` to one `(time, layer)` slice.
    pub fn add_frame(
        &mut self,
        name: &str,
        time: usize,
        layer: usize,
        frame: &[f64],
        scale: f64,
    ) -> Result<()> {
        let shape = self.shape;
        if frame.len() != shape.frame_len() {
            return Err(EmissionsError::shape_mismatch(
                format!("frame for {}", name),
                shape.frame_len(),
                frame.len(),
            ));
        }
        check_index(name, "time", time, shape.times)?;
        check_index(name, "layer", layer, shape.layers)?;

        let start = shape.frame_offset(time, layer);
        let values = self.values_mut(name)?;
        for (dst, &src) in values[start..start + frame.len()].iter_mut().zip(frame) {
            *dst += src * scale;
        }
        Ok(())
    }

    /// Add `scale * volume` (`[layer, row, col]`) to one time step.
    pub fn add_volume(&mut self, name: &str, time: usize, volume: &[f64], scale: f64) -> Result<()> {
        let shape = self.shape;
        if volume.len() != shape.volume_len() {
            return Err(EmissionsError::shape_mismatch(
                format!("volume for {}", name),
                shape.volume_len(),
                volume.len(),
            ));
        }
        check_index(name, "time", time, shape.times)?;

        let start = time * shape.volume_len();
        let values = self.values_mut(name)?;
        for (dst, &src) in values[start..start + volume.len()].iter_mut().zip(volume) {
            *dst += src * scale;
        }
        Ok(())
    }

    /// Add a single value.
    pub fn add_cell(
        &mut self,
        name: &str,
        [time, layer, row, col]: [usize; 4],
        value: f64,
    ) -> Result<()> {
        let shape = self.shape;
        check_index(name, "time", time, shape.times)?;
        check_index(name, "layer", layer, shape.layers)?;
        check_index(name, "row", row, shape.rows)?;
        check_index(name, "col", col, shape.cols)?;
        let idx = shape.frame_offset(time, layer) + row * shape.cols + col;
        self.values_mut(name)?[idx] += value;
        Ok(())
    }

    /// Clamp negative values to zero and freeze the fields.
    pub fn finalize(self) -> EmissionsField {
        let mut fields = self.fields;
        for (name, field) in fields.iter_mut() {
            let mut clamped = 0usize;
            for v in field.values.iter_mut() {
                if *v < 0.0 {
                    *v = 0.0;
                    clamped += 1;
                }
            }
            if clamped > 0 {
                warn!(species = %name, cells = clamped, "Clamped negative emissions to zero");
            }
        }
        debug!(species = fields.len(), shape = ?self.shape.dims(), "Finalized emissions field");
        EmissionsField {
            shape: self.shape,
            fields,
        }
    }
}

fn check_index(name: &str, axis: &str, index: usize, len: usize) -> Result<()> {
    if index >= len {
        return Err(EmissionsError::shape_mismatch(
            format!("{} index {} for {}", axis, index, name),
            len,
            index + 1,
        ));
    }
    Ok(())
}

/// Finalized, non-negative fields ready to be written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmissionsField {
    shape: FieldShape,
    fields: BTreeMap<String, SpeciesField>,
}

impl EmissionsField {
    pub fn shape(&self) -> FieldShape {
        self.shape
    }

    /// Species in output order (sorted by name).
    pub fn iter(&self) -> impl Iterator<Item = (&str, &SpeciesField)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn get(&self, name: &str) -> Option<&SpeciesField> {
        self.fields.get(name)
    }

    pub fn species_names(&self) -> Vec<&str> {
        self.fields.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Sum of every value of one species.
    pub fn total(&self, name: &str) -> Option<f64> {
        self.fields.get(name).map(|f| f.values.iter().sum())
    }
}
