//! Vertical redistribution of plume emissions.
//!
//! Mass is spread uniformly over every layer from the surface up to the
//! layer containing the injection height.

use serde::{Deserialize, Serialize};

use crate::{RegridError, Result};

/// Layer heights above terrain for one destination column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerticalColumn {
    heights: Vec<f64>,
    terrain: f64,
}

impl VerticalColumn {
    /// Create a column; `heights` must be strictly increasing.
    pub fn new(heights: Vec<f64>, terrain: f64) -> Result<Self> {
        if heights.is_empty() {
            return Err(RegridError::empty_grid("vertical column has no layers"));
        }
        if heights.windows(2).any(|w| w[1] <= w[0]) {
            return Err(RegridError::NonMonotonicLevels);
        }
        Ok(Self { heights, terrain })
    }

    pub fn layers(&self) -> usize {
        self.heights.len()
    }

    pub fn terrain(&self) -> f64 {
        self.terrain
    }

    /// Index of the highest layer receiving emissions injected at `height`
    /// (metres above sea level).
    ///
    /// Right-biased search over `heights + terrain`, clamped to the top layer.
    pub fn injection_layer(&self, height: f64) -> usize {
        injection_layer(&self.heights, self.terrain, height)
    }
}

/// Injection layer over raw height slices.
pub fn injection_layer(heights: &[f64], terrain: f64, height: f64) -> usize {
    let k = heights.partition_point(|&h| h + terrain <= height);
    k.min(heights.len().saturating_sub(1))
}

/// Split `value` evenly across layers `0..=k` of `column`.
///
/// A zero value contributes nothing and returns all zeros.
pub fn distribute(value: f64, injection_height: f64, column: &VerticalColumn) -> Vec<f64> {
    let mut out = vec![0.0; column.layers()];
    if value == 0.0 {
        return out;
    }
    let k = column.injection_layer(injection_height);
    let share = value / (k + 1) as f64;
    for slot in out.iter_mut().take(k + 1) {
        *slot = share;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn column() -> VerticalColumn {
        VerticalColumn::new(vec![20.0, 60.0, 150.0, 400.0, 1000.0], 100.0).unwrap()
    }

    #[test]
    fn test_below_first_layer_goes_to_surface() {
        let out = distribute(6.0, 50.0, &column());
        assert_eq!(out, vec![6.0, 0.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_uniform_split() {
        // 100 m terrain + 150 m = 250 m, so 260 m lands past layer 2
        let out = distribute(8.0, 260.0, &column());
        assert_eq!(out, vec![2.0, 2.0, 2.0, 2.0, 0.0]);
    }

    #[test]
    fn test_exact_interface_is_right_biased() {
        // 100 + 60 = 160 exactly; bisect_right moves past it
        assert_eq!(column().injection_layer(160.0), 2);
    }

    #[test]
    fn test_above_model_top_is_clamped() {
        let out = distribute(10.0, 50_000.0, &column());
        assert_eq!(out.len(), 5);
        let total: f64 = out.iter().sum();
        assert!((total - 10.0).abs() < 1e-12);
        assert!(out.iter().all(|&v| (v - 2.0).abs() < 1e-12));
    }

    #[test]
    fn test_zero_value_short_circuits() {
        assert!(distribute(0.0, 500.0, &column()).iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_non_monotonic_rejected() {
        assert!(VerticalColumn::new(vec![10.0, 5.0], 0.0).is_err());
    }
}
