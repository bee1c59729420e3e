//! Vertical level matching between a global CTM and CMAQ.

/// Mid-level pressures of a hybrid sigma-pressure column: `hyam * p0 + hybm * ps`.
pub fn hybrid_pressures(hyam: &[f64], hybm: &[f64], p0: f64, ps: f64) -> Vec<f64> {
    hyam.iter()
        .zip(hybm)
        .map(|(&a, &b)| a * p0 + b * ps)
        .collect()
}

/// Half-level pressures of a CMAQ sigma column.
///
/// Full levels are `(psurf - ptop) * sigma + ptop` with the first level
/// pinned to `psurf`; the result averages adjacent full levels, giving one
/// value per layer.
pub fn sigma_layer_pressures(psurf: f64, ptop: f64, sigma: &[f64]) -> Vec<f64> {
    let mut full: Vec<f64> = sigma.iter().map(|&s| (psurf - ptop) * s + ptop).collect();
    if let Some(first) = full.first_mut() {
        *first = psurf;
    }
    full.windows(2).map(|w| (w[0] + w[1]) / 2.0).collect()
}

/// For each destination pressure, the index of the closest source level.
///
/// The search runs over the source levels in reverse order and the first
/// minimum wins, so ties resolve to the later level in file order.
pub fn closest_levels(source: &[f64], dest: &[f64]) -> Vec<usize> {
    let n = source.len();
    dest.iter()
        .map(|&v| {
            let mut best = 0usize;
            let mut best_diff = f64::INFINITY;
            for (i, &p) in source.iter().rev().enumerate() {
                let diff = (p - v).abs();
                if diff < best_diff {
                    best_diff = diff;
                    best = i;
                }
            }
            n - best - 1
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hybrid_pressures() {
        let p = hybrid_pressures(&[0.1, 0.0], &[0.0, 1.0], 100_000.0, 95_000.0);
        assert_eq!(p, vec![10_000.0, 95_000.0]);
    }

    #[test]
    fn test_sigma_layer_pressures() {
        let p = sigma_layer_pressures(100_000.0, 5_000.0, &[1.0, 0.5, 0.0]);
        // full levels: 100000, 52500, 5000
        assert_eq!(p, vec![76_250.0, 28_750.0]);
    }

    #[test]
    fn test_closest_levels_in_file_order() {
        // Source stored top-down as in MOZART/CAM-chem output
        let source = [1_000.0, 10_000.0, 50_000.0, 90_000.0, 100_000.0];
        let dest = [98_000.0, 60_000.0, 2_000.0];
        assert_eq!(closest_levels(&source, &dest), vec![4, 2, 0]);
    }

    #[test]
    fn test_closest_levels_tie() {
        let source = [10.0, 20.0];
        // 15 is equidistant; reverse scan sees 20 first
        assert_eq!(closest_levels(&source, &[15.0]), vec![1]);
    }
}
