//! Thresholding into a foreground mask, with optional erosion.

use ndarray::{Array3, ArrayView3};
use tracing::debug;

use crate::backend::{FilterBackend, check_shape};
use crate::enums::ThresholdMethod;
use crate::error::{Result, SegmentationError};

const HISTOGRAM_BINS: usize = 256;

/// Threshold `grid` and optionally erode the mask once.
///
/// Returns [`SegmentationError::EmptyInput`] when no foreground voxel
/// survives.
pub fn binarize(
    grid: ArrayView3<'_, f32>,
    method: ThresholdMethod,
    erode: bool,
    backend: &impl FilterBackend,
) -> Result<Array3<bool>> {
    let threshold = resolve_threshold(grid, method)?;
    debug!(threshold, erode, "binarizing grid");

    let mut mask = backend.threshold(grid, threshold);
    check_shape(grid.dim(), mask.dim())?;
    if erode {
        mask = backend.erode(mask.view());
        check_shape(grid.dim(), mask.dim())?;
    }

    if !mask.iter().any(|&foreground| foreground) {
        return Err(SegmentationError::EmptyInput);
    }
    Ok(mask)
}

pub fn resolve_threshold(grid: ArrayView3<'_, f32>, method: ThresholdMethod) -> Result<f32> {
    match method {
        ThresholdMethod::Fixed(value) if value.is_finite() => Ok(value),
        ThresholdMethod::Fixed(value) => Err(SegmentationError::InvalidParameter(format!(
            "threshold must be finite, got {value}"
        ))),
        ThresholdMethod::Otsu => Ok(otsu_threshold(grid)),
    }
}

/// Otsu's threshold over a histogram spanning the finite value range.
///
/// The returned value is the upper edge of the background class, so
/// `value > threshold` selects the foreground class. A constant grid yields
/// its own value.
pub fn otsu_threshold(grid: ArrayView3<'_, f32>) -> f32 {
    let (min, max) = grid
        .iter()
        .filter(|v| v.is_finite())
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });
    if !(max > min) {
        return if min.is_finite() { min } else { 0.0 };
    }

    let bin_width = (max - min) / HISTOGRAM_BINS as f32;
    let mut histogram = [0u64; HISTOGRAM_BINS];
    for &value in grid.iter().filter(|v| v.is_finite()) {
        let bin = (((value - min) / bin_width) as usize).min(HISTOGRAM_BINS - 1);
        histogram[bin] += 1;
    }

    let total: f64 = histogram.iter().sum::<u64>() as f64;
    let weighted_total: f64 = histogram
        .iter()
        .enumerate()
        .map(|(i, &count)| i as f64 * count as f64)
        .sum();

    let mut weight_background = 0.0;
    let mut sum_background = 0.0;
    let mut best_variance = -1.0;
    let mut best_bin = 0;

    for (i, &count) in histogram.iter().enumerate() {
        weight_background += count as f64;
        if weight_background == 0.0 {
            continue;
        }
        let weight_foreground = total - weight_background;
        if weight_foreground == 0.0 {
            break;
        }

        sum_background += i as f64 * count as f64;
        let mean_background = sum_background / weight_background;
        let mean_foreground = (weighted_total - sum_background) / weight_foreground;
        let variance =
            weight_background * weight_foreground * (mean_background - mean_foreground).powi(2);

        if variance > best_variance {
            best_variance = variance;
            best_bin = i;
        }
    }

    min + (best_bin + 1) as f32 * bin_width
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::CpuBackend;
    use ndarray::Array3;

    fn bimodal() -> Array3<f32> {
        Array3::from_shape_fn((1, 10, 10), |(_, y, x)| {
            if y < 5 && x < 5 { 200.0 + x as f32 } else { 10.0 + y as f32 }
        })
    }

    #[test]
    fn test_fixed_threshold_mask() {
        let grid = bimodal();
        let mask = binarize(grid.view(), ThresholdMethod::Fixed(100.0), false, &CpuBackend).unwrap();
        assert_eq!(mask.iter().filter(|&&v| v).count(), 25);
    }

    #[test]
    fn test_otsu_separates_bimodal_grid() {
        let grid = bimodal();
        let threshold = otsu_threshold(grid.view());
        assert!(threshold > 19.0 && threshold < 200.0, "threshold {threshold}");
        let mask = binarize(grid.view(), ThresholdMethod::Otsu, false, &CpuBackend).unwrap();
        assert_eq!(mask.iter().filter(|&&v| v).count(), 25);
    }

    #[test]
    fn test_constant_grid_otsu_is_empty() {
        let grid = Array3::from_elem((2, 3, 3), 5.0f32);
        assert_eq!(otsu_threshold(grid.view()), 5.0);
        let result = binarize(grid.view(), ThresholdMethod::Otsu, false, &CpuBackend);
        assert!(matches!(result, Err(SegmentationError::EmptyInput)));
    }

    #[test]
    fn test_all_zero_grid_is_empty_input() {
        let grid = Array3::<f32>::zeros((1, 4, 4));
        let result = binarize(grid.view(), ThresholdMethod::Fixed(0.5), false, &CpuBackend);
        assert!(matches!(result, Err(SegmentationError::EmptyInput)));
    }

    #[test]
    fn test_erosion_can_empty_the_mask() {
        let mut grid = Array3::<f32>::zeros((1, 5, 5));
        grid[[0, 2, 2]] = 10.0;
        let result = binarize(grid.view(), ThresholdMethod::Fixed(5.0), true, &CpuBackend);
        assert!(matches!(result, Err(SegmentationError::EmptyInput)));
    }

    #[test]
    fn test_non_finite_fixed_threshold_is_invalid() {
        let grid = bimodal();
        let result = binarize(grid.view(), ThresholdMethod::Fixed(f32::NAN), false, &CpuBackend);
        assert!(matches!(result, Err(SegmentationError::InvalidParameter(_))));
    }
}
