//! Difference-of-Gaussians background normalization.

use ndarray::{Array3, Zip};
use serde::{Deserialize, Serialize};

use crate::backend::{FilterBackend, MAX_SIGMA, Sigma, check_shape};
use crate::error::{Result, SegmentationError};
use crate::volume::VoxelGrid;

/// Fine and coarse smoothing scales for the DoG image.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DogParams {
    pub fine: Sigma,
    pub coarse: Sigma,
}

impl Default for DogParams {
    fn default() -> Self {
        Self {
            fine: Sigma::new(1.0, 1.0, 0.0),
            coarse: Sigma::new(3.0, 3.0, 0.0),
        }
    }
}

impl DogParams {
    /// In-plane scales need `coarse > fine > 0`. Along z both may be 0 to
    /// disable smoothing, otherwise `coarse > fine >= 0`. No scale may
    /// exceed [`MAX_SIGMA`].
    pub fn validate(&self) -> Result<()> {
        let axes = [
            ("x", self.fine.x, self.coarse.x),
            ("y", self.fine.y, self.coarse.y),
            ("z", self.fine.z, self.coarse.z),
        ];
        for (axis, fine, coarse) in axes {
            if !fine.is_finite() || !coarse.is_finite() || fine < 0.0 || coarse < 0.0 {
                return Err(SegmentationError::InvalidParameter(format!(
                    "sigma along {axis} must be finite and non-negative, got ({fine}, {coarse})"
                )));
            }
            if fine > MAX_SIGMA || coarse > MAX_SIGMA {
                return Err(SegmentationError::InvalidParameter(format!(
                    "sigma along {axis} must not exceed {MAX_SIGMA}, got ({fine}, {coarse})"
                )));
            }
            let disabled = axis == "z" && fine == 0.0 && coarse == 0.0;
            if disabled {
                continue;
            }
            if axis != "z" && fine == 0.0 {
                return Err(SegmentationError::InvalidParameter(format!(
                    "fine sigma along {axis} must be positive"
                )));
            }
            if coarse <= fine {
                return Err(SegmentationError::InvalidParameter(format!(
                    "coarse sigma along {axis} must exceed fine sigma, got ({fine}, {coarse})"
                )));
            }
        }
        Ok(())
    }
}

/// `Blur(fine) - Blur(coarse)`, same shape as the grid. Values may be negative.
pub fn difference_of_gaussians(
    grid: &VoxelGrid,
    params: &DogParams,
    backend: &impl FilterBackend,
) -> Result<Array3<f32>> {
    params.validate()?;

    let (mut fine, coarse) = rayon::join(
        || backend.gaussian_blur(grid.data(), params.fine),
        || backend.gaussian_blur(grid.data(), params.coarse),
    );
    check_shape(grid.dim(), fine.dim())?;
    check_shape(grid.dim(), coarse.dim())?;
    Zip::from(&mut fine)
        .and(&coarse)
        .par_for_each(|fine, &coarse| *fine -= coarse);
    Ok(fine)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::CpuBackend;
    use crate::volume::Calibration;
    use approx::assert_abs_diff_eq;
    use ndarray::Array2;

    fn params(fine: (f32, f32, f32), coarse: (f32, f32, f32)) -> DogParams {
        DogParams {
            fine: Sigma::new(fine.0, fine.1, fine.2),
            coarse: Sigma::new(coarse.0, coarse.1, coarse.2),
        }
    }

    #[test]
    fn test_default_params_are_valid() {
        assert!(DogParams::default().validate().is_ok());
    }

    #[test]
    fn test_rejects_coarse_not_larger_than_fine() {
        let result = params((2.0, 2.0, 0.0), (2.0, 3.0, 0.0)).validate();
        assert!(matches!(result, Err(SegmentationError::InvalidParameter(_))));
    }

    #[test]
    fn test_rejects_negative_sigma() {
        assert!(params((1.0, 1.0, -1.0), (3.0, 3.0, 0.0)).validate().is_err());
    }

    #[test]
    fn test_rejects_zero_in_plane_fine_sigma() {
        assert!(params((0.0, 1.0, 0.0), (3.0, 3.0, 0.0)).validate().is_err());
    }

    #[test]
    fn test_accepts_z_smoothing() {
        assert!(params((1.0, 1.0, 0.0), (3.0, 3.0, 1.0)).validate().is_ok());
        assert!(params((1.0, 1.0, 1.0), (3.0, 3.0, 1.0)).validate().is_err());
    }

    #[test]
    fn test_rejects_sigma_above_limit() {
        let huge = params((1.0, 1.0, 0.0), (f32::MAX, f32::MAX, 0.0));
        assert!(matches!(
            huge.validate(),
            Err(SegmentationError::InvalidParameter(_))
        ));
        assert!(params((1.0, 1.0, 0.0), (MAX_SIGMA, MAX_SIGMA, 0.0)).validate().is_ok());
    }

    #[test]
    fn test_constant_background_is_removed() {
        let grid =
            VoxelGrid::from_planar(Array2::from_elem((12, 12), 7.0), Calibration::unit_spacing("px"))
                .unwrap();
        let dog = difference_of_gaussians(&grid, &DogParams::default(), &CpuBackend).unwrap();
        assert_eq!(dog.dim(), grid.dim());
        for &value in &dog {
            assert_abs_diff_eq!(value, 0.0, epsilon = 1e-4);
        }
    }

    #[test]
    fn test_small_spot_stays_positive() {
        let mut data = Array2::<f32>::zeros((21, 21));
        data[[10, 10]] = 100.0;
        let grid = VoxelGrid::from_planar(data, Calibration::unit_spacing("px")).unwrap();
        let dog = difference_of_gaussians(&grid, &DogParams::default(), &CpuBackend).unwrap();
        assert!(dog[[0, 10, 10]] > 0.0);
        assert!(dog[[0, 10, 14]] < 0.0);
    }
}
