use crate::enums::Orientation;
use crate::error::{Result, SegmentationError};

use ndarray::{Array2, Array3, ArrayView2, ArrayView3, Axis, s};
use serde::{Deserialize, Serialize};

/// Physical spacing per axis and the unit it is expressed in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Calibration {
    pub spacing_x: f64,
    pub spacing_y: f64,
    pub spacing_z: f64,
    pub unit: String,
}

impl Calibration {
    pub fn new(
        spacing_x: f64,
        spacing_y: f64,
        spacing_z: f64,
        unit: impl Into<String>,
    ) -> Result<Self> {
        let calibration = Self {
            spacing_x,
            spacing_y,
            spacing_z,
            unit: unit.into(),
        };
        calibration.validate()?;
        Ok(calibration)
    }

    /// Spacing of 1 along every axis.
    pub fn unit_spacing(unit: impl Into<String>) -> Self {
        Self {
            spacing_x: 1.0,
            spacing_y: 1.0,
            spacing_z: 1.0,
            unit: unit.into(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        let axes = [
            ("x", self.spacing_x),
            ("y", self.spacing_y),
            ("z", self.spacing_z),
        ];
        for (axis, spacing) in axes {
            if !spacing.is_finite() || spacing <= 0.0 {
                return Err(SegmentationError::InvalidCalibration(format!(
                    "spacing along {axis} must be positive, got {spacing}"
                )));
            }
        }
        Ok(())
    }

    /// Physical area (planar) or volume of a single voxel.
    #[inline]
    pub fn voxel_size(&self, planar: bool) -> f64 {
        let area = self.spacing_x * self.spacing_y;
        if planar { area } else { area * self.spacing_z }
    }
}

/// Immutable intensity grid stored as (depth, height, width).
///
/// A 2D image is a grid of depth 1.
#[derive(Debug, Clone)]
pub struct VoxelGrid {
    data: Array3<f32>,
    calibration: Calibration,
}

impl VoxelGrid {
    pub fn new(data: Array3<f32>, calibration: Calibration) -> Result<Self> {
        calibration.validate()?;
        if data.is_empty() {
            return Err(SegmentationError::InvalidParameter(format!(
                "grid has a zero-length axis: {:?}",
                data.dim()
            )));
        }
        Ok(Self { data, calibration })
    }

    pub fn from_planar(data: Array2<f32>, calibration: Calibration) -> Result<Self> {
        Self::new(data.insert_axis(Axis(0)), calibration)
    }

    /// Get the dimensions of the grid (depth, height, width)
    pub fn dim(&self) -> (usize, usize, usize) {
        self.data.dim()
    }

    /// Get a view of the underlying intensities
    pub fn data(&self) -> ArrayView3<'_, f32> {
        self.data.view()
    }

    pub fn calibration(&self) -> &Calibration {
        &self.calibration
    }

    #[inline]
    pub fn is_planar(&self) -> bool {
        self.data.dim().0 == 1
    }

    pub fn get_slice_from_axis(
        &self,
        index: usize,
        orientation: Orientation,
    ) -> Option<ArrayView2<'_, f32>> {
        slice_along(self.data.view(), index, orientation)
    }
}

pub(crate) fn slice_along<T>(
    data: ArrayView3<'_, T>,
    index: usize,
    orientation: Orientation,
) -> Option<ArrayView2<'_, T>> {
    if !is_valid_index(data.dim(), index, orientation) {
        return None;
    }
    let slice = match orientation {
        Orientation::Axial => data.slice_move(s![index, .., ..]),
        Orientation::Coronal => data.slice_move(s![.., index, ..]),
        Orientation::Sagittal => data.slice_move(s![.., .., index]),
    };
    Some(slice)
}

fn is_valid_index(dim: (usize, usize, usize), index: usize, orientation: Orientation) -> bool {
    let max_index = match orientation {
        Orientation::Axial => dim.0,
        Orientation::Coronal => dim.1,
        Orientation::Sagittal => dim.2,
    };
    index < max_index
}
