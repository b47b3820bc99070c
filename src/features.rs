//! Per-region measurements.

use rayon::prelude::*;
use tracing::warn;

use crate::error::{Result, SegmentationError};
use crate::mesh::IsoSurface;
use crate::region::Region;
use crate::volume::VoxelGrid;

/// Measurements of one region. `index` is the region's position in
/// extraction order.
#[derive(Debug, Clone, PartialEq)]
pub struct MeasuredRegion {
    pub index: usize,
    pub label: u32,
    pub voxel_count: usize,
    pub mean_intensity: f64,
    pub physical_size: f64,
    pub mesh_volume: Option<f64>,
}

/// Outcome of measuring one region.
#[derive(Debug, Clone, PartialEq)]
pub enum RegionEvaluation {
    Measured(MeasuredRegion),
    /// The region could not be measured and must not be accepted.
    Failed {
        index: usize,
        label: u32,
        reason: String,
    },
}

impl RegionEvaluation {
    pub fn index(&self) -> usize {
        match self {
            RegionEvaluation::Measured(region) => region.index,
            RegionEvaluation::Failed { index, .. } => *index,
        }
    }

    pub fn label(&self) -> u32 {
        match self {
            RegionEvaluation::Measured(region) => region.label,
            RegionEvaluation::Failed { label, .. } => *label,
        }
    }
}

pub struct FeatureEvaluator<'a> {
    grid: &'a VoxelGrid,
    with_mesh: bool,
}

impl<'a> FeatureEvaluator<'a> {
    /// `with_mesh` enables the iso-surface volume, needed only by the
    /// mesh-volume filter.
    pub fn new(grid: &'a VoxelGrid, with_mesh: bool) -> Self {
        Self { grid, with_mesh }
    }

    /// Fails only on an empty region. Mesh failures are reported as
    /// [`RegionEvaluation::Failed`].
    pub fn evaluate(&self, index: usize, region: &Region) -> Result<RegionEvaluation> {
        let voxel_count = region.voxel_count();
        if voxel_count == 0 {
            return Err(SegmentationError::EmptyRegion {
                label: region.label(),
            });
        }

        let data = self.grid.data();
        let sum: f64 = region
            .voxels()
            .iter()
            .map(|&voxel| f64::from(data[voxel]))
            .sum();
        let mean_intensity = sum / voxel_count as f64;

        let calibration = self.grid.calibration();
        let physical_size = voxel_count as f64 * calibration.voxel_size(self.grid.is_planar());

        let mesh_volume = if self.with_mesh {
            match IsoSurface::from_region(region, calibration) {
                Ok(surface) => Some(surface.volume()),
                Err(error) => {
                    warn!(label = region.label(), %error, "region measurement failed");
                    return Ok(RegionEvaluation::Failed {
                        index,
                        label: region.label(),
                        reason: error.to_string(),
                    });
                }
            }
        } else {
            None
        };

        Ok(RegionEvaluation::Measured(MeasuredRegion {
            index,
            label: region.label(),
            voxel_count,
            mean_intensity,
            physical_size,
            mesh_volume,
        }))
    }

    /// Evaluate all regions in parallel, keeping extraction order.
    pub fn evaluate_all(&self, regions: &[Region]) -> Result<Vec<RegionEvaluation>> {
        regions
            .par_iter()
            .enumerate()
            .map(|(index, region)| self.evaluate(index, region))
            .collect()
    }
}
