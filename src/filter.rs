//! Size-based acceptance of measured regions.

use serde::{Deserialize, Serialize};

use crate::error::{Result, SegmentationError};
use crate::features::{MeasuredRegion, RegionEvaluation};

/// One acceptance policy per run. Bounds are strict.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum SizeFilter {
    /// No size gate.
    #[default]
    AcceptAll,
    /// Accept when `voxel_count < max_voxels`.
    MaxVoxels { max_voxels: usize },
    /// Accept when `min_volume < mesh_volume < max_volume`.
    MeshVolume { min_volume: f64, max_volume: f64 },
}

#[derive(Debug, Clone, PartialEq)]
pub enum RejectReason {
    TooManyVoxels { voxel_count: usize },
    OutsideVolumeWindow { mesh_volume: f64 },
    MissingMeshVolume,
    MeasurementFailed(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct RejectedRegion {
    pub index: usize,
    pub label: u32,
    pub reason: RejectReason,
}

/// Accepted and rejected regions, each in extraction order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterOutcome {
    pub accepted: Vec<MeasuredRegion>,
    pub rejected: Vec<RejectedRegion>,
}

impl SizeFilter {
    pub fn validate(&self) -> Result<()> {
        match *self {
            SizeFilter::AcceptAll => Ok(()),
            SizeFilter::MaxVoxels { max_voxels } if max_voxels == 0 => Err(
                SegmentationError::InvalidParameter("max_voxels must be positive".to_string()),
            ),
            SizeFilter::MaxVoxels { .. } => Ok(()),
            SizeFilter::MeshVolume {
                min_volume,
                max_volume,
            } => {
                if !min_volume.is_finite() || !max_volume.is_finite() || min_volume < 0.0 {
                    return Err(SegmentationError::InvalidParameter(format!(
                        "volume bounds must be finite and non-negative, got ({min_volume}, {max_volume})"
                    )));
                }
                if max_volume <= min_volume {
                    return Err(SegmentationError::InvalidParameter(format!(
                        "max_volume must exceed min_volume, got ({min_volume}, {max_volume})"
                    )));
                }
                Ok(())
            }
        }
    }

    /// Whether the evaluator must reconstruct iso-surfaces.
    pub fn requires_mesh(&self) -> bool {
        matches!(self, SizeFilter::MeshVolume { .. })
    }

    pub fn check(&self, region: &MeasuredRegion) -> std::result::Result<(), RejectReason> {
        match *self {
            SizeFilter::AcceptAll => Ok(()),
            SizeFilter::MaxVoxels { max_voxels } => {
                if region.voxel_count < max_voxels {
                    Ok(())
                } else {
                    Err(RejectReason::TooManyVoxels {
                        voxel_count: region.voxel_count,
                    })
                }
            }
            SizeFilter::MeshVolume {
                min_volume,
                max_volume,
            } => match region.mesh_volume {
                Some(volume) if min_volume < volume && volume < max_volume => Ok(()),
                Some(volume) => Err(RejectReason::OutsideVolumeWindow {
                    mesh_volume: volume,
                }),
                None => Err(RejectReason::MissingMeshVolume),
            },
        }
    }

    /// Partition evaluations into accepted and rejected regions.
    pub fn apply(&self, evaluations: &[RegionEvaluation]) -> FilterOutcome {
        let mut outcome = FilterOutcome::default();
        for evaluation in evaluations {
            let verdict = match evaluation {
                RegionEvaluation::Measured(region) => self.check(region).map(|()| region),
                RegionEvaluation::Failed { reason, .. } => {
                    Err(RejectReason::MeasurementFailed(reason.clone()))
                }
            };
            match verdict {
                Ok(region) => outcome.accepted.push(region.clone()),
                Err(reason) => outcome.rejected.push(RejectedRegion {
                    index: evaluation.index(),
                    label: evaluation.label(),
                    reason,
                }),
            }
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn region(index: usize, voxel_count: usize, mesh_volume: Option<f64>) -> RegionEvaluation {
        RegionEvaluation::Measured(MeasuredRegion {
            index,
            label: index as u32 + 1,
            voxel_count,
            mean_intensity: 1.0,
            physical_size: voxel_count as f64,
            mesh_volume,
        })
    }

    #[test]
    fn test_max_voxels_bound_is_strict() {
        let filter = SizeFilter::MaxVoxels { max_voxels: 9 };
        let outcome = filter.apply(&[region(0, 1, None), region(1, 9, None), region(2, 8, None)]);
        let accepted: Vec<_> = outcome.accepted.iter().map(|r| r.index).collect();
        assert_eq!(accepted, vec![0, 2]);
        assert_eq!(
            outcome.rejected,
            vec![RejectedRegion {
                index: 1,
                label: 2,
                reason: RejectReason::TooManyVoxels { voxel_count: 9 }
            }]
        );
    }

    #[test]
    fn test_mesh_volume_window_is_open() {
        let filter = SizeFilter::MeshVolume {
            min_volume: 27.0,
            max_volume: 343.0,
        };
        let evaluations = [
            region(0, 30, Some(27.0)),
            region(1, 30, Some(27.5)),
            region(2, 400, Some(343.0)),
            region(3, 30, None),
        ];
        let outcome = filter.apply(&evaluations);
        assert_eq!(outcome.accepted.len(), 1);
        assert_eq!(outcome.accepted[0].index, 1);
        assert_eq!(outcome.rejected.len(), 3);
        assert_eq!(outcome.rejected[2].reason, RejectReason::MissingMeshVolume);
    }

    #[test]
    fn test_failed_measurement_is_rejected_with_reason() {
        let evaluations = [RegionEvaluation::Failed {
            index: 0,
            label: 1,
            reason: "degenerate".to_string(),
        }];
        let outcome = SizeFilter::AcceptAll.apply(&evaluations);
        assert!(outcome.accepted.is_empty());
        assert_eq!(
            outcome.rejected[0].reason,
            RejectReason::MeasurementFailed("degenerate".to_string())
        );
    }

    #[test]
    fn test_filter_is_idempotent() {
        let filter = SizeFilter::MaxVoxels { max_voxels: 5 };
        let evaluations: Vec<_> = (0..10).map(|i| region(i, i, None)).collect();
        assert_eq!(filter.apply(&evaluations), filter.apply(&evaluations));
    }

    #[test]
    fn test_validation() {
        assert!(SizeFilter::MaxVoxels { max_voxels: 0 }.validate().is_err());
        assert!(
            SizeFilter::MeshVolume {
                min_volume: 10.0,
                max_volume: 10.0
            }
            .validate()
            .is_err()
        );
        assert!(
            SizeFilter::MeshVolume {
                min_volume: -1.0,
                max_volume: 10.0
            }
            .validate()
            .is_err()
        );
        assert!(SizeFilter::AcceptAll.validate().is_ok());
        assert!(SizeFilter::MeshVolume {
            min_volume: 27.0,
            max_volume: 343.0
        }
        .requires_mesh());
    }
}
