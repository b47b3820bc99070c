//! Error types for the segmentation pipeline.

use thiserror::Error;

/// Result type for segmentation operations.
pub type Result<T> = std::result::Result<T, SegmentationError>;

#[derive(Debug, Error)]
pub enum SegmentationError {
    /// Smoothing scales, threshold or filter bounds are malformed.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("invalid calibration: {0}")]
    InvalidCalibration(String),

    #[error("shape mismatch: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        expected: (usize, usize, usize),
        actual: (usize, usize, usize),
    },

    /// Thresholding left no foreground voxels.
    #[error("no foreground voxels after thresholding")]
    EmptyInput,

    /// A region without voxels reached measurement. Indicates a labeling defect.
    #[error("region {label} has no voxels")]
    EmptyRegion { label: u32 },

    #[error("iso-surface reconstruction failed for region {label}: {reason}")]
    MeshReconstruction { label: u32, reason: String },
}
