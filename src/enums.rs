use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    Axial,
    Coronal,
    Sagittal,
}

/// How the binarization threshold is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThresholdMethod {
    /// Voxels strictly above this value are foreground.
    Fixed(f32),
    /// Global Otsu threshold computed from the grid histogram.
    Otsu,
}

impl Default for ThresholdMethod {
    fn default() -> Self {
        ThresholdMethod::Fixed(1.0)
    }
}

#[derive(Default)]
pub enum SortBy {
    #[default]
    ImagePositionPatient,
    InstanceNumber,
    None,
}
