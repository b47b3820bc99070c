//! # volume-cells
//!
//! Detects, labels and measures objects ("cells") in calibrated 2D and 3D
//! intensity volumes.
//!
//! A run composes these stages over a [`VoxelGrid`]:
//!  - Background normalization (difference of Gaussians)
//!  - Thresholding into a foreground mask, optionally eroded once
//!  - Connected component labeling (axis-adjacent neighbours)
//!  - Region extraction and per-region measurement: voxel count, physical
//!    size, mean source intensity and, on request, iso-surface volume
//!  - Size filtering by voxel count or by mesh volume window
//!  - A result table of accepted regions
//!
//! Smoothing, thresholding and erosion go through the [`FilterBackend`]
//! trait; [`CpuBackend`] is the reference implementation and uses rayon
//! where the work is independent per lane or per region.
//!
//! Volumes can be loaded from DICOM series with [`VolumeLoader`], or built
//! from any `ndarray::Array3<f32>` plus a [`Calibration`].
//!
//! # Examples
//!
//! ## Counting two blobs in a planar image
//!
//! ```
//! # use volume_cells::{Calibration, Pipeline, PipelineConfig, SizeFilter, ThresholdMethod, VoxelGrid};
//! # use ndarray::Array2;
//! let mut data = Array2::<f32>::zeros((10, 10));
//! data.slice_mut(ndarray::s![0..3, 0..3]).fill(10.0);
//! data.slice_mut(ndarray::s![7..10, 7..10]).fill(10.0);
//! let grid = VoxelGrid::from_planar(data, Calibration::unit_spacing("px")).unwrap();
//!
//! let config = PipelineConfig {
//!     background: None,
//!     threshold: ThresholdMethod::Fixed(5.0),
//!     erode: false,
//!     filter: SizeFilter::AcceptAll,
//! };
//! let output = Pipeline::new(config).unwrap().run(&grid).unwrap();
//! assert_eq!(output.table.len(), 2);
//! ```

pub mod backend;
pub mod binarizer;
pub mod colorize;
pub mod config;
pub mod enums;
pub mod error;
pub mod features;
pub mod filter;
pub mod labeler;
pub mod mesh;
pub mod normalizer;
pub mod pipeline;
pub mod region;
pub mod table;
pub mod volume;
pub mod volume_loader;

pub use backend::{CpuBackend, FilterBackend, Sigma};
pub use colorize::ColorizedLabels;
pub use config::PipelineConfig;
pub use enums::{Orientation, SortBy, ThresholdMethod};
pub use error::{Result, SegmentationError};
pub use features::{MeasuredRegion, RegionEvaluation};
pub use filter::{FilterOutcome, RejectReason, RejectedRegion, SizeFilter};
pub use labeler::LabelGrid;
pub use mesh::IsoSurface;
pub use normalizer::DogParams;
pub use pipeline::{Pipeline, PipelineOutput};
pub use region::Region;
pub use table::{ResultRow, ResultTable};
pub use volume::{Calibration, VoxelGrid};
pub use volume_loader::{VolumeLoader, VolumeLoaderError};
