//! Stage orchestration: normalize, binarize, label, extract, measure,
//! filter, tabulate.

use rand::Rng;
use tracing::{debug, info};
use web_time::Instant;

use crate::backend::{CpuBackend, FilterBackend};
use crate::binarizer::binarize;
use crate::colorize::ColorizedLabels;
use crate::config::PipelineConfig;
use crate::error::{Result, SegmentationError};
use crate::features::{FeatureEvaluator, RegionEvaluation};
use crate::filter::FilterOutcome;
use crate::labeler::LabelGrid;
use crate::normalizer::difference_of_gaussians;
use crate::region::extract_regions;
use crate::table::ResultTable;
use crate::volume::VoxelGrid;

pub struct Pipeline<B: FilterBackend = CpuBackend> {
    config: PipelineConfig,
    backend: B,
}

#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub labels: LabelGrid,
    /// One entry per extracted region, in extraction order.
    pub evaluations: Vec<RegionEvaluation>,
    pub outcome: FilterOutcome,
    pub table: ResultTable,
}

impl PipelineOutput {
    pub fn colorize<R: Rng>(&self, rng: &mut R) -> ColorizedLabels<'_> {
        ColorizedLabels::new(&self.labels, &self.outcome.accepted, rng)
    }
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Result<Self> {
        Self::with_backend(config, CpuBackend)
    }
}

impl<B: FilterBackend> Pipeline<B> {
    /// Validates the configuration before anything runs.
    pub fn with_backend(config: PipelineConfig, backend: B) -> Result<Self> {
        config.validate()?;
        Ok(Self { config, backend })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn run(&self, grid: &VoxelGrid) -> Result<PipelineOutput> {
        let started = Instant::now();
        let planar = grid.is_planar();

        let stage = Instant::now();
        let normalized = match &self.config.background {
            Some(params) => difference_of_gaussians(grid, params, &self.backend)?,
            None => grid.data().to_owned(),
        };
        debug!(elapsed = ?stage.elapsed(), "background normalization");

        let stage = Instant::now();
        let mask = match binarize(
            normalized.view(),
            self.config.threshold,
            self.config.erode,
            &self.backend,
        ) {
            Ok(mask) => mask,
            Err(SegmentationError::EmptyInput) => {
                info!("no foreground voxels, zero regions found");
                return Ok(PipelineOutput {
                    labels: LabelGrid::empty(grid.dim()),
                    evaluations: Vec::new(),
                    outcome: FilterOutcome::default(),
                    table: ResultTable::build(&[], grid.calibration(), planar),
                });
            }
            Err(error) => return Err(error),
        };
        debug!(elapsed = ?stage.elapsed(), "binarization");

        let stage = Instant::now();
        let labels = LabelGrid::from_mask(mask.view());
        let regions = extract_regions(&labels);
        debug!(
            regions = regions.len(),
            elapsed = ?stage.elapsed(),
            "labeling"
        );

        let stage = Instant::now();
        let evaluator = FeatureEvaluator::new(grid, self.config.filter.requires_mesh());
        let evaluations = evaluator.evaluate_all(&regions)?;
        debug!(elapsed = ?stage.elapsed(), "feature evaluation");

        let outcome = self.config.filter.apply(&evaluations);
        let table = ResultTable::build(&outcome.accepted, grid.calibration(), planar);

        info!(
            regions = evaluations.len(),
            accepted = outcome.accepted.len(),
            rejected = outcome.rejected.len(),
            elapsed = ?started.elapsed(),
            "pipeline finished"
        );

        Ok(PipelineOutput {
            labels,
            evaluations,
            outcome,
            table,
        })
    }
}
