//! Pipeline configuration.

use serde::{Deserialize, Serialize};

use crate::enums::ThresholdMethod;
use crate::error::{Result, SegmentationError};
use crate::filter::SizeFilter;
use crate::normalizer::DogParams;

/// Every tunable of a pipeline run. Missing JSON fields take their
/// defaults, which reproduce the cell counting workflow: DoG with
/// σ = (1, 1, 0) and (3, 3, 0), threshold 1.0, one erosion pass and a
/// mesh volume window of (27, 343).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    /// Background normalization; `None` thresholds the raw grid.
    pub background: Option<DogParams>,
    pub threshold: ThresholdMethod,
    pub erode: bool,
    pub filter: SizeFilter,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            background: Some(DogParams::default()),
            threshold: ThresholdMethod::default(),
            erode: true,
            filter: SizeFilter::MeshVolume {
                min_volume: 27.0,
                max_volume: 343.0,
            },
        }
    }
}

impl PipelineConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| SegmentationError::InvalidParameter(format!("config: {e}")))
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(background) = &self.background {
            background.validate()?;
        }
        match self.threshold {
            ThresholdMethod::Fixed(value) if !value.is_finite() => {
                return Err(SegmentationError::InvalidParameter(format!(
                    "threshold must be finite, got {value}"
                )));
            }
            _ => {}
        }
        self.filter.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::Sigma;

    #[test]
    fn test_default_is_valid() {
        assert!(PipelineConfig::default().validate().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = PipelineConfig::from_json_str(
            r#"{ "background": null, "filter": { "mode": "max_voxels", "max_voxels": 9 } }"#,
        )
        .unwrap();
        assert_eq!(config.background, None);
        assert_eq!(config.filter, SizeFilter::MaxVoxels { max_voxels: 9 });
        assert_eq!(config.threshold, ThresholdMethod::Fixed(1.0));
        assert!(config.erode);
    }

    #[test]
    fn test_full_json() {
        let config = PipelineConfig::from_json_str(
            r#"{
                "background": {
                    "fine": { "x": 1.0, "y": 1.0, "z": 0.0 },
                    "coarse": { "x": 4.0, "y": 4.0, "z": 2.0 }
                },
                "threshold": "otsu",
                "erode": false,
                "filter": { "mode": "mesh_volume", "min_volume": 5.0, "max_volume": 50.0 }
            }"#,
        )
        .unwrap();
        assert_eq!(
            config.background.unwrap().coarse,
            Sigma::new(4.0, 4.0, 2.0)
        );
        assert_eq!(config.threshold, ThresholdMethod::Otsu);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_fixed_threshold_json() {
        let config = PipelineConfig::from_json_str(r#"{ "threshold": { "fixed": 5.0 } }"#).unwrap();
        assert_eq!(config.threshold, ThresholdMethod::Fixed(5.0));
    }

    #[test]
    fn test_unknown_field_is_rejected() {
        assert!(PipelineConfig::from_json_str(r#"{ "sigma": 2 }"#).is_err());
    }

    #[test]
    fn test_invalid_filter_fails_validation() {
        let config = PipelineConfig {
            filter: SizeFilter::MeshVolume {
                min_volume: 50.0,
                max_volume: 5.0,
            },
            ..PipelineConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(SegmentationError::InvalidParameter(_))
        ));
    }
}
