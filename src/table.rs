use std::fmt;

use crate::features::MeasuredRegion;
use crate::volume::Calibration;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResultRow {
    /// Position of the region in extraction order, before filtering.
    pub index: usize,
    pub physical_size: f64,
    pub mean_intensity: f64,
}

/// Rows for accepted regions, with unit-qualified column headers.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultTable {
    headers: [String; 3],
    rows: Vec<ResultRow>,
}

impl ResultTable {
    pub fn build(accepted: &[MeasuredRegion], calibration: &Calibration, planar: bool) -> Self {
        let size_header = if planar {
            format!("Area in {}", calibration.unit)
        } else {
            format!("Volume in {}³", calibration.unit)
        };
        let rows = accepted
            .iter()
            .map(|region| ResultRow {
                index: region.index,
                physical_size: region.physical_size,
                mean_intensity: region.mean_intensity,
            })
            .collect();

        Self {
            headers: ["Index".to_string(), size_header, "Mean intensity".to_string()],
            rows,
        }
    }

    pub fn headers(&self) -> &[String; 3] {
        &self.headers
    }

    pub fn rows(&self) -> &[ResultRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Tab separated, header line first.
impl fmt::Display for ResultTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.headers.join("\t"))?;
        for row in &self.rows {
            writeln!(
                f,
                "{}\t{}\t{}",
                row.index, row.physical_size, row.mean_intensity
            )?;
        }
        Ok(())
    }
}
