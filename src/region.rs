use crate::labeler::LabelGrid;

/// Inclusive voxel bounds in (z, y, x).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundingBox {
    pub min: [usize; 3],
    pub max: [usize; 3],
}

impl BoundingBox {
    fn at(voxel: [usize; 3]) -> Self {
        Self {
            min: voxel,
            max: voxel,
        }
    }

    fn expand_to_contain(&mut self, voxel: [usize; 3]) {
        for axis in 0..3 {
            self.min[axis] = self.min[axis].min(voxel[axis]);
            self.max[axis] = self.max[axis].max(voxel[axis]);
        }
    }

    /// Extent along (z, y, x), at least 1 along every axis.
    pub fn extent(&self) -> (usize, usize, usize) {
        (
            self.max[0] - self.min[0] + 1,
            self.max[1] - self.min[1] + 1,
            self.max[2] - self.min[2] + 1,
        )
    }
}

/// The voxels sharing one label.
#[derive(Debug, Clone)]
pub struct Region {
    label: u32,
    voxels: Vec<[usize; 3]>,
    bounds: BoundingBox,
}

impl Region {
    pub fn label(&self) -> u32 {
        self.label
    }

    pub fn voxel_count(&self) -> usize {
        self.voxels.len()
    }

    /// Member coordinates in (z, y, x), raster order.
    pub fn voxels(&self) -> &[[usize; 3]] {
        &self.voxels
    }

    pub fn bounds(&self) -> BoundingBox {
        self.bounds
    }
}

/// One region per label, in ascending label order.
pub fn extract_regions(labels: &LabelGrid) -> Vec<Region> {
    let mut regions: Vec<Region> = (1..=labels.num_labels() as u32)
        .map(|label| Region {
            label,
            voxels: Vec::new(),
            bounds: BoundingBox::at([usize::MAX; 3]),
        })
        .collect();

    for ((z, y, x), &label) in labels.labels().indexed_iter() {
        if label == 0 {
            continue;
        }
        let region = &mut regions[label as usize - 1];
        let voxel = [z, y, x];
        if region.voxels.is_empty() {
            region.bounds = BoundingBox::at(voxel);
        } else {
            region.bounds.expand_to_contain(voxel);
        }
        region.voxels.push(voxel);
    }

    regions
}
