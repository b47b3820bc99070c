//! Random colour tags for accepted regions, for external rendering.

use std::collections::{HashMap, HashSet};

use image::{Rgb, RgbImage};
use rand::Rng;

use crate::enums::Orientation;
use crate::features::MeasuredRegion;
use crate::labeler::LabelGrid;
use crate::volume::slice_along;

const BACKGROUND: [u8; 3] = [0, 0, 0];
const MAX_RANDOM_DRAWS: usize = 64;
const COLOR_MASK: u32 = 0xFF_FFFF;

/// Label grid where every accepted region carries a distinct non-black
/// colour. Background and rejected regions render black.
#[derive(Debug)]
pub struct ColorizedLabels<'a> {
    labels: &'a LabelGrid,
    colors: HashMap<u32, [u8; 3]>,
}

impl<'a> ColorizedLabels<'a> {
    pub fn new<R: Rng>(
        labels: &'a LabelGrid,
        accepted: &[MeasuredRegion],
        rng: &mut R,
    ) -> Self {
        let mut used = HashSet::from([BACKGROUND]);
        let colors = accepted
            .iter()
            .map(|region| (region.label, pick_color(region.label, &mut used, &mut *rng)))
            .collect();
        Self { labels, colors }
    }

    pub fn color_of(&self, label: u32) -> Option<[u8; 3]> {
        self.colors.get(&label).copied()
    }

    /// Render one slice. Rows of the image follow the slice's first axis.
    pub fn slice_image(&self, index: usize, orientation: Orientation) -> Option<RgbImage> {
        let slice = slice_along(self.labels.labels(), index, orientation)?;
        let (height, width) = slice.dim();
        let mut image = RgbImage::new(width as u32, height as u32);
        for ((row, col), &label) in slice.indexed_iter() {
            let color = self.color_of(label).unwrap_or(BACKGROUND);
            image.put_pixel(col as u32, row as u32, Rgb(color));
        }
        Some(image)
    }
}

/// A random unused colour, or the next unused one after the label's own
/// 24-bit value once random draws keep colliding. Only a full palette
/// repeats a colour.
fn pick_color<R: Rng>(label: u32, used: &mut HashSet<[u8; 3]>, rng: &mut R) -> [u8; 3] {
    for _ in 0..MAX_RANDOM_DRAWS {
        let color: [u8; 3] = rng.random();
        if used.insert(color) {
            return color;
        }
    }
    let start = label & COLOR_MASK;
    for offset in 0..=COLOR_MASK {
        let color = rgb((start + offset) & COLOR_MASK);
        if used.insert(color) {
            return color;
        }
    }
    rgb(start.max(1))
}

fn rgb(value: u32) -> [u8; 3] {
    [(value >> 16) as u8, (value >> 8) as u8, value as u8]
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array3;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn measured(label: u32) -> MeasuredRegion {
        MeasuredRegion {
            index: label as usize - 1,
            label,
            voxel_count: 1,
            mean_intensity: 1.0,
            physical_size: 1.0,
            mesh_volume: None,
        }
    }

    #[test]
    fn test_accepted_regions_get_distinct_colors() {
        let mask = Array3::from_shape_fn((1, 1, 9), |(_, _, x)| x % 2 == 0);
        let labels = LabelGrid::from_mask(mask.view());
        assert_eq!(labels.num_labels(), 5);

        let accepted: Vec<_> = [1, 2, 4, 5].into_iter().map(measured).collect();
        let mut rng = StdRng::seed_from_u64(7);
        let colorized = ColorizedLabels::new(&labels, &accepted, &mut rng);

        let colors: HashSet<_> = [1, 2, 4, 5]
            .iter()
            .map(|&label| colorized.color_of(label).unwrap())
            .collect();
        assert_eq!(colors.len(), 4);
        assert!(!colors.contains(&BACKGROUND));
        assert_eq!(colorized.color_of(3), None);

        let image = colorized.slice_image(0, Orientation::Axial).unwrap();
        assert_eq!(image.dimensions(), (9, 1));
        assert_eq!(image.get_pixel(1, 0).0, BACKGROUND);
        assert_eq!(image.get_pixel(4, 0).0, BACKGROUND);
        assert_eq!(image.get_pixel(0, 0).0, colorized.color_of(1).unwrap());
    }

    /// Always yields zero bits, so every random colour is black.
    struct ZeroRng;

    impl rand::RngCore for ZeroRng {
        fn next_u32(&mut self) -> u32 {
            0
        }

        fn next_u64(&mut self) -> u64 {
            0
        }

        fn fill_bytes(&mut self, dst: &mut [u8]) {
            dst.fill(0);
        }
    }

    #[test]
    fn test_colliding_draws_fall_back_to_label_colors() {
        let mask = Array3::from_shape_fn((1, 1, 3), |(_, _, x)| x != 1);
        let labels = LabelGrid::from_mask(mask.view());
        let accepted: Vec<_> = [1, 2].into_iter().map(measured).collect();
        let colorized = ColorizedLabels::new(&labels, &accepted, &mut ZeroRng);
        assert_eq!(colorized.color_of(1), Some([0, 0, 1]));
        assert_eq!(colorized.color_of(2), Some([0, 0, 2]));
    }

    #[test]
    fn test_fallback_skips_used_colors() {
        let mut used = HashSet::from([BACKGROUND, [0, 0, 7], [0, 0, 8]]);
        assert_eq!(pick_color(7, &mut used, &mut ZeroRng), [0, 0, 9]);
        assert_eq!(pick_color(0, &mut used, &mut ZeroRng), [0, 0, 1]);
    }

    #[test]
    fn test_out_of_range_slice() {
        let labels = LabelGrid::empty((1, 2, 2));
        let colorized = ColorizedLabels::new(&labels, &[], &mut StdRng::seed_from_u64(1));
        assert!(colorized.slice_image(1, Orientation::Axial).is_none());
        assert_eq!(
            colorized.slice_image(0, Orientation::Coronal).unwrap().dimensions(),
            (2, 1)
        );
    }
}
