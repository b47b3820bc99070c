//! Smoothing, thresholding and erosion primitives.
//!
//! The pipeline only composes these operations. [`CpuBackend`] is the
//! reference implementation; other backends must match its numeric
//! semantics up to floating-point rounding.

use ndarray::{Array3, ArrayView3, Axis, Zip};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SegmentationError};

/// Largest accepted smoothing scale, in voxels.
pub const MAX_SIGMA: f32 = 1000.0;
const MAX_KERNEL_RADIUS: usize = 3 * MAX_SIGMA as usize;

/// Gaussian standard deviation per axis, in voxels. Zero disables smoothing
/// along that axis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sigma {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Sigma {
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }
}

pub trait FilterBackend: Sync {
    /// Separable Gaussian blur, same shape as the input.
    fn gaussian_blur(&self, grid: ArrayView3<'_, f32>, sigma: Sigma) -> Array3<f32>;

    /// Foreground iff `value > threshold`.
    fn threshold(&self, grid: ArrayView3<'_, f32>, threshold: f32) -> Array3<bool>;

    /// One pass of binary erosion with the axis-adjacent neighbourhood.
    /// Neighbours outside the grid are ignored.
    fn erode(&self, mask: ArrayView3<'_, bool>) -> Array3<bool>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct CpuBackend;

impl FilterBackend for CpuBackend {
    fn gaussian_blur(&self, grid: ArrayView3<'_, f32>, sigma: Sigma) -> Array3<f32> {
        // Array axes are (z, y, x)
        let passes = [(Axis(2), sigma.x), (Axis(1), sigma.y), (Axis(0), sigma.z)];
        let mut output = grid.to_owned();
        for (axis, sigma) in passes {
            if sigma > 0.0 {
                let kernel = gaussian_kernel_1d(sigma);
                output = convolve_axis(output.view(), axis, &kernel);
            }
        }
        output
    }

    fn threshold(&self, grid: ArrayView3<'_, f32>, threshold: f32) -> Array3<bool> {
        Zip::from(&grid).par_map_collect(|&value| value > threshold)
    }

    fn erode(&self, mask: ArrayView3<'_, bool>) -> Array3<bool> {
        let dim = mask.dim();
        let mut output = Array3::from_elem(dim, false);
        Zip::indexed(&mut output).par_for_each(|(z, y, x), voxel| {
            if mask[[z, y, x]] {
                *voxel = axis_neighbours([z, y, x], dim).all(|neighbour| mask[neighbour]);
            }
        });
        output
    }
}

/// Normalized 1D Gaussian kernel with radius `ceil(3 * sigma)`, capped at
/// `3 * MAX_SIGMA`.
pub fn gaussian_kernel_1d(sigma: f32) -> Vec<f32> {
    let radius = ((3.0 * sigma).ceil() as usize).min(MAX_KERNEL_RADIUS);
    let two_sigma_sq = 2.0 * sigma * sigma;

    let mut kernel: Vec<f32> = (0..=2 * radius)
        .map(|i| {
            let x = i as f32 - radius as f32;
            (-x * x / two_sigma_sq).exp()
        })
        .collect();

    let sum: f32 = kernel.iter().sum();
    for value in &mut kernel {
        *value /= sum;
    }
    kernel
}

/// Convolve every lane along `axis`, clamping at the borders.
fn convolve_axis(input: ArrayView3<'_, f32>, axis: Axis, kernel: &[f32]) -> Array3<f32> {
    let radius = kernel.len() as isize / 2;
    let mut output = Array3::<f32>::zeros(input.raw_dim());

    Zip::from(output.lanes_mut(axis))
        .and(input.lanes(axis))
        .par_for_each(|mut out, line| {
            let last = line.len() as isize - 1;
            for (i, value) in out.iter_mut().enumerate() {
                *value = kernel
                    .iter()
                    .enumerate()
                    .map(|(k, &weight)| {
                        let j = (i as isize + k as isize - radius).clamp(0, last);
                        weight * line[j as usize]
                    })
                    .sum();
            }
        });
    output
}

/// Backend outputs must keep the shape of their input.
pub(crate) fn check_shape(
    expected: (usize, usize, usize),
    actual: (usize, usize, usize),
) -> Result<()> {
    if expected != actual {
        return Err(SegmentationError::ShapeMismatch { expected, actual });
    }
    Ok(())
}

/// Axis-adjacent neighbours of `index` that lie inside a grid of `dim`.
pub(crate) fn axis_neighbours(
    index: [usize; 3],
    dim: (usize, usize, usize),
) -> impl Iterator<Item = [usize; 3]> {
    let extent = [dim.0, dim.1, dim.2];
    (0..3).flat_map(move |axis| {
        let below = (index[axis] > 0).then(|| {
            let mut n = index;
            n[axis] -= 1;
            n
        });
        let above = (index[axis] + 1 < extent[axis]).then(|| {
            let mut n = index;
            n[axis] += 1;
            n
        });
        below.into_iter().chain(above)
    })
}
