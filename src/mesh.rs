//! Iso-surface reconstruction of a binary voxel mask.
//!
//! Lattice points are voxel centres. Every lattice cube is split into six
//! tetrahedra along its main diagonal (Kuhn split), so neighbouring cubes
//! agree on their shared face diagonals. Vertices sit at edge midpoints,
//! i.e. at the 0.5 iso-level of the mask. With a background border around
//! the mask the surface is closed and its enclosed volume follows from the
//! divergence theorem.

use std::collections::HashMap;

use nalgebra::{Point3, Vector3};
use ndarray::{Array3, ArrayView3};

use crate::error::{Result, SegmentationError};
use crate::region::Region;
use crate::volume::Calibration;

/// Axis orderings (z = 0, y = 1, x = 2) walked from the cube's low corner
/// to its high corner; each one yields a tetrahedron.
const KUHN_PATHS: [[usize; 3]; 6] = [
    [0, 1, 2],
    [0, 2, 1],
    [1, 0, 2],
    [1, 2, 0],
    [2, 0, 1],
    [2, 1, 0],
];

/// Indexed triangle mesh in physical (x, y, z) coordinates with outward
/// facing triangles.
#[derive(Debug, Clone, Default)]
pub struct IsoSurface {
    vertices: Vec<Point3<f64>>,
    triangles: Vec<[u32; 3]>,
}

impl IsoSurface {
    /// Reconstruct the surface of one region, padded by a voxel of
    /// background on every side.
    pub fn from_region(region: &Region, calibration: &Calibration) -> Result<Self> {
        let bounds = region.bounds();
        let (depth, height, width) = bounds.extent();
        let mut mask = Array3::from_elem((depth + 2, height + 2, width + 2), false);
        for &[z, y, x] in region.voxels() {
            mask[[
                z - bounds.min[0] + 1,
                y - bounds.min[1] + 1,
                x - bounds.min[2] + 1,
            ]] = true;
        }
        let origin = bounds.min.map(|v| v as f64 - 1.0);

        let surface = Self::from_mask(mask.view(), origin, calibration);
        let failure = |reason: String| SegmentationError::MeshReconstruction {
            label: region.label(),
            reason,
        };
        if surface.triangles.is_empty() {
            return Err(failure("surface has no triangles".to_string()));
        }
        let volume = surface.signed_volume();
        if !volume.is_finite() || volume <= 0.0 {
            return Err(failure(format!("enclosed volume is not positive: {volume}")));
        }
        Ok(surface)
    }

    /// Surface at the 0.5 level of `mask`. `origin` is the voxel position
    /// (z, y, x) of `mask[[0, 0, 0]]` in the calibrated grid. The result is
    /// only closed when foreground does not touch the mask border.
    pub fn from_mask(mask: ArrayView3<'_, bool>, origin: [f64; 3], calibration: &Calibration) -> Self {
        let (depth, height, width) = mask.dim();
        let mut builder = SurfaceBuilder {
            mask,
            origin,
            spacing: [
                calibration.spacing_z,
                calibration.spacing_y,
                calibration.spacing_x,
            ],
            edge_vertices: HashMap::new(),
            surface: Self::default(),
        };
        if depth < 2 || height < 2 || width < 2 {
            return builder.surface;
        }

        for z in 0..depth - 1 {
            for y in 0..height - 1 {
                for x in 0..width - 1 {
                    builder.polygonize_cube([z, y, x]);
                }
            }
        }
        builder.surface
    }

    pub fn vertices(&self) -> &[Point3<f64>] {
        &self.vertices
    }

    pub fn triangles(&self) -> &[[u32; 3]] {
        &self.triangles
    }

    /// Sum of signed tetrahedra volumes formed by each face and the origin.
    pub fn signed_volume(&self) -> f64 {
        let volume: f64 = self
            .triangles
            .iter()
            .map(|&[i0, i1, i2]| {
                let v0 = self.vertices[i0 as usize].coords;
                let v1 = self.vertices[i1 as usize].coords;
                let v2 = self.vertices[i2 as usize].coords;
                v0.dot(&v1.cross(&v2))
            })
            .sum();
        volume / 6.0
    }

    #[inline]
    pub fn volume(&self) -> f64 {
        self.signed_volume().abs()
    }

    pub fn surface_area(&self) -> f64 {
        self.triangles
            .iter()
            .map(|&[i0, i1, i2]| {
                let v0 = self.vertices[i0 as usize];
                let e1 = self.vertices[i1 as usize] - v0;
                let e2 = self.vertices[i2 as usize] - v0;
                0.5 * e1.cross(&e2).norm()
            })
            .sum()
    }
}

type Lattice = [usize; 3];

struct SurfaceBuilder<'a> {
    mask: ArrayView3<'a, bool>,
    origin: [f64; 3],
    spacing: [f64; 3],
    edge_vertices: HashMap<(Lattice, Lattice), u32>,
    surface: IsoSurface,
}

impl SurfaceBuilder<'_> {
    fn polygonize_cube(&mut self, base: Lattice) {
        let corner = |dz, dy, dx| self.mask[[base[0] + dz, base[1] + dy, base[2] + dx]];
        let first = corner(0, 0, 0);
        let uniform = (0..8).all(|i| corner((i >> 2) & 1, (i >> 1) & 1, i & 1) == first);
        if uniform {
            return;
        }

        for path in KUHN_PATHS {
            let mut corners = [base; 4];
            for (step, &axis) in path.iter().enumerate() {
                corners[step + 1] = corners[step];
                corners[step + 1][axis] += 1;
            }
            self.polygonize_tetrahedron(corners);
        }
    }

    fn polygonize_tetrahedron(&mut self, corners: [Lattice; 4]) {
        let mut inside = [[0; 3]; 4];
        let mut outside = [[0; 3]; 4];
        let (mut n_in, mut n_out) = (0, 0);
        for c in corners {
            if self.mask[c] {
                inside[n_in] = c;
                n_in += 1;
            } else {
                outside[n_out] = c;
                n_out += 1;
            }
        }

        match n_in {
            1 => {
                let a = inside[0];
                let [b, c, d] = [outside[0], outside[1], outside[2]];
                let direction = self.centroid(&[b, c, d]) - self.position(a);
                let tip = [self.edge(a, b), self.edge(a, c), self.edge(a, d)];
                self.push_oriented(tip, direction);
            }
            3 => {
                let a = outside[0];
                let [b, c, d] = [inside[0], inside[1], inside[2]];
                let direction = self.position(a) - self.centroid(&[b, c, d]);
                let tip = [self.edge(a, b), self.edge(a, c), self.edge(a, d)];
                self.push_oriented(tip, direction);
            }
            2 => {
                let [a, b] = [inside[0], inside[1]];
                let [c, d] = [outside[0], outside[1]];
                let direction = self.centroid(&[c, d]) - self.centroid(&[a, b]);
                let (ac, ad) = (self.edge(a, c), self.edge(a, d));
                let (bd, bc) = (self.edge(b, d), self.edge(b, c));
                self.push_oriented([ac, ad, bd], direction);
                self.push_oriented([ac, bd, bc], direction);
            }
            _ => {}
        }
    }

    fn position(&self, p: Lattice) -> Point3<f64> {
        let coordinate = |axis: usize| (p[axis] as f64 + self.origin[axis]) * self.spacing[axis];
        Point3::new(coordinate(2), coordinate(1), coordinate(0))
    }

    fn centroid(&self, points: &[Lattice]) -> Point3<f64> {
        let sum: Vector3<f64> = points.iter().map(|&p| self.position(p).coords).sum();
        Point3::from(sum / points.len() as f64)
    }

    /// Shared midpoint vertex of the lattice edge `a`-`b`.
    fn edge(&mut self, a: Lattice, b: Lattice) -> u32 {
        let key = if a < b { (a, b) } else { (b, a) };
        if let Some(&index) = self.edge_vertices.get(&key) {
            return index;
        }
        let midpoint = nalgebra::center(&self.position(a), &self.position(b));
        let index = self.surface.vertices.len() as u32;
        self.surface.vertices.push(midpoint);
        self.edge_vertices.insert(key, index);
        index
    }

    /// Push a triangle whose normal points along `direction`.
    fn push_oriented(&mut self, triangle: [u32; 3], direction: Vector3<f64>) {
        let [i0, i1, i2] = triangle;
        let vertices = &self.surface.vertices;
        let v0 = vertices[i0 as usize];
        let normal = (vertices[i1 as usize] - v0).cross(&(vertices[i2 as usize] - v0));
        if normal.dot(&direction) < 0.0 {
            self.surface.triangles.push([i0, i2, i1]);
        } else {
            self.surface.triangles.push(triangle);
        }
    }
}
