//! Raster terrain: heightmap plus normal map.
//!
//! Raster columns run north and rows run east, with the raster centre at
//! the origin. A 16-bit grayscale heightmap spans `[min_alt, max_alt]`; an
//! 8-bit RGB normal map stores each component as `(c - 127.5) / 127.5`.
//! Queries interpolate bilinearly and clamp at the raster edges.

use crate::error::{HeliError, HeliResult};
use hf_core::Real;
use nalgebra::{DMatrix, Vector3};
use std::path::Path;
use tracing::info;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GroundSample {
    /// Ground elevation [ft]
    pub height: Real,
    /// Unit surface normal
    pub normal: Vector3<Real>,
}

#[derive(Clone, Debug)]
pub struct Terrain {
    heights: DMatrix<Real>,
    normals: [DMatrix<Real>; 3],
    north_per_pixel: Real,
    east_per_pixel: Real,
}

fn up() -> Vector3<Real> {
    Vector3::new(0.0, 0.0, 1.0)
}

impl Terrain {
    /// Level ground at `height` covering `ns_max` by `ew_max` feet.
    pub fn flat(ns_max: Real, ew_max: Real, height: Real) -> Self {
        Self {
            heights: DMatrix::from_element(2, 2, height),
            normals: [
                DMatrix::zeros(2, 2),
                DMatrix::zeros(2, 2),
                DMatrix::from_element(2, 2, 1.0),
            ],
            north_per_pixel: ns_max / 2.0,
            east_per_pixel: ew_max / 2.0,
        }
    }

    /// Terrain from decoded grids. `heights` and each normal component are
    /// indexed `(east row, north column)`.
    pub fn from_grids(
        heights: DMatrix<Real>,
        normals: [DMatrix<Real>; 3],
        ns_max: Real,
        ew_max: Real,
    ) -> HeliResult<Self> {
        if heights.nrows() == 0 || heights.ncols() == 0 {
            return Err(HeliError::InvalidParam {
                node: "ENV",
                field: "HMAP_PATH",
                reason: "heightmap is empty",
            });
        }
        if normals.iter().any(|n| n.shape() != heights.shape()) {
            return Err(HeliError::InvalidParam {
                node: "ENV",
                field: "NMAP_PATH",
                reason: "normal map and heightmap sizes differ",
            });
        }
        if !(ns_max > 0.0 && ew_max > 0.0) {
            return Err(HeliError::InvalidParam {
                node: "ENV",
                field: "NS_MAX",
                reason: "terrain extent must be positive",
            });
        }
        Ok(Self {
            north_per_pixel: ns_max / heights.ncols() as Real,
            east_per_pixel: ew_max / heights.nrows() as Real,
            heights,
            normals,
        })
    }

    /// Decode a heightmap and a normal map. The image buffers are released
    /// as soon as the grids are built.
    pub fn load(
        height_path: &Path,
        normal_path: &Path,
        ns_max: Real,
        ew_max: Real,
        min_alt: Real,
        max_alt: Real,
    ) -> HeliResult<Self> {
        let heights = {
            let img = image::open(height_path)
                .map_err(|e| HeliError::terrain(height_path, e))?
                .into_luma16();
            let (w, h) = img.dimensions();
            DMatrix::from_fn(h as usize, w as usize, |r, c| {
                let raw = img.get_pixel(c as u32, r as u32)[0];
                min_alt + Real::from(raw) / Real::from(u16::MAX) * (max_alt - min_alt)
            })
        };

        let normals = {
            let img = image::open(normal_path)
                .map_err(|e| HeliError::terrain(normal_path, e))?
                .into_rgb8();
            let (w, h) = img.dimensions();
            let mut grids = [
                DMatrix::zeros(h as usize, w as usize),
                DMatrix::zeros(h as usize, w as usize),
                DMatrix::zeros(h as usize, w as usize),
            ];
            for (x, y, px) in img.enumerate_pixels() {
                let v = Vector3::from_fn(|i, _| (Real::from(px[i]) - 127.5) / 127.5);
                let n = v.try_normalize(Real::EPSILON).unwrap_or_else(up);
                for (grid, value) in grids.iter_mut().zip(n.iter()) {
                    grid[(y as usize, x as usize)] = *value;
                }
            }
            grids
        };

        let terrain = Self::from_grids(heights, normals, ns_max, ew_max)?;
        info!(
            rows = terrain.heights.nrows(),
            cols = terrain.heights.ncols(),
            "terrain loaded"
        );
        Ok(terrain)
    }

    pub fn shape(&self) -> (usize, usize) {
        self.heights.shape()
    }

    /// Ground height and normal below a north/east position [ft].
    pub fn sample(&self, north: Real, east: Real) -> GroundSample {
        let (rows, cols) = self.heights.shape();
        let gx = grid_coord(north / self.north_per_pixel + cols as Real / 2.0, cols);
        let gy = grid_coord(east / self.east_per_pixel + rows as Real / 2.0, rows);

        let height = bilinear(&self.heights, gy, gx);
        let normal = Vector3::new(
            bilinear(&self.normals[0], gy, gx),
            bilinear(&self.normals[1], gy, gx),
            bilinear(&self.normals[2], gy, gx),
        )
        .try_normalize(Real::EPSILON)
        .unwrap_or_else(up);

        GroundSample { height, normal }
    }
}

/// Lower index and fraction of a coordinate clamped to `[0, n - 1]`.
fn grid_coord(x: Real, n: usize) -> (usize, usize, Real) {
    let max = (n - 1) as Real;
    let x = if x.is_nan() { 0.0 } else { x.clamp(0.0, max) };
    let i0 = x.floor() as usize;
    let i1 = (i0 + 1).min(n - 1);
    (i0, i1, x - i0 as Real)
}

fn bilinear(m: &DMatrix<Real>, (r0, r1, fr): (usize, usize, Real), (c0, c1, fc): (usize, usize, Real)) -> Real {
    let top = (1.0 - fc) * m[(r0, c0)] + fc * m[(r0, c1)];
    let bottom = (1.0 - fc) * m[(r1, c0)] + fc * m[(r1, c1)];
    (1.0 - fr) * top + fr * bottom
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp() -> Terrain {
        // 3 x 3 grid, height grows by 10 ft per column (northward)
        let heights = DMatrix::from_fn(3, 3, |_, c| 10.0 * c as Real);
        let normals = [
            DMatrix::from_element(3, 3, -0.6),
            DMatrix::zeros(3, 3),
            DMatrix::from_element(3, 3, 0.8),
        ];
        Terrain::from_grids(heights, normals, 300.0, 300.0).unwrap()
    }

    #[test]
    fn flat_terrain_is_level_everywhere() {
        let t = Terrain::flat(1000.0, 1000.0, 42.0);
        for (n, e) in [(0.0, 0.0), (1e6, -1e6), (-123.0, 45.0)] {
            let s = t.sample(n, e);
            assert_eq!(s.height, 42.0);
            assert_eq!(s.normal, Vector3::new(0.0, 0.0, 1.0));
        }
    }

    #[test]
    fn grid_points_are_exact() {
        let t = ramp();
        // origin maps to grid (1.5, 1.5); 50 ft north is column 2
        assert_eq!(t.sample(50.0, -50.0).height, 20.0);
        assert_eq!(t.sample(-150.0, -150.0).height, 0.0);
    }

    #[test]
    fn interpolates_between_columns() {
        let t = ramp();
        let s = t.sample(0.0, 0.0);
        assert!((s.height - 15.0).abs() < 1e-12);
        assert!((s.normal.norm() - 1.0).abs() < 1e-12);
        assert!((s.normal[0] + 0.6).abs() < 1e-12);
    }

    #[test]
    fn clamps_outside_raster() {
        let t = ramp();
        assert_eq!(t.sample(1e5, 0.0).height, 20.0);
        assert_eq!(t.sample(-1e5, 0.0).height, 0.0);
        assert_eq!(t.sample(Real::NAN, 0.0).height, 0.0);
    }

    #[test]
    fn mismatched_grids_rejected() {
        let err = Terrain::from_grids(
            DMatrix::zeros(3, 3),
            [DMatrix::zeros(3, 3), DMatrix::zeros(2, 3), DMatrix::zeros(3, 3)],
            10.0,
            10.0,
        )
        .unwrap_err();
        assert!(matches!(err, HeliError::InvalidParam { field: "NMAP_PATH", .. }));
    }

    #[test]
    fn missing_raster_is_reported_with_path() {
        let err = Terrain::load(
            Path::new("/nonexistent/h.png"),
            Path::new("/nonexistent/n.png"),
            10.0,
            10.0,
            0.0,
            100.0,
        )
        .unwrap_err();
        assert!(err.to_string().contains("/nonexistent/h.png"));
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn samples_stay_within_grid_bounds(north in -1e4_f64..1e4, east in -1e4_f64..1e4) {
            let heights = DMatrix::from_fn(4, 5, |r, c| (r * 5 + c) as Real);
            let normals = [
                DMatrix::from_fn(4, 5, |r, _| 0.1 * r as Real),
                DMatrix::zeros(4, 5),
                DMatrix::from_element(4, 5, 1.0),
            ];
            let t = Terrain::from_grids(heights, normals, 500.0, 400.0).unwrap();
            let s = t.sample(north, east);
            prop_assert!((0.0..=19.0).contains(&s.height));
            prop_assert!((s.normal.norm() - 1.0).abs() < 1e-12);
        }
    }
}
