// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Huang Rui <vowstar@gmail.com>

//! Synthetic defect points and the point-cloud drawable.
//!
//! Points are kept as a flat `f32` sequence of `(x, y, attribute)` triples,
//! which is also the vertex buffer layout the renderer consumes.

use std::f64::consts::TAU;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::PointOptions;
use crate::geometry::DieGrid;
use crate::scene::{Drawable, Geometry, Material, Object, PointMaterial};

/// Rejection sampler producing defect-like point clouds for demos and tests.
///
/// Candidates are drawn with `r = (1 - u^2) * radius`, which clusters points
/// away from the wafer center rather than scattering them uniformly by area.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointSampler {
    /// Die pitch of the grid whose streets are avoided.
    pub pitch: (f64, f64),
    /// Candidates closer than this to the start of a grid cell are rejected.
    /// Cells start at `-radius + offset`, as in [`DieGrid`].
    pub street_margin: f64,
    /// Candidates farther than `radius - edge_inset` from the center are rejected.
    pub edge_inset: f64,
    /// Draws per point before giving up on it.
    pub max_attempts: usize,
    /// Added to every accepted point.
    pub shift: (f64, f64),
}

impl Default for PointSampler {
    fn default() -> Self {
        Self {
            pitch: (10.0, 12.0),
            street_margin: 1.5,
            edge_inset: 2.0,
            max_attempts: 1000,
            shift: (-1.0, -0.5),
        }
    }
}

impl PointSampler {
    /// Sampler avoiding the streets of `grid`.
    pub fn for_grid(grid: &DieGrid) -> Self {
        Self {
            pitch: (grid.die_width, grid.die_height),
            ..Self::default()
        }
    }

    fn rejected(&self, radius: f64, offset: (f64, f64), x: f64, y: f64) -> bool {
        let inset = radius - self.edge_inset;
        (x + radius - offset.0).rem_euclid(self.pitch.0) < self.street_margin
            || (y + radius - offset.1).rem_euclid(self.pitch.1) < self.street_margin
            || x * x + y * y > inset * inset
    }

    /// Generates up to `count` points.
    ///
    /// A point whose candidates are all rejected within `max_attempts` draws
    /// is skipped, so the result may hold fewer than `count` triples.
    pub fn sample<R: Rng + ?Sized>(
        &self,
        diameter: f64,
        count: usize,
        offset: (f64, f64),
        rng: &mut R,
    ) -> Vec<f32> {
        let radius = diameter / 2.0;
        if count == 0 || radius <= self.edge_inset || self.pitch.0 <= 0.0 || self.pitch.1 <= 0.0
        {
            return Vec::new();
        }

        let mut data = Vec::with_capacity(count * 3);
        let mut skipped = 0usize;
        for index in 0..count {
            let accepted = (0..self.max_attempts).find_map(|_| {
                let u: f64 = rng.random();
                let r = (1.0 - u * u) * radius;
                let angle = rng.random::<f64>() * TAU;
                let (x, y) = (angle.sin() * r, angle.cos() * r);
                (!self.rejected(radius, offset, x, y)).then_some((x, y))
            });
            match accepted {
                Some((x, y)) => {
                    data.push((x + self.shift.0) as f32);
                    data.push((y + self.shift.1) as f32);
                    data.push(point_attribute(index));
                }
                None => skipped += 1,
            }
        }

        if skipped > 0 {
            log::warn!(
                "Point sampling gave up on {skipped} of {count} points after {} attempts each",
                self.max_attempts
            );
        }
        data
    }
}

/// Category of the `index`-th synthetic point: mostly 0, occasionally 1 or 2.
pub fn point_attribute(index: usize) -> f32 {
    let hash = blake3::hash(&(index as u64).to_le_bytes());
    match hash.as_bytes()[0] {
        0 => 1.0,
        1 | 2 => 2.0,
        _ => 0.0,
    }
}

/// Generates `count` points over a wafer of `diameter` using the default sampler.
pub fn generate_points<R: Rng + ?Sized>(
    diameter: f64,
    count: usize,
    offset: (f64, f64),
    rng: &mut R,
) -> Vec<f32> {
    PointSampler::default().sample(diameter, count, offset, rng)
}

/// Reproducible variant of [`generate_points`].
pub fn generate_points_seeded(diameter: f64, count: usize, offset: (f64, f64), seed: u64) -> Vec<f32> {
    let mut rng = StdRng::seed_from_u64(seed);
    generate_points(diameter, count, offset, &mut rng)
}

/// Reproducible points for the wafer of `grid`, kept off its streets.
pub fn generate_grid_points(grid: &DieGrid, count: usize, seed: u64) -> Vec<f32> {
    let mut rng = StdRng::seed_from_u64(seed);
    PointSampler::for_grid(grid).sample(grid.diameter, count, grid.offset, &mut rng)
}

/// Builds the point-cloud drawable for flat `(x, y, attribute)` data.
///
/// Trailing values that do not form a full triple are ignored. Returns
/// `None` when there is no complete point.
pub fn create_points(data: &[f32], options: &PointOptions) -> Option<Drawable> {
    let len = data.len() - data.len() % 3;
    if len == 0 {
        return None;
    }
    let material = PointMaterial::new(&options.palette(), options.selected, options.point_size);
    material.set_alpha_blending(options.alpha_blending);
    let cloud = Object::mesh(
        "points",
        Geometry::Points(data[..len].to_vec()),
        Material::Points(material),
    );
    log::debug!("Point cloud with {} points", len / 3);
    Some(cloud.into_drawable())
}
