// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Huang Rui <vowstar@gmail.com>

//! Wafer outline with a notch.

use std::f64::consts::PI;

use egui::Color32;
use lyon_tessellation::math::point;
use lyon_tessellation::path::Path;
use lyon_tessellation::{BuffersBuilder, FillOptions, FillTessellator, FillVertex, VertexBuffers};

use crate::scene::{Drawable, Geometry, Material, Object, Transform};

/// Number of arc segments approximating the wafer edge.
pub const WAFER_SEGMENTS: usize = 200;

/// Size of the notch pointer marker in world units.
const POINTER_SIZE: f32 = 3.0;

/// Group rotation for a notch angle given in degrees (0 points the notch down).
pub fn notch_rotation(notch_angle: f64) -> f64 {
    (notch_angle - 90.0) / 180.0 * PI
}

/// Outline of a wafer with its notch at angle zero (pointing along +X).
pub fn wafer_outline(diameter: f64, notch_size: f64) -> Vec<[f32; 2]> {
    if diameter <= 0.0 {
        return Vec::new();
    }
    let radius = diameter / 2.0;
    // a notch deeper than the wafer makes no sense; keep the arc non-empty
    let notch = notch_size.clamp(0.0, radius);
    let theta_start = notch / diameter;
    let theta_length = 2.0 * (PI - theta_start);

    let mut outline = Vec::with_capacity(WAFER_SEGMENTS + 4);
    let notch_x = radius - notch / 2.1;
    let notch_y = notch / 6.0;
    if notch > 0.0 {
        outline.push([notch_x as f32, notch_y as f32]);
    }
    for i in 0..=WAFER_SEGMENTS {
        let angle = theta_start + i as f64 / WAFER_SEGMENTS as f64 * theta_length;
        outline.push([
            (radius * angle.cos()) as f32,
            (radius * angle.sin()) as f32,
        ]);
    }
    if notch > 0.0 {
        outline.push([notch_x as f32, -notch_y as f32]);
        outline.push([(radius - notch / 2.0) as f32, 0.0]);
    } else {
        // first and last arc vertex coincide
        outline.pop();
    }
    outline
}

/// Triangulates a simple closed polygon.
///
/// Falls back to a fan around the origin when tessellation fails, which is
/// correct for outlines that are star shaped about the origin.
pub fn tessellate_polygon(outline: &[[f32; 2]]) -> Geometry {
    if outline.len() < 3 {
        return Geometry::Triangles {
            vertices: Vec::new(),
            indices: Vec::new(),
        };
    }

    let mut builder = Path::builder();
    builder.begin(point(outline[0][0], outline[0][1]));
    for p in &outline[1..] {
        builder.line_to(point(p[0], p[1]));
    }
    builder.end(true);
    let path = builder.build();

    let mut buffers: VertexBuffers<[f32; 2], u32> = VertexBuffers::new();
    let mut tessellator = FillTessellator::new();
    let result = tessellator.tessellate_path(
        &path,
        &FillOptions::default(),
        &mut BuffersBuilder::new(&mut buffers, |vertex: FillVertex| {
            vertex.position().to_array()
        }),
    );

    match result {
        Ok(()) => Geometry::Triangles {
            vertices: buffers.vertices,
            indices: buffers.indices,
        },
        Err(e) => {
            log::warn!("Polygon tessellation failed ({e:?}), using a triangle fan");
            triangle_fan(outline)
        }
    }
}

fn triangle_fan(outline: &[[f32; 2]]) -> Geometry {
    let mut vertices = Vec::with_capacity(outline.len() + 1);
    vertices.push([0.0, 0.0]);
    vertices.extend_from_slice(outline);
    let n = outline.len() as u32;
    let mut indices = Vec::with_capacity(outline.len() * 3);
    for i in 1..n {
        indices.extend_from_slice(&[i, i + 1, 0]);
    }
    indices.extend_from_slice(&[n, 1, 0]);
    Geometry::Triangles { vertices, indices }
}

fn notch_pointer() -> Vec<[f32; 2]> {
    let d = POINTER_SIZE;
    vec![
        [0.0, 0.0],
        [d, d],
        [d, d / 2.0],
        [d / 2.0, 0.0],
        [d, -d / 2.0],
        [d, -d],
    ]
}

/// Builds the wafer drawable: filled disc, perimeter line and a pointer next
/// to the notch.
///
/// The notch angle is applied as a rotation of the returned group, so it can
/// later be changed with [`Object::set_rotation`] and [`notch_rotation`].
/// Returns `None` when `diameter <= 0`.
pub fn generate_wafer_shape(
    diameter: f64,
    notch_size: f64,
    notch_angle: f64,
    fill: Color32,
    perimeter: Color32,
) -> Option<Drawable> {
    if diameter <= 0.0 {
        log::debug!("Wafer diameter {diameter} is not positive, nothing to draw");
        return None;
    }
    let outline = wafer_outline(diameter, notch_size);
    let radius = diameter / 2.0;

    let disc = Object::mesh(
        "wafer.fill",
        tessellate_polygon(&outline),
        Material::Basic { color: fill },
    );
    let edge = Object::mesh(
        "wafer.perimeter",
        Geometry::LineLoop { vertices: outline },
        Material::Line {
            color: perimeter,
            width: 2.0,
        },
    )
    .with_transform(Transform::at(0.0, 0.0, 1.0));
    let pointer = Object::mesh(
        "wafer.notch_pointer",
        tessellate_polygon(&notch_pointer()),
        Material::Basic { color: perimeter },
    )
    .with_transform(Transform::at(radius + 0.5, 0.0, 1.0));

    let group = Object::group(
        "wafer",
        vec![
            disc.into_drawable(),
            edge.into_drawable(),
            pointer.into_drawable(),
        ],
    )
    .with_transform(Transform {
        rotation: notch_rotation(notch_angle),
        ..Transform::IDENTITY
    });
    Some(group.into_drawable())
}
