// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Huang Rui <vowstar@gmail.com>

//! Die grid layout and its scene representation.

use std::fmt;

use egui::{Color32, TextureHandle};
use serde::{Deserialize, Serialize};

use crate::config::Theme;
use crate::scene::{
    CrosshatchMaterial, Drawable, Geometry, Material, Object, Quad, TexturedQuad, Transform,
};

/// One cell of a texture atlas drawn inside a die.
#[derive(Clone)]
pub struct ImageFragment {
    pub texture: TextureHandle,
    pub col: usize,
    pub row: usize,
    /// Cell size in pixels.
    pub image_width: usize,
    pub image_height: usize,
}

impl ImageFragment {
    pub fn uv(&self) -> egui::Rect {
        atlas_uv(
            self.col,
            self.row,
            self.image_width,
            self.image_height,
            self.texture.size(),
        )
    }
}

impl fmt::Debug for ImageFragment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageFragment")
            .field("texture", &self.texture.id())
            .field("col", &self.col)
            .field("row", &self.row)
            .field("image_width", &self.image_width)
            .field("image_height", &self.image_height)
            .finish()
    }
}

/// UV rectangle of cell `(col, row)` in an atlas of `atlas_size` pixels.
/// Row zero is the top row of the atlas.
pub fn atlas_uv(
    col: usize,
    row: usize,
    image_width: usize,
    image_height: usize,
    atlas_size: [usize; 2],
) -> egui::Rect {
    if atlas_size[0] == 0 || atlas_size[1] == 0 {
        return egui::Rect::ZERO;
    }
    let w = image_width as f32 / atlas_size[0] as f32;
    let h = image_height as f32 / atlas_size[1] as f32;
    egui::Rect::from_min_size(
        egui::pos2(col as f32 * w, row as f32 * h),
        egui::vec2(w, h),
    )
}

/// A single die: a rectangle in world coordinates plus its styling.
#[derive(Debug, Clone)]
pub struct Die {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub fill: Color32,
    /// Draw crosshatch lines in `hatch` over `fill`.
    pub crosshatch: bool,
    /// Crosshatch line color, only used when `crosshatch` is set.
    pub hatch: Option<Color32>,
    /// Small triangle in the bottom-right corner.
    pub marker: Option<Color32>,
    pub outline: Option<Color32>,
    pub line_width: f32,
    pub image: Option<ImageFragment>,
}

impl Die {
    pub fn new(x: f64, y: f64, width: f64, height: f64, fill: Color32) -> Self {
        Self {
            x,
            y,
            width,
            height,
            fill,
            crosshatch: false,
            hatch: None,
            marker: None,
            outline: None,
            line_width: 1.0,
            image: None,
        }
    }

    fn corners(&self) -> [(f64, f64); 4] {
        [
            (self.x, self.y),
            (self.x + self.width, self.y),
            (self.x, self.y + self.height),
            (self.x + self.width, self.y + self.height),
        ]
    }

    /// True when every corner lies within `radius` of the origin.
    pub fn within_radius(&self, radius: f64) -> bool {
        let r2 = radius * radius;
        self.corners()
            .iter()
            .all(|(x, y)| x * x + y * y <= r2)
    }

    fn quad(&self, color: Color32) -> Quad {
        Quad {
            x: self.x as f32,
            y: self.y as f32,
            width: self.width as f32,
            height: self.height as f32,
            color,
        }
    }
}

/// Optional circular edge exclusion applied when a die map is drawn.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EdgeClip {
    pub radius: f64,
    pub margin: f64,
}

#[derive(Debug, Clone, Default)]
pub struct DieMap {
    pub dies: Vec<Die>,
    pub edge_clip: Option<EdgeClip>,
}

impl DieMap {
    pub fn new(dies: Vec<Die>) -> Self {
        Self {
            dies,
            edge_clip: None,
        }
    }

    pub fn with_edge_clip(mut self, radius: f64, margin: f64) -> Self {
        self.edge_clip = Some(EdgeClip { radius, margin });
        self
    }

    /// Dies that survive the edge clip.
    pub fn visible_dies(&self) -> impl Iterator<Item = &Die> {
        let limit = self.edge_clip.map(|c| c.radius - c.margin);
        self.dies
            .iter()
            .filter(move |die| limit.map_or(true, |r| die.within_radius(r)))
    }
}

/// Parameters of a regular die grid over a wafer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DieGrid {
    pub diameter: f64,
    pub die_width: f64,
    pub die_height: f64,
    /// Grid origin shift from `(-radius, -radius)`.
    pub offset: (f64, f64),
    /// Gap left on every side of a die.
    pub street_width: f64,
}

impl Default for DieGrid {
    fn default() -> Self {
        Self {
            diameter: 300.0,
            die_width: 10.0,
            die_height: 12.0,
            offset: (-5.0, 6.0),
            street_width: 0.1,
        }
    }
}

/// Supplies the fill color of each die in the grid.
pub trait DieColorSource {
    fn die_color(&self, index: usize, x: f64, y: f64, radius: f64) -> Color32;
}

impl DieColorSource for Color32 {
    fn die_color(&self, _index: usize, _x: f64, _y: f64, _radius: f64) -> Color32 {
        *self
    }
}

/// Adapts a closure `(index, x, y, radius) -> color` to [`DieColorSource`].
pub struct ColorFn<F>(pub F);

impl<F> DieColorSource for ColorFn<F>
where
    F: Fn(usize, f64, f64, f64) -> Color32,
{
    fn die_color(&self, index: usize, x: f64, y: f64, radius: f64) -> Color32 {
        (self.0)(index, x, y, radius)
    }
}

/// Colors dies along the wafer diagonal (bottom-left to top-right).
#[derive(Debug, Clone, PartialEq)]
pub struct DiagonalGradient {
    pub stops: Vec<Color32>,
}

impl DiagonalGradient {
    pub fn new(stops: Vec<Color32>) -> Self {
        Self { stops }
    }

    /// Linear interpolation between evenly spaced stops, `t` clipped to [0, 1].
    pub fn sample(&self, t: f64) -> Color32 {
        match self.stops.len() {
            0 => Color32::GRAY,
            1 => self.stops[0],
            n => {
                let t = t.clamp(0.0, 1.0) * (n - 1) as f64;
                let i = (t.floor() as usize).min(n - 2);
                let f = (t - i as f64) as f32;
                let (a, b) = (self.stops[i], self.stops[i + 1]);
                let mix = |a: u8, b: u8| (a as f32 + (b as f32 - a as f32) * f).round() as u8;
                Color32::from_rgb(mix(a.r(), b.r()), mix(a.g(), b.g()), mix(a.b(), b.b()))
            }
        }
    }
}

impl DieColorSource for DiagonalGradient {
    fn die_color(&self, _index: usize, x: f64, y: f64, radius: f64) -> Color32 {
        if radius <= 0.0 {
            return self.sample(0.5);
        }
        // rotate by -45 degrees so the gradient runs along the diagonal
        let (sin, cos) = (-std::f64::consts::FRAC_PI_4).sin_cos();
        let rx = x * cos - y * sin;
        self.sample((1.0 + rx / radius) / 2.0)
    }
}

/// Styling shared by all dies of a generated grid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DieStyle {
    /// Alternate colored dies with hatched ones.
    pub checkerboard: bool,
    pub hatched_fill: Color32,
    pub hatch: Color32,
    pub outline: Option<Color32>,
}

impl DieStyle {
    pub fn from_theme(theme: &Theme, checkerboard: bool) -> Self {
        Self {
            checkerboard,
            hatched_fill: theme.die,
            hatch: theme.hatch,
            outline: Some(theme.wafer),
        }
    }
}

/// Lays out the dies of `grid` that fit completely inside the wafer.
///
/// A die is kept only when all four corners of its grid cell are within the
/// wafer radius; partial dies are dropped. Each kept die is inset by the
/// street width on every side.
pub fn generate_die_map(grid: &DieGrid, colors: &dyn DieColorSource, style: &DieStyle) -> DieMap {
    let mut dies = Vec::new();
    let DieGrid {
        diameter,
        die_width,
        die_height,
        offset,
        street_width,
    } = *grid;
    let width = die_width - 2.0 * street_width;
    let height = die_height - 2.0 * street_width;
    let finite = [diameter, width, height, offset.0, offset.1]
        .iter()
        .all(|v| v.is_finite());
    if !(finite && diameter > 0.0 && width > 0.0 && height > 0.0) {
        log::debug!("Degenerate die grid {grid:?}, no dies generated");
        return DieMap::new(dies);
    }

    let radius = diameter / 2.0;
    let mut index = 0usize;
    let mut row = 0usize;
    loop {
        let y = -radius + offset.1 + row as f64 * die_height;
        if y >= radius {
            break;
        }
        let mut col = 0usize;
        loop {
            let x = -radius + offset.0 + col as f64 * die_width;
            if x >= radius {
                break;
            }
            col += 1;

            let cell = Die::new(x, y, die_width, die_height, Color32::TRANSPARENT);
            if !cell.within_radius(radius) {
                continue;
            }

            let hatched = style.checkerboard && index % 2 != 0;
            let fill = if hatched {
                style.hatched_fill
            } else {
                colors.die_color(index, x, y, radius)
            };
            let mut die = Die::new(x + street_width, y + street_width, width, height, fill);
            die.crosshatch = hatched;
            die.hatch = hatched.then_some(style.hatch);
            die.outline = style.outline;
            dies.push(die);
            index += 1;
        }
        row += 1;
    }

    log::debug!("Die map: {} dies on a {diameter} wafer", dies.len());
    DieMap::new(dies)
}

/// Builds the drawable for a die map.
///
/// Solid dies share a single per-vertex colored buffer; hatched dies, image
/// fragments, outlines and markers are grouped by material. Crosshatch wins
/// over an image fragment.
pub fn create_rectangles(map: &DieMap) -> Drawable {
    let mut solid = Vec::new();
    let mut hatched: Vec<(CrosshatchMaterial, Vec<Quad>)> = Vec::new();
    let mut images: Vec<(TextureHandle, Vec<TexturedQuad>)> = Vec::new();
    let mut outlines: Vec<((Color32, u32), Vec<Quad>)> = Vec::new();
    let mut markers: Vec<(Color32, Vec<[f32; 2]>)> = Vec::new();

    for die in map.visible_dies() {
        let hatch = die.hatch.filter(|_| die.crosshatch);
        if let Some(hatch) = hatch {
            let material = CrosshatchMaterial::new(die.fill, hatch);
            match hatched.iter_mut().find(|(m, _)| *m == material) {
                Some((_, quads)) => quads.push(die.quad(die.fill)),
                None => hatched.push((material, vec![die.quad(die.fill)])),
            }
        } else if let Some(image) = &die.image {
            let quad = TexturedQuad {
                x: die.x as f32,
                y: die.y as f32,
                width: die.width as f32,
                height: die.height as f32,
                uv: image.uv(),
            };
            match images.iter_mut().find(|(t, _)| t.id() == image.texture.id()) {
                Some((_, quads)) => quads.push(quad),
                None => images.push((image.texture.clone(), vec![quad])),
            }
        } else {
            solid.push(die.quad(die.fill));
        }

        if let Some(color) = die.outline {
            let key = (color, die.line_width.to_bits());
            match outlines.iter_mut().find(|(k, _)| *k == key) {
                Some((_, quads)) => quads.push(die.quad(color)),
                None => outlines.push((key, vec![die.quad(color)])),
            }
        }

        if let Some(color) = die.marker {
            let size = (die.width.min(die.height) * 0.25) as f32;
            let (right, bottom) = ((die.x + die.width) as f32, die.y as f32);
            let triangle = [[right, bottom], [right - size, bottom], [right, bottom + size]];
            match markers.iter_mut().find(|(c, _)| *c == color) {
                Some((_, vertices)) => vertices.extend_from_slice(&triangle),
                None => markers.push((color, triangle.to_vec())),
            }
        }
    }

    let mut children = Vec::new();
    if !solid.is_empty() {
        children.push(
            Object::mesh("die_map.fill", Geometry::Quads(solid), Material::VertexColors)
                .into_drawable(),
        );
    }
    for (material, quads) in hatched {
        children.push(
            Object::mesh(
                "die_map.crosshatch",
                Geometry::Quads(quads),
                Material::Crosshatch(material),
            )
            .into_drawable(),
        );
    }
    for (texture, quads) in images {
        children.push(
            Object::mesh(
                "die_map.images",
                Geometry::TexturedQuads(quads),
                Material::Textured { texture },
            )
            .with_transform(Transform::at(0.0, 0.0, 0.5))
            .into_drawable(),
        );
    }
    for ((color, width), quads) in outlines {
        children.push(
            Object::mesh(
                "die_map.outline",
                Geometry::Quads(quads),
                Material::Line {
                    color,
                    width: f32::from_bits(width),
                },
            )
            .with_transform(Transform::at(0.0, 0.0, 1.0))
            .into_drawable(),
        );
    }
    for (color, vertices) in markers {
        let indices = (0..vertices.len() as u32).collect();
        children.push(
            Object::mesh(
                "die_map.markers",
                Geometry::Triangles { vertices, indices },
                Material::Basic { color },
            )
            .with_transform(Transform::at(0.0, 0.0, 0.9))
            .into_drawable(),
        );
    }

    Object::group("die_map", children).into_drawable()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_atlas_uv() {
        let uv = atlas_uv(1, 2, 64, 32, [256, 128]);
        assert_eq!(uv.min, egui::pos2(0.25, 0.5));
        assert_eq!(uv.max, egui::pos2(0.5, 0.75));
        assert_eq!(atlas_uv(0, 0, 10, 10, [0, 10]), egui::Rect::ZERO);
    }

    #[test]
    fn test_gradient_sampling() {
        let gradient = DiagonalGradient::new(vec![Color32::BLACK, Color32::WHITE]);
        assert_eq!(gradient.sample(0.0), Color32::BLACK);
        assert_eq!(gradient.sample(1.0), Color32::WHITE);
        assert_eq!(gradient.sample(7.0), Color32::WHITE);
        let mid = gradient.sample(0.5);
        assert!(mid.r() == 127 || mid.r() == 128);
    }

    #[test]
    fn test_within_radius_is_inclusive() {
        let die = Die::new(0.0, 0.0, 3.0, 4.0, Color32::RED);
        assert!(die.within_radius(5.0));
        assert!(!die.within_radius(4.99));
    }

    #[test]
    fn test_edge_clip_filters_dies() {
        let map = DieMap::new(vec![
            Die::new(-1.0, -1.0, 2.0, 2.0, Color32::RED),
            Die::new(90.0, 0.0, 5.0, 5.0, Color32::RED),
        ])
        .with_edge_clip(100.0, 10.0);
        assert_eq!(map.visible_dies().count(), 1);
    }

    fn plain_style() -> DieStyle {
        DieStyle {
            checkerboard: true,
            hatched_fill: Color32::DARK_GRAY,
            hatch: Color32::GRAY,
            outline: None,
        }
    }

    fn child_names(drawable: &Drawable) -> Vec<String> {
        drawable
            .children()
            .iter()
            .map(|child| child.name().to_owned())
            .collect()
    }

    #[test]
    fn test_non_finite_grid_is_empty() {
        let grids = [
            DieGrid {
                die_width: f64::NAN,
                ..DieGrid::default()
            },
            DieGrid {
                die_height: f64::INFINITY,
                ..DieGrid::default()
            },
            DieGrid {
                diameter: f64::INFINITY,
                ..DieGrid::default()
            },
            DieGrid {
                offset: (0.0, f64::NAN),
                ..DieGrid::default()
            },
            DieGrid {
                street_width: f64::NAN,
                ..DieGrid::default()
            },
        ];
        for grid in grids {
            let map = generate_die_map(&grid, &Color32::BLUE, &plain_style());
            assert!(map.dies.is_empty(), "{grid:?} produced dies");
        }
    }

    #[test]
    fn test_checkerboard_sets_crosshatch_flag() {
        let map = generate_die_map(&DieGrid::default(), &Color32::BLUE, &plain_style());
        assert!(map.dies.len() > 2);
        for (i, die) in map.dies.iter().enumerate() {
            assert_eq!(die.crosshatch, i % 2 != 0);
            assert_eq!(die.hatch.is_some(), die.crosshatch);
        }
    }

    #[test]
    fn test_hatch_color_without_flag_draws_solid() {
        let mut die = Die::new(0.0, 0.0, 5.0, 5.0, Color32::RED);
        die.hatch = Some(Color32::GRAY);
        let drawable = create_rectangles(&DieMap::new(vec![die.clone()]));
        assert_eq!(child_names(&drawable), ["die_map.fill"]);

        die.crosshatch = true;
        let drawable = create_rectangles(&DieMap::new(vec![die]));
        assert_eq!(child_names(&drawable), ["die_map.crosshatch"]);
    }

    #[test]
    fn test_crosshatch_wins_over_image() {
        let ctx = egui::Context::default();
        let texture = ctx.load_texture(
            "atlas",
            egui::ColorImage::new([4, 4], Color32::WHITE),
            egui::TextureOptions::default(),
        );
        let mut die = Die::new(0.0, 0.0, 5.0, 5.0, Color32::RED);
        die.image = Some(ImageFragment {
            texture,
            col: 0,
            row: 0,
            image_width: 2,
            image_height: 2,
        });
        let drawable = create_rectangles(&DieMap::new(vec![die.clone()]));
        assert_eq!(child_names(&drawable), ["die_map.images"]);

        die.crosshatch = true;
        die.hatch = Some(Color32::GRAY);
        let drawable = create_rectangles(&DieMap::new(vec![die]));
        assert_eq!(child_names(&drawable), ["die_map.crosshatch"]);
    }
}
