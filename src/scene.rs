// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Huang Rui <vowstar@gmail.com>

//! Retained scene graph.
//!
//! Drawables are reference counted [`Object`]s. Each object owns its graphics
//! resources (a geometry buffer and a material, which may in turn hold a
//! texture). Disposal takes the resources out of the object, so it is
//! observed through every handle and running it twice releases nothing.
//!
//! [`SceneReconciler`] keeps the scene's children in step with a declared
//! list of drawables without taking ownership of their disposal.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::ops::AddAssign;
use std::rc::Rc;

use egui::{Color32, TextureHandle};

use crate::geometry::{Bounds, WorldPoint};

/// Shared handle to a scene object.
pub type Drawable = Rc<Object>;

/// Placement of an object relative to its parent: rotate about the local
/// origin, then translate. `z` orders siblings (larger is drawn later).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub translation: WorldPoint,
    pub rotation: f64,
    pub z: f32,
}

impl Transform {
    pub const IDENTITY: Self = Self {
        translation: WorldPoint::ZERO,
        rotation: 0.0,
        z: 0.0,
    };

    pub fn at(x: f64, y: f64, z: f32) -> Self {
        Self {
            translation: WorldPoint::new(x, y),
            rotation: 0.0,
            z,
        }
    }

    pub fn apply(&self, x: f64, y: f64) -> WorldPoint {
        let (sin, cos) = self.rotation.sin_cos();
        WorldPoint::new(
            x * cos - y * sin + self.translation.x,
            x * sin + y * cos + self.translation.y,
        )
    }

    /// Transform of a child placed with `self` inside a parent placed with `parent`.
    pub fn within(&self, parent: &Transform) -> Transform {
        Transform {
            translation: parent.apply(self.translation.x, self.translation.y),
            rotation: parent.rotation + self.rotation,
            z: parent.z + self.z,
        }
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Solid or colored axis-aligned rectangle in local coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quad {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub color: Color32,
}

/// Rectangle mapped to a region of a texture atlas.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TexturedQuad {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub uv: egui::Rect,
}

/// Vertex data of an object, in the layout the renderer consumes.
#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    Triangles {
        vertices: Vec<[f32; 2]>,
        indices: Vec<u32>,
    },
    LineLoop {
        vertices: Vec<[f32; 2]>,
    },
    Quads(Vec<Quad>),
    TexturedQuads(Vec<TexturedQuad>),
    /// Flat `(x, y, attribute)` triples.
    Points(Vec<f32>),
}

impl Geometry {
    pub fn is_empty(&self) -> bool {
        match self {
            Geometry::Triangles { indices, .. } => indices.is_empty(),
            Geometry::LineLoop { vertices } => vertices.is_empty(),
            Geometry::Quads(quads) => quads.is_empty(),
            Geometry::TexturedQuads(quads) => quads.is_empty(),
            Geometry::Points(data) => data.len() < 3,
        }
    }
}

/// Two-color diagonal crosshatch evaluated in screen space at draw time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CrosshatchMaterial {
    pub background: Color32,
    pub lines: Color32,
    /// Distance between hatch lines in pixels.
    pub spacing: f32,
}

impl CrosshatchMaterial {
    pub const DEFAULT_SPACING: f32 = 8.0;

    pub fn new(background: Color32, lines: Color32) -> Self {
        Self {
            background,
            lines,
            spacing: Self::DEFAULT_SPACING,
        }
    }

    /// Period of the pattern along the screen axes.
    pub fn density(&self) -> f32 {
        std::f32::consts::SQRT_2 * self.spacing.max(1.0)
    }
}

/// Palette-driven material for point clouds.
///
/// The palette gets a black catch-all entry appended; attributes past the end
/// of the caller's palette resolve to it.
pub struct PointMaterial {
    palette: Vec<Color32>,
    active: Color32,
    point_size: Cell<f32>,
    selection: Cell<Option<Bounds>>,
    alpha_blending: Cell<bool>,
}

impl PointMaterial {
    pub const CATCH_ALL: Color32 = Color32::BLACK;
    /// Opacity of each point while alpha blending is on.
    pub const BLEND_ALPHA: f32 = 0.5;

    pub fn new(palette: &[Color32], active: Color32, point_size: f32) -> Self {
        let mut colors = palette.to_vec();
        colors.push(Self::CATCH_ALL);
        Self {
            palette: colors,
            active,
            point_size: Cell::new(point_size.max(0.0)),
            selection: Cell::new(None),
            alpha_blending: Cell::new(false),
        }
    }

    /// Palette entries including the catch-all.
    pub fn palette(&self) -> &[Color32] {
        &self.palette
    }

    pub fn point_size(&self) -> f32 {
        self.point_size.get()
    }

    pub fn set_point_size(&self, size: f32) {
        self.point_size.set(size.max(0.0));
    }

    pub fn selection(&self) -> Option<Bounds> {
        self.selection.get()
    }

    pub fn alpha_blending(&self) -> bool {
        self.alpha_blending.get()
    }

    /// Half-transparent additive points, so dense clusters brighten.
    pub fn set_alpha_blending(&self, enable: bool) {
        self.alpha_blending.set(enable);
    }

    /// Points inside `selection` are drawn with the active color.
    pub fn set_selection(&self, selection: Option<Bounds>) {
        self.selection
            .set(selection.filter(|b| b.width() > 0.0 && b.height() > 0.0));
    }

    pub fn palette_color(&self, attribute: f32) -> Color32 {
        let last = self.palette.len() - 1;
        let index = if attribute.is_nan() || attribute <= 0.0 {
            0
        } else {
            (attribute as usize).min(last)
        };
        self.palette[index]
    }

    /// Final color of a point, taking the selection test into account.
    pub fn color_for(&self, x: f32, y: f32, attribute: f32) -> Color32 {
        let color = match self.selection.get() {
            Some(sel) if sel.contains(x as f64, y as f64) => self.active,
            _ => self.palette_color(attribute),
        };
        if self.alpha_blending.get() {
            color.gamma_multiply(Self::BLEND_ALPHA).additive()
        } else {
            color
        }
    }

    /// Point size in pixels; categorized points are drawn larger.
    pub fn size_for(&self, attribute: f32) -> f32 {
        if attribute > 0.0 {
            1.5 * self.point_size.get()
        } else {
            self.point_size.get()
        }
    }
}

pub enum Material {
    Basic { color: Color32 },
    /// Per-quad colors carried by the geometry.
    VertexColors,
    Line { color: Color32, width: f32 },
    Crosshatch(CrosshatchMaterial),
    Textured { texture: TextureHandle },
    Points(PointMaterial),
}

impl Material {
    fn textures(&self) -> usize {
        match self {
            Material::Textured { .. } => 1,
            _ => 0,
        }
    }
}

impl fmt::Debug for Material {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Material::Basic { color } => write!(f, "Basic({color:?})"),
            Material::VertexColors => write!(f, "VertexColors"),
            Material::Line { color, width } => write!(f, "Line({color:?}, {width})"),
            Material::Crosshatch(m) => write!(f, "Crosshatch({m:?})"),
            Material::Textured { texture } => write!(f, "Textured({:?})", texture.id()),
            Material::Points(m) => write!(f, "Points(palette: {})", m.palette.len()),
        }
    }
}

/// Geometry and material owned by a single object.
#[derive(Debug)]
pub struct Resources {
    pub geometry: Geometry,
    pub material: Material,
}

/// Counts of graphics resources released by a dispose call.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Released {
    pub geometries: usize,
    pub materials: usize,
    pub textures: usize,
}

impl Released {
    pub fn is_empty(&self) -> bool {
        self.geometries == 0 && self.materials == 0 && self.textures == 0
    }
}

impl AddAssign for Released {
    fn add_assign(&mut self, rhs: Self) {
        self.geometries += rhs.geometries;
        self.materials += rhs.materials;
        self.textures += rhs.textures;
    }
}

/// Node of the retained scene.
pub struct Object {
    name: String,
    transform: Cell<Transform>,
    children: Vec<Drawable>,
    resources: RefCell<Option<Resources>>,
}

impl Object {
    /// Object with no resources of its own.
    pub fn group(name: impl Into<String>, children: Vec<Drawable>) -> Self {
        Self {
            name: name.into(),
            transform: Cell::new(Transform::IDENTITY),
            children,
            resources: RefCell::new(None),
        }
    }

    pub fn mesh(name: impl Into<String>, geometry: Geometry, material: Material) -> Self {
        Self {
            name: name.into(),
            transform: Cell::new(Transform::IDENTITY),
            children: Vec::new(),
            resources: RefCell::new(Some(Resources { geometry, material })),
        }
    }

    pub fn with_transform(self, transform: Transform) -> Self {
        self.transform.set(transform);
        self
    }

    pub fn into_drawable(self) -> Drawable {
        Rc::new(self)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn transform(&self) -> Transform {
        self.transform.get()
    }

    /// Rotates the object in place; vertex data is untouched.
    pub fn set_rotation(&self, radians: f64) {
        let mut t = self.transform.get();
        t.rotation = radians;
        self.transform.set(t);
    }

    pub fn children(&self) -> &[Drawable] {
        &self.children
    }

    /// Runs `f` with this object's resources, if it has any left.
    pub fn with_resources<T>(&self, f: impl FnOnce(&Resources) -> T) -> Option<T> {
        self.resources.borrow().as_ref().map(f)
    }

    /// Runs `f` with every object of the subtree, depth first.
    pub fn visit(&self, f: &mut dyn FnMut(&Object)) {
        f(self);
        for child in &self.children {
            child.visit(f);
        }
    }

    /// True when no object of the subtree holds resources any more.
    pub fn is_disposed(&self) -> bool {
        self.resources.borrow().is_none() && self.children.iter().all(|c| c.is_disposed())
    }

    /// Releases geometry, material and texture of the whole subtree.
    pub fn dispose(&self) -> Released {
        let mut released = Released::default();
        for child in &self.children {
            released += child.dispose();
        }
        if let Some(resources) = self.resources.borrow_mut().take() {
            released.geometries += 1;
            released.materials += 1;
            released.textures += resources.material.textures();
        }
        released
    }
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Object")
            .field("name", &self.name)
            .field("transform", &self.transform.get())
            .field("children", &self.children)
            .field("resources", &self.resources.borrow())
            .finish()
    }
}

/// Disposes an optional drawable. Absent or already disposed handles are a no-op.
pub fn dispose(object: Option<&Drawable>) -> Released {
    let Some(object) = object else {
        return Released::default();
    };
    let released = object.dispose();
    if !released.is_empty() {
        log::debug!(
            "Disposed '{}': {} geometries, {} materials, {} textures",
            object.name(),
            released.geometries,
            released.materials,
            released.textures
        );
    }
    released
}

/// Top-level list of drawables plus the clear color.
#[derive(Debug)]
pub struct Scene {
    background: Color32,
    children: Vec<Drawable>,
}

impl Scene {
    pub fn new(background: Color32) -> Self {
        Self {
            background,
            children: Vec::new(),
        }
    }

    pub fn background(&self) -> Color32 {
        self.background
    }

    pub fn set_background(&mut self, color: Color32) {
        self.background = color;
    }

    pub fn children(&self) -> &[Drawable] {
        &self.children
    }

    pub fn add(&mut self, object: Drawable) {
        self.children.push(object);
    }

    pub fn remove(&mut self, object: &Drawable) -> bool {
        match self.children.iter().position(|c| Rc::ptr_eq(c, object)) {
            Some(pos) => {
                self.children.remove(pos);
                true
            }
            None => false,
        }
    }

    /// Removes all children, disposing them first when `dispose` is set.
    pub fn clear(&mut self, dispose: bool) -> Released {
        let mut released = Released::default();
        for child in self.children.drain(..) {
            if dispose {
                released += child.dispose();
            }
        }
        released
    }
}

/// Keeps a [`Scene`] in step with a declared list of drawables.
#[derive(Debug)]
pub struct SceneReconciler {
    scene: Scene,
    objects: Vec<Option<Drawable>>,
}

impl SceneReconciler {
    pub fn new(background: Color32) -> Self {
        Self {
            scene: Scene::new(background),
            objects: Vec::new(),
        }
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn scene_mut(&mut self) -> &mut Scene {
        &mut self.scene
    }

    /// The list most recently assigned with [`SceneReconciler::set_objects`].
    pub fn objects(&self) -> &[Option<Drawable>] {
        &self.objects
    }

    /// Declares the drawables to show. `None` entries are skipped.
    ///
    /// Returns `false` when the present entries are the scene's current
    /// children already (same handles, same order).
    pub fn set_objects(&mut self, objects: Vec<Option<Drawable>>) -> bool {
        self.objects = objects;
        let same = {
            let mut declared = self.objects.iter().flatten();
            let children = self.scene.children();
            declared.clone().count() == children.len()
                && children.iter().all(|c| {
                    declared
                        .next()
                        .is_some_and(|declared| Rc::ptr_eq(c, declared))
                })
        };
        if same {
            return false;
        }
        self.sync();
        true
    }

    /// Rebuilds the children from the declared list unconditionally.
    pub fn refresh(&mut self) {
        self.sync();
    }

    fn sync(&mut self) {
        // Producers own disposal of what they created.
        self.scene.clear(false);
        for object in self.objects.iter().flatten() {
            self.scene.add(Rc::clone(object));
        }
        log::trace!("Scene synced: {} objects", self.scene.children().len());
    }

    /// Disposes every retained drawable and empties the scene.
    pub fn teardown(&mut self) -> Released {
        let released = self.scene.clear(true);
        for object in self.objects.drain(..).flatten() {
            object.dispose();
        }
        released
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quad_object(name: &str) -> Drawable {
        Object::mesh(
            name,
            Geometry::Quads(vec![Quad {
                x: 0.0,
                y: 0.0,
                width: 1.0,
                height: 1.0,
                color: Color32::RED,
            }]),
            Material::VertexColors,
        )
        .into_drawable()
    }

    #[test]
    fn test_transform_rotation_then_translation() {
        let t = Transform {
            translation: WorldPoint::new(10.0, 0.0),
            rotation: std::f64::consts::FRAC_PI_2,
            z: 0.0,
        };
        let p = t.apply(1.0, 0.0);
        assert!((p.x - 10.0).abs() < 1e-12);
        assert!((p.y - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_nested_transform() {
        let parent = Transform {
            translation: WorldPoint::ZERO,
            rotation: std::f64::consts::PI,
            z: 1.0,
        };
        let child = Transform::at(5.0, 0.0, 2.0);
        let combined = child.within(&parent);
        let p = combined.apply(0.0, 0.0);
        assert!((p.x + 5.0).abs() < 1e-12);
        assert!(p.y.abs() < 1e-12);
        assert_eq!(combined.z, 3.0);
    }

    #[test]
    fn test_dispose_recurses_into_children() {
        let child_a = quad_object("a");
        let child_b = quad_object("b");
        let group = Object::group("group", vec![child_a.clone(), child_b.clone()]);

        let released = group.dispose();
        assert_eq!(released.geometries, 2);
        assert_eq!(released.materials, 2);
        assert!(child_a.is_disposed());
        assert!(child_b.is_disposed());
        assert!(group.is_disposed());
    }

    #[test]
    fn test_point_material_catch_all() {
        let material = PointMaterial::new(
            &[Color32::WHITE, Color32::RED, Color32::GREEN],
            Color32::LIGHT_BLUE,
            3.0,
        );
        assert_eq!(material.palette().len(), 4);
        assert_eq!(material.palette_color(0.0), Color32::WHITE);
        assert_eq!(material.palette_color(2.0), Color32::GREEN);
        assert_eq!(material.palette_color(-4.0), Color32::WHITE);
        assert_eq!(material.palette_color(f32::NAN), Color32::WHITE);
        assert_eq!(material.size_for(0.0), 3.0);
        assert_eq!(material.size_for(1.0), 4.5);
    }

    #[test]
    fn test_point_material_selection_test() {
        let material = PointMaterial::new(&[Color32::WHITE], Color32::LIGHT_BLUE, 3.0);
        material.set_selection(Some(Bounds {
            left: -1.0,
            right: 1.0,
            top: 1.0,
            bottom: -1.0,
        }));
        assert_eq!(material.color_for(0.5, 0.5, 0.0), Color32::LIGHT_BLUE);
        assert_eq!(material.color_for(2.0, 0.5, 0.0), Color32::WHITE);

        // degenerate rectangles disable the test
        material.set_selection(Some(Bounds::ZERO));
        assert_eq!(material.selection(), None);
        assert_eq!(material.color_for(0.0, 0.0, 0.0), Color32::WHITE);
    }

    #[test]
    fn test_point_material_alpha_blending() {
        let material = PointMaterial::new(&[Color32::WHITE], Color32::LIGHT_BLUE, 3.0);
        assert!(!material.alpha_blending());
        assert_eq!(material.color_for(0.0, 0.0, 0.0), Color32::WHITE);

        material.set_alpha_blending(true);
        let blended = material.color_for(0.0, 0.0, 0.0);
        assert!(blended.is_additive());
        assert!(blended.r() < Color32::WHITE.r());
        assert!(blended.r() > 0);

        material.set_alpha_blending(false);
        assert_eq!(material.color_for(0.0, 0.0, 0.0), Color32::WHITE);
    }

    #[test]
    fn test_scene_remove() {
        let a = quad_object("a");
        let b = quad_object("b");
        let mut scene = Scene::new(Color32::BLACK);
        scene.add(a.clone());
        scene.add(b.clone());
        assert!(scene.remove(&a));
        assert!(!scene.remove(&a));
        assert_eq!(scene.children().len(), 1);
        assert!(!a.is_disposed());
    }
}
