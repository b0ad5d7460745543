// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Huang Rui <vowstar@gmail.com>

//! egui backend: tessellates the scene into cached `egui::Shape`s and feeds
//! egui input events to the viewer.

use egui::epaint::Vertex;
use egui::{
    pos2, vec2, Color32, Event, Mesh, Painter, Pos2, Rect, Response, Sense, Shape, Stroke,
    StrokeKind, TouchId, TouchPhase, Ui,
};

use super::{Frame, Renderer};
use crate::camera::Camera;
use crate::controls::ControlKey;
use crate::scene::{CrosshatchMaterial, Geometry, Material, Object, PointMaterial, Quad, Transform};
use crate::viewer::TwoDViewer;

const LASSO_FILL: Color32 = Color32::from_rgba_premultiplied(20, 50, 50, 40);
const LASSO_STROKE: Color32 = Color32::from_rgb(0x65, 0xff, 0xff);

/// Maps object-local coordinates to absolute screen positions.
struct Projector<'a> {
    camera: &'a Camera,
    origin: Pos2,
    transform: Transform,
}

impl Projector<'_> {
    fn project(&self, x: f32, y: f32) -> Pos2 {
        let p = self.transform.apply(x as f64, y as f64);
        let (sx, sy) = self.camera.world_to_screen(p.x, p.y);
        pos2(self.origin.x + sx as f32, self.origin.y + sy as f32)
    }

    /// Corners in counter-clockwise world order starting bottom-left.
    fn quad(&self, x: f32, y: f32, width: f32, height: f32) -> [Pos2; 4] {
        [
            self.project(x, y),
            self.project(x + width, y),
            self.project(x + width, y + height),
            self.project(x, y + height),
        ]
    }
}

fn add_quad(mesh: &mut Mesh, corners: [Pos2; 4], color: Color32) {
    let base = mesh.vertices.len() as u32;
    for corner in corners {
        mesh.colored_vertex(corner, color);
    }
    mesh.add_triangle(base, base + 1, base + 2);
    mesh.add_triangle(base, base + 2, base + 3);
}

fn push_mesh(out: &mut Vec<Shape>, mesh: Mesh) {
    if !mesh.is_empty() {
        out.push(Shape::mesh(mesh));
    }
}

/// Screen-space crosshatch lines inside `rect`.
///
/// Both diagonal families are anchored to the absolute pixel grid, so the
/// pattern does not move with the die. Every segment lies within `rect`.
pub fn crosshatch_segments(rect: Rect, material: &CrosshatchMaterial) -> Vec<[Pos2; 2]> {
    let period = std::f32::consts::SQRT_2 * material.density();
    let phase = period / 2.0;
    let mut segments = diagonal_segments(rect, period, phase, 1.0);
    segments.extend(diagonal_segments(rect, period, phase, -1.0));
    segments
}

/// Segments of the lines `x + slope * y = phase + k * period` clipped to `rect`.
fn diagonal_segments(rect: Rect, period: f32, phase: f32, slope: f32) -> Vec<[Pos2; 2]> {
    let mut segments = Vec::new();
    if period.is_nan() || period <= 0.0 || !rect.is_positive() {
        return segments;
    }
    let (x0, x1, y0, y1) = (rect.min.x, rect.max.x, rect.min.y, rect.max.y);
    let (c_min, c_max) = if slope > 0.0 {
        (x0 + y0, x1 + y1)
    } else {
        (x0 - y1, x1 - y0)
    };
    let mut c = ((c_min - phase) / period).ceil() * period + phase;
    while c <= c_max {
        // x = c - slope * y, limited by the vertical extent of the rect
        let (a, b) = (c - slope * y0, c - slope * y1);
        let xa = a.min(b).max(x0);
        let xb = a.max(b).min(x1);
        if xa < xb {
            let y = |x: f32| (c - x) / slope;
            segments.push([pos2(xa, y(xa)), pos2(xb, y(xb))]);
        }
        c += period;
    }
    segments
}

fn draw_quads(out: &mut Vec<Shape>, p: &Projector<'_>, clip: Rect, quads: &[Quad], color: Option<Color32>) {
    let mut mesh = Mesh::default();
    for q in quads {
        let corners = p.quad(q.x, q.y, q.width, q.height);
        if clip.intersects(Rect::from_points(&corners)) {
            add_quad(&mut mesh, corners, color.unwrap_or(q.color));
        }
    }
    push_mesh(out, mesh);
}

fn draw_crosshatch(
    out: &mut Vec<Shape>,
    p: &Projector<'_>,
    clip: Rect,
    quads: &[Quad],
    material: &CrosshatchMaterial,
) {
    let mut fill = Mesh::default();
    let mut lines = Vec::new();
    for q in quads {
        let corners = p.quad(q.x, q.y, q.width, q.height);
        let bounds = Rect::from_points(&corners);
        if !clip.intersects(bounds) {
            continue;
        }
        add_quad(&mut fill, corners, material.background);
        lines.extend(crosshatch_segments(bounds.intersect(clip), material));
    }
    push_mesh(out, fill);
    let stroke = Stroke::new(1.0, material.lines);
    out.extend(lines.into_iter().map(|s| Shape::line_segment(s, stroke)));
}

fn draw_outlines(out: &mut Vec<Shape>, p: &Projector<'_>, clip: Rect, quads: &[Quad], stroke: Stroke) {
    for q in quads {
        let corners = p.quad(q.x, q.y, q.width, q.height);
        if clip.intersects(Rect::from_points(&corners)) {
            out.push(Shape::closed_line(corners.to_vec(), stroke));
        }
    }
}

/// Points drawn as squares; categorized points go in a second pass so they
/// end up on top.
fn draw_points(out: &mut Vec<Shape>, p: &Projector<'_>, clip: Rect, data: &[f32], material: &PointMaterial) {
    let mut mesh = Mesh::default();
    for on_top in [false, true] {
        for point in data.chunks_exact(3) {
            let (x, y, attribute) = (point[0], point[1], point[2]);
            if (attribute > 0.0) != on_top {
                continue;
            }
            let size = material.size_for(attribute);
            let rect = Rect::from_center_size(p.project(x, y), vec2(size, size));
            if clip.intersects(rect) {
                let color = material.color_for(x, y, attribute);
                add_quad(
                    &mut mesh,
                    [rect.left_bottom(), rect.right_bottom(), rect.right_top(), rect.left_top()],
                    color,
                );
            }
        }
    }
    push_mesh(out, mesh);
}

fn draw_object(out: &mut Vec<Shape>, object: &Object, p: &Projector<'_>, clip: Rect) {
    object.with_resources(|resources| match (&resources.geometry, &resources.material) {
        (Geometry::Triangles { vertices, indices }, Material::Basic { color }) => {
            let mut mesh = Mesh::default();
            for v in vertices {
                mesh.colored_vertex(p.project(v[0], v[1]), *color);
            }
            let n = vertices.len() as u32;
            for tri in indices.chunks_exact(3) {
                if tri.iter().all(|&i| i < n) {
                    mesh.add_triangle(tri[0], tri[1], tri[2]);
                }
            }
            push_mesh(out, mesh);
        }
        (Geometry::LineLoop { vertices }, Material::Line { color, width }) => {
            let points = vertices.iter().map(|v| p.project(v[0], v[1])).collect();
            out.push(Shape::closed_line(points, Stroke::new(*width, *color)));
        }
        (Geometry::Quads(quads), Material::VertexColors) => draw_quads(out, p, clip, quads, None),
        (Geometry::Quads(quads), Material::Basic { color }) => {
            draw_quads(out, p, clip, quads, Some(*color))
        }
        (Geometry::Quads(quads), Material::Crosshatch(material)) => {
            draw_crosshatch(out, p, clip, quads, material)
        }
        (Geometry::Quads(quads), Material::Line { color, width }) => {
            draw_outlines(out, p, clip, quads, Stroke::new(*width, *color))
        }
        (Geometry::TexturedQuads(quads), Material::Textured { texture }) => {
            let mut mesh = Mesh::with_texture(texture.id());
            for q in quads {
                let corners = p.quad(q.x, q.y, q.width, q.height);
                if !clip.intersects(Rect::from_points(&corners)) {
                    continue;
                }
                // world Y points up, texture rows go down
                let uvs = [
                    q.uv.left_bottom(),
                    q.uv.right_bottom(),
                    q.uv.right_top(),
                    q.uv.left_top(),
                ];
                let base = mesh.vertices.len() as u32;
                for (pos, uv) in corners.into_iter().zip(uvs) {
                    mesh.vertices.push(Vertex {
                        pos,
                        uv,
                        color: Color32::WHITE,
                    });
                }
                mesh.add_triangle(base, base + 1, base + 2);
                mesh.add_triangle(base, base + 2, base + 3);
            }
            push_mesh(out, mesh);
        }
        (Geometry::Points(data), Material::Points(material)) => {
            draw_points(out, p, clip, data, material)
        }
        (geometry, material) => {
            log::trace!(
                "'{}': nothing to draw for {material:?} on {} geometry",
                object.name(),
                if geometry.is_empty() { "empty" } else { "mismatched" }
            );
        }
    });
}

fn collect<'a>(object: &'a Object, parent: Transform, out: &mut Vec<(Transform, &'a Object)>) {
    let transform = object.transform().within(&parent);
    out.push((transform, object));
    for child in object.children() {
        collect(child, transform, out);
    }
}

/// Renderer producing egui shapes.
///
/// [`Renderer::render`] rebuilds the shape cache; [`EguiRenderer::paint`]
/// hands the cache to a painter every frame.
#[derive(Default)]
pub struct EguiRenderer {
    shapes: Vec<Shape>,
    origin: Pos2,
    renders: usize,
    touches: Vec<(TouchId, Pos2)>,
}

impl EguiRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shapes(&self) -> &[Shape] {
        &self.shapes
    }

    /// Number of frames rendered so far.
    pub fn render_count(&self) -> usize {
        self.renders
    }

    /// Screen position of the viewport's top-left corner.
    pub fn origin(&self) -> Pos2 {
        self.origin
    }

    /// Returns `true` when the origin moved and the cache is stale.
    pub fn set_origin(&mut self, origin: Pos2) -> bool {
        if self.origin == origin {
            return false;
        }
        self.origin = origin;
        true
    }

    pub fn paint(&self, painter: &Painter) {
        painter.extend(self.shapes.iter().cloned());
    }
}

impl Renderer for EguiRenderer {
    fn render(&mut self, frame: &Frame<'_>) {
        let (w, h) = frame.camera.viewport_size();
        let clip = Rect::from_min_size(self.origin, vec2(w as f32, h as f32));
        let mut out = Vec::with_capacity(self.shapes.len());
        out.push(Shape::rect_filled(clip, 0.0, frame.scene.background()));

        let mut objects = Vec::new();
        for child in frame.scene.children() {
            objects.clear();
            collect(child, Transform::IDENTITY, &mut objects);
            objects.sort_by(|a, b| a.0.z.total_cmp(&b.0.z));
            for (transform, object) in &objects {
                let projector = Projector {
                    camera: frame.camera,
                    origin: self.origin,
                    transform: *transform,
                };
                draw_object(&mut out, object, &projector, clip);
            }
        }

        if let Some(lasso) = frame.select_rect {
            let lasso = lasso.translate(self.origin.to_vec2());
            out.push(Shape::rect_filled(lasso, 0.0, LASSO_FILL));
            out.push(Shape::rect_stroke(
                lasso,
                0.0,
                Stroke::new(1.0, LASSO_STROKE),
                StrokeKind::Inside,
            ));
        }

        self.shapes = out;
        self.renders += 1;
        log::trace!("Frame {}: {} shapes", self.renders, self.shapes.len());
    }

    fn dispose(&mut self) {
        self.shapes.clear();
        self.touches.clear();
    }
}

fn touch_positions(touches: &[(TouchId, Pos2)]) -> Vec<Pos2> {
    touches.iter().map(|(_, pos)| *pos).collect()
}

/// Per-frame facts about the viewer widget that input routing depends on.
#[derive(Debug, Clone, Copy)]
struct InputContext {
    rect: Rect,
    hovered: bool,
    focused: bool,
    hover_pos: Option<Pos2>,
}

fn handle_input(ui: &Ui, response: &Response, viewer: &mut TwoDViewer<EguiRenderer>) {
    let (events, hover_pos) = ui.input(|i| (i.events.clone(), i.pointer.hover_pos()));
    let context = InputContext {
        rect: response.rect,
        hovered: ui.rect_contains_pointer(response.rect),
        focused: response.has_focus(),
        hover_pos,
    };
    for event in events {
        if route_event(viewer, &context, event) {
            response.request_focus();
        }
    }
}

/// Feeds one egui event to the viewer. Returns true when the widget should
/// take keyboard focus.
///
/// egui-winit also reports the first finger as pointer events, queued after
/// the matching `Event::Touch`; those are dropped while fingers are down so
/// a touch drives only the touch gesture.
fn route_event(
    viewer: &mut TwoDViewer<EguiRenderer>,
    context: &InputContext,
    event: Event,
) -> bool {
    let rect = context.rect;
    let local = |pos: Pos2| (pos - rect.min).to_pos2();
    let touching = !viewer.renderer().touches.is_empty();

    match event {
        Event::PointerButton { .. } | Event::PointerMoved(_) if touching => {}
        Event::PointerButton {
            pos,
            button,
            pressed: true,
            modifiers,
        } if context.hovered && rect.contains(pos) => {
            viewer.pointer_down(button, local(pos), modifiers);
            return true;
        }
        Event::PointerButton {
            pos,
            pressed: false,
            ..
        } if viewer.is_capturing() => viewer.pointer_up(local(pos)),
        Event::PointerMoved(pos) if viewer.is_capturing() => viewer.pointer_move(local(pos)),
        Event::MouseWheel { delta, .. } if context.hovered => {
            if let Some(pos) = context.hover_pos {
                // egui reports scrolling up as positive
                viewer.wheel(local(pos), -delta.y);
            }
        }
        Event::Key {
            key, pressed: true, ..
        } if context.hovered || context.focused => {
            if let Some(key) = ControlKey::from_key(key) {
                viewer.key_down(key);
            }
        }
        Event::Touch { id, phase, pos, .. } => {
            let touches = &mut viewer.renderer_mut().touches;
            match phase {
                TouchPhase::Start if rect.contains(pos) => {
                    touches.push((id, local(pos)));
                    let positions = touch_positions(touches);
                    viewer.touch_start(&positions);
                }
                TouchPhase::Move => {
                    let Some(entry) = touches.iter_mut().find(|(t, _)| *t == id) else {
                        return false;
                    };
                    entry.1 = local(pos);
                    let positions = touch_positions(touches);
                    viewer.touch_move(&positions);
                }
                TouchPhase::End | TouchPhase::Cancel => {
                    let before = touches.len();
                    touches.retain(|(t, _)| *t != id);
                    if touches.len() == before {
                        return false;
                    }
                    let positions = touch_positions(touches);
                    viewer.touch_end();
                    if !positions.is_empty() {
                        viewer.touch_start(&positions);
                    }
                }
                TouchPhase::Start => {}
            }
        }
        _ => {}
    }
    false
}

/// Allocates the remaining space of `ui` for the viewer, routes input to it,
/// renders if dirty and paints the cached frame.
pub fn show(ui: &mut Ui, viewer: &mut TwoDViewer<EguiRenderer>) -> Response {
    let size = ui.available_size();
    let (response, painter) = ui.allocate_painter(size, Sense::click_and_drag());
    let rect = response.rect;

    if !viewer.has_repaint_signal() {
        viewer.set_repaint_signal(Box::new(ui.ctx().clone()));
    }
    if viewer.renderer_mut().set_origin(rect.min) {
        viewer.mark_dirty();
    }
    let (w, h) = viewer.camera().viewport_size();
    if (w as f32 - rect.width()).abs() > 0.5 || (h as f32 - rect.height()).abs() > 0.5 {
        viewer.resize(rect.width() as f64, rect.height() as f64);
    }

    handle_input(ui, &response, viewer);
    viewer.flush();
    viewer.renderer().paint(&painter);
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hatch() -> CrosshatchMaterial {
        CrosshatchMaterial::new(Color32::BLACK, Color32::WHITE)
    }

    #[test]
    fn test_crosshatch_stays_inside() {
        let rect = Rect::from_min_max(pos2(13.0, 7.0), pos2(93.0, 41.0));
        let segments = crosshatch_segments(rect, &hatch());
        assert!(!segments.is_empty());
        let grown = rect.expand(1e-3);
        for [a, b] in segments {
            assert!(grown.contains(a), "{a:?} outside {rect:?}");
            assert!(grown.contains(b), "{b:?} outside {rect:?}");
        }
    }

    #[test]
    fn test_crosshatch_anchored_to_pixels() {
        let material = hatch();
        let small = Rect::from_min_max(pos2(0.0, 0.0), pos2(40.0, 40.0));
        let large = Rect::from_min_max(pos2(-100.0, -100.0), pos2(100.0, 100.0));
        // every line crossing the small rect belongs to the large rect's pattern
        let big: Vec<f32> = crosshatch_segments(large, &material)
            .iter()
            .map(|[a, _]| a.x + a.y)
            .collect();
        for [a, b] in diagonal_segments(small, 2.0 * material.spacing, material.spacing, 1.0) {
            let c = a.x + a.y;
            assert!((c - (b.x + b.y)).abs() < 1e-3);
            assert!(big.iter().any(|v| (v - c).abs() < 1e-3));
        }
    }

    #[test]
    fn test_degenerate_rect_has_no_lines() {
        let rect = Rect::from_min_max(pos2(5.0, 5.0), pos2(5.0, 20.0));
        assert!(crosshatch_segments(rect, &hatch()).is_empty());
    }

    fn touch(id: u64, phase: TouchPhase, pos: Pos2) -> Event {
        Event::Touch {
            device_id: egui::TouchDeviceId(0),
            id: TouchId(id),
            phase,
            pos,
            force: None,
        }
    }

    fn press(pos: Pos2, pressed: bool) -> Event {
        Event::PointerButton {
            pos,
            button: egui::PointerButton::Primary,
            pressed,
            modifiers: egui::Modifiers::NONE,
        }
    }

    #[test]
    fn test_one_finger_drag_pans_without_lasso() {
        use crate::config::ViewerOptions;
        use crate::geometry::WorldRect;

        let (mut viewer, events) = TwoDViewer::new(ViewerOptions::default(), EguiRenderer::new());
        viewer.resize(300.0, 300.0);
        viewer.set_work_area_rect(Some(WorldRect::centered_square(300.0)));
        viewer.wheel(pos2(150.0, 150.0), -1.0);
        let zoom = viewer.camera().zoom();
        let target = viewer.camera().target();
        let _ = events.zoom.try_iter().count();

        let context = InputContext {
            rect: Rect::from_min_size(Pos2::ZERO, vec2(300.0, 300.0)),
            hovered: true,
            focused: false,
            hover_pos: Some(pos2(150.0, 150.0)),
        };
        // the order egui-winit emits for a one-finger drag
        let sequence = [
            touch(1, TouchPhase::Start, pos2(150.0, 150.0)),
            Event::PointerMoved(pos2(150.0, 150.0)),
            press(pos2(150.0, 150.0), true),
            touch(1, TouchPhase::Move, pos2(190.0, 150.0)),
            Event::PointerMoved(pos2(190.0, 150.0)),
            touch(1, TouchPhase::End, pos2(190.0, 150.0)),
            press(pos2(190.0, 150.0), false),
            Event::PointerGone,
        ];
        for event in sequence {
            assert!(!route_event(&mut viewer, &context, event));
        }

        assert!(viewer.camera().target().x < target.x);
        assert_eq!(viewer.camera().zoom(), zoom);
        assert!(!viewer.is_capturing());
        assert!(!viewer.selecting());
        assert_eq!(events.selection.try_iter().count(), 0);
    }

    #[test]
    fn test_mouse_press_takes_focus() {
        use crate::config::ViewerOptions;

        let (mut viewer, _events) = TwoDViewer::new(ViewerOptions::default(), EguiRenderer::new());
        viewer.resize(300.0, 300.0);
        let context = InputContext {
            rect: Rect::from_min_size(pos2(10.0, 10.0), vec2(300.0, 300.0)),
            hovered: true,
            focused: false,
            hover_pos: None,
        };
        assert!(route_event(&mut viewer, &context, press(pos2(20.0, 20.0), true)));
        assert!(viewer.is_capturing());
        assert!(!route_event(&mut viewer, &context, press(pos2(20.0, 20.0), false)));
        assert!(!viewer.is_capturing());
    }
}
