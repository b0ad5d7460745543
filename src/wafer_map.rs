// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Huang Rui <vowstar@gmail.com>

//! Wafer map: owns the wafer outline, die map and point cloud drawables and
//! shows them in a [`TwoDViewer`].
//!
//! Source data is shared with `Rc`; handing in the same `Rc` again is a
//! no-op, a different one disposes the old drawable before the new one is
//! built.

use std::cell::Cell;
use std::rc::Rc;

use crate::config::{PointOptions, Tool, WaferOptions};
use crate::geometry::{
    create_points, create_rectangles, generate_wafer_shape, notch_rotation, Bounds, DieMap,
    WorldRect,
};
use crate::render::{Frame, Renderer};
use crate::scene::{self, Drawable, Material, Released};
use crate::viewer::{SelectionEvent, TwoDViewer, ViewerEvents};

/// Gap between the wafer edge and the work area border, in world units.
const WORK_AREA_MARGIN: f64 = 2.0;

/// Notification drained by [`WaferMap::poll`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WaferMapEvent {
    Zoom(f64),
    Selection(SelectionEvent),
}

fn same<T: ?Sized>(a: &Option<Rc<T>>, b: &Option<Rc<T>>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => Rc::ptr_eq(a, b),
        (None, None) => true,
        _ => false,
    }
}

pub struct WaferMap<R: Renderer> {
    viewer: TwoDViewer<R>,
    events: ViewerEvents,
    wafer_options: WaferOptions,
    point_options: PointOptions,
    die_map: Option<Rc<DieMap>>,
    points: Option<Rc<[f32]>>,
    wafer: Option<Drawable>,
    dies: Option<Drawable>,
    cloud: Option<Drawable>,
    /// Selection committed in [`Tool::Select`] mode, highlighted until replaced.
    committed: Rc<Cell<Option<Bounds>>>,
    point_size: Rc<Cell<f32>>,
    alpha_blending: Rc<Cell<bool>>,
}

impl<R: Renderer> WaferMap<R> {
    pub fn new(wafer_options: WaferOptions, renderer: R) -> Self {
        let (mut viewer, events) = TwoDViewer::new(wafer_options.viewer_options(), renderer);
        let point_options = PointOptions::default();
        let committed = Rc::new(Cell::new(None));
        let point_size = Rc::new(Cell::new(point_options.point_size));
        let alpha_blending = Rc::new(Cell::new(point_options.alpha_blending));

        let hook_selection = Rc::clone(&committed);
        let hook_size = Rc::clone(&point_size);
        let hook_blending = Rc::clone(&alpha_blending);
        viewer.set_pre_render(Box::new(move |frame: &Frame<'_>| {
            let selection = frame.selection.or(hook_selection.get());
            update_point_materials(frame, selection, hook_size.get(), hook_blending.get());
        }));

        let mut map = Self {
            viewer,
            events,
            wafer_options,
            point_options,
            die_map: None,
            points: None,
            wafer: None,
            dies: None,
            cloud: None,
            committed,
            point_size,
            alpha_blending,
        };
        map.rebuild_wafer();
        map.sync();
        map
    }

    pub fn viewer(&self) -> &TwoDViewer<R> {
        &self.viewer
    }

    pub fn viewer_mut(&mut self) -> &mut TwoDViewer<R> {
        &mut self.viewer
    }

    pub fn wafer_options(&self) -> &WaferOptions {
        &self.wafer_options
    }

    pub fn point_options(&self) -> &PointOptions {
        &self.point_options
    }

    /// Selection kept for highlighting after a finished lasso in select mode.
    pub fn committed_selection(&self) -> Option<Bounds> {
        self.committed.get()
    }

    pub fn wafer(&self) -> Option<&Drawable> {
        self.wafer.as_ref()
    }

    pub fn dies(&self) -> Option<&Drawable> {
        self.dies.as_ref()
    }

    pub fn cloud(&self) -> Option<&Drawable> {
        self.cloud.as_ref()
    }

    /// Rebuilds the outline when its shape or colors change; a notch angle
    /// change alone only rotates the existing drawable.
    pub fn set_wafer_options(&mut self, options: WaferOptions) {
        if options == self.wafer_options {
            return;
        }
        let old = std::mem::replace(&mut self.wafer_options, options);
        self.viewer.set_options(self.wafer_options.viewer_options());

        let new = &self.wafer_options;
        let reshape = old.diameter != new.diameter
            || old.notch_size != new.notch_size
            || old.fill != new.fill
            || old.perimeter != new.perimeter;
        if reshape {
            self.rebuild_wafer();
            self.sync();
        } else if old.notch_angle != new.notch_angle {
            if let Some(wafer) = &self.wafer {
                wafer.set_rotation(notch_rotation(new.notch_angle));
            }
            self.viewer.mark_dirty();
        }
    }

    fn rebuild_wafer(&mut self) {
        scene::dispose(self.wafer.take().as_ref());
        let o = &self.wafer_options;
        self.wafer =
            generate_wafer_shape(o.diameter, o.notch_size, o.notch_angle, o.fill, o.perimeter);
        let work_area = (o.diameter > 0.0)
            .then(|| WorldRect::centered_square(o.diameter + WORK_AREA_MARGIN));
        self.viewer.set_work_area_rect(work_area);
    }

    pub fn set_die_map(&mut self, die_map: Option<Rc<DieMap>>) {
        if same(&self.die_map, &die_map) {
            return;
        }
        scene::dispose(self.dies.take().as_ref());
        self.dies = die_map.as_deref().map(create_rectangles);
        self.die_map = die_map;
        self.sync();
    }

    /// Point size and alpha blending changes are applied without rebuilding
    /// the cloud.
    pub fn set_point_options(&mut self, options: PointOptions) {
        if options == self.point_options {
            return;
        }
        let restyle = options.palette != self.point_options.palette
            || options.selected != self.point_options.selected;
        self.point_size.set(options.point_size);
        self.alpha_blending.set(options.alpha_blending);
        self.point_options = options;
        if restyle {
            self.rebuild_points();
            self.sync();
        } else {
            self.viewer.mark_dirty();
        }
    }

    pub fn set_points(&mut self, points: Option<Rc<[f32]>>) {
        if same(&self.points, &points) {
            return;
        }
        self.points = points;
        self.rebuild_points();
        self.sync();
    }

    fn rebuild_points(&mut self) {
        scene::dispose(self.cloud.take().as_ref());
        self.cloud = self
            .points
            .as_deref()
            .and_then(|data| create_points(data, &self.point_options));
    }

    pub fn set_tool(&mut self, tool: Tool) {
        if tool != Tool::Select && self.committed.take().is_some() {
            self.viewer.mark_dirty();
        }
        self.viewer.set_tool(tool);
    }

    fn sync(&mut self) {
        self.viewer.set_objects(vec![
            self.wafer.clone(),
            self.dies.clone(),
            self.cloud.clone(),
        ]);
    }

    /// Drains viewer notifications. A finished lasso in select mode becomes
    /// the committed selection.
    pub fn poll(&mut self) -> Vec<WaferMapEvent> {
        let mut events: Vec<WaferMapEvent> =
            self.events.zoom.try_iter().map(WaferMapEvent::Zoom).collect();
        for selection in self.events.selection.try_iter() {
            if selection.finished && self.viewer.tool() == Tool::Select {
                self.committed.set(selection.rect.map(|r| r.bounds()));
                self.viewer.mark_dirty();
            }
            events.push(WaferMapEvent::Selection(selection));
        }
        events
    }

    /// Releases every drawable and tears the viewer down.
    pub fn dispose(&mut self) -> Released {
        let mut released = Released::default();
        released += scene::dispose(self.wafer.take().as_ref());
        released += scene::dispose(self.dies.take().as_ref());
        released += scene::dispose(self.cloud.take().as_ref());
        released += self.viewer.dispose();
        released
    }
}

fn update_point_materials(
    frame: &Frame<'_>,
    selection: Option<Bounds>,
    point_size: f32,
    alpha_blending: bool,
) {
    for child in frame.scene.children() {
        child.visit(&mut |object| {
            object.with_resources(|resources| {
                if let Material::Points(material) = &resources.material {
                    material.set_selection(selection);
                    material.set_point_size(point_size);
                    material.set_alpha_blending(alpha_blending);
                }
            });
        });
    }
}
