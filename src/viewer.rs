// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Huang Rui <vowstar@gmail.com>

//! Zoomable, pannable 2D viewer.
//!
//! [`TwoDViewer`] ties the camera, the interaction controller, the retained
//! scene and the render scheduler together. Input handlers mutate the camera
//! and mark the viewer dirty; the actual draw happens in [`TwoDViewer::flush`]
//! at the end of the UI pass, or immediately with [`TwoDViewer::render`].
//!
//! Zoom changes and lasso progress are reported on the channels returned by
//! [`TwoDViewer::new`].

use std::sync::mpsc::{channel, Receiver, Sender};

use egui::{Modifiers, PointerButton, Pos2, Rect};

use crate::camera::{Axis, Camera};
use crate::config::{Tool, ViewerOptions};
use crate::controls::{ControlKey, ControlResponse, ControlsConfig, MapControls};
use crate::geometry::{Bounds, WorldPoint, WorldRect};
use crate::render::{Frame, Renderer};
use crate::scene::{Drawable, Released, Scene, SceneReconciler};
use crate::scheduler::{RenderScheduler, RepaintSignal};

/// Lasso progress. Sent on every tick of a selection gesture.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SelectionEvent {
    /// Selected world rectangle; `None` before the pointer has moved.
    pub rect: Option<WorldRect>,
    /// Set on pointer release.
    pub finished: bool,
}

/// Receiving ends of the viewer's notifications.
pub struct ViewerEvents {
    /// Current zoom, sent only when it changes.
    pub zoom: Receiver<f64>,
    pub selection: Receiver<SelectionEvent>,
}

/// Called with the frame about to be drawn.
pub type PreRenderHook = Box<dyn FnMut(&Frame<'_>)>;

pub struct TwoDViewer<R: Renderer> {
    options: ViewerOptions,
    camera: Camera,
    controls: MapControls,
    reconciler: SceneReconciler,
    scheduler: RenderScheduler,
    renderer: R,
    tool: Tool,
    selection_world_rect: Option<Bounds>,
    pre_render: Option<PreRenderHook>,
    zoom_tx: Sender<f64>,
    selection_tx: Sender<SelectionEvent>,
    disposed: bool,
}

fn controls_config(options: &ViewerOptions) -> ControlsConfig {
    ControlsConfig {
        zoom_speed: options.zoom_speed,
        key_pan_speed: options.key_pan_speed,
        ..ControlsConfig::map()
    }
}

impl<R: Renderer> TwoDViewer<R> {
    pub fn new(options: ViewerOptions, renderer: R) -> (Self, ViewerEvents) {
        let (zoom_tx, zoom) = channel();
        let (selection_tx, selection) = channel();
        let tool = Tool::default();
        let mut controls = MapControls::new(controls_config(&options));
        controls.set_enable_select(tool.selects());

        let mut viewer = Self {
            camera: Camera::new(&options),
            controls,
            reconciler: SceneReconciler::new(options.background),
            scheduler: RenderScheduler::new(),
            renderer,
            tool,
            selection_world_rect: None,
            pre_render: None,
            zoom_tx,
            selection_tx,
            disposed: false,
            options,
        };
        viewer.mark_dirty();
        (viewer, ViewerEvents { zoom, selection })
    }

    pub fn options(&self) -> &ViewerOptions {
        &self.options
    }

    /// Applies new zoom limits, zoom speed and background. A gesture in
    /// progress carries on with the new speeds.
    pub fn set_options(&mut self, options: ViewerOptions) {
        if options == self.options {
            return;
        }
        self.camera.set_zoom_limits(options.min_zoom, options.max_zoom);
        let config = self.controls.config_mut();
        config.zoom_speed = options.zoom_speed;
        config.key_pan_speed = options.key_pan_speed;
        self.reconciler.scene_mut().set_background(options.background);
        self.options = options;
        self.mark_dirty();
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn controls(&self) -> &MapControls {
        &self.controls
    }

    pub fn scene(&self) -> &Scene {
        self.reconciler.scene()
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn renderer_mut(&mut self) -> &mut R {
        &mut self.renderer
    }

    pub fn set_repaint_signal(&mut self, signal: Box<dyn RepaintSignal>) {
        self.scheduler.set_signal(signal);
    }

    pub fn has_repaint_signal(&self) -> bool {
        self.scheduler.has_signal()
    }

    pub fn set_pre_render(&mut self, hook: PreRenderHook) {
        self.pre_render = Some(hook);
    }

    /// Work area in world coordinates; zoom 1 fits it to the viewport.
    pub fn set_work_area_rect(&mut self, rect: Option<WorldRect>) {
        if rect == self.camera.work_area() {
            return;
        }
        self.camera.set_work_area(rect);
        self.mark_dirty();
    }

    /// Declares the drawables to show, in draw order.
    pub fn set_objects(&mut self, objects: Vec<Option<Drawable>>) {
        if self.reconciler.set_objects(objects) {
            self.mark_dirty();
        }
    }

    /// Re-syncs the scene with the last declared objects.
    pub fn refresh(&mut self) {
        self.reconciler.refresh();
        self.mark_dirty();
    }

    pub fn tool(&self) -> Tool {
        self.tool
    }

    pub fn set_tool(&mut self, tool: Tool) {
        if self.tool == tool {
            return;
        }
        self.tool = tool;
        self.controls.set_enable_select(tool.selects());
    }

    /// Viewport resized to `width` x `height` logical pixels.
    pub fn resize(&mut self, width: f64, height: f64) {
        self.camera.resize(width, height);
        self.mark_dirty();
    }

    pub fn scroll_to(&mut self, axis: Axis, position: f64) {
        let before = self.camera;
        self.camera.scroll_to(axis, position);
        if self.camera != before {
            self.controls.clear_select_rect();
            self.mark_dirty();
        }
    }

    /// Viewport size in world units.
    pub fn viewport_area(&self) -> (f64, f64) {
        self.camera.viewport_area()
    }

    /// World coordinates of the viewport center.
    pub fn viewport_position(&self) -> WorldPoint {
        self.camera.viewport_position()
    }

    /// True while a lasso rectangle is being dragged.
    pub fn selecting(&self) -> bool {
        self.controls.enable_select() && self.controls.has_select_rect()
    }

    /// Lasso rectangle in viewport pixels.
    pub fn select_rect(&self) -> Option<Rect> {
        self.controls.select_rect()
    }

    pub fn selection_world_rect(&self) -> Option<Bounds> {
        self.selection_world_rect
    }

    pub fn pointer_down(&mut self, button: PointerButton, pos: Pos2, modifiers: Modifiers) {
        let response = self.controls.pointer_down(button, pos, modifiers);
        self.handle(response);
    }

    pub fn pointer_move(&mut self, pos: Pos2) {
        let response = self.controls.pointer_move(&mut self.camera, pos);
        self.handle(response);
    }

    pub fn pointer_up(&mut self, pos: Pos2) {
        let response = self.controls.pointer_up(pos);
        self.handle(response);
    }

    pub fn is_capturing(&self) -> bool {
        self.controls.is_capturing()
    }

    pub fn wheel(&mut self, pos: Pos2, delta_y: f32) {
        let response = self.controls.wheel(&mut self.camera, pos, delta_y);
        self.handle(response);
    }

    pub fn key_down(&mut self, key: ControlKey) {
        let response = self.controls.key_down(&mut self.camera, key);
        self.handle(response);
    }

    pub fn touch_start(&mut self, touches: &[Pos2]) {
        let response = self.controls.touch_start(touches);
        self.handle(response);
    }

    pub fn touch_move(&mut self, touches: &[Pos2]) {
        let response = self.controls.touch_move(&mut self.camera, touches);
        self.handle(response);
    }

    pub fn touch_end(&mut self) {
        let response = self.controls.touch_end();
        self.handle(response);
    }

    fn handle(&mut self, response: ControlResponse) {
        if response.changed {
            self.mark_dirty();
        }
        if let Some(finished) = response.selecting {
            self.selecting_tick(finished);
        }
    }

    fn selecting_tick(&mut self, finished: bool) {
        if !self.tool.selects() {
            return;
        }
        self.selection_world_rect = self.controls.select_world_rect(&self.camera);
        let _ = self.selection_tx.send(SelectionEvent {
            rect: self.selection_world_rect.map(|b| b.to_rect()),
            finished,
        });
        if finished {
            if let (Tool::Zoom, Some(rect)) = (self.tool, self.controls.select_rect()) {
                self.camera.zoom_to_rect(
                    rect.left() as f64,
                    rect.right() as f64,
                    rect.top() as f64,
                    rect.bottom() as f64,
                );
            }
            self.controls.clear_select_rect();
            self.selection_world_rect = None;
        }
        self.mark_dirty();
    }

    /// Schedules one render for the end of the current pass.
    pub fn mark_dirty(&mut self) {
        if !self.disposed {
            self.scheduler.mark_dirty();
        }
    }

    pub fn is_dirty(&self) -> bool {
        self.scheduler.is_pending()
    }

    /// Runs the pending render, if any. Returns whether it rendered.
    pub fn flush(&mut self) -> bool {
        if !self.scheduler.is_pending() {
            return false;
        }
        self.render();
        true
    }

    /// Renders immediately and reports a zoom change.
    pub fn render(&mut self) {
        if self.disposed {
            return;
        }
        let frame = Frame {
            scene: self.reconciler.scene(),
            camera: &self.camera,
            select_rect: self.controls.select_rect(),
            selection: self.selection_world_rect,
        };
        if let Some(hook) = self.pre_render.as_mut() {
            hook(&frame);
        }
        self.renderer.render(&frame);
        self.scheduler.rendered();

        if let Some(zoom) = self.scheduler.observe_zoom(self.camera.zoom()) {
            let _ = self.zoom_tx.send(zoom);
        }
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Ends any gesture, drops a pending render and disposes every retained
    /// drawable. Further calls are no-ops.
    pub fn dispose(&mut self) -> Released {
        if self.disposed {
            return Released::default();
        }
        self.controls.cancel();
        self.scheduler.cancel();
        self.pre_render = None;
        let released = self.reconciler.teardown();
        self.renderer.dispose();
        self.disposed = true;
        log::debug!(
            "Viewer disposed: {} geometries, {} materials, {} textures",
            released.geometries,
            released.materials,
            released.textures
        );
        released
    }
}

impl<R: Renderer> Drop for TwoDViewer<R> {
    fn drop(&mut self) {
        self.dispose();
    }
}
