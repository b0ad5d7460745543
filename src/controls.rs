// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Huang Rui <vowstar@gmail.com>

//! Pointer, wheel, key and touch handling for the 2D camera.
//!
//! [`MapControls`] is a small state machine. A gesture starts on pointer-down
//! (the state is picked from [`ButtonMap`] and the modifiers), continues with
//! moves while the pointer is captured, and ends on pointer-up wherever the
//! pointer is. Every handler returns a [`ControlResponse`] telling the caller
//! whether the camera moved and whether a lasso selection progressed.

use egui::{Key, Modifiers, PointerButton, Pos2, Rect};
use serde::{Deserialize, Serialize};

use crate::camera::Camera;
use crate::geometry::Bounds;

/// Wheel zoom factor per notch before applying the zoom speed exponent.
pub const ZOOM_STEP: f64 = 0.840896415253714543;

/// Gesture a mouse button starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MouseAction {
    None,
    Rotate,
    Dolly,
    Pan,
    Select,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ButtonMap {
    pub primary: MouseAction,
    pub middle: MouseAction,
    pub secondary: MouseAction,
}

impl ButtonMap {
    pub fn action(&self, button: PointerButton) -> MouseAction {
        match button {
            PointerButton::Primary => self.primary,
            PointerButton::Middle => self.middle,
            PointerButton::Secondary => self.secondary,
            _ => MouseAction::None,
        }
    }
}

/// Gesture a touch with a given number of fingers starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TouchAction {
    Rotate,
    Pan,
    DollyPan,
    DollyRotate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TouchMap {
    pub one: TouchAction,
    pub two: TouchAction,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlsConfig {
    pub buttons: ButtonMap,
    pub touches: TouchMap,
    pub zoom_speed: f64,
    /// Pixels per arrow key press.
    pub key_pan_speed: f64,
    pub enable_zoom: bool,
    pub enable_pan: bool,
    pub enable_keys: bool,
}

impl ControlsConfig {
    /// Primary button selects, middle and secondary pan, one finger pans.
    pub fn map() -> Self {
        Self {
            buttons: ButtonMap {
                primary: MouseAction::Select,
                middle: MouseAction::Pan,
                secondary: MouseAction::Pan,
            },
            touches: TouchMap {
                one: TouchAction::Pan,
                two: TouchAction::DollyRotate,
            },
            zoom_speed: 1.0,
            key_pan_speed: 7.0,
            enable_zoom: true,
            enable_pan: true,
            enable_keys: true,
        }
    }

    /// Primary rotates (pans with a modifier), middle dollies, secondary pans.
    pub fn orbit() -> Self {
        Self {
            buttons: ButtonMap {
                primary: MouseAction::Rotate,
                middle: MouseAction::Dolly,
                secondary: MouseAction::Pan,
            },
            touches: TouchMap {
                one: TouchAction::Rotate,
                two: TouchAction::DollyPan,
            },
            ..Self::map()
        }
    }

    pub fn zoom_scale(&self) -> f64 {
        ZOOM_STEP.powf(self.zoom_speed)
    }
}

impl Default for ControlsConfig {
    fn default() -> Self {
        Self::map()
    }
}

/// Keys the controller reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlKey {
    Up,
    Down,
    Left,
    Right,
    ZoomIn,
    ZoomOut,
    ResetZoom,
}

impl ControlKey {
    pub fn from_key(key: Key) -> Option<Self> {
        match key {
            Key::ArrowUp => Some(Self::Up),
            Key::ArrowDown => Some(Self::Down),
            Key::ArrowLeft => Some(Self::Left),
            Key::ArrowRight => Some(Self::Right),
            Key::Plus | Key::Equals => Some(Self::ZoomIn),
            Key::Minus => Some(Self::ZoomOut),
            Key::Backslash => Some(Self::ResetZoom),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ControlState {
    #[default]
    None,
    /// Not supported by the 2D camera; never entered.
    Rotate,
    Dolly,
    Pan,
    Select,
    TouchPan,
    TouchDollyPan,
    TouchDollyRotate,
}

/// What a handler did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ControlResponse {
    /// The camera moved or zoomed.
    pub changed: bool,
    /// A lasso tick happened; `Some(true)` on release.
    pub selecting: Option<bool>,
}

impl ControlResponse {
    fn changed(changed: bool) -> Self {
        Self {
            changed,
            selecting: None,
        }
    }

    fn selecting(finished: bool) -> Self {
        Self {
            changed: false,
            selecting: Some(finished),
        }
    }
}

#[derive(Debug, Clone)]
pub struct MapControls {
    config: ControlsConfig,
    state: ControlState,
    enable_select: bool,
    capturing: bool,
    start: Pos2,
    touch_distance: f64,
    click_point: Pos2,
    up_point: Pos2,
}

impl MapControls {
    pub fn new(config: ControlsConfig) -> Self {
        Self {
            config,
            state: ControlState::None,
            enable_select: true,
            capturing: false,
            start: Pos2::ZERO,
            touch_distance: 0.0,
            click_point: Pos2::ZERO,
            up_point: Pos2::ZERO,
        }
    }

    pub fn config(&self) -> &ControlsConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut ControlsConfig {
        &mut self.config
    }

    pub fn state(&self) -> ControlState {
        self.state
    }

    /// True between a pointer-down that started a gesture and its release.
    pub fn is_capturing(&self) -> bool {
        self.capturing
    }

    pub fn enable_select(&self) -> bool {
        self.enable_select
    }

    /// With selection disabled the primary select action pans instead.
    pub fn set_enable_select(&mut self, enable: bool) {
        self.enable_select = enable;
    }

    fn track(&mut self, camera: &mut Camera, f: impl FnOnce(&mut Camera)) -> bool {
        let before = *camera;
        f(camera);
        let changed = *camera != before;
        if changed {
            self.clear_select_rect();
        }
        changed
    }

    pub fn pointer_down(
        &mut self,
        button: PointerButton,
        pos: Pos2,
        modifiers: Modifiers,
    ) -> ControlResponse {
        let modified = modifiers.ctrl || modifiers.command || modifiers.mac_cmd || modifiers.shift;
        let primary = button == PointerButton::Primary;
        let state = match self.config.buttons.action(button) {
            MouseAction::Rotate if primary && modified => ControlState::Pan,
            MouseAction::Pan if primary && modified => ControlState::Rotate,
            MouseAction::Rotate => ControlState::Rotate,
            MouseAction::Pan => ControlState::Pan,
            MouseAction::Dolly => ControlState::Dolly,
            MouseAction::Select if self.enable_select => ControlState::Select,
            MouseAction::Select => ControlState::Pan,
            MouseAction::None => ControlState::None,
        };
        self.state = match state {
            ControlState::Rotate => {
                log::trace!("Rotation is not supported, ignoring {button:?}");
                ControlState::None
            }
            ControlState::Pan if !self.config.enable_pan => ControlState::None,
            ControlState::Dolly if !self.config.enable_zoom => ControlState::None,
            other => other,
        };

        let mut response = ControlResponse::default();
        match self.state {
            ControlState::None => return response,
            ControlState::Select => {
                self.click_point = pos;
                self.up_point = pos;
                response = ControlResponse::selecting(false);
            }
            _ => self.start = pos,
        }
        self.capturing = true;
        response
    }

    /// Pointer moved anywhere; ignored unless a gesture has the capture.
    pub fn pointer_move(&mut self, camera: &mut Camera, pos: Pos2) -> ControlResponse {
        if !self.capturing {
            return ControlResponse::default();
        }
        match self.state {
            ControlState::Dolly => {
                let delta = pos.y - self.start.y;
                self.start = pos;
                let scale = self.config.zoom_scale();
                ControlResponse::changed(self.track(camera, |c| {
                    if delta > 0.0 {
                        c.dolly_in(scale);
                    } else if delta < 0.0 {
                        c.dolly_out(scale);
                    }
                }))
            }
            ControlState::Pan => {
                let delta = pos - self.start;
                self.start = pos;
                ControlResponse::changed(
                    self.track(camera, |c| c.pan_pixels(delta.x as f64, delta.y as f64)),
                )
            }
            ControlState::Select => {
                self.up_point = pos;
                ControlResponse::selecting(false)
            }
            _ => ControlResponse::default(),
        }
    }

    /// Ends the gesture. Releases outside the viewer still end it.
    pub fn pointer_up(&mut self, pos: Pos2) -> ControlResponse {
        let response = if self.state == ControlState::Select && self.capturing {
            self.up_point = pos;
            ControlResponse::selecting(true)
        } else {
            ControlResponse::default()
        };
        self.capturing = false;
        self.state = ControlState::None;
        response
    }

    /// Zooms about `pos`. Scrolling up (`delta_y < 0`) zooms in.
    pub fn wheel(&mut self, camera: &mut Camera, pos: Pos2, delta_y: f32) -> ControlResponse {
        if !self.config.enable_zoom
            || !matches!(self.state, ControlState::None | ControlState::Rotate)
            || delta_y == 0.0
        {
            return ControlResponse::default();
        }
        let scale = self.config.zoom_scale();
        let factor = if delta_y < 0.0 { 1.0 / scale } else { scale };
        ControlResponse::changed(
            self.track(camera, |c| c.zoom_about(pos.x as f64, pos.y as f64, factor)),
        )
    }

    pub fn key_down(&mut self, camera: &mut Camera, key: ControlKey) -> ControlResponse {
        if !self.config.enable_keys || !self.config.enable_pan {
            return ControlResponse::default();
        }
        let step = self.config.key_pan_speed;
        let scale = self.config.zoom_scale();
        ControlResponse::changed(self.track(camera, |c| match key {
            ControlKey::Up => c.pan_pixels(0.0, step),
            ControlKey::Down => c.pan_pixels(0.0, -step),
            ControlKey::Left => c.pan_pixels(step, 0.0),
            ControlKey::Right => c.pan_pixels(-step, 0.0),
            ControlKey::ZoomIn => c.dolly_out(scale),
            ControlKey::ZoomOut => c.dolly_in(scale),
            ControlKey::ResetZoom => c.reset_zoom(),
        }))
    }

    pub fn touch_start(&mut self, touches: &[Pos2]) -> ControlResponse {
        self.state = match touches {
            [one] => match self.config.touches.one {
                TouchAction::Pan if self.config.enable_pan => {
                    self.start = *one;
                    ControlState::TouchPan
                }
                _ => ControlState::None,
            },
            [a, b, ..] => {
                self.touch_distance = a.distance(*b) as f64;
                match self.config.touches.two {
                    TouchAction::DollyPan => {
                        self.start = midpoint(*a, *b);
                        ControlState::TouchDollyPan
                    }
                    TouchAction::DollyRotate if self.config.enable_zoom => {
                        ControlState::TouchDollyRotate
                    }
                    _ => ControlState::None,
                }
            }
            [] => ControlState::None,
        };
        ControlResponse::default()
    }

    pub fn touch_move(&mut self, camera: &mut Camera, touches: &[Pos2]) -> ControlResponse {
        match (self.state, touches) {
            (ControlState::TouchPan, [one, ..]) => {
                let delta = *one - self.start;
                self.start = *one;
                ControlResponse::changed(
                    self.track(camera, |c| c.pan_pixels(delta.x as f64, delta.y as f64)),
                )
            }
            (ControlState::TouchDollyPan | ControlState::TouchDollyRotate, [a, b, ..]) => {
                let mut changed = false;
                if self.config.enable_zoom {
                    let distance = a.distance(*b) as f64;
                    if self.touch_distance > 0.0 && distance > 0.0 {
                        let delta = (distance / self.touch_distance).powf(self.config.zoom_speed);
                        changed |= self.track(camera, |c| c.dolly_in(delta));
                    }
                    self.touch_distance = distance;
                }
                if self.state == ControlState::TouchDollyPan && self.config.enable_pan {
                    let mid = midpoint(*a, *b);
                    let delta = mid - self.start;
                    self.start = mid;
                    changed |= self.track(camera, |c| c.pan_pixels(delta.x as f64, delta.y as f64));
                }
                ControlResponse::changed(changed)
            }
            _ => ControlResponse::default(),
        }
    }

    pub fn touch_end(&mut self) -> ControlResponse {
        self.state = ControlState::None;
        ControlResponse::default()
    }

    /// Ends any gesture and releases the capture.
    pub fn cancel(&mut self) {
        if self.capturing || self.state != ControlState::None {
            log::debug!("Cancelling gesture in state {:?}", self.state);
        }
        self.capturing = false;
        self.state = ControlState::None;
        self.clear_select_rect();
    }

    pub fn has_select_rect(&self) -> bool {
        self.click_point != self.up_point
    }

    /// Lasso rectangle in viewport pixels.
    pub fn select_rect(&self) -> Option<Rect> {
        self.has_select_rect()
            .then(|| Rect::from_two_pos(self.click_point, self.up_point))
    }

    /// Lasso rectangle mapped through the camera.
    pub fn select_world_rect(&self, camera: &Camera) -> Option<Bounds> {
        let rect = self.select_rect()?;
        let top_left = camera.screen_to_world(rect.left() as f64, rect.top() as f64);
        let bottom_right = camera.screen_to_world(rect.right() as f64, rect.bottom() as f64);
        Some(Bounds {
            left: top_left.x,
            right: bottom_right.x,
            top: top_left.y,
            bottom: bottom_right.y,
        })
    }

    pub fn clear_select_rect(&mut self) {
        self.click_point = Pos2::ZERO;
        self.up_point = Pos2::ZERO;
    }
}

fn midpoint(a: Pos2, b: Pos2) -> Pos2 {
    Pos2::new((a.x + b.x) / 2.0, (a.y + b.y) / 2.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ViewerOptions;
    use crate::geometry::WorldRect;
    use egui::pos2;

    fn camera() -> Camera {
        let mut camera = Camera::new(&ViewerOptions::default());
        camera.resize_to_fit(300.0, 300.0, Some(WorldRect::centered_square(300.0)));
        camera
    }

    fn controls() -> MapControls {
        MapControls::new(ControlsConfig {
            zoom_speed: 4.0,
            key_pan_speed: 10.0,
            ..ControlsConfig::map()
        })
    }

    #[test]
    fn test_lasso_ticks() {
        let mut cam = camera();
        let mut c = controls();
        let down = c.pointer_down(PointerButton::Primary, pos2(10.0, 10.0), Modifiers::NONE);
        assert_eq!(down.selecting, Some(false));
        assert_eq!(c.state(), ControlState::Select);
        assert!(!c.has_select_rect());

        let moved = c.pointer_move(&mut cam, pos2(60.0, 40.0));
        assert_eq!(moved.selecting, Some(false));
        let rect = c.select_rect().expect("rect while dragging");
        assert_eq!(rect, Rect::from_min_max(pos2(10.0, 10.0), pos2(60.0, 40.0)));

        let up = c.pointer_up(pos2(80.0, 50.0));
        assert_eq!(up.selecting, Some(true));
        assert_eq!(c.state(), ControlState::None);
        assert!(!c.is_capturing());
    }

    #[test]
    fn test_select_disabled_pans() {
        let mut cam = camera();
        cam.set_zoom(4.0);
        let mut c = controls();
        c.set_enable_select(false);
        c.pointer_down(PointerButton::Primary, pos2(100.0, 100.0), Modifiers::NONE);
        assert_eq!(c.state(), ControlState::Pan);
        let moved = c.pointer_move(&mut cam, pos2(120.0, 100.0));
        assert!(moved.changed);
        assert!(cam.target().x < 0.0);
    }

    #[test]
    fn test_moves_without_capture_are_ignored() {
        let mut cam = camera();
        let mut c = controls();
        assert_eq!(c.pointer_move(&mut cam, pos2(5.0, 5.0)), ControlResponse::default());
    }

    #[test]
    fn test_orbit_preset_rotation_ignored() {
        let mut c = MapControls::new(ControlsConfig::orbit());
        c.pointer_down(PointerButton::Primary, pos2(0.0, 0.0), Modifiers::NONE);
        assert_eq!(c.state(), ControlState::None);
        assert!(!c.is_capturing());
        c.pointer_down(PointerButton::Primary, pos2(0.0, 0.0), Modifiers::SHIFT);
        assert_eq!(c.state(), ControlState::Pan);
    }

    #[test]
    fn test_wheel_ignored_during_drag() {
        let mut cam = camera();
        let mut c = controls();
        c.pointer_down(PointerButton::Secondary, pos2(0.0, 0.0), Modifiers::NONE);
        assert!(!c.wheel(&mut cam, pos2(150.0, 150.0), -1.0).changed);
        c.pointer_up(pos2(0.0, 0.0));
        assert!(c.wheel(&mut cam, pos2(150.0, 150.0), -1.0).changed);
        assert!((cam.zoom() - 1.0 / ZOOM_STEP.powf(4.0)).abs() < 1e-9);
    }

    #[test]
    fn test_keys() {
        let mut cam = camera();
        let mut c = controls();
        assert!(c.key_down(&mut cam, ControlKey::ZoomIn).changed);
        let zoomed = cam.zoom();
        assert!(zoomed > 1.0);
        assert!(c.key_down(&mut cam, ControlKey::Up).changed);
        assert!(cam.target().y > 0.0);
        c.key_down(&mut cam, ControlKey::ResetZoom);
        assert_eq!(cam.zoom(), 1.0);
        // zoom out at the lower limit changes nothing
        assert!(!c.key_down(&mut cam, ControlKey::ZoomOut).changed);
    }

    #[test]
    fn test_pinch_zoom() {
        let mut cam = camera();
        let mut c = controls();
        c.touch_start(&[pos2(100.0, 150.0), pos2(200.0, 150.0)]);
        assert_eq!(c.state(), ControlState::TouchDollyRotate);
        let r = c.touch_move(&mut cam, &[pos2(50.0, 150.0), pos2(250.0, 150.0)]);
        assert!(r.changed);
        assert!((cam.zoom() - 2f64.powf(4.0)).abs() < 1e-9);
        c.touch_end();
        assert_eq!(c.state(), ControlState::None);
    }

    #[test]
    fn test_camera_change_clears_lasso() {
        let mut cam = camera();
        let mut c = controls();
        c.pointer_down(PointerButton::Primary, pos2(10.0, 10.0), Modifiers::NONE);
        c.pointer_move(&mut cam, pos2(50.0, 50.0));
        assert!(c.has_select_rect());
        assert!(c.key_down(&mut cam, ControlKey::ZoomIn).changed);
        assert!(!c.has_select_rect());
    }

    #[test]
    fn test_cancel_releases_capture() {
        let mut cam = camera();
        let mut c = controls();
        c.pointer_down(PointerButton::Primary, pos2(10.0, 10.0), Modifiers::NONE);
        c.pointer_move(&mut cam, pos2(50.0, 50.0));
        c.cancel();
        assert!(!c.has_select_rect());
        assert!(!c.is_capturing());
        assert_eq!(c.state(), ControlState::None);
        assert_eq!(c.pointer_up(pos2(60.0, 60.0)).selecting, None);
    }

    #[test]
    fn test_select_world_rect() {
        let cam = camera();
        let mut c = controls();
        c.pointer_down(PointerButton::Primary, pos2(75.0, 75.0), Modifiers::NONE);
        c.pointer_move(&mut cam.clone(), pos2(225.0, 225.0));
        let world = c.select_world_rect(&cam).expect("world rect");
        assert!((world.left + 75.0).abs() < 1e-9);
        assert!((world.right - 75.0).abs() < 1e-9);
        assert!((world.top - 75.0).abs() < 1e-9);
        assert!((world.bottom + 75.0).abs() < 1e-9);
    }
}
