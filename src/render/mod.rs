// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Huang Rui <vowstar@gmail.com>

//! Renderer abstraction and the egui backend.

pub mod egui;

use crate::camera::Camera;
use crate::geometry::Bounds;
use crate::scene::Scene;

pub use self::egui::{show, EguiRenderer};

/// Everything a renderer needs to draw one frame.
pub struct Frame<'a> {
    pub scene: &'a Scene,
    pub camera: &'a Camera,
    /// Lasso rectangle in viewport pixels.
    pub select_rect: Option<::egui::Rect>,
    /// Lasso rectangle in world coordinates while a selection is in progress.
    pub selection: Option<Bounds>,
}

/// Draws the retained scene through a camera.
pub trait Renderer {
    fn render(&mut self, frame: &Frame<'_>);

    /// Releases backend resources. Called once on viewer teardown.
    fn dispose(&mut self) {}
}
