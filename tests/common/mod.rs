// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Huang Rui <vowstar@gmail.com>

#![allow(dead_code)]

use std::cell::Cell;
use std::rc::Rc;

use egui::Color32;
use wafermap_viewer::geometry::Bounds;
use wafermap_viewer::render::{Frame, Renderer};
use wafermap_viewer::scene::{Drawable, Geometry, Material, Object, Quad};
use wafermap_viewer::scheduler::RepaintSignal;

/// Renderer that remembers what it was asked to draw.
#[derive(Default)]
pub struct Recorder {
    pub renders: usize,
    pub children: Vec<String>,
    pub selection: Option<Bounds>,
    pub disposed: bool,
}

impl Renderer for Recorder {
    fn render(&mut self, frame: &Frame<'_>) {
        self.renders += 1;
        self.children = frame
            .scene
            .children()
            .iter()
            .map(|c| c.name().to_string())
            .collect();
        self.selection = frame.selection;
    }

    fn dispose(&mut self) {
        self.disposed = true;
    }
}

/// Counts repaint requests.
pub struct Repaints(pub Rc<Cell<usize>>);

impl RepaintSignal for Repaints {
    fn request_repaint(&self) {
        self.0.set(self.0.get() + 1);
    }
}

pub fn quad(name: &str) -> Drawable {
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

pub fn assert_close(a: f64, b: f64) {
    assert!((a - b).abs() < 1e-9, "{a} != {b}");
}
