// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Huang Rui <vowstar@gmail.com>

//! Wafer Map Viewer Library
//!
//! An interactive 2D wafer map: a wafer outline with its orientation notch, a
//! grid of dies and a cloud of defect points, shown in a pannable, zoomable
//! viewer with lasso selection. Rendering goes through egui.

pub mod camera;
pub mod config;
pub mod controls;
pub mod geometry;
pub mod render;
pub mod scene;
pub mod scheduler;
pub mod viewer;
pub mod wafer_map;

// Re-export commonly used types
pub use camera::{Axis, Camera};
pub use config::{PointOptions, Theme, Tool, ViewerOptions, WaferOptions};
pub use controls::{ControlsConfig, MapControls};
pub use geometry::{Bounds, DieMap, WorldPoint, WorldRect};
pub use render::{EguiRenderer, Frame, Renderer};
pub use scene::{Drawable, Released};
pub use viewer::{SelectionEvent, TwoDViewer, ViewerEvents};
pub use wafer_map::{WaferMap, WaferMapEvent};
