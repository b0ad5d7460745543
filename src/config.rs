// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Huang Rui <vowstar@gmail.com>

//! Option structs and the color theme.
//!
//! Every struct has a [`Default`] carrying the documented defaults, so a
//! missing value is never an error. All of them are serde-serializable so a
//! host can persist them.

use egui::Color32;
use serde::{Deserialize, Serialize};

/// Colors used by the wafer map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Theme {
    pub wafer: Color32,
    pub perimeter: Color32,
    pub die: Color32,
    pub hatch: Color32,
    /// Points drawn outside an active selection test with attribute 0.
    pub defect_normal: Color32,
    /// Points inside the selection rectangle.
    pub defect_active: Color32,
    pub defect_inactive: Color32,
    pub background: Color32,
    /// Stops of the die color ramp, low to high.
    pub ramp: Vec<Color32>,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            wafer: Color32::from_rgb(0x00, 0x00, 0x00),
            perimeter: Color32::from_rgb(0x40, 0x40, 0x40),
            die: Color32::from_rgb(0x18, 0x18, 0x18),
            hatch: Color32::from_rgb(0x40, 0x41, 0x42),
            defect_normal: Color32::from_rgb(0xf0, 0xf0, 0xf0),
            defect_active: Color32::from_rgb(0x65, 0xff, 0xff),
            defect_inactive: Color32::from_rgb(0x65, 0x65, 0x65),
            background: Color32::from_rgb(0x1e, 0x1e, 0x1e),
            // coarse turbo colormap
            ramp: vec![
                Color32::from_rgb(0x30, 0x12, 0x3b),
                Color32::from_rgb(0x46, 0x6b, 0xe3),
                Color32::from_rgb(0x28, 0xbb, 0xec),
                Color32::from_rgb(0x32, 0xf1, 0x97),
                Color32::from_rgb(0xa4, 0xfc, 0x3c),
                Color32::from_rgb(0xee, 0xcf, 0x3a),
                Color32::from_rgb(0xfb, 0x80, 0x22),
                Color32::from_rgb(0xd2, 0x30, 0x05),
                Color32::from_rgb(0x7a, 0x04, 0x03),
            ],
        }
    }
}

/// What a primary-button drag does in the viewer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Tool {
    /// Drag pans.
    None,
    /// Drag lasso-selects, then zooms to the selection.
    #[default]
    Zoom,
    /// Drag lasso-selects.
    Select,
}

impl Tool {
    pub fn selects(self) -> bool {
        self != Tool::None
    }
}

/// Viewer behaviour. Zoom 1 means the work area fits the viewport.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerOptions {
    pub min_zoom: f64,
    pub max_zoom: f64,
    /// Exponent applied to the per-notch wheel zoom factor.
    pub zoom_speed: f64,
    /// Pixels moved per arrow key press.
    pub key_pan_speed: f64,
    pub background: Color32,
}

impl Default for ViewerOptions {
    fn default() -> Self {
        Self {
            min_zoom: 1.0,
            max_zoom: 1e8,
            zoom_speed: 4.0,
            key_pan_speed: 10.0,
            background: Color32::BLACK,
        }
    }
}

impl ViewerOptions {
    /// Clamps `zoom` into `[min_zoom, max_zoom]`.
    ///
    /// Inverted limits are tolerated; `max_zoom` wins.
    pub fn clamp_zoom(&self, zoom: f64) -> f64 {
        zoom.max(self.min_zoom).min(self.max_zoom)
    }
}

/// Wafer outline and the viewer settings the wafer map host forwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WaferOptions {
    pub diameter: f64,
    pub notch_size: f64,
    /// Degrees; 0 puts the notch at the bottom.
    pub notch_angle: f64,
    pub fill: Color32,
    pub perimeter: Color32,
    pub background: Color32,
    pub min_zoom: f64,
    pub max_zoom: f64,
    pub zoom_speed: f64,
}

impl Default for WaferOptions {
    fn default() -> Self {
        let theme = Theme::default();
        let viewer = ViewerOptions::default();
        Self {
            diameter: 300.0,
            notch_size: 3.0,
            notch_angle: 0.0,
            fill: theme.wafer,
            perimeter: theme.perimeter,
            background: theme.background,
            min_zoom: viewer.min_zoom,
            max_zoom: viewer.max_zoom,
            zoom_speed: viewer.zoom_speed,
        }
    }
}

impl WaferOptions {
    pub fn viewer_options(&self) -> ViewerOptions {
        ViewerOptions {
            min_zoom: self.min_zoom,
            max_zoom: self.max_zoom,
            zoom_speed: self.zoom_speed,
            background: self.background,
            ..ViewerOptions::default()
        }
    }
}

/// Point cloud appearance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PointOptions {
    /// Size in logical pixels.
    pub point_size: f32,
    /// Color per attribute value. Empty means a single default color.
    pub palette: Vec<Color32>,
    /// Color of points inside the selection rectangle.
    pub selected: Color32,
    /// Draw points half transparent and additive to show density.
    pub alpha_blending: bool,
}

impl Default for PointOptions {
    fn default() -> Self {
        let theme = Theme::default();
        Self {
            point_size: 3.0,
            palette: vec![
                theme.defect_inactive,
                Color32::from_rgb(0xff, 0x00, 0x00),
                Color32::from_rgb(0x00, 0xff, 0x40),
            ],
            selected: theme.defect_active,
            alpha_blending: false,
        }
    }
}

impl PointOptions {
    /// Palette with the empty case replaced by the default point color.
    pub fn palette(&self) -> Vec<Color32> {
        if self.palette.is_empty() {
            vec![Theme::default().defect_normal]
        } else {
            self.palette.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zoom_clamp() {
        let options = ViewerOptions::default();
        assert_eq!(options.clamp_zoom(0.5), 1.0);
        assert_eq!(options.clamp_zoom(1e9), 1e8);
        assert_eq!(options.clamp_zoom(3.0), 3.0);
    }

    #[test]
    fn test_empty_palette_falls_back() {
        let options = PointOptions {
            palette: Vec::new(),
            ..PointOptions::default()
        };
        assert_eq!(options.palette(), vec![Theme::default().defect_normal]);
    }

    #[test]
    fn test_wafer_options_forward_zoom_limits() {
        let wafer = WaferOptions {
            min_zoom: 0.5,
            zoom_speed: 2.0,
            ..WaferOptions::default()
        };
        let viewer = wafer.viewer_options();
        assert_eq!(viewer.min_zoom, 0.5);
        assert_eq!(viewer.zoom_speed, 2.0);
        assert_eq!(viewer.background, wafer.background);
    }
}
