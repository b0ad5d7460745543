// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Huang Rui <vowstar@gmail.com>

//! Orthographic 2D camera.
//!
//! The camera keeps an un-zoomed frustum (`left`, `right`, `top`, `bottom`)
//! letterboxed around the work area, a zoom factor and a pan target. The
//! visible world rectangle is `frustum / zoom + target`.
//!
//! Screen coordinates are logical pixels relative to the viewport, origin at
//! the top-left corner with Y pointing down. World coordinates have Y up.

use crate::config::ViewerOptions;
use crate::geometry::{Bounds, WorldPoint, WorldRect};

/// Axis selector for scrolling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    frustum: Bounds,
    zoom: f64,
    target: WorldPoint,
    viewport: (f64, f64),
    work_area: Option<WorldRect>,
    min_zoom: f64,
    max_zoom: f64,
}

impl Camera {
    pub fn new(options: &ViewerOptions) -> Self {
        Self {
            frustum: Bounds::ZERO,
            zoom: options.clamp_zoom(1.0),
            target: WorldPoint::ZERO,
            viewport: (0.0, 0.0),
            work_area: None,
            min_zoom: options.min_zoom,
            max_zoom: options.max_zoom,
        }
    }

    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    pub fn target(&self) -> WorldPoint {
        self.target
    }

    /// Un-zoomed frustum edges.
    pub fn frustum(&self) -> Bounds {
        self.frustum
    }

    pub fn viewport_size(&self) -> (f64, f64) {
        self.viewport
    }

    pub fn work_area(&self) -> Option<WorldRect> {
        self.work_area
    }

    fn has_area(&self) -> bool {
        self.viewport.0 > 0.0
            && self.viewport.1 > 0.0
            && self.frustum.width() > 0.0
            && self.frustum.height() > 0.0
    }

    pub fn set_zoom_limits(&mut self, min_zoom: f64, max_zoom: f64) {
        self.min_zoom = min_zoom;
        self.max_zoom = max_zoom;
        self.set_zoom(self.zoom);
    }

    fn clamp_zoom(&self, zoom: f64) -> f64 {
        zoom.max(self.min_zoom).min(self.max_zoom)
    }

    /// Replaces the work area and refits the frustum to the current viewport.
    pub fn set_work_area(&mut self, work_area: Option<WorldRect>) {
        let (w, h) = self.viewport;
        self.resize_to_fit(w, h, work_area);
    }

    /// Viewport size changed; refits with the current work area.
    pub fn resize(&mut self, width: f64, height: f64) {
        self.resize_to_fit(width, height, self.work_area);
    }

    /// Letterboxes `world_rect` into a `width` x `height` viewport.
    ///
    /// The narrower axis is widened symmetrically so the whole rectangle is
    /// visible without distortion. Any zero or negative extent collapses the
    /// frustum to all zeros.
    pub fn resize_to_fit(&mut self, width: f64, height: f64, world_rect: Option<WorldRect>) {
        self.viewport = (width.max(0.0), height.max(0.0));
        self.work_area = world_rect;

        let area = world_rect.map(|r| r.bounds()).unwrap_or(Bounds::ZERO);
        let (w, h) = (area.width(), area.height());
        if !(w > 0.0 && h > 0.0 && width > 0.0 && height > 0.0) {
            if world_rect.is_some() {
                log::debug!("Zero-area viewport {width}x{height} or work area {w}x{h}");
            }
            self.frustum = Bounds::ZERO;
            return;
        }

        let sw = width / w;
        let sh = height / h;
        let ex = if sw > sh { w * (sw / sh - 1.0) / 2.0 } else { 0.0 };
        let ey = if sw < sh { h * (sh / sw - 1.0) / 2.0 } else { 0.0 };
        self.frustum = Bounds {
            left: area.left - ex,
            right: area.right + ex,
            bottom: area.bottom - ey,
            top: area.top + ey,
        };
        self.limit_offset();
    }

    /// Maps a viewport pixel to world coordinates.
    pub fn screen_to_world(&self, sx: f64, sy: f64) -> WorldPoint {
        let (w, h) = self.viewport;
        if w <= 0.0 || h <= 0.0 {
            return self.target;
        }
        let f = &self.frustum;
        WorldPoint::new(
            (f.left + sx / w * f.width()) / self.zoom + self.target.x,
            (f.bottom + (h - sy) / h * f.height()) / self.zoom + self.target.y,
        )
    }

    /// Inverse of [`Camera::screen_to_world`].
    pub fn world_to_screen(&self, x: f64, y: f64) -> (f64, f64) {
        if !self.has_area() {
            return (0.0, 0.0);
        }
        let (w, h) = self.viewport;
        let f = &self.frustum;
        let sx = ((x - self.target.x) * self.zoom - f.left) / f.width() * w;
        let sy = h - ((y - self.target.y) * self.zoom - f.bottom) / f.height() * h;
        (sx, sy)
    }

    /// World rectangle currently visible.
    pub fn visible_bounds(&self) -> Bounds {
        let f = &self.frustum;
        Bounds {
            left: f.left / self.zoom + self.target.x,
            right: f.right / self.zoom + self.target.x,
            top: f.top / self.zoom + self.target.y,
            bottom: f.bottom / self.zoom + self.target.y,
        }
    }

    /// Viewport size in world units.
    pub fn viewport_area(&self) -> (f64, f64) {
        (
            self.frustum.width() / self.zoom,
            self.frustum.height() / self.zoom,
        )
    }

    /// World coordinates of the viewport center.
    pub fn viewport_position(&self) -> WorldPoint {
        self.visible_bounds().center()
    }

    pub fn set_zoom(&mut self, zoom: f64) {
        self.zoom = self.clamp_zoom(zoom);
        self.limit_offset();
    }

    /// Multiplies the zoom by `scale` (zooms out for `scale < 1`).
    pub fn dolly_in(&mut self, scale: f64) {
        self.set_zoom(self.zoom * scale);
    }

    /// Divides the zoom by `scale` (zooms in for `scale < 1`).
    pub fn dolly_out(&mut self, scale: f64) {
        self.set_zoom(self.zoom / scale);
    }

    /// Multiplies the zoom by `factor` keeping the world point under the
    /// given pixel fixed.
    pub fn zoom_about(&mut self, sx: f64, sy: f64, factor: f64) {
        let before = self.screen_to_world(sx, sy);
        self.zoom = self.clamp_zoom(self.zoom * factor);
        let after = self.screen_to_world(sx, sy);
        self.target.x += before.x - after.x;
        self.target.y += before.y - after.y;
        self.limit_offset();
    }

    /// Zooms so the screen rectangle fills the viewport and centers on it.
    ///
    /// Edges are viewport pixels, `top < bottom`. Degenerate rectangles are
    /// ignored, as is a request that leaves the clamped zoom unchanged.
    pub fn zoom_to_rect(&mut self, left: f64, right: f64, top: f64, bottom: f64) {
        let w = right - left;
        let h = bottom - top;
        let (vw, vh) = self.viewport;
        if !(w > 0.0 && h > 0.0) || vw <= 0.0 || vh <= 0.0 {
            return;
        }
        let scale = (vw / w).min(vh / h);
        let zoom = self.clamp_zoom(self.zoom * scale);
        if zoom == self.zoom {
            return;
        }
        let new_center = self.screen_to_world((left + right) / 2.0, (top + bottom) / 2.0);
        self.zoom = zoom;
        let center = self.screen_to_world(vw / 2.0, vh / 2.0);
        self.target.x += new_center.x - center.x;
        self.target.y += new_center.y - center.y;
        self.limit_offset();
    }

    /// Moves the pan target by a world-space delta.
    pub fn pan_by(&mut self, dx: f64, dy: f64) {
        self.target.x += dx;
        self.target.y += dy;
        self.limit_offset();
    }

    pub fn pan_to(&mut self, x: f64, y: f64) {
        self.target = WorldPoint::new(x, y);
        self.limit_offset();
    }

    /// Pans by a screen delta (right and down positive) so the content
    /// follows the pointer.
    pub fn pan_pixels(&mut self, dx: f64, dy: f64) {
        let (w, h) = self.viewport;
        if w <= 0.0 || h <= 0.0 {
            return;
        }
        self.pan_by(
            -dx * self.frustum.width() / self.zoom / w,
            dy * self.frustum.height() / self.zoom / h,
        );
    }

    /// Centers the viewport on `position` along one axis.
    pub fn scroll_to(&mut self, axis: Axis, position: f64) {
        let current = self.viewport_position();
        match axis {
            Axis::X => self.pan_by(position - current.x, 0.0),
            Axis::Y => self.pan_by(0.0, position - current.y),
        }
    }

    /// Zoom 1 (clamped) with the pan target back at the origin.
    pub fn reset_zoom(&mut self) {
        self.zoom = self.clamp_zoom(1.0);
        self.target = WorldPoint::ZERO;
        self.limit_offset();
    }

    /// Clamps the pan target to the work area.
    ///
    /// Per axis: when the visible extent is smaller than the work area the
    /// visible edges are pushed back inside it, otherwise the pan is reset
    /// to zero. Without a work area nothing is clamped.
    pub fn limit_offset(&mut self) {
        let Some(area) = self.work_area.map(|r| r.bounds()) else {
            return;
        };
        let f = self.frustum;
        let z = self.zoom;
        self.target.x = limit_axis(self.target.x, f.left / z, f.right / z, area.left, area.right);
        self.target.y = limit_axis(self.target.y, f.bottom / z, f.top / z, area.bottom, area.top);
    }
}

fn limit_axis(offset: f64, low: f64, high: f64, area_low: f64, area_high: f64) -> f64 {
    if high - low < area_high - area_low {
        if low + offset < area_low {
            offset + area_low - (low + offset)
        } else if high + offset > area_high {
            offset - (high + offset - area_high)
        } else {
            offset
        }
    } else {
        0.0
    }
}
