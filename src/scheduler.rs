// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Huang Rui <vowstar@gmail.com>

//! Redraw coalescing.
//!
//! Any number of [`RenderScheduler::mark_dirty`] calls between two frames
//! result in one render at the end of the next UI pass, and one repaint
//! request to wake the UI up.

/// Wakes the UI so a deferred render gets a chance to run.
pub trait RepaintSignal {
    fn request_repaint(&self);
}

impl RepaintSignal for egui::Context {
    fn request_repaint(&self) {
        egui::Context::request_repaint(self);
    }
}

#[derive(Default)]
pub struct RenderScheduler {
    pending: bool,
    last_zoom: Option<f64>,
    signal: Option<Box<dyn RepaintSignal>>,
}

impl RenderScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_signal(&mut self, signal: Box<dyn RepaintSignal>) {
        self.signal = Some(signal);
    }

    pub fn has_signal(&self) -> bool {
        self.signal.is_some()
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }

    /// Schedules a render unless one is already pending.
    ///
    /// Returns `true` when this call scheduled it.
    pub fn mark_dirty(&mut self) -> bool {
        if self.pending {
            log::trace!("Render already pending");
            return false;
        }
        self.pending = true;
        if let Some(signal) = &self.signal {
            signal.request_repaint();
        }
        true
    }

    /// Clears the pending flag after a render.
    pub fn rendered(&mut self) {
        self.pending = false;
    }

    /// Drops a pending render without running it.
    pub fn cancel(&mut self) {
        if self.pending {
            log::debug!("Pending render cancelled");
        }
        self.pending = false;
    }

    /// Returns `zoom` when it differs from the last reported value.
    pub fn observe_zoom(&mut self, zoom: f64) -> Option<f64> {
        if self.last_zoom == Some(zoom) {
            return None;
        }
        log::debug!("Zoom changed to {zoom}");
        self.last_zoom = Some(zoom);
        Some(zoom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    struct Counter(Rc<Cell<usize>>);

    impl RepaintSignal for Counter {
        fn request_repaint(&self) {
            self.0.set(self.0.get() + 1);
        }
    }

    #[test]
    fn test_coalescing() {
        let requests = Rc::new(Cell::new(0));
        let mut scheduler = RenderScheduler::new();
        scheduler.set_signal(Box::new(Counter(requests.clone())));

        assert!(scheduler.mark_dirty());
        for _ in 0..10 {
            assert!(!scheduler.mark_dirty());
        }
        assert_eq!(requests.get(), 1);

        scheduler.rendered();
        assert!(scheduler.mark_dirty());
        assert_eq!(requests.get(), 2);
    }

    #[test]
    fn test_zoom_reported_once_per_value() {
        let mut scheduler = RenderScheduler::new();
        assert_eq!(scheduler.observe_zoom(1.0), Some(1.0));
        assert_eq!(scheduler.observe_zoom(1.0), None);
        assert_eq!(scheduler.observe_zoom(2.0), Some(2.0));
        assert_eq!(scheduler.observe_zoom(1.0), Some(1.0));
    }

    #[test]
    fn test_cancel() {
        let mut scheduler = RenderScheduler::new();
        scheduler.mark_dirty();
        scheduler.cancel();
        assert!(!scheduler.is_pending());
    }
}
