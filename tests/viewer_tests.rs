// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Huang Rui <vowstar@gmail.com>

mod common;

use std::cell::Cell;
use std::rc::Rc;

use egui::{pos2, Modifiers, PointerButton};
use wafermap_viewer::config::{Tool, ViewerOptions};
use wafermap_viewer::geometry::WorldRect;
use wafermap_viewer::viewer::{TwoDViewer, ViewerEvents};

use common::{assert_close, quad, Recorder, Repaints};

fn viewer() -> (TwoDViewer<Recorder>, ViewerEvents) {
    let (mut viewer, events) = TwoDViewer::new(ViewerOptions::default(), Recorder::default());
    viewer.resize(300.0, 300.0);
    viewer.set_work_area_rect(Some(WorldRect::centered_square(300.0)));
    (viewer, events)
}

fn lasso(viewer: &mut TwoDViewer<Recorder>, from: egui::Pos2, to: egui::Pos2) {
    viewer.pointer_down(PointerButton::Primary, from, Modifiers::NONE);
    viewer.pointer_move(to);
    viewer.pointer_up(to);
}

#[test]
fn test_renders_are_coalesced() {
    let (mut viewer, _events) = viewer();
    let requests = Rc::new(Cell::new(0));
    viewer.flush();
    viewer.set_repaint_signal(Box::new(Repaints(requests.clone())));

    for _ in 0..5 {
        viewer.wheel(pos2(150.0, 150.0), -1.0);
    }
    assert!(viewer.is_dirty());
    assert_eq!(requests.get(), 1);

    assert!(viewer.flush());
    assert!(!viewer.flush());
    assert_eq!(viewer.renderer().renders, 2);
}

#[test]
fn test_zoom_reported_once_per_change() {
    let (mut viewer, events) = viewer();
    viewer.flush();
    viewer.render();
    viewer.render();

    viewer.wheel(pos2(150.0, 150.0), -1.0);
    viewer.wheel(pos2(150.0, 150.0), -1.0);
    viewer.flush();

    let zooms: Vec<f64> = events.zoom.try_iter().collect();
    assert_eq!(zooms.len(), 2);
    assert_close(zooms[0], 1.0);
    assert_close(zooms[1], viewer.camera().zoom());
    assert!(zooms[1] > 1.0);
}

#[test]
fn test_wheel_keeps_world_point_under_cursor() {
    let (mut viewer, _events) = viewer();
    let before = viewer.camera().screen_to_world(100.0, 80.0);
    viewer.wheel(pos2(100.0, 80.0), -1.0);
    let after = viewer.camera().screen_to_world(100.0, 80.0);

    assert!(viewer.camera().zoom() > 1.0);
    assert_close(before.x, after.x);
    assert_close(before.y, after.y);
}

#[test]
fn test_lasso_zooms_to_selection() {
    let (mut viewer, events) = viewer();
    assert_eq!(viewer.tool(), Tool::Zoom);

    // top-left quadrant of the wafer
    lasso(&mut viewer, pos2(0.0, 0.0), pos2(150.0, 150.0));

    assert_close(viewer.camera().zoom(), 2.0);
    assert_close(viewer.camera().target().x, -75.0);
    assert_close(viewer.camera().target().y, 75.0);
    assert!(!viewer.selecting());
    assert_eq!(viewer.selection_world_rect(), None);

    let ticks: Vec<_> = events.selection.try_iter().collect();
    assert_eq!(ticks.len(), 3);
    assert_eq!(ticks[0].rect, None);
    assert!(!ticks[1].finished);
    assert!(ticks[2].finished);
    let rect = ticks[2].rect.expect("finished lasso carries its rectangle");
    assert_close(rect.x, -150.0);
    assert_close(rect.y, 0.0);
    assert_close(rect.width, 150.0);
    assert_close(rect.height, 150.0);
}

#[test]
fn test_centered_lasso_zooms_in_place() {
    let (mut viewer, _events) = viewer();
    lasso(&mut viewer, pos2(75.0, 75.0), pos2(225.0, 225.0));

    assert_close(viewer.camera().zoom(), 2.0);
    assert_close(viewer.camera().target().x, 0.0);
    assert_close(viewer.camera().target().y, 0.0);
    let (w, h) = viewer.viewport_area();
    assert_close(w, 150.0);
    assert_close(h, 150.0);
}

#[test]
fn test_release_outside_viewport_ends_gesture() {
    let (mut viewer, events) = viewer();
    viewer.set_tool(Tool::Select);
    viewer.pointer_down(PointerButton::Primary, pos2(100.0, 100.0), Modifiers::NONE);
    viewer.pointer_move(pos2(400.0, -50.0));
    assert!(viewer.is_capturing());

    viewer.pointer_up(pos2(500.0, -80.0));
    assert!(!viewer.is_capturing());
    let last = events.selection.try_iter().last().expect("selection ticks");
    assert!(last.finished);

    // moves after release no longer drive the lasso
    viewer.pointer_move(pos2(10.0, 10.0));
    assert!(!viewer.selecting());
}

#[test]
fn test_select_tool_keeps_camera() {
    let (mut viewer, events) = viewer();
    viewer.set_tool(Tool::Select);
    let camera = *viewer.camera();

    lasso(&mut viewer, pos2(10.0, 10.0), pos2(60.0, 40.0));

    assert_eq!(*viewer.camera(), camera);
    let last = events.selection.try_iter().last().expect("selection ticks");
    assert!(last.finished);
    assert!(last.rect.is_some());
}

#[test]
fn test_selection_visible_while_dragging() {
    let (mut viewer, _events) = viewer();
    viewer.pointer_down(PointerButton::Primary, pos2(0.0, 0.0), Modifiers::NONE);
    viewer.pointer_move(pos2(150.0, 150.0));
    assert!(viewer.selecting());
    viewer.flush();

    let selection = viewer.renderer().selection.expect("lasso in progress");
    assert_close(selection.left, -150.0);
    assert_close(selection.right, 0.0);
    assert_close(selection.bottom, 0.0);
    assert_close(selection.top, 150.0);
}

#[test]
fn test_no_tool_drag_pans() {
    let (mut viewer, events) = viewer();
    viewer.set_tool(Tool::None);
    viewer.wheel(pos2(150.0, 150.0), -1.0);
    let target = viewer.camera().target();

    lasso(&mut viewer, pos2(150.0, 150.0), pos2(170.0, 150.0));

    assert!(viewer.camera().target().x < target.x);
    assert_eq!(events.selection.try_iter().count(), 0);
}

#[test]
fn test_reconcile_same_objects_is_noop() {
    let (mut viewer, _events) = viewer();
    let a = quad("a");
    let b = quad("b");
    viewer.set_objects(vec![Some(a.clone()), Some(b.clone())]);
    viewer.flush();
    assert_eq!(viewer.renderer().children, ["a", "b"]);

    viewer.set_objects(vec![Some(a.clone()), None, Some(b.clone())]);
    assert!(!viewer.is_dirty());

    let c = quad("c");
    viewer.set_objects(vec![Some(a.clone()), Some(c.clone())]);
    assert!(viewer.is_dirty());
    viewer.flush();
    assert_eq!(viewer.renderer().children, ["a", "c"]);
    // the producer owns `b`
    assert!(!b.is_disposed());
}

#[test]
fn test_dispose_releases_everything_once() {
    let (mut viewer, _events) = viewer();
    let a = quad("a");
    viewer.set_objects(vec![Some(a.clone())]);
    viewer.pointer_down(PointerButton::Primary, pos2(5.0, 5.0), Modifiers::NONE);
    assert!(viewer.is_capturing());

    let released = viewer.dispose();
    assert_eq!(released.geometries, 1);
    assert!(a.is_disposed());
    assert!(!viewer.is_capturing());
    assert!(!viewer.is_dirty());
    assert!(viewer.renderer().disposed);

    assert!(viewer.dispose().is_empty());
    viewer.mark_dirty();
    assert!(!viewer.flush());
}

#[test]
fn test_zero_viewport_is_harmless() {
    let (mut viewer, _events) = TwoDViewer::new(ViewerOptions::default(), Recorder::default());
    viewer.set_work_area_rect(Some(WorldRect::centered_square(300.0)));
    viewer.wheel(pos2(0.0, 0.0), -1.0);
    viewer.flush();
    assert_eq!(viewer.viewport_area(), (0.0, 0.0));
}

#[test]
fn test_options_change_keeps_gesture() {
    let (mut viewer, events) = viewer();
    viewer.pointer_down(PointerButton::Primary, pos2(0.0, 0.0), Modifiers::NONE);
    viewer.pointer_move(pos2(150.0, 150.0));
    assert!(viewer.selecting());

    viewer.set_options(ViewerOptions {
        zoom_speed: 2.0,
        key_pan_speed: 25.0,
        ..ViewerOptions::default()
    });
    assert!(viewer.is_capturing());
    assert!(viewer.selecting());
    assert_eq!(viewer.controls().config().zoom_speed, 2.0);
    assert_eq!(viewer.controls().config().key_pan_speed, 25.0);

    viewer.pointer_up(pos2(150.0, 150.0));
    assert_close(viewer.camera().zoom(), 2.0);
    let last = events.selection.try_iter().last().expect("selection ticks");
    assert!(last.finished);
    assert!(last.rect.is_some());
}
