// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Huang Rui <vowstar@gmail.com>

use std::rc::Rc;

use eframe::egui;
use serde::{Deserialize, Serialize};

use wafermap_viewer::camera::Axis;
use wafermap_viewer::controls::ControlKey;
use wafermap_viewer::config::{PointOptions, Theme, Tool, WaferOptions};
use wafermap_viewer::geometry::{
    generate_die_map, generate_grid_points, DiagonalGradient, DieGrid, DieMap, DieStyle,
};
use wafermap_viewer::render::{self, EguiRenderer};
use wafermap_viewer::wafer_map::{WaferMap, WaferMapEvent};

const APP_KEY: &str = "wafermap_viewer_settings";

/// Largest defect count exponent offered by the panel.
const MAX_DEFECT_EXPONENT: u32 = 7;

const POINT_SEED: u64 = 0x5eed;

/// Settings persisted between runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
struct Settings {
    diameter: f64,
    /// Defect count is `10^defect_exponent`.
    defect_exponent: u32,
    dot_size: f32,
    /// Additive half-transparent defects.
    density: bool,
    notch_angle: f64,
    checkerboard: bool,
    tool: Tool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            diameter: 300.0,
            defect_exponent: 2,
            dot_size: 3.0,
            density: false,
            notch_angle: 0.0,
            checkerboard: false,
            tool: Tool::default(),
        }
    }
}

impl Settings {
    fn defect_count(&self) -> usize {
        10usize.pow(self.defect_exponent.min(MAX_DEFECT_EXPONENT))
    }

    /// Grid shared by the die map and the defects placed on it.
    fn die_grid(&self) -> DieGrid {
        DieGrid {
            diameter: self.diameter,
            ..DieGrid::default()
        }
    }
}

pub struct WaferMapApp {
    settings: Settings,
    theme: Theme,
    map: WaferMap<EguiRenderer>,
    /// Settings the current die map and point cloud were generated from.
    generated: Option<Settings>,
    zoom: f64,
    selection: Option<String>,
}

impl WaferMapApp {
    pub fn new(cc: &eframe::CreationContext<'_>) -> Self {
        let settings: Settings = cc
            .storage
            .and_then(|storage| eframe::get_value(storage, APP_KEY))
            .unwrap_or_default();
        let theme = Theme::default();
        let map = WaferMap::new(WaferOptions::default(), EguiRenderer::new());

        let mut app = Self {
            settings,
            theme,
            map,
            generated: None,
            zoom: 1.0,
            selection: None,
        };
        app.apply_settings();
        app
    }

    /// Pushes the panel settings into the wafer map, regenerating data only
    /// when its inputs changed.
    fn apply_settings(&mut self) {
        let s = self.settings.clone();
        self.map.set_wafer_options(WaferOptions {
            diameter: s.diameter,
            notch_angle: s.notch_angle,
            fill: self.theme.wafer,
            perimeter: self.theme.perimeter,
            background: self.theme.background,
            ..self.map.wafer_options().clone()
        });
        self.map.set_point_options(PointOptions {
            point_size: s.dot_size,
            alpha_blending: s.density,
            ..self.map.point_options().clone()
        });
        self.map.set_tool(s.tool);

        let previous = self.generated.as_ref();
        let dies_stale = previous.map_or(true, |p| {
            p.diameter != s.diameter || p.checkerboard != s.checkerboard
        });
        let points_stale = previous.map_or(true, |p| {
            p.diameter != s.diameter || p.defect_exponent != s.defect_exponent
        });

        let grid = s.die_grid();
        if dies_stale {
            self.map.set_die_map(Some(Rc::new(self.die_map(&grid))));
        }
        if points_stale {
            let data = generate_grid_points(&grid, s.defect_count(), POINT_SEED);
            log::info!("Generated {} defects", data.len() / 3);
            self.map.set_points(Some(Rc::from(data)));
        }
        self.generated = Some(s);
    }

    fn die_map(&self, grid: &DieGrid) -> DieMap {
        let colors = DiagonalGradient::new(self.theme.ramp.clone());
        let style = DieStyle::from_theme(&self.theme, self.settings.checkerboard);
        generate_die_map(grid, &colors, &style)
    }

    fn handle_events(&mut self) {
        for event in self.map.poll() {
            match event {
                WaferMapEvent::Zoom(zoom) => self.zoom = zoom,
                WaferMapEvent::Selection(selection) if selection.finished => {
                    self.selection = selection.rect.map(|r| {
                        format!(
                            "({:.1}, {:.1}) {:.1} x {:.1}",
                            r.x, r.y, r.width, r.height
                        )
                    });
                }
                WaferMapEvent::Selection(_) => {}
            }
        }
    }

    fn render_left_panel(&mut self, ui: &mut egui::Ui) {
        let before = self.settings.clone();

        ui.vertical(|ui| {
            ui.heading("Wafer");
            ui.horizontal(|ui| {
                ui.label("Diameter:");
                ui.add(
                    egui::DragValue::new(&mut self.settings.diameter)
                        .range(10.0..=450.0)
                        .speed(1.0),
                );
            });
            ui.horizontal(|ui| {
                ui.label("Notch angle:");
                ui.add(egui::Slider::new(&mut self.settings.notch_angle, 0.0..=360.0).suffix("°"));
            });
            ui.checkbox(&mut self.settings.checkerboard, "Hatch every other die");

            ui.separator();
            ui.heading("Defects");
            ui.horizontal(|ui| {
                ui.label("Count: 10^");
                ui.add(egui::Slider::new(
                    &mut self.settings.defect_exponent,
                    0..=MAX_DEFECT_EXPONENT,
                ));
            });
            ui.horizontal(|ui| {
                ui.label("Dot size:");
                ui.add(egui::Slider::new(&mut self.settings.dot_size, 0.5..=10.0));
            });
            ui.checkbox(&mut self.settings.density, "Density");

            ui.separator();
            ui.heading("Tool");
            ui.radio_value(&mut self.settings.tool, Tool::None, "Pan");
            ui.radio_value(&mut self.settings.tool, Tool::Zoom, "Zoom to selection");
            ui.radio_value(&mut self.settings.tool, Tool::Select, "Select");

            ui.separator();
            ui.heading("View");
            ui.label(format!("Zoom: {:.2}x", self.zoom));
            let center = self.map.viewer().viewport_position();
            let (mut x, mut y) = (center.x, center.y);
            ui.horizontal(|ui| {
                ui.label("X:");
                if ui.add(egui::DragValue::new(&mut x).speed(1.0)).changed() {
                    self.map.viewer_mut().scroll_to(Axis::X, x);
                }
                ui.label("Y:");
                if ui.add(egui::DragValue::new(&mut y).speed(1.0)).changed() {
                    self.map.viewer_mut().scroll_to(Axis::Y, y);
                }
            });
            if ui.button("Reset View").clicked() {
                self.map.viewer_mut().key_down(ControlKey::ResetZoom);
            }

            if let Some(selection) = &self.selection {
                ui.separator();
                ui.label(format!("Selection: {selection}"));
            }
        });

        if self.settings != before {
            self.apply_settings();
        }
    }
}

impl eframe::App for WaferMapApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.handle_events();

        egui::SidePanel::left("left_panel")
            .resizable(true)
            .default_width(260.0)
            .show(ctx, |ui| {
                self.render_left_panel(ui);
            });

        egui::CentralPanel::default().show(ctx, |ui| {
            render::show(ui, self.map.viewer_mut());
        });
    }

    fn save(&mut self, storage: &mut dyn eframe::Storage) {
        eframe::set_value(storage, APP_KEY, &self.settings);
    }
}
