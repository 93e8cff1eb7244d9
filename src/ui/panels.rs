use egui::{Color32, Context, RichText, ScrollArea, Ui};
use glam::Vec3;

use crate::renderer::{CameraMode, Light, RenderMode};
use crate::terrain::TERRAIN_PRESETS;
use crate::ui::state::UiState;
use crate::ui::theme::*;

#[derive(Default)]
pub struct UiActions {
    pub set_vsync: Option<bool>,
    pub set_camera_mode: Option<CameraMode>,
    pub reset_camera: bool,
}

/// Numbers shown in the statistics block.
#[derive(Clone, Copy, Debug, Default)]
pub struct FrameStats {
    pub fps: f32,
    pub vertex_count: u32,
    pub ready: bool,
    pub lights_uploaded: usize,
    pub light_limit: usize,
    pub height_range: Option<(f32, f32)>,
}

pub fn draw_side_panel(ctx: &Context, state: &mut UiState, stats: &FrameStats, last_error: Option<&str>) -> UiActions {
    let mut actions = UiActions::default();

    egui::SidePanel::right("terrain_panel")
        .min_width(300.0)
        .max_width(400.0)
        .default_width(320.0)
        .frame(egui::Frame::default().fill(BG_PANEL).inner_margin(14.0))
        .show(ctx, |ui| {
            ScrollArea::vertical().show(ui, |ui| {
                ui.heading(RichText::new("Terrain 3D").strong());
                ui.label(RichText::new("Procedural heightfield").color(TEXT_MUTED).size(11.0));
                ui.add_space(14.0);

                section_header(ui, "PRESET");
                let selected = state
                    .selected_preset
                    .and_then(|i| TERRAIN_PRESETS.get(i))
                    .map_or("Custom", |p| p.name);
                let mut picked = None;
                egui::ComboBox::from_id_salt("terrain_presets")
                    .selected_text(selected)
                    .width(ui.available_width())
                    .show_ui(ui, |ui| {
                        for (i, preset) in TERRAIN_PRESETS.iter().enumerate() {
                            if ui
                                .selectable_label(state.selected_preset == Some(i), preset.name)
                                .on_hover_text(preset.description)
                                .clicked()
                            {
                                picked = Some(i);
                            }
                        }
                    });
                if let Some(i) = picked {
                    state.apply_preset(i);
                }
                ui.add_space(12.0);

                section_header(ui, "PARAMETERS");
                if parameter_sliders(ui, state) {
                    state.selected_preset = None;
                }
                ui.add_space(8.0);

                let (text, fill, color) = if state.regenerate_pending() {
                    ("Generating...", BG_WIDGET, ACCENT_MOSS)
                } else {
                    ("Regenerate", ACCENT_MOSS, BG_DEEP)
                };
                let button = egui::Button::new(RichText::new(text).color(color))
                    .fill(fill)
                    .min_size(egui::vec2(ui.available_width(), 30.0));
                if ui.add(button).clicked() {
                    state.request_regenerate();
                }
                if let Some(err) = last_error {
                    ui.add_space(6.0);
                    error_box(ui, err);
                }
                ui.add_space(14.0);
                ui.separator();
                ui.add_space(10.0);

                section_header(ui, "RENDER");
                ui.horizontal(|ui| {
                    for mode in RenderMode::ALL {
                        ui.selectable_value(&mut state.render_mode, mode, mode.label());
                    }
                });
                ui.horizontal(|ui| {
                    if ui.checkbox(&mut state.vsync_enabled, "VSync").changed() {
                        actions.set_vsync = Some(state.vsync_enabled);
                    }
                    ui.checkbox(&mut state.show_markers, "Markers");
                    ui.checkbox(&mut state.show_stats, "Stats");
                });
                ui.horizontal(|ui| {
                    ui.label("Camera:");
                    for (mode, label) in [(CameraMode::Free, "Free"), (CameraMode::Orbital, "Orbital")] {
                        if ui.selectable_value(&mut state.camera_mode, mode, label).clicked() {
                            actions.set_camera_mode = Some(mode);
                        }
                    }
                    if ui.button("Reset").clicked() {
                        actions.reset_camera = true;
                    }
                });
                ui.add_space(14.0);

                section_header(ui, "LIGHTS");
                light_editor(ui, &mut state.lights, stats.light_limit);
                ui.add_space(14.0);

                if state.show_stats {
                    ui.separator();
                    ui.add_space(10.0);
                    stats_panel(ui, stats);
                }
            });
        });

    actions
}

fn section_header(ui: &mut Ui, text: &str) {
    ui.label(RichText::new(text).color(TEXT_MUTED).size(11.0).strong());
    ui.add_space(4.0);
}

/// Returns true if any value was edited.
fn parameter_sliders(ui: &mut Ui, state: &mut UiState) -> bool {
    let p = &mut state.params;
    let mut changed = false;

    egui::Grid::new("terrain_params")
        .num_columns(2)
        .spacing([10.0, 6.0])
        .show(ui, |ui| {
            ui.label("Width");
            changed |= ui.add(egui::Slider::new(&mut p.width, 2..=1024)).changed();
            ui.end_row();

            ui.label("Depth");
            changed |= ui.add(egui::Slider::new(&mut p.height, 2..=1024)).changed();
            ui.end_row();

            ui.label("Scale");
            changed |= ui
                .add(egui::Slider::new(&mut p.scale, 0.05..=10.0).logarithmic(true))
                .changed();
            ui.end_row();

            ui.label("Frequency");
            changed |= ui
                .add(egui::Slider::new(&mut p.frequency, 0.0..=2.0).step_by(0.005))
                .changed();
            ui.end_row();

            ui.label("Amplitude");
            changed |= ui.add(egui::Slider::new(&mut p.amplitude, -50.0..=50.0)).changed();
            ui.end_row();
        });

    ui.label(
        RichText::new(format!("{} vertices", fmt_num(p.expected_vertex_count())))
            .color(TEXT_MUTED)
            .size(11.0),
    );
    changed
}

fn light_editor(ui: &mut Ui, lights: &mut Vec<Light>, limit: usize) {
    let mut remove = None;

    for (i, light) in lights.iter_mut().enumerate() {
        ui.horizontal(|ui| {
            let lit = i < limit;
            let label = RichText::new(format!("#{i}")).color(if lit { TEXT_PRIMARY } else { TEXT_MUTED });
            ui.label(label);

            let mut color = light.color.to_array();
            if ui.color_edit_button_rgb(&mut color).changed() {
                light.color = Vec3::from_array(color);
            }
            ui.add(egui::DragValue::new(&mut light.position.x).speed(0.1).prefix("x "));
            ui.add(egui::DragValue::new(&mut light.position.y).speed(0.1).prefix("y "));
            ui.add(egui::DragValue::new(&mut light.position.z).speed(0.1).prefix("z "));

            if ui.small_button("x").clicked() {
                remove = Some(i);
            }
        });
    }

    if let Some(i) = remove {
        lights.remove(i);
    }

    ui.horizontal(|ui| {
        if ui.button("Add light").clicked() {
            lights.push(Light::default());
        }
        if lights.len() > limit {
            ui.label(
                RichText::new(format!("only the first {limit} are lit"))
                    .color(ACCENT_SAND)
                    .size(11.0),
            );
        }
    });
}

fn stats_panel(ui: &mut Ui, stats: &FrameStats) {
    section_header(ui, "STATISTICS");
    egui::Frame::default()
        .fill(BG_WIDGET)
        .stroke(egui::Stroke::new(1.0, BORDER_SUBTLE))
        .rounding(4.0)
        .inner_margin(10.0)
        .show(ui, |ui| {
            ui.style_mut().override_font_id = Some(egui::FontId::new(11.0, egui::FontFamily::Monospace));

            let fps_color = if stats.fps >= 60.0 {
                ACCENT_MOSS
            } else if stats.fps >= 30.0 {
                ACCENT_SAND
            } else {
                ACCENT_RUST
            };

            egui::Grid::new("terrain_stats").num_columns(2).spacing([18.0, 4.0]).show(ui, |ui| {
                ui.label(RichText::new("FPS").color(TEXT_MUTED));
                ui.label(RichText::new(format!("{:.0}", stats.fps)).color(fps_color));
                ui.end_row();

                ui.label(RichText::new("Vertices").color(TEXT_MUTED));
                ui.label(fmt_num(stats.vertex_count as usize));
                ui.end_row();

                ui.label(RichText::new("Triangles").color(TEXT_MUTED));
                ui.label(fmt_num(stats.vertex_count as usize / 3));
                ui.end_row();

                ui.label(RichText::new("Lights").color(TEXT_MUTED));
                ui.label(format!("{}", stats.lights_uploaded));
                ui.end_row();

                if let Some((low, high)) = stats.height_range {
                    ui.label(RichText::new("Height").color(TEXT_MUTED));
                    ui.label(format!("{low:.2} .. {high:.2}"));
                    ui.end_row();
                }
            });

            ui.add_space(6.0);
            let (text, color) = if stats.ready {
                ("Ready", ACCENT_MOSS)
            } else {
                ("No terrain", ACCENT_RUST)
            };
            ui.horizontal(|ui| {
                ui.label(RichText::new("Status:").color(TEXT_MUTED));
                ui.label(RichText::new(text).color(color));
            });
        });
}

fn error_box(ui: &mut Ui, message: &str) {
    egui::Frame::default()
        .fill(Color32::from_rgb(42, 18, 14))
        .stroke(egui::Stroke::new(1.0, ACCENT_RUST))
        .rounding(4.0)
        .inner_margin(8.0)
        .show(ui, |ui| {
            ui.label(RichText::new(message).color(ACCENT_RUST).size(11.0));
        });
}

pub fn draw_help_overlay(ctx: &Context, pos: Vec3, speed: f32) {
    egui::Area::new(egui::Id::new("help_overlay"))
        .anchor(egui::Align2::LEFT_BOTTOM, egui::vec2(12.0, -12.0))
        .show(ctx, |ui| {
            egui::Frame::default()
                .fill(Color32::from_black_alpha(170))
                .rounding(4.0)
                .inner_margin(8.0)
                .show(ui, |ui| {
                    ui.style_mut().override_font_id = Some(egui::FontId::new(11.0, egui::FontFamily::Monospace));
                    ui.label(RichText::new("WASD move | Space/Shift up/down | RMB look | Scroll speed").color(TEXT_MUTED));
                    ui.label(
                        RichText::new(format!("pos ({:.1}, {:.1}, {:.1})  speed {:.0}", pos.x, pos.y, pos.z, speed))
                            .color(TEXT_MUTED),
                    );
                });
        });
}

fn fmt_num(n: usize) -> String {
    if n >= 1_000_000 {
        format!("{:.2}M", n as f64 / 1_000_000.0)
    } else if n >= 1_000 {
        format!("{:.1}K", n as f64 / 1_000.0)
    } else {
        n.to_string()
    }
}
