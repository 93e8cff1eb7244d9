use egui::{Color32, FontFamily, FontId, Rounding, Stroke, TextStyle, Visuals};

pub const BG_DEEP: Color32 = Color32::from_rgb(8, 10, 9);
pub const BG_PANEL: Color32 = Color32::from_rgb(14, 17, 15);
pub const BG_WIDGET: Color32 = Color32::from_rgb(26, 31, 27);
pub const BG_WIDGET_HOVER: Color32 = Color32::from_rgb(36, 44, 38);
pub const BG_WIDGET_ACTIVE: Color32 = Color32::from_rgb(48, 58, 50);

pub const TEXT_PRIMARY: Color32 = Color32::from_rgb(190, 196, 184);
pub const TEXT_MUTED: Color32 = Color32::from_rgb(116, 124, 112);
pub const TEXT_BRIGHT: Color32 = Color32::from_rgb(232, 236, 226);

pub const ACCENT_MOSS: Color32 = Color32::from_rgb(104, 160, 72);
pub const ACCENT_SAND: Color32 = Color32::from_rgb(206, 172, 104);
pub const ACCENT_RUST: Color32 = Color32::from_rgb(190, 82, 54);
pub const ACCENT_SKY: Color32 = Color32::from_rgb(92, 146, 196);

pub const BORDER_SUBTLE: Color32 = Color32::from_rgba_premultiplied(60, 72, 58, 90);

pub fn apply_theme(ctx: &egui::Context) {
    let mut visuals = Visuals::dark();
    visuals.override_text_color = Some(TEXT_PRIMARY);
    visuals.panel_fill = BG_PANEL;
    visuals.window_fill = BG_PANEL;
    visuals.window_stroke = Stroke::new(1.0, BORDER_SUBTLE);
    visuals.window_rounding = Rounding::same(6.0);
    visuals.extreme_bg_color = BG_DEEP;
    visuals.faint_bg_color = BG_WIDGET;
    visuals.hyperlink_color = ACCENT_SKY;
    visuals.warn_fg_color = ACCENT_SAND;
    visuals.error_fg_color = ACCENT_RUST;
    visuals.slider_trailing_fill = true;
    visuals.selection.bg_fill = ACCENT_MOSS.gamma_multiply(0.45);
    visuals.selection.stroke = Stroke::new(1.0, ACCENT_MOSS);

    let widgets = &mut visuals.widgets;
    for (state, fill, stroke, text) in [
        (&mut widgets.noninteractive, BG_PANEL, BORDER_SUBTLE, TEXT_MUTED),
        (&mut widgets.inactive, BG_WIDGET, BORDER_SUBTLE, TEXT_PRIMARY),
        (&mut widgets.hovered, BG_WIDGET_HOVER, ACCENT_MOSS, TEXT_BRIGHT),
        (&mut widgets.active, BG_WIDGET_ACTIVE, ACCENT_SAND, TEXT_BRIGHT),
        (&mut widgets.open, BG_WIDGET_ACTIVE, ACCENT_MOSS, TEXT_BRIGHT),
    ] {
        state.bg_fill = fill;
        state.weak_bg_fill = fill;
        state.bg_stroke = Stroke::new(1.0, stroke);
        state.fg_stroke = Stroke::new(1.0, text);
        state.rounding = Rounding::same(3.0);
    }

    ctx.style_mut(|style| {
        style.visuals = visuals;
        style.spacing.item_spacing = egui::vec2(8.0, 6.0);
        style.spacing.slider_width = 180.0;
        style.text_styles = [
            (TextStyle::Small, FontId::new(11.0, FontFamily::Proportional)),
            (TextStyle::Body, FontId::new(13.0, FontFamily::Proportional)),
            (TextStyle::Button, FontId::new(13.0, FontFamily::Proportional)),
            (TextStyle::Heading, FontId::new(18.0, FontFamily::Proportional)),
            (TextStyle::Monospace, FontId::new(12.0, FontFamily::Monospace)),
        ]
        .into();
    });
}
