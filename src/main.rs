#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

mod app;
mod detection;
mod panel;
mod scanner;
mod settings;
mod video;

use app::DetectionApp;
use eframe::egui;

fn main() -> eframe::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt::init();

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1100.0, 800.0])
            .with_min_inner_size([640.0, 480.0])
            .with_title("Video Detection Player"),
        ..Default::default()
    };

    eframe::run_native(
        "Video Detection Player",
        options,
        Box::new(|cc| {
            // Configure dark theme
            setup_custom_style(&cc.egui_ctx);

            Ok(Box::new(DetectionApp::new(cc)))
        }),
    )
}

fn setup_custom_style(ctx: &egui::Context) {
    let mut style = (*ctx.style()).clone();

    // Dark slate palette, blue accent
    let bg_dark = egui::Color32::from_rgb(15, 17, 21);
    let bg_card = egui::Color32::from_rgb(24, 27, 33);
    let border = egui::Color32::from_rgb(45, 50, 60);
    let text = egui::Color32::from_rgb(240, 242, 245);
    let text_muted = egui::Color32::from_rgb(130, 138, 150);
    let accent = egui::Color32::from_rgb(99, 140, 255);

    style.visuals.dark_mode = true;
    style.visuals.panel_fill = bg_dark;
    style.visuals.window_fill = egui::Color32::from_rgb(22, 25, 30);
    style.visuals.extreme_bg_color = bg_dark;
    style.visuals.faint_bg_color = bg_card;

    let widgets = &mut style.visuals.widgets;
    for (visuals, fill, fg, stroke) in [
        (&mut widgets.noninteractive, bg_card, text, border),
        (&mut widgets.inactive, egui::Color32::from_rgb(35, 40, 50), text_muted, border),
        (&mut widgets.hovered, egui::Color32::from_rgb(32, 36, 44), text, accent),
        (&mut widgets.active, egui::Color32::from_rgb(45, 52, 65), text, accent),
    ] {
        visuals.bg_fill = fill;
        visuals.weak_bg_fill = fill;
        visuals.fg_stroke = egui::Stroke::new(1.0, fg);
        visuals.bg_stroke = egui::Stroke::new(1.0, stroke);
        visuals.rounding = egui::Rounding::same(6.0);
    }

    style.visuals.selection.bg_fill = accent.linear_multiply(0.25);
    style.visuals.selection.stroke = egui::Stroke::new(1.0, accent);
    style.visuals.window_rounding = egui::Rounding::same(10.0);

    style.spacing.item_spacing = egui::vec2(8.0, 8.0);
    style.spacing.button_padding = egui::vec2(12.0, 6.0);

    ctx.set_style(style);
}
