#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

use eframe::egui;
use paintpad::{logger, PaintPadApp};

fn main() -> Result<(), eframe::Error> {
    // Initialize session log (overwrites previous session log)
    logger::init();

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([900.0, 700.0])
            .with_title("PaintPad"),
        ..Default::default()
    };

    eframe::run_native(
        "PaintPad",
        options,
        Box::new(|cc| Box::new(PaintPadApp::new(cc))),
    )
}
