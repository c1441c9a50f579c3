//! The eframe application shell: toolbar, palette, the canvas panel that
//! routes pointer gestures into the tool core, and the Text tool's prompt.
//!
//! Everything here is "surrounding UI" — it only talks to the core through
//! its public operations and the drained [`CanvasEvent`]s, and never touches
//! pixels directly.

use std::time::Instant;

use ab_glyph::FontArc;
use eframe::egui;
use egui::{pos2, vec2, Color32, Pos2, Rect, Sense, Stroke, TextureHandle, TextureOptions};

use crate::canvas::{CanvasEvent, PaintCanvas};
use crate::components::tools::{StrokeSize, Tool, ToolManager, SPRAY_INTERVAL};
use crate::io;
use crate::ops::text::load_system_font;

/// Font size for stamped text, in logical points.
const TEXT_SIZE: f32 = 24.0;

/// The fixed 16-color palette.
const PALETTE: [(&str, Color32); 16] = [
    ("Black", Color32::from_rgb(0, 0, 0)),
    ("Dark Gray", Color32::from_rgb(128, 128, 128)),
    ("Maroon", Color32::from_rgb(128, 0, 0)),
    ("Olive", Color32::from_rgb(128, 128, 0)),
    ("Dark Green", Color32::from_rgb(0, 128, 0)),
    ("Teal", Color32::from_rgb(0, 128, 128)),
    ("Navy", Color32::from_rgb(0, 0, 128)),
    ("Purple", Color32::from_rgb(128, 0, 128)),
    ("White", Color32::from_rgb(255, 255, 255)),
    ("Light Gray", Color32::from_rgb(191, 191, 191)),
    ("Red", Color32::from_rgb(255, 0, 0)),
    ("Yellow", Color32::from_rgb(255, 255, 0)),
    ("Green", Color32::from_rgb(0, 255, 0)),
    ("Cyan", Color32::from_rgb(0, 255, 255)),
    ("Blue", Color32::from_rgb(0, 0, 255)),
    ("Magenta", Color32::from_rgb(255, 0, 255)),
];

/// Pending Text-tool prompt state.
struct TextPrompt {
    point: Pos2,
    input: String,
}

pub struct PaintPadApp {
    /// `None` until the first layout pass provides a size, or after a fatal
    /// allocation failure.
    canvas: Option<PaintCanvas>,
    canvas_dead: bool,
    tools: ToolManager,

    texture: Option<TextureHandle>,
    uploaded_revision: Option<u64>,

    /// System font for the Text tool; `None` if lookup failed at startup.
    font: Option<FontArc>,
    text_prompt: Option<TextPrompt>,

    /// Spray cadence bookkeeping for the Airbrush.
    last_spray: Instant,
    gesture_active: bool,
    last_pointer: Pos2,

    /// One-line status shown under the toolbar (save results, errors).
    status: Option<String>,
}

impl PaintPadApp {
    pub fn new(_cc: &eframe::CreationContext<'_>) -> Self {
        let font = match load_system_font() {
            Ok(font) => Some(font),
            Err(e) => {
                log_warn!("Text tool disabled: {}", e);
                None
            }
        };
        Self {
            canvas: None,
            canvas_dead: false,
            tools: ToolManager::new(),
            texture: None,
            uploaded_revision: None,
            font,
            text_prompt: None,
            last_spray: Instant::now(),
            gesture_active: false,
            last_pointer: Pos2::ZERO,
            status: None,
        }
    }

    // ---- toolbar ----------------------------------------------------------

    fn toolbar_ui(&mut self, ui: &mut egui::Ui) {
        ui.horizontal_wrapped(|ui| {
            for &tool in Tool::all() {
                let selected = self.tools.active_tool() == tool;
                if ui.selectable_label(selected, tool.label()).clicked() && !selected {
                    if let Some(canvas) = self.canvas.as_mut() {
                        self.tools.set_active_tool(tool, canvas);
                        self.gesture_active = false;
                    }
                }
            }

            ui.separator();

            for &size in StrokeSize::all() {
                let label = format!("{} px", size.line_width());
                let selected = self.tools.settings().stroke_size == size;
                if ui.selectable_label(selected, label).clicked() {
                    self.tools.set_stroke_size(size);
                }
            }

            ui.separator();

            if ui.button("Save").clicked() {
                self.save_drawing();
            }
        });

        ui.horizontal(|ui| {
            self.swatch(ui, self.tools.settings().primary_color, "Primary color");
            self.swatch(ui, self.tools.settings().secondary_color, "Secondary color");
            ui.separator();
            for (name, color) in PALETTE {
                let (rect, response) =
                    ui.allocate_exact_size(vec2(18.0, 18.0), Sense::click());
                ui.painter().rect_filled(rect, 2.0, color);
                ui.painter()
                    .rect_stroke(rect, 2.0, Stroke::new(1.0, Color32::DARK_GRAY));
                let response = response.on_hover_text(name);
                if response.clicked() {
                    self.tools.set_primary_color(color);
                } else if response.secondary_clicked() {
                    self.tools.set_secondary_color(color);
                }
            }
        });

        if let Some(status) = &self.status {
            ui.label(status.clone());
        }
    }

    fn swatch(&self, ui: &mut egui::Ui, color: Color32, hover: &str) {
        let (rect, response) = ui.allocate_exact_size(vec2(24.0, 24.0), Sense::hover());
        ui.painter().rect_filled(rect, 3.0, color);
        ui.painter()
            .rect_stroke(rect, 3.0, Stroke::new(1.5, Color32::BLACK));
        let _ = response.on_hover_text(hover.to_owned());
    }

    // ---- canvas panel -----------------------------------------------------

    fn canvas_ui(&mut self, ui: &mut egui::Ui, ctx: &egui::Context) {
        let rect = ui.available_rect_before_wrap();
        if rect.width() < 1.0 || rect.height() < 1.0 {
            return;
        }
        let scale = ctx.pixels_per_point();

        // (Re)create the backing buffer on layout changes — but never while a
        // gesture is in flight, so a resize can't race a stroke.
        if !self.gesture_active && !self.canvas_dead {
            let result = match self.canvas.as_mut() {
                Some(canvas) => canvas.resize(rect.size(), scale),
                None => match PaintCanvas::new(rect.size(), scale) {
                    Ok(canvas) => {
                        self.canvas = Some(canvas);
                        Ok(())
                    }
                    Err(e) => Err(e),
                },
            };
            if let Err(e) = result {
                // No backing store, no painting: fatal for the canvas.
                log_err!("Canvas allocation failed: {}", e);
                self.status = Some(format!("Canvas allocation failed: {}", e));
                self.canvas = None;
                self.canvas_dead = true;
            }
        }
        let Some(canvas) = self.canvas.as_mut() else {
            ui.centered_and_justified(|ui| ui.label("Canvas unavailable"));
            return;
        };

        // Pointer gestures.  egui reports drags; a click with no movement
        // still arrives as drag_started + drag_released.
        let response = ui.allocate_rect(rect, Sense::drag());
        if let Some(pos) = response.interact_pointer_pos() {
            self.last_pointer = pos2(pos.x - rect.min.x, pos.y - rect.min.y);
        }
        if response.drag_started() {
            self.gesture_active = true;
            self.tools.pointer_began(self.last_pointer, canvas);
        } else if response.dragged() {
            self.tools.pointer_moved(self.last_pointer, canvas);
        }
        if response.drag_released() && self.gesture_active {
            self.gesture_active = false;
            self.tools.pointer_ended(self.last_pointer, canvas);
        }

        // Airbrush cadence: fixed-interval ticks on this same thread.
        let now = Instant::now();
        if self.tools.spray_armed() {
            // Don't burst-spray after a long frame hitch.
            if now.duration_since(self.last_spray) > 10 * SPRAY_INTERVAL {
                self.last_spray = now - SPRAY_INTERVAL;
            }
            while now.duration_since(self.last_spray) >= SPRAY_INTERVAL {
                self.tools.airbrush_tick(canvas);
                self.last_spray += SPRAY_INTERVAL;
            }
            ctx.request_repaint_after(SPRAY_INTERVAL);
        } else {
            self.last_spray = now;
        }

        // Upload the committed buffer when its revision moved.
        if self.uploaded_revision != Some(canvas.revision()) || self.texture.is_none() {
            let image = canvas.to_color_image();
            self.texture = Some(ctx.load_texture("canvas", image, TextureOptions::NEAREST));
            self.uploaded_revision = Some(canvas.revision());
        }
        if let Some(texture) = &self.texture {
            ui.painter().image(
                texture.id(),
                rect,
                Rect::from_min_max(pos2(0.0, 0.0), pos2(1.0, 1.0)),
                Color32::WHITE,
            );
        }

        // The uncommitted shape, drawn over the texture without touching it.
        if let Some(preview) = canvas.preview() {
            let points: Vec<Pos2> = preview
                .path
                .outline()
                .into_iter()
                .map(|p| pos2(p.x + rect.min.x, p.y + rect.min.y))
                .collect();
            ui.painter().add(egui::Shape::line(
                points,
                Stroke::new(preview.width, preview.color),
            ));
        }

        // Outbound notifications from the core.
        for event in canvas.take_events() {
            match event {
                CanvasEvent::ColorPicked(color) => {
                    self.status = Some(format!(
                        "Picked color #{:02X}{:02X}{:02X}",
                        color.r(),
                        color.g(),
                        color.b()
                    ));
                }
                CanvasEvent::TextRequested(point) => {
                    if self.font.is_some() {
                        self.text_prompt = Some(TextPrompt { point, input: String::new() });
                    } else {
                        self.status = Some("Text tool unavailable: no system font".to_owned());
                    }
                }
            }
        }
    }

    // ---- text prompt ------------------------------------------------------

    fn text_prompt_ui(&mut self, ctx: &egui::Context) {
        let Some(prompt) = self.text_prompt.as_mut() else {
            return;
        };
        let mut commit = false;
        let mut cancel = false;

        egui::Window::new("Add Text")
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, vec2(0.0, 0.0))
            .show(ctx, |ui| {
                let edit = ui.text_edit_singleline(&mut prompt.input);
                edit.request_focus();
                ui.horizontal(|ui| {
                    commit = ui.button("OK").clicked()
                        || ui.input(|i| i.key_pressed(egui::Key::Enter));
                    cancel = ui.button("Cancel").clicked()
                        || ui.input(|i| i.key_pressed(egui::Key::Escape));
                });
            });

        if commit {
            if let Some(prompt) = self.text_prompt.take() {
                let content = prompt.input.trim();
                // Empty/whitespace input is suppressed here — the core does
                // not re-validate.
                if !content.is_empty() {
                    if let (Some(canvas), Some(font)) = (self.canvas.as_mut(), self.font.as_ref())
                    {
                        canvas.stamp_text(
                            content,
                            prompt.point,
                            self.tools.settings().primary_color,
                            font,
                            TEXT_SIZE,
                        );
                    }
                }
            }
        } else if cancel {
            self.text_prompt = None;
        }
    }

    // ---- export -----------------------------------------------------------

    fn save_drawing(&mut self) {
        let Some(canvas) = self.canvas.as_ref() else {
            return;
        };
        let Some(path) = io::prompt_save_path() else {
            return;
        };
        match io::save_png(&canvas.export_image(), &path) {
            Ok(()) => {
                log_info!("Saved drawing to {}", path.display());
                self.status = Some(format!("Saved {}", path.display()));
            }
            Err(e) => {
                log_err!("Save failed: {}", e);
                self.status = Some(format!("Save failed: {}", e));
            }
        }
    }
}

impl eframe::App for PaintPadApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        egui::TopBottomPanel::top("toolbar").show(ctx, |ui| {
            self.toolbar_ui(ui);
        });

        egui::CentralPanel::default()
            .frame(egui::Frame::none())
            .show(ctx, |ui| {
                self.canvas_ui(ui, ctx);
            });

        self.text_prompt_ui(ctx);
    }
}
