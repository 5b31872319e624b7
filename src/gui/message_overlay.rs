use eframe::egui;

use crate::gui::theme::Theme;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayAction {
    Retry,
}

/// Dimmed full-window overlay with a status message. Blocks input underneath while
/// active; with an error set it offers a retry instead of the spinner.
pub struct MessageOverlay {
    pub active: bool,
    pub message: Option<String>,
    pub error: Option<String>,
}

impl MessageOverlay {
    pub fn new() -> Self {
        Self { active: false, message: None, error: None }
    }

    pub fn set_message(&mut self, message: impl Into<String>) {
        self.message = Some(message.into());
        self.error = None;
        self.active = true;
    }

    pub fn set_error(&mut self, error: impl Into<String>) {
        self.error = Some(error.into());
        self.active = true;
    }

    pub fn clear_message(&mut self) {
        self.message = None;
        self.error = None;
        self.active = false;
    }

    pub fn show(&self, ctx: &egui::Context, theme: &Theme) -> Option<OverlayAction> {
        if !self.active {
            return None;
        }

        egui::Area::new(egui::Id::new("message_overlay"))
            .order(egui::Order::Foreground)
            .fixed_pos(egui::Pos2::new(0.0, 0.0))
            .show(ctx, |ui| {
                let screen_size = ui.ctx().screen_rect().size();
                ui.allocate_space(screen_size);
                ui.painter().rect_filled(
                    ui.ctx().screen_rect(),
                    0.0,
                    egui::Color32::from_black_alpha(120),
                );
            });

        let message = self.message.as_deref().unwrap_or("Loading...");
        let mut action = None;

        egui::Window::new("message_box")
            .order(egui::Order::Foreground)
            .collapsible(false)
            .resizable(false)
            .title_bar(false)
            .min_width(240.0)
            .anchor(egui::Align2::CENTER_CENTER, egui::Vec2::new(0.0, 0.0))
            .show(ctx, |ui| {
                ui.vertical_centered(|ui| {
                    ui.add_space(8.0);
                    match &self.error {
                        None => {
                            ui.add(egui::Spinner::new());
                            ui.label(message);
                        }
                        Some(error) => {
                            ui.label(egui::RichText::new(message).strong());
                            ui.add_space(4.0);
                            ui.label(egui::RichText::new(error).color(theme.red(ui.ctx())));
                            ui.add_space(8.0);
                            if ui.button("Retry").clicked() {
                                action = Some(OverlayAction::Retry);
                            }
                        }
                    }
                    ui.add_space(8.0);
                });
            });

        action
    }
}

impl Default for MessageOverlay {
    fn default() -> Self {
        Self::new()
    }
}
