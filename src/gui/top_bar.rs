use eframe::egui::{
    self,
    containers,
};

use crate::{
    core::models::SessionInfo,
    gui::theme::Theme,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TopBarAction {
    RestartSession,
    ChangeSession,
}

/// Snapshot of the session numbers shown on the right of the bar.
pub struct SessionStatus<'a> {
    pub session: Option<&'a SessionInfo>,
    pub resolved: usize,
    pub loaded: usize,
    pub points: i64,
    pub busy: bool,
}

pub struct TopBar;

impl TopBar {
    pub fn show(
        ctx: &egui::Context,
        theme: &Theme,
        status: &SessionStatus<'_>,
    ) -> Option<TopBarAction> {
        let mut action = None;

        egui::TopBottomPanel::top("top_panel").show(ctx, |ui| {
            containers::menu::Bar::new().ui(ui, |ui| {
                egui::widgets::global_theme_preference_switch(ui);
                ui.menu_button("Session", |ui| {
                    if ui.button("Restart Session").clicked() {
                        action = Some(TopBarAction::RestartSession);
                    }
                    if ui.button("Change Session").clicked() {
                        action = Some(TopBarAction::ChangeSession);
                    }
                    if ui.button("Quit").clicked() {
                        ctx.send_viewport_cmd(egui::ViewportCommand::Close);
                    }
                });

                if let Some(session) = status.session {
                    ui.add_space(8.0);
                    ui.label(theme.heading(ui.ctx(), &session.name));
                }

                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    Self::show_status(ui, theme, status);
                });
            });
        });

        action
    }

    fn show_status(ui: &mut egui::Ui, theme: &Theme, status: &SessionStatus<'_>) {
        let points_color = if status.points < 0 { theme.red(ui.ctx()) } else { theme.green(ui.ctx()) };
        ui.label(egui::RichText::new(format!("{:+} pts", status.points)).color(points_color).strong());

        ui.add_space(6.0);

        let progress = match status.session.and_then(|s| s.total_items) {
            Some(total) => format!("{} / {}", status.resolved, total),
            None => format!("{} / {}", status.resolved, status.loaded),
        };
        ui.small(progress).on_hover_text("Monsters answered");

        if status.busy {
            ui.add_space(6.0);
            ui.add(egui::Spinner::new().size(12.0));
        }
    }
}
