use std::collections::VecDeque;

use eframe::egui;

use crate::practice::Notice;

/// Shows queued notices one at a time.
pub struct ErrorModal {
    queue: VecDeque<Notice>,
}

impl ErrorModal {
    pub fn new() -> Self {
        Self { queue: VecDeque::new() }
    }

    pub fn push(&mut self, notice: Notice) {
        // Repeated failures of the same kind collapse into one dialog.
        if self.queue.back() == Some(&notice) {
            return;
        }
        self.queue.push_back(notice);
    }

    pub fn is_open(&self) -> bool {
        !self.queue.is_empty()
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    pub fn show(&mut self, ctx: &egui::Context) -> bool {
        let Some(notice) = self.queue.front() else {
            return false;
        };
        let remaining = self.queue.len() - 1;

        let modal = egui::Modal::new(egui::Id::new("error_modal")).show(ctx, |ui| {
            ui.set_width(450.0);

            ui.horizontal(|ui| {
                ui.label(egui::RichText::new("⚠").size(24.0).color(ui.visuals().error_fg_color));
                ui.label(egui::RichText::new(&notice.title).size(18.0).strong());
            });

            ui.add_space(10.0);

            ui.label(egui::RichText::new(&notice.message).size(14.0).weak());

            if let Some(details) = &notice.details {
                ui.add_space(10.0);
                ui.collapsing("Technical Details", |ui| {
                    ui.add(
                        egui::TextEdit::multiline(&mut details.as_str())
                            .desired_width(f32::INFINITY)
                            .desired_rows(3)
                            .code_editor(),
                    );
                });
            }

            ui.add_space(15.0);

            ui.horizontal(|ui| {
                if remaining > 0 {
                    ui.small(format!("{remaining} more"));
                }
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    if ui.button("OK").clicked() {
                        ui.close();
                    }
                });
            });
        });

        if modal.should_close() {
            self.queue.pop_front();
            return true;
        }

        false
    }
}

impl Default for ErrorModal {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn notice(title: &str) -> Notice {
        Notice { title: title.into(), message: "m".into(), details: None }
    }

    #[test]
    fn test_consecutive_duplicates_collapse() {
        let mut modal = ErrorModal::new();
        modal.push(notice("Server Error"));
        modal.push(notice("Server Error"));
        modal.push(notice("Connection Problem"));
        modal.push(notice("Server Error"));

        assert_eq!(modal.pending(), 3);
        assert!(modal.is_open());
    }
}
