use std::time::Instant;

use eframe::egui;

use crate::{
    gui::theme::Theme,
    practice::RewardQueue,
};

const RISE: f32 = 48.0;
const ROW_HEIGHT: f32 = 34.0;

/// Floating "+N" chips for recently awarded points. Each chip drifts upward and fades
/// over its display time.
pub struct RewardOverlay;

impl RewardOverlay {
    pub fn show(ctx: &egui::Context, theme: &Theme, rewards: &RewardQueue, now: Instant) {
        if rewards.active().is_empty() {
            return;
        }

        let screen = ctx.screen_rect();
        let anchor = egui::pos2(screen.center().x, screen.top() + screen.height() * 0.3);
        let painter = ctx.layer_painter(egui::LayerId::new(
            egui::Order::Tooltip,
            egui::Id::new("reward_overlay"),
        ));

        for (row, active) in rewards.active().iter().enumerate() {
            let age = rewards.age_fraction(active, now);
            let alpha = 1.0 - age * age;
            let center = anchor + egui::vec2(0.0, row as f32 * ROW_HEIGHT - age * RISE);

            let amount = active.reward.amount;
            let color = if amount < 0 { theme.red(ctx) } else { theme.yellow(ctx) };
            let text = format!("{amount:+}");

            let galley =
                painter.layout_no_wrap(text, egui::FontId::proportional(26.0), color.gamma_multiply(alpha));
            let rect = egui::Rect::from_center_size(center, galley.size() + egui::vec2(24.0, 8.0));

            painter.rect_filled(rect, 12.0, egui::Color32::from_black_alpha((150.0 * alpha) as u8));
            painter.galley(rect.center() - galley.size() / 2.0, galley, color);
        }
    }
}
