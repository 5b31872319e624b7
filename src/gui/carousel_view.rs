use eframe::egui::{
    self,
    Color32,
    FontId,
    Rect,
    Stroke,
    StrokeKind,
};

use crate::{
    core::models::{
        PracticeItem,
        SequencePosition,
    },
    gui::theme::{
        blend_colors,
        Theme,
    },
    practice::{
        buffer::{
            SlotContent,
            SlotSide,
        },
        carousel::{
            CardView,
            WindowView,
        },
    },
};

const GAP: f32 = 24.0;
const CORNER: f32 = 14.0;
const PADDING: f32 = 16.0;

/// What to write on an empty slot past the last loaded card.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TailState {
    Loading,
    Stalled,
    End,
}

/// Paints the five window slots side by side, shifted by the current slide offset.
/// Returns the position of a card that was clicked this frame.
pub fn carousel_view(
    ui: &mut egui::Ui,
    theme: &Theme,
    view: &WindowView<'_>,
    tail: TailState,
) -> Option<SequencePosition> {
    let (area, _) = ui.allocate_exact_size(ui.available_size(), egui::Sense::hover());
    let painter = ui.painter_at(area);

    let card_width = (area.width() / 3.4).clamp(160.0, 340.0);
    let card_height = (area.height() * 0.85).min(card_width * 1.5);
    let pitch = card_width + GAP;
    let offset = view.slide_offset();

    let mut tapped = None;

    for card in &view.cards {
        let distance = card.slot.offset as f32 + offset;
        let nearness = distance.abs().min(2.0);
        let scale = 1.0 - 0.12 * nearness;
        let fade = 1.0 - 0.35 * nearness;

        let center = area.center() + egui::vec2(distance * pitch, 0.0);
        let rect = Rect::from_center_size(center, egui::vec2(card_width, card_height) * scale);
        if !rect.intersects(area) {
            continue;
        }

        match card.slot.content {
            SlotContent::Item(item) => {
                paint_card(&painter, ui.ctx(), theme, rect, item, card, fade);
                let id = ui.id().with(("card", item.sequence_position));
                if ui.interact(rect, id, egui::Sense::click()).clicked() {
                    tapped = Some(item.sequence_position);
                }
            }
            SlotContent::Placeholder(side) => {
                paint_placeholder(&painter, ui.ctx(), theme, rect, side, tail, fade);
            }
        }
    }

    tapped
}

fn paint_card(
    painter: &egui::Painter,
    ctx: &egui::Context,
    theme: &Theme,
    rect: Rect,
    item: &PracticeItem,
    card: &CardView<'_>,
    fade: f32,
) {
    let text = theme.foreground(ctx).gamma_multiply(fade);
    let weak = theme.comment(ctx).gamma_multiply(fade);
    let border = theme.card_border(ctx, card.locked);

    painter.rect_filled(rect, CORNER, theme.card_fill(ctx).gamma_multiply(fade));
    painter.rect_stroke(
        rect,
        CORNER,
        Stroke::new(if card.is_displayed { 2.0 } else { 1.0 }, border.gamma_multiply(fade)),
        StrokeKind::Inside,
    );

    let inner = rect.shrink(PADDING);
    let mut y = inner.top();

    painter.text(
        egui::pos2(inner.left(), y),
        egui::Align2::LEFT_TOP,
        format!("#{}", item.sequence_position + 1),
        FontId::proportional(12.0),
        weak,
    );
    painter.text(
        egui::pos2(inner.right(), y),
        egui::Align2::RIGHT_TOP,
        difficulty_stars(item.difficulty),
        FontId::proportional(12.0),
        theme.yellow(ctx).gamma_multiply(fade),
    );
    y += 22.0;

    // Avatar stands in for the monster image; visibility drives its opacity.
    let radius = (inner.width() * 0.22).min(48.0);
    let avatar = egui::pos2(inner.center().x, y + radius);
    let visibility = f32::from(item.visibility.min(100)) / 100.0;
    let avatar_color = blend_colors(theme.card_placeholder(ctx), theme.purple(ctx), 0.25 + 0.75 * visibility);
    painter.circle_filled(avatar, radius, avatar_color.gamma_multiply(fade));
    let initial = item.content.name.chars().next().map(|c| c.to_uppercase().to_string());
    painter.text(
        avatar,
        egui::Align2::CENTER_CENTER,
        initial.unwrap_or_else(|| "?".to_string()),
        FontId::proportional(radius),
        text,
    );
    y += radius * 2.0 + 10.0;

    let name = painter.layout(
        item.content.name.clone(),
        FontId::proportional(20.0),
        text,
        inner.width(),
    );
    let name_height = name.size().y;
    painter.galley(egui::pos2(inner.center().x - name.size().x / 2.0, y), name, text);
    y += name_height + 8.0;

    let familiarity = item.submission_result().map_or(item.familiarity, |r| r.familiarity);
    familiarity_bar(painter, ctx, theme, inner, y, familiarity, fade);
    y += 22.0;

    if !card.expanded {
        if card.is_displayed {
            painter.text(
                egui::pos2(inner.center().x, inner.bottom()),
                egui::Align2::CENTER_BOTTOM,
                "Tap or press Space to reveal",
                FontId::proportional(12.0),
                weak,
            );
        }
        return;
    }

    let description = painter.layout(
        item.content.description.clone(),
        FontId::proportional(14.0),
        text,
        inner.width(),
    );
    let description_height = description.size().y;
    painter.galley(egui::pos2(inner.left(), y), description, text);
    y += description_height + 10.0;

    if let Some(result) = item.submission_result() {
        let summary = format!(
            "Practised {} times\nNext practice {}",
            result.practice_count,
            result.next_practice_at.format("%b %-d, %H:%M")
        );
        let galley = painter.layout(
            summary,
            FontId::proportional(13.0),
            theme.green(ctx).gamma_multiply(fade),
            inner.width(),
        );
        if y + galley.size().y <= inner.bottom() {
            painter.galley(egui::pos2(inner.left(), y), galley, text);
        }
    }
}

fn familiarity_bar(
    painter: &egui::Painter,
    ctx: &egui::Context,
    theme: &Theme,
    inner: Rect,
    y: f32,
    familiarity: u8,
    fade: f32,
) {
    let track = Rect::from_min_size(egui::pos2(inner.left(), y), egui::vec2(inner.width(), 8.0));
    painter.rect_filled(track, 4.0, theme.card_placeholder(ctx).gamma_multiply(fade));

    let fraction = f32::from(familiarity.min(100)) / 100.0;
    if fraction > 0.0 {
        let mut fill = track;
        fill.set_width(track.width() * fraction);
        painter.rect_filled(fill, 4.0, theme.familiarity(ctx, familiarity).gamma_multiply(fade));
    }

    painter.text(
        egui::pos2(track.right(), track.bottom() + 2.0),
        egui::Align2::RIGHT_TOP,
        format!("{familiarity}%"),
        FontId::proportional(11.0),
        theme.comment(ctx).gamma_multiply(fade),
    );
}

fn paint_placeholder(
    painter: &egui::Painter,
    ctx: &egui::Context,
    theme: &Theme,
    rect: Rect,
    side: SlotSide,
    tail: TailState,
    fade: f32,
) {
    painter.rect_filled(rect, CORNER, theme.card_placeholder(ctx).gamma_multiply(fade * 0.6));

    let label = match (side, tail) {
        (SlotSide::Before, _) => return,
        (SlotSide::After, TailState::Loading) => "Loading more monsters...",
        (SlotSide::After, TailState::Stalled) => "Could not load more monsters",
        (SlotSide::After, TailState::End) => "End of session",
    };
    painter.text(
        rect.center(),
        egui::Align2::CENTER_CENTER,
        label,
        FontId::proportional(13.0),
        theme.comment(ctx).gamma_multiply(fade),
    );
}

fn difficulty_stars(difficulty: u8) -> String {
    let filled = usize::from(difficulty.min(5));
    format!("{}{}", "★".repeat(filled), "☆".repeat(5 - filled))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_difficulty_stars() {
        assert_eq!(difficulty_stars(3), "★★★☆☆");
        assert_eq!(difficulty_stars(5), "★★★★★");
        assert_eq!(difficulty_stars(9), "★★★★★");
    }
}
