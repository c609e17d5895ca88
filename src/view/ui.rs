use egui::Context;

use crate::assets::LoadProgress;

/// The preloader: a centered "Loading…" card with a progress bar.
pub fn build_loading_overlay(egui_ctx: &Context, raw_input: egui::RawInput, progress: LoadProgress) -> egui::FullOutput {
    egui_ctx.run(raw_input, |ctx| {
        egui::Area::new(egui::Id::new("preloader"))
            .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
            .show(ctx, |ui| {
                egui::Frame::NONE
                    .fill(egui::Color32::from_black_alpha(200))
                    .inner_margin(16.0)
                    .show(ui, |ui| {
                        ui.set_min_width(220.0);
                        ui.vertical_centered(|ui| {
                            ui.label(egui::RichText::new("Loading…").size(18.0).color(egui::Color32::WHITE));
                            ui.add_space(6.0);
                            ui.add(egui::ProgressBar::new(progress.fraction()).desired_width(200.0));
                            ui.label(
                                egui::RichText::new(progress_label(progress))
                                    .small()
                                    .color(egui::Color32::LIGHT_GRAY),
                            );
                        });
                    });
            });
    })
}

fn progress_label(progress: LoadProgress) -> String {
    if progress.failed > 0 {
        format!("{} / {} ({} failed)", progress.settled, progress.total, progress.failed)
    } else {
        format!("{} / {}", progress.settled, progress.total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn label_mentions_failures_only_when_there_are_some() {
        let ok = LoadProgress { settled: 3, total: 8, failed: 0 };
        assert_eq!(progress_label(ok), "3 / 8");
        let bad = LoadProgress { settled: 8, total: 8, failed: 2 };
        assert_eq!(progress_label(bad), "8 / 8 (2 failed)");
    }

    #[test]
    fn overlay_produces_shapes() {
        let ctx = Context::default();
        let mut raw_input = egui::RawInput::default();
        raw_input.screen_rect = Some(egui::Rect::from_min_size(egui::Pos2::ZERO, egui::vec2(800.0, 600.0)));
        let output = build_loading_overlay(&ctx, raw_input, LoadProgress { settled: 1, total: 2, failed: 0 });
        assert!(!output.shapes.is_empty());
    }
}
