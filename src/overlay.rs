use egui_winit::EventResponse;

use crate::commands::{self, CommandList};

/// What the overlay shows about the current view.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewStatus {
    pub document: String,
    pub page: i32,
    pub page_count: i32,
    pub zoom: f32,
    pub rotate: f32,
}

/// egui context plus the winit input state feeding it.
pub struct Overlay {
    pub ctx: egui::Context,
    winit_state: egui_winit::State,
}

impl Overlay {
    pub fn new(window: &winit::window::Window) -> Self {
        let ctx = egui::Context::default();
        let winit_state = egui_winit::State::new(
            ctx.clone(),
            egui::ViewportId::ROOT,
            window,
            None, // native pixels per point
            None, // theme
            None, // max_texture_side
        );
        Self { ctx, winit_state }
    }

    /// Returns whether egui consumed the event.
    pub fn handle_event(
        &mut self,
        window: &winit::window::Window,
        event: &winit::event::WindowEvent,
    ) -> EventResponse {
        self.winit_state.on_window_event(window, event)
    }

    /// Run one layout pass sized to the window and return its render commands in pixels.
    pub fn layout(&mut self, window: &winit::window::Window, status: &ViewStatus) -> CommandList {
        let raw_input = self.winit_state.take_egui_input(window);
        let output = self.ctx.run(raw_input, |ctx| build_layout(ctx, status));
        let pixels_per_point = output.pixels_per_point;
        self.winit_state
            .handle_platform_output(window, output.platform_output);

        let screen = self.ctx.screen_rect();
        let list = commands::from_clipped_shapes(&output.shapes, screen, pixels_per_point);
        if list.unsupported > 0 {
            log::trace!("Skipped {} unsupported overlay shape(s)", list.unsupported);
        }
        list
    }
}

/// Top bar with the document name, bottom bar with page, zoom and rotation.
pub fn build_layout(ctx: &egui::Context, status: &ViewStatus) {
    egui::TopBottomPanel::top("document_bar").show(ctx, |ui| {
        ui.horizontal(|ui| {
            ui.strong(&status.document);
        });
    });

    egui::TopBottomPanel::bottom("status_bar").show(ctx, |ui| {
        ui.horizontal(|ui| {
            ui.label(format!("Page {}/{}", status.page + 1, status.page_count));
            ui.separator();
            ui.label(format!("Zoom: {}%", status.zoom.round() as i32));
            ui.separator();
            ui.label(format!("Rotation: {}°", status.rotate.round() as i32));
        });
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::RenderCommand;
    use egui::{vec2, Pos2, RawInput, Rect};

    fn run_layout(status: &ViewStatus) -> CommandList {
        let ctx = egui::Context::default();
        let screen = Rect::from_min_size(Pos2::ZERO, vec2(1024.0, 768.0));
        let input = RawInput {
            screen_rect: Some(screen),
            ..Default::default()
        };
        let output = ctx.run(input, |ctx| build_layout(ctx, status));
        commands::from_clipped_shapes(&output.shapes, screen, output.pixels_per_point)
    }

    fn status() -> ViewStatus {
        ViewStatus {
            document: "report.pdf".into(),
            page: 1,
            page_count: 12,
            zoom: 150.0,
            rotate: 90.0,
        }
    }

    fn texts(list: &CommandList) -> Vec<String> {
        list.commands
            .iter()
            .filter_map(|c| match c {
                RenderCommand::Text { text, .. } => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_layout_contains_status_text() {
        let list = run_layout(&status());
        let texts = texts(&list);
        assert!(texts.iter().any(|t| t == "report.pdf"));
        assert!(texts.iter().any(|t| t == "Page 2/12"));
        assert!(texts.iter().any(|t| t == "Zoom: 150%"));
        assert!(texts.iter().any(|t| t == "Rotation: 90°"));
    }

    #[test]
    fn test_layout_has_panel_backgrounds() {
        let list = run_layout(&status());
        assert!(list
            .commands
            .iter()
            .any(|c| matches!(c, RenderCommand::Rectangle { .. })));
    }

    #[test]
    fn test_layout_scissors_balanced() {
        let list = run_layout(&status());
        let starts = list
            .commands
            .iter()
            .filter(|c| matches!(c, RenderCommand::ScissorStart { .. }))
            .count();
        let ends = list
            .commands
            .iter()
            .filter(|c| matches!(c, RenderCommand::ScissorEnd))
            .count();
        assert_eq!(starts, ends);
    }
}
