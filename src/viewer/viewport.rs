//! Canvas widget: routes raw pointer events into the render session and
//! shows the resolved image.

use egui::{Event, Response, Sense, Ui, Vec2};

use crate::pathtracer::GpuStages;
use crate::progressive::{
    CanvasRect, Modifiers, PointerButton, PointerEvent, RenderSession, SessionCommand, Telemetry,
};

/// Canvas state
pub struct Canvas {
    texture_id: Option<egui::TextureId>,
    /// Display generation the registered texture belongs to.
    registered: u64,
}

impl Canvas {
    pub fn new() -> Self {
        Self { texture_id: None, registered: 0 }
    }

    /// Lay out the canvas, feed input, run one tick and paint.
    ///
    /// Returns the widget response and the telemetry of the pass rendered
    /// this frame, if any.
    pub fn show(
        &mut self,
        ui: &mut Ui,
        render_state: &egui_wgpu::RenderState,
        session: &mut RenderSession<GpuStages>,
    ) -> anyhow::Result<(Response, Option<Telemetry>)> {
        let _span = tracing::info_span!("canvas_show").entered();
        let available = ui.available_size();
        let size = Vec2::new(available.x.max(64.0), available.y.max(64.0));
        let (rect, response) = ui.allocate_exact_size(size, Sense::click_and_drag());

        session.apply(SessionCommand::SetCanvas(CanvasRect::new(
            rect.left(),
            rect.top(),
            rect.width(),
            rect.height(),
        )))?;

        let ppp = ui.ctx().pixels_per_point();
        let width = (size.x * ppp).round() as u32;
        let height = (size.y * ppp).round() as u32;
        session.resize(width, height)?;

        for event in pointer_events(ui) {
            session.handle_pointer(event);
        }

        let telemetry = session.tick()?;

        self.ensure_registered(render_state, session.stages());
        match self.texture_id {
            Some(tex_id) => {
                ui.painter().image(
                    tex_id,
                    rect,
                    egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0)),
                    egui::Color32::WHITE,
                );
            }
            None => {
                ui.painter().rect_filled(rect, 0.0, egui::Color32::from_rgb(30, 30, 35));
            }
        }

        Ok((response, telemetry))
    }

    /// Register the display texture with egui after it is (re)created.
    fn ensure_registered(&mut self, render_state: &egui_wgpu::RenderState, stages: &GpuStages) {
        if self.texture_id.is_some() && self.registered == stages.generation() {
            return;
        }
        let Some(view) = stages.display_view() else {
            return;
        };

        let mut renderer = render_state.renderer.write();
        if let Some(old_id) = self.texture_id.take() {
            renderer.free_texture(&old_id);
        }
        self.texture_id = Some(renderer.register_native_texture(&render_state.device, view, wgpu::FilterMode::Linear));
        self.registered = stages.generation();
    }
}

impl Default for Canvas {
    fn default() -> Self {
        Self::new()
    }
}

/// Window-wide pointer events from this frame, in order.
fn pointer_events(ui: &Ui) -> Vec<PointerEvent> {
    ui.input(|input| {
        let modifiers = Modifiers { shift: input.modifiers.shift, ctrl: input.modifiers.ctrl };
        input
            .events
            .iter()
            .filter_map(|event| match event {
                Event::PointerButton { pos, button, pressed, .. } => {
                    let button = match button {
                        egui::PointerButton::Primary => PointerButton::Left,
                        egui::PointerButton::Secondary => PointerButton::Right,
                        _ => return None,
                    };
                    Some(if *pressed {
                        PointerEvent::Pressed { button, x: pos.x, y: pos.y }
                    } else {
                        PointerEvent::Released { button }
                    })
                }
                Event::PointerMoved(pos) => Some(PointerEvent::Moved { x: pos.x, y: pos.y, modifiers }),
                _ => None,
            })
            .collect()
    })
}
