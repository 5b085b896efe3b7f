//! Main application state and UI

use std::path::PathBuf;

use egui::{CentralPanel, Color32, RichText, SidePanel, TopBottomPanel};

use super::settings::Settings;
use super::viewport::Canvas;
use crate::pathtracer::GpuStages;
use crate::progressive::{
    check_capabilities, GpuCapabilities, LoadOutcome, LoadingIndicator, RenderConfig, RenderSession, ShadingMethod,
};
use crate::scene::{default_scene, LoadRequest, LoadWorker};

/// Startup lifecycle: the session exists only once the GPU passed the gate.
enum AppState {
    /// Waiting for the wgpu render state.
    Starting,
    Running(Box<RenderSession<GpuStages>>),
    /// Capability gate failed; nothing renders.
    Failed(String),
}

/// Main viewer application
pub struct ViewerApp {
    settings: Settings,
    state: AppState,
    canvas: Canvas,
    worker: Option<LoadWorker>,
    pending_request: Option<LoadRequest>,
    status_message: String,
    _trace_guard: Option<tracing_chrome::FlushGuard>,
}

impl ViewerApp {
    pub fn new(
        _cc: &eframe::CreationContext<'_>,
        initial: Option<LoadRequest>,
        trace_guard: Option<tracing_chrome::FlushGuard>,
    ) -> Self {
        let settings = Settings::load();

        // Use last model if none given
        let pending = initial.or_else(|| {
            settings.last_model.clone().filter(|p| p.exists()).map(|model| LoadRequest {
                geometry: model,
                materials: settings.last_materials.clone().filter(|p| p.exists()),
            })
        });

        Self {
            settings,
            state: AppState::Starting,
            canvas: Canvas::new(),
            worker: None,
            pending_request: pending,
            status_message: "Starting".into(),
            _trace_guard: trace_guard,
        }
    }

    /// Probe the GPU, then build the session with the built-in scene.
    fn start(&mut self, render_state: &egui_wgpu::RenderState) {
        let caps = probe_capabilities(render_state);
        if let Err(e) = check_capabilities(&caps) {
            tracing::error!(error = %e, "GPU capability check failed");
            self.state = AppState::Failed(e.to_string());
            return;
        }

        let stages = GpuStages::new(
            render_state.device.clone(),
            render_state.queue.clone(),
            render_state.target_format,
        );
        let mut session = RenderSession::new(stages, self.settings.render);

        let ticket = session.begin_load();
        if let LoadOutcome::Failed(e) = session.finish_load(ticket, default_scene()) {
            self.status_message = format!("Built-in scene failed: {e}");
        } else {
            self.status_message = "Ready".into();
        }

        self.worker = Some(LoadWorker::spawn());
        self.state = AppState::Running(Box::new(session));
    }

    fn request_load(&mut self, request: LoadRequest) {
        let (AppState::Running(session), Some(worker)) = (&mut self.state, &self.worker) else {
            self.pending_request = Some(request);
            return;
        };
        let ticket = session.begin_load();
        let name = request.name();
        self.status_message = format!("Loading: {name}");
        // No result will arrive for a request the loader never received.
        if let Err(e) = worker.request(request, ticket) {
            if let LoadOutcome::Failed(e) = session.finish_load(ticket, Err(e)) {
                self.status_message = format!("Failed to load {name}: {e}");
            }
        }
    }

    /// Apply finished loads (non-blocking).
    fn process_loads(&mut self) {
        let _span = tracing::info_span!("process_loads").entered();
        let (AppState::Running(session), Some(worker)) = (&mut self.state, &self.worker) else {
            return;
        };

        while let Some(done) = worker.try_recv() {
            let name = done.request.name();
            match session.finish_load(done.ticket, done.result) {
                LoadOutcome::Applied => {
                    self.status_message = format!("Loaded: {name}");
                    self.settings.add_recent(done.request);
                    self.settings.save();
                }
                LoadOutcome::Superseded => {}
                LoadOutcome::Failed(e) => {
                    self.status_message = format!("Failed to load {name}: {e}");
                }
            }
        }
    }

    fn open_file_dialog(&mut self) {
        let Some(geometry) = rfd::FileDialog::new().add_filter("Wavefront OBJ", &["obj"]).pick_file() else {
            return;
        };
        self.request_load(LoadRequest::new(geometry));
    }

    /// Dropped files: one `.obj` plus an optional `.mtl`.
    fn handle_dropped_files(&mut self, ctx: &egui::Context) {
        let paths: Vec<PathBuf> = ctx.input(|i| i.raw.dropped_files.iter().filter_map(|f| f.path.clone()).collect());
        if paths.is_empty() {
            return;
        }
        let has_ext = |p: &PathBuf, ext: &str| {
            p.extension().is_some_and(|e| e.eq_ignore_ascii_case(ext))
        };
        let Some(geometry) = paths.iter().find(|p| has_ext(p, "obj")).cloned() else {
            self.status_message = "Drop an .obj file (optionally with its .mtl)".into();
            return;
        };
        let mut request = LoadRequest::new(geometry);
        if let Some(mtl) = paths.iter().find(|p| has_ext(p, "mtl")) {
            request = request.with_materials(mtl.clone());
        }
        self.request_load(request);
    }

    fn menu_bar(&mut self, ui: &mut egui::Ui) {
        let recent: Vec<LoadRequest> = self.settings.recent_models();

        egui::MenuBar::new().ui(ui, |ui| {
            ui.menu_button("File", |ui| {
                if ui.button("Open...").clicked() {
                    self.open_file_dialog();
                    ui.close();
                }
                ui.add_enabled_ui(!recent.is_empty(), |ui| {
                    ui.menu_button("Recent", |ui| {
                        for request in &recent {
                            let label = match &request.materials {
                                Some(mtl) => format!("{} + {}", request.name(), mtl.file_name().unwrap_or_default().to_string_lossy()),
                                None => request.name(),
                            };
                            if ui.button(label).clicked() {
                                self.request_load(request.clone());
                                ui.close();
                            }
                        }
                    });
                });
                ui.separator();
                if ui.button("Quit").clicked() {
                    ui.ctx().send_viewport_cmd(egui::ViewportCommand::Close);
                }
            });
        });
    }

    fn side_panel(&mut self, ui: &mut egui::Ui) {
        let AppState::Running(session) = &mut self.state else {
            return;
        };

        ui.heading("Render");
        ui.separator();

        let mut config = *session.config();
        ui.add(egui::Slider::new(&mut config.fov_degrees, RenderConfig::FOV_RANGE).text("FOV"));
        ui.add(
            egui::Slider::new(&mut config.samples, RenderConfig::SAMPLES_RANGE)
                .logarithmic(true)
                .text("Samples"),
        );
        ui.add(egui::Slider::new(&mut config.bounces, RenderConfig::BOUNCES_RANGE).text("Bounces"));
        egui::ComboBox::from_label("Shading")
            .selected_text(config.shading.label())
            .show_ui(ui, |ui| {
                for method in ShadingMethod::ALL {
                    ui.selectable_value(&mut config.shading, method, method.label());
                }
            });
        if config != *session.config() {
            match session.configure(config) {
                Ok(()) => {
                    self.settings.render = config;
                    self.settings.save();
                }
                Err(e) => self.status_message = e.to_string(),
            }
        }

        ui.separator();
        ui.label(RichText::new("Progress").strong());
        let t = session.telemetry();
        ui.add(egui::ProgressBar::new(t.progress()).text(t.pass_text()));
        egui::Grid::new("telemetry").num_columns(2).show(ui, |ui| {
            ui.label("Elapsed");
            ui.monospace(t.elapsed_text());
            ui.end_row();
            ui.label("Remaining");
            ui.monospace(t.eta_text());
            ui.end_row();
            ui.label("Per pass");
            ui.monospace(t.average_text());
            ui.end_row();
        });

        if let Some(scene) = session.scene() {
            ui.separator();
            ui.label(RichText::new("Scene").strong());
            let model = scene.model();
            ui.label(format!("Vertices: {}", model.positions.len()));
            ui.label(format!("Triangles: {}", model.triangles.len()));
            ui.label(format!("Materials: {}", scene.materials().parsed().len()));
        }

        ui.separator();
        ui.small("Left drag: orbit\nRight or Ctrl+left: pan\nShift+left or both: dolly");
    }

    fn status_bar(&self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            if let AppState::Running(session) = &self.state {
                match session.indicator() {
                    LoadingIndicator::Shown => {
                        ui.spinner();
                    }
                    LoadingIndicator::Failed(_) => {
                        ui.colored_label(Color32::from_rgb(220, 80, 80), "load failed");
                    }
                    LoadingIndicator::Hidden => {}
                }
            }
            ui.label(&self.status_message);
        });
    }
}

/// Capabilities of the device egui created for us.
fn probe_capabilities(render_state: &egui_wgpu::RenderState) -> GpuCapabilities {
    let limits = render_state.device.limits();
    let float_color_storage = render_state
        .adapter
        .get_texture_format_features(wgpu::TextureFormat::Rgba32Float)
        .allowed_usages
        .contains(wgpu::TextureUsages::STORAGE_BINDING);
    GpuCapabilities {
        max_texture_array_layers: limits.max_texture_array_layers,
        max_texture_units: limits.max_sampled_textures_per_shader_stage,
        max_renderbuffer_size: limits.max_texture_dimension_2d,
        max_texture_size: limits.max_texture_dimension_2d,
        float_color_storage,
    }
}

impl eframe::App for ViewerApp {
    fn on_exit(&mut self) {
        if let Some(mut worker) = self.worker.take() {
            worker.stop();
        }
        self.settings.save();
    }

    fn update(&mut self, ctx: &egui::Context, frame: &mut eframe::Frame) {
        let _span = tracing::info_span!("viewer_update").entered();

        if matches!(self.state, AppState::Starting) {
            if let Some(render_state) = frame.wgpu_render_state() {
                self.start(render_state);
            }
        }
        if let Some(request) = self.pending_request.take() {
            self.request_load(request);
        }

        self.process_loads();
        self.handle_dropped_files(ctx);

        if ctx.input(|i| i.key_pressed(egui::Key::Escape)) {
            ctx.send_viewport_cmd(egui::ViewportCommand::Close);
            return;
        }

        TopBottomPanel::top("menu_bar").show(ctx, |ui| {
            self.menu_bar(ui);
        });
        TopBottomPanel::bottom("status_bar").show(ctx, |ui| {
            self.status_bar(ui);
        });

        if matches!(self.state, AppState::Running(_)) {
            let response = SidePanel::right("side_panel")
                .default_width(self.settings.side_panel_width)
                .min_width(180.0)
                .max_width(400.0)
                .resizable(true)
                .show(ctx, |ui| {
                    self.side_panel(ui);
                });
            self.settings.side_panel_width = response.response.rect.width();
        }

        CentralPanel::default().show(ctx, |ui| match (&mut self.state, frame.wgpu_render_state()) {
            (AppState::Running(session), Some(render_state)) => {
                if let Err(e) = self.canvas.show(ui, render_state, session) {
                    tracing::warn!(error = %e, "render pass failed");
                    self.status_message = format!("Render error: {e}");
                }
            }
            (AppState::Failed(msg), _) => {
                ui.centered_and_justified(|ui| {
                    ui.colored_label(
                        Color32::from_rgb(220, 80, 80),
                        format!("This GPU cannot run the path tracer:\n{msg}"),
                    );
                });
            }
            _ => {
                ui.centered_and_justified(|ui| ui.label("Initializing..."));
            }
        });

        ctx.input(|i| {
            if let Some(rect) = i.viewport().inner_rect {
                self.settings.window_width = rect.width();
                self.settings.window_height = rect.height();
            }
            if let Some(pos) = i.viewport().outer_rect {
                self.settings.window_x = Some(pos.min.x);
                self.settings.window_y = Some(pos.min.y);
            }
        });

        // Keep ticking until converged; idle otherwise.
        if let AppState::Running(session) = &self.state {
            let loading = matches!(session.indicator(), LoadingIndicator::Shown);
            if !session.scheduler().is_converged() || loading {
                ctx.request_repaint();
            }
        }
    }
}
