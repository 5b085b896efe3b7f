//! Viewer: eframe window hosting a progressive path-traced canvas.

mod app;
mod settings;
mod viewport;

pub use settings::Settings;

use anyhow::Result;
use tracing_subscriber::prelude::*;

use crate::progressive::CapabilityThresholds;
use crate::scene::LoadRequest;

/// Run the viewer, optionally loading a model once the GPU is ready.
pub fn run(initial: Option<LoadRequest>) -> Result<()> {
    env_logger::init();

    let trace_guard = init_tracing();

    std::panic::set_hook(Box::new(|info| {
        let msg = info
            .payload()
            .downcast_ref::<String>()
            .map(|s| s.as_str())
            .or_else(|| info.payload().downcast_ref::<&str>().copied())
            .unwrap_or("Unknown error");

        if msg.contains("wgpu") || msg.contains("shader") {
            eprintln!("\n[GPU Error] {}", msg);
        } else {
            eprintln!("\n[Error] {}", msg);
        }
        if let Some(loc) = info.location() {
            eprintln!("  at {}:{}:{}", loc.file(), loc.line(), loc.column());
        }
    }));

    let settings = Settings::load();

    let options = eframe::NativeOptions {
        viewport: {
            let mut vp = egui::ViewportBuilder::default()
                .with_inner_size([settings.window_width, settings.window_height])
                .with_title("pathview")
                .with_drag_and_drop(true);
            if let (Some(x), Some(y)) = (settings.window_x, settings.window_y) {
                vp = vp.with_position([x, y]);
            }
            vp
        },
        renderer: eframe::Renderer::Wgpu,
        wgpu_options: egui_wgpu::WgpuConfiguration {
            wgpu_setup: egui_wgpu::WgpuSetup::CreateNew(egui_wgpu::WgpuSetupCreateNew {
                device_descriptor: std::sync::Arc::new(|adapter| {
                    let base_limits = if adapter.get_info().backend == wgpu::Backend::Gl {
                        wgpu::Limits::downlevel_webgl2_defaults()
                    } else {
                        wgpu::Limits::default()
                    };
                    // Ask for what the capability gate checks, as far as the
                    // adapter goes; the gate rejects anything short.
                    let supported = adapter.limits();
                    let min = CapabilityThresholds::default();
                    wgpu::DeviceDescriptor {
                        label: Some("pathview device"),
                        required_limits: wgpu::Limits {
                            max_texture_dimension_2d: supported
                                .max_texture_dimension_2d
                                .min(min.texture_size.max(min.renderbuffer_size)),
                            max_texture_array_layers: supported
                                .max_texture_array_layers
                                .min(min.texture_array_layers),
                            max_sampled_textures_per_shader_stage: supported
                                .max_sampled_textures_per_shader_stage
                                .min(min.texture_units),
                            ..base_limits
                        },
                        ..Default::default()
                    }
                }),
                ..Default::default()
            }),
            ..Default::default()
        },
        ..Default::default()
    };

    eframe::run_native(
        "pathview",
        options,
        Box::new(move |cc| Ok(Box::new(app::ViewerApp::new(cc, initial.clone(), trace_guard)))),
    )
    .map_err(|e| anyhow::anyhow!("Failed to run: {}", e))
}

/// Chrome trace output with `PATHVIEW_TRACE=1`, otherwise a fmt layer
/// filtered by `RUST_LOG`.
fn init_tracing() -> Option<tracing_chrome::FlushGuard> {
    if std::env::var("PATHVIEW_TRACE").ok().as_deref() == Some("1") {
        let (chrome_layer, guard) = tracing_chrome::ChromeLayerBuilder::new().file("trace.json").build();
        let subscriber = tracing_subscriber::registry().with(chrome_layer);
        return tracing::subscriber::set_global_default(subscriber).ok().map(|_| guard);
    }

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let subscriber = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer());
    let _ = tracing::subscriber::set_global_default(subscriber);
    None
}
