//! pathview CLI - view and inspect Wavefront OBJ/MTL models.

use std::env;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::Instant;

use pathview::scene::{load_scene, LoadRequest};

/// Verbosity level (thread-safe)
const LOG_QUIET: u8 = 0;
const LOG_INFO: u8 = 1;
const LOG_DEBUG: u8 = 2;
const LOG_TRACE: u8 = 3;

static LOG_LEVEL: AtomicU8 = AtomicU8::new(LOG_INFO);

#[inline]
fn log_level() -> u8 {
    LOG_LEVEL.load(Ordering::Relaxed)
}

#[inline]
fn set_log_level(level: u8) {
    LOG_LEVEL.store(level, Ordering::Relaxed);
}

macro_rules! info {
    ($($arg:tt)*) => {
        if log_level() >= LOG_INFO {
            println!("[INFO] {}", format!($($arg)*));
        }
    };
}

macro_rules! debug {
    ($($arg:tt)*) => {
        if log_level() >= LOG_DEBUG {
            println!("[DEBUG] {}", format!($($arg)*));
        }
    };
}

macro_rules! trace {
    ($($arg:tt)*) => {
        if log_level() >= LOG_TRACE {
            println!("[TRACE] {}", format!($($arg)*));
        }
    };
}

fn main() {
    let args: Vec<String> = env::args().collect();

    let mut filtered_args: Vec<&str> = Vec::new();
    for arg in &args[1..] {
        match arg.as_str() {
            "-v" | "--verbose" => set_log_level(LOG_DEBUG),
            "-vv" | "--trace" => set_log_level(LOG_TRACE),
            "-q" | "--quiet" => set_log_level(LOG_QUIET),
            _ => filtered_args.push(arg),
        }
    }

    let Some(&command) = filtered_args.first() else {
        cmd_view(None);
        return;
    };

    match command {
        "view" | "v" => cmd_view(request_from(&filtered_args[1..])),
        "info" | "i" => match request_from(&filtered_args[1..]) {
            Some(request) => cmd_info(&request),
            None => {
                eprintln!("Error: missing file argument");
                eprintln!("Usage: pathview info <model.obj> [model.mtl]");
                std::process::exit(1);
            }
        },
        "help" | "h" | "-h" | "--help" => print_help(),
        "version" | "-V" | "--version" => println!("{}", version_line()),
        // A bare model path opens it in the viewer
        other if other.to_ascii_lowercase().ends_with(".obj") => cmd_view(request_from(&filtered_args)),
        other => {
            eprintln!("Unknown command: {}", other);
            eprintln!();
            print_help();
            std::process::exit(1);
        }
    }
}

/// `<model.obj> [model.mtl]`
fn request_from(args: &[&str]) -> Option<LoadRequest> {
    let geometry = args.first()?;
    let mut request = LoadRequest::new(PathBuf::from(geometry));
    if let Some(materials) = args.get(1) {
        request = request.with_materials(PathBuf::from(materials));
    }
    Some(request)
}

fn version_line() -> String {
    let date = option_env!("PATHVIEW_BUILD_DATE").unwrap_or("unknown");
    format!("pathview {} ({})", env!("CARGO_PKG_VERSION"), date)
}

fn print_help() {
    println!("{} - progressive path-traced OBJ/MTL viewer", version_line());
    println!();
    println!("USAGE:");
    println!("    pathview [OPTIONS] <COMMAND> [ARGS]");
    println!();
    println!("COMMANDS:");
    println!("    v, view   [model.obj] [model.mtl]   Open the viewer (built-in scene if no model)");
    println!("    i, info   <model.obj> [model.mtl]   Show geometry and material statistics");
    println!("    h, help                             Show this help");
    println!("    version                             Show version and build date");
    println!();
    println!("OPTIONS:");
    println!("    -v, --verbose    Show debug output");
    println!("    -vv, --trace     Show trace output (very verbose)");
    println!("    -q, --quiet      Suppress all output");
    println!();
    println!("CONTROLS:");
    println!("    Left drag                 Orbit");
    println!("    Right drag, Ctrl+left     Pan");
    println!("    Shift+left, left+right    Dolly");
    println!();
    println!("NOTES:");
    println!("    - Without a material file, an mtllib next to the model is used if present");
    println!("    - Set PATHVIEW_TRACE=1 to write a Chrome trace to trace.json");
    println!("    - Viewer requires --features viewer (enabled by default)");
}

fn cmd_view(request: Option<LoadRequest>) {
    #[cfg(feature = "viewer")]
    {
        if let Some(r) = &request {
            info!("Opening viewer with {}", r.geometry.display());
        }
        if let Err(e) = pathview::viewer::run(request) {
            eprintln!("Viewer error: {}", e);
            std::process::exit(1);
        }
    }
    #[cfg(not(feature = "viewer"))]
    {
        let _ = request;
        eprintln!("Viewer not available. Rebuild with: cargo build --features viewer");
        std::process::exit(1);
    }
}

fn cmd_info(request: &LoadRequest) {
    info!("Loading model: {}", request.geometry.display());
    let start = Instant::now();

    let scene = match load_scene(request) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Failed to load {}: {}", request.geometry.display(), e);
            std::process::exit(1);
        }
    };
    debug!("Loaded in {:.1}ms", start.elapsed().as_secs_f64() * 1000.0);

    let model = scene.model();
    let bounds = scene.bounds();
    println!("Model: {}", request.geometry.display());
    println!("  Vertices:   {}", model.positions.len());
    println!("  Normals:    {}", model.normals.len());
    println!("  Tex coords: {}", model.tex_coord_count);
    println!("  Faces:      {} ({} triangles)", model.face_count, model.triangles.len());
    println!(
        "  Bounds:     ({:.3}, {:.3}, {:.3}) - ({:.3}, {:.3}, {:.3})",
        bounds.min.x, bounds.min.y, bounds.min.z, bounds.max.x, bounds.max.y, bounds.max.z
    );
    println!("  BVH nodes:  {}", scene.gpu_data().nodes.len());
    if !model.material_libs.is_empty() {
        println!("  mtllib:     {}", model.material_libs.join(", "));
    }
    println!();

    let materials = scene.materials().parsed();
    println!("Materials: {}", materials.len());
    for m in materials {
        println!("  {}", m.name);
        trace!("    {:?}", m);
        println!("    Kd {:.3} {:.3} {:.3}", m.diffuse.x, m.diffuse.y, m.diffuse.z);
        if m.is_emissive() {
            println!("    Ke {:.3} {:.3} {:.3}", m.emissive.x, m.emissive.y, m.emissive.z);
        }
        if m.specular != glam::Vec3::ZERO {
            println!("    Ks {:.3} {:.3} {:.3}  Ns {}", m.specular.x, m.specular.y, m.specular.z, m.specular_exponent);
        }
        if m.dissolve < 1.0 {
            println!("    d  {}", m.dissolve);
        }
        for (kind, path) in &m.texture_maps {
            println!("    {:?} map: {}", kind, path);
        }
    }

    let unresolved: Vec<&str> = model
        .material_names
        .iter()
        .filter(|name| scene.materials().slot(name).is_none())
        .map(String::as_str)
        .collect();
    if !unresolved.is_empty() {
        println!();
        println!("Undefined materials (rendered with defaults): {}", unresolved.join(", "));
    }
}
