//! # pathview
//!
//! Progressive GPU path-traced viewer for Wavefront OBJ/MTL models.
//!
//! A loaded model becomes a [`scene::SceneGraph`]: a small transform
//! hierarchy (orbit target, camera, mesh) plus geometry, materials and the
//! packed BVH the sample kernel traverses. A [`progressive::RenderSession`]
//! owns the scene, turns pointer input into camera motion, and drives one
//! sample pass per display refresh until the configured sample count is
//! reached, restarting whenever the camera, configuration, canvas or scene
//! changes.
//!
//! ## Modules
//!
//! - [`util`] - Error type and math helpers
//! - [`scene`] - Transform nodes, OBJ/MTL parsers, scene graph, loading
//! - [`progressive`] - Configuration, scheduler, camera controls, session
//! - [`pathtracer`] - BVH and GPU records; wgpu stages with `viewer`
//! - `viewer` - eframe application (feature `viewer`)
//!
//! ## Example
//!
//! ```ignore
//! use pathview::scene::{load_scene, LoadRequest};
//!
//! let scene = load_scene(&LoadRequest::new("suzanne.obj"))?;
//! println!("{} triangles", scene.model().triangles.len());
//! ```

pub mod pathtracer;
pub mod progressive;
pub mod scene;
pub mod util;

// 3D Viewer (optional, enabled with "viewer" feature)
#[cfg(feature = "viewer")]
pub mod viewer;

pub use util::{Error, Result};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::progressive::{
        PassFrame, PassStages, PointerEvent, RenderConfig, RenderSession, ShadingMethod, Telemetry,
    };
    pub use crate::scene::{load_scene, LoadRequest, MaterialRecord, ObjModel, SceneGraph};
    pub use crate::util::{Error, Result};
}
