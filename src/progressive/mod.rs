//! Progressive rendering: configuration, pass scheduling, camera controls,
//! capability gate and the session tying them together.

pub mod capability;
pub mod config;
pub mod controls;
pub mod scheduler;
pub mod session;
pub mod telemetry;

pub use capability::{check_capabilities, check_capabilities_with, CapabilityThresholds, GpuCapabilities};
pub use config::{RenderConfig, ShadingMethod};
pub use controls::{
    CameraControls, CameraMotion, CanvasRect, ControlScalars, Modifiers, PointerButton, PointerEvent,
};
pub use scheduler::{PassFrame, PassStages, ProgressiveScheduler};
pub use session::{LoadOutcome, LoadingIndicator, RenderSession, SessionCommand};
pub use telemetry::Telemetry;
