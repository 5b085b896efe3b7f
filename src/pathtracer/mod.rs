//! Path tracer: scene packing on the CPU, sample/resolve stages on the GPU.
//!
//! ## Architecture
//! ```text
//! ObjModel + materials → triangles (rayon) → BVH build (SAH) → GpuSceneData
//!     → Sample Stage (compute, adds one sample per pass into the accumulation pair)
//!     → Resolve Stage (fullscreen blit, sum / pass + gamma)
//! ```
//!
//! The CPU half builds and tests without a GPU. The wgpu stages and the
//! accumulation resources need the `viewer` feature.

pub mod build;
pub mod bvh;
pub mod gpu_data;
pub mod scene_convert;

#[cfg(feature = "viewer")]
pub mod accumulation;
#[cfg(feature = "viewer")]
pub mod compute;

#[cfg(feature = "viewer")]
pub use accumulation::AccumulationResources;
#[cfg(feature = "viewer")]
pub use compute::{GpuStages, ResolveStage, SampleStage, SampleUniform};
pub use gpu_data::GpuSceneData;
