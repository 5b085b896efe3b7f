//! wgpu Sample and Resolve stages.
//!
//! ## Usage
//! ```ignore
//! let mut stages = GpuStages::new(device, queue, target_format);
//! stages.resize(width, height)?;     // creates accumulation resources
//! stages.upload_scene(&scene)?;      // BVH, triangles, materials
//! // per pass, driven by RenderSession::tick:
//! stages.sample(&frame)?;            // one sample into the accumulation pair
//! stages.resolve(&frame)?;           // average + gamma into display_view()
//! ```

use bytemuck::{Pod, Zeroable};
use wgpu::util::DeviceExt;

use super::accumulation::{AccumulationResources, ACCUM_FORMAT};
use super::gpu_data::GpuSceneData;
use crate::progressive::{PassFrame, PassStages};
use crate::scene::SceneGraph;
use crate::util::{Error, Result};

const SAMPLE_WGSL: &str = include_str!("sample.wgsl");
const RESOLVE_WGSL: &str = include_str!("resolve.wgsl");

/// Must match @workgroup_size in sample.wgsl.
const WG_SIZE: u32 = 8;

/// Per-pass uniform matching `Frame` in sample.wgsl.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct SampleUniform {
    /// Camera world transform (+Y forward, +Z up).
    pub camera: [[f32; 4]; 4],
    pub size: [u32; 2],
    /// 1-based; pass 1 ignores the previous sum.
    pub pass_index: u32,
    pub bounces: u32,
    pub shading: u32,
    pub tri_count: u32,
    pub material_count: u32,
    pub tan_half_fov: f32,
}

impl SampleUniform {
    pub fn new(frame: &PassFrame<'_>, size: (u32, u32), scene: &SceneCounts) -> Self {
        Self {
            camera: frame.camera.to_cols_array_2d(),
            size: [size.0, size.1],
            pass_index: frame.pass,
            bounces: frame.config.bounces,
            shading: frame.config.shading.gpu_index(),
            tri_count: scene.triangles,
            material_count: scene.materials,
            tan_half_fov: (frame.config.fov_radians() * 0.5).tan(),
        }
    }
}

/// Uniform matching `Resolve` in resolve.wgsl.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
struct ResolveUniform {
    pass_count: u32,
    encode_gamma: u32,
    _pad: [u32; 2],
}

/// Sizes of the uploaded scene.
#[derive(Debug, Clone, Copy, Default)]
pub struct SceneCounts {
    pub triangles: u32,
    pub materials: u32,
}

struct SceneBuffers {
    nodes: wgpu::Buffer,
    triangles: wgpu::Buffer,
    materials: wgpu::Buffer,
    counts: SceneCounts,
}

fn storage_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::COMPUTE,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Storage { read_only: true },
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

fn uniform_entry(binding: u32, visibility: wgpu::ShaderStages) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

fn texture_entry(binding: u32, visibility: wgpu::ShaderStages, sample_type: wgpu::TextureSampleType) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility,
        ty: wgpu::BindingType::Texture {
            multisampled: false,
            view_dimension: wgpu::TextureViewDimension::D2,
            sample_type,
        },
        count: None,
    }
}

/// Compute pipeline adding one sample per pixel per pass.
pub struct SampleStage {
    pipeline: wgpu::ComputePipeline,
    bind_group_layout: wgpu::BindGroupLayout,
    uniform_buffer: wgpu::Buffer,
    scene: Option<SceneBuffers>,
}

impl SampleStage {
    pub fn new(device: &wgpu::Device) -> Self {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("sample_shader"),
            source: wgpu::ShaderSource::Wgsl(SAMPLE_WGSL.into()),
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("sample_bgl"),
            entries: &[
                storage_entry(0),
                storage_entry(1),
                storage_entry(2),
                uniform_entry(3, wgpu::ShaderStages::COMPUTE),
                texture_entry(4, wgpu::ShaderStages::COMPUTE, wgpu::TextureSampleType::Float { filterable: false }),
                texture_entry(5, wgpu::ShaderStages::COMPUTE, wgpu::TextureSampleType::Uint),
                wgpu::BindGroupLayoutEntry {
                    binding: 6,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::StorageTexture {
                        access: wgpu::StorageTextureAccess::WriteOnly,
                        format: ACCUM_FORMAT,
                        view_dimension: wgpu::TextureViewDimension::D2,
                    },
                    count: None,
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("sample_pipeline_layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some("sample_pipeline"),
            layout: Some(&pipeline_layout),
            module: &shader,
            entry_point: Some("main"),
            compilation_options: Default::default(),
            cache: None,
        });

        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("sample_uniform"),
            size: std::mem::size_of::<SampleUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        Self { pipeline, bind_group_layout, uniform_buffer, scene: None }
    }

    /// Replace the scene storage buffers.
    pub fn upload_scene(&mut self, device: &wgpu::Device, data: &GpuSceneData) {
        // wgpu rejects zero-sized bindings.
        let init = |label: &str, bytes: &[u8], placeholder: usize| {
            let zeros = vec![0u8; placeholder];
            device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(label),
                contents: if bytes.is_empty() { &zeros } else { bytes },
                usage: wgpu::BufferUsages::STORAGE,
            })
        };

        self.scene = Some(SceneBuffers {
            nodes: init("sample_nodes", data.nodes_bytes(), 32),
            triangles: init("sample_triangles", data.triangles_bytes(), 96),
            materials: init("sample_materials", data.materials_bytes(), 48),
            counts: SceneCounts {
                triangles: data.tri_count(),
                materials: data.materials.len() as u32,
            },
        });
    }

    pub fn counts(&self) -> Option<SceneCounts> {
        self.scene.as_ref().map(|s| s.counts)
    }

    /// Dispatch one pass: read the current sum, write the next, swap.
    pub fn dispatch(
        &self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        accum: &mut AccumulationResources,
        frame: &PassFrame<'_>,
    ) -> Result<()> {
        let scene = self.scene.as_ref().ok_or_else(|| Error::other("no scene uploaded"))?;
        let (width, height) = accum.size();

        let uniform = SampleUniform::new(frame, (width, height), &scene.counts);
        queue.write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(&uniform));

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("sample_bg"),
            layout: &self.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry { binding: 0, resource: scene.nodes.as_entire_binding() },
                wgpu::BindGroupEntry { binding: 1, resource: scene.triangles.as_entire_binding() },
                wgpu::BindGroupEntry { binding: 2, resource: scene.materials.as_entire_binding() },
                wgpu::BindGroupEntry { binding: 3, resource: self.uniform_buffer.as_entire_binding() },
                wgpu::BindGroupEntry { binding: 4, resource: wgpu::BindingResource::TextureView(accum.current_view()) },
                wgpu::BindGroupEntry { binding: 5, resource: wgpu::BindingResource::TextureView(accum.seeds_view()) },
                wgpu::BindGroupEntry { binding: 6, resource: wgpu::BindingResource::TextureView(accum.next_view()) },
            ],
        });

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("sample_encoder"),
        });
        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("sample_pass"),
                timestamp_writes: None,
            });
            pass.set_pipeline(&self.pipeline);
            pass.set_bind_group(0, &bind_group, &[]);
            pass.dispatch_workgroups(width.div_ceil(WG_SIZE), height.div_ceil(WG_SIZE), 1);
        }
        queue.submit(Some(encoder.finish()));

        accum.swap();
        Ok(())
    }
}

/// Fullscreen pass mapping the running sum to displayable color.
pub struct ResolveStage {
    pipeline: wgpu::RenderPipeline,
    bind_group_layout: wgpu::BindGroupLayout,
    uniform_buffer: wgpu::Buffer,
    format: wgpu::TextureFormat,
    display: Option<(wgpu::Texture, wgpu::TextureView)>,
}

impl ResolveStage {
    pub fn new(device: &wgpu::Device, format: wgpu::TextureFormat) -> Self {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("resolve_shader"),
            source: wgpu::ShaderSource::Wgsl(RESOLVE_WGSL.into()),
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("resolve_bgl"),
            entries: &[
                texture_entry(0, wgpu::ShaderStages::FRAGMENT, wgpu::TextureSampleType::Float { filterable: false }),
                uniform_entry(1, wgpu::ShaderStages::FRAGMENT),
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("resolve_pipeline_layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("resolve_pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                compilation_options: Default::default(),
                buffers: &[],
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState::default(),
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("resolve_uniform"),
            size: std::mem::size_of::<ResolveUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        Self { pipeline, bind_group_layout, uniform_buffer, format, display: None }
    }

    /// Recreate the display texture.
    pub fn resize(&mut self, device: &wgpu::Device, width: u32, height: u32) {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("resolve_display"),
            size: wgpu::Extent3d { width, height, depth_or_array_layers: 1 },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: self.format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        self.display = Some((texture, view));
    }

    pub fn display_view(&self) -> Option<&wgpu::TextureView> {
        self.display.as_ref().map(|(_, view)| view)
    }

    pub fn draw(
        &self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        accum: &AccumulationResources,
        pass_count: u32,
    ) -> Result<()> {
        let (_, target) = self.display.as_ref().ok_or_else(|| Error::other("display target not created"))?;

        let uniform = ResolveUniform {
            pass_count: pass_count.max(1),
            encode_gamma: u32::from(!self.format.is_srgb()),
            _pad: [0; 2],
        };
        queue.write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(&uniform));

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("resolve_bg"),
            layout: &self.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry { binding: 0, resource: wgpu::BindingResource::TextureView(accum.current_view()) },
                wgpu::BindGroupEntry { binding: 1, resource: self.uniform_buffer.as_entire_binding() },
            ],
        });

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("resolve_encoder"),
        });
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("resolve_pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: target,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            pass.set_pipeline(&self.pipeline);
            pass.set_bind_group(0, &bind_group, &[]);
            pass.draw(0..3, 0..1); // fullscreen triangle
        }
        queue.submit(Some(encoder.finish()));
        Ok(())
    }
}

/// Size-dependent resources, created on the first resize.
enum Targets {
    Uninitialized,
    Ready(AccumulationResources),
}

/// GPU backend for a render session.
///
/// Pipelines are compiled once in [`GpuStages::new`]. Size-dependent
/// resources go from uninitialized to ready on the first
/// [`PassStages::resize`] and are replaced on later resizes.
pub struct GpuStages {
    device: wgpu::Device,
    queue: wgpu::Queue,
    sample: SampleStage,
    resolve: ResolveStage,
    targets: Targets,
    /// Bumped whenever the display texture is recreated.
    generation: u64,
}

impl GpuStages {
    pub fn new(device: wgpu::Device, queue: wgpu::Queue, format: wgpu::TextureFormat) -> Self {
        let sample = SampleStage::new(&device);
        let resolve = ResolveStage::new(&device, format);
        Self { device, queue, sample, resolve, targets: Targets::Uninitialized, generation: 0 }
    }

    pub fn display_view(&self) -> Option<&wgpu::TextureView> {
        self.resolve.display_view()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.targets, Targets::Ready(_)) && self.sample.counts().is_some()
    }
}

fn not_ready() -> Error {
    Error::other("render targets not initialized")
}

impl PassStages for GpuStages {
    fn upload_scene(&mut self, scene: &SceneGraph) -> Result<()> {
        let _span = tracing::info_span!("upload_scene").entered();
        self.sample.upload_scene(&self.device, scene.gpu_data());
        Ok(())
    }

    fn resize(&mut self, width: u32, height: u32) -> Result<()> {
        let limit = self.device.limits().max_texture_dimension_2d;
        if width > limit || height > limit {
            return Err(Error::other(format!("canvas {width}x{height} exceeds texture limit {limit}")));
        }
        tracing::debug!(width, height, "recreating accumulation resources");
        self.targets = Targets::Ready(AccumulationResources::new(&self.device, &self.queue, width, height));
        self.resolve.resize(&self.device, width, height);
        self.generation += 1;
        Ok(())
    }

    fn sample(&mut self, frame: &PassFrame<'_>) -> Result<()> {
        let Targets::Ready(accum) = &mut self.targets else {
            return Err(not_ready());
        };
        self.sample.dispatch(&self.device, &self.queue, accum, frame)
    }

    fn resolve(&mut self, frame: &PassFrame<'_>) -> Result<()> {
        let Targets::Ready(accum) = &self.targets else {
            return Err(not_ready());
        };
        self.resolve.draw(&self.device, &self.queue, accum, frame.pass)
    }
}
