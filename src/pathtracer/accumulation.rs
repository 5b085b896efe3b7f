//! Accumulation resources: a ping-pong pair of float color targets and a
//! per-pixel random seed texture, all sized to the canvas.
//!
//! Each pass reads the running sum from one target and writes the updated
//! sum to the other, then [`AccumulationResources::swap`] makes the written
//! target current.

use rayon::prelude::*;
use wgpu::util::DeviceExt;

/// Running-sum format; alpha counts samples.
pub const ACCUM_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba32Float;
/// Seed texture format.
pub const SEED_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::R32Uint;

struct Target {
    #[allow(dead_code)]
    texture: wgpu::Texture,
    view: wgpu::TextureView,
}

pub struct AccumulationResources {
    targets: [Target; 2],
    /// Index of the target holding the latest sum.
    current: usize,
    #[allow(dead_code)]
    seeds: wgpu::Texture,
    seeds_view: wgpu::TextureView,
    width: u32,
    height: u32,
}

impl AccumulationResources {
    #[tracing::instrument(skip(device, queue))]
    pub fn new(device: &wgpu::Device, queue: &wgpu::Queue, width: u32, height: u32) -> Self {
        let width = width.max(1);
        let height = height.max(1);
        let targets = [
            Self::create_target(device, width, height, "accum_a"),
            Self::create_target(device, width, height, "accum_b"),
        ];

        let seeds = seed_values(width, height);
        let seeds_texture = device.create_texture_with_data(
            queue,
            &wgpu::TextureDescriptor {
                label: Some("accum_seeds"),
                size: wgpu::Extent3d { width, height, depth_or_array_layers: 1 },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: SEED_FORMAT,
                usage: wgpu::TextureUsages::TEXTURE_BINDING,
                view_formats: &[],
            },
            wgpu::util::TextureDataOrder::LayerMajor,
            bytemuck::cast_slice(&seeds),
        );
        let seeds_view = seeds_texture.create_view(&wgpu::TextureViewDescriptor::default());

        Self {
            targets,
            current: 0,
            seeds: seeds_texture,
            seeds_view,
            width,
            height,
        }
    }

    fn create_target(device: &wgpu::Device, width: u32, height: u32, label: &str) -> Target {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d { width, height, depth_or_array_layers: 1 },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: ACCUM_FORMAT,
            usage: wgpu::TextureUsages::STORAGE_BINDING | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Target { texture, view }
    }

    /// Target holding the latest sum.
    pub fn current_view(&self) -> &wgpu::TextureView {
        &self.targets[self.current].view
    }

    /// Target the next pass writes.
    pub fn next_view(&self) -> &wgpu::TextureView {
        &self.targets[1 - self.current].view
    }

    /// Make the target just written current.
    pub fn swap(&mut self) {
        self.current = 1 - self.current;
    }

    pub fn seeds_view(&self) -> &wgpu::TextureView {
        &self.seeds_view
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

/// One decorrelated seed per pixel, row-major.
pub fn seed_values(width: u32, height: u32) -> Vec<u32> {
    let salt = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0x9e37_79b9_7f4a_7c15);
    (0..width as u64 * height as u64)
        .into_par_iter()
        .map(|i| {
            let s = splitmix64(salt ^ i.wrapping_mul(0x9e37_79b9_7f4a_7c15)) as u32;
            // Zero is a fixed point of the kernel's xorshift.
            if s == 0 { 1 } else { s }
        })
        .collect()
}

fn splitmix64(mut z: u64) -> u64 {
    z = z.wrapping_add(0x9e37_79b9_7f4a_7c15);
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}
