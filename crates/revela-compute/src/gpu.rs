//! wgpu bilateral compute backend.
//!
//! One synchronous dispatch-and-wait per call: upload the interleaved
//! RGB planes, run the 8×8 compute grid, read the result back. Device
//! and pipeline are created once and reused across calls.

use std::sync::Arc;

use bytemuck::{Pod, Zeroable};
use revela_core::LinearImage;
use tracing::debug;
use wgpu::util::DeviceExt;

use crate::error::{ComputeError, ComputeResult};
use crate::shaders;

/// Shader-side parameter block. Layout must match `BilateralParams` in
/// the WGSL source.
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
struct BilateralUniform {
    width: u32,
    height: u32,
    radius: i32,
    _pad: u32,
    inv_2ss: f32,
    inv_2rs: f32,
    _pad2: [f32; 2],
}

/// A ready-to-dispatch GPU bilateral filter.
pub struct GpuBilateral {
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
    pipeline: wgpu::ComputePipeline,
}

impl GpuBilateral {
    /// Check whether any adapter is present, without building a device.
    pub fn is_available() -> bool {
        pollster::block_on(async {
            let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
                backends: wgpu::Backends::all(),
                ..Default::default()
            });
            instance
                .request_adapter(&wgpu::RequestAdapterOptions {
                    power_preference: wgpu::PowerPreference::HighPerformance,
                    compatible_surface: None,
                    force_fallback_adapter: false,
                })
                .await
                .is_some()
        })
    }

    /// Creates the device, queue, and compute pipeline.
    pub fn new() -> ComputeResult<Self> {
        pollster::block_on(Self::new_async())
    }

    async fn new_async() -> ComputeResult<Self> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .ok_or(ComputeError::NoAdapter)?;

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("revela_compute_device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: adapter.limits(),
                    memory_hints: wgpu::MemoryHints::Performance,
                    ..Default::default()
                },
                None,
            )
            .await
            .map_err(|e| ComputeError::DeviceCreation(e.to_string()))?;

        let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("bilateral_shader"),
            source: wgpu::ShaderSource::Wgsl(shaders::BILATERAL.into()),
        });
        let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some("bilateral_pipeline"),
            layout: None,
            module: &module,
            entry_point: Some("main"),
            compilation_options: Default::default(),
            cache: None,
        });

        debug!(adapter = %adapter.get_info().name, "GPU bilateral backend ready");
        Ok(Self {
            device: Arc::new(device),
            queue: Arc::new(queue),
            pipeline,
        })
    }

    /// Runs the bilateral filter on the GPU.
    ///
    /// Semantics match `revela_ops::bilateral_standard`; the caller is
    /// responsible for falling back to the CPU path on error.
    pub fn filter(
        &self,
        src: &LinearImage,
        spatial_sigma: f32,
        range_sigma: f32,
    ) -> ComputeResult<LinearImage> {
        if src.is_empty() || spatial_sigma <= 0.0 || range_sigma <= 0.0 {
            return Ok(src.clone());
        }

        let (w, h) = src.dimensions();
        let interleaved = interleave(src);
        let size_bytes = (interleaved.len() * 4) as u64;

        let src_buf = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("bilateral_src"),
                contents: bytemuck::cast_slice(&interleaved),
                usage: wgpu::BufferUsages::STORAGE,
            });
        let dst_buf = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("bilateral_dst"),
            size: size_bytes,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC,
            mapped_at_creation: false,
        });

        let uniform = BilateralUniform {
            width: w,
            height: h,
            radius: revela_ops::bilateral::kernel_radius(spatial_sigma),
            _pad: 0,
            inv_2ss: 1.0 / (2.0 * spatial_sigma * spatial_sigma),
            inv_2rs: 1.0 / (2.0 * range_sigma * range_sigma),
            _pad2: [0.0; 2],
        };
        let params_buf = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("bilateral_params"),
                contents: bytemuck::bytes_of(&uniform),
                usage: wgpu::BufferUsages::UNIFORM,
            });

        let layout = self.pipeline.get_bind_group_layout(0);
        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("bilateral_bind_group"),
            layout: &layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: src_buf.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: dst_buf.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: params_buf.as_entire_binding(),
                },
            ],
        });

        let staging = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("bilateral_staging"),
            size: size_bytes,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("bilateral_encoder"),
            });
        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("bilateral_pass"),
                timestamp_writes: None,
            });
            pass.set_pipeline(&self.pipeline);
            pass.set_bind_group(0, &bind_group, &[]);
            pass.dispatch_workgroups(w.div_ceil(8), h.div_ceil(8), 1);
        }
        encoder.copy_buffer_to_buffer(&dst_buf, 0, &staging, 0, size_bytes);
        self.queue.submit(std::iter::once(encoder.finish()));

        let slice = staging.slice(..);
        let (tx, rx) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |r| {
            let _ = tx.send(r);
        });
        self.device.poll(wgpu::Maintain::Wait);

        rx.recv()
            .map_err(|_| ComputeError::OperationFailed("map channel closed".into()))?
            .map_err(|e| ComputeError::OperationFailed(format!("map failed: {e}")))?;

        let data = slice.get_mapped_range();
        let result: Vec<f32> = bytemuck::cast_slice(&data).to_vec();
        drop(data);
        staging.unmap();

        Ok(deinterleave(&result, w, h))
    }
}

/// Planar → interleaved RGB for the storage buffer.
fn interleave(img: &LinearImage) -> Vec<f32> {
    let (r, g, b) = img.planes();
    let mut out = Vec::with_capacity(r.len() * 3);
    for i in 0..r.len() {
        out.push(r[i]);
        out.push(g[i]);
        out.push(b[i]);
    }
    out
}

/// Interleaved RGB → planar image.
fn deinterleave(data: &[f32], w: u32, h: u32) -> LinearImage {
    let n = w as usize * h as usize;
    let mut r = Vec::with_capacity(n);
    let mut g = Vec::with_capacity(n);
    let mut b = Vec::with_capacity(n);
    for px in data.chunks_exact(3) {
        r.push(px[0]);
        g.push(px[1]);
        b.push(px[2]);
    }
    LinearImage::from_planes(w, h, r, g, b).expect("buffer sized from dimensions")
}
