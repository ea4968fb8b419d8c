use bigplane_mesh::GridMesh;
use bigplane_render::{RenderBackend, RenderError};
use bytemuck::{Pod, Zeroable};
use glam::Mat4;
use wgpu::util::DeviceExt;

use crate::shaders;

const CLEAR_COLOR: wgpu::Color = wgpu::Color::BLACK;

#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
struct Uniforms {
    rotation: [[f32; 4]; 4],
}

/// Surface setup for [`WgpuBackend::new`].
#[derive(Debug, Clone, Copy)]
pub struct BackendOptions {
    pub width: u32,
    pub height: u32,
    /// Wait for vertical blank on present.
    pub vsync: bool,
}

impl Default for BackendOptions {
    fn default() -> Self {
        Self {
            width: 800,
            height: 600,
            vsync: false,
        }
    }
}

/// Handle to a mesh uploaded by [`WgpuBackend`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MeshId(usize);

struct GpuMesh {
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
}

struct Frame {
    output: wgpu::SurfaceTexture,
    view: wgpu::TextureView,
    encoder: wgpu::CommandEncoder,
    cleared: bool,
}

/// wgpu backend owning the surface, device, and the plane pipeline.
pub struct WgpuBackend {
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    pipeline: wgpu::RenderPipeline,
    program_valid: bool,
    uniform_buffer: wgpu::Buffer,
    uniform_bind_group: wgpu::BindGroup,
    meshes: Vec<GpuMesh>,
    frame: Option<Frame>,
    diagnostics: Vec<RenderError>,
    max_buffer_size: u64,
}

impl WgpuBackend {
    /// Create a device for `target` and build the plane pipeline.
    ///
    /// Fails with [`RenderError::Initialization`] when no surface, adapter, or
    /// device can be obtained. Shader compile or link problems are logged and
    /// kept in [`Self::diagnostics`]; construction still succeeds.
    pub fn new(
        target: impl Into<wgpu::SurfaceTarget<'static>>,
        options: BackendOptions,
    ) -> Result<Self, RenderError> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let surface = instance
            .create_surface(target)
            .map_err(|e| RenderError::Initialization(format!("create surface: {e}")))?;

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: Some(&surface),
            force_fallback_adapter: false,
        }))
        .ok_or_else(|| RenderError::Initialization("no compatible GPU adapter".into()))?;

        // Ask for everything the adapter offers; the default 256 MiB buffer
        // cap is far below a 100M-triangle index buffer.
        let (device, queue) = pollster::block_on(adapter.request_device(
            &wgpu::DeviceDescriptor {
                label: Some("bigplane_device"),
                required_features: wgpu::Features::empty(),
                required_limits: adapter.limits(),
                memory_hints: wgpu::MemoryHints::Performance,
            },
            None,
        ))
        .map_err(|e| RenderError::Initialization(format!("request device: {e}")))?;

        device.on_uncaptured_error(Box::new(|err: wgpu::Error| {
            tracing::error!("uncaptured wgpu error: {err}");
        }));

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .copied()
            .or_else(|| surface_caps.formats.first().copied())
            .ok_or_else(|| RenderError::Initialization("surface reports no formats".into()))?;
        let alpha_mode = surface_caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: options.width.max(1),
            height: options.height.max(1),
            present_mode: if options.vsync {
                wgpu::PresentMode::AutoVsync
            } else {
                wgpu::PresentMode::AutoNoVsync
            },
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("rotation_uniform"),
            contents: bytemuck::bytes_of(&Uniforms {
                rotation: Mat4::IDENTITY.to_cols_array_2d(),
            }),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("uniform_bind_group_layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        let uniform_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("uniform_bind_group"),
            layout: &bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("pipeline_layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let mut diagnostics = Vec::new();

        device.push_error_scope(wgpu::ErrorFilter::Validation);
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("plane_shader"),
            source: wgpu::ShaderSource::Wgsl(shaders::PLANE_SHADER.into()),
        });
        if let Some(err) = pollster::block_on(device.pop_error_scope()) {
            tracing::error!("shader compilation failed: {err}");
            diagnostics.push(RenderError::ShaderCompile(err.to_string()));
        }

        device.push_error_scope(wgpu::ErrorFilter::Validation);
        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("plane_pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                compilation_options: Default::default(),
                buffers: &[wgpu::VertexBufferLayout {
                    array_stride: (3 * std::mem::size_of::<f32>()) as u64,
                    step_mode: wgpu::VertexStepMode::Vertex,
                    attributes: &wgpu::vertex_attr_array![0 => Float32x3],
                }],
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: surface_format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                cull_mode: None,
                ..Default::default()
            },
            depth_stencil: None,
            multisample: Default::default(),
            multiview: None,
            cache: None,
        });
        if let Some(err) = pollster::block_on(device.pop_error_scope()) {
            tracing::error!("shader program link failed: {err}");
            diagnostics.push(RenderError::ShaderLink(err.to_string()));
        }

        let max_buffer_size = device.limits().max_buffer_size;
        tracing::info!(
            backend = adapter.get_info().backend.to_str(),
            adapter = %adapter.get_info().name,
            max_buffer_mib = max_buffer_size / (1024 * 1024),
            "GPU initialized"
        );

        Ok(Self {
            surface,
            device,
            queue,
            config,
            pipeline,
            program_valid: diagnostics.is_empty(),
            uniform_buffer,
            uniform_bind_group,
            meshes: Vec::new(),
            frame: None,
            diagnostics,
            max_buffer_size,
        })
    }

    /// Shader compile/link problems collected at startup.
    pub fn diagnostics(&self) -> &[RenderError] {
        &self.diagnostics
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.config.width = width.max(1);
        self.config.height = height.max(1);
        self.surface.configure(&self.device, &self.config);
    }

    fn check_buffer_size(&self, bytes: usize) -> Result<(), RenderError> {
        let bytes = bytes as u64;
        if bytes > self.max_buffer_size {
            return Err(RenderError::MeshTooLarge {
                bytes,
                limit: self.max_buffer_size,
            });
        }
        Ok(())
    }

    fn acquire(&mut self) -> Option<wgpu::SurfaceTexture> {
        match self.surface.get_current_texture() {
            Ok(t) => Some(t),
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                self.surface.configure(&self.device, &self.config);
                None
            }
            Err(wgpu::SurfaceError::Timeout) => {
                tracing::warn!("surface timeout, skipping frame");
                None
            }
            Err(e) => {
                tracing::error!("surface error: {e}");
                None
            }
        }
    }

    fn clear_pass<'a>(
        encoder: &'a mut wgpu::CommandEncoder,
        view: &'a wgpu::TextureView,
    ) -> wgpu::RenderPass<'a> {
        encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("plane_pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(CLEAR_COLOR),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            ..Default::default()
        })
    }
}

impl RenderBackend for WgpuBackend {
    type Mesh = MeshId;

    fn upload_mesh(&mut self, mesh: &GridMesh) -> Result<MeshId, RenderError> {
        self.check_buffer_size(mesh.vertex_bytes().len())?;
        self.check_buffer_size(mesh.index_bytes().len())?;

        let vertex_buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("plane_vertex_buffer"),
                contents: mesh.vertex_bytes(),
                usage: wgpu::BufferUsages::VERTEX,
            });
        let index_buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("plane_index_buffer"),
                contents: mesh.index_bytes(),
                usage: wgpu::BufferUsages::INDEX,
            });

        self.meshes.push(GpuMesh {
            vertex_buffer,
            index_buffer,
        });
        Ok(MeshId(self.meshes.len() - 1))
    }

    fn begin_frame(&mut self) {
        let Some(output) = self.acquire() else {
            self.frame = None;
            return;
        };
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("frame_encoder"),
            });
        self.frame = Some(Frame {
            output,
            view,
            encoder,
            cleared: false,
        });
    }

    fn set_rotation(&mut self, rotation: &Mat4) {
        self.queue.write_buffer(
            &self.uniform_buffer,
            0,
            bytemuck::bytes_of(&Uniforms {
                rotation: rotation.to_cols_array_2d(),
            }),
        );
    }

    fn draw_indexed(&mut self, mesh: MeshId, index_count: u32) {
        let Some(frame) = self.frame.as_mut() else {
            return;
        };
        let Some(gpu_mesh) = self.meshes.get(mesh.0) else {
            tracing::warn!(?mesh, "draw with unknown mesh handle");
            return;
        };

        let mut pass = Self::clear_pass(&mut frame.encoder, &frame.view);
        frame.cleared = true;
        if !self.program_valid {
            return;
        }
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, &self.uniform_bind_group, &[]);
        pass.set_vertex_buffer(0, gpu_mesh.vertex_buffer.slice(..));
        pass.set_index_buffer(gpu_mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
        pass.draw_indexed(0..index_count, 0, 0..1);
    }

    fn present(&mut self) {
        let Some(mut frame) = self.frame.take() else {
            return;
        };
        if !frame.cleared {
            Self::clear_pass(&mut frame.encoder, &frame.view);
        }
        self.queue.submit(std::iter::once(frame.encoder.finish()));
        frame.output.present();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_block_is_one_mat4() {
        assert_eq!(std::mem::size_of::<Uniforms>(), 64);
        let u = Uniforms {
            rotation: Mat4::IDENTITY.to_cols_array_2d(),
        };
        let floats: &[f32] = bytemuck::cast_slice(bytemuck::bytes_of(&u));
        assert_eq!(floats[0], 1.0);
        assert_eq!(floats[5], 1.0);
        assert_eq!(floats[1], 0.0);
    }

    #[test]
    fn column_major_upload_of_rotation() {
        let m = Mat4::from_rotation_z(std::f32::consts::FRAC_PI_2);
        let cols = m.to_cols_array_2d();
        // first column is the image of +x, which a quarter turn sends to +y
        assert!(cols[0][0].abs() < 1e-6);
        assert!((cols[0][1] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn default_options_open_800_by_600_without_vsync() {
        let options = BackendOptions::default();
        assert_eq!((options.width, options.height), (800, 600));
        assert!(!options.vsync);
    }
}
