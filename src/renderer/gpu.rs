use std::rc::Rc;
use std::sync::Arc;

use bytemuck::{Pod, Zeroable};
use wgpu::util::DeviceExt;

use crate::error::{RenderError, RenderResult};
use crate::renderer::device::{
    PolygonMode, RenderDevice, ShaderProgram, UniformLocation, UniformValue,
};
use crate::renderer::lighting::MAX_LIGHTS;
use crate::renderer::uniforms::UniformSlot;
use crate::terrain::Vertex;

/// Draws recorded per frame; one uniform block each.
const MAX_DRAWS_PER_FRAME: usize = 64;
const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;
const CLEAR_COLOR: wgpu::Color = wgpu::Color {
    r: 0.04,
    g: 0.05,
    b: 0.07,
    a: 1.0,
};

/// Mirror of `Uniforms` in `shaders.wgsl`.
#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
pub struct ShaderUniforms {
    pub mvp: [[f32; 4]; 4],
    pub model: [[f32; 4]; 4],
    pub object_color: [f32; 4],
    pub num_lights: u32,
    pub _padding: [u32; 3],
    pub light_positions: [[f32; 4]; MAX_LIGHTS],
    pub light_colors: [[f32; 4]; MAX_LIGHTS],
}

const _: () = assert!(std::mem::size_of::<ShaderUniforms>() == 672);

impl ShaderUniforms {
    /// Writes `value` into `slot`. Returns false on a type mismatch.
    fn apply(&mut self, slot: UniformSlot, value: UniformValue) -> bool {
        match (slot, value) {
            (UniformSlot::Mvp, UniformValue::Mat4(m)) => self.mvp = m.to_cols_array_2d(),
            (UniformSlot::Model, UniformValue::Mat4(m)) => self.model = m.to_cols_array_2d(),
            (UniformSlot::ObjectColor, UniformValue::Vec3(c)) => {
                self.object_color = c.extend(1.0).to_array();
            }
            (UniformSlot::NumLights, UniformValue::Int(n)) => {
                self.num_lights = n.clamp(0, MAX_LIGHTS as i32) as u32;
            }
            (UniformSlot::LightPosition(i), UniformValue::Vec3(p)) => {
                self.light_positions[i as usize] = p.extend(1.0).to_array();
            }
            (UniformSlot::LightColor(i), UniformValue::Vec3(c)) => {
                self.light_colors[i as usize] = c.extend(1.0).to_array();
            }
            _ => return false,
        }
        true
    }
}

/// Recorded draws keep the buffer alive until the frame is encoded.
pub struct WgpuBuffer {
    buffer: Rc<wgpu::Buffer>,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum PipelineKind {
    TerrainFill,
    TerrainLine,
    TerrainPoint,
    Marker,
}

struct DrawCommand {
    pipeline: PipelineKind,
    buffer: Rc<wgpu::Buffer>,
    vertex_count: u32,
    uniform_offset: u32,
}

struct Pipelines {
    terrain_fill: wgpu::RenderPipeline,
    /// `None` without `POLYGON_MODE_LINE`; wireframe then falls back to fill.
    terrain_line: Option<wgpu::RenderPipeline>,
    terrain_point: wgpu::RenderPipeline,
    marker: wgpu::RenderPipeline,
}

impl Pipelines {
    fn get(&self, kind: PipelineKind) -> &wgpu::RenderPipeline {
        match kind {
            PipelineKind::TerrainFill => &self.terrain_fill,
            PipelineKind::TerrainLine => self.terrain_line.as_ref().unwrap_or(&self.terrain_fill),
            PipelineKind::TerrainPoint => &self.terrain_point,
            PipelineKind::Marker => &self.marker,
        }
    }
}

/// Each draw snapshots its program's staged uniforms into a dynamic-offset
/// slot; [`WgpuDevice::encode`] replays the frame.
pub struct WgpuDevice {
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pipelines: Pipelines,
    uniform_buffer: wgpu::Buffer,
    uniform_bind_group: wgpu::BindGroup,
    uniform_stride: u64,
    staged: [ShaderUniforms; 2],
    frame_uniforms: Vec<u8>,
    commands: Vec<DrawCommand>,
    polygon_mode: PolygonMode,
    overflow_reported: bool,
}

impl WgpuDevice {
    fn new(device: wgpu::Device, queue: wgpu::Queue, color_format: wgpu::TextureFormat) -> Self {
        let features = device.features();

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Terrain Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders.wgsl").into()),
        });

        let block_size = std::mem::size_of::<ShaderUniforms>() as u64;
        let alignment = device.limits().min_uniform_buffer_offset_alignment as u64;
        let uniform_stride = block_size.div_ceil(alignment) * alignment;

        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Draw Uniform Buffer"),
            size: uniform_stride * MAX_DRAWS_PER_FRAME as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Draw Uniform Bind Group Layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: true,
                    min_binding_size: wgpu::BufferSize::new(block_size),
                },
                count: None,
            }],
        });

        let uniform_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Draw Uniform Bind Group"),
            layout: &bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer: &uniform_buffer,
                    offset: 0,
                    size: wgpu::BufferSize::new(block_size),
                }),
            }],
        });

        let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Terrain Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let build = |label: &str,
                     vs: &str,
                     fs: &str,
                     topology: wgpu::PrimitiveTopology,
                     polygon_mode: wgpu::PolygonMode| {
            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(label),
                layout: Some(&layout),
                vertex: wgpu::VertexState {
                    module: &shader,
                    entry_point: Some(vs),
                    buffers: &[Vertex::layout()],
                    compilation_options: Default::default(),
                },
                fragment: Some(wgpu::FragmentState {
                    module: &shader,
                    entry_point: Some(fs),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: color_format,
                        blend: Some(wgpu::BlendState::REPLACE),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                    compilation_options: Default::default(),
                }),
                primitive: wgpu::PrimitiveState {
                    topology,
                    cull_mode: None,
                    polygon_mode,
                    ..Default::default()
                },
                depth_stencil: Some(wgpu::DepthStencilState {
                    format: DEPTH_FORMAT,
                    depth_write_enabled: true,
                    depth_compare: wgpu::CompareFunction::Less,
                    stencil: wgpu::StencilState::default(),
                    bias: wgpu::DepthBiasState::default(),
                }),
                multisample: wgpu::MultisampleState::default(),
                multiview: None,
                cache: None,
            })
        };

        let triangles = wgpu::PrimitiveTopology::TriangleList;
        let terrain_fill = build(
            "Terrain Fill Pipeline",
            "vs_terrain",
            "fs_terrain",
            triangles,
            wgpu::PolygonMode::Fill,
        );

        let terrain_line = if features.contains(wgpu::Features::POLYGON_MODE_LINE) {
            Some(build(
                "Terrain Line Pipeline",
                "vs_terrain",
                "fs_terrain",
                triangles,
                wgpu::PolygonMode::Line,
            ))
        } else {
            tracing::warn!("adapter lacks POLYGON_MODE_LINE, wireframe will draw filled");
            None
        };

        let terrain_point = if features.contains(wgpu::Features::POLYGON_MODE_POINT) {
            build(
                "Terrain Point Pipeline",
                "vs_terrain",
                "fs_terrain",
                triangles,
                wgpu::PolygonMode::Point,
            )
        } else {
            tracing::warn!("adapter lacks POLYGON_MODE_POINT, points mode uses a point list");
            build(
                "Terrain Point List Pipeline",
                "vs_terrain",
                "fs_terrain",
                wgpu::PrimitiveTopology::PointList,
                wgpu::PolygonMode::Fill,
            )
        };

        let marker = build(
            "Light Marker Pipeline",
            "vs_marker",
            "fs_marker",
            triangles,
            wgpu::PolygonMode::Fill,
        );

        Self {
            device,
            queue,
            pipelines: Pipelines {
                terrain_fill,
                terrain_line,
                terrain_point,
                marker,
            },
            uniform_buffer,
            uniform_bind_group,
            uniform_stride,
            staged: [ShaderUniforms::zeroed(); 2],
            frame_uniforms: Vec::with_capacity(uniform_stride as usize * MAX_DRAWS_PER_FRAME),
            commands: Vec::with_capacity(MAX_DRAWS_PER_FRAME),
            polygon_mode: PolygonMode::Fill,
            overflow_reported: false,
        }
    }

    fn pipeline_kind(&self, program: ShaderProgram) -> PipelineKind {
        match (program, self.polygon_mode) {
            (ShaderProgram::Terrain, PolygonMode::Fill) => PipelineKind::TerrainFill,
            (ShaderProgram::Terrain, PolygonMode::Line) => PipelineKind::TerrainLine,
            (ShaderProgram::Terrain, PolygonMode::Point) => PipelineKind::TerrainPoint,
            (ShaderProgram::Marker, _) => PipelineKind::Marker,
        }
    }

    pub fn encode(&mut self, pass: &mut wgpu::RenderPass<'_>) {
        if !self.frame_uniforms.is_empty() {
            self.queue
                .write_buffer(&self.uniform_buffer, 0, &self.frame_uniforms);
        }

        for command in &self.commands {
            pass.set_pipeline(self.pipelines.get(command.pipeline));
            pass.set_bind_group(0, &self.uniform_bind_group, &[command.uniform_offset]);
            pass.set_vertex_buffer(0, command.buffer.slice(..));
            pass.draw(0..command.vertex_count, 0..1);
        }

        self.commands.clear();
        self.frame_uniforms.clear();
    }
}

impl RenderDevice for WgpuDevice {
    type Buffer = WgpuBuffer;

    fn create_vertex_buffer(&mut self, label: &str, vertices: &[Vertex]) -> RenderResult<WgpuBuffer> {
        let contents: &[u8] = bytemuck::cast_slice(vertices);
        let limit = self.device.limits().max_buffer_size;
        if contents.len() as u64 > limit {
            return Err(RenderError::BufferTooLarge {
                label: label.to_string(),
                size: contents.len() as u64,
                limit,
            });
        }

        self.device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
        let buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(label),
                contents,
                usage: wgpu::BufferUsages::VERTEX,
            });
        if let Some(error) = pollster::block_on(self.device.pop_error_scope()) {
            buffer.destroy();
            return Err(RenderError::allocation(label, error));
        }

        tracing::debug!(label, bytes = contents.len(), "vertex buffer created");
        Ok(WgpuBuffer {
            buffer: Rc::new(buffer),
        })
    }

    fn uniform_location(&self, program: ShaderProgram, name: &str) -> Option<UniformLocation> {
        let slot = UniformSlot::parse(name)?;
        UniformSlot::declared_by(program)
            .contains(&slot)
            .then_some(UniformLocation { program, slot })
    }

    fn set_uniform(&mut self, location: UniformLocation, value: UniformValue) {
        let staged = &mut self.staged[location.program.index()];
        if !staged.apply(location.slot, value) {
            tracing::warn!(
                uniform = %location.slot.name(),
                ?value,
                "uniform value does not match the slot type, ignored"
            );
        }
    }

    fn set_polygon_mode(&mut self, mode: PolygonMode) {
        self.polygon_mode = mode;
    }

    fn polygon_mode(&self) -> PolygonMode {
        self.polygon_mode
    }

    fn draw(&mut self, program: ShaderProgram, buffer: &WgpuBuffer, vertex_count: u32) {
        if self.commands.len() >= MAX_DRAWS_PER_FRAME {
            if !self.overflow_reported {
                tracing::warn!(limit = MAX_DRAWS_PER_FRAME, "too many draws this frame, extra draws skipped");
                self.overflow_reported = true;
            }
            return;
        }

        let offset = self.commands.len() * self.uniform_stride as usize;
        let block = bytemuck::bytes_of(&self.staged[program.index()]);
        self.frame_uniforms
            .resize(offset + self.uniform_stride as usize, 0);
        self.frame_uniforms[offset..offset + block.len()].copy_from_slice(block);

        self.commands.push(DrawCommand {
            pipeline: self.pipeline_kind(program),
            buffer: Rc::clone(&buffer.buffer),
            vertex_count,
            uniform_offset: offset as u32,
        });
    }
}

pub struct GpuState {
    pub surface: wgpu::Surface<'static>,
    pub backend: WgpuDevice,
    pub config: wgpu::SurfaceConfiguration,
    pub size: winit::dpi::PhysicalSize<u32>,
    pub depth_texture: wgpu::TextureView,
}

impl GpuState {
    pub async fn new(window: Arc<winit::window::Window>, vsync: bool) -> RenderResult<Self> {
        let size = window.inner_size();

        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let surface = instance.create_surface(window)?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or(RenderError::NoAdapter)?;

        let info = adapter.get_info();
        tracing::info!(name = %info.name, backend = ?info.backend, device_type = ?info.device_type, "adapter selected");

        let wanted = wgpu::Features::POLYGON_MODE_LINE | wgpu::Features::POLYGON_MODE_POINT;
        let features = adapter.features() & wanted;

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("Terrain Device"),
                    required_features: features,
                    required_limits: wgpu::Limits::default(),
                    memory_hints: wgpu::MemoryHints::Performance,
                },
                None,
            )
            .await?;

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .copied()
            .unwrap_or(surface_caps.formats[0]);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: present_mode(vsync),
            alpha_mode: surface_caps.alpha_modes[0],
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let depth_texture = Self::create_depth_texture(&device, &config);
        let backend = WgpuDevice::new(device, queue, config.format);

        Ok(Self {
            surface,
            backend,
            config,
            size,
            depth_texture,
        })
    }

    fn create_depth_texture(
        device: &wgpu::Device,
        config: &wgpu::SurfaceConfiguration,
    ) -> wgpu::TextureView {
        let size = wgpu::Extent3d {
            width: config.width.max(1),
            height: config.height.max(1),
            depth_or_array_layers: 1,
        };

        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Depth Texture"),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });

        texture.create_view(&wgpu::TextureViewDescriptor::default())
    }

    pub fn resize(&mut self, new_size: winit::dpi::PhysicalSize<u32>) {
        if new_size.width > 0 && new_size.height > 0 {
            self.size = new_size;
            self.config.width = new_size.width;
            self.config.height = new_size.height;
            self.surface.configure(&self.backend.device, &self.config);
            self.depth_texture = Self::create_depth_texture(&self.backend.device, &self.config);
        }
    }

    pub fn aspect(&self) -> f32 {
        self.config.width as f32 / self.config.height.max(1) as f32
    }

    pub fn set_vsync(&mut self, enabled: bool) {
        self.config.present_mode = present_mode(enabled);
        self.surface.configure(&self.backend.device, &self.config);
    }

    /// Clears the frame and replays the draws recorded since the last call.
    pub fn render_scene(&mut self, view: &wgpu::TextureView, encoder: &mut wgpu::CommandEncoder) {
        let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Terrain Render Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(CLEAR_COLOR),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &self.depth_texture,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        self.backend.encode(&mut render_pass);
    }
}

fn present_mode(vsync: bool) -> wgpu::PresentMode {
    if vsync {
        wgpu::PresentMode::AutoVsync
    } else {
        wgpu::PresentMode::AutoNoVsync
    }
}
