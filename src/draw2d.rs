//! Immediate-mode 2D drawing for scene content.
//!
//! Draw calls are batched per texture and flushed in one go into whatever
//! render pass is currently bound — during capture that is the offscreen
//! target, which is how scene content ends up in front of the grade pass.

use crate::gpu::GpuContext;
use crate::quad::{UvRect, quad_corners, uv_rect};
use crate::shader::{CompileError, ShaderKind, ShaderStage};
use crate::texture::{Images, TextureId};

/// Straight-alpha RGBA color.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const WHITE: Color = Color::rgb(1.0, 1.0, 1.0);
    pub const BLACK: Color = Color::rgb(0.0, 0.0, 0.0);

    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    pub const fn rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    fn to_array(self) -> [f32; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

/// Vertex for 2D sprite rendering.
#[repr(C)]
#[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex2d {
    pub position: [f32; 2],
    pub uv: [f32; 2],
    pub color: [f32; 4],
}

impl Vertex2d {
    pub const LAYOUT: wgpu::VertexBufferLayout<'static> = wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<Vertex2d>() as u64,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &[
            wgpu::VertexAttribute {
                offset: 0,
                shader_location: 0,
                format: wgpu::VertexFormat::Float32x2,
            },
            wgpu::VertexAttribute {
                offset: 8,
                shader_location: 1,
                format: wgpu::VertexFormat::Float32x2,
            },
            wgpu::VertexAttribute {
                offset: 16,
                shader_location: 2,
                format: wgpu::VertexFormat::Float32x4,
            },
        ],
    };
}

#[repr(C)]
#[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct ScreenUniforms {
    resolution: [f32; 2],
    _padding: [f32; 2],
}

const MAX_VERTICES: usize = 16384;

/// Batched textured-quad renderer.
pub struct Draw2d {
    solid_pipeline: wgpu::RenderPipeline,
    textured_pipeline: wgpu::RenderPipeline,

    vertex_buffer: wgpu::Buffer,
    uniform_buffer: wgpu::Buffer,
    uniform_bind_group: wgpu::BindGroup,
    texture_bind_group_layout: wgpu::BindGroupLayout,

    // Per-texture bind groups, grown lazily as textures are registered.
    texture_bind_groups: Vec<Option<wgpu::BindGroup>>,

    solid_vertices: Vec<Vertex2d>,
    sprite_batches: Vec<(TextureId, Vec<Vertex2d>)>,
}

impl Draw2d {
    pub fn new(gpu: &GpuContext) -> Result<Self, CompileError> {
        let device = &gpu.device;

        let vertex =
            ShaderStage::compile(gpu, include_str!("shaders/sprite.vert"), ShaderKind::Vertex)?;
        let textured_fragment =
            ShaderStage::compile(gpu, include_str!("shaders/sprite.frag"), ShaderKind::Fragment)?;
        let solid_fragment =
            ShaderStage::compile(gpu, include_str!("shaders/solid.frag"), ShaderKind::Fragment)?;

        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Draw2d Uniforms"),
            size: std::mem::size_of::<ScreenUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let uniform_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Draw2d Uniform Layout"),
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
            label: Some("Draw2d Uniform Bind Group"),
            layout: &uniform_bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        let texture_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Draw2d Texture Layout"),
                entries: &[
                    wgpu::BindGroupLayoutEntry {
                        binding: 0,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Texture {
                            sample_type: wgpu::TextureSampleType::Float { filterable: true },
                            view_dimension: wgpu::TextureViewDimension::D2,
                            multisampled: false,
                        },
                        count: None,
                    },
                    wgpu::BindGroupLayoutEntry {
                        binding: 1,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                        count: None,
                    },
                ],
            });

        let solid_pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Draw2d Solid Pipeline Layout"),
            bind_group_layouts: &[&uniform_bind_group_layout],
            push_constant_ranges: &[],
        });

        let textured_pipeline_layout =
            device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("Draw2d Textured Pipeline Layout"),
                bind_group_layouts: &[&uniform_bind_group_layout, &texture_bind_group_layout],
                push_constant_ranges: &[],
            });

        let blend_state = wgpu::BlendState {
            color: wgpu::BlendComponent {
                src_factor: wgpu::BlendFactor::SrcAlpha,
                dst_factor: wgpu::BlendFactor::OneMinusSrcAlpha,
                operation: wgpu::BlendOperation::Add,
            },
            alpha: wgpu::BlendComponent {
                src_factor: wgpu::BlendFactor::One,
                dst_factor: wgpu::BlendFactor::OneMinusSrcAlpha,
                operation: wgpu::BlendOperation::Add,
            },
        };

        let make_pipeline = |label: &str,
                             layout: &wgpu::PipelineLayout,
                             fragment: &ShaderStage|
         -> wgpu::RenderPipeline {
            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(label),
                layout: Some(layout),
                vertex: wgpu::VertexState {
                    module: &vertex.module,
                    entry_point: Some("main"),
                    buffers: &[Vertex2d::LAYOUT],
                    compilation_options: Default::default(),
                },
                fragment: Some(wgpu::FragmentState {
                    module: &fragment.module,
                    entry_point: Some("main"),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: gpu.config.format,
                        blend: Some(blend_state),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                    compilation_options: Default::default(),
                }),
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleList,
                    ..Default::default()
                },
                depth_stencil: None,
                multisample: wgpu::MultisampleState::default(),
                multiview: None,
                cache: None,
            })
        };

        let solid_pipeline = make_pipeline(
            "Draw2d Solid Pipeline",
            &solid_pipeline_layout,
            &solid_fragment,
        );
        let textured_pipeline = make_pipeline(
            "Draw2d Textured Pipeline",
            &textured_pipeline_layout,
            &textured_fragment,
        );

        let vertex_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Draw2d Vertex Buffer"),
            size: (MAX_VERTICES * std::mem::size_of::<Vertex2d>()) as u64,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        Ok(Self {
            solid_pipeline,
            textured_pipeline,
            vertex_buffer,
            uniform_buffer,
            uniform_bind_group,
            texture_bind_group_layout,
            texture_bind_groups: Vec::new(),
            solid_vertices: Vec::with_capacity(1024),
            sprite_batches: Vec::new(),
        })
    }

    /// Drops all batched draw calls for a new frame.
    pub fn clear(&mut self) {
        self.solid_vertices.clear();
        self.sprite_batches.clear();
    }

    /// Queues a solid-color rectangle.
    pub fn rect(&mut self, x: f32, y: f32, w: f32, h: f32, color: Color) {
        let c = color.to_array();
        for (position, uv) in quad_corners(x, y, w, h, UvRect::FULL) {
            self.solid_vertices.push(Vertex2d {
                position,
                uv,
                color: c,
            });
        }
    }

    /// Queues a sub-region of a texture at the given screen rectangle.
    #[allow(clippy::too_many_arguments)]
    pub fn sprite(
        &mut self,
        images: &Images,
        texture: TextureId,
        src: (u32, u32, u32, u32),
        x: f32,
        y: f32,
        w: f32,
        h: f32,
        color: Color,
    ) {
        let (tex_w, tex_h) = images.size(texture);
        if tex_w == 0 || tex_h == 0 {
            return;
        }

        let (sx, sy, sw, sh) = src;
        let uv = uv_rect(tex_w, tex_h, sx, sy, sw, sh);
        let c = color.to_array();

        let batch_idx = self
            .sprite_batches
            .iter()
            .position(|(id, _)| *id == texture)
            .unwrap_or_else(|| {
                self.sprite_batches.push((texture, Vec::new()));
                self.sprite_batches.len() - 1
            });

        for (position, uv) in quad_corners(x, y, w, h, uv) {
            self.sprite_batches[batch_idx].1.push(Vertex2d {
                position,
                uv,
                color: c,
            });
        }
    }

    /// Makes sure every registered texture has a bind group.
    pub(crate) fn update_texture_bind_groups(&mut self, gpu: &GpuContext, images: &Images) {
        while self.texture_bind_groups.len() < images.len() {
            self.texture_bind_groups.push(None);
        }

        for (i, texture) in images.textures.iter().enumerate() {
            if self.texture_bind_groups[i].is_none() {
                let bind_group = gpu.device.create_bind_group(&wgpu::BindGroupDescriptor {
                    label: Some("Draw2d Texture Bind Group"),
                    layout: &self.texture_bind_group_layout,
                    entries: &[
                        wgpu::BindGroupEntry {
                            binding: 0,
                            resource: wgpu::BindingResource::TextureView(&texture.view),
                        },
                        wgpu::BindGroupEntry {
                            binding: 1,
                            resource: wgpu::BindingResource::Sampler(&texture.sampler),
                        },
                    ],
                });
                self.texture_bind_groups[i] = Some(bind_group);
            }
        }
    }

    /// Flushes all batches into the bound render pass, viewport in pixels.
    pub(crate) fn render(
        &self,
        gpu: &GpuContext,
        pass: &mut wgpu::RenderPass,
        resolution: [f32; 2],
    ) {
        let uniforms = ScreenUniforms {
            resolution,
            _padding: [0.0, 0.0],
        };
        gpu.queue
            .write_buffer(&self.uniform_buffer, 0, bytemuck::cast_slice(&[uniforms]));

        let mut offset = 0usize;
        let mut remaining = MAX_VERTICES;

        if !self.solid_vertices.is_empty() {
            let count = self.solid_vertices.len().min(remaining);
            gpu.queue.write_buffer(
                &self.vertex_buffer,
                0,
                bytemuck::cast_slice(&self.solid_vertices[..count]),
            );

            pass.set_pipeline(&self.solid_pipeline);
            pass.set_bind_group(0, &self.uniform_bind_group, &[]);
            pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
            pass.draw(0..count as u32, 0..1);

            offset += count;
            remaining -= count;
        }

        for (texture, vertices) in &self.sprite_batches {
            if vertices.is_empty() || remaining == 0 {
                break;
            }

            let Some(bind_group) = self
                .texture_bind_groups
                .get(texture.0)
                .and_then(|bg| bg.as_ref())
            else {
                continue;
            };

            let count = vertices.len().min(remaining);
            if count < vertices.len() {
                log::warn!("2D batch overflow, dropping {} vertices", vertices.len() - count);
            }

            gpu.queue.write_buffer(
                &self.vertex_buffer,
                (offset * std::mem::size_of::<Vertex2d>()) as u64,
                bytemuck::cast_slice(&vertices[..count]),
            );

            pass.set_pipeline(&self.textured_pipeline);
            pass.set_bind_group(0, &self.uniform_bind_group, &[]);
            pass.set_bind_group(1, bind_group, &[]);
            pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
            pass.draw(offset as u32..(offset + count) as u32, 0..1);

            offset += count;
            remaining -= count;
        }
    }
}
