//! Program linking and the color-grade composite pipeline.
//!
//! Linking mirrors the permissive uniform model of classic GL programs: the
//! uniform namespaces of both stages are merged and resolved **by name** once
//! at link time. A canonical uniform that the shader text does not declare is
//! tolerated — activation simply skips it — while a fragment input with no
//! matching vertex output is a hard link failure.
//!
//! The wire-level uniform contract the built-in shaders follow:
//!
//! * `hsla_adjust: vec4` — hue/sat/lum shift plus a reserved slot
//! * `tonemap_adjust: vec2` — exposure scale and maximum brightness
//! * `scene_tex` / `scene_samp` — the offscreen capture, group 0
//! * `view_size: vec2` — presentation extent for the vertex transform

use thiserror::Error;
use wgpu::naga;

use crate::gpu::GpuContext;
use crate::grade::ColorGradeState;
use crate::shader::{ShaderIr, ShaderKind, ShaderStage};
use crate::target::OffscreenTarget;

pub const UNIFORM_HSLA: &str = "hsla_adjust";
pub const UNIFORM_TONEMAP: &str = "tonemap_adjust";
pub const UNIFORM_SCENE_TEXTURE: &str = "scene_tex";
pub const UNIFORM_SCENE_SAMPLER: &str = "scene_samp";
pub const UNIFORM_VIEW_SIZE: &str = "view_size";

/// Program linking failed. Fatal at startup.
#[derive(Debug, Error)]
pub enum LinkError {
    #[error("fragment input at location {location} has no matching vertex output")]
    MissingVarying { location: u32 },
    #[error("varying at location {location} has mismatched types between stages")]
    VaryingMismatch { location: u32 },
    #[error("uniform block at binding {binding} differs between stages")]
    BlockMismatch { binding: u32 },
    #[error("binding {binding} uses group {group}, but programs only bind group 0")]
    UnsupportedGroup { group: u32, binding: u32 },
    #[error("texture binding {binding} is not a sampled 2D float texture")]
    UnsupportedTexture { binding: u32 },
    #[error("pipeline creation failed: {0}")]
    Backend(String),
}

/// One uniform block of the merged program namespace, with the byte offsets
/// of the canonical members it actually declares.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct UniformBlock {
    pub binding: u32,
    pub size: u64,
    pub visibility: wgpu::ShaderStages,
    pub hsla_offset: Option<usize>,
    pub tonemap_offset: Option<usize>,
    pub view_size_offset: Option<usize>,
}

/// Resolved bindings of a linked program.
///
/// Every declared sampler and texture is fed the offscreen capture — the
/// moral equivalent of GL samplers all defaulting to texture unit 0.
#[derive(Debug, Default, Clone, PartialEq)]
pub(crate) struct ProgramBindings {
    pub blocks: Vec<UniformBlock>,
    pub textures: Vec<(u32, wgpu::ShaderStages)>,
    pub samplers: Vec<(u32, wgpu::ShaderStages)>,
}

impl ProgramBindings {
    fn member_offset(&self, pick: fn(&UniformBlock) -> Option<usize>) -> Option<usize> {
        self.blocks.iter().find_map(pick)
    }

    pub fn hsla_offset(&self) -> Option<usize> {
        self.member_offset(|b| b.hsla_offset)
    }

    pub fn tonemap_offset(&self) -> Option<usize> {
        self.member_offset(|b| b.tonemap_offset)
    }

    pub fn view_size_offset(&self) -> Option<usize> {
        self.member_offset(|b| b.view_size_offset)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum VaryingType {
    F32,
    Vec2,
    Vec3,
    Vec4,
    Other,
}

fn varying_type(module: &naga::Module, ty: naga::Handle<naga::Type>) -> VaryingType {
    match module.types[ty].inner {
        naga::TypeInner::Scalar(naga::Scalar {
            kind: naga::ScalarKind::Float,
            ..
        }) => VaryingType::F32,
        naga::TypeInner::Vector {
            size,
            scalar:
                naga::Scalar {
                    kind: naga::ScalarKind::Float,
                    ..
                },
        } => match size {
            naga::VectorSize::Bi => VaryingType::Vec2,
            naga::VectorSize::Tri => VaryingType::Vec3,
            naga::VectorSize::Quad => VaryingType::Vec4,
        },
        _ => VaryingType::Other,
    }
}

/// Collects `(location, type)` pairs from an entry point interface, walking
/// through wrapper structs and skipping builtins.
fn collect_varyings(
    module: &naga::Module,
    ty: naga::Handle<naga::Type>,
    binding: Option<&naga::Binding>,
    out: &mut Vec<(u32, VaryingType)>,
) {
    match binding {
        Some(naga::Binding::Location { location, .. }) => {
            out.push((*location, varying_type(module, ty)));
        }
        Some(naga::Binding::BuiltIn(_)) => {}
        None => {
            if let naga::TypeInner::Struct { ref members, .. } = module.types[ty].inner {
                for member in members {
                    collect_varyings(module, member.ty, member.binding.as_ref(), out);
                }
            }
        }
    }
}

fn vertex_outputs(module: &naga::Module) -> Vec<(u32, VaryingType)> {
    let mut out = Vec::new();
    for ep in &module.entry_points {
        if let Some(result) = &ep.function.result {
            collect_varyings(module, result.ty, result.binding.as_ref(), &mut out);
        }
    }
    out
}

fn fragment_inputs(module: &naga::Module) -> Vec<(u32, VaryingType)> {
    let mut out = Vec::new();
    for ep in &module.entry_points {
        for arg in &ep.function.arguments {
            collect_varyings(module, arg.ty, arg.binding.as_ref(), &mut out);
        }
    }
    out
}

fn is_float_vec(module: &naga::Module, ty: naga::Handle<naga::Type>, n: naga::VectorSize) -> bool {
    matches!(
        module.types[ty].inner,
        naga::TypeInner::Vector {
            size,
            scalar: naga::Scalar {
                kind: naga::ScalarKind::Float,
                width: 4,
            },
        } if size == n
    )
}

fn reflect_stage(
    bindings: &mut ProgramBindings,
    ir: &ShaderIr,
    visibility: wgpu::ShaderStages,
) -> Result<(), LinkError> {
    let module = &ir.module;

    for (_, var) in module.global_variables.iter() {
        let Some(resource) = &var.binding else {
            continue;
        };
        if resource.group != 0 {
            return Err(LinkError::UnsupportedGroup {
                group: resource.group,
                binding: resource.binding,
            });
        }

        match (&var.space, &module.types[var.ty].inner) {
            (naga::AddressSpace::Uniform, naga::TypeInner::Struct { members, span }) => {
                let mut block = UniformBlock {
                    binding: resource.binding,
                    size: u64::from(*span),
                    visibility,
                    hsla_offset: None,
                    tonemap_offset: None,
                    view_size_offset: None,
                };

                for member in members {
                    let offset = Some(member.offset as usize);
                    match member.name.as_deref() {
                        Some(UNIFORM_HSLA)
                            if is_float_vec(module, member.ty, naga::VectorSize::Quad) =>
                        {
                            block.hsla_offset = offset;
                        }
                        Some(UNIFORM_TONEMAP)
                            if is_float_vec(module, member.ty, naga::VectorSize::Bi) =>
                        {
                            block.tonemap_offset = offset;
                        }
                        Some(UNIFORM_VIEW_SIZE)
                            if is_float_vec(module, member.ty, naga::VectorSize::Bi) =>
                        {
                            block.view_size_offset = offset;
                        }
                        _ => {}
                    }
                }

                if let Some(existing) = bindings
                    .blocks
                    .iter_mut()
                    .find(|b| b.binding == block.binding)
                {
                    if existing.size != block.size {
                        return Err(LinkError::BlockMismatch {
                            binding: block.binding,
                        });
                    }
                    existing.visibility |= visibility;
                    existing.hsla_offset = existing.hsla_offset.or(block.hsla_offset);
                    existing.tonemap_offset = existing.tonemap_offset.or(block.tonemap_offset);
                    existing.view_size_offset =
                        existing.view_size_offset.or(block.view_size_offset);
                } else {
                    bindings.blocks.push(block);
                }
            }
            (naga::AddressSpace::Handle, naga::TypeInner::Image { dim, class, .. }) => {
                let sampled_2d = *dim == naga::ImageDimension::D2
                    && matches!(
                        class,
                        naga::ImageClass::Sampled {
                            kind: naga::ScalarKind::Float,
                            multi: false,
                        }
                    );
                if !sampled_2d {
                    return Err(LinkError::UnsupportedTexture {
                        binding: resource.binding,
                    });
                }
                merge_resource(&mut bindings.textures, resource.binding, visibility);
            }
            (naga::AddressSpace::Handle, naga::TypeInner::Sampler { .. }) => {
                merge_resource(&mut bindings.samplers, resource.binding, visibility);
            }
            _ => {}
        }
    }

    Ok(())
}

fn merge_resource(
    resources: &mut Vec<(u32, wgpu::ShaderStages)>,
    binding: u32,
    visibility: wgpu::ShaderStages,
) {
    if let Some((_, vis)) = resources.iter_mut().find(|(b, _)| *b == binding) {
        *vis |= visibility;
    } else {
        resources.push((binding, visibility));
    }
}

/// Pure link step: checks the stage interface and resolves the merged uniform
/// namespace. No GPU work; this is what the tests exercise.
pub(crate) fn check_and_reflect(
    vertex: &ShaderIr,
    fragment: &ShaderIr,
) -> Result<ProgramBindings, LinkError> {
    debug_assert_eq!(vertex.kind, ShaderKind::Vertex);
    debug_assert_eq!(fragment.kind, ShaderKind::Fragment);

    let outputs = vertex_outputs(&vertex.module);
    for (location, input_ty) in fragment_inputs(&fragment.module) {
        match outputs.iter().find(|(loc, _)| *loc == location) {
            None => return Err(LinkError::MissingVarying { location }),
            Some((_, output_ty)) if *output_ty != input_ty => {
                return Err(LinkError::VaryingMismatch { location });
            }
            Some(_) => {}
        }
    }

    let mut bindings = ProgramBindings::default();
    reflect_stage(&mut bindings, vertex, wgpu::ShaderStages::VERTEX)?;
    reflect_stage(&mut bindings, fragment, wgpu::ShaderStages::FRAGMENT)?;
    Ok(bindings)
}

/// Vertex format of the composite quad.
#[repr(C)]
#[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CompositeVertex {
    pub position: [f32; 2],
    pub uv: [f32; 2],
}

impl CompositeVertex {
    pub const LAYOUT: wgpu::VertexBufferLayout<'static> = wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<CompositeVertex>() as u64,
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
        ],
    };
}

/// A linked color-grade program.
///
/// Structurally immutable after linking; only uniform *values* change per
/// frame, via [`activate`](Self::activate).
pub struct PostProcessProgram {
    pipeline: wgpu::RenderPipeline,
    bind_group_layout: wgpu::BindGroupLayout,
    block_buffers: Vec<wgpu::Buffer>,
    bindings: ProgramBindings,
}

impl PostProcessProgram {
    /// Links two compiled stages into a program targeting the presentation
    /// format.
    ///
    /// Both stages must have compiled successfully; passing a failed stage is
    /// a precondition violation. Backend pipeline errors are captured through
    /// a validation error scope and reported as [`LinkError::Backend`].
    pub fn link(
        gpu: &GpuContext,
        vertex: &ShaderStage,
        fragment: &ShaderStage,
    ) -> Result<Self, LinkError> {
        let bindings = check_and_reflect(&vertex.ir, &fragment.ir)?;
        let device = &gpu.device;

        let mut entries = Vec::new();
        for block in &bindings.blocks {
            entries.push(wgpu::BindGroupLayoutEntry {
                binding: block.binding,
                visibility: block.visibility,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            });
        }
        for &(binding, visibility) in &bindings.textures {
            entries.push(wgpu::BindGroupLayoutEntry {
                binding,
                visibility,
                ty: wgpu::BindingType::Texture {
                    sample_type: wgpu::TextureSampleType::Float { filterable: true },
                    view_dimension: wgpu::TextureViewDimension::D2,
                    multisampled: false,
                },
                count: None,
            });
        }
        for &(binding, visibility) in &bindings.samplers {
            entries.push(wgpu::BindGroupLayoutEntry {
                binding,
                visibility,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                count: None,
            });
        }

        // Everything from the layouts to the pipeline runs inside one
        // validation scope, so conflicting bindings surface as a LinkError
        // instead of an uncaptured device error.
        device.push_error_scope(wgpu::ErrorFilter::Validation);

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Grade Bind Group Layout"),
            entries: &entries,
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Grade Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Grade Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &vertex.module,
                entry_point: Some("main"),
                buffers: &[CompositeVertex::LAYOUT],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &fragment.module,
                entry_point: Some("main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: gpu.config.format,
                    blend: Some(wgpu::BlendState::REPLACE),
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
        });
        if let Some(error) = pollster::block_on(device.pop_error_scope()) {
            return Err(LinkError::Backend(error.to_string()));
        }

        let block_buffers = bindings
            .blocks
            .iter()
            .map(|block| {
                device.create_buffer(&wgpu::BufferDescriptor {
                    label: Some("Grade Uniform Block"),
                    size: block.size.max(16),
                    usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                    mapped_at_creation: false,
                })
            })
            .collect();

        Ok(Self {
            pipeline,
            bind_group_layout,
            block_buffers,
            bindings,
        })
    }

    /// Advisory post-link validation.
    ///
    /// Reports canonical uniforms the linked program does not expose. A
    /// warning here never invalidates the program — activation skips the
    /// missing uniforms instead.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        if self.bindings.hsla_offset().is_none() {
            warnings.push(format!(
                "uniform `{UNIFORM_HSLA}` not found; hue/saturation/luminance adjustments will be ignored"
            ));
        }
        if self.bindings.tonemap_offset().is_none() {
            warnings.push(format!(
                "uniform `{UNIFORM_TONEMAP}` not found; exposure adjustments will be ignored"
            ));
        }
        if self.bindings.textures.is_empty() {
            warnings.push(format!(
                "texture `{UNIFORM_SCENE_TEXTURE}` not found; the captured scene will not be sampled"
            ));
        }
        if self.bindings.samplers.is_empty() {
            warnings.push(format!(
                "sampler `{UNIFORM_SCENE_SAMPLER}` not found; the captured scene will not be sampled"
            ));
        }
        if self.bindings.view_size_offset().is_none() {
            warnings.push(format!(
                "uniform `{UNIFORM_VIEW_SIZE}` not found; the composite quad will not be scaled to the viewport"
            ));
        }
        warnings
    }

    /// Binds the program for the compositing pass.
    ///
    /// Uploads the grade snapshot and viewport extent at their reflected
    /// offsets, feeds every declared texture/sampler the offscreen capture,
    /// and sets the pipeline current. Uniforms the program does not declare
    /// are skipped. Deactivation is scoped: ending the render pass restores
    /// the unbound state before presentation.
    pub fn activate(
        &self,
        gpu: &GpuContext,
        pass: &mut wgpu::RenderPass,
        target: &OffscreenTarget,
        state: &ColorGradeState,
        view_size: [f32; 2],
    ) {
        for (block, buffer) in self.bindings.blocks.iter().zip(&self.block_buffers) {
            let mut bytes = vec![0u8; block.size.max(16) as usize];
            if let Some(offset) = block.hsla_offset {
                bytes[offset..offset + 16].copy_from_slice(bytemuck::cast_slice(&state.hsla()));
            }
            if let Some(offset) = block.tonemap_offset {
                bytes[offset..offset + 8].copy_from_slice(bytemuck::cast_slice(&state.tonemap()));
            }
            if let Some(offset) = block.view_size_offset {
                bytes[offset..offset + 8].copy_from_slice(bytemuck::cast_slice(&view_size));
            }
            gpu.queue.write_buffer(buffer, 0, &bytes);
        }

        let mut entries = Vec::new();
        for (buffer, block) in self.block_buffers.iter().zip(&self.bindings.blocks) {
            entries.push(wgpu::BindGroupEntry {
                binding: block.binding,
                resource: buffer.as_entire_binding(),
            });
        }
        for &(binding, _) in &self.bindings.textures {
            entries.push(wgpu::BindGroupEntry {
                binding,
                resource: wgpu::BindingResource::TextureView(target.view()),
            });
        }
        for &(binding, _) in &self.bindings.samplers {
            entries.push(wgpu::BindGroupEntry {
                binding,
                resource: wgpu::BindingResource::Sampler(target.sampler()),
            });
        }

        let bind_group = gpu.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Grade Bind Group"),
            layout: &self.bind_group_layout,
            entries: &entries,
        });

        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, &bind_group, &[]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shader::compile;

    fn vertex_ir() -> ShaderIr {
        compile(include_str!("shaders/grade.vert"), ShaderKind::Vertex).expect("grade.vert")
    }

    fn fragment_ir() -> ShaderIr {
        compile(include_str!("shaders/grade.frag"), ShaderKind::Fragment).expect("grade.frag")
    }

    #[test]
    fn builtin_shaders_link_with_full_bindings() {
        let bindings = check_and_reflect(&vertex_ir(), &fragment_ir()).expect("link check");

        // std140: vec4 at offset 0, vec2 right after it.
        assert_eq!(bindings.hsla_offset(), Some(0));
        assert_eq!(bindings.tonemap_offset(), Some(16));
        assert_eq!(bindings.view_size_offset(), Some(0));

        assert_eq!(bindings.textures, vec![(1, wgpu::ShaderStages::FRAGMENT)]);
        assert_eq!(bindings.samplers, vec![(2, wgpu::ShaderStages::FRAGMENT)]);
    }

    #[test]
    fn undeclared_uniform_is_tolerated() {
        // A grade block without `tonemap_adjust` still links; the binding is
        // simply unresolved and activation skips it.
        let fragment = compile(
            r"
                #version 450
                layout(location = 0) in vec2 v_uv;
                layout(location = 0) out vec4 out_color;
                layout(std140, set = 0, binding = 0) uniform Grade {
                    vec4 hsla_adjust;
                } grade;
                layout(set = 0, binding = 1) uniform texture2D scene_tex;
                layout(set = 0, binding = 2) uniform sampler scene_samp;
                void main() {
                    out_color = texture(sampler2D(scene_tex, scene_samp), v_uv)
                        + grade.hsla_adjust * 0.0;
                }
            ",
            ShaderKind::Fragment,
        )
        .expect("tolerant fragment");

        let bindings = check_and_reflect(&vertex_ir(), &fragment).expect("link check");
        assert_eq!(bindings.hsla_offset(), Some(0));
        assert_eq!(bindings.tonemap_offset(), None);
    }

    #[test]
    fn wrongly_typed_uniform_is_unresolved() {
        let fragment = compile(
            r"
                #version 450
                layout(location = 0) in vec2 v_uv;
                layout(location = 0) out vec4 out_color;
                layout(std140, set = 0, binding = 0) uniform Grade {
                    vec3 hsla_adjust;
                } grade;
                void main() {
                    out_color = vec4(grade.hsla_adjust, 1.0) * v_uv.x;
                }
            ",
            ShaderKind::Fragment,
        )
        .expect("vec3 fragment");

        let bindings = check_and_reflect(&vertex_ir(), &fragment).expect("link check");
        assert_eq!(bindings.hsla_offset(), None);
    }

    #[test]
    fn missing_varying_fails_linking() {
        let fragment = compile(
            r"
                #version 450
                layout(location = 0) in vec2 v_uv;
                layout(location = 1) in vec4 v_tint;
                layout(location = 0) out vec4 out_color;
                void main() {
                    out_color = v_tint * v_uv.x;
                }
            ",
            ShaderKind::Fragment,
        )
        .expect("fragment with extra input");

        let err = check_and_reflect(&vertex_ir(), &fragment).expect_err("must not link");
        assert!(matches!(err, LinkError::MissingVarying { location: 1 }));
    }

    #[test]
    fn varying_type_mismatch_fails_linking() {
        let fragment = compile(
            r"
                #version 450
                layout(location = 0) in vec4 v_uv;
                layout(location = 0) out vec4 out_color;
                void main() {
                    out_color = v_uv;
                }
            ",
            ShaderKind::Fragment,
        )
        .expect("fragment with vec4 input");

        let err = check_and_reflect(&vertex_ir(), &fragment).expect_err("must not link");
        assert!(matches!(err, LinkError::VaryingMismatch { location: 0 }));
    }

    #[test]
    fn shared_block_merges_stage_visibility() {
        // Vertex and fragment both reading the viewport block end up with one
        // entry visible to both stages.
        let fragment = compile(
            r"
                #version 450
                layout(location = 0) in vec2 v_uv;
                layout(location = 0) out vec4 out_color;
                layout(std140, set = 0, binding = 3) uniform Viewport {
                    vec2 view_size;
                } viewport;
                void main() {
                    out_color = vec4(v_uv / viewport.view_size, 0.0, 1.0);
                }
            ",
            ShaderKind::Fragment,
        )
        .expect("fragment sharing viewport block");

        let bindings = check_and_reflect(&vertex_ir(), &fragment).expect("link check");
        let block = bindings
            .blocks
            .iter()
            .find(|b| b.binding == 3)
            .expect("viewport block");
        assert_eq!(
            block.visibility,
            wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT
        );
    }
}
