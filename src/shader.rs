//! GLSL shader compilation with CPU-side diagnostics.
//!
//! Shader text is parsed and validated with naga before anything touches the
//! GPU, so a broken shader produces a readable compiler log instead of a
//! backend panic. The validated IR is kept around for reflection: program
//! linking uses it to resolve uniform bindings by name.

use std::borrow::Cow;

use thiserror::Error;
use wgpu::naga;

use crate::gpu::GpuContext;

/// Which pipeline stage a piece of shader source targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShaderKind {
    Vertex,
    Fragment,
}

impl ShaderKind {
    pub(crate) fn to_naga(self) -> naga::ShaderStage {
        match self {
            ShaderKind::Vertex => naga::ShaderStage::Vertex,
            ShaderKind::Fragment => naga::ShaderStage::Fragment,
        }
    }
}

impl std::fmt::Display for ShaderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ShaderKind::Vertex => write!(f, "vertex"),
            ShaderKind::Fragment => write!(f, "fragment"),
        }
    }
}

/// A shader stage failed to compile. Carries the full compiler log.
#[derive(Debug, Error)]
#[error("{kind} shader failed to compile:\n{log}")]
pub struct CompileError {
    pub kind: ShaderKind,
    pub log: String,
}

/// Validated intermediate form of one shader stage.
///
/// Produced entirely on the CPU; no GPU resources are involved until the IR
/// is handed to [`ShaderStage::new`].
#[derive(Debug)]
pub struct ShaderIr {
    pub kind: ShaderKind,
    pub(crate) module: naga::Module,
    source: String,
}

impl ShaderIr {
    pub fn source(&self) -> &str {
        &self.source
    }
}

/// Compiles GLSL source for the given stage.
///
/// Parse and validation failures both surface as [`CompileError`] with the
/// diagnostic text naga produced for the source. The diagnostic is written to
/// the error log before the call fails; nothing of a failed stage survives.
pub fn compile(source: &str, kind: ShaderKind) -> Result<ShaderIr, CompileError> {
    let options = naga::front::glsl::Options::from(kind.to_naga());
    let mut frontend = naga::front::glsl::Frontend::default();

    let module = frontend.parse(&options, source).map_err(|errors| {
        let err = CompileError {
            kind,
            log: errors.emit_to_string(source),
        };
        log::error!("{err}");
        err
    })?;

    naga::valid::Validator::new(
        naga::valid::ValidationFlags::all(),
        naga::valid::Capabilities::all(),
    )
    .validate(&module)
    .map_err(|error| {
        let err = CompileError {
            kind,
            log: error.emit_to_string(source),
        };
        log::error!("{err}");
        err
    })?;

    Ok(ShaderIr {
        kind,
        module,
        source: source.to_owned(),
    })
}

/// A compiled shader stage, ready for linking.
///
/// Immutable once built; the backing module is consumed by program creation
/// and dropped with it.
pub struct ShaderStage {
    pub(crate) module: wgpu::ShaderModule,
    pub(crate) ir: ShaderIr,
}

impl ShaderStage {
    /// Uploads validated IR as a GPU shader module.
    pub fn new(gpu: &GpuContext, ir: ShaderIr) -> Self {
        let module = gpu.device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(match ir.kind {
                ShaderKind::Vertex => "tempera vertex stage",
                ShaderKind::Fragment => "tempera fragment stage",
            }),
            source: wgpu::ShaderSource::Glsl {
                shader: Cow::Borrowed(&ir.source),
                stage: ir.kind.to_naga(),
                defines: &[],
            },
        });

        Self { module, ir }
    }

    /// Compiles source text and uploads it in one step.
    pub fn compile(gpu: &GpuContext, source: &str, kind: ShaderKind) -> Result<Self, CompileError> {
        let ir = compile(source, kind)?;
        Ok(Self::new(gpu, ir))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL_VERTEX: &str = r"
        #version 450
        layout(location = 0) in vec2 position;
        void main() {
            gl_Position = vec4(position, 0.0, 1.0);
        }
    ";

    #[test]
    fn valid_source_compiles() {
        let ir = compile(MINIMAL_VERTEX, ShaderKind::Vertex).expect("minimal shader");
        assert_eq!(ir.kind, ShaderKind::Vertex);
        assert_eq!(ir.source(), MINIMAL_VERTEX);
    }

    #[test]
    fn syntax_error_reports_compile_error() {
        let err = compile("#version 450\nvoid main() {", ShaderKind::Fragment)
            .expect_err("unterminated body must not compile");
        assert_eq!(err.kind, ShaderKind::Fragment);
        assert!(!err.log.is_empty());
    }

    #[test]
    fn undeclared_identifier_reports_compile_error() {
        let source = r"
            #version 450
            layout(location = 0) out vec4 out_color;
            void main() {
                out_color = missing_variable;
            }
        ";
        let err = compile(source, ShaderKind::Fragment).expect_err("undeclared identifier");
        assert!(err.log.contains("missing_variable"));
    }

    #[test]
    fn builtin_grade_shaders_compile() {
        compile(include_str!("shaders/grade.vert"), ShaderKind::Vertex).expect("grade.vert");
        compile(include_str!("shaders/grade.frag"), ShaderKind::Fragment).expect("grade.frag");
    }

    #[test]
    fn builtin_sprite_shaders_compile() {
        compile(include_str!("shaders/sprite.vert"), ShaderKind::Vertex).expect("sprite.vert");
        compile(include_str!("shaders/sprite.frag"), ShaderKind::Fragment).expect("sprite.frag");
        compile(include_str!("shaders/solid.frag"), ShaderKind::Fragment).expect("solid.frag");
    }
}
