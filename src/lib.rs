//! # Tempera
//!
//! **A tiny 2D rendering loop with an offscreen capture and a color-grading
//! post pass.**
//!
//! Every frame is captured into an offscreen target, then composited to the
//! screen through a GLSL color-grade program (hue/saturation/luminance shift
//! plus exposure/tonemap). The embedding application implements [`Handler`]
//! and draws whatever it wants in the scene callback; the grade pass applies
//! uniformly to all of it.
//!
//! ## Quick Start
//!
//! ```no_run
//! use tempera::{Canvas, Color, Handler, run};
//!
//! struct Demo;
//!
//! impl Handler for Demo {
//!     fn frame(&mut self, canvas: &mut Canvas, _delta_ms: u64) {
//!         canvas.rect(100.0, 100.0, 200.0, 120.0, Color::rgb(0.8, 0.3, 0.2));
//!         canvas.adjust_exposure(1.2, 1.0);
//!     }
//! }
//!
//! fn main() {
//!     run(Demo);
//! }
//! ```
//!
//! ## Pipeline shape
//!
//! `on_frame` walks a fixed cycle: the offscreen target is cleared and bound,
//! the scene callback paints, then the presentation target is bound and one
//! full-viewport quad samples the capture through the grade program. Grade
//! parameters set from anywhere ([`Canvas::adjust_hsl`],
//! [`FrameDriver::set_exposure`]) take effect on the next composite.

mod app;
mod draw2d;
mod driver;
mod gpu;
mod grade;
mod handler;
mod program;
mod quad;
mod shader;
mod sprite;
mod target;
mod texture;

pub use app::{AppConfig, run, run_with_config};
pub use draw2d::{Color, Draw2d, Vertex2d};
pub use driver::{Canvas, FrameDriver, FramePhase, SetupError};
pub use gpu::GpuContext;
pub use grade::ColorGradeState;
pub use handler::{Handler, Key, MouseButton, SetupContext};
pub use program::{
    CompositeVertex, LinkError, PostProcessProgram, UNIFORM_HSLA, UNIFORM_SCENE_SAMPLER,
    UNIFORM_SCENE_TEXTURE, UNIFORM_TONEMAP, UNIFORM_VIEW_SIZE,
};
pub use quad::{UvRect, uv_rect};
pub use shader::{CompileError, ShaderIr, ShaderKind, ShaderStage, compile};
pub use sprite::{Clip, Sequence, SpriteSheet};
pub use target::{OffscreenTarget, TargetError};
pub use texture::{Images, Texture, TextureId};

// Re-export glam math types for convenience
pub use glam::{Mat4, Vec2, Vec3, Vec4};
