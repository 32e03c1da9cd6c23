//! Per-frame orchestration.
//!
//! [`FrameDriver`] runs the capture/composite sequence: clear and bind the
//! offscreen target, let the scene callback paint, then bind the presentation
//! target and draw one full-viewport quad through the color-grade program.
//! Each frame walks the phase cycle `Idle -> CapturingScene -> Compositing ->
//! Presented -> Idle`; nothing persists between frames beyond the grade
//! parameters and the offscreen target's size.

use glam::Vec2;
use thiserror::Error;

use crate::draw2d::{Color, Draw2d};
use crate::gpu::GpuContext;
use crate::grade::ColorGradeState;
use crate::handler::{Handler, Key, MouseButton, SetupContext};
use crate::program::{CompositeVertex, LinkError, PostProcessProgram};
use crate::quad;
use crate::shader::{CompileError, ShaderKind, ShaderStage};
use crate::sprite::{Clip, Sequence};
use crate::target::{OffscreenTarget, TargetError};
use crate::texture::{Images, TextureId};

/// Rendering pipeline construction failed. All variants are fatal at
/// startup; the host logs the error and exits non-zero.
#[derive(Debug, Error)]
pub enum SetupError {
    /// Shader source was absent or empty. This is a source-delivery failure,
    /// not a compile failure — empty text is never handed to the compiler.
    #[error("missing {0} shader source")]
    MissingSource(ShaderKind),
    #[error(transparent)]
    Compile(#[from] CompileError),
    #[error(transparent)]
    Link(#[from] LinkError),
    #[error(transparent)]
    Target(#[from] TargetError),
}

/// Where the driver currently is in the frame cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FramePhase {
    Idle,
    CapturingScene,
    Compositing,
    Presented,
}

/// The capture/composite resources. Absent only in presentation-only mode.
struct PostStack {
    program: PostProcessProgram,
    target: OffscreenTarget,
    quad: wgpu::Buffer,
}

/// Drives one frame at a time.
pub struct FrameDriver {
    post: Option<PostStack>,
    grade: ColorGradeState,
    draw: Draw2d,
    width: u32,
    height: u32,
    clear_color: wgpu::Color,
    last_tick: Option<u64>,
    phase: FramePhase,
}

impl FrameDriver {
    /// Builds the full pipeline from the two shader source blobs.
    ///
    /// Compile, link and target errors abort construction; advisory
    /// validation findings are logged and tolerated.
    pub fn new(
        gpu: &GpuContext,
        vertex_source: &str,
        fragment_source: &str,
    ) -> Result<Self, SetupError> {
        if vertex_source.trim().is_empty() {
            return Err(SetupError::MissingSource(ShaderKind::Vertex));
        }
        if fragment_source.trim().is_empty() {
            return Err(SetupError::MissingSource(ShaderKind::Fragment));
        }

        let vertex = ShaderStage::compile(gpu, vertex_source, ShaderKind::Vertex)?;
        let fragment = ShaderStage::compile(gpu, fragment_source, ShaderKind::Fragment)?;

        let program = PostProcessProgram::link(gpu, &vertex, &fragment)?;
        for warning in program.validate() {
            log::warn!("post-process program: {warning}");
        }

        let width = gpu.width();
        let height = gpu.height();
        let target = OffscreenTarget::new(gpu, width, height)?;

        let quad = gpu.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Composite Quad"),
            size: (6 * std::mem::size_of::<CompositeVertex>()) as u64,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        gpu.queue
            .write_buffer(&quad, 0, bytemuck::cast_slice(&quad_vertices(width, height)));

        Ok(Self {
            post: Some(PostStack {
                program,
                target,
                quad,
            }),
            grade: ColorGradeState::new(),
            draw: Draw2d::new(gpu)?,
            width,
            height,
            clear_color: wgpu::Color {
                r: 1.0,
                g: 1.0,
                b: 1.0,
                a: 0.0,
            },
            last_tick: None,
            phase: FramePhase::Idle,
        })
    }

    /// Builds a driver without a post stack.
    ///
    /// Frames then perform only the presentation clear: the driver refuses to
    /// enter `CapturingScene`, so no invalid target or program is ever
    /// touched. This is the degraded mode for hosts that continue after a
    /// pipeline failure they chose not to treat as fatal.
    pub fn presentation_only(gpu: &GpuContext) -> Result<Self, SetupError> {
        Ok(Self {
            post: None,
            grade: ColorGradeState::new(),
            draw: Draw2d::new(gpu)?,
            width: gpu.width(),
            height: gpu.height(),
            clear_color: wgpu::Color {
                r: 1.0,
                g: 1.0,
                b: 1.0,
                a: 0.0,
            },
            last_tick: None,
            phase: FramePhase::Idle,
        })
    }

    /// Whether the capture/composite stack is available.
    pub fn is_valid(&self) -> bool {
        self.post.is_some()
    }

    pub fn phase(&self) -> FramePhase {
        self.phase
    }

    /// Background color for both the capture and presentation clears.
    pub fn set_clear_color(&mut self, color: Color) {
        self.clear_color = wgpu::Color {
            r: f64::from(color.r),
            g: f64::from(color.g),
            b: f64::from(color.b),
            a: f64::from(color.a),
        };
    }

    /// Host configuration API; takes effect on the next frame.
    pub fn set_exposure(&mut self, exposure: f32, max_range: f32) {
        self.grade.set_exposure(exposure, max_range);
    }

    /// Host configuration API; takes effect on the next frame.
    pub fn set_hue_sat_lum(&mut self, hue: f32, saturation: f32, luminance: f32) {
        self.grade.set_hue_sat_lum(hue, saturation, luminance);
    }

    pub fn grade(&self) -> &ColorGradeState {
        &self.grade
    }

    /// One-time handler setup, after the GPU context exists and before the
    /// first frame.
    pub fn on_ready<H: Handler>(&mut self, gpu: &GpuContext, images: &mut Images, handler: &mut H) {
        let mut setup = SetupContext { gpu, images };
        handler.ready(&mut setup);
        self.draw.update_texture_bind_groups(gpu, images);
    }

    /// Updates the presentation viewport and forwards the new size to the
    /// offscreen target.
    ///
    /// Callable at any time, including before the first frame. A failed
    /// target resize keeps the previous capture size and logs; the session
    /// continues.
    pub fn on_resize<H: Handler>(
        &mut self,
        gpu: &GpuContext,
        handler: &mut H,
        width: u32,
        height: u32,
    ) {
        if width == 0 || height == 0 {
            return;
        }

        self.width = width;
        self.height = height;

        if let Some(stack) = &mut self.post {
            gpu.queue.write_buffer(
                &stack.quad,
                0,
                bytemuck::cast_slice(&quad_vertices(width, height)),
            );
            if let Err(err) = stack.target.resize(gpu, width, height) {
                log::warn!(
                    "offscreen resize to {width}x{height} failed ({err}); keeping {}x{}",
                    stack.target.width(),
                    stack.target.height()
                );
            }
        }

        handler.reshape(width, height);
    }

    /// Runs one frame.
    ///
    /// The scene callback always runs with the offscreen target bound, and
    /// the composite draw always samples the offscreen texture with the
    /// presentation target bound — that ordering is the contract of this
    /// function. Without a post stack, the frame is a presentation clear.
    pub fn on_frame<H: Handler>(
        &mut self,
        gpu: &GpuContext,
        images: &Images,
        handler: &mut H,
        timestamp_ms: u64,
    ) {
        let delta = self
            .last_tick
            .map_or(0, |tick| timestamp_ms.saturating_sub(tick));
        self.last_tick = Some(timestamp_ms);

        let output = match gpu.surface.get_current_texture() {
            Ok(output) => output,
            Err(err) => {
                log::warn!("skipping frame, no presentation target: {err}");
                return;
            }
        };
        let screen_view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Frame Encoder"),
            });

        if let Some(stack) = &self.post {
            self.phase = FramePhase::CapturingScene;
            self.draw.clear();
            self.draw.update_texture_bind_groups(gpu, images);
            {
                let mut pass = stack.target.begin_capture(&mut encoder, self.clear_color);
                {
                    let mut canvas = Canvas {
                        images,
                        draw: &mut self.draw,
                        grade: &mut self.grade,
                        width: self.width,
                        height: self.height,
                        timestamp_ms,
                        translation: Vec2::ZERO,
                        scaling: Vec2::ONE,
                    };
                    handler.frame(&mut canvas, delta);
                }
                self.draw.render(
                    gpu,
                    &mut pass,
                    [stack.target.width() as f32, stack.target.height() as f32],
                );
            }

            self.phase = FramePhase::Compositing;
            {
                let mut pass = begin_presentation_pass(&mut encoder, &screen_view, self.clear_color);
                stack.program.activate(
                    gpu,
                    &mut pass,
                    &stack.target,
                    &self.grade,
                    [self.width as f32, self.height as f32],
                );
                pass.set_vertex_buffer(0, stack.quad.slice(..));
                pass.draw(0..6, 0..1);
            }
            self.phase = FramePhase::Presented;
        } else {
            // No valid pipeline: presentation clear only.
            let _pass = begin_presentation_pass(&mut encoder, &screen_view, self.clear_color);
        }

        gpu.queue.submit(std::iter::once(encoder.finish()));
        output.present();
        self.phase = FramePhase::Idle;
    }

    // Host-invoked input pass-throughs. The driver forwards them to the
    // handler; coordinates accompany key events for hosts that report them
    // but are not part of the handler contract.

    pub fn on_key_down<H: Handler>(&mut self, handler: &mut H, key: Key, x: i32, y: i32) {
        let _ = (x, y);
        handler.key(key, true);
    }

    pub fn on_key_up<H: Handler>(&mut self, handler: &mut H, key: Key, x: i32, y: i32) {
        let _ = (x, y);
        handler.key(key, false);
    }

    pub fn on_special_key_down<H: Handler>(&mut self, handler: &mut H, key: Key, x: i32, y: i32) {
        let _ = (x, y);
        handler.key(key, true);
    }

    pub fn on_special_key_up<H: Handler>(&mut self, handler: &mut H, key: Key, x: i32, y: i32) {
        let _ = (x, y);
        handler.key(key, false);
    }

    pub fn on_mouse_button<H: Handler>(
        &mut self,
        handler: &mut H,
        button: MouseButton,
        is_down: bool,
        x: i32,
        y: i32,
    ) {
        handler.mouse(button, is_down, x, y);
    }

    pub fn on_mouse_move<H: Handler>(&mut self, handler: &mut H, x: i32, y: i32) {
        handler.motion(x, y);
    }

    pub fn on_pointer_enter_leave<H: Handler>(&mut self, handler: &mut H, entered: bool) {
        handler.entry(entered);
    }
}

fn quad_vertices(width: u32, height: u32) -> [CompositeVertex; 6] {
    quad::fullscreen_corners(width as f32, height as f32)
        .map(|(position, uv)| CompositeVertex { position, uv })
}

fn begin_presentation_pass<'e>(
    encoder: &'e mut wgpu::CommandEncoder,
    view: &wgpu::TextureView,
    clear: wgpu::Color,
) -> wgpu::RenderPass<'e> {
    encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
        label: Some("Composite Pass"),
        color_attachments: &[Some(wgpu::RenderPassColorAttachment {
            view,
            resolve_target: None,
            ops: wgpu::Operations {
                load: wgpu::LoadOp::Clear(clear),
                store: wgpu::StoreOp::Store,
            },
            depth_slice: None,
        })],
        depth_stencil_attachment: None,
        timestamp_writes: None,
        occlusion_query_set: None,
    })
}

/// Scene drawing surface handed to [`Handler::frame`].
///
/// Draw calls are batched and land in the offscreen capture; grade
/// adjustments made here are read at composite time on the same frame's way
/// out, and stay in effect until changed again.
pub struct Canvas<'a> {
    images: &'a Images,
    draw: &'a mut Draw2d,
    grade: &'a mut ColorGradeState,
    width: u32,
    height: u32,
    timestamp_ms: u64,
    translation: Vec2,
    scaling: Vec2,
}

impl Canvas<'_> {
    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Milliseconds since the host started, for this frame.
    pub fn timestamp_ms(&self) -> u64 {
        self.timestamp_ms
    }

    /// Moves the drawing origin. Subsequent draws are relative to it.
    pub fn translate(&mut self, x: f32, y: f32) {
        self.translation += Vec2::new(x, y);
    }

    /// Scales subsequent draws. Non-positive factors are ignored.
    pub fn scale(&mut self, x: f32, y: f32) {
        if x > 0.0 && y > 0.0 {
            self.scaling *= Vec2::new(x, y);
        }
    }

    /// Resets translation and scale to the identity.
    pub fn reset_transform(&mut self) {
        self.translation = Vec2::ZERO;
        self.scaling = Vec2::ONE;
    }

    fn place(&self, x: f32, y: f32, w: f32, h: f32) -> (f32, f32, f32, f32) {
        let origin = self.translation + Vec2::new(x, y) * self.scaling;
        let extent = Vec2::new(w, h) * self.scaling;
        (origin.x, origin.y, extent.x, extent.y)
    }

    /// Draws a solid-color rectangle.
    pub fn rect(&mut self, x: f32, y: f32, w: f32, h: f32, color: Color) {
        let (x, y, w, h) = self.place(x, y, w, h);
        self.draw.rect(x, y, w, h, color);
    }

    /// Draws a whole texture at its native size.
    pub fn image(&mut self, texture: TextureId, x: f32, y: f32) {
        let (w, h) = self.images.size(texture);
        self.image_region(texture, (0, 0, w, h), x, y);
    }

    /// Draws a pixel sub-region of a texture. The drawn size equals the
    /// source region, before the canvas transform.
    pub fn image_region(
        &mut self,
        texture: TextureId,
        src: (u32, u32, u32, u32),
        x: f32,
        y: f32,
    ) {
        let (x, y, w, h) = self.place(x, y, src.2 as f32, src.3 as f32);
        self.draw
            .sprite(self.images, texture, src, x, y, w, h, Color::WHITE);
    }

    /// Draws a clip at the given position.
    pub fn clip(&mut self, clip: &Clip, x: f32, y: f32) {
        self.image_region(clip.texture, (clip.x, clip.y, clip.w, clip.h), x, y);
    }

    /// Draws the current frame of a sequence, advancing it by this frame's
    /// timestamp.
    pub fn sequence(&mut self, seq: &mut Sequence, x: f32, y: f32) {
        if let Some(clip) = seq.frame_at(self.timestamp_ms) {
            self.clip(&clip, x, y);
        }
    }

    /// Adjusts the scene's hue, saturation and luminance shift.
    pub fn adjust_hsl(&mut self, hue: f32, saturation: f32, luminance: f32) {
        self.grade.set_hue_sat_lum(hue, saturation, luminance);
    }

    /// Adjusts the scene's exposure and maximum brightness.
    pub fn adjust_exposure(&mut self, exposure: f32, max_range: f32) {
        self.grade.set_exposure(exposure, max_range);
    }
}
