//! The offscreen capture target.

use thiserror::Error;

use crate::gpu::GpuContext;

/// The offscreen target could not be built or resized. Fatal at startup; on
/// resize the caller keeps the previous size instead.
#[derive(Debug, Error)]
pub enum TargetError {
    #[error("offscreen target dimensions {width}x{height} are unusable (device limit {limit})")]
    BadDimensions { width: u32, height: u32, limit: u32 },
    #[error("offscreen target is incomplete: {0}")]
    Incomplete(String),
}

/// A render destination backed by a sampleable texture.
///
/// The scene is captured here each frame, then the composite pass samples the
/// backing texture onto the presentation target. The texture always uses
/// nearest-neighbor filtering and edge clamping — it is presented 1:1 at
/// native resolution, so any interpolation would smear pixels.
///
/// Invariant: after [`new`](Self::new) or a successful
/// [`resize`](Self::resize), the backing texture's pixel dimensions equal
/// `(width, height)` and the target is attachable. A failed construction
/// releases everything it allocated; no half-built target escapes.
pub struct OffscreenTarget {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    sampler: wgpu::Sampler,
    width: u32,
    height: u32,
}

impl OffscreenTarget {
    /// Creates an offscreen target in the presentation format.
    ///
    /// RGBA8 color only — no depth or stencil. Depth testing during capture
    /// is the scene callback's own concern.
    pub fn new(gpu: &GpuContext, width: u32, height: u32) -> Result<Self, TargetError> {
        let (texture, view) = Self::allocate(gpu, width, height)?;

        let sampler = gpu.device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Offscreen Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Nearest,
            min_filter: wgpu::FilterMode::Nearest,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        Ok(Self {
            texture,
            view,
            sampler,
            width,
            height,
        })
    }

    fn allocate(
        gpu: &GpuContext,
        width: u32,
        height: u32,
    ) -> Result<(wgpu::Texture, wgpu::TextureView), TargetError> {
        let limit = gpu.device.limits().max_texture_dimension_2d;
        if width == 0 || height == 0 || width > limit || height > limit {
            return Err(TargetError::BadDimensions {
                width,
                height,
                limit,
            });
        }

        gpu.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let texture = gpu.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Offscreen Target"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: gpu.config.format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        if let Some(error) = pollster::block_on(gpu.device.pop_error_scope()) {
            return Err(TargetError::Incomplete(error.to_string()));
        }

        Ok((texture, view))
    }

    /// Reallocates the backing storage at the new size.
    ///
    /// A no-op for identical dimensions. The sampler and the target handle
    /// itself survive the reallocation; only the texture storage changes. On
    /// failure the target keeps its previous storage and size.
    pub fn resize(&mut self, gpu: &GpuContext, width: u32, height: u32) -> Result<(), TargetError> {
        if width == self.width && height == self.height {
            return Ok(());
        }

        let (texture, view) = Self::allocate(gpu, width, height)?;
        self.texture = texture;
        self.view = view;
        self.width = width;
        self.height = height;
        Ok(())
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// View used both as the capture attachment and as the composite input.
    pub(crate) fn view(&self) -> &wgpu::TextureView {
        &self.view
    }

    pub(crate) fn sampler(&self) -> &wgpu::Sampler {
        &self.sampler
    }

    /// Begins the capture pass: the target bound for writing, cleared to the
    /// given color.
    pub(crate) fn begin_capture<'e>(
        &self,
        encoder: &'e mut wgpu::CommandEncoder,
        clear: wgpu::Color,
    ) -> wgpu::RenderPass<'e> {
        encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Capture Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &self.view,
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
}
