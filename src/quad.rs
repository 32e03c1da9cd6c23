//! Textured-quad geometry helpers.
//!
//! Both the sprite batch and the composite pass build their quads here, so
//! the sub-region UV math exists exactly once.

/// Normalized texture coordinates of a quad, top-left to bottom-right.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UvRect {
    pub u0: f32,
    pub v0: f32,
    pub u1: f32,
    pub v1: f32,
}

impl UvRect {
    /// The whole texture.
    pub const FULL: UvRect = UvRect {
        u0: 0.0,
        v0: 0.0,
        u1: 1.0,
        v1: 1.0,
    };
}

/// Maps a pixel sub-region of a `tex_w` x `tex_h` texture to normalized UVs.
pub fn uv_rect(tex_w: u32, tex_h: u32, x: u32, y: u32, w: u32, h: u32) -> UvRect {
    let tw = tex_w as f32;
    let th = tex_h as f32;
    UvRect {
        u0: x as f32 / tw,
        v0: y as f32 / th,
        u1: (x + w) as f32 / tw,
        v1: (y + h) as f32 / th,
    }
}

/// Two triangles covering the pixel rectangle `(x, y, w, h)` with the given
/// UVs. Each corner is `(position, uv)`.
pub fn quad_corners(x: f32, y: f32, w: f32, h: f32, uv: UvRect) -> [([f32; 2], [f32; 2]); 6] {
    [
        ([x, y], [uv.u0, uv.v0]),
        ([x + w, y], [uv.u1, uv.v0]),
        ([x, y + h], [uv.u0, uv.v1]),
        ([x + w, y], [uv.u1, uv.v0]),
        ([x + w, y + h], [uv.u1, uv.v1]),
        ([x, y + h], [uv.u0, uv.v1]),
    ]
}

/// The full-viewport composite quad: positions span `[0, 0]`-`[w, h]`,
/// UVs span `[0, 0]`-`[1, 1]`.
pub fn fullscreen_corners(width: f32, height: f32) -> [([f32; 2], [f32; 2]); 6] {
    quad_corners(0.0, 0.0, width, height, UvRect::FULL)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sub_region_uvs_are_exact() {
        let uv = uv_rect(100, 200, 10, 20, 30, 40);
        assert_eq!(uv.u0, 0.10);
        assert_eq!(uv.v0, 0.10);
        assert_eq!(uv.u1, 0.40);
        assert_eq!(uv.v1, 0.30);
    }

    #[test]
    fn full_region_covers_unit_square() {
        let uv = uv_rect(64, 64, 0, 0, 64, 64);
        assert_eq!(uv, UvRect::FULL);
    }

    #[test]
    fn quad_corners_span_rectangle() {
        let corners = quad_corners(5.0, 10.0, 20.0, 30.0, UvRect::FULL);
        let xs: Vec<f32> = corners.iter().map(|(p, _)| p[0]).collect();
        let ys: Vec<f32> = corners.iter().map(|(p, _)| p[1]).collect();
        assert_eq!(xs.iter().cloned().fold(f32::MAX, f32::min), 5.0);
        assert_eq!(xs.iter().cloned().fold(f32::MIN, f32::max), 25.0);
        assert_eq!(ys.iter().cloned().fold(f32::MAX, f32::min), 10.0);
        assert_eq!(ys.iter().cloned().fold(f32::MIN, f32::max), 40.0);
    }

    #[test]
    fn fullscreen_quad_matches_viewport() {
        let corners = fullscreen_corners(800.0, 600.0);
        // Top-left corner carries UV (0, 0), bottom-right carries (1, 1).
        assert_eq!(corners[0], ([0.0, 0.0], [0.0, 0.0]));
        assert_eq!(corners[4], ([800.0, 600.0], [1.0, 1.0]));
    }
}
