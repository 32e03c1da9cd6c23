//! Color-grade parameters shared between the host and the composite pass.

/// Adjustable color-grading parameters.
///
/// The host mutates these between frames; the frame driver copies a snapshot
/// into uniform storage when the grade program is activated. Setters are plain
/// overwrites with no validation — out-of-range values are clamped by the
/// shader math, not here.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorGradeState {
    /// Hue/saturation/luminance shift. The fourth component is reserved.
    hsla: [f32; 4],
    /// Exposure scale and maximum brightness.
    tonemap: [f32; 2],
}

impl Default for ColorGradeState {
    fn default() -> Self {
        Self {
            hsla: [0.0; 4],
            tonemap: [1.0, 1.0],
        }
    }
}

impl ColorGradeState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the hue, saturation and luminance shift. Hue wraps in the shader;
    /// saturation and luminance shifts are clamped there.
    pub fn set_hue_sat_lum(&mut self, hue: f32, saturation: f32, luminance: f32) {
        self.hsla[0] = hue;
        self.hsla[1] = saturation;
        self.hsla[2] = luminance;
    }

    /// Sets the exposure scale and the maximum brightness it may reach.
    pub fn set_exposure(&mut self, exposure: f32, max_range: f32) {
        self.tonemap = [exposure, max_range];
    }

    pub fn hsla(&self) -> [f32; 4] {
        self.hsla
    }

    pub fn tonemap(&self) -> [f32; 2] {
        self.tonemap
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_identity() {
        let state = ColorGradeState::new();
        assert_eq!(state.hsla(), [0.0; 4]);
        assert_eq!(state.tonemap(), [1.0, 1.0]);
    }

    #[test]
    fn setters_are_last_write_wins() {
        let mut state = ColorGradeState::new();
        state.set_exposure(2.0, 1.0);
        state.set_exposure(0.5, 1.0);
        assert_eq!(state.tonemap(), [0.5, 1.0]);

        state.set_hue_sat_lum(0.25, -0.5, 0.1);
        state.set_hue_sat_lum(0.1, 0.2, 0.3);
        assert_eq!(state.hsla(), [0.1, 0.2, 0.3, 0.0]);
    }

    #[test]
    fn reserved_component_survives_hsl_updates() {
        let mut state = ColorGradeState::new();
        state.set_hue_sat_lum(0.9, 0.9, 0.9);
        assert_eq!(state.hsla()[3], 0.0);
    }
}
