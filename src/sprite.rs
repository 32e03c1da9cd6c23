//! Clips, sprite sheets and timestamp-driven frame sequences.

use crate::texture::{Images, TextureId};

/// A rectangular region of a texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Clip {
    pub texture: TextureId,
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

impl Clip {
    pub fn new(texture: TextureId, x: u32, y: u32, w: u32, h: u32) -> Self {
        Self { texture, x, y, w, h }
    }
}

/// A texture sliced into a grid of equally sized clips, row-major.
#[derive(Debug, Clone)]
pub struct SpriteSheet {
    pub clips: Vec<Clip>,
    pub clip_w: u32,
    pub clip_h: u32,
}

impl SpriteSheet {
    /// Slices the texture into `clip_w` x `clip_h` cells. Partial cells at
    /// the right/bottom edge are dropped.
    pub fn new(images: &Images, texture: TextureId, clip_w: u32, clip_h: u32) -> Self {
        let (tex_w, tex_h) = images.size(texture);
        Self::with_size(texture, tex_w, tex_h, clip_w, clip_h)
    }

    pub(crate) fn with_size(
        texture: TextureId,
        tex_w: u32,
        tex_h: u32,
        clip_w: u32,
        clip_h: u32,
    ) -> Self {
        let mut clips = Vec::new();
        if clip_w > 0 && clip_h > 0 {
            let mut y = 0;
            while y + clip_h <= tex_h {
                let mut x = 0;
                while x + clip_w <= tex_w {
                    clips.push(Clip::new(texture, x, y, clip_w, clip_h));
                    x += clip_w;
                }
                y += clip_h;
            }
        }

        Self {
            clips,
            clip_w,
            clip_h,
        }
    }

    /// Builds an animation over the clip range `[from, to]`. Negative
    /// indices count back from the end, so `(0, -1)` spans the whole sheet.
    pub fn sequence(&self, from: i32, to: i32) -> Sequence {
        Sequence::new(self.clone(), from, to)
    }
}

/// An animated run of sprite-sheet clips, advanced by frame timestamps.
#[derive(Debug, Clone)]
pub struct Sequence {
    sheet: SpriteSheet,
    from: usize,
    to: usize,
    current: usize,
    /// Frames per second while playing.
    speed: f64,
    playing: bool,
    started_ms: u64,
}

impl Sequence {
    pub fn new(sheet: SpriteSheet, from: i32, to: i32) -> Self {
        let len = sheet.clips.len() as i32;
        let wrap = |i: i32| -> usize {
            let i = if i < 0 { len + i } else { i };
            i.clamp(0, (len - 1).max(0)) as usize
        };

        let from = wrap(from);
        let to = wrap(to);

        Self {
            sheet,
            from,
            to,
            current: from,
            speed: 1.0,
            playing: false,
            started_ms: 0,
        }
    }

    /// Starts playing at `speed` frames per second, from the first frame.
    pub fn play(&mut self, speed: f64, now_ms: u64) {
        self.speed = speed;
        self.started_ms = now_ms;
        self.playing = true;
    }

    /// Freezes the animation on its current frame.
    pub fn pause(&mut self) {
        self.playing = false;
    }

    pub fn toggle(&mut self, now_ms: u64) {
        if self.playing {
            self.pause();
        } else {
            self.play(self.speed, now_ms);
        }
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    /// The clip shown at `now_ms`, advancing the animation if playing.
    /// `None` for a sequence over an empty sheet.
    pub fn frame_at(&mut self, now_ms: u64) -> Option<Clip> {
        if self.sheet.clips.is_empty() {
            return None;
        }
        if self.playing {
            let elapsed = now_ms.saturating_sub(self.started_ms) as f64 / 1000.0;
            let span = self.to.saturating_sub(self.from) + 1;
            let step = (self.speed * elapsed).floor().max(0.0) as usize;
            self.current = self.from + step % span;
        }
        self.sheet
            .clips
            .get(self.current)
            .or_else(|| self.sheet.clips.last())
            .copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sheet_4x1() -> SpriteSheet {
        // A 64x16 texture sliced into four 16x16 clips.
        SpriteSheet::with_size(TextureId(0), 64, 16, 16, 16)
    }

    #[test]
    fn sheet_slices_row_major() {
        let sheet = SpriteSheet::with_size(TextureId(0), 32, 32, 16, 16);
        assert_eq!(sheet.clips.len(), 4);
        assert_eq!((sheet.clips[0].x, sheet.clips[0].y), (0, 0));
        assert_eq!((sheet.clips[1].x, sheet.clips[1].y), (16, 0));
        assert_eq!((sheet.clips[2].x, sheet.clips[2].y), (0, 16));
        assert_eq!((sheet.clips[3].x, sheet.clips[3].y), (16, 16));
    }

    #[test]
    fn partial_cells_are_dropped() {
        let sheet = SpriteSheet::with_size(TextureId(0), 40, 16, 16, 16);
        assert_eq!(sheet.clips.len(), 2);
    }

    #[test]
    fn negative_range_counts_from_end() {
        let mut seq = sheet_4x1().sequence(0, -1);
        seq.play(1.0, 0);
        // One frame per second over four frames: wraps after the last.
        assert_eq!(seq.frame_at(0).unwrap().x, 0);
        assert_eq!(seq.frame_at(1000).unwrap().x, 16);
        assert_eq!(seq.frame_at(3000).unwrap().x, 48);
        assert_eq!(seq.frame_at(4000).unwrap().x, 0);
    }

    #[test]
    fn speed_scales_frame_advance() {
        let mut seq = sheet_4x1().sequence(0, -1);
        seq.play(2.0, 1000);
        assert_eq!(seq.frame_at(1000).unwrap().x, 0);
        assert_eq!(seq.frame_at(1500).unwrap().x, 16);
        assert_eq!(seq.frame_at(2000).unwrap().x, 32);
    }

    #[test]
    fn pause_freezes_current_frame() {
        let mut seq = sheet_4x1().sequence(0, -1);
        seq.play(1.0, 0);
        seq.frame_at(2000);
        seq.pause();
        assert_eq!(seq.frame_at(10_000).unwrap().x, 32);
    }

    #[test]
    fn empty_sheet_yields_no_frame() {
        let sheet = SpriteSheet::with_size(TextureId(0), 8, 8, 16, 16);
        let mut seq = sheet.sequence(0, -1);
        seq.play(1.0, 0);
        assert_eq!(seq.frame_at(1000), None);
    }
}
