//! Demo: tiles an animated sprite across the window and drives the color
//! grade with the mouse. Drag with the left button to shift hue/saturation,
//! with the right button to change exposure. `.` and `,` rescale the tiles,
//! space pauses the animation, escape quits.

use tempera::{
    AppConfig, Canvas, Handler, Key, MouseButton, Sequence, SetupContext, SpriteSheet, Texture,
    run_with_config,
};

const FRAME: u32 = 16;
const FRAMES: u32 = 4;

/// A tiny procedural sprite strip: four frames of a bright block orbiting a
/// dark tile, so the animation is visible without any asset files.
fn sprite_strip() -> Vec<u8> {
    let width = FRAME * FRAMES;
    let mut data = vec![0u8; (width * FRAME * 4) as usize];

    // The block visits the four corners, one per frame.
    let corners = [(2u32, 2u32), (9, 2), (9, 9), (2, 9)];

    for frame in 0..FRAMES {
        let (bx, by) = corners[frame as usize];
        for y in 0..FRAME {
            for x in 0..FRAME {
                let px = frame * FRAME + x;
                let idx = ((y * width + px) * 4) as usize;

                let border = x == 0 || y == 0 || x == FRAME - 1 || y == FRAME - 1;
                let in_block = x >= bx && x < bx + 5 && y >= by && y < by + 5;

                let (r, g, b) = if in_block {
                    (235, 170, 60)
                } else if border {
                    (40, 40, 48)
                } else {
                    (70, 76, 90)
                };

                data[idx] = r;
                data[idx + 1] = g;
                data[idx + 2] = b;
                data[idx + 3] = 255;
            }
        }
    }

    data
}

#[derive(Default)]
struct Crayons {
    sheet: Option<SpriteSheet>,
    seq: Option<Sequence>,
    width: u32,
    height: u32,
    scale: f32,
    left_down: bool,
    right_down: bool,
    toggle_pending: bool,
    pending_hsl: Option<(f32, f32, f32)>,
    pending_exposure: Option<(f32, f32)>,
}

impl Handler for Crayons {
    fn title(&self) -> &str {
        "tempera"
    }

    fn ready(&mut self, setup: &mut SetupContext) {
        let strip = sprite_strip();
        let texture = setup.images.add(Texture::from_rgba(
            setup.gpu,
            &strip,
            FRAME * FRAMES,
            FRAME,
            "demo sprite strip",
        ));

        let sheet = SpriteSheet::new(setup.images, texture, FRAME, FRAME);
        let mut seq = sheet.sequence(0, -1);
        seq.play(7.0, 0);

        self.sheet = Some(sheet);
        self.seq = Some(seq);
        self.scale = 2.0;
    }

    fn reshape(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
    }

    fn frame(&mut self, canvas: &mut Canvas, _delta_ms: u64) {
        if let Some((h, s, l)) = self.pending_hsl.take() {
            canvas.adjust_hsl(h, s, l);
        }
        if let Some((exposure, max)) = self.pending_exposure.take() {
            canvas.adjust_exposure(exposure, max);
        }

        let Some(seq) = &mut self.seq else {
            return;
        };

        if self.toggle_pending {
            seq.toggle(canvas.timestamp_ms());
            self.toggle_pending = false;
        }

        let width = self.width.max(canvas.width());
        let height = self.height.max(canvas.height());

        canvas.scale(self.scale, self.scale);
        let step = FRAME as usize;
        for y in (0..=height).step_by(step) {
            for x in (0..=width).step_by(step) {
                canvas.sequence(seq, x as f32, y as f32);
            }
        }
    }

    fn key(&mut self, key: Key, is_down: bool) {
        if !is_down {
            return;
        }
        match key {
            Key::Char('.') => self.scale += 1.0,
            Key::Char(',') => self.scale = (self.scale - 1.0).max(1.0),
            Key::Space => self.toggle_pending = true,
            Key::Escape => std::process::exit(0),
            _ => {}
        }
    }

    fn mouse(&mut self, button: MouseButton, is_down: bool, _x: i32, _y: i32) {
        match button {
            MouseButton::Left => self.left_down = is_down,
            MouseButton::Right => self.right_down = is_down,
            MouseButton::Middle => {}
        }
    }

    fn motion(&mut self, x: i32, y: i32) {
        if self.width == 0 || self.height == 0 {
            return;
        }

        let s = y as f32 / self.height as f32 * 2.0;
        let l = x as f32 / self.width as f32 * 2.0;

        if self.left_down {
            self.pending_hsl = Some((s - 1.0, l - 1.0, 0.0));
        }
        if self.right_down {
            self.pending_exposure = Some((s, l));
        }
    }
}

fn main() {
    run_with_config(
        AppConfig::new().size(640, 640),
        Crayons::default(),
    );
}
