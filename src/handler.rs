//! The contract between the frame driver and the embedding application.

use crate::driver::Canvas;
use crate::gpu::GpuContext;
use crate::texture::Images;

/// Keys reported to [`Handler::key`].
///
/// Printable keys arrive as [`Key::Char`]; everything else uses a named
/// variant. Space, return, tab, backspace and escape are named even though
/// some of them have character forms, so handlers can match on them directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Char(char),
    Backspace,
    Tab,
    Return,
    Escape,
    Space,
    Left,
    Up,
    Right,
    Down,
    ShiftL,
    ShiftR,
    CtrlL,
    CtrlR,
    AltL,
    AltR,
    F1,
    F2,
    F3,
    F4,
    F5,
    F6,
    F7,
    F8,
    F9,
    F10,
    F11,
    F12,
}

/// Mouse buttons reported to [`Handler::mouse`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseButton {
    Left,
    Middle,
    Right,
}

/// One-time setup context handed to [`Handler::ready`].
///
/// This is where scene textures get loaded: the GPU context exists, but no
/// frame has been drawn yet.
pub struct SetupContext<'a> {
    pub gpu: &'a GpuContext,
    pub images: &'a mut Images,
}

/// The embedding application.
///
/// Every method has a default no-op implementation, so a handler only
/// implements what it cares about. [`frame`](Self::frame) is the scene
/// callback: it runs once per frame with the offscreen capture target bound,
/// and everything it draws goes through the color-grade pass before
/// presentation.
pub trait Handler {
    /// Window title, read once at startup.
    fn title(&self) -> &str {
        "tempera"
    }

    /// Called once after the GPU context exists, before the first frame.
    fn ready(&mut self, setup: &mut SetupContext) {
        let _ = setup;
    }

    /// Called whenever the window is resized.
    fn reshape(&mut self, width: u32, height: u32) {
        let _ = (width, height);
    }

    /// The per-frame scene callback. `delta_ms` is the time since the
    /// previous frame.
    fn frame(&mut self, canvas: &mut Canvas, delta_ms: u64) {
        let _ = (canvas, delta_ms);
    }

    /// Called when a key is pressed or released.
    fn key(&mut self, key: Key, is_down: bool) {
        let _ = (key, is_down);
    }

    /// Called when a mouse button is pressed or released, with the cursor
    /// position.
    fn mouse(&mut self, button: MouseButton, is_down: bool, x: i32, y: i32) {
        let _ = (button, is_down, x, y);
    }

    /// Called whenever the cursor moves.
    fn motion(&mut self, x: i32, y: i32) {
        let _ = (x, y);
    }

    /// Called when the pointer enters (`true`) or leaves (`false`) the
    /// window.
    fn entry(&mut self, entered: bool) {
        let _ = entered;
    }
}
