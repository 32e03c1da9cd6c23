//! The windowing host.
//!
//! A thin winit runner that owns the event loop and translates window events
//! into the frame driver's entry points. The core never initiates these
//! calls itself; any embedding that provides the same sequence — `on_ready`
//! once, then `on_frame`/`on_resize`/input pass-throughs — can replace this
//! module.

use std::sync::Arc;
use std::time::Instant;

use winit::application::ApplicationHandler;
use winit::event::{ElementState, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::NamedKey;
use winit::window::{Fullscreen, Window, WindowId};

use crate::draw2d::Color;
use crate::driver::FrameDriver;
use crate::gpu::GpuContext;
use crate::handler::{Handler, Key, MouseButton};
use crate::texture::Images;

/// Window configuration for [`run_with_config`].
pub struct AppConfig {
    /// Window title; defaults to the handler's [`Handler::title`].
    pub title: Option<String>,
    pub width: u32,
    pub height: u32,
    pub fullscreen: bool,
    pub cursor_visible: bool,
    /// Clear color override for both the capture and presentation clears.
    pub clear_color: Option<Color>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            title: None,
            width: 640,
            height: 640,
            fullscreen: false,
            cursor_visible: true,
            clear_color: None,
        }
    }
}

impl AppConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn fullscreen(mut self, fullscreen: bool) -> Self {
        self.fullscreen = fullscreen;
        self
    }

    pub fn cursor_visible(mut self, visible: bool) -> Self {
        self.cursor_visible = visible;
        self
    }

    pub fn clear_color(mut self, color: Color) -> Self {
        self.clear_color = Some(color);
        self
    }
}

/// Runs a handler with the default 640x640 window.
pub fn run<H: Handler>(handler: H) {
    run_with_config(AppConfig::default(), handler);
}

/// Runs a handler with the given window configuration.
///
/// Blocks on the event loop until the window closes. A rendering pipeline
/// that fails to build is fatal: the error is logged and the process exits
/// non-zero.
pub fn run_with_config<H: Handler>(config: AppConfig, handler: H) {
    init_logging();

    let event_loop = EventLoop::new().unwrap();
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = App {
        config,
        handler,
        window: None,
        gpu: None,
        driver: None,
        images: Images::new(),
        start: Instant::now(),
        visible: true,
        cursor: (0, 0),
    };
    event_loop.run_app(&mut app).unwrap();
}

fn init_logging() {
    let mut builder = env_logger::Builder::new();
    if let Ok(filter) = std::env::var("RUST_LOG") {
        builder.parse_filters(&filter);
    } else {
        builder.filter_level(log::LevelFilter::Info);
    }
    let _ = builder.try_init();
}

struct App<H: Handler> {
    config: AppConfig,
    handler: H,
    window: Option<Arc<Window>>,
    gpu: Option<GpuContext>,
    driver: Option<FrameDriver>,
    images: Images,
    start: Instant,
    visible: bool,
    cursor: (i32, i32),
}

impl<H: Handler> ApplicationHandler for App<H> {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let title = self
            .config
            .title
            .clone()
            .unwrap_or_else(|| self.handler.title().to_string());

        let mut attrs = Window::default_attributes()
            .with_title(title)
            .with_inner_size(winit::dpi::LogicalSize::new(
                self.config.width,
                self.config.height,
            ));
        if self.config.fullscreen {
            attrs = attrs.with_fullscreen(Some(Fullscreen::Borderless(None)));
        }

        let window = Arc::new(event_loop.create_window(attrs).unwrap());
        window.set_cursor_visible(self.config.cursor_visible);

        let gpu = GpuContext::new(window.clone());

        let mut driver = match FrameDriver::new(
            &gpu,
            include_str!("shaders/grade.vert"),
            include_str!("shaders/grade.frag"),
        ) {
            Ok(driver) => driver,
            Err(err) => {
                log::error!("failed to build the rendering pipeline: {err}");
                std::process::exit(1);
            }
        };
        if let Some(color) = self.config.clear_color {
            driver.set_clear_color(color);
        }

        driver.on_ready(&gpu, &mut self.images, &mut self.handler);

        window.request_redraw();
        self.window = Some(window);
        self.gpu = Some(gpu);
        self.driver = Some(driver);
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        let (Some(window), Some(gpu), Some(driver)) =
            (&self.window, &mut self.gpu, &mut self.driver)
        else {
            return;
        };

        match event {
            WindowEvent::CloseRequested => {
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                gpu.resize(size.width, size.height);
                driver.on_resize(gpu, &mut self.handler, size.width, size.height);
            }
            WindowEvent::Occluded(occluded) => {
                // The idle toggle: redraws are only armed while visible.
                self.visible = !occluded;
                if self.visible {
                    window.request_redraw();
                }
            }
            WindowEvent::RedrawRequested => {
                if self.visible {
                    let timestamp = self.start.elapsed().as_millis() as u64;
                    driver.on_frame(gpu, &self.images, &mut self.handler, timestamp);
                    window.request_redraw();
                }
            }
            WindowEvent::KeyboardInput { event, .. } => {
                if event.repeat {
                    return;
                }
                let Some((key, special)) = map_key(&event.logical_key) else {
                    return;
                };
                let (x, y) = self.cursor;
                match (event.state, special) {
                    (ElementState::Pressed, false) => {
                        driver.on_key_down(&mut self.handler, key, x, y)
                    }
                    (ElementState::Released, false) => {
                        driver.on_key_up(&mut self.handler, key, x, y)
                    }
                    (ElementState::Pressed, true) => {
                        driver.on_special_key_down(&mut self.handler, key, x, y)
                    }
                    (ElementState::Released, true) => {
                        driver.on_special_key_up(&mut self.handler, key, x, y)
                    }
                }
            }
            WindowEvent::MouseInput { state, button, .. } => {
                let Some(button) = map_mouse_button(button) else {
                    return;
                };
                let (x, y) = self.cursor;
                driver.on_mouse_button(
                    &mut self.handler,
                    button,
                    state == ElementState::Pressed,
                    x,
                    y,
                );
            }
            WindowEvent::CursorMoved { position, .. } => {
                self.cursor = (position.x as i32, position.y as i32);
                driver.on_mouse_move(&mut self.handler, self.cursor.0, self.cursor.1);
            }
            WindowEvent::CursorEntered { .. } => {
                driver.on_pointer_enter_leave(&mut self.handler, true);
            }
            WindowEvent::CursorLeft { .. } => {
                driver.on_pointer_enter_leave(&mut self.handler, false);
            }
            _ => {}
        }
    }
}

/// Maps a winit logical key to the handler key set. The boolean marks
/// "special" (named) keys, which route through the special-key entry points.
fn map_key(logical: &winit::keyboard::Key) -> Option<(Key, bool)> {
    match logical {
        winit::keyboard::Key::Character(text) => {
            text.chars().next().map(|c| (Key::Char(c), false))
        }
        winit::keyboard::Key::Named(named) => {
            let key = match named {
                NamedKey::Backspace => Key::Backspace,
                NamedKey::Tab => Key::Tab,
                NamedKey::Enter => Key::Return,
                NamedKey::Escape => Key::Escape,
                NamedKey::Space => Key::Space,
                NamedKey::ArrowLeft => Key::Left,
                NamedKey::ArrowUp => Key::Up,
                NamedKey::ArrowRight => Key::Right,
                NamedKey::ArrowDown => Key::Down,
                NamedKey::Shift => Key::ShiftL,
                NamedKey::Control => Key::CtrlL,
                NamedKey::Alt => Key::AltL,
                NamedKey::F1 => Key::F1,
                NamedKey::F2 => Key::F2,
                NamedKey::F3 => Key::F3,
                NamedKey::F4 => Key::F4,
                NamedKey::F5 => Key::F5,
                NamedKey::F6 => Key::F6,
                NamedKey::F7 => Key::F7,
                NamedKey::F8 => Key::F8,
                NamedKey::F9 => Key::F9,
                NamedKey::F10 => Key::F10,
                NamedKey::F11 => Key::F11,
                NamedKey::F12 => Key::F12,
                _ => return None,
            };
            Some((key, true))
        }
        _ => None,
    }
}

fn map_mouse_button(button: winit::event::MouseButton) -> Option<MouseButton> {
    match button {
        winit::event::MouseButton::Left => Some(MouseButton::Left),
        winit::event::MouseButton::Middle => Some(MouseButton::Middle),
        winit::event::MouseButton::Right => Some(MouseButton::Right),
        _ => None,
    }
}
