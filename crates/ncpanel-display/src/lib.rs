//! ncpanel Display - Rendering controller telemetry onto a small pixel panel
//!
//! The renderer composes a [`DisplayFrame`] from the latest telemetry and
//! connection state, repaints only when that content changes, blinks the
//! connection indicator while connected, and hands finished frames to a
//! [`PixelSink`].

pub mod framebuffer;
pub mod glyphs;
pub mod layout;
pub mod pattern;
pub mod renderer;
pub mod sink;

pub use framebuffer::FrameBuffer;
pub use glyphs::{FontSize, GlyphRenderer, MonoGlyphs};
pub use layout::{DisplayFrame, Indicator, Layout};
pub use pattern::draw_test_pattern;
pub use renderer::Renderer;
pub use sink::{DisplayError, FramebufferSink, LogSink, PixelFormat, PixelSink};
