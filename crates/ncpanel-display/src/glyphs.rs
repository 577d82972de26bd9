//! Glyph rendering through embedded-graphics mono fonts

use embedded_graphics::mono_font::ascii::{FONT_4X6, FONT_5X8};
use embedded_graphics::mono_font::{MonoFont, MonoTextStyle};
use embedded_graphics::pixelcolor::Rgb888;
use embedded_graphics::prelude::*;
use embedded_graphics::text::{Baseline, Text};

use crate::framebuffer::FrameBuffer;

/// Font choice: the regular face, or the narrower fallback for text that
/// would not otherwise fit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FontSize {
    Regular,
    Small,
}

/// Draws text into a frame buffer
pub trait GlyphRenderer: Send {
    /// Draw `text` with its top-left corner at `origin`; returns the cursor
    /// position after the last glyph
    fn draw_text(
        &self,
        target: &mut FrameBuffer,
        text: &str,
        origin: Point,
        color: Rgb888,
        font: FontSize,
    ) -> Point;

    /// Width in pixels `text` would occupy
    fn text_width(&self, text: &str, font: FontSize) -> u32;

    fn line_height(&self, font: FontSize) -> u32;

    /// Regular if `text` fits in `max_width`, otherwise Small
    fn fit(&self, text: &str, max_width: u32) -> FontSize {
        if self.text_width(text, FontSize::Regular) <= max_width {
            FontSize::Regular
        } else {
            FontSize::Small
        }
    }
}

/// Fixed-width bitmap fonts: 5×8 regular, 4×6 fallback
#[derive(Debug, Clone, Copy)]
pub struct MonoGlyphs {
    regular: &'static MonoFont<'static>,
    small: &'static MonoFont<'static>,
}

impl MonoGlyphs {
    pub fn new() -> Self {
        Self {
            regular: &FONT_5X8,
            small: &FONT_4X6,
        }
    }

    fn font(&self, size: FontSize) -> &'static MonoFont<'static> {
        match size {
            FontSize::Regular => self.regular,
            FontSize::Small => self.small,
        }
    }
}

impl Default for MonoGlyphs {
    fn default() -> Self {
        Self::new()
    }
}

impl GlyphRenderer for MonoGlyphs {
    fn draw_text(
        &self,
        target: &mut FrameBuffer,
        text: &str,
        origin: Point,
        color: Rgb888,
        font: FontSize,
    ) -> Point {
        let style = MonoTextStyle::new(self.font(font), color);
        match Text::with_baseline(text, origin, style, Baseline::Top).draw(target) {
            Ok(next) => next,
            Err(never) => match never {},
        }
    }

    fn text_width(&self, text: &str, font: FontSize) -> u32 {
        let font = self.font(font);
        let n = text.chars().count() as u32;
        if n == 0 {
            return 0;
        }
        n * font.character_size.width + (n - 1) * font.character_spacing
    }

    fn line_height(&self, font: FontSize) -> u32 {
        self.font(font).character_size.height
    }
}
