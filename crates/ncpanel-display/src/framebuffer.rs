//! In-memory RGB frame the renderer draws into

use embedded_graphics::pixelcolor::Rgb888;
use embedded_graphics::prelude::*;
use std::convert::Infallible;

/// Fixed-size width×height RGB buffer
#[derive(Debug, Clone, PartialEq)]
pub struct FrameBuffer {
    width: u32,
    height: u32,
    pixels: Vec<Rgb888>,
}

impl FrameBuffer {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![Rgb888::BLACK; (width * height) as usize],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixels(&self) -> &[Rgb888] {
        &self.pixels
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgb888> {
        if x < self.width && y < self.height {
            Some(self.pixels[(y * self.width + x) as usize])
        } else {
            None
        }
    }

    pub fn fill(&mut self, color: Rgb888) {
        self.pixels.fill(color);
    }

    /// Fill an axis-aligned rectangle, clipped to the buffer
    pub fn fill_rect(&mut self, x: u32, y: u32, w: u32, h: u32, color: Rgb888) {
        for py in y..(y + h).min(self.height) {
            for px in x..(x + w).min(self.width) {
                self.pixels[(py * self.width + px) as usize] = color;
            }
        }
    }

    /// Whether any pixel in the rectangle is lit
    pub fn any_lit(&self, x: u32, y: u32, w: u32, h: u32) -> bool {
        (y..(y + h).min(self.height))
            .flat_map(|py| (x..(x + w).min(self.width)).map(move |px| (px, py)))
            .any(|(px, py)| self.pixels[(py * self.width + px) as usize] != Rgb888::BLACK)
    }

    /// Packed RGB888, row-major
    pub fn to_rgb888_bytes(&self, brightness: u8) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.pixels.len() * 3);
        for p in &self.pixels {
            out.extend_from_slice(&[
                scale(p.r(), brightness),
                scale(p.g(), brightness),
                scale(p.b(), brightness),
            ]);
        }
        out
    }

    /// Little-endian RGB565, row-major
    pub fn to_rgb565_bytes(&self, brightness: u8) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.pixels.len() * 2);
        for p in &self.pixels {
            let r = scale(p.r(), brightness) as u16 >> 3;
            let g = scale(p.g(), brightness) as u16 >> 2;
            let b = scale(p.b(), brightness) as u16 >> 3;
            let packed = (r << 11) | (g << 5) | b;
            out.extend_from_slice(&packed.to_le_bytes());
        }
        out
    }
}

fn scale(channel: u8, brightness: u8) -> u8 {
    ((channel as u16 * brightness as u16) / 255) as u8
}

impl OriginDimensions for FrameBuffer {
    fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }
}

impl DrawTarget for FrameBuffer {
    type Color = Rgb888;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(point, color) in pixels {
            if point.x >= 0 && point.y >= 0 {
                let (x, y) = (point.x as u32, point.y as u32);
                if x < self.width && y < self.height {
                    self.pixels[(y * self.width + x) as usize] = color;
                }
            }
        }
        Ok(())
    }
}
