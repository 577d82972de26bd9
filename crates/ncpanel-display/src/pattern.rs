//! Wiring check pattern: three filled shapes in the primary colors

use embedded_graphics::pixelcolor::Rgb888;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::{Circle, PrimitiveStyle, Rectangle, Triangle};

use crate::framebuffer::FrameBuffer;

pub const PATTERN_GREEN: Rgb888 = Rgb888::new(0, 136, 0);
pub const PATTERN_RED: Rgb888 = Rgb888::new(136, 0, 0);
pub const PATTERN_BLUE: Rgb888 = Rgb888::new(0, 0, 136);

/// Green square, red circle and blue triangle along the top-left edge.
///
/// A swapped channel or mirrored axis on the panel is obvious at a glance.
pub fn draw_test_pattern(frame: &mut FrameBuffer) {
    frame.fill(Rgb888::BLACK);

    let square = Rectangle::with_corners(Point::new(2, 2), Point::new(10, 10))
        .into_styled(PrimitiveStyle::with_fill(PATTERN_GREEN));
    let circle = Circle::new(Point::new(14, 2), 9).into_styled(PrimitiveStyle::with_fill(PATTERN_RED));
    let triangle = Triangle::new(Point::new(28, 2), Point::new(32, 10), Point::new(24, 10))
        .into_styled(PrimitiveStyle::with_fill(PATTERN_BLUE));

    for result in [square.draw(frame), circle.draw(frame), triangle.draw(frame)] {
        if let Err(never) = result {
            match never {}
        }
    }
}
