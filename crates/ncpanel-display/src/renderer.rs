//! Stateful, dirty-checked renderer

use embedded_graphics::pixelcolor::Rgb888;
use embedded_graphics::prelude::*;
use ncpanel_core::{Address, Clock, ConnectionState, TelemetrySnapshot};
use std::sync::Arc;
use tracing::{debug, trace};

use crate::framebuffer::FrameBuffer;
use crate::glyphs::GlyphRenderer;
use crate::layout::{state_color, DisplayFrame, Indicator, Layout, AXIS_COLORS, STATUS_COLOR};
use crate::sink::{DisplayError, PixelSink};

/// Owns the previous-frame cache; never mutates telemetry
pub struct Renderer {
    sink: Box<dyn PixelSink>,
    glyphs: Box<dyn GlyphRenderer>,
    clock: Arc<dyn Clock>,
    layout: Layout,
    frame: FrameBuffer,
    previous: Option<DisplayFrame>,
}

impl Renderer {
    pub fn new(
        sink: Box<dyn PixelSink>,
        glyphs: Box<dyn GlyphRenderer>,
        clock: Arc<dyn Clock>,
        layout: Layout,
    ) -> Self {
        Self {
            sink,
            glyphs,
            clock,
            frame: FrameBuffer::new(layout.width, layout.height),
            layout,
            previous: None,
        }
    }

    /// Last frame handed to the sink
    pub fn frame(&self) -> &FrameBuffer {
        &self.frame
    }

    /// Update the panel for the given inputs.
    ///
    /// Returns whether a frame was pushed. Text is repainted only when the
    /// state/coordinates key or the connection status changed; otherwise only
    /// the indicator is re-evaluated, and pushed if its blink phase moved.
    pub fn render(
        &mut self,
        snapshot: Option<&TelemetrySnapshot>,
        connection: ConnectionState,
        address: Option<&Address>,
    ) -> Result<bool, DisplayError> {
        let next = DisplayFrame::compose(snapshot, connection, address, self.clock.unix_seconds());

        let repaint = match &self.previous {
            Some(prev) if prev.same_content(&next) => {
                if prev.indicator == next.indicator {
                    return Ok(false);
                }
                trace!(indicator = ?next.indicator, "Indicator blink");
                false
            }
            _ => true,
        };

        if repaint {
            debug!(status = %next.status, key = ?next.key, "Repainting display");
            self.paint(&next);
        }
        self.draw_indicator(next.indicator);

        self.sink.push(&self.frame)?;
        self.previous = Some(next);
        Ok(true)
    }

    /// Blank the panel and forget the previous frame
    pub fn clear(&mut self) -> Result<(), DisplayError> {
        self.frame.fill(Rgb888::BLACK);
        self.previous = None;
        self.sink.clear()
    }

    fn paint(&mut self, content: &DisplayFrame) {
        let width = self.layout.width as i32;
        self.frame.fill(Rgb888::BLACK);

        let font = self.glyphs.fit(&content.status, self.layout.status_width());
        let w = self.glyphs.text_width(&content.status, font) as i32;
        self.glyphs.draw_text(
            &mut self.frame,
            &content.status,
            Point::new(width - w, 0),
            STATUS_COLOR,
            font,
        );

        let state_token = content.state.map(|state| {
            let token = state.as_str();
            let font = self.glyphs.fit(token, self.layout.width);
            (state, token, font, self.glyphs.text_width(token, font))
        });
        let state_width = state_token.map_or(0, |(_, _, _, w)| w);

        if let Some(axes) = &content.axes {
            for (i, (line, color)) in axes.iter().zip(AXIS_COLORS).enumerate() {
                let available = if i == 2 {
                    self.layout.width.saturating_sub(state_width + 1)
                } else {
                    self.layout.width
                };
                let font = self.glyphs.fit(line, available);
                let origin = Point::new(0, self.layout.axis_row(i as u32));
                self.glyphs.draw_text(&mut self.frame, line, origin, color, font);
            }
        }

        // The state token owns its cell on the Z row, even over a long Z line.
        if let Some((state, token, font, w)) = state_token {
            let x = width - w as i32;
            let y = self.layout.axis_row(2);
            self.frame.fill_rect(
                x.max(0) as u32,
                y.max(0) as u32,
                w,
                self.layout.line_height,
                Rgb888::BLACK,
            );
            self.glyphs.draw_text(&mut self.frame, token, Point::new(x, y), state_color(state), font);
        }
    }

    /// Drawn last so nothing overdraws it
    fn draw_indicator(&mut self, indicator: Indicator) {
        let origin = self.layout.indicator_origin();
        let size = self.layout.indicator_size;
        self.frame.fill_rect(origin.x as u32, origin.y as u32, size, size, indicator.color());
    }
}
