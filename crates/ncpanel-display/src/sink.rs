//! Pixel-push collaborators: where finished frames go

use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

use crate::framebuffer::FrameBuffer;

#[derive(Error, Debug)]
pub enum DisplayError {
    #[error("Display hardware error: {0}")]
    Hardware(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Receives finished frames. Calls are synchronous and bounded.
pub trait PixelSink: Send {
    fn push(&mut self, frame: &FrameBuffer) -> Result<(), DisplayError>;
    /// Blank the panel
    fn clear(&mut self) -> Result<(), DisplayError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PixelFormat {
    #[default]
    Rgb565,
    Rgb888,
}

/// Writes frames to a Linux frame-buffer device (or any seekable file)
pub struct FramebufferSink {
    path: PathBuf,
    file: File,
    format: PixelFormat,
    brightness: u8,
    width: u32,
    height: u32,
}

impl FramebufferSink {
    pub fn open(
        path: &Path,
        format: PixelFormat,
        brightness: u8,
        width: u32,
        height: u32,
    ) -> Result<Self, DisplayError> {
        let file = OpenOptions::new()
            .write(true)
            .create(false)
            .open(path)
            .map_err(|e| DisplayError::Hardware(format!("{}: {}", path.display(), e)))?;
        info!(path = %path.display(), format = ?format, width, height, "Opened frame buffer");
        Ok(Self {
            path: path.to_path_buf(),
            file,
            format,
            brightness,
            width,
            height,
        })
    }

    fn encode(&self, frame: &FrameBuffer) -> Vec<u8> {
        match self.format {
            PixelFormat::Rgb565 => frame.to_rgb565_bytes(self.brightness),
            PixelFormat::Rgb888 => frame.to_rgb888_bytes(self.brightness),
        }
    }

    fn write(&mut self, bytes: &[u8]) -> Result<(), DisplayError> {
        self.file.seek(SeekFrom::Start(0))?;
        self.file.write_all(bytes)?;
        self.file.flush()?;
        Ok(())
    }
}

impl PixelSink for FramebufferSink {
    fn push(&mut self, frame: &FrameBuffer) -> Result<(), DisplayError> {
        if frame.width() != self.width || frame.height() != self.height {
            return Err(DisplayError::Hardware(format!(
                "{}: frame is {}x{}, panel is {}x{}",
                self.path.display(),
                frame.width(),
                frame.height(),
                self.width,
                self.height
            )));
        }
        let bytes = self.encode(frame);
        self.write(&bytes)
    }

    fn clear(&mut self) -> Result<(), DisplayError> {
        let blank = FrameBuffer::new(self.width, self.height);
        let bytes = self.encode(&blank);
        self.write(&bytes)
    }
}

/// Headless sink: logs a digest of each frame and never fails
#[derive(Debug, Default)]
pub struct LogSink {
    frames: u64,
}

impl LogSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }
}

impl PixelSink for LogSink {
    fn push(&mut self, frame: &FrameBuffer) -> Result<(), DisplayError> {
        self.frames += 1;
        let lit = frame
            .pixels()
            .iter()
            .filter(|p| **p != embedded_graphics::pixelcolor::Rgb888::new(0, 0, 0))
            .count();
        debug!(frame = self.frames, lit, "Frame pushed (headless)");
        Ok(())
    }

    fn clear(&mut self) -> Result<(), DisplayError> {
        debug!("Display cleared (headless)");
        Ok(())
    }
}
