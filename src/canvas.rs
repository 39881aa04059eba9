//! Overlay drawing surface
//!
//! A fixed-size RGBA surface standing in for the lyric canvas. The compositor
//! clears it and blits the cover frame plus the rasterized lyric overlay onto
//! it once per tick; the synthetic frame source hands out snapshots of it.

use anyhow::{Result, ensure};
use image::imageops::{self, FilterType};
use image::{Rgba, RgbaImage};
use parking_lot::Mutex;

/// Overlay surface width in pixels
pub const WIDTH: u32 = 640;
/// Overlay surface height in pixels
pub const HEIGHT: u32 = 640;

/// A shared drawable surface.
///
/// All draw calls scale their input to cover the full surface, matching the
/// full-bleed cover/overlay layout of the floating window.
pub struct Canvas {
    width: u32,
    height: u32,
    surface: Mutex<RgbaImage>,
}

impl Canvas {
    /// Create a surface. Zero-sized surfaces are rejected: without a drawable
    /// surface the whole system cannot function, so this is a startup-fatal
    /// error rather than something to degrade around.
    pub fn new(width: u32, height: u32) -> Result<Self> {
        ensure!(
            width > 0 && height > 0,
            "lyric canvas requires non-zero dimensions, got {}x{}",
            width,
            height
        );
        Ok(Self {
            width,
            height,
            surface: Mutex::new(RgbaImage::new(width, height)),
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Reset every pixel to transparent black.
    pub fn clear(&self) {
        let mut surface = self.surface.lock();
        for pixel in surface.pixels_mut() {
            *pixel = Rgba([0, 0, 0, 0]);
        }
    }

    /// Alpha-over blit scaled to cover the full surface.
    pub fn draw_image(&self, src: &RgbaImage) {
        let mut surface = self.surface.lock();
        if src.dimensions() == (self.width, self.height) {
            imageops::overlay(&mut *surface, src, 0, 0);
        } else {
            let scaled = imageops::resize(src, self.width, self.height, FilterType::Triangle);
            imageops::overlay(&mut *surface, &scaled, 0, 0);
        }
    }

    /// Copy of the current surface contents (the "last rendered frame" a
    /// capture track exposes).
    pub fn snapshot(&self) -> RgbaImage {
        self.surface.lock().clone()
    }
}
