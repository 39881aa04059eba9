//! Markup-to-image pipeline
//!
//! Decodes the snapshot provider's SVG markup into an RGBA image the canvas
//! can blit. Decoding is CPU work, so the async entry point pushes it onto
//! the blocking pool; the compositor awaits it as its single per-tick
//! suspension point.

use anyhow::{Context, Result};
use image::RgbaImage;
use resvg::{tiny_skia, usvg};

/// Rasterize SVG markup to `width` x `height`, scaling the document to fill
/// the target.
pub fn render_markup(markup: &str, width: u32, height: u32) -> Result<RgbaImage> {
    let options = usvg::Options::default();
    let tree = usvg::Tree::from_str(markup, &options).context("parse overlay markup")?;

    let mut pixmap =
        tiny_skia::Pixmap::new(width, height).context("allocate overlay pixmap")?;
    let size = tree.size();
    let transform = tiny_skia::Transform::from_scale(
        width as f32 / size.width(),
        height as f32 / size.height(),
    );
    resvg::render(&tree, transform, &mut pixmap.as_mut());

    // tiny-skia stores premultiplied alpha; undo it for the canvas blend.
    let mut data = Vec::with_capacity((width * height * 4) as usize);
    for pixel in pixmap.pixels() {
        let color = pixel.demultiply();
        data.extend_from_slice(&[color.red(), color.green(), color.blue(), color.alpha()]);
    }
    RgbaImage::from_raw(width, height, data).context("overlay pixel buffer size mismatch")
}

/// Async wrapper: decode on the blocking pool so the tick loop never blocks
/// the runtime on rasterization.
pub async fn load_markup(markup: String, width: u32, height: u32) -> Result<RgbaImage> {
    tokio::task::spawn_blocking(move || render_markup(&markup, width, height))
        .await
        .context("overlay rasterization task failed")?
}
