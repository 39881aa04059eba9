//! Frame-source model
//!
//! Mirrors the host environment's media-stream objects at the granularity the
//! compositor needs: a `FrameSource` is a bag of video tracks, a `VideoTrack`
//! is one video-bearing channel. Canvas-captured sources carry a
//! back-reference to the canvas that produces their frames; some hosts omit
//! that reference on the track itself, so it is settable after the fact.

use std::sync::Arc;

use image::RgbaImage;
use parking_lot::RwLock;

use crate::canvas::Canvas;

/// One video-bearing media channel.
///
/// Identity matters: tracks are compared and keyed by their `Arc` allocation,
/// never by contents.
pub struct VideoTrack {
    canvas: RwLock<Option<Arc<Canvas>>>,
}

impl VideoTrack {
    pub fn new(canvas: Option<Arc<Canvas>>) -> Arc<Self> {
        Arc::new(Self {
            canvas: RwLock::new(canvas),
        })
    }

    /// The canvas whose contents this track exposes, if known.
    pub fn canvas(&self) -> Option<Arc<Canvas>> {
        self.canvas.read().clone()
    }

    /// Backfill a missing canvas back-reference (host quirk compensation).
    pub fn set_canvas(&self, canvas: Arc<Canvas>) {
        *self.canvas.write() = Some(canvas);
    }

    /// Snapshot of the track's most recent frame, if a readable surface is
    /// attached.
    pub fn frame(&self) -> Option<RgbaImage> {
        self.canvas().map(|canvas| canvas.snapshot())
    }
}

/// An abstract producer of successive video frames.
pub struct FrameSource {
    tracks: Vec<Arc<VideoTrack>>,
    canvas: Option<Arc<Canvas>>,
}

impl FrameSource {
    /// Build a source from explicit tracks. `canvas` is the source-level
    /// back-reference a canvas capture carries; pass `None` for sources that
    /// are not canvas-backed.
    pub fn new(tracks: Vec<Arc<VideoTrack>>, canvas: Option<Arc<Canvas>>) -> Arc<Self> {
        Arc::new(Self { tracks, canvas })
    }

    /// Capture a canvas as a frame source: one video track reading the canvas,
    /// back-references set on both source and track.
    pub fn capture(canvas: &Arc<Canvas>) -> Arc<Self> {
        Self::new(
            vec![VideoTrack::new(Some(canvas.clone()))],
            Some(canvas.clone()),
        )
    }

    pub fn video_tracks(&self) -> &[Arc<VideoTrack>] {
        &self.tracks
    }

    pub fn first_video_track(&self) -> Option<Arc<VideoTrack>> {
        self.tracks.first().cloned()
    }

    /// The producing canvas, when the source is canvas-captured.
    pub fn canvas(&self) -> Option<&Arc<Canvas>> {
        self.canvas.as_ref()
    }
}
