//! Redirection controller and compositing loop
//!
//! The floating window renders whatever frame source the video element holds,
//! and that surface cannot be given extra content directly. So the compositor
//! owns one canvas-backed synthetic source, swaps it in as the video's source
//! the first time each original source shows up, and then redraws the canvas
//! on a fixed cadence: original cover frame below, rasterized lyric markup on
//! top.
//!
//! One logical loop does both jobs. Each tick either idles (floating window
//! inactive, elements missing) or composites, and always reschedules after
//! [`INTERVAL`]. The reschedule is issued after the tick's rasterization
//! settles, so ticks never overlap on the shared canvas.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use parking_lot::Mutex;
use tracing::{debug, error, warn};

use crate::canvas::{Canvas, HEIGHT, WIDTH};
use crate::element::{AudioElement, Page, VideoElement};
use crate::lyrics::{Lyric, LyricStore, SnapshotProvider};
use crate::rasterize;
use crate::registry::WeakKeyMap;
use crate::stream::{FrameSource, VideoTrack};

/// Compositing cadence; bounds overlay latency to roughly one interval.
pub const INTERVAL: Duration = Duration::from_millis(80);

/// Per-cover-track render state, held weakly so it disappears with the track.
#[derive(Debug, Clone, Default)]
pub struct TrackState {
    /// Last lyric actually composited for this track
    pub last_lyric: Option<Lyric>,
    /// Last raw playback time observed (seconds); display clamps against
    /// this, the stored value itself is unclamped
    pub last_time: f64,
}

/// Owns the synthetic frame source and runs the per-tick state machine.
pub struct Compositor {
    page: Arc<Page>,
    store: Arc<LyricStore>,
    provider: Arc<dyn SnapshotProvider>,
    canvas: Arc<Canvas>,
    overlay_track: Arc<VideoTrack>,
    /// Synthetic source → the cover track it replaced
    redirects: WeakKeyMap<FrameSource, Arc<VideoTrack>>,
    /// Cover track → render state
    states: WeakKeyMap<VideoTrack, TrackState>,
    /// Most recent lyric whose markup failed to decode, for log dedup
    error_lyric: Mutex<Option<Lyric>>,
}

impl Compositor {
    /// Create the compositor and its single synthetic canvas/track pair.
    ///
    /// Fails only if the overlay surface cannot be created; there is nothing
    /// useful to do without one, so initialization aborts loudly.
    pub fn new(
        page: Arc<Page>,
        store: Arc<LyricStore>,
        provider: Arc<dyn SnapshotProvider>,
    ) -> Result<Arc<Self>> {
        let canvas = Arc::new(Canvas::new(WIDTH, HEIGHT)?);
        let overlay_track = VideoTrack::new(Some(canvas.clone()));
        Ok(Arc::new(Self {
            page,
            store,
            provider,
            canvas,
            overlay_track,
            redirects: WeakKeyMap::new(),
            states: WeakKeyMap::new(),
            error_lyric: Mutex::new(None),
        }))
    }

    /// The shared overlay surface (what the floating window displays).
    pub fn canvas(&self) -> &Arc<Canvas> {
        &self.canvas
    }

    /// Run for the page's lifetime. Never returns; the host drops the task at
    /// teardown.
    pub async fn run(self: Arc<Self>) {
        loop {
            self.tick().await;
            tokio::time::sleep(INTERVAL).await;
        }
    }

    /// One scheduling tick: idle or composite, then return so the caller can
    /// resleep. All errors are contained here; a tick never aborts the loop.
    pub async fn tick(&self) {
        let Some((video, audio, source)) = self.preconditions() else {
            return;
        };

        let cover = match self.redirects.get(&source) {
            Some(track) => track,
            None => match self.redirect(&video, &source) {
                Some(track) => track,
                None => return,
            },
        };

        let mut state = self.states.get(&cover).unwrap_or_default();
        let audio_time = audio.current_time();
        // Clamp what we draw, not what we store: a transient backwards jump in
        // the reported time must not rewind the overlay.
        let render_time = audio_time.max(state.last_time);
        let lyric = state
            .last_lyric
            .clone()
            .unwrap_or_else(|| self.store.current());
        let markup = self.provider.generate_markup(&lyric, render_time);
        state.last_time = audio_time;
        self.states.set(&cover, state.clone());

        // Single suspension point: draw only once the decode settles.
        match rasterize::load_markup(markup, self.canvas.width(), self.canvas.height()).await {
            Ok(overlay) => {
                self.canvas.clear();
                if let Some(frame) = cover.frame() {
                    self.canvas.draw_image(&frame);
                }
                let current = self.store.current();
                if !current.is_empty() {
                    state.last_lyric = Some(current);
                    self.states.set(&cover, state);
                    self.canvas.draw_image(&overlay);
                }
            }
            Err(err) => {
                let mut marker = self.error_lyric.lock();
                let already_logged = marker
                    .as_ref()
                    .is_some_and(|logged| Lyric::same(logged, &lyric));
                if !already_logged {
                    error!("overlay markup failed to decode: {err:#}");
                    *marker = Some(lyric);
                }
                drop(marker);
                if let Some(frame) = cover.frame() {
                    self.canvas.draw_image(&frame);
                }
            }
        }
    }

    /// Forget the render state of the track bound to the displayed source, so
    /// the next tick re-renders without the inherited lyric. Driven by
    /// explicit song selection.
    pub fn clear_bound_track_state(&self) {
        let Some(source) = self.displayed_source() else {
            return;
        };
        if let Some(track) = self.redirects.get(&source) {
            self.states.remove(&track);
        }
    }

    /// Whether the video element currently displays any source.
    pub fn display_source_bound(&self) -> bool {
        self.displayed_source().is_some()
    }

    /// Render state for a cover track, if any tick has created it.
    pub fn track_state(&self, track: &Arc<VideoTrack>) -> Option<TrackState> {
        self.states.get(track)
    }

    /// The cover track registered for a redirected (synthetic) source.
    pub fn bound_cover_track(&self, source: &Arc<FrameSource>) -> Option<Arc<VideoTrack>> {
        self.redirects.get(source)
    }

    fn displayed_source(&self) -> Option<Arc<FrameSource>> {
        self.page.video()?.src_object()
    }

    /// All-or-nothing precondition check; any missing piece is a normal idle
    /// tick.
    fn preconditions(
        &self,
    ) -> Option<(Arc<VideoElement>, Arc<AudioElement>, Arc<FrameSource>)> {
        let video = self.page.video()?;
        let audio = self.page.audio()?;
        let source = video.src_object()?;
        if !self.page.pip_active() {
            return None;
        }
        Some((video, audio, source))
    }

    /// One-time substitution of the video's source for a given original
    /// source. Returns the extracted cover track, or `None` when the source
    /// carries no video track at all.
    fn redirect(
        &self,
        video: &Arc<VideoElement>,
        source: &Arc<FrameSource>,
    ) -> Option<Arc<VideoTrack>> {
        let Some(cover) = source.first_video_track() else {
            warn!("displayed source has no video track, skipping redirection");
            return None;
        };
        if cover.canvas().is_none() {
            // Some hosts omit the canvas back-reference on capture tracks;
            // the source-level reference is authoritative in that case.
            if let Some(canvas) = source.canvas() {
                warn!("cover track missing canvas back-reference, copying from source");
                cover.set_canvas(canvas.clone());
            }
        }
        let synthetic = FrameSource::new(vec![self.overlay_track.clone()], Some(self.canvas.clone()));
        video.set_src_object(synthetic.clone());
        self.redirects.set(&synthetic, cover.clone());
        if video.is_paused() {
            debug!("resuming playback after source redirection");
            video.play();
        }
        debug!("redirected video to the lyric overlay source");
        Some(cover)
    }
}
