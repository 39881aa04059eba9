//! Host-page element handles
//!
//! Thin interior-mutable handles for the pieces of the host page the
//! compositor touches: the video element whose frame source gets redirected,
//! the audio element whose clock drives lyric timing, and the floating-window
//! activation flag. The host embedding (or a test) owns and drives these; the
//! compositor only reads them and swaps the video's source.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::{Mutex, RwLock};

use crate::stream::FrameSource;

/// The video element presenting the floating window.
pub struct VideoElement {
    src_object: RwLock<Option<Arc<FrameSource>>>,
    paused: AtomicBool,
}

impl VideoElement {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            src_object: RwLock::new(None),
            paused: AtomicBool::new(false),
        })
    }

    pub fn src_object(&self) -> Option<Arc<FrameSource>> {
        self.src_object.read().clone()
    }

    pub fn set_src_object(&self, source: Arc<FrameSource>) {
        *self.src_object.write() = Some(source);
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::Acquire)
    }

    pub fn pause(&self) {
        self.paused.store(true, Ordering::Release);
    }

    pub fn play(&self) {
        self.paused.store(false, Ordering::Release);
    }
}

/// The audio element whose playback clock the overlay follows.
pub struct AudioElement {
    current_time: Mutex<f64>,
}

impl AudioElement {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            current_time: Mutex::new(0.0),
        })
    }

    /// Live playback position in seconds. May jitter backwards briefly around
    /// seeks; the compositor clamps for display but stores this raw value.
    pub fn current_time(&self) -> f64 {
        *self.current_time.lock()
    }

    pub fn set_current_time(&self, seconds: f64) {
        *self.current_time.lock() = seconds;
    }
}

/// The slice of host-page state the compositor observes each tick.
///
/// Video and audio are optional because the host may not have located them
/// yet; every precondition failure is a normal idle tick, not an error.
pub struct Page {
    video: RwLock<Option<Arc<VideoElement>>>,
    audio: RwLock<Option<Arc<AudioElement>>>,
    pip_active: AtomicBool,
}

impl Page {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            video: RwLock::new(None),
            audio: RwLock::new(None),
            pip_active: AtomicBool::new(false),
        })
    }

    pub fn video(&self) -> Option<Arc<VideoElement>> {
        self.video.read().clone()
    }

    pub fn attach_video(&self, video: Arc<VideoElement>) {
        *self.video.write() = Some(video);
    }

    pub fn audio(&self) -> Option<Arc<AudioElement>> {
        self.audio.read().clone()
    }

    pub fn attach_audio(&self, audio: Arc<AudioElement>) {
        *self.audio.write() = Some(audio);
    }

    /// Whether the floating-window (picture-in-picture) presentation is
    /// currently active.
    pub fn pip_active(&self) -> bool {
        self.pip_active.load(Ordering::Acquire)
    }

    pub fn set_pip_active(&self, active: bool) {
        self.pip_active.store(active, Ordering::Release);
    }
}
