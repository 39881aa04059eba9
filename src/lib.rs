//! pip-lyrics - lyric overlay compositing for floating-window video
//!
//! The floating (always-on-top) window mirrors whatever frame source the
//! host's video element holds, and that surface cannot be drawn on directly.
//! This crate injects time-synced lyric text anyway: it redirects the video
//! element to a canvas-backed synthetic frame source it owns, then redraws
//! that canvas on a fixed cadence with the original video's current frame
//! underneath and rasterized lyric markup on top.
//!
//! - [`compositor`]: redirection controller and the per-tick compositing loop
//! - [`commands`]: cross-context song selection / candidate broadcast intake
//! - [`registry`]: weak identity-keyed side tables for per-track state
//! - [`rasterize`]: SVG markup to RGBA decoding
//! - [`canvas`], [`stream`], [`element`]: overlay surface, frame-source
//!   model, and host-page handles
//! - [`lyrics`]: lyric handles, the current-lyric store, and the external
//!   collaborator traits
//!
//! Wiring is the host's job: build a [`element::Page`], hand it to
//! [`compositor::Compositor::new`] together with a
//! [`lyrics::SnapshotProvider`] and the shared [`lyrics::LyricStore`], spawn
//! [`compositor::Compositor::run`], and feed inbound messages to a
//! [`commands::CommandIntake`].

pub mod canvas;
pub mod commands;
pub mod compositor;
pub mod element;
pub mod lyrics;
pub mod rasterize;
pub mod registry;
pub mod stream;

pub use canvas::{Canvas, HEIGHT, WIDTH};
pub use commands::{CommandIntake, GET_SONGS, SELECT_SONG};
pub use compositor::{Compositor, INTERVAL, TrackState};
pub use element::{AudioElement, Page, VideoElement};
pub use lyrics::{
    Lyric, LyricLine, LyricRequest, LyricStore, SnapshotProvider, SongClient, SongSelection,
};
pub use registry::WeakKeyMap;
pub use stream::{FrameSource, VideoTrack};
