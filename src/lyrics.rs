//! Lyric handles and collaborator interfaces
//!
//! This module owns the crate's view of lyrics and the seams to the external
//! collaborators:
//! - `Lyric`: a cheaply-clonable handle with pointer identity
//! - `LyricStore`: the process-wide "current lyric" slot with
//!   publish-on-change observers
//! - `SnapshotProvider`: lyric + timestamp → drawable SVG markup
//! - `SongClient`: song selection persistence, matched-song broadcast, and
//!   lyric resolution by id or query
//!
//! Lyric acquisition and parsing happen upstream; this crate only consumes
//! the parsed form.

use std::sync::Arc;

use anyhow::Result;
use futures_util::future::BoxFuture;
use parking_lot::{Mutex, RwLock};
use serde::Deserialize;

/// One timed lyric line.
#[derive(Debug, Clone, PartialEq)]
pub struct LyricLine {
    /// Line start time in seconds
    pub start: f64,
    pub text: String,
}

/// A parsed lyric: an immutable, shared sequence of timed lines.
///
/// Clones share the same allocation; `Lyric::same` compares that allocation,
/// which is what the compositor's error deduplication and "lyric changed"
/// checks key on. Two structurally equal lyrics from separate parses are
/// deliberately *not* `same`.
#[derive(Debug, Clone)]
pub struct Lyric {
    lines: Arc<[LyricLine]>,
}

impl Lyric {
    pub fn new(lines: Vec<LyricLine>) -> Self {
        Self {
            lines: lines.into(),
        }
    }

    /// A lyric with no lines (nothing to display).
    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn lines(&self) -> &[LyricLine] {
        &self.lines
    }

    /// The line visible at `time`: the last line starting at or before it.
    pub fn line_at(&self, time: f64) -> Option<&LyricLine> {
        self.lines
            .iter()
            .take_while(|line| line.start <= time)
            .last()
    }

    /// Identity comparison (same allocation).
    pub fn same(a: &Lyric, b: &Lyric) -> bool {
        Arc::ptr_eq(&a.lines, &b.lines)
    }
}

impl Default for Lyric {
    fn default() -> Self {
        Self::empty()
    }
}

type LyricObserver = Box<dyn Fn(&Lyric) + Send + Sync>;

/// The single mutable "current lyric" reference.
///
/// External song observation writes here; the compositor reads it on every
/// tick through an injected handle. Observers registered with `observe` fire
/// on every `set`, so a host can chain further updates off lyric changes.
pub struct LyricStore {
    current: RwLock<Lyric>,
    observers: Mutex<Vec<LyricObserver>>,
}

impl LyricStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            current: RwLock::new(Lyric::empty()),
            observers: Mutex::new(Vec::new()),
        })
    }

    pub fn current(&self) -> Lyric {
        self.current.read().clone()
    }

    /// Replace the current lyric and notify observers.
    pub fn set(&self, lyric: Lyric) {
        *self.current.write() = lyric.clone();
        for observer in self.observers.lock().iter() {
            observer(&lyric);
        }
    }

    pub fn observe(&self, observer: impl Fn(&Lyric) + Send + Sync + 'static) {
        self.observers.lock().push(Box::new(observer));
    }
}

/// Produces drawable markup for a lyric at an instant.
///
/// Must be pure and total: the same (lyric, time) pair always yields the same
/// markup, and every lyric the system may hold (the empty lyric included)
/// yields *some* markup rather than panicking.
pub trait SnapshotProvider: Send + Sync {
    fn generate_markup(&self, lyric: &Lyric, time: f64) -> String;
}

/// A song selected via command intake.
#[derive(Debug, Clone, Deserialize)]
pub struct SongSelection {
    #[serde(default)]
    pub id: Option<u64>,
    pub name: String,
    pub artists: Vec<String>,
}

/// How the lyric collaborator should resolve the next lyric.
#[derive(Debug, Clone, PartialEq)]
pub enum LyricRequest {
    /// Resolve by known song id
    Id(u64),
    /// Resolve by metadata search
    Query { name: String, artists: Vec<String> },
}

/// External song/lyric collaborator surface.
pub trait SongClient: Send + Sync {
    /// Persist a song selection. Command intake waits for settlement before
    /// touching any local state.
    fn set_song_id(&self, selection: &SongSelection) -> BoxFuture<'static, Result<()>>;

    /// Broadcast the currently matched song candidates. Fire-and-forget.
    fn send_matched_data(&self);

    /// Kick off lyric resolution for the given request.
    fn update_lyric(&self, request: LyricRequest);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lyric(text: &str) -> Lyric {
        Lyric::new(vec![LyricLine {
            start: 0.0,
            text: text.into(),
        }])
    }

    #[test]
    fn test_identity_semantics() {
        let a = lyric("hello");
        let b = a.clone();
        let c = lyric("hello");
        assert!(Lyric::same(&a, &b));
        assert!(!Lyric::same(&a, &c));
    }

    #[test]
    fn test_line_at_picks_latest_started() {
        let lyric = Lyric::new(vec![
            LyricLine {
                start: 0.0,
                text: "one".into(),
            },
            LyricLine {
                start: 5.0,
                text: "two".into(),
            },
            LyricLine {
                start: 10.0,
                text: "three".into(),
            },
        ]);
        assert_eq!(lyric.line_at(4.9).unwrap().text, "one");
        assert_eq!(lyric.line_at(5.0).unwrap().text, "two");
        assert_eq!(lyric.line_at(99.0).unwrap().text, "three");
        assert!(Lyric::empty().line_at(0.0).is_none());
    }

    #[test]
    fn test_store_publishes_on_set() {
        let store = LyricStore::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        store.observe(move |lyric| sink.lock().push(lyric.lines().len()));
        store.set(lyric("a"));
        store.set(Lyric::empty());
        assert_eq!(*seen.lock(), vec![1, 0]);
        assert!(store.current().is_empty());
    }
}
