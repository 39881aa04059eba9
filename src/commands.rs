//! Command intake
//!
//! Drains cross-context `{type, data}` messages: a request to broadcast the
//! currently matched song candidates, and an explicit song selection. This is
//! a best-effort intake, not a validated RPC boundary; anything malformed is
//! dropped on the floor.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::compositor::Compositor;
use crate::lyrics::{LyricRequest, SongClient, SongSelection};

/// Message type requesting a matched-song broadcast
pub const GET_SONGS: &str = "GET_SONGS";
/// Message type selecting a song for the displayed video
pub const SELECT_SONG: &str = "SELECT_SONG";

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    data: Value,
}

/// Handles inbound command messages against the running compositor.
pub struct CommandIntake {
    compositor: Arc<Compositor>,
    client: Arc<dyn SongClient>,
}

impl CommandIntake {
    pub fn new(compositor: Arc<Compositor>, client: Arc<dyn SongClient>) -> Self {
        Self { compositor, client }
    }

    /// Drain messages until the sender side closes.
    pub async fn run(self, mut messages: mpsc::Receiver<Value>) {
        while let Some(message) = messages.recv().await {
            self.handle_message(message).await;
        }
    }

    /// Handle one inbound message. Unrecognized or malformed messages are
    /// ignored silently.
    pub async fn handle_message(&self, message: Value) {
        let Ok(envelope) = serde_json::from_value::<Envelope>(message) else {
            return;
        };
        match envelope.kind.as_str() {
            GET_SONGS => self.client.send_matched_data(),
            SELECT_SONG => self.select_song(envelope.data).await,
            _ => {}
        }
    }

    async fn select_song(&self, data: Value) {
        // Selection only makes sense while a source is on display
        if !self.compositor.display_source_bound() {
            return;
        }
        let Ok(selection) = serde_json::from_value::<SongSelection>(data) else {
            return;
        };
        debug!("song selected: {:?}", selection);

        // Persist first; if that fails, leave the displayed state untouched.
        if let Err(err) = self.client.set_song_id(&selection).await {
            warn!("failed to persist song selection: {err:#}");
            return;
        }
        // Drop the cached lyric for the bound track so the next tick renders
        // the freshly resolved one instead of the inherited one.
        self.compositor.clear_bound_track_state();
        match selection.id {
            Some(id) => self.client.update_lyric(LyricRequest::Id(id)),
            None => self.client.update_lyric(LyricRequest::Query {
                name: selection.name,
                artists: selection.artists,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::Canvas;
    use crate::element::{AudioElement, Page, VideoElement};
    use crate::lyrics::{Lyric, LyricLine, LyricStore, SnapshotProvider};
    use crate::stream::FrameSource;
    use anyhow::Result;
    use futures_util::future::BoxFuture;
    use parking_lot::Mutex;
    use serde_json::json;

    struct PlainProvider;

    impl SnapshotProvider for PlainProvider {
        fn generate_markup(&self, _lyric: &Lyric, _time: f64) -> String {
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="8" height="8"/>"#.to_string()
        }
    }

    #[derive(Debug, PartialEq)]
    enum ClientCall {
        SetSongId(Option<u64>),
        SendMatchedData,
        UpdateLyric(LyricRequest),
    }

    struct RecordingClient {
        calls: Mutex<Vec<ClientCall>>,
        fail_set: bool,
    }

    impl RecordingClient {
        fn new(fail_set: bool) -> Arc<Self> {
            Arc::new(Self {
                calls: Mutex::new(Vec::new()),
                fail_set,
            })
        }
    }

    impl SongClient for RecordingClient {
        fn set_song_id(&self, selection: &SongSelection) -> BoxFuture<'static, Result<()>> {
            self.calls.lock().push(ClientCall::SetSongId(selection.id));
            let fail = self.fail_set;
            Box::pin(async move {
                if fail {
                    anyhow::bail!("store unavailable")
                } else {
                    Ok(())
                }
            })
        }

        fn send_matched_data(&self) {
            self.calls.lock().push(ClientCall::SendMatchedData);
        }

        fn update_lyric(&self, request: LyricRequest) {
            self.calls.lock().push(ClientCall::UpdateLyric(request));
        }
    }

    struct Fixture {
        intake: CommandIntake,
        compositor: Arc<Compositor>,
        client: Arc<RecordingClient>,
        video: Arc<VideoElement>,
        store: Arc<LyricStore>,
    }

    async fn fixture(fail_set: bool) -> Fixture {
        let page = Page::new();
        let store = LyricStore::new();
        let compositor =
            Compositor::new(page.clone(), store.clone(), Arc::new(PlainProvider)).unwrap();

        let cover_canvas = Arc::new(Canvas::new(8, 8).unwrap());
        let video = VideoElement::new();
        video.set_src_object(FrameSource::capture(&cover_canvas));
        let audio = AudioElement::new();
        page.attach_video(video.clone());
        page.attach_audio(audio);
        page.set_pip_active(true);

        // One tick so a track is bound and carries state
        store.set(Lyric::new(vec![LyricLine {
            start: 0.0,
            text: "line".into(),
        }]));
        compositor.tick().await;

        let client = RecordingClient::new(fail_set);
        let intake = CommandIntake::new(compositor.clone(), client.clone());
        Fixture {
            intake,
            compositor,
            client,
            video,
            store,
        }
    }

    fn bound_track(f: &Fixture) -> Arc<crate::stream::VideoTrack> {
        let source = f.video.src_object().unwrap();
        // The compositor registered the cover track under the synthetic source
        f.compositor
            .bound_cover_track(&source)
            .expect("track bound after tick")
    }

    #[tokio::test]
    async fn test_get_songs_broadcasts_only() {
        let f = fixture(false).await;
        let track = bound_track(&f);
        f.intake
            .handle_message(json!({ "type": GET_SONGS }))
            .await;
        assert_eq!(*f.client.calls.lock(), vec![ClientCall::SendMatchedData]);
        // No state mutation
        assert!(f.compositor.track_state(&track).is_some());
    }

    #[tokio::test]
    async fn test_select_song_by_id() {
        let f = fixture(false).await;
        let track = bound_track(&f);
        f.intake
            .handle_message(json!({
                "type": SELECT_SONG,
                "data": { "id": 42, "name": "X", "artists": ["Y"] },
            }))
            .await;
        assert_eq!(
            *f.client.calls.lock(),
            vec![
                ClientCall::SetSongId(Some(42)),
                ClientCall::UpdateLyric(LyricRequest::Id(42)),
            ]
        );
        // Cached lyric dropped before update_lyric ran
        assert!(f.compositor.track_state(&track).is_none());
    }

    #[tokio::test]
    async fn test_select_song_by_query_when_id_absent() {
        let f = fixture(false).await;
        f.intake
            .handle_message(json!({
                "type": SELECT_SONG,
                "data": { "name": "X", "artists": ["Y"] },
            }))
            .await;
        assert_eq!(
            *f.client.calls.lock(),
            vec![
                ClientCall::SetSongId(None),
                ClientCall::UpdateLyric(LyricRequest::Query {
                    name: "X".into(),
                    artists: vec!["Y".into()],
                }),
            ]
        );
    }

    #[tokio::test]
    async fn test_failed_persist_leaves_state_alone() {
        let f = fixture(true).await;
        let track = bound_track(&f);
        f.intake
            .handle_message(json!({
                "type": SELECT_SONG,
                "data": { "id": 1, "name": "X", "artists": [] },
            }))
            .await;
        assert_eq!(*f.client.calls.lock(), vec![ClientCall::SetSongId(Some(1))]);
        assert!(f.compositor.track_state(&track).is_some());
    }

    #[tokio::test]
    async fn test_malformed_messages_ignored() {
        let f = fixture(false).await;
        f.intake.handle_message(json!("just a string")).await;
        f.intake.handle_message(json!({ "no_type": 1 })).await;
        f.intake
            .handle_message(json!({ "type": "UNKNOWN" }))
            .await;
        f.intake
            .handle_message(json!({ "type": SELECT_SONG, "data": { "id": "wrong shape" } }))
            .await;
        assert!(f.client.calls.lock().is_empty());
    }

    #[tokio::test]
    async fn test_run_drains_channel() {
        let f = fixture(false).await;
        let (tx, rx) = mpsc::channel(8);
        tx.send(json!({ "type": GET_SONGS })).await.unwrap();
        tx.send(json!({ "type": GET_SONGS })).await.unwrap();
        drop(tx);
        f.intake.run(rx).await;
        assert_eq!(
            *f.client.calls.lock(),
            vec![ClientCall::SendMatchedData, ClientCall::SendMatchedData]
        );
        // Store untouched by intake itself
        assert!(!f.store.current().is_empty());
    }
}
