use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use musify_audio::{MediaElement, MediaError, MediaEvent, MediaResult, MediaSource};
use musify_core::{CatalogError, CatalogService, StreamUrl, Track};
use thiserror::Error;

/// Transport state mirrored for the player bar.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PlaybackState {
    pub current_track: Option<Track>,
    /// Empty until a track was resolved.
    pub stream_url: StreamUrl,
    /// Desired state; may differ from what the media element managed to do.
    pub is_playing: bool,
    pub position: f64,
    pub duration: f64,
    pub last_error: Option<String>,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PlaybackError {
    #[error("failed to resolve stream: {0}")]
    Resolve(#[from] CatalogError),
    #[error("media failure: {0}")]
    Media(#[from] MediaError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayOutcome {
    Started,
    /// A later `play` call was made before this one resolved.
    Superseded,
    Failed(PlaybackError),
}

struct Inner {
    state: PlaybackState,
    media: Box<dyn MediaElement>,
    latest_request: u64,
}

/// Owns the single media element and at most one current track.
pub struct PlaybackController {
    catalog: Arc<dyn CatalogService>,
    inner: Mutex<Inner>,
}

fn start_media(media: &mut dyn MediaElement, source: &MediaSource) -> MediaResult<()> {
    media.load(source)?;
    media.play()
}

impl PlaybackController {
    pub fn new(catalog: Arc<dyn CatalogService>, media: Box<dyn MediaElement>) -> Self {
        Self {
            catalog,
            inner: Mutex::new(Inner {
                state: PlaybackState::default(),
                media,
                latest_request: 0,
            }),
        }
    }

    fn inner(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn snapshot(&self) -> PlaybackState {
        self.inner().state.clone()
    }

    /// Resolves a fresh URL for `track` and starts it, replacing whatever was
    /// playing. On resolution failure the previous track keeps playing.
    pub async fn play(&self, track: Track) -> PlayOutcome {
        let request = {
            let mut inner = self.inner();
            inner.latest_request += 1;
            inner.latest_request
        };
        tracing::debug!(request, key = %track.key, "resolving stream url");

        let resolved = self.catalog.resolve_stream_url(&track.key).await;

        let mut inner = self.inner();
        if inner.latest_request != request {
            tracing::debug!(request, key = %track.key, "ignoring superseded stream url");
            return PlayOutcome::Superseded;
        }

        let url = match resolved {
            Ok(url) => url,
            Err(err) => {
                tracing::warn!(key = %track.key, error = %err, "failed to resolve stream url");
                inner.state.last_error = Some(err.to_string());
                return PlayOutcome::Failed(err.into());
            }
        };

        let source = MediaSource::new(url.clone()).with_duration_hint(track.duration_seconds);
        tracing::info!(key = %track.key, song = %track.song_name, "starting playback");
        inner.state = PlaybackState {
            current_track: Some(track),
            stream_url: url,
            is_playing: true,
            position: 0.0,
            duration: 0.0,
            last_error: None,
        };

        match start_media(inner.media.as_mut(), &source) {
            Ok(()) => PlayOutcome::Started,
            Err(err) => {
                Self::media_failed(&mut inner.state, &err);
                PlayOutcome::Failed(err.into())
            }
        }
    }

    /// Flips play/pause. Returns the new desired state; without a current
    /// track nothing happens and `false` is returned.
    pub fn toggle_play_pause(&self) -> bool {
        let mut inner = self.inner();
        if inner.state.current_track.is_none() {
            return false;
        }
        let Inner { state, media, .. } = &mut *inner;
        state.is_playing = !state.is_playing;
        if state.is_playing {
            if let Err(err) = media.play() {
                Self::media_failed(state, &err);
            }
        } else {
            media.pause();
        }
        state.is_playing
    }

    /// Seeks to `fraction` of the known duration. The fraction is clamped to
    /// `[0, 1]`; NaN counts as 0.
    pub fn seek(&self, fraction: f64) {
        let mut inner = self.inner();
        if inner.state.current_track.is_none() {
            return;
        }
        let fraction = if fraction.is_nan() {
            0.0
        } else {
            fraction.clamp(0.0, 1.0)
        };
        let Inner { state, media, .. } = &mut *inner;
        let target = fraction * state.duration;
        if let Err(err) = media.seek(target) {
            tracing::warn!(target, error = %err, "seek failed");
            state.last_error = Some(err.to_string());
            return;
        }
        state.position = target;
    }

    pub fn on_time_update(&self, position: f64) {
        self.inner().state.position = sanitize(position);
    }

    pub fn on_duration_known(&self, duration: f64) {
        self.inner().state.duration = sanitize(duration);
    }

    pub fn on_ended(&self) {
        self.inner().state.is_playing = false;
    }

    pub fn on_media_error(&self, message: &str) {
        let mut inner = self.inner();
        let err = MediaError::Backend(message.to_string());
        Self::media_failed(&mut inner.state, &err);
    }

    /// Drains pending media element events into the state above. Meant to be
    /// called from the shell's tick.
    pub fn pump_media_events(&self) {
        let events = self.inner().media.poll_events();
        for event in events {
            match event {
                MediaEvent::TimeUpdate(position) => self.on_time_update(position),
                MediaEvent::DurationKnown(duration) => self.on_duration_known(duration),
                MediaEvent::Ended => self.on_ended(),
                MediaEvent::Error(message) => self.on_media_error(&message),
            }
        }
    }

    fn media_failed(state: &mut PlaybackState, err: &MediaError) {
        tracing::warn!(error = %err, "media element failed; pausing");
        state.is_playing = false;
        state.last_error = Some(err.to_string());
    }
}

fn sanitize(seconds: f64) -> f64 {
    if seconds.is_finite() && seconds > 0.0 {
        seconds
    } else {
        0.0
    }
}
