use std::time::{Duration, Instant};

use musify_core::StreamUrl;
use thiserror::Error;

/// Failures of the media element to load or play a resolved URL.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MediaError {
    #[error("media backend unavailable: {0}")]
    Backend(String),
    #[error("unsupported source: {0}")]
    UnsupportedSource(String),
    #[error("io error: {0}")]
    Io(String),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("no source loaded")]
    NotLoaded,
}

pub type MediaResult<T> = Result<T, MediaError>;

/// What the element is asked to play.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaSource {
    pub url: StreamUrl,
    /// Catalog duration, used by backends that cannot read it from the stream.
    pub duration_hint: Option<f64>,
}

impl MediaSource {
    pub fn new(url: StreamUrl) -> Self {
        Self {
            url,
            duration_hint: None,
        }
    }

    pub fn with_duration_hint(mut self, seconds: u32) -> Self {
        self.duration_hint = (seconds > 0).then_some(f64::from(seconds));
        self
    }
}

/// Notifications a media element reports back to its owner.
#[derive(Debug, Clone, PartialEq)]
pub enum MediaEvent {
    TimeUpdate(f64),
    DurationKnown(f64),
    Ended,
    Error(String),
}

/// A single playback surface. Exactly one owner drives it; events are pulled
/// by the owner through [`MediaElement::poll_events`].
pub trait MediaElement: Send {
    /// Replaces the current source. Any previous playback stops.
    fn load(&mut self, source: &MediaSource) -> MediaResult<()>;
    fn play(&mut self) -> MediaResult<()>;
    fn pause(&mut self);
    fn seek(&mut self, position_seconds: f64) -> MediaResult<()>;
    fn poll_events(&mut self) -> Vec<MediaEvent>;
}

/// Headless element that advances a virtual clock while "playing".
///
/// Used when no audio device is wanted (tests, CI, remote shells).
#[derive(Debug, Default)]
pub struct SimulatedMediaElement {
    source: Option<MediaSource>,
    playing: bool,
    position: f64,
    duration: f64,
    last_tick: Option<Instant>,
    pending: Vec<MediaEvent>,
}

impl SimulatedMediaElement {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn position(&self) -> f64 {
        self.position
    }

    pub fn source(&self) -> Option<&MediaSource> {
        self.source.as_ref()
    }

    /// Moves the virtual clock forward by `elapsed` if playing.
    pub fn advance(&mut self, elapsed: Duration) {
        if !self.playing {
            return;
        }
        self.position += elapsed.as_secs_f64();
        if self.duration > 0.0 && self.position >= self.duration {
            self.position = self.duration;
            self.playing = false;
            self.last_tick = None;
            self.pending.push(MediaEvent::TimeUpdate(self.position));
            self.pending.push(MediaEvent::Ended);
        } else {
            self.pending.push(MediaEvent::TimeUpdate(self.position));
        }
    }
}

impl MediaElement for SimulatedMediaElement {
    fn load(&mut self, source: &MediaSource) -> MediaResult<()> {
        if source.url.is_empty() {
            return Err(MediaError::UnsupportedSource("empty url".into()));
        }
        self.source = Some(source.clone());
        self.playing = false;
        self.position = 0.0;
        self.last_tick = None;
        self.duration = source.duration_hint.unwrap_or(0.0);
        self.pending.clear();
        if self.duration > 0.0 {
            self.pending.push(MediaEvent::DurationKnown(self.duration));
        }
        tracing::debug!(url = %source.url.as_ref(), "simulated media loaded");
        Ok(())
    }

    fn play(&mut self) -> MediaResult<()> {
        if self.source.is_none() {
            return Err(MediaError::NotLoaded);
        }
        if self.duration > 0.0 && self.position >= self.duration {
            self.position = 0.0;
        }
        self.playing = true;
        self.last_tick = Some(Instant::now());
        Ok(())
    }

    fn pause(&mut self) {
        if let Some(last) = self.last_tick.take() {
            self.advance(last.elapsed());
        }
        self.playing = false;
    }

    fn seek(&mut self, position_seconds: f64) -> MediaResult<()> {
        if self.source.is_none() {
            return Err(MediaError::NotLoaded);
        }
        let upper = if self.duration > 0.0 {
            self.duration
        } else {
            f64::MAX
        };
        self.position = position_seconds.clamp(0.0, upper);
        if self.playing {
            self.last_tick = Some(Instant::now());
        }
        Ok(())
    }

    fn poll_events(&mut self) -> Vec<MediaEvent> {
        if let Some(last) = self.last_tick {
            let now = Instant::now();
            self.last_tick = Some(now);
            self.advance(now.duration_since(last));
        }
        std::mem::take(&mut self.pending)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(duration: u32) -> MediaSource {
        MediaSource::new(StreamUrl::new("https://stream.test/a")).with_duration_hint(duration)
    }

    #[test]
    fn load_reports_hinted_duration() {
        let mut element = SimulatedMediaElement::new();
        element.load(&source(90)).expect("load");
        assert_eq!(element.poll_events(), vec![MediaEvent::DurationKnown(90.0)]);
    }

    #[test]
    fn play_requires_source() {
        let mut element = SimulatedMediaElement::new();
        assert_eq!(element.play(), Err(MediaError::NotLoaded));
        assert!(element.load(&MediaSource::new(StreamUrl::new(""))).is_err());
    }

    #[test]
    fn advancing_past_duration_ends_playback() {
        let mut element = SimulatedMediaElement::new();
        element.load(&source(2)).expect("load");
        element.play().expect("play");
        element.poll_events();

        element.advance(Duration::from_secs(3));
        let events = element.poll_events();
        assert!(events.contains(&MediaEvent::Ended));
        assert!(!element.is_playing());
        assert_eq!(element.position(), 2.0);
    }

    #[test]
    fn seek_is_clamped_to_duration() {
        let mut element = SimulatedMediaElement::new();
        element.load(&source(10)).expect("load");
        element.seek(25.0).expect("seek");
        assert_eq!(element.position(), 10.0);
        element.seek(-1.0).expect("seek");
        assert_eq!(element.position(), 0.0);
    }

    #[test]
    fn paused_element_does_not_advance() {
        let mut element = SimulatedMediaElement::new();
        element.load(&source(10)).expect("load");
        element.advance(Duration::from_secs(4));
        assert_eq!(element.position(), 0.0);
    }
}
