use std::{
    path::Path,
    sync::{
        mpsc::{self, Receiver, RecvTimeoutError, Sender},
        Arc, Mutex, PoisonError,
    },
    thread,
    time::Duration,
};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};

use crate::pcm::{decode_bytes, extension_hint, fill_output, DecodedAudio, PlayCursor};
use crate::{MediaElement, MediaError, MediaEvent, MediaResult, MediaSource};

const PROGRESS_INTERVAL: Duration = Duration::from_millis(250);

enum Command {
    Load { serial: u64, source: MediaSource },
    Play,
    Pause,
    Seek(f64),
}

/// Media element that downloads the resolved URL, decodes it with symphonia
/// and plays it on the default cpal output device.
///
/// The cpal stream lives on a dedicated worker thread; this handle only sends
/// commands and drains events.
pub struct CpalMediaElement {
    commands: Sender<Command>,
    events: Receiver<(u64, MediaEvent)>,
    serial: u64,
    loaded: bool,
}

impl CpalMediaElement {
    pub fn new() -> MediaResult<Self> {
        let (commands, command_rx) = mpsc::channel();
        let (event_tx, events) = mpsc::channel();
        thread::Builder::new()
            .name("musify-audio".into())
            .spawn(move || run_worker(command_rx, event_tx))
            .map_err(|e| MediaError::Backend(e.to_string()))?;
        Ok(Self {
            commands,
            events,
            serial: 0,
            loaded: false,
        })
    }

    fn send(&self, command: Command) -> MediaResult<()> {
        self.commands
            .send(command)
            .map_err(|_| MediaError::Backend("audio worker stopped".into()))
    }
}

impl MediaElement for CpalMediaElement {
    fn load(&mut self, source: &MediaSource) -> MediaResult<()> {
        if source.url.is_empty() {
            return Err(MediaError::UnsupportedSource("empty url".into()));
        }
        self.serial += 1;
        self.loaded = true;
        self.send(Command::Load {
            serial: self.serial,
            source: source.clone(),
        })
    }

    fn play(&mut self) -> MediaResult<()> {
        if !self.loaded {
            return Err(MediaError::NotLoaded);
        }
        self.send(Command::Play)
    }

    fn pause(&mut self) {
        if self.send(Command::Pause).is_err() {
            tracing::warn!("pause ignored; audio worker stopped");
        }
    }

    fn seek(&mut self, position_seconds: f64) -> MediaResult<()> {
        if !self.loaded {
            return Err(MediaError::NotLoaded);
        }
        self.send(Command::Seek(position_seconds))
    }

    fn poll_events(&mut self) -> Vec<MediaEvent> {
        let serial = self.serial;
        self.events
            .try_iter()
            .filter(|(from, _)| *from == serial)
            .map(|(_, event)| event)
            .collect()
    }
}

/// Commands from one wake-up, minus everything queued before the last load.
/// A track replaced before its download started is never fetched.
fn latest_batch(mut batch: Vec<Command>) -> Vec<Command> {
    let start = batch
        .iter()
        .rposition(|c| matches!(c, Command::Load { .. }))
        .unwrap_or(0);
    batch.split_off(start)
}

struct Output {
    stream: cpal::Stream,
    audio: Arc<DecodedAudio>,
    cursor: Arc<Mutex<PlayCursor>>,
    serial: u64,
    ended: bool,
}

impl Output {
    fn cursor(&self) -> std::sync::MutexGuard<'_, PlayCursor> {
        self.cursor.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn position(&self) -> f64 {
        self.cursor().frame / f64::from(self.audio.sample_rate)
    }

    fn finished(&self) -> bool {
        self.cursor().frame >= self.audio.frames() as f64
    }

    fn play(&mut self) -> MediaResult<()> {
        {
            let mut cursor = self.cursor();
            if cursor.frame >= self.audio.frames() as f64 {
                cursor.frame = 0.0;
            }
            cursor.paused = false;
        }
        self.ended = false;
        self.stream
            .play()
            .map_err(|e| MediaError::Backend(e.to_string()))
    }

    fn pause(&self) {
        self.cursor().paused = true;
        if let Err(err) = self.stream.pause() {
            tracing::debug!(error = %err, "device pause unsupported; output silenced");
        }
    }

    fn seek(&self, seconds: f64) {
        let seconds = if seconds.is_finite() { seconds } else { 0.0 };
        let frame = (seconds * f64::from(self.audio.sample_rate))
            .clamp(0.0, self.audio.frames() as f64);
        self.cursor().frame = frame;
    }
}

fn run_worker(commands: Receiver<Command>, events: Sender<(u64, MediaEvent)>) {
    // The blocking client runs its own runtime and must be built off the async threads.
    let client = match reqwest::blocking::Client::builder()
        .connect_timeout(Duration::from_secs(10))
        .timeout(Duration::from_secs(120))
        .build()
    {
        Ok(client) => client,
        Err(err) => {
            tracing::error!(error = %err, "failed to build audio http client");
            return;
        }
    };
    let mut current: Option<Output> = None;
    loop {
        let first = match commands.recv_timeout(PROGRESS_INTERVAL) {
            Ok(command) => Some(command),
            Err(RecvTimeoutError::Timeout) => None,
            Err(RecvTimeoutError::Disconnected) => break,
        };
        let batch: Vec<Command> = first.into_iter().chain(commands.try_iter()).collect();

        for command in latest_batch(batch) {
            match command {
                Command::Load { serial, source } => {
                    current = None;
                    match open(&client, &source, serial, &events) {
                        Ok(output) => {
                            let duration = output.audio.duration_seconds();
                            events.send((serial, MediaEvent::DurationKnown(duration))).ok();
                            current = Some(output);
                        }
                        Err(err) => {
                            tracing::warn!(url = %source.url.as_ref(), error = %err, "failed to open stream");
                            events.send((serial, MediaEvent::Error(err.to_string()))).ok();
                        }
                    }
                }
                Command::Play => {
                    if let Some(output) = current.as_mut() {
                        if let Err(err) = output.play() {
                            events.send((output.serial, MediaEvent::Error(err.to_string()))).ok();
                        }
                    }
                }
                Command::Pause => {
                    if let Some(output) = &current {
                        output.pause();
                    }
                }
                Command::Seek(seconds) => {
                    if let Some(output) = &current {
                        output.seek(seconds);
                    }
                }
            }
        }

        if let Some(output) = current.as_mut() {
            report_progress(output, &events);
        }
    }
    tracing::debug!("audio worker exiting");
}

fn report_progress(output: &mut Output, events: &Sender<(u64, MediaEvent)>) {
    if output.ended || output.cursor().paused {
        return;
    }
    events
        .send((output.serial, MediaEvent::TimeUpdate(output.position())))
        .ok();
    if output.finished() {
        output.ended = true;
        output.pause();
        events.send((output.serial, MediaEvent::Ended)).ok();
    }
}

fn fetch(client: &reqwest::blocking::Client, url: &str) -> MediaResult<Vec<u8>> {
    if let Some(path) = url.strip_prefix("file://") {
        return std::fs::read(Path::new(path)).map_err(|e| MediaError::Io(e.to_string()));
    }
    let resp = client
        .get(url)
        .send()
        .and_then(|r| r.error_for_status())
        .map_err(|e| MediaError::Io(e.to_string()))?;
    let bytes = resp.bytes().map_err(|e| MediaError::Io(e.to_string()))?;
    Ok(bytes.to_vec())
}

fn open(
    client: &reqwest::blocking::Client,
    source: &MediaSource,
    serial: u64,
    events: &Sender<(u64, MediaEvent)>,
) -> MediaResult<Output> {
    let url = source.url.as_ref();
    let bytes = fetch(client, url)?;
    tracing::debug!(bytes = bytes.len(), "stream downloaded");
    let audio = Arc::new(decode_bytes(bytes, extension_hint(url))?);

    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or_else(|| MediaError::Backend("no output device".into()))?;
    let config = device
        .default_output_config()
        .map_err(|e| MediaError::Backend(e.to_string()))?;
    if config.sample_format() != cpal::SampleFormat::F32 {
        return Err(MediaError::Backend(format!(
            "unsupported sample format: {:?}",
            config.sample_format()
        )));
    }
    let out_channels = usize::from(config.channels());
    let step = f64::from(audio.sample_rate) / f64::from(config.sample_rate().0);

    let cursor = Arc::new(Mutex::new(PlayCursor::default()));
    let stream = device
        .build_output_stream(
            &config.config(),
            {
                let audio = Arc::clone(&audio);
                let cursor = Arc::clone(&cursor);
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    let mut cursor = cursor.lock().unwrap_or_else(PoisonError::into_inner);
                    fill_output(data, out_channels, &audio, &mut cursor, step);
                }
            },
            {
                let events = events.clone();
                move |err| {
                    tracing::error!(error = %err, "cpal stream error");
                    events.send((serial, MediaEvent::Error(err.to_string()))).ok();
                }
            },
            None,
        )
        .map_err(|e| MediaError::Backend(e.to_string()))?;

    Ok(Output {
        stream,
        audio,
        cursor,
        serial,
        ended: false,
    })
}
