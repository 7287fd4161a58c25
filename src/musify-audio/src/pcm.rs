//! In-memory decoding and the sample pump shared by real output backends.

use std::io::Cursor;

use symphonia::{
    core::{
        audio::SampleBuffer, codecs::DecoderOptions, errors::Error as SymphoniaError,
        formats::FormatOptions, io::MediaSourceStream, meta::MetadataOptions, probe::Hint,
    },
    default,
};

use crate::{MediaError, MediaResult};

/// Fully decoded track, interleaved at its native rate.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedAudio {
    pub samples: Vec<f32>,
    pub channels: usize,
    pub sample_rate: u32,
}

impl DecodedAudio {
    pub fn frames(&self) -> usize {
        if self.channels == 0 {
            0
        } else {
            self.samples.len() / self.channels
        }
    }

    pub fn duration_seconds(&self) -> f64 {
        if self.sample_rate == 0 {
            0.0
        } else {
            self.frames() as f64 / f64::from(self.sample_rate)
        }
    }
}

/// Read position of an output stream, in source frames.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlayCursor {
    pub frame: f64,
    pub paused: bool,
}

impl Default for PlayCursor {
    fn default() -> Self {
        Self {
            frame: 0.0,
            paused: true,
        }
    }
}

/// File extension of a URL path, ignoring query and fragment.
pub fn extension_hint(url: &str) -> Option<&str> {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let name = path.rsplit('/').next()?;
    let (stem, ext) = name.rsplit_once('.')?;
    (!stem.is_empty() && !ext.is_empty()).then_some(ext)
}

pub fn decode_bytes(bytes: Vec<u8>, extension: Option<&str>) -> MediaResult<DecodedAudio> {
    let mss = MediaSourceStream::new(Box::new(Cursor::new(bytes)), Default::default());
    let mut hint = Hint::new();
    if let Some(ext) = extension {
        hint.with_extension(ext);
    }

    let probed = default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| MediaError::Decode(e.to_string()))?;
    let mut format = probed.format;
    let track = format
        .default_track()
        .ok_or_else(|| MediaError::Decode("no default track".into()))?;
    let track_id = track.id;
    let codec_params = track.codec_params.clone();
    let mut decoder = default::get_codecs()
        .make(&codec_params, &DecoderOptions::default())
        .map_err(|e| MediaError::Decode(e.to_string()))?;

    let mut samples = Vec::new();
    let mut channels = codec_params.channels.map(|c| c.count()).unwrap_or(0);
    let mut sample_rate = codec_params.sample_rate.unwrap_or(0);
    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(_)) | Err(SymphoniaError::ResetRequired) => break,
            Err(err) => return Err(MediaError::Decode(err.to_string())),
        };
        if packet.track_id() != track_id {
            continue;
        }
        let audio_buf = match decoder.decode(&packet) {
            Ok(buf) => buf,
            Err(SymphoniaError::DecodeError(reason)) => {
                tracing::debug!(reason, "skipping undecodable packet");
                continue;
            }
            Err(err) => return Err(MediaError::Decode(err.to_string())),
        };
        let spec = *audio_buf.spec();
        channels = spec.channels.count();
        sample_rate = spec.rate;
        let mut sample_buf = SampleBuffer::<f32>::new(audio_buf.capacity() as u64, spec);
        sample_buf.copy_interleaved_ref(audio_buf);
        samples.extend_from_slice(sample_buf.samples());
    }

    if channels == 0 || sample_rate == 0 {
        return Err(MediaError::Decode("stream format unknown".into()));
    }
    Ok(DecodedAudio {
        samples,
        channels,
        sample_rate,
    })
}

/// Writes interleaved output for `out_channels` channels, advancing the
/// cursor by `step` source frames per output frame. Silence once paused or
/// past the end. Mono sources feed every output channel; extra source
/// channels are dropped.
pub fn fill_output(
    data: &mut [f32],
    out_channels: usize,
    audio: &DecodedAudio,
    cursor: &mut PlayCursor,
    step: f64,
) {
    let frames = audio.frames();
    let out_channels = out_channels.max(1);
    for frame in data.chunks_mut(out_channels) {
        let index = cursor.frame as usize;
        if cursor.paused || index >= frames {
            frame.fill(0.0);
            continue;
        }
        let base = index * audio.channels;
        for (channel, sample) in frame.iter_mut().enumerate() {
            *sample = audio.samples[base + channel.min(audio.channels - 1)];
        }
        cursor.frame += step;
    }
}
