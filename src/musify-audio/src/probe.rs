use std::{fs::File, path::Path};

use symphonia::{
    core::{formats::FormatOptions, io::MediaSourceStream, meta::MetadataOptions, probe::Hint},
    default,
};

use crate::{MediaError, MediaResult};

/// Reads a file's playing time in seconds from its container header.
///
/// Only the header is parsed; no packets are decoded.
pub fn probe_duration(path: &Path) -> MediaResult<f64> {
    let file = File::open(path).map_err(|e| MediaError::Io(e.to_string()))?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());
    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
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
    let track = probed
        .format
        .default_track()
        .ok_or_else(|| MediaError::Decode("no default track".into()))?;
    let params = &track.codec_params;

    let frames = params
        .n_frames
        .ok_or_else(|| MediaError::Decode("frame count unavailable".into()))?;
    if let Some(time_base) = params.time_base {
        let time = time_base.calc_time(frames);
        return Ok(time.seconds as f64 + time.frac);
    }
    match params.sample_rate {
        Some(rate) if rate > 0 => Ok(frames as f64 / f64::from(rate)),
        _ => Err(MediaError::Decode("sample rate unavailable".into())),
    }
}
