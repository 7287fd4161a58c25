use crate::models::{MusicTrack, TrackPageResponse};
use musify_core::{CatalogPage, ContinuationToken, Track, TrackKey};

pub fn map_track(track: MusicTrack) -> Track {
    Track {
        key: TrackKey::new(track.s3_key),
        song_name: track.song_name,
        artist_name: track.artist_name,
        duration_seconds: track
            .duration
            .and_then(|d| u32::try_from(d).ok())
            .unwrap_or(0),
    }
}

/// Blank tokens are treated like a missing one.
pub fn map_page(page: TrackPageResponse) -> CatalogPage {
    CatalogPage {
        items: page.items.into_iter().map(map_track).collect(),
        next: page
            .next_token
            .filter(|t| !t.is_empty())
            .map(ContinuationToken::new),
    }
}
