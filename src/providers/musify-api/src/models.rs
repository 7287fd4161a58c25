use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct TrackPageResponse {
    #[serde(default)]
    pub items: Vec<MusicTrack>,
    #[serde(rename = "nextToken", default)]
    pub next_token: Option<String>,
}

/// Track as stored by the backend. The lowercase search columns it also
/// returns are not needed here and are ignored.
#[derive(Debug, Deserialize)]
pub struct MusicTrack {
    #[serde(rename = "s3Key")]
    pub s3_key: String,
    #[serde(rename = "artistName", default)]
    pub artist_name: String,
    #[serde(rename = "songName", default)]
    pub song_name: String,
    #[serde(default)]
    pub duration: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct UploadUrlResponse {
    #[serde(rename = "s3Key")]
    pub s3_key: String,
    #[serde(rename = "uploadUrl")]
    pub upload_url: String,
}

#[derive(Debug, Serialize)]
pub struct MusicTrackRequest<'a> {
    #[serde(rename = "artistName")]
    pub artist_name: &'a str,
    #[serde(rename = "songName")]
    pub song_name: &'a str,
    #[serde(rename = "s3Key")]
    pub s3_key: &'a str,
    pub duration: u32,
}
