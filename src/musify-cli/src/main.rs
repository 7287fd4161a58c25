use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use musify_api::{HttpCatalog, UploadRequest};
use musify_audio::{MediaElement, SimulatedMediaElement};
use musify_core::{
    format_time, init_logging, AppDirs, CatalogPage, CatalogService, Config, ContinuationToken,
    ListRequest, Track, TrackKey, MAX_PAGE_SIZE,
};
use musify_library::{BrowserSettings, CatalogBrowser};
use musify_player::PlaybackController;
use musify_ui::{run_ui, Theme, UiContext};
use thiserror::Error;

#[derive(Debug, Parser)]
#[command(name = "musify", version, about = "Terminal client for the Musify catalog")]
struct Cli {
    /// API base address (takes precedence over config and MUSIFY_API_BASE_URL)
    #[arg(long, global = true)]
    api_base_url: Option<String>,
    /// Directory for config.toml and logs instead of the platform default
    #[arg(long, global = true)]
    config_dir: Option<PathBuf>,
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print one page of the catalog
    List(ListCommand),
    /// Print a freshly signed stream URL for a track key
    Stream {
        #[arg(long)]
        key: String,
    },
    /// Upload an audio file and register it in the catalog
    Upload(UploadCommand),
}

#[derive(Debug, Parser, Clone)]
struct ListCommand {
    /// Case-insensitive filter on song or artist
    #[arg(long)]
    search: Option<String>,
    /// Page size (defaults to browse.page_size)
    #[arg(long)]
    limit: Option<u32>,
    /// Continuation token printed by a previous `list`
    #[arg(long)]
    next_token: Option<String>,
}

#[derive(Debug, Parser, Clone)]
struct UploadCommand {
    #[arg(long)]
    artist: String,
    #[arg(long)]
    song: String,
    #[arg(long)]
    file: PathBuf,
}

#[derive(Debug, Error, PartialEq, Eq)]
enum ListCommandError {
    #[error("--limit must be between 1 and {max}, got {found}")]
    Limit { found: u32, max: u32 },
}

impl ListCommand {
    fn request(&self, default_limit: u32) -> Result<ListRequest, ListCommandError> {
        let limit = self.limit.unwrap_or(default_limit);
        if limit == 0 || limit > MAX_PAGE_SIZE {
            return Err(ListCommandError::Limit {
                found: limit,
                max: MAX_PAGE_SIZE,
            });
        }
        let next = self
            .next_token
            .as_deref()
            .filter(|t| !t.is_empty())
            .map(ContinuationToken::from);
        Ok(ListRequest::first_page(limit)
            .with_search(self.search.as_deref().unwrap_or("").trim())
            .with_next(next))
    }
}

impl UploadCommand {
    fn request(&self) -> UploadRequest {
        UploadRequest::new(self.artist.clone(), self.song.clone(), self.file.clone())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let dirs = match &cli.config_dir {
        Some(dir) => AppDirs::rooted_at(dir),
        None => AppDirs::discover()?,
    };
    let config = Config::load_or_default(&dirs)?
        .with_env_overrides()
        .with_base_url_override(cli.api_base_url.as_deref());

    // The terminal shell owns stdout; log to file only while it runs.
    let mut logging = config.logging.clone();
    if cli.command.is_none() {
        logging.stdout = false;
    }
    let _logging = init_logging(&logging, &dirs)?;

    let catalog = Arc::new(HttpCatalog::new(&config.api.base_url)?);
    tracing::info!(
        base_url = %catalog.base_url(),
        config_dir = %dirs.config_dir().display(),
        "musify starting"
    );

    match cli.command {
        Some(Command::List(list)) => {
            let request = list.request(config.browse.page_size)?;
            let page = catalog.list_tracks(request).await?;
            print_page(&page);
        }
        Some(Command::Stream { key }) => {
            let url = catalog.resolve_stream_url(&TrackKey::new(key)).await?;
            println!("{}", url.as_ref());
        }
        Some(Command::Upload(upload)) => {
            let track = catalog.upload_track(&upload.request()).await?;
            println!("Uploaded {}", track_row(&track));
        }
        None => run_shell(&config, catalog).await?,
    }

    Ok(())
}

async fn run_shell(config: &Config, catalog: Arc<HttpCatalog>) -> Result<()> {
    let service: Arc<dyn CatalogService> = catalog.clone();
    let browser = CatalogBrowser::new(
        Arc::clone(&service),
        BrowserSettings::from(&config.browse),
    );
    let player = Arc::new(PlaybackController::new(service, media_element()));
    let context = UiContext {
        browser,
        player,
        uploader: catalog,
        theme: Theme::from_config(config.theme.as_deref()),
    };

    let runtime = tokio::runtime::Handle::current();
    tokio::task::spawn_blocking(move || run_ui(context, runtime)).await??;
    Ok(())
}

fn media_element() -> Box<dyn MediaElement> {
    #[cfg(feature = "cpal-backend")]
    {
        match musify_audio::CpalMediaElement::new() {
            Ok(element) => return Box::new(element),
            Err(err) => {
                tracing::warn!(error = %err, "audio output unavailable; using simulated playback");
            }
        }
    }
    Box::new(SimulatedMediaElement::new())
}

fn track_row(track: &Track) -> String {
    format!(
        "{}\t{} — {}\t{}",
        track.key,
        track.song_name,
        track.artist_name,
        format_time(f64::from(track.duration_seconds))
    )
}

fn print_page(page: &CatalogPage) {
    if page.items.is_empty() {
        println!("No songs found.");
    }
    for track in &page.items {
        println!("{}", track_row(track));
    }
    if let Some(next) = &page.next {
        println!("next token: {}", next.as_ref());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    fn list_command(search: Option<&str>, limit: Option<u32>, next: Option<&str>) -> ListCommand {
        ListCommand {
            search: search.map(String::from),
            limit,
            next_token: next.map(String::from),
        }
    }

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn global_base_url_is_accepted_after_subcommand() {
        let cli = Cli::try_parse_from([
            "musify",
            "stream",
            "--key",
            "tracks/a.mp3",
            "--api-base-url",
            "http://api.test",
        ])
        .expect("parse");
        assert_eq!(cli.api_base_url.as_deref(), Some("http://api.test"));
        assert!(matches!(cli.command, Some(Command::Stream { ref key }) if key == "tracks/a.mp3"));
    }

    #[test]
    fn no_subcommand_means_shell() {
        let cli = Cli::try_parse_from(["musify"]).expect("parse");
        assert!(cli.command.is_none());
    }

    #[test]
    fn upload_requires_all_fields() {
        let err = Cli::try_parse_from(["musify", "upload", "--artist", "ABBA"]);
        assert!(err.is_err());
    }

    #[test]
    fn list_request_uses_config_default_limit() {
        let request = list_command(None, None, None).request(20).expect("request");
        assert_eq!(request, ListRequest::first_page(20));
    }

    #[test]
    fn list_request_carries_search_and_token() {
        let request = list_command(Some(" abba "), Some(5), Some("t1"))
            .request(20)
            .expect("request");
        assert_eq!(request.limit, 5);
        assert_eq!(request.search.as_deref(), Some("abba"));
        assert_eq!(request.next, Some(ContinuationToken::new("t1")));
    }

    #[test]
    fn list_limit_out_of_range_is_rejected() {
        assert_eq!(
            list_command(None, Some(0), None).request(20),
            Err(ListCommandError::Limit {
                found: 0,
                max: MAX_PAGE_SIZE
            })
        );
        assert!(list_command(None, Some(MAX_PAGE_SIZE + 1), None)
            .request(20)
            .is_err());
    }

    #[test]
    fn upload_command_maps_to_request() {
        let upload = UploadCommand {
            artist: "ABBA".into(),
            song: "Waterloo".into(),
            file: PathBuf::from("/music/waterloo.mp3"),
        };
        let request = upload.request();
        assert_eq!(request.artist_name, "ABBA");
        assert_eq!(request.song_name, "Waterloo");
        assert_eq!(request.file, Some(PathBuf::from("/music/waterloo.mp3")));
    }

    #[test]
    fn track_row_is_tab_separated() {
        let track = Track::new("tracks/ABBA/Waterloo.mp3", "Waterloo", "ABBA", 166);
        assert_eq!(
            track_row(&track),
            "tracks/ABBA/Waterloo.mp3\tWaterloo — ABBA\t2:46"
        );
    }
}
