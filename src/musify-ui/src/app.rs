use std::io::stdout;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use musify_api::{HttpCatalog, UploadRequest};
use musify_core::{format_time, Track};
use musify_library::{BrowseState, CatalogBrowser};
use musify_player::{PlaybackController, PlaybackState};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, Gauge, List, ListItem, ListState, Paragraph, Wrap},
    Frame, Terminal,
};
use thiserror::Error;
use tokio::runtime::Handle;
use tokio::sync::mpsc;

use crate::help::HelpContent;
use crate::theme::Theme;

const MIN_WIDTH: u16 = 60;
const MIN_HEIGHT: u16 = 16;
const HELP_WIDTH: u16 = 70;
const HELP_HEIGHT: u16 = 80;
const TICK_RATE: Duration = Duration::from_millis(50);
const SEEK_STEP: f64 = 0.05;

/// Handles the shell drives. Each one is shared, never looked up globally.
#[derive(Clone)]
pub struct UiContext {
    pub browser: CatalogBrowser,
    pub player: Arc<PlaybackController>,
    pub uploader: Arc<HttpCatalog>,
    pub theme: Theme,
}

#[derive(Debug, Error)]
pub enum UiError {
    #[error("terminal error: {0}")]
    Io(#[from] std::io::Error),
}

struct TerminalGuard;

impl TerminalGuard {
    fn enter() -> Result<Self, UiError> {
        enable_raw_mode()?;
        execute!(stdout(), EnterAlternateScreen)?;
        Ok(Self)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(stdout(), LeaveAlternateScreen);
    }
}

/// Blocking terminal loop. Async work (fetches, playback, uploads) is handed
/// to `runtime`; this thread only reads keys and redraws.
pub fn run_ui(context: UiContext, runtime: Handle) -> Result<(), UiError> {
    let _runtime = runtime.enter();
    let _guard = TerminalGuard::enter()?;
    let backend = CrosstermBackend::new(stdout());
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;

    let mut app = App::new(context, runtime.clone());
    app.refresh();

    loop {
        app.tick();
        terminal.draw(|frame| app.render(frame))?;

        if event::poll(TICK_RATE)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press && app.handle_key(key) {
                    break;
                }
            }
        }
    }

    tracing::info!("terminal shell closed");
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Browse,
    Search,
    Upload,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum UploadField {
    #[default]
    Artist,
    Song,
    File,
}

impl UploadField {
    fn next(self) -> Self {
        match self {
            UploadField::Artist => UploadField::Song,
            UploadField::Song => UploadField::File,
            UploadField::File => UploadField::Artist,
        }
    }

    fn previous(self) -> Self {
        match self {
            UploadField::Artist => UploadField::File,
            UploadField::Song => UploadField::Artist,
            UploadField::File => UploadField::Song,
        }
    }
}

#[derive(Debug, Default)]
struct UploadForm {
    artist: String,
    song: String,
    file: String,
    field: UploadField,
    error: Option<String>,
}

impl UploadForm {
    fn active_mut(&mut self) -> &mut String {
        match self.field {
            UploadField::Artist => &mut self.artist,
            UploadField::Song => &mut self.song,
            UploadField::File => &mut self.file,
        }
    }

    fn to_request(&self) -> UploadRequest {
        let file = self.file.trim();
        UploadRequest {
            artist_name: self.artist.clone(),
            song_name: self.song.clone(),
            file: (!file.is_empty()).then(|| PathBuf::from(file)),
        }
    }
}

struct App {
    browser: CatalogBrowser,
    player: Arc<PlaybackController>,
    uploader: Arc<HttpCatalog>,
    runtime: Handle,
    theme: Theme,
    mode: Mode,
    selected: usize,
    search_input: String,
    upload: UploadForm,
    show_help: bool,
    help: HelpContent,
    status: Option<String>,
    notices_tx: mpsc::UnboundedSender<String>,
    notices_rx: mpsc::UnboundedReceiver<String>,
    browse: BrowseState,
    playback: PlaybackState,
}

impl App {
    fn new(context: UiContext, runtime: Handle) -> Self {
        let (notices_tx, notices_rx) = mpsc::unbounded_channel();
        let browse = context.browser.snapshot();
        let playback = context.player.snapshot();
        Self {
            browser: context.browser,
            player: context.player,
            uploader: context.uploader,
            runtime,
            theme: context.theme,
            mode: Mode::Browse,
            selected: 0,
            search_input: String::new(),
            upload: UploadForm::default(),
            show_help: false,
            help: HelpContent::new(),
            status: None,
            notices_tx,
            notices_rx,
            browse,
            playback,
        }
    }

    /// Pulls media events and refreshes the cached snapshots used for drawing.
    fn tick(&mut self) {
        self.player.pump_media_events();
        while let Ok(notice) = self.notices_rx.try_recv() {
            self.status = Some(notice);
        }
        self.browse = self.browser.snapshot();
        self.playback = self.player.snapshot();
        let len = self.browse.visible_tracks.len();
        if self.selected >= len {
            self.selected = len.saturating_sub(1);
        }
    }

    fn handle_key(&mut self, key: KeyEvent) -> bool {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            return true;
        }

        if self.show_help {
            match key.code {
                KeyCode::Char('?') | KeyCode::Esc | KeyCode::Char('q') => {
                    self.show_help = false;
                }
                _ => {}
            }
            return false;
        }

        match self.mode {
            Mode::Browse => return self.handle_browse_key(key),
            Mode::Search => self.handle_search_key(key),
            Mode::Upload => self.handle_upload_key(key),
        }
        false
    }

    fn handle_browse_key(&mut self, key: KeyEvent) -> bool {
        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => return true,
            KeyCode::Char('?') => self.show_help = true,
            KeyCode::Char('/') => {
                self.search_input = self.browser.query();
                self.mode = Mode::Search;
            }
            KeyCode::Char('u') => {
                self.upload = UploadForm::default();
                self.mode = Mode::Upload;
            }
            KeyCode::Char('j') | KeyCode::Down => self.select_next(),
            KeyCode::Char('k') | KeyCode::Up => self.select_previous(),
            KeyCode::Enter => self.play_selected(),
            KeyCode::Char(' ') => {
                self.player.toggle_play_pause();
                self.playback = self.player.snapshot();
            }
            KeyCode::Left => self.seek_by(-SEEK_STEP),
            KeyCode::Right => self.seek_by(SEEK_STEP),
            KeyCode::Char('m') => self.load_more(),
            KeyCode::Char('r') => self.refresh(),
            _ => {}
        }
        false
    }

    fn handle_search_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc | KeyCode::Enter => self.mode = Mode::Browse,
            KeyCode::Backspace => {
                if self.search_input.pop().is_some() {
                    self.apply_search();
                }
            }
            KeyCode::Char(c) => {
                self.search_input.push(c);
                self.apply_search();
            }
            _ => {}
        }
    }

    fn handle_upload_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc => self.mode = Mode::Browse,
            KeyCode::Tab | KeyCode::Down => self.upload.field = self.upload.field.next(),
            KeyCode::BackTab | KeyCode::Up => self.upload.field = self.upload.field.previous(),
            KeyCode::Enter => self.submit_upload(),
            KeyCode::Backspace => {
                self.upload.active_mut().pop();
            }
            KeyCode::Char(c) => self.upload.active_mut().push(c),
            _ => {}
        }
    }

    fn apply_search(&mut self) {
        self.browser.set_query(self.search_input.clone());
        self.selected = 0;
    }

    fn select_next(&mut self) {
        let len = self.browse.visible_tracks.len();
        if len == 0 {
            return;
        }
        if self.selected + 1 < len {
            self.selected += 1;
        }
        if self.selected + 1 == len && self.browse.has_more && !self.browse.is_loading {
            self.load_more();
        }
    }

    fn select_previous(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    fn load_more(&self) {
        let browser = self.browser.clone();
        self.runtime.spawn(async move {
            browser.load_more().await;
        });
    }

    fn refresh(&self) {
        let browser = self.browser.clone();
        self.runtime.spawn(async move {
            browser.refresh().await;
        });
    }

    fn play_selected(&self) {
        let Some(track) = self.browse.visible_tracks.get(self.selected).cloned() else {
            return;
        };
        let player = Arc::clone(&self.player);
        self.runtime.spawn(async move {
            player.play(track).await;
        });
    }

    fn seek_by(&mut self, delta: f64) {
        if let Some(fraction) = seek_fraction(&self.playback, delta) {
            self.player.seek(fraction);
            self.playback = self.player.snapshot();
        }
    }

    fn submit_upload(&mut self) {
        let request = self.upload.to_request();
        if let Err(failure) = request.validate() {
            self.upload.error = Some(failure.to_string());
            return;
        }
        self.mode = Mode::Browse;
        self.status = Some(format!(
            "Uploading {} - {}…",
            request.artist_name.trim(),
            request.song_name.trim()
        ));

        let uploader = Arc::clone(&self.uploader);
        let browser = self.browser.clone();
        let notices = self.notices_tx.clone();
        self.runtime.spawn(async move {
            let notice = match uploader.upload_track(&request).await {
                Ok(track) => {
                    browser.notify_external_mutation().await;
                    format!("Uploaded {} - {}", track.artist_name, track.song_name)
                }
                Err(err) => {
                    tracing::warn!(error = %err, "upload failed");
                    format!("Upload failed: {err}")
                }
            };
            let _ = notices.send(notice);
        });
    }

    fn render(&self, frame: &mut Frame) {
        let area = frame.size();
        if area.width < MIN_WIDTH || area.height < MIN_HEIGHT {
            let message = format!(
                "Resize terminal to at least {MIN_WIDTH}x{MIN_HEIGHT} (current: {}x{})",
                area.width, area.height
            );
            let paragraph = Paragraph::new(message)
                .wrap(Wrap { trim: true })
                .block(Block::default().title("Musify").borders(Borders::ALL));
            frame.render_widget(paragraph, area);
            return;
        }

        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Min(5),
                Constraint::Length(4),
            ])
            .split(area);

        self.render_header(frame, layout[0]);
        self.render_tracks(frame, layout[1]);
        self.render_player(frame, layout[2]);

        if self.mode == Mode::Upload {
            self.render_upload(frame, area);
        }
        if self.show_help {
            self.render_help(frame, area);
        }
    }

    fn render_header(&self, frame: &mut Frame, area: Rect) {
        let editing = self.mode == Mode::Search;
        let query = if editing {
            format!("{}▏", self.search_input)
        } else if self.browse.query.is_empty() {
            "press / to search".to_string()
        } else {
            self.browse.query.clone()
        };
        let query_style = if editing || !self.browse.query.is_empty() {
            Style::default()
        } else {
            Style::default()
                .fg(self.theme.muted)
                .add_modifier(Modifier::DIM)
        };

        let mut spans = vec![
            Span::styled("Musify ", self.theme.title()),
            Span::raw("▸ "),
            Span::styled(query, query_style),
        ];
        if let Some(status) = &self.status {
            spans.push(Span::raw("   "));
            spans.push(Span::styled(status.clone(), Style::default().fg(self.theme.muted)));
        }

        let title = if editing { "Search (Esc to finish)" } else { "Search" };
        let paragraph = Paragraph::new(Line::from(spans))
            .block(Block::default().borders(Borders::ALL).title(title));
        frame.render_widget(paragraph, area);
    }

    fn render_tracks(&self, frame: &mut Frame, area: Rect) {
        let state = &self.browse;
        let block = Block::default()
            .borders(Borders::ALL)
            .title(list_title(state));

        if let Some(message) = empty_message(state) {
            let style = if state.last_error.is_some() {
                self.theme.error_style()
            } else {
                Style::default().fg(self.theme.muted)
            };
            let paragraph = Paragraph::new(message)
                .style(style)
                .block(block)
                .wrap(Wrap { trim: true });
            frame.render_widget(paragraph, area);
            return;
        }

        let current = self.playback.current_track.as_ref().map(|t| &t.key);
        let items: Vec<ListItem> = state
            .visible_tracks
            .iter()
            .map(|track| {
                let line = track_line(track);
                if current == Some(&track.key) {
                    ListItem::new(format!("♪ {line}"))
                        .style(Style::default().fg(self.theme.playing))
                } else {
                    ListItem::new(format!("  {line}"))
                }
            })
            .collect();
        let list = List::new(items)
            .block(block)
            .highlight_style(self.theme.highlight())
            .highlight_symbol("▸ ");
        let mut list_state = ListState::default();
        list_state.select(Some(self.selected));
        frame.render_stateful_widget(list, area, &mut list_state);
    }

    fn render_player(&self, frame: &mut Frame, area: Rect) {
        let block = Block::default().borders(Borders::ALL).title("Player");
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(1), Constraint::Length(1)])
            .split(inner);

        let playback = &self.playback;
        let mut spans = Vec::new();
        match &playback.current_track {
            Some(track) => {
                let glyph = if playback.is_playing { "▶ " } else { "⏸ " };
                spans.push(Span::raw(glyph));
                spans.push(Span::styled(
                    track.song_name.clone(),
                    Style::default().add_modifier(Modifier::BOLD),
                ));
                spans.push(Span::raw(format!(" — {}", track.artist_name)));
                spans.push(Span::styled(
                    format!(
                        "   {} / {}",
                        format_time(playback.position),
                        format_time(playback.duration)
                    ),
                    Style::default().fg(self.theme.muted),
                ));
            }
            None => spans.push(Span::styled(
                "■ Nothing playing",
                Style::default()
                    .fg(self.theme.muted)
                    .add_modifier(Modifier::DIM),
            )),
        }
        if let Some(err) = &playback.last_error {
            spans.push(Span::raw("   "));
            spans.push(Span::styled(err.clone(), self.theme.error_style()));
        }
        frame.render_widget(Paragraph::new(Line::from(spans)), rows[0]);

        let gauge = Gauge::default()
            .gauge_style(Style::default().fg(self.theme.progress))
            .ratio(progress_ratio(playback.position, playback.duration))
            .label("");
        frame.render_widget(gauge, rows[1]);
    }

    fn render_upload(&self, frame: &mut Frame, area: Rect) {
        let popup_area = centered_rect(60, 50, area);
        let form = &self.upload;
        let field_line = |label: &str, value: &str, field: UploadField| {
            let marker = if form.field == field { "▸ " } else { "  " };
            Line::from(vec![
                Span::raw(marker),
                Span::styled(format!("{label:<8}"), self.theme.title()),
                Span::raw(value.to_string()),
            ])
        };

        let mut lines = vec![
            field_line("Artist", &form.artist, UploadField::Artist),
            field_line("Song", &form.song, UploadField::Song),
            field_line("File", &form.file, UploadField::File),
            Line::from(""),
        ];
        if let Some(err) = &form.error {
            lines.push(Line::from(Span::styled(err.clone(), self.theme.error_style())));
        }
        lines.push(Line::from(Span::styled(
            "Tab next field · Enter upload · Esc cancel",
            Style::default().fg(self.theme.muted),
        )));

        let paragraph = Paragraph::new(Text::from(lines))
            .block(Block::default().title("Upload track").borders(Borders::ALL))
            .wrap(Wrap { trim: false });
        frame.render_widget(Clear, popup_area);
        frame.render_widget(paragraph, popup_area);
    }

    fn render_help(&self, frame: &mut Frame, area: Rect) {
        let popup_area = centered_rect(HELP_WIDTH, HELP_HEIGHT, area);
        let help = Paragraph::new(self.help.text())
            .block(
                Block::default()
                    .title("Help (press ? to close)")
                    .borders(Borders::ALL),
            )
            .wrap(Wrap { trim: true });
        frame.render_widget(Clear, popup_area);
        frame.render_widget(help, popup_area);
    }
}

fn track_line(track: &Track) -> String {
    format!(
        "{} — {}  {}",
        track.song_name,
        track.artist_name,
        format_time(f64::from(track.duration_seconds))
    )
}

fn list_title(state: &BrowseState) -> String {
    let mut title = format!("Tracks ({})", state.visible_tracks.len());
    if state.is_loading {
        title.push_str(" · Loading…");
    } else if state.has_more && !state.visible_tracks.is_empty() {
        title.push_str(" · more available (m)");
    }
    title
}

/// Text shown in place of an empty list. "No songs found." only appears once
/// a fetch finished and the catalog really had nothing.
fn empty_message(state: &BrowseState) -> Option<String> {
    if !state.visible_tracks.is_empty() {
        return None;
    }
    if let Some(err) = &state.last_error {
        return Some(format!("Could not load songs: {err}"));
    }
    if state.is_loading || state.has_more {
        return Some("Loading…".to_string());
    }
    Some("No songs found.".to_string())
}

fn progress_ratio(position: f64, duration: f64) -> f64 {
    if duration.is_finite() && duration > 0.0 && position.is_finite() {
        (position / duration).clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// Target fraction for a relative seek, or `None` while nothing seekable is
/// loaded.
fn seek_fraction(playback: &PlaybackState, delta: f64) -> Option<f64> {
    playback.current_track.as_ref()?;
    if !(playback.duration.is_finite() && playback.duration > 0.0) {
        return None;
    }
    Some((playback.position / playback.duration + delta).clamp(0.0, 1.0))
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let horizontal = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(horizontal[1])[1]
}

#[cfg(test)]
mod tests {
    use super::*;
    use musify_audio::SimulatedMediaElement;
    use musify_core::testing::ScriptedCatalog;
    use musify_core::{CatalogPage, UploadResetPolicy};
    use musify_library::BrowserSettings;
    use ratatui::backend::TestBackend;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn track(key: &str, song: &str) -> Track {
        Track::new(key, song, "Artist", 125)
    }

    fn app_with(catalog: Arc<ScriptedCatalog>) -> App {
        let settings = BrowserSettings {
            page_size: 20,
            debounce: Duration::from_millis(500),
            upload_reset: UploadResetPolicy::ClearQuery,
        };
        let browser = CatalogBrowser::new(catalog.clone(), settings);
        let player = Arc::new(PlaybackController::new(
            catalog,
            Box::new(SimulatedMediaElement::new()),
        ));
        let uploader = Arc::new(HttpCatalog::new("http://127.0.0.1:9").expect("catalog"));
        let context = UiContext {
            browser,
            player,
            uploader,
            theme: Theme::default(),
        };
        App::new(context, Handle::current())
    }

    async fn settle() {
        for _ in 0..50 {
            tokio::task::yield_now().await;
        }
    }

    fn screen(app: &App) -> String {
        let mut terminal = Terminal::new(TestBackend::new(80, 20)).expect("terminal");
        terminal.draw(|frame| app.render(frame)).expect("draw");
        terminal
            .backend()
            .buffer()
            .content
            .iter()
            .map(|cell| cell.symbol())
            .collect()
    }

    #[tokio::test]
    async fn q_quits_and_other_keys_do_not() {
        let mut app = app_with(Arc::new(ScriptedCatalog::new()));
        assert!(!app.handle_key(key(KeyCode::Char('j'))));
        assert!(app.handle_key(key(KeyCode::Char('q'))));
    }

    #[tokio::test]
    async fn typing_in_search_mode_updates_query() {
        let mut app = app_with(Arc::new(ScriptedCatalog::new()));
        app.handle_key(key(KeyCode::Char('/')));
        assert_eq!(app.mode, Mode::Search);
        for c in "abx".chars() {
            app.handle_key(key(KeyCode::Char(c)));
        }
        app.handle_key(key(KeyCode::Backspace));
        assert_eq!(app.browser.query(), "ab");

        // 'q' is text while editing, not quit.
        assert!(!app.handle_key(key(KeyCode::Char('q'))));
        app.handle_key(key(KeyCode::Esc));
        assert_eq!(app.mode, Mode::Browse);
        assert_eq!(app.browser.query(), "abq");
    }

    #[tokio::test]
    async fn enter_plays_selected_track() {
        let catalog = Arc::new(ScriptedCatalog::new());
        catalog.push_page(CatalogPage::single_page(vec![
            track("a", "Alpha"),
            track("b", "Beta"),
        ]));
        let mut app = app_with(catalog.clone());
        app.browser.refresh().await;
        app.tick();

        app.handle_key(key(KeyCode::Down));
        app.handle_key(key(KeyCode::Enter));
        assert!(catalog.wait_for_stream_calls(1).await);
        settle().await;
        app.tick();

        let current = app.playback.current_track.as_ref().expect("playing");
        assert_eq!(current.song_name, "Beta");
        assert!(app.playback.is_playing);

        app.handle_key(key(KeyCode::Char(' ')));
        assert!(!app.playback.is_playing);
    }

    #[tokio::test]
    async fn space_without_track_is_ignored() {
        let mut app = app_with(Arc::new(ScriptedCatalog::new()));
        app.handle_key(key(KeyCode::Char(' ')));
        app.handle_key(key(KeyCode::Right));
        assert_eq!(app.player.snapshot(), PlaybackState::default());
    }

    #[tokio::test]
    async fn reaching_last_row_loads_more() {
        let catalog = Arc::new(ScriptedCatalog::new());
        catalog.push_page(CatalogPage::with_next(
            vec![track("a", "Alpha"), track("b", "Beta")],
            "t1",
        ));
        catalog.push_page(CatalogPage::single_page(vec![track("c", "Gamma")]));
        let mut app = app_with(catalog.clone());
        app.browser.refresh().await;
        app.tick();

        app.handle_key(key(KeyCode::Char('j')));
        assert!(catalog.wait_for_list_calls(2).await);
        settle().await;
        app.tick();
        assert_eq!(app.browse.visible_tracks.len(), 3);
        assert!(!app.browse.has_more);
    }

    #[tokio::test]
    async fn upload_form_rejects_missing_artist_locally() {
        let mut app = app_with(Arc::new(ScriptedCatalog::new()));
        app.handle_key(key(KeyCode::Char('u')));
        app.handle_key(key(KeyCode::Tab));
        for c in "Song".chars() {
            app.handle_key(key(KeyCode::Char(c)));
        }
        app.handle_key(key(KeyCode::Enter));

        assert_eq!(app.mode, Mode::Upload);
        assert_eq!(app.upload.error.as_deref(), Some("artist name is required"));
        assert!(app.status.is_none());
    }

    #[tokio::test]
    async fn empty_catalog_renders_no_songs_message() {
        let mut app = app_with(Arc::new(ScriptedCatalog::new()));
        assert!(screen(&app).contains("Loading…"));

        app.browser.refresh().await;
        app.tick();
        let text = screen(&app);
        assert!(text.contains("No songs found."));
        assert!(text.contains("Nothing playing"));
    }

    #[test]
    fn track_line_shows_song_artist_and_time() {
        assert_eq!(track_line(&track("a", "Alpha")), "Alpha — Artist  2:05");
    }

    #[test]
    fn progress_ratio_handles_unknown_duration() {
        assert_eq!(progress_ratio(10.0, 0.0), 0.0);
        assert_eq!(progress_ratio(10.0, f64::NAN), 0.0);
        assert_eq!(progress_ratio(30.0, 60.0), 0.5);
        assert_eq!(progress_ratio(90.0, 60.0), 1.0);
    }

    #[test]
    fn seek_steps_are_clamped() {
        let playback = PlaybackState {
            current_track: Some(track("a", "Alpha")),
            position: 58.0,
            duration: 60.0,
            ..PlaybackState::default()
        };
        assert_eq!(seek_fraction(&playback, SEEK_STEP), Some(1.0));
        let playback = PlaybackState {
            position: 1.0,
            ..playback
        };
        assert_eq!(seek_fraction(&playback, -SEEK_STEP), Some(0.0));
        assert_eq!(seek_fraction(&PlaybackState::default(), SEEK_STEP), None);
    }

    #[test]
    fn error_replaces_empty_list() {
        let state = BrowseState {
            has_more: false,
            last_error: Some("network error: down".into()),
            ..BrowseState::default()
        };
        assert_eq!(
            empty_message(&state).as_deref(),
            Some("Could not load songs: network error: down")
        );
    }
}
