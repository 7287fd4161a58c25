use ratatui::{
    style::{Modifier, Style},
    text::{Line, Span, Text},
};

const HELP_MD: &str = include_str!("help/help.md");

/// Key reference rendered from the bundled Markdown file.
#[derive(Debug, Clone)]
pub struct HelpContent {
    lines: Vec<Line<'static>>,
}

impl Default for HelpContent {
    fn default() -> Self {
        Self::new()
    }
}

impl HelpContent {
    pub fn new() -> Self {
        Self {
            lines: parse_markdown(HELP_MD),
        }
    }

    pub fn text(&self) -> Text<'static> {
        Text::from(self.lines.clone())
    }
}

fn parse_markdown(markdown: &str) -> Vec<Line<'static>> {
    markdown.lines().map(parse_line).collect()
}

fn parse_line(line: &str) -> Line<'static> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Line::from("");
    }

    if let Some(content) = trimmed.strip_prefix("## ") {
        return Line::from(Span::styled(
            content.to_string(),
            Style::default().add_modifier(Modifier::BOLD),
        ));
    }

    if let Some(content) = trimmed.strip_prefix("# ") {
        return Line::from(content.to_uppercase());
    }

    if let Some(content) = trimmed.strip_prefix("- ") {
        return key_line(content);
    }

    Line::from(trimmed.to_string())
}

/// `code` spans become bold key names; the rest stays plain.
fn key_line(content: &str) -> Line<'static> {
    let mut spans = vec![Span::raw("• ")];
    for (i, part) in content.split('`').enumerate() {
        if part.is_empty() {
            continue;
        }
        if i % 2 == 1 {
            spans.push(Span::styled(
                part.to_string(),
                Style::default().add_modifier(Modifier::BOLD),
            ));
        } else {
            spans.push(Span::raw(part.to_string()));
        }
    }
    Line::from(spans)
}
