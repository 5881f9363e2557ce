//! Rendering of player views with `ratatui`.

use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    widgets::{Block, Borders, Clear, Gauge, List, ListItem, ListState, Padding, Paragraph, Wrap},
};
use std::{collections::BTreeMap, sync::LazyLock};

use crate::library::format_duration;

use super::model::{Line, ViewModel};

static CONTROLS_MAP: LazyLock<BTreeMap<&'static str, &'static str>> = LazyLock::new(|| {
    let mut map = BTreeMap::new();
    map.insert("j/k", "up/down");
    map.insert("enter", "play highlighted");
    map.insert("space/p", "play/pause");
    map.insert("h/l", "prev/next song");
    map.insert("H/L", "seek");
    map.insert("+/-", "volume");
    map.insert("tab", "switch player");
    map.insert("q", "quit");
    map
});

/// Screen regions of the last frame, used to route mouse clicks.
#[derive(Debug, Clone, Default)]
pub struct HitAreas {
    /// Inner area of the playlist (without borders).
    pub list: Rect,
    /// Index of the first playlist line shown in `list`.
    pub list_offset: usize,
    pub lines: Vec<Line>,
    /// Inner area of the progress bar.
    pub progress: Rect,
}

/// Render the controls help text.
fn controls_text() -> String {
    // Keep the rendered order stable and human-friendly.
    let order = ["j/k", "enter", "space/p", "h/l", "H/L", "+/-", "tab", "q"];
    order
        .iter()
        .filter_map(|k| CONTROLS_MAP.get(k).map(|v| format!("[{}] {}", k, v)))
        .collect::<Vec<String>>()
        .join(" | ")
}

/// `elapsed / total`, in the same `M:SS` form as the playlist rows.
pub(super) fn time_text(model: &ViewModel) -> String {
    format!(
        "{} / {}",
        format_duration(Some(model.position)),
        format_duration(model.duration)
    )
}

fn state_text(model: &ViewModel) -> &'static str {
    match (model.current, model.is_playing) {
        (None, _) => "Stopped",
        (Some(_), true) => "Playing",
        (Some(_), false) => "Paused",
    }
}

fn border_style(focused: bool) -> Style {
    if focused {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default()
    }
}

fn progress_gauge<'a>(model: &ViewModel, title: &'a str, focused: bool) -> Gauge<'a> {
    Gauge::default()
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(border_style(focused))
                .title(title),
        )
        .gauge_style(Style::default().fg(Color::Cyan))
        .ratio(model.progress().unwrap_or(0.0))
        .label(time_text(model))
}

/// Compute a rectangle of the given size anchored to the bottom-right corner of `r`.
pub fn corner_rect(mut width: u16, mut height: u16, r: Rect) -> Rect {
    width = width.min(r.width.saturating_sub(2)).max(10);
    height = height.min(r.height.saturating_sub(1)).max(3);

    Rect {
        x: r.x + r.width.saturating_sub(width + 1),
        y: r.y + r.height.saturating_sub(height),
        width: width.min(r.width),
        height: height.min(r.height),
    }
}

/// Render the full player: header, now-playing status, grouped playlist,
/// progress bar and controls.
pub fn draw_full(
    frame: &mut Frame,
    area: Rect,
    model: &ViewModel,
    header_text: &str,
    focused: bool,
) -> HitAreas {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Min(3),
            Constraint::Length(3),
            Constraint::Length(3),
        ])
        .split(area);

    let header = Paragraph::new(header_text)
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(border_style(focused))
                .title(" playdeck ")
                .title_alignment(Alignment::Center),
        );
    frame.render_widget(header, chunks[0]);

    // Status box
    let status = {
        let mut parts: Vec<String> = vec![state_text(model).to_string()];
        if let Some(track) = model.current_track() {
            parts.push(format!("Song: {} ({})", track.title, track.category));
        }
        parts.push(format!("Volume: {:.0}%", model.volume * 100.0));
        parts.push(format!("Tracks: {}", model.tracks.len()));
        parts.join(" • ")
    };
    let status_par = Paragraph::new(status)
        .block(
            Block::bordered()
                .padding(Padding {
                    left: 1,
                    right: 0,
                    top: 0,
                    bottom: 0,
                })
                .title(" status "),
        )
        .wrap(Wrap { trim: true });
    frame.render_widget(status_par, chunks[1]);

    let list_block = Block::default().borders(Borders::ALL).title(" tracks ");
    let list_inner = list_block.inner(chunks[2]);
    let mut hit = HitAreas {
        list: list_inner,
        ..HitAreas::default()
    };

    if model.tracks.is_empty() {
        let empty = Paragraph::new("No tracks available")
            .alignment(Alignment::Center)
            .block(list_block);
        frame.render_widget(empty, chunks[2]);
    } else {
        let lines = model.lines();
        let items: Vec<ListItem> = lines
            .iter()
            .map(|line| match *line {
                Line::Category(g) => ListItem::new(model.groups[g].name.clone())
                    .style(Style::default().add_modifier(Modifier::BOLD)),
                Line::Track(i) => {
                    let track = &model.tracks[i];
                    let marker = if model.current == Some(i) { "♪" } else { " " };
                    ListItem::new(format!(
                        "  {} {}  [{}]",
                        marker,
                        track.title,
                        format_duration(track.duration)
                    ))
                }
            })
            .collect();

        let list = List::new(items)
            .block(list_block)
            .highlight_style(Style::default().add_modifier(Modifier::REVERSED))
            .highlight_symbol("> ");
        let mut state = ListState::default();
        state.select(lines.iter().position(|l| *l == Line::Track(model.cursor)));
        frame.render_stateful_widget(list, chunks[2], &mut state);

        hit.list_offset = state.offset();
        hit.lines = lines;
    }

    let gauge = progress_gauge(model, " progress ", focused);
    hit.progress = Block::default().borders(Borders::ALL).inner(chunks[3]);
    frame.render_widget(gauge, chunks[3]);

    let footer = Paragraph::new(controls_text())
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" controls ")
                .padding(Padding {
                    left: 1,
                    right: 0,
                    top: 0,
                    bottom: 0,
                }),
        )
        .wrap(Wrap { trim: true });
    frame.render_widget(footer, chunks[4]);

    hit
}

/// Render the floating mini player: one line of now-playing text over a
/// progress bar.
pub fn draw_mini(frame: &mut Frame, area: Rect, model: &ViewModel, focused: bool) -> HitAreas {
    frame.render_widget(Clear, area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Min(3)])
        .split(area);

    let title = match model.current_track() {
        Some(track) => format!(" {} {}", if model.is_playing { "▶" } else { "⏸" }, track.title),
        None if model.tracks.is_empty() => " No tracks available".to_string(),
        None => " Nothing playing".to_string(),
    };
    frame.render_widget(
        Paragraph::new(title).style(Style::default().add_modifier(Modifier::BOLD)),
        chunks[0],
    );

    let gauge = progress_gauge(model, " mini ", focused);
    let progress = Block::default().borders(Borders::ALL).inner(chunks[1]);
    frame.render_widget(gauge, chunks[1]);

    HitAreas {
        progress,
        ..HitAreas::default()
    }
}
