mod panels;
mod popup;

use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Paragraph};
use ratatui::Frame;

use crate::action::Target;
use crate::app::App;
use crate::board::Board;

#[derive(Debug, Clone, Copy)]
pub struct Palette {
    pub fg: Color,
    pub bg: Color,
    pub dim: Color,
    pub bar: Color,
}

impl Palette {
    pub fn new(dark: bool) -> Self {
        if dark {
            Self {
                fg: Color::White,
                bg: Color::Black,
                dim: Color::DarkGray,
                bar: Color::DarkGray,
            }
        } else {
            Self {
                fg: Color::Black,
                bg: Color::White,
                dim: Color::Gray,
                bar: Color::Gray,
            }
        }
    }
}

/// Header, board and status bar rows of the screen.
fn layout(area: Rect) -> (Rect, Rect, Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(0),
            Constraint::Length(1),
        ])
        .split(area);
    (chunks[0], chunks[1], chunks[2])
}

/// Map a click at (`column`, `row`) on a screen of size `viewport` to a board target.
pub fn hit_test(board: &Board, viewport: Rect, column: u16, row: u16) -> Option<Target> {
    let (_, body, _) = layout(viewport);
    panels::hit_test(board, body, column, row)
}

pub fn render(frame: &mut Frame, app: &App) {
    let palette = Palette::new(app.dark_mode);
    frame.render_widget(
        Block::default().style(Style::default().bg(palette.bg).fg(palette.fg)),
        frame.area(),
    );

    let (header, body, status) = layout(frame.area());

    render_header(frame, app, header, &palette);
    panels::render(
        frame,
        &app.board,
        body,
        &palette,
        app.refreshing && app.last_refresh.is_none(),
    );
    render_status_bar(frame, app, status, &palette);

    if app.show_help {
        popup::render_help(frame);
    }
    if let Some(issue) = &app.confirm_close {
        popup::render_confirm(
            frame,
            "Close issue",
            &format!("Close {} #{}: {}?", issue.repo, issue.number, issue.title),
        );
    }
}

fn render_header(frame: &mut Frame, app: &App, area: Rect, palette: &Palette) {
    let repo = app.board.selected_repo();
    let mut spans = vec![Span::styled(
        format!("eztk - {}/{}", app.config.owner, repo.name()),
        Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD),
    )];
    if let Some(issue) = app.board.selected_issue() {
        spans.push(Span::raw(format!("  #{}", issue.number)));
    }

    let header = Paragraph::new(Line::from(spans)).style(Style::default().bg(palette.bar));
    frame.render_widget(header, area);
}

fn render_status_bar(frame: &mut Frame, app: &App, area: Rect, palette: &Palette) {
    let status = if let Some(error) = &app.error {
        Line::from(vec![Span::styled(
            format!("Error: {}", error),
            Style::default().fg(Color::Red),
        )])
    } else if app.refreshing {
        Line::from(vec![Span::styled(
            "Refreshing...",
            Style::default().fg(Color::Yellow),
        )])
    } else if let Some(status) = &app.status {
        Line::from(vec![Span::styled(
            status.as_str(),
            Style::default().fg(Color::Green),
        )])
    } else {
        let mut spans = vec![Span::styled(
            "h/l: repo | j/k: issue | Enter: detail | x: close | r: refresh | ?: help | q: quit",
            Style::default().fg(palette.fg),
        )];
        if let Some(at) = app.last_refresh {
            spans.push(Span::styled(
                format!("  updated {}", at.format("%H:%M:%S")),
                Style::default().fg(Color::Gray),
            ));
        }
        Line::from(spans)
    };

    let status_bar = Paragraph::new(status).style(Style::default().bg(palette.bar));
    frame.render_widget(status_bar, area);
}
