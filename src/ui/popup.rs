use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph};
use ratatui::Frame;

const BINDINGS: &[(&str, &str)] = &[
    ("h / l / ← / →", "previous / next repository"),
    ("k / j / ↑ / ↓", "previous / next issue"),
    ("Enter / Space", "toggle issue detail"),
    ("F1 / B", "repository in browser"),
    ("F2 / b", "issue in browser"),
    ("F3 / f", "repository in file manager"),
    ("F4 / e", "issue in editor"),
    ("x", "close issue"),
    ("y", "copy issue URL"),
    ("r", "refresh now"),
    ("d", "toggle dark mode"),
    ("p / ?", "toggle this help"),
    ("q / Esc / Ctrl-c", "quit"),
];

/// Render a centered confirmation popup: [y]es / [n]o
pub fn render_confirm(frame: &mut Frame, title: &str, message: &str) {
    let area = centered_rect(60, 7, frame.area());
    frame.render_widget(Clear, area);

    let lines = vec![
        Line::from(""),
        Line::from(Span::raw(message)),
        Line::from(""),
        Line::from(vec![
            Span::styled("[y]", Style::default().fg(Color::Green)),
            Span::raw("es  "),
            Span::styled("[n]", Style::default().fg(Color::Red)),
            Span::raw("o"),
        ]),
    ];

    let popup = Paragraph::new(lines)
        .block(titled_block(title))
        .alignment(Alignment::Center);

    frame.render_widget(popup, area);
}

pub fn render_help(frame: &mut Frame) {
    let height = BINDINGS.len() as u16 + 2;
    let area = centered_rect(56, height, frame.area());
    frame.render_widget(Clear, area);

    let lines: Vec<Line> = BINDINGS
        .iter()
        .map(|(keys, what)| {
            Line::from(vec![
                Span::styled(
                    format!(" {:<18}", keys),
                    Style::default().fg(Color::Cyan),
                ),
                Span::raw(*what),
            ])
        })
        .collect();

    frame.render_widget(Paragraph::new(lines).block(titled_block("Keys")), area);
}

fn titled_block(title: &str) -> Block<'static> {
    Block::default().borders(Borders::ALL).title(Span::styled(
        format!(" {} ", title),
        Style::default()
            .fg(Color::Yellow)
            .add_modifier(Modifier::BOLD),
    ))
}

/// Center a `width` x `height` rect inside `outer`, shrinking to fit.
fn centered_rect(width: u16, height: u16, outer: Rect) -> Rect {
    let popup_width = width.min(outer.width);
    let popup_height = height.min(outer.height);

    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length((outer.height.saturating_sub(popup_height)) / 2),
            Constraint::Length(popup_height),
            Constraint::Min(0),
        ])
        .split(outer);

    let horizontal = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Length((outer.width.saturating_sub(popup_width)) / 2),
            Constraint::Length(popup_width),
            Constraint::Min(0),
        ])
        .split(vertical[1]);

    horizontal[1]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn centered_rect_shrinks_to_outer() {
        let outer = Rect::new(0, 0, 40, 5);
        let area = centered_rect(60, 7, outer);
        assert_eq!(area.width, 40);
        assert_eq!(area.height, 5);

        let area = centered_rect(20, 3, Rect::new(0, 0, 80, 23));
        assert_eq!((area.x, area.y, area.width, area.height), (30, 10, 20, 3));
    }
}
