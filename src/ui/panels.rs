use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, BorderType, Borders, Paragraph};
use ratatui::Frame;

use crate::action::Target;
use crate::board::Board;
use crate::types::Issue;

use super::Palette;

/// Narrowest a repository panel gets before the grid wraps to a new row.
const MIN_PANEL_WIDTH: u16 = 28;

pub const DETAIL_MAX_LINES: usize = 8;

const ACCENTS: [Color; 6] = [
    Color::Cyan,
    Color::Magenta,
    Color::Green,
    Color::Yellow,
    Color::Blue,
    Color::Red,
];

/// Rows an issue occupies inside its panel, counted from the first list row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IssueRegion {
    pub issue: usize,
    pub top: usize,
    pub height: usize,
}

/// Split `area` into one panel per repository, filling rows left to right.
pub fn panel_areas(area: Rect, count: usize) -> Vec<Rect> {
    if count == 0 {
        return Vec::new();
    }
    let columns = ((area.width / MIN_PANEL_WIDTH) as usize).clamp(1, count);
    let rows = count.div_ceil(columns);

    let row_areas = Layout::default()
        .direction(Direction::Vertical)
        .constraints(vec![Constraint::Ratio(1, rows as u32); rows])
        .split(area);

    let mut panels = Vec::with_capacity(count);
    for row in row_areas.iter() {
        let cells = Layout::default()
            .direction(Direction::Horizontal)
            .constraints(vec![Constraint::Ratio(1, columns as u32); columns])
            .split(*row);
        for cell in cells.iter() {
            if panels.len() < count {
                panels.push(*cell);
            }
        }
    }
    panels
}

/// Text shown under an unfolded issue title.
pub fn detail_lines(issue: &Issue) -> Vec<String> {
    let mut lines = Vec::new();
    if !issue.labels.is_empty() {
        lines.push(format!("labels: {}", issue.labels_str()));
    }
    let body = issue.body.trim();
    if body.is_empty() {
        lines.push("(no description)".to_string());
    } else {
        lines.extend(body.lines().map(|l| l.trim_end().to_string()));
    }
    if lines.len() > DETAIL_MAX_LINES {
        lines.truncate(DETAIL_MAX_LINES - 1);
        lines.push("…".to_string());
    }
    lines
}

pub fn issue_regions(board: &Board, repo: usize) -> Vec<IssueRegion> {
    let mut top = 0;
    board.repos()[repo]
        .iter()
        .enumerate()
        .map(|(issue, i)| {
            let detail = if board.is_expanded(i) {
                detail_lines(i).len()
            } else {
                0
            };
            let region = IssueRegion {
                issue,
                top,
                height: 1 + detail,
            };
            top += region.height;
            region
        })
        .collect()
}

/// First visible list row, chosen so the selected issue stays on screen.
/// Unselected panels are never scrolled.
pub fn scroll_offset(board: &Board, repo: usize, regions: &[IssueRegion], height: usize) -> usize {
    let cursor = board.cursor();
    if height == 0 || cursor.repo != repo {
        return 0;
    }
    let Some(region) = regions.get(cursor.issue) else {
        return 0;
    };
    let bottom = region.top + region.height;
    if bottom <= height {
        0
    } else {
        (bottom - height).min(region.top)
    }
}

fn contains(area: &Rect, column: u16, row: u16) -> bool {
    column >= area.x && column < area.right() && row >= area.y && row < area.bottom()
}

/// Resolve a terminal cell inside the board area to what was drawn there.
pub fn hit_test(board: &Board, area: Rect, column: u16, row: u16) -> Option<Target> {
    let panels = panel_areas(area, board.repo_count());
    let (repo, panel) = panels
        .iter()
        .enumerate()
        .find(|(_, p)| contains(p, column, row))?;

    if row == panel.y {
        return Some(Target::RepoTitle(repo));
    }
    let inner = Block::default().borders(Borders::ALL).inner(*panel);
    if !contains(&inner, column, row) {
        return Some(Target::RepoBody(repo));
    }

    let regions = issue_regions(board, repo);
    let line = (row - inner.y) as usize + scroll_offset(board, repo, &regions, inner.height as usize);
    let target = match regions
        .iter()
        .find(|r| line >= r.top && line < r.top + r.height)
    {
        Some(r) if line == r.top => Target::IssueTitle {
            repo,
            issue: r.issue,
        },
        Some(r) => Target::IssueDetail {
            repo,
            issue: r.issue,
        },
        None => Target::RepoBody(repo),
    };
    Some(target)
}

pub fn render(frame: &mut Frame, board: &Board, area: Rect, palette: &Palette, loading: bool) {
    let panels = panel_areas(area, board.repo_count());

    for (index, (repo, panel)) in board.repos().iter().zip(panels).enumerate() {
        let accent = ACCENTS[index % ACCENTS.len()];
        let focused = board.cursor().repo == index;

        let (border_type, border_style) = if focused {
            (
                BorderType::Thick,
                Style::default().fg(accent).add_modifier(Modifier::BOLD),
            )
        } else {
            (BorderType::Plain, Style::default().fg(palette.dim))
        };

        let block = Block::default()
            .borders(Borders::ALL)
            .border_type(border_type)
            .border_style(border_style)
            .title(Span::styled(
                format!(" {} ({}) ", repo.name(), repo.len()),
                Style::default().fg(accent).add_modifier(Modifier::BOLD),
            ));

        let mut lines: Vec<Line> = Vec::new();
        if repo.is_empty() {
            let placeholder = if loading { "Loading..." } else { "No open issues" };
            lines.push(Line::from(Span::styled(
                placeholder,
                Style::default().fg(palette.dim),
            )));
        }

        for (i, issue) in repo.iter().enumerate() {
            let expanded = board.is_expanded(issue);
            let marker = if expanded { "▾" } else { "▸" };

            let mut style = Style::default().fg(palette.fg);
            if !issue.is_open() {
                style = style.fg(palette.dim).add_modifier(Modifier::CROSSED_OUT);
            }
            if board.is_selected(index, i) {
                style = style
                    .bg(accent)
                    .fg(Color::Black)
                    .add_modifier(Modifier::BOLD);
            }

            lines.push(Line::from(vec![
                Span::styled(format!("{} ", marker), Style::default().fg(accent)),
                Span::styled(format!("#{} {}", issue.number, issue.title), style),
            ]));

            if expanded {
                for detail in detail_lines(issue) {
                    let style = if detail.starts_with("labels:") {
                        Style::default().fg(Color::Magenta)
                    } else {
                        Style::default().fg(palette.dim)
                    };
                    lines.push(Line::from(Span::styled(format!("    {}", detail), style)));
                }
            }
        }

        let inner_height = block.inner(panel).height as usize;
        let regions = issue_regions(board, index);
        let offset = scroll_offset(board, index, &regions, inner_height);

        let paragraph = Paragraph::new(lines)
            .block(block)
            .style(Style::default().bg(palette.bg))
            .scroll((offset as u16, 0));
        frame.render_widget(paragraph, panel);
    }
}
