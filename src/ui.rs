//! Layout and drawing: board, cursor, sidebar HUD, level dialog, reveal fade.

use crate::app::Screen;
use crate::board::{Board, COLS, Cell, Pos, ROWS, Special};
use crate::game::{GameEvent, GameState, LevelStatus, Phase};
use crate::theme::Theme;
use ratatui::Frame;
use ratatui::buffer::Buffer;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Position, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Gauge, Paragraph, Widget};
use std::collections::HashSet;
use std::time::Instant;
use tachyonfx::{
    CellFilter, Duration as TfxDuration, Effect, EffectRenderer, Interpolation, fx, ref_count,
};

/// Terminal cells per board cell: a 2x2 candy with a one-column margin each side.
const CELL_WIDTH: u16 = 4;
const CELL_HEIGHT: u16 = 2;
const BOARD_WIDTH: u16 = COLS as u16 * CELL_WIDTH + 2;
const BOARD_HEIGHT: u16 = ROWS as u16 * CELL_HEIGHT + 2;
const SIDEBAR_WIDTH: u16 = 26;

/// Everything the renderer reads for one frame.
pub struct View<'a> {
    pub theme: &'a Theme,
    pub state: &'a GameState,
    /// Board to draw: the snapshot being played back, or the live board.
    pub board: &'a Board,
    pub phase: Option<Phase>,
    pub cursor: Pos,
    pub selected: Option<Pos>,
    pub screen: Screen,
    pub notice: Option<&'a str>,
    pub last_event: Option<GameEvent>,
    /// Score and cells of the last handled turn.
    pub last_gain: Option<(u32, usize)>,
    pub reveal_ms: u32,
}

/// Draw the game, the level dialog when a level is over, and the reveal fade while
/// matched candies are on screen. The fade effect lives in `reveal_effect` until the
/// caller drops it for the next snapshot.
pub fn draw(
    frame: &mut Frame,
    view: &View,
    reveal_effect: &mut Option<Effect>,
    reveal_process_time: &mut Option<Instant>,
    now: Instant,
) {
    let area = frame.area();
    let total_w = BOARD_WIDTH + SIDEBAR_WIDTH;
    if area.width < total_w || area.height < BOARD_HEIGHT {
        draw_too_small(frame, view.theme, area, total_w);
        return;
    }

    let (board_area, sidebar_area) = game_areas(area);
    draw_board(frame, view, board_area);
    draw_sidebar(frame, view, sidebar_area);

    if view.phase == Some(Phase::Reveal) {
        apply_reveal_effect(
            frame,
            view,
            board_inner(board_area),
            reveal_effect,
            reveal_process_time,
            now,
        );
    }
    if let Screen::LevelOver(status) = view.screen {
        draw_level_dialog(frame, view, status, area);
    }
}

/// Board and sidebar, centred in `area`.
fn game_areas(area: Rect) -> (Rect, Rect) {
    let total_w = BOARD_WIDTH + SIDEBAR_WIDTH;
    let horiz = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Fill(1),
            Constraint::Length(total_w),
            Constraint::Fill(1),
        ])
        .split(area);
    let vert = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Fill(1),
            Constraint::Length(BOARD_HEIGHT),
            Constraint::Fill(1),
        ])
        .split(horiz[1]);
    let inner = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Length(BOARD_WIDTH),
            Constraint::Length(SIDEBAR_WIDTH),
        ])
        .split(vert[1]);
    (inner[0], inner[1])
}

fn board_inner(board_area: Rect) -> Rect {
    Rect {
        x: board_area.x + 1,
        y: board_area.y + 1,
        width: board_area.width.saturating_sub(2),
        height: board_area.height.saturating_sub(2),
    }
}

fn cell_rect(inner: Rect, pos: Pos) -> Rect {
    Rect {
        x: inner.x + pos.col as u16 * CELL_WIDTH,
        y: inner.y + pos.row as u16 * CELL_HEIGHT,
        width: CELL_WIDTH,
        height: CELL_HEIGHT,
    }
}

fn draw_too_small(frame: &mut Frame, theme: &Theme, area: Rect, need_w: u16) {
    let msg = format!(
        "Terminal too small: need {}x{}, have {}x{}",
        need_w, BOARD_HEIGHT, area.width, area.height
    );
    Paragraph::new(msg)
        .alignment(Alignment::Center)
        .style(Style::default().fg(theme.main_fg))
        .render(area, frame.buffer_mut());
}

fn draw_board(frame: &mut Frame, view: &View, area: Rect) {
    let theme = view.theme;
    let mut block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.div_line).bg(theme.bg))
        .title(Span::styled(" Candytui ", theme.title));
    if let Some(notice) = view.notice {
        block = block.title_bottom(Span::styled(
            format!(" {notice} "),
            Style::default()
                .fg(theme.title)
                .add_modifier(Modifier::BOLD),
        ));
    }
    let inner = block.inner(area);
    block.render(area, frame.buffer_mut());

    let buf = frame.buffer_mut();
    buf.set_style(inner, Style::default().bg(theme.bg));
    for pos in Board::positions() {
        draw_cell(buf, cell_rect(inner, pos), view.board.get(pos), theme);
    }
    if view.screen == Screen::Playing {
        if let Some(sel) = view.selected {
            draw_marker(buf, cell_rect(inner, sel), ('>', '<'), theme.main_fg);
        }
        let color = if view.selected == Some(view.cursor) {
            theme.title
        } else {
            theme.main_fg
        };
        let marks = if view.selected == Some(view.cursor) {
            ('>', '<')
        } else {
            ('[', ']')
        };
        draw_marker(buf, cell_rect(inner, view.cursor), marks, color);
    }
}

/// Glyph rows for a cell's 2x2 candy.
fn glyph(special: Option<Special>) -> [&'static str; 2] {
    match special {
        None => ["  ", "  "],
        Some(Special::StripedHorizontal) => ["━━", "━━"],
        Some(Special::StripedVertical) => ["┃┃", "┃┃"],
        Some(Special::Wrapped) => ["┏┓", "┗┛"],
        Some(Special::ColorBomb) => ["◆◆", "◆◆"],
    }
}

fn draw_cell(buf: &mut Buffer, r: Rect, cell: Option<&Cell>, theme: &Theme) {
    let Some(cell) = cell else {
        return;
    };
    let color = if cell.pending_removal {
        Color::White
    } else {
        theme.candy_color(cell.candy)
    };
    // Bombs invert: light body, candy-coloured diamonds.
    let style = if cell.is(Special::ColorBomb) {
        Style::default().fg(color).bg(theme.main_fg)
    } else {
        Style::default().fg(theme.bg).bg(color)
    };
    for (dy, row) in glyph(cell.special).iter().enumerate() {
        for (dx, ch) in row.chars().enumerate() {
            buf[(r.x + 1 + dx as u16, r.y + dy as u16)]
                .set_char(ch)
                .set_style(style);
        }
    }
}

fn draw_marker(buf: &mut Buffer, r: Rect, (left, right): (char, char), color: Color) {
    let style = Style::default().fg(color).add_modifier(Modifier::BOLD);
    for dy in 0..CELL_HEIGHT {
        buf[(r.x, r.y + dy)].set_char(left).set_style(style);
        buf[(r.x + CELL_WIDTH - 1, r.y + dy)]
            .set_char(right)
            .set_style(style);
    }
}

/// Buffer positions covered by cells flagged for removal.
fn pending_buffer_positions(inner: Rect, board: &Board) -> HashSet<(u16, u16)> {
    let mut set = HashSet::new();
    for pos in Board::positions() {
        if !board.get(pos).is_some_and(|c| c.pending_removal) {
            continue;
        }
        let r = cell_rect(inner, pos);
        for x in r.x..r.x + r.width {
            for y in r.y..r.y + r.height {
                set.insert((x, y));
            }
        }
    }
    set
}

/// Create or update the reveal fade (matched candies fade to the board background) and process it.
fn apply_reveal_effect(
    frame: &mut Frame,
    view: &View,
    inner: Rect,
    reveal_effect: &mut Option<Effect>,
    reveal_process_time: &mut Option<Instant>,
    now: Instant,
) {
    let delta = reveal_process_time
        .map(|t| now.saturating_duration_since(t))
        .unwrap_or(std::time::Duration::ZERO);
    let delta_ms = delta.as_millis().min(u32::MAX as u128) as u32;
    *reveal_process_time = Some(now);

    if reveal_effect.is_none() {
        let fading = pending_buffer_positions(inner, view.board);
        let filter = CellFilter::PositionFn(ref_count(move |pos: Position| {
            fading.contains(&(pos.x, pos.y))
        }));
        let bg = view.theme.bg;
        let effect = fx::fade_to(bg, bg, (view.reveal_ms, Interpolation::Linear))
            .with_filter(filter)
            .with_area(inner);
        *reveal_effect = Some(effect);
    }

    if let Some(effect) = reveal_effect {
        frame.render_effect(effect, inner, TfxDuration::from_millis(delta_ms));
    }
}

pub fn event_label(event: GameEvent) -> &'static str {
    match event {
        GameEvent::Match => "Match",
        GameEvent::StripedActivated => "Striped!",
        GameEvent::WrappedActivated => "Wrapped!",
        GameEvent::ColorBombActivated => "Colour bomb!",
        GameEvent::LevelWon => "Goal reached",
        GameEvent::LevelLost => "Out of moves",
    }
}

fn draw_sidebar(frame: &mut Frame, view: &View, area: Rect) {
    let theme = view.theme;
    let state = view.state;
    let title_style = Style::default().fg(theme.title);
    let fg_style = Style::default().fg(theme.main_fg);
    let dim_style = Style::default().fg(theme.inactive_fg);
    let border_style = Style::default().fg(theme.div_line).bg(theme.bg);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(7), // Stats (border + level, score, goal, moves, gauge)
            Constraint::Length(3), // Last turn
            Constraint::Length(8), // Legend and keys
        ])
        .split(area);

    // --- Stats ---
    let stats_block = Block::default()
        .borders(Borders::ALL)
        .border_style(border_style);
    let stats_inner = stats_block.inner(chunks[0]);
    stats_block.render(chunks[0], frame.buffer_mut());
    let stats_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(4), Constraint::Length(1)])
        .split(stats_inner);
    let moves_style = if state.moves_left <= 3 {
        Style::default().fg(Color::Red).add_modifier(Modifier::BOLD)
    } else {
        fg_style
    };
    let stats_lines = vec![
        Line::from(vec![
            Span::styled("Level: ", title_style),
            Span::styled(state.level.to_string(), fg_style),
        ]),
        Line::from(vec![
            Span::styled("Score: ", title_style),
            Span::styled(state.score.to_string(), fg_style),
        ]),
        Line::from(vec![
            Span::styled("Goal:  ", title_style),
            Span::styled(state.goal_score.to_string(), fg_style),
        ]),
        Line::from(vec![
            Span::styled("Moves: ", title_style),
            Span::styled(
                format!("{} / {}", state.moves_left, state.move_limit),
                moves_style,
            ),
        ]),
    ];
    Paragraph::new(stats_lines).render(stats_layout[0], frame.buffer_mut());
    let ratio = if state.goal_score > 0 {
        (state.score as f64 / state.goal_score as f64).min(1.0)
    } else {
        1.0
    };
    let gauge_color = if ratio >= 1.0 {
        Color::Green
    } else {
        theme.title
    };
    Gauge::default()
        .ratio(ratio)
        .label(format!("{:.0}%", ratio * 100.0))
        .gauge_style(Style::default().fg(gauge_color).bg(theme.div_line))
        .render(stats_layout[1], frame.buffer_mut());

    // --- Last turn ---
    let last_block = Block::default()
        .borders(Borders::ALL)
        .border_style(border_style)
        .title(Span::styled(" Last ", title_style));
    let last_inner = last_block.inner(chunks[1]);
    last_block.render(chunks[1], frame.buffer_mut());
    let mut last = Vec::new();
    if let Some(event) = view.last_event {
        last.push(Span::styled(event_label(event), fg_style));
    }
    if let Some((points, cells)) = view.last_gain {
        last.push(Span::styled(format!("  +{points} ({cells})"), dim_style));
    }
    Paragraph::new(Line::from(last)).render(last_inner, frame.buffer_mut());

    // --- Legend ---
    let legend_block = Block::default()
        .borders(Borders::ALL)
        .border_style(border_style);
    let legend_inner = legend_block.inner(chunks[2]);
    legend_block.render(chunks[2], frame.buffer_mut());
    let sample = Style::default().fg(theme.bg).bg(theme.main_fg);
    let legend_line = |special: Special, text: &'static str| {
        Line::from(vec![
            Span::styled(glyph(Some(special))[0], sample),
            Span::styled(format!(" {text}"), dim_style),
        ])
    };
    let legend = vec![
        legend_line(Special::StripedHorizontal, "clears row"),
        legend_line(Special::StripedVertical, "clears column"),
        legend_line(Special::Wrapped, "clears 3x3"),
        legend_line(Special::ColorBomb, "clears a colour"),
        Line::from(""),
        Line::from(Span::styled("↔↕ move ⏎ swap r q", dim_style)),
    ];
    Paragraph::new(legend).render(legend_inner, frame.buffer_mut());
}

fn draw_level_dialog(frame: &mut Frame, view: &View, status: LevelStatus, area: Rect) {
    let theme = view.theme;
    let state = view.state;
    let popup_w = 32u16;
    let popup_h = 9u16;
    let popup = Rect {
        x: area.x + area.width.saturating_sub(popup_w) / 2,
        y: area.y + area.height.saturating_sub(popup_h) / 2,
        width: popup_w.min(area.width),
        height: popup_h.min(area.height),
    };
    let (title, title_style, next) = match status {
        LevelStatus::Won => (
            format!(" Level {} complete! ", state.level),
            Style::default().fg(Color::Black).bg(Color::Green),
            " Enter — Next level ",
        ),
        _ => (
            " Out of moves ".to_string(),
            Style::default().fg(Color::White).bg(Color::Red),
            " Enter — Try again ",
        ),
    };
    let fg = Style::default().fg(theme.main_fg);
    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(title, title_style)),
        Line::from(""),
        Line::from(Span::styled(
            format!(" Score: {} / {} ", state.score, state.goal_score),
            fg,
        )),
        Line::from(""),
        Line::from(Span::styled(next, fg)),
        Line::from(Span::styled(" R — Restart    Q — Quit ", fg)),
    ];
    Clear.render(popup, frame.buffer_mut());
    Paragraph::new(lines)
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(theme.div_line).bg(theme.bg))
                .title(Span::styled(" Candytui ", theme.title)),
        )
        .style(Style::default().bg(theme.bg))
        .render(popup, frame.buffer_mut());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::Candy;

    #[test]
    fn test_layout_fits_board() {
        let (board, sidebar) = game_areas(Rect::new(0, 0, 100, 30));
        assert_eq!(board.width, BOARD_WIDTH);
        assert_eq!(board.height, BOARD_HEIGHT);
        assert_eq!(sidebar.x, board.x + BOARD_WIDTH);
        let inner = board_inner(board);
        let last = cell_rect(inner, Pos::new(ROWS - 1, COLS - 1));
        assert_eq!(last.x + last.width, inner.x + inner.width);
        assert_eq!(last.y + last.height, inner.y + inner.height);
    }

    #[test]
    fn test_pending_positions_cover_whole_cells() {
        let mut board = Board::empty();
        board.set(Pos::new(0, 1), Some(Cell::plain(Candy::Red)));
        board.set(Pos::new(2, 2), Some(Cell::plain(Candy::Blue)));
        board.mark_pending(&[Pos::new(0, 1)]);
        let inner = Rect::new(1, 1, BOARD_WIDTH - 2, BOARD_HEIGHT - 2);
        let set = pending_buffer_positions(inner, &board);
        assert_eq!(set.len(), (CELL_WIDTH * CELL_HEIGHT) as usize);
        assert!(set.contains(&(1 + CELL_WIDTH, 1)));
        assert!(!set.contains(&(1, 1)));
    }
}
