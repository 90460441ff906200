//! Key bindings (arrows and vim-style) and the two-click swap gesture.

use crate::board::{COLS, Pos, ROWS};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

/// Action from a key press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Up,
    Down,
    Left,
    Right,
    Select,
    Restart,
    Quit,
    None,
}

/// Map key event to action. Supports both normal (arrows, Enter/Space) and vim (hjkl).
pub fn key_to_action(key: KeyEvent) -> Action {
    let KeyEvent { code, modifiers, .. } = key;
    if modifiers == KeyModifiers::CONTROL && code == KeyCode::Char('c') {
        return Action::Quit;
    }
    let no_mod = modifiers.is_empty() || modifiers == KeyModifiers::SHIFT;
    if !no_mod {
        return Action::None;
    }
    match code {
        KeyCode::Char('q' | 'Q') | KeyCode::Esc => Action::Quit,
        KeyCode::Char('r' | 'R') => Action::Restart,
        KeyCode::Up | KeyCode::Char('k') => Action::Up,
        KeyCode::Down | KeyCode::Char('j') => Action::Down,
        KeyCode::Left | KeyCode::Char('h') => Action::Left,
        KeyCode::Right | KeyCode::Char('l') => Action::Right,
        KeyCode::Enter | KeyCode::Char(' ') => Action::Select,
        _ => Action::None,
    }
}

/// Move the cursor one cell, stopping at the edges.
pub fn step_cursor(cursor: Pos, action: Action) -> Pos {
    let (dr, dc) = match action {
        Action::Up => (-1, 0),
        Action::Down => (1, 0),
        Action::Left => (0, -1),
        Action::Right => (0, 1),
        _ => return cursor,
    };
    cursor.offset(dr, dc).unwrap_or(cursor)
}

/// Pending first pick of the select-then-select swap.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Selection {
    first: Option<Pos>,
}

impl Selection {
    pub fn first(&self) -> Option<Pos> {
        self.first
    }

    pub fn clear(&mut self) {
        self.first = None;
    }

    /// Feed one pick. Returns the pair to swap once an adjacent second cell is picked.
    /// Picking the same cell again cancels; a non-adjacent pick becomes the new first pick.
    pub fn pick(&mut self, pos: Pos) -> Option<(Pos, Pos)> {
        if !pos.in_bounds() {
            return None;
        }
        match self.first.take() {
            None => {
                self.first = Some(pos);
                None
            }
            Some(first) if first == pos => None,
            Some(first) if first.is_adjacent(pos) => Some((first, pos)),
            Some(_) => {
                self.first = Some(pos);
                None
            }
        }
    }
}

/// Cursor start: middle of the board.
pub const fn home() -> Pos {
    Pos::new(ROWS / 2, COLS / 2)
}
