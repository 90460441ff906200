//! Board: candy palette, cell slots, gravity collapse and refill.

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Board height in cells. Row 0 is the top.
pub const ROWS: usize = 8;
/// Board width in cells.
pub const COLS: usize = 8;

/// Candy kinds (the token palette).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Candy {
    Red,
    Orange,
    Yellow,
    Green,
    Blue,
    Purple,
}

impl Candy {
    pub const ALL: [Self; 6] = [
        Self::Red,
        Self::Orange,
        Self::Yellow,
        Self::Green,
        Self::Blue,
        Self::Purple,
    ];

    /// Palette index 0..6, used for theme colours.
    pub fn index(self) -> u8 {
        match self {
            Self::Red => 0,
            Self::Orange => 1,
            Self::Yellow => 2,
            Self::Green => 3,
            Self::Blue => 4,
            Self::Purple => 5,
        }
    }

    pub fn from_index(index: u8) -> Self {
        Self::ALL[(index as usize) % Self::ALL.len()]
    }

    pub fn letter(self) -> char {
        match self {
            Self::Red => 'R',
            Self::Orange => 'O',
            Self::Yellow => 'Y',
            Self::Green => 'G',
            Self::Blue => 'B',
            Self::Purple => 'P',
        }
    }

    pub fn from_letter(c: char) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|candy| candy.letter() == c.to_ascii_uppercase())
    }
}

/// Special kinds a cell can carry on top of its candy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Special {
    /// Clears its whole row.
    StripedHorizontal,
    /// Clears its whole column.
    StripedVertical,
    /// Clears the 3x3 block around it.
    Wrapped,
    /// Clears every candy of the type it is swapped with.
    ColorBomb,
}

/// Anything that can hand out fresh candies (refill, generation, repair).
pub trait TokenSource {
    fn next_candy(&mut self) -> Candy;
}

impl TokenSource for rand::rngs::StdRng {
    fn next_candy(&mut self) -> Candy {
        use rand::Rng;
        Candy::from_index(self.random_range(0..Candy::ALL.len() as u8))
    }
}

/// Grid coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Pos {
    pub row: usize,
    pub col: usize,
}

impl Pos {
    pub const fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }

    #[inline]
    pub fn in_bounds(self) -> bool {
        self.row < ROWS && self.col < COLS
    }

    /// Orthogonal neighbours only (Manhattan distance exactly 1).
    pub fn is_adjacent(self, other: Self) -> bool {
        self.row.abs_diff(other.row) + self.col.abs_diff(other.col) == 1
    }

    /// Step by (dr, dc), or None when it leaves the board.
    pub fn offset(self, dr: isize, dc: isize) -> Option<Self> {
        let row = self.row.checked_add_signed(dr)?;
        let col = self.col.checked_add_signed(dc)?;
        let p = Self::new(row, col);
        p.in_bounds().then_some(p)
    }
}

impl fmt::Display for Pos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

/// An occupied slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cell {
    pub candy: Candy,
    pub special: Option<Special>,
    /// Condemned in the current step; cleared right after the reveal frame.
    pub pending_removal: bool,
    /// Dropped or refilled in the last settle (drawing only).
    pub just_placed: bool,
}

impl Cell {
    pub const fn plain(candy: Candy) -> Self {
        Self {
            candy,
            special: None,
            pending_removal: false,
            just_placed: false,
        }
    }

    pub const fn special(candy: Candy, special: Special) -> Self {
        Self {
            candy,
            special: Some(special),
            pending_removal: false,
            just_placed: false,
        }
    }

    #[inline]
    pub fn is(&self, special: Special) -> bool {
        self.special == Some(special)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LayoutError {
    #[error("expected {ROWS} rows, found {0}")]
    RowCount(usize),
    #[error("row {row}: expected {COLS} candies, found {found}")]
    RowWidth { row: usize, found: usize },
    #[error("row {row}: unknown candy letter {letter:?}")]
    UnknownCandy { row: usize, letter: char },
}

/// The 8x8 grid. `None` slots only exist between a removal and the refill that follows it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Board {
    cells: [[Option<Cell>; COLS]; ROWS],
}

impl Board {
    /// Board with every slot empty.
    pub fn empty() -> Self {
        Self {
            cells: [[None; COLS]; ROWS],
        }
    }

    /// Fully random board; may contain runs (see `game::stabilize`).
    pub fn random(tokens: &mut impl TokenSource) -> Self {
        let mut board = Self::empty();
        for pos in Self::positions() {
            board.set(pos, Some(Cell::plain(tokens.next_candy())));
        }
        board
    }

    /// Every coordinate, row-major from the top-left.
    pub fn positions() -> impl Iterator<Item = Pos> {
        (0..ROWS).flat_map(|row| (0..COLS).map(move |col| Pos::new(row, col)))
    }

    #[inline]
    pub fn get(&self, pos: Pos) -> Option<&Cell> {
        self.cells.get(pos.row)?.get(pos.col)?.as_ref()
    }

    #[inline]
    pub fn get_mut(&mut self, pos: Pos) -> Option<&mut Cell> {
        self.cells.get_mut(pos.row)?.get_mut(pos.col)?.as_mut()
    }

    #[inline]
    pub fn set(&mut self, pos: Pos, cell: Option<Cell>) {
        if pos.in_bounds() {
            self.cells[pos.row][pos.col] = cell;
        }
    }

    pub fn candy_at(&self, pos: Pos) -> Option<Candy> {
        self.get(pos).map(|c| c.candy)
    }

    /// Exchange two slots. Out-of-bounds positions are ignored.
    pub fn swap(&mut self, a: Pos, b: Pos) {
        if a.in_bounds() && b.in_bounds() {
            let tmp = self.cells[a.row][a.col];
            self.cells[a.row][a.col] = self.cells[b.row][b.col];
            self.cells[b.row][b.col] = tmp;
        }
    }

    pub fn is_full(&self) -> bool {
        self.cells.iter().flatten().all(Option::is_some)
    }

    /// Mark cells condemned for the reveal frame.
    pub fn mark_pending(&mut self, positions: &[Pos]) {
        for &pos in positions {
            if let Some(cell) = self.get_mut(pos) {
                cell.pending_removal = true;
            }
        }
    }

    /// Empty the given slots; returns how many were occupied.
    pub fn remove(&mut self, positions: &[Pos]) -> usize {
        let mut removed = 0;
        for &pos in positions {
            if pos.in_bounds() && self.cells[pos.row][pos.col].take().is_some() {
                removed += 1;
            }
        }
        removed
    }

    /// Drop the transient flags left by the previous step.
    pub fn clear_transient(&mut self) {
        for cell in self.cells.iter_mut().flatten().flatten() {
            cell.pending_removal = false;
            cell.just_placed = false;
        }
    }

    /// Gravity: compact every column toward the bottom, keeping order.
    /// Each settled cell is marked `just_placed`; the top of the column is left empty.
    pub fn collapse(&mut self) {
        for col in 0..COLS {
            let mut write = ROWS;
            for row in (0..ROWS).rev() {
                if let Some(mut cell) = self.cells[row][col].take() {
                    write -= 1;
                    cell.just_placed = true;
                    self.cells[write][col] = Some(cell);
                }
            }
        }
    }

    /// Fill every empty slot with a fresh plain candy, row-major.
    /// Returns the number of candies added.
    pub fn refill(&mut self, tokens: &mut impl TokenSource) -> usize {
        let mut added = 0;
        for slot in self.cells.iter_mut().flatten() {
            if slot.is_none() {
                let mut cell = Cell::plain(tokens.next_candy());
                cell.just_placed = true;
                *slot = Some(cell);
                added += 1;
            }
        }
        added
    }

    /// Would placing `candy` at `pos` complete a run of three (horizontal or vertical)?
    pub fn creates_match(&self, pos: Pos, candy: Candy) -> bool {
        let same = |dr: isize, dc: isize| {
            pos.offset(dr, dc)
                .and_then(|p| self.candy_at(p))
                .is_some_and(|c| c == candy)
        };
        (same(0, -1) && same(0, -2))
            || (same(0, 1) && same(0, 2))
            || (same(0, -1) && same(0, 1))
            || (same(-1, 0) && same(-2, 0))
            || (same(1, 0) && same(2, 0))
            || (same(-1, 0) && same(1, 0))
    }

    /// Parse 8 rows of candy letters (`R O Y G B P`); whitespace inside a row is ignored.
    pub fn from_rows<S: AsRef<str>>(rows: &[S]) -> Result<Self, LayoutError> {
        if rows.len() != ROWS {
            return Err(LayoutError::RowCount(rows.len()));
        }
        let mut board = Self::empty();
        for (row, line) in rows.iter().enumerate() {
            let letters: Vec<char> = line
                .as_ref()
                .chars()
                .filter(|c| !c.is_whitespace())
                .collect();
            if letters.len() != COLS {
                return Err(LayoutError::RowWidth {
                    row,
                    found: letters.len(),
                });
            }
            for (col, letter) in letters.into_iter().enumerate() {
                let candy =
                    Candy::from_letter(letter).ok_or(LayoutError::UnknownCandy { row, letter })?;
                board.set(Pos::new(row, col), Some(Cell::plain(candy)));
            }
        }
        Ok(board)
    }
}

impl FromStr for Board {
    type Err = LayoutError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let rows: Vec<&str> = s
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty() && !l.starts_with('#'))
            .collect();
        Self::from_rows(&rows)
    }
}

/// Letter grid; specials print as `-` `|` `+` `*`, empty slots as `.`.
impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in &self.cells {
            for slot in row {
                let c = match slot {
                    None => '.',
                    Some(cell) => match cell.special {
                        None => cell.candy.letter(),
                        Some(Special::StripedHorizontal) => '-',
                        Some(Special::StripedVertical) => '|',
                        Some(Special::Wrapped) => '+',
                        Some(Special::ColorBomb) => '*',
                    },
                };
                write!(f, "{c}")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

/// Deterministic token source for tests: cycles through a fixed list.
#[cfg(test)]
pub(crate) struct Script {
    candies: Vec<Candy>,
    next: usize,
}

#[cfg(test)]
impl Script {
    pub(crate) fn new(letters: &str) -> Self {
        let candies = letters.chars().filter_map(Candy::from_letter).collect();
        Self { candies, next: 0 }
    }
}

#[cfg(test)]
impl TokenSource for Script {
    fn next_candy(&mut self) -> Candy {
        let candy = self.candies[self.next % self.candies.len()];
        self.next += 1;
        candy
    }
}

/// Run-free reference layout, candy index `(row + 2 * col) % 6`.
#[cfg(test)]
pub(crate) const STRIPES: [&str; ROWS] = [
    "RYBRYBRY", "OGPOGPOG", "YBRYBRYB", "GPOGPOGP", "BRYBRYBR", "POGPOGPO", "RYBRYBRY",
    "OGPOGPOG",
];
