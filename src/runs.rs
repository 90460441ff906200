//! Run detection: maximal horizontal and vertical lines of three or more same candies.

use crate::board::{Board, COLS, Candy, Pos, ROWS};
use std::collections::HashSet;

/// Shortest line that counts as a match.
pub const MIN_RUN: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Horizontal,
    Vertical,
}

/// One matched line. `cells` are in scan order (left to right, or top to bottom).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Run {
    pub direction: Direction,
    pub candy: Candy,
    pub cells: Vec<Pos>,
}

impl Run {
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn contains(&self, pos: Pos) -> bool {
        self.cells.contains(&pos)
    }
}

/// All runs on the board: rows first (top to bottom), then columns (left to right).
/// Crossing runs are reported separately, once per direction. Empty slots break runs.
pub fn find_runs(board: &Board) -> Vec<Run> {
    let mut runs = Vec::new();
    for row in 0..ROWS {
        scan_line(
            board,
            (0..COLS).map(|col| Pos::new(row, col)),
            Direction::Horizontal,
            &mut runs,
        );
    }
    for col in 0..COLS {
        scan_line(
            board,
            (0..ROWS).map(|row| Pos::new(row, col)),
            Direction::Vertical,
            &mut runs,
        );
    }
    runs
}

fn scan_line(
    board: &Board,
    line: impl Iterator<Item = Pos>,
    direction: Direction,
    runs: &mut Vec<Run>,
) {
    let mut current: Option<Candy> = None;
    let mut cells: Vec<Pos> = Vec::new();
    for pos in line {
        let candy = board.candy_at(pos);
        if candy.is_some() && candy == current {
            cells.push(pos);
            continue;
        }
        flush(direction, current, &mut cells, runs);
        current = candy;
        if candy.is_some() {
            cells.push(pos);
        }
    }
    flush(direction, current, &mut cells, runs);
}

fn flush(direction: Direction, candy: Option<Candy>, cells: &mut Vec<Pos>, runs: &mut Vec<Run>) {
    if let Some(candy) = candy {
        if cells.len() >= MIN_RUN {
            runs.push(Run {
                direction,
                candy,
                cells: std::mem::take(cells),
            });
        }
    }
    cells.clear();
}

/// Distinct positions covered by `runs`, in first-seen order.
pub fn matched_positions(runs: &[Run]) -> Vec<Pos> {
    let mut seen = HashSet::new();
    runs.iter()
        .flat_map(|run| run.cells.iter().copied())
        .filter(|pos| seen.insert(*pos))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::STRIPES;

    fn board(rows: [&str; ROWS]) -> Board {
        Board::from_rows(&rows).unwrap()
    }

    #[test]
    fn test_run_free_board() {
        assert!(find_runs(&board(STRIPES)).is_empty());
    }

    #[test]
    fn test_horizontal_run_at_row_end() {
        let mut rows = STRIPES;
        rows[2] = "YBRYBGGG";
        let runs = find_runs(&board(rows));
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].direction, Direction::Horizontal);
        assert_eq!(runs[0].candy, Candy::Green);
        assert_eq!(
            runs[0].cells,
            vec![Pos::new(2, 5), Pos::new(2, 6), Pos::new(2, 7)]
        );
    }

    #[test]
    fn test_vertical_run_is_maximal() {
        let mut rows = STRIPES;
        // Column 7 gets four Os from the bottom.
        rows[4] = "BRYBRYBO";
        rows[6] = "RYBRYBRO";
        rows[7] = "OGPOGPOO";
        let runs = find_runs(&board(rows));
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].direction, Direction::Vertical);
        assert_eq!(runs[0].len(), 4);
        assert_eq!(runs[0].cells[0], Pos::new(4, 7));
        assert_eq!(runs[0].cells[3], Pos::new(7, 7));
    }

    #[test]
    fn test_l_shape_reports_both_directions() {
        let mut rows = STRIPES;
        rows[0] = "PPPRYBRY";
        rows[1] = "PGPOGPOG";
        rows[2] = "PBRYBRYB";
        let runs = find_runs(&board(rows));
        assert_eq!(runs.len(), 2);
        assert_eq!(runs[0].direction, Direction::Horizontal);
        assert_eq!(runs[1].direction, Direction::Vertical);
        assert!(runs[0].contains(Pos::new(0, 0)));
        assert!(runs[1].contains(Pos::new(0, 0)));
        assert_eq!(matched_positions(&runs).len(), 5);
    }

    #[test]
    fn test_empty_slots_break_runs() {
        let mut rows = STRIPES;
        rows[5] = "GGGPOGPO";
        let mut b = board(rows);
        assert_eq!(find_runs(&b).len(), 1);
        b.remove(&[Pos::new(5, 1)]);
        assert!(find_runs(&b).is_empty());
    }
}
