//! Specials: which one a set of runs creates, and what a swapped special clears.

use crate::board::{Board, COLS, Candy, Cell, Pos, ROWS, Special};
use crate::runs::{Direction, Run};
use std::collections::HashSet;

/// Points per cleared cell, for matches and activations alike.
pub const POINTS_PER_CELL: u32 = 10;

/// Run length that creates a colour bomb.
const BOMB_RUN: usize = 5;
/// Run length that creates a striped candy.
const STRIPED_RUN: usize = 4;
/// Minimum cells in a crossing h/v pair for a wrapped candy.
const WRAPPED_UNION: usize = 5;

/// A special to place where a match is cleared.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpecialSpawn {
    pub pos: Pos,
    pub special: Special,
    /// Candy of the run it came from; cosmetic for colour bombs.
    pub candy: Candy,
}

impl SpecialSpawn {
    pub fn cell(&self) -> Cell {
        Cell::special(self.candy, self.special)
    }
}

/// Pick at most one special for one detection pass.
///
/// Priority: colour bomb (any run of 5+), then wrapped (crossing h/v runs
/// covering 5+ cells), then striped (first run of exactly 4). A horizontal
/// 4-run makes a *vertical* striped candy and vice versa.
pub fn synthesize(runs: &[Run], swapped: Option<(Pos, Pos)>) -> Option<SpecialSpawn> {
    if let Some(run) = runs.iter().find(|r| r.len() >= BOMB_RUN) {
        return Some(SpecialSpawn {
            pos: run.cells[run.len() / 2],
            special: Special::ColorBomb,
            candy: run.candy,
        });
    }
    if let Some(spawn) = wrapped_spawn(runs) {
        return Some(spawn);
    }
    let run = runs.iter().find(|r| r.len() == STRIPED_RUN)?;
    let pos = swapped
        .into_iter()
        .flat_map(|(a, b)| [a, b])
        .find(|p| run.contains(*p))
        .unwrap_or(run.cells[0]);
    let special = match run.direction {
        Direction::Horizontal => Special::StripedVertical,
        Direction::Vertical => Special::StripedHorizontal,
    };
    Some(SpecialSpawn {
        pos,
        special,
        candy: run.candy,
    })
}

fn wrapped_spawn(runs: &[Run]) -> Option<SpecialSpawn> {
    let horizontal = runs.iter().filter(|r| r.direction == Direction::Horizontal);
    for h in horizontal {
        for v in runs.iter().filter(|r| r.direction == Direction::Vertical) {
            let Some(shared) = h.cells.iter().find(|c| v.contains(**c)) else {
                continue;
            };
            let union: HashSet<Pos> = h.cells.iter().chain(&v.cells).copied().collect();
            if union.len() >= WRAPPED_UNION {
                return Some(SpecialSpawn {
                    pos: *shared,
                    special: Special::Wrapped,
                    candy: h.candy,
                });
            }
        }
    }
    None
}

/// Shape of an activation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Blast {
    Row(usize),
    Column(usize),
    /// 3x3 around the wrapped candy.
    Block(Pos),
    /// Colour bomb against a plain candy.
    Sweep { target: Candy, bomb: Pos },
    /// Two colour bombs.
    Board,
}

impl Blast {
    /// The special that set this off.
    pub fn trigger(self) -> Special {
        match self {
            Self::Row(_) => Special::StripedHorizontal,
            Self::Column(_) => Special::StripedVertical,
            Self::Block(_) => Special::Wrapped,
            Self::Sweep { .. } | Self::Board => Special::ColorBomb,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Activation {
    pub blast: Blast,
    /// Occupied cells the blast removes, row-major.
    pub cleared: Vec<Pos>,
    pub score_delta: u32,
}

/// What swapping `a` and `b` (already exchanged on `board`) sets off, if anything.
///
/// Colour-bomb rules are tried first. Otherwise one side's geometry applies,
/// checked striped-horizontal, striped-vertical, then wrapped; the other
/// special in a special/special swap is ignored.
pub fn activate(board: &Board, a: Pos, b: Pos) -> Option<Activation> {
    let (ca, cb) = (board.get(a)?, board.get(b)?);
    let blast = color_bomb_blast(a, ca, b, cb).or_else(|| single_blast(a, ca, b, cb))?;
    let cleared = blast_cells(board, blast);
    let score_delta = cleared.len() as u32 * POINTS_PER_CELL;
    Some(Activation {
        blast,
        cleared,
        score_delta,
    })
}

fn color_bomb_blast(a: Pos, ca: &Cell, b: Pos, cb: &Cell) -> Option<Blast> {
    match (ca.special, cb.special) {
        (Some(Special::ColorBomb), Some(Special::ColorBomb)) => Some(Blast::Board),
        (Some(Special::ColorBomb), None) => Some(Blast::Sweep {
            target: cb.candy,
            bomb: a,
        }),
        (None, Some(Special::ColorBomb)) => Some(Blast::Sweep {
            target: ca.candy,
            bomb: b,
        }),
        _ => None,
    }
}

fn single_blast(a: Pos, ca: &Cell, b: Pos, cb: &Cell) -> Option<Blast> {
    let which = |special| {
        if ca.is(special) {
            Some(a)
        } else if cb.is(special) {
            Some(b)
        } else {
            None
        }
    };
    if let Some(p) = which(Special::StripedHorizontal) {
        return Some(Blast::Row(p.row));
    }
    if let Some(p) = which(Special::StripedVertical) {
        return Some(Blast::Column(p.col));
    }
    which(Special::Wrapped).map(Blast::Block)
}

fn blast_cells(board: &Board, blast: Blast) -> Vec<Pos> {
    let candidates: Vec<Pos> = match blast {
        Blast::Row(row) => (0..COLS).map(|col| Pos::new(row, col)).collect(),
        Blast::Column(col) => (0..ROWS).map(|row| Pos::new(row, col)).collect(),
        Blast::Block(center) => (-1..=1)
            .flat_map(|dr| (-1..=1).map(move |dc| (dr, dc)))
            .filter_map(|(dr, dc)| center.offset(dr, dc))
            .collect(),
        Blast::Sweep { target, bomb } => Board::positions()
            .filter(|&p| p == bomb || board.candy_at(p) == Some(target))
            .collect(),
        Blast::Board => Board::positions().collect(),
    };
    candidates
        .into_iter()
        .filter(|&p| board.get(p).is_some())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::STRIPES;
    use crate::runs::find_runs;

    fn board(rows: [&str; ROWS]) -> Board {
        Board::from_rows(&rows).unwrap()
    }

    fn run(direction: Direction, cells: &[(usize, usize)]) -> Run {
        Run {
            direction,
            candy: Candy::Blue,
            cells: cells.iter().map(|&(r, c)| Pos::new(r, c)).collect(),
        }
    }

    #[test]
    fn test_five_beats_four() {
        let mut rows = STRIPES;
        rows[0] = "RRRRRBRY";
        rows[3] = "YYYYPOGP";
        let runs = find_runs(&board(rows));
        assert_eq!(runs.len(), 2);
        let spawn = synthesize(&runs, None).unwrap();
        assert_eq!(spawn.special, Special::ColorBomb);
        assert_eq!(spawn.pos, Pos::new(0, 2));
        assert_eq!(spawn.candy, Candy::Red);
    }

    #[test]
    fn test_horizontal_four_makes_vertical_stripes() {
        let mut rows = STRIPES;
        rows[3] = "YYYYPOGP";
        let runs = find_runs(&board(rows));
        let spawn = synthesize(&runs, None).unwrap();
        assert_eq!(spawn.special, Special::StripedVertical);
        assert_eq!(spawn.pos, Pos::new(3, 0));
        assert_eq!(spawn.candy, Candy::Yellow);
    }

    #[test]
    fn test_vertical_four_makes_horizontal_stripes_at_swap() {
        let mut rows = STRIPES;
        rows[4] = "BRYBRYBO";
        rows[6] = "RYBRYBRO";
        rows[7] = "OGPOGPOO";
        let runs = find_runs(&board(rows));
        let spawn = synthesize(&runs, Some((Pos::new(6, 6), Pos::new(6, 7)))).unwrap();
        assert_eq!(spawn.special, Special::StripedHorizontal);
        assert_eq!(spawn.pos, Pos::new(6, 7));

        let spawn = synthesize(&runs, None).unwrap();
        assert_eq!(spawn.pos, Pos::new(4, 7));
    }

    #[test]
    fn test_l_shape_makes_wrapped() {
        let mut rows = STRIPES;
        rows[0] = "PPPRYBRY";
        rows[1] = "PGPOGPOG";
        rows[2] = "PBRYBRYB";
        let runs = find_runs(&board(rows));
        let spawn = synthesize(&runs, None).unwrap();
        assert_eq!(spawn.special, Special::Wrapped);
        assert_eq!(spawn.pos, Pos::new(0, 0));
        assert_eq!(spawn.candy, Candy::Purple);
    }

    /// Feeds the union-size check directly: two runs sharing two cells never
    /// come out of `find_runs`, where any crossing pair covers at least five.
    #[test]
    fn test_wrapped_union_below_five_is_rejected() {
        let h = run(Direction::Horizontal, &[(0, 0), (0, 1), (0, 2)]);
        let v = run(Direction::Vertical, &[(0, 1), (0, 2), (0, 3)]);
        assert_eq!(synthesize(&[h, v], None), None);
    }

    #[test]
    fn test_runs_that_do_not_cross_make_nothing() {
        let mut rows = STRIPES;
        // Three purples across row 0 and three down column 7, no shared cell.
        rows[0] = "PPPRYBRY";
        rows[5] = "POGPOGPP";
        rows[6] = "RYBRYBRP";
        rows[7] = "OGPOGPOP";
        let runs = find_runs(&board(rows));
        assert_eq!(runs.len(), 2);
        assert_eq!(runs[0].direction, Direction::Horizontal);
        assert_eq!(runs[1].direction, Direction::Vertical);
        assert_eq!(synthesize(&runs, None), None);
    }

    #[test]
    fn test_wrapped_beats_striped() {
        let h = run(Direction::Horizontal, &[(2, 0), (2, 1), (2, 2), (2, 3)]);
        let v = run(Direction::Vertical, &[(2, 1), (3, 1), (4, 1)]);
        let spawn = synthesize(&[h, v], None).unwrap();
        assert_eq!(spawn.special, Special::Wrapped);
        assert_eq!(spawn.pos, Pos::new(2, 1));
    }

    #[test]
    fn test_three_run_makes_nothing() {
        let h = run(Direction::Horizontal, &[(5, 5), (5, 6), (5, 7)]);
        assert_eq!(synthesize(&[h], Some((Pos::new(5, 5), Pos::new(4, 5)))), None);
        assert_eq!(synthesize(&[], None), None);
    }

    fn with_special(mut b: Board, pos: Pos, special: Special) -> Board {
        let candy = b.candy_at(pos).unwrap();
        b.set(pos, Some(Cell::special(candy, special)));
        b
    }

    #[test]
    fn test_two_bombs_clear_the_board() {
        let b = board(STRIPES);
        let b = with_special(b, Pos::new(3, 3), Special::ColorBomb);
        let b = with_special(b, Pos::new(3, 4), Special::ColorBomb);
        let act = activate(&b, Pos::new(3, 3), Pos::new(3, 4)).unwrap();
        assert_eq!(act.blast, Blast::Board);
        assert_eq!(act.cleared.len(), ROWS * COLS);
        assert_eq!(act.score_delta, 640);
    }

    #[test]
    fn test_bomb_sweeps_other_candy() {
        let b = with_special(board(STRIPES), Pos::new(3, 3), Special::ColorBomb);
        // (3, 4) is a plain Purple; ten Purples on the board plus the bomb.
        for (a, c) in [
            (Pos::new(3, 3), Pos::new(3, 4)),
            (Pos::new(3, 4), Pos::new(3, 3)),
        ] {
            let act = activate(&b, a, c).unwrap();
            assert_eq!(
                act.blast,
                Blast::Sweep {
                    target: Candy::Purple,
                    bomb: Pos::new(3, 3)
                }
            );
            assert_eq!(act.cleared.len(), 11);
            assert_eq!(act.score_delta, 110);
            assert!(act.cleared.contains(&Pos::new(3, 3)));
            for p in &act.cleared {
                assert!(*p == Pos::new(3, 3) || b.candy_at(*p) == Some(Candy::Purple));
            }
        }
    }

    #[test]
    fn test_bomb_with_striped_uses_stripes() {
        let b = with_special(board(STRIPES), Pos::new(3, 3), Special::ColorBomb);
        let b = with_special(b, Pos::new(2, 3), Special::StripedVertical);
        let act = activate(&b, Pos::new(3, 3), Pos::new(2, 3)).unwrap();
        assert_eq!(act.blast, Blast::Column(3));
        assert_eq!(act.cleared.len(), ROWS);
    }

    #[test]
    fn test_horizontal_stripes_win_over_vertical() {
        let b = with_special(board(STRIPES), Pos::new(5, 2), Special::StripedVertical);
        let b = with_special(b, Pos::new(5, 3), Special::StripedHorizontal);
        let act = activate(&b, Pos::new(5, 2), Pos::new(5, 3)).unwrap();
        assert_eq!(act.blast, Blast::Row(5));
        assert_eq!(act.cleared.len(), COLS);
        assert_eq!(act.score_delta, 80);
        assert_eq!(act.blast.trigger(), Special::StripedHorizontal);
    }

    #[test]
    fn test_wrapped_block_is_clamped() {
        let b = with_special(board(STRIPES), Pos::new(0, 0), Special::Wrapped);
        let act = activate(&b, Pos::new(0, 0), Pos::new(0, 1)).unwrap();
        assert_eq!(act.blast, Blast::Block(Pos::new(0, 0)));
        assert_eq!(act.cleared.len(), 4);

        let b = with_special(board(STRIPES), Pos::new(4, 4), Special::Wrapped);
        let act = activate(&b, Pos::new(4, 5), Pos::new(4, 4)).unwrap();
        assert_eq!(act.cleared.len(), 9);
        assert_eq!(act.score_delta, 90);
    }

    #[test]
    fn test_plain_swap_activates_nothing() {
        let b = board(STRIPES);
        assert_eq!(activate(&b, Pos::new(0, 0), Pos::new(0, 1)), None);
    }
}
