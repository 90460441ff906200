//! Game state: level policy, board stabilization, swap turns and cascades.

use crate::board::{Board, Candy, Cell, Pos, Special, TokenSource};
use crate::runs::{Run, find_runs, matched_positions};
use crate::special::{self, Activation, POINTS_PER_CELL, SpecialSpawn, synthesize};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Give up repairing a fresh board after this many passes.
pub const MAX_REPAIR_PASSES: u32 = 1000;

/// Random picks tried per repaired cell before falling back to the palette order.
const REPAIR_PICKS: u32 = 64;

/// Match passes allowed in one turn. Only a token source that keeps refilling
/// runs gets here; a uniform one settles in a handful of passes.
pub const MAX_CASCADES: u32 = 1000;

/// Moves allowed on `level`. Saturates at `u32::MAX`.
pub fn move_limit(level: u32) -> u32 {
    let bonus = if level >= 3 { level } else { 0 };
    20u32
        .saturating_add(level.saturating_mul(3) / 2)
        .saturating_add(bonus)
}

/// Score needed to clear `level`. Saturates at `u32::MAX`.
pub fn goal_score(level: u32) -> u32 {
    level.saturating_sub(1).saturating_mul(100).saturating_add(500)
}

/// Feedback for audio/HUD collaborators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameEvent {
    Match,
    StripedActivated,
    WrappedActivated,
    ColorBombActivated,
    LevelWon,
    LevelLost,
}

impl GameEvent {
    fn activated(special: Special) -> Self {
        match special {
            Special::StripedHorizontal | Special::StripedVertical => Self::StripedActivated,
            Special::Wrapped => Self::WrappedActivated,
            Special::ColorBomb => Self::ColorBombActivated,
        }
    }
}

/// What a snapshot shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Cells exchanged, nothing resolved yet.
    Swapped,
    /// Condemned cells flagged `pending_removal`, still on the board.
    Reveal,
    /// After removal, collapse and refill.
    Settled,
    /// Swap undone.
    Reverted,
}

/// Board as it looked at one point of a turn, for playback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub phase: Phase,
    pub board: Board,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The swap did something and cost a move.
    Handled,
    /// Nothing matched; the swap was undone for free.
    Reverted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LevelStatus {
    InProgress,
    Won,
    Lost,
}

/// Everything one swap produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnReport {
    pub outcome: Outcome,
    pub score_delta: u32,
    /// Cells removed, counting cells replaced by a new special.
    pub cells_cleared: usize,
    /// Match-resolution passes (0 when only a special fired).
    pub cascades: u32,
    pub snapshots: Vec<Snapshot>,
    pub events: Vec<GameEvent>,
    pub level_status: LevelStatus,
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum SwapError {
    #[error("{0} is off the board")]
    OutOfBounds(Pos),
    #[error("{0} and {1} are not adjacent")]
    NotAdjacent(Pos, Pos),
    #[error("no moves left")]
    NoMovesRemaining,
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("board still has runs after {0} repair passes")]
pub struct RepairExhausted(pub u32);

/// Accumulates one turn's output while it resolves.
#[derive(Default)]
struct Turn {
    score_delta: u32,
    cells_cleared: usize,
    cascades: u32,
    snapshots: Vec<Snapshot>,
    events: Vec<GameEvent>,
}

impl Turn {
    fn snap(&mut self, phase: Phase, board: &Board) {
        self.snapshots.push(Snapshot {
            phase,
            board: board.clone(),
        });
    }

    fn report(self, outcome: Outcome, level_status: LevelStatus) -> TurnReport {
        TurnReport {
            outcome,
            score_delta: self.score_delta,
            cells_cleared: self.cells_cleared,
            cascades: self.cascades,
            snapshots: self.snapshots,
            events: self.events,
            level_status,
        }
    }
}

/// One level in play.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameState {
    pub board: Board,
    pub score: u32,
    pub moves_left: u32,
    pub level: u32,
    pub goal_score: u32,
    pub move_limit: u32,
}

impl GameState {
    /// Fresh level with a random, run-free board.
    pub fn new(level: u32, tokens: &mut impl TokenSource) -> Self {
        let board = Board::random(tokens);
        Self::with_board(level, board, tokens)
    }

    /// Fresh level on a given layout; runs already on it are repaired in place.
    pub fn with_board(level: u32, mut board: Board, tokens: &mut impl TokenSource) -> Self {
        let level = level.max(1);
        match stabilize(&mut board, tokens) {
            Ok(passes) => debug!(passes, "board stabilized"),
            Err(e) => warn!("{e}; keeping board as is"),
        }
        board.clear_transient();
        let state = Self {
            board,
            score: 0,
            moves_left: move_limit(level),
            level,
            goal_score: goal_score(level),
            move_limit: move_limit(level),
        };
        info!(
            level,
            moves = state.moves_left,
            goal = state.goal_score,
            "level started"
        );
        state
    }

    pub fn is_level_won(&self) -> bool {
        self.score >= self.goal_score
    }

    /// Out of moves without reaching the goal.
    pub fn is_level_lost(&self) -> bool {
        !self.is_level_won() && self.moves_left == 0
    }

    pub fn level_status(&self) -> LevelStatus {
        if self.is_level_won() {
            LevelStatus::Won
        } else if self.is_level_lost() {
            LevelStatus::Lost
        } else {
            LevelStatus::InProgress
        }
    }

    /// Start the next level after a win, or replay this one after a loss.
    /// Returns the status that was acted on; `InProgress` leaves the state alone.
    pub fn advance(&mut self, tokens: &mut impl TokenSource) -> LevelStatus {
        let status = self.level_status();
        match status {
            LevelStatus::Won => *self = Self::new(self.level.saturating_add(1), tokens),
            LevelStatus::Lost => *self = Self::new(self.level, tokens),
            LevelStatus::InProgress => {}
        }
        status
    }

    /// Swap `a` and `b` and resolve everything that follows.
    ///
    /// A colour bomb or other special in the swap fires first; otherwise the
    /// swap must make a run or it is undone without costing a move. Handled
    /// turns cascade until the board holds no runs, then cost exactly one move.
    pub fn attempt_swap(
        &mut self,
        a: Pos,
        b: Pos,
        tokens: &mut impl TokenSource,
    ) -> Result<TurnReport, SwapError> {
        for p in [a, b] {
            if !p.in_bounds() {
                return Err(SwapError::OutOfBounds(p));
            }
        }
        if !a.is_adjacent(b) {
            return Err(SwapError::NotAdjacent(a, b));
        }
        if self.moves_left == 0 {
            return Err(SwapError::NoMovesRemaining);
        }

        let mut turn = Turn::default();
        self.board.swap(a, b);
        turn.snap(Phase::Swapped, &self.board);

        if let Some(activation) = special::activate(&self.board, a, b) {
            self.resolve_activation(activation, &mut turn, tokens);
        } else {
            let runs = find_runs(&self.board);
            if runs.is_empty() {
                self.board.swap(a, b);
                turn.snap(Phase::Reverted, &self.board);
                debug!(%a, %b, "swap reverted");
                return Ok(turn.report(Outcome::Reverted, self.level_status()));
            }
            self.resolve_matches(runs, Some((a, b)), &mut turn, tokens);
        }

        self.moves_left -= 1;
        let status = self.level_status();
        match status {
            LevelStatus::Won => {
                info!(level = self.level, score = self.score, "level won");
                turn.events.push(GameEvent::LevelWon);
            }
            LevelStatus::Lost => {
                info!(level = self.level, score = self.score, "level lost");
                turn.events.push(GameEvent::LevelLost);
            }
            LevelStatus::InProgress => {}
        }
        debug!(
            score_delta = turn.score_delta,
            cleared = turn.cells_cleared,
            cascades = turn.cascades,
            moves_left = self.moves_left,
            "turn resolved"
        );
        Ok(turn.report(Outcome::Handled, status))
    }

    fn resolve_activation(
        &mut self,
        activation: Activation,
        turn: &mut Turn,
        tokens: &mut impl TokenSource,
    ) {
        debug!(
            blast = ?activation.blast,
            cleared = activation.cleared.len(),
            score = activation.score_delta,
            "special fired"
        );
        turn.events
            .push(GameEvent::activated(activation.blast.trigger()));
        self.clear_step(&activation.cleared, None, turn, tokens);
        let runs = find_runs(&self.board);
        if !runs.is_empty() {
            self.resolve_matches(runs, None, turn, tokens);
        }
    }

    /// Clear runs, settle, and repeat until nothing matches. Only the first pass
    /// knows the swapped cells; each pass may create its own special.
    fn resolve_matches(
        &mut self,
        mut runs: Vec<Run>,
        mut swapped: Option<(Pos, Pos)>,
        turn: &mut Turn,
        tokens: &mut impl TokenSource,
    ) {
        while !runs.is_empty() {
            if turn.cascades >= MAX_CASCADES {
                warn!(
                    passes = turn.cascades,
                    "cascade did not settle; token source keeps refilling runs"
                );
                break;
            }
            turn.cascades += 1;
            turn.events.push(GameEvent::Match);
            let spawn = synthesize(&runs, swapped);
            let matched = matched_positions(&runs);
            debug!(
                pass = turn.cascades,
                runs = runs.len(),
                cells = matched.len(),
                spawn = ?spawn,
                "clearing matches"
            );
            self.clear_step(&matched, spawn, turn, tokens);
            runs = find_runs(&self.board);
            swapped = None;
        }
    }

    /// Reveal, remove, place the new special, score, collapse and refill.
    fn clear_step(
        &mut self,
        cells: &[Pos],
        spawn: Option<SpecialSpawn>,
        turn: &mut Turn,
        tokens: &mut impl TokenSource,
    ) {
        self.board.clear_transient();
        let doomed: Vec<Pos> = cells
            .iter()
            .copied()
            .filter(|p| spawn.is_none_or(|s| s.pos != *p))
            .collect();
        self.board.mark_pending(&doomed);
        turn.snap(Phase::Reveal, &self.board);

        self.board.remove(&doomed);
        if let Some(s) = spawn {
            self.board.set(s.pos, Some(s.cell()));
        }
        let points = cells.len() as u32 * POINTS_PER_CELL;
        self.score = self.score.saturating_add(points);
        turn.score_delta = turn.score_delta.saturating_add(points);
        turn.cells_cleared += cells.len();

        self.board.collapse();
        self.board.refill(tokens);
        debug_assert!(self.board.is_full());
        turn.snap(Phase::Settled, &self.board);
    }
}

/// Replace cells of existing runs in place until the board has none.
/// Returns the number of passes; no scoring, no gravity.
pub fn stabilize(board: &mut Board, tokens: &mut impl TokenSource) -> Result<u32, RepairExhausted> {
    stabilize_within(board, tokens, MAX_REPAIR_PASSES)
}

fn stabilize_within(
    board: &mut Board,
    tokens: &mut impl TokenSource,
    max_passes: u32,
) -> Result<u32, RepairExhausted> {
    let mut passes = 0;
    loop {
        let runs = find_runs(board);
        if runs.is_empty() {
            return Ok(passes);
        }
        if passes >= max_passes {
            return Err(RepairExhausted(passes));
        }
        for pos in matched_positions(&runs) {
            let candy = repair_candy(board, pos, tokens);
            board.set(pos, Some(Cell::plain(candy)));
        }
        passes += 1;
    }
}

fn repair_candy(board: &Board, pos: Pos, tokens: &mut impl TokenSource) -> Candy {
    for _ in 0..REPAIR_PICKS {
        let candy = tokens.next_candy();
        if !board.creates_match(pos, candy) {
            return candy;
        }
    }
    Candy::ALL
        .into_iter()
        .find(|&c| !board.creates_match(pos, c))
        .unwrap_or_else(|| tokens.next_candy())
}
