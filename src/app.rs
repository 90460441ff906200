//! App: terminal init, main loop, swap gesture and turn playback.

use crate::GameConfig;
use crate::board::Pos;
use crate::game::{GameEvent, GameState, LevelStatus, Outcome, Phase, Snapshot, SwapError, TurnReport};
use crate::input::{self, Action, Selection, key_to_action};
use crate::theme::Theme;
use crate::ui;
use anyhow::Result;
use crossterm::event::{self, Event, KeyEventKind};
use rand::SeedableRng;
use rand::rngs::StdRng;
use ratatui::DefaultTerminal;
use std::collections::VecDeque;
use std::time::{Duration, Instant};
use tachyonfx::Effect;
use tracing::{debug, warn};

/// How long a notice stays in the board footer.
const NOTICE_MS: u64 = 1500;
/// ~60 FPS.
const FRAME_DURATION: Duration = Duration::from_millis(16);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Playing,
    /// Dialog after the last frame of a winning or losing turn.
    LevelOver(LevelStatus),
}

/// Snapshot on screen and when it went up.
#[derive(Debug)]
struct Showing {
    snapshot: Snapshot,
    since: Instant,
}

pub struct App {
    config: GameConfig,
    theme: Theme,
    rng: StdRng,
    state: GameState,
    screen: Screen,
    cursor: Pos,
    selection: Selection,
    /// Snapshots of the last turn still to play.
    queue: VecDeque<Snapshot>,
    showing: Option<Showing>,
    /// Level status of the last turn; the dialog opens once playback ends.
    pending_status: LevelStatus,
    /// TachyonFX fade for the reveal snapshot on screen.
    reveal_effect: Option<Effect>,
    /// Last time we processed the reveal effect (for delta).
    reveal_effect_process_time: Option<Instant>,
    notice: Option<(String, Instant)>,
    last_event: Option<GameEvent>,
    last_gain: Option<(u32, usize)>,
}

impl App {
    pub fn new(config: GameConfig, theme: Theme) -> Self {
        let mut rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        let state = match config.layout.clone() {
            Some(board) => GameState::with_board(config.initial_level, board, &mut rng),
            None => GameState::new(config.initial_level, &mut rng),
        };
        Self {
            config,
            theme,
            rng,
            state,
            screen: Screen::Playing,
            cursor: input::home(),
            selection: Selection::default(),
            queue: VecDeque::new(),
            showing: None,
            pending_status: LevelStatus::InProgress,
            reveal_effect: None,
            reveal_effect_process_time: None,
            notice: None,
            last_event: None,
            last_gain: None,
        }
    }

    /// Playback in progress; new swaps wait for it.
    fn busy(&self) -> bool {
        self.showing.is_some()
    }

    fn reset_turn_ui(&mut self) {
        self.screen = Screen::Playing;
        self.selection.clear();
        self.queue.clear();
        self.showing = None;
        self.pending_status = LevelStatus::InProgress;
        self.reveal_effect = None;
        self.reveal_effect_process_time = None;
        self.last_event = None;
        self.last_gain = None;
    }

    /// Start the current level over. A --layout board is reused on its own level.
    fn restart(&mut self) {
        let level = self.state.level;
        self.state = match &self.config.layout {
            Some(board) if level == self.config.initial_level => {
                GameState::with_board(level, board.clone(), &mut self.rng)
            }
            _ => GameState::new(level, &mut self.rng),
        };
        debug!(level, "level restarted");
        self.reset_turn_ui();
    }

    /// Leave the level dialog: next level after a win, same level after a loss.
    fn advance(&mut self) {
        self.state.advance(&mut self.rng);
        self.reset_turn_ui();
    }

    /// Returns true when the app should quit.
    fn apply_action(&mut self, action: Action, now: Instant) -> bool {
        match (self.screen, action) {
            (_, Action::Quit) => return true,
            (_, Action::Restart) => self.restart(),
            (Screen::LevelOver(_), Action::Select) => self.advance(),
            (Screen::LevelOver(_), _) => {}
            (Screen::Playing, Action::Select) => self.select(now),
            (Screen::Playing, Action::None) => {}
            (Screen::Playing, step) => self.cursor = input::step_cursor(self.cursor, step),
        }
        false
    }

    fn select(&mut self, now: Instant) {
        if self.busy() {
            return;
        }
        if let Some((a, b)) = self.selection.pick(self.cursor) {
            self.swap(a, b, now);
        }
    }

    fn swap(&mut self, a: Pos, b: Pos, now: Instant) {
        match self.state.attempt_swap(a, b, &mut self.rng) {
            Ok(report) => self.play(report, now),
            Err(SwapError::NoMovesRemaining) => {
                warn!(%a, %b, "swap rejected: no moves left");
                self.notice = Some(("No moves left!".to_string(), now));
            }
            Err(e) => {
                warn!("swap rejected: {e}");
                self.notice = Some((e.to_string(), now));
            }
        }
    }

    fn play(&mut self, report: TurnReport, now: Instant) {
        if report.outcome == Outcome::Handled {
            self.last_gain = Some((report.score_delta, report.cells_cleared));
            self.last_event = report
                .events
                .iter()
                .rev()
                .find(|e| !matches!(e, GameEvent::LevelWon | GameEvent::LevelLost))
                .copied();
        }
        self.pending_status = report.level_status;
        if self.config.animate {
            self.queue.extend(report.snapshots);
            self.next_snapshot(now);
        } else {
            self.finish_turn();
        }
    }

    fn delay(&self, phase: Phase) -> Duration {
        match phase {
            Phase::Swapped => self.config.swap_delay,
            Phase::Reveal => self.config.reveal_delay,
            Phase::Settled => self.config.settle_delay,
            Phase::Reverted => self.config.revert_delay,
        }
    }

    fn next_snapshot(&mut self, now: Instant) {
        self.reveal_effect = None;
        self.reveal_effect_process_time = None;
        match self.queue.pop_front() {
            Some(snapshot) => self.showing = Some(Showing { snapshot, since: now }),
            None => {
                self.showing = None;
                self.finish_turn();
            }
        }
    }

    fn finish_turn(&mut self) {
        if self.pending_status != LevelStatus::InProgress {
            self.screen = Screen::LevelOver(self.pending_status);
        }
        self.pending_status = LevelStatus::InProgress;
    }

    /// Advance playback and expire the notice.
    fn tick(&mut self, now: Instant) {
        if let Some(showing) = &self.showing {
            if now.saturating_duration_since(showing.since) >= self.delay(showing.snapshot.phase) {
                self.next_snapshot(now);
            }
        }
        if self
            .notice
            .as_ref()
            .is_some_and(|(_, at)| now.saturating_duration_since(*at) >= Duration::from_millis(NOTICE_MS))
        {
            self.notice = None;
        }
    }

    pub fn run(&mut self) -> Result<()> {
        use crossterm::{
            execute,
            terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
        };

        enable_raw_mode()?;
        let mut stdout = std::io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let mut terminal =
            ratatui::DefaultTerminal::new(ratatui::backend::CrosstermBackend::new(stdout))?;

        let result = self.run_loop(&mut terminal);

        // Restore
        execute!(std::io::stdout(), LeaveAlternateScreen)?;
        disable_raw_mode()?;

        result
    }

    fn run_loop(&mut self, terminal: &mut DefaultTerminal) -> Result<()> {
        let reveal_ms = self.config.reveal_delay.as_millis().min(u32::MAX as u128) as u32;
        loop {
            let now = Instant::now();
            self.tick(now);

            let view = ui::View {
                theme: &self.theme,
                state: &self.state,
                board: self
                    .showing
                    .as_ref()
                    .map_or(&self.state.board, |s| &s.snapshot.board),
                phase: self.showing.as_ref().map(|s| s.snapshot.phase),
                cursor: self.cursor,
                selected: self.selection.first(),
                screen: self.screen,
                notice: self.notice.as_ref().map(|(text, _)| text.as_str()),
                last_event: self.last_event,
                last_gain: self.last_gain,
                reveal_ms,
            };
            let effect = &mut self.reveal_effect;
            let effect_time = &mut self.reveal_effect_process_time;
            terminal.draw(|f| ui::draw(f, &view, effect, effect_time, now))?;

            let timeout = FRAME_DURATION.saturating_sub(now.elapsed());
            if event::poll(timeout)? {
                while event::poll(Duration::ZERO)? {
                    if let Event::Key(key) = event::read()? {
                        if key.kind != KeyEventKind::Press {
                            continue;
                        }
                        if self.apply_action(key_to_action(key), Instant::now()) {
                            return Ok(());
                        }
                    }
                }
            }
        }
    }
}
