//! App: terminal init, main loop, tick and key handling.

use crate::game::{GameState, TickOutcome};
use crate::input::{Action, key_to_action};
use crate::theme::Theme;
use crate::{Args, GameConfig};
use anyhow::Result;
use crossterm::event::{self, Event};
use ratatui::DefaultTerminal;
use std::time::{Duration, Instant};
use tachyonfx::Effect;

/// Whether the loop keeps going after handling an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Exit,
}

pub struct App {
    args: Args,
    theme: Theme,
    state: GameState,
    paused: bool,
    /// Rows from the last clear are flashing.
    line_clear_flash: bool,
    /// TachyonFX flash effect for cleared rows (created on first draw after a clear).
    line_clear_effect: Option<Effect>,
    /// Last time we processed the line-clear effect (for delta).
    line_clear_effect_process_time: Option<Instant>,
}

impl App {
    pub fn new(args: Args, config: GameConfig, theme: Theme) -> Self {
        let state = GameState::new(&config);
        Self {
            args,
            theme,
            state,
            paused: false,
            line_clear_flash: false,
            line_clear_effect: None,
            line_clear_effect_process_time: None,
        }
    }

    fn reset_game(&mut self) {
        self.state.reset();
        self.paused = false;
        self.stop_flash();
    }

    fn stop_flash(&mut self) {
        self.line_clear_flash = false;
        self.line_clear_effect = None;
        self.line_clear_effect_process_time = None;
    }

    fn apply_action(&mut self, action: Action) -> Flow {
        match action {
            Action::Quit => return Flow::Exit,
            Action::Restart => self.reset_game(),
            Action::None => {}
            _ if self.state.is_game_over() => {}
            Action::Pause => {
                self.paused = !self.paused;
                if !self.paused {
                    self.state.resume(Instant::now());
                }
                log::debug!("paused: {}", self.paused);
            }
            _ if self.paused => {}
            Action::MoveLeft => {
                self.state.move_left();
            }
            Action::MoveRight => {
                self.state.move_right();
            }
            Action::Rotate => {
                self.state.rotate();
            }
            Action::SoftDrop => {
                self.state.soft_drop();
            }
        }
        Flow::Continue
    }

    fn on_tick(&mut self, outcome: &TickOutcome) {
        if let TickOutcome::Locked { cleared } | TickOutcome::GameOver { cleared } = outcome {
            self.start_flash(cleared);
        }
    }

    fn start_flash(&mut self, cleared: &[i32]) {
        if cleared.is_empty() || self.args.no_animation {
            return;
        }
        self.line_clear_flash = true;
        self.line_clear_effect = None;
        self.line_clear_effect_process_time = None;
    }

    pub fn run(&mut self) -> Result<()> {
        use crossterm::{
            event::{KeyboardEnhancementFlags, PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags},
            execute,
            terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
        };

        enable_raw_mode()?;
        let mut stdout = std::io::stdout();
        execute!(stdout, EnterAlternateScreen)?;

        // Lets the terminal report OS key repeats; unsupported terminals just ignore it.
        let _ = execute!(
            stdout,
            PushKeyboardEnhancementFlags(KeyboardEnhancementFlags::REPORT_EVENT_TYPES)
        );

        let mut terminal =
            ratatui::DefaultTerminal::new(ratatui::backend::CrosstermBackend::new(stdout))?;

        let result = self.run_loop(&mut terminal);

        // Restore
        let _ = execute!(std::io::stdout(), PopKeyboardEnhancementFlags);
        execute!(std::io::stdout(), LeaveAlternateScreen)?;
        disable_raw_mode()?;

        result
    }

    fn run_loop(&mut self, terminal: &mut DefaultTerminal) -> Result<()> {
        // `--frame-rate` is validated as finite and positive by the CLI parser.
        let frame_duration = Duration::from_secs_f64(1.0 / self.args.frame_rate.clamp(1.0, 240.0));
        loop {
            let now = Instant::now();
            terminal.draw(|f| {
                crate::ui::draw(
                    f,
                    &self.state,
                    &self.theme,
                    self.paused,
                    !self.args.no_ghost,
                    self.line_clear_flash,
                    &mut self.line_clear_effect,
                    &mut self.line_clear_effect_process_time,
                    now,
                );
            })?;

            if self.line_clear_effect.as_ref().is_some_and(Effect::done) {
                self.stop_flash();
            }

            let timeout = frame_duration.saturating_sub(now.elapsed());
            if event::poll(timeout)? {
                while event::poll(Duration::ZERO)? {
                    if let Event::Key(key) = event::read()? {
                        if self.apply_action(key_to_action(key)) == Flow::Exit {
                            return Ok(());
                        }
                    }
                }
            }

            // `update` is a no-op once the game is over.
            if !self.paused {
                if let Some(outcome) = self.state.update(Instant::now()) {
                    self.on_tick(&outcome);
                }
            }
        }
    }
}
