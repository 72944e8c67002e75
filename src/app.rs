//! App: terminal init, frame pacing, and the terminal rendering sink.

use crate::input::{Action, key_to_action};
use crate::registry::BlockView;
use crate::sim::{FixedFrames, FrameScheduler, RenderSink, SimStats, Simulation};
use crate::theme::Theme;
use crate::ui::{BoardView, IntroFade};
use crate::{SimConfig, ViewConfig};
use anyhow::{Context, Result};
use crossterm::event::{self, Event};
use ratatui::DefaultTerminal;
use std::time::{Duration, Instant};

pub struct App {
    config: SimConfig,
    view: ViewConfig,
    theme: Theme,
    seed: u64,
    frame_interval: Duration,
}

impl App {
    /// `frame_interval` comes from [`ViewConfig::frame_interval`], checked before the terminal is touched.
    pub fn new(
        config: SimConfig,
        view: ViewConfig,
        theme: Theme,
        seed: u64,
        frame_interval: Duration,
    ) -> Self {
        Self {
            config,
            view,
            theme,
            seed,
            frame_interval,
        }
    }

    pub fn run(&mut self) -> Result<SimStats> {
        use crossterm::{
            execute,
            terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
        };

        enable_raw_mode().context("enabling raw mode")?;
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

    fn run_loop(&mut self, terminal: &mut DefaultTerminal) -> Result<SimStats> {
        let mut sim = Simulation::seeded(self.config.clone(), self.seed);
        let mut scheduler = TerminalScheduler::new(self.frame_interval);
        let mut sink = TerminalSink {
            terminal,
            config: &self.config,
            view: &self.view,
            theme: &self.theme,
            intro: IntroFade::new(!self.view.no_animation),
        };
        sim.run(&mut scheduler, &mut sink)
    }
}

/// Paces frames to the target rate and watches for quit keys between them.
pub struct TerminalScheduler {
    interval: Duration,
    deadline: Instant,
}

impl TerminalScheduler {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            deadline: Instant::now(),
        }
    }
}

impl FrameScheduler for TerminalScheduler {
    fn next_frame(&mut self) -> Result<bool> {
        loop {
            let now = Instant::now();
            if now >= self.deadline {
                // Don't try to catch up after a stall; just resume the cadence.
                self.deadline += self.interval;
                if self.deadline < now {
                    self.deadline = now + self.interval;
                }
                return Ok(true);
            }
            if event::poll(self.deadline - now)? {
                while event::poll(Duration::ZERO)? {
                    // Resize needs nothing: the next draw lays out against the new size.
                    if let Event::Key(key) = event::read()? {
                        if key_to_action(key) == Action::Quit {
                            log::info!("quit requested");
                            return Ok(false);
                        }
                    }
                }
            }
        }
    }
}

/// Draws each published snapshot to the terminal.
struct TerminalSink<'a> {
    terminal: &'a mut DefaultTerminal,
    config: &'a SimConfig,
    view: &'a ViewConfig,
    theme: &'a Theme,
    intro: IntroFade,
}

impl RenderSink for TerminalSink<'_> {
    fn publish(&mut self, blocks: &[BlockView], stats: &SimStats) -> Result<()> {
        let board = BoardView {
            blocks,
            stats,
            config: self.config,
            view: self.view,
            theme: self.theme,
        };
        let intro = &mut self.intro;
        let now = Instant::now();
        self.terminal
            .draw(|f| crate::ui::draw(f, &board, intro, now))
            .context("drawing frame")?;
        Ok(())
    }
}

/// Result of a run without a terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeadlessReport {
    pub stats: SimStats,
    pub live: usize,
    pub peak_live: usize,
}

/// Tracks the live-block peak instead of drawing.
#[derive(Debug, Default)]
struct CountingSink {
    peak_live: usize,
}

impl RenderSink for CountingSink {
    fn publish(&mut self, blocks: &[BlockView], _stats: &SimStats) -> Result<()> {
        self.peak_live = self.peak_live.max(blocks.len());
        Ok(())
    }
}

pub fn run_headless(config: SimConfig, seed: u64, frames: u64) -> Result<HeadlessReport> {
    let mut sim = Simulation::seeded(config, seed);
    let mut sink = CountingSink::default();
    sim.run(&mut FixedFrames::new(frames), &mut sink)?;
    Ok(HeadlessReport {
        stats: sim.stats(),
        live: sim.blocks().len(),
        peak_live: sink.peak_live,
    })
}
