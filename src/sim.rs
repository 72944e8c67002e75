//! Simulation driver: per-frame advance, cull, stochastic spawn and publish.

use crate::SimConfig;
use crate::registry::{BlockRegistry, BlockView};
use anyhow::Result;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

/// Receives the live blocks once per frame. Only ever sees a borrowed snapshot.
pub trait RenderSink {
    fn publish(&mut self, blocks: &[BlockView], stats: &SimStats) -> Result<()>;
}

/// Decides when the next step runs. `Ok(false)` means the host tore down.
pub trait FrameScheduler {
    fn next_frame(&mut self) -> Result<bool>;
}

/// Running counters, shown in the board title and by headless mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SimStats {
    pub frames: u64,
    pub groups_spawned: u64,
    /// Positive spawn decisions that hit a blocked column.
    pub spawns_dropped: u64,
    pub blocks_culled: u64,
}

/// What happened to the spawn roll in one step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpawnOutcome {
    NoAttempt,
    Spawned { column: u16, color: u8 },
    Dropped { column: u16 },
}

#[derive(Debug, Clone)]
pub struct Simulation<R = Pcg32> {
    config: SimConfig,
    registry: BlockRegistry,
    rng: R,
    stats: SimStats,
}

impl Simulation<Pcg32> {
    pub fn seeded(config: SimConfig, seed: u64) -> Self {
        Self::with_rng(config, Pcg32::seed_from_u64(seed))
    }
}

impl<R: Rng> Simulation<R> {
    pub fn with_rng(config: SimConfig, rng: R) -> Self {
        let registry = BlockRegistry::new(&config);
        Self {
            config,
            registry,
            rng,
            stats: SimStats::default(),
        }
    }

    #[inline]
    pub fn blocks(&self) -> &[BlockView] {
        self.registry.blocks()
    }

    #[inline]
    pub fn stats(&self) -> SimStats {
        self.stats
    }

    #[cfg(test)]
    pub fn registry_mut(&mut self) -> &mut BlockRegistry {
        &mut self.registry
    }

    /// One frame: advance, cull, then maybe spawn a group.
    pub fn step(&mut self) -> SpawnOutcome {
        self.stats.frames += 1;
        self.registry.advance(self.config.fall_speed);
        let culled = self.registry.cull();
        if culled > 0 {
            self.stats.blocks_culled += culled as u64;
            log::trace!("frame {}: culled {} blocks", self.stats.frames, culled);
        }

        let sample: f64 = self.rng.random();
        if sample <= self.config.spawn_threshold {
            return SpawnOutcome::NoAttempt;
        }

        let column = self.rng.random_range(0..self.config.cols);
        let color = self.rng.random_range(0..self.config.colors);
        if !self.registry.try_spawn(column, color) {
            self.stats.spawns_dropped += 1;
            log::trace!("frame {}: column {} blocked, spawn dropped", self.stats.frames, column);
            return SpawnOutcome::Dropped { column };
        }
        self.stats.groups_spawned += 1;
        log::debug!(
            "frame {}: spawned group in column {} (colour {}), {} live blocks",
            self.stats.frames,
            column,
            color,
            self.registry.len()
        );
        SpawnOutcome::Spawned { column, color }
    }

    /// Step and publish until the scheduler reports teardown. Returns the final counters.
    pub fn run<S, K>(&mut self, scheduler: &mut S, sink: &mut K) -> Result<SimStats>
    where
        S: FrameScheduler + ?Sized,
        K: RenderSink + ?Sized,
    {
        log::info!(
            "simulation running: {}x{} grid, group size {}, fall speed {}",
            self.config.cols,
            self.config.rows,
            self.config.group_size,
            self.config.fall_speed
        );
        while scheduler.next_frame()? {
            self.step();
            sink.publish(self.registry.blocks(), &self.stats)?;
        }
        log::info!(
            "simulation stopped after {} frames ({} groups spawned, {} dropped)",
            self.stats.frames,
            self.stats.groups_spawned,
            self.stats.spawns_dropped
        );
        Ok(self.stats)
    }
}

/// Runs a fixed number of frames, then reports teardown.
#[derive(Debug, Clone, Copy)]
pub struct FixedFrames {
    remaining: u64,
}

impl FixedFrames {
    pub fn new(frames: u64) -> Self {
        Self { remaining: frames }
    }
}

impl FrameScheduler for FixedFrames {
    fn next_frame(&mut self) -> Result<bool> {
        if self.remaining == 0 {
            return Ok(false);
        }
        self.remaining -= 1;
        Ok(true)
    }
}
