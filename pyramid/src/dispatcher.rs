//! Level-at-a-time parallel execution of tile tasks.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use rayon::prelude::*;

use crate::coord::{level_dim, TileCoord};
use crate::error::Result;
use crate::report::{LevelReport, TileOutcome};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelProgress {
    pub level: u32,
    pub done: u64,
    pub total: u64,
}

pub type ProgressCallback = Arc<dyn Fn(LevelProgress) + Send + Sync>;

/// Owns the tile worker pool. [`Dispatcher::run_level`] returns only after every
/// task of the level has finished, which is the barrier between levels.
pub struct Dispatcher {
    pool: rayon::ThreadPool,
    progress: Option<ProgressCallback>,
}

impl Dispatcher {
    pub fn new(workers: usize) -> Result<Self> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("tile-worker-{i}"))
            .build()?;
        Ok(Self {
            pool,
            progress: None,
        })
    }

    pub fn with_progress(mut self, progress: ProgressCallback) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn workers(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Runs `task` once for every coordinate of `level`. Failed tasks are logged
    /// and collected; they never stop their siblings.
    pub fn run_level<F>(&self, level: u32, task: F) -> LevelReport
    where
        F: Fn(TileCoord) -> Result<TileOutcome> + Sync,
    {
        let dim = u64::from(level_dim(level));
        let total = dim * dim;
        let done = AtomicU64::new(0);
        let start = Instant::now();

        tracing::debug!("Level {level}: dispatching {total} tiles");

        let mut report = self.pool.install(|| {
            (0..total)
                .into_par_iter()
                .fold(
                    || LevelReport::new(level),
                    |mut report, index| {
                        let coord =
                            TileCoord::new(level, (index / dim) as u32, (index % dim) as u32);
                        let outcome = task(coord);
                        if let Err(err) = &outcome {
                            tracing::warn!("Tile {coord} failed: {err}");
                        }
                        report.record(coord, outcome);

                        let done = done.fetch_add(1, Ordering::Relaxed) + 1;
                        if let Some(progress) = &self.progress {
                            progress(LevelProgress { level, done, total });
                        }
                        report
                    },
                )
                .reduce(|| LevelReport::new(level), LevelReport::merge)
        });
        report.elapsed = start.elapsed();

        tracing::info!("{report}");
        report
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("workers", &self.workers())
            .field("progress", &self.progress.is_some())
            .finish()
    }
}
