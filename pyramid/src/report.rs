//! Per-level and per-run outcome accounting.

use std::fmt;
use std::time::Duration;

use crate::coord::TileCoord;
use crate::error::Error;

/// What a single tile task did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TileOutcome {
    /// Destination already existed.
    Skipped,
    /// Linked or copied from a base source tile.
    LinkedSource,
    /// Linked to the shared blank tile.
    LinkedBlank,
    /// Decoded, reduced and written.
    Rendered,
}

#[derive(Debug)]
pub struct TileFailure {
    pub coord: TileCoord,
    pub error: Error,
}

impl fmt::Display for TileFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.coord, self.error)
    }
}

#[derive(Debug, Default)]
pub struct LevelReport {
    pub level: u32,
    pub total: u64,
    pub skipped: u64,
    pub linked_source: u64,
    pub blank: u64,
    pub rendered: u64,
    pub failures: Vec<TileFailure>,
    pub elapsed: Duration,
}

impl LevelReport {
    pub fn new(level: u32) -> Self {
        Self {
            level,
            ..Default::default()
        }
    }

    pub fn record(&mut self, coord: TileCoord, outcome: Result<TileOutcome, Error>) {
        self.total += 1;
        match outcome {
            Ok(TileOutcome::Skipped) => self.skipped += 1,
            Ok(TileOutcome::LinkedSource) => self.linked_source += 1,
            Ok(TileOutcome::LinkedBlank) => self.blank += 1,
            Ok(TileOutcome::Rendered) => self.rendered += 1,
            Err(error) => self.failures.push(TileFailure { coord, error }),
        }
    }

    /// Folds a partial report of the same level into this one.
    pub fn merge(mut self, other: LevelReport) -> Self {
        self.total += other.total;
        self.skipped += other.skipped;
        self.linked_source += other.linked_source;
        self.blank += other.blank;
        self.rendered += other.rendered;
        self.failures.extend(other.failures);
        self.elapsed = self.elapsed.max(other.elapsed);
        self
    }

    pub fn succeeded(&self) -> u64 {
        self.total - self.failures.len() as u64
    }

    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

impl fmt::Display for LevelReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "level {}: {} tiles, {} rendered, {} linked, {} blank, {} skipped, {} failed in {:.2?}",
            self.level,
            self.total,
            self.rendered,
            self.linked_source,
            self.blank,
            self.skipped,
            self.failures.len(),
            self.elapsed
        )
    }
}

/// Result of a whole build. `levels` runs from the base level down.
#[derive(Debug, Default)]
pub struct BuildReport {
    pub base_level: u32,
    pub min_level: u32,
    pub levels: Vec<LevelReport>,
}

impl BuildReport {
    pub fn level(&self, level: u32) -> Option<&LevelReport> {
        self.levels.iter().find(|r| r.level == level)
    }

    pub fn failures(&self) -> impl Iterator<Item = &TileFailure> {
        self.levels.iter().flat_map(|r| r.failures.iter())
    }

    pub fn failure_count(&self) -> usize {
        self.levels.iter().map(|r| r.failures.len()).sum()
    }

    pub fn is_complete(&self) -> bool {
        self.levels.iter().all(LevelReport::is_complete)
    }

    /// True when no tile was written, i.e. the pyramid was already complete.
    pub fn is_noop(&self) -> bool {
        self.levels.iter().all(|r| r.skipped == r.total)
    }
}
