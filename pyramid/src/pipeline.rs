//! End-to-end pyramid build: discover, stage, reduce.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use crate::blank::{BlankSingleton, BlankTile};
use crate::config::PyramidConfig;
use crate::coord::MAX_LEVEL;
use crate::dispatcher::{Dispatcher, ProgressCallback};
use crate::error::{Error, Result};
use crate::grid::TileGrid;
use crate::materializer::stage_base_level;
use crate::raster::{ImaginariumRaster, RasterAdapter};
use crate::reducer::Reducer;
use crate::report::BuildReport;
use crate::store::{MaterializePolicy, TileStore};

pub struct PyramidBuilder {
    config: PyramidConfig,
    raster: Arc<dyn RasterAdapter>,
    policy: MaterializePolicy,
    progress: Option<ProgressCallback>,
}

impl PyramidBuilder {
    /// Validates `config` and sets up the default raster adapter.
    pub fn new(config: PyramidConfig) -> Result<Self> {
        config.validate()?;
        let raster = ImaginariumRaster::new(config.raster_threads)?;
        Ok(Self {
            config,
            raster: Arc::new(raster),
            policy: MaterializePolicy::default(),
            progress: None,
        })
    }

    pub fn with_raster(mut self, raster: Arc<dyn RasterAdapter>) -> Self {
        self.raster = raster;
        self
    }

    /// Strategies used to stage base tiles and blank links.
    pub fn with_policy(mut self, policy: MaterializePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_progress(mut self, progress: ProgressCallback) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn config(&self) -> &PyramidConfig {
        &self.config
    }

    /// Stages the base tiles found under `input` into `output` and reduces them
    /// down to the configured minimum level. Structural problems fail before any
    /// tile is written; per-tile problems end up in the returned report.
    pub fn build(&self, input: &Path, output: &Path) -> Result<BuildReport> {
        let start = Instant::now();
        let grid = TileGrid::scan(input, self.config.axis_order, &self.config.extension)?;
        let base_level = grid.base_level()?;
        self.check_levels(base_level)?;

        tracing::info!(
            "Building pyramid '{}' -> '{}': base level {base_level}, min level {}, {} workers",
            input.display(),
            output.display(),
            self.config.min_level,
            self.config.workers
        );

        let (store, blank, dispatcher) = self.prepare(output)?;

        let mut levels = Vec::with_capacity((base_level - self.config.min_level + 1) as usize);
        levels.push(stage_base_level(&grid, base_level, &store, &blank, &dispatcher));
        levels.extend(self.reducer(&store, &blank).build_levels(
            base_level,
            self.config.min_level,
            &dispatcher,
        ));

        let report = BuildReport {
            base_level,
            min_level: self.config.min_level,
            levels,
        };
        self.log_summary(&report, start);
        Ok(report)
    }

    /// Reduces a store whose base level is already in place, filling any level
    /// above `min_level` that is incomplete.
    pub fn reduce_existing(&self, output: &Path, base_level: u32) -> Result<BuildReport> {
        let start = Instant::now();
        self.check_levels(base_level)?;
        let base_dir = output.join(base_level.to_string());
        if !base_dir.is_dir() {
            return Err(Error::MissingBaseDir { path: base_dir });
        }
        let (store, blank, dispatcher) = self.prepare(output)?;

        let levels = self.reducer(&store, &blank).build_levels(
            base_level,
            self.config.min_level,
            &dispatcher,
        );

        let report = BuildReport {
            base_level,
            min_level: self.config.min_level,
            levels,
        };
        self.log_summary(&report, start);
        Ok(report)
    }

    fn check_levels(&self, base_level: u32) -> Result<()> {
        if base_level > MAX_LEVEL {
            return Err(Error::Config(format!(
                "base level {base_level} is above the deepest supported level {MAX_LEVEL}"
            )));
        }
        if self.config.min_level > base_level {
            return Err(Error::Config(format!(
                "min_level {} is above base level {base_level}",
                self.config.min_level
            )));
        }
        Ok(())
    }

    fn prepare(&self, output: &Path) -> Result<(TileStore, BlankTile, Dispatcher)> {
        let store =
            TileStore::new(output, &self.config.extension).with_policy(self.policy.clone());
        let blank = BlankSingleton::new().get_or_create(
            &store,
            self.raster.as_ref(),
            self.config.tile_size,
            self.config.tile_size,
        )?;

        let mut dispatcher = Dispatcher::new(self.config.workers)?;
        if let Some(progress) = &self.progress {
            dispatcher = dispatcher.with_progress(Arc::clone(progress));
        }
        Ok((store, blank, dispatcher))
    }

    fn reducer<'a>(&'a self, store: &'a TileStore, blank: &'a BlankTile) -> Reducer<'a> {
        Reducer::new(store, blank, self.raster.as_ref(), self.config.tile_size)
    }

    fn log_summary(&self, report: &BuildReport, start: Instant) {
        let failures = report.failure_count();
        if failures == 0 {
            tracing::info!(
                "Pyramid complete: levels {}..={} in {:.2?}",
                report.min_level,
                report.base_level,
                start.elapsed()
            );
        } else {
            tracing::warn!(
                "Pyramid finished with {failures} failed tiles in {:.2?}; re-run to retry them",
                start.elapsed()
            );
        }
    }
}

impl std::fmt::Debug for PyramidBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PyramidBuilder")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(tile_size: u32, min_level: u32) -> PyramidConfig {
        PyramidConfig {
            workers: 2,
            raster_threads: 1,
            tile_size,
            min_level,
            ..Default::default()
        }
    }

    #[test]
    fn invalid_config_is_rejected() {
        let err = PyramidBuilder::new(config(0, 0)).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn min_level_above_base_fails_before_writing() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        std::fs::create_dir(input.path().join("0")).unwrap();

        let builder = PyramidBuilder::new(config(4, 3)).unwrap();
        let err = builder.build(input.path(), output.path()).unwrap_err();

        assert!(matches!(err, Error::Config(_)));
        assert_eq!(std::fs::read_dir(output.path()).unwrap().count(), 0);
    }

    #[test]
    fn missing_input_is_structural() {
        let output = tempfile::tempdir().unwrap();
        let builder = PyramidBuilder::new(config(4, 0)).unwrap();
        let err = builder
            .build(&output.path().join("missing"), output.path())
            .unwrap_err();
        assert!(matches!(err, Error::MissingBaseDir { .. }));
    }

    #[test]
    fn copy_policy_stages_independent_files() {
        use crate::store::{MaterializeStrategy, TileIdentity};

        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        std::fs::create_dir(input.path().join("0")).unwrap();
        let source = input.path().join("0/0.png");
        let tile = imaginarium::Image::new_filled(
            imaginarium::ImageDesc::new(4, 4, imaginarium::ColorFormat::RGBA_U8),
            &[5, 5, 5, 255],
        )
        .unwrap();
        tile.save_file(&source).unwrap();

        let builder = PyramidBuilder::new(config(4, 0))
            .unwrap()
            .with_policy(MaterializePolicy::new(vec![MaterializeStrategy::Copy]));
        let report = builder.build(input.path(), output.path()).unwrap();

        assert_eq!(report.levels[0].linked_source, 1);
        let staged = output.path().join("0/0/0.png");
        assert_ne!(
            TileIdentity::of(&staged).unwrap(),
            TileIdentity::of(&source).unwrap()
        );
    }

    #[test]
    fn reduce_existing_fills_coarser_levels() {
        let output = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(output.path().join("1/0")).unwrap();
        let builder = PyramidBuilder::new(config(4, 0)).unwrap();

        let report = builder.reduce_existing(output.path(), 1).unwrap();

        assert_eq!(report.levels.len(), 1);
        assert_eq!(report.levels[0].blank, 1);
        assert!(output.path().join("0/0/0.png").exists());
    }

    #[test]
    fn reduce_existing_requires_base_level_dir() {
        let output = tempfile::tempdir().unwrap();
        let builder = PyramidBuilder::new(config(4, 0)).unwrap();

        let err = builder.reduce_existing(output.path(), 3).unwrap_err();

        assert!(matches!(err, Error::MissingBaseDir { ref path } if path.ends_with("3")));
        assert_eq!(std::fs::read_dir(output.path()).unwrap().count(), 0);
    }

    #[test]
    fn reduce_existing_rejects_unaddressable_levels() {
        let output = tempfile::tempdir().unwrap();
        let builder = PyramidBuilder::new(config(4, 32)).unwrap();

        let err = builder.reduce_existing(output.path(), 33).unwrap_err();

        assert!(matches!(err, Error::Config(_)));
    }
}
