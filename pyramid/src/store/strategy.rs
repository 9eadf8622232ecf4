//! Ordered materialization strategies.
//!
//! A destination is produced by the first strategy that succeeds. A strategy
//! that fails for any reason other than "destination already exists" is skipped
//! and the next one is tried. "Already exists" ends the attempt successfully:
//! another worker materialized the same tile first.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaterializeStrategy {
    /// Shares the source inode. Fails across filesystems.
    HardLink,
    /// Points at the absolute source path. Fails on platforms without symlinks
    /// or without the privilege to create them.
    SymLink,
    /// Byte copy through a temporary file.
    Copy,
}

/// How a destination came to exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Materialized {
    /// The destination was already there; nothing was written.
    Existing,
    /// Produced from a source by the given strategy.
    Linked(MaterializeStrategy),
    /// Encoded and written fresh.
    Written,
}

impl MaterializeStrategy {
    pub fn apply(self, source: &Path, dst: &Path) -> io::Result<()> {
        match self {
            MaterializeStrategy::HardLink => fs::hard_link(source, dst),
            MaterializeStrategy::SymLink => symlink(&std::path::absolute(source)?, dst),
            MaterializeStrategy::Copy => {
                let tmp = temp_path_for(dst);
                if let Err(e) = fs::copy(source, &tmp) {
                    let _ = fs::remove_file(&tmp);
                    return Err(e);
                }
                if publish(&tmp, dst)? {
                    Ok(())
                } else {
                    Err(io::Error::from(io::ErrorKind::AlreadyExists))
                }
            }
        }
    }
}

#[cfg(unix)]
fn symlink(target: &Path, link: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(target, link)
}

#[cfg(windows)]
fn symlink(target: &Path, link: &Path) -> io::Result<()> {
    std::os::windows::fs::symlink_file(target, link)
}

#[cfg(not(any(unix, windows)))]
fn symlink(_target: &Path, _link: &Path) -> io::Result<()> {
    Err(io::Error::from(io::ErrorKind::Unsupported))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaterializePolicy {
    strategies: Vec<MaterializeStrategy>,
}

impl Default for MaterializePolicy {
    fn default() -> Self {
        Self::new(vec![
            MaterializeStrategy::HardLink,
            MaterializeStrategy::SymLink,
            MaterializeStrategy::Copy,
        ])
    }
}

impl MaterializePolicy {
    pub fn new(strategies: Vec<MaterializeStrategy>) -> Self {
        Self { strategies }
    }

    pub fn strategies(&self) -> &[MaterializeStrategy] {
        &self.strategies
    }

    /// Makes `dst` hold the content of `source`.
    pub fn materialize(&self, source: &Path, dst: &Path) -> Result<Materialized> {
        if dst.exists() {
            return Ok(Materialized::Existing);
        }

        let mut last_error = None;
        for &strategy in &self.strategies {
            match strategy.apply(source, dst) {
                Ok(()) => return Ok(Materialized::Linked(strategy)),
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                    return Ok(Materialized::Existing);
                }
                Err(e) => {
                    tracing::debug!(
                        "{:?} of '{}' to '{}' failed: {}",
                        strategy,
                        source.display(),
                        dst.display(),
                        e
                    );
                    last_error = Some(e);
                }
            }
        }

        let source_err = last_error.unwrap_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidInput, "no materialize strategies")
        });
        Err(Error::io(dst, source_err))
    }
}

/// Unique hidden sibling of `dst` with the same extension, so encoders that
/// pick the format from the extension still work.
pub(crate) fn temp_path_for(dst: &Path) -> PathBuf {
    let stem = dst
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("tile");
    let name = match dst.extension().and_then(|s| s.to_str()) {
        Some(ext) => format!(".{stem}.{}.tmp.{ext}", uuid::Uuid::new_v4().simple()),
        None => format!(".{stem}.{}.tmp", uuid::Uuid::new_v4().simple()),
    };
    dst.with_file_name(name)
}

/// Moves a finished temporary file to `dst` without clobbering.
///
/// Returns `false` (and removes `tmp`) when `dst` already exists. Uses a hard
/// link for the no-clobber guarantee and falls back to rename where hard links
/// are unavailable.
pub(crate) fn publish(tmp: &Path, dst: &Path) -> io::Result<bool> {
    let published = match fs::hard_link(tmp, dst) {
        Ok(()) => true,
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => false,
        Err(_) if dst.exists() => false,
        Err(_) => {
            fs::rename(tmp, dst)?;
            return Ok(true);
        }
    };
    fs::remove_file(tmp)?;
    Ok(published)
}
