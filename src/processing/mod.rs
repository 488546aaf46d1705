//! Discovery, oversize probe, confirmation gate and safe in-place replace

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, error, info, warn};

use crate::config::ShrinkConfig;
use crate::error::{ErrorContext, Result, ShrinkError};

pub mod codec;
pub mod discovery;
pub mod formats;
pub mod resize;

pub use codec::{ImageCodec, ImageCrateCodec};
pub use discovery::{Candidate, Discovery};
pub use formats::{format_bytes, format_size_delta};
pub use resize::{fit_inside, Dimensions, Orientation};

/// Suffix of the in-progress output written next to each image
pub const TEMP_SUFFIX: &str = ".tmp";

/// Suffix of the backup written with `keep_originals`
pub const BACKUP_SUFFIX: &str = ".orig";

/// `<path>.tmp`
pub fn temp_path(path: &Path) -> PathBuf {
    with_suffix(path, TEMP_SUFFIX)
}

/// `<path>.orig`
pub fn backup_path(path: &Path) -> PathBuf {
    with_suffix(path, BACKUP_SUFFIX)
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}

/// An image found to exceed the configured bounds
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResizeTarget {
    pub candidate: Candidate,
    /// Stored dimensions before any orientation correction
    pub dimensions: Dimensions,
}

/// Decision for one candidate
#[derive(Debug)]
pub enum ProbeOutcome {
    Oversized(ResizeTarget),
    WithinBounds,
    /// `<path>.tmp` is left over from an earlier run
    TempCollision,
    Unreadable(ShrinkError),
}

/// What happened to one target
#[derive(Debug)]
pub enum ReplacementOutcome {
    Shrunk { old_size: u64, new_size: u64 },
    DryRun { old_size: u64 },
    Skipped { reason: String },
    Failed(ShrinkError),
}

/// How a run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunStatus {
    #[default]
    NothingFound,
    NothingToShrink,
    Declined,
    Completed,
}

/// Counts reported at the end of a run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub status: RunStatus,
    pub included: usize,
    pub excluded: usize,
    /// Directory entries the walk could not read (permissions, symlink loops)
    pub walk_errors: usize,
    pub within_bounds: usize,
    pub unreadable: usize,
    pub collisions: usize,
    pub oversized: usize,
    pub shrunk: usize,
    pub dry_run: usize,
    pub skipped: usize,
    pub failed: usize,
    pub bytes_before: u64,
    pub bytes_after: u64,
}

impl RunSummary {
    fn record_probe(&mut self, outcome: &ProbeOutcome) {
        match outcome {
            ProbeOutcome::Oversized(_) => self.oversized += 1,
            ProbeOutcome::WithinBounds => self.within_bounds += 1,
            ProbeOutcome::TempCollision => self.collisions += 1,
            ProbeOutcome::Unreadable(_) => self.unreadable += 1,
        }
    }

    fn record_replacement(&mut self, outcome: &ReplacementOutcome) {
        match outcome {
            ReplacementOutcome::Shrunk { old_size, new_size } => {
                self.shrunk += 1;
                self.bytes_before += old_size;
                self.bytes_after += new_size;
            }
            ReplacementOutcome::DryRun { old_size } => {
                self.dry_run += 1;
                self.bytes_before += old_size;
            }
            ReplacementOutcome::Skipped { .. } => self.skipped += 1,
            ReplacementOutcome::Failed(_) => self.failed += 1,
        }
    }
}

/// The shrink pipeline over one configuration and one codec
pub struct Pipeline<C> {
    config: Arc<ShrinkConfig>,
    codec: Arc<C>,
}

impl<C: ImageCodec + 'static> Pipeline<C> {
    pub fn new(config: ShrinkConfig, codec: C) -> Self {
        Self {
            config: Arc::new(config),
            codec: Arc::new(codec),
        }
    }

    pub fn config(&self) -> &ShrinkConfig {
        &self.config
    }

    /// Resolve the root and walk it. Fails only if the root is unusable.
    pub async fn discover(&self) -> Result<(PathBuf, Discovery)> {
        let config = Arc::clone(&self.config);
        tokio::task::spawn_blocking(move || -> Result<(PathBuf, Discovery)> {
            let root = discovery::resolve_root(config.root())?;
            let found = discovery::discover(&root, config.extensions(), config.ignore());
            Ok((root, found))
        })
        .await?
    }

    /// Decide whether one candidate needs shrinking
    pub async fn probe(&self, candidate: &Candidate) -> ProbeOutcome {
        let codec = Arc::clone(&self.codec);
        let path = candidate.path.clone();
        let probed = tokio::task::spawn_blocking(move || codec.read_dimensions(&path)).await;
        let dimensions = match probed {
            Ok(Ok(dimensions)) => dimensions,
            Ok(Err(e)) => return self.unreadable(candidate, e),
            Err(e) => return self.unreadable(candidate, e.into()),
        };

        if !self
            .config
            .bounds()
            .is_exceeded_by(dimensions.width, dimensions.height)
        {
            debug!("[skip] {} (ok)", candidate.display());
            return ProbeOutcome::WithinBounds;
        }

        let tmp = temp_path(&candidate.path);
        match fs::try_exists(&tmp).await {
            Ok(true) => {
                warn!("[skip] {} (tmp file already exists)", candidate.display());
                return ProbeOutcome::TempCollision;
            }
            Ok(false) => {}
            // The create_new at write time still guards the file
            Err(e) => warn!("Could not check {} ({})", tmp.display(), e),
        }

        info!("[found] {} | {}", candidate.display(), dimensions);
        ProbeOutcome::Oversized(ResizeTarget {
            candidate: candidate.clone(),
            dimensions,
        })
    }

    fn unreadable(&self, candidate: &Candidate, e: ShrinkError) -> ProbeOutcome {
        error!("[error] {} ({})", candidate.display(), e.user_message());
        ProbeOutcome::Unreadable(e)
    }

    /// Shrink one target in place and log the outcome
    pub async fn shrink(&self, target: &ResizeTarget) -> ReplacementOutcome {
        let rel = target.candidate.display();
        let outcome = self
            .replace(&target.candidate.path)
            .await
            .unwrap_or_else(ReplacementOutcome::Failed);

        match &outcome {
            ReplacementOutcome::Shrunk { old_size, new_size } => info!(
                "[shrink] {} | {} -> {} | {}",
                rel,
                format_bytes(*old_size),
                format_bytes(*new_size),
                format_size_delta(*old_size, *new_size)
            ),
            ReplacementOutcome::DryRun { old_size } => {
                info!("[dry] {} | {} -> ?", rel, format_bytes(*old_size))
            }
            ReplacementOutcome::Skipped { reason } => warn!("[skip] {} ({})", rel, reason),
            ReplacementOutcome::Failed(e) => error!("[error] {} ({})", rel, e.user_message()),
        }

        outcome
    }

    /// Stat, back up, resize into `<path>.tmp`, rename over `path`, re-stat
    async fn replace(&self, path: &Path) -> Result<ReplacementOutcome> {
        let old_size = fs::metadata(path).await?.len();

        if self.config.dry_run() {
            return Ok(ReplacementOutcome::DryRun { old_size });
        }

        if self.config.keep_originals() {
            let backup = backup_path(path);
            fs::copy(path, &backup).await.with_file_context(&backup)?;
        }

        let codec = Arc::clone(&self.codec);
        let source = path.to_path_buf();
        let bounds = *self.config.bounds();
        let bytes = tokio::task::spawn_blocking(move || codec.resize(&source, &bounds)).await??;

        let tmp = temp_path(path);
        let file = match fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&tmp)
            .await
        {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                let collision = ShrinkError::TempFileExists { path: tmp };
                return Ok(ReplacementOutcome::Skipped {
                    reason: collision.user_message(),
                });
            }
            Err(e) => return Err(e).with_file_context(&tmp),
        };

        if let Err(e) = write_and_sync(file, &bytes).await {
            discard(&tmp).await;
            return Err(e).with_file_context(&tmp);
        }

        // The only point where the original changes
        if let Err(e) = fs::rename(&tmp, path).await {
            discard(&tmp).await;
            return Err(e.into());
        }

        let new_size = fs::metadata(path).await?.len();
        Ok(ReplacementOutcome::Shrunk { old_size, new_size })
    }

    /// Full run: discover, probe, confirm, shrink.
    ///
    /// `confirm` receives the number of targets and is only called when
    /// `force` is off. It runs on the blocking pool.
    pub async fn run<F>(&self, confirm: F) -> Result<RunSummary>
    where
        F: FnOnce(usize) -> bool + Send + 'static,
    {
        let mut summary = RunSummary::default();

        let (root, found) = self.discover().await?;
        debug!(
            "Searched {} ({} matching files)",
            root.display(),
            found.included.len() + found.excluded.len()
        );
        summary.included = found.included.len();
        summary.excluded = found.excluded.len();
        summary.walk_errors = found.walk_errors;

        if found.included.is_empty() {
            info!("No images found");
            summary.status = RunStatus::NothingFound;
            return Ok(summary);
        }

        let mut targets = Vec::new();
        for candidate in &found.included {
            let outcome = self.probe(candidate).await;
            summary.record_probe(&outcome);
            if let ProbeOutcome::Oversized(target) = outcome {
                targets.push(target);
            }
        }

        if targets.is_empty() {
            info!("No images to shrink");
            summary.status = RunStatus::NothingToShrink;
            return Ok(summary);
        }

        if !self.config.force() {
            let count = targets.len();
            let accepted = tokio::task::spawn_blocking(move || confirm(count)).await?;
            if !accepted {
                summary.status = RunStatus::Declined;
                return Ok(summary);
            }
        }

        for target in &targets {
            let outcome = self.shrink(target).await;
            summary.record_replacement(&outcome);
        }

        summary.status = RunStatus::Completed;
        log_summary(&summary);
        Ok(summary)
    }
}

async fn write_and_sync(mut file: fs::File, bytes: &[u8]) -> std::io::Result<()> {
    file.write_all(bytes).await?;
    file.flush().await?;
    file.sync_all().await
}

async fn discard(tmp: &Path) {
    if let Err(e) = fs::remove_file(tmp).await {
        warn!("Could not remove {} ({})", tmp.display(), e);
    }
}

fn log_summary(summary: &RunSummary) {
    if summary.dry_run > 0 {
        info!(
            "[done] {} would be shrunk | {} total",
            summary.dry_run,
            format_bytes(summary.bytes_before)
        );
        return;
    }

    info!(
        "[done] {} shrunk, {} skipped, {} failed | {} -> {}",
        summary.shrunk,
        summary.skipped,
        summary.failed,
        format_bytes(summary.bytes_before),
        format_bytes(summary.bytes_after)
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sibling_paths() {
        let path = Path::new("/photos/a.png");
        assert_eq!(temp_path(path), PathBuf::from("/photos/a.png.tmp"));
        assert_eq!(backup_path(path), PathBuf::from("/photos/a.png.orig"));
    }

    #[test]
    fn test_summary_records() {
        let mut summary = RunSummary::default();
        summary.record_probe(&ProbeOutcome::WithinBounds);
        summary.record_probe(&ProbeOutcome::TempCollision);
        summary.record_replacement(&ReplacementOutcome::Shrunk {
            old_size: 1000,
            new_size: 400,
        });
        summary.record_replacement(&ReplacementOutcome::Failed(ShrinkError::system("boom")));

        assert_eq!(summary.within_bounds, 1);
        assert_eq!(summary.collisions, 1);
        assert_eq!(summary.shrunk, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.bytes_before, 1000);
        assert_eq!(summary.bytes_after, 400);
    }
}
