//! Configuration management for Shrinkem

use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{Result, ShrinkError};
use crate::processing::formats::{normalize_extensions, normalize_ignore};

pub mod file;
pub use file::SettingsFile;

/// Extensions searched for when none are given
pub const DEFAULT_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp"];

/// JPEG quality used when none is given
pub const DEFAULT_QUALITY: u8 = 80;

/// Maximum dimensions an image may have before it gets shrunk.
///
/// At least one side is always set; an unset side is unconstrained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bounds {
    max_width: Option<u32>,
    max_height: Option<u32>,
}

impl Bounds {
    /// Create bounds, rejecting the case where neither side is set
    pub fn new(max_width: Option<u32>, max_height: Option<u32>) -> Result<Self> {
        if max_width.is_none() && max_height.is_none() {
            return Err(ShrinkError::MissingBounds);
        }
        if max_width == Some(0) || max_height == Some(0) {
            return Err(ShrinkError::invalid_parameters(
                "Maximum width and height must be greater than 0",
            ));
        }
        Ok(Self {
            max_width,
            max_height,
        })
    }

    /// Bound only the width
    pub fn width(max_width: u32) -> Result<Self> {
        Self::new(Some(max_width), None)
    }

    /// Bound only the height
    pub fn height(max_height: u32) -> Result<Self> {
        Self::new(None, Some(max_height))
    }

    /// Bound both sides
    pub fn both(max_width: u32, max_height: u32) -> Result<Self> {
        Self::new(Some(max_width), Some(max_height))
    }

    pub fn max_width(&self) -> Option<u32> {
        self.max_width
    }

    pub fn max_height(&self) -> Option<u32> {
        self.max_height
    }

    /// True when either side is larger than its bound
    pub fn is_exceeded_by(&self, width: u32, height: u32) -> bool {
        self.max_width.is_some_and(|max| width > max)
            || self.max_height.is_some_and(|max| height > max)
    }
}

/// Immutable run configuration, built once at startup
#[derive(Debug, Clone)]
pub struct ShrinkConfig {
    root: PathBuf,
    bounds: Bounds,
    extensions: Vec<String>,
    ignore: Vec<String>,
    quality: u8,
    force: bool,
    verbose: bool,
    dry_run: bool,
    keep_originals: bool,
}

impl ShrinkConfig {
    /// Start building a configuration for the given root directory
    pub fn builder<P: AsRef<Path>>(root: P) -> ShrinkConfigBuilder {
        ShrinkConfigBuilder::new(root)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn bounds(&self) -> &Bounds {
        &self.bounds
    }

    /// Lower-cased extensions without leading dots
    pub fn extensions(&self) -> &[String] {
        &self.extensions
    }

    /// Substrings that exclude a path when present anywhere in it
    pub fn ignore(&self) -> &[String] {
        &self.ignore
    }

    pub fn quality(&self) -> u8 {
        self.quality
    }

    pub fn force(&self) -> bool {
        self.force
    }

    pub fn verbose(&self) -> bool {
        self.verbose
    }

    pub fn dry_run(&self) -> bool {
        self.dry_run
    }

    pub fn keep_originals(&self) -> bool {
        self.keep_originals
    }

    /// Log the effective configuration at debug level
    pub fn log_effective(&self) {
        let auto = || "auto".to_string();
        debug!("[force] {}", self.force);
        debug!("[verbose] {}", self.verbose);
        debug!(
            "[max width] {}",
            self.bounds.max_width.map_or_else(auto, |w| w.to_string())
        );
        debug!(
            "[max height] {}",
            self.bounds.max_height.map_or_else(auto, |h| h.to_string())
        );
        debug!("[quality] {}", self.quality);
        debug!("[dry run] {}", self.dry_run);
        debug!("[keep originals] {}", self.keep_originals);
        debug!("[root] {}", self.root.display());
        debug!("[extensions] {}", join_or_none(&self.extensions));
        debug!("[ignore] {}", join_or_none(&self.ignore));
        debug!("--");
    }
}

fn join_or_none(values: &[String]) -> String {
    if values.is_empty() {
        "<none>".to_string()
    } else {
        values.join(", ")
    }
}

/// Builder for [`ShrinkConfig`]; later calls override earlier ones
#[derive(Debug, Clone)]
pub struct ShrinkConfigBuilder {
    root: PathBuf,
    max_width: Option<u32>,
    max_height: Option<u32>,
    extensions: Option<Vec<String>>,
    ignore: Vec<String>,
    quality: u8,
    force: bool,
    verbose: bool,
    dry_run: bool,
    keep_originals: bool,
}

impl ShrinkConfigBuilder {
    fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            max_width: None,
            max_height: None,
            extensions: None,
            ignore: Vec::new(),
            quality: DEFAULT_QUALITY,
            force: false,
            verbose: false,
            dry_run: false,
            keep_originals: false,
        }
    }

    pub fn width(mut self, max_width: u32) -> Self {
        self.max_width = Some(max_width);
        self
    }

    pub fn height(mut self, max_height: u32) -> Self {
        self.max_height = Some(max_height);
        self
    }

    /// Set both the maximum width and the maximum height
    pub fn size(self, max_size: u32) -> Self {
        self.width(max_size).height(max_size)
    }

    /// Replace the accepted extensions
    pub fn extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.extensions = Some(
            extensions
                .into_iter()
                .map(|e| e.as_ref().to_string())
                .collect(),
        );
        self
    }

    /// Replace the ignore substrings
    pub fn ignore<I, S>(mut self, ignore: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.ignore = ignore.into_iter().map(|s| s.as_ref().to_string()).collect();
        self
    }

    pub fn quality(mut self, quality: u8) -> Self {
        self.quality = quality;
        self
    }

    pub fn force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn keep_originals(mut self, keep_originals: bool) -> Self {
        self.keep_originals = keep_originals;
        self
    }

    /// Validate and freeze the configuration. Performs no I/O.
    pub fn build(self) -> Result<ShrinkConfig> {
        let bounds = Bounds::new(self.max_width, self.max_height)?;

        if self.quality == 0 || self.quality > 100 {
            return Err(ShrinkError::invalid_parameters(
                "Quality must be between 1 and 100",
            ));
        }

        let extensions = match self.extensions {
            Some(extensions) => normalize_extensions(extensions),
            None => normalize_extensions(DEFAULT_EXTENSIONS.iter().copied()),
        };
        if extensions.is_empty() {
            return Err(ShrinkError::config("At least one image extension is required"));
        }

        Ok(ShrinkConfig {
            root: self.root,
            bounds,
            extensions,
            ignore: normalize_ignore(self.ignore),
            quality: self.quality,
            force: self.force,
            verbose: self.verbose,
            dry_run: self.dry_run,
            keep_originals: self.keep_originals,
        })
    }
}
