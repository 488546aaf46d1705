//! Shrinkem - shrink oversized images in place
//!
//! Walks a directory tree, finds raster images larger than a maximum width
//! and/or height, and resizes them in place to fit, optionally keeping the
//! originals as `<path>.orig`.
//!
//! The original file is only ever replaced by renaming a fully written
//! `<path>.tmp` over it. A leftover `.tmp` from an interrupted run makes
//! later runs skip that image instead of overwriting it.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use shrinkem::{ImageCrateCodec, Pipeline, ShrinkConfig};
//!
//! # async fn example() -> shrinkem::Result<()> {
//! let config = ShrinkConfig::builder("photos")
//!     .width(1920)
//!     .ignore(["node_modules"])
//!     .force(true)
//!     .build()?;
//!
//! let pipeline = Pipeline::new(config, ImageCrateCodec::new(80));
//! let summary = pipeline.run(|_| true).await?;
//! println!("{} images shrunk", summary.shrunk);
//! # Ok(())
//! # }
//! ```

#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod error;
pub mod logging;
pub mod processing;

// Re-export commonly used types
pub use config::{Bounds, SettingsFile, ShrinkConfig, ShrinkConfigBuilder};
pub use error::{Result, ShrinkError};
pub use processing::{
    Dimensions, ImageCodec, ImageCrateCodec, Pipeline, ReplacementOutcome, RunStatus, RunSummary,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
