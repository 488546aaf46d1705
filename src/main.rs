//! Shrinkem CLI - find oversized images and shrink them in place

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use console::style;
use dialoguer::{theme::ColorfulTheme, Confirm};
use tracing::warn;

use shrinkem::config::DEFAULT_EXTENSIONS;
use shrinkem::{ImageCrateCodec, Pipeline, SettingsFile, ShrinkConfig, ShrinkError};

/// Shrinkem - shrink oversized images in place
#[derive(Parser, Debug)]
#[command(
    name = "shrinkem",
    version,
    about = "Find images larger than a maximum size and shrink them in place",
    long_about = "Shrinkem walks a directory tree, finds images wider or taller than the given \
                  maximum, and resizes them in place to fit, keeping the aspect ratio and never \
                  upscaling. Originals can be kept next to the result as <file>.orig.",
    after_help = after_help()
)]
struct Cli {
    /// Root directory to search
    #[arg(value_name = "PATH", default_value = ".")]
    root: PathBuf,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Dry run (report only, do not shrink images)
    #[arg(short, long)]
    dry: bool,

    /// Keep original images (appends .orig)
    #[arg(short, long)]
    keep: bool,

    /// Max width in pixels
    #[arg(short, long, value_name = "PIXELS", value_parser = clap::value_parser!(u32).range(1..))]
    width: Option<u32>,

    /// Max height in pixels
    #[arg(short = 'H', long, value_name = "PIXELS", value_parser = clap::value_parser!(u32).range(1..))]
    height: Option<u32>,

    /// Max width and height in pixels
    #[arg(short, long, value_name = "PIXELS", value_parser = clap::value_parser!(u32).range(1..))]
    size: Option<u32>,

    /// Image extension to find (repeatable or comma-separated)
    #[arg(short, long, value_name = "EXT", value_delimiter = ',')]
    ext: Vec<String>,

    /// Continue without confirmation
    #[arg(short, long)]
    force: bool,

    /// Ignore paths containing this text (repeatable or comma-separated)
    #[arg(short, long, value_name = "TEXT", value_delimiter = ',')]
    ignore: Vec<String>,

    /// JPEG output quality (1-100) [default: 80]
    #[arg(short, long, value_name = "QUALITY", value_parser = clap::value_parser!(u8).range(1..=100))]
    quality: Option<u8>,

    /// Settings file (.toml or .yaml) with default options
    #[arg(short, long, value_name = "FILE", env = "SHRINKEM_CONFIG")]
    config: Option<PathBuf>,
}

fn after_help() -> String {
    format!("Default extensions:\n  {}", DEFAULT_EXTENSIONS.join(", "))
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    shrinkem::logging::init(cli.verbose);

    let config = match build_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}: {:#}", style("Error").red().bold(), e);
            return ExitCode::FAILURE;
        }
    };
    config.log_effective();

    let codec = ImageCrateCodec::new(config.quality());
    let pipeline = Pipeline::new(config, codec);

    match pipeline.run(confirm).await {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}: {}", style("Error").red().bold(), describe(&e));
            ExitCode::FAILURE
        }
    }
}

/// Text for an error that ended the run
fn describe(error: &ShrinkError) -> String {
    if error.is_fatal() {
        error.to_string()
    } else {
        format!("Run aborted: {}", error.user_message())
    }
}

/// Defaults, then the settings file, then command-line flags
fn build_config(cli: &Cli) -> anyhow::Result<ShrinkConfig> {
    let mut builder = ShrinkConfig::builder(&cli.root);

    if let Some(path) = &cli.config {
        let settings = SettingsFile::from_file(path)
            .with_context(|| format!("Failed to load settings from {}", path.display()))?;
        builder = settings.apply(builder);
    }

    if let Some(size) = cli.size {
        builder = builder.size(size);
    }
    if let Some(width) = cli.width {
        builder = builder.width(width);
    }
    if let Some(height) = cli.height {
        builder = builder.height(height);
    }
    if !cli.ext.is_empty() {
        builder = builder.extensions(&cli.ext);
    }
    if !cli.ignore.is_empty() {
        builder = builder.ignore(&cli.ignore);
    }
    if let Some(quality) = cli.quality {
        builder = builder.quality(quality);
    }
    if cli.keep {
        builder = builder.keep_originals(true);
    }

    let config = builder
        .force(cli.force)
        .verbose(cli.verbose)
        .dry_run(cli.dry)
        .build()?;
    Ok(config)
}

/// Ask before touching any file. No terminal counts as "no".
fn confirm(count: usize) -> bool {
    let prompt = format!(
        "Found {} image{}. Continue?",
        count,
        if count == 1 { "" } else { "s" }
    );

    match Confirm::with_theme(&ColorfulTheme::default())
        .with_prompt(prompt)
        .default(false)
        .interact_opt()
    {
        Ok(answer) => answer.unwrap_or(false),
        Err(e) => {
            warn!("Cannot ask for confirmation ({}); pass --force to continue without it", e);
            false
        }
    }
}
