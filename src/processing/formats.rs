//! Extension matching, output format resolution and size formatting

use std::path::Path;
use image::ImageFormat;

use crate::error::{Result, ShrinkError};

/// Normalize one extension: trim, drop leading dots, lower-case.
pub fn normalize_extension(extension: &str) -> Option<String> {
    let ext = extension.trim().trim_start_matches('.').to_lowercase();
    if ext.is_empty() {
        None
    } else {
        Some(ext)
    }
}

/// Normalize a list of extensions, dropping empties and duplicates
pub fn normalize_extensions<I, S>(extensions: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut normalized: Vec<String> = Vec::new();
    for ext in extensions {
        if let Some(ext) = normalize_extension(ext.as_ref()) {
            if !normalized.contains(&ext) {
                normalized.push(ext);
            }
        }
    }
    normalized
}

/// Drop empty ignore patterns; an empty substring would match every path
pub fn normalize_ignore<I, S>(patterns: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut normalized: Vec<String> = Vec::new();
    for pattern in patterns {
        let pattern = pattern.as_ref();
        if !pattern.is_empty() && !normalized.iter().any(|p| p == pattern) {
            normalized.push(pattern.to_string());
        }
    }
    normalized
}

/// Case-insensitive `*.<ext>` match against the file name.
///
/// `extensions` must already be normalized. A bare `.png` (nothing before
/// the dot) does not match.
pub fn matches_extension(path: &Path, extensions: &[String]) -> bool {
    let Some(name) = path.file_name() else {
        return false;
    };
    let name = name.to_string_lossy().to_lowercase();

    extensions.iter().any(|ext| {
        name.len() > ext.len() + 1
            && name.ends_with(ext.as_str())
            && name.as_bytes()[name.len() - ext.len() - 1] == b'.'
    })
}

/// Pick the format to re-encode in: the sniffed content format, or the
/// extension when sniffing found nothing. Only formats we can write pass.
pub fn output_format(path: &Path, sniffed: Option<ImageFormat>) -> Result<ImageFormat> {
    let format = sniffed
        .or_else(|| ImageFormat::from_path(path).ok())
        .ok_or_else(|| ShrinkError::invalid_parameters("Unknown image format"))?;

    if is_supported_output_format(format) {
        Ok(format)
    } else {
        Err(ShrinkError::invalid_parameters(format!(
            "Cannot write {:?} images",
            format
        )))
    }
}

/// Formats this build can encode
pub fn is_supported_output_format(format: ImageFormat) -> bool {
    matches!(
        format,
        ImageFormat::Jpeg | ImageFormat::Png | ImageFormat::WebP
    )
}

/// Human-readable byte count in decimal units, one decimal place
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "kB", "MB", "GB"];

    if bytes == 0 {
        return "0.0 B".to_string();
    }

    let exponent = ((bytes as f64).log10() / 3.0).floor() as usize;
    let exponent = exponent.min(UNITS.len() - 1);
    let value = bytes as f64 / 1000f64.powi(exponent as i32);

    format!("{:.1} {}", value, UNITS[exponent])
}

/// Percentage change from `old` to `new`, e.g. `-42.5%`
pub fn format_size_delta(old: u64, new: u64) -> String {
    if old == 0 {
        return "n/a".to_string();
    }
    let delta = (new as f64 - old as f64) / old as f64 * 100.0;
    format!("{:.1}%", delta)
}
