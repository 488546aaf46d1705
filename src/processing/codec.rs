//! Image codec boundary: dimension probing and decode/resize/encode

use std::io::Cursor;
use std::path::Path;

use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageFormat, ImageReader};
use tracing::debug;

use crate::config::{Bounds, DEFAULT_QUALITY};
use crate::error::Result;
use crate::processing::formats::output_format;
use crate::processing::resize::{apply_orientation, read_orientation, resize_to_bounds, Dimensions};

/// What the pipeline needs from an image library.
///
/// Implementations must not touch the filesystem beyond reading `path`;
/// writing the result is the pipeline's job.
pub trait ImageCodec: Send + Sync {
    /// Read stored dimensions without decoding pixel data
    fn read_dimensions(&self, path: &Path) -> Result<Dimensions>;

    /// Decode `path`, auto-rotate, fit inside `bounds` without upscaling,
    /// and encode in the source format
    fn resize(&self, path: &Path, bounds: &Bounds) -> Result<Vec<u8>>;
}

/// [`ImageCodec`] backed by the `image` crate
#[derive(Debug, Clone)]
pub struct ImageCrateCodec {
    quality: u8,
}

impl ImageCrateCodec {
    /// Create a codec writing JPEGs at `quality` (1-100)
    pub fn new(quality: u8) -> Self {
        Self {
            quality: quality.clamp(1, 100),
        }
    }

    fn encode(&self, image: &DynamicImage, format: ImageFormat) -> Result<Vec<u8>> {
        let mut buffer = Cursor::new(Vec::new());

        match format {
            ImageFormat::Jpeg => {
                let encoder = JpegEncoder::new_with_quality(&mut buffer, self.quality);
                // JPEG has no alpha channel and no 16-bit mode
                match image {
                    DynamicImage::ImageLuma8(_) | DynamicImage::ImageRgb8(_) => {
                        image.write_with_encoder(encoder)?;
                    }
                    other => {
                        DynamicImage::ImageRgb8(other.to_rgb8()).write_with_encoder(encoder)?;
                    }
                }
            }
            _ => image.write_to(&mut buffer, format)?,
        }

        Ok(buffer.into_inner())
    }
}

impl Default for ImageCrateCodec {
    fn default() -> Self {
        Self::new(DEFAULT_QUALITY)
    }
}

impl ImageCodec for ImageCrateCodec {
    fn read_dimensions(&self, path: &Path) -> Result<Dimensions> {
        let (width, height) = ImageReader::open(path)?
            .with_guessed_format()?
            .into_dimensions()?;
        Ok(Dimensions::new(width, height))
    }

    fn resize(&self, path: &Path, bounds: &Bounds) -> Result<Vec<u8>> {
        let reader = ImageReader::open(path)?.with_guessed_format()?;
        let format = output_format(path, reader.format())?;
        let image = reader.decode()?;

        let orientation = read_orientation(path);
        let stored = Dimensions::of(&image);
        if orientation.swaps_dimensions() {
            debug!(
                "Decoded {:?} {} ({:?}, upright {}x{})",
                format, stored, orientation, stored.height, stored.width
            );
        } else {
            debug!("Decoded {:?} {} ({:?})", format, stored, orientation);
        }

        let image = apply_orientation(image, orientation);
        let image = resize_to_bounds(image, bounds);

        self.encode(&image, format)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processing::resize::Orientation;
    use image::{ImageBuffer, Rgb, Rgba};
    use tempfile::TempDir;

    /// APP1 segment holding a big-endian TIFF with a single Orientation entry
    fn exif_orientation_segment(value: u8) -> Vec<u8> {
        let mut tiff = vec![b'M', b'M', 0x00, 0x2A, 0x00, 0x00, 0x00, 0x08];
        tiff.extend_from_slice(&[0x00, 0x01]); // one entry
        tiff.extend_from_slice(&[0x01, 0x12, 0x00, 0x03]); // Orientation, SHORT
        tiff.extend_from_slice(&[0x00, 0x00, 0x00, 0x01]); // count
        tiff.extend_from_slice(&[0x00, value, 0x00, 0x00]);
        tiff.extend_from_slice(&[0x00, 0x00, 0x00, 0x00]); // no next IFD

        let mut payload = b"Exif\0\0".to_vec();
        payload.extend_from_slice(&tiff);

        let length = u16::try_from(payload.len() + 2).unwrap();
        let mut segment = vec![0xFF, 0xE1];
        segment.extend_from_slice(&length.to_be_bytes());
        segment.extend_from_slice(&payload);
        segment
    }

    /// Stored `width`x`height` JPEG tagged with EXIF `orientation`
    fn write_oriented_jpeg(dir: &TempDir, width: u32, height: u32, orientation: u8) -> std::path::PathBuf {
        let img = DynamicImage::ImageRgb8(ImageBuffer::from_pixel(width, height, Rgb([90, 120, 150])));
        let mut encoded = Cursor::new(Vec::new());
        img.write_to(&mut encoded, ImageFormat::Jpeg).unwrap();
        let encoded = encoded.into_inner();
        assert_eq!(&encoded[..2], &[0xFF, 0xD8]);

        let mut bytes = encoded[..2].to_vec();
        bytes.extend_from_slice(&exif_orientation_segment(orientation));
        bytes.extend_from_slice(&encoded[2..]);

        let path = dir.path().join("portrait.jpg");
        std::fs::write(&path, bytes).unwrap();
        path
    }

    fn write_rgb(dir: &TempDir, name: &str, width: u32, height: u32) -> std::path::PathBuf {
        let path = dir.path().join(name);
        let img = ImageBuffer::from_fn(width, height, |x, y| Rgb([(x % 256) as u8, (y % 256) as u8, 128]));
        img.save(&path).unwrap();
        path
    }

    #[test]
    fn test_read_dimensions() {
        let dir = TempDir::new().unwrap();
        let path = write_rgb(&dir, "a.png", 64, 48);
        let codec = ImageCrateCodec::default();
        assert_eq!(codec.read_dimensions(&path).unwrap(), Dimensions::new(64, 48));
    }

    #[test]
    fn test_read_dimensions_corrupt() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.jpg");
        std::fs::write(&path, b"definitely not a jpeg").unwrap();
        assert!(ImageCrateCodec::default().read_dimensions(&path).is_err());
    }

    #[test]
    fn test_resize_png_keeps_format() {
        let dir = TempDir::new().unwrap();
        let path = write_rgb(&dir, "wide.png", 400, 300);

        let bytes = ImageCrateCodec::default()
            .resize(&path, &Bounds::width(100).unwrap())
            .unwrap();

        assert_eq!(image::guess_format(&bytes).unwrap(), ImageFormat::Png);
        let out = image::load_from_memory(&bytes).unwrap();
        assert_eq!(Dimensions::of(&out), Dimensions::new(100, 75));
    }

    #[test]
    fn test_resize_jpeg() {
        let dir = TempDir::new().unwrap();
        let path = write_rgb(&dir, "tall.jpg", 300, 600);

        let bytes = ImageCrateCodec::new(70)
            .resize(&path, &Bounds::both(200, 200).unwrap())
            .unwrap();

        assert_eq!(image::guess_format(&bytes).unwrap(), ImageFormat::Jpeg);
        let out = image::load_from_memory(&bytes).unwrap();
        assert_eq!(Dimensions::of(&out), Dimensions::new(100, 200));
    }

    #[test]
    fn test_jpeg_encode_drops_alpha() {
        let img = DynamicImage::ImageRgba8(ImageBuffer::from_pixel(8, 8, Rgba([10, 20, 30, 128])));
        let bytes = ImageCrateCodec::default().encode(&img, ImageFormat::Jpeg).unwrap();
        assert_eq!(image::guess_format(&bytes).unwrap(), ImageFormat::Jpeg);
    }

    #[test]
    fn test_resize_webp() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("pic.webp");
        let img = DynamicImage::ImageRgb8(ImageBuffer::from_pixel(120, 60, Rgb([200, 10, 10])));
        img.save(&path).unwrap();

        let bytes = ImageCrateCodec::default()
            .resize(&path, &Bounds::height(30).unwrap())
            .unwrap();
        let out = image::load_from_memory(&bytes).unwrap();
        assert_eq!(Dimensions::of(&out), Dimensions::new(60, 30));
    }

    #[test]
    fn test_exif_orientation_applied_before_fit() {
        let dir = TempDir::new().unwrap();
        let path = write_oriented_jpeg(&dir, 400, 200, 6);
        let codec = ImageCrateCodec::default();

        assert_eq!(read_orientation(&path), Orientation::Rotate90);
        assert_eq!(codec.read_dimensions(&path).unwrap(), Dimensions::new(400, 200));

        let bytes = codec.resize(&path, &Bounds::width(150).unwrap()).unwrap();
        let out = image::load_from_memory(&bytes).unwrap();
        assert_eq!(Dimensions::of(&out), Dimensions::new(150, 300));
    }

    #[test]
    fn test_exif_normal_orientation_keeps_layout() {
        let dir = TempDir::new().unwrap();
        let path = write_oriented_jpeg(&dir, 400, 200, 1);

        assert_eq!(read_orientation(&path), Orientation::Normal);
        let bytes = ImageCrateCodec::default()
            .resize(&path, &Bounds::width(150).unwrap())
            .unwrap();
        let out = image::load_from_memory(&bytes).unwrap();
        assert_eq!(Dimensions::of(&out), Dimensions::new(150, 75));
    }
}
