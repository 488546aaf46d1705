//! Fit-inside resizing and EXIF orientation correction

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use exif::{In, Reader, Tag};
use image::imageops::FilterType;
use image::DynamicImage;
use tracing::debug;

use crate::config::Bounds;

/// Resampling filter for all downscaling
const RESIZE_FILTER: FilterType = FilterType::Lanczos3;

/// Pixel dimensions of an image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn of(image: &DynamicImage) -> Self {
        Self::new(image.width(), image.height())
    }
}

impl std::fmt::Display for Dimensions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Largest size that fits inside `bounds` with the original aspect ratio.
///
/// Never upscales: an image already inside the bounds keeps its size.
pub fn fit_inside(original: Dimensions, bounds: &Bounds) -> Dimensions {
    let Dimensions { width, height } = original;
    if width == 0 || height == 0 {
        return original;
    }

    let width_scale = bounds
        .max_width()
        .map_or(1.0, |max| f64::from(max) / f64::from(width));
    let height_scale = bounds
        .max_height()
        .map_or(1.0, |max| f64::from(max) / f64::from(height));
    let scale = width_scale.min(height_scale);

    if scale >= 1.0 {
        return original;
    }

    // The limiting side lands exactly on its bound
    if width_scale <= height_scale {
        let new_width = bounds.max_width().unwrap_or(width);
        let new_height = (f64::from(height) * scale).round() as u32;
        Dimensions::new(new_width, new_height.max(1))
    } else {
        let new_height = bounds.max_height().unwrap_or(height);
        let new_width = (f64::from(width) * scale).round() as u32;
        Dimensions::new(new_width.max(1), new_height)
    }
}

/// Downscale `image` to fit inside `bounds`
pub fn resize_to_bounds(image: DynamicImage, bounds: &Bounds) -> DynamicImage {
    let current = Dimensions::of(&image);
    let target = fit_inside(current, bounds);

    if target == current {
        debug!("No resize needed for {}", current);
        return image;
    }

    debug!("Resizing {} -> {} using {:?}", current, target, RESIZE_FILTER);
    image.resize_exact(target.width, target.height, RESIZE_FILTER)
}

/// EXIF orientation tag values (1-8)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Orientation {
    #[default]
    Normal,
    FlipHorizontal,
    Rotate180,
    FlipVertical,
    Transpose,
    Rotate90,
    Transverse,
    Rotate270,
}

impl Orientation {
    /// Map an EXIF orientation value; unknown values mean no change
    pub fn from_exif(value: u32) -> Self {
        match value {
            2 => Self::FlipHorizontal,
            3 => Self::Rotate180,
            4 => Self::FlipVertical,
            5 => Self::Transpose,
            6 => Self::Rotate90,
            7 => Self::Transverse,
            8 => Self::Rotate270,
            _ => Self::Normal,
        }
    }

    /// Whether applying this orientation swaps width and height
    pub fn swaps_dimensions(self) -> bool {
        matches!(
            self,
            Self::Transpose | Self::Rotate90 | Self::Transverse | Self::Rotate270
        )
    }
}

/// Read the EXIF orientation of a file.
///
/// Lenient: files without EXIF data, or with unreadable EXIF, are `Normal`.
pub fn read_orientation(path: &Path) -> Orientation {
    let Ok(file) = File::open(path) else {
        return Orientation::Normal;
    };
    let mut reader = BufReader::new(file);
    let Ok(exif) = Reader::new().read_from_container(&mut reader) else {
        return Orientation::Normal;
    };

    exif.get_field(Tag::Orientation, In::PRIMARY)
        .and_then(|field| field.value.get_uint(0))
        .map(Orientation::from_exif)
        .unwrap_or_default()
}

/// Rotate/flip pixels so the image displays upright without EXIF
pub fn apply_orientation(image: DynamicImage, orientation: Orientation) -> DynamicImage {
    match orientation {
        Orientation::Normal => image,
        Orientation::FlipHorizontal => image.fliph(),
        Orientation::Rotate180 => image.rotate180(),
        Orientation::FlipVertical => image.flipv(),
        Orientation::Transpose => image.rotate90().fliph(),
        Orientation::Rotate90 => image.rotate90(),
        Orientation::Transverse => image.rotate270().fliph(),
        Orientation::Rotate270 => image.rotate270(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgb};

    fn create_test_image(width: u32, height: u32) -> DynamicImage {
        let img = ImageBuffer::from_fn(width, height, |x, y| {
            let intensity = ((x + y) % 255) as u8;
            Rgb([intensity, intensity, intensity])
        });
        DynamicImage::ImageRgb8(img)
    }

    fn dims(width: u32, height: u32) -> Dimensions {
        Dimensions::new(width, height)
    }

    #[test]
    fn test_fit_width_only() {
        let bounds = Bounds::width(1024).unwrap();
        assert_eq!(fit_inside(dims(4000, 3000), &bounds), dims(1024, 768));
        assert_eq!(fit_inside(dims(800, 600), &bounds), dims(800, 600));
    }

    #[test]
    fn test_fit_height_only() {
        let bounds = Bounds::height(500).unwrap();
        assert_eq!(fit_inside(dims(1000, 2000), &bounds), dims(250, 500));
        // Wide images are unconstrained horizontally
        assert_eq!(fit_inside(dims(9000, 400), &bounds), dims(9000, 400));
    }

    #[test]
    fn test_fit_both() {
        let bounds = Bounds::both(600, 600).unwrap();
        assert_eq!(fit_inside(dims(1000, 800), &bounds), dims(600, 480));
        assert_eq!(fit_inside(dims(800, 1000), &bounds), dims(480, 600));
        assert_eq!(fit_inside(dims(1200, 1200), &bounds), dims(600, 600));
    }

    #[test]
    fn test_fit_never_upscales() {
        let bounds = Bounds::both(4000, 4000).unwrap();
        assert_eq!(fit_inside(dims(10, 20), &bounds), dims(10, 20));
    }

    #[test]
    fn test_fit_stays_inside_bounds() {
        let bounds = Bounds::both(333, 777).unwrap();
        for (w, h) in [(1001, 999), (5000, 3), (3, 5000), (7919, 7907)] {
            let fitted = fit_inside(dims(w, h), &bounds);
            assert!(fitted.width <= 333 && fitted.height <= 777, "{w}x{h} -> {fitted}");
            assert!(fitted.width >= 1 && fitted.height >= 1);
        }
    }

    #[test]
    fn test_resize_to_bounds() {
        let image = create_test_image(400, 300);
        let resized = resize_to_bounds(image, &Bounds::width(100).unwrap());
        assert_eq!(Dimensions::of(&resized), dims(100, 75));

        let small = create_test_image(50, 40);
        let untouched = resize_to_bounds(small, &Bounds::width(100).unwrap());
        assert_eq!(Dimensions::of(&untouched), dims(50, 40));
    }

    #[test]
    fn test_orientation_mapping() {
        assert_eq!(Orientation::from_exif(1), Orientation::Normal);
        assert_eq!(Orientation::from_exif(6), Orientation::Rotate90);
        assert_eq!(Orientation::from_exif(8), Orientation::Rotate270);
        assert_eq!(Orientation::from_exif(42), Orientation::Normal);
        assert!(Orientation::Rotate90.swaps_dimensions());
        assert!(!Orientation::Rotate180.swaps_dimensions());
    }

    #[test]
    fn test_apply_orientation() {
        for value in 1..=8 {
            let orientation = Orientation::from_exif(value);
            let rotated = apply_orientation(create_test_image(40, 10), orientation);
            let expected = if orientation.swaps_dimensions() {
                dims(10, 40)
            } else {
                dims(40, 10)
            };
            assert_eq!(Dimensions::of(&rotated), expected, "orientation {value}");
        }
    }

    #[test]
    fn test_read_orientation_without_exif() {
        assert_eq!(
            read_orientation(Path::new("/nonexistent/file.jpg")),
            Orientation::Normal
        );
    }
}
