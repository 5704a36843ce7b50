//! Image decoding for the packer path

use std::path::Path;

use image::{ColorType, DynamicImage};

use crate::{Error, Result};

/// Raw 8-bit pixels, bottom row first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedImage {
    pub pixels: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub components: u32,
}

/// Turns an image file into pixel bytes plus dimensions.
pub trait ImageLoader {
    fn load(&self, path: &Path) -> Result<DecodedImage>;
}

/// Decodes PNG, JPEG, BMP and TGA files with the `image` crate.
///
/// The image is flipped vertically and keeps its own channel count (grey,
/// grey+alpha, RGB or RGBA), converted to 8 bits per channel.
#[derive(Debug, Default, Clone, Copy)]
pub struct ImageFileLoader;

impl ImageLoader for ImageFileLoader {
    fn load(&self, path: &Path) -> Result<DecodedImage> {
        let image = image::open(path)
            .map_err(|e| Error::Image(format!("{}: {}", path.display(), e)))?;
        Ok(flatten(image.flipv()))
    }
}

fn flatten(image: DynamicImage) -> DecodedImage {
    let (width, height) = (image.width(), image.height());
    let color = image.color();
    let components = color.channel_count() as u32;

    let pixels = match color {
        ColorType::L8 | ColorType::L16 => image.into_luma8().into_raw(),
        ColorType::La8 | ColorType::La16 => image.into_luma_alpha8().into_raw(),
        _ if color.has_alpha() => image.into_rgba8().into_raw(),
        _ => image.into_rgb8().into_raw(),
    };

    DecodedImage {
        pixels,
        width,
        height,
        components,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    #[test]
    fn test_png_is_flipped_vertically() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("two_rows.png");

        let mut img = RgbImage::new(1, 2);
        img.put_pixel(0, 0, Rgb([255, 0, 0]));
        img.put_pixel(0, 1, Rgb([0, 0, 255]));
        img.save(&path).unwrap();

        let decoded = ImageFileLoader.load(&path).unwrap();
        assert_eq!((decoded.width, decoded.height, decoded.components), (1, 2, 3));
        // Bottom row (blue) comes first.
        assert_eq!(decoded.pixels, vec![0, 0, 255, 255, 0, 0]);
    }

    #[test]
    fn test_malformed_file_is_an_image_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.png");
        std::fs::write(&path, b"not a png").unwrap();

        assert!(matches!(ImageFileLoader.load(&path), Err(Error::Image(_))));
    }
}
