// src/services/classify.rs

//! Image acceptance and categorization.
//!
//! An image is accepted when it decodes and both sides meet the minimum
//! dimension. Its category combines orientation (from the full-size
//! dimensions) with brightness: the image is shrunk to a small square, the
//! mean perceptual lightness (CIELAB L*, scaled to 0-255) of the sample is
//! taken, and the mean is compared against the configured threshold.

use image::{DynamicImage, GenericImageView, imageops::FilterType};

use crate::config::ClassifyConfig;
use crate::models::{Brightness, Category, Orientation};

/// Why an image was not accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// The bytes could not be decoded as an image.
    Undecodable,
    /// Width or height below the configured minimum.
    TooSmall { width: u32, height: u32 },
}

/// Decode a downloaded buffer and place it in a category.
pub fn classify(
    bytes: &[u8],
    config: &ClassifyConfig,
) -> std::result::Result<(DynamicImage, Category), Rejection> {
    let image = image::load_from_memory(bytes).map_err(|_| Rejection::Undecodable)?;

    let (width, height) = image.dimensions();
    if width < config.min_dimension || height < config.min_dimension {
        return Err(Rejection::TooSmall { width, height });
    }

    let category = category_of(&image, config);
    Ok((image, category))
}

/// Category of an already-decoded image.
pub fn category_of(image: &DynamicImage, config: &ClassifyConfig) -> Category {
    let (width, height) = image.dimensions();
    let orientation = Orientation::from_dimensions(width, height);
    let mean = mean_lightness(image, config.sample_size);
    let brightness = Brightness::from_mean(mean, config.brightness_threshold);
    Category::new(orientation, brightness)
}

/// Mean L* over a fixed-size resample, on a 0-255 scale.
///
/// The resample makes the cost independent of the source size and the
/// result independent of aspect ratio.
fn mean_lightness(image: &DynamicImage, sample_size: u32) -> f32 {
    let sample = image
        .resize_exact(sample_size, sample_size, FilterType::Triangle)
        .to_rgb8();

    let mut sum = 0.0f64;
    for pixel in sample.pixels() {
        sum += f64::from(lightness(pixel.0));
    }
    (sum / f64::from(sample.width() * sample.height())) as f32
}

/// CIELAB L* of an sRGB pixel, scaled from 0-100 to 0-255.
fn lightness(rgb: [u8; 3]) -> f32 {
    let [r, g, b] = rgb.map(srgb_to_linear);
    let y = 0.2126 * r + 0.7152 * g + 0.0722 * b;
    let f = if y > 0.008856 {
        y.cbrt()
    } else {
        7.787 * y + 16.0 / 116.0
    };
    let l_star = 116.0 * f - 16.0;
    l_star * 255.0 / 100.0
}

/// Undo sRGB gamma for one channel.
fn srgb_to_linear(channel: u8) -> f32 {
    let c = f32::from(channel) / 255.0;
    if c > 0.04045 {
        ((c + 0.055) / 1.055).powf(2.4)
    } else {
        c / 12.92
    }
}
