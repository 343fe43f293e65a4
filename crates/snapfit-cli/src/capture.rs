use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, Rgb, RgbImage};
use snapfit_contracts::capture::CapturedImage;

pub const DEFAULT_MAX_DIM: u32 = 1024;
const JPEG_QUALITY: u8 = 80;

/// Loads a still image and normalizes it to the JPEG payload both services
/// expect: alpha flattened onto white, longest side at most `max_dim`.
pub fn prepare_capture(path: &Path, max_dim: u32) -> Result<CapturedImage> {
    let source = fs::canonicalize(path)
        .with_context(|| format!("capture not found: {}", path.display()))?;
    let image = image::open(&source)
        .with_context(|| format!("failed to decode image {}", source.display()))?;
    let bytes = encode_jpeg(&image, max_dim)?;
    log::debug!(
        "prepared capture {} ({}x{} -> {} bytes)",
        source.display(),
        image.width(),
        image.height(),
        bytes.len()
    );
    Ok(CapturedImage::from_jpeg_bytes(
        &bytes,
        format!("file://{}", source.display()),
    ))
}

fn encode_jpeg(image: &DynamicImage, max_dim: u32) -> Result<Vec<u8>> {
    let dim = max_dim.max(1);
    let image = if image.width() > dim || image.height() > dim {
        image.resize(dim, dim, FilterType::Triangle)
    } else {
        image.clone()
    };
    let flattened = flatten_onto_white(&image);
    let mut bytes = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut bytes, JPEG_QUALITY);
    flattened
        .write_with_encoder(encoder)
        .context("failed to encode capture as JPEG")?;
    Ok(bytes)
}

fn flatten_onto_white(image: &DynamicImage) -> RgbImage {
    let rgba = image.to_rgba8();
    let mut flattened = RgbImage::new(rgba.width(), rgba.height());
    for (x, y, pixel) in rgba.enumerate_pixels() {
        let alpha = u16::from(pixel[3]);
        let blend =
            |channel: u8| -> u8 { (((u16::from(channel) * alpha) + (255 * (255 - alpha))) / 255) as u8 };
        flattened.put_pixel(x, y, Rgb([blend(pixel[0]), blend(pixel[1]), blend(pixel[2])]));
    }
    flattened
}
