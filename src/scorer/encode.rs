use anyhow::{anyhow, Result};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, GenericImageView};
use std::io::Cursor;

/// Decode `bytes`, shrink so neither side exceeds `max_dimension` (aspect ratio
/// kept), and re-encode as JPEG. The input is never modified.
pub fn prepare_image(bytes: &[u8], max_dimension: u32, quality: u8) -> Result<Vec<u8>> {
    let img = image::load_from_memory(bytes)
        .map_err(|e| anyhow!("Failed to decode image: {}", e))?;

    let (width, height) = img.dimensions();
    let img = if width > max_dimension || height > max_dimension {
        img.resize(
            max_dimension,
            max_dimension,
            image::imageops::FilterType::Triangle,
        )
    } else {
        img
    };

    // JPEG has no alpha channel.
    let img = DynamicImage::ImageRgb8(img.to_rgb8());

    let mut buf = Cursor::new(Vec::new());
    let encoder = JpegEncoder::new_with_quality(&mut buf, quality);
    img.write_with_encoder(encoder)
        .map_err(|e| anyhow!("Failed to encode image as JPEG: {}", e))?;

    Ok(buf.into_inner())
}

/// Base64 payload for the scoring service. Undecodable input is sent as-is.
pub fn encode_for_upload(bytes: &[u8], max_dimension: u32, quality: u8) -> String {
    match prepare_image(bytes, max_dimension, quality) {
        Ok(prepared) => BASE64.encode(prepared),
        Err(e) => {
            tracing::warn!(error = %e, "Sending original bytes without resizing");
            BASE64.encode(bytes)
        }
    }
}
