use image::codecs::jpeg::JpegEncoder;
use image::{ImageError, RgbImage};

/// Encode an RGB frame as baseline JPEG.
pub fn encode_jpeg(frame: &RgbImage, quality: u8) -> Result<Vec<u8>, ImageError> {
    let mut out = Vec::with_capacity(frame.as_raw().len() / 8);
    JpegEncoder::new_with_quality(&mut out, quality).encode_image(frame)?;
    Ok(out)
}
