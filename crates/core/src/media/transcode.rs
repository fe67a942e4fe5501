//! Image normalization.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::DynamicImage;

use super::error::MediaError;

/// Decodes an image of any supported format, fits it inside
/// `max_width` x `max_height` (never enlarging), and re-encodes it as JPEG.
pub fn transcode_image(
    bytes: &[u8],
    max_width: u32,
    max_height: u32,
    quality: u8,
) -> Result<Vec<u8>, MediaError> {
    let img = image::load_from_memory(bytes)?;

    let img = if img.width() > max_width || img.height() > max_height {
        img.resize(max_width, max_height, FilterType::Lanczos3)
    } else {
        img
    };

    // JPEG carries no alpha channel.
    let rgb = DynamicImage::ImageRgb8(img.to_rgb8());

    let mut out = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut out, quality.clamp(1, 100));
    rgb.write_with_encoder(encoder)?;
    Ok(out)
}

/// Wraps JPEG bytes in a self-contained `data:` URI.
pub fn to_data_uri(jpeg: &[u8]) -> String {
    format!("data:image/jpeg;base64,{}", STANDARD.encode(jpeg))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgba, RgbaImage};
    use std::io::Cursor;

    fn png(width: u32, height: u32) -> Vec<u8> {
        let img = RgbaImage::from_pixel(width, height, Rgba([200, 40, 40, 128]));
        let mut buf = Cursor::new(Vec::new());
        img.write_to(&mut buf, ImageFormat::Png).unwrap();
        buf.into_inner()
    }

    fn dimensions(jpeg: &[u8]) -> (u32, u32) {
        let img = image::load_from_memory_with_format(jpeg, ImageFormat::Jpeg).unwrap();
        (img.width(), img.height())
    }

    #[test]
    fn test_large_image_fits_inside_bounds() {
        let out = transcode_image(&png(1600, 900), 800, 600, 85).unwrap();
        assert_eq!(dimensions(&out), (800, 450));
    }

    #[test]
    fn test_tall_image_keeps_aspect_ratio() {
        let out = transcode_image(&png(300, 1200), 800, 600, 85).unwrap();
        assert_eq!(dimensions(&out), (150, 600));
    }

    #[test]
    fn test_small_image_not_enlarged() {
        let out = transcode_image(&png(64, 48), 800, 600, 85).unwrap();
        assert_eq!(dimensions(&out), (64, 48));
    }

    #[test]
    fn test_garbage_is_transcode_error() {
        let err = transcode_image(b"definitely not an image", 800, 600, 85).unwrap_err();
        assert!(matches!(err, MediaError::Transcode(_)));
    }

    #[test]
    fn test_data_uri() {
        assert_eq!(to_data_uri(&[0xff, 0xd8, 0xff]), "data:image/jpeg;base64,/9j/");
    }
}
