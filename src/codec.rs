//! Avatar transcoding: decode, resize to a target width, re-encode
//!
//! The source format is sniffed from the bytes; no content-type hint is
//! trusted. Output always uses the detected format, and only JPEG and PNG
//! can be written.

use bytes::Bytes;
use image::{imageops::FilterType, DynamicImage, ImageFormat, ImageOutputFormat};
use std::io::Cursor;

use crate::errors::{CodecError, CodecResult};

pub const JPEG_QUALITY: u8 = 90;

/// Largest output a single transform may allocate, in pixels
pub const MAX_OUTPUT_PIXELS: u64 = 4096 * 4096;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AvatarFormat {
    Jpeg,
    Png,
}

impl AvatarFormat {
    pub fn from_image_format(format: ImageFormat) -> Option<Self> {
        match format {
            ImageFormat::Jpeg => Some(Self::Jpeg),
            ImageFormat::Png => Some(Self::Png),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Jpeg => "jpeg",
            Self::Png => "png",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
        }
    }
}

/// A transcoded avatar ready to be sent to the client
#[derive(Debug, Clone)]
pub struct ResolvedImage {
    pub bytes: Bytes,
    pub format: AvatarFormat,
    pub width: u32,
    pub height: u32,
}

/// Resize `data` to `target_width` pixels wide, keeping the aspect ratio,
/// and re-encode it in its original format. A width of zero keeps the
/// source dimensions.
pub fn transform(data: &[u8], target_width: u32) -> CodecResult<ResolvedImage> {
    let detected = image::guess_format(data).map_err(CodecError::decode)?;
    let img = image::load_from_memory_with_format(data, detected).map_err(CodecError::decode)?;

    let format = AvatarFormat::from_image_format(detected).ok_or_else(|| {
        CodecError::encode(
            format!("{:?}", detected).to_lowercase(),
            "unsupported output format",
        )
    })?;

    let resized = resize_to_width(img, target_width, format)?;
    let bytes = encode(&resized, format)?;

    Ok(ResolvedImage {
        bytes: Bytes::from(bytes),
        format,
        width: resized.width(),
        height: resized.height(),
    })
}

/// Height for a proportional resize to `target_width`, never below one pixel
pub fn scaled_height(width: u32, height: u32, target_width: u32) -> u32 {
    if width == 0 {
        return height;
    }
    let scaled = (height as f64 * target_width as f64 / width as f64).round();
    scaled.max(1.0) as u32
}

fn resize_to_width(
    img: DynamicImage,
    target_width: u32,
    format: AvatarFormat,
) -> CodecResult<DynamicImage> {
    if target_width == 0 || img.width() == 0 {
        return Ok(img);
    }
    let target_height = scaled_height(img.width(), img.height(), target_width);

    // Narrow sources scale to very tall targets
    if target_width as u64 * target_height as u64 > MAX_OUTPUT_PIXELS {
        return Err(CodecError::encode(
            format.name(),
            format!(
                "output of {}x{} exceeds the {} pixel limit",
                target_width, target_height, MAX_OUTPUT_PIXELS
            ),
        ));
    }

    Ok(img.resize_exact(target_width, target_height, FilterType::Lanczos3))
}

fn encode(img: &DynamicImage, format: AvatarFormat) -> CodecResult<Vec<u8>> {
    let mut buffer = Vec::new();
    let mut cursor = Cursor::new(&mut buffer);

    let result = match format {
        // JPEG carries no alpha channel
        AvatarFormat::Jpeg => DynamicImage::ImageRgb8(img.to_rgb8())
            .write_to(&mut cursor, ImageOutputFormat::Jpeg(JPEG_QUALITY)),
        AvatarFormat::Png => img.write_to(&mut cursor, ImageOutputFormat::Png),
    };
    result.map_err(|e| CodecError::encode(format.name(), e))?;

    Ok(buffer)
}
