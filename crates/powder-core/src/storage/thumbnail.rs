//! Resort thumbnail preparation.

use std::io::Cursor;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use image::{codecs::jpeg::JpegEncoder, GenericImageView, ImageFormat};

use crate::{Error, Result};

/// Encoded format of a prepared thumbnail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThumbnailFormat {
    Jpeg,
    Png,
}

impl ThumbnailFormat {
    #[must_use]
    pub const fn content_type(self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
        }
    }

    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Jpeg => "jpg",
            Self::Png => "png",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThumbnailOptions {
    /// Bounding box edge in pixels.
    pub max_edge: u32,
    pub format: ThumbnailFormat,
    /// Only used for JPEG output.
    pub jpeg_quality: u8,
}

impl Default for ThumbnailOptions {
    fn default() -> Self {
        Self {
            max_edge: 512,
            format: ThumbnailFormat::Jpeg,
            jpeg_quality: 80,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThumbnailImage {
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub format: ThumbnailFormat,
}

/// Decode an uploaded image and shrink it to fit `max_edge` x `max_edge`.
///
/// Aspect ratio is preserved and small images are never upscaled.
pub fn prepare_thumbnail(source: &[u8], options: ThumbnailOptions) -> Result<ThumbnailImage> {
    if source.is_empty() {
        return Err(Error::InvalidInput(
            "Thumbnail source bytes cannot be empty".to_string(),
        ));
    }
    if options.max_edge == 0 {
        return Err(Error::InvalidInput(
            "Thumbnail size must be greater than zero".to_string(),
        ));
    }

    let decoded = image::load_from_memory(source)
        .map_err(|error| Error::InvalidInput(format!("Failed to decode thumbnail image: {error}")))?;
    let (width, height) = decoded.dimensions();
    let resized = if width.max(height) <= options.max_edge {
        decoded
    } else {
        decoded.thumbnail(options.max_edge, options.max_edge)
    };

    let mut cursor = Cursor::new(Vec::new());
    match options.format {
        ThumbnailFormat::Jpeg => {
            // JPEG has no alpha channel.
            let rgb = resized.to_rgb8();
            JpegEncoder::new_with_quality(&mut cursor, options.jpeg_quality)
                .encode_image(&rgb)
                .map_err(|error| Error::InvalidInput(format!("Failed to encode JPEG: {error}")))?;
        }
        ThumbnailFormat::Png => {
            resized
                .write_to(&mut cursor, ImageFormat::Png)
                .map_err(|error| Error::InvalidInput(format!("Failed to encode PNG: {error}")))?;
        }
    }

    let (width, height) = resized.dimensions();
    Ok(ThumbnailImage {
        bytes: cursor.into_inner(),
        width,
        height,
        format: options.format,
    })
}

/// Inline `data:` URL for a thumbnail kept on this device only.
#[must_use]
pub fn data_url(thumbnail: &ThumbnailImage) -> String {
    format!(
        "data:{};base64,{}",
        thumbnail.format.content_type(),
        STANDARD.encode(&thumbnail.bytes)
    )
}
