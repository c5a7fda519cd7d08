//! Image resizing.

use image::error::ImageError;
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat};
use std::io::Cursor;
use std::sync::Arc;
use thiserror::Error;

/// Target width and height in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Dimensions {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Dimensions {
    /// Creates a new pair.
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// Errors returned by a [`Resizer`].
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum ResizeError {
    /// The input is not an image format the resizer understands.
    #[error("unsupported image format")]
    UnsupportedFormat,

    /// The input looked like a supported format but could not be decoded.
    #[error("failed to decode image")]
    Decode(#[source] ImageError),

    /// The resized image could not be encoded.
    #[error("failed to encode image")]
    Encode(#[source] ImageError),
}

/// MIME type of an encoded image, if its format is recognised.
pub(crate) fn content_type_of(image: &[u8]) -> Option<&'static str> {
    image::guess_format(image)
        .ok()
        .map(|format| format.to_mime_type())
}

/// Produces a resized copy of an image.
///
/// Implementations must be pure: the same input and target always yield the
/// same output, and nothing outside the returned bytes is touched.
pub trait Resizer: Send + Sync + 'static {
    /// Resizes `image` to exactly `target`.
    fn resize(&self, image: &[u8], target: Dimensions) -> Result<Vec<u8>, ResizeError>;
}

impl<T> Resizer for Arc<T>
where
    T: Resizer + ?Sized,
{
    fn resize(&self, image: &[u8], target: Dimensions) -> Result<Vec<u8>, ResizeError> {
        (**self).resize(image, target)
    }
}

/// [`Resizer`] backed by the `image` crate.
///
/// The output keeps the input's format. JPEG output drops any alpha channel.
#[derive(Debug, Clone, Copy)]
pub struct ImageResizer {
    filter: FilterType,
}

impl ImageResizer {
    /// Creates a resizer using the given sampling filter.
    pub fn new(filter: FilterType) -> Self {
        Self { filter }
    }
}

impl Default for ImageResizer {
    fn default() -> Self {
        Self::new(FilterType::Triangle)
    }
}

impl Resizer for ImageResizer {
    fn resize(&self, image: &[u8], target: Dimensions) -> Result<Vec<u8>, ResizeError> {
        let format = image::guess_format(image).map_err(|_| ResizeError::UnsupportedFormat)?;

        let decoded =
            image::load_from_memory_with_format(image, format).map_err(|err| match err {
                ImageError::Unsupported(_) => ResizeError::UnsupportedFormat,
                other => ResizeError::Decode(other),
            })?;

        let mut resized = decoded.resize_exact(target.width, target.height, self.filter);
        if format == ImageFormat::Jpeg {
            resized = DynamicImage::ImageRgb8(resized.to_rgb8());
        }

        let mut out = Cursor::new(Vec::new());
        resized
            .write_to(&mut out, format)
            .map_err(ResizeError::Encode)?;
        Ok(out.into_inner())
    }
}
