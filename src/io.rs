//! Convenience helpers for reading image metadata via the `image` crate.
//!
//! Available when the `image-io` feature is enabled. Only the header is read;
//! pixels stay with whoever captured the frame.

use crate::geometry::ImageSize;
use crate::util::{DetectError, DetectResult};
use std::path::Path;

/// Reads the pixel dimensions of an image file.
pub fn image_size<P: AsRef<Path>>(path: P) -> DetectResult<ImageSize> {
    let (width, height) =
        image::image_dimensions(path).map_err(|err| DetectError::ImageIo {
            reason: err.to_string(),
        })?;
    ImageSize::new(width, height)
}

/// Returns the dimensions of an already decoded image.
pub fn image_size_of(img: &image::DynamicImage) -> DetectResult<ImageSize> {
    ImageSize::new(img.width(), img.height())
}
