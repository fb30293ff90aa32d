use image::ImageFormat;

use crate::error::{AppError, Result};

/// File type derived from the bytes themselves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SniffedType {
    pub extension: &'static str,
    pub mime: &'static str,
}

/// Detect the image type from magic bytes. Filenames and client headers are
/// never consulted.
pub fn sniff(bytes: &[u8]) -> Result<SniffedType> {
    let format = image::guess_format(bytes).map_err(|_| AppError::UnknownFileType)?;
    let (extension, mime) = match format {
        ImageFormat::Png => ("png", "image/png"),
        ImageFormat::Jpeg => ("jpg", "image/jpeg"),
        ImageFormat::Gif => ("gif", "image/gif"),
        ImageFormat::WebP => ("webp", "image/webp"),
        ImageFormat::Bmp => ("bmp", "image/bmp"),
        ImageFormat::Tiff => ("tif", "image/tiff"),
        ImageFormat::Ico => ("ico", "image/x-icon"),
        ImageFormat::Avif => ("avif", "image/avif"),
        other => {
            tracing::warn!(?other, "image format recognized but not forwarded");
            return Err(AppError::UnknownFileType);
        }
    };
    Ok(SniffedType { extension, mime })
}
