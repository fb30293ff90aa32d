use axum::{body::Bytes, extract::Multipart};

use crate::{
    error::{AppError, Result},
    styles::{Size, Style},
};

/// Raw multipart contents, before any validation.
#[derive(Debug, Default)]
pub struct UploadForm {
    pub image: Option<Bytes>,
    pub style: Option<String>,
    pub size: Option<String>,
}

/// A request that passed validation and may be forwarded upstream.
#[derive(Debug)]
pub struct ValidUpload {
    pub image: Bytes,
    pub style: Style,
    pub size: Size,
}

impl UploadForm {
    /// Drain the multipart stream. The file is held in memory and capped at
    /// `max_bytes`; unrelated fields are skipped.
    pub async fn read(mut multipart: Multipart, max_bytes: usize) -> Result<Self> {
        let mut form = UploadForm::default();

        while let Some(mut field) = multipart.next_field().await? {
            let name = field.name().map(str::to_owned);
            match name.as_deref() {
                Some("image") => {
                    if form.image.is_some() {
                        return Err(AppError::Validation("exactly one image expected"));
                    }
                    let mut data = Vec::new();
                    while let Some(chunk) = field.chunk().await? {
                        if data.len() + chunk.len() > max_bytes {
                            return Err(AppError::PayloadTooLarge { limit: max_bytes });
                        }
                        data.extend_from_slice(&chunk);
                    }
                    form.image = Some(Bytes::from(data));
                }
                Some("style") => form.style = Some(field.text().await?),
                Some("size") => form.size = Some(field.text().await?),
                other => tracing::debug!(field = ?other, "ignoring multipart field"),
            }
        }

        Ok(form)
    }

    /// Checks run in a fixed order: file, style, size.
    pub fn validate(self) -> Result<ValidUpload> {
        let image = self
            .image
            .filter(|bytes| !bytes.is_empty())
            .ok_or(AppError::Validation("no image uploaded"))?;
        let style = self
            .style
            .as_deref()
            .and_then(Style::lookup)
            .ok_or(AppError::Validation("invalid style"))?;
        let size = self
            .size
            .as_deref()
            .and_then(Size::lookup)
            .ok_or(AppError::Validation("invalid size"))?;

        Ok(ValidUpload { image, style, size })
    }
}
