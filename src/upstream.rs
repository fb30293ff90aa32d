use axum::http::StatusCode;
use reqwest::{
    header::{REFERER, USER_AGENT},
    multipart::{Form, Part},
    Client,
};
use serde::Deserialize;

use crate::{
    config::{self, Config},
    error::{AppError, Result},
    sniff::{self, SniffedType},
    upload::ValidUpload,
};

const NO_URL_MESSAGE: &str = "no image URL returned";

/// One generation call, built only from a validated upload.
#[derive(Debug)]
pub struct GenerationRequest {
    prompt: &'static str,
    size: &'static str,
    image: Vec<u8>,
    sniffed: SniffedType,
}

impl GenerationRequest {
    pub fn new(upload: ValidUpload) -> Result<Self> {
        let sniffed = sniff::sniff(&upload.image)?;
        Ok(Self {
            prompt: upload.style.prompt(),
            size: upload.size.as_str(),
            image: upload.image.to_vec(),
            sniffed,
        })
    }

    pub fn sniffed(&self) -> SniffedType {
        self.sniffed
    }

    fn into_form(self) -> Result<Form> {
        let part = Part::bytes(self.image)
            .file_name(format!("image.{}", self.sniffed.extension))
            .mime_str(self.sniffed.mime)
            .map_err(|_| AppError::UnknownFileType)?;

        Ok(Form::new()
            .text("prompt", self.prompt)
            .text("size", self.size)
            .text("n", "1")
            .text("is_enhance", "true")
            .part("image", part))
    }
}

#[derive(Debug, Deserialize)]
struct GenerationResponse {
    #[serde(default)]
    data: Option<Vec<GeneratedImage>>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeneratedImage {
    #[serde(default)]
    url: Option<String>,
}

/// Submit the request once and return the first result URL.
pub async fn generate(client: &Client, config: &Config, request: GenerationRequest) -> Result<String> {
    let form = request.into_form()?;

    tracing::info!(endpoint = %config.upstream_url, "forwarding image to external API");

    let response = client
        .post(config.upstream_url.clone())
        .header(USER_AGENT, config::USER_AGENT)
        .header(REFERER, &config.referer)
        .multipart(form)
        .send()
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "network error calling external API");
            AppError::transport(e)
        })?;

    let status = response.status();
    let body = response.text().await.map_err(AppError::transport)?;

    if !status.is_success() {
        tracing::error!(status = status.as_u16(), body = %body, "external API returned an error status");
        return Err(AppError::UpstreamRequest {
            status: Some(StatusCode::from_u16(status.as_u16()).unwrap_or(StatusCode::BAD_GATEWAY)),
            message: body,
        });
    }

    tracing::debug!(body = %body, "response from external API");
    extract_url(&body)
}

fn extract_url(body: &str) -> Result<String> {
    let parsed: GenerationResponse = match serde_json::from_str(body) {
        Ok(parsed) => parsed,
        Err(e) => {
            tracing::warn!(error = %e, "external API returned a non-JSON body");
            return Err(AppError::UpstreamResponse(NO_URL_MESSAGE.to_string()));
        }
    };

    let url = parsed
        .data
        .as_deref()
        .and_then(<[GeneratedImage]>::first)
        .and_then(|image| image.url.as_deref())
        .filter(|url| !url.is_empty());

    match url {
        Some(url) => Ok(url.to_string()),
        None => Err(AppError::UpstreamResponse(
            parsed
                .message
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| NO_URL_MESSAGE.to_string()),
        )),
    }
}
