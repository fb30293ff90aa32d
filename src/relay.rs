//! Same-origin relay for generated images.
//!
//! Generated URLs are rewritten to `<prefix>/<path>` so the browser only
//! ever talks to us; the relay route then fetches `<origin>/<path>` and
//! hands the bytes back. Only the configured origin can be reached.

use axum::{
    body::Body,
    http::{
        header::{CONTENT_DISPOSITION, CONTENT_LENGTH, CONTENT_TYPE},
        HeaderMap, HeaderValue, StatusCode,
    },
    response::{IntoResponse, Response},
};
use reqwest::{Client, Url};

use crate::{
    config::{RelayConfig, RelayMode},
    error::{AppError, Result},
    sniff,
};

const OCTET_STREAM: &str = "application/octet-stream";

/// Turn an upstream image URL into a local relay path, keeping any query.
pub fn rewrite_url(prefix: &str, upstream_url: &str) -> Result<String> {
    let url = Url::parse(upstream_url).map_err(|e| {
        AppError::UpstreamResponse(format!("returned image URL is not absolute: {e}"))
    })?;
    Ok(match url.query() {
        Some(query) => format!("{prefix}{}?{query}", url.path()),
        None => format!("{prefix}{}", url.path()),
    })
}

/// Resolve a raw (still percent-encoded) path fragment against the origin.
///
/// Traversal segments, encoded separators and anything that would leave the
/// origin are refused.
pub fn resolve_target(origin: &Url, fragment: &str, query: Option<&str>) -> Result<Url> {
    const INVALID: AppError = AppError::Validation("invalid relay path");

    let lowered = fragment.to_ascii_lowercase();
    if fragment.is_empty()
        || fragment.contains('\\')
        || fragment.split('/').next().is_some_and(|first| first.contains(':'))
        || ["%2e", "%2f", "%5c"].iter().any(|enc| lowered.contains(enc))
        || fragment
            .split('/')
            .any(|segment| segment.is_empty() || segment == "." || segment == "..")
    {
        return Err(INVALID);
    }

    let mut target = origin.join(fragment).map_err(|_| INVALID)?;
    if target.origin() != origin.origin() {
        return Err(INVALID);
    }
    target.set_query(query);
    Ok(target)
}

/// Fetch `target` once and relay it according to the configured mode.
pub async fn fetch(client: &Client, relay: &RelayConfig, target: Url) -> Result<Response> {
    tracing::debug!(%target, mode = ?relay.mode, "relaying image");

    let upstream = client
        .get(target.clone())
        .send()
        .await
        .map_err(AppError::transport)?;

    let status = upstream.status();
    if !status.is_success() {
        return Err(AppError::UpstreamRequest {
            status: Some(StatusCode::from_u16(status.as_u16()).unwrap_or(StatusCode::BAD_GATEWAY)),
            message: format!("relay fetch of {target} failed"),
        });
    }

    let declared = upstream
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| HeaderValue::from_bytes(v.as_bytes()).ok());

    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_DISPOSITION, HeaderValue::from_static("inline"));

    match relay.mode {
        RelayMode::Stream => {
            headers.insert(
                CONTENT_TYPE,
                declared.unwrap_or_else(|| HeaderValue::from_static(OCTET_STREAM)),
            );
            if let Some(len) = upstream.content_length() {
                headers.insert(CONTENT_LENGTH, HeaderValue::from(len));
            }
            let body = Body::from_stream(upstream.bytes_stream());
            Ok((StatusCode::OK, headers, body).into_response())
        }
        RelayMode::Buffer => {
            let bytes = upstream.bytes().await.map_err(AppError::transport)?;
            let content_type = match sniff::sniff(&bytes) {
                Ok(sniffed) => HeaderValue::from_static(sniffed.mime),
                Err(_) => {
                    tracing::warn!(%target, "relayed bytes are not a known image type");
                    declared.unwrap_or_else(|| HeaderValue::from_static(OCTET_STREAM))
                }
            };
            headers.insert(CONTENT_TYPE, content_type);
            Ok((StatusCode::OK, headers, Body::from(bytes)).into_response())
        }
    }
}
