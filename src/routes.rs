use std::sync::Arc;

use axum::{
    extract::{multipart::MultipartRejection, DefaultBodyLimit, Multipart, State},
    http::Uri,
    response::{Json, Response},
    routing::{get, post},
    Router,
};
use serde::Serialize;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};

use crate::{
    config::Config,
    error::{AppError, Result},
    relay,
    upload::UploadForm,
    upstream::{self, GenerationRequest},
};

/// Slack on top of the image cap for the text fields and multipart framing.
const FORM_OVERHEAD_BYTES: usize = 64 * 1024;

pub struct AppState {
    pub config: Config,
    pub client: reqwest::Client,
}

impl AppState {
    pub fn new(config: Config) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.upstream_timeout)
            .build()?;
        Ok(Self { config, client })
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    image_url: String,
}

pub fn router(state: Arc<AppState>) -> Router {
    let mut app = Router::new().route("/generate", post(generate_image));

    if let Some(relay) = &state.config.relay {
        app = app.route(&format!("{}/*path", relay.prefix), get(relay_image));
    }

    app.fallback_service(ServeDir::new(&state.config.static_dir))
        .layer(DefaultBodyLimit::max(
            state.config.max_upload_bytes + FORM_OVERHEAD_BYTES,
        ))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn generate_image(
    State(state): State<Arc<AppState>>,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<Json<GenerateResponse>> {
    // A body that is not multipart at all carries no image.
    let multipart = multipart.map_err(|rejection| {
        tracing::warn!(error = %rejection, "request body is not multipart");
        AppError::Validation("no image uploaded")
    })?;

    let upload = UploadForm::read(multipart, state.config.max_upload_bytes)
        .await
        .and_then(UploadForm::validate)
        .inspect_err(|e| tracing::warn!(stage = "upload", error = %e, "rejected request"))?;

    tracing::info!(
        style = upload.style.key(),
        size = upload.size.as_str(),
        bytes = upload.image.len(),
        "image received"
    );

    let request = GenerationRequest::new(upload)
        .inspect_err(|e| tracing::error!(stage = "sniff", error = %e, "cannot label upload"))?;
    tracing::debug!(mime = request.sniffed().mime, "sniffed upload type");

    let image_url = upstream::generate(&state.client, &state.config, request)
        .await
        .inspect_err(|e| tracing::error!(stage = "generate", error = %e, "generation failed"))?;
    tracing::info!(%image_url, "generated image");

    let image_url = match &state.config.relay {
        Some(relay) => relay::rewrite_url(&relay.prefix, &image_url)
            .inspect_err(|e| tracing::error!(stage = "rewrite", error = %e, "cannot relay URL"))?,
        None => image_url,
    };

    Ok(Json(GenerateResponse { image_url }))
}

async fn relay_image(State(state): State<Arc<AppState>>, uri: Uri) -> Result<Response> {
    let Some(relay) = &state.config.relay else {
        return Err(AppError::Validation("invalid relay path"));
    };

    // Work on the raw path so encoded separators are still visible.
    let fragment = uri
        .path()
        .strip_prefix(relay.prefix.as_str())
        .and_then(|rest| rest.strip_prefix('/'))
        .unwrap_or_default();

    let target = relay::resolve_target(&relay.origin, fragment, uri.query())
        .inspect_err(|e| tracing::warn!(stage = "relay", path = uri.path(), error = %e, "rejected relay path"))?;

    relay::fetch(&state.client, relay, target)
        .await
        .inspect_err(|e| tracing::error!(stage = "relay", error = %e, "relay fetch failed"))
}
