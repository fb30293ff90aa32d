#![allow(dead_code)]

use std::{
    net::SocketAddr,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
};

use axum::{
    body::Body,
    extract::{Multipart, State},
    http::{header, HeaderMap, Request, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use reqwest::Url;
use serde_json::Value;
use stylize_relay::{
    config::{RelayConfig, RelayMode},
    router, AppState, Config,
};
use tower::ServiceExt;

pub const JPEG: &[u8] = &[
    0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, b'J', b'F', b'I', b'F', 0x00, 0x01, 0x01, 0x00, 0x00, 0x01,
    0x00, 0x01, 0x00, 0x00, 0xFF, 0xD9,
];

pub const PNG: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR\0\0\0\x01\0\0\0\x01\x08\x06\0\0\0\x1f\x15\xc4\x89";

pub const GENERATIONS_PATH: &str = "/v1/images/generations";

#[derive(Debug, Clone)]
pub struct CapturedPart {
    pub name: String,
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub data: Vec<u8>,
}

#[derive(Debug, Default)]
pub struct CapturedRequest {
    pub user_agent: Option<String>,
    pub referer: Option<String>,
    pub parts: Vec<CapturedPart>,
}

impl CapturedRequest {
    pub fn part(&self, name: &str) -> &CapturedPart {
        self.parts
            .iter()
            .find(|p| p.name == name)
            .unwrap_or_else(|| panic!("no part named {name}"))
    }

    pub fn text(&self, name: &str) -> String {
        String::from_utf8(self.part(name).data.clone()).unwrap()
    }
}

/// Stand-in for both the generation endpoint and the asset origin.
#[derive(Clone)]
pub struct MockUpstream {
    pub addr: SocketAddr,
    generate_calls: Arc<AtomicUsize>,
    asset_calls: Arc<AtomicUsize>,
    captured: Arc<Mutex<Option<CapturedRequest>>>,
}

#[derive(Clone)]
struct MockState {
    generate_calls: Arc<AtomicUsize>,
    asset_calls: Arc<AtomicUsize>,
    captured: Arc<Mutex<Option<CapturedRequest>>>,
    reply: Arc<(StatusCode, String)>,
    asset: Arc<(StatusCode, String, Vec<u8>)>,
}

impl MockUpstream {
    /// Generation endpoint answers `status`/`body`; assets answer 200 with
    /// the given content type and bytes.
    pub async fn start(status: StatusCode, body: &str) -> Self {
        Self::start_with_asset(status, body, StatusCode::OK, "image/png", PNG).await
    }

    pub async fn start_with_asset(
        status: StatusCode,
        body: &str,
        asset_status: StatusCode,
        asset_type: &str,
        asset_bytes: &[u8],
    ) -> Self {
        let state = MockState {
            generate_calls: Arc::default(),
            asset_calls: Arc::default(),
            captured: Arc::default(),
            reply: Arc::new((status, body.to_string())),
            asset: Arc::new((asset_status, asset_type.to_string(), asset_bytes.to_vec())),
        };

        let app = Router::new()
            .route(GENERATIONS_PATH, post(mock_generate))
            .route("/img/*path", get(mock_asset))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            addr,
            generate_calls: state.generate_calls,
            asset_calls: state.asset_calls,
            captured: state.captured,
        }
    }

    pub fn generate_calls(&self) -> usize {
        self.generate_calls.load(Ordering::SeqCst)
    }

    pub fn asset_calls(&self) -> usize {
        self.asset_calls.load(Ordering::SeqCst)
    }

    pub fn captured(&self) -> CapturedRequest {
        self.captured.lock().unwrap().take().expect("no request captured")
    }

    pub fn config(&self, mode: Option<RelayMode>) -> Config {
        Config {
            upstream_url: Url::parse(&format!("http://{}{GENERATIONS_PATH}", self.addr)).unwrap(),
            relay: mode.map(|mode| RelayConfig {
                prefix: "/proxy".to_string(),
                origin: Url::parse(&format!("http://{}", self.addr)).unwrap(),
                mode,
            }),
            ..Config::default()
        }
    }
}

async fn mock_generate(
    State(state): State<MockState>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Response {
    state.generate_calls.fetch_add(1, Ordering::SeqCst);

    let header_text = |name: header::HeaderName| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };
    let mut captured = CapturedRequest {
        user_agent: header_text(header::USER_AGENT),
        referer: header_text(header::REFERER),
        parts: Vec::new(),
    };
    while let Some(field) = multipart.next_field().await.unwrap() {
        captured.parts.push(CapturedPart {
            name: field.name().unwrap_or_default().to_string(),
            file_name: field.file_name().map(str::to_string),
            content_type: field.content_type().map(str::to_string),
            data: field.bytes().await.unwrap().to_vec(),
        });
    }
    *state.captured.lock().unwrap() = Some(captured);

    let (status, body) = state.reply.as_ref();
    (
        *status,
        [(header::CONTENT_TYPE, "application/json")],
        body.clone(),
    )
        .into_response()
}

async fn mock_asset(State(state): State<MockState>) -> Response {
    state.asset_calls.fetch_add(1, Ordering::SeqCst);
    let (status, content_type, bytes) = state.asset.as_ref();
    (
        *status,
        [(header::CONTENT_TYPE, content_type.clone())],
        bytes.clone(),
    )
        .into_response()
}

pub enum Part<'a> {
    Text(&'a str, &'a str),
    File {
        name: &'a str,
        file_name: &'a str,
        content_type: &'a str,
        data: &'a [u8],
    },
}

const BOUNDARY: &str = "----stylize-relay-test-boundary";

pub fn multipart_request(parts: &[Part<'_>]) -> Request<Body> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        match part {
            Part::Text(name, value) => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n")
                        .as_bytes(),
                );
            }
            Part::File {
                name,
                file_name,
                content_type,
                data,
            } => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\n\
                         Content-Type: {content_type}\r\n\r\n"
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(data);
                body.extend_from_slice(b"\r\n");
            }
        }
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method("POST")
        .uri("/generate")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

pub fn image_part(data: &[u8]) -> Part<'_> {
    Part::File {
        name: "image",
        file_name: "photo.jpg",
        content_type: "image/jpeg",
        data,
    }
}

pub async fn send(config: Config, request: Request<Body>) -> Response {
    let state = Arc::new(AppState::new(config).unwrap());
    router(state).oneshot(request).await.unwrap()
}

pub async fn json_body(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

pub fn error_message(body: &Value) -> &str {
    body["error"].as_str().expect("error field")
}
