//! In-process stand-in for an IP camera's `configManager.cgi` endpoint.
//!
//! Issues Digest (or Basic) challenges, checks the answers properly, and
//! keeps a single motion detection flag that `getConfig` reports and
//! `setConfig` changes.

use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use axum::{
    extract::{OriginalUri, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use base64::{engine::general_purpose, Engine as _};
use md5::{Digest, Md5};
use tokio::{net::TcpListener, sync::RwLock};
use uuid::Uuid;

pub use axum::http::StatusCode as HttpStatus;

pub const CONFIG_MANAGER_PATH: &str = "/cgi-bin/configManager.cgi";

/// Outstanding nonces kept at once; the oldest is dropped past this.
pub const MAX_OUTSTANDING_NONCES: usize = 256;

/// Which challenge the camera sends on an unauthenticated request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthScheme {
    /// `qop: true` adds `qop="auth"` to the challenge and requires the
    /// client to use the qop hash chain.
    Digest { qop: bool },
    Basic,
}

#[derive(Clone)]
pub struct CameraConfig {
    pub username: String,
    pub password: String,
    pub realm: String,
    pub auth: AuthScheme,
    pub motion_enabled: bool,
    /// Answer every authenticated request with this status instead.
    pub forced_status: Option<StatusCode>,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            username: "ipc".to_string(),
            password: "pass".to_string(),
            realm: "Camera".to_string(),
            auth: AuthScheme::Digest { qop: true },
            motion_enabled: false,
            forced_status: None,
        }
    }
}

impl fmt::Debug for CameraConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CameraConfig")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("realm", &self.realm)
            .field("auth", &self.auth)
            .field("motion_enabled", &self.motion_enabled)
            .field("forced_status", &self.forced_status)
            .finish()
    }
}

struct Inner {
    config: CameraConfig,
    motion_enabled: AtomicBool,
    requests: AtomicUsize,
    /// Issued and not yet answered, oldest first.
    nonces: RwLock<VecDeque<String>>,
}

/// Handle on a running (or about to run) mock camera. Clones share state.
#[derive(Clone)]
pub struct MockCamera {
    inner: Arc<Inner>,
}

impl MockCamera {
    pub fn new(config: CameraConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                motion_enabled: AtomicBool::new(config.motion_enabled),
                config,
                requests: AtomicUsize::new(0),
                nonces: RwLock::new(VecDeque::new()),
            }),
        }
    }

    pub fn router(&self) -> Router {
        Router::new()
            .route(CONFIG_MANAGER_PATH, get(config_manager))
            .with_state(self.clone())
    }

    pub async fn serve(self, listener: TcpListener) -> Result<(), std::io::Error> {
        axum::serve(listener, self.router()).await
    }

    pub fn motion_enabled(&self) -> bool {
        self.inner.motion_enabled.load(Ordering::SeqCst)
    }

    /// Requests that reached the config endpoint, challenged ones included.
    pub fn request_count(&self) -> usize {
        self.inner.requests.load(Ordering::SeqCst)
    }

    async fn challenge(&self) -> Response {
        let config = &self.inner.config;
        let value = match config.auth {
            AuthScheme::Digest { qop } => {
                let nonce = Uuid::new_v4().simple().to_string();
                let mut nonces = self.inner.nonces.write().await;
                if nonces.len() == MAX_OUTSTANDING_NONCES {
                    nonces.pop_front();
                }
                nonces.push_back(nonce.clone());
                drop(nonces);
                let qop = if qop { ", qop=\"auth\"" } else { "" };
                format!("Digest realm=\"{}\", nonce=\"{nonce}\", algorithm=MD5{qop}", config.realm)
            }
            AuthScheme::Basic => format!("Basic realm=\"{}\"", config.realm),
        };
        log::info!("sent {} challenge", value.split(' ').next().unwrap_or_default());
        (
            StatusCode::UNAUTHORIZED,
            [(header::WWW_AUTHENTICATE, value), (header::CONTENT_TYPE, "text/plain".to_string())],
            "401 Unauthorized",
        )
            .into_response()
    }

    async fn is_authorized(&self, authorization: &str, request_uri: &str) -> bool {
        let config = &self.inner.config;
        match config.auth {
            AuthScheme::Basic => {
                let Some(encoded) = authorization.strip_prefix("Basic ") else {
                    return false;
                };
                let expected = general_purpose::STANDARD.encode(format!("{}:{}", config.username, config.password));
                encoded.trim() == expected
            }
            AuthScheme::Digest { qop } => {
                let Some(rest) = authorization.strip_prefix("Digest ") else {
                    return false;
                };
                let params = auth_params(rest);
                let get = |key: &str| params.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str());

                let (Some(username), Some(realm), Some(nonce), Some(uri), Some(response)) =
                    (get("username"), get("realm"), get("nonce"), get("uri"), get("response"))
                else {
                    return false;
                };
                if username != config.username || realm != config.realm || uri != request_uri {
                    return false;
                }
                // a nonce answers exactly one request
                if !self.take_nonce(nonce).await {
                    return false;
                }

                let ha1 = md5_hex(&format!("{}:{}:{}", config.username, config.realm, config.password));
                let ha2 = md5_hex(&format!("GET:{uri}"));
                let expected = if qop {
                    let (Some("auth"), Some(nc), Some(cnonce)) = (get("qop"), get("nc"), get("cnonce")) else {
                        return false;
                    };
                    md5_hex(&format!("{ha1}:{nonce}:{nc}:{cnonce}:auth:{ha2}"))
                } else {
                    md5_hex(&format!("{ha1}:{nonce}:{ha2}"))
                };
                response == expected
            }
        }
    }

    async fn take_nonce(&self, nonce: &str) -> bool {
        let mut nonces = self.inner.nonces.write().await;
        match nonces.iter().position(|issued| issued == nonce) {
            Some(index) => nonces.remove(index).is_some(),
            None => false,
        }
    }

    /// Nonces issued and not yet answered.
    pub async fn outstanding_nonces(&self) -> usize {
        self.inner.nonces.read().await.len()
    }
}

/// A camera with the default configuration.
pub fn app() -> Router {
    MockCamera::new(CameraConfig::default()).router()
}

async fn config_manager(State(camera): State<MockCamera>, OriginalUri(uri): OriginalUri, headers: HeaderMap) -> Response {
    camera.inner.requests.fetch_add(1, Ordering::SeqCst);
    let request_uri = uri.path_and_query().map(|pq| pq.as_str()).unwrap_or(CONFIG_MANAGER_PATH);
    log::info!("GET {request_uri}");

    let authorization = headers.get(header::AUTHORIZATION).and_then(|value| value.to_str().ok());
    let authorized = match authorization {
        Some(value) => camera.is_authorized(value, request_uri).await,
        None => false,
    };
    if !authorized {
        return camera.challenge().await;
    }

    if let Some(status) = camera.inner.config.forced_status {
        return (status, status.canonical_reason().unwrap_or_default()).into_response();
    }

    let query = query_pairs(uri.query().unwrap_or_default());
    let param = |key: &str| query.iter().find(|(k, _)| *k == key).map(|(_, v)| *v);

    match param("action") {
        Some("getConfig") => {
            if param("name") != Some("MotionDetect") {
                return (StatusCode::BAD_REQUEST, "Invalid config name").into_response();
            }
            let enabled = camera.motion_enabled();
            log::info!("returned motion status: {enabled}");
            let body = format!(
                "table.MotionDetect[0].Enable={enabled}\n\
                 table.MotionDetect[0].Sensitivity=3\n\
                 table.MotionDetect[0].Threshold=15\n"
            );
            ([(header::CONTENT_TYPE, "text/plain")], body).into_response()
        }
        Some("setConfig") => {
            let value = query
                .iter()
                .find(|(key, _)| key.contains("MotionDetect") && key.contains("Enable"))
                .map(|(_, value)| *value);
            let Some(value) = value else {
                return (StatusCode::BAD_REQUEST, "Missing MotionDetect Enable parameter").into_response();
            };
            let enabled = value.eq_ignore_ascii_case("true");
            camera.inner.motion_enabled.store(enabled, Ordering::SeqCst);
            log::info!("set motion detection to: {enabled}");
            ([(header::CONTENT_TYPE, "text/plain")], "OK").into_response()
        }
        _ => (StatusCode::BAD_REQUEST, "Invalid action").into_response(),
    }
}

fn query_pairs(query: &str) -> Vec<(&str, &str)> {
    query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| pair.split_once('=').unwrap_or((pair, "")))
        .collect()
}

/// `key=value` / `key="value"` pairs of an `Authorization` header.
fn auth_params(input: &str) -> Vec<(String, String)> {
    let mut params = Vec::new();
    let mut rest = input.trim();
    while !rest.is_empty() {
        let Some((key, after)) = rest.split_once('=') else {
            break;
        };
        let key = key.trim().trim_start_matches(',').trim().to_string();
        let after = after.trim_start();
        let (value, remaining) = match after.strip_prefix('"') {
            Some(quoted) => match quoted.split_once('"') {
                Some((value, remaining)) => (value, remaining),
                None => (quoted, ""),
            },
            None => match after.split_once(',') {
                Some((value, remaining)) => (value.trim(), remaining),
                None => (after.trim(), ""),
            },
        };
        params.push((key, value.to_string()));
        rest = remaining.trim_start().trim_start_matches(',').trim_start();
    }
    params
}

fn md5_hex(input: &str) -> String {
    format!("{:x}", Md5::digest(input.as_bytes()))
}
