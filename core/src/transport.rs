//! The I/O seam: executes one `HttpRequest` and reports what came back.
//!
//! # Design
//! `CameraClient` never touches sockets itself. It hands each request to a
//! `Transport`, which returns either an `HttpResponse` (any status code,
//! 4xx/5xx included) or a `TransportError` saying why no response exists.
//! `UreqTransport` is the blocking implementation used in production and
//! in the integration tests; unit tests script their own.

use std::io;
use std::time::Duration;

use crate::error::TransportError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};

/// Executes a single request-response exchange.
pub trait Transport: Send + Sync {
    /// `timeout` bounds the connect phase and the read phase independently.
    fn execute(&self, request: &HttpRequest, timeout: Duration) -> Result<HttpResponse, TransportError>;
}

/// Blocking transport backed by `ureq`.
#[derive(Debug, Clone, Copy, Default)]
pub struct UreqTransport;

impl Transport for UreqTransport {
    fn execute(&self, request: &HttpRequest, timeout: Duration) -> Result<HttpResponse, TransportError> {
        // Status codes are data here; the client decides what a 401 means.
        let agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .timeout_connect(Some(timeout))
            .timeout_recv_response(Some(timeout))
            .timeout_recv_body(Some(timeout))
            .build()
            .new_agent();

        let mut call = match request.method {
            HttpMethod::Get => agent.get(&request.url),
        };
        for (name, value) in &request.headers {
            call = call.header(name.as_str(), value.as_str());
        }

        let mut response = call.call().map_err(classify)?;

        let status = response.status();
        let headers = response
            .headers()
            .iter()
            .map(|(name, value)| (name.as_str().to_string(), decode_lossy(value.as_bytes())))
            .collect();
        let body = match response.body_mut().read_to_vec() {
            Ok(bytes) => decode_lossy(&bytes),
            Err(err) if status.is_success() => return Err(classify(err)),
            // the status alone decides a failed exchange
            Err(err) => {
                log::warn!("discarding unreadable {} body: {err}", status.as_u16());
                String::new()
            }
        };

        Ok(HttpResponse {
            status: status.as_u16(),
            reason: status.canonical_reason().unwrap_or_default().to_string(),
            headers,
            body,
        })
    }
}

/// Lossy UTF-8 decode of a body or header value; invalid sequences
/// become U+FFFD.
fn decode_lossy(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

/// Sort a `ureq` failure into the transport taxonomy.
fn classify(err: ureq::Error) -> TransportError {
    match err {
        ureq::Error::Timeout(_) => TransportError::Timeout,
        ureq::Error::HostNotFound => TransportError::HostNotFound,
        ureq::Error::ConnectionFailed => TransportError::ConnectionRefused,
        ureq::Error::Io(err) => classify_io(&err),
        other => classify_message(other.to_string()),
    }
}

fn classify_io(err: &io::Error) -> TransportError {
    match err.kind() {
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => TransportError::Timeout,
        io::ErrorKind::ConnectionRefused => TransportError::ConnectionRefused,
        _ => classify_message(err.to_string()),
    }
}

fn classify_message(message: String) -> TransportError {
    let lower = message.to_ascii_lowercase();
    if lower.contains("tls") || lower.contains("certificate") || lower.contains("handshake") {
        TransportError::Tls(message)
    } else if lower.contains("failed to lookup address") || lower.contains("name or service not known") {
        TransportError::HostNotFound
    } else {
        TransportError::Io(message)
    }
}
