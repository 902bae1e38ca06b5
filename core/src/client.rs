//! Camera client: one configured endpoint, two operations.
//!
//! # Design
//! Each operation is a single GET with at most one retry:
//!
//! ```text
//! Requesting --401, no Authorization sent--> AuthRetry --> Requesting
//! Requesting --2xx--> Success
//! Requesting --any other status / transport failure--> Failed
//! ```
//!
//! The retry guard is the request itself: `authorize_retry` only answers a
//! 401 for a request that carried no `Authorization` header, so a second
//! 401 is final.
//!
//! The steps (`build_*`, `authorize_retry`, `parse_*`) are public so a host
//! can run the I/O itself; `get_motion_detection_status` and
//! `set_motion_detection_status` drive them over the installed `Transport`.
//!
//! The installed config is an `Arc` snapshot. Replacing it never affects an
//! operation already in flight. Operations take `&self` and share nothing
//! else, so concurrent callers are independent; nothing orders a get
//! against an overlapping set on the same client.

use std::sync::Arc;

use parking_lot::RwLock;

use crate::digest;
use crate::endpoint::EndpointConfig;
use crate::error::{CameraError, EndpointError};
use crate::http::{HttpRequest, HttpResponse};
use crate::parser::parse_motion_detection_status;
use crate::settings::CameraSettings;
use crate::transport::{Transport, UreqTransport};
use crate::types::MotionStatus;

const AUTHORIZATION: &str = "Authorization";
const WWW_AUTHENTICATE: &str = "WWW-Authenticate";

/// Client for a single camera endpoint.
pub struct CameraClient<T = UreqTransport> {
    config: RwLock<Option<Arc<EndpointConfig>>>,
    transport: T,
}

impl CameraClient<UreqTransport> {
    /// A client with no endpoint installed, using the blocking HTTP transport.
    pub fn new() -> Self {
        Self::with_transport(UreqTransport)
    }
}

impl Default for CameraClient<UreqTransport> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Transport> CameraClient<T> {
    pub fn with_transport(transport: T) -> Self {
        Self {
            config: RwLock::new(None),
            transport,
        }
    }

    pub fn with_config(config: EndpointConfig, transport: T) -> Self {
        Self {
            config: RwLock::new(Some(Arc::new(config))),
            transport,
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// The currently installed endpoint, if any.
    pub fn config(&self) -> Option<Arc<EndpointConfig>> {
        self.config.read().clone()
    }

    /// Replace the installed endpoint. `None` uninstalls it.
    pub fn install(&self, config: Option<EndpointConfig>) {
        *self.config.write() = config.map(Arc::new);
    }

    /// Rebuild the endpoint from host settings.
    ///
    /// Identical settings keep the installed config. Settings that do not
    /// parse leave the client uninitialized and return the parse error.
    pub fn apply_settings(&self, settings: &CameraSettings) -> Result<(), EndpointError> {
        let config = match settings.to_config() {
            Ok(config) => config,
            Err(err) => {
                log::error!("invalid camera endpoint: {err}");
                self.install(None);
                return Err(err);
            }
        };

        let mut slot = self.config.write();
        if slot.as_deref() != Some(&config) {
            log::debug!("camera endpoint set to {}", config.base_url());
            *slot = Some(Arc::new(config));
        }
        Ok(())
    }

    pub fn build_get_status(&self) -> Result<HttpRequest, CameraError> {
        let config = self.config().ok_or(CameraError::NotInitialized)?;
        Ok(HttpRequest::get(config.get_status_url()))
    }

    pub fn build_set_status(&self, enable: bool) -> Result<HttpRequest, CameraError> {
        let config = self.config().ok_or(CameraError::NotInitialized)?;
        Ok(HttpRequest::get(config.set_status_url(enable)))
    }

    /// Read the motion detection switch.
    ///
    /// Never fails: every error is folded into an unavailable status.
    pub fn get_motion_detection_status(&self) -> MotionStatus {
        let Some(config) = self.config() else {
            log::error!("camera service not initialized, cannot get motion detection status");
            return MotionStatus::unavailable(&CameraError::NotInitialized);
        };
        let request = HttpRequest::get(config.get_status_url());

        match self.exchange(&config, request) {
            Ok(response) => parse_get_status(&response),
            Err(err) => {
                log_failure("get motion detection status", &err);
                MotionStatus::unavailable(&err)
            }
        }
    }

    /// Ask the camera to switch motion detection on or off.
    ///
    /// Success means only that the camera answered 2xx; read the status
    /// back to learn the effective value.
    pub fn set_motion_detection_status(&self, enable: bool) -> Result<(), CameraError> {
        let Some(config) = self.config() else {
            log::error!("camera service not initialized, cannot set motion detection status");
            return Err(CameraError::NotInitialized);
        };
        let request = HttpRequest::get(config.set_status_url(enable));

        self.exchange(&config, request)
            .and_then(|response| parse_set_status(&response))
            .inspect_err(|err| log_failure("set motion detection status", err))
    }

    /// Send `request`, answering one authentication challenge if needed.
    fn exchange(&self, config: &EndpointConfig, request: HttpRequest) -> Result<HttpResponse, CameraError> {
        log::debug!("GET {}", request.url);
        let response = self.transport.execute(&request, config.timeout())?;

        let response = match authorize_retry(config, &request, &response) {
            Some(retry) => {
                log::debug!("answering {} challenge for {}", response.status, retry.url);
                self.transport.execute(&retry, config.timeout())?
            }
            None => response,
        };

        check_status(response)
    }
}

/// The retried request for a 401, or `None` when no retry is allowed.
///
/// A retry is allowed only when `response` is a 401 and `request` did not
/// already carry an `Authorization` header.
pub fn authorize_retry(config: &EndpointConfig, request: &HttpRequest, response: &HttpResponse) -> Option<HttpRequest> {
    if response.status != 401 || request.header(AUTHORIZATION).is_some() {
        return None;
    }
    let authorization = digest::build_authorization(
        select_challenge(response),
        config.username(),
        config.password(),
        request.method.as_str(),
        request.request_uri(),
        config.client_nonce(),
    );
    Some(request.clone().with_header(AUTHORIZATION, authorization))
}

/// The challenge to answer: the first Digest one when the camera offers
/// several, otherwise the first of any scheme.
fn select_challenge(response: &HttpResponse) -> Option<&str> {
    response
        .header_values(WWW_AUTHENTICATE)
        .find(|value| {
            value
                .trim_start()
                .get(..6)
                .is_some_and(|scheme| scheme.eq_ignore_ascii_case("digest"))
        })
        .or_else(|| response.header(WWW_AUTHENTICATE))
}

/// Interpret the final response of a status read.
pub fn parse_get_status(response: &HttpResponse) -> MotionStatus {
    if response.is_success() {
        MotionStatus::available(parse_motion_detection_status(&response.body))
    } else {
        MotionStatus::unavailable(&CameraError::from_status(response.status, &response.reason))
    }
}

/// Interpret the final response of a status write.
pub fn parse_set_status(response: &HttpResponse) -> Result<(), CameraError> {
    if response.is_success() {
        Ok(())
    } else {
        Err(CameraError::from_status(response.status, &response.reason))
    }
}

fn check_status(response: HttpResponse) -> Result<HttpResponse, CameraError> {
    if response.is_success() {
        return Ok(response);
    }
    log::error!("camera responded with {} {}", response.status, response.reason);
    Err(CameraError::from_status(response.status, &response.reason))
}

fn log_failure(operation: &str, err: &CameraError) {
    match err {
        CameraError::Timeout => log::warn!("timeout during {operation}, camera unavailable"),
        CameraError::Tls(detail) => log::error!("{operation} failed: tls error: {detail}"),
        other => log::error!("{operation} failed: {other}"),
    }
}
