use std::io::Write;

use axum::http::StatusCode;
use mock_camera::{AuthScheme, CameraConfig, MockCamera};
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> Result<(), std::io::Error> {
    init_logger();

    let port = std::env::var("PORT").unwrap_or_else(|_| "8081".to_string());
    let addr = format!("0.0.0.0:{port}");
    let config = config_from_env();
    let listener = TcpListener::bind(&addr).await?;

    log::info!("mock camera listening on {addr}");
    log::info!("{config:?}");

    MockCamera::new(config).serve(listener).await
}

/// `CAMERA_AUTH` picks the challenge (`digest`, `legacy` or `basic`) and
/// `CAMERA_FORCE_STATUS` makes every authenticated request fail with that
/// status code.
fn config_from_env() -> CameraConfig {
    let mut config = CameraConfig::default();
    if let Ok(username) = std::env::var("CAMERA_USERNAME") {
        config.username = username;
    }
    if let Ok(password) = std::env::var("CAMERA_PASSWORD") {
        config.password = password;
    }
    match std::env::var("CAMERA_AUTH").as_deref() {
        Ok("legacy") => config.auth = AuthScheme::Digest { qop: false },
        Ok("basic") => config.auth = AuthScheme::Basic,
        Ok("digest") | Err(_) => {}
        Ok(other) => log::warn!("unknown CAMERA_AUTH {other:?}, using digest"),
    }
    if let Ok(raw) = std::env::var("CAMERA_FORCE_STATUS") {
        match raw.parse::<u16>().ok().and_then(|code| StatusCode::from_u16(code).ok()) {
            Some(status) => config.forced_status = Some(status),
            None => log::warn!("ignoring CAMERA_FORCE_STATUS {raw:?}"),
        }
    }
    config
}

fn init_logger() {
    let env = env_logger::Env::default().filter_or("RUST_LOG", "info");
    env_logger::Builder::from_env(env)
        .format(|buf, record| {
            writeln!(
                buf,
                "{} {:<5} {}",
                buf.timestamp_millis(),
                record.level(),
                record.args()
            )
        })
        .init();
}
