//! `Authorization` header construction for the camera's 401 challenges.
//!
//! Supports RFC 2617 Digest with MD5, both the legacy form and
//! `qop="auth"`, and falls back to Basic when the challenge is not Digest.
//! Everything here is a pure function of its inputs.

use base64::{engine::general_purpose, Engine as _};
use md5::{Digest, Md5};
use rand::{rngs::OsRng, RngCore};
use serde::{Deserialize, Serialize};

/// Client nonce sent when `ClientNonce::Fixed` is in effect.
pub const FIXED_CNONCE: &str = "0a4f113b";

/// Nonce count; each challenge is answered exactly once.
pub const NONCE_COUNT: &str = "00000001";

const DEFAULT_ALGORITHM: &str = "MD5";

/// How the `cnonce` for `qop="auth"` is chosen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClientNonce {
    /// Always [`FIXED_CNONCE`]. Matches what deployed firmware has been
    /// observed to accept.
    #[default]
    Fixed,
    /// A fresh 64-bit value from the OS RNG for every authorization.
    Random,
}

impl ClientNonce {
    pub fn generate(&self) -> String {
        match self {
            ClientNonce::Fixed => FIXED_CNONCE.to_string(),
            ClientNonce::Random => {
                let mut bytes = [0u8; 8];
                OsRng.fill_bytes(&mut bytes);
                bytes.iter().map(|b| format!("{b:02x}")).collect()
            }
        }
    }
}

/// True iff the header is present and mentions `Digest` in any case.
pub fn is_challenge(header: Option<&str>) -> bool {
    header.is_some_and(|value| value.to_ascii_lowercase().contains("digest"))
}

/// Parameters of a `WWW-Authenticate: Digest ...` challenge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DigestChallenge {
    pub realm: String,
    pub nonce: String,
    pub qop: Option<String>,
    pub algorithm: String,
}

impl DigestChallenge {
    /// Extract the challenge parameters. Missing `realm`/`nonce` become
    /// empty strings and a missing `algorithm` becomes `MD5`; unknown keys
    /// are ignored.
    pub fn parse(header: &str) -> Self {
        let params = parse_params(header);
        let take = |key: &str| {
            params
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(key))
                .map(|(_, v)| v.clone())
        };
        Self {
            realm: take("realm").unwrap_or_default(),
            nonce: take("nonce").unwrap_or_default(),
            qop: take("qop"),
            algorithm: take("algorithm").unwrap_or_else(|| DEFAULT_ALGORITHM.to_string()),
        }
    }

    /// The `response` hash for this challenge.
    pub fn response(&self, username: &str, password: &str, method: &str, uri: &str, cnonce: &str) -> String {
        let ha1 = md5_hex(&format!("{username}:{}:{password}", self.realm));
        let ha2 = md5_hex(&format!("{method}:{uri}"));
        if self.uses_qop_auth() {
            md5_hex(&format!("{ha1}:{}:{NONCE_COUNT}:{cnonce}:auth:{ha2}", self.nonce))
        } else {
            md5_hex(&format!("{ha1}:{}:{ha2}", self.nonce))
        }
    }

    /// Serialize a complete `Digest ...` header value.
    pub fn authorization(&self, username: &str, password: &str, method: &str, uri: &str, cnonce: &str) -> String {
        let response = self.response(username, password, method, uri, cnonce);
        let mut header = format!(
            "Digest username=\"{username}\", realm=\"{}\", nonce=\"{}\", uri=\"{uri}\", algorithm=\"{}\", response=\"{response}\"",
            self.realm, self.nonce, self.algorithm
        );
        if self.uses_qop_auth() {
            header.push_str(&format!(", qop=\"auth\", nc={NONCE_COUNT}, cnonce=\"{cnonce}\""));
        }
        header
    }

    fn uses_qop_auth(&self) -> bool {
        self.qop.as_deref() == Some("auth")
    }
}

/// Build the `Authorization` value answering `challenge`: Digest when the
/// challenge is Digest, Basic otherwise.
pub fn build_authorization(
    challenge: Option<&str>,
    username: &str,
    password: &str,
    method: &str,
    uri: &str,
    client_nonce: ClientNonce,
) -> String {
    match challenge {
        Some(header) if is_challenge(Some(header)) => {
            DigestChallenge::parse(header).authorization(username, password, method, uri, &client_nonce.generate())
        }
        _ => {
            log::warn!("no digest challenge found, using basic auth fallback");
            basic_authorization(username, password)
        }
    }
}

/// `Basic base64(username:password)`.
pub fn basic_authorization(username: &str, password: &str) -> String {
    let encoded = general_purpose::STANDARD.encode(format!("{username}:{password}"));
    format!("Basic {encoded}")
}

/// Lowercase hex MD5 of `input`.
pub fn md5_hex(input: &str) -> String {
    format!("{:x}", Md5::digest(input.as_bytes()))
}

/// Split `key=value` / `key="value"` pairs out of an auth header. Bare
/// tokens such as the leading scheme name are skipped.
fn parse_params(header: &str) -> Vec<(String, String)> {
    let mut params = Vec::new();
    let mut chars = header.chars().peekable();

    loop {
        while chars.next_if(|c| c.is_whitespace() || *c == ',').is_some() {}
        let mut key = String::new();
        while let Some(c) = chars.next_if(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-') {
            key.push(c);
        }
        while chars.next_if(|c| *c == ' ' || *c == '\t').is_some() {}
        match chars.peek() {
            None if key.is_empty() => break,
            Some('=') => {
                chars.next();
            }
            Some(_) if key.is_empty() => {
                // stray punctuation
                chars.next();
                continue;
            }
            _ => continue,
        }
        while chars.next_if(|c| *c == ' ' || *c == '\t').is_some() {}

        let mut value = String::new();
        if chars.next_if_eq(&'"').is_some() {
            while let Some(c) = chars.next() {
                match c {
                    '"' => break,
                    '\\' => {
                        if let Some(escaped) = chars.next() {
                            value.push(escaped);
                        }
                    }
                    _ => value.push(c),
                }
            }
        } else {
            while let Some(c) = chars.next_if(|c| *c != ',' && !c.is_whitespace()) {
                value.push(c);
            }
        }
        if !key.is_empty() {
            params.push((key, value));
        }
    }

    params
}
