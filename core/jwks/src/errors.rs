// Copyright AGNTCY Contributors (https://github.com/agntcy)
// SPDX-License-Identifier: Apache-2.0

use thiserror::Error;

#[derive(Error, Debug)]
pub enum JwksError {
    // Configuration / generic
    #[error("config error: {0}")]
    ConfigError(String),

    // URL parsing
    #[error("URL parse error: {0}")]
    UrlParseError(#[from] url::ParseError),

    // Key cache / key resolution
    #[error("no Keys has been found")]
    KeyNotFound,
    #[error("key exists but is expired")]
    KeyExpired,

    // JWKS endpoint (status is the HTTP status of the offending response)
    #[error("should have a JSON content type for JWKS endpoint")]
    InvalidContentType { status: u16 },

    // Request token extraction
    #[error("token not found in request")]
    TokenNotFound,
    #[error("invalid header: {0}")]
    InvalidHeader(String),
    #[error("no headers in the token")]
    NoJwtHeaders,

    // JWT / crypto
    #[error("JWT error: {0}")]
    JwtLibraryError(#[from] jsonwebtoken_aws_lc::errors::Error),

    // Transport and decoding errors are surfaced as-is
    #[error(transparent)]
    HttpError(#[from] reqwest::Error),
    #[error("{source}")]
    JsonError { status: u16, source: serde_json::Error },
}

fn is_transient_status(status: u16) -> bool {
    status == 429 || (500..600).contains(&status)
}

impl JwksError {
    /// Returns true when the same lookup may succeed later: network
    /// failures, and unusable responses served with a 5xx or 429 status.
    /// A missing key or a malformed key set will not fix itself by retrying.
    pub fn is_transient(&self) -> bool {
        match self {
            JwksError::HttpError(_) => true,
            JwksError::InvalidContentType { status } | JwksError::JsonError { status, .. } => {
                is_transient_status(*status)
            }
            _ => false,
        }
    }
}
