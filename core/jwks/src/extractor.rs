// Copyright AGNTCY Contributors (https://github.com/agntcy)
// SPDX-License-Identifier: Apache-2.0

//! Extraction of the bearer token from inbound requests.

use http::header::AUTHORIZATION;
use http::request::Parts;
use jsonwebtoken_aws_lc::{Header, decode_header};
use tracing::trace;

use crate::errors::JwksError;
use crate::traits::RequestTokenExtractor;

const BEARER_FORMAT_ERROR: &str = "Authorization header format must be Bearer {token}";

/// Token found in a request, with its decoded header sections.
///
/// A compact JWS carries exactly one header. The list is kept ordered so
/// that extractors for multi-signature serialisations can return several.
#[derive(Debug, Clone)]
pub struct ExtractedToken {
    pub raw: String,
    pub headers: Vec<Header>,
}

impl ExtractedToken {
    /// Decode the header of a compact token. The signature is not checked.
    pub fn parse(token: &str) -> Result<Self, JwksError> {
        let header = decode_header(token)?;
        Ok(Self {
            raw: token.to_string(),
            headers: vec![header],
        })
    }

    /// Key ID named by the first header, if any
    pub fn key_id(&self) -> Option<&str> {
        self.headers.first().and_then(|header| header.kid.as_deref())
    }
}

/// Reads the token from the `Authorization: Bearer <token>` header.
#[derive(Debug, Clone, Copy, Default)]
pub struct FromHeader;

impl RequestTokenExtractor for FromHeader {
    fn extract(&self, request: &Parts) -> Result<ExtractedToken, JwksError> {
        let value = request
            .headers
            .get(AUTHORIZATION)
            .ok_or(JwksError::TokenNotFound)?
            .to_str()
            .map_err(|e| JwksError::InvalidHeader(e.to_string()))?;

        if value.trim().is_empty() {
            return Err(JwksError::TokenNotFound);
        }

        let token = match value.trim().split_once(' ') {
            Some((scheme, token))
                if scheme.eq_ignore_ascii_case("bearer") && !token.trim().is_empty() =>
            {
                token.trim()
            }
            _ => return Err(JwksError::InvalidHeader(BEARER_FORMAT_ERROR.to_string())),
        };

        trace!("found bearer token in authorization header");
        ExtractedToken::parse(token)
    }
}

/// Reads the token from a query string parameter.
#[derive(Debug, Clone)]
pub struct FromQuery {
    param: String,
}

impl FromQuery {
    pub fn new(param: impl Into<String>) -> Self {
        Self {
            param: param.into(),
        }
    }
}

impl RequestTokenExtractor for FromQuery {
    fn extract(&self, request: &Parts) -> Result<ExtractedToken, JwksError> {
        let query = request.uri.query().ok_or(JwksError::TokenNotFound)?;

        let token = url::form_urlencoded::parse(query.as_bytes())
            .find(|(name, _)| name == self.param.as_str())
            .map(|(_, value)| value.into_owned())
            .filter(|value| !value.is_empty())
            .ok_or(JwksError::TokenNotFound)?;

        trace!(param = %self.param, "found token in query string");
        ExtractedToken::parse(&token)
    }
}

/// Tries several extractors in order.
///
/// An extractor that finds no token is skipped; any other failure stops the
/// search and is returned as-is.
pub struct FromFirst {
    extractors: Vec<Box<dyn RequestTokenExtractor>>,
}

impl FromFirst {
    pub fn new(extractors: Vec<Box<dyn RequestTokenExtractor>>) -> Self {
        Self { extractors }
    }
}

impl RequestTokenExtractor for FromFirst {
    fn extract(&self, request: &Parts) -> Result<ExtractedToken, JwksError> {
        for extractor in &self.extractors {
            match extractor.extract(request) {
                Err(JwksError::TokenNotFound) => continue,
                result => return result,
            }
        }

        Err(JwksError::TokenNotFound)
    }
}
