// Copyright AGNTCY Contributors (https://github.com/agntcy)
// SPDX-License-Identifier: Apache-2.0

//! Common traits for key resolution.

use async_trait::async_trait;
use http::request::Parts;
use jsonwebtoken_aws_lc::DecodingKey;
use jsonwebtoken_aws_lc::jwk::Jwk;

use crate::errors::JwksError;
use crate::extractor::ExtractedToken;

/// Storage for keys downloaded from a JWKS endpoint, indexed by key ID.
///
/// Implementations do no locking of their own. [`crate::client::JwkClient`]
/// serialises every call behind its own mutex.
pub trait KeyCache: Send {
    /// Look up a cached key.
    ///
    /// Fails with [`JwksError::KeyNotFound`] when nothing is cached under
    /// `key_id` and with [`JwksError::KeyExpired`] when the entry is too old.
    fn get(&self, key_id: &str) -> Result<Jwk, JwksError>;

    /// Store the key named `key_id` out of a freshly downloaded key set and
    /// return it. Other keys in the set are ignored.
    fn add(&mut self, key_id: &str, keys: &[Jwk]) -> Result<Jwk, JwksError>;
}

/// Pulls the token out of an inbound request.
pub trait RequestTokenExtractor: Send + Sync {
    fn extract(&self, request: &Parts) -> Result<ExtractedToken, JwksError>;
}

impl<F> RequestTokenExtractor for F
where
    F: Fn(&Parts) -> Result<ExtractedToken, JwksError> + Send + Sync,
{
    fn extract(&self, request: &Parts) -> Result<ExtractedToken, JwksError> {
        self(request)
    }
}

/// Trait for providing the key material needed to verify the token carried
/// by a request.
#[async_trait]
pub trait SecretProvider: Send + Sync {
    async fn get_secret(&self, request: &Parts) -> Result<DecodingKey, JwksError>;
}
