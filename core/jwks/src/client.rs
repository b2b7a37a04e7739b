// Copyright AGNTCY Contributors (https://github.com/agntcy)
// SPDX-License-Identifier: Apache-2.0

use std::time::Duration;

use async_trait::async_trait;
use http::request::Parts;
use jsonwebtoken_aws_lc::DecodingKey;
use jsonwebtoken_aws_lc::jwk::{Jwk, JwkSet};
use reqwest::Client as ReqwestClient;
use reqwest::header::CONTENT_TYPE;
use tokio::sync::Mutex;
use tracing::debug;

use crate::cache::MemoryKeyCache;
use crate::errors::JwksError;
use crate::extractor::FromHeader;
use crate::provider::initialize_crypto_provider;
use crate::traits::{KeyCache, RequestTokenExtractor, SecretProvider};

const DEFAULT_USER_AGENT: &str = "jwks-resolver";

/// Where and how to download the key set
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JwkClientOptions {
    /// JWKS endpoint
    pub uri: String,

    /// Timeout for the whole download. `None` leaves it to the transport.
    pub timeout: Option<Duration>,

    /// User-Agent sent to the JWKS endpoint
    pub user_agent: Option<String>,
}

impl JwkClientOptions {
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            timeout: None,
            user_agent: None,
        }
    }

    pub fn with_timeout(self, timeout: Duration) -> Self {
        Self {
            timeout: Some(timeout),
            ..self
        }
    }

    pub fn with_user_agent(self, user_agent: impl Into<String>) -> Self {
        Self {
            user_agent: Some(user_agent.into()),
            ..self
        }
    }
}

/// Resolves JWT verification keys by key ID, downloading the JWKS on
/// demand and keeping the keys in a [`KeyCache`].
///
/// A single lock covers the cache lookup, the download and the insert, so
/// there is never more than one download in flight per client. Concurrent
/// misses queue up behind it and usually find the key already cached once
/// they get the lock. The flip side is that a slow endpoint stalls every
/// caller; set [`JwkClientOptions::timeout`] to bound that.
///
/// Example usage:
///
/// ```no_run
/// # async fn run() -> Result<(), jwks_resolver::errors::JwksError> {
/// use std::time::Duration;
/// use jwks_resolver::cache::{MaxAge, MemoryKeyCache};
/// use jwks_resolver::client::{JwkClient, JwkClientOptions};
///
/// let client = JwkClient::new(JwkClientOptions::new(
///     "https://issuer.example.com/.well-known/jwks.json",
/// ))?
/// .with_key_cache(MemoryKeyCache::new(
///     MaxAge::Limit(Duration::from_secs(600)),
///     Some(5),
/// ));
///
/// let key = client.get_key("my-key-id").await?;
/// # Ok(())
/// # }
/// ```
pub struct JwkClient {
    key_cache: Mutex<Box<dyn KeyCache>>,
    options: JwkClientOptions,
    extractor: Box<dyn RequestTokenExtractor>,
    client: ReqwestClient,
}

impl JwkClient {
    /// Create a client with a persistent in-memory cache that reads tokens
    /// from the `Authorization` header
    pub fn new(options: JwkClientOptions) -> Result<Self, JwksError> {
        initialize_crypto_provider();

        let mut builder = ReqwestClient::builder().user_agent(
            options
                .user_agent
                .as_deref()
                .unwrap_or(DEFAULT_USER_AGENT)
                .to_string(),
        );
        if let Some(timeout) = options.timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build()?;

        Ok(Self {
            key_cache: Mutex::new(Box::new(MemoryKeyCache::persistent())),
            options,
            extractor: Box::new(FromHeader),
            client,
        })
    }

    /// Replace the key cache
    pub fn with_key_cache(self, key_cache: impl KeyCache + 'static) -> Self {
        Self {
            key_cache: Mutex::new(Box::new(key_cache)),
            ..self
        }
    }

    /// Replace the request token extractor used by [`SecretProvider::get_secret`]
    pub fn with_extractor(self, extractor: impl RequestTokenExtractor + 'static) -> Self {
        Self {
            extractor: Box::new(extractor),
            ..self
        }
    }

    pub fn options(&self) -> &JwkClientOptions {
        &self.options
    }

    /// Return the key with the given ID.
    ///
    /// The cache is checked first. If the key is missing or expired the whole
    /// key set is downloaded once and handed to the cache, which stores the
    /// requested key. Fails with [`JwksError::KeyNotFound`] when the endpoint
    /// does not publish the key.
    pub async fn get_key(&self, key_id: &str) -> Result<Jwk, JwksError> {
        let mut key_cache = self.key_cache.lock().await;

        match key_cache.get(key_id) {
            Ok(key) => {
                debug!(kid = %key_id, "key found in cache");
                return Ok(key);
            }
            Err(e) => debug!(kid = %key_id, reason = %e, "key not usable from cache"),
        }

        let keys = self.download_keys().await?;
        key_cache.add(key_id, &keys)
    }

    /// Fetch the key set from the configured endpoint
    async fn download_keys(&self) -> Result<Vec<Jwk>, JwksError> {
        debug!(uri = %self.options.uri, "downloading JWKS");

        let response = self.client.get(self.options.uri.as_str()).send().await?;
        let status = response.status().as_u16();

        let is_json = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value.starts_with("application/json"));
        if !is_json {
            return Err(JwksError::InvalidContentType { status });
        }

        let body = response.bytes().await?;
        let jwks: JwkSet = serde_json::from_slice(&body)
            .map_err(|source| JwksError::JsonError { status, source })?;

        if jwks.keys.is_empty() {
            return Err(JwksError::KeyNotFound);
        }

        debug!(count = jwks.keys.len(), "downloaded JWKS");
        Ok(jwks.keys)
    }
}

#[async_trait]
impl SecretProvider for JwkClient {
    async fn get_secret(&self, request: &Parts) -> Result<DecodingKey, JwksError> {
        let token = self.extractor.extract(request)?;

        let header = token.headers.first().ok_or(JwksError::NoJwtHeaders)?;

        // a token without kid cannot match any published key
        let key_id = header.kid.as_deref().ok_or(JwksError::KeyNotFound)?;

        let key = self.get_key(key_id).await?;
        Ok(DecodingKey::from_jwk(&key)?)
    }
}
