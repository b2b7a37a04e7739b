// Copyright AGNTCY Contributors (https://github.com/agntcy)
// SPDX-License-Identifier: Apache-2.0

use std::time::Duration;

use duration_str::deserialize_option_duration;
use serde::Deserialize;
use url::Url;

use crate::cache::{MaxAge, MemoryKeyCache};
use crate::client::{JwkClient, JwkClientOptions};
use crate::errors::JwksError;
use crate::extractor::{FromFirst, FromHeader, FromQuery};

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct CacheConfig {
    /// How long a key stays cached (e.g. "10m"). Keys never expire if unset.
    #[serde(default, deserialize_with = "deserialize_option_duration")]
    max_age: Option<Duration>,

    /// Maximum number of cached keys. Negative means unbounded, 0 disables
    /// caching.
    #[serde(default = "default_max_size")]
    max_size: i64,
}

fn default_max_size() -> i64 {
    -1
}

impl Default for CacheConfig {
    fn default() -> Self {
        CacheConfig {
            max_age: None,
            max_size: default_max_size(),
        }
    }
}

impl CacheConfig {
    /// Create a new CacheConfig
    pub fn new(max_age: Option<Duration>, max_size: i64) -> Self {
        CacheConfig { max_age, max_size }
    }

    /// Get the max age
    pub fn max_age(&self) -> MaxAge {
        self.max_age.into()
    }

    /// Get the size limit, `None` when unbounded
    pub fn max_size(&self) -> Option<usize> {
        usize::try_from(self.max_size).ok()
    }

    /// Build the in-memory key cache described by this config
    pub fn build(&self) -> MemoryKeyCache {
        MemoryKeyCache::new(self.max_age(), self.max_size())
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct Config {
    /// JWKS endpoint
    uri: String,

    /// HTTP timeout for downloading the key set
    #[serde(default, deserialize_with = "deserialize_option_duration")]
    timeout: Option<Duration>,

    /// User-Agent sent to the JWKS endpoint
    #[serde(default)]
    user_agent: Option<String>,

    /// When set, tokens are also accepted from this query parameter if the
    /// request has no Authorization header
    #[serde(default)]
    token_query_param: Option<String>,

    /// Key cache limits
    #[serde(default)]
    cache: CacheConfig,
}

impl Config {
    /// Create a new Config
    pub fn new(uri: impl Into<String>) -> Self {
        Config {
            uri: uri.into(),
            timeout: None,
            user_agent: None,
            token_query_param: None,
            cache: CacheConfig::default(),
        }
    }

    pub fn with_timeout(self, timeout: Duration) -> Self {
        Config {
            timeout: Some(timeout),
            ..self
        }
    }

    pub fn with_user_agent(self, user_agent: impl Into<String>) -> Self {
        Config {
            user_agent: Some(user_agent.into()),
            ..self
        }
    }

    pub fn with_token_query_param(self, param: impl Into<String>) -> Self {
        Config {
            token_query_param: Some(param.into()),
            ..self
        }
    }

    pub fn with_cache(self, cache: CacheConfig) -> Self {
        Config { cache, ..self }
    }

    /// Get the URI
    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// Get the timeout
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Get the cache config
    pub fn cache(&self) -> &CacheConfig {
        &self.cache
    }

    /// Get the query parameter tokens may be read from
    pub fn token_query_param(&self) -> Option<&str> {
        self.token_query_param.as_deref()
    }

    pub fn client_options(&self) -> JwkClientOptions {
        JwkClientOptions {
            uri: self.uri.clone(),
            timeout: self.timeout,
            user_agent: self.user_agent.clone(),
        }
    }

    /// Validate the config and build a ready to use client
    pub fn build_client(&self) -> Result<JwkClient, JwksError> {
        let url = Url::parse(&self.uri)?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(JwksError::ConfigError(format!(
                "unsupported JWKS URI scheme: {}",
                url.scheme()
            )));
        }

        let client = JwkClient::new(self.client_options())?.with_key_cache(self.cache.build());

        let client = match &self.token_query_param {
            Some(param) => client.with_extractor(FromFirst::new(vec![
                Box::new(FromHeader),
                Box::new(FromQuery::new(param.clone())),
            ])),
            None => client,
        };

        Ok(client)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutils::{jwks_body, token_with_kid};
    use crate::traits::SecretProvider;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_config_from_yaml() {
        let yaml = r#"
uri: https://issuer.example.com/.well-known/jwks.json
timeout: 10s
user_agent: my-service
token_query_param: jwt
cache:
  max_age: 10m
  max_size: 5
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();

        assert_eq!(config.uri(), "https://issuer.example.com/.well-known/jwks.json");
        assert_eq!(config.timeout(), Some(Duration::from_secs(10)));
        assert_eq!(config.token_query_param(), Some("jwt"));
        assert_eq!(
            config.cache().max_age(),
            MaxAge::Limit(Duration::from_secs(600))
        );
        assert_eq!(config.cache().max_size(), Some(5));

        let options = config.client_options();
        assert_eq!(options.user_agent.as_deref(), Some("my-service"));
        assert_eq!(options.timeout, Some(Duration::from_secs(10)));
    }

    #[test]
    fn test_config_defaults() {
        let config: Config = serde_yaml::from_str("uri: https://example.com/jwks.json").unwrap();

        assert_eq!(config, Config::new("https://example.com/jwks.json"));
        assert_eq!(config.timeout(), None);
        assert_eq!(config.token_query_param(), None);
        assert_eq!(config.cache().max_age(), MaxAge::NoCheck);
        assert_eq!(config.cache().max_size(), None);
    }

    #[test]
    fn test_cache_config_size_limits() {
        let cache = CacheConfig::new(None, -1).build();
        assert_eq!(cache.max_size(), None);

        let cache = CacheConfig::new(None, 0).build();
        assert_eq!(cache.max_size(), Some(0));

        let cache = CacheConfig::new(Some(Duration::ZERO), 3).build();
        assert_eq!(cache.max_size(), Some(3));
        assert_eq!(cache.max_age(), MaxAge::Limit(Duration::ZERO));
    }

    #[test]
    fn test_config_builders() {
        let config = Config::new("https://example.com/jwks.json")
            .with_timeout(Duration::from_secs(1))
            .with_user_agent("agent")
            .with_token_query_param("token")
            .with_cache(CacheConfig::new(Some(Duration::from_secs(30)), 2));

        assert_eq!(config.timeout(), Some(Duration::from_secs(1)));
        assert_eq!(config.token_query_param(), Some("token"));
        assert_eq!(config.cache().max_size(), Some(2));
    }

    #[test]
    fn test_config_invalid_duration() {
        let yaml = r#"
uri: https://example.com/jwks.json
cache:
  max_age: not-a-duration
"#;
        assert!(serde_yaml::from_str::<Config>(yaml).is_err());
    }

    #[tokio::test]
    async fn test_build_client_invalid_uri() {
        let result = Config::new("not a uri").build_client();
        assert!(matches!(result, Err(JwksError::UrlParseError(_))));

        let result = Config::new("ftp://example.com/jwks.json").build_client();
        match result {
            Err(JwksError::ConfigError(msg)) => assert!(msg.contains("ftp")),
            Err(e) => panic!("unexpected error: {}", e),
            Ok(_) => panic!("ftp URI should be rejected"),
        }
    }

    #[tokio::test]
    async fn test_build_client_reads_query_param() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(jwks_body(&["key1"])))
            .mount(&server)
            .await;

        let client = Config::new(server.uri())
            .with_token_query_param("jwt")
            .build_client()
            .unwrap();

        let parts = http::Request::builder()
            .uri(format!("http://localhost/?jwt={}", token_with_kid("key1")))
            .body(())
            .unwrap()
            .into_parts()
            .0;

        let result = client.get_secret(&parts).await;
        assert!(result.is_ok(), "{:?}", result.err());
    }

    #[tokio::test]
    async fn test_build_client_disabled_cache_downloads_every_time() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(jwks_body(&["key1"])))
            .expect(2)
            .mount(&server)
            .await;

        let client = Config::new(server.uri())
            .with_cache(CacheConfig::new(None, 0))
            .build_client()
            .unwrap();

        assert!(client.get_key("key1").await.is_err());
        assert!(client.get_key("key1").await.is_err());
    }
}
