// Copyright AGNTCY Contributors (https://github.com/agntcy)
// SPDX-License-Identifier: Apache-2.0

use jsonwebtoken_aws_lc::jwk::Jwk;
use serde_json::{Value, json};

/// Base64url of "secret", used as symmetric key material in test JWKs
pub(crate) const TEST_OCT_SECRET: &str = "c2VjcmV0";

/// JSON representation of a symmetric JWK with the given key ID
pub(crate) fn oct_jwk_json(kid: &str) -> Value {
    json!({
        "kty": "oct",
        "kid": kid,
        "k": TEST_OCT_SECRET,
    })
}

pub(crate) fn oct_jwk(kid: &str) -> Jwk {
    serde_json::from_value(oct_jwk_json(kid)).unwrap()
}

/// A `{"keys": [...]}` document containing one symmetric key per kid
pub(crate) fn jwks_body(kids: &[&str]) -> Value {
    json!({
        "keys": kids.iter().map(|kid| oct_jwk_json(kid)).collect::<Vec<_>>(),
    })
}

/// Build an unsigned compact token whose header carries the given kid.
/// Only the header is ever decoded by the extractors.
pub(crate) fn token_with_kid(kid: &str) -> String {
    unsigned_token(json!({ "alg": "HS256", "typ": "JWT", "kid": kid }))
}

/// Same as [`token_with_kid`] but the header names no key
pub(crate) fn token_without_kid() -> String {
    unsigned_token(json!({ "alg": "HS256", "typ": "JWT" }))
}

fn unsigned_token(header: Value) -> String {
    use base64::Engine;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;

    let payload = json!({ "sub": "test-subject" });

    format!(
        "{}.{}.{}",
        URL_SAFE_NO_PAD.encode(header.to_string()),
        URL_SAFE_NO_PAD.encode(payload.to_string()),
        URL_SAFE_NO_PAD.encode("signature"),
    )
}
