// Copyright AGNTCY Contributors (https://github.com/agntcy)
// SPDX-License-Identifier: Apache-2.0

use std::sync::Once;

use tracing::debug;

static RUSTLS: Once = Once::new();

/// Install aws-lc as the process-wide rustls crypto provider.
///
/// reqwest is built without a bundled provider, so this has to run before
/// the first HTTP client is created. If the application already installed
/// a provider, that one is kept.
pub fn initialize_crypto_provider() {
    RUSTLS.call_once(|| {
        if rustls::crypto::aws_lc_rs::default_provider()
            .install_default()
            .is_err()
        {
            debug!("rustls crypto provider already installed");
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initialize_crypto_provider_is_idempotent() {
        initialize_crypto_provider();
        initialize_crypto_provider();
        assert!(rustls::crypto::CryptoProvider::get_default().is_some());
    }
}
