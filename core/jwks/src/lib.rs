// Copyright AGNTCY Contributors (https://github.com/agntcy)
// SPDX-License-Identifier: Apache-2.0

pub mod cache;
pub mod client;
pub mod config;
pub mod errors;
pub mod extractor;
pub mod provider;
pub mod traits;

#[cfg(test)]
pub(crate) mod testutils;
