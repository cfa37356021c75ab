/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::path::Path;

use async_trait::async_trait;

mod file;
pub use file::FileDatasetSource;

mod http;
pub use http::HttpDatasetSource;

/// Where the compressed dataset comes from.
///
/// `fetch` should replace the content of `dst` with the whole compressed
/// artifact and return the number of bytes written.
#[async_trait]
pub trait DatasetSource: Send + Sync {
    fn describe(&self) -> String;

    async fn fetch(&self, dst: &Path) -> anyhow::Result<u64>;
}
