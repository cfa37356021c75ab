/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::path::Path;

use anyhow::anyhow;
use async_trait::async_trait;
use reqwest::Client;
use tokio::io::AsyncWriteExt;
use url::Url;

use super::DatasetSource;
use crate::HttpSourceConfig;

pub struct HttpDatasetSource {
    client: Client,
    url: Url,
}

impl HttpDatasetSource {
    pub fn new(config: &HttpSourceConfig) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build()
            .map_err(|e| anyhow!("failed to build http client: {e}"))?;
        Ok(HttpDatasetSource {
            client,
            url: config.url.clone(),
        })
    }
}

#[async_trait]
impl DatasetSource for HttpDatasetSource {
    fn describe(&self) -> String {
        format!("url {}", self.url)
    }

    async fn fetch(&self, dst: &Path) -> anyhow::Result<u64> {
        let mut rsp = self
            .client
            .get(self.url.clone())
            .send()
            .await
            .map_err(|e| anyhow!("request to {} failed: {e}", self.url))?;
        let status = rsp.status();
        if !status.is_success() {
            return Err(anyhow!("unexpected status {status} from {}", self.url));
        }

        let mut file = tokio::fs::File::create(dst)
            .await
            .map_err(|e| anyhow!("failed to create file {}: {e}", dst.display()))?;
        let mut total: u64 = 0;
        while let Some(chunk) = rsp
            .chunk()
            .await
            .map_err(|e| anyhow!("failed to read response body from {}: {e}", self.url))?
        {
            file.write_all(&chunk)
                .await
                .map_err(|e| anyhow!("failed to write to file {}: {e}", dst.display()))?;
            total += chunk.len() as u64;
        }
        file.flush()
            .await
            .map_err(|e| anyhow!("failed to flush file {}: {e}", dst.display()))?;
        Ok(total)
    }
}
