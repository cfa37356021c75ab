/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::path::{Path, PathBuf};

use anyhow::anyhow;
use async_trait::async_trait;

use super::DatasetSource;

pub struct FileDatasetSource {
    path: PathBuf,
}

impl FileDatasetSource {
    pub fn new(path: PathBuf) -> Self {
        FileDatasetSource { path }
    }
}

#[async_trait]
impl DatasetSource for FileDatasetSource {
    fn describe(&self) -> String {
        format!("file {}", self.path.display())
    }

    async fn fetch(&self, dst: &Path) -> anyhow::Result<u64> {
        // copying a file onto itself truncates it
        if let (Ok(src), Ok(dst)) = (
            tokio::fs::canonicalize(&self.path).await,
            tokio::fs::canonicalize(dst).await,
        ) {
            if src == dst {
                return Err(anyhow!(
                    "source file {} is the same as the download file",
                    self.path.display()
                ));
            }
        }
        tokio::fs::copy(&self.path, dst).await.map_err(|e| {
            anyhow!(
                "failed to copy {} to {}: {e}",
                self.path.display(),
                dst.display()
            )
        })
    }
}
