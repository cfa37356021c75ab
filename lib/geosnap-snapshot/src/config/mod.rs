/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::anyhow;
use url::Url;

use crate::source::{DatasetSource, FileDatasetSource, HttpDatasetSource};

#[cfg(feature = "yaml")]
mod yaml;

const DEFAULT_DOWNLOAD_FILE: &str = "GeoLite2-City.csv.gz";
const DEFAULT_DATASET_FILE: &str = "GeoLite2-City.csv";
const DEFAULT_PIPE_CAPACITY: NonZeroUsize = NonZeroUsize::new(8).unwrap();
const DEFAULT_CHUNK_SIZE: NonZeroUsize = NonZeroUsize::new(64 * 1024).unwrap();
const DEFAULT_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HttpSourceConfig {
    pub(crate) url: Url,
    pub(crate) timeout: Duration,
    pub(crate) user_agent: String,
}

impl HttpSourceConfig {
    pub fn new(url: Url) -> Self {
        HttpSourceConfig {
            url,
            timeout: Duration::from_secs(600),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }

    pub fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = timeout;
    }

    pub fn set_user_agent(&mut self, user_agent: String) {
        self.user_agent = user_agent;
    }

    #[inline]
    pub fn url(&self) -> &Url {
        &self.url
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DatasetSourceConfig {
    Http(HttpSourceConfig),
    File(PathBuf),
}

impl DatasetSourceConfig {
    pub fn build(&self) -> anyhow::Result<Arc<dyn DatasetSource>> {
        match self {
            DatasetSourceConfig::Http(c) => {
                let source = HttpDatasetSource::new(c)?;
                Ok(Arc::new(source))
            }
            DatasetSourceConfig::File(p) => Ok(Arc::new(FileDatasetSource::new(p.clone()))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnpackConfig {
    pub(crate) pipe_capacity: NonZeroUsize,
    pub(crate) chunk_size: NonZeroUsize,
}

impl Default for UnpackConfig {
    fn default() -> Self {
        UnpackConfig {
            pipe_capacity: DEFAULT_PIPE_CAPACITY,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

impl UnpackConfig {
    pub fn set_pipe_capacity(&mut self, capacity: NonZeroUsize) {
        self.pipe_capacity = capacity;
    }

    pub fn set_chunk_size(&mut self, size: NonZeroUsize) {
        self.chunk_size = size;
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SnapshotCacheConfig {
    pub(crate) source: DatasetSourceConfig,
    pub(crate) work_dir: PathBuf,
    pub(crate) download_file: String,
    pub(crate) dataset_file: String,
    pub(crate) refresh_interval: Duration,
    pub(crate) retry_min_interval: Duration,
    pub(crate) retry_max_interval: Duration,
    pub(crate) unpack: UnpackConfig,
}

impl SnapshotCacheConfig {
    pub fn new(source: DatasetSourceConfig) -> Self {
        SnapshotCacheConfig {
            source,
            work_dir: PathBuf::from("."),
            download_file: DEFAULT_DOWNLOAD_FILE.to_string(),
            dataset_file: DEFAULT_DATASET_FILE.to_string(),
            refresh_interval: Duration::from_secs(360 * 3600),
            retry_min_interval: Duration::from_secs(30),
            retry_max_interval: Duration::from_secs(3600),
            unpack: UnpackConfig::default(),
        }
    }

    pub fn set_source(&mut self, source: DatasetSourceConfig) {
        self.source = source;
    }

    pub fn set_work_dir(&mut self, dir: PathBuf) {
        self.work_dir = dir;
    }

    pub fn set_download_file(&mut self, name: String) {
        self.download_file = name;
    }

    pub fn set_dataset_file(&mut self, name: String) {
        self.dataset_file = name;
    }

    pub fn set_refresh_interval(&mut self, interval: Duration) {
        self.refresh_interval = interval;
    }

    pub fn set_retry_min_interval(&mut self, interval: Duration) {
        self.retry_min_interval = interval;
    }

    pub fn set_retry_max_interval(&mut self, interval: Duration) {
        self.retry_max_interval = interval;
    }

    pub fn set_unpack(&mut self, unpack: UnpackConfig) {
        self.unpack = unpack;
    }

    #[inline]
    pub fn source(&self) -> &DatasetSourceConfig {
        &self.source
    }

    #[inline]
    pub fn refresh_interval(&self) -> Duration {
        self.refresh_interval
    }

    #[inline]
    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    pub(crate) fn download_path(&self) -> PathBuf {
        self.work_dir.join(&self.download_file)
    }

    pub(crate) fn dataset_path(&self) -> PathBuf {
        self.work_dir.join(&self.dataset_file)
    }

    pub fn check(&self) -> anyhow::Result<()> {
        if self.refresh_interval.is_zero() {
            return Err(anyhow!("refresh interval should not be zero"));
        }
        if self.retry_min_interval.is_zero() {
            return Err(anyhow!("retry min interval should not be zero"));
        }
        if self.retry_min_interval > self.retry_max_interval {
            return Err(anyhow!(
                "retry min interval should not be greater than retry max interval"
            ));
        }
        if self.download_file.is_empty() || self.dataset_file.is_empty() {
            return Err(anyhow!("empty download or dataset file name"));
        }
        if self.download_file == self.dataset_file {
            return Err(anyhow!(
                "download file and dataset file should have different names"
            ));
        }
        if self.download_file == format!("{}.tmp", self.dataset_file) {
            return Err(anyhow!(
                "download file name {} is reserved for unpacking the dataset file",
                self.download_file
            ));
        }
        match &self.source {
            DatasetSourceConfig::Http(c) => match c.url.scheme() {
                "http" | "https" => {}
                s => return Err(anyhow!("unsupported dataset url scheme {s}")),
            },
            DatasetSourceConfig::File(p) => {
                let download_path = match std::fs::canonicalize(self.download_path()) {
                    Ok(p) => p,
                    Err(_) => resolve_path(&self.work_dir).join(&self.download_file),
                };
                if resolve_path(p) == download_path {
                    return Err(anyhow!(
                        "source file {} should not be the download file",
                        p.display()
                    ));
                }
            }
        }
        Ok(())
    }
}

fn resolve_path(path: &Path) -> PathBuf {
    std::fs::canonicalize(path)
        .or_else(|_| std::path::absolute(path))
        .unwrap_or_else(|_| path.to_path_buf())
}
