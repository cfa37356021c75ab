/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::io;
use std::net::IpAddr;

use thiserror::Error;
use tokio::task::JoinError;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("no geoip dataset has been installed yet")]
pub struct NotReady;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum LookupError {
    #[error("no geoip dataset has been installed yet")]
    NotReady,
    #[error("no geoip record found for {0}")]
    NotFound(IpAddr),
}

impl From<NotReady> for LookupError {
    fn from(_: NotReady) -> Self {
        LookupError::NotReady
    }
}

#[derive(Debug, Error)]
pub enum UnpackError {
    #[error("failed to open compressed file: {0}")]
    OpenSource(io::Error),
    #[error("corrupt or truncated gzip stream: {0}")]
    Decompress(io::Error),
    #[error("failed to write decompressed data: {0}")]
    Write(io::Error),
    #[error("decompressed data consumer closed early")]
    ConsumerClosed,
    #[error("decompress task aborted: {0}")]
    TaskAborted(JoinError),
}

#[derive(Debug, Error)]
pub enum RefreshError {
    #[error("fetch failed: {0:?}")]
    FetchFailed(anyhow::Error),
    #[error("decompress failed: {0}")]
    DecompressFailed(#[from] UnpackError),
    #[error("open failed: {0:?}")]
    OpenFailed(anyhow::Error),
}
