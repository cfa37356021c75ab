/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwapOption;
use tokio::sync::watch;

use geosnap_geoip_db::GeoIpCityRecord;

use crate::{DatasetHandle, LookupError, NotReady, SnapshotCacheStats};

/// The slot holding the active dataset handle.
///
/// Readers never wait for a refresh: they load the current `Arc` and go.
/// The refresh task is the only writer.
pub struct SnapshotCache {
    current: ArcSwapOption<DatasetHandle>,
    installed: watch::Sender<u64>,
    stats: Arc<SnapshotCacheStats>,
}

impl SnapshotCache {
    pub(crate) fn new() -> Self {
        let (installed, _) = watch::channel(0);
        SnapshotCache {
            current: ArcSwapOption::new(None),
            installed,
            stats: Arc::new(SnapshotCacheStats::default()),
        }
    }

    pub fn get(&self) -> Result<Arc<DatasetHandle>, NotReady> {
        self.current.load_full().ok_or(NotReady)
    }

    pub fn lookup(&self, ip: IpAddr) -> Result<GeoIpCityRecord, LookupError> {
        let guard = self.current.load();
        let handle = guard.as_ref().ok_or(LookupError::NotReady)?;
        handle.lookup(ip).cloned()
    }

    /// Wait for the first install, or return `NotReady` on timeout.
    pub async fn wait_ready(&self, timeout: Duration) -> Result<Arc<DatasetHandle>, NotReady> {
        let mut receiver = self.installed.subscribe();
        let installed = tokio::time::timeout(timeout, receiver.wait_for(|g| *g > 0))
            .await
            .map(|r| r.is_ok())
            .unwrap_or(false);
        if installed { self.get() } else { Err(NotReady) }
    }

    pub fn stats(&self) -> &Arc<SnapshotCacheStats> {
        &self.stats
    }

    /// Publish the new handle and return the retired one.
    pub(crate) fn install(&self, handle: DatasetHandle) -> Option<Arc<DatasetHandle>> {
        let generation = handle.generation();
        let retired = self.current.swap(Some(Arc::new(handle)));
        self.stats.add_install();
        self.installed.send_replace(generation);
        retired
    }
}
