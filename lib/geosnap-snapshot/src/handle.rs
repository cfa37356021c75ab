/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::debug;

use geosnap_geoip_db::{GeoIpCityDb, GeoIpCityRecord};

use crate::{LookupError, SnapshotCacheStats};

/// An opened, read-only dataset.
///
/// Handles are shared through `Arc`. A handle replaced by a newer one keeps
/// working for readers that still hold it, and is closed when the last of
/// them releases it.
pub struct DatasetHandle {
    generation: u64,
    path: PathBuf,
    db: GeoIpCityDb,
    stats: Arc<SnapshotCacheStats>,
}

impl DatasetHandle {
    pub(crate) fn new(
        generation: u64,
        path: PathBuf,
        db: GeoIpCityDb,
        stats: Arc<SnapshotCacheStats>,
    ) -> Self {
        DatasetHandle {
            generation,
            path,
            db,
            stats,
        }
    }

    /// The install sequence number, starting from 1.
    #[inline]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    #[inline]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[inline]
    pub fn db(&self) -> &GeoIpCityDb {
        &self.db
    }

    pub fn lookup(&self, ip: IpAddr) -> Result<&GeoIpCityRecord, LookupError> {
        self.db.lookup(ip).ok_or(LookupError::NotFound(ip))
    }
}

impl Drop for DatasetHandle {
    fn drop(&mut self) {
        self.stats.add_close();
        debug!("geoip dataset generation {} closed", self.generation);
    }
}
