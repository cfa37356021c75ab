/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

mod config;
pub use config::{DatasetSourceConfig, HttpSourceConfig, SnapshotCacheConfig, UnpackConfig};

mod error;
pub use error::{LookupError, NotReady, RefreshError, UnpackError};

mod stats;
pub use stats::{SnapshotCacheSnapshot, SnapshotCacheStats};

mod handle;
pub use handle::DatasetHandle;

mod cache;
pub use cache::SnapshotCache;

pub mod source;
pub use source::DatasetSource;

pub mod unpack;

mod runtime;
pub use runtime::{SnapshotCacheStopHandle, spawn_snapshot_cache, spawn_snapshot_cache_with_source};

#[cfg(test)]
mod test_util;
