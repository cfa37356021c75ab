/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnapshotCacheSnapshot {
    pub refresh_total: u64,
    pub refresh_failed: u64,
    pub install_total: u64,
    pub close_total: u64,
}

impl SnapshotCacheSnapshot {
    /// Handles that are installed but not yet closed, either active or retired
    /// with readers still holding them.
    pub fn alive(&self) -> u64 {
        self.install_total.saturating_sub(self.close_total)
    }
}

#[derive(Default)]
pub struct SnapshotCacheStats {
    refresh_total: AtomicU64,
    refresh_failed: AtomicU64,
    install_total: AtomicU64,
    close_total: AtomicU64,
}

impl SnapshotCacheStats {
    pub fn snapshot(&self) -> SnapshotCacheSnapshot {
        SnapshotCacheSnapshot {
            refresh_total: self.refresh_total.load(Ordering::Relaxed),
            refresh_failed: self.refresh_failed.load(Ordering::Relaxed),
            install_total: self.install_total.load(Ordering::Acquire),
            close_total: self.close_total.load(Ordering::Acquire),
        }
    }

    pub(crate) fn add_refresh(&self) {
        self.refresh_total.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn add_refresh_failed(&self) {
        self.refresh_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn add_install(&self) {
        self.install_total.fetch_add(1, Ordering::Release);
    }

    pub(crate) fn add_close(&self) {
        self.close_total.fetch_add(1, Ordering::Release);
    }
}
