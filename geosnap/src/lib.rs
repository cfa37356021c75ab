/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::io;
use std::process::ExitCode;

use anyhow::anyhow;
use log::{info, warn};

pub mod build;
pub mod logger;
pub mod output;

mod opts;
pub use opts::{ProcArgs, add_args, parse_args};

use geosnap_snapshot::SnapshotCache;

async fn serve(proc_args: &ProcArgs, cache: &SnapshotCache) -> anyhow::Result<ExitCode> {
    let handle = cache
        .wait_ready(proc_args.wait_timeout)
        .await
        .map_err(|e| anyhow!("{e} after waiting {:?}", proc_args.wait_timeout))?;
    let (v4_count, v6_count) = handle.db().len();
    info!(
        "using geoip dataset generation {} with {v4_count} ipv4 and {v6_count} ipv6 networks",
        handle.generation()
    );
    drop(handle);

    let mut exit_code = ExitCode::SUCCESS;
    if !proc_args.ip_list.is_empty() {
        let timestamp = chrono::Utc::now().timestamp();
        let found = output::write_lookups(cache, &proc_args.ip_list, timestamp, &mut io::stdout())?;
        if found < proc_args.ip_list.len() {
            exit_code = ExitCode::FAILURE;
        }
    }

    if proc_args.watch {
        tokio::signal::ctrl_c()
            .await
            .map_err(|e| anyhow!("failed to wait for ctrl-c: {e}"))?;
        let stats = cache.stats().snapshot();
        info!(
            "quit after {} refresh, {} failed, {} installed",
            stats.refresh_total, stats.refresh_failed, stats.install_total
        );
    }

    Ok(exit_code)
}

pub async fn run(proc_args: ProcArgs) -> anyhow::Result<ExitCode> {
    let (cache, mut stop_handle) =
        geosnap_snapshot::spawn_snapshot_cache(proc_args.cache_config.clone())?;

    let r = serve(&proc_args, &cache).await;
    stop_handle.stop().await;

    let stats = cache.stats().clone();
    drop(cache);
    let snap = stats.snapshot();
    if snap.alive() != 0 {
        warn!("{} geoip dataset handles still in use at exit", snap.alive());
    }
    r
}
