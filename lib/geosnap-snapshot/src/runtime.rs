/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::sync::Arc;
use std::time::Duration;

use anyhow::anyhow;
use log::{debug, info, warn};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::{DatasetHandle, DatasetSource, RefreshError, SnapshotCache, SnapshotCacheConfig};

struct SnapshotRefreshRuntime {
    config: SnapshotCacheConfig,
    source: Arc<dyn DatasetSource>,
    cache: Arc<SnapshotCache>,
    generation: u64,
}

impl SnapshotRefreshRuntime {
    async fn run(mut self, mut quit_receiver: oneshot::Receiver<()>) {
        info!(
            "geoip snapshot cache started, source: {}",
            self.source.describe()
        );

        let mut backoff = self.config.retry_min_interval;
        loop {
            self.cache.stats().add_refresh();
            let wait = match self.refresh().await {
                Ok(_) => {
                    backoff = self.config.retry_min_interval;
                    self.config.refresh_interval
                }
                Err(e) => {
                    self.cache.stats().add_refresh_failed();
                    let wait = backoff;
                    backoff = backoff
                        .saturating_mul(2)
                        .min(self.config.retry_max_interval);
                    if self.generation > 0 {
                        warn!(
                            "geoip dataset refresh failed, generation {} kept in use, retry in {wait:?}: {e}",
                            self.generation
                        );
                    } else {
                        warn!("geoip dataset refresh failed, no dataset available yet, retry in {wait:?}: {e}");
                    }
                    wait
                }
            };

            tokio::select! {
                biased;

                _ = &mut quit_receiver => break,
                _ = tokio::time::sleep(wait) => {}
            }
        }

        info!("geoip snapshot cache quit");
    }

    async fn refresh(&mut self) -> Result<u64, RefreshError> {
        let download_path = self.config.download_path();
        let dataset_path = self.config.dataset_path();

        tokio::fs::create_dir_all(&self.config.work_dir)
            .await
            .map_err(|e| {
                RefreshError::FetchFailed(anyhow!(
                    "failed to create work dir {}: {e}",
                    self.config.work_dir.display()
                ))
            })?;

        let size = self
            .source
            .fetch(&download_path)
            .await
            .map_err(RefreshError::FetchFailed)?;
        debug!(
            "fetched {size} bytes from {} to {}",
            self.source.describe(),
            download_path.display()
        );

        crate::unpack::unpack_gzip_file(&download_path, &dataset_path, &self.config.unpack)
            .await?;

        let path = dataset_path.clone();
        let db = tokio::task::spawn_blocking(move || geosnap_geoip_db::file::load_city(&path))
            .await
            .map_err(|e| RefreshError::OpenFailed(anyhow!("dataset load task aborted: {e}")))?
            .map_err(RefreshError::OpenFailed)?;
        if db.is_empty() {
            return Err(RefreshError::OpenFailed(anyhow!(
                "no records found in dataset file {}",
                dataset_path.display()
            )));
        }
        let (v4_count, v6_count) = db.len();

        self.generation += 1;
        let handle = DatasetHandle::new(
            self.generation,
            dataset_path,
            db,
            self.cache.stats().clone(),
        );
        info!(
            "geoip dataset generation {} installed with {v4_count} ipv4 and {v6_count} ipv6 networks",
            self.generation
        );
        if let Some(retired) = self.cache.install(handle) {
            debug!(
                "geoip dataset generation {} retired, will be closed after its last reader",
                retired.generation()
            );
        }
        Ok(self.generation)
    }
}

/// Stop the refresh task of a snapshot cache.
///
/// Dropping this handle without calling `stop` also ends the task at its next
/// wait point, but nothing waits for it.
pub struct SnapshotCacheStopHandle {
    quit_sender: Option<oneshot::Sender<()>>,
    join_handle: Option<JoinHandle<()>>,
}

impl SnapshotCacheStopHandle {
    /// Ask the refresh task to quit and wait for it.
    ///
    /// A refresh cycle already running is allowed to finish, including its
    /// install step. Calling this more than once is fine.
    pub async fn stop(&mut self) {
        if let Some(sender) = self.quit_sender.take() {
            let _ = sender.send(());
        }
        if let Some(handle) = self.join_handle.take() {
            if let Err(e) = handle.await {
                warn!("geoip snapshot refresh task join error: {e}");
            }
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.join_handle.is_none()
    }
}

/// Spawn the refresh task on the current tokio runtime, using the source
/// described in the config.
///
/// The returned cache starts empty. Use `SnapshotCache::wait_ready` to wait
/// for the first install.
pub fn spawn_snapshot_cache(
    config: SnapshotCacheConfig,
) -> anyhow::Result<(Arc<SnapshotCache>, SnapshotCacheStopHandle)> {
    let source = config.source.build()?;
    spawn_snapshot_cache_with_source(config, source)
}

pub fn spawn_snapshot_cache_with_source(
    config: SnapshotCacheConfig,
    source: Arc<dyn DatasetSource>,
) -> anyhow::Result<(Arc<SnapshotCache>, SnapshotCacheStopHandle)> {
    config.check()?;

    let cache = Arc::new(SnapshotCache::new());
    let (quit_sender, quit_receiver) = oneshot::channel();
    let runtime = SnapshotRefreshRuntime {
        config,
        source,
        cache: cache.clone(),
        generation: 0,
    };
    let join_handle = tokio::spawn(runtime.run(quit_receiver));

    Ok((
        cache,
        SnapshotCacheStopHandle {
            quit_sender: Some(quit_sender),
            join_handle: Some(join_handle),
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::IpAddr;
    use std::path::Path;
    use std::str::FromStr;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use tokio::sync::{Notify, Semaphore};

    use crate::{DatasetSourceConfig, LookupError, NotReady, SnapshotCacheSnapshot, test_util};

    struct MockSource {
        data: Vec<u8>,
        fail_after: Option<usize>,
        fetch_count: AtomicUsize,
        gate: Option<Arc<Semaphore>>,
        started: Arc<Notify>,
    }

    impl MockSource {
        fn new(entries: usize) -> Self {
            MockSource {
                data: test_util::gzip(test_util::city_csv(entries).as_bytes()),
                fail_after: None,
                fetch_count: AtomicUsize::new(0),
                gate: None,
                started: Arc::new(Notify::new()),
            }
        }

        fn fail_after(mut self, count: usize) -> Self {
            self.fail_after = Some(count);
            self
        }

        fn gated(mut self, gate: Arc<Semaphore>) -> Self {
            self.gate = Some(gate);
            self
        }
    }

    #[async_trait]
    impl DatasetSource for MockSource {
        fn describe(&self) -> String {
            "mock".to_string()
        }

        async fn fetch(&self, dst: &Path) -> anyhow::Result<u64> {
            let count = self.fetch_count.fetch_add(1, Ordering::Relaxed);
            self.started.notify_one();
            if let Some(gate) = &self.gate {
                let permit = gate.acquire().await?;
                permit.forget();
            }
            if let Some(limit) = self.fail_after {
                if count >= limit {
                    return Err(anyhow!("mock fetch failure"));
                }
            }
            tokio::fs::write(dst, &self.data).await?;
            Ok(self.data.len() as u64)
        }
    }

    fn fast_config(work_dir: &Path, refresh_interval: Duration) -> SnapshotCacheConfig {
        let mut config =
            SnapshotCacheConfig::new(DatasetSourceConfig::File(work_dir.join("unused.csv.gz")));
        config.set_work_dir(work_dir.to_path_buf());
        config.set_refresh_interval(refresh_interval);
        config.set_retry_min_interval(Duration::from_millis(5));
        config.set_retry_max_interval(Duration::from_millis(20));
        config
    }

    async fn wait_stats<F>(cache: &SnapshotCache, f: F) -> SnapshotCacheSnapshot
    where
        F: Fn(&SnapshotCacheSnapshot) -> bool,
    {
        tokio::time::timeout(Duration::from_secs(10), async {
            loop {
                let snap = cache.stats().snapshot();
                if f(&snap) {
                    return snap;
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap()
    }

    fn ip(s: &str) -> IpAddr {
        IpAddr::from_str(s).unwrap()
    }

    #[tokio::test]
    async fn file_source_lifecycle() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("source.csv.gz");
        std::fs::write(
            &src,
            test_util::gzip(test_util::city_csv(10).as_bytes()),
        )
        .unwrap();

        let work_dir = dir.path().join("work");
        let mut config = SnapshotCacheConfig::new(DatasetSourceConfig::File(src));
        config.set_work_dir(work_dir.clone());

        let (cache, mut stop_handle) = spawn_snapshot_cache(config).unwrap();
        assert_eq!(cache.get().err(), Some(NotReady));
        assert_eq!(cache.lookup(ip("10.0.1.1")), Err(LookupError::NotReady));

        let handle = cache.wait_ready(Duration::from_secs(10)).await.unwrap();
        assert_eq!(handle.generation(), 1);
        assert_eq!(handle.db().len(), (10, 0));
        assert_eq!(handle.path(), work_dir.join("GeoLite2-City.csv"));
        drop(handle);

        let record = cache.lookup(ip("10.0.5.20")).unwrap();
        assert_eq!(record.city.as_deref(), Some("City5"));
        assert_eq!(
            cache.lookup(ip("10.1.0.1")),
            Err(LookupError::NotFound(ip("10.1.0.1")))
        );
        assert!(work_dir.join("GeoLite2-City.csv.gz").is_file());

        stop_handle.stop().await;
        assert!(stop_handle.is_stopped());

        let stats = cache.stats().clone();
        assert_eq!(stats.snapshot().close_total, 0);
        drop(cache);
        let snap = stats.snapshot();
        assert_eq!(snap.install_total, 1);
        assert_eq!(snap.close_total, 1);
        assert_eq!(snap.alive(), 0);
    }

    #[tokio::test]
    async fn retire_on_each_cycle() {
        let dir = tempfile::tempdir().unwrap();
        let config = fast_config(dir.path(), Duration::from_millis(10));
        let (cache, mut stop_handle) =
            spawn_snapshot_cache_with_source(config, Arc::new(MockSource::new(10))).unwrap();

        wait_stats(&cache, |s| s.install_total >= 3).await;
        stop_handle.stop().await;

        let snap = cache.stats().snapshot();
        assert_eq!(snap.refresh_failed, 0);
        assert_eq!(snap.close_total, snap.install_total - 1);
        assert_eq!(cache.get().unwrap().generation(), snap.install_total);

        let stats = cache.stats().clone();
        drop(cache);
        let snap = stats.snapshot();
        assert_eq!(snap.close_total, snap.install_total);
    }

    #[tokio::test]
    async fn reader_keeps_retired_handle() {
        let dir = tempfile::tempdir().unwrap();
        let config = fast_config(dir.path(), Duration::from_millis(10));
        let (cache, mut stop_handle) =
            spawn_snapshot_cache_with_source(config, Arc::new(MockSource::new(4))).unwrap();

        let first = cache.wait_ready(Duration::from_secs(10)).await.unwrap();
        assert_eq!(first.generation(), 1);
        wait_stats(&cache, |s| s.install_total >= 3).await;
        stop_handle.stop().await;

        // the first handle is retired but still usable
        assert_eq!(first.lookup(ip("10.0.2.2")).unwrap().city.as_deref(), Some("City2"));
        let snap = cache.stats().snapshot();
        assert_eq!(snap.close_total, snap.install_total - 2);
        drop(first);
        let snap = cache.stats().snapshot();
        assert_eq!(snap.close_total, snap.install_total - 1);
    }

    #[tokio::test]
    async fn stop_while_waiting() {
        let dir = tempfile::tempdir().unwrap();
        let config = fast_config(dir.path(), Duration::from_secs(3600));
        let (cache, mut stop_handle) =
            spawn_snapshot_cache_with_source(config, Arc::new(MockSource::new(1))).unwrap();

        cache.wait_ready(Duration::from_secs(10)).await.unwrap();
        tokio::time::timeout(Duration::from_secs(5), stop_handle.stop())
            .await
            .unwrap();
        assert!(stop_handle.is_stopped());
        stop_handle.stop().await;

        assert_eq!(cache.stats().snapshot().refresh_total, 1);
        assert!(cache.lookup(ip("10.0.0.1")).is_ok());
    }

    #[tokio::test]
    async fn stop_during_fetch() {
        let dir = tempfile::tempdir().unwrap();
        let gate = Arc::new(Semaphore::new(0));
        let source = MockSource::new(2).gated(gate.clone());
        let started = source.started.clone();
        let config = fast_config(dir.path(), Duration::from_secs(3600));
        let (cache, mut stop_handle) =
            spawn_snapshot_cache_with_source(config, Arc::new(source)).unwrap();

        started.notified().await;
        let stop_task = tokio::spawn(async move {
            stop_handle.stop().await;
            stop_handle
        });

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!stop_task.is_finished());
        assert_eq!(cache.get().err(), Some(NotReady));

        gate.add_permits(1);
        let stop_handle = tokio::time::timeout(Duration::from_secs(10), stop_task)
            .await
            .unwrap()
            .unwrap();
        assert!(stop_handle.is_stopped());

        // the in-flight cycle completed its install before quitting
        assert_eq!(cache.get().unwrap().generation(), 1);
        assert_eq!(cache.stats().snapshot().refresh_total, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn refresh_interval_after_install() {
        let dir = tempfile::tempdir().unwrap();
        let gate = Arc::new(Semaphore::new(0));
        let source = MockSource::new(2).gated(gate.clone());
        let started = source.started.clone();
        let config = fast_config(dir.path(), Duration::from_secs(60));
        let (cache, mut stop_handle) =
            spawn_snapshot_cache_with_source(config, Arc::new(source)).unwrap();

        started.notified().await;
        let first_fetch = tokio::time::Instant::now();

        // the first fetch runs longer than the refresh interval
        tokio::time::sleep(Duration::from_secs(120)).await;
        gate.add_permits(1);
        started.notified().await;
        let elapsed = first_fetch.elapsed();
        assert_eq!(cache.get().unwrap().generation(), 1);
        assert!(elapsed >= Duration::from_secs(180), "next fetch after {elapsed:?}");
        assert!(elapsed < Duration::from_secs(181), "next fetch after {elapsed:?}");

        gate.add_permits(1);
        stop_handle.stop().await;
        assert_eq!(cache.get().unwrap().generation(), 2);
        assert_eq!(cache.stats().snapshot().refresh_total, 2);
    }

    #[tokio::test]
    async fn failure_keeps_previous() {
        let dir = tempfile::tempdir().unwrap();
        let config = fast_config(dir.path(), Duration::from_millis(5));
        let (cache, mut stop_handle) = spawn_snapshot_cache_with_source(
            config,
            Arc::new(MockSource::new(3).fail_after(1)),
        )
        .unwrap();

        let snap = wait_stats(&cache, |s| s.refresh_failed >= 3).await;
        assert_eq!(snap.install_total, 1);

        let handle = cache.get().unwrap();
        assert_eq!(handle.generation(), 1);
        assert_eq!(handle.lookup(ip("10.0.2.9")).unwrap().city.as_deref(), Some("City2"));
        drop(handle);

        stop_handle.stop().await;
        assert_eq!(cache.stats().snapshot().close_total, 0);
    }

    #[tokio::test]
    async fn failure_before_first_install() {
        let dir = tempfile::tempdir().unwrap();
        let config = fast_config(dir.path(), Duration::from_millis(5));
        let (cache, mut stop_handle) = spawn_snapshot_cache_with_source(
            config,
            Arc::new(MockSource::new(3).fail_after(0)),
        )
        .unwrap();

        wait_stats(&cache, |s| s.refresh_failed >= 2).await;
        assert_eq!(cache.get().err(), Some(NotReady));
        assert!(cache.wait_ready(Duration::from_millis(10)).await.is_err());

        stop_handle.stop().await;
        assert_eq!(cache.stats().snapshot().install_total, 0);
    }

    #[tokio::test]
    async fn corrupt_dataset_keeps_previous() {
        struct SwitchSource {
            good: Vec<u8>,
            empty: Vec<u8>,
            count: AtomicUsize,
        }

        #[async_trait]
        impl DatasetSource for SwitchSource {
            fn describe(&self) -> String {
                "switch".to_string()
            }

            async fn fetch(&self, dst: &Path) -> anyhow::Result<u64> {
                let data: &[u8] = match self.count.fetch_add(1, Ordering::Relaxed) {
                    0 => &self.good,
                    1 => b"broken gzip data",
                    2 => &self.empty,
                    _ => b"",
                };
                tokio::fs::write(dst, data).await?;
                Ok(data.len() as u64)
            }
        }

        let dir = tempfile::tempdir().unwrap();
        let config = fast_config(dir.path(), Duration::from_millis(5));
        let source = SwitchSource {
            good: test_util::gzip(test_util::city_csv(5).as_bytes()),
            empty: test_util::gzip(test_util::city_csv(0).as_bytes()),
            count: AtomicUsize::new(0),
        };
        let (cache, mut stop_handle) =
            spawn_snapshot_cache_with_source(config, Arc::new(source)).unwrap();

        // broken gzip, header only, empty file
        wait_stats(&cache, |s| s.refresh_failed >= 3).await;
        stop_handle.stop().await;

        let snap = cache.stats().snapshot();
        assert_eq!(snap.install_total, 1);
        assert_eq!(cache.get().unwrap().generation(), 1);
        assert!(cache.lookup(ip("10.0.4.4")).is_ok());
        assert!(!dir.path().join("GeoLite2-City.csv.tmp").exists());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_readers() {
        let dir = tempfile::tempdir().unwrap();
        let config = fast_config(dir.path(), Duration::from_millis(2));
        let (cache, mut stop_handle) =
            spawn_snapshot_cache_with_source(config, Arc::new(MockSource::new(10))).unwrap();
        cache.wait_ready(Duration::from_secs(10)).await.unwrap();

        let mut readers = Vec::new();
        for i in 0..4u8 {
            let cache = cache.clone();
            readers.push(tokio::spawn(async move {
                let ip = IpAddr::from([10, 0, i, 1]);
                let mut last = 0;
                for _ in 0..200 {
                    let handle = cache.get().unwrap();
                    assert!(handle.generation() >= last);
                    last = handle.generation();
                    let expected = format!("City{i}");
                    assert_eq!(handle.lookup(ip).unwrap().city.as_deref(), Some(expected.as_str()));
                    drop(handle);
                    tokio::time::sleep(Duration::from_micros(500)).await;
                }
                last
            }));
        }
        for reader in readers {
            assert!(reader.await.unwrap() >= 1);
        }

        stop_handle.stop().await;
        let snap = cache.stats().snapshot();
        assert_eq!(snap.close_total, snap.install_total - 1);
    }

    #[tokio::test]
    async fn invalid_config() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = fast_config(dir.path(), Duration::from_secs(1));
        config.set_retry_min_interval(Duration::from_secs(10));
        assert!(spawn_snapshot_cache_with_source(config, Arc::new(MockSource::new(1))).is_err());
    }
}
