/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use flume::{Sender, TrySendError};
use slog::{Drain, OwnedKVList, Record};

const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

#[derive(Clone, Debug)]
pub struct AsyncLogConfig {
    pub(crate) channel_capacity: usize,
    pub(crate) thread_name: String,
}

impl AsyncLogConfig {
    pub fn with_name(thread_name: &str) -> Self {
        AsyncLogConfig {
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            thread_name: thread_name.to_string(),
        }
    }

    pub fn set_channel_capacity(&mut self, capacity: usize) {
        self.channel_capacity = capacity.max(1);
    }
}

impl Default for AsyncLogConfig {
    fn default() -> Self {
        AsyncLogConfig::with_name("log-async")
    }
}

#[derive(Clone, Copy)]
pub(crate) enum LogDrop {
    FormatFailed,
    ChannelClosed,
    ChannelOverflow,
    PeerUnreachable,
}

#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogSnapshot {
    pub total: u64,
    pub passed: u64,
    pub size: u64,
    pub format_failed: u64,
    pub channel_closed: u64,
    pub channel_overflow: u64,
    pub peer_unreachable: u64,
}

impl LogSnapshot {
    pub fn dropped(&self) -> u64 {
        self.format_failed + self.channel_closed + self.channel_overflow + self.peer_unreachable
    }
}

/// Counters shared by the drain and its io thread.
#[derive(Default)]
pub struct LogStats {
    total: AtomicU64,
    passed: AtomicU64,
    size: AtomicU64,
    dropped: [AtomicU64; 4],
}

impl LogStats {
    pub fn snapshot(&self) -> LogSnapshot {
        let dropped = |reason: LogDrop| self.dropped[reason as usize].load(Ordering::Relaxed);
        LogSnapshot {
            total: self.total.load(Ordering::Relaxed),
            passed: self.passed.load(Ordering::Relaxed),
            size: self.size.load(Ordering::Relaxed),
            format_failed: dropped(LogDrop::FormatFailed),
            channel_closed: dropped(LogDrop::ChannelClosed),
            channel_overflow: dropped(LogDrop::ChannelOverflow),
            peer_unreachable: dropped(LogDrop::PeerUnreachable),
        }
    }

    pub(crate) fn add_passed(&self, size: usize) {
        self.passed.fetch_add(1, Ordering::Relaxed);
        self.size.fetch_add(size as u64, Ordering::Relaxed);
    }

    pub(crate) fn add_dropped(&self, reason: LogDrop) {
        self.dropped[reason as usize].fetch_add(1, Ordering::Relaxed);
    }
}

pub trait AsyncLogFormatter<T> {
    fn format_slog(&self, record: &Record, logger_values: &OwnedKVList) -> Result<T, slog::Error>;
}

/// A slog drain which formats in the caller thread and leaves the io work to
/// a separate thread.
///
/// Records are dropped, not blocked on, if the channel is full.
pub struct AsyncLogger<T, F>
where
    F: AsyncLogFormatter<T>,
{
    sender: Sender<T>,
    formatter: F,
    stats: Arc<LogStats>,
}

impl<T, F> AsyncLogger<T, F>
where
    F: AsyncLogFormatter<T>,
{
    pub fn new(sender: Sender<T>, formatter: F, stats: Arc<LogStats>) -> Self {
        AsyncLogger {
            sender,
            formatter,
            stats,
        }
    }

    pub fn stats(&self) -> &Arc<LogStats> {
        &self.stats
    }
}

impl<T, F> Drain for AsyncLogger<T, F>
where
    F: AsyncLogFormatter<T>,
{
    type Ok = ();
    type Err = slog::Error;

    fn log(&self, record: &Record, logger_values: &OwnedKVList) -> Result<(), slog::Error> {
        self.stats.total.fetch_add(1, Ordering::Relaxed);

        let value = self
            .formatter
            .format_slog(record, logger_values)
            .inspect_err(|_| self.stats.add_dropped(LogDrop::FormatFailed))?;
        match self.sender.try_send(value) {
            Ok(_) => {}
            Err(TrySendError::Full(_)) => self.stats.add_dropped(LogDrop::ChannelOverflow),
            Err(TrySendError::Disconnected(_)) => self.stats.add_dropped(LogDrop::ChannelClosed),
        }
        Ok(())
    }
}
