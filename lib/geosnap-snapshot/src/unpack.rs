/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

//! Streaming gzip decompression from one file to another.
//!
//! A blocking producer reads and decompresses the source file, and sends
//! chunks through a bounded channel to an async consumer which writes them to
//! a temporary file next to the destination. The temporary file is renamed
//! over the destination only when both sides succeed.
//!
//! Dropping the receiver is what stops the producer when the consumer fails,
//! and dropping the sender is what ends the consumer loop, so both sides are
//! released on every exit path.

use std::ffi::OsString;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Read};
use std::path::{Path, PathBuf};

use bytes::{Bytes, BytesMut};
use flate2::bufread::MultiGzDecoder;
use log::debug;
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;

use crate::{UnpackConfig, UnpackError};

fn temp_path(dst: &Path) -> PathBuf {
    let mut name = dst
        .file_name()
        .map(|s| s.to_os_string())
        .unwrap_or_else(|| OsString::from("dataset"));
    name.push(".tmp");
    dst.with_file_name(name)
}

fn produce(src: &Path, chunk_size: usize, sender: mpsc::Sender<Bytes>) -> Result<u64, UnpackError> {
    let file = File::open(src).map_err(UnpackError::OpenSource)?;
    let mut reader = BufReader::new(file);

    // an empty source is a valid empty stream
    if reader.fill_buf().map_err(UnpackError::Decompress)?.is_empty() {
        return Ok(0);
    }

    let mut decoder = MultiGzDecoder::new(reader);
    let mut total: u64 = 0;
    loop {
        let mut buf = BytesMut::zeroed(chunk_size);
        let nr = match decoder.read(&mut buf) {
            Ok(0) => return Ok(total),
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(UnpackError::Decompress(e)),
        };
        buf.truncate(nr);
        total += nr as u64;
        if sender.blocking_send(buf.freeze()).is_err() {
            return Err(UnpackError::ConsumerClosed);
        }
    }
}

async fn consume(receiver: &mut mpsc::Receiver<Bytes>, path: &Path) -> io::Result<u64> {
    let mut file = tokio::fs::File::create(path).await?;
    let mut total: u64 = 0;
    while let Some(chunk) = receiver.recv().await {
        file.write_all(&chunk).await?;
        total += chunk.len() as u64;
    }
    file.flush().await?;
    file.sync_all().await?;
    Ok(total)
}

/// Decompress `src` into `dst`, replacing `dst` atomically.
///
/// Return the size of the decompressed data.
pub async fn unpack_gzip_file(
    src: &Path,
    dst: &Path,
    config: &UnpackConfig,
) -> Result<u64, UnpackError> {
    let tmp = temp_path(dst);
    let (sender, mut receiver) = mpsc::channel::<Bytes>(config.pipe_capacity.get());

    let src_path = src.to_path_buf();
    let chunk_size = config.chunk_size.get();
    let producer = tokio::task::spawn_blocking(move || produce(&src_path, chunk_size, sender));

    let written = consume(&mut receiver, &tmp).await;
    drop(receiver);
    let produced = producer.await;

    let r = match (produced, written) {
        (_, Err(e)) => Err(UnpackError::Write(e)),
        (Err(e), Ok(_)) => Err(UnpackError::TaskAborted(e)),
        (Ok(Err(e)), Ok(_)) => Err(e),
        (Ok(Ok(nr)), Ok(nw)) => {
            debug_assert_eq!(nr, nw);
            tokio::fs::rename(&tmp, dst)
                .await
                .map(|_| nw)
                .map_err(UnpackError::Write)
        }
    };
    if r.is_err() {
        let _ = tokio::fs::remove_file(&tmp).await;
    } else {
        debug!("unpacked {} to {}", src.display(), dst.display());
    }
    r
}
