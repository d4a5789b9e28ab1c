//! Chunked writes with short-write recovery.
//!
//! A payload of length `L` is cut into `ceil(L / P)` chunks of at most
//! `P = packet_limit` bytes. Each chunk is delivered by a write-all loop:
//! when the transport accepts fewer bytes than offered, the unsent tail is
//! offered again before moving on to the next chunk.
//!
//! ```text
//! payload ──► [chunk 0][chunk 1] ... [chunk n-1] ──► write_all_chunk ──► stream
//!                                                   (loops on short writes)
//! ```
//!
//! A write that returns `0` or an error aborts the send with
//! [`BetwireError::TransportWrite`]. Only partial success is retried.

use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::error::{BetwireError, Result};

/// Outcome of a chunked send.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WriteStats {
    /// Number of chunks the payload was split into.
    pub chunks: usize,
    /// Number of `write` calls issued (more than `chunks` after short writes).
    pub write_calls: usize,
    /// Total bytes written.
    pub bytes: usize,
}

/// Number of chunks a payload of `len` bytes needs with the given limit.
#[inline]
pub fn chunk_count(len: usize, packet_limit: usize) -> usize {
    len.div_ceil(packet_limit)
}

/// Write `payload` in chunks of at most `packet_limit` bytes, then flush.
///
/// # Errors
///
/// - [`BetwireError::Configuration`] if `packet_limit` is zero
/// - [`BetwireError::TransportWrite`] on a write error or a zero-byte write
pub async fn write_chunked<W>(
    writer: &mut W,
    payload: &[u8],
    packet_limit: usize,
) -> Result<WriteStats>
where
    W: AsyncWrite + Unpin,
{
    if packet_limit == 0 {
        return Err(BetwireError::Configuration(
            "packet_limit must be at least 1".into(),
        ));
    }

    let total = chunk_count(payload.len(), packet_limit);
    let mut stats = WriteStats::default();

    for (index, chunk) in payload.chunks(packet_limit).enumerate() {
        tracing::trace!(chunk = index + 1, of = total, len = chunk.len(), "writing chunk");
        stats.write_calls += write_all_chunk(writer, chunk).await?;
        stats.chunks += 1;
        stats.bytes += chunk.len();
    }

    writer.flush().await.map_err(BetwireError::TransportWrite)?;
    Ok(stats)
}

/// Write one chunk completely. Returns the number of `write` calls used.
async fn write_all_chunk<W>(writer: &mut W, chunk: &[u8]) -> Result<usize>
where
    W: AsyncWrite + Unpin,
{
    let mut offset = 0;
    let mut calls = 0;

    while offset < chunk.len() {
        let written = writer
            .write(&chunk[offset..])
            .await
            .map_err(BetwireError::TransportWrite)?;
        calls += 1;

        if written == 0 {
            return Err(BetwireError::TransportWrite(std::io::Error::new(
                std::io::ErrorKind::WriteZero,
                "write returned 0",
            )));
        }

        if offset + written < chunk.len() {
            tracing::trace!(
                requested = chunk.len() - offset,
                written,
                "short write, resending remainder"
            );
        }
        offset += written;
    }

    Ok(calls)
}
