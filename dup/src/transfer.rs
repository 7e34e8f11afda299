use std::io::SeekFrom;
use std::path::{Path, PathBuf};

use dup_core::{DownloadSource, DriveClient, DriveError, DriveFile, UploadStatus};
use md5::Context;
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWrite, AsyncWriteExt};

use crate::error::VfsError;
use crate::vfs::RetryPolicy;

/// Resumable uploads require chunks in multiples of 256 KiB.
pub const UPLOAD_CHUNK_SIZE: usize = 8 * 256 * 1024;
pub const DOWNLOAD_CHUNK_SIZE: u64 = 4 * 1024 * 1024;

pub async fn upload_chunked(
    client: &DriveClient,
    retry: &RetryPolicy,
    name: &str,
    parent_id: &str,
    source: &Path,
    progress: &mut dyn FnMut(f64),
) -> Result<DriveFile, VfsError> {
    upload_with_chunk_size(client, retry, name, parent_id, source, UPLOAD_CHUNK_SIZE, progress)
        .await
}

async fn upload_with_chunk_size(
    client: &DriveClient,
    retry: &RetryPolicy,
    name: &str,
    parent_id: &str,
    source: &Path,
    chunk_size: usize,
    progress: &mut dyn FnMut(f64),
) -> Result<DriveFile, VfsError> {
    let mut file = tokio::fs::File::open(source).await?;
    let total = file.metadata().await?.len();
    let session = retry
        .run("start upload", DriveError::is_transport, || {
            client.start_resumable_upload(name, parent_id, total)
        })
        .await?;
    tracing::debug!(name, total, "upload session started");

    let mut offset = 0u64;
    let mut buffer = vec![0u8; chunk_size.max(1)];
    loop {
        file.seek(SeekFrom::Start(offset)).await?;
        let filled = read_full(&mut file, &mut buffer).await?;
        let chunk = &buffer[..filled];
        let status = retry
            .run("upload chunk", DriveError::is_transport, || {
                client.upload_chunk(&session, chunk.to_vec(), offset, total)
            })
            .await?;
        match status {
            UploadStatus::Complete(uploaded) => {
                progress(1.0);
                return Ok(uploaded);
            }
            UploadStatus::InProgress { received } => {
                if filled == 0 {
                    // Server still wants bytes but the source is exhausted.
                    return Err(VfsError::Io(std::io::Error::new(
                        std::io::ErrorKind::UnexpectedEof,
                        format!("{} changed during upload", source.display()),
                    )));
                }
                offset = received;
                if total > 0 {
                    progress(offset as f64 / total as f64);
                }
            }
        }
    }
}

async fn read_full(file: &mut tokio::fs::File, buffer: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buffer.len() {
        let read = file.read(&mut buffer[filled..]).await?;
        if read == 0 {
            break;
        }
        filled += read;
    }
    Ok(filled)
}

pub async fn download_chunked<W>(
    client: &DriveClient,
    retry: &RetryPolicy,
    source: &DownloadSource,
    sink: &mut W,
    expected_md5: Option<&str>,
    progress: &mut dyn FnMut(f64),
) -> Result<u64, VfsError>
where
    W: AsyncWrite + Unpin,
{
    download_with_chunk_size(
        client,
        retry,
        source,
        sink,
        expected_md5,
        DOWNLOAD_CHUNK_SIZE,
        progress,
    )
    .await
}

async fn download_with_chunk_size<W>(
    client: &DriveClient,
    retry: &RetryPolicy,
    source: &DownloadSource,
    sink: &mut W,
    expected_md5: Option<&str>,
    chunk_size: u64,
    progress: &mut dyn FnMut(f64),
) -> Result<u64, VfsError>
where
    W: AsyncWrite + Unpin,
{
    let mut md5 = expected_md5.map(|_| Context::new());
    let mut offset = 0u64;
    loop {
        let chunk = retry
            .run("download chunk", DriveError::is_transport, || {
                client.download_chunk(source, offset, chunk_size)
            })
            .await?;
        sink.write_all(&chunk.bytes).await?;
        if let Some(ctx) = md5.as_mut() {
            ctx.consume(&chunk.bytes);
        }
        offset += chunk.bytes.len() as u64;
        match chunk.total_size {
            Some(total) if total > 0 => progress((offset as f64 / total as f64).min(1.0)),
            _ => {}
        }
        if chunk.done {
            break;
        }
    }
    sink.flush().await?;
    progress(1.0);

    if let (Some(expected), Some(ctx)) = (expected_md5, md5) {
        let actual_md5 = format!("{:x}", ctx.compute());
        if !actual_md5.eq_ignore_ascii_case(expected) {
            return Err(VfsError::IntegrityMismatch {
                expected_md5: expected.to_ascii_lowercase(),
                actual_md5,
            });
        }
    }
    Ok(offset)
}

/// Sibling path used while a download is in flight: `out.pdf` -> `out.pdf.partial`.
pub fn partial_path(target: &Path) -> PathBuf {
    target.with_extension(format!(
        "{}partial",
        target
            .extension()
            .map(|ext| format!("{}.", ext.to_string_lossy()))
            .unwrap_or_default()
    ))
}
