//! Streaming one archive through an install session

use crate::backend::{CommitSender, InstallSession, PackageInstaller, SessionParams, SessionWriter};
use crate::context::ArchiveInstallContext;
use firstrun_archive::{estimate_installed_size, inspect_archive, ArchiveMetadata};
use firstrun_errors::{Error, InstallError, UserFacingError};
use firstrun_events::{AppEvent, EventEmitter, FailureContext, InstallEvent};
use std::path::{Path, PathBuf};
use tokio::io::AsyncReadExt;

/// What a committed install looked like
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallReceipt {
    pub session_id: String,
    pub archive: PathBuf,
    /// Declared package id, if the archive metadata could be read
    pub package_id: Option<String>,
    pub bytes_written: u64,
    pub size_estimate: u64,
    /// Metadata was unreadable and the raw file size was used
    pub metadata_fallback: bool,
}

/// Install one archive through a fresh session.
///
/// The session is created in full-install mode with the context's installer
/// identity, the archive is streamed in `chunk_size` writes, flushed to disk
/// and closed, then committed with `commit_target` as the completion target.
/// Unreadable archive metadata only downgrades the size estimate. Any write
/// failure abandons the session before the error is returned.
///
/// # Errors
///
/// Returns `InstallError::NotAFile` for anything but a regular file, session
/// creation and commit failures, and `WriteFailed`, `Truncated` or
/// `EmptyArchive` when streaming fails.
pub async fn install_archive(
    installer: &dyn PackageInstaller,
    archive: &Path,
    ctx: &ArchiveInstallContext,
    commit_target: CommitSender,
) -> Result<InstallReceipt, Error> {
    let file_len = match tokio::fs::metadata(archive).await {
        Ok(meta) if meta.is_file() => meta.len(),
        _ => {
            return Err(InstallError::NotAFile {
                path: archive.display().to_string(),
            }
            .into())
        }
    };

    let metadata = match inspect_archive(archive).await {
        Ok(meta) => Some(meta),
        Err(e) => {
            tracing::warn!(
                archive = %archive.display(),
                error = %e,
                "archive metadata unreadable, using raw file size"
            );
            ctx.emit(AppEvent::Install(InstallEvent::MetadataFallback {
                archive: archive.to_path_buf(),
                reason: e.user_message().into_owned(),
                size_estimate: file_len,
            }));
            None
        }
    };
    let size_estimate = estimate_installed_size(metadata.as_ref(), file_len);
    let params = session_params(ctx, metadata.as_ref(), size_estimate);
    let package_id = params.package_id.clone();

    let session_id = installer.create_session(params).await?;
    let mut session = match installer.open_session(&session_id).await {
        Ok(session) => session,
        Err(err) => {
            installer.abandon_session(&session_id).await;
            ctx.emit(AppEvent::Install(InstallEvent::SessionAbandoned {
                session_id: Some(session_id),
                archive: archive.to_path_buf(),
                failure: FailureContext::from_error(&err),
            }));
            return Err(err.into());
        }
    };
    ctx.emit(AppEvent::Install(InstallEvent::SessionCreated {
        session_id: session_id.clone(),
        archive: archive.to_path_buf(),
        package_id: package_id.clone(),
        size_estimate,
    }));

    let streamed = stream_into(session.as_mut(), archive, file_len, ctx.chunk_size).await;
    let (bytes_written, chunks) = match streamed {
        Ok(done) => done,
        Err(err) => {
            session.abandon().await;
            ctx.emit(AppEvent::Install(InstallEvent::SessionAbandoned {
                session_id: Some(session_id),
                archive: archive.to_path_buf(),
                failure: FailureContext::from_error(&err),
            }));
            return Err(err.into());
        }
    };
    ctx.emit(AppEvent::Install(InstallEvent::Streamed {
        session_id: session_id.clone(),
        bytes: bytes_written,
        chunks,
    }));

    session.commit(commit_target).await?;
    ctx.emit(AppEvent::Install(InstallEvent::SessionCommitted {
        session_id: session_id.clone(),
        archive: archive.to_path_buf(),
    }));

    Ok(InstallReceipt {
        session_id,
        archive: archive.to_path_buf(),
        package_id,
        bytes_written,
        size_estimate,
        metadata_fallback: metadata.is_none(),
    })
}

fn session_params(
    ctx: &ArchiveInstallContext,
    metadata: Option<&ArchiveMetadata>,
    size_estimate: u64,
) -> SessionParams {
    let mut params = SessionParams::full_install(ctx.installer_identity.clone());
    params.size_estimate = size_estimate;
    if let Some(meta) = metadata {
        params.package_id = Some(meta.package_id().to_string());
        params.install_location = meta.install_location();
    }
    params
}

/// Copy the archive verbatim into the session.
///
/// Returns bytes written and the number of chunks.
async fn stream_into(
    session: &mut dyn InstallSession,
    archive: &Path,
    expected: u64,
    chunk_size: usize,
) -> Result<(u64, usize), InstallError> {
    let session_id = session.id().to_string();
    let write_failed = |e: &dyn std::fmt::Display| InstallError::WriteFailed {
        session_id: session_id.clone(),
        path: archive.display().to_string(),
        message: e.to_string(),
    };

    let name = archive
        .file_name()
        .map_or_else(|| "base.apk".to_string(), |n| n.to_string_lossy().into_owned());
    let mut writer = session.open_write(&name, expected).await?;
    let mut file = tokio::fs::File::open(archive)
        .await
        .map_err(|e| write_failed(&e))?;

    let mut buffer = vec![0u8; chunk_size.max(1)];
    let mut written = 0u64;
    let mut chunks = 0usize;
    loop {
        let read = file.read(&mut buffer).await.map_err(|e| write_failed(&e))?;
        if read == 0 {
            break;
        }
        writer
            .write(&buffer[..read])
            .await
            .map_err(|e| write_failed(&e))?;
        written += read as u64;
        chunks += 1;
    }

    finish_writer(writer).await.map_err(|e| write_failed(&e))?;

    if written == 0 {
        return Err(InstallError::EmptyArchive {
            path: archive.display().to_string(),
        });
    }
    if written != expected {
        return Err(InstallError::Truncated {
            path: archive.display().to_string(),
            written,
            expected,
        });
    }
    Ok((written, chunks))
}

async fn finish_writer(mut writer: Box<dyn SessionWriter>) -> std::io::Result<()> {
    writer.fsync().await?;
    writer.close().await
}
