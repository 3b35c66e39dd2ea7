#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Installable archive handling
//!
//! An archive is a tar file carrying a `manifest.toml` with a `[package]`
//! table next to its payload. The installer only needs the metadata to
//! size the install session, so inspection never unpacks anything.

mod manifest;

pub use manifest::{is_valid_package_id, ArchiveManifest, InstallLocation, PackageSection};

use firstrun_errors::{ArchiveError, Error, StorageError};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use tar::Archive;

/// Name of the metadata entry inside an archive
pub const METADATA_ENTRY: &str = "manifest.toml";

/// What inspection learned about an archive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveMetadata {
    pub package: PackageSection,
    /// Sum of the payload entry sizes, excluding the metadata entry
    pub payload_size: u64,
    /// Length of the archive file itself
    pub file_size: u64,
}

impl ArchiveMetadata {
    #[must_use]
    pub fn package_id(&self) -> &str {
        &self.package.id
    }

    #[must_use]
    pub fn install_location(&self) -> InstallLocation {
        self.package.install_location
    }
}

/// Estimate how many bytes the installed package will occupy.
///
/// Declared size first, then the payload sum, then the raw archive length.
#[must_use]
pub fn estimate_installed_size(metadata: Option<&ArchiveMetadata>, file_size: u64) -> u64 {
    match metadata {
        Some(meta) => meta
            .package
            .installed_size
            .filter(|size| *size > 0)
            .unwrap_or(if meta.payload_size > 0 {
                meta.payload_size
            } else {
                file_size
            }),
        None => file_size,
    }
}

/// Read the metadata of an archive without unpacking it
///
/// # Errors
///
/// Returns an error if:
/// - The path is not a regular file
/// - The archive cannot be read as tar
/// - The archive has no `manifest.toml`, or it does not parse
pub async fn inspect_archive(path: &Path) -> Result<ArchiveMetadata, Error> {
    let file_meta = tokio::fs::metadata(path)
        .await
        .map_err(|e| ArchiveError::Unreadable {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
    if !file_meta.is_file() {
        return Err(ArchiveError::NotAFile {
            path: path.display().to_string(),
        }
        .into());
    }

    let path = path.to_path_buf();
    let file_size = file_meta.len();
    tokio::task::spawn_blocking(move || read_metadata(&path, file_size))
        .await
        .map_err(|e| Error::internal(format!("inspect task failed: {e}")))?
}

fn read_metadata(path: &Path, file_size: u64) -> Result<ArchiveMetadata, Error> {
    let unreadable = |e: std::io::Error| ArchiveError::Unreadable {
        path: path.display().to_string(),
        message: e.to_string(),
    };

    let file = File::open(path).map_err(unreadable)?;
    let mut archive = Archive::new(file);

    let mut manifest_text = None;
    let mut payload_size = 0u64;

    for entry in archive.entries().map_err(unreadable)? {
        let mut entry = entry.map_err(unreadable)?;
        let entry_path = entry.path().map_err(unreadable)?.into_owned();

        if is_metadata_entry(&entry_path) {
            let mut text = String::new();
            entry.read_to_string(&mut text).map_err(unreadable)?;
            manifest_text = Some(text);
        } else if entry.header().entry_type().is_file() {
            payload_size = payload_size.saturating_add(entry.size());
        }
    }

    let text = manifest_text.ok_or_else(|| ArchiveError::MetadataMissing {
        path: path.display().to_string(),
    })?;
    let manifest = ArchiveManifest::from_toml(&text).map_err(|message| {
        ArchiveError::InvalidMetadata {
            path: path.display().to_string(),
            message,
        }
    })?;

    tracing::debug!(
        archive = %path.display(),
        package = %manifest.package.id,
        payload_size,
        "inspected archive"
    );

    Ok(ArchiveMetadata {
        package: manifest.package,
        payload_size,
        file_size,
    })
}

fn is_metadata_entry(path: &Path) -> bool {
    let mut components = path
        .components()
        .filter(|c| !matches!(c, std::path::Component::CurDir));
    matches!(
        (components.next(), components.next()),
        (Some(std::path::Component::Normal(name)), None) if name == METADATA_ENTRY
    )
}

/// Pack a directory into an archive
///
/// The directory must contain a `manifest.toml`. Entries are written in
/// deterministic mode so identical inputs produce identical archives.
///
/// # Errors
///
/// Returns an error if the manifest is missing or any file cannot be read
/// or written.
pub async fn create_archive(src: &Path, dest: &Path) -> Result<(), Error> {
    if !tokio::fs::try_exists(src.join(METADATA_ENTRY))
        .await
        .unwrap_or(false)
    {
        return Err(ArchiveError::MetadataMissing {
            path: src.display().to_string(),
        }
        .into());
    }

    if let Some(parent) = dest.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| StorageError::from_io_with_path(&e, parent))?;
    }

    let src = src.to_path_buf();
    let dest = dest.to_path_buf();

    tokio::task::spawn_blocking(move || {
        use std::io::BufWriter;

        let file = File::create(&dest).map_err(|e| StorageError::from_io_with_path(&e, &dest))?;
        let mut builder = tar::Builder::new(BufWriter::new(file));
        builder.mode(tar::HeaderMode::Deterministic);
        builder.follow_symlinks(false);

        let mut entries = collect_files(&src, PathBuf::new())?;
        entries.sort();
        for relative in entries {
            builder
                .append_path_with_name(src.join(&relative), &relative)
                .map_err(|e| StorageError::IoError {
                    message: e.to_string(),
                })?;
        }

        builder
            .into_inner()
            .and_then(|mut writer| std::io::Write::flush(&mut writer))
            .map_err(|e| StorageError::IoError {
                message: e.to_string(),
            })?;
        Ok::<(), Error>(())
    })
    .await
    .map_err(|e| Error::internal(format!("create task failed: {e}")))??;

    Ok(())
}

/// Relative paths of every regular file below `dir`
fn collect_files(root: &Path, relative: PathBuf) -> Result<Vec<PathBuf>, Error> {
    let dir = root.join(&relative);
    let mut files = Vec::new();
    let entries = std::fs::read_dir(&dir).map_err(|e| StorageError::from_io_with_path(&e, &dir))?;

    for entry in entries {
        let entry = entry.map_err(|e| StorageError::IoError {
            message: e.to_string(),
        })?;
        let file_type = entry.file_type().map_err(|e| StorageError::IoError {
            message: e.to_string(),
        })?;
        let child = relative.join(entry.file_name());
        if file_type.is_dir() {
            files.extend(collect_files(root, child)?);
        } else if file_type.is_file() {
            files.push(child);
        }
    }
    Ok(files)
}
