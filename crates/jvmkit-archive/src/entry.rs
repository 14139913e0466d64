//! Canonical "path inside an archive maps to these bytes" model shared by
//! the jar and assembly builders.

use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::time::SystemTime;

use chrono::{Datelike, Timelike};

/// Where an entry's content comes from: bytes already in memory (exploded
/// from a nested archive) or a file read at write time.
#[derive(Debug, Clone)]
pub enum EntrySource {
    Bytes(Vec<u8>),
    File(PathBuf),
}

/// One archive entry. In-archive paths are unique within a build; the
/// writer enforces first-occurrence-wins.
#[derive(Debug, Clone)]
pub struct ArchiveEntry {
    /// Forward-slash separated path inside the archive.
    pub archive_path: String,
    pub source: EntrySource,
    /// Original modification time, when known. Missing timestamps fall back
    /// to the zip epoch.
    pub modified: Option<zip::DateTime>,
}

impl ArchiveEntry {
    /// Entry backed by a file on disk, preserving its modification time.
    pub fn from_file(archive_path: String, path: &Path) -> io::Result<Self> {
        let modified = fs::metadata(path)?.modified().ok().map(zip_datetime);
        Ok(Self {
            archive_path,
            source: EntrySource::File(path.to_path_buf()),
            modified,
        })
    }

    /// Entry backed by in-memory bytes.
    pub fn from_bytes(archive_path: String, bytes: Vec<u8>, modified: Option<zip::DateTime>) -> Self {
        Self {
            archive_path,
            source: EntrySource::Bytes(bytes),
            modified,
        }
    }
}

/// Render a relative filesystem path as an in-archive path
/// (forward slashes on every platform).
pub(crate) fn archive_rel_path(rel: &Path) -> String {
    rel.components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Decompose a filesystem mtime into a zip timestamp. Times outside the zip
/// range (pre-1980) collapse to the zip epoch.
pub(crate) fn zip_datetime(time: SystemTime) -> zip::DateTime {
    let local: chrono::DateTime<chrono::Local> = time.into();
    zip::DateTime::from_date_and_time(
        local.year() as u16,
        local.month() as u8,
        local.day() as u8,
        local.hour() as u8,
        local.minute() as u8,
        local.second() as u8,
    )
    .unwrap_or_default()
}
