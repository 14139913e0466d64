//! Merge-aware zip writer shared by the jar and assembly builders.

use std::collections::HashSet;
use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::entry::{ArchiveEntry, EntrySource};
use crate::error::ArchiveError;
use crate::manifest::{ManifestSpec, MANIFEST_PATH};

/// Zip writer enforcing the build's merge rule: the first writer of an
/// in-archive path wins, later duplicates are silently dropped.
pub(crate) struct ArchiveWriter {
    zip: ZipWriter<File>,
    seen: HashSet<String>,
    written: usize,
    skipped: usize,
}

impl ArchiveWriter {
    /// Wrap an output file. The file's current position becomes the archive
    /// start, which is how a prepended bootstrap script stays outside the
    /// zip structure.
    pub fn new(file: File) -> Self {
        Self {
            zip: ZipWriter::new(file),
            seen: HashSet::new(),
            written: 0,
            skipped: 0,
        }
    }

    /// Write the manifest as the first entry and reserve its path.
    pub fn write_manifest(&mut self, manifest: &ManifestSpec) -> Result<(), ArchiveError> {
        let options = FileOptions::default().compression_method(CompressionMethod::Deflated);
        self.zip.start_file(MANIFEST_PATH, options)?;
        self.zip.write_all(manifest.render().as_bytes())?;
        self.seen.insert(MANIFEST_PATH.to_string());
        self.written += 1;
        Ok(())
    }

    /// Add one entry under first-writer-wins. Returns whether the entry was
    /// written (false: duplicate path, dropped).
    pub fn add(&mut self, entry: ArchiveEntry) -> Result<bool, ArchiveError> {
        if !self.seen.insert(entry.archive_path.clone()) {
            tracing::trace!(path = %entry.archive_path, "dropping duplicate archive path");
            self.skipped += 1;
            return Ok(false);
        }
        let mut options = FileOptions::default().compression_method(CompressionMethod::Deflated);
        if let Some(modified) = entry.modified {
            options = options.last_modified_time(modified);
        }
        self.zip.start_file(entry.archive_path.as_str(), options)?;
        match entry.source {
            EntrySource::Bytes(bytes) => self.zip.write_all(&bytes)?,
            EntrySource::File(path) => {
                let mut file = File::open(&path)?;
                io::copy(&mut file, &mut self.zip)?;
            }
        }
        self.written += 1;
        Ok(true)
    }

    /// Finalize the central directory. Returns (written, skipped) counts.
    pub fn finish(mut self) -> Result<(usize, usize), ArchiveError> {
        self.zip.finish()?;
        Ok((self.written, self.skipped))
    }
}

/// Add owner/group/other execute bits to an artifact.
#[cfg(unix)]
pub(crate) fn add_execute_bits(path: &Path) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    let mut perms = std::fs::metadata(path)?.permissions();
    perms.set_mode(perms.mode() | 0o111);
    std::fs::set_permissions(path, perms)
}

#[cfg(not(unix))]
pub(crate) fn add_execute_bits(_path: &Path) -> io::Result<()> {
    Ok(())
}
