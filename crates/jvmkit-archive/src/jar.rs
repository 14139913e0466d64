//! Library jar construction.
//!
//! Merges input roots (loose files and directory trees) into a fresh jar at
//! a fixed location under the destination directory: manifest first, then
//! roots in order under first-writer-wins, preserving source modification
//! times. Every build starts from scratch; any prior output is removed.

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use jvmkit_core::observability;

use crate::entry::{archive_rel_path, ArchiveEntry};
use crate::error::ArchiveError;
use crate::manifest::ManifestSpec;
use crate::writer::ArchiveWriter;

/// Fixed output name inside the destination directory. Concurrent builds
/// into the same destination are the caller's responsibility to serialize.
pub const JAR_FILE_NAME: &str = "out.jar";

/// Build `dest_dir/out.jar` from `input_roots`. Every root must exist.
pub fn build_jar(
    dest_dir: &Path,
    input_roots: &[PathBuf],
    main_class: Option<&str>,
) -> Result<PathBuf, ArchiveError> {
    for root in input_roots {
        if !root.exists() {
            return Err(ArchiveError::MissingInput(root.clone()));
        }
    }

    fs::create_dir_all(dest_dir)?;
    let out = dest_dir.join(JAR_FILE_NAME);
    if out.exists() {
        fs::remove_file(&out)?;
    }

    let mut writer = ArchiveWriter::new(File::create(&out)?);
    writer.write_manifest(&ManifestSpec::new(main_class))?;
    for root in input_roots {
        merge_root(&mut writer, root)?;
    }
    let (written, skipped) = writer.finish()?;

    observability::audit_artifact_written("jar", &out.display().to_string(), written, skipped);
    Ok(out)
}

/// Merge one root: a lone file maps to its base name at archive root, a
/// directory contributes every contained file under its relative path.
pub(crate) fn merge_root(writer: &mut ArchiveWriter, root: &Path) -> Result<(), ArchiveError> {
    if root.is_dir() {
        for entry in WalkDir::new(root).sort_by_file_name() {
            let entry = entry.map_err(io::Error::from)?;
            if !entry.file_type().is_file() {
                continue;
            }
            let rel = match entry.path().strip_prefix(root) {
                Ok(rel) => rel,
                Err(_) => continue,
            };
            writer.add(ArchiveEntry::from_file(archive_rel_path(rel), entry.path())?)?;
        }
    } else {
        let name = root
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        writer.add(ArchiveEntry::from_file(name, root)?)?;
    }
    Ok(())
}
