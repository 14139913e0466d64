//! Self-contained executable assembly construction.
//!
//! Same manifest-first, first-writer-wins merge as the jar builder, with two
//! additions: input roots that are themselves archives are exploded
//! entry-by-entry (so one assembly absorbs dependency jars), and an optional
//! bootstrap script is written ahead of the archive content with execute
//! bits set, making the output directly runnable while remaining a valid
//! trailing archive.

use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use zip::ZipArchive;

use jvmkit_core::observability;

use crate::entry::ArchiveEntry;
use crate::error::ArchiveError;
use crate::jar::{merge_root, JAR_FILE_NAME};
use crate::manifest::ManifestSpec;
use crate::writer::{add_execute_bits, ArchiveWriter};

/// Build `dest_dir/out.jar` from `input_roots`, optionally prefixed with a
/// bootstrap script.
///
/// An empty `input_roots` short-circuits to an empty artifact: no manifest,
/// no entries, no script. Roots that have vanished are skipped; roots that
/// are archive files are merged entry-by-entry.
pub fn build_assembly(
    dest_dir: &Path,
    input_roots: &[PathBuf],
    main_class: Option<&str>,
    prepend_script: Option<&str>,
) -> Result<PathBuf, ArchiveError> {
    fs::create_dir_all(dest_dir)?;
    let out = dest_dir.join(JAR_FILE_NAME);
    if out.exists() {
        fs::remove_file(&out)?;
    }

    if input_roots.is_empty() {
        File::create(&out)?;
        observability::audit_artifact_written("assembly", &out.display().to_string(), 0, 0);
        return Ok(out);
    }

    let mut file = File::create(&out)?;
    if let Some(script) = prepend_script {
        file.write_all(script.as_bytes())?;
        file.write_all(b"\n")?;
        file.flush()?;
        // Executable before any archive content lands, so the artifact is
        // runnable the moment it is complete.
        add_execute_bits(&out)?;
    }

    let mut writer = ArchiveWriter::new(file);
    writer.write_manifest(&ManifestSpec::new(main_class))?;
    for root in input_roots {
        if !root.exists() {
            tracing::debug!(root = %root.display(), "skipping vanished assembly input");
            continue;
        }
        if is_archive_file(root) {
            merge_archive(&mut writer, root)?;
        } else {
            merge_root(&mut writer, root)?;
        }
    }
    let (written, skipped) = writer.finish()?;

    observability::audit_artifact_written("assembly", &out.display().to_string(), written, skipped);
    Ok(out)
}

fn is_archive_file(path: &Path) -> bool {
    path.is_file()
        && path
            .extension()
            .and_then(|e| e.to_str())
            .map_or(false, |ext| {
                ext.eq_ignore_ascii_case("jar") || ext.eq_ignore_ascii_case("zip")
            })
}

/// Explode an existing archive into the assembly: every non-directory entry
/// merges as if it were a loose file, keeping its recorded timestamp.
fn merge_archive(writer: &mut ArchiveWriter, path: &Path) -> Result<(), ArchiveError> {
    let mut archive = ZipArchive::new(File::open(path)?)?;
    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        if entry.is_dir() {
            continue;
        }
        let name = entry.name().to_string();
        let modified = entry.last_modified();
        let mut bytes = Vec::new();
        entry.read_to_end(&mut bytes)?;
        writer.add(ArchiveEntry::from_bytes(name, bytes, Some(modified)))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jar::build_jar;
    use std::collections::BTreeSet;

    fn entry_names(path: &Path) -> BTreeSet<String> {
        let mut archive = ZipArchive::new(File::open(path).unwrap()).unwrap();
        (0..archive.len())
            .map(|i| archive.by_index(i).unwrap().name().to_string())
            .collect()
    }

    #[test]
    fn empty_inputs_short_circuit_to_empty_artifact() {
        let dest = tempfile::tempdir().unwrap();
        let out = build_assembly(dest.path(), &[], Some("Main"), Some("#!/bin/sh")).unwrap();
        assert_eq!(fs::metadata(&out).unwrap().len(), 0);
    }

    #[test]
    fn bootstrap_script_is_the_file_prefix() {
        let root = tempfile::tempdir().unwrap();
        fs::write(root.path().join("app.txt"), b"payload").unwrap();
        let dest = tempfile::tempdir().unwrap();
        let script = "#!/bin/sh\nexec java -jar \"$0\" \"$@\"";

        let out = build_assembly(
            dest.path(),
            &[root.path().to_path_buf()],
            None,
            Some(script),
        )
        .unwrap();

        let bytes = fs::read(&out).unwrap();
        let mut expected = script.as_bytes().to_vec();
        expected.push(b'\n');
        assert!(bytes.starts_with(&expected));
    }

    #[cfg(unix)]
    #[test]
    fn bootstrap_script_makes_artifact_executable() {
        use std::os::unix::fs::PermissionsExt;
        let root = tempfile::tempdir().unwrap();
        fs::write(root.path().join("app.txt"), b"payload").unwrap();
        let dest = tempfile::tempdir().unwrap();

        let out = build_assembly(
            dest.path(),
            &[root.path().to_path_buf()],
            None,
            Some("#!/bin/sh"),
        )
        .unwrap();

        let mode = fs::metadata(&out).unwrap().permissions().mode();
        assert_eq!(mode & 0o111, 0o111);
    }

    #[test]
    fn prefixed_assembly_is_still_a_readable_archive() {
        let root = tempfile::tempdir().unwrap();
        fs::write(root.path().join("app.txt"), b"payload").unwrap();
        let dest = tempfile::tempdir().unwrap();

        let out = build_assembly(
            dest.path(),
            &[root.path().to_path_buf()],
            None,
            Some("#!/bin/sh"),
        )
        .unwrap();

        let names = entry_names(&out);
        assert!(names.contains("META-INF/MANIFEST.MF"));
        assert!(names.contains("app.txt"));
    }

    #[test]
    fn dependency_jars_are_exploded_into_the_assembly() {
        let lib_root = tempfile::tempdir().unwrap();
        fs::create_dir_all(lib_root.path().join("dep")).unwrap();
        fs::write(lib_root.path().join("dep/util.class"), b"code").unwrap();
        let lib_dest = tempfile::tempdir().unwrap();
        let lib_jar = build_jar(lib_dest.path(), &[lib_root.path().to_path_buf()], None).unwrap();

        let app_root = tempfile::tempdir().unwrap();
        fs::write(app_root.path().join("app.class"), b"main").unwrap();

        let dest = tempfile::tempdir().unwrap();
        let out = build_assembly(
            dest.path(),
            &[app_root.path().to_path_buf(), lib_jar],
            Some("Main"),
            None,
        )
        .unwrap();

        let names = entry_names(&out);
        assert!(names.contains("app.class"));
        assert!(names.contains("dep/util.class"));
        // The assembly's own manifest won the merge against the nested jar's.
        assert_eq!(
            names.iter().filter(|n| n.as_str() == "META-INF/MANIFEST.MF").count(),
            1
        );
        let mut archive = ZipArchive::new(File::open(&out).unwrap()).unwrap();
        let mut manifest = String::new();
        archive
            .by_name("META-INF/MANIFEST.MF")
            .unwrap()
            .read_to_string(&mut manifest)
            .unwrap();
        assert!(manifest.contains("Main-Class: Main"));
    }

    #[test]
    fn vanished_roots_are_skipped_not_fatal() {
        let root = tempfile::tempdir().unwrap();
        fs::write(root.path().join("kept.txt"), b"kept").unwrap();
        let dest = tempfile::tempdir().unwrap();

        let out = build_assembly(
            dest.path(),
            &[
                root.path().to_path_buf(),
                dest.path().join("never-existed"),
            ],
            None,
            None,
        )
        .unwrap();
        assert!(entry_names(&out).contains("kept.txt"));
    }
}
