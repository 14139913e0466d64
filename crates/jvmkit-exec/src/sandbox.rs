//! Disposable module-loading boundary for in-process execution.
//!
//! A [`ModuleSandbox`] loads the native modules reachable from a classpath
//! (loose dynamic libraries, libraries inside directory entries, libraries
//! packed into jar/zip entries) and resolves entry descriptors against only
//! that set, in classpath order. It never delegates to the host process,
//! with one exception: names under a reserved harness prefix resolve against
//! the host image so an injected test harness shares identity with the
//! caller's own code.
//!
//! The boundary is passed to the caller's closure as an explicit parameter
//! rather than installed as ambient thread state, and teardown (libraries
//! closed, extracted temp files removed) happens on every exit path via
//! `Drop`.

use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use libloading::Library;
use tempfile::TempDir;

use jvmkit_core::observability;
use jvmkit_core::Classpath;

use crate::entry::EntryPointSpec;

/// One in-process execution boundary. Owns every library it loaded plus the
/// temp directory holding libraries extracted from archive classpath entries.
pub struct ModuleSandbox {
    libraries: Vec<(PathBuf, Library)>,
    host: Option<Library>,
    host_prefix: Option<String>,
    // Held for the sandbox lifetime; removed on drop.
    _extract_dir: Option<TempDir>,
}

impl ModuleSandbox {
    /// Load every native module reachable from `classpath`, in order.
    /// Missing classpath entries are skipped (classpath semantics), but a
    /// library that exists and fails to load is an error.
    pub fn open(classpath: &Classpath, host_prefix: Option<&str>) -> Result<Self> {
        let mut libraries = Vec::new();
        let mut extract_dir: Option<TempDir> = None;

        for entry in classpath {
            if !entry.exists() {
                tracing::debug!(entry = %entry.display(), "skipping missing classpath entry");
                continue;
            }
            if entry.is_dir() {
                for path in native_libs_in_dir(entry)? {
                    libraries.push((path.clone(), load_library(&path)?));
                }
            } else if is_native_lib(entry) {
                libraries.push((entry.clone(), load_library(entry)?));
            } else if is_archive(entry) {
                extract_archive_libs(entry, &mut extract_dir, &mut libraries)?;
            } else {
                tracing::debug!(entry = %entry.display(), "classpath entry holds no native modules");
            }
        }

        let host = match host_prefix {
            Some(_) => Some(host_library()?),
            None => None,
        };

        observability::audit_sandbox_opened(classpath.len(), libraries.len());
        Ok(Self {
            libraries,
            host,
            host_prefix: host_prefix.map(str::to_string),
            _extract_dir: extract_dir,
        })
    }

    /// Resolve the descriptor exported under `symbol`. Names under the
    /// harness prefix go to the host image; everything else searches the
    /// sandbox's own libraries in load order.
    pub(crate) fn lookup_spec(&self, entry_name: &str, symbol: &str) -> Option<EntryPointSpec> {
        let mut symbol_nul = Vec::with_capacity(symbol.len() + 1);
        symbol_nul.extend_from_slice(symbol.as_bytes());
        symbol_nul.push(0);

        if let (Some(prefix), Some(host)) = (&self.host_prefix, &self.host) {
            if entry_name.starts_with(prefix.as_str()) {
                return get_spec(host, &symbol_nul);
            }
        }
        for (_, library) in &self.libraries {
            if let Some(spec) = get_spec(library, &symbol_nul) {
                return Some(spec);
            }
        }
        None
    }

    /// Number of libraries this boundary loaded.
    pub fn library_count(&self) -> usize {
        self.libraries.len()
    }

    /// Filesystem locations of the loaded libraries, in load order.
    pub fn library_paths(&self) -> impl Iterator<Item = &Path> {
        self.libraries.iter().map(|(path, _)| path.as_path())
    }
}

/// Build a sandbox over `classpath`, run `body` with it, and tear the
/// boundary down on every exit path: normal return, error, or unwind. The
/// borrow handed to `body` keeps a sandbox from leaking past its call.
pub fn with_sandbox<T>(
    classpath: &Classpath,
    host_prefix: Option<&str>,
    body: impl FnOnce(&ModuleSandbox) -> Result<T>,
) -> Result<T> {
    let sandbox = ModuleSandbox::open(classpath, host_prefix)?;
    body(&sandbox)
}

fn load_library(path: &Path) -> Result<Library> {
    unsafe { Library::new(path) }
        .with_context(|| format!("failed to load module `{}`", path.display()))
}

// The symbol, when present, points at a descriptor static exported under the
// jvmkit entry convention; anything else under that name is a module bug.
fn get_spec(library: &Library, symbol_nul: &[u8]) -> Option<EntryPointSpec> {
    let symbol = unsafe { library.get::<*const EntryPointSpec>(symbol_nul) };
    match symbol {
        Ok(ptr) => Some(unsafe { std::ptr::read(*ptr) }),
        Err(_) => None,
    }
}

#[cfg(unix)]
fn host_library() -> Result<Library> {
    Ok(libloading::os::unix::Library::this().into())
}

#[cfg(windows)]
fn host_library() -> Result<Library> {
    Ok(libloading::os::windows::Library::this()
        .context("failed to open host process image")?
        .into())
}

fn is_native_lib(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map_or(false, |ext| ext.eq_ignore_ascii_case(std::env::consts::DLL_EXTENSION))
}

fn is_archive(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map_or(false, |ext| {
            ext.eq_ignore_ascii_case("jar") || ext.eq_ignore_ascii_case("zip")
        })
}

/// Loose native libraries directly inside a directory entry, sorted for a
/// stable load order.
fn native_libs_in_dir(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut libs = Vec::new();
    let entries = fs::read_dir(dir)
        .with_context(|| format!("failed to read classpath directory `{}`", dir.display()))?;
    for entry in entries {
        let path = entry?.path();
        if path.is_file() && is_native_lib(&path) {
            libs.push(path);
        }
    }
    libs.sort();
    Ok(libs)
}

/// Pull native libraries out of an archive classpath entry into the
/// sandbox's temp directory and load them in archive order.
fn extract_archive_libs(
    archive_path: &Path,
    extract_dir: &mut Option<TempDir>,
    libraries: &mut Vec<(PathBuf, Library)>,
) -> Result<()> {
    let file = File::open(archive_path)
        .with_context(|| format!("failed to open archive `{}`", archive_path.display()))?;
    let mut archive = zip::ZipArchive::new(file)
        .with_context(|| format!("`{}` is not a readable archive", archive_path.display()))?;

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        if entry.is_dir() || !is_native_lib(Path::new(entry.name())) {
            continue;
        }
        let file_name = match Path::new(entry.name()).file_name() {
            Some(name) => name.to_os_string(),
            None => continue,
        };
        let dir = match extract_dir {
            Some(dir) => dir.path().to_path_buf(),
            None => {
                let dir =
                    tempfile::tempdir().context("failed to create sandbox extraction directory")?;
                let path = dir.path().to_path_buf();
                *extract_dir = Some(dir);
                path
            }
        };
        let out_path = dir.join(file_name);
        if out_path.exists() {
            // Same base name from an earlier classpath entry wins.
            continue;
        }
        let mut bytes = Vec::new();
        entry.read_to_end(&mut bytes)?;
        let mut out = File::create(&out_path)
            .with_context(|| format!("failed to extract `{}`", out_path.display()))?;
        out.write_all(&bytes)?;
        drop(out);
        libraries.push((out_path.clone(), load_library(&out_path)?));
    }
    Ok(())
}
