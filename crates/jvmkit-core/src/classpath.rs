//! Ordered classpath model.
//!
//! A classpath is an ordered list of filesystem locations (directories or
//! archive files). Order matters twice: it is the class/resource resolution
//! precedence when running code, and the entry-merge precedence when
//! packaging. A `Classpath` is immutable once handed to an operation.

use std::path::PathBuf;

/// Separator used when rendering a classpath as a single string
/// (`-cp` argument, launcher scripts).
#[cfg(windows)]
pub const PATH_SEPARATOR: &str = ";";
#[cfg(not(windows))]
pub const PATH_SEPARATOR: &str = ":";

/// Ordered sequence of classpath entries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Classpath {
    entries: Vec<PathBuf>,
}

impl Classpath {
    pub fn new(entries: Vec<PathBuf>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[PathBuf] {
        &self.entries
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PathBuf> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Render the classpath as a single platform-separated string,
    /// preserving entry order.
    pub fn join(&self) -> String {
        self.entries
            .iter()
            .map(|p| p.to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join(PATH_SEPARATOR)
    }
}

impl From<Vec<PathBuf>> for Classpath {
    fn from(entries: Vec<PathBuf>) -> Self {
        Self::new(entries)
    }
}

impl FromIterator<PathBuf> for Classpath {
    fn from_iter<I: IntoIterator<Item = PathBuf>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a Classpath {
    type Item = &'a PathBuf;
    type IntoIter = std::slice::Iter<'a, PathBuf>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
