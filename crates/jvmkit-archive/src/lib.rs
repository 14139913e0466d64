pub mod assembly;
pub mod entry;
pub mod jar;
pub mod launcher;
pub mod manifest;

mod error;
mod writer;

pub use entry::{ArchiveEntry, EntrySource};
pub use error::ArchiveError;
pub use manifest::{ManifestSpec, MANIFEST_PATH};
