pub mod entry;
pub mod runner;
pub mod sandbox;

mod error;

pub use entry::{find_entry_point, EntryPoint, EntryPointError, EntryPointSpec};
pub use error::ExecError;
pub use runner::{MirrorSink, OutputChunk, OutputSink, ProcessResult, StreamSource};
pub use sandbox::{with_sandbox, ModuleSandbox};
