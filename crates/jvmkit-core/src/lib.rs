pub mod classpath;
pub mod config;
pub mod observability;
pub mod runtime;

pub use classpath::Classpath;
