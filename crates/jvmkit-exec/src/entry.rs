//! Entry-point contract for in-process execution.
//!
//! A runnable module exports a `#[no_mangle]` static [`EntryPointSpec`]
//! descriptor under a symbol derived from its dotted name (see
//! [`entry_symbol`]). Resolution is name + descriptor validation and fails
//! closed: a missing descriptor, an ABI mismatch, or a descriptor declaring
//! the entry non-public or non-static is a typed [`EntryPointError`] naming
//! the violated constraint.

use std::ffi::CString;
use std::marker::PhantomData;
use std::os::raw::{c_char, c_int};

use anyhow::{Context, Result};
use thiserror::Error;

use crate::sandbox::ModuleSandbox;

/// Descriptor ABI understood by this loader.
pub const ENTRY_ABI_VERSION: u32 = 1;

/// How the entry was declared in its source module.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Public = 0,
    Internal = 1,
}

/// Whether the entry is invocable without a receiver.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    Static = 0,
    Instance = 1,
}

/// Exported entry descriptor: declared properties plus the invocation
/// function, `fn(argc, argv) -> status`.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct EntryPointSpec {
    pub abi_version: u32,
    pub visibility: Visibility,
    pub dispatch: Dispatch,
    pub invoke: unsafe extern "C" fn(argc: c_int, argv: *const *const c_char) -> c_int,
}

/// Entry-point resolution failures. Each variant names the specific
/// constraint that was violated.
#[derive(Debug, Error)]
pub enum EntryPointError {
    #[error("entry point `{0}` not found on the sandbox classpath")]
    NotFound(String),

    #[error("entry point `{0}` is not declared public")]
    NotPublic(String),

    #[error("entry point `{0}` is not static")]
    NotStatic(String),

    #[error("entry point `{name}` uses descriptor ABI {found}, expected {expected}")]
    AbiMismatch { name: String, found: u32, expected: u32 },
}

/// Symbol under which a module exports the descriptor for `name`.
/// `com.example.Main` → `jk_entry_com_example_Main`.
pub fn entry_symbol(name: &str) -> String {
    let mut symbol = String::with_capacity("jk_entry_".len() + name.len());
    symbol.push_str("jk_entry_");
    for c in name.chars() {
        symbol.push(if c.is_ascii_alphanumeric() { c } else { '_' });
    }
    symbol
}

/// A validated, invocable entry point. Borrows the sandbox so it cannot
/// outlive the loaded library backing its function pointer.
#[derive(Debug)]
pub struct EntryPoint<'sb> {
    name: String,
    spec: EntryPointSpec,
    _sandbox: PhantomData<&'sb ModuleSandbox>,
}

impl EntryPoint<'_> {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Invoke with no receiver and the given arguments. The module's own
    /// status code is returned untouched; a non-zero outcome of user code is
    /// a legitimate result, not a jvmkit failure.
    pub fn invoke(&self, args: &[String]) -> Result<i32> {
        let cstrings: Vec<CString> = args
            .iter()
            .map(|a| {
                CString::new(a.as_str())
                    .with_context(|| format!("argument contains interior NUL: {a:?}"))
            })
            .collect::<Result<_>>()?;
        let argv: Vec<*const c_char> = cstrings.iter().map(|c| c.as_ptr()).collect();
        let status = unsafe { (self.spec.invoke)(argv.len() as c_int, argv.as_ptr()) };
        Ok(status)
    }
}

/// Resolve and validate the entry point `name` in `sandbox`.
pub fn find_entry_point<'sb>(
    name: &str,
    sandbox: &'sb ModuleSandbox,
) -> Result<EntryPoint<'sb>, EntryPointError> {
    let symbol = entry_symbol(name);
    let spec = sandbox
        .lookup_spec(name, &symbol)
        .ok_or_else(|| EntryPointError::NotFound(name.to_string()))?;
    validate_spec(name, &spec)?;
    Ok(EntryPoint {
        name: name.to_string(),
        spec,
        _sandbox: PhantomData,
    })
}

fn validate_spec(name: &str, spec: &EntryPointSpec) -> Result<(), EntryPointError> {
    if spec.abi_version != ENTRY_ABI_VERSION {
        return Err(EntryPointError::AbiMismatch {
            name: name.to_string(),
            found: spec.abi_version,
            expected: ENTRY_ABI_VERSION,
        });
    }
    if spec.visibility != Visibility::Public {
        return Err(EntryPointError::NotPublic(name.to_string()));
    }
    if spec.dispatch != Dispatch::Static {
        return Err(EntryPointError::NotStatic(name.to_string()));
    }
    Ok(())
}
