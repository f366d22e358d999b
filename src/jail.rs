//! Jail lookup and attachment
//!
//! This module provides:
//! - FFI bindings to FreeBSD jail syscalls
//! - A resolved handle naming the target jail

pub mod ffi;

pub use ffi::jail_attach;

use crate::error::Result;

/// A running jail, resolved once before any process is forked
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JailHandle {
    jid: i32,
    name: String,
}

impl JailHandle {
    #[cfg(test)]
    pub fn new(jid: i32, name: impl Into<String>) -> Self {
        Self {
            jid,
            name: name.into(),
        }
    }

    /// Resolve a jail name or numeric JID
    ///
    /// The name is always read back from the kernel so a numeric argument
    /// still yields the jail's display name.
    pub fn resolve(ident: &str) -> Result<Self> {
        let jid = ffi::jail_getid(ident)?;
        let name = ffi::jail_getname(jid)?;
        Ok(Self { jid, name })
    }

    pub fn jid(&self) -> i32 {
        self.jid
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}
