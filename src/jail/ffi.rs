//! FFI bindings for FreeBSD jail syscalls
//!
//! This code is adapted from libjail-rs (https://github.com/fubarnetes/libjail-rs)
//! Original authors: Fabian Freyer <fabian.freyer@physik.tu-berlin.de>
//! License: BSD-3-Clause
//!
//! Copyright (c) 2018, Fabian Freyer <fabian.freyer@physik.tu-berlin.de>
//! All rights reserved.
//!
//! Redistribution and use in source and binary forms, with or without
//! modification, are permitted provided that the following conditions are met:
//!
//! 1. Redistributions of source code must retain the above copyright notice, this
//!    list of conditions and the following disclaimer.
//!
//! 2. Redistributions in binary form must reproduce the above copyright notice,
//!    this list of conditions and the following disclaimer in the documentation
//!    and/or other materials provided with the distribution.
//!
//! 3. Neither the name of the copyright holder nor the names of its
//!    contributors may be used to endorse or promote products derived from
//!    this software without specific prior written permission.


use crate::error::{Error, Result};
use crate::sys;
use bitflags::bitflags;
use std::ffi::{CStr, CString};
use std::mem;

/// Maximum jail name length reported by the kernel (MAXHOSTNAMELEN)
const MAX_NAME_LEN: usize = 256;

/// Macro to construct iovec structures for jail syscalls
macro_rules! iovec {
    ($key:expr => ($value:expr, $size:expr)) => {
        vec![iovec!($key), iovec!($value, $size)]
    };
    ($key:expr => mut $value:expr) => {
        vec![iovec!($key), iovec!(mut $value)]
    };
    ($key:expr => $value:expr) => {
        vec![iovec!($key), iovec!($value)]
    };
    ($value:expr, $size:expr) => {
        libc::iovec {
            iov_base: $value as *mut libc::c_void,
            iov_len: $size,
        }
    };
    ($name:expr) => {
        iovec!($name.as_ptr(), $name.len())
    };
    (mut $name:expr) => {
        iovec!($name.as_mut_ptr(), $name.len())
    };
}

bitflags! {
    /// Flags for jail_get syscall
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct JailFlags: i32 {
        /// Allow getting a dying jail
        const DYING = 0x08;
    }
}

/// Run jail_get(2) over a prepared iovec list
///
/// The kernel fills `errmsg` with a human readable reason on failure; an
/// empty message means the errno is the only explanation.
fn jail_get(jiov: &mut [libc::iovec], errmsg: &[u8; 256]) -> Result<i32> {
    // SAFETY: every iovec points into buffers owned by the caller's frame
    let ret = unsafe { sys::jail_get(jiov, JailFlags::empty().bits()) };

    ret.map_err(|e| match errmsg[0] {
        0 => Error::Io(e),
        _ => Error::JailGet(
            unsafe { CStr::from_ptr(errmsg.as_ptr() as *const libc::c_char) }
                .to_string_lossy()
                .to_string(),
        ),
    })
}

/// Get the jail ID from a jail name or a numeric JID
///
/// A numeric identifier is checked against the running jails, so a stale
/// JID fails here rather than after forking.
pub fn jail_getid(name: &str) -> Result<i32> {
    let mut errmsg: [u8; 256] = [0; 256];

    if let Ok(jid) = name.parse::<i32>() {
        let mut jiov: Vec<libc::iovec> = vec![
            iovec!(b"jid\0" => (&jid as *const i32, mem::size_of::<i32>())),
            iovec!(b"errmsg\0" => mut errmsg),
        ]
        .into_iter()
        .flatten()
        .collect();
        return jail_get(&mut jiov, &errmsg);
    }

    let name = CString::new(name)?.into_bytes_with_nul();

    let mut jiov: Vec<libc::iovec> =
        vec![iovec!(b"name\0" => name), iovec!(b"errmsg\0" => mut errmsg)]
            .into_iter()
            .flatten()
            .collect();

    jail_get(&mut jiov, &errmsg)
}

/// Get the name of a running jail from its JID
pub fn jail_getname(jid: i32) -> Result<String> {
    let mut errmsg: [u8; 256] = [0; 256];
    let mut namebuf: [u8; MAX_NAME_LEN] = [0; MAX_NAME_LEN];

    let mut jiov: Vec<libc::iovec> = vec![
        iovec!(b"jid\0" => (&jid as *const i32, mem::size_of::<i32>())),
        iovec!(b"name\0" => mut namebuf),
        iovec!(b"errmsg\0" => mut errmsg),
    ]
    .into_iter()
    .flatten()
    .collect();

    jail_get(&mut jiov, &errmsg)?;

    let name = CStr::from_bytes_until_nul(&namebuf)
        .map_err(|_| Error::JailGet(format!("unterminated name for jail {}", jid)))?;
    Ok(name.to_string_lossy().into_owned())
}

/// Attach the current process to a jail
///
/// After calling this, the process runs inside the jail context, including
/// its vnet. Sockets opened before the call keep talking to the old vnet.
pub fn jail_attach(jid: i32) -> Result<()> {
    sys::jail_attach(jid).map_err(|source| Error::JailAttach { jid, source })
}
