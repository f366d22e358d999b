//! FreeBSD system calls not covered by the libc crate
//!
//! Every FreeBSD-only entry point used by jep is declared here and wrapped
//! in an `io::Result`. On other targets the wrappers fail with `ENOSYS`, so
//! the rest of the crate stays portable and testable.

use std::ffi::CStr;
use std::io;

/// Maximum kernel module name length, including the terminator
pub const MAXMODNAMELEN: usize = 32;

/// `struct module_stat` from <sys/module.h>
#[repr(C)]
#[derive(Clone, Copy)]
pub struct ModuleStat {
    /// Must be set to `size_of::<ModuleStat>()` before calling modstat(2)
    pub version: libc::c_int,
    pub name: [libc::c_char; MAXMODNAMELEN],
    pub refs: libc::c_int,
    pub id: libc::c_int,
    /// `modspecific_t`, a union of int/long sized values
    pub data: libc::c_ulong,
}

impl ModuleStat {
    pub fn new() -> Self {
        // SAFETY: plain-old-data, all-zero is a valid value
        let mut stat: Self = unsafe { std::mem::zeroed() };
        stat.version = std::mem::size_of::<Self>() as libc::c_int;
        stat
    }

    /// Module name up to the first NUL
    pub fn name(&self) -> String {
        let bytes: Vec<u8> = self
            .name
            .iter()
            .take_while(|&&c| c != 0)
            .map(|&c| c as u8)
            .collect();
        String::from_utf8_lossy(&bytes).into_owned()
    }
}

impl Default for ModuleStat {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(target_os = "freebsd")]
mod imp {
    use super::ModuleStat;
    use std::ffi::CStr;
    use std::io;

    // FreeBSD jail and kld syscalls - not in libc crate
    unsafe extern "C" {
        fn jail_attach(jid: libc::c_int) -> libc::c_int;
        fn jail_get(iov: *mut libc::iovec, niov: libc::c_uint, flags: libc::c_int) -> libc::c_int;
        fn kldnext(fileid: libc::c_int) -> libc::c_int;
        fn kldfirstmod(fileid: libc::c_int) -> libc::c_int;
        fn modfnext(modid: libc::c_int) -> libc::c_int;
        fn modstat(modid: libc::c_int, stat: *mut ModuleStat) -> libc::c_int;
        fn kldload(file: *const libc::c_char) -> libc::c_int;
    }

    fn check(ret: libc::c_int) -> io::Result<libc::c_int> {
        if ret < 0 {
            Err(io::Error::last_os_error())
        } else {
            Ok(ret)
        }
    }

    pub fn attach(jid: i32) -> io::Result<()> {
        check(unsafe { jail_attach(jid) }).map(|_| ())
    }

    pub unsafe fn get(iov: &mut [libc::iovec], flags: i32) -> io::Result<i32> {
        check(unsafe { jail_get(iov.as_mut_ptr(), iov.len() as libc::c_uint, flags) })
    }

    pub fn next_file(fileid: i32) -> i32 {
        unsafe { kldnext(fileid) }
    }

    pub fn first_module(fileid: i32) -> i32 {
        unsafe { kldfirstmod(fileid) }
    }

    pub fn next_module(modid: i32) -> i32 {
        unsafe { modfnext(modid) }
    }

    pub fn stat_module(modid: i32, stat: &mut ModuleStat) -> io::Result<()> {
        check(unsafe { modstat(modid, stat) }).map(|_| ())
    }

    pub fn load(file: &CStr) -> io::Result<i32> {
        check(unsafe { kldload(file.as_ptr()) })
    }
}

#[cfg(not(target_os = "freebsd"))]
mod imp {
    use super::ModuleStat;
    use std::ffi::CStr;
    use std::io;

    fn enosys() -> io::Error {
        io::Error::from_raw_os_error(libc::ENOSYS)
    }

    pub fn attach(_jid: i32) -> io::Result<()> {
        Err(enosys())
    }

    pub unsafe fn get(_iov: &mut [libc::iovec], _flags: i32) -> io::Result<i32> {
        Err(enosys())
    }

    pub fn next_file(_fileid: i32) -> i32 {
        0
    }

    pub fn first_module(_fileid: i32) -> i32 {
        0
    }

    pub fn next_module(_modid: i32) -> i32 {
        0
    }

    pub fn stat_module(_modid: i32, _stat: &mut ModuleStat) -> io::Result<()> {
        Err(enosys())
    }

    pub fn load(_file: &CStr) -> io::Result<i32> {
        Err(enosys())
    }
}

/// Attach the calling process to a jail (jail_attach(2))
pub fn jail_attach(jid: i32) -> io::Result<()> {
    imp::attach(jid)
}

/// Query jail parameters (jail_get(2))
///
/// # Safety
/// Every iovec must point at memory valid for its stated length, and
/// output parameters must be writable.
pub unsafe fn jail_get(iov: &mut [libc::iovec], flags: i32) -> io::Result<i32> {
    unsafe { imp::get(iov, flags) }
}

/// Next loaded kernel file after `fileid` (0 starts the walk, 0 ends it)
pub fn kldnext(fileid: i32) -> i32 {
    imp::next_file(fileid)
}

/// First module contained in a kernel file
pub fn kldfirstmod(fileid: i32) -> i32 {
    imp::first_module(fileid)
}

/// Next module after `modid` in the same file
pub fn modfnext(modid: i32) -> i32 {
    imp::next_module(modid)
}

/// Fill `stat` for a module id
pub fn modstat(modid: i32, stat: &mut ModuleStat) -> io::Result<()> {
    imp::stat_module(modid, stat)
}

/// Load a kernel file by name (kldload(2))
pub fn kldload(file: &CStr) -> io::Result<i32> {
    imp::load(file)
}
