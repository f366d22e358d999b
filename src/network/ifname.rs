//! Bounded interface names

use crate::error::{Error, Result};
use std::fmt;
use std::str::FromStr;

/// Size of an interface name buffer, terminator included
pub const IFNAMSIZ: usize = 16;

/// An interface name that fits a kernel `ifr_name` buffer
///
/// At most `IFNAMSIZ - 1` bytes and no interior NUL.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IfName(String);

impl IfName {
    pub fn new(name: &str) -> Result<Self> {
        if name.len() >= IFNAMSIZ {
            return Err(Error::InvalidArgument(format!(
                "interface name \"{}\" too long (max {} chars)",
                name,
                IFNAMSIZ - 1
            )));
        }
        if name.as_bytes().contains(&0) {
            return Err(Error::InvalidArgument(format!(
                "interface name {:?} contains NUL",
                name
            )));
        }
        Ok(Self(name.to_string()))
    }

    /// Read a name back out of a kernel buffer
    pub fn from_c_buf(buf: &[libc::c_char; IFNAMSIZ]) -> Result<Self> {
        let len = buf.iter().position(|&c| c == 0).unwrap_or(IFNAMSIZ);
        let bytes: Vec<u8> = buf[..len].iter().map(|&c| c as u8).collect();
        let name = String::from_utf8(bytes)
            .map_err(|e| Error::InvalidArgument(format!("Invalid interface name: {}", e)))?;
        Self::new(&name)
    }

    /// NUL-terminated copy suitable for `ifr_name`/`ifd_name`/`ifbr_ifsname`
    pub fn to_c_buf(&self) -> [libc::c_char; IFNAMSIZ] {
        let mut buf = [0 as libc::c_char; IFNAMSIZ];
        for (dst, &src) in buf.iter_mut().zip(self.0.as_bytes()) {
            *dst = src as libc::c_char;
        }
        buf
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for IfName {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl fmt::Display for IfName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for IfName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
