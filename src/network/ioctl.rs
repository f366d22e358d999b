//! FreeBSD network ioctl request layouts
//!
//! `#[repr(C)]` mirrors of the structures from <net/if.h>, <net/if_dl.h> and
//! <net/if_bridgevar.h>, plus request numbers built with the same encoding
//! as <sys/ioccom.h>. Layouts are FreeBSD's, whatever the build target.

use crate::error::Result;
use crate::network::ifname::{IFNAMSIZ, IfName};
use crate::network::lladdr::{LLADDR_LEN, LinkAddress};
use std::io;
use std::mem::size_of;
use std::os::unix::io::RawFd;

/// Link-level address family (<sys/socket.h>)
pub const AF_LINK: u8 = 18;

const IOCPARM_MASK: libc::c_ulong = 0x1fff;
const IOC_OUT: libc::c_ulong = 0x4000_0000;
const IOC_IN: libc::c_ulong = 0x8000_0000;
const IOC_INOUT: libc::c_ulong = IOC_IN | IOC_OUT;

const fn ioc(inout: libc::c_ulong, group: u8, num: u8, len: usize) -> libc::c_ulong {
    inout
        | (((len as libc::c_ulong) & IOCPARM_MASK) << 16)
        | ((group as libc::c_ulong) << 8)
        | num as libc::c_ulong
}

/// `_IOW(group, num, type)`
const fn iow(group: u8, num: u8, len: usize) -> libc::c_ulong {
    ioc(IOC_IN, group, num, len)
}

/// `_IOWR(group, num, type)`
const fn iowr(group: u8, num: u8, len: usize) -> libc::c_ulong {
    ioc(IOC_INOUT, group, num, len)
}

pub const SIOCSIFFLAGS: libc::c_ulong = iow(b'i', 16, size_of::<IfReq>());
pub const SIOCGIFFLAGS: libc::c_ulong = iowr(b'i', 17, size_of::<IfReq>());
pub const SIOCSIFNAME: libc::c_ulong = iow(b'i', 40, size_of::<IfReq>());
pub const SIOCSIFLLADDR: libc::c_ulong = iow(b'i', 60, size_of::<IfReq>());
/// Pull an interface from another vnet into the caller's
pub const SIOCSIFRVNET: libc::c_ulong = iowr(b'i', 91, size_of::<IfReq>());
pub const SIOCIFDESTROY: libc::c_ulong = iow(b'i', 121, size_of::<IfReq>());
pub const SIOCSDRVSPEC: libc::c_ulong = iow(b'i', 123, size_of::<IfDrv>());
pub const SIOCIFCREATE2: libc::c_ulong = iowr(b'i', 124, size_of::<IfReq>());

/// if_bridge(4) driver command: add member interface
pub const BRDGADD: libc::c_ulong = 0;

/// `struct sockaddr` with the BSD length byte
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct SockAddr {
    pub sa_len: u8,
    pub sa_family: u8,
    pub sa_data: [libc::c_char; 14],
}

impl SockAddr {
    /// Link-level address as SIOCSIFLLADDR expects it: `sa_len` carries the
    /// address length, not the structure size
    pub fn link(addr: &LinkAddress) -> Self {
        let mut sa = Self {
            sa_len: LLADDR_LEN as u8,
            sa_family: AF_LINK,
            sa_data: [0; 14],
        };
        for (dst, src) in sa.sa_data.iter_mut().zip(addr.octets()) {
            *dst = src as libc::c_char;
        }
        sa
    }

    pub fn link_address(&self) -> LinkAddress {
        let mut octets = [0u8; LLADDR_LEN];
        for (dst, &src) in octets.iter_mut().zip(&self.sa_data) {
            *dst = src as u8;
        }
        LinkAddress::new(octets)
    }
}

/// The `ifr_ifru` union of `struct ifreq`
#[repr(C)]
#[derive(Clone, Copy)]
pub union IfReqData {
    pub addr: SockAddr,
    /// `ifr_flags` and `ifr_flagshigh`
    pub flags: [libc::c_short; 2],
    pub jid: libc::c_int,
    pub data: *mut libc::c_void,
    /// `struct ifreq_buffer`, sizes the union on 64-bit targets
    buffer: [usize; 2],
}

/// `struct ifreq`
#[repr(C)]
#[derive(Clone, Copy)]
pub struct IfReq {
    pub name: [libc::c_char; IFNAMSIZ],
    pub ifru: IfReqData,
}

impl IfReq {
    pub fn new(name: &IfName) -> Self {
        // SAFETY: plain-old-data, all-zero is a valid value
        let mut req: Self = unsafe { std::mem::zeroed() };
        req.name = name.to_c_buf();
        req
    }

    /// Interface name as (re)written by the kernel
    pub fn name(&self) -> Result<IfName> {
        IfName::from_c_buf(&self.name)
    }

    /// 32-bit flag word split across `ifr_flags`/`ifr_flagshigh`
    pub fn flags(&self) -> u32 {
        // SAFETY: every bit pattern is a valid pair of shorts
        let [low, high] = unsafe { self.ifru.flags };
        (low as u16 as u32) | ((high as u16 as u32) << 16)
    }

    pub fn set_flags(&mut self, flags: u32) {
        self.ifru.flags = [
            (flags & 0xffff) as u16 as libc::c_short,
            (flags >> 16) as u16 as libc::c_short,
        ];
    }
}

/// `struct ifdrv`, the envelope for driver specific requests
#[repr(C)]
pub struct IfDrv {
    pub name: [libc::c_char; IFNAMSIZ],
    pub cmd: libc::c_ulong,
    pub len: libc::size_t,
    pub data: *mut libc::c_void,
}

impl IfDrv {
    /// Wrap a driver argument; `arg` must outlive the request
    pub fn new<T>(name: &IfName, cmd: libc::c_ulong, arg: &mut T) -> Self {
        Self {
            name: name.to_c_buf(),
            cmd,
            len: size_of::<T>(),
            data: (arg as *mut T).cast(),
        }
    }
}

/// `struct ifbreq` from <net/if_bridgevar.h>
///
/// if_bridge rejects a request whose `ifd_len` differs from this size, so
/// the trailing padding is part of the ABI.
#[repr(C)]
#[derive(Clone, Copy)]
pub struct IfBReq {
    pub ifsname: [libc::c_char; IFNAMSIZ],
    pub ifsflags: u32,
    pub stpflags: u32,
    pub path_cost: u32,
    pub portno: u8,
    pub priority: u8,
    pub proto: u8,
    pub role: u8,
    pub state: u8,
    pub addrcnt: u32,
    pub addrmax: u32,
    pub addrexceeded: u32,
    pub pad: [u8; 32],
}

impl IfBReq {
    pub fn new(member: &IfName) -> Self {
        // SAFETY: plain-old-data, all-zero is a valid value
        let mut req: Self = unsafe { std::mem::zeroed() };
        req.ifsname = member.to_c_buf();
        req
    }
}

/// Offset of `sdl_nlen` in `struct sockaddr_dl`
const SDL_NLEN: usize = 5;
/// Offset of `sdl_alen` in `struct sockaddr_dl`
const SDL_ALEN: usize = 6;
/// Offset of `sdl_data` in `struct sockaddr_dl`
const SDL_DATA: usize = 8;

/// `LLADDR(sdl)` from the `sdl_len` bytes of a `struct sockaddr_dl`, when
/// it holds an Ethernet sized address
///
/// getifaddrs(3) only allocates `sdl_len` bytes, so the record is never
/// viewed through the full-size structure.
pub fn sockaddr_dl_lladdr(raw: &[u8]) -> Option<LinkAddress> {
    if raw.len() < SDL_DATA || raw[SDL_ALEN] as usize != LLADDR_LEN {
        return None;
    }
    let start = SDL_DATA + raw[SDL_NLEN] as usize;
    let octets: [u8; LLADDR_LEN] = raw.get(start..start + LLADDR_LEN)?.try_into().ok()?;
    Some(LinkAddress::new(octets))
}

/// Issue one request on a control socket
///
/// # Safety
/// `arg` must point at the structure `request` is encoded for.
pub unsafe fn ioctl<T>(fd: RawFd, request: libc::c_ulong, arg: *mut T) -> io::Result<()> {
    let ret = unsafe { libc::ioctl(fd, request as _, arg) };
    if ret < 0 {
        Err(io::Error::last_os_error())
    } else {
        Ok(())
    }
}
