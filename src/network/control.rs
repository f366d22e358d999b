//! Interface control handle
//!
//! A tiny subset of ifconfig(8): just enough to create an epair, move it
//! between vnets, put it on a bridge and bring it up without spawning
//! anything.

use crate::error::{Error, Result};
use crate::network::epair::EPAIR_CLONER;
use crate::network::ifname::IfName;
use crate::network::ioctl::{
    self, BRDGADD, IfBReq, IfDrv, IfReq, SIOCGIFFLAGS, SIOCIFCREATE2, SIOCIFDESTROY,
    SIOCSDRVSPEC, SIOCSIFFLAGS, SIOCSIFLLADDR, SIOCSIFNAME, SIOCSIFRVNET, SockAddr,
};
use crate::network::lladdr::LinkAddress;
use bitflags::bitflags;
use std::ffi::CStr;
use std::io;
use std::os::unix::io::AsRawFd;
use std::os::unix::net::UnixDatagram;
use tracing::{debug, warn};

const AF_LINK_FAMILY: libc::c_int = ioctl::AF_LINK as libc::c_int;

bitflags! {
    /// Interface flags (`IFF_*` from <net/if.h>)
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct IfFlags: u32 {
        const UP = 0x1;
        const BROADCAST = 0x2;
        const LOOPBACK = 0x8;
        const POINTOPOINT = 0x10;
        const DRV_RUNNING = 0x40;
        const PROMISC = 0x100;
        const SIMPLEX = 0x800;
        const MULTICAST = 0x8000;
    }
}

/// Operations both sides of the jail boundary issue against the kernel
///
/// Every name is validated before a request is built; a name that does
/// not fit `IFNAMSIZ` fails with `Error::InvalidArgument` and no kernel I/O.
pub trait InterfaceControl {
    /// Clone a new epair and return the name of its `a` end
    fn create_epair(&self) -> Result<String>;

    /// Destroy an interface (for an epair, both ends go)
    fn destroy(&self, name: &str) -> Result<()>;

    /// Rename an interface within the current vnet
    fn rename(&self, name: &str, new_name: &str) -> Result<()>;

    /// Pull `name` out of jail `jid` into the vnet this handle belongs to
    ///
    /// This only works from the destination: the handle must have been
    /// opened in the vnet that will own the interface afterwards. Issuing it
    /// from inside the source jail does not push the interface out.
    fn vnet_pull(&self, name: &str, jid: i32) -> Result<()>;

    /// Set the link address, returning it as the kernel accepted it
    fn set_lladdr(&self, name: &str, addr: &LinkAddress) -> Result<LinkAddress>;

    /// Current link address, `None` when the interface has no AF_LINK record
    fn lladdr(&self, name: &str) -> Result<Option<LinkAddress>>;

    /// Add `member` to if_bridge `bridge`
    fn bridge_add(&self, bridge: &str, member: &str) -> Result<()>;

    /// Set IFF_UP, keeping every other flag
    fn up(&self, name: &str) -> Result<()>;
}

/// An open control socket, valid only for the vnet it was opened in
///
/// A handle opened before jail_attach(2) keeps addressing the host vnet,
/// so each process opens its own after settling into its jail.
#[derive(Debug)]
pub struct IfCtx {
    sock: UnixDatagram,
}

impl IfCtx {
    /// Open a local datagram socket for interface requests
    ///
    /// AF_LOCAL works in any vnet, including jails without INET.
    pub fn open() -> Result<Self> {
        let sock = UnixDatagram::unbound().map_err(Error::ControlOpen)?;
        Ok(Self { sock })
    }

    fn request<T>(
        &self,
        request: libc::c_ulong,
        what: &'static str,
        interface: &IfName,
        arg: &mut T,
    ) -> Result<()> {
        // SAFETY: callers pair each request number with its argument type
        let result = unsafe { ioctl::ioctl(self.sock.as_raw_fd(), request, arg as *mut T) };
        result.map_err(|source| {
            warn!(request = what, interface = %interface, "{}", source);
            Error::Ioctl {
                request: what,
                interface: interface.to_string(),
                source,
            }
        })
    }

    fn flags(&self, name: &IfName) -> Result<IfFlags> {
        let mut req = IfReq::new(name);
        self.request(SIOCGIFFLAGS, "SIOCGIFFLAGS", name, &mut req)?;
        Ok(IfFlags::from_bits_retain(req.flags()))
    }

    fn set_flags(&self, name: &IfName, flags: IfFlags) -> Result<()> {
        let mut req = IfReq::new(name);
        req.set_flags(flags.bits());
        self.request(SIOCSIFFLAGS, "SIOCSIFFLAGS", name, &mut req)
    }
}

impl InterfaceControl for IfCtx {
    fn create_epair(&self) -> Result<String> {
        let cloner = IfName::new(EPAIR_CLONER)?;
        let mut req = IfReq::new(&cloner);

        self.request(SIOCIFCREATE2, "SIOCIFCREATE2", &cloner, &mut req)?;

        let name = req.name()?;
        debug!(interface = %name, "created epair");
        Ok(name.to_string())
    }

    fn destroy(&self, name: &str) -> Result<()> {
        let name = IfName::new(name)?;
        let mut req = IfReq::new(&name);
        self.request(SIOCIFDESTROY, "SIOCIFDESTROY", &name, &mut req)?;
        debug!(interface = %name, "destroyed interface");
        Ok(())
    }

    fn rename(&self, name: &str, new_name: &str) -> Result<()> {
        let name = IfName::new(name)?;
        let new_name = IfName::new(new_name)?;

        let mut new_buf = new_name.to_c_buf();
        let mut req = IfReq::new(&name);
        req.ifru.data = new_buf.as_mut_ptr().cast();

        self.request(SIOCSIFNAME, "SIOCSIFNAME", &name, &mut req)?;
        debug!(from = %name, to = %new_name, "renamed interface");
        Ok(())
    }

    fn vnet_pull(&self, name: &str, jid: i32) -> Result<()> {
        let name = IfName::new(name)?;
        if jid < 0 {
            return Err(Error::InvalidArgument(format!("invalid jail id {}", jid)));
        }

        let mut req = IfReq::new(&name);
        req.ifru.jid = jid;

        self.request(SIOCSIFRVNET, "SIOCSIFRVNET", &name, &mut req)?;
        debug!(interface = %name, jid, "pulled interface from jail");
        Ok(())
    }

    fn set_lladdr(&self, name: &str, addr: &LinkAddress) -> Result<LinkAddress> {
        let name = IfName::new(name)?;
        let mut req = IfReq::new(&name);
        req.ifru.addr = SockAddr::link(addr);

        self.request(SIOCSIFLLADDR, "SIOCSIFLLADDR", &name, &mut req)?;

        // SAFETY: the addr member is the one written above
        let accepted = unsafe { req.ifru.addr }.link_address();
        debug!(interface = %name, lladdr = %accepted, "set link address");
        Ok(accepted)
    }

    fn lladdr(&self, name: &str) -> Result<Option<LinkAddress>> {
        let name = IfName::new(name)?;

        let mut ifap: *mut libc::ifaddrs = std::ptr::null_mut();
        let result = unsafe { libc::getifaddrs(&mut ifap) };
        if result == -1 {
            let source = io::Error::last_os_error();
            warn!(interface = %name, "getifaddrs: {}", source);
            return Err(Error::Enumerate(source));
        }

        // SAFETY: ifap is a list returned by getifaddrs and freed right after
        let found = unsafe { find_link_address(ifap, &name) };
        unsafe { libc::freeifaddrs(ifap) };

        Ok(found)
    }

    fn bridge_add(&self, bridge: &str, member: &str) -> Result<()> {
        let bridge = IfName::new(bridge)?;
        let member = IfName::new(member)?;

        let mut breq = IfBReq::new(&member);
        let mut drv = IfDrv::new(&bridge, BRDGADD, &mut breq);

        self.request(SIOCSDRVSPEC, "SIOCSDRVSPEC(BRDGADD)", &bridge, &mut drv)?;
        debug!(bridge = %bridge, member = %member, "added bridge member");
        Ok(())
    }

    fn up(&self, name: &str) -> Result<()> {
        let name = IfName::new(name)?;
        let flags = self.flags(&name)?;
        self.set_flags(&name, flags | IfFlags::UP)
    }
}

/// Walk a getifaddrs(3) list for the first AF_LINK entry of `name`
///
/// # Safety
/// `ifap` must be null or the head of a live getifaddrs list.
unsafe fn find_link_address(ifap: *const libc::ifaddrs, name: &IfName) -> Option<LinkAddress> {
    let mut iter = ifap;
    while !iter.is_null() {
        let ifa = unsafe { &*iter };
        iter = ifa.ifa_next;

        if ifa.ifa_addr.is_null() || ifa.ifa_name.is_null() {
            continue;
        }
        let family = unsafe { (*ifa.ifa_addr).sa_family } as libc::c_int;
        if family != AF_LINK_FAMILY {
            continue;
        }
        let ifa_name = unsafe { CStr::from_ptr(ifa.ifa_name) };
        if ifa_name.to_bytes() != name.as_str().as_bytes() {
            continue;
        }

        // sdl_len is the first byte of every BSD sockaddr
        let base = ifa.ifa_addr as *const u8;
        let len = unsafe { *base } as usize;
        let raw = unsafe { std::slice::from_raw_parts(base, len) };
        return ioctl::sockaddr_dl_lladdr(raw);
    }
    None
}
