//! In-memory interface table for exercising the protocol without a kernel
//!
//! Models just what provisioning touches: per-vnet name spaces, epair
//! cloning, renames, pulls across vnets and bridge membership.

use crate::error::{Error, Result};
use crate::network::{IfName, InterfaceControl, LinkAddress};
use std::io;
use std::sync::{Arc, Mutex};

pub const HOST: i32 = 0;

#[derive(Debug, Clone)]
pub struct Iface {
    pub name: String,
    pub vnet: i32,
    pub pair: Option<usize>,
    pub lladdr: Option<LinkAddress>,
    pub up: bool,
    pub bridge: Option<String>,
    pub is_bridge: bool,
}

#[derive(Default)]
struct World {
    ifaces: Vec<Iface>,
    next_unit: usize,
    calls: Vec<(i32, String)>,
    refused: Vec<&'static str>,
}

impl World {
    fn position(&self, vnet: i32, name: &str) -> Option<usize> {
        self.ifaces
            .iter()
            .position(|i| i.vnet == vnet && i.name == name)
    }
}

#[derive(Clone, Default)]
pub struct FakeKernel {
    world: Arc<Mutex<World>>,
}

impl FakeKernel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn context(&self, vnet: i32) -> FakeCtx {
        FakeCtx {
            kernel: self.clone(),
            vnet,
        }
    }

    pub fn add_bridge(&self, vnet: i32, name: &str) {
        self.add(vnet, name, true);
    }

    pub fn add_iface(&self, vnet: i32, name: &str) {
        self.add(vnet, name, false);
    }

    fn add(&self, vnet: i32, name: &str, is_bridge: bool) {
        self.world.lock().unwrap().ifaces.push(Iface {
            name: name.to_string(),
            vnet,
            pair: None,
            lladdr: None,
            up: false,
            bridge: None,
            is_bridge,
        });
    }

    /// Make every later request of this kind fail with EIO
    pub fn refuse(&self, request: &'static str) {
        self.world.lock().unwrap().refused.push(request);
    }

    pub fn get(&self, vnet: i32, name: &str) -> Option<Iface> {
        let world = self.world.lock().unwrap();
        world.position(vnet, name).map(|i| world.ifaces[i].clone())
    }

    pub fn exists(&self, vnet: i32, name: &str) -> bool {
        self.get(vnet, name).is_some()
    }

    /// Number of epair ends alive anywhere
    pub fn epair_ends(&self) -> usize {
        let world = self.world.lock().unwrap();
        world.ifaces.iter().filter(|i| i.pair.is_some()).count()
    }

    pub fn calls(&self) -> Vec<String> {
        let world = self.world.lock().unwrap();
        world.calls.iter().map(|(_, c)| c.clone()).collect()
    }

    pub fn calls_in(&self, vnet: i32) -> Vec<String> {
        let world = self.world.lock().unwrap();
        world
            .calls
            .iter()
            .filter(|(v, _)| *v == vnet)
            .map(|(_, c)| c.clone())
            .collect()
    }
}

pub struct FakeCtx {
    kernel: FakeKernel,
    vnet: i32,
}

fn rejected(request: &'static str, interface: &str, errno: i32) -> Error {
    Error::Ioctl {
        request,
        interface: interface.to_string(),
        source: io::Error::from_raw_os_error(errno),
    }
}

impl FakeCtx {
    fn with<T>(
        &self,
        request: &'static str,
        call: String,
        f: impl FnOnce(&mut World) -> Result<T>,
    ) -> Result<T> {
        let mut world = self.kernel.world.lock().unwrap();
        let interface = call.split(' ').nth(1).unwrap_or_default().to_string();
        world.calls.push((self.vnet, call));
        if world.refused.contains(&request) {
            return Err(rejected(request, &interface, libc::EIO));
        }
        f(&mut *world)
    }

    fn find(&self, world: &World, request: &'static str, name: &str) -> Result<usize> {
        world
            .position(self.vnet, name)
            .ok_or_else(|| rejected(request, name, libc::ENXIO))
    }
}

impl InterfaceControl for FakeCtx {
    fn create_epair(&self) -> Result<String> {
        let vnet = self.vnet;
        self.with("SIOCIFCREATE2", "create".to_string(), |world| {
            let unit = world.next_unit;
            world.next_unit += 1;
            for end in [b'a', b'b'] {
                world.ifaces.push(Iface {
                    name: format!("epair{}{}", unit, end as char),
                    vnet,
                    pair: Some(unit),
                    lladdr: Some(LinkAddress::new([0x02, 0, 0, 0, unit as u8, end - b'a' + 0x0a])),
                    up: false,
                    bridge: None,
                    is_bridge: false,
                });
            }
            Ok(format!("epair{}a", unit))
        })
    }

    fn destroy(&self, name: &str) -> Result<()> {
        IfName::new(name)?;
        self.with("SIOCIFDESTROY", format!("destroy {}", name), |world| {
            let idx = self.find(world, "SIOCIFDESTROY", name)?;
            match world.ifaces[idx].pair {
                Some(unit) => world.ifaces.retain(|i| i.pair != Some(unit)),
                None => {
                    world.ifaces.remove(idx);
                }
            }
            Ok(())
        })
    }

    fn rename(&self, name: &str, new_name: &str) -> Result<()> {
        IfName::new(name)?;
        IfName::new(new_name)?;
        self.with("SIOCSIFNAME", format!("rename {} {}", name, new_name), |world| {
            let idx = self.find(world, "SIOCSIFNAME", name)?;
            if world.position(self.vnet, new_name).is_some() {
                return Err(rejected("SIOCSIFNAME", name, libc::EEXIST));
            }
            world.ifaces[idx].name = new_name.to_string();
            Ok(())
        })
    }

    fn vnet_pull(&self, name: &str, jid: i32) -> Result<()> {
        IfName::new(name)?;
        self.with("SIOCSIFRVNET", format!("pull {} {}", name, jid), |world| {
            let idx = world
                .position(jid, name)
                .ok_or_else(|| rejected("SIOCSIFRVNET", name, libc::ENXIO))?;
            if jid != self.vnet && world.position(self.vnet, name).is_some() {
                return Err(rejected("SIOCSIFRVNET", name, libc::EEXIST));
            }
            world.ifaces[idx].vnet = self.vnet;
            Ok(())
        })
    }

    fn set_lladdr(&self, name: &str, addr: &LinkAddress) -> Result<LinkAddress> {
        IfName::new(name)?;
        self.with("SIOCSIFLLADDR", format!("set_lladdr {}", name), |world| {
            let idx = self.find(world, "SIOCSIFLLADDR", name)?;
            world.ifaces[idx].lladdr = Some(*addr);
            Ok(*addr)
        })
    }

    fn lladdr(&self, name: &str) -> Result<Option<LinkAddress>> {
        IfName::new(name)?;
        self.with("getifaddrs", format!("lladdr {}", name), |world| {
            Ok(world
                .position(self.vnet, name)
                .and_then(|i| world.ifaces[i].lladdr))
        })
    }

    fn bridge_add(&self, bridge: &str, member: &str) -> Result<()> {
        IfName::new(bridge)?;
        IfName::new(member)?;
        self.with("SIOCSDRVSPEC(BRDGADD)", format!("bridge_add {} {}", bridge, member), |world| {
            let b = self.find(world, "SIOCSDRVSPEC(BRDGADD)", bridge)?;
            if !world.ifaces[b].is_bridge {
                return Err(rejected("SIOCSDRVSPEC(BRDGADD)", bridge, libc::EINVAL));
            }
            let m = world
                .position(self.vnet, member)
                .ok_or_else(|| rejected("SIOCSDRVSPEC(BRDGADD)", bridge, libc::ENOENT))?;
            world.ifaces[m].bridge = Some(bridge.to_string());
            Ok(())
        })
    }

    fn up(&self, name: &str) -> Result<()> {
        IfName::new(name)?;
        self.with("SIOCSIFFLAGS", format!("up {}", name), |world| {
            let idx = self.find(world, "SIOCSIFFLAGS", name)?;
            world.ifaces[idx].up = true;
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_epair_ends_share_fate() {
        let kernel = FakeKernel::new();
        let jail = kernel.context(7);
        let host = kernel.context(HOST);

        let base = jail.create_epair().unwrap();
        jail.rename(&base, "jail0").unwrap();
        jail.rename("epair0b", "jail0test").unwrap();
        host.vnet_pull("jail0test", 7).unwrap();
        assert!(kernel.exists(HOST, "jail0test"));

        jail.destroy("jail0").unwrap();
        assert_eq!(kernel.epair_ends(), 0);
    }

    #[test]
    fn test_pull_from_source_stays_put() {
        let kernel = FakeKernel::new();
        let jail = kernel.context(7);
        jail.create_epair().unwrap();

        jail.vnet_pull("epair0b", 7).unwrap();
        assert!(kernel.exists(7, "epair0b"));
        assert!(!kernel.exists(HOST, "epair0b"));
    }

    #[test]
    fn test_long_names_never_reach_the_kernel() {
        let kernel = FakeKernel::new();
        kernel.add_bridge(HOST, "jail0br");
        let ctx = kernel.context(HOST);
        let long = "x".repeat(16);
        let mac: LinkAddress = "02:00:00:00:00:01".parse().unwrap();

        assert!(matches!(ctx.destroy(&long), Err(Error::InvalidArgument(_))));
        assert!(matches!(ctx.rename(&long, "jail0"), Err(Error::InvalidArgument(_))));
        assert!(matches!(ctx.rename("jail0br", &long), Err(Error::InvalidArgument(_))));
        assert!(matches!(ctx.vnet_pull(&long, 7), Err(Error::InvalidArgument(_))));
        assert!(matches!(ctx.set_lladdr(&long, &mac), Err(Error::InvalidArgument(_))));
        assert!(matches!(ctx.lladdr(&long), Err(Error::InvalidArgument(_))));
        assert!(matches!(ctx.bridge_add(&long, "jail0"), Err(Error::InvalidArgument(_))));
        assert!(matches!(ctx.bridge_add("jail0br", &long), Err(Error::InvalidArgument(_))));
        assert!(matches!(ctx.up(&long), Err(Error::InvalidArgument(_))));

        assert!(kernel.calls().is_empty());
        assert!(kernel.exists(HOST, "jail0br"));
    }

    #[test]
    fn test_refused_request() {
        let kernel = FakeKernel::new();
        kernel.add_iface(HOST, "jail0test");
        kernel.refuse("SIOCSIFFLAGS");
        let err = kernel.context(HOST).up("jail0test").unwrap_err();
        assert!(matches!(err, Error::Ioctl { request: "SIOCSIFFLAGS", .. }));
        assert!(!kernel.get(HOST, "jail0test").unwrap().up);
    }

    #[test]
    fn test_rename_collision() {
        let kernel = FakeKernel::new();
        let jail = kernel.context(7);
        kernel.add_iface(7, "jail0");
        let base = jail.create_epair().unwrap();
        let err = jail.rename(&base, "jail0").unwrap_err();
        assert!(matches!(err, Error::Ioctl { request: "SIOCSIFNAME", .. }));
    }
}
