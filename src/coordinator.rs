//! Two-process provisioning across the jail boundary
//!
//! Interface creation and renaming must happen inside the jail's vnet,
//! while pulling the outer end out, bridging and raising it must happen in
//! the host's. jep forks: the child attaches to the jail, the parent stays
//! behind, and the two hand off over a socket pair.
//!
//! ```text
//!   host (parent)                       jail (child)
//!                                       jail_attach
//!                                       create epair, resolve lladdr
//!                                       rename a -> inner, b -> outer
//!   read report   <------ 18 bytes ---- send report
//!   pull outer, bridge, up
//!   close         ------- EOF --------> keep pair, exit 0
//!    or abort     ------- errout -----> destroy pair, exit 0
//!   waitpid
//! ```

pub mod channel;
pub mod child;
pub mod cleanup;
pub mod parent;
pub mod state;

#[cfg(test)]
pub mod fake;

pub use channel::Report;

use crate::error::{EX_OSERR, Error, Result};
use crate::jail::{self, JailHandle};
use crate::network::{IfCtx, IfName, LinkAddress};
use channel::Channel;
use nix::errno::Errno;
use nix::sys::wait::{WaitStatus, waitpid};
use nix::unistd::{ForkResult, Pid, fork};
use parent::Handoff;
use state::{Event, Progress, Side};
use std::os::unix::net::UnixStream;
use tracing::{info, info_span, warn};

/// Everything needed to provision one epair, validated up front
#[derive(Debug, Clone)]
pub struct Request {
    jail: JailHandle,
    outer: IfName,
    bridge: IfName,
    inner: IfName,
    lladdr: Option<LinkAddress>,
}

impl Request {
    pub fn new(
        jail: JailHandle,
        outer: IfName,
        bridge: IfName,
        inner: IfName,
        lladdr: Option<LinkAddress>,
    ) -> Self {
        Self {
            jail,
            outer,
            bridge,
            inner,
            lladdr,
        }
    }

    pub fn jail(&self) -> &JailHandle {
        &self.jail
    }

    /// Host-side name of the epair end
    pub fn outer(&self) -> &str {
        self.outer.as_str()
    }

    pub fn bridge(&self) -> &str {
        self.bridge.as_str()
    }

    /// Jail-side name of the epair end
    pub fn inner(&self) -> &str {
        self.inner.as_str()
    }

    /// Link address to force on the inner end, if any
    pub fn lladdr(&self) -> Option<LinkAddress> {
        self.lladdr
    }
}

/// Create, name, migrate and bridge one epair
///
/// Returns once the child has exited. On success the outer end is up on
/// the bridge in the host and the inner end lives in the jail; on any
/// failure neither end is left behind.
pub fn provision(req: &Request) -> Result<Report> {
    let host = IfCtx::open()?;
    let (host_end, jail_end) = UnixStream::pair().map_err(Error::Channel)?;

    // SAFETY: jep is single threaded when it forks
    match unsafe { fork() } {
        Ok(ForkResult::Child) => {
            // plain close; shutting down would cut the parent off as well
            drop(host_end);
            let code = jail_side(host, req, jail_end);
            std::process::exit(code);
        }
        Ok(ForkResult::Parent { child }) => {
            drop(jail_end);
            let handoff = host_side(&host, req, host_end);
            drop(host);

            let status = wait_child(child);
            match (handoff?, status?) {
                (Handoff::Completed(report), 0) => {
                    info!(interface = req.outer(), lladdr = %report, "provisioned");
                    Ok(report)
                }
                (_, code) => Err(Error::ChildExited(code)),
            }
        }
        Err(e) => Err(Error::Fork(e)),
    }
}

fn host_side(ctx: &IfCtx, req: &Request, stream: UnixStream) -> Result<Handoff> {
    let _span = info_span!("host", jid = req.jail().jid()).entered();
    let mut chan = Channel::new(stream);
    let mut progress = Progress::new(Side::Host);
    parent::run(ctx, req, &mut chan, &mut progress)
}

/// Child body; returns the exit status
fn jail_side(host: IfCtx, req: &Request, stream: UnixStream) -> i32 {
    let _span = info_span!("jail", jid = req.jail().jid()).entered();
    let mut chan = Channel::new(stream);
    let mut progress = Progress::new(Side::Jail);

    let result = enter_jail(host, req.jail()).and_then(|ctx| {
        progress.advance(Event::Enter)?;
        child::run(&ctx, req, &mut chan, &mut progress)
    });

    match result {
        Ok(_) => 0,
        Err(e) => {
            progress.fail();
            eprintln!("jep: {}", e);
            e.exit_code()
        }
    }
}

/// Attach to the jail and reopen the control handle in its vnet
fn enter_jail(host: IfCtx, target: &JailHandle) -> Result<IfCtx> {
    jail::jail_attach(target.jid())?;
    drop(host);
    IfCtx::open()
}

fn wait_child(child: Pid) -> Result<i32> {
    loop {
        match waitpid(child, None) {
            Ok(WaitStatus::Exited(_, code)) => return Ok(code),
            Ok(WaitStatus::Signaled(_, signal, _)) => {
                warn!(?signal, "jail side killed");
                return Ok(EX_OSERR);
            }
            Ok(_) => continue,
            Err(Errno::EINTR) => continue,
            Err(e) => return Err(Error::Wait(e)),
        }
    }
}
