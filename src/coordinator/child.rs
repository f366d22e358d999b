//! Jail side of provisioning
//!
//! Runs after jail_attach(2), with an interface handle opened inside the
//! jail's vnet. Creates the pair, names both ends, reports the link
//! address and then waits for the host side to keep or discard it.

use crate::coordinator::Request;
use crate::coordinator::channel::{Channel, Report, Verdict};
use crate::coordinator::cleanup::Cleanup;
use crate::coordinator::state::{Event, Progress};
use crate::error::Result;
use crate::network::{InterfaceControl, epair};
use tracing::info;

/// How the jail side finished without an error of its own
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Host side took over the outer end, the pair stays
    HandedOff,
    /// Host side failed, the pair was destroyed
    Withdrawn,
}

pub fn run<C: InterfaceControl>(
    ctx: &C,
    req: &Request,
    chan: &mut Channel,
    progress: &mut Progress,
) -> Result<Outcome> {
    let base = ctx.create_epair()?;
    let mut cleanup = Cleanup::new(ctx, &base);
    progress.advance(Event::Create)?;

    let lladdr = match req.lladdr() {
        Some(addr) => Some(ctx.set_lladdr(&base, &addr)?),
        None => ctx.lladdr(&base)?,
    };
    progress.advance(Event::Resolve)?;

    let peer = epair::peer_name(&base)?;

    ctx.rename(&base, req.inner())?;
    cleanup.retarget(req.inner());
    progress.advance(Event::Rename)?;

    ctx.rename(&peer, req.outer())?;
    progress.advance(Event::Relabel)?;

    chan.send_report(&Report::new(lladdr))?;
    progress.advance(Event::Report)?;

    match chan.await_verdict() {
        Verdict::Proceed => {
            cleanup.disarm();
            progress.advance(Event::Finish)?;
            Ok(Outcome::HandedOff)
        }
        Verdict::Abort => {
            info!(interface = req.inner(), "host side failed, withdrawing");
            drop(cleanup);
            progress.fail();
            Ok(Outcome::Withdrawn)
        }
    }
}
