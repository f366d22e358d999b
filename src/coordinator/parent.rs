//! Host side of provisioning
//!
//! Waits for the jail side report, then pulls the outer end into the host
//! vnet, bridges it and brings it up. Any failure here is answered with an
//! abort marker so the jail side tears the pair down.

use crate::coordinator::Request;
use crate::coordinator::channel::{Channel, Report};
use crate::coordinator::state::{Event, Progress};
use crate::error::Result;
use crate::network::InterfaceControl;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handoff {
    /// Outer end is bridged and up
    Completed(Report),
    /// Jail side gave up before reporting; its exit status says why
    ChildFailed,
}

pub fn run<C: InterfaceControl>(
    ctx: &C,
    req: &Request,
    chan: &mut Channel,
    progress: &mut Progress,
) -> Result<Handoff> {
    let Some(raw) = chan.receive_report() else {
        debug!("jail side closed the channel without a report");
        progress.fail();
        return Ok(Handoff::ChildFailed);
    };

    let wired = Report::decode(&raw).and_then(|report| {
        progress.advance(Event::Receive)?;
        wire_outer_end(ctx, req, progress)?;
        Ok(report)
    });

    match wired {
        Ok(report) => {
            chan.close();
            progress.advance(Event::Finish)?;
            Ok(Handoff::Completed(report))
        }
        Err(e) => {
            chan.signal_abort();
            progress.fail();
            Err(e)
        }
    }
}

fn wire_outer_end<C: InterfaceControl>(ctx: &C, req: &Request, progress: &mut Progress) -> Result<()> {
    ctx.vnet_pull(req.outer(), req.jail().jid())?;
    progress.advance(Event::Migrate)?;

    ctx.bridge_add(req.bridge(), req.outer())?;
    progress.advance(Event::Bridge)?;

    ctx.up(req.outer())?;
    progress.advance(Event::Raise)
}
