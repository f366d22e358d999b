//! Provisioning state machine
//!
//! Both processes walk the same machine: the jail side from `Init` to
//! `Reported`, the host side picks up at `Reported` once the report
//! arrives. Uses dynamic dispatch mode so each step is an event.

use crate::error::Error;
use std::fmt;
use tracing::{debug, warn};

use state_machines::state_machine;

state_machine! {
    name: ProvisionMachine,
    dynamic: true,
    initial: Init,
    states: [
        Init,
        ChildEntered,
        PairCreated,
        AddressResolved,
        RenamedInnerEnd,
        RenamedOuterEnd,
        Reported,
        ParentMigrated,
        Bridged,
        Up,
        Done,
        Failed
    ],
    events {
        enter {
            transition: { from: Init, to: ChildEntered }
        }
        create {
            transition: { from: ChildEntered, to: PairCreated }
        }
        resolve {
            transition: { from: PairCreated, to: AddressResolved }
        }
        rename {
            transition: { from: AddressResolved, to: RenamedInnerEnd }
        }
        relabel {
            transition: { from: RenamedInnerEnd, to: RenamedOuterEnd }
        }
        report {
            transition: { from: RenamedOuterEnd, to: Reported }
        }
        receive {
            transition: { from: Init, to: Reported }
        }
        migrate {
            transition: { from: Reported, to: ParentMigrated }
        }
        bridge {
            transition: { from: ParentMigrated, to: Bridged }
        }
        raise {
            transition: { from: Bridged, to: Up }
        }
        finish {
            transition: { from: [Reported, Up], to: Done }
        }
        fail {
            transition: {
                from: [
                    Init,
                    ChildEntered,
                    PairCreated,
                    AddressResolved,
                    RenamedInnerEnd,
                    RenamedOuterEnd,
                    Reported,
                    ParentMigrated,
                    Bridged,
                    Up
                ],
                to: Failed
            }
        }
    }
}

pub use ProvisionMachineEvent as Event;

/// Which side of the jail boundary a process is on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    /// Parent, stays in the host vnet
    Host,
    /// Child, attached to the target jail
    Jail,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Host => write!(f, "host"),
            Side::Jail => write!(f, "jail"),
        }
    }
}

/// Per-process progress through provisioning
pub struct Progress {
    machine: DynamicProvisionMachine<()>,
    side: Side,
}

impl Progress {
    pub fn new(side: Side) -> Self {
        Self {
            machine: ProvisionMachine::new(()).into_dynamic(),
            side,
        }
    }

    #[cfg(test)]
    pub fn side(&self) -> Side {
        self.side
    }

    /// Current stage name
    pub fn stage(&self) -> &str {
        self.machine.current_state()
    }

    #[cfg(test)]
    pub fn is_done(&self) -> bool {
        self.stage() == "Done"
    }

    /// Record a completed step
    pub fn advance(&mut self, event: Event) -> crate::error::Result<()> {
        let from = self.stage().to_string();
        self.machine
            .handle(event)
            .map_err(|_| Error::Protocol(format!("{} side cannot advance from {}", self.side, from)))?;
        debug!(side = %self.side, stage = self.stage(), "provisioning stage");
        Ok(())
    }

    /// Record a failure, remembering where it happened in the log
    pub fn fail(&mut self) {
        let from = self.stage().to_string();
        if self.machine.handle(Event::Fail).is_ok() {
            warn!(side = %self.side, stage = %from, "provisioning failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_state() {
        let progress = Progress::new(Side::Jail);
        assert_eq!(progress.stage(), "Init");
        assert_eq!(progress.side(), Side::Jail);
    }

    #[test]
    fn test_jail_side_walk() {
        let mut progress = Progress::new(Side::Jail);
        for event in [
            Event::Enter,
            Event::Create,
            Event::Resolve,
            Event::Rename,
            Event::Relabel,
            Event::Report,
        ] {
            progress.advance(event).unwrap();
        }
        assert_eq!(progress.stage(), "Reported");

        progress.advance(Event::Finish).unwrap();
        assert!(progress.is_done());
    }

    #[test]
    fn test_host_side_walk() {
        let mut progress = Progress::new(Side::Host);
        progress.advance(Event::Receive).unwrap();
        progress.advance(Event::Migrate).unwrap();
        assert_eq!(progress.stage(), "ParentMigrated");
        progress.advance(Event::Bridge).unwrap();
        progress.advance(Event::Raise).unwrap();
        assert_eq!(progress.stage(), "Up");
        progress.advance(Event::Finish).unwrap();
        assert!(progress.is_done());
    }

    #[test]
    fn test_out_of_order_step_is_protocol_error() {
        let mut progress = Progress::new(Side::Jail);
        let err = progress.advance(Event::Report).unwrap_err();
        assert!(matches!(err, Error::Protocol(_)));
        assert_eq!(progress.stage(), "Init");
    }

    #[test]
    fn test_fail_from_middle() {
        let mut progress = Progress::new(Side::Jail);
        progress.advance(Event::Enter).unwrap();
        progress.advance(Event::Create).unwrap();
        progress.fail();
        assert_eq!(progress.stage(), "Failed");
        assert!(progress.advance(Event::Resolve).is_err());
    }

    #[test]
    fn test_done_is_terminal() {
        let mut progress = Progress::new(Side::Host);
        progress.advance(Event::Receive).unwrap();
        progress.advance(Event::Finish).unwrap();
        progress.fail();
        assert!(progress.is_done());
    }
}
