//! Parent/child channel
//!
//! One stream socket pair, used exactly once in each direction:
//!
//! 1. jail side writes an 18 byte report: the link address text plus a NUL,
//!    or all zeroes when the address is unknown
//! 2. host side either closes its end (proceed) or writes an abort marker
//!    before closing (withdraw)

use crate::error::{Error, Result};
use crate::network::lladdr::{LLADDR_TEXT_LEN, LinkAddress};
use std::fmt;
use std::io::{self, Read, Write};
use std::net::Shutdown;
use std::os::unix::net::UnixStream;
use tracing::{debug, warn};

/// Size of the report payload
pub const REPORT_LEN: usize = LLADDR_TEXT_LEN + 1;

/// Sent by the host side to make the jail side tear down its epair
pub const ABORT_MARKER: &[u8] = b"errout\0";

/// What the jail side learned about the new interface
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Report {
    lladdr: Option<LinkAddress>,
}

impl Report {
    pub fn new(lladdr: Option<LinkAddress>) -> Self {
        Self { lladdr }
    }

    pub fn lladdr(&self) -> Option<LinkAddress> {
        self.lladdr
    }

    pub fn encode(&self) -> [u8; REPORT_LEN] {
        let mut buf = [0u8; REPORT_LEN];
        if let Some(addr) = self.lladdr {
            let text = addr.to_string();
            buf[..LLADDR_TEXT_LEN].copy_from_slice(text.as_bytes());
        }
        buf
    }

    pub fn decode(buf: &[u8; REPORT_LEN]) -> Result<Self> {
        if buf.iter().all(|&b| b == 0) {
            return Ok(Self { lladdr: None });
        }
        if buf[LLADDR_TEXT_LEN] != 0 {
            return Err(Error::MalformedReport("missing terminator".to_string()));
        }
        let text = std::str::from_utf8(&buf[..LLADDR_TEXT_LEN])
            .map_err(|e| Error::MalformedReport(e.to_string()))?;
        let addr = text
            .parse()
            .map_err(|_| Error::MalformedReport(format!("\"{}\"", text.escape_default())))?;
        Ok(Self { lladdr: Some(addr) })
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.lladdr {
            Some(addr) => write!(f, "{}", addr),
            None => Ok(()),
        }
    }
}

/// Host side decision, as seen from the jail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Proceed,
    Abort,
}

/// One end of the socket pair
///
/// Dropping the channel shuts the connection down, which the other end
/// reads as EOF. Only wrap the end a process keeps: shutting down an
/// inherited copy of the peer's end would cut the peer off too.
pub struct Channel {
    stream: UnixStream,
}

impl Channel {
    pub fn new(stream: UnixStream) -> Self {
        Self { stream }
    }

    pub fn send_report(&mut self, report: &Report) -> Result<()> {
        self.stream.write_all(&report.encode()).map_err(Error::Report)?;
        debug!(lladdr = %report, "sent report");
        Ok(())
    }

    /// Read the jail side report
    ///
    /// `None` means the jail side went away before reporting, which only
    /// happens when it has already failed.
    pub fn receive_report(&mut self) -> Option<[u8; REPORT_LEN]> {
        let mut buf = [0u8; REPORT_LEN];
        match self.stream.read_exact(&mut buf) {
            Ok(()) => Some(buf),
            Err(e) => {
                debug!("no report from jail side: {}", e);
                None
            }
        }
    }

    /// Block until the host side closes or writes
    pub fn await_verdict(&mut self) -> Verdict {
        let mut buf = [0u8; REPORT_LEN];
        loop {
            match self.stream.read(&mut buf) {
                Ok(0) => return Verdict::Proceed,
                Ok(_) => return Verdict::Abort,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    warn!("lost host side: {}", e);
                    return Verdict::Abort;
                }
            }
        }
    }

    /// Ask the jail side to withdraw; best effort
    pub fn signal_abort(&mut self) {
        if let Err(e) = self.stream.write_all(ABORT_MARKER) {
            debug!("abort marker not delivered: {}", e);
        }
    }

    pub fn close(&mut self) {
        // ENOTCONN once the peer is gone
        let _ = self.stream.shutdown(Shutdown::Both);
    }
}

impl Drop for Channel {
    fn drop(&mut self) {
        self.close();
    }
}
