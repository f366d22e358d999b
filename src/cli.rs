//! Command-line interface for jep
//!
//! Uses clap with derive for type-safe CLI parsing

use crate::error::EX_USAGE;
use crate::network::{IfName, LinkAddress};
use clap::{ArgAction, Parser};

const AFTER_LONG_HELP: &str = "\
epair(4) nodes are created in <JAIL> with one end remaining in the jail and
one pulled out from the jail to connect to an already existing if_bridge(4).

RETURNS:
    0 on success and prints the MAC address of <IF_JAIL> to stdout
    !0 on failure and error(s) will be sent to stderr

EXAMPLE (assuming jail0br and lan0br are existing if_bridge(4)):
    jep test jail0test jail0br jail0
    jep test lan0test lan0br lan0";

/// jep - attach a VNET jail to a host bridge with an epair(4)
#[derive(Parser, Debug)]
#[command(name = "jep")]
#[command(author, version, about, long_about = None)]
#[command(after_long_help = AFTER_LONG_HELP)]
pub struct Cli {
    /// Disable automatic loading of network interface drivers
    #[arg(short = 'n', long)]
    pub no_kld: bool,

    /// Increase log verbosity (repeatable)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    /// A valid jail name or ID
    #[arg(value_parser = parse_jail)]
    pub jail: String,

    /// Name of the epair end pulled out to the host
    #[arg(value_parser = parse_ifname)]
    pub if_host: IfName,

    /// Existing if_bridge(4) on the host
    #[arg(value_parser = parse_ifname)]
    pub if_bridge: IfName,

    /// Name of the epair end that remains in the jail
    #[arg(value_parser = parse_ifname)]
    pub if_jail: IfName,

    /// MAC address for <IF_JAIL>, useful for configuring DHCP
    #[arg(value_parser = parse_mac)]
    pub mac: Option<LinkAddress>,
}

fn parse_jail(s: &str) -> Result<String, String> {
    if s.is_empty() || s.contains('\0') {
        return Err(format!("invalid jail name or ID: \"{}\"", s.escape_default()));
    }
    Ok(s.to_string())
}

fn parse_ifname(s: &str) -> Result<IfName, String> {
    IfName::new(s).map_err(|e| e.to_string())
}

fn parse_mac(s: &str) -> Result<LinkAddress, String> {
    s.parse().map_err(|e: crate::error::Error| e.to_string())
}

impl Cli {
    /// Parse arguments, exiting with `EX_USAGE` on a usage error
    ///
    /// `--help` and `--version` still print to stdout and exit 0.
    pub fn parse_args() -> Self {
        match Self::try_parse() {
            Ok(cli) => cli,
            Err(e) if e.use_stderr() => {
                let _ = e.print();
                std::process::exit(EX_USAGE);
            }
            Err(e) => e.exit(),
        }
    }

    /// Default tracing filter for the requested verbosity
    pub fn log_directive(&self) -> &'static str {
        match self.verbose {
            0 => "jep=warn",
            1 => "jep=info",
            _ => "jep=debug",
        }
    }
}
