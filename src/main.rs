//! jep - epair(4) provisioning for VNET jails
//!
//! Creates an epair inside a jail, keeps one end there and pulls the other
//! out onto an existing host bridge, all without shelling out to ifconfig.

mod cli;
mod coordinator;
mod error;
mod jail;
mod kld;
mod network;
mod sys;

use cli::Cli;
use coordinator::{Report, Request};
use error::Result;
use jail::JailHandle;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

fn main() {
    let cli = Cli::parse_args();
    init_logging(&cli);

    if let Err(e) = run(cli) {
        eprintln!("jep: {}", e);
        std::process::exit(e.exit_code());
    }
}

fn init_logging(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cli.log_directive()));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn run(cli: Cli) -> Result<()> {
    if !cli.no_kld {
        kld::ensure_required()?;
    }

    let jail = JailHandle::resolve(&cli.jail)?;
    let req = Request::new(jail, cli.if_host, cli.if_bridge, cli.if_jail, cli.mac);
    let report = coordinator::provision(&req)?;

    println!("{}", success_line(req.jail().name(), &report));
    Ok(())
}

/// `{"<jail>": "<mac>"}`, spaced the way jep always printed it
fn success_line(jail: &str, report: &Report) -> String {
    let key = serde_json::Value::from(jail);
    let value = serde_json::Value::from(
        report
            .lladdr()
            .map(|addr| addr.to_string())
            .unwrap_or_default(),
    );
    format!("{{{}: {}}}", key, value)
}
