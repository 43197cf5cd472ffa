//! main - starts a dual connectivity PDCP node

use anyhow::{Result, ensure};
use async_std::channel::Sender;
use async_std::prelude::*;
use clap::Parser;
use dcnode::{Config, DcNode};
use local_ip_address;
use signal_hook::consts::signal::*;
use signal_hook_async_std::Signals;
use slog::{Drain, Logger, o};
use std::net::IpAddr;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Local IPv4 address of the node.  The node binds UDP port 2152 (for F1-U) and
    /// UDP port 22152 (for the DCX tunnel to its peer) on this address.  Defaults to
    /// the eth0 address.
    #[arg(long, default_value_t = local_ip_address::local_ip().unwrap())]
    local_ip: IpAddr,

    /// IPv4 address of the DU that terminates the local leg of each bearer.
    #[arg(long)]
    du_ip: IpAddr,

    /// TOML file listing the bearers to set up, one [bearer-N] table each.
    #[arg(long, default_value = "bearers.toml")]
    bearers_file: String,

    /// Reordering timer in milliseconds.  0 disables the timer, so that a gap in
    /// sequence numbers is only skipped once the reordering window is exceeded.
    #[arg(long, default_value_t = 100)]
    t_reordering_ms: u64,

    /// Node name used in logs.
    #[arg(long)]
    name: Option<String>,
}

#[async_std::main]
async fn main() -> Result<()> {
    exit_on_panic();
    let logger = init_logging();

    let args = Args::parse();
    check_local_ip(&args.local_ip)?;
    let bearers = dcnode::load_bearers_file(&args.bearers_file, &logger)?;

    let mut config = Config::new(args.local_ip, args.du_ip);
    config.name = args.name;
    config.t_reordering = match args.t_reordering_ms {
        0 => None,
        ms => Some(Duration::from_millis(ms)),
    };

    let node = DcNode::start(config, bearers, logger).await?;

    wait_for_signal().await?;
    node.graceful_shutdown().await;

    Ok(())
}

fn init_logging() -> Logger {
    // Use info level logging by default
    if std::env::var("RUST_LOG").is_err() {
        unsafe { std::env::set_var("RUST_LOG", "info") }
    }
    let decorator = slog_term::TermDecorator::new().build();
    let drain = slog_term::FullFormat::new(decorator).build().fuse();
    let drain = slog_async::Async::new(drain).build().fuse();
    let drain = slog_envlogger::new(drain);
    slog::Logger::root(drain, o!())
}

fn exit_on_panic() {
    let orig_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        orig_hook(panic_info);
        std::process::exit(1);
    }));
}

fn check_local_ip(ip: &IpAddr) -> Result<()> {
    ensure!(
        !ip.is_unspecified(),
        "Unspecific IP address 0.0.0.0 not allowed for local IP - this must be an address that the DU and peer can send to"
    );
    Ok(())
}

async fn wait_for_signal() -> Result<i32> {
    let signals = Signals::new([SIGHUP, SIGTERM, SIGINT, SIGQUIT])?;
    let handle = signals.handle();
    let (sig_sender, sig_receiver) = async_std::channel::unbounded();
    let signals_task = async_std::task::spawn(handle_signals(signals, sig_sender));
    let signal = sig_receiver.recv().await;
    handle.close();
    signals_task.await;
    Ok(signal?)
}

async fn handle_signals(signals: Signals, sig_sender: Sender<i32>) {
    let mut signals = signals.fuse();
    while let Some(signal) = signals.next().await {
        match signal {
            SIGHUP => {
                // Bearers are only read at startup.
            }
            SIGTERM | SIGINT | SIGQUIT => {
                let _ = sig_sender.send(signal).await;
            }
            _ => unreachable!(),
        }
    }
}
