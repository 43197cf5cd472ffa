use anyhow::Result;
use dcnode::{BearerSpec, Config, DcNode};
use slog::{Drain, Logger, o};
use std::time::Duration;

pub const T_REORDERING: Duration = Duration::from_millis(300);

pub fn init() -> Logger {
    exit_on_panic();
    init_logging()
}

fn exit_on_panic() {
    let orig_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        orig_hook(panic_info);
        std::process::exit(1);
    }));
}

fn init_logging() -> Logger {
    let decorator = slog_term::TermDecorator::new().build();
    let drain = slog_term::CompactFormat::new(decorator).build();
    let drain = std::sync::Mutex::new(drain).fuse();
    let drain = slog_envlogger::new(drain);
    slog::Logger::root(drain, o!())
}

pub async fn start_node(
    addr: &str,
    du_addr: &str,
    bearers: Vec<BearerSpec>,
    logger: &Logger,
) -> Result<DcNode> {
    let mut config = Config::new(addr.parse()?, du_addr.parse()?);
    config.name = Some(format!("node {addr}"));
    config.t_reordering = Some(T_REORDERING);
    DcNode::start(config, bearers, logger.new(o!("node" => addr.to_string()))).await
}

/// An SDU big enough to be delivered, tagged with `n`.
pub fn test_sdu(n: u32) -> Vec<u8> {
    let mut sdu = n.to_be_bytes().to_vec();
    sdu.resize(64, 0x5a);
    sdu
}

pub fn tag(sdu: &[u8]) -> u32 {
    u32::from_be_bytes([sdu[0], sdu[1], sdu[2], sdu[3]])
}
