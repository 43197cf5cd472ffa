use super::{DCX_U_PORT, DcxTunnel, F1uSink, GTPU_PORT, InboundPipeline};
use crate::bearers::BearerDispatch;
use crate::{Config, PeerSpec, ShutdownHandle};
use anyhow::{Context, Result, ensure};
use async_std::sync::Mutex;
use atomic_counter::{AtomicCounter, RelaxedCounter};
use derive_deref::Deref;
use pdcp::{Path, PdcpObserver};
use slog::{Logger, info, warn};
use socket2::{Domain, Protocol, Socket, Type};
use std::net::{IpAddr, SocketAddr, UdpSocket};
use std::sync::Arc;
use std::time::Duration;
use stop_token::StopSource;
use stop_token::prelude::*;

pub mod counter_indices {
    pub const TX_PDUS: usize = 0;
    pub const TX_BYTES: usize = 1;
    pub const RX_PDUS: usize = 2;
    pub const RX_BYTES: usize = 3;
    pub const RX_F1U_PKTS: usize = 4;
    pub const RX_DCX_PKTS: usize = 5;
    // Sum of one way delay over the PDUs that carried a send time.
    pub const RX_DELAY_US: usize = 6;
    pub const RX_TIMED_PDUS: usize = 7;

    // Counters from here on are drops.
    pub const DROP_TOO_SHORT: usize = 8;
    pub const DROP_GTP_HEADER: usize = 9;
    pub const DROP_PDCP_CONTROL: usize = 10;
    pub const DROP_UNKNOWN_TEID: usize = 11;
    pub const DROP_SHORT_SDU: usize = 12;
    pub const DROP_TX_FAILED: usize = 13;
    pub const NUM_COUNTERS: usize = 14;
}
use counter_indices::*;

#[derive(Default, Deref)]
pub struct NodeCounters([RelaxedCounter; NUM_COUNTERS]);

impl PdcpObserver for NodeCounters {
    fn tx_pdu(&self, _rnti: u16, _lcid: u8, bytes: usize) {
        self[TX_PDUS].inc();
        self[TX_BYTES].add(bytes);
    }

    fn rx_pdu(&self, _rnti: u16, _lcid: u8, bytes: usize, delay: Option<Duration>) {
        self[RX_PDUS].inc();
        self[RX_BYTES].add(bytes);
        if let Some(delay) = delay {
            self[RX_TIMED_PDUS].inc();
            self[RX_DELAY_US].add(delay.as_micros() as usize);
        }
    }

    fn sdu_dropped(&self, _rnti: u16, _lcid: u8, _bytes: usize) {
        self[DROP_SHORT_SDU].inc();
    }
}

/// Owns the node's F1-U and DCX sockets, and the tasks that read from them.
pub struct PacketProcessor {
    f1u_socket: Arc<UdpSocket>,
    dcx_socket: Arc<UdpSocket>,
    du_ip_addr: IpAddr,
    counters: Arc<NodeCounters>,
    tasks: Mutex<Vec<ShutdownHandle>>,
}

impl PacketProcessor {
    pub fn new<D: BearerDispatch>(config: &Config, dispatch: D, logger: &Logger) -> Result<Self> {
        // Create the packet source/sinks.
        let f1u_socket = create_udp_socket(SocketAddr::new(config.ip_addr, GTPU_PORT), logger)?;
        let f1u_socket_clone = f1u_socket.try_clone()?;
        let dcx_socket = create_udp_socket(SocketAddr::new(config.ip_addr, DCX_U_PORT), logger)?;
        let dcx_socket_clone = dcx_socket.try_clone()?;
        let counters = Arc::new(NodeCounters::default());
        let mut tasks = vec![];

        // Start the inbound pipelines (F1-U -> bearer, DCX -> bearer).
        for (socket, path) in [(f1u_socket_clone, Path::Local), (dcx_socket_clone, Path::Remote)] {
            let stop_source = StopSource::new();
            let pipeline =
                InboundPipeline::new(socket.into(), path, dispatch.clone(), counters.clone());
            let handle = pipeline.run(stop_source.token(), logger.clone());
            tasks.push(ShutdownHandle::new(handle, stop_source));
        }

        // Spawn the stats task
        let stop_source = StopSource::new();
        let stats_task = async_std::task::spawn(dump_stats(
            logger.clone(),
            counters.clone(),
            config.stats_interval,
            stop_source.token(),
        ));
        tasks.push(ShutdownHandle::new(stats_task, stop_source));

        Ok(PacketProcessor {
            f1u_socket: Arc::new(f1u_socket),
            dcx_socket: Arc::new(dcx_socket),
            du_ip_addr: config.du_ip_addr,
            counters,
            tasks: Mutex::new(tasks),
        })
    }

    pub fn counters(&self) -> &Arc<NodeCounters> {
        &self.counters
    }

    /// The local leg of a bearer, towards the DU.
    pub fn f1u_sink(&self, du_teid: u32) -> F1uSink {
        F1uSink::new(
            self.f1u_socket.clone(),
            SocketAddr::new(self.du_ip_addr, GTPU_PORT),
            du_teid,
            self.counters.clone(),
        )
    }

    /// The DCX tunnel to a peer node.
    pub fn dcx_tunnel(&self, peer: &PeerSpec) -> DcxTunnel {
        DcxTunnel::new(
            self.dcx_socket.clone(),
            SocketAddr::new(peer.ip_addr, DCX_U_PORT),
            self.counters.clone(),
        )
    }

    /// Stop the pipelines and the stats task.
    pub async fn graceful_shutdown(&self) {
        let tasks: Vec<_> = self.tasks.lock().await.drain(..).collect();
        for task in tasks {
            task.graceful_shutdown().await;
        }
    }
}

pub fn create_udp_socket(transport_address: SocketAddr, logger: &Logger) -> Result<UdpSocket> {
    let domain = match transport_address.ip() {
        IpAddr::V4(_) => Domain::IPV4,
        IpAddr::V6(_) => Domain::IPV6,
    };
    ensure!(
        transport_address.is_ipv4(),
        "IPv6 not implemented - {transport_address}"
    );

    let socket = Socket::new(domain, Type::DGRAM, Some(Protocol::UDP))?;
    socket.set_reuse_port(true)?;
    socket
        .bind(&transport_address.into())
        .context(format!("Failed to bind {}", transport_address))?;
    info!(logger, "Serving UDP on {transport_address}");
    Ok(socket.into())
}

async fn dump_stats(
    logger: Logger,
    counters: Arc<NodeCounters>,
    interval: Duration,
    stop_token: stop_token::StopToken,
) {
    let mut last = [0usize; NUM_COUNTERS];
    const FIRST_WARN_IDX: usize = DROP_TOO_SHORT;

    while async_std::task::sleep(interval)
        .timeout_at(stop_token.clone())
        .await
        .is_ok()
    {
        if counters[RX_PDUS].get() != last[RX_PDUS] || counters[TX_PDUS].get() != last[TX_PDUS] {
            for idx in 0..FIRST_WARN_IDX {
                last[idx] = counters[idx].get();
            }
            let avg_delay_us = last[RX_DELAY_US]
                .checked_div(last[RX_TIMED_PDUS])
                .unwrap_or(0);

            info!(
                &logger,
                "TX pdus={} bytes={} RX pdus={} bytes={} f1u={} dcx={} avg_delay_us={}",
                last[TX_PDUS],
                last[TX_BYTES],
                last[RX_PDUS],
                last[RX_BYTES],
                last[RX_F1U_PKTS],
                last[RX_DCX_PKTS],
                avg_delay_us
            );
        }

        let mut warn_needed = false;
        for idx in FIRST_WARN_IDX..NUM_COUNTERS {
            if last[idx] != counters[idx].get() {
                warn_needed = true;
            }
            last[idx] = counters[idx].get();
        }

        if warn_needed {
            warn!(
                &logger,
                "DROPS too_short={} gtp_header={} pdcp_ctrl={} bad_teid={} short_sdu={} tx_failed={}",
                last[DROP_TOO_SHORT],
                last[DROP_GTP_HEADER],
                last[DROP_PDCP_CONTROL],
                last[DROP_UNKNOWN_TEID],
                last[DROP_SHORT_SDU],
                last[DROP_TX_FAILED]
            );
        }
    }
}
