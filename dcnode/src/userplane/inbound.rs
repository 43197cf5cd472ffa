use super::counter_indices::*;
use super::{MAX_GTPU_PACKET_LEN, NodeCounters, decode_dcx, decode_f1u, parse_gtpu};
use crate::bearers::{BearerDispatch, BearerEvent};
use anyhow::Result;
use async_std::{
    net::UdpSocket,
    task::{self, JoinHandle},
};
use atomic_counter::AtomicCounter;
use pdcp::Path;
use slog::{Logger, info};
use std::sync::Arc;
use stop_token::StopToken;
use stop_token::prelude::*;

/// Reads GTP-U packets from one socket and hands the PDUs to the bearer with the
/// matching TEID.  F1-U packets arrive on the local leg and DCX packets on the remote
/// leg.
pub struct InboundPipeline<D: BearerDispatch> {
    socket: UdpSocket,
    path: Path,
    dispatch: D,
    counters: Arc<NodeCounters>,
}

impl<D: BearerDispatch> InboundPipeline<D> {
    pub fn new(socket: UdpSocket, path: Path, dispatch: D, counters: Arc<NodeCounters>) -> Self {
        Self {
            socket,
            path,
            dispatch,
            counters,
        }
    }

    pub fn run(self, stop_token: StopToken, logger: Logger) -> JoinHandle<()> {
        task::spawn(async move {
            let mut buf = vec![0u8; MAX_GTPU_PACKET_LEN];
            while let Ok(result) = self
                .handle_next_packet(&mut buf)
                .timeout_at(stop_token.clone())
                .await
            {
                if let Err(e) = result {
                    info!(logger, "Exiting {:?} inbound pipeline with error {e}", self.path);
                    break;
                }
            }
        })
    }

    async fn handle_next_packet(&self, buf: &mut [u8]) -> Result<()> {
        let (bytes_read, _peer) = self.socket.recv_from(buf).await?;

        let packet = match parse_gtpu(&buf[..bytes_read]) {
            Ok(packet) => packet,
            Err(reason) => {
                self.counters[reason.counter()].inc();
                return Ok(());
            }
        };

        let event = match self.path {
            Path::Local => {
                self.counters[RX_F1U_PKTS].inc();
                decode_f1u(&packet).map(BearerEvent::LocalPdu)
            }
            Path::Remote => {
                self.counters[RX_DCX_PKTS].inc();
                decode_dcx(&packet).map(BearerEvent::RemotePdu)
            }
        };
        let event = match event {
            Ok(event) => event,
            Err(reason) => {
                self.counters[reason.counter()].inc();
                return Ok(());
            }
        };

        if self.dispatch.dispatch(packet.teid, event).await.is_err() {
            self.counters[DROP_UNKNOWN_TEID].inc();
        }
        Ok(())
    }
}
