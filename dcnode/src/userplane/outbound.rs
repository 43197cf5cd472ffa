use super::counter_indices::*;
use super::{NodeCounters, encode_dcx, encode_f1u};
use atomic_counter::AtomicCounter;
use pdcp::{DcxDataParams, DcxTransport, Path, PdcpError, PduSink, TxPdu, UpperLayer};
use slog::{Logger, debug, warn};
use std::io::ErrorKind;
use std::net::{SocketAddr, UdpSocket};
use std::sync::Arc;

// Sockets are shared with the async receive side and so are non-blocking.  A full send
// buffer loses the packet, like any other loss on the path.
fn send(
    socket: &UdpSocket,
    packet: &[u8],
    to: SocketAddr,
    path: Path,
    counters: &NodeCounters,
) -> Result<(), PdcpError> {
    match socket.send_to(packet, to) {
        Ok(_) => Ok(()),
        Err(e) if e.kind() == ErrorKind::WouldBlock => {
            counters[DROP_TX_FAILED].inc();
            Ok(())
        }
        Err(_) => {
            counters[DROP_TX_FAILED].inc();
            Err(PdcpError::PathClosed(path))
        }
    }
}

/// Local leg of a bearer: F1-U to the DU.
pub struct F1uSink {
    socket: Arc<UdpSocket>,
    du: SocketAddr,
    teid: u32,
    counters: Arc<NodeCounters>,
}

impl F1uSink {
    pub fn new(
        socket: Arc<UdpSocket>,
        du: SocketAddr,
        teid: u32,
        counters: Arc<NodeCounters>,
    ) -> Self {
        F1uSink {
            socket,
            du,
            teid,
            counters,
        }
    }
}

impl PduSink for F1uSink {
    fn send(&mut self, pdu: TxPdu) -> Result<(), PdcpError> {
        let packet = encode_f1u(self.teid, &pdu.data.pdu);
        send(&self.socket, &packet, self.du, Path::Local, &self.counters)
    }
}

/// DCX tunnel to one peer node.
pub struct DcxTunnel {
    socket: Arc<UdpSocket>,
    peer: SocketAddr,
    counters: Arc<NodeCounters>,
}

impl DcxTunnel {
    pub fn new(socket: Arc<UdpSocket>, peer: SocketAddr, counters: Arc<NodeCounters>) -> Self {
        DcxTunnel {
            socket,
            peer,
            counters,
        }
    }
}

impl DcxTransport for DcxTunnel {
    fn send_dc_pdcp_pdu(&mut self, params: DcxDataParams) -> Result<(), PdcpError> {
        let packet = encode_dcx(&params);
        send(&self.socket, &packet, self.peer, Path::Remote, &self.counters)
    }
}

/// Upper layer of a bearer in the node.  Each SDU goes out as one UDP datagram, or is
/// discarded if the bearer has nowhere to deliver to.
pub struct SduDelivery {
    socket: Arc<UdpSocket>,
    deliver_to: Option<SocketAddr>,
    logger: Logger,
}

impl SduDelivery {
    pub fn new(socket: Arc<UdpSocket>, deliver_to: Option<SocketAddr>, logger: Logger) -> Self {
        SduDelivery {
            socket,
            deliver_to,
            logger,
        }
    }
}

impl UpperLayer for SduDelivery {
    fn deliver(&mut self, sdu: Vec<u8>) {
        let Some(deliver_to) = self.deliver_to else {
            debug!(self.logger, "Discard SDU of {} bytes", sdu.len());
            return;
        };
        if let Err(e) = self.socket.send_to(&sdu, deliver_to) {
            warn!(self.logger, "Failed to deliver SDU to {deliver_to} - {e}");
        }
    }
}
