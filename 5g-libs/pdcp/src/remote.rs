//! remote - carry PDCP PDUs to and from the peer node over the inter-node tunnel

use crate::{PdcpError, PduSink, TimestampedPdu, TxPdu};

/// Where the remote leg of a bearer terminates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeliveryTarget {
    /// The UE's identifier at the peer node.
    pub peer_rnti: u16,
    /// Tunnel endpoint of the bearer at the peer node.
    pub teid: u32,
}

#[derive(Debug, Clone)]
pub struct DcxDataParams {
    pub source_rnti: u16,
    pub target_rnti: u16,
    pub lcid: u8,
    pub teid: u32,
    pub data: TimestampedPdu,
}

/// The inter-node tunnel.
pub trait DcxTransport: Send {
    fn send_dc_pdcp_pdu(&mut self, params: DcxDataParams) -> Result<(), PdcpError>;
}

/// The remote leg of a bearer.  Wraps each PDU with the addressing the tunnel needs
/// and otherwise passes it through untouched.
pub struct RemoteDeliveryAdapter<T: DcxTransport> {
    transport: T,
    target: DeliveryTarget,
}

impl<T: DcxTransport> RemoteDeliveryAdapter<T> {
    pub fn new(transport: T, target: DeliveryTarget) -> Self {
        RemoteDeliveryAdapter { transport, target }
    }
}

impl<T: DcxTransport> PduSink for RemoteDeliveryAdapter<T> {
    fn send(&mut self, pdu: TxPdu) -> Result<(), PdcpError> {
        self.transport.send_dc_pdcp_pdu(DcxDataParams {
            source_rnti: pdu.rnti,
            target_rnti: self.target.peer_rnti,
            lcid: pdu.lcid,
            teid: self.target.teid,
            data: pdu.data,
        })
    }
}
