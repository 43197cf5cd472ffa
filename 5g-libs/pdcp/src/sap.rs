//! sap - interfaces between a PDCP bearer and the layers around it

use crate::{PdcpError, TimestampedPdu};
use std::time::Duration;

/// A PDU on its way down to a lower layer.
#[derive(Debug, Clone)]
pub struct TxPdu {
    pub rnti: u16,
    pub lcid: u8,
    pub data: TimestampedPdu,
}

/// One leg of the bearer.  Sends are fire-and-forget; an error means the leg is gone.
pub trait PduSink: Send {
    fn send(&mut self, pdu: TxPdu) -> Result<(), PdcpError>;
}

/// Receives SDUs that have made it through the bearer, in sequence order.
pub trait UpperLayer: Send {
    fn deliver(&mut self, sdu: Vec<u8>);
}

/// Telemetry hooks.  All methods default to doing nothing.
pub trait PdcpObserver: Send + Sync {
    fn tx_pdu(&self, _rnti: u16, _lcid: u8, _bytes: usize) {}
    fn rx_pdu(&self, _rnti: u16, _lcid: u8, _bytes: usize, _delay: Option<Duration>) {}
    fn sdu_dropped(&self, _rnti: u16, _lcid: u8, _bytes: usize) {}
}
