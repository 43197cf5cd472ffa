mod bearer_handler;
mod sdu_port;

pub use bearer_handler::BearerHandler;
pub use sdu_port::SduPort;

use anyhow::Result;
use async_channel::Sender;
use async_trait::async_trait;
use pdcp::{DcxDataParams, PdcpStatus, TimestampedPdu};

/// Work for a bearer task.
#[derive(Debug)]
pub enum BearerEvent {
    /// An SDU from the upper layer.
    Transmit(Vec<u8>),
    /// A PDU from the DU.
    LocalPdu(TimestampedPdu),
    /// A PDU from the peer node.
    RemotePdu(DcxDataParams),
    GetStatus(Sender<PdcpStatus>),
    SetStatus(PdcpStatus),
    Release,
}

/// Routes events to bearer tasks by local TEID.
#[async_trait]
pub trait BearerDispatch: Send + Sync + Clone + 'static {
    async fn dispatch(&self, teid: u32, event: BearerEvent) -> Result<()>;
}
