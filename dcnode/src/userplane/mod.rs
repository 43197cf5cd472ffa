mod gtpu;
mod inbound;
mod outbound;
mod packet_processor;

pub use gtpu::*;
pub use inbound::InboundPipeline;
pub use outbound::{DcxTunnel, F1uSink, SduDelivery};
pub use packet_processor::{NodeCounters, PacketProcessor, counter_indices, create_udp_socket};

pub const GTPU_PORT: u16 = 2152; // TS29.281
pub const DCX_U_PORT: u16 = 22152;
