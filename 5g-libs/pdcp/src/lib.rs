//! lib - PDCP for split bearers
//!
//! A [`PdcpBearer`] numbers the SDUs it transmits and routes each PDU either to the
//! local lower layer or, for a split bearer, across to the peer node.  On receive it
//! merges both legs back into one ordered stream using a [`ReorderingBuffer`].

mod bearer;
mod error;
mod header;
mod remote;
mod reordering;
mod sap;
mod sequence;
mod split;

pub use bearer::{
    BearerConfig, DEFAULT_MAX_BUFFERED, DEFAULT_T_REORDERING, MAX_SDU_SIZE, MIN_SDU_SIZE, PdcpBearer,
};
pub use error::PdcpError;
pub use header::{DcBit, PDCP_HEADER_LEN, PdcpHeader, PdcpPdu, TimestampedPdu};
pub use remote::{DcxDataParams, DcxTransport, DeliveryTarget, RemoteDeliveryAdapter};
pub use reordering::{PDCP_REORDERING_WINDOW, ReorderingBuffer, RxReport};
pub use sap::{PdcpObserver, PduSink, TxPdu, UpperLayer};
pub use sequence::{
    PDCP_SN_MASK, PDCP_SN_MODULUS, PdcpStatus, SequenceNumbers, sn_distance, sn_next,
};
pub use split::{Path, SplitPolicy, TransmitSelector};
