//! gtpu - framing for F1-U and the DCX tunnel
//!
//! Both carry PDCP PDUs in a GTP-U header with no optional fields (TS29.281, 5.1).
//! F1-U uses a plain T-PDU.  The DCX tunnel uses its own message type followed by a
//! fixed header carrying the send time and the UE addressing.
#![allow(clippy::unusual_byte_groupings)]
use super::counter_indices::*;
use pdcp::{DcxDataParams, MAX_SDU_SIZE, PDCP_HEADER_LEN, PdcpPdu, TimestampedPdu};
use std::time::{Duration, UNIX_EPOCH};

pub const GTP_HEADER_LEN: usize = 8;
pub const GTP_MESSAGE_TYPE_GPU: u8 = 255; // TS29.281, table 6.1-1
pub const GTP_MESSAGE_TYPE_DC_FORWARD: u8 = 4;

// Send time (8), source RNTI (2), target RNTI (2), LCID (1), spare (1).
pub const DCX_HEADER_LEN: usize = 14;

/// Largest datagram either leg carries: a DCX packet holding a maximum size SDU.
pub const MAX_GTPU_PACKET_LEN: usize =
    GTP_HEADER_LEN + DCX_HEADER_LEN + PDCP_HEADER_LEN + MAX_SDU_SIZE;

// Version=1, PT=1, R, E=0, S=0, PN=0
const GTP_FLAGS: u8 = 0b001_1_0_0_0_0;

/// Why an inbound packet was dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GtpuDrop {
    TooShort,
    Flags(u8),
    MessageType(u8),
    PdcpControl,
}

impl GtpuDrop {
    /// The counter that records this kind of drop.
    pub fn counter(&self) -> usize {
        match self {
            GtpuDrop::TooShort => DROP_TOO_SHORT,
            GtpuDrop::Flags(_) | GtpuDrop::MessageType(_) => DROP_GTP_HEADER,
            GtpuDrop::PdcpControl => DROP_PDCP_CONTROL,
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct GtpuPacket<'a> {
    pub message_type: u8,
    pub teid: u32,
    pub payload: &'a [u8],
}

pub fn parse_gtpu(buf: &[u8]) -> Result<GtpuPacket<'_>, GtpuDrop> {
    if buf.len() < GTP_HEADER_LEN {
        return Err(GtpuDrop::TooShort);
    }

    // Anything with optional fields or extension headers would move the payload.
    if buf[0] != GTP_FLAGS {
        return Err(GtpuDrop::Flags(buf[0]));
    }

    // The length field covers everything after the mandatory 8 bytes.
    let length = u16::from_be_bytes([buf[2], buf[3]]) as usize;
    if buf.len() < GTP_HEADER_LEN + length {
        return Err(GtpuDrop::TooShort);
    }
    Ok(GtpuPacket {
        message_type: buf[1],
        teid: u32::from_be_bytes([buf[4], buf[5], buf[6], buf[7]]),
        payload: &buf[GTP_HEADER_LEN..GTP_HEADER_LEN + length],
    })
}

fn gtpu_header(message_type: u8, teid: u32, payload_len: usize) -> Vec<u8> {
    let mut packet = Vec::with_capacity(GTP_HEADER_LEN + payload_len);
    packet.push(GTP_FLAGS);
    packet.push(message_type);
    packet.extend_from_slice(&(payload_len as u16).to_be_bytes());
    packet.extend_from_slice(&teid.to_be_bytes());
    packet
}

pub fn encode_f1u(teid: u32, pdu: &PdcpPdu) -> Vec<u8> {
    let mut packet = gtpu_header(GTP_MESSAGE_TYPE_GPU, teid, pdu.len());
    packet.extend_from_slice(&pdu.0);
    packet
}

pub fn decode_f1u(packet: &GtpuPacket) -> Result<TimestampedPdu, GtpuDrop> {
    if packet.message_type != GTP_MESSAGE_TYPE_GPU {
        return Err(GtpuDrop::MessageType(packet.message_type));
    }
    check_pdcp_data(packet.payload)?;
    Ok(TimestampedPdu::untimed(PdcpPdu(packet.payload.to_vec())))
}

pub fn encode_dcx(params: &DcxDataParams) -> Vec<u8> {
    let pdu = &params.data.pdu;
    let mut packet = gtpu_header(
        GTP_MESSAGE_TYPE_DC_FORWARD,
        params.teid,
        DCX_HEADER_LEN + pdu.len(),
    );
    let micros = params
        .data
        .sent_at
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map(|d| d.as_micros() as u64)
        .unwrap_or(0);
    packet.extend_from_slice(&micros.to_be_bytes());
    packet.extend_from_slice(&params.source_rnti.to_be_bytes());
    packet.extend_from_slice(&params.target_rnti.to_be_bytes());
    packet.push(params.lcid);
    packet.push(0);
    packet.extend_from_slice(&pdu.0);
    packet
}

pub fn decode_dcx(packet: &GtpuPacket) -> Result<DcxDataParams, GtpuDrop> {
    if packet.message_type != GTP_MESSAGE_TYPE_DC_FORWARD {
        return Err(GtpuDrop::MessageType(packet.message_type));
    }
    let payload = packet.payload;
    if payload.len() < DCX_HEADER_LEN {
        return Err(GtpuDrop::TooShort);
    }
    let (header, pdu) = payload.split_at(DCX_HEADER_LEN);
    check_pdcp_data(pdu)?;

    let mut micros = [0u8; 8];
    micros.copy_from_slice(&header[0..8]);
    let sent_at = match u64::from_be_bytes(micros) {
        0 => None,
        us => Some(UNIX_EPOCH + Duration::from_micros(us)),
    };
    Ok(DcxDataParams {
        source_rnti: u16::from_be_bytes([header[8], header[9]]),
        target_rnti: u16::from_be_bytes([header[10], header[11]]),
        lcid: header[12],
        teid: packet.teid,
        data: TimestampedPdu {
            sent_at,
            pdu: PdcpPdu(pdu.to_vec()),
        },
    })
}

// The D/C bit leads the PDCP header (TS38.323, 6.2.1).  Control PDUs are not handled.
fn check_pdcp_data(pdu: &[u8]) -> Result<(), GtpuDrop> {
    if pdu.len() < PDCP_HEADER_LEN {
        return Err(GtpuDrop::TooShort);
    }
    if pdu[0] & 0x80 == 0 {
        return Err(GtpuDrop::PdcpControl);
    }
    Ok(())
}
