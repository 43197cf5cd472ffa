//! header - PDCP Data PDU framing for DRBs with a 12 bit sequence number

use crate::{PDCP_SN_MASK, PdcpError};
use std::time::SystemTime;

pub const PDCP_HEADER_LEN: usize = 2;

/// The D/C field.  TS38.323, 6.3.7.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DcBit {
    Control = 0,
    Data = 1,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PdcpHeader {
    pub dc: DcBit,
    pub sn: u16,
}

impl PdcpHeader {
    pub fn data(sn: u16) -> Self {
        PdcpHeader {
            dc: DcBit::Data,
            sn: sn & PDCP_SN_MASK,
        }
    }

    /// | D/C |  R  |  R  |  R  |   SN (4 MSBs)   |
    /// |             SN (8 LSBs)                 |
    pub fn encode(&self) -> [u8; PDCP_HEADER_LEN] {
        [
            ((self.dc as u8) << 7) | ((self.sn & 0x0f00) >> 8) as u8,
            (self.sn & 0xff) as u8,
        ]
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, PdcpError> {
        if bytes.len() < PDCP_HEADER_LEN {
            return Err(PdcpError::TooShort(bytes.len()));
        }
        if bytes[0] & 0x80 == 0 {
            return Err(PdcpError::MalformedHeader(bytes[0]));
        }
        Ok(PdcpHeader {
            dc: DcBit::Data,
            sn: (((bytes[0] & 0x0f) as u16) << 8) | bytes[1] as u16,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PdcpPdu(pub Vec<u8>);

impl PdcpPdu {
    /// Prepend a data PDU header to an SDU.
    pub fn new(sn: u16, sdu: &[u8]) -> Self {
        let mut pdu = Vec::with_capacity(PDCP_HEADER_LEN + sdu.len());
        pdu.extend_from_slice(&PdcpHeader::data(sn).encode());
        pdu.extend_from_slice(sdu);
        PdcpPdu(pdu)
    }

    pub fn header(&self) -> Result<PdcpHeader, PdcpError> {
        PdcpHeader::decode(&self.0)
    }

    /// Strip the header, returning the sequence number and the SDU.
    pub fn into_parts(mut self) -> Result<(u16, Vec<u8>), PdcpError> {
        let header = self.header()?;
        Ok((header.sn, self.0.split_off(PDCP_HEADER_LEN)))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<PdcpPdu> for Vec<u8> {
    fn from(p: PdcpPdu) -> Self {
        p.0
    }
}

/// A PDCP PDU together with the time its sender framed it.  The timestamp travels
/// alongside the PDU and is not part of the PDCP wire format; it is `None` when the
/// path that carried the PDU had no way to convey it.
#[derive(Debug, Clone)]
pub struct TimestampedPdu {
    pub sent_at: Option<SystemTime>,
    pub pdu: PdcpPdu,
}

impl TimestampedPdu {
    pub fn now(pdu: PdcpPdu) -> Self {
        TimestampedPdu {
            sent_at: Some(SystemTime::now()),
            pdu,
        }
    }

    pub fn untimed(pdu: PdcpPdu) -> Self {
        TimestampedPdu { sent_at: None, pdu }
    }
}
