//! sequence - transmit and receive PDCP sequence number state

pub const PDCP_SN_MODULUS: u16 = 4096; // 12 bits, as per TS38.323, 6.3.2
pub const PDCP_SN_MASK: u16 = PDCP_SN_MODULUS - 1;

/// Distance from `from` forwards to `to` in the sequence number space.
pub fn sn_distance(from: u16, to: u16) -> u16 {
    to.wrapping_sub(from) & PDCP_SN_MASK
}

pub fn sn_next(sn: u16) -> u16 {
    sn.wrapping_add(1) & PDCP_SN_MASK
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PdcpStatus {
    pub tx_sn: u16,
    pub rx_sn: u16,
}

#[derive(Debug, Default)]
pub struct SequenceNumbers {
    tx_next: u16,
    rx_next: u16,
}

impl SequenceNumbers {
    /// Take the sequence number for the next transmitted PDU.
    pub fn next_tx(&mut self) -> u16 {
        let sn = self.tx_next;
        self.tx_next = sn_next(sn);
        sn
    }

    /// The sequence number the receiver expects next.
    pub fn rx_next(&self) -> u16 {
        self.rx_next
    }

    pub fn advance_rx(&mut self) {
        self.rx_next = sn_next(self.rx_next);
    }

    pub fn set_rx(&mut self, sn: u16) {
        self.rx_next = sn & PDCP_SN_MASK;
    }

    pub fn status(&self) -> PdcpStatus {
        PdcpStatus {
            tx_sn: self.tx_next,
            rx_sn: self.rx_next,
        }
    }

    pub fn restore(&mut self, status: PdcpStatus) {
        self.tx_next = status.tx_sn & PDCP_SN_MASK;
        self.rx_next = status.rx_sn & PDCP_SN_MASK;
    }
}
