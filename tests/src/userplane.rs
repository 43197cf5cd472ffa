#![allow(clippy::unusual_byte_groupings)]
use anyhow::{Result, ensure};
use async_net::{IpAddr, SocketAddr, UdpSocket};
use async_std::future;
use dcnode::{DCX_U_PORT, GTPU_PORT};
use pdcp::PdcpPdu;
use slog::{Logger, info};
use std::time::Duration;

const GTP_MESSAGE_TYPE_GPU: u8 = 255; // TS29.281, table 6.1-1
const GTP_MESSAGE_TYPE_DC_FORWARD: u8 = 4;
const GTP_HEADER_LEN: usize = 8;
const DCX_HEADER_LEN: usize = 14;

/// A PDCP PDU as seen on the wire.
#[derive(Debug, PartialEq, Eq)]
pub struct ReceivedPdu {
    pub teid: u32,
    pub sn: u16,
    pub sdu: Vec<u8>,
    // Only present on the DCX tunnel.
    pub source_rnti: Option<u16>,
}

fn gtp_header(message_type: u8, teid: u32, payload_len: usize) -> Vec<u8> {
    let teid = teid.to_be_bytes();
    let length = (payload_len as u16).to_be_bytes();
    vec![
        0b001_1_0_0_0_0, // version, PT, R, E, S, PN
        message_type,
        length[0],
        length[1],
        teid[0],
        teid[1],
        teid[2],
        teid[3],
    ]
}

fn parse_pdcp(pdu: &[u8]) -> Result<(u16, Vec<u8>)> {
    Ok(PdcpPdu(pdu.to_vec()).into_parts()?)
}

async fn recv_packet(socket: &UdpSocket, wait: Duration) -> Result<Vec<u8>> {
    let mut buf = vec![0u8; 2000];
    let (bytes_received, _source_address) =
        future::timeout(wait, socket.recv_from(&mut buf)).await??;
    buf.truncate(bytes_received);
    ensure!(buf.len() >= GTP_HEADER_LEN, "GTP-U packet too short");
    Ok(buf)
}

fn teid_of(packet: &[u8]) -> u32 {
    u32::from_be_bytes([packet[4], packet[5], packet[6], packet[7]])
}

/// Stands in for the DU at the far end of F1-U.
pub struct MockDu {
    gtpu_socket: UdpSocket,
    logger: Logger,
}

impl MockDu {
    pub async fn new(local_ip: &str, logger: &Logger) -> Result<Self> {
        let transport_address = format!("{}:{}", local_ip, GTPU_PORT);
        info!(logger, "Mock DU serving GTP-U on {transport_address}");
        let gtpu_socket = UdpSocket::bind(transport_address).await?;
        Ok(MockDu {
            gtpu_socket,
            logger: logger.clone(),
        })
    }

    pub async fn send_pdu(&self, node_ip: IpAddr, teid: u32, sn: u16, sdu: &[u8]) -> Result<()> {
        let pdu = PdcpPdu::new(sn, sdu);
        let mut packet = gtp_header(GTP_MESSAGE_TYPE_GPU, teid, pdu.len());
        packet.extend_from_slice(&pdu.0);
        info!(self.logger, "DU >> F1-U PDU SN {sn} TEID {teid:#010x}");
        self.gtpu_socket
            .send_to(&packet, SocketAddr::new(node_ip, GTPU_PORT))
            .await?;
        Ok(())
    }

    pub async fn recv_pdu(&self) -> Result<ReceivedPdu> {
        let packet = recv_packet(&self.gtpu_socket, Duration::from_secs(1)).await?;
        ensure!(
            packet[1] == GTP_MESSAGE_TYPE_GPU,
            "Unexpected GTP message type {}",
            packet[1]
        );
        let (sn, sdu) = parse_pdcp(&packet[GTP_HEADER_LEN..])?;
        info!(self.logger, "DU << F1-U PDU SN {sn}");
        Ok(ReceivedPdu {
            teid: teid_of(&packet),
            sn,
            sdu,
            source_rnti: None,
        })
    }
}

/// Stands in for the peer node at the far end of the DCX tunnel.
pub struct MockPeer {
    dcx_socket: UdpSocket,
    rnti: u16,
    logger: Logger,
}

impl MockPeer {
    pub async fn new(local_ip: &str, rnti: u16, logger: &Logger) -> Result<Self> {
        let transport_address = format!("{}:{}", local_ip, DCX_U_PORT);
        info!(logger, "Mock peer serving DCX on {transport_address}");
        let dcx_socket = UdpSocket::bind(transport_address).await?;
        Ok(MockPeer {
            dcx_socket,
            rnti,
            logger: logger.clone(),
        })
    }

    pub async fn send_pdu(
        &self,
        node_ip: IpAddr,
        teid: u32,
        target_rnti: u16,
        sn: u16,
        sdu: &[u8],
    ) -> Result<()> {
        let pdu = PdcpPdu::new(sn, sdu);
        let mut packet = gtp_header(GTP_MESSAGE_TYPE_DC_FORWARD, teid, DCX_HEADER_LEN + pdu.len());
        // No send time
        packet.extend_from_slice(&[0; 8]);
        packet.extend_from_slice(&self.rnti.to_be_bytes());
        packet.extend_from_slice(&target_rnti.to_be_bytes());
        packet.extend_from_slice(&[3, 0]); // LCID, spare
        packet.extend_from_slice(&pdu.0);
        info!(self.logger, "Peer >> DCX PDU SN {sn} TEID {teid:#010x}");
        self.dcx_socket
            .send_to(&packet, SocketAddr::new(node_ip, DCX_U_PORT))
            .await?;
        Ok(())
    }

    pub async fn recv_pdu(&self) -> Result<ReceivedPdu> {
        let packet = recv_packet(&self.dcx_socket, Duration::from_secs(1)).await?;
        ensure!(
            packet[1] == GTP_MESSAGE_TYPE_DC_FORWARD,
            "Unexpected GTP message type {}",
            packet[1]
        );
        ensure!(packet.len() >= GTP_HEADER_LEN + DCX_HEADER_LEN, "DCX packet too short");
        let dcx_header = &packet[GTP_HEADER_LEN..GTP_HEADER_LEN + DCX_HEADER_LEN];
        let target_rnti = u16::from_be_bytes([dcx_header[10], dcx_header[11]]);
        ensure!(
            target_rnti == self.rnti,
            "DCX PDU for RNTI {target_rnti}, expected {}",
            self.rnti
        );
        let (sn, sdu) = parse_pdcp(&packet[GTP_HEADER_LEN + DCX_HEADER_LEN..])?;
        info!(self.logger, "Peer << DCX PDU SN {sn}");
        Ok(ReceivedPdu {
            teid: teid_of(&packet),
            sn,
            sdu,
            source_rnti: Some(u16::from_be_bytes([dcx_header[8], dcx_header[9]])),
        })
    }
}

/// The application on either side of the bearer.  Sends SDUs into a node's SDU port and
/// receives what the node delivers.
pub struct MockApp {
    socket: UdpSocket,
}

impl MockApp {
    pub async fn new(local_addr: &str) -> Result<Self> {
        Ok(MockApp {
            socket: UdpSocket::bind(local_addr).await?,
        })
    }

    pub fn addr(&self) -> Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }

    pub async fn send_sdu(&self, to: SocketAddr, sdu: &[u8]) -> Result<()> {
        self.socket.send_to(sdu, to).await?;
        Ok(())
    }

    pub async fn recv_sdu(&self) -> Result<Vec<u8>> {
        self.recv_sdu_within(Duration::from_secs(1)).await
    }

    pub async fn recv_sdu_within(&self, wait: Duration) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; 2000];
        let (bytes_received, _source_address) =
            future::timeout(wait, self.socket.recv_from(&mut buf)).await??;
        buf.truncate(bytes_received);
        Ok(buf)
    }

    pub async fn expect_nothing(&self, wait: Duration) -> Result<()> {
        let result = self.recv_sdu_within(wait).await;
        ensure!(result.is_err(), "Unexpected SDU {:?}", result);
        Ok(())
    }
}
