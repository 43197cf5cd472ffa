//! bearer - PDCP entity for one split bearer
//!
//! Transmitted SDUs get a header carrying a bearer wide sequence number and are then
//! routed to the local or the remote leg.  Received PDUs, whichever leg they arrive
//! on, go through the same reordering buffer so that the upper layer sees one ordered
//! stream.

use crate::reordering::{PDCP_REORDERING_WINDOW, ReorderingBuffer, RxReport};
use crate::sequence::{PdcpStatus, SequenceNumbers, sn_next};
use crate::{
    DcxDataParams, Path, PdcpError, PdcpObserver, PdcpPdu, PduSink, SplitPolicy,
    TimestampedPdu, TransmitSelector, TxPdu, UpperLayer,
};
use slog::{Logger, debug, o};
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime};

/// SDUs no longer than an IPv4 header, a UDP header and 12 bytes of payload are not
/// passed up.
pub const MIN_SDU_SIZE: usize = 20 + 8 + 12;
/// Largest SDU accepted for transmission (TS38.323, 4.3.1).
pub const MAX_SDU_SIZE: usize = 9000;
pub const DEFAULT_MAX_BUFFERED: usize = 1024;
pub const DEFAULT_T_REORDERING: Duration = Duration::from_millis(100);

#[derive(Debug, Clone)]
pub struct BearerConfig {
    pub rnti: u16,
    pub lcid: u8,
    // The UE's RNTI at the secondary node.
    pub senb_rnti: u16,
    pub dual_connectivity: bool,
    pub in_sequence_delivery: bool,
    pub split_policy: SplitPolicy,
    pub reordering_window: u16,
    pub min_sdu_size: usize,
    pub max_buffered: usize,
    // None disables the reordering timer.
    pub t_reordering: Option<Duration>,
}

impl Default for BearerConfig {
    fn default() -> Self {
        BearerConfig {
            rnti: 0,
            lcid: 0,
            senb_rnti: 0,
            dual_connectivity: false,
            in_sequence_delivery: false,
            split_policy: SplitPolicy::default(),
            reordering_window: PDCP_REORDERING_WINDOW,
            min_sdu_size: MIN_SDU_SIZE,
            max_buffered: DEFAULT_MAX_BUFFERED,
            t_reordering: Some(DEFAULT_T_REORDERING),
        }
    }
}

pub struct PdcpBearer {
    config: BearerConfig,
    sns: SequenceNumbers,
    reordering: ReorderingBuffer,
    selector: TransmitSelector,
    local: Box<dyn PduSink>,
    remote: Option<Box<dyn PduSink>>,
    upper: Box<dyn UpperLayer>,
    observers: Vec<Arc<dyn PdcpObserver>>,
    logger: Logger,
}

impl PdcpBearer {
    pub fn new(
        config: BearerConfig,
        local: Box<dyn PduSink>,
        remote: Option<Box<dyn PduSink>>,
        upper: Box<dyn UpperLayer>,
        logger: &Logger,
    ) -> Result<Self, PdcpError> {
        if config.dual_connectivity && config.split_policy.uses_remote() && remote.is_none() {
            return Err(PdcpError::MissingRemotePath);
        }
        let logger = logger.new(o!("rnti" => config.rnti, "lcid" => config.lcid));
        Ok(PdcpBearer {
            sns: SequenceNumbers::default(),
            reordering: ReorderingBuffer::new(
                config.reordering_window,
                config.max_buffered,
                config.t_reordering,
            ),
            selector: TransmitSelector::new(
                config.split_policy,
                config.dual_connectivity && remote.is_some(),
            ),
            config,
            local,
            remote,
            upper,
            observers: vec![],
            logger,
        })
    }

    pub fn add_observer(&mut self, observer: Arc<dyn PdcpObserver>) {
        self.observers.push(observer);
    }

    pub fn uses_dual_connectivity(&self) -> bool {
        self.config.dual_connectivity && self.remote.is_some()
    }

    /// Frame an SDU from the upper layer and send it down one of the legs.
    pub fn transmit(&mut self, sdu: &[u8]) -> Result<Path, PdcpError> {
        if sdu.len() > MAX_SDU_SIZE {
            return Err(PdcpError::SduTooLong(sdu.len()));
        }
        let sn = self.sns.next_tx();
        let data = TimestampedPdu::now(PdcpPdu::new(sn, sdu));
        let bytes = data.pdu.len();
        let pdu = TxPdu {
            rnti: self.config.rnti,
            lcid: self.config.lcid,
            data,
        };

        let path = self.selector.select();
        debug!(self.logger, "Tx SN {} on {:?} path", sn, path);
        match path {
            Path::Local => self.local.send(pdu)?,
            Path::Remote => self
                .remote
                .as_mut()
                .ok_or(PdcpError::MissingRemotePath)?
                .send(pdu)?,
        }

        for observer in &self.observers {
            observer.tx_pdu(self.config.rnti, self.config.lcid, bytes);
        }
        Ok(path)
    }

    /// A PDU from the local lower layer.
    pub fn receive_local(&mut self, pdu: TimestampedPdu) -> Result<RxReport, PdcpError> {
        self.receive(pdu, Instant::now())
    }

    /// A PDU that reached this node over the inter-node tunnel.
    pub fn receive_remote(&mut self, params: DcxDataParams) -> Result<RxReport, PdcpError> {
        debug!(
            self.logger,
            "Rx PDU from peer rnti {} on teid {:#x}", params.source_rnti, params.teid
        );
        self.receive(params.data, Instant::now())
    }

    pub fn receive(&mut self, pdu: TimestampedPdu, now: Instant) -> Result<RxReport, PdcpError> {
        let delay = pdu
            .sent_at
            .and_then(|sent_at| SystemTime::now().duration_since(sent_at).ok());
        for observer in &self.observers {
            observer.rx_pdu(self.config.rnti, self.config.lcid, pdu.pdu.len(), delay);
        }

        let (sn, sdu) = pdu.pdu.into_parts()?;

        let PdcpBearer {
            config,
            sns,
            reordering,
            upper,
            observers,
            logger,
            ..
        } = self;
        let mut deliver =
            |sn: u16, sdu: Vec<u8>| deliver_sdu(config, &mut **upper, observers, logger, sn, sdu);

        if !config.in_sequence_delivery {
            deliver(sn, sdu);
            sns.set_rx(sn_next(sn));
            return Ok(RxReport {
                delivered: 1,
                ..Default::default()
            });
        }

        let report = reordering.receive(sns, sn, sdu, now, &mut deliver);
        if report.resynchronized {
            debug!(
                logger,
                "Resynchronized on SN {}, next expected {}, {} buffered",
                sn,
                sns.rx_next(),
                reordering.len()
            );
        }
        Ok(report)
    }

    /// When the bearer next needs [`Self::expire_reordering_timer`] to be called.
    pub fn reordering_deadline(&self) -> Option<Instant> {
        self.reordering.deadline()
    }

    pub fn expire_reordering_timer(&mut self, now: Instant) -> RxReport {
        let PdcpBearer {
            config,
            sns,
            reordering,
            upper,
            observers,
            logger,
            ..
        } = self;
        let report = reordering.expire(sns, now, &mut |sn, sdu: Vec<u8>| {
            deliver_sdu(config, &mut **upper, observers, logger, sn, sdu)
        });
        if report.resynchronized {
            debug!(
                self.logger,
                "Reordering timer expired, next expected SN {}, {} still buffered",
                self.sns.rx_next(),
                self.reordering.len()
            );
        }
        report
    }

    pub fn buffered(&self) -> usize {
        self.reordering.len()
    }

    pub fn status(&self) -> PdcpStatus {
        self.sns.status()
    }

    pub fn set_status(&mut self, status: PdcpStatus) {
        self.sns.restore(status)
    }

    /// Tear down the bearer.  Returns the number of buffered SDUs that were never
    /// delivered.
    pub fn release(mut self) -> usize {
        self.reordering.clear()
    }
}

// Pass an SDU up, unless it is too short to be worth delivering.
fn deliver_sdu(
    config: &BearerConfig,
    upper: &mut dyn UpperLayer,
    observers: &[Arc<dyn PdcpObserver>],
    logger: &Logger,
    sn: u16,
    sdu: Vec<u8>,
) {
    if sdu.len() <= config.min_sdu_size {
        debug!(logger, "Drop SN {} - SDU of {} bytes too short", sn, sdu.len());
        for observer in observers {
            observer.sdu_dropped(config.rnti, config.lcid, sdu.len());
        }
    } else {
        upper.deliver(sdu);
    }
}
