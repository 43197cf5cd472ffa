//! reordering - receive side in-sequence delivery of PDCP SDUs
//!
//! SDUs that arrive ahead of the next expected sequence number are held here, keyed
//! by sequence number, until the gap in front of them closes.  A gap that never
//! closes is skipped over ("resynchronization") when
//! - a later PDU arrives too far from the expected sequence number, or
//! - the buffer grows beyond its cap, or
//! - the reordering timer expires.
//!
//! The next expected sequence number itself lives in [`SequenceNumbers`] so that it
//! can be read and restored together with the transmit counter.

use crate::sequence::{SequenceNumbers, sn_distance};
use std::collections::BTreeMap;
use std::time::{Duration, Instant};

/// Half the 12 bit sequence number space.
pub const PDCP_REORDERING_WINDOW: u16 = 2047;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RxReport {
    /// Number of SDUs handed to the deliver function.
    pub delivered: usize,
    pub buffered: bool,
    pub duplicate: bool,
    pub resynchronized: bool,
}

#[derive(Debug)]
pub struct ReorderingBuffer {
    pending: BTreeMap<u16, Vec<u8>>,
    sequence_lost: bool,
    window: u16,
    max_buffered: usize,
    t_reordering: Option<Duration>,
    deadline: Option<Instant>,
}

impl ReorderingBuffer {
    pub fn new(window: u16, max_buffered: usize, t_reordering: Option<Duration>) -> Self {
        ReorderingBuffer {
            pending: BTreeMap::new(),
            sequence_lost: false,
            window,
            max_buffered: max_buffered.max(1),
            t_reordering,
            deadline: None,
        }
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn sequence_lost(&self) -> bool {
        self.sequence_lost
    }

    /// When the reordering timer is due to fire, if it is running.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Process an SDU received with sequence number `sn`.  `deliver` is called for every
    /// SDU released to the upper layer, in sequence order.
    pub fn receive<F: FnMut(u16, Vec<u8>)>(
        &mut self,
        sns: &mut SequenceNumbers,
        sn: u16,
        sdu: Vec<u8>,
        now: Instant,
        deliver: &mut F,
    ) -> RxReport {
        let mut report = RxReport::default();

        if sn != sns.rx_next() {
            while self.out_of_window(sns.rx_next(), sn) {
                report.resynchronized = true;
                if !self.release_oldest(sns, deliver, &mut report) {
                    sns.set_rx(sn);
                    break;
                }
            }
        }

        if sn == sns.rx_next() {
            deliver_in_sequence(sns, sn, sdu, deliver, &mut report);
            self.unload(sns, deliver, &mut report);
        } else if self.pending.contains_key(&sn) {
            report.duplicate = true;
        } else {
            self.pending.insert(sn, sdu);
            self.sequence_lost = true;
            report.buffered = true;

            while self.pending.len() > self.max_buffered {
                report.resynchronized = true;
                self.release_oldest(sns, deliver, &mut report);
            }
        }

        self.update_timer(now);
        report
    }

    /// Deliver buffered SDUs for as long as the next expected one is present.
    pub fn unload<F: FnMut(u16, Vec<u8>)>(
        &mut self,
        sns: &mut SequenceNumbers,
        deliver: &mut F,
        report: &mut RxReport,
    ) {
        if !self.sequence_lost {
            return;
        }
        loop {
            let sn = sns.rx_next();
            let Some(sdu) = self.pending.remove(&sn) else {
                break;
            };
            deliver_in_sequence(sns, sn, sdu, deliver, report);
        }
        if self.pending.is_empty() {
            self.sequence_lost = false;
        }
    }

    /// Give up on the gap in front of the oldest buffered SDU if the reordering timer
    /// has run out.
    pub fn expire<F: FnMut(u16, Vec<u8>)>(
        &mut self,
        sns: &mut SequenceNumbers,
        now: Instant,
        deliver: &mut F,
    ) -> RxReport {
        let mut report = RxReport::default();
        match self.deadline {
            Some(deadline) if deadline <= now => {}
            _ => return report,
        }
        self.deadline = None;
        let released = self.release_oldest(sns, deliver, &mut report);
        report.resynchronized = released;
        self.update_timer(now);
        report
    }

    /// Drop everything.  Returns the number of SDUs discarded.
    pub fn clear(&mut self) -> usize {
        let discarded = self.pending.len();
        self.pending.clear();
        self.sequence_lost = false;
        self.deadline = None;
        discarded
    }

    fn out_of_window(&self, rx_next: u16, sn: u16) -> bool {
        let ahead = sn_distance(rx_next, sn);
        let behind = sn_distance(sn, rx_next);
        ahead > self.window || (behind > 0 && behind < self.window)
    }

    // Jump the expected sequence number to the oldest buffered SDU, then deliver it and
    // any run that follows it.  Returns false if there was nothing buffered.
    fn release_oldest<F: FnMut(u16, Vec<u8>)>(
        &mut self,
        sns: &mut SequenceNumbers,
        deliver: &mut F,
        report: &mut RxReport,
    ) -> bool {
        let Some(oldest) = self.oldest(sns.rx_next()) else {
            return false;
        };
        sns.set_rx(oldest);
        self.unload(sns, deliver, report);
        true
    }

    // Oldest in sequence order relative to the expected SN, so that 4095 comes before 0.
    fn oldest(&self, rx_next: u16) -> Option<u16> {
        self.pending
            .range(rx_next..)
            .next()
            .or_else(|| self.pending.iter().next())
            .map(|(sn, _)| *sn)
    }

    fn update_timer(&mut self, now: Instant) {
        if self.pending.is_empty() {
            self.deadline = None;
        } else if self.deadline.is_none() {
            self.deadline = self.t_reordering.map(|t| now + t);
        }
    }
}

fn deliver_in_sequence<F: FnMut(u16, Vec<u8>)>(
    sns: &mut SequenceNumbers,
    sn: u16,
    sdu: Vec<u8>,
    deliver: &mut F,
    report: &mut RxReport,
) {
    deliver(sn, sdu);
    sns.advance_rx();
    report.delivered += 1;
}
