use super::BearerEvent;
use async_channel::{Receiver, Sender};
use async_std::task::JoinHandle;
use pdcp::PdcpBearer;
use slog::{Logger, debug, info, warn};
use std::time::Instant;

/// Task that owns one bearer.  Every event for the bearer goes through its channel, so
/// the bearer itself needs no locking.
pub struct BearerHandler {
    receiver: Receiver<BearerEvent>,
    bearer: PdcpBearer,
    logger: Logger,
}

impl BearerHandler {
    pub fn spawn(bearer: PdcpBearer, logger: Logger) -> (Sender<BearerEvent>, JoinHandle<()>) {
        let (sender, handler) = Self::new(bearer, logger);
        let task = async_std::task::spawn(handler.run());
        (sender, task)
    }

    fn new(bearer: PdcpBearer, logger: Logger) -> (Sender<BearerEvent>, Self) {
        let (sender, receiver) = async_channel::unbounded();
        let handler = BearerHandler {
            receiver,
            bearer,
            logger,
        };
        (sender, handler)
    }

    async fn run(mut self) {
        while let Some(event) = self.next_event().await {
            if let BearerEvent::Release = event {
                break;
            }
            self.handle_event(event).await;
        }

        let BearerHandler { bearer, logger, .. } = self;
        let discarded = bearer.release();
        info!(logger, "Bearer released, discarded {} buffered SDUs", discarded);
    }

    async fn handle_event(&mut self, event: BearerEvent) {
        match event {
            BearerEvent::Transmit(sdu) => {
                if let Err(e) = self.bearer.transmit(&sdu) {
                    warn!(self.logger, "Failed to transmit SDU - {e}");
                }
            }
            BearerEvent::LocalPdu(pdu) => {
                if let Err(e) = self.bearer.receive_local(pdu) {
                    warn!(self.logger, "Dropped PDU from DU - {e}");
                }
            }
            BearerEvent::RemotePdu(params) => {
                if let Err(e) = self.bearer.receive_remote(params) {
                    warn!(self.logger, "Dropped PDU from peer - {e}");
                }
            }
            BearerEvent::GetStatus(reply) => {
                let _ = reply.send(self.bearer.status()).await;
            }
            BearerEvent::SetStatus(status) => {
                info!(
                    self.logger,
                    "Restore status tx_sn={} rx_sn={}", status.tx_sn, status.rx_sn
                );
                self.bearer.set_status(status);
            }
            // Handled by run()
            BearerEvent::Release => {}
        }
    }

    // Wait for the next event, running the reordering timer meanwhile.  A timer that is
    // already due runs before the next event is taken, so a busy channel cannot hold it
    // off.  None once every sender has gone.
    async fn next_event(&mut self) -> Option<BearerEvent> {
        loop {
            let Some(deadline) = self.bearer.reordering_deadline() else {
                return self.receiver.recv().await.ok();
            };
            let now = Instant::now();
            if deadline <= now {
                let report = self.bearer.expire_reordering_timer(now);
                debug!(
                    self.logger,
                    "Reordering timer expired, delivered {} SDUs", report.delivered
                );
                continue;
            }
            if let Ok(event) =
                async_std::future::timeout(deadline - now, self.receiver.recv()).await
            {
                return event.ok();
            }
        }
    }
}
