use super::BearerEvent;
use crate::ShutdownHandle;
use async_channel::Sender;
use async_std::net::UdpSocket;
use pdcp::MAX_SDU_SIZE;
use slog::{Logger, info};
use stop_token::StopSource;
use stop_token::prelude::*;

/// UDP socket feeding SDUs to a bearer, one per datagram.
pub struct SduPort {
    socket: UdpSocket,
    bearer: Sender<BearerEvent>,
}

impl SduPort {
    pub fn new(socket: UdpSocket, bearer: Sender<BearerEvent>) -> Self {
        SduPort { socket, bearer }
    }

    pub fn spawn(self, logger: Logger) -> ShutdownHandle {
        let stop_source = StopSource::new();
        let stop_token = stop_source.token();
        let handle = async_std::task::spawn(async move {
            // One byte spare, so the bearer rejects an oversized SDU instead of sending it truncated.
            let mut buf = vec![0u8; MAX_SDU_SIZE + 1];
            while let Ok(result) = self
                .socket
                .recv_from(&mut buf)
                .timeout_at(stop_token.clone())
                .await
            {
                let sdu = match result {
                    Ok((bytes_read, _peer)) => buf[..bytes_read].to_vec(),
                    Err(e) => {
                        info!(logger, "Exiting SDU port with error {e}");
                        break;
                    }
                };
                if self.bearer.send(BearerEvent::Transmit(sdu)).await.is_err() {
                    break;
                }
            }
        });
        ShutdownHandle::new(handle, stop_source)
    }
}
