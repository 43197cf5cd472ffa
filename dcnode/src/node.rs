use crate::bearers::{BearerDispatch, BearerEvent, BearerHandler, SduPort};
use crate::userplane::{PacketProcessor, SduDelivery, create_udp_socket};
use crate::{BearerSpec, Config, ShutdownHandle};
use anyhow::{Result, bail};
use async_channel::Sender;
use async_std::task::JoinHandle;
use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::{Entry, VacantEntry};
use pdcp::{
    BearerConfig, DeliveryTarget, MIN_SDU_SIZE, PdcpBearer, PdcpStatus, PduSink,
    RemoteDeliveryAdapter,
};
use slog::{Logger, info, o};
use std::net::{SocketAddr, UdpSocket};
use std::sync::Arc;

struct BearerTask {
    sender: Sender<BearerEvent>,
    task: JoinHandle<()>,
    sdu_port: Option<ShutdownHandle>,
}

/// Bearer tasks keyed by local TEID.
#[derive(Clone, Default)]
pub struct BearerRegistry(Arc<DashMap<u32, BearerTask>>);

#[async_trait]
impl BearerDispatch for BearerRegistry {
    async fn dispatch(&self, teid: u32, event: BearerEvent) -> Result<()> {
        let Some(sender) = self.0.get(&teid).map(|b| b.sender.clone()) else {
            bail!("Bearer {teid:#010x} not found");
        };
        sender.send(event).await?;
        Ok(())
    }
}

#[derive(Clone)]
pub struct DcNode {
    config: Config,
    logger: Logger,
    bearers: BearerRegistry,
    packet_processor: Arc<PacketProcessor>,
}

impl DcNode {
    pub async fn start(config: Config, bearers: Vec<BearerSpec>, logger: Logger) -> Result<Self> {
        let registry = BearerRegistry::default();
        let packet_processor = PacketProcessor::new(&config, registry.clone(), &logger)?;
        let node = DcNode {
            config,
            logger,
            bearers: registry,
            packet_processor: Arc::new(packet_processor),
        };
        for spec in bearers {
            node.setup_bearer(spec).await?;
        }
        info!(
            &node.logger,
            "Started {} with {} bearers, DU {}",
            node.config.name.as_deref().unwrap_or("node"),
            node.bearers.0.len(),
            node.config.du_ip_addr
        );
        Ok(node)
    }

    /// Set up a bearer and start its task.  Returns the bearer's local TEID.
    pub async fn setup_bearer(&self, spec: BearerSpec) -> Result<u32> {
        // The entry holds the TEID until the bearer task is inserted.
        let entry = self.reserve_teid(spec.teid)?;
        let teid = *entry.key();
        let logger = self.logger.new(o!("teid" => format!("{teid:08x}")));

        // The upper layer sends delivered SDUs from the SDU port if there is one.
        let (sdu_socket, sdu_port_socket) = match spec.sdu_port {
            Some(port) => {
                let socket = create_udp_socket(SocketAddr::new(self.config.ip_addr, port), &logger)?;
                let clone = socket.try_clone()?;
                (socket, Some(clone))
            }
            None => (UdpSocket::bind(SocketAddr::new(self.config.ip_addr, 0))?, None),
        };
        let upper = Box::new(SduDelivery::new(
            Arc::new(sdu_socket),
            spec.deliver_to,
            logger.clone(),
        ));

        let local = Box::new(self.packet_processor.f1u_sink(spec.du_teid));
        let remote = spec.peer.as_ref().map(|peer| {
            Box::new(RemoteDeliveryAdapter::new(
                self.packet_processor.dcx_tunnel(peer),
                DeliveryTarget {
                    peer_rnti: peer.rnti,
                    teid: peer.teid,
                },
            )) as Box<dyn PduSink>
        });

        let bearer_config = BearerConfig {
            rnti: spec.rnti,
            lcid: spec.lcid,
            senb_rnti: spec.peer.map(|p| p.rnti).unwrap_or(0),
            dual_connectivity: spec.dual_connectivity,
            in_sequence_delivery: spec.in_sequence_delivery,
            split_policy: spec.split_policy,
            reordering_window: self.config.reordering_window,
            min_sdu_size: MIN_SDU_SIZE,
            max_buffered: self.config.max_buffered,
            t_reordering: self.config.t_reordering,
        };
        let mut bearer = PdcpBearer::new(bearer_config, local, remote, upper, &logger)?;
        bearer.add_observer(self.packet_processor.counters().clone());

        let (sender, task) = BearerHandler::spawn(bearer, logger.clone());
        let sdu_port = sdu_port_socket
            .map(|socket| SduPort::new(socket.into(), sender.clone()).spawn(logger.clone()));
        entry.insert(BearerTask {
            sender,
            task,
            sdu_port,
        });

        info!(
            logger,
            "Set up bearer rnti {} lcid {}, dual connectivity {} {:?}",
            spec.rnti,
            spec.lcid,
            spec.dual_connectivity,
            spec.split_policy
        );
        Ok(teid)
    }

    /// Stop a bearer, discarding anything it has buffered.
    pub async fn release_bearer(&self, teid: u32) -> Result<()> {
        let Some((_, bearer)) = self.bearers.0.remove(&teid) else {
            bail!("Bearer {teid:#010x} not found");
        };
        if let Some(sdu_port) = bearer.sdu_port {
            sdu_port.graceful_shutdown().await;
        }
        let _ = bearer.sender.send(BearerEvent::Release).await;
        bearer.task.await;
        Ok(())
    }

    /// Pass an SDU to a bearer for transmission.
    pub async fn transmit(&self, teid: u32, sdu: Vec<u8>) -> Result<()> {
        self.bearers.dispatch(teid, BearerEvent::Transmit(sdu)).await
    }

    pub async fn bearer_status(&self, teid: u32) -> Result<PdcpStatus> {
        let (reply, status) = async_channel::bounded(1);
        self.bearers
            .dispatch(teid, BearerEvent::GetStatus(reply))
            .await?;
        Ok(status.recv().await?)
    }

    pub async fn set_bearer_status(&self, teid: u32, status: PdcpStatus) -> Result<()> {
        self.bearers
            .dispatch(teid, BearerEvent::SetStatus(status))
            .await
    }

    pub fn bearer_teids(&self) -> Vec<u32> {
        self.bearers.0.iter().map(|b| *b.key()).collect()
    }

    pub async fn graceful_shutdown(self) {
        info!(&self.logger, "Shutting down");
        for teid in self.bearer_teids() {
            let _ = self.release_bearer(teid).await;
        }
        self.packet_processor.graceful_shutdown().await;
    }

    // Claim the given TEID, or a random unused one.
    fn reserve_teid(&self, teid: Option<u32>) -> Result<VacantEntry<'_, u32, BearerTask>> {
        if let Some(teid) = teid {
            return match self.bearers.0.entry(teid) {
                Entry::Occupied(_) => bail!("TEID {teid:#010x} already in use"),
                Entry::Vacant(entry) => Ok(entry),
            };
        }
        loop {
            let teid = rand::random::<u32>();
            if teid == 0 {
                continue;
            }
            if let Entry::Vacant(entry) = self.bearers.0.entry(teid) {
                return Ok(entry);
            }
        }
    }
}
