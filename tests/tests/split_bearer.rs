use dcnode::{BearerSpec, PeerSpec};
use dcnode_tests::{MockApp, framework::*};
use std::net::SocketAddr;

const NODE_A: &str = "127.0.0.1";
const NODE_B: &str = "127.0.0.2";
const NODE_B_DU: &str = "127.0.0.3";
const NODE_B_TEID: u32 = 0x0000_0b01;
const SDU_PORT: u16 = 5001;

#[async_std::test]
async fn split_bearer() -> anyhow::Result<()> {
    let logger = init();
    let app = MockApp::new("127.0.0.4:0").await?;

    // Node B terminates both legs and delivers to the app.
    let mut receiver = BearerSpec::local(2, 3, 0x01);
    receiver.teid = Some(NODE_B_TEID);
    receiver.deliver_to = Some(app.addr()?);
    let node_b = start_node(NODE_B, NODE_B_DU, vec![receiver], &logger).await?;

    // Node A alternates between F1-U, with node B standing in for its DU, and the DCX
    // tunnel to node B.
    let peer = PeerSpec {
        ip_addr: NODE_B.parse()?,
        teid: NODE_B_TEID,
        rnti: 2,
    };
    let mut sender = BearerSpec::split(1, 3, NODE_B_TEID, peer);
    sender.sdu_port = Some(SDU_PORT);
    let node_a = start_node(NODE_A, NODE_B, vec![sender], &logger).await?;

    let sdu_port = SocketAddr::new(NODE_A.parse()?, SDU_PORT);
    for n in 0..20 {
        app.send_sdu(sdu_port, &test_sdu(n)).await?;
    }
    for n in 0..20 {
        let sdu = app.recv_sdu().await?;
        assert_eq!(tag(&sdu), n);
    }

    let teids = node_a.bearer_teids();
    let [node_a_teid] = teids[..] else {
        panic!("Expected one bearer on node A");
    };
    assert_eq!(node_a.bearer_status(node_a_teid).await?.tx_sn, 20);
    assert_eq!(node_b.bearer_status(NODE_B_TEID).await?.rx_sn, 20);

    node_a.graceful_shutdown().await;
    node_b.graceful_shutdown().await;
    Ok(())
}
