use dcnode::{BearerSpec, PeerSpec};
use dcnode_tests::{MockApp, MockDu, MockPeer, framework::*};
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

const NODE: &str = "127.0.0.1";
const DU: &str = "127.0.0.2";
const PEER: &str = "127.0.0.3";
const TEID: u32 = 0x0000_0100;
const DU_TEID: u32 = 0x0000_0d01;
const PEER_TEID: u32 = 0x0000_0e01;
const SDU_PORT: u16 = 5002;

#[async_std::test]
async fn reordering() -> anyhow::Result<()> {
    let logger = init();
    let du = MockDu::new(DU, &logger).await?;
    let peer = MockPeer::new(PEER, 2, &logger).await?;
    let app = MockApp::new("127.0.0.4:0").await?;

    let mut bearer = BearerSpec::split(
        1,
        3,
        DU_TEID,
        PeerSpec {
            ip_addr: PEER.parse()?,
            teid: PEER_TEID,
            rnti: 2,
        },
    );
    bearer.teid = Some(TEID);
    bearer.sdu_port = Some(SDU_PORT);
    bearer.deliver_to = Some(app.addr()?);
    let node = start_node(NODE, DU, vec![bearer], &logger).await?;
    let node_ip: IpAddr = NODE.parse()?;

    // SN 1 and 2 on the local leg overtake SN 0 on the remote leg.
    du.send_pdu(node_ip, TEID, 1, &test_sdu(1)).await?;
    du.send_pdu(node_ip, TEID, 2, &test_sdu(2)).await?;
    app.expect_nothing(Duration::from_millis(100)).await?;
    peer.send_pdu(node_ip, TEID, 1, 0, &test_sdu(0)).await?;
    for n in 0..3 {
        assert_eq!(tag(&app.recv_sdu().await?), n);
    }

    // SN 3 never arrives.  SN 4 is held until the reordering timer gives up on it.
    du.send_pdu(node_ip, TEID, 4, &test_sdu(4)).await?;
    app.expect_nothing(T_REORDERING / 2).await?;
    assert_eq!(tag(&app.recv_sdu().await?), 4);

    // An undersized SDU takes its sequence number but is not delivered.
    du.send_pdu(node_ip, TEID, 5, &[0u8; 20]).await?;
    du.send_pdu(node_ip, TEID, 6, &test_sdu(6)).await?;
    assert_eq!(tag(&app.recv_sdu().await?), 6);

    // Unknown TEID.
    du.send_pdu(node_ip, 0xdead, 7, &test_sdu(7)).await?;
    app.expect_nothing(Duration::from_millis(100)).await?;

    // Transmit alternates between the DU and the peer, starting with the DU.
    let sdu_port = SocketAddr::new(node_ip, SDU_PORT);
    for n in 10..14 {
        app.send_sdu(sdu_port, &test_sdu(n)).await?;
    }
    for (sn, n) in [(0, 10), (2, 12)] {
        let pdu = du.recv_pdu().await?;
        assert_eq!((pdu.teid, pdu.sn, tag(&pdu.sdu)), (DU_TEID, sn, n));
    }
    for (sn, n) in [(1, 11), (3, 13)] {
        let pdu = peer.recv_pdu().await?;
        assert_eq!((pdu.teid, pdu.sn, tag(&pdu.sdu)), (PEER_TEID, sn, n));
        assert_eq!(pdu.source_rnti, Some(1));
    }

    node.graceful_shutdown().await;
    Ok(())
}
