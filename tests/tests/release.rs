use dcnode::BearerSpec;
use dcnode_tests::{MockApp, MockDu, framework::*};
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

const NODE: &str = "127.0.0.1";
const DU: &str = "127.0.0.2";
const TEID: u32 = 0x0000_0300;
const DU_TEID: u32 = 0x0000_0d03;
const SDU_PORT: u16 = 5003;

#[async_std::test]
async fn release() -> anyhow::Result<()> {
    let logger = init();
    let du = MockDu::new(DU, &logger).await?;
    let app = MockApp::new("127.0.0.4:0").await?;
    let node_ip: IpAddr = NODE.parse()?;

    let mut bearer = BearerSpec::local(1, 3, DU_TEID);
    bearer.teid = Some(TEID);
    bearer.sdu_port = Some(SDU_PORT);
    bearer.deliver_to = Some(app.addr()?);
    let node = start_node(NODE, DU, vec![bearer.clone()], &logger).await?;

    du.send_pdu(node_ip, TEID, 0, &test_sdu(0)).await?;
    assert_eq!(tag(&app.recv_sdu().await?), 0);

    // SN 2 is buffered waiting for SN 1 when the bearer goes.
    du.send_pdu(node_ip, TEID, 2, &test_sdu(2)).await?;
    app.expect_nothing(Duration::from_millis(100)).await?;
    node.release_bearer(TEID).await?;
    assert!(node.bearer_status(TEID).await.is_err());
    assert!(node.release_bearer(TEID).await.is_err());

    du.send_pdu(node_ip, TEID, 1, &test_sdu(1)).await?;
    app.expect_nothing(T_REORDERING * 2).await?;

    // The same bearer can be set up again and starts from scratch.
    assert_eq!(node.setup_bearer(bearer).await?, TEID);
    app.send_sdu(SocketAddr::new(node_ip, SDU_PORT), &test_sdu(9))
        .await?;
    let pdu = du.recv_pdu().await?;
    assert_eq!((pdu.teid, pdu.sn, tag(&pdu.sdu)), (DU_TEID, 0, 9));

    node.graceful_shutdown().await;
    Ok(())
}
