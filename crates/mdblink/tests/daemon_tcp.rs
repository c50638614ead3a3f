//! The real TCP daemon link against a scripted daemon server.

use std::time::Duration;

use mdblink::{Address, DispatchRequest, MdbClientBuilder, OutcomeKind};
use mdblink_test_harness::MockDaemonServer;

#[tokio::test]
async fn named_commands_over_tcp() {
    let mut server = MockDaemonServer::new().await.unwrap();
    server.expect("CashlessReset(1)", "{\"status\":\"ok\"}\n{\"event\":\"reset\"}\n");
    server.expect("CashlessReset(42)", "{\"status\":\"ok\"}\n");

    let bridge = MdbClientBuilder::new()
        .daemon_addr(server.addr())
        .daemon_idle_timeout(Duration::from_millis(200))
        .build()
        .unwrap();
    server.start();

    let outcome = bridge
        .dispatch(DispatchRequest::new("cashless_reset(1)", 1.0, "/dev/ttyUSB0"))
        .await;
    assert!(outcome.is_ok(), "{}", outcome.display);
    assert_eq!(outcome.display, "{\"status\":\"ok\"}\n{\"event\":\"reset\"}");

    let outcome = bridge.reset_cashless_device(Address::from(42)).await;
    assert!(outcome.is_ok(), "{}", outcome.display);

    server.wait().await.unwrap();
    assert_eq!(bridge.log_entries().len(), 2);
}

#[tokio::test]
async fn daemon_down_is_reported() {
    // Reserve a port, then free it so nothing is listening.
    let addr = {
        let server = MockDaemonServer::new().await.unwrap();
        server.addr().to_string()
    };

    let bridge = MdbClientBuilder::new()
        .daemon_addr(&addr)
        .build()
        .unwrap();

    let outcome = bridge
        .dispatch(DispatchRequest::new("CashlessReset(1)", 1.0, ""))
        .await;
    assert_eq!(outcome.kind, OutcomeKind::Failed);
    assert!(
        outcome.display.contains("cannot connect to MDB daemon"),
        "{}",
        outcome.display
    );
}
