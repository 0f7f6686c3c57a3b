//! End-to-end transfers: a real client role against a real server role.

mod common;

use std::path::PathBuf;
use std::time::Duration;

use drtp::client::{self, ClientReport};
use drtp::config::{ClientConfig, ServerConfig, SimulatorConfig};
use drtp::gbn_connection::ReceiveReport;
use drtp::packet::MAX_PAYLOAD;
use drtp::simulator::Simulator;
use drtp::throughput::Throughput;
use drtp::{server, ConnError, Recv, Teardown, Transport};

use common::{ephemeral, pattern, PATIENCE};

/// Start a server on an ephemeral port; returns its address and task.
async fn start_server(
    discard: Option<u16>,
) -> (
    std::net::SocketAddr,
    tokio::task::JoinHandle<(Vec<u8>, ReceiveReport)>,
) {
    let socket = ephemeral().await;
    let addr = socket.local_addr;
    let config = ServerConfig {
        bind: addr,
        discard,
        retransmit_timeout: Duration::from_millis(100),
        ..ServerConfig::default()
    };
    let task = tokio::spawn(async move {
        let mut sink = Vec::new();
        let report = server::serve(socket, &mut sink, &config)
            .await
            .expect("serve");
        (sink, report)
    });
    (addr, task)
}

async fn send_bytes<T: Transport>(
    transport: T,
    data: &[u8],
    config: &ClientConfig,
) -> ClientReport {
    tokio::time::timeout(Duration::from_secs(30), client::send(transport, data, config))
        .await
        .expect("transfer timed out")
        .expect("transfer failed")
}

fn scratch_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("drtp-{}-{name}", std::process::id()))
}

#[tokio::test]
async fn file_arrives_intact() {
    let (server_addr, server) = start_server(None).await;
    let data = pattern(7 * MAX_PAYLOAD + 123);

    let config = ClientConfig::new(server_addr, "in-memory");
    let report = send_bytes(ephemeral().await, &data, &config).await;

    let (sink, received) = tokio::time::timeout(PATIENCE, server).await.unwrap().unwrap();
    assert_eq!(sink, data);
    assert_eq!(received.segments, 8);
    assert_eq!(received.bytes, data.len() as u64);
    assert!(matches!(received.throughput, Throughput::Measured { .. }));

    assert_eq!(report.stats.segments, 8);
    assert_eq!(report.stats.bytes, data.len() as u64);
    assert_eq!(report.stats.retransmissions, 0);
    assert_eq!(report.teardown, Teardown::Acknowledged);
}

/// Dropping segment 2 once forces a timeout and a whole-window resend;
/// the sink still receives every byte exactly once, in order.
#[tokio::test]
async fn discarded_segment_is_recovered() {
    let (server_addr, server) = start_server(Some(2)).await;
    let data = pattern(6 * MAX_PAYLOAD + 10);

    let mut config = ClientConfig::new(server_addr, "in-memory");
    config.retransmit_timeout = Duration::from_millis(200);
    let report = send_bytes(ephemeral().await, &data, &config).await;

    let (sink, received) = tokio::time::timeout(PATIENCE, server).await.unwrap().unwrap();
    assert_eq!(sink, data);
    assert_eq!(received.discarded, 1);
    assert_eq!(received.segments, 7);
    assert!(received.out_of_order >= 1, "segment 3 arrives behind the hole");

    assert!(report.stats.timeouts >= 1);
    // Segments 2 and 3 were in flight when the timer fired.
    assert!(report.stats.retransmissions >= 2);
    assert_eq!(report.teardown, Teardown::Acknowledged);
}

#[tokio::test]
async fn window_larger_than_advertisement_still_delivers() {
    let (server_addr, server) = start_server(None).await;
    let data = pattern(40 * MAX_PAYLOAD);

    let mut config = ClientConfig::new(server_addr, "in-memory");
    config.window = 64;
    let report = send_bytes(ephemeral().await, &data, &config).await;

    let (sink, _) = server.await.unwrap();
    assert_eq!(sink, data);
    assert_eq!(report.stats.window, 15);
}

/// Random loss and duplication on the data path: Go-Back-N still delivers
/// the exact byte stream.
#[tokio::test]
async fn lossy_link_delivers_exact_bytes() {
    let (server_addr, server) = start_server(None).await;
    let data = pattern(25 * MAX_PAYLOAD + 1);

    let mut config = ClientConfig::new(server_addr, "in-memory");
    config.window = 5;
    config.retransmit_timeout = Duration::from_millis(50);
    let transport = Simulator::new(
        ephemeral().await,
        SimulatorConfig {
            loss_rate: 0.2,
            duplicate_rate: 0.1,
            seed: Some(7),
        },
    );
    let report = send_bytes(transport, &data, &config).await;

    let (sink, received) = server.await.unwrap();
    assert_eq!(sink, data);
    assert_eq!(received.segments, 26);
    assert!(report.stats.transmissions >= 26);
}

#[tokio::test]
async fn empty_file_completes_with_no_throughput() {
    let (server_addr, server) = start_server(None).await;

    let config = ClientConfig::new(server_addr, "in-memory");
    let report = send_bytes(ephemeral().await, &[], &config).await;

    let (sink, received) = server.await.unwrap();
    assert!(sink.is_empty());
    assert_eq!(received.throughput, Throughput::NoData);
    assert_eq!(report.stats.segments, 0);
    assert_eq!(report.teardown, Teardown::Acknowledged);
}

/// The file-backed entry points on both sides.
#[tokio::test]
async fn run_copies_file_to_output_path() {
    let input = scratch_path("input.bin");
    let output = scratch_path("output.bin");
    let data = pattern(3 * MAX_PAYLOAD + 500);
    tokio::fs::write(&input, &data).await.unwrap();

    // Reserve a free port, then hand it to the server.
    let bind = {
        let probe = ephemeral().await;
        probe.local_addr
    };
    let server_config = ServerConfig {
        bind,
        output: output.clone(),
        retransmit_timeout: Duration::from_millis(100),
        ..ServerConfig::default()
    };
    let server = tokio::spawn(async move { server::run(&server_config).await });
    // Let the server bind before the SYN goes out; the handshake has no retry.
    tokio::time::sleep(Duration::from_millis(100)).await;

    let client_config = ClientConfig::new(bind, &input);
    let report = client::run(&client_config).await.expect("client run");
    let received = server.await.unwrap().expect("server run");

    assert_eq!(report.stats.bytes, data.len() as u64);
    assert_eq!(received.bytes, data.len() as u64);
    assert_eq!(tokio::fs::read(&output).await.unwrap(), data);

    let _ = tokio::fs::remove_file(&input).await;
    let _ = tokio::fs::remove_file(&output).await;
}

#[tokio::test]
async fn missing_input_file_is_io_error() {
    let config = ClientConfig::new(
        "127.0.0.1:9".parse().unwrap(),
        scratch_path("does-not-exist.bin"),
    );
    let result = client::run(&config).await;
    assert!(matches!(result, Err(ConnError::Io(_))), "got {result:?}");
}

#[tokio::test]
async fn unwritable_output_is_io_error() {
    let config = ServerConfig {
        bind: "127.0.0.1:0".parse().unwrap(),
        output: scratch_path("no-such-dir").join("out.bin"),
        ..ServerConfig::default()
    };
    let result = server::run(&config).await;
    assert!(matches!(result, Err(ConnError::Io(_))), "got {result:?}");
}

/// A source beyond the 16-bit sequence space is rejected before any
/// datagram is sent.
#[tokio::test]
async fn oversized_source_is_rejected_before_handshake() {
    use tokio::io::AsyncReadExt;

    let silent = ephemeral().await;
    let source = tokio::io::repeat(0).take(65_536 * MAX_PAYLOAD as u64);

    let config = ClientConfig::new(silent.local_addr, "in-memory");
    let result = client::send(ephemeral().await, source, &config).await;
    assert!(matches!(result, Err(ConnError::TooManySegments)), "got {result:?}");

    let quiet = silent.recv(Some(Duration::from_millis(100))).await.unwrap();
    assert!(matches!(quiet, Recv::Timeout));
}
