// crates/chat-server/tests/end_to_end.rs
mod common;

use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use chat_core::ConnectionId;
use chat_server::{Incoming, Server};
use tokio::io::{AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;

use common::{expect_eof, log_lines, next_line, read_until, temp_log, test_config, STEP};

struct TestClient {
    lines: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
}

impl TestClient {
    async fn connect(addr: SocketAddr) -> Self {
        let stream = TcpStream::connect(addr).await.unwrap();
        let (read, writer) = stream.into_split();
        TestClient {
            lines: BufReader::new(read),
            writer,
        }
    }

    async fn say(&mut self, text: &str) {
        self.writer
            .write_all(format!("{text}\n").as_bytes())
            .await
            .unwrap();
    }
}

/// Listener whose first few accepts fail the way a busy host's do.
struct FlakyListener {
    inner: TcpListener,
    failures_left: usize,
}

impl Incoming for FlakyListener {
    fn accept(&mut self) -> impl Future<Output = io::Result<(TcpStream, SocketAddr)>> + Send {
        async move {
            if self.failures_left > 0 {
                self.failures_left -= 1;
                return Err(io::Error::new(io::ErrorKind::ConnectionAborted, "aborted"));
            }
            self.inner.accept().await
        }
    }

    fn local_addr(&self) -> io::Result<SocketAddr> {
        self.inner.local_addr()
    }
}

#[tokio::test]
async fn chat_session_end_to_end() {
    let log = temp_log("e2e");
    let server = Server::bind(test_config(log.clone())).await.unwrap();
    let addr = server.local_addr().unwrap();
    let broker = server.broker();
    let running = tokio::spawn(server.run());

    // A joins.
    let mut a = TestClient::connect(addr).await;
    assert_eq!(
        next_line(&mut a.lines).await.as_deref(),
        Some("Connected. You are client #1.")
    );
    assert_eq!(next_line(&mut a.lines).await.as_deref(), Some("* client #1 joined"));
    assert!(log_lines(&log).contains(&"* client #1 joined".to_string()));

    // B joins; A hears about it.
    let mut b = TestClient::connect(addr).await;
    assert_eq!(
        next_line(&mut b.lines).await.as_deref(),
        Some("Connected. You are client #2.")
    );
    assert_eq!(next_line(&mut b.lines).await.as_deref(), Some("* client #2 joined"));
    assert_eq!(next_line(&mut a.lines).await.as_deref(), Some("* client #2 joined"));

    // A talks; everyone, A included, gets the same line.
    a.say("hello").await;
    assert_eq!(next_line(&mut b.lines).await.as_deref(), Some("[#1] hello"));
    assert_eq!(next_line(&mut a.lines).await.as_deref(), Some("[#1] hello"));
    let hellos = log_lines(&log).iter().filter(|l| *l == "[#1] hello").count();
    assert_eq!(hellos, 1);

    // A leaves.
    drop(a);
    assert_eq!(next_line(&mut b.lines).await.as_deref(), Some("* client #1 left"));
    assert!(log_lines(&log).contains(&"* client #1 left".to_string()));
    assert_eq!(broker.registry().ids().await, vec![ConnectionId(2)]);

    // Later traffic only goes to B.
    b.say("anyone?").await;
    assert_eq!(next_line(&mut b.lines).await.as_deref(), Some("[#2] anyone?"));

    // Shutdown closes B and stops the server cleanly.
    assert!(broker.terminate().await);
    assert!(!broker.terminate().await);
    expect_eof(&mut b.lines).await;
    timeout(STEP, running).await.unwrap().unwrap().unwrap();

    let lines = log_lines(&log);
    assert_eq!(
        lines,
        [
            "* client #1 joined",
            "* client #2 joined",
            "[#1] hello",
            "* client #1 left",
            "[#2] anyone?",
        ]
    );
    let _ = std::fs::remove_file(&log);
}

#[tokio::test]
async fn partial_and_combined_writes_are_framed_into_lines() {
    let log = temp_log("framing");
    let server = Server::bind(test_config(log.clone())).await.unwrap();
    let addr = server.local_addr().unwrap();
    let broker = server.broker();
    tokio::spawn(server.run());

    let mut a = TestClient::connect(addr).await;
    read_until(&mut a.lines, "* client #1 joined").await;

    a.writer.write_all(b"par").await.unwrap();
    a.writer.flush().await.unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;
    a.writer.write_all(b"tial\r\n\nfirst\nsecond\n").await.unwrap();

    assert_eq!(next_line(&mut a.lines).await.as_deref(), Some("[#1] partial"));
    assert_eq!(next_line(&mut a.lines).await.as_deref(), Some("[#1] first"));
    assert_eq!(next_line(&mut a.lines).await.as_deref(), Some("[#1] second"));

    broker.terminate().await;
    let _ = std::fs::remove_file(&log);
}

#[tokio::test]
async fn connection_limit_turns_away_extra_clients() {
    let log = temp_log("limit");
    let mut config = test_config(log.clone());
    config.max_clients = 1;
    let server = Server::bind(config).await.unwrap();
    let addr = server.local_addr().unwrap();
    let broker = server.broker();
    tokio::spawn(server.run());

    let mut a = TestClient::connect(addr).await;
    read_until(&mut a.lines, "* client #1 joined").await;

    // Accepted by the OS, then dropped without a welcome.
    let mut b = TestClient::connect(addr).await;
    expect_eof(&mut b.lines).await;
    assert_eq!(broker.registry().len().await, 1);

    broker.terminate().await;
    let _ = std::fs::remove_file(&log);
}

#[tokio::test]
async fn bind_failure_is_reported() {
    let first = Server::bind(test_config(temp_log("bind-a"))).await.unwrap();
    let mut config = test_config(temp_log("bind-b"));
    config.port = first.local_addr().unwrap().port();

    let err = Server::bind(config).await.err().expect("second bind should fail");
    assert!(matches!(err, chat_server::ServerError::Bind { .. }), "{err:?}");
}

#[tokio::test]
async fn accept_errors_do_not_stop_the_server() {
    let log = temp_log("flaky");
    let inner = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let listener = FlakyListener {
        inner,
        failures_left: 3,
    };
    let server = Server::with_listener(listener, test_config(log.clone()))
        .await
        .unwrap();
    let addr = server.local_addr().unwrap();
    let broker = server.broker();
    let running = tokio::spawn(server.run());

    let mut a = TestClient::connect(addr).await;
    assert_eq!(
        next_line(&mut a.lines).await.as_deref(),
        Some("Connected. You are client #1.")
    );
    assert!(!running.is_finished());

    broker.terminate().await;
    timeout(STEP, running).await.unwrap().unwrap().unwrap();
    let _ = std::fs::remove_file(&log);
}

#[tokio::test]
async fn run_returns_only_after_every_receiver_exits() {
    let log = temp_log("workers");
    let server = Server::bind(test_config(log.clone())).await.unwrap();
    let addr = server.local_addr().unwrap();
    let broker = server.broker();
    let running = tokio::spawn(server.run());

    let mut clients = Vec::new();
    for n in 1..=3 {
        let mut client = TestClient::connect(addr).await;
        read_until(&mut client.lines, &format!("* client #{n} joined")).await;
        clients.push(client);
    }

    broker.terminate().await;
    timeout(STEP, running).await.unwrap().unwrap().unwrap();

    // Receivers and the broadcaster each held a clone; all are gone.
    assert_eq!(Arc::strong_count(&broker), 1);
    for client in &mut clients {
        expect_eof(&mut client.lines).await;
    }
    let _ = std::fs::remove_file(&log);
}
