// crates/chat-server/tests/common/mod.rs
#![allow(dead_code)]

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use chat_server::Config;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::time::timeout;

pub const STEP: Duration = Duration::from_secs(5);

static NEXT: AtomicUsize = AtomicUsize::new(0);

/// Fresh path under the system temp dir, unique per test process and call.
pub fn temp_log(tag: &str) -> PathBuf {
    let n = NEXT.fetch_add(1, Ordering::Relaxed);
    let path = std::env::temp_dir().join(format!(
        "chat-server-{}-{}-{}.log",
        std::process::id(),
        tag,
        n
    ));
    let _ = std::fs::remove_file(&path);
    path
}

pub fn test_config(log_path: PathBuf) -> Config {
    Config {
        bind_addr: "127.0.0.1".to_string(),
        port: 0,
        log_path,
        ..Config::default()
    }
}

pub fn fake_peer() -> SocketAddr {
    "127.0.0.1:40000".parse().unwrap()
}

/// Next line without its terminator, or `None` on EOF.
pub async fn next_line<R: AsyncRead + Unpin>(reader: &mut BufReader<R>) -> Option<String> {
    let mut line = String::new();
    let n = timeout(STEP, reader.read_line(&mut line))
        .await
        .expect("timed out waiting for a line")
        .expect("read failed");
    if n == 0 {
        return None;
    }
    Some(line.trim_end_matches(['\r', '\n']).to_string())
}

/// Read lines until `expected` shows up; returns the lines skipped on the way.
pub async fn read_until<R: AsyncRead + Unpin>(
    reader: &mut BufReader<R>,
    expected: &str,
) -> Vec<String> {
    let mut skipped = Vec::new();
    loop {
        match next_line(reader).await {
            Some(line) if line == expected => return skipped,
            Some(line) => skipped.push(line),
            None => panic!("EOF while waiting for {expected:?}, saw {skipped:?}"),
        }
    }
}

/// Assert the reader sees EOF (possibly after some leftover lines).
pub async fn expect_eof<R: AsyncRead + Unpin>(reader: &mut BufReader<R>) {
    while next_line(reader).await.is_some() {}
}

pub fn log_lines(path: &PathBuf) -> Vec<String> {
    std::fs::read_to_string(path)
        .unwrap_or_default()
        .lines()
        .map(str::to_string)
        .collect()
}
