// crates/chat-client/src/network.rs

use std::io::BufRead;
use std::net::SocketAddr;

use anyhow::{Context, Result};
use bytes::BytesMut;
use chat_protocol::{encode_line, LineDecoder};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::signal;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver};
use tracing::{debug, info, warn};

use crate::logs::ClientLogs;

/// Why the session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// The server closed the connection.
    ServerClosed,
    /// Writing to the server failed (broken pipe).
    SendFailed,
    /// Standard input reached end of file.
    InputClosed,
    /// Ctrl-C.
    Interrupted,
}

pub struct ChatConnection {
    reader: OwnedReadHalf,
    writer: OwnedWriteHalf,
    decoder: LineDecoder,
    write_buffer: BytesMut,
    logs: ClientLogs,
}

impl ChatConnection {
    pub async fn connect(server_addr: SocketAddr, logs: ClientLogs) -> Result<Self> {
        info!("Connecting to {}...", server_addr);
        let stream = TcpStream::connect(server_addr)
            .await
            .with_context(|| format!("cannot connect to {server_addr}"))?;
        stream.set_nodelay(true)?;
        info!("Connected successfully");

        let (reader, writer) = stream.into_split();
        Ok(ChatConnection {
            reader,
            writer,
            // Server lines carry a short prefix on top of the payload.
            decoder: LineDecoder::new(64 * 1024),
            write_buffer: BytesMut::with_capacity(512),
            logs,
        })
    }

    /// Relay stdin to the server and the server to stdout and the logs
    /// until one side goes away or the user presses Ctrl-C.
    pub async fn run(mut self) -> Result<SessionEnd> {
        let mut input = spawn_stdin_reader();
        let ctrl_c = signal::ctrl_c();
        tokio::pin!(ctrl_c);
        let mut chunk = [0u8; 1024];

        let end = loop {
            tokio::select! {
                _ = &mut ctrl_c => break SessionEnd::Interrupted,

                line = input.recv() => match line {
                    Some(line) => {
                        if let Err(e) = self.send(&line).await {
                            warn!("Send failed: {}", e);
                            break SessionEnd::SendFailed;
                        }
                    }
                    None => break SessionEnd::InputClosed,
                },

                read = self.reader.read(&mut chunk) => match read {
                    Ok(0) => break SessionEnd::ServerClosed,
                    Ok(n) => {
                        self.decoder.extend(&chunk[..n]);
                        while let Some(line) = self.decoder.next_line() {
                            self.deliver(&line).await?;
                        }
                    }
                    Err(e) => {
                        warn!("Read error: {}", e);
                        break SessionEnd::ServerClosed;
                    }
                },
            }
        };

        if let Some(tail) = self.decoder.finish() {
            self.deliver(&tail).await?;
        }
        let _ = self.writer.shutdown().await;
        Ok(end)
    }

    async fn send(&mut self, line: &str) -> std::io::Result<()> {
        self.write_buffer.clear();
        encode_line(line, &mut self.write_buffer);
        self.writer.write_all(&self.write_buffer).await?;
        self.writer.flush().await?;
        debug!("Sent: {}", line);
        Ok(())
    }

    /// Print a received line and write it to disk. A log write failure
    /// ends the client.
    async fn deliver(&mut self, line: &str) -> Result<()> {
        println!("{}", line);
        self.logs
            .record(line)
            .await
            .context("error writing client logs")
    }
}

/// Read stdin on a plain thread so a pending read never holds up
/// runtime shutdown.
fn spawn_stdin_reader() -> UnboundedReceiver<String> {
    let (tx, rx) = unbounded_channel();
    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            if tx.send(line).is_err() {
                break;
            }
        }
    });
    rx
}
