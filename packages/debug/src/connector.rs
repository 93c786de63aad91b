//! Transports for the live-reload channel.

use std::io::ErrorKind;
use std::net::TcpStream;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tungstenite::protocol::Message;
use tungstenite::stream::MaybeTlsStream;
use tungstenite::WebSocket;
use url::Url;

use crate::error::{ReloadError, Result};

/// Opens the push connection and yields its text messages.
///
/// The receiver ends when the transport closes or fails.
#[async_trait]
pub trait ReloadConnector: Send + Sync {
    async fn connect(&self, url: &Url) -> Result<mpsc::Receiver<String>>;
}

/// WebSocket transport backed by `tungstenite`.
///
/// The socket is blocking, so the handshake runs on the blocking pool and
/// reading happens on a dedicated thread. Dropping the receiver closes the
/// socket and ends that thread within one poll interval.
#[derive(Debug, Clone)]
pub struct TungsteniteConnector {
    buffer: usize,
}

impl TungsteniteConnector {
    pub fn new() -> Self {
        Self { buffer: 16 }
    }

    /// Number of messages buffered before the reader thread waits.
    #[must_use]
    pub fn with_buffer(mut self, buffer: usize) -> Self {
        self.buffer = buffer.max(1);
        self
    }
}

impl Default for TungsteniteConnector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ReloadConnector for TungsteniteConnector {
    async fn connect(&self, url: &Url) -> Result<mpsc::Receiver<String>> {
        let address = url.to_string();
        let (socket, _response) = tokio::task::spawn_blocking(move || tungstenite::connect(address.as_str()))
            .await
            .map_err(|e| ReloadError::Connect(e.to_string()))?
            .map_err(|e| ReloadError::Connect(e.to_string()))?;

        let (tx, rx) = mpsc::channel(self.buffer);
        std::thread::spawn(move || read_loop(socket, tx));
        Ok(rx)
    }
}

/// How often an idle reader checks whether its receiver is gone.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

fn read_loop(mut socket: WebSocket<MaybeTlsStream<TcpStream>>, tx: mpsc::Sender<String>) {
    if let MaybeTlsStream::Plain(stream) = socket.get_ref() {
        if let Err(e) = stream.set_read_timeout(Some(POLL_INTERVAL)) {
            tracing::warn!(error = %e, "live reload socket cannot poll, reader ends with the connection");
        }
    }

    loop {
        if tx.is_closed() {
            tracing::debug!("live reload receiver dropped, closing socket");
            let _ = socket.close(None);
            let _ = socket.flush();
            break;
        }
        match socket.read() {
            Ok(Message::Text(text)) => {
                if tx.blocking_send(text.as_str().to_owned()).is_err() {
                    let _ = socket.close(None);
                    let _ = socket.flush();
                    break;
                }
            }
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(tungstenite::Error::Io(e))
                if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {}
            Err(e) => {
                tracing::debug!(error = %e, "live reload socket ended");
                break;
            }
        }
    }
}
