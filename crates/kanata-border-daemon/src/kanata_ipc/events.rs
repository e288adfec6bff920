//! Kanata layer event stream
//!
//! ## Protocol
//!
//! 1. Connect to kanata's TCP server
//! 2. Read newline-delimited JSON messages
//! 3. Keep `LayerChange` messages, silently drop everything else (including
//!    lines that are not valid JSON)
//!
//! ## Reconnection
//!
//! The reader never gives up. On a refused connection, EOF or read error it
//! waits a fixed delay (5 seconds by default, no backoff growth) and connects
//! again. Kanata restarts and late kanata startup are both handled this way.
//!
//! ## Architecture
//!
//! ```text
//! +-------------------+      +--------+      +-----------------+
//! | KanataEventStream | ---> | mpsc   | ---> | LayerIndicator  |
//! | (reader task)     |      | channel|      | (owns overlay)  |
//! +-------------------+      +--------+      +-----------------+
//! ```
//!
//! The reader task stops once the receiving side is dropped.

use std::time::Duration;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use super::error::KanataError;
use super::types::LayerChangeEvent;

/// Default channel buffer size for event dispatch
pub const DEFAULT_CHANNEL_BUFFER: usize = 64;

/// A single connection to kanata's TCP server
#[derive(Debug)]
pub struct KanataEventStream {
    reader: BufReader<TcpStream>,
    /// Bytes of the line being read; survives a cancelled read
    line: Vec<u8>,
    address: String,
}

impl KanataEventStream {
    /// Open a connection to kanata
    ///
    /// # Errors
    ///
    /// Returns `KanataError::ConnectionFailed` if kanata is not listening.
    pub async fn connect(address: &str) -> Result<Self, KanataError> {
        let socket = TcpStream::connect(address)
            .await
            .map_err(|e| KanataError::ConnectionFailed {
                address: address.to_string(),
                source: e,
            })?;

        Ok(Self {
            reader: BufReader::new(socket),
            line: Vec::new(),
            address: address.to_string(),
        })
    }

    /// Connect, retrying forever with a fixed delay between attempts
    pub async fn connect_with_retry(address: &str, retry_delay: Duration) -> Self {
        loop {
            match Self::connect(address).await {
                Ok(stream) => return stream,
                Err(e) => {
                    warn!(
                        address = address,
                        delay_ms = retry_delay.as_millis() as u64,
                        "Can't connect to kanata: {}. Retrying...",
                        e
                    );
                    sleep(retry_delay).await;
                }
            }
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    /// Read the next raw line from kanata, without the trailing newline
    ///
    /// Lines are returned as bytes; kanata is not trusted to send UTF-8.
    /// A final line without a newline is still returned before EOF.
    ///
    /// # Errors
    ///
    /// Returns `KanataError::ConnectionClosed` on EOF.
    /// Returns `KanataError::ReceiveFailed` if reading from the socket fails.
    pub async fn next_line(&mut self) -> Result<Vec<u8>, KanataError> {
        let bytes_read = self
            .reader
            .read_until(b'\n', &mut self.line)
            .await
            .map_err(KanataError::ReceiveFailed)?;

        if bytes_read == 0 && self.line.is_empty() {
            return Err(KanataError::ConnectionClosed);
        }

        let mut line = std::mem::take(&mut self.line);
        if line.last() == Some(&b'\n') {
            line.pop();
        }
        Ok(line)
    }

    /// Read lines until one decodes to a layer change
    ///
    /// Lines that are not layer changes, not JSON, or not even UTF-8 are
    /// skipped; the connection stays open.
    pub async fn next_layer_change(&mut self) -> Result<LayerChangeEvent, KanataError> {
        loop {
            let line = self.next_line().await?;

            if let Some(event) = LayerChangeEvent::from_line(&line) {
                return Ok(event);
            }
        }
    }
}

/// Receiver for layer changes from the dispatcher
pub type LayerEventReceiver = mpsc::Receiver<LayerChangeEvent>;

/// Handle to the spawned reader task
pub type EventReaderHandle = tokio::task::JoinHandle<()>;

/// Reads layer changes from kanata in a background task and forwards them
/// through an mpsc channel
#[derive(Debug)]
pub struct LayerEventDispatcher {
    sender: mpsc::Sender<LayerChangeEvent>,
    address: String,
    retry_delay: Duration,
}

impl LayerEventDispatcher {
    /// Create a dispatcher and the receiver its events are delivered to
    pub fn new(
        address: impl Into<String>,
        retry_delay: Duration,
        buffer_size: usize,
    ) -> (Self, LayerEventReceiver) {
        let (sender, receiver) = mpsc::channel(buffer_size);
        let dispatcher = Self {
            sender,
            address: address.into(),
            retry_delay,
        };
        (dispatcher, receiver)
    }

    /// Spawn the reader task
    ///
    /// Unlike a one-shot connect, this returns immediately; the task keeps
    /// trying to reach kanata until the receiver is dropped.
    pub fn spawn_reader(self) -> EventReaderHandle {
        tokio::spawn(self.run_reader_loop())
    }

    async fn run_reader_loop(self) {
        loop {
            let mut stream = tokio::select! {
                stream = KanataEventStream::connect_with_retry(&self.address, self.retry_delay) => stream,
                _ = self.sender.closed() => {
                    debug!("Layer event receiver dropped, shutting down event reader");
                    return;
                }
            };

            info!("Connected to kanata at {}", stream.address());

            let reason = loop {
                let result = tokio::select! {
                    result = stream.next_layer_change() => result,
                    _ = self.sender.closed() => {
                        debug!("Layer event receiver dropped, shutting down event reader");
                        return;
                    }
                };

                match result {
                    Ok(event) => {
                        debug!("Layer change from kanata: {}", event.layer);
                        if self.sender.send(event).await.is_err() {
                            debug!("Layer event receiver dropped, shutting down event reader");
                            return;
                        }
                    }
                    Err(e) => break e,
                }
            };

            drop(stream);
            match reason {
                KanataError::ConnectionClosed => warn!(
                    delay_ms = self.retry_delay.as_millis() as u64,
                    "Connection to kanata lost. Retrying..."
                ),
                e => warn!(
                    delay_ms = self.retry_delay.as_millis() as u64,
                    "Error reading from kanata: {}. Retrying...",
                    e
                ),
            }
            sleep(self.retry_delay).await;
        }
    }

    #[cfg(test)]
    pub fn sender(&self) -> mpsc::Sender<LayerChangeEvent> {
        self.sender.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncWriteExt;
    use tokio::net::TcpListener;
    use tokio::time::timeout;

    const TEST_RETRY_DELAY: Duration = Duration::from_millis(20);
    const TEST_TIMEOUT: Duration = Duration::from_secs(5);

    async fn recv(rx: &mut LayerEventReceiver) -> LayerChangeEvent {
        timeout(TEST_TIMEOUT, rx.recv())
            .await
            .expect("timed out waiting for layer event")
            .expect("channel closed")
    }

    #[tokio::test]
    async fn test_stream_skips_noise_and_yields_layer_changes() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap().to_string();

        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            socket
                .write_all(
                    b"not json\n{}\n{\"CurrentLayerName\":{\"name\":\"base\"}}\n\
                      {\"LayerChange\":{\"new\":\"vim-normal\"}}\n\
                      {\"LayerChange\":{\"new\":\"default\"}}\n",
                )
                .await
                .unwrap();
        });

        let mut stream = KanataEventStream::connect(&address).await.unwrap();
        assert_eq!(
            stream.next_layer_change().await.unwrap(),
            LayerChangeEvent::new("vim-normal")
        );
        assert_eq!(
            stream.next_layer_change().await.unwrap(),
            LayerChangeEvent::new("default")
        );

        server.await.unwrap();
        assert!(matches!(
            stream.next_layer_change().await,
            Err(KanataError::ConnectionClosed)
        ));
    }

    #[tokio::test]
    async fn test_stream_survives_invalid_utf8() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap().to_string();

        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            socket
                .write_all(
                    b"\xff\xfe garbage\n{\"LayerChange\":{\"new\":\"vim-\xc3\"}}\n\
                      {\"LayerChange\":{\"new\":\"vim-normal\"}}\n",
                )
                .await
                .unwrap();
        });

        let mut stream = KanataEventStream::connect(&address).await.unwrap();
        assert_eq!(
            stream.next_layer_change().await.unwrap(),
            LayerChangeEvent::new("vim-normal")
        );
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_final_line_without_newline() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap().to_string();

        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            socket
                .write_all(b"{\"LayerChange\":{\"new\":\"g-ops\"}}")
                .await
                .unwrap();
        });

        let mut stream = KanataEventStream::connect(&address).await.unwrap();
        server.await.unwrap();

        assert_eq!(
            stream.next_line().await.unwrap(),
            b"{\"LayerChange\":{\"new\":\"g-ops\"}}".to_vec()
        );
        assert!(matches!(
            stream.next_line().await,
            Err(KanataError::ConnectionClosed)
        ));
    }

    #[tokio::test]
    async fn test_reader_keeps_connection_after_invalid_utf8() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap().to_string();

        // Long retry delay: a reconnect would blow the test timeout
        let (dispatcher, mut rx) =
            LayerEventDispatcher::new(address, Duration::from_secs(60), DEFAULT_CHANNEL_BUFFER);
        let handle = dispatcher.spawn_reader();

        let (mut socket, _) = listener.accept().await.unwrap();
        socket.write_all(b"\xff\xfe\n").await.unwrap();
        socket
            .write_all(b"{\"LayerChange\":{\"new\":\"visual-mode\"}}\n")
            .await
            .unwrap();
        assert_eq!(recv(&mut rx).await, LayerChangeEvent::new("visual-mode"));

        drop(rx);
        timeout(TEST_TIMEOUT, handle).await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_connect_refused() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap().to_string();
        drop(listener);

        let result = KanataEventStream::connect(&address).await;
        assert!(matches!(result, Err(KanataError::ConnectionFailed { .. })));
    }

    #[tokio::test]
    async fn test_reader_reconnects_after_drop() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap().to_string();

        let (dispatcher, mut rx) =
            LayerEventDispatcher::new(address, TEST_RETRY_DELAY, DEFAULT_CHANNEL_BUFFER);
        let handle = dispatcher.spawn_reader();

        // First connection delivers one event, then kanata "restarts"
        let (mut socket, _) = listener.accept().await.unwrap();
        socket
            .write_all(b"{\"LayerChange\":{\"new\":\"delete-ops\"}}\n")
            .await
            .unwrap();
        assert_eq!(recv(&mut rx).await, LayerChangeEvent::new("delete-ops"));
        drop(socket);

        // The reader comes back on its own
        let (mut socket, _) = timeout(TEST_TIMEOUT, listener.accept())
            .await
            .expect("reader did not reconnect")
            .unwrap();
        socket
            .write_all(b"garbage\n{\"LayerChange\":{\"new\":\"yank-ops\"}}\n")
            .await
            .unwrap();
        assert_eq!(recv(&mut rx).await, LayerChangeEvent::new("yank-ops"));

        drop(rx);
        timeout(TEST_TIMEOUT, handle)
            .await
            .expect("reader did not stop after receiver dropped")
            .unwrap();
    }

    #[tokio::test]
    async fn test_reader_retries_until_kanata_starts() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();
        drop(listener);

        let (dispatcher, mut rx) =
            LayerEventDispatcher::new(address.to_string(), TEST_RETRY_DELAY, 4);
        let handle = dispatcher.spawn_reader();

        // Let a few connection attempts fail
        sleep(TEST_RETRY_DELAY * 5).await;

        let listener = TcpListener::bind(address).await.unwrap();
        let (mut socket, _) = timeout(TEST_TIMEOUT, listener.accept())
            .await
            .expect("reader did not retry")
            .unwrap();
        socket
            .write_all(b"{\"LayerChange\":{\"new\":\"escape\"}}\n")
            .await
            .unwrap();
        assert_eq!(recv(&mut rx).await, LayerChangeEvent::new("escape"));

        drop(rx);
        timeout(TEST_TIMEOUT, handle).await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_reader_stops_while_disconnected() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap().to_string();
        drop(listener);

        let (dispatcher, rx) =
            LayerEventDispatcher::new(address, Duration::from_secs(60), DEFAULT_CHANNEL_BUFFER);
        let handle = dispatcher.spawn_reader();

        drop(rx);
        timeout(TEST_TIMEOUT, handle)
            .await
            .expect("reader kept retrying with no receiver")
            .unwrap();
    }

    #[tokio::test]
    async fn test_dispatcher_channel_communication() {
        let (dispatcher, mut rx) =
            LayerEventDispatcher::new("127.0.0.1:1", TEST_RETRY_DELAY, 16);
        let sender = dispatcher.sender();

        sender.send(LayerChangeEvent::new("g-ops")).await.unwrap();
        assert_eq!(rx.recv().await.unwrap(), LayerChangeEvent::new("g-ops"));
    }

    #[tokio::test]
    async fn test_dispatcher_channel_closes_on_drop() {
        let (dispatcher, mut rx) =
            LayerEventDispatcher::new("127.0.0.1:1", TEST_RETRY_DELAY, 16);
        drop(dispatcher);
        assert!(rx.recv().await.is_none());
    }
}
