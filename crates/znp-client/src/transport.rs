//! Serial transport task.
//!
//! Owns the byte stream and walks the connection state machine:
//!
//! ```text
//! Disconnected -> Opening -> BypassSent -> AwaitingPing -> Ready
//!       ^                                                   |
//!       +---------------- stream error / forced close ------+
//! ```
//!
//! Every drop back to `Disconnected` schedules one reopen after the
//! reconnect delay, unless the task was told to shut down.

use std::future::Future;
use std::io;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_serial::{SerialPortBuilderExt, SerialStream};
use tracing::{debug, info, trace, warn};
use znp_protocol::{command_by_name, CommandType, FrameCodec, LinkFrame, BOOTLOADER_BYPASS};

use crate::error::{ClientError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportState {
    Disconnected,
    Opening,
    BypassSent,
    AwaitingPing,
    Ready,
}

/// Opens the underlying byte stream.
pub trait Connector: Send + 'static {
    type Stream: AsyncRead + AsyncWrite + Send + Unpin + 'static;

    fn connect(&mut self) -> impl Future<Output = io::Result<Self::Stream>> + Send;
}

/// Connector for a local serial device.
#[derive(Debug, Clone)]
pub struct SerialConnector {
    path: String,
    baud_rate: u32,
}

impl SerialConnector {
    pub fn new(path: impl Into<String>, baud_rate: u32) -> Self {
        SerialConnector {
            path: path.into(),
            baud_rate,
        }
    }
}

impl Connector for SerialConnector {
    type Stream = SerialStream;

    fn connect(&mut self) -> impl Future<Output = io::Result<SerialStream>> + Send {
        let opened = tokio_serial::new(&self.path, self.baud_rate)
            .open_native_async()
            .map_err(io::Error::from);
        std::future::ready(opened)
    }
}

#[derive(Debug)]
pub(crate) enum TransportCommand {
    Send(Vec<u8>),
    ForceClose,
    Shutdown,
}

#[derive(Debug)]
pub(crate) enum TransportEvent {
    Frame(LinkFrame),
    Connected,
    Disconnected,
}

/// Handle to a running transport task.
#[derive(Debug, Clone)]
pub struct TransportHandle {
    commands: mpsc::UnboundedSender<TransportCommand>,
    state: watch::Receiver<TransportState>,
}

impl TransportHandle {
    pub fn state(&self) -> TransportState {
        *self.state.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<TransportState> {
        self.state.clone()
    }

    /// Write an encoded frame; fails unless the link is ready.
    pub(crate) fn send(&self, bytes: Vec<u8>) -> Result<()> {
        if self.state() != TransportState::Ready {
            return Err(ClientError::TransportDisconnected);
        }
        self.commands
            .send(TransportCommand::Send(bytes))
            .map_err(|_| ClientError::Closed)
    }

    /// Drop the current stream; the task reopens it after the reconnect delay.
    pub fn force_close(&self) {
        let _ = self.commands.send(TransportCommand::ForceClose);
    }

    pub fn shutdown(&self) {
        let _ = self.commands.send(TransportCommand::Shutdown);
    }

    /// Wait until the link reaches `Ready`.
    pub async fn wait_ready(&self) -> Result<()> {
        let mut state = self.state.clone();
        state
            .wait_for(|s| *s == TransportState::Ready)
            .await
            .map(|_| ())
            .map_err(|_| ClientError::Closed)
    }
}

pub(crate) fn spawn<C: Connector>(
    connector: C,
    reconnect_delay: Duration,
    events: mpsc::UnboundedSender<TransportEvent>,
) -> (TransportHandle, JoinHandle<()>) {
    let (command_tx, command_rx) = mpsc::unbounded_channel();
    let (state_tx, state_rx) = watch::channel(TransportState::Disconnected);
    let task = tokio::spawn(run(connector, reconnect_delay, command_rx, state_tx, events));
    let handle = TransportHandle {
        commands: command_tx,
        state: state_rx,
    };
    (handle, task)
}

enum Exit {
    Shutdown,
    Closed(String),
}

async fn run<C: Connector>(
    mut connector: C,
    reconnect_delay: Duration,
    mut commands: mpsc::UnboundedReceiver<TransportCommand>,
    state: watch::Sender<TransportState>,
    events: mpsc::UnboundedSender<TransportEvent>,
) {
    loop {
        state.send_replace(TransportState::Opening);
        let opened = {
            let connect = connector.connect();
            tokio::pin!(connect);
            loop {
                tokio::select! {
                    result = &mut connect => break Some(result),
                    command = commands.recv() => match command {
                        None | Some(TransportCommand::Shutdown) => break None,
                        Some(other) => discard(other),
                    },
                }
            }
        };

        match opened {
            None => break,
            Some(Ok(stream)) => {
                let exit = drive(stream, &mut commands, &state, &events).await;
                state.send_replace(TransportState::Disconnected);
                let _ = events.send(TransportEvent::Disconnected);
                match exit {
                    Exit::Shutdown => break,
                    Exit::Closed(reason) => warn!("transport: connection closed: {reason}"),
                }
            }
            Some(Err(e)) => {
                state.send_replace(TransportState::Disconnected);
                warn!("transport: open failed: {e}");
            }
        }

        debug!("transport: reconnecting in {reconnect_delay:?}");
        let delay = tokio::time::sleep(reconnect_delay);
        tokio::pin!(delay);
        loop {
            tokio::select! {
                _ = &mut delay => break,
                command = commands.recv() => match command {
                    None | Some(TransportCommand::Shutdown) => {
                        state.send_replace(TransportState::Disconnected);
                        return;
                    }
                    Some(other) => discard(other),
                },
            }
        }
    }
    state.send_replace(TransportState::Disconnected);
    debug!("transport: stopped");
}

fn discard(command: TransportCommand) {
    if let TransportCommand::Send(bytes) = command {
        warn!("transport: dropping {} byte frame while disconnected", bytes.len());
    }
}

/// Run one connection until it closes.
async fn drive<S: AsyncRead + AsyncWrite + Unpin>(
    stream: S,
    commands: &mut mpsc::UnboundedReceiver<TransportCommand>,
    state: &watch::Sender<TransportState>,
    events: &mpsc::UnboundedSender<TransportEvent>,
) -> Exit {
    let (mut reader, mut writer) = tokio::io::split(stream);

    if let Err(e) = write_flush(&mut writer, &BOOTLOADER_BYPASS).await {
        return Exit::Closed(e.to_string());
    }
    state.send_replace(TransportState::BypassSent);

    let ping = match command_by_name("SYS_PING").map(|ping| LinkFrame::request(ping, Vec::new()).encode()) {
        Some(Ok(bytes)) => bytes,
        _ => return Exit::Closed("cannot encode ping".to_string()),
    };
    if let Err(e) = write_flush(&mut writer, &ping).await {
        return Exit::Closed(e.to_string());
    }
    state.send_replace(TransportState::AwaitingPing);

    let mut codec = FrameCodec::new();
    let mut buf = [0u8; 256];
    loop {
        tokio::select! {
            read = reader.read(&mut buf) => match read {
                Ok(0) => return Exit::Closed("end of stream".to_string()),
                Ok(n) => {
                    codec.push(&buf[..n]);
                    while let Some(decoded) = codec.decode() {
                        match decoded {
                            Ok(frame) => accept(frame, state, events),
                            Err(e) => warn!("transport: dropped frame: {e}"),
                        }
                    }
                }
                Err(e) => return Exit::Closed(e.to_string()),
            },
            command = commands.recv() => match command {
                None | Some(TransportCommand::Shutdown) => return Exit::Shutdown,
                Some(TransportCommand::ForceClose) => return Exit::Closed("forced close".to_string()),
                Some(TransportCommand::Send(bytes)) => {
                    if let Err(e) = write_flush(&mut writer, &bytes).await {
                        return Exit::Closed(e.to_string());
                    }
                }
            },
        }
    }
}

fn accept(
    frame: LinkFrame,
    state: &watch::Sender<TransportState>,
    events: &mpsc::UnboundedSender<TransportEvent>,
) {
    trace!("transport: <- {:?} {:?}", frame.name(), frame.payload);
    if *state.borrow() == TransportState::Ready {
        let _ = events.send(TransportEvent::Frame(frame));
        return;
    }
    if frame.kind == CommandType::Srsp && frame.name() == Some("SYS_PING") {
        state.send_replace(TransportState::Ready);
        info!("transport: link ready");
        let _ = events.send(TransportEvent::Connected);
    } else {
        debug!("transport: ignoring {:?} before ping reply", frame.name());
    }
}

async fn write_flush<W: AsyncWrite + Unpin>(writer: &mut W, bytes: &[u8]) -> io::Result<()> {
    writer.write_all(bytes).await?;
    writer.flush().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::DuplexStream;
    use znp_protocol::Subsystem;

    struct DuplexConnector {
        streams: mpsc::UnboundedReceiver<DuplexStream>,
    }

    impl Connector for DuplexConnector {
        type Stream = DuplexStream;

        async fn connect(&mut self) -> io::Result<DuplexStream> {
            self.streams
                .recv()
                .await
                .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no radio"))
        }
    }

    fn ping_reply() -> Vec<u8> {
        LinkFrame::new(CommandType::Srsp, Subsystem::Sys, 0x01, vec![0x59, 0x06])
            .encode()
            .unwrap()
    }

    async fn read_exact(radio: &mut DuplexStream, len: usize) -> Vec<u8> {
        let mut buf = vec![0; len];
        radio.read_exact(&mut buf).await.unwrap();
        buf
    }

    #[tokio::test(start_paused = true)]
    async fn test_handshake_reaches_ready_once() {
        let (stream_tx, streams) = mpsc::unbounded_channel();
        let (events_tx, mut events) = mpsc::unbounded_channel();
        let (handle, _task) = spawn(DuplexConnector { streams }, Duration::from_secs(1), events_tx);

        let (host, mut radio) = tokio::io::duplex(1024);
        stream_tx.send(host).unwrap();

        assert_eq!(read_exact(&mut radio, 4).await, BOOTLOADER_BYPASS);
        assert_eq!(read_exact(&mut radio, 5).await, vec![0xFE, 0x00, 0x21, 0x01, 0x20]);
        assert_ne!(handle.state(), TransportState::Ready);

        // Noise, then the reply
        radio.write_all(&[0x00, 0x42]).await.unwrap();
        radio.write_all(&ping_reply()).await.unwrap();
        handle.wait_ready().await.unwrap();
        assert!(matches!(events.recv().await, Some(TransportEvent::Connected)));

        // A second ping reply is an ordinary frame, not a second connect
        radio.write_all(&ping_reply()).await.unwrap();
        assert!(matches!(events.recv().await, Some(TransportEvent::Frame(_))));
        handle.shutdown();
    }

    #[tokio::test(start_paused = true)]
    async fn test_force_close_reconnects_once() {
        let (stream_tx, streams) = mpsc::unbounded_channel();
        let (events_tx, mut events) = mpsc::unbounded_channel();
        let (handle, _task) = spawn(DuplexConnector { streams }, Duration::from_secs(1), events_tx);

        let (host, mut radio) = tokio::io::duplex(1024);
        stream_tx.send(host).unwrap();
        read_exact(&mut radio, 9).await;
        radio.write_all(&ping_reply()).await.unwrap();
        assert!(matches!(events.recv().await, Some(TransportEvent::Connected)));

        handle.force_close();
        assert!(matches!(events.recv().await, Some(TransportEvent::Disconnected)));
        assert_eq!(handle.state(), TransportState::Disconnected);
        assert!(matches!(handle.send(vec![1]), Err(ClientError::TransportDisconnected)));

        // After the delay the task opens again
        let (host, mut radio) = tokio::io::duplex(1024);
        stream_tx.send(host).unwrap();
        assert_eq!(read_exact(&mut radio, 4).await, BOOTLOADER_BYPASS);
        read_exact(&mut radio, 5).await;
        radio.write_all(&ping_reply()).await.unwrap();
        assert!(matches!(events.recv().await, Some(TransportEvent::Connected)));
        handle.shutdown();
    }

    #[tokio::test]
    async fn test_send_reaches_radio() {
        let (stream_tx, streams) = mpsc::unbounded_channel();
        let (events_tx, mut events) = mpsc::unbounded_channel();
        let (handle, _task) = spawn(DuplexConnector { streams }, Duration::from_secs(1), events_tx);

        let (host, mut radio) = tokio::io::duplex(1024);
        stream_tx.send(host).unwrap();
        read_exact(&mut radio, 9).await;
        radio.write_all(&ping_reply()).await.unwrap();
        assert!(matches!(events.recv().await, Some(TransportEvent::Connected)));

        handle.send(vec![0xFE, 0x00, 0x21, 0x02, 0x23]).unwrap();
        assert_eq!(read_exact(&mut radio, 5).await, vec![0xFE, 0x00, 0x21, 0x02, 0x23]);
        handle.shutdown();
    }
}
