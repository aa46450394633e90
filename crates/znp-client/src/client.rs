//! Client handle.

use std::sync::Arc;

use tokio::sync::{broadcast, mpsc, oneshot};
use zcl_protocol::{decode_default_response, ZclFrame, DEFAULT_RESPONSE};
use znp_protocol::packets::AfDataRequest;
use znp_protocol::{command_by_name, CommandDescriptor, LinkFrame, ZnpStatus};

use crate::catalog::Catalog;
use crate::config::ClientConfig;
use crate::device::{Device, DeviceTable, Endpoint};
use crate::error::{ClientError, Result};
use crate::events::Event;
use crate::session::{Command, Session, ZdoKey};
use crate::transactions::ApplicationReply;
use crate::transport::{self, Connector, SerialConnector, TransportHandle, TransportState};

const EVENT_CAPACITY: usize = 256;

pub(crate) struct Inner {
    commands: mpsc::UnboundedSender<Command>,
    transport: TransportHandle,
    events: broadcast::Sender<Event>,
    config: ClientConfig,
    catalog: Arc<dyn Catalog>,
}

impl Drop for Inner {
    fn drop(&mut self) {
        self.transport.shutdown();
    }
}

/// Cheap to clone; every clone talks to the same session.
#[derive(Clone)]
pub struct Client {
    inner: Arc<Inner>,
}

/// Destination of an application frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Target {
    pub address: u16,
    pub endpoint: u8,
}

impl From<&Endpoint> for Target {
    fn from(endpoint: &Endpoint) -> Self {
        Target {
            address: endpoint.device,
            endpoint: endpoint.id,
        }
    }
}

/// Releases a sequence slot when its request ends without a reply.
struct TransactionGuard {
    sequence: u8,
    reply: oneshot::Receiver<ApplicationReply>,
    commands: mpsc::UnboundedSender<Command>,
}

impl Drop for TransactionGuard {
    fn drop(&mut self) {
        self.reply.close();
        let _ = self.commands.send(Command::CloseTransaction(self.sequence));
    }
}

impl Client {
    /// Client on the serial port named in `config`. Must be called inside a
    /// tokio runtime.
    pub fn open(config: ClientConfig, catalog: Arc<dyn Catalog>) -> Self {
        let connector = SerialConnector::new(config.port.clone(), config.baud_rate);
        Self::with_connector(connector, config, catalog)
    }

    pub fn with_connector<C: Connector>(connector: C, config: ClientConfig, catalog: Arc<dyn Catalog>) -> Self {
        let (transport_tx, transport_rx) = mpsc::unbounded_channel();
        let (transport, _task) = transport::spawn(connector, config.reconnect_delay(), transport_tx);
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        let inner = Arc::new_cyclic(|weak| {
            let session = Session::new(command_rx, transport_rx, transport.clone(), events.clone(), weak.clone());
            tokio::spawn(session.run());
            Inner {
                commands: command_tx,
                transport,
                events,
                config,
                catalog,
            }
        });
        Client { inner }
    }

    pub(crate) fn from_inner(inner: Arc<Inner>) -> Self {
        Client { inner }
    }

    /// Wait until the radio has answered the link ping.
    pub async fn connect(&self) -> Result<()> {
        self.inner.transport.wait_ready().await
    }

    pub fn state(&self) -> TransportState {
        self.inner.transport.state()
    }

    pub fn transport(&self) -> &TransportHandle {
        &self.inner.transport
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.inner.events.subscribe()
    }

    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    pub fn catalog(&self) -> &dyn Catalog {
        self.inner.catalog.as_ref()
    }

    /// Stop the transport; pending requests fail.
    pub fn shutdown(&self) {
        self.inner.transport.shutdown();
    }

    pub(crate) fn emit(&self, event: Event) {
        let _ = self.inner.events.send(event);
    }

    fn submit(&self, command: Command) -> Result<()> {
        self.inner.commands.send(command).map_err(|_| ClientError::Closed)
    }

    fn descriptor(name: &str) -> Result<&'static CommandDescriptor> {
        command_by_name(name).ok_or_else(|| ClientError::UnknownCommand(name.to_string()))
    }

    /// Send a synchronous request and wait for the reply of the same name.
    ///
    /// Replies are matched first in, first out per command name.
    pub async fn request(&self, name: &str, payload: Vec<u8>) -> Result<LinkFrame> {
        let command = Self::descriptor(name)?;
        let (reply, rx) = oneshot::channel();
        self.submit(Command::Link { command, payload, reply })?;
        match tokio::time::timeout(self.inner.config.link_timeout(), rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(ClientError::Closed),
            Err(_) => Err(ClientError::LinkRequestTimeout { command: command.name }),
        }
    }

    /// [`Client::request`] for replies that lead with a status byte.
    pub async fn request_ok(&self, name: &str, payload: Vec<u8>) -> Result<LinkFrame> {
        let command = Self::descriptor(name)?;
        let frame = self.request(command.name, payload).await?;
        let status = ZnpStatus::from(frame.status_byte()?);
        if !status.is_success() {
            return Err(ClientError::RadioStatus {
                command: command.name,
                status,
            });
        }
        Ok(frame)
    }

    /// Send an asynchronous request; nothing answers it.
    pub async fn notify(&self, name: &str, payload: Vec<u8>) -> Result<()> {
        let command = Self::descriptor(name)?;
        let (reply, rx) = oneshot::channel();
        self.submit(Command::Notify { command, payload, reply })?;
        rx.await.map_err(|_| ClientError::Closed)?
    }

    /// Two-phase ZDO exchange: the synchronous status reply, then the data
    /// reply keyed by the address it describes.
    pub(crate) async fn zdo_exchange(
        &self,
        key: ZdoKey,
        request: &str,
        payload: Vec<u8>,
        response: &'static str,
    ) -> Result<LinkFrame> {
        let (reply, waiter) = oneshot::channel();
        self.submit(Command::AwaitZdo { key, reply })?;
        self.request_ok(request, payload).await?;
        match tokio::time::timeout(self.inner.config.zdo_timeout(), waiter).await {
            Ok(Ok(frame)) => Ok(frame),
            Ok(Err(_)) => Err(ClientError::Closed),
            Err(_) => Err(ClientError::LinkRequestTimeout { command: response }),
        }
    }

    /// Run `f` against the device table inside the session.
    pub(crate) async fn with_table<R, F>(&self, f: F) -> Result<R>
    where
        R: Send + 'static,
        F: FnOnce(&mut DeviceTable) -> R + Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        self.submit(Command::Table(Box::new(move |table| {
            let _ = tx.send(f(table));
        })))?;
        rx.await.map_err(|_| ClientError::Closed)
    }

    /// Devices seen so far, without touching the radio.
    pub async fn cached_devices(&self) -> Result<Vec<Device>> {
        self.with_table(|table| table.devices().cloned().collect()).await
    }

    /// Send a cluster library frame and wait for the reply carrying its
    /// sequence number.
    ///
    /// The frame's sequence is replaced by a freshly allocated one. A
    /// failing default response is returned as [`ClientError::ZclStatus`].
    pub async fn send_zcl(&self, target: Target, cluster_id: u16, frame: ZclFrame) -> Result<ApplicationReply> {
        let config = &self.inner.config;
        let deadline = tokio::time::Instant::now() + config.zcl_timeout();

        let (reply, rx) = oneshot::channel();
        self.submit(Command::OpenTransaction { reply })?;
        let (sequence, reply) = rx.await.map_err(|_| ClientError::Closed)??;
        let mut guard = TransactionGuard {
            sequence,
            reply,
            commands: self.inner.commands.clone(),
        };

        let frame = frame.with_sequence(sequence);
        let mut request = AfDataRequest::new(target.address, target.endpoint, cluster_id, frame.encode()?);
        request.src_endpoint = config.source_endpoint;
        request.radius = config.radius;
        request.options.ack_request = true;
        self.request_ok("AF_DATA_REQUEST_EXT", request.encode()?).await?;

        let reply = match tokio::time::timeout_at(deadline, &mut guard.reply).await {
            Ok(Ok(reply)) => reply,
            Ok(Err(_)) => return Err(ClientError::Closed),
            Err(_) => return Err(ClientError::ApplicationRequestTimeout { sequence }),
        };

        if !reply.frame.frame_control.cluster_specific && reply.frame.command_id == DEFAULT_RESPONSE {
            let response = decode_default_response(&reply.frame.payload)?;
            if !response.status.is_success() {
                return Err(ClientError::ZclStatus {
                    command_id: response.command_id,
                    status: response.status,
                });
            }
        }
        Ok(reply)
    }
}
