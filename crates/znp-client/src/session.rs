//! The session actor.
//!
//! All protocol state (pending link replies, application transactions, ZDO
//! waiters and the device table) lives here and is only touched from this
//! task. Callers talk to it through [`Command`]s; the transport feeds it
//! [`TransportEvent`]s.

use std::sync::Weak;

use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::{debug, trace, warn};
use zcl_protocol::{decode_report_attributes, ZclFrame, REPORT_ATTRIBUTES};
use znp_protocol::packets::{self, DeviceAnnounce, IncomingMessage};
use znp_protocol::{CommandDescriptor, LinkFrame, ZdoState};
use zigbee_codec::SchemaError;

use crate::client::{Client, Inner};
use crate::device::DeviceTable;
use crate::error::{ClientError, Result};
use crate::events::{Event, Source};
use crate::link::{LinkReply, PendingLinkRequests};
use crate::transactions::{ApplicationReply, Transactions};
use crate::transport::{TransportEvent, TransportHandle, TransportState};

/// Key of an asynchronous ZDO reply, taken from the address it describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum ZdoKey {
    ActiveEndpoints(u16),
    MatchDescriptor(u16),
    SimpleDescriptor(u16, Option<u8>),
}

impl ZdoKey {
    /// A failed simple descriptor reply carries no endpoint and answers any
    /// descriptor request for its address.
    fn answers(&self, waiter: &ZdoKey) -> bool {
        match (self, waiter) {
            (ZdoKey::SimpleDescriptor(a, None), ZdoKey::SimpleDescriptor(b, _)) => a == b,
            _ => self == waiter,
        }
    }
}

pub(crate) type TableFn = Box<dyn FnOnce(&mut DeviceTable) + Send>;

pub(crate) enum Command {
    /// Synchronous request answered by a reply of the same name.
    Link {
        command: &'static CommandDescriptor,
        payload: Vec<u8>,
        reply: LinkReply,
    },
    /// Asynchronous request with no reply.
    Notify {
        command: &'static CommandDescriptor,
        payload: Vec<u8>,
        reply: oneshot::Sender<Result<()>>,
    },
    OpenTransaction {
        reply: oneshot::Sender<Result<(u8, oneshot::Receiver<ApplicationReply>)>>,
    },
    CloseTransaction(u8),
    AwaitZdo {
        key: ZdoKey,
        reply: oneshot::Sender<LinkFrame>,
    },
    Table(TableFn),
}

/// Inbound frames, classified.
#[derive(Debug)]
enum Inbound {
    LinkReply(LinkFrame),
    StateChange(ZdoState),
    DeviceAnnounce(DeviceAnnounce),
    EndpointList(ZdoKey, LinkFrame),
    EndpointDescriptor(ZdoKey, LinkFrame),
    ApplicationReply(u8, ApplicationReply),
    UnsolicitedCommand(&'static str, ApplicationReply),
    Other(LinkFrame),
}

pub(crate) struct Session {
    commands: mpsc::UnboundedReceiver<Command>,
    transport_events: mpsc::UnboundedReceiver<TransportEvent>,
    transport: TransportHandle,
    events: broadcast::Sender<Event>,
    pending: PendingLinkRequests,
    transactions: Transactions,
    devices: DeviceTable,
    zdo_waiters: Vec<(ZdoKey, oneshot::Sender<LinkFrame>)>,
    client: Weak<Inner>,
}

impl Session {
    pub fn new(
        commands: mpsc::UnboundedReceiver<Command>,
        transport_events: mpsc::UnboundedReceiver<TransportEvent>,
        transport: TransportHandle,
        events: broadcast::Sender<Event>,
        client: Weak<Inner>,
    ) -> Self {
        Session {
            commands,
            transport_events,
            transport,
            events,
            pending: PendingLinkRequests::new(),
            transactions: Transactions::new(),
            devices: DeviceTable::new(),
            zdo_waiters: Vec::new(),
            client,
        }
    }

    pub async fn run(mut self) {
        loop {
            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(command) => self.handle_command(command),
                    None => break,
                },
                event = self.transport_events.recv() => match event {
                    Some(event) => self.handle_transport(event),
                    None => break,
                },
            }
        }
        self.pending.fail_all();
        self.transport.shutdown();
        debug!("session: stopped");
    }

    fn handle_command(&mut self, command: Command) {
        match command {
            Command::Link { command, payload, reply } => {
                if self.transport.state() != TransportState::Ready {
                    let _ = reply.send(Err(ClientError::TransportDisconnected));
                    return;
                }
                let bytes = match LinkFrame::request(command, payload).encode() {
                    Ok(bytes) => bytes,
                    Err(e) => {
                        let _ = reply.send(Err(e.into()));
                        return;
                    }
                };
                trace!("session: -> {}", command.name);
                self.pending.push(command.name, reply);
                if let Err(e) = self.transport.send(bytes) {
                    if let Some(reply) = self.pending.pop_back(command.name) {
                        let _ = reply.send(Err(e));
                    }
                }
            }
            Command::Notify { command, payload, reply } => {
                let sent = LinkFrame::request(command, payload)
                    .encode()
                    .map_err(ClientError::from)
                    .and_then(|bytes| self.transport.send(bytes));
                let _ = reply.send(sent);
            }
            Command::OpenTransaction { reply } => {
                let _ = reply.send(self.transactions.open());
            }
            Command::CloseTransaction(sequence) => self.transactions.close(sequence),
            Command::AwaitZdo { key, reply } => {
                self.zdo_waiters.retain(|(_, waiter)| !waiter.is_closed());
                self.zdo_waiters.push((key, reply));
            }
            Command::Table(f) => f(&mut self.devices),
        }
    }

    fn handle_transport(&mut self, event: TransportEvent) {
        match event {
            TransportEvent::Connected => {
                let _ = self.events.send(Event::Connected);
            }
            TransportEvent::Disconnected => {
                let failed = self.pending.fail_all();
                if failed > 0 {
                    warn!("session: transport dropped with {failed} link requests pending");
                }
            }
            TransportEvent::Frame(frame) => match self.classify(frame) {
                Ok(inbound) => self.dispatch(inbound),
                Err(e) => warn!("session: undecodable frame: {e}"),
            },
        }
    }

    fn classify(&self, frame: LinkFrame) -> Result<Inbound, SchemaError> {
        let Some(name) = frame.name() else {
            return Ok(Inbound::Other(frame));
        };
        if self.pending.has_pending(name) {
            return Ok(Inbound::LinkReply(frame));
        }
        let inbound = match name {
            "ZDO_STATE_CHANGE_IND" => Inbound::StateChange(packets::decode_state_change(&frame.payload)?),
            "ZDO_END_DEVICE_ANNCE_IND" => Inbound::DeviceAnnounce(DeviceAnnounce::decode(&frame.payload)?),
            "ZDO_ACTIVE_EP_RSP" => {
                let list = packets::EndpointList::decode(&frame.payload)?;
                Inbound::EndpointList(ZdoKey::ActiveEndpoints(list.nwk_address), frame)
            }
            "ZDO_MATCH_DESC_RSP" => {
                let list = packets::EndpointList::decode(&frame.payload)?;
                Inbound::EndpointList(ZdoKey::MatchDescriptor(list.nwk_address), frame)
            }
            "ZDO_SIMPLE_DESC_RSP" => {
                let descriptor = packets::SimpleDescriptor::decode(&frame.payload)?;
                let endpoint = descriptor.status.is_success().then_some(descriptor.endpoint);
                Inbound::EndpointDescriptor(ZdoKey::SimpleDescriptor(descriptor.nwk_address, endpoint), frame)
            }
            "AF_INCOMING_MSG" => {
                let message = IncomingMessage::decode(&frame.payload)?;
                let reply = ApplicationReply {
                    source: Source {
                        address: message.src_address,
                        endpoint: message.src_endpoint,
                    },
                    cluster_id: message.cluster_id,
                    link_quality: message.link_quality,
                    frame: ZclFrame::decode(&message.data)?,
                };
                match reply.frame.sequence {
                    0 => Inbound::UnsolicitedCommand(reply.frame.command_name(reply.cluster_id), reply),
                    sequence => Inbound::ApplicationReply(sequence, reply),
                }
            }
            _ => Inbound::Other(frame),
        };
        Ok(inbound)
    }

    fn dispatch(&mut self, inbound: Inbound) {
        match inbound {
            Inbound::LinkReply(frame) => {
                if let Err(frame) = self.pending.resolve(frame) {
                    debug!("session: no waiter for {:?}", frame.name());
                }
            }
            Inbound::StateChange(state) => {
                debug!("session: device state {state}");
                let _ = self.events.send(Event::StateChanged(state));
            }
            Inbound::DeviceAnnounce(announce) => self.announced(announce),
            Inbound::EndpointList(key, frame) | Inbound::EndpointDescriptor(key, frame) => {
                self.wake_zdo(key, frame);
            }
            Inbound::ApplicationReply(sequence, reply) => {
                if !self.transactions.resolve(sequence, reply) {
                    warn!("session: no transaction waiting on sequence {sequence}");
                }
            }
            Inbound::UnsolicitedCommand(name, message) => self.unsolicited(name, message),
            Inbound::Other(frame) => trace!("session: unhandled {:?}", frame.name()),
        }
    }

    fn wake_zdo(&mut self, key: ZdoKey, frame: LinkFrame) {
        let mut matched = 0;
        let mut i = 0;
        while i < self.zdo_waiters.len() {
            if key.answers(&self.zdo_waiters[i].0) {
                let (_, waiter) = self.zdo_waiters.swap_remove(i);
                let _ = waiter.send(frame.clone());
                matched += 1;
            } else {
                i += 1;
            }
        }
        if matched == 0 {
            debug!("session: unrequested ZDO reply {key:?}");
        }
    }

    fn announced(&mut self, announce: DeviceAnnounce) {
        let (device, indexed) = self.devices.announce(announce.nwk_address, announce.ieee_address);
        debug!("session: device announce {device}");
        if indexed {
            let _ = self.events.send(Event::DeviceAnnounced(device));
            return;
        }
        // Look the newcomer up in the association table before announcing it
        let Some(inner) = self.client.upgrade() else {
            return;
        };
        tokio::spawn(async move {
            let client = Client::from_inner(inner);
            let device = match client.device_by_short_address(announce.nwk_address).await {
                Ok(found) => found,
                Err(e) => {
                    warn!("session: lookup of announced 0x{:04x} failed: {e}", announce.nwk_address);
                    device
                }
            };
            client.emit(Event::DeviceAnnounced(device));
        });
    }

    fn unsolicited(&mut self, name: &'static str, message: ApplicationReply) {
        let ApplicationReply {
            source,
            cluster_id,
            frame,
            ..
        } = message;
        if !frame.frame_control.cluster_specific && frame.command_id == REPORT_ATTRIBUTES {
            match decode_report_attributes(&frame.payload) {
                Ok(reports) => {
                    for report in reports {
                        let _ = self.events.send(Event::AttributeReport {
                            source,
                            cluster_id,
                            attribute_id: report.attribute_id,
                            value: report.value,
                        });
                    }
                }
                Err(e) => warn!("session: bad attribute report from 0x{:04x}: {e}", source.address),
            }
        }
        let _ = self.events.send(Event::ClusterCommand {
            name,
            source,
            cluster_id,
            message: frame,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failed_descriptor_answers_any_endpoint() {
        let failed = ZdoKey::SimpleDescriptor(0x4f2a, None);
        assert!(failed.answers(&ZdoKey::SimpleDescriptor(0x4f2a, Some(1))));
        assert!(!failed.answers(&ZdoKey::SimpleDescriptor(0x1234, Some(1))));

        let ok = ZdoKey::SimpleDescriptor(0x4f2a, Some(2));
        assert!(!ok.answers(&ZdoKey::SimpleDescriptor(0x4f2a, Some(1))));
        assert!(ok.answers(&ZdoKey::SimpleDescriptor(0x4f2a, Some(2))));
        assert!(!ZdoKey::ActiveEndpoints(1).answers(&ZdoKey::MatchDescriptor(1)));
    }
}
