//! End-to-end tests of the client against a scripted radio.
//!
//! The radio side of an in-memory duplex stream plays the firmware: it reads
//! the frames the host writes and answers them by hand.

use std::io;
use std::sync::Arc;

use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream};
use tokio::sync::{broadcast, mpsc};
use zcl_protocol::{cluster, FrameControl, ZclFrame, READ_ATTRIBUTES, READ_ATTRIBUTES_RESPONSE, REPORT_ATTRIBUTES};
use zigbee_codec::{IeeeAddress, Value};
use znp_client::{ClientConfig, Client, ClientError, Connector, Event, MemoryCatalog, Target};
use znp_protocol::packets::{DeviceAnnounce, DeviceInfo, EndpointList, IncomingMessage, SimpleDescriptor};
use znp_protocol::{command_by_name, CommandType, FrameCodec, LinkFrame, ZnpStatus};

// ============================================================================
// Scripted radio
// ============================================================================

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

struct Radio {
    stream: DuplexStream,
    codec: FrameCodec,
    // Keeps the connector waiting instead of failing
    _streams: mpsc::UnboundedSender<DuplexStream>,
}

impl Radio {
    async fn next(&mut self) -> LinkFrame {
        let mut buf = [0u8; 256];
        loop {
            if let Some(frame) = self.codec.decode() {
                return frame.expect("host wrote a bad frame");
            }
            let n = self.stream.read(&mut buf).await.expect("radio read");
            assert!(n > 0, "host closed the stream");
            self.codec.push(&buf[..n]);
        }
    }

    async fn expect(&mut self, name: &str) -> LinkFrame {
        let frame = self.next().await;
        assert_eq!(frame.name(), Some(name));
        frame
    }

    async fn send(&mut self, kind: CommandType, name: &str, payload: Vec<u8>) {
        let command = command_by_name(name).expect("known command");
        let frame = LinkFrame::new(kind, command.subsystem, command.id, payload);
        self.stream
            .write_all(&frame.encode().expect("encode"))
            .await
            .expect("radio write");
    }

    async fn reply(&mut self, name: &str, payload: Vec<u8>) {
        self.send(CommandType::Srsp, name, payload).await;
    }

    async fn indicate(&mut self, name: &str, payload: Vec<u8>) {
        self.send(CommandType::Areq, name, payload).await;
    }

    /// Answer an AF data request and return the cluster library frame it carried.
    async fn accept_zcl(&mut self) -> ZclFrame {
        let request = self.expect("AF_DATA_REQUEST_EXT").await;
        self.reply("AF_DATA_REQUEST_EXT", vec![0x00]).await;
        // Address (9), endpoints, PAN, cluster, ids, options and radius come before the length
        ZclFrame::decode(&request.payload[20..]).expect("zcl frame")
    }

    async fn deliver_zcl(&mut self, address: u16, cluster_id: u16, frame: ZclFrame) {
        let message = IncomingMessage {
            group_id: 0,
            cluster_id,
            src_address: address,
            src_endpoint: 1,
            dst_endpoint: 20,
            was_broadcast: false,
            link_quality: 0x8c,
            security_use: false,
            timestamp: 0,
            transaction_sequence: 0,
            data: frame.encode().expect("encode zcl"),
        };
        self.indicate("AF_INCOMING_MSG", message.encode().expect("encode message"))
            .await;
    }
}

fn device_info(short_address: u16, index: u16) -> DeviceInfo {
    DeviceInfo {
        short_address,
        index,
        node_relation: 1,
        status: 0,
        assoc_count: 0,
        age: 0,
        tx_counter: 0,
        tx_cost: 0,
        rx_lqi: 0,
        in_key_seq_num: 0,
        in_frame_counter: 0,
        tx_failure: 0,
    }
}

fn response_frame(command_id: u8, sequence: u8, payload: Vec<u8>) -> ZclFrame {
    let control = FrameControl {
        server_to_client: true,
        ..FrameControl::general()
    };
    ZclFrame::new(control, command_id, payload).with_sequence(sequence)
}

/// A client whose link handshake has completed.
async fn connected() -> (Client, Radio) {
    let (stream_tx, streams) = mpsc::unbounded_channel();
    let client = Client::with_connector(
        DuplexConnector { streams },
        ClientConfig::default(),
        Arc::new(MemoryCatalog::home_automation()),
    );
    let (host, stream) = tokio::io::duplex(4096);
    stream_tx.send(host).expect("connector alive");

    let mut radio = Radio {
        stream,
        codec: FrameCodec::new(),
        _streams: stream_tx,
    };
    // The bootloader bypass carries no start byte and is skipped
    radio.expect("SYS_PING").await;
    radio.reply("SYS_PING", vec![0x59, 0x06]).await;
    client.connect().await.expect("link ready");
    (client, radio)
}

async fn next_event(events: &mut broadcast::Receiver<Event>) -> Event {
    events.recv().await.expect("event")
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test]
async fn test_device_enumeration() {
    let (client, mut radio) = connected().await;

    let task = tokio::spawn({
        let client = client.clone();
        async move { client.devices().await }
    });

    radio.expect("UTIL_ASSOC_COUNT").await;
    radio.reply("UTIL_ASSOC_COUNT", vec![2]).await;
    for index in 0..2u8 {
        let request = radio.expect("UTIL_ASSOC_FIND_DEVICE").await;
        assert_eq!(request.payload, vec![index]);
        let info = device_info(0x1000 + u16::from(index), u16::from(index));
        radio.reply("UTIL_ASSOC_FIND_DEVICE", info.encode().unwrap()).await;
    }

    let devices = task.await.unwrap().expect("devices");
    assert_eq!(devices.len(), 2);
    assert_eq!(devices[0].short_address, 0x1000);
    assert_eq!(devices[1].index, Some(1));

    // Cached: no radio traffic
    let cached = client.device_by_index(1).await.expect("cached");
    assert_eq!(cached.short_address, 0x1001);
}

#[tokio::test]
async fn test_concurrent_requests_answered_in_order() {
    let (client, mut radio) = connected().await;

    let a = tokio::spawn({
        let client = client.clone();
        async move { client.device_by_index(4).await }
    });
    let b = tokio::spawn({
        let client = client.clone();
        async move { client.device_by_index(7).await }
    });

    // Answer each request with the device it asked for; FIFO matching hands
    // every caller its own answer.
    let first = radio.expect("UTIL_ASSOC_FIND_DEVICE").await;
    let second = radio.expect("UTIL_ASSOC_FIND_DEVICE").await;
    for request in [first, second] {
        let index = u16::from(request.payload[0]);
        let info = device_info(0x2000 + index, index);
        radio.reply("UTIL_ASSOC_FIND_DEVICE", info.encode().unwrap()).await;
    }

    assert_eq!(a.await.unwrap().unwrap().short_address, 0x2004);
    assert_eq!(b.await.unwrap().unwrap().short_address, 0x2007);
}

#[tokio::test]
async fn test_missing_device() {
    let (client, mut radio) = connected().await;

    let task = tokio::spawn({
        let client = client.clone();
        async move { client.device_by_short_address(0x0bad).await }
    });
    radio.expect("UTIL_ASSOC_GET_WITH_ADDRESS").await;
    let info = device_info(0xFFFE, 0xFFFF);
    radio.reply("UTIL_ASSOC_GET_WITH_ADDRESS", info.encode().unwrap()).await;

    assert!(matches!(task.await.unwrap(), Err(ClientError::DeviceNotFound(_))));
}

#[tokio::test]
async fn test_read_attributes() {
    let (client, mut radio) = connected().await;
    let target = Target {
        address: 0x4f2a,
        endpoint: 1,
    };

    let task = tokio::spawn({
        let client = client.clone();
        async move {
            client
                .cluster(target, cluster::BASIC)
                .read_attributes(&["ModelIdentifier".into()])
                .await
        }
    });

    let request = radio.accept_zcl().await;
    assert_eq!(request.command_id, READ_ATTRIBUTES);
    assert_eq!(request.sequence, 1);
    assert_eq!(request.payload, vec![0x05, 0x00]);

    let mut payload = vec![0x05, 0x00, 0x00, 0x42, 11];
    payload.extend_from_slice(b"lumi.sensor");
    radio
        .deliver_zcl(
            0x4f2a,
            cluster::BASIC,
            response_frame(READ_ATTRIBUTES_RESPONSE, request.sequence, payload),
        )
        .await;

    let values = task.await.unwrap().expect("read");
    assert_eq!(values.value("ModelIdentifier"), Some(&Value::Str("lumi.sensor".into())));
    assert_eq!(values.get(0x0005u16).unwrap().name.as_deref(), Some("ModelIdentifier"));
}

#[tokio::test]
async fn test_radio_rejects_data_request() {
    let (client, mut radio) = connected().await;

    let task = tokio::spawn({
        let client = client.clone();
        async move {
            client
                .cluster(Target { address: 0x4f2a, endpoint: 1 }, cluster::ON_OFF)
                .invoke("Toggle", Vec::new())
                .await
        }
    });
    radio.expect("AF_DATA_REQUEST_EXT").await;
    radio.reply("AF_DATA_REQUEST_EXT", vec![0xcd]).await;

    match task.await.unwrap() {
        Err(ClientError::RadioStatus { command, status }) => {
            assert_eq!(command, "AF_DATA_REQUEST_EXT");
            assert_eq!(status, ZnpStatus::from(0xcd));
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn test_application_timeout() {
    let (client, mut radio) = connected().await;

    let task = tokio::spawn({
        let client = client.clone();
        async move {
            client
                .cluster(Target { address: 0x4f2a, endpoint: 1 }, cluster::BASIC)
                .read_attribute(0x0004u16)
                .await
        }
    });
    let request = radio.accept_zcl().await;

    assert!(matches!(
        task.await.unwrap(),
        Err(ClientError::ApplicationRequestTimeout { sequence: 1 })
    ));

    // A late reply finds no transaction and is dropped
    radio
        .deliver_zcl(
            0x4f2a,
            cluster::BASIC,
            response_frame(READ_ATTRIBUTES_RESPONSE, request.sequence, vec![0x04, 0x00, 0x86]),
        )
        .await;

    let task = tokio::spawn({
        let client = client.clone();
        async move {
            client
                .cluster(Target { address: 0x4f2a, endpoint: 1 }, cluster::BASIC)
                .read_attribute(0x0004u16)
                .await
        }
    });
    let request = radio.accept_zcl().await;
    assert_eq!(request.sequence, 2);
    radio
        .deliver_zcl(
            0x4f2a,
            cluster::BASIC,
            response_frame(READ_ATTRIBUTES_RESPONSE, request.sequence, vec![0x04, 0x00, 0x86]),
        )
        .await;
    assert!(matches!(task.await.unwrap(), Err(ClientError::ZclStatus { .. })));
}

#[tokio::test(start_paused = true)]
async fn test_unanswered_request_releases_its_place() {
    let (client, mut radio) = connected().await;

    let task = tokio::spawn({
        let client = client.clone();
        async move { client.firmware_version().await }
    });
    radio.expect("SYS_VERSION").await;
    assert!(matches!(
        task.await.unwrap(),
        Err(ClientError::LinkRequestTimeout { command: "SYS_VERSION" })
    ));

    // The next reply of the same name goes to the caller still waiting
    let task = tokio::spawn({
        let client = client.clone();
        async move { client.firmware_version().await }
    });
    radio.expect("SYS_VERSION").await;
    radio.reply("SYS_VERSION", vec![2, 0, 2, 6, 3]).await;
    let version = task.await.unwrap().unwrap();
    assert_eq!((version.major, version.minor, version.maintenance), (2, 6, 3));
}

#[tokio::test]
async fn test_announce_looks_up_new_device() {
    let (client, mut radio) = connected().await;
    let mut events = client.subscribe();

    let ieee = IeeeAddress::new([0x00, 0x15, 0x8d, 0x00, 0x01, 0x02, 0x03, 0x04]);
    let announce = DeviceAnnounce {
        src_address: 0x4f2a,
        nwk_address: 0x4f2a,
        ieee_address: ieee,
        mains_powered: false,
        receiver_on_when_idle: false,
    };
    radio
        .indicate("ZDO_END_DEVICE_ANNCE_IND", announce.encode().unwrap())
        .await;

    let request = radio.expect("UTIL_ASSOC_GET_WITH_ADDRESS").await;
    assert_eq!(&request.payload[8..], &[0x2a, 0x4f]);
    radio
        .reply("UTIL_ASSOC_GET_WITH_ADDRESS", device_info(0x4f2a, 3).encode().unwrap())
        .await;

    match next_event(&mut events).await {
        Event::DeviceAnnounced(device) => {
            assert_eq!(device.short_address, 0x4f2a);
            assert_eq!(device.index, Some(3));
            assert_eq!(device.long_address, Some(ieee));
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[tokio::test]
async fn test_attribute_report_events() {
    let (client, mut radio) = connected().await;
    let mut events = client.subscribe();

    // MeasuredValue (int16) = 1234
    let report = response_frame(REPORT_ATTRIBUTES, 0, vec![0x00, 0x00, 0x29, 0xd2, 0x04]);
    radio
        .deliver_zcl(0x4f2a, cluster::TEMPERATURE_MEASUREMENT, report)
        .await;

    match next_event(&mut events).await {
        Event::AttributeReport {
            source,
            cluster_id,
            attribute_id,
            value,
        } => {
            assert_eq!(source.address, 0x4f2a);
            assert_eq!(cluster_id, cluster::TEMPERATURE_MEASUREMENT);
            assert_eq!(attribute_id, 0x0000);
            assert_eq!(value, Value::Int(1234));
        }
        other => panic!("unexpected {other:?}"),
    }
    match next_event(&mut events).await {
        Event::ClusterCommand { name, .. } => assert_eq!(name, "ReportAttributes"),
        other => panic!("unexpected {other:?}"),
    }
}

#[tokio::test]
async fn test_endpoint_discovery() {
    let (client, mut radio) = connected().await;
    let mut events = client.subscribe();

    let descriptor = SimpleDescriptor {
        src_address: 0x4f2a,
        status: ZnpStatus::Success,
        nwk_address: 0x4f2a,
        endpoint: 1,
        profile_id: 0x0104,
        device_id: 0x0402,
        device_version: 0,
        in_clusters: vec![cluster::BASIC, cluster::IAS_ZONE],
        out_clusters: vec![],
    };

    let task = tokio::spawn({
        let client = client.clone();
        async move { client.discover_endpoints(0x4f2a).await }
    });

    radio.expect("ZDO_ACTIVE_EP_REQ").await;
    radio.reply("ZDO_ACTIVE_EP_REQ", vec![0x00]).await;
    let list = EndpointList {
        src_address: 0x4f2a,
        status: ZnpStatus::Success,
        nwk_address: 0x4f2a,
        endpoints: vec![1],
    };
    radio.indicate("ZDO_ACTIVE_EP_RSP", list.encode().unwrap()).await;

    radio.expect("ZDO_SIMPLE_DESC_REQ").await;
    radio.reply("ZDO_SIMPLE_DESC_REQ", vec![0x00]).await;
    radio
        .indicate("ZDO_SIMPLE_DESC_RSP", descriptor.encode().unwrap())
        .await;

    let endpoints = task.await.unwrap().expect("discovery");
    assert_eq!(endpoints.len(), 1);
    assert!(endpoints[0].has_in_cluster(cluster::IAS_ZONE));
    match next_event(&mut events).await {
        Event::EndpointDiscovered(endpoint) => assert_eq!(endpoint.id, 1),
        other => panic!("unexpected {other:?}"),
    }

    // Describing it again changes nothing and raises no second event
    let task = tokio::spawn({
        let client = client.clone();
        async move { client.simple_descriptor(0x4f2a, 1).await }
    });
    radio.expect("ZDO_SIMPLE_DESC_REQ").await;
    radio.reply("ZDO_SIMPLE_DESC_REQ", vec![0x00]).await;
    radio
        .indicate("ZDO_SIMPLE_DESC_RSP", descriptor.encode().unwrap())
        .await;
    let again = task.await.unwrap().expect("descriptor");
    assert_eq!(again.in_clusters, endpoints[0].in_clusters);

    let devices = client.cached_devices().await.unwrap();
    assert_eq!(devices.len(), 1);
    assert_eq!(devices[0].endpoints.len(), 1);
    assert!(matches!(events.try_recv(), Err(broadcast::error::TryRecvError::Empty)));
}

#[tokio::test]
async fn test_request_fails_while_disconnected() {
    let (client, _radio) = connected().await;
    client.transport().force_close();
    client
        .transport()
        .subscribe()
        .wait_for(|s| *s != znp_client::TransportState::Ready)
        .await
        .unwrap();

    assert!(matches!(
        client.firmware_version().await,
        Err(ClientError::TransportDisconnected)
    ));
}
