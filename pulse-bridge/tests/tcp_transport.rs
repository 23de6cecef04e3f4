use std::net::SocketAddr;
use std::time::Duration;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use pulse_bridge::{
    AppBridgeClient, AppBridgeConfig, BridgeClient, BridgeError, BridgeMessage, ConnectionState,
    Envelope, FrameCodec, SharedObject, TcpConnector, TransportError, WireError, WireErrorCode,
};
use pulse_core::{
    Event, EventType, GlucoseReading, Properties, SensorInfo, StreamKey,
};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

fn hyper_event() -> Event {
    let now = jiff::Timestamp::now();
    Event::new(
        "hyper-event-2".into(),
        now,
        EventType::HyperHigh,
        Properties::Glucose(GlucoseReading {
            id: "event-2".into(),
            hypo_id: None,
            hyper_id: Some("hyper-791".into()),
            sensor: SensorInfo {
                manufacturer: "Dexcom".into(),
                serial_number: "E06819507836".into(),
                model: "Dexcom-G7-Emulator".into(),
            },
            glucose_unit: "mg/dL".into(),
            glucose: 312,
            app_install_unique_id: 12345,
            transmitter_time: now.as_second(),
            sequence_number: 2,
            reading_time: now,
        }),
    )
    .unwrap()
}

/// Accepts one publisher and answers like the companion app would.
async fn spawn_companion(accept_hello: bool) -> (SocketAddr, JoinHandle<Vec<SharedObject>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let handle = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let codec = FrameCodec::default();
        let mut received = Vec::new();

        while let Ok(request) = codec.read(&mut socket).await {
            let reply = match &request.body {
                BridgeMessage::Hello(hello) if accept_hello => {
                    assert_eq!(hello.remote_app_id, "com.clinicalink.orion");
                    BridgeMessage::HelloAck
                }
                BridgeMessage::Hello(_) => BridgeMessage::Error(WireError {
                    code: WireErrorCode::UnknownApp,
                    message: "unknown publisher".into(),
                }),
                BridgeMessage::Publish(object) => {
                    received.push(object.clone());
                    BridgeMessage::PublishAck
                }
                BridgeMessage::Goodbye => break,
                _ => BridgeMessage::Error(WireError {
                    code: WireErrorCode::BadRequest,
                    message: "unexpected message".into(),
                }),
            };

            if codec
                .write(&mut socket, &Envelope::reply(&request, reply))
                .await
                .is_err()
            {
                break;
            }
        }

        received
    });

    (addr, handle)
}

#[tokio::test]
async fn publishes_over_tcp_to_companion() {
    let (addr, companion) = spawn_companion(true).await;
    let mut client = AppBridgeClient::new(
        TcpConnector::new(addr.to_string()),
        AppBridgeConfig::default(),
    );
    let event = hyper_event();

    client.connect().await.unwrap();
    client.publish(StreamKey::DataEvents, &event).await.unwrap();
    client.disconnect().await;

    let received = companion.await.unwrap();
    assert_eq!(received.len(), 1);
    assert_eq!(received[0].stream_key, "dataEvents");

    let decoded: Event = serde_json::from_str(&received[0].object_json).unwrap();
    assert_eq!(decoded, event);
    assert_eq!(client.published_count(), 1);
    assert_eq!(client.state(), ConnectionState::Disconnected);
}

#[tokio::test]
async fn rejected_handshake_fails_connect() {
    let (addr, _companion) = spawn_companion(false).await;
    let mut client = AppBridgeClient::new(
        TcpConnector::new(addr.to_string()),
        AppBridgeConfig::default(),
    );

    let err = client.connect().await.unwrap_err();

    assert!(matches!(
        err,
        BridgeError::TransportUnavailable(TransportError::Rejected(_))
    ));
    assert!(!client.is_connected());
}

#[tokio::test]
async fn missing_companion_fails_connect() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let mut client = AppBridgeClient::new(
        TcpConnector::new(addr.to_string()).with_timeout(Duration::from_secs(1)),
        AppBridgeConfig::default(),
    );

    let err = client.connect().await.unwrap_err();
    assert!(matches!(err, BridgeError::TransportUnavailable(_)));
    assert_eq!(client.state(), ConnectionState::Disconnected);
}

#[tokio::test]
async fn silent_companion_times_out() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let mut client = AppBridgeClient::new(
        TcpConnector::new(addr.to_string()).with_timeout(Duration::from_millis(100)),
        AppBridgeConfig::default(),
    );

    let err = client.connect().await.unwrap_err();
    assert!(matches!(
        err,
        BridgeError::TransportUnavailable(TransportError::Timeout(_))
    ));

    drop(listener);
}

/// Serves every publisher that connects, holding back the very first
/// `PublishAck` for `first_ack_delay`.
async fn spawn_slow_companion(first_ack_delay: Duration) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let delayed = Arc::new(AtomicBool::new(false));

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let delayed = Arc::clone(&delayed);

            tokio::spawn(async move {
                let codec = FrameCodec::default();

                while let Ok(request) = codec.read(&mut socket).await {
                    let reply = match &request.body {
                        BridgeMessage::Hello(_) => BridgeMessage::HelloAck,
                        BridgeMessage::Publish(_) => {
                            if !delayed.swap(true, Ordering::SeqCst) {
                                tokio::time::sleep(first_ack_delay).await;
                            }
                            BridgeMessage::PublishAck
                        }
                        _ => break,
                    };

                    if codec
                        .write(&mut socket, &Envelope::reply(&request, reply))
                        .await
                        .is_err()
                    {
                        break;
                    }
                }
            });
        }
    });

    addr
}

#[tokio::test]
async fn late_ack_drops_the_connection_and_reconnect_recovers() {
    let addr = spawn_slow_companion(Duration::from_millis(300)).await;
    let mut client = AppBridgeClient::new(
        TcpConnector::new(addr.to_string()).with_timeout(Duration::from_millis(100)),
        AppBridgeConfig::default(),
    );
    let event = hyper_event();

    client.connect().await.unwrap();
    let err = client
        .publish(StreamKey::DataEvents, &event)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        BridgeError::TransportPublishFailure(TransportError::Timeout(_))
    ));
    assert_eq!(client.state(), ConnectionState::Disconnected);

    let err = client
        .publish(StreamKey::DataEvents, &event)
        .await
        .unwrap_err();
    assert!(matches!(err, BridgeError::NotConnected));

    client.connect().await.unwrap();
    for _ in 0..3 {
        client.publish(StreamKey::DataEvents, &event).await.unwrap();
    }

    assert_eq!(client.published_count(), 3);
    assert!(client.is_connected());
    client.disconnect().await;
}

#[tokio::test]
async fn oversized_object_is_refused_before_sending() {
    let (addr, companion) = spawn_companion(true).await;
    let mut client = AppBridgeClient::new(
        TcpConnector::new(addr.to_string()).with_max_frame_bytes(256),
        AppBridgeConfig::default(),
    );

    client.connect().await.unwrap();
    let err = client
        .publish(StreamKey::DataEvents, &hyper_event())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        BridgeError::TransportPublishFailure(TransportError::Frame(_))
    ));
    assert_eq!(client.published_count(), 0);

    drop(client);
    assert!(companion.await.unwrap().is_empty());
}
