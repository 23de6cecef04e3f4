//! Minimal companion app: accepts publishers and prints every shared object.

use pulse_bridge::{BridgeMessage, Envelope, FrameCodec, WireError, WireErrorCode};
use tokio::net::TcpListener;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() {
    let filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "companion=info,pulse_bridge=debug".to_owned());
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_span_events(tracing_subscriber::fmt::format::FmtSpan::CLOSE)
        .init();

    let listen_addr = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "127.0.0.1:9400".to_string());

    let listener = match TcpListener::bind(&listen_addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("failed to bind {}: {}", listen_addr, e);
            std::process::exit(1);
        }
    };

    info!("companion listening on {}", listen_addr);

    loop {
        let (mut socket, peer) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(e) => {
                warn!("accept failed: {}", e);
                continue;
            }
        };

        tokio::spawn(async move {
            info!(%peer, "publisher connected");
            let codec = FrameCodec::default();

            while let Ok(request) = codec.read(&mut socket).await {
                let reply = match &request.body {
                    BridgeMessage::Hello(hello) => {
                        info!(
                            remote_app_id = %hello.remote_app_id,
                            url_scheme = %hello.remote_app_url_scheme,
                            "hello"
                        );
                        BridgeMessage::HelloAck
                    }
                    BridgeMessage::Publish(object) => {
                        info!(stream = %object.stream_key, "{}", object.object_json);
                        BridgeMessage::PublishAck
                    }
                    BridgeMessage::Goodbye => break,
                    other => {
                        warn!(?other, "unexpected message");
                        BridgeMessage::Error(WireError {
                            code: WireErrorCode::BadRequest,
                            message: "unexpected message".into(),
                        })
                    }
                };

                if let Err(e) = codec.write(&mut socket, &Envelope::reply(&request, reply)).await {
                    error!("failed to reply: {}", e);
                    break;
                }
            }

            info!(%peer, "publisher disconnected");
        });
    }
}
