use std::fmt;

use serde::{Deserialize, Serialize};
use ulid::Ulid;

use crate::AppBridgeConfig;

/// Correlates a companion reply with the request that caused it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(Ulid);

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// One bridge message on the wire. Requests start a new exchange; replies
/// name the request they answer in `in_reply_to`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    pub id: MessageId,
    pub in_reply_to: Option<MessageId>,
    pub body: BridgeMessage,
}

impl Envelope {
    pub fn request(body: BridgeMessage) -> Self {
        Self {
            id: MessageId(Ulid::new()),
            in_reply_to: None,
            body,
        }
    }

    pub fn reply(request: &Envelope, body: BridgeMessage) -> Self {
        Self {
            id: MessageId(Ulid::new()),
            in_reply_to: Some(request.id),
            body,
        }
    }

    pub fn answers(&self, request: &Envelope) -> bool {
        self.in_reply_to == Some(request.id)
    }
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub enum BridgeMessage {
    Hello(Hello),
    HelloAck,
    Publish(SharedObject),
    PublishAck,
    Goodbye,
    Error(WireError),
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct Hello {
    pub remote_app_id: String,
    pub remote_app_url_scheme: String,
    pub ios_app_group_id: String,
}

impl From<&AppBridgeConfig> for Hello {
    fn from(config: &AppBridgeConfig) -> Self {
        Self {
            remote_app_id: config.remote_app_id.clone(),
            remote_app_url_scheme: config.remote_app_url_scheme.clone(),
            ios_app_group_id: config.ios_app_group_id.clone(),
        }
    }
}

/// An object added to a named shared stream. The object travels as JSON text
/// so the companion sees exactly the map the publisher built.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct SharedObject {
    pub stream_key: String,
    pub object_json: String,
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct WireError {
    pub code: WireErrorCode,
    pub message: String,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
pub enum WireErrorCode {
    BadRequest,
    UnknownApp,
    Internal,
}
