//! Pusher wire protocol (revision 7)
//!
//! Every frame is a JSON object `{"event": ..., "channel": ..., "data": ...}`.
//! Servers usually send `data` as a JSON-encoded *string*; both encodings are
//! accepted here.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Raw frame as it appears on the socket
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Frame {
    pub event: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// Decoded server message
#[derive(Debug, Clone, PartialEq)]
pub enum ServerMessage {
    ConnectionEstablished {
        socket_id: String,
        activity_timeout: Option<u64>,
    },
    Error {
        code: Option<u32>,
        message: String,
    },
    Ping,
    Pong,
    SubscriptionSucceeded {
        channel: String,
    },
    SubscriptionError {
        channel: String,
        status: Option<u16>,
        message: String,
    },
    ChannelEvent {
        channel: String,
        event: String,
        data: Value,
    },
    /// Anything else (cache misses, presence member events on unknown channels...)
    Ignored(String),
}

/// What the client should do after the server reports an error code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryPolicy {
    /// 4000-4099: do not reconnect with the same parameters
    Fatal,
    /// 4100-4199: reconnect after backing off
    Backoff,
    /// 4200-4299: reconnect immediately
    Immediate,
}

impl RetryPolicy {
    pub fn for_code(code: Option<u32>) -> Self {
        match code {
            Some(4000..=4099) => RetryPolicy::Fatal,
            Some(4200..=4299) => RetryPolicy::Immediate,
            _ => RetryPolicy::Backoff,
        }
    }
}

/// Decode the `data` field, unwrapping string-encoded JSON
pub fn decode_data(data: Option<Value>) -> Value {
    match data {
        Some(Value::String(raw)) => serde_json::from_str(&raw).unwrap_or(Value::String(raw)),
        Some(value) => value,
        None => Value::Null,
    }
}

/// Parse a text frame into a [`ServerMessage`]
pub fn parse(text: &str) -> Result<ServerMessage, serde_json::Error> {
    let frame: Frame = serde_json::from_str(text)?;
    let data = decode_data(frame.data);

    let message = match frame.event.as_str() {
        "pusher:connection_established" => ServerMessage::ConnectionEstablished {
            socket_id: data["socket_id"].as_str().unwrap_or_default().to_string(),
            activity_timeout: data["activity_timeout"].as_u64(),
        },
        "pusher:error" => ServerMessage::Error {
            code: data["code"].as_u64().map(|c| c as u32),
            message: data["message"].as_str().unwrap_or("unknown error").to_string(),
        },
        "pusher:ping" => ServerMessage::Ping,
        "pusher:pong" => ServerMessage::Pong,
        "pusher_internal:subscription_succeeded" => match frame.channel {
            Some(channel) => ServerMessage::SubscriptionSucceeded { channel },
            None => ServerMessage::Ignored(frame.event),
        },
        "pusher:subscription_error" => match frame.channel {
            Some(channel) => ServerMessage::SubscriptionError {
                channel,
                status: data["status"].as_u64().map(|s| s as u16),
                message: data["error"]
                    .as_str()
                    .or_else(|| data.as_str())
                    .unwrap_or("subscription rejected")
                    .to_string(),
            },
            None => ServerMessage::Ignored(frame.event),
        },
        other if other.starts_with("pusher:") || other.starts_with("pusher_internal:") => {
            ServerMessage::Ignored(frame.event)
        }
        _ => match frame.channel {
            Some(channel) => ServerMessage::ChannelEvent {
                channel,
                event: frame.event,
                data,
            },
            None => ServerMessage::Ignored(frame.event),
        },
    };

    Ok(message)
}

pub fn subscribe_frame(channel: &str, auth: Option<&str>) -> String {
    let data = match auth {
        Some(auth) => json!({ "channel": channel, "auth": auth }),
        None => json!({ "channel": channel }),
    };
    json!({ "event": "pusher:subscribe", "data": data }).to_string()
}

pub fn unsubscribe_frame(channel: &str) -> String {
    json!({ "event": "pusher:unsubscribe", "data": { "channel": channel } }).to_string()
}

pub fn ping_frame() -> String {
    json!({ "event": "pusher:ping", "data": {} }).to_string()
}

pub fn pong_frame() -> String {
    json!({ "event": "pusher:pong", "data": {} }).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_connection_established_string_data() {
        let text = r#"{"event":"pusher:connection_established","data":"{\"socket_id\":\"123.456\",\"activity_timeout\":120}"}"#;
        assert_eq!(
            parse(text).unwrap(),
            ServerMessage::ConnectionEstablished {
                socket_id: "123.456".to_string(),
                activity_timeout: Some(120),
            }
        );
    }

    #[test]
    fn test_parse_error_with_code() {
        let text = r#"{"event":"pusher:error","data":{"code":4001,"message":"App key not in this cluster"}}"#;
        let msg = parse(text).unwrap();
        assert_eq!(
            msg,
            ServerMessage::Error {
                code: Some(4001),
                message: "App key not in this cluster".to_string(),
            }
        );
        assert_eq!(RetryPolicy::for_code(Some(4001)), RetryPolicy::Fatal);
    }

    #[test]
    fn test_parse_channel_event_decodes_payload() {
        let text = r#"{"event":"budget-deleted","channel":"private-budgets","data":"{\"id\":\"b1\"}"}"#;
        match parse(text).unwrap() {
            ServerMessage::ChannelEvent { channel, event, data } => {
                assert_eq!(channel, "private-budgets");
                assert_eq!(event, "budget-deleted");
                assert_eq!(data["id"], "b1");
            }
            other => panic!("unexpected message: {:?}", other),
        }
    }

    #[test]
    fn test_parse_subscription_succeeded() {
        let text = r#"{"event":"pusher_internal:subscription_succeeded","channel":"private-invoices","data":"{}"}"#;
        assert_eq!(
            parse(text).unwrap(),
            ServerMessage::SubscriptionSucceeded {
                channel: "private-invoices".to_string()
            }
        );
    }

    #[test]
    fn test_retry_policy_ranges() {
        assert_eq!(RetryPolicy::for_code(Some(4100)), RetryPolicy::Backoff);
        assert_eq!(RetryPolicy::for_code(Some(4201)), RetryPolicy::Immediate);
        assert_eq!(RetryPolicy::for_code(None), RetryPolicy::Backoff);
    }

    #[test]
    fn test_subscribe_frame_with_auth() {
        let frame: Value = serde_json::from_str(&subscribe_frame("private-budgets", Some("k:s"))).unwrap();
        assert_eq!(frame["event"], "pusher:subscribe");
        assert_eq!(frame["data"]["channel"], "private-budgets");
        assert_eq!(frame["data"]["auth"], "k:s");
    }
}
