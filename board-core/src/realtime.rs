//! Phoenix channel frames spoken by the realtime change feed.
//!
//! Transport is left to the caller: the native client drives a tokio websocket,
//! the page drives a browser one. Both encode and classify frames here.

use std::time::Duration;

use chrono::{DateTime, Utc};
use percent_encoding::{NON_ALPHANUMERIC, utf8_percent_encode};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::warn;

use crate::domain::change::ChangeEvent;
use crate::domain::error::RealtimeError;
use crate::domain::post::{Post, PostId};

pub const PROTOCOL_VERSION: &str = "1.0.0";
pub const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(25);

const PHOENIX_TOPIC: &str = "phoenix";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhoenixMessage {
    pub topic: String,
    pub event: String,
    #[serde(default)]
    pub payload: Value,
    #[serde(rename = "ref", default)]
    pub reference: Option<String>,
}

impl PhoenixMessage {
    pub fn to_text(&self) -> Result<String, RealtimeError> {
        Ok(serde_json::to_string(self)?)
    }
}

/// `ws(s)://<host>/realtime/v1/websocket?apikey=<key>&vsn=1.0.0`
pub fn socket_url(base_url: &str, api_key: &str) -> String {
    let base = base_url.trim_end_matches('/');
    let base = if let Some(rest) = base.strip_prefix("https://") {
        format!("wss://{rest}")
    } else if let Some(rest) = base.strip_prefix("http://") {
        format!("ws://{rest}")
    } else {
        base.to_string()
    };
    format!(
        "{}/realtime/v1/websocket?apikey={}&vsn={}",
        base,
        utf8_percent_encode(api_key, NON_ALPHANUMERIC),
        PROTOCOL_VERSION
    )
}

pub fn heartbeat(reference: String) -> PhoenixMessage {
    PhoenixMessage {
        topic: PHOENIX_TOPIC.to_string(),
        event: "heartbeat".to_string(),
        payload: json!({}),
        reference: Some(reference),
    }
}

/// A subscription to every row change of one table.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelConfig {
    pub schema: String,
    pub table: String,
}

impl ChannelConfig {
    pub fn for_table(table: impl Into<String>) -> Self {
        Self {
            schema: "public".to_string(),
            table: table.into(),
        }
    }

    pub fn topic(&self) -> String {
        format!("realtime:{}:{}", self.schema, self.table)
    }

    pub fn join(&self, access_token: &str, reference: String) -> PhoenixMessage {
        PhoenixMessage {
            topic: self.topic(),
            event: "phx_join".to_string(),
            payload: json!({
                "config": {
                    "broadcast": { "ack": false, "self": false },
                    "presence": { "key": "" },
                    "postgres_changes": [
                        { "event": "*", "schema": self.schema, "table": self.table }
                    ],
                    "private": false
                },
                "access_token": access_token,
            }),
            reference: Some(reference),
        }
    }

    pub fn leave(&self, reference: String) -> PhoenixMessage {
        PhoenixMessage {
            topic: self.topic(),
            event: "phx_leave".to_string(),
            payload: json!({}),
            reference: Some(reference),
        }
    }
}

/// Monotonic message refs, one sequence per socket.
#[derive(Debug, Default)]
pub struct RefCounter(u64);

impl RefCounter {
    pub fn next(&mut self) -> String {
        self.0 += 1;
        self.0.to_string()
    }
}

/// Heartbeat schedule for runtimes that only have one-shot timers.
#[derive(Debug, Clone)]
pub struct Heartbeat {
    interval: Duration,
    last: DateTime<Utc>,
}

impl Heartbeat {
    pub fn new(interval: Duration, now: DateTime<Utc>) -> Self {
        Self {
            interval,
            last: now,
        }
    }

    pub fn until_due(&self, now: DateTime<Utc>) -> Duration {
        let elapsed = (now - self.last).to_std().unwrap_or(Duration::ZERO);
        self.interval.saturating_sub(elapsed)
    }

    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.until_due(now).is_zero()
    }

    pub fn beat(&mut self, now: DateTime<Utc>) {
        self.last = now;
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub topic: String,
    pub reference: Option<String>,
    pub status: String,
    pub response: Value,
}

impl Reply {
    pub fn is_ok(&self) -> bool {
        self.status == "ok"
    }

    pub fn reason(&self) -> String {
        self.response
            .get("reason")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| self.response.to_string())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    Reply(Reply),
    Change(ChangeEvent),
    ChannelError { topic: String },
    ChannelClosed { topic: String },
    /// Server status notices, e.g. "subscribed to realtime".
    System(Value),
    Other { event: String },
}

impl Frame {
    /// Outcome of a join, if this frame answers the join sent with `join_ref`.
    pub fn join_result(&self, join_ref: &str) -> Option<Result<(), RealtimeError>> {
        match self {
            Frame::Reply(reply) if reply.reference.as_deref() == Some(join_ref) => {
                if reply.is_ok() {
                    Some(Ok(()))
                } else {
                    Some(Err(RealtimeError::JoinRejected(reply.reason())))
                }
            }
            Frame::ChannelError { topic } => Some(Err(RealtimeError::ChannelError {
                topic: topic.clone(),
            })),
            Frame::ChannelClosed { topic } => Some(Err(RealtimeError::ChannelClosed {
                topic: topic.clone(),
            })),
            _ => None,
        }
    }
}

pub fn decode_frame(text: &str) -> Result<Frame, RealtimeError> {
    let message: PhoenixMessage = serde_json::from_str(text)?;
    classify(message)
}

/// Like [`decode_frame`], but a frame that cannot be decoded is logged and
/// skipped so one bad row does not end the subscription.
pub fn read_frame(text: &str) -> Option<Frame> {
    match decode_frame(text) {
        Ok(frame) => Some(frame),
        Err(e) => {
            warn!(error = %e, %text, "skipping undecodable realtime frame");
            None
        }
    }
}

pub fn classify(message: PhoenixMessage) -> Result<Frame, RealtimeError> {
    let frame = match message.event.as_str() {
        "phx_reply" => {
            let status = message
                .payload
                .get("status")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            let response = message.payload.get("response").cloned().unwrap_or(Value::Null);
            Frame::Reply(Reply {
                topic: message.topic,
                reference: message.reference,
                status,
                response,
            })
        }
        "postgres_changes" => Frame::Change(decode_change(message.payload)?),
        "phx_error" => Frame::ChannelError {
            topic: message.topic,
        },
        "phx_close" => Frame::ChannelClosed {
            topic: message.topic,
        },
        "system" => Frame::System(message.payload),
        other => Frame::Other {
            event: other.to_string(),
        },
    };
    Ok(frame)
}

#[derive(Deserialize)]
struct ChangesPayload {
    data: ChangeData,
}

#[derive(Deserialize)]
struct ChangeData {
    #[serde(rename = "type")]
    kind: ChangeKind,
    #[serde(default)]
    record: Option<Value>,
    #[serde(default)]
    old_record: Option<Value>,
}

#[derive(Deserialize)]
#[serde(rename_all = "UPPERCASE")]
enum ChangeKind {
    Insert,
    Update,
    Delete,
}

#[derive(Deserialize)]
struct RecordKey {
    id: PostId,
}

/// Turns a `postgres_changes` payload into a [`ChangeEvent`].
pub fn decode_change(payload: Value) -> Result<ChangeEvent, RealtimeError> {
    let ChangesPayload { data } = serde_json::from_value(payload)?;
    match data.kind {
        ChangeKind::Insert => Ok(ChangeEvent::Insert(record::<Post>(data.record, "record")?)),
        ChangeKind::Update => Ok(ChangeEvent::Update(record::<Post>(data.record, "record")?)),
        ChangeKind::Delete => {
            let key = record::<RecordKey>(data.old_record, "old_record")?;
            Ok(ChangeEvent::Delete { id: key.id })
        }
    }
}

fn record<T: serde::de::DeserializeOwned>(
    value: Option<Value>,
    field: &str,
) -> Result<T, RealtimeError> {
    let value = value
        .filter(|v| !v.is_null())
        .ok_or_else(|| RealtimeError::UnexpectedPayload(format!("missing {field}")))?;
    Ok(serde_json::from_value(value)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn change_frame(kind: &str, record: Value, old_record: Value) -> String {
        json!({
            "topic": "realtime:public:posts",
            "event": "postgres_changes",
            "payload": {
                "ids": [41],
                "data": {
                    "schema": "public",
                    "table": "posts",
                    "commit_timestamp": "2024-05-01T12:00:00Z",
                    "type": kind,
                    "record": record,
                    "old_record": old_record,
                    "errors": null
                }
            },
            "ref": null
        })
        .to_string()
    }

    #[test]
    fn socket_url_switches_scheme() {
        assert_eq!(
            socket_url("https://abc.supabase.co/", "k.e-y"),
            "wss://abc.supabase.co/realtime/v1/websocket?apikey=k%2Ee%2Dy&vsn=1.0.0"
        );
        assert!(socket_url("http://localhost:54321", "key").starts_with("ws://localhost:54321/"));
    }

    #[test]
    fn join_subscribes_to_table_changes() {
        let join = ChannelConfig::for_table("posts").join("anon", "1".into());
        assert_eq!(join.topic, "realtime:public:posts");
        assert_eq!(join.event, "phx_join");
        assert_eq!(
            join.payload["config"]["postgres_changes"],
            json!([{ "event": "*", "schema": "public", "table": "posts" }])
        );
        let text = join.to_text().unwrap();
        assert!(text.contains(r#""ref":"1""#));
    }

    #[test]
    fn refs_increase() {
        let mut refs = RefCounter::default();
        assert_eq!(refs.next(), "1");
        assert_eq!(refs.next(), "2");
        assert_eq!(heartbeat(refs.next()).topic, "phoenix");
    }

    #[test]
    fn join_reply_resolves_join() {
        let ok = decode_frame(
            r#"{"topic":"realtime:public:posts","event":"phx_reply","payload":{"status":"ok","response":{"postgres_changes":[]}},"ref":"1"}"#,
        )
        .unwrap();
        assert!(matches!(ok.join_result("1"), Some(Ok(()))));
        assert!(ok.join_result("2").is_none());

        let rejected = decode_frame(
            r#"{"topic":"realtime:public:posts","event":"phx_reply","payload":{"status":"error","response":{"reason":"bad token"}},"ref":"1"}"#,
        )
        .unwrap();
        match rejected.join_result("1") {
            Some(Err(RealtimeError::JoinRejected(reason))) => assert_eq!(reason, "bad token"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn insert_change_with_postgres_timestamp() {
        let frame = decode_frame(&change_frame(
            "INSERT",
            json!({"id": 5, "title": "hi", "description": "d", "image_url": null, "created_at": "2024-05-01 12:00:00.25+00"}),
            json!({}),
        ))
        .unwrap();

        let Frame::Change(ChangeEvent::Insert(post)) = frame else {
            panic!("expected an insert change");
        };
        assert_eq!(post.id, 5);
        assert_eq!(post.description.as_deref(), Some("d"));
        assert_eq!(
            post.created_at,
            Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap() + chrono::Duration::milliseconds(250)
        );
    }

    #[test]
    fn update_and_delete_changes() {
        let update = decode_frame(&change_frame(
            "UPDATE",
            json!({"id": 5, "title": "edited", "created_at": "2024-05-01T12:00:00Z"}),
            json!({"id": 5}),
        ))
        .unwrap();
        assert!(matches!(update, Frame::Change(ChangeEvent::Update(ref p)) if p.title == "edited"));

        let delete =
            decode_frame(&change_frame("DELETE", Value::Null, json!({"id": 5}))).unwrap();
        assert_eq!(delete, Frame::Change(ChangeEvent::Delete { id: 5 }));
    }

    #[test]
    fn delete_without_key_is_rejected() {
        let err = decode_frame(&change_frame("DELETE", Value::Null, Value::Null)).unwrap_err();
        assert!(matches!(err, RealtimeError::UnexpectedPayload(_)));
    }

    #[test]
    fn undecodable_change_is_skipped_and_feed_continues() {
        let frames = [
            change_frame("INSERT", json!({"id": 1, "title": "no timestamp"}), Value::Null),
            change_frame(
                "INSERT",
                json!({"id": 2, "title": "ok", "description": null, "image_url": null,
                       "created_at": "2024-05-01 12:00:00.123+00"}),
                Value::Null,
            ),
        ];

        let mut board = crate::PostBoard::new();
        board.replace_all(vec![]);
        for text in &frames {
            if let Some(Frame::Change(change)) = read_frame(text) {
                board.apply(change);
            }
        }

        assert_eq!(board.len(), 1);
        assert_eq!(board.posts()[0].id, 2);
    }

    #[test]
    fn other_events_are_classified() {
        let close = decode_frame(r#"{"topic":"realtime:public:posts","event":"phx_close","payload":{},"ref":"3"}"#).unwrap();
        assert!(matches!(close.join_result("1"), Some(Err(RealtimeError::ChannelClosed { .. }))));

        let presence = decode_frame(r#"{"topic":"realtime:public:posts","event":"presence_state","payload":{}}"#).unwrap();
        assert_eq!(presence, Frame::Other { event: "presence_state".into() });
    }

    #[test]
    fn heartbeat_schedule() {
        let start = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap();
        let mut beat = Heartbeat::new(HEARTBEAT_INTERVAL, start);
        assert_eq!(beat.until_due(start + chrono::Duration::seconds(5)), Duration::from_secs(20));
        assert!(beat.is_due(start + chrono::Duration::seconds(30)));
        beat.beat(start + chrono::Duration::seconds(30));
        assert!(!beat.is_due(start + chrono::Duration::seconds(31)));
    }
}
