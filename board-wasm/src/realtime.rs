use std::pin::pin;

use crate::config::{POSTS_TABLE, SUPABASE_ANON_KEY, SUPABASE_URL};
use crate::error::BoardWasmError;
use board_core::realtime::{
    heartbeat, read_frame, socket_url, ChannelConfig, Frame, Heartbeat, PhoenixMessage,
    RefCounter, HEARTBEAT_INTERVAL,
};
use board_core::{PostBoard, RealtimeError};
use chrono::Utc;
use dioxus::prelude::*;
use futures_util::future::{select, Either};
use futures_util::{Sink, SinkExt, StreamExt};
use gloo_net::websocket::futures::WebSocket;
use gloo_net::websocket::{Message, WebSocketError};
use gloo_timers::future::TimeoutFuture;
use tracing::{debug, info};

async fn send<S>(sink: &mut S, message: PhoenixMessage) -> Result<(), BoardWasmError>
where
    S: Sink<Message, Error = WebSocketError> + Unpin,
{
    let text = message.to_text()?;
    sink.send(Message::Text(text))
        .await
        .map_err(|e| BoardWasmError::WebSocket(e.to_string()))
}

/// Applies every row change of the posts table to `board` until the socket
/// closes.
pub async fn follow_changes(mut board: Signal<PostBoard>) -> Result<(), BoardWasmError> {
    let url = socket_url(SUPABASE_URL, SUPABASE_ANON_KEY);
    let socket = WebSocket::open(&url).map_err(|e| BoardWasmError::WebSocket(e.to_string()))?;
    let (mut write, mut read) = socket.split();

    let channel = ChannelConfig::for_table(POSTS_TABLE);
    let mut refs = RefCounter::default();
    let join_ref = refs.next();
    send(&mut write, channel.join(SUPABASE_ANON_KEY, join_ref.clone())).await?;

    let mut beat = Heartbeat::new(HEARTBEAT_INTERVAL, Utc::now());
    loop {
        let wait = beat.until_due(Utc::now()).as_millis() as u32;
        let timer = pin!(TimeoutFuture::new(wait));

        match select(read.next(), timer).await {
            Either::Left((Some(Ok(Message::Text(text))), _)) => {
                debug!(%text, "realtime frame");
                let Some(frame) = read_frame(&text) else {
                    continue;
                };
                match frame {
                    Frame::Change(change) => board.write().apply(change),
                    Frame::ChannelError { topic } => {
                        return Err(RealtimeError::ChannelError { topic }.into());
                    }
                    Frame::ChannelClosed { topic } => {
                        return Err(RealtimeError::ChannelClosed { topic }.into());
                    }
                    frame => {
                        if let Some(result) = frame.join_result(&join_ref) {
                            result?;
                            info!(topic = %channel.topic(), "subscribed to realtime changes");
                        }
                    }
                }
            }
            Either::Left((Some(Ok(Message::Bytes(_))), _)) => {}
            Either::Left((Some(Err(e)), _)) => {
                return Err(BoardWasmError::WebSocket(e.to_string()));
            }
            Either::Left((None, _)) => return Ok(()),
            Either::Right(((), _)) => {
                send(&mut write, heartbeat(refs.next())).await?;
                beat.beat(Utc::now());
            }
        }
    }
}
