use crate::config::ClientConfig;
use crate::error::BoardClientError;
use board_core::realtime::{
    ChannelConfig, Frame, HEARTBEAT_INTERVAL, PhoenixMessage, RefCounter, heartbeat, read_frame,
    socket_url,
};
use board_core::{ChangeEvent, RealtimeError};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::time::{Interval, MissedTickBehavior, interval};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, info, warn};

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// A joined realtime channel delivering row changes of the posts table.
pub struct RealtimeSubscription {
    socket: Socket,
    channel: ChannelConfig,
    refs: RefCounter,
    heartbeat: Interval,
}

impl RealtimeSubscription {
    pub async fn connect(config: &ClientConfig) -> Result<Self, BoardClientError> {
        let url = socket_url(&config.url, &config.api_key);
        let (socket, _) = connect_async(url.as_str()).await?;

        let mut heartbeat = interval(HEARTBEAT_INTERVAL);
        heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);
        heartbeat.reset();

        let mut subscription = Self {
            socket,
            channel: ChannelConfig::for_table(config.table.clone()),
            refs: RefCounter::default(),
            heartbeat,
        };
        subscription.join(&config.api_key).await?;
        Ok(subscription)
    }

    async fn send(&mut self, message: PhoenixMessage) -> Result<(), BoardClientError> {
        let text = message.to_text()?;
        debug!(%text, "realtime send");
        self.socket.send(Message::Text(text)).await?;
        Ok(())
    }

    async fn join(&mut self, access_token: &str) -> Result<(), BoardClientError> {
        let join_ref = self.refs.next();
        let join = self.channel.join(access_token, join_ref.clone());
        self.send(join).await?;

        loop {
            let frame = self
                .next_frame()
                .await?
                .ok_or(BoardClientError::ConnectionClosed)?;
            if let Some(result) = frame.join_result(&join_ref) {
                result?;
                info!(topic = %self.channel.topic(), "subscribed to realtime changes");
                return Ok(());
            }
        }
    }

    /// Next decoded frame; heartbeats are sent while waiting. `None` once the
    /// server closes the socket.
    async fn next_frame(&mut self) -> Result<Option<Frame>, BoardClientError> {
        loop {
            tokio::select! {
                _ = self.heartbeat.tick() => {
                    let reference = self.refs.next();
                    self.send(heartbeat(reference)).await?;
                }
                message = self.socket.next() => match message {
                    None | Some(Ok(Message::Close(_))) => return Ok(None),
                    Some(Err(e)) => return Err(e.into()),
                    Some(Ok(Message::Text(text))) => {
                        debug!(%text, "realtime frame");
                        if let Some(frame) = read_frame(&text) {
                            return Ok(Some(frame));
                        }
                    }
                    Some(Ok(_)) => {}
                },
            }
        }
    }

    /// Waits for the next row change. `None` once the connection is gone.
    pub async fn next_event(&mut self) -> Result<Option<ChangeEvent>, BoardClientError> {
        while let Some(frame) = self.next_frame().await? {
            match frame {
                Frame::Change(change) => return Ok(Some(change)),
                Frame::ChannelError { topic } => {
                    return Err(RealtimeError::ChannelError { topic }.into());
                }
                Frame::ChannelClosed { topic } => {
                    return Err(RealtimeError::ChannelClosed { topic }.into());
                }
                Frame::Reply(reply) if !reply.is_ok() => {
                    warn!(topic = %reply.topic, reason = %reply.reason(), "realtime request failed");
                }
                Frame::System(payload) => info!(%payload, "realtime system message"),
                Frame::Reply(_) | Frame::Other { .. } => {}
            }
        }
        Ok(None)
    }

    pub async fn leave(mut self) -> Result<(), BoardClientError> {
        let reference = self.refs.next();
        let leave = self.channel.leave(reference);
        self.send(leave).await?;
        self.socket.close(None).await?;
        info!(topic = %self.channel.topic(), "left realtime channel");
        Ok(())
    }
}
