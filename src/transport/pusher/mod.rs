//! Pusher protocol transport over WebSocket
//!
//! [`PusherTransport::open`] spawns one session task per connection. The task
//! owns the socket, keeps the set of wanted channels, re-subscribes them after
//! every (re)connect and retries on its own according to the error code the
//! server sends (see [`RetryPolicy`]).

pub mod protocol;

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::time::{interval, sleep, Instant, Interval, MissedTickBehavior};
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, info, warn};
use url::Url;

use super::auth::{ChannelAuthorizer, HttpAuthorizer};
use super::{is_private_channel, Transport, TransportEvent, TransportHandle, TransportSink};
use crate::config::ConnectOptions;
use crate::error::{RealtimeError, RealtimeResult};

pub use protocol::RetryPolicy;
use protocol::ServerMessage;

const BASE_RETRY_DELAY: Duration = Duration::from_millis(500);
const MAX_RETRY_DELAY: Duration = Duration::from_secs(30);
const MIN_ACTIVITY_TIMEOUT: Duration = Duration::from_secs(1);

/// Commands sent from the handle to the session task
#[derive(Debug)]
enum Command {
    Subscribe(String),
    Unsubscribe(String),
    Close,
}

/// Pusher-protocol transport
#[derive(Clone, Default)]
pub struct PusherTransport {
    authorizer: Option<Arc<dyn ChannelAuthorizer>>,
}

impl PusherTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a custom authorizer for private channels
    pub fn with_authorizer(authorizer: Arc<dyn ChannelAuthorizer>) -> Self {
        Self {
            authorizer: Some(authorizer),
        }
    }

    fn authorizer_for(&self, options: &ConnectOptions) -> Option<Arc<dyn ChannelAuthorizer>> {
        if let Some(authorizer) = &self.authorizer {
            return Some(Arc::clone(authorizer));
        }
        options.auth_endpoint.as_ref().map(|endpoint| {
            Arc::new(HttpAuthorizer::new(endpoint.clone(), options.auth_token.clone()))
                as Arc<dyn ChannelAuthorizer>
        })
    }
}

impl Transport for PusherTransport {
    fn open(
        &self,
        key: &str,
        options: &ConnectOptions,
        sink: TransportSink,
    ) -> RealtimeResult<Box<dyn TransportHandle>> {
        let url = options.socket_url(key)?;
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| {
            RealtimeError::Configuration("pusher transport requires a tokio runtime".to_string())
        })?;

        let (tx, rx) = mpsc::unbounded_channel();
        let session = Session {
            url,
            options: options.clone(),
            authorizer: self.authorizer_for(options),
            sink,
            commands: rx,
            channels: BTreeSet::new(),
        };
        runtime.spawn(session.run());

        Ok(Box::new(PusherHandle { commands: tx }))
    }
}

struct PusherHandle {
    commands: mpsc::UnboundedSender<Command>,
}

impl TransportHandle for PusherHandle {
    fn subscribe(&self, channel: &str) {
        let _ = self.commands.send(Command::Subscribe(channel.to_string()));
    }

    fn unsubscribe(&self, channel: &str) {
        let _ = self.commands.send(Command::Unsubscribe(channel.to_string()));
    }

    fn close(&self) {
        // Ignore errors - the session task already ended
        let _ = self.commands.send(Command::Close);
    }
}

/// How a single socket connection ended
enum SessionEnd {
    /// Closed by the handle; stop for good
    Closed,
    /// Server sent a fatal error code
    Fatal,
    /// Connection lost; retry with the given policy
    Retry(RetryPolicy),
}

struct Session {
    url: Url,
    options: ConnectOptions,
    authorizer: Option<Arc<dyn ChannelAuthorizer>>,
    sink: TransportSink,
    commands: mpsc::UnboundedReceiver<Command>,
    channels: BTreeSet<String>,
}

impl Session {
    async fn run(mut self) {
        let mut attempt: u32 = 0;

        loop {
            let policy = match connect_async(self.url.as_str()).await {
                Ok((socket, _)) => {
                    debug!(url = %self.url, "websocket opened");
                    match self.drive(socket, &mut attempt).await {
                        SessionEnd::Closed => return,
                        SessionEnd::Fatal => {
                            (self.sink)(TransportEvent::Closed);
                            return;
                        }
                        SessionEnd::Retry(policy) => policy,
                    }
                }
                Err(e) => {
                    (self.sink)(TransportEvent::Error(RealtimeError::transport(e.to_string())));
                    RetryPolicy::Backoff
                }
            };

            attempt += 1;
            if attempt > self.options.max_retries {
                warn!(attempts = attempt - 1, "giving up on realtime transport");
                (self.sink)(TransportEvent::Closed);
                return;
            }

            (self.sink)(TransportEvent::Interrupted);
            let delay = match policy {
                RetryPolicy::Immediate => Duration::ZERO,
                _ => retry_delay(attempt),
            };
            info!(attempt, delay_ms = delay.as_millis() as u64, "reconnecting realtime transport");

            if !self.wait(delay).await {
                return;
            }
        }
    }

    /// Sleep for `delay` while still accepting commands.
    /// Returns false if the handle closed the session meanwhile.
    async fn wait(&mut self, delay: Duration) -> bool {
        let deadline = sleep(delay);
        tokio::pin!(deadline);

        loop {
            tokio::select! {
                _ = &mut deadline => return true,
                command = self.commands.recv() => match command {
                    Some(Command::Subscribe(channel)) => {
                        self.channels.insert(channel);
                    }
                    Some(Command::Unsubscribe(channel)) => {
                        self.channels.remove(&channel);
                    }
                    Some(Command::Close) | None => return false,
                },
            }
        }
    }

    async fn drive<S>(&mut self, socket: S, attempt: &mut u32) -> SessionEnd
    where
        S: futures::Stream<Item = Result<Message, tokio_tungstenite::tungstenite::Error>>
            + futures::Sink<Message, Error = tokio_tungstenite::tungstenite::Error>
            + Unpin,
    {
        let (mut write, mut read) = socket.split();
        let mut socket_id: Option<String> = None;
        let mut keepalive = keepalive_interval(self.options.activity_timeout);
        let mut last_activity = Instant::now();

        loop {
            tokio::select! {
                frame = read.next() => {
                    last_activity = Instant::now();
                    let text = match frame {
                        Some(Ok(Message::Text(text))) => text,
                        Some(Ok(Message::Ping(payload))) => {
                            let _ = write.send(Message::Pong(payload)).await;
                            continue;
                        }
                        Some(Ok(Message::Close(_))) | None => {
                            return SessionEnd::Retry(RetryPolicy::Backoff);
                        }
                        Some(Ok(_)) => continue,
                        Some(Err(e)) => {
                            (self.sink)(TransportEvent::Error(RealtimeError::transport(e.to_string())));
                            return SessionEnd::Retry(RetryPolicy::Backoff);
                        }
                    };

                    let message = match protocol::parse(&text) {
                        Ok(message) => message,
                        Err(e) => {
                            warn!(error = %e, "dropping malformed pusher frame");
                            continue;
                        }
                    };

                    match message {
                        ServerMessage::ConnectionEstablished { socket_id: id, activity_timeout } => {
                            *attempt = 0;
                            if let Some(secs) = activity_timeout {
                                let timeout = Duration::from_secs(secs).min(self.options.activity_timeout);
                                keepalive = keepalive_interval(timeout);
                            }
                            (self.sink)(TransportEvent::Connected { socket_id: id.clone() });
                            let channels: Vec<String> = self.channels.iter().cloned().collect();
                            for channel in channels {
                                self.send_subscribe(&mut write, &id, &channel).await;
                            }
                            socket_id = Some(id);
                        }
                        ServerMessage::Error { code, message } => {
                            let error = match code {
                                Some(code) => RealtimeError::transport_with_code(code, message),
                                None => RealtimeError::transport(message),
                            };
                            (self.sink)(TransportEvent::Error(error));
                            match RetryPolicy::for_code(code) {
                                RetryPolicy::Fatal => return SessionEnd::Fatal,
                                // Errors without a code don't end the connection
                                _ if code.is_none() => {}
                                policy => return SessionEnd::Retry(policy),
                            }
                        }
                        ServerMessage::Ping => {
                            let _ = write.send(Message::Text(protocol::pong_frame())).await;
                        }
                        ServerMessage::Pong => {}
                        ServerMessage::SubscriptionSucceeded { channel } => {
                            (self.sink)(TransportEvent::SubscriptionSucceeded { channel });
                        }
                        ServerMessage::SubscriptionError { channel, status, message } => {
                            let reason = match status {
                                Some(status) => format!("{} (status {})", message, status),
                                None => message,
                            };
                            (self.sink)(TransportEvent::SubscriptionFailed {
                                error: RealtimeError::subscription(channel.clone(), reason),
                                channel,
                            });
                        }
                        ServerMessage::ChannelEvent { channel, event, data } => {
                            (self.sink)(TransportEvent::Message { channel, event, data });
                        }
                        ServerMessage::Ignored(event) => {
                            debug!(event = %event, "ignoring pusher frame");
                        }
                    }
                }

                command = self.commands.recv() => match command {
                    Some(Command::Subscribe(channel)) => {
                        if self.channels.insert(channel.clone()) {
                            if let Some(id) = socket_id.clone() {
                                self.send_subscribe(&mut write, &id, &channel).await;
                            }
                        }
                    }
                    Some(Command::Unsubscribe(channel)) => {
                        if self.channels.remove(&channel) && socket_id.is_some() {
                            let _ = write.send(Message::Text(protocol::unsubscribe_frame(&channel))).await;
                        }
                    }
                    Some(Command::Close) | None => {
                        let _ = write.send(Message::Close(None)).await;
                        return SessionEnd::Closed;
                    }
                },

                _ = keepalive.tick() => {
                    if last_activity.elapsed() >= self.options.activity_timeout / 2 {
                        let _ = write.send(Message::Text(protocol::ping_frame())).await;
                    }
                }
            }
        }
    }

    async fn send_subscribe<W>(&self, write: &mut W, socket_id: &str, channel: &str)
    where
        W: futures::Sink<Message> + Unpin,
    {
        let auth = if is_private_channel(channel) {
            match &self.authorizer {
                Some(authorizer) => match authorizer.authorize(socket_id, channel).await {
                    Ok(auth) => Some(auth),
                    Err(error) => {
                        (self.sink)(TransportEvent::SubscriptionFailed {
                            channel: channel.to_string(),
                            error,
                        });
                        return;
                    }
                },
                None => {
                    (self.sink)(TransportEvent::SubscriptionFailed {
                        channel: channel.to_string(),
                        error: RealtimeError::subscription(channel, "no auth endpoint configured"),
                    });
                    return;
                }
            }
        } else {
            None
        };

        let frame = protocol::subscribe_frame(channel, auth.as_deref());
        if write.send(Message::Text(frame)).await.is_err() {
            warn!(channel = %channel, "failed to send subscribe frame");
        }
    }
}

fn keepalive_interval(timeout: Duration) -> Interval {
    let mut keepalive = interval(timeout.max(MIN_ACTIVITY_TIMEOUT));
    keepalive.set_missed_tick_behavior(MissedTickBehavior::Delay);
    keepalive
}

/// Exponential back-off: 0.5s, 1s, 2s, ... capped at 30s
fn retry_delay(attempt: u32) -> Duration {
    let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
    BASE_RETRY_DELAY.saturating_mul(factor).min(MAX_RETRY_DELAY)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_delay_grows_and_caps() {
        assert_eq!(retry_delay(1), Duration::from_millis(500));
        assert_eq!(retry_delay(2), Duration::from_secs(1));
        assert_eq!(retry_delay(4), Duration::from_secs(4));
        assert_eq!(retry_delay(20), MAX_RETRY_DELAY);
    }

    #[test]
    fn test_open_outside_runtime_is_configuration_error() {
        let transport = PusherTransport::new();
        let sink: TransportSink = Arc::new(|_| {});
        let result = transport.open("key", &ConnectOptions::default(), sink);
        assert!(matches!(result, Err(RealtimeError::Configuration(_))));
    }

    #[tokio::test]
    async fn test_unreachable_host_reports_error_then_closes() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let sink: TransportSink = Arc::new(move |event| {
            let _ = tx.send(event);
        });
        let options = ConnectOptions {
            force_tls: false,
            host: Some("127.0.0.1".to_string()),
            port: Some(9),
            max_retries: 0,
            ..Default::default()
        };

        let _handle = PusherTransport::new().open("key", &options, sink).unwrap();

        let first = rx.recv().await.unwrap();
        assert!(matches!(first, TransportEvent::Error(RealtimeError::Transport { .. })));
        assert_eq!(rx.recv().await.unwrap(), TransportEvent::Closed);
    }
}
