// ABOUTME: Connect-with-retry, receive loop and heartbeat for the node WebSocket
// ABOUTME: Text frames are decoded and dispatched in their own tasks

use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::watch;
use tokio::time::{interval, Interval, MissedTickBehavior};
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use crate::error::Error;
use crate::protocol::{decode_frame, Event};
use crate::rest::RestClient;
use crate::session::{ConnectionState, Shared};
use crate::Result;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Why the receive loop returned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Exit {
    Closed,
    Shutdown,
}

/// Connection task: runs until shutdown is signalled
pub(super) async fn run(shared: Arc<Shared>, rest: RestClient, mut shutdown: watch::Receiver<bool>) {
    let delay = shared.config.reconnect_delay;

    loop {
        if *shutdown.borrow() {
            break;
        }

        shared.set_state(ConnectionState::Connecting);
        // The handshake can stall on a node that accepts TCP but never answers
        let connected = tokio::select! {
            result = connect(&shared) => result,
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
                continue;
            }
        };

        match connected {
            Ok(ws) => {
                shared.set_state(ConnectionState::Connected);
                log::info!("Connected to {}", shared.config.websocket_url());

                let exit = receive(&shared, &rest, ws, &mut shutdown).await;
                shared.end_connection();
                if exit == Exit::Shutdown {
                    break;
                }
                log::error!("WebSocket closed, reconnecting in {:?}", delay);
            }
            Err(e) => {
                log::error!("Couldn't connect to WebSocket, retrying in {:?} ({})", delay, e);
            }
        }

        shared.set_state(ConnectionState::Disconnected);
        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            changed = shutdown.changed() => {
                if changed.is_err() {
                    break;
                }
            }
        }
    }

    shared.set_state(ConnectionState::Stopped);
    log::debug!("Connection task finished");
}

async fn connect(shared: &Shared) -> Result<WsStream> {
    let credentials = shared.credentials.get().ok_or(Error::NotStarted)?;

    let mut request = shared.config.websocket_url().into_client_request()?;
    let headers = request.headers_mut();
    headers.insert("Authorization", header(&credentials.password)?);
    headers.insert("User-Id", HeaderValue::from(credentials.bot_id));
    headers.insert("Client-Name", header(&shared.config.client_name)?);
    if let Some(key) = &credentials.resume_key {
        headers.insert("Resume-Key", header(key)?);
    }

    let (ws, _response) = connect_async(request).await?;
    Ok(ws)
}

fn header(value: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value).map_err(|e| Error::WebSocket(format!("invalid header value: {e}")))
}

async fn receive(
    shared: &Arc<Shared>,
    rest: &RestClient,
    ws: WsStream,
    shutdown: &mut watch::Receiver<bool>,
) -> Exit {
    let (mut writer, mut reader) = ws.split();
    let connection = shared.connection_id();

    let mut heartbeat = heartbeat_timer(shared.config.heartbeat).await;
    let mut awaiting_pong = false;

    loop {
        tokio::select! {
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    if let Err(e) = writer.send(Message::Close(None)).await {
                        log::debug!("Failed to send close frame: {}", e);
                    }
                    return Exit::Shutdown;
                }
            }

            _ = next_heartbeat(&mut heartbeat) => {
                if awaiting_pong {
                    log::warn!("No pong within {:?}, treating connection as closed", shared.config.heartbeat);
                    return Exit::Closed;
                }
                if let Err(e) = writer.send(Message::Ping(Vec::new())).await {
                    log::warn!("Failed to send ping: {}", e);
                    return Exit::Closed;
                }
                awaiting_pong = true;
            }

            message = reader.next() => match message {
                Some(Ok(Message::Text(text))) => {
                    log::trace!("Received frame: {}", text);
                    tokio::spawn(handle_frame(shared.clone(), rest.clone(), connection, text));
                }
                Some(Ok(Message::Pong(_))) => awaiting_pong = false,
                Some(Ok(Message::Close(frame))) => {
                    log::warn!("Node closed the connection: {:?}", frame);
                    return Exit::Closed;
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    log::warn!("WebSocket read error: {}", e);
                    return Exit::Closed;
                }
                None => {
                    log::warn!("WebSocket stream ended");
                    return Exit::Closed;
                }
            }
        }
    }
}

/// Ping timer, or `None` when the heartbeat is disabled with a zero period
async fn heartbeat_timer(period: Duration) -> Option<Interval> {
    if period.is_zero() {
        return None;
    }

    let mut heartbeat = interval(period);
    heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately
    heartbeat.tick().await;
    Some(heartbeat)
}

async fn next_heartbeat(heartbeat: &mut Option<Interval>) {
    match heartbeat {
        Some(heartbeat) => {
            heartbeat.tick().await;
        }
        None => std::future::pending().await,
    }
}

/// Decode one frame and fan it out to listeners
///
/// `connection` identifies the socket the frame arrived on; a `ready` from a
/// socket that has since closed is dropped.
async fn handle_frame(shared: Arc<Shared>, rest: RestClient, connection: u64, text: String) {
    let event = match decode_frame(&text) {
        Ok(Some(event)) => event,
        Ok(None) => {
            log::debug!("Ignoring frame with unknown op or type: {}", text);
            return;
        }
        Err(e) => {
            log::warn!("Dropping malformed frame ({}): {}", e, text);
            return;
        }
    };

    if let Event::Ready(ready) = &event {
        if !shared.set_session_id(connection, &ready.session_id) {
            log::debug!("Ignoring ready for closed connection {}", connection);
            return;
        }
        log::info!("Node session {} ready (resumed: {})", ready.session_id, ready.resumed);

        let resume_key = shared
            .credentials
            .get()
            .and_then(|credentials| credentials.resume_key.as_deref());
        if let Some(key) = resume_key {
            if let Err(e) = rest.update_session(Some(Some(key)), None).await {
                log::error!("Failed to configure session resuming: {}", e);
            }
        }
    }

    shared.dispatcher.dispatch(&event);
}
