use axum::extract::ws::{CloseFrame, Message, WebSocket};
use futures_util::stream::SplitSink;
use futures_util::{future, SinkExt, Stream, StreamExt};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{interval, timeout};

use crate::error::ProtocolError;
use crate::proto::{self, Packet};
use crate::session::{PacketStream, Session};
use crate::state::AppState;

/// Ping interval: server sends WebSocket ping every 30 seconds.
const PING_INTERVAL: Duration = Duration::from_secs(30);

/// Pong timeout: if pong not received within 10 seconds after ping, close.
const PONG_TIMEOUT: Duration = Duration::from_secs(10);

/// How long the writer may keep flushing after the session has ended.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Run the actor-per-connection pattern for a terminal WebSocket.
///
/// Splits the WebSocket into reader and writer halves:
/// - Writer task: owns the sink, encodes packets from the session's outbox and
///   forwards control frames (ping, pong, close)
/// - Session: consumes decoded packets from the reader half and dispatches them
///
/// Rooms hold clones of the outbox, so broadcasts reach the writer directly.
pub async fn run_connection(socket: WebSocket, state: AppState, addr: SocketAddr) {
    let (ws_sender, ws_receiver) = socket.split();
    let (outbox, packets) = mpsc::unbounded_channel::<Packet>();
    let (control_tx, control_rx) = mpsc::unbounded_channel::<Message>();
    let (pong_tx, pong_rx) = mpsc::unbounded_channel::<()>();

    let mut writer_handle = tokio::spawn(writer_task(ws_sender, packets, control_rx));
    let (dead_tx, dead_rx) = oneshot::channel();
    let ping_handle = tokio::spawn(ping_task(
        control_tx.clone(),
        pong_rx,
        dead_tx,
        PING_INTERVAL,
        PONG_TIMEOUT,
    ));

    let inbound = packet_stream(ws_receiver, control_tx, pong_tx, dead_rx);
    let session = Session::new(state, addr.to_string(), outbox, inbound);
    session.run().await;

    ping_handle.abort();

    // The writer finishes once every outbox clone is gone, which happens as soon
    // as the session has left its room.
    if timeout(DRAIN_TIMEOUT, &mut writer_handle).await.is_err() {
        tracing::warn!(address = %addr, "Writer did not drain in time");
        writer_handle.abort();
    }

    tracing::debug!(address = %addr, "WebSocket actor stopped");
}

/// Decode client frames into packets. Control frames are answered here and never
/// reach the session; the stream ends on Close, or once `dead` resolves because
/// the heartbeat gave up on the peer.
fn packet_stream<S>(
    receiver: S,
    control_tx: mpsc::UnboundedSender<Message>,
    pong_tx: mpsc::UnboundedSender<()>,
    dead: oneshot::Receiver<()>,
) -> PacketStream
where
    S: Stream<Item = Result<Message, axum::Error>> + Send + 'static,
{
    receiver
        .take_until(dead)
        .take_while(|msg| future::ready(!matches!(msg, Ok(Message::Close(_)))))
        .filter_map(move |msg| {
            let decoded = match msg {
                Ok(Message::Text(text)) => Some(proto::decode(text.as_str().as_bytes())),
                Ok(Message::Binary(data)) => Some(proto::decode(&data)),
                Ok(Message::Ping(data)) => {
                    let _ = control_tx.send(Message::Pong(data));
                    None
                }
                Ok(Message::Pong(_)) => {
                    let _ = pong_tx.send(());
                    None
                }
                Ok(Message::Close(_)) => None,
                Err(e) => Some(Err(ProtocolError::Transport(e.to_string()))),
            };
            future::ready(decoded)
        })
        .boxed()
}

/// Writer task: encodes packets onto the socket and interleaves control frames.
async fn writer_task(
    mut ws_sender: SplitSink<WebSocket, Message>,
    mut packets: mpsc::UnboundedReceiver<Packet>,
    mut control: mpsc::UnboundedReceiver<Message>,
) {
    loop {
        let msg = tokio::select! {
            packet = packets.recv() => match packet {
                Some(packet) => match proto::encode(&packet) {
                    Ok(text) => Message::Text(text.into()),
                    Err(e) => {
                        tracing::warn!(error = %e, "Dropping unencodable packet");
                        continue;
                    }
                },
                // Session and rooms are done with this connection.
                None => break,
            },
            Some(frame) = control.recv() => frame,
        };

        let closing = matches!(msg, Message::Close(_));
        if ws_sender.send(msg).await.is_err() || closing {
            // WebSocket send failed or we initiated close
            return;
        }
    }
    let _ = ws_sender.close().await;
}

/// Sends periodic pings and closes the connection when a pong does not arrive.
/// Returning drops `dead`, which ends the inbound packet stream.
async fn ping_task(
    control_tx: mpsc::UnboundedSender<Message>,
    mut pong_rx: mpsc::UnboundedReceiver<()>,
    dead: oneshot::Sender<()>,
    ping_interval: Duration,
    pong_timeout: Duration,
) {
    let mut ping_timer = interval(ping_interval);
    // Skip the first immediate tick
    ping_timer.tick().await;

    loop {
        ping_timer.tick().await;

        if control_tx.send(Message::Ping(vec![1, 2, 3, 4].into())).is_err() {
            // Writer task has died, connection is gone
            break;
        }

        match timeout(pong_timeout, pong_rx.recv()).await {
            Ok(Some(())) => {}
            _ => {
                tracing::warn!("Pong timeout, closing connection");
                let _ = control_tx.send(Message::Close(Some(CloseFrame {
                    code: 1001,
                    reason: "Pong timeout".into(),
                })));
                let _ = dead.send(());
                break;
            }
        }
    }
}
