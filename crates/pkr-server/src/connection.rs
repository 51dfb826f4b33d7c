use super::handler::MessageHandler;
use super::hub::Hub;
use super::session::SessionManager;
use pkr_core::ID;
use pkr_wallet::PlayerProfile;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;

/// The peer must answer a ping (or say anything) within this window.
const PONG_WAIT: Duration = Duration::from_secs(60);
/// Pings go out well inside the pong window.
const PING_PERIOD: Duration = Duration::from_secs(54);

/// Drives one WebSocket connection: outbound frames from the hub buffer,
/// inbound frames into the message handler, pings on a timer, and a read
/// deadline refreshed by any traffic from the peer.
///
/// On exit the connection is unregistered and the session layer is told
/// about the disconnect; the table-side grace timers take it from there.
pub async fn serve(
    mut ws: actix_ws::Session,
    mut stream: actix_ws::MessageStream,
    mut outbound: mpsc::Receiver<String>,
    player_id: ID<PlayerProfile>,
    hub: Arc<Hub>,
    sessions: Arc<SessionManager>,
    handler: Arc<MessageHandler>,
) {
    use futures::StreamExt;
    let mut ping = tokio::time::interval(PING_PERIOD);
    ping.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    let mut deadline = Instant::now() + PONG_WAIT;
    log::debug!("[conn {}] pump started", player_id);
    'pump: loop {
        tokio::select! {
            frame = outbound.recv() => match frame {
                Some(frame) => {
                    if ws.text(frame).await.is_err() {
                        break 'pump;
                    }
                }
                None => break 'pump,
            },
            message = stream.next() => match message {
                Some(Ok(actix_ws::Message::Text(text))) => {
                    deadline = Instant::now() + PONG_WAIT;
                    handler.handle(player_id, &text).await;
                }
                Some(Ok(actix_ws::Message::Ping(bytes))) => {
                    deadline = Instant::now() + PONG_WAIT;
                    if ws.pong(&bytes).await.is_err() {
                        break 'pump;
                    }
                }
                Some(Ok(actix_ws::Message::Pong(_))) => {
                    deadline = Instant::now() + PONG_WAIT;
                }
                Some(Ok(actix_ws::Message::Close(_))) | Some(Err(_)) | None => break 'pump,
                _ => {}
            },
            _ = ping.tick() => {
                if Instant::now() > deadline {
                    log::warn!("[conn {}] pong deadline exceeded", player_id);
                    break 'pump;
                }
                if ws.ping(b"").await.is_err() {
                    break 'pump;
                }
            }
        }
    }
    let _ = ws.close(None).await;
    hub.unregister(&player_id.to_string());
    sessions.handle_disconnect(player_id);
    log::debug!("[conn {}] pump stopped", player_id);
}
