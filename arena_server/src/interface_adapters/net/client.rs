use crate::domain::{CommandError, Intent, PlayerId};
use crate::interface_adapters::http::ErrorResponse;
use crate::interface_adapters::protocol::{
    ClientMessage, JoinRoomPayload, ServerMessage, UpdateFrame,
};
use crate::interface_adapters::state::AppState;
use crate::interface_adapters::utils::rng::{conn_id, player_id};
use crate::use_cases::gateway::validate_room_id;
use crate::use_cases::{CommandGateway, JoinedRoom, RoomHandle, RoomObserver, RoomUpdate};

use axum::{
    Error, Json,
    extract::{
        Query, State,
        ws::{CloseFrame, Message, Utf8Bytes, WebSocket, WebSocketUpgrade, close_code},
    },
    http::StatusCode,
    response::IntoResponse,
};
use futures::SinkExt;
use serde::Serialize;
use std::{
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::sync::{broadcast, watch};
use tokio::time::timeout;
use tracing::{Instrument, Span, debug, error, info, info_span, warn};

#[derive(Debug)]
enum NetError {
    // Categorizes connection lifecycle failures so callers can decide policy.
    #[allow(dead_code)]
    Ws(axum::Error),
    #[allow(dead_code)]
    Serialization(serde_json::Error),
    #[allow(dead_code)]
    Join(CommandError),
    RoomClosed,
    JoinRequired,
    JoinTimeout,
    ClosedBeforeJoin,
}

#[derive(Debug, serde::Deserialize)]
pub struct RoomQuery {
    // Room to join when the JoinRoom frame doesn't name one.
    #[serde(default)]
    room_id: Option<String>,
}

pub async fn room_update_serializer(
    room_id: Arc<str>,
    mut update_rx: broadcast::Receiver<RoomUpdate>,
    update_bytes_tx: broadcast::Sender<Utf8Bytes>,
    latest_snapshot_tx: watch::Sender<Utf8Bytes>,
) {
    // Serialize each room update once and broadcast the shared bytes.
    loop {
        match update_rx.recv().await {
            Ok(update) => {
                let is_snapshot = matches!(update, RoomUpdate::Snapshot(_));
                let txt = match serde_json::to_string(&UpdateFrame::from(update)) {
                    Ok(txt) => txt,
                    Err(e) => {
                        error!(room_id = %room_id, error = ?e, "failed to serialize room update");
                        continue;
                    }
                };

                let bytes = Utf8Bytes::from(txt);
                if is_snapshot {
                    // Store the latest snapshot for lag recovery, even with no watchers yet.
                    latest_snapshot_tx.send_replace(bytes.clone());
                }
                let _ = update_bytes_tx.send(bytes);
            }
            Err(broadcast::error::RecvError::Lagged(n)) => {
                warn!(
                    room_id = %room_id,
                    missed = n,
                    "room serializer lagged; skipping to latest update"
                );
            }
            Err(broadcast::error::RecvError::Closed) => {
                debug!(room_id = %room_id, "room updates channel closed; serializer exiting");
                break;
            }
        }
    }
}

pub fn spawn_room_serializer(room: &RoomHandle) {
    tokio::spawn(room_update_serializer(
        room.room_id.clone(),
        room.update_tx.subscribe(),
        room.update_bytes_tx.clone(),
        room.latest_snapshot_tx.clone(),
    ));
}

/// Attaches a serializer to every room the registry creates.
pub struct SerializerObserver;

impl RoomObserver for SerializerObserver {
    fn room_created(&self, room: &RoomHandle) {
        spawn_room_serializer(room);
    }
}

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Query(query): Query<RoomQuery>,
) -> impl IntoResponse {
    // Reject obviously bad room ids before upgrading.
    if let Some(Err(e)) = query.room_id.as_deref().map(validate_room_id) {
        return (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: e.to_string(),
            }),
        )
            .into_response();
    }

    let gateway = state.gateway.clone();
    ws.on_upgrade(move |socket| handle_socket(socket, gateway, query.room_id))
}

async fn handle_socket(
    socket: WebSocket,
    gateway: CommandGateway,
    default_room_id: Option<String>,
) {
    // Separate connection id for correlating logs before/after a player_id exists.
    let conn_id = conn_id();
    let span = info_span!("conn", conn_id, player_id = tracing::field::Empty);
    serve_connection(socket, gateway, default_room_id, span.clone())
        .instrument(span)
        .await;
}

async fn serve_connection(
    mut socket: WebSocket,
    gateway: CommandGateway,
    default_room_id: Option<String>,
    span: Span,
) {
    let mut ctx = match bootstrap_connection(&mut socket, gateway, default_room_id).await {
        Ok(ctx) => ctx,
        Err(NetError::ClosedBeforeJoin) => {
            info!("client disconnected before join handshake");
            return;
        }
        Err(e) => {
            // The handshake already sent a close frame with the specific reason.
            warn!(error = ?e, "failed to bootstrap connection");
            return;
        }
    };

    span.record("player_id", ctx.player_id.as_str());
    info!(
        player_id = %ctx.player_id,
        room_id = %ctx.room.room_id,
        "client connected"
    );

    // Main Client Loop
    if let Err(e) = run_client_loop(&mut socket, &mut ctx).await {
        warn!(error = ?e, "client loop exited with error");
    }
}

async fn send_message<T: Serialize>(socket: &mut WebSocket, msg: &T) -> Result<usize, NetError> {
    let txt = serde_json::to_string(msg).map_err(NetError::Serialization)?;
    let bytes = txt.len();
    socket
        .send(Message::Text(txt.into()))
        .await
        .map_err(NetError::Ws)?;
    Ok(bytes)
}

struct ConnCtx {
    pub player_id: PlayerId,
    pub room: RoomHandle,
    pub gateway: CommandGateway,
    pub updates_rx: broadcast::Receiver<Utf8Bytes>,
    pub latest_snapshot_rx: watch::Receiver<Utf8Bytes>,
    // Count lag recovery snapshots sent to this client.
    pub lag_recovery_count: u64,

    pub msgs_in: u64,
    pub msgs_out: u64,
    pub bytes_in: u64,
    pub bytes_out: u64,

    pub invalid_json: u32,
    pub rejected: u64,

    pub last_lag_log: Instant,
    pub last_invalid_input_log: Instant,

    pub close_frame: Option<CloseFrame>,
}

#[derive(Debug)]
struct JoinHandshake {
    payload: JoinRoomPayload,
    bytes_in: u64,
    msgs_in: u64,
}

async fn bootstrap_connection(
    socket: &mut WebSocket,
    gateway: CommandGateway,
    default_room_id: Option<String>,
) -> Result<ConnCtx, NetError> {
    // The very first meaningful client message must be JoinRoom.
    let join = match timeout(JOIN_HANDSHAKE_TIMEOUT, read_join_handshake(socket)).await {
        Ok(result) => result?,
        Err(_) => {
            let _ = send_close_with_reason(socket, close_code::POLICY, "join timeout").await;
            return Err(NetError::JoinTimeout);
        }
    };

    let Some(room_id) = join.payload.room_id.clone().or(default_room_id) else {
        let _ = send_close_with_reason(socket, close_code::POLICY, "room id required").await;
        return Err(NetError::JoinRequired);
    };

    let player_id = player_id();
    let JoinedRoom {
        room,
        snapshot,
        updates,
    } = match gateway.join(&room_id, &player_id).await {
        Ok(joined) => joined,
        Err(e) => {
            let _ = send_message(socket, &ServerMessage::from(&e)).await;
            let _ = send_close_with_reason(socket, close_code::POLICY, "join rejected").await;
            return Err(NetError::Join(e));
        }
    };

    // Tell the client "This is who you are", then hand over the full room state.
    // If either send fails, leave again so the room doesn't keep a ghost player.
    let identity_msg = ServerMessage::Identity {
        player_id: player_id.clone(),
        room_id: room.room_id.to_string(),
    };
    let initial = UpdateFrame::from(RoomUpdate::Snapshot(snapshot));
    let handshake = async {
        let identity_bytes = send_message(socket, &identity_msg).await?;
        let snapshot_bytes = send_message(socket, &initial).await?;
        Ok::<_, NetError>((identity_bytes + snapshot_bytes) as u64)
    };
    let bytes_out = match handshake.await {
        Ok(bytes) => bytes,
        Err(e) => {
            let _ = gateway.leave(&room.room_id, &player_id).await;
            return Err(e);
        }
    };

    let now = Instant::now() - LOG_THROTTLE;
    let mut ctx = ConnCtx {
        player_id,
        latest_snapshot_rx: room.latest_snapshot_tx.subscribe(),
        room,
        gateway,
        updates_rx: updates,
        lag_recovery_count: 0,

        msgs_in: join.msgs_in,
        msgs_out: 2,
        bytes_in: join.bytes_in,
        bytes_out,

        invalid_json: 0,
        rejected: 0,

        last_lag_log: now,
        last_invalid_input_log: now,

        close_frame: None,
    };

    // A name in the JoinRoom frame is applied like a later SetName.
    if let Some(name) = join.payload.name {
        submit_intent(socket, &mut ctx, Ok(Intent::SetName { name })).await;
    }

    Ok(ctx)
}

enum LoopControl {
    Continue,
    Disconnect,
}

const LOG_THROTTLE: Duration = Duration::from_secs(2);
const MAX_INVALID_JSON: u32 = 10;
const JOIN_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(5);

async fn send_close_with_reason(
    socket: &mut WebSocket,
    code: u16,
    reason: &'static str,
) -> Result<(), NetError> {
    socket
        .send(Message::Close(Some(CloseFrame {
            code,
            reason: reason.into(),
        })))
        .await
        .map_err(NetError::Ws)?;
    socket.close().await.map_err(NetError::Ws)
}

async fn read_join_handshake(socket: &mut WebSocket) -> Result<JoinHandshake, NetError> {
    loop {
        let Some(incoming) = socket.recv().await else {
            return Err(NetError::ClosedBeforeJoin);
        };

        let message = incoming.map_err(NetError::Ws)?;
        match message {
            Message::Text(text) => {
                let bytes_in = text.len() as u64;
                return match serde_json::from_str::<ClientMessage>(&text) {
                    Ok(ClientMessage::JoinRoom(payload)) => Ok(JoinHandshake {
                        payload,
                        bytes_in,
                        msgs_in: 1,
                    }),
                    Ok(_) => {
                        let _ = send_close_with_reason(socket, close_code::POLICY, "join required")
                            .await;
                        Err(NetError::JoinRequired)
                    }
                    Err(_) => {
                        let _ = send_close_with_reason(
                            socket,
                            close_code::POLICY,
                            "invalid join payload",
                        )
                        .await;
                        Err(NetError::JoinRequired)
                    }
                };
            }
            Message::Binary(_) => {
                let _ = send_close_with_reason(
                    socket,
                    close_code::UNSUPPORTED,
                    "binary messages not supported",
                )
                .await;
                return Err(NetError::JoinRequired);
            }
            Message::Ping(_) | Message::Pong(_) => {}
            Message::Close(_) => return Err(NetError::ClosedBeforeJoin),
        }
    }
}

fn should_log(last: &mut Instant) -> bool {
    if last.elapsed() >= LOG_THROTTLE {
        *last = Instant::now();
        true
    } else {
        false
    }
}

/// Routes one decoded intent through the gateway. Rejections go to this client only.
async fn submit_intent(
    socket: &mut WebSocket,
    ctx: &mut ConnCtx,
    intent: Result<Intent, CommandError>,
) -> LoopControl {
    let result = match intent {
        Ok(intent) => ctx.gateway.submit(&ctx.room, &ctx.player_id, intent).await,
        Err(e) => Err(e),
    };
    let Err(err) = result else {
        return LoopControl::Continue;
    };

    ctx.rejected += 1;
    match send_message(socket, &ServerMessage::from(&err)).await {
        Ok(bytes) => {
            ctx.msgs_out += 1;
            ctx.bytes_out += bytes as u64;
        }
        Err(e) => {
            warn!(error = ?e, "failed to send command rejection");
            return LoopControl::Disconnect;
        }
    }

    if err == CommandError::RoomNotFound {
        // The room worker is gone; nothing this connection sends can land.
        ctx.close_frame = Some(CloseFrame {
            code: close_code::ERROR,
            reason: "room closed".into(),
        });
        return LoopControl::Disconnect;
    }
    LoopControl::Continue
}

async fn run_client_loop(socket: &mut WebSocket, ctx: &mut ConnCtx) -> Result<(), NetError> {
    let mut fatal: Option<NetError> = None;

    loop {
        // disconnect becomes true on error
        let disconnect: bool = tokio::select! {
            // Incoming Message from Client
            incoming = socket.recv() => {
                match handle_incoming_ws(socket, incoming, ctx).await {
                    LoopControl::Continue => false,
                    LoopControl::Disconnect => true,
                }
            }

            // Outgoing Room Update
            update = ctx.updates_rx.recv() => {
                match update {
                    Ok(bytes) => match forward_room_bytes(bytes, socket, ctx).await {
                        LoopControl::Continue => false,
                        LoopControl::Disconnect => true,
                    },
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        if should_log(&mut ctx.last_lag_log) {
                            warn!(missed = n, "room updates lagged; sending snapshot");
                        }

                        // Resync strategy: send the latest full room snapshot.
                        let latest = ctx.latest_snapshot_rx.borrow().clone();
                        if latest.is_empty() {
                            if should_log(&mut ctx.last_lag_log) {
                                warn!("room snapshot unavailable during lag recovery");
                            }
                            false
                        } else {
                            let bytes_len = latest.len();
                            ctx.lag_recovery_count += 1;
                            let outcome = forward_room_bytes(latest, socket, ctx).await;

                            if should_log(&mut ctx.last_lag_log) {
                                debug!(
                                    bytes = bytes_len,
                                    count = ctx.lag_recovery_count,
                                    "sent lag recovery snapshot"
                                );
                            }

                            match outcome {
                                LoopControl::Continue => false,
                                LoopControl::Disconnect => true,
                            }
                        }
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        fatal = Some(NetError::RoomClosed);
                        true
                    }
                }
            }
        };

        if disconnect {
            if let Some(frame) = ctx.close_frame.take() {
                let _ = socket.send(Message::Close(Some(frame))).await;
            }
            if let Err(err) = socket.close().await.map_err(NetError::Ws) {
                debug!(error = ?err, "socket close error");
            }
            break;
        }
    }

    disconnect_cleanup(ctx).await;

    match fatal {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

async fn handle_incoming_ws(
    socket: &mut WebSocket,
    incoming: Option<Result<Message, Error>>,
    ctx: &mut ConnCtx,
) -> LoopControl {
    match incoming {
        Some(Ok(msg)) => match msg {
            Message::Text(text) => {
                ctx.msgs_in += 1;
                ctx.bytes_in += text.len() as u64;

                match serde_json::from_str::<ClientMessage>(&text) {
                    Ok(ClientMessage::JoinRoom(_)) => {
                        // A connection belongs to exactly one room for its lifetime.
                        if should_log(&mut ctx.last_invalid_input_log) {
                            warn!("duplicate join ignored");
                        }
                        LoopControl::Continue
                    }
                    Ok(ClientMessage::LeaveRoom) => {
                        ctx.close_frame = Some(CloseFrame {
                            code: close_code::NORMAL,
                            reason: "left room".into(),
                        });
                        LoopControl::Disconnect
                    }
                    Ok(message) => match message.into_intent() {
                        Some(intent) => submit_intent(socket, ctx, intent).await,
                        None => LoopControl::Continue,
                    },
                    Err(parse_err) => {
                        ctx.invalid_json += 1;
                        if should_log(&mut ctx.last_invalid_input_log) {
                            warn!(
                                bytes = text.len(),
                                error = %parse_err,
                                "failed to parse client message"
                            );
                        }

                        if ctx.invalid_json > MAX_INVALID_JSON {
                            ctx.close_frame = Some(CloseFrame {
                                code: close_code::POLICY,
                                reason: "too many invalid messages".into(),
                            });
                            return LoopControl::Disconnect;
                        }

                        LoopControl::Continue
                    }
                }
            }
            Message::Binary(_) => {
                ctx.close_frame = Some(CloseFrame {
                    code: close_code::UNSUPPORTED,
                    reason: "binary messages not supported".into(),
                });
                LoopControl::Disconnect
            }
            Message::Ping(_) | Message::Pong(_) => LoopControl::Continue,
            Message::Close(_) => LoopControl::Disconnect,
        },
        Some(Err(e)) => {
            warn!(error = %e, "websocket recv error");
            LoopControl::Disconnect
        }
        None => {
            info!("websocket closed");
            LoopControl::Disconnect
        }
    }
}

async fn forward_room_bytes(
    bytes: Utf8Bytes,
    socket: &mut WebSocket,
    ctx: &mut ConnCtx,
) -> LoopControl {
    let bytes_len = bytes.len();
    match socket.send(Message::Text(bytes)).await.map_err(NetError::Ws) {
        Ok(()) => {
            ctx.msgs_out += 1;
            ctx.bytes_out += bytes_len as u64;
            LoopControl::Continue
        }
        Err(err) => {
            // Log unexpected send failures; disconnect will follow immediately.
            warn!(error = ?err, "failed to send room update");
            LoopControl::Disconnect
        }
    }
}

async fn disconnect_cleanup(ctx: &ConnCtx) {
    // The room may already be gone if its worker stopped first.
    match ctx.gateway.leave(&ctx.room.room_id, &ctx.player_id).await {
        Ok(remaining) => debug!(room_id = %ctx.room.room_id, remaining, "left room"),
        Err(e) => debug!(room_id = %ctx.room.room_id, error = %e, "leave skipped"),
    }

    debug!(
        msgs_in = ctx.msgs_in,
        msgs_out = ctx.msgs_out,
        bytes_in = ctx.bytes_in,
        bytes_out = ctx.bytes_out,
        invalid_json = ctx.invalid_json,
        rejected = ctx.rejected,
        lag_recovery_count = ctx.lag_recovery_count,
        "connection stats"
    );
    info!("client disconnected");
}
