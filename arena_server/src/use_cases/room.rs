// Per-room worker: the only code that mutates a room's state.

use super::types::{RoomCommand, RoomUpdate};
use crate::domain::{InvariantViolation, RoomEvent, RoomState};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{Notify, broadcast, mpsc};
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

/// Counters the worker publishes for operators. Read without touching the worker.
#[derive(Debug, Default)]
pub struct RoomStats {
    pub players: AtomicUsize,
    pub tick: AtomicU64,
}

impl RoomStats {
    fn record(&self, state: &RoomState) {
        self.players.store(state.players.len(), Ordering::Relaxed);
        self.tick.store(state.tick, Ordering::Relaxed);
    }
}

/// Why a tick was thrown away.
#[derive(Debug, Error)]
pub enum TickFault {
    #[error("tick panicked: {0}")]
    Panicked(String),
    #[error("tick broke an invariant: {0}")]
    Invariant(#[from] InvariantViolation),
}

/// Runs one step on a copy of the state and commits it only if it is sound.
///
/// On a fault the previous state is left untouched.
pub fn run_tick(state: &mut RoomState, dt: Duration) -> Result<Vec<RoomEvent>, TickFault> {
    let mut next = state.clone();
    catch_unwind(AssertUnwindSafe(|| next.step(dt))).map_err(|payload| {
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic".to_string());
        TickFault::Panicked(message)
    })?;
    next.check_invariants()?;

    let events = next.drain_events();
    *state = next;
    Ok(events)
}

/// Settings for one worker, copied from the registry at room creation.
#[derive(Debug, Clone, Copy)]
pub struct WorkerConfig {
    pub tick_interval: Duration,
    pub snapshot_every_ticks: u64,
}

pub async fn room_task(
    mut state: RoomState,
    mut command_rx: mpsc::Receiver<RoomCommand>,
    update_tx: broadcast::Sender<RoomUpdate>,
    stats: Arc<RoomStats>,
    config: WorkerConfig,
    shutdown: Arc<Notify>,
) {
    let room_id = state.id.clone();
    info!(room_id = %room_id, "room worker started");

    // The first step happens one full interval after creation.
    let start = Instant::now() + config.tick_interval;
    let mut interval = tokio::time::interval_at(start, config.tick_interval);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let snapshot_every = config.snapshot_every_ticks.max(1);

    loop {
        tokio::select! {
            biased;

            _ = shutdown.notified() => {
                // Registry removed the room.
                break;
            }
            _ = interval.tick() => {
                let outcome = run_tick(&mut state, config.tick_interval);
                stats.record(&state);
                match outcome {
                    Ok(events) => {
                        publish(&update_tx, state.tick, events);
                        if state.tick % snapshot_every == 0 {
                            let _ = update_tx.send(RoomUpdate::Snapshot(state.snapshot()));
                        }
                    }
                    Err(fault) => {
                        error!(room_id = %room_id, tick = state.tick + 1, error = %fault, "tick discarded");
                    }
                }
            }
            command = command_rx.recv() => {
                let Some(command) = command else {
                    // Every handle is gone; nobody can reach this room again.
                    break;
                };
                let emptied = handle_command(&mut state, command);
                stats.record(&state);
                publish(&update_tx, state.tick, state.drain_events());
                if emptied {
                    // Commands still queued are dropped with the receiver, so a
                    // late join sees the room as gone and the registry replaces it.
                    break;
                }
            }
        }
    }

    info!(room_id = %room_id, ticks = state.tick, "room worker stopped");
}

/// Applies one command. Returns true once the last player has left.
fn handle_command(state: &mut RoomState, command: RoomCommand) -> bool {
    match command {
        RoomCommand::Join { player_id, reply } => {
            let snapshot = state.join(&player_id);
            info!(room_id = %state.id, player_id = %player_id, "player joined room");
            if reply.send(snapshot).is_err() {
                debug!(player_id = %player_id, "join reply dropped");
            }
            false
        }
        RoomCommand::Leave { player_id, reply } => {
            if state.leave(&player_id) {
                info!(room_id = %state.id, player_id = %player_id, "player left room");
            }
            let remaining = state.players.len();
            let _ = reply.send(remaining);
            remaining == 0
        }
        RoomCommand::Intent {
            player_id,
            intent,
            reply,
        } => {
            let name = intent.name();
            let result = state.apply(&player_id, intent);
            if let Err(e) = &result {
                debug!(player_id = %player_id, intent = name, code = e.code(), "intent rejected");
            }
            if reply.send(result).is_err() {
                warn!(player_id = %player_id, intent = name, "intent reply dropped");
            }
            false
        }
    }
}

fn publish(update_tx: &broadcast::Sender<RoomUpdate>, tick: u64, events: Vec<RoomEvent>) {
    for event in events {
        // No receivers is fine; the room keeps running.
        let _ = update_tx.send(RoomUpdate::Event { tick, event });
    }
}
