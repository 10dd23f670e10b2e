use crate::domain::GameMode;
use std::{env, time::Duration};

// Runtime/server constants (not gameplay tuning).

pub fn http_port() -> u16 {
    env::var("ARENA_SERVER_PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(3001)
}

pub fn tick_interval() -> Duration {
    let millis = env::var("ARENA_TICK_MS")
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .filter(|&ms| ms > 0)
        .unwrap_or(100);
    Duration::from_millis(millis)
}

pub fn game_mode() -> GameMode {
    match env::var("ARENA_GAME_MODE") {
        Ok(value) => GameMode::parse(&value).unwrap_or_else(|| {
            tracing::warn!(value = %value, "unknown game mode; using classic");
            GameMode::Classic
        }),
        Err(_) => GameMode::Classic,
    }
}

// Unset means every room seeds from entropy.
pub fn rng_seed() -> Option<u64> {
    env::var("ARENA_RNG_SEED")
        .ok()
        .and_then(|value| value.parse().ok())
}

pub const COMMAND_CHANNEL_CAPACITY: usize = 1024;
pub const ROOM_BROADCAST_CAPACITY: usize = 128;
pub const SNAPSHOT_EVERY_TICKS: u64 = 10;
