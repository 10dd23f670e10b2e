use std::time::Duration;

/// Match timing and scoring.
#[derive(Debug, Clone, Copy)]
pub struct MatchTuning {
    /// Length of a match before scores are tallied.
    pub duration: Duration,

    /// Cooldown between the end of a match and the in-place reset.
    pub restart_cooldown: Duration,

    /// Score weight per side of a producer.
    pub producer_multiplier: u64,

    /// Score weight per side of a combat unit.
    pub combat_multiplier: u64,

    /// Resources per score point.
    pub resources_per_point: f64,

    /// How many leaders are recorded per match.
    pub leaders_recorded: usize,

    /// How many past matches a room remembers.
    pub history_len: usize,
}

impl Default for MatchTuning {
    fn default() -> Self {
        Self {
            duration: Duration::from_secs(5 * 60),
            restart_cooldown: Duration::from_secs(20),
            producer_multiplier: 1,
            combat_multiplier: 2,
            resources_per_point: 10.0,
            leaders_recorded: 3,
            history_len: 5,
        }
    }
}
