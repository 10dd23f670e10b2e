use std::time::Duration;

/// Hostile and fighter spawning tuning. Probabilities are per tick.

#[derive(Debug, Clone, Copy)]
pub struct SpawnTuning {
    /// Chance per tick of a new roaming hostile.
    pub hostile_chance: f64,

    /// Roaming hostiles allowed at once (fighters don't count).
    pub hostile_cap: usize,

    /// How far beyond the right edge hostiles may appear.
    pub hostile_entry_depth: f32,

    /// Hostiles move at this fraction of the table speed.
    pub hostile_speed_factor: f32,

    /// Time between automatic fighter launches from one combat unit.
    pub fighter_interval: Duration,

    /// Live fighters a single combat unit may have.
    pub max_fighters_per_unit: usize,

    /// Fighter radius relative to its parent.
    pub fighter_size_factor: f32,

    /// Fighter speed relative to the table speed.
    pub fighter_speed_factor: f32,

    /// Fighters aim at a random point within this distance of their parent.
    pub fighter_aim_radius: f32,

    /// How far a fighter's target is pushed ahead once reached.
    pub fighter_overshoot: f32,

    /// Fighters further than this outside the arena are removed.
    pub fighter_cull_distance: f32,

    /// Distance at which a unit counts as having reached its target.
    pub arrival_epsilon: f32,

    /// Cosmetic rotation added per tick.
    pub rotation_per_tick: f32,
}

impl Default for SpawnTuning {
    fn default() -> Self {
        Self {
            hostile_chance: 0.01,
            hostile_cap: 20,
            hostile_entry_depth: 100.0,
            hostile_speed_factor: 0.5,
            fighter_interval: Duration::from_secs(5),
            max_fighters_per_unit: 5,
            fighter_size_factor: 0.375,
            fighter_speed_factor: 1.5,
            fighter_aim_radius: 100.0,
            fighter_overshoot: 2000.0,
            fighter_cull_distance: 1000.0,
            arrival_epsilon: 5.0,
            rotation_per_tick: 0.01,
        }
    }
}
