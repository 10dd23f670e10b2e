/// Resource economy tuning.

#[derive(Debug, Clone, Copy)]
pub struct EconomyTuning {
    /// Resources every player starts (and restarts) with.
    pub starting_resources: f64,

    /// Chance per tick that producers pay out.
    pub accrual_chance: f64,

    /// A producer pays `size / producer_size_divisor` per payout.
    pub producer_size_divisor: f64,

    /// Bounty per side of a defeated hostile.
    pub bounty_per_side: f64,

    /// Maximum jitter on each axis for replicated units.
    pub replicate_jitter: f32,
}

impl Default for EconomyTuning {
    fn default() -> Self {
        Self {
            starting_resources: 100.0,
            accrual_chance: 0.1,
            producer_size_divisor: 20.0,
            bounty_per_side: 5.0,
            replicate_jitter: 20.0,
        }
    }
}
