// Per-tick simulation systems and the command handlers that share their rules.

pub mod combat;
pub mod economy;
pub mod lifecycle;
pub mod movement;
pub mod spawner;
