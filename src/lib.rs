//! Frontline - authoritative two-team battle simulation

pub mod battle;
pub mod core;
pub mod server;
