//! dockerless CLI: declarative image forwarding between registries.

pub mod commands;
pub mod output;
pub mod state;
