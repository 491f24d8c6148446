//! Application lifecycle
//!
//! - `startup`: storage + service wiring shared by server and CLI
//! - `server`: HTTP server
//! - `commands`: one-shot CLI commands

pub mod commands;
pub mod server;
pub mod startup;

pub use server::run_server;
pub use startup::{AppServices, prepare_services};
