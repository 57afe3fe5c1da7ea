//! Frontend process core - platform-independent building blocks
//!
//! This crate provides the packet channel, the termination flag, the IPC wire
//! format, configuration, error types and the traits that platform crates
//! implement to launch a subordinate frontend process.

mod channel;
mod config;
mod env;
mod error;
mod frontend;
mod ipc;
mod process;
mod signal;
mod stdio;

pub use channel::*;
pub use config::*;
pub use env::*;
pub use error::*;
pub use frontend::*;
pub use ipc::*;
pub use process::*;
pub use signal::*;
pub use stdio::*;
