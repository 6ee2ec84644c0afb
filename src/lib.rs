//! fanoutq – a single-process TCP message broker with named queues.
//!
//! Publishers push messages onto named queues over a TCP connection;
//! subscribers join a queue name and receive every dequeued message,
//! answering each delivery with a fixed 13-byte acknowledgment token.
//!
//! This crate exports
//!  * `core`   – queue, registry, subscriber and wire-protocol logic
//!  * `broker` – TCP server engine (accept loop + per-queue dispatcher)
//!  * `config` – TOML-driven runtime configuration
//!
//! Downstream applications can embed the broker engine (`start_broker`) or
//! build their own binaries on top of the library.

pub mod broker;
pub mod config;
pub mod core;
pub mod logging;

pub use broker::server::{serve as start_broker, serve_on};
pub use config::{load_config, Config};
