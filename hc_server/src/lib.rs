//! Server-side of the hold'em chip coordinator: admission REST API and the
//! WebSocket session layer, on top of the `holdem_chips` engine and room
//! actors. The binary lives in `main.rs`; this library target exists so the
//! integration tests can build the router in-process.

pub mod api;
pub mod config;
pub mod logging;
pub mod metrics;
