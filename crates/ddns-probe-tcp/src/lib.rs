// # TCP Call-back Probe
//
// This crate provides both halves of the TCP call-back reachability test:
//
// - `TcpCallbackProbe`: `ReachabilityCapability` run on the DDNS host
// - `ProbeServer`: the vantage point that connects back
//
// ## Protocol
//
// ```text
// host                                  vantage point
//  │ listen on candidate:0                    │
//  │──── "candidate:port" ───────────────────►│
//  │◄─── connect + 32-char token ─────────────│
//  │◄─── "SUCCESS: Random value sent" ────────│
// ```
//
// A candidate is reachable when the reply contains `SUCCESS` and a call-back
// carrying at least one byte is accepted before the timeout.

pub mod client;
pub mod server;
pub mod wire;

pub use client::TcpCallbackProbe;
pub use server::{DEFAULT_MAX_HANDLERS, DEFAULT_PROBE_PORT, ProbeServer};
