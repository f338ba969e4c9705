// Contract extraction service - core library
//
// Tracks uploaded contracts through an external extraction job. Contract state
// lives in an in-memory store; a background poller and the provider webhook race
// to finalize each contract.

pub mod config;
pub mod domains;
pub mod kernel;
pub mod server;

pub use config::*;
